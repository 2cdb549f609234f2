//! Lesson plan input, supplied by the embedding application's content
//! provider and treated as opaque here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlan {
    pub topic: String,
    pub grade: i32,
    pub subject: String,
    pub objectives: Vec<String>,
}

impl LessonPlan {
    pub fn new(topic: impl Into<String>, grade: i32, subject: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            grade,
            subject: subject.into(),
            objectives: Vec::new(),
        }
    }

    pub fn with_objectives(mut self, objectives: Vec<String>) -> Self {
        self.objectives = objectives;
        self
    }
}
