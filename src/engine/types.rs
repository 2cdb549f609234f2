use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Emotion {
    Happy,
    Excited,
    #[default]
    Neutral,
    Confused,
    Frustrated,
    Bored,
}

impl Emotion {
    /// Declaration order doubles as the tie-break order for emotion scoring.
    pub const ALL: [Emotion; 6] = [
        Emotion::Happy,
        Emotion::Excited,
        Emotion::Neutral,
        Emotion::Confused,
        Emotion::Frustrated,
        Emotion::Bored,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Excited => "excited",
            Self::Neutral => "neutral",
            Self::Confused => "confused",
            Self::Frustrated => "frustrated",
            Self::Bored => "bored",
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Happy | Self::Excited)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum EmotionTrend {
    Improving,
    #[default]
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum ComprehensionLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl ComprehensionLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 40.0 {
            Self::Low
        } else if score > 70.0 {
            Self::High
        } else {
            Self::Medium
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LearningStyle {
    Visual,
    Auditory,
    Kinesthetic,
    #[default]
    Reading,
}

impl LearningStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visual => "visual",
            Self::Auditory => "auditory",
            Self::Kinesthetic => "kinesthetic",
            Self::Reading => "reading",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeachingMethod {
    Visual,
    Auditory,
    Kinesthetic,
    Reading,
}

impl TeachingMethod {
    pub fn matches_style(&self, style: LearningStyle) -> bool {
        matches!(
            (self, style),
            (Self::Visual, LearningStyle::Visual)
                | (Self::Auditory, LearningStyle::Auditory)
                | (Self::Kinesthetic, LearningStyle::Kinesthetic)
                | (Self::Reading, LearningStyle::Reading)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visual => "visual",
            Self::Auditory => "auditory",
            Self::Kinesthetic => "kinesthetic",
            Self::Reading => "reading",
        }
    }
}

/// One raw student interaction. Immutable once created; the analysis is
/// attached exactly once by the engine before the interaction is logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: String,
    pub student_id: String,
    pub message: String,
    pub timestamp: i64,
    pub topic: Option<String>,
    pub context: String,
    pub teaching_method: Option<TeachingMethod>,
    pub response_time_seconds: Option<f64>,
    pub is_correct: Option<bool>,
    pub hints_used: Option<i32>,
    pub is_voluntary: bool,
    pub session_interaction_count: i32,
    pub question_difficulty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
}

impl Interaction {
    pub fn new(student_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: student_id.into(),
            message: message.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            topic: None,
            context: "lesson".to_string(),
            teaching_method: None,
            response_time_seconds: None,
            is_correct: None,
            hints_used: None,
            is_voluntary: false,
            session_interaction_count: 1,
            question_difficulty: None,
            analysis: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionAnalysis {
    pub current: Emotion,
    pub scores: HashMap<Emotion, f64>,
    pub trend: EmotionTrend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensionAnalysis {
    pub score: f64,
    pub level: ComprehensionLevel,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementAnalysis {
    pub score: f64,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyAdjustment {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyMatch {
    pub is_optimal: bool,
    /// Signed delta toward the student's level; 0.0 when optimal.
    pub adjustment: f64,
    pub suggestion: Option<DifficultyAdjustment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeachingEffectiveness {
    pub score: f64,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub emotion: EmotionAnalysis,
    pub comprehension: ComprehensionAnalysis,
    pub engagement: EngagementAnalysis,
    pub difficulty_match: DifficultyMatch,
    pub teaching_effectiveness: TeachingEffectiveness,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionRecord {
    pub emotion: Emotion,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    pub comprehension: f64,
    pub engagement: f64,
    pub timestamp: i64,
}

/// Evidence kept for the periodic learning-style recompute: the message text
/// plus the comprehension score it was answered with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleEvidence {
    pub message: String,
    pub comprehension: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRetention {
    pub first_score: f64,
    pub first_ts: i64,
    pub last_score: f64,
    pub last_ts: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub student_id: String,
    pub interaction_count: i32,
    pub learning_style: LearningStyle,
    /// Continuous proficiency, 1.0..=5.0 in steps of 0.5.
    pub level: f64,
    pub emotional_history: Vec<EmotionRecord>,
    pub performance_history: Vec<PerformanceRecord>,
    /// Most recent correct/incorrect flags, oldest first.
    pub recent_correctness: Vec<bool>,
    pub style_evidence: Vec<StyleEvidence>,
    pub topic_retention: HashMap<String, TopicRetention>,
    pub last_interaction: i64,
}

impl StudentProfile {
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            interaction_count: 0,
            learning_style: LearningStyle::default(),
            level: 3.0,
            emotional_history: Vec::new(),
            performance_history: Vec::new(),
            recent_correctness: Vec::new(),
            style_evidence: Vec::new(),
            topic_retention: HashMap::new(),
            last_interaction: 0,
        }
    }

    /// Fraction of correct answers in the rolling correctness window.
    /// Neutral 0.5 while no flags have been recorded.
    pub fn success_rate(&self) -> f64 {
        if self.recent_correctness.is_empty() {
            return 0.5;
        }
        let correct = self.recent_correctness.iter().filter(|c| **c).count();
        correct as f64 / self.recent_correctness.len() as f64
    }

    /// Retention estimate for a topic: ratio of the latest comprehension to
    /// the first one recorded, damped by a forgetting factor.
    pub fn retention_estimate(&self, topic: &str, now_ms: i64) -> Option<f64> {
        let retention = self.topic_retention.get(topic)?;
        if retention.first_score <= 0.0 {
            return Some(1.0);
        }
        let days_elapsed = ((now_ms - retention.first_ts) as f64 / 86_400_000.0).max(0.0);
        let forgetting = (1.0 - days_elapsed * 0.01).max(0.7);
        Some(((retention.last_score / retention.first_score) * forgetting).clamp(0.0, 1.5))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MisconceptionPattern {
    pub topic: String,
    pub error_count: usize,
    pub common_words: Vec<String>,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EmotionalTransitionPattern {
    /// "happy_to_frustrated" style keys, tallied across the window.
    pub transitions: HashMap<String, usize>,
    /// Context that most often immediately preceded frustration, with count.
    pub frustration_trigger: Option<(String, usize)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductiveHour {
    pub hour: u32,
    pub mean_comprehension: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendClass {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicTrend {
    pub topic: String,
    pub delta: f64,
    pub class: TrendClass,
}

/// Output of one mining pass. Rebuilt wholesale and swapped atomically;
/// a cache over the interaction window, never an accumulator.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PatternSet {
    pub misconceptions: Vec<MisconceptionPattern>,
    pub emotional_transitions: EmotionalTransitionPattern,
    pub productive_hours: Vec<ProductiveHour>,
    pub topic_trends: Vec<TopicTrend>,
    pub mined_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredResponse {
    pub text: String,
    pub score: f64,
    pub ts: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StrategyRecord {
    pub successful_responses: Vec<ScoredResponse>,
    pub failed_responses: Vec<ScoredResponse>,
    /// Invariant: the highest-scoring entry in `successful_responses`.
    pub best_response: Option<ScoredResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    EmotionalSupport,
    Simplify,
    AddVisual,
    AddGamification,
    AdjustDifficulty,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmotionalSupport => "emotional_support",
            Self::Simplify => "simplify",
            Self::AddVisual => "add_visual",
            Self::AddGamification => "add_gamification",
            Self::AdjustDifficulty => "adjust_difficulty",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub priority: i32,
    pub rationale: String,
    /// Signed difficulty delta, only for AdjustDifficulty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_delta: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub analysis: AnalysisResult,
    pub recommendations: Vec<Recommendation>,
    pub patterns_refreshed: bool,
}

/// Durable per-student snapshot written by the persistence layer.
/// Lesson sessions are deliberately absent; they are ephemeral.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSnapshot {
    pub profile: StudentProfile,
    pub interaction_tail: Vec<Interaction>,
    pub saved_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comprehension_level_buckets() {
        assert_eq!(ComprehensionLevel::from_score(0.0), ComprehensionLevel::Low);
        assert_eq!(ComprehensionLevel::from_score(39.9), ComprehensionLevel::Low);
        assert_eq!(ComprehensionLevel::from_score(40.0), ComprehensionLevel::Medium);
        assert_eq!(ComprehensionLevel::from_score(70.0), ComprehensionLevel::Medium);
        assert_eq!(ComprehensionLevel::from_score(70.1), ComprehensionLevel::High);
        assert_eq!(ComprehensionLevel::from_score(100.0), ComprehensionLevel::High);
    }

    #[test]
    fn success_rate_neutral_when_empty() {
        let profile = StudentProfile::new("s1");
        assert_eq!(profile.success_rate(), 0.5);
    }

    #[test]
    fn retention_estimate_applies_forgetting_floor() {
        let mut profile = StudentProfile::new("s1");
        let now = chrono::Utc::now().timestamp_millis();
        let hundred_days_ago = now - 100 * 86_400_000;
        profile.topic_retention.insert(
            "kesirler".to_string(),
            TopicRetention {
                first_score: 80.0,
                first_ts: hundred_days_ago,
                last_score: 80.0,
                last_ts: now,
            },
        );
        // 100 days would give factor 0.0 without the floor of 0.7.
        let estimate = profile.retention_estimate("kesirler", now).unwrap();
        assert!((estimate - 0.7).abs() < 1e-9);
    }

    #[test]
    fn method_style_match() {
        assert!(TeachingMethod::Visual.matches_style(LearningStyle::Visual));
        assert!(!TeachingMethod::Visual.matches_style(LearningStyle::Auditory));
    }
}
