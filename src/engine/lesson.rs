//! Finite-state lesson driver.
//!
//! A `LessonSession` is ephemeral, one per active conversation, and is never
//! persisted; durable facts about the student live in `StudentProfile`. The
//! conductor never raises an error for free text it cannot classify, and a
//! dead gateway only degrades message wording, never the state machine.

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::classifier::{ReplyClass, ReplyClassifier, TextClassifier};
use crate::engine::curriculum::LessonPlan;
use crate::engine::gateway::{RemoteTutorGateway, TurnMessage, TutorRequest};
use crate::engine::phases::{
    orientation_message, phase_message, question_for, reteach_message, LessonPhase,
};
use crate::engine::speech::SpeechSink;
use crate::error::EngineError;

const PRAISE: &[&str] = &["Doğru! 🎉", "Harika, bildin! 🎉", "Süper, tam isabet! 🎉"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSession {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub plan: LessonPlan,
    pub phase: LessonPhase,
    pub correct_answers: u32,
    pub incorrect_answers: u32,
    /// Set while the reteach sub-branch waits for a confirmation reply.
    pub awaiting_reteach_confirmation: bool,
    pub conversation_history: Vec<TurnMessage>,
    pub last_activity: i64,
}

impl LessonSession {
    pub fn new(
        student_id: impl Into<String>,
        student_name: impl Into<String>,
        plan: LessonPlan,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: student_id.into(),
            student_name: student_name.into(),
            plan,
            phase: LessonPhase::Greeting,
            correct_answers: 0,
            incorrect_answers: 0,
            awaiting_reteach_confirmation: false,
            conversation_history: Vec::new(),
            last_activity: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn final_score(&self) -> Option<f64> {
        if !self.phase.is_terminal() {
            return None;
        }
        let total = self.correct_answers + self.incorrect_answers;
        if total == 0 {
            return Some(100.0);
        }
        Some(self.correct_answers as f64 / total as f64 * 100.0)
    }
}

/// One tutor message plus the metadata the embedding application needs to
/// drive the dialogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonTurn {
    pub message: String,
    pub phase: LessonPhase,
    pub requires_response: bool,
    pub auto_advance_after_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f64>,
}

pub struct LessonConductor {
    classifier: ReplyClassifier,
    gateway: Option<RemoteTutorGateway>,
    speech: Option<SpeechSink>,
}

impl LessonConductor {
    pub fn new(gateway: Option<RemoteTutorGateway>, speech: Option<SpeechSink>) -> Self {
        Self {
            classifier: ReplyClassifier,
            gateway,
            speech,
        }
    }

    /// Starts a lesson and emits the greeting turn.
    pub async fn begin(
        &self,
        student_id: &str,
        student_name: &str,
        plan: LessonPlan,
    ) -> (LessonSession, LessonTurn) {
        let mut session = LessonSession::new(student_id, student_name, plan);
        info!(
            student_id = %session.student_id,
            topic = %session.plan.topic,
            "lesson started"
        );
        let turn = self.emit(&mut session).await;
        (session, turn)
    }

    /// Processes one student reply against the current phase script.
    pub async fn handle_reply(
        &self,
        session: &mut LessonSession,
        reply: &str,
    ) -> Result<LessonTurn, EngineError> {
        if session.phase.is_terminal() {
            return Err(EngineError::LessonCompleted);
        }
        session.last_activity = chrono::Utc::now().timestamp_millis();
        session.conversation_history.push(TurnMessage {
            role: "student".to_string(),
            content: reply.to_string(),
        });

        if session.awaiting_reteach_confirmation {
            return Ok(self.handle_reteach_reply(session, reply).await);
        }

        let turn = match session.phase {
            LessonPhase::Check | LessonPhase::Quiz => self.grade_answer(session, reply).await,
            _ => match self.classifier.classify(reply) {
                Some(ReplyClass::Positive) => self.advance(session).await,
                Some(ReplyClass::Negative) => self.reteach(session),
                None => self.orient(session),
            },
        };
        Ok(turn)
    }

    /// Moves a no-reply phase forward once its scripted delay has elapsed.
    pub async fn advance_idle(&self, session: &mut LessonSession) -> Result<LessonTurn, EngineError> {
        if session.phase.is_terminal() {
            return Err(EngineError::LessonCompleted);
        }
        if session.phase.requires_response() {
            debug!(phase = session.phase.as_str(), "idle advance ignored, reply pending");
            return Ok(self.orient(session));
        }
        Ok(self.advance(session).await)
    }

    async fn handle_reteach_reply(&self, session: &mut LessonSession, reply: &str) -> LessonTurn {
        match self.classifier.classify(reply) {
            Some(ReplyClass::Positive) => {
                session.awaiting_reteach_confirmation = false;
                self.advance(session).await
            }
            Some(ReplyClass::Negative) => self.reteach(session),
            None => self.orient(session),
        }
    }

    async fn grade_answer(&self, session: &mut LessonSession, reply: &str) -> LessonTurn {
        let Some(question) = question_for(session.phase, &session.plan) else {
            return self.orient(session);
        };
        let normalized = reply.trim().to_lowercase();
        if normalized == question.key {
            session.correct_answers += 1;
            let praise = PRAISE
                .choose(&mut rand::rng())
                .copied()
                .unwrap_or(PRAISE[0]);
            let mut turn = self.advance(session).await;
            turn.message = format!("{praise} {}", turn.message);
            turn
        } else {
            session.incorrect_answers += 1;
            let message = format!(
                "Olmadı, doğru cevap \"{}\" idi. {} Tekrar denemek ister misin? \
                 Cevabını yeniden yazabilirsin.",
                question.key, question.explanation
            );
            self.say(session, message)
        }
    }

    fn reteach(&self, session: &mut LessonSession) -> LessonTurn {
        session.awaiting_reteach_confirmation = true;
        let message = reteach_message(&session.plan);
        self.say(session, message)
    }

    fn orient(&self, session: &mut LessonSession) -> LessonTurn {
        let message = orientation_message(session.phase, &session.plan);
        self.say(session, message)
    }

    async fn advance(&self, session: &mut LessonSession) -> LessonTurn {
        session.phase = session.phase.next();
        self.emit(session).await
    }

    /// Emits the current phase's message, preferring gateway text for the
    /// free-form bodies.
    async fn emit(&self, session: &mut LessonSession) -> LessonTurn {
        let local = phase_message(session.phase, &session.plan, &session.student_name);
        let message = match session.phase {
            LessonPhase::Introduction | LessonPhase::Explanation => {
                self.generated_or(session, local).await
            }
            _ => local,
        };
        if session.phase.is_terminal() {
            info!(
                student_id = %session.student_id,
                score = session.final_score(),
                "lesson completed"
            );
        }
        self.say(session, message)
    }

    async fn generated_or(&self, session: &LessonSession, fallback: String) -> String {
        let Some(gateway) = self.gateway.as_ref() else {
            return fallback;
        };
        let request = TutorRequest {
            message: phase_message(session.phase, &session.plan, &session.student_name),
            grade_level: session.plan.grade,
            subject: session.plan.subject.clone(),
            student_name: session.student_name.clone(),
            conversation_history: session.conversation_history.clone(),
        };
        match gateway.generate(&request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, phase = session.phase.as_str(), "gateway failed, using local template");
                fallback
            }
        }
    }

    fn say(&self, session: &mut LessonSession, message: String) -> LessonTurn {
        session.conversation_history.push(TurnMessage {
            role: "tutor".to_string(),
            content: message.clone(),
        });
        if let Some(speech) = self.speech.as_ref() {
            speech.speak(&message);
        }
        LessonTurn {
            message,
            phase: session.phase,
            requires_response: session.phase.requires_response(),
            auto_advance_after_ms: session.phase.auto_advance_delay_ms(),
            final_score: session.final_score(),
        }
    }
}
