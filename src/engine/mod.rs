//! Adaptive tutoring engine.
//!
//! `TutorEngine` is the embedding application's single entry point. Scoring
//! and state-machine logic is synchronous; only gateway calls and snapshot
//! I/O await. Interactions for one student fold into that student's profile
//! in strict arrival order; students are otherwise independent, sharing only
//! the pattern cache, which is rebuilt wholesale and swapped atomically.

pub mod analyzer;
pub mod classifier;
pub mod curriculum;
pub mod gateway;
pub mod lesson;
pub mod patterns;
pub mod persistence;
pub mod phases;
pub mod profile;
pub mod speech;
pub mod strategy;
pub mod types;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::TutorConfig;
use crate::error::EngineError;

pub use analyzer::ResponseAnalyzer;
pub use curriculum::LessonPlan;
pub use gateway::RemoteTutorGateway;
pub use lesson::{LessonConductor, LessonSession, LessonTurn};
pub use patterns::PatternMiner;
pub use persistence::SnapshotStore;
pub use phases::LessonPhase;
pub use profile::StudentProfileStore;
pub use speech::SpeechSink;
pub use strategy::StrategyAdvisor;
pub use types::{
    AnalysisResult, Interaction, PatternSet, ProcessOutcome, Recommendation, StudentProfile,
    StudentSnapshot,
};

pub struct TutorEngine {
    config: TutorConfig,
    analyzer: ResponseAnalyzer,
    profiles: StudentProfileStore,
    miner: PatternMiner,
    advisor: StrategyAdvisor,
    conductor: LessonConductor,
    gateway: Option<RemoteTutorGateway>,
    snapshots: Option<SnapshotStore>,
    interactions: RwLock<Vec<Interaction>>,
    patterns: parking_lot::RwLock<Arc<PatternSet>>,
    sessions: RwLock<HashMap<String, LessonSession>>,
    /// Tutor's most recent message per student, scored by the next reply.
    last_responses: RwLock<HashMap<String, String>>,
    /// Students whose snapshot has already been looked up this run.
    touched: RwLock<HashSet<String>>,
    processed: RwLock<i64>,
}

impl TutorEngine {
    pub fn new(config: TutorConfig) -> Self {
        let gateway = if config.gateway.endpoint.trim().is_empty() {
            None
        } else {
            Some(RemoteTutorGateway::new(config.gateway.clone()))
        };
        let snapshots = Some(SnapshotStore::new(&config.persistence));
        Self::assemble(config, gateway, None, snapshots)
    }

    /// No disk, no network; everything else behaves identically.
    pub fn in_memory(config: TutorConfig) -> Self {
        Self::assemble(config, None, None, None)
    }

    pub fn with_speech(mut self, sink: SpeechSink) -> Self {
        self.conductor = LessonConductor::new(self.gateway.clone(), Some(sink));
        self
    }

    fn assemble(
        config: TutorConfig,
        gateway: Option<RemoteTutorGateway>,
        speech: Option<SpeechSink>,
        snapshots: Option<SnapshotStore>,
    ) -> Self {
        Self {
            analyzer: ResponseAnalyzer::new(config.analyzer.clone(), config.engagement.clone()),
            profiles: StudentProfileStore::new(config.profile.clone()),
            miner: PatternMiner::new(config.mining.clone()),
            advisor: StrategyAdvisor::new(config.strategy.clone()),
            conductor: LessonConductor::new(gateway.clone(), speech),
            gateway,
            snapshots,
            interactions: RwLock::new(Vec::new()),
            patterns: parking_lot::RwLock::new(Arc::new(PatternSet::default())),
            sessions: RwLock::new(HashMap::new()),
            last_responses: RwLock::new(HashMap::new()),
            touched: RwLock::new(HashSet::new()),
            processed: RwLock::new(0),
            config,
        }
    }

    /// Scores one interaction and folds it into all engine state.
    pub async fn process_interaction(
        &self,
        mut interaction: Interaction,
    ) -> Result<ProcessOutcome, EngineError> {
        let student_id = interaction.student_id.clone();
        self.ensure_loaded(&student_id).await?;

        let profile = self.profiles.get(&student_id).await;
        let analysis = self.analyzer.analyze(&interaction, &profile);
        interaction.analysis = Some(analysis.clone());

        {
            let mut log = self.interactions.write().await;
            log.push(interaction.clone());
            if log.len() > self.config.log_cap {
                let excess = log.len() - self.config.log_cap;
                log.drain(0..excess);
            }
        }

        self.profiles.update(&student_id, &interaction, &analysis).await;

        if let Some(method) = interaction.teaching_method {
            self.advisor
                .record_method_effectiveness(method, analysis.teaching_effectiveness.score);
        }
        if let Some(previous) = self.last_responses.read().await.get(&student_id) {
            let success = self
                .advisor
                .is_success(analysis.comprehension.score, analysis.emotion.current);
            self.advisor.record_outcome(
                &interaction.context,
                analysis.emotion.current,
                analysis.comprehension.level,
                previous,
                analysis.comprehension.score,
                success,
            );
        }

        let patterns_refreshed = self.maybe_mine().await;
        let patterns = self.patterns.read().clone();
        let recommendations = self.advisor.recommend(&analysis, &patterns);

        Ok(ProcessOutcome {
            analysis,
            recommendations,
            patterns_refreshed,
        })
    }

    async fn maybe_mine(&self) -> bool {
        // Interval below 1 would divide by zero; treat it as every pass.
        let interval = i64::from(self.config.mining.mining_interval.max(1));
        let due = {
            let mut processed = self.processed.write().await;
            *processed += 1;
            *processed % interval == 0
        };
        if !due {
            return false;
        }
        let window = {
            let log = self.interactions.read().await;
            let start = log.len().saturating_sub(self.config.mining.window_size);
            log[start..].to_vec()
        };
        let mined = self.miner.mine(&window);
        *self.patterns.write() = Arc::new(mined);
        info!(window = window.len(), "pattern cache refreshed");
        true
    }

    pub fn patterns(&self) -> Arc<PatternSet> {
        self.patterns.read().clone()
    }

    pub async fn profile(&self, student_id: &str) -> StudentProfile {
        self.profiles.get(student_id).await
    }

    pub fn advisor(&self) -> &StrategyAdvisor {
        &self.advisor
    }

    // Lesson dialogue.

    pub async fn start_lesson(
        &self,
        student_id: &str,
        student_name: &str,
        plan: LessonPlan,
    ) -> Result<LessonTurn, EngineError> {
        self.ensure_loaded(student_id).await?;
        let (session, turn) = self.conductor.begin(student_id, student_name, plan).await;
        self.sessions
            .write()
            .await
            .insert(student_id.to_string(), session);
        self.note_response(student_id, &turn.message).await;
        Ok(turn)
    }

    /// The session is checked out of the shared map for the duration of the
    /// turn, so one student's slow gateway call never delays another's. At
    /// most one turn is in flight per student; a second reply arriving while
    /// the first is still running sees no active session.
    pub async fn lesson_reply(
        &self,
        student_id: &str,
        reply: &str,
    ) -> Result<LessonTurn, EngineError> {
        let mut session = self.checkout_session(student_id).await?;
        let outcome = self.conductor.handle_reply(&mut session, reply).await;
        self.checkin_session(session).await;
        let turn = outcome?;
        self.note_response(student_id, &turn.message).await;
        Ok(turn)
    }

    /// Drives a no-reply phase forward; the embedding application calls this
    /// after the turn's scripted delay. Same checkout discipline as
    /// `lesson_reply`.
    pub async fn lesson_tick(&self, student_id: &str) -> Result<LessonTurn, EngineError> {
        let mut session = self.checkout_session(student_id).await?;
        let outcome = self.conductor.advance_idle(&mut session).await;
        self.checkin_session(session).await;
        let turn = outcome?;
        self.note_response(student_id, &turn.message).await;
        Ok(turn)
    }

    async fn checkout_session(&self, student_id: &str) -> Result<LessonSession, EngineError> {
        self.sessions
            .write()
            .await
            .remove(student_id)
            .ok_or_else(|| EngineError::NoActiveSession(student_id.to_string()))
    }

    /// Returns a checked-out session to the map unless the lesson finished.
    async fn checkin_session(&self, session: LessonSession) {
        if !session.phase.is_terminal() {
            self.sessions
                .write()
                .await
                .insert(session.student_id.clone(), session);
        }
    }

    pub async fn active_session(&self, student_id: &str) -> Option<LessonSession> {
        self.sessions.read().await.get(student_id).cloned()
    }

    /// Discards lesson sessions idle past the configured limit. Profiles are
    /// untouched; only the ephemeral dialogue state goes.
    pub async fn remove_stale_sessions(&self) -> usize {
        let cutoff = chrono::Utc::now().timestamp_millis() - self.config.session_max_idle_ms;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_activity >= cutoff);
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, "stale lesson sessions discarded");
        }
        removed
    }

    async fn note_response(&self, student_id: &str, message: &str) {
        self.last_responses
            .write()
            .await
            .insert(student_id.to_string(), message.to_string());
    }

    // Persistence.

    async fn ensure_loaded(&self, student_id: &str) -> Result<(), EngineError> {
        {
            let touched = self.touched.read().await;
            if touched.contains(student_id) {
                return Ok(());
            }
        }
        let mut touched = self.touched.write().await;
        if !touched.insert(student_id.to_string()) {
            return Ok(());
        }
        let Some(store) = self.snapshots.as_ref() else {
            return Ok(());
        };
        match store.load(student_id).await {
            Ok(Some(snapshot)) => {
                info!(
                    student_id = %student_id,
                    interactions = snapshot.profile.interaction_count,
                    "student snapshot restored"
                );
                self.profiles.restore(snapshot.profile).await;
                let mut log = self.interactions.write().await;
                log.extend(snapshot.interaction_tail);
            }
            Ok(None) => {}
            // Transient I/O: start fresh, the in-memory state is authoritative.
            Err(e @ crate::error::PersistenceError::Io(_)) => {
                warn!(student_id = %student_id, error = %e, "snapshot load failed");
            }
            // A corrupt snapshot must not be mistaken for a new student.
            Err(e) => {
                warn!(student_id = %student_id, error = %e, "snapshot decode failed");
                touched.remove(student_id);
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Writes one snapshot per live profile; failures are logged and left
    /// for the next flush tick. Returns how many saves succeeded.
    pub async fn snapshot_all(&self) -> usize {
        let Some(store) = self.snapshots.as_ref() else {
            return 0;
        };
        let profiles = self.profiles.all().await;
        let log = self.interactions.read().await.clone();
        let saved_at = chrono::Utc::now().timestamp_millis();
        let mut saved = 0;

        for profile in profiles {
            let mut tail: Vec<Interaction> = log
                .iter()
                .filter(|i| i.student_id == profile.student_id)
                .rev()
                .take(self.config.persistence.log_tail_len)
                .cloned()
                .collect();
            tail.reverse();
            let student_id = profile.student_id.clone();
            let snapshot = StudentSnapshot {
                profile,
                interaction_tail: tail,
                saved_at,
            };
            match store.save(&student_id, &snapshot).await {
                Ok(()) => saved += 1,
                Err(e) => warn!(student_id = %student_id, error = %e, "snapshot save failed"),
            }
        }
        saved
    }
}
