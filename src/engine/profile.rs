//! Aggregated per-student model.
//!
//! The store is the only writer of `StudentProfile`. Updates for one student
//! are applied under a single write lock in arrival order; students are
//! independent of each other.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::config::ProfileConfig;
use crate::engine::classifier::style_keywords;
use crate::engine::types::{
    AnalysisResult, EmotionRecord, Interaction, LearningStyle, PerformanceRecord, StudentProfile,
    StyleEvidence, TopicRetention,
};

pub struct StudentProfileStore {
    config: ProfileConfig,
    profiles: RwLock<HashMap<String, StudentProfile>>,
}

impl StudentProfileStore {
    pub fn new(config: ProfileConfig) -> Self {
        Self {
            config,
            profiles: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, student_id: &str) -> StudentProfile {
        let profiles = self.profiles.read().await;
        profiles
            .get(student_id)
            .cloned()
            .unwrap_or_else(|| StudentProfile::new(student_id))
    }

    pub async fn contains(&self, student_id: &str) -> bool {
        self.profiles.read().await.contains_key(student_id)
    }

    /// Installs a restored profile, only if the student is not already live.
    pub async fn restore(&self, profile: StudentProfile) {
        let mut profiles = self.profiles.write().await;
        profiles
            .entry(profile.student_id.clone())
            .or_insert(profile);
    }

    pub async fn all(&self) -> Vec<StudentProfile> {
        self.profiles.read().await.values().cloned().collect()
    }

    pub async fn update(
        &self,
        student_id: &str,
        interaction: &Interaction,
        analysis: &AnalysisResult,
    ) {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .entry(student_id.to_string())
            .or_insert_with(|| StudentProfile::new(student_id));

        profile.interaction_count += 1;
        profile.last_interaction = interaction.timestamp;

        profile.emotional_history.push(EmotionRecord {
            emotion: analysis.emotion.current,
            timestamp: interaction.timestamp,
        });
        trim_front(&mut profile.emotional_history, self.config.emotional_history_cap);

        profile.performance_history.push(PerformanceRecord {
            comprehension: analysis.comprehension.score,
            engagement: analysis.engagement.score,
            timestamp: interaction.timestamp,
        });
        trim_front(&mut profile.performance_history, self.config.performance_history_cap);

        if let Some(correct) = interaction.is_correct {
            profile.recent_correctness.push(correct);
            trim_front(&mut profile.recent_correctness, self.config.correctness_window);
        }

        profile.style_evidence.push(StyleEvidence {
            message: interaction.message.clone(),
            comprehension: analysis.comprehension.score,
        });
        trim_front(&mut profile.style_evidence, self.config.style_evidence_cap);

        if let Some(topic) = interaction.topic.as_deref() {
            let entry = profile
                .topic_retention
                .entry(topic.to_string())
                .or_insert(TopicRetention {
                    first_score: analysis.comprehension.score,
                    first_ts: interaction.timestamp,
                    last_score: analysis.comprehension.score,
                    last_ts: interaction.timestamp,
                });
            entry.last_score = analysis.comprehension.score;
            entry.last_ts = interaction.timestamp;
        }

        self.update_level(profile);

        if profile.interaction_count % self.config.style_recompute_interval == 0 {
            let style = recompute_style(&profile.style_evidence);
            if style != profile.learning_style {
                tracing::info!(
                    student_id = %student_id,
                    from = profile.learning_style.as_str(),
                    to = style.as_str(),
                    "learning style updated"
                );
            }
            profile.learning_style = style;
        }
    }

    /// Mean of (comprehension+engagement)/2 over the trailing window decides
    /// a half-step; the level never leaves [1, 5].
    fn update_level(&self, profile: &mut StudentProfile) {
        let window = self.config.level_window;
        if profile.performance_history.len() < window {
            return;
        }
        let mean: f64 = profile
            .performance_history
            .iter()
            .rev()
            .take(window)
            .map(|r| (r.comprehension + r.engagement) / 2.0)
            .sum::<f64>()
            / window as f64;

        if mean > self.config.level_up_threshold && profile.level < 5.0 {
            profile.level = (profile.level + 0.5).min(5.0);
        } else if mean < self.config.level_down_threshold && profile.level > 1.0 {
            profile.level = (profile.level - 0.5).max(1.0);
        }
    }
}

/// Scores the accumulated evidence against the four style keyword families.
/// Interactions answered with comprehension above 70 count double.
fn recompute_style(evidence: &[StyleEvidence]) -> LearningStyle {
    let families = [
        LearningStyle::Visual,
        LearningStyle::Auditory,
        LearningStyle::Kinesthetic,
        LearningStyle::Reading,
    ];
    let mut best = LearningStyle::default();
    let mut best_score = f64::MIN;

    for style in families {
        let set = style_keywords(style);
        let mut score = 0.0;
        for item in evidence {
            let lower = item.message.to_lowercase();
            let weight = if item.comprehension > 70.0 { 2.0 } else { 1.0 };
            score += set.score(&lower, 1.0, 1.0) * weight;
        }
        if score > best_score {
            best_score = score;
            best = style;
        }
    }

    if best_score <= 0.0 {
        LearningStyle::default()
    } else {
        best
    }
}

fn trim_front<T>(items: &mut Vec<T>, cap: usize) {
    if items.len() > cap {
        let excess = items.len() - cap;
        items.drain(0..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::analyzer::ResponseAnalyzer;
    use crate::config::{AnalyzerConfig, EngagementWeights};

    fn analyzed(message: &str, correct: Option<bool>, rt: Option<f64>) -> (Interaction, AnalysisResult) {
        let mut interaction = Interaction::new("s1", message);
        interaction.is_correct = correct;
        interaction.response_time_seconds = rt;
        let analyzer =
            ResponseAnalyzer::new(AnalyzerConfig::default(), EngagementWeights::default());
        let analysis = analyzer.analyze(&interaction, &StudentProfile::new("s1"));
        (interaction, analysis)
    }

    #[tokio::test]
    async fn update_appends_histories_in_order() {
        let store = StudentProfileStore::new(ProfileConfig::default());
        for i in 0..3 {
            let (mut interaction, analysis) = analyzed("tamam", None, None);
            interaction.timestamp = 1000 + i;
            store.update("s1", &interaction, &analysis).await;
        }
        let profile = store.get("s1").await;
        assert_eq!(profile.interaction_count, 3);
        assert_eq!(profile.emotional_history.len(), 3);
        let timestamps: Vec<i64> = profile.emotional_history.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![1000, 1001, 1002]);
    }

    #[tokio::test]
    async fn level_steps_by_half_and_stays_in_bounds() {
        let store = StudentProfileStore::new(ProfileConfig::default());
        let analyzer =
            ResponseAnalyzer::new(AnalyzerConfig::default(), EngagementWeights::default());
        // Fast, correct, enthusiastic replies push the window mean above 80.
        for _ in 0..40 {
            let mut interaction = Interaction::new(
                "s1",
                format!("anladım çok kolay! 😊 peki sırada ne var? {}", "harika ".repeat(16)),
            );
            interaction.is_correct = Some(true);
            interaction.response_time_seconds = Some(3.0);
            interaction.is_voluntary = true;
            interaction.session_interaction_count = 10;
            let analysis = analyzer.analyze(&interaction, &store.get("s1").await);
            let before = store.get("s1").await.level;
            store.update("s1", &interaction, &analysis).await;
            let after = store.get("s1").await.level;
            let step = (after - before).abs();
            assert!(step == 0.0 || (step - 0.5).abs() < 1e-9);
            assert!((1.0..=5.0).contains(&after));
        }
        assert_eq!(store.get("s1").await.level, 5.0);
    }

    #[tokio::test]
    async fn level_decreases_on_poor_performance() {
        let store = StudentProfileStore::new(ProfileConfig::default());
        for _ in 0..40 {
            let (interaction, analysis) = analyzed("bilmiyorum", Some(false), Some(200.0));
            store.update("s1", &interaction, &analysis).await;
            assert!(store.get("s1").await.level >= 1.0);
        }
        assert_eq!(store.get("s1").await.level, 1.0);
    }

    #[tokio::test]
    async fn style_recomputed_only_on_interval() {
        let store = StudentProfileStore::new(ProfileConfig::default());
        // 19 visual-heavy messages must not change the default style yet.
        for _ in 0..19 {
            let (interaction, analysis) = analyzed("bana resim ve şekil göster", Some(true), Some(3.0));
            store.update("s1", &interaction, &analysis).await;
        }
        assert_eq!(store.get("s1").await.learning_style, LearningStyle::Reading);

        let (interaction, analysis) = analyzed("görsel olarak bak", Some(true), Some(3.0));
        store.update("s1", &interaction, &analysis).await;
        assert_eq!(store.get("s1").await.learning_style, LearningStyle::Visual);
    }

    #[tokio::test]
    async fn students_are_independent() {
        let store = StudentProfileStore::new(ProfileConfig::default());
        let (interaction, analysis) = analyzed("tamam", Some(true), None);
        store.update("a", &interaction, &analysis).await;
        store.update("a", &interaction, &analysis).await;
        store.update("b", &interaction, &analysis).await;
        assert_eq!(store.get("a").await.interaction_count, 2);
        assert_eq!(store.get("b").await.interaction_count, 1);
    }

    #[tokio::test]
    async fn topic_retention_tracks_first_and_last() {
        let store = StudentProfileStore::new(ProfileConfig::default());
        let (mut first, first_analysis) = analyzed("bilmiyorum zor", Some(false), Some(150.0));
        first.topic = Some("kesirler".to_string());
        store.update("s1", &first, &first_analysis).await;

        let (mut second, second_analysis) = analyzed("anladım kolay", Some(true), Some(4.0));
        second.topic = Some("kesirler".to_string());
        second.timestamp = first.timestamp + 1;
        store.update("s1", &second, &second_analysis).await;

        let profile = store.get("s1").await;
        let retention = profile.topic_retention.get("kesirler").unwrap();
        assert!(retention.first_score < retention.last_score);
    }
}
