//! Maps the current analysis (and mined patterns) to actionable
//! recommendations, and caches the best historically successful response per
//! teaching situation. The cache is the engine's explicit feedback loop:
//! responses that worked strengthen future answers for the same situation.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::StrategyConfig;
use crate::engine::types::{
    AnalysisResult, ComprehensionLevel, Emotion, PatternSet, Recommendation, RecommendationKind,
    ScoredResponse, StrategyRecord, TeachingMethod,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestResponse {
    pub text: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MethodStats {
    pub samples: usize,
    pub mean_score: f64,
}

pub struct StrategyAdvisor {
    config: StrategyConfig,
    records: RwLock<HashMap<String, StrategyRecord>>,
    method_stats: RwLock<HashMap<TeachingMethod, MethodStats>>,
}

impl StrategyAdvisor {
    pub fn new(config: StrategyConfig) -> Self {
        Self {
            config,
            records: RwLock::new(HashMap::new()),
            method_stats: RwLock::new(HashMap::new()),
        }
    }

    /// Static rule table over the current analysis, enriched with mined
    /// patterns where they apply. Sorted by ascending priority.
    pub fn recommend(&self, analysis: &AnalysisResult, patterns: &PatternSet) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        if analysis.emotion.current == Emotion::Frustrated {
            recommendations.push(Recommendation {
                kind: RecommendationKind::EmotionalSupport,
                priority: 1,
                rationale: "Öğrenci bunalmış görünüyor; önce moral ver, sonra devam et."
                    .to_string(),
                difficulty_delta: None,
            });
        }

        if analysis.comprehension.score < self.config.low_comprehension_threshold {
            recommendations.push(Recommendation {
                kind: RecommendationKind::Simplify,
                priority: 2,
                rationale: format!(
                    "Kavrama puanı {:.0}; anlatımı sadeleştir.",
                    analysis.comprehension.score
                ),
                difficulty_delta: None,
            });
            recommendations.push(Recommendation {
                kind: RecommendationKind::AddVisual,
                priority: 3,
                rationale: "Düşük kavramada görsel destek anlamayı hızlandırır.".to_string(),
                difficulty_delta: None,
            });
        }

        if analysis.engagement.score < self.config.low_engagement_threshold {
            recommendations.push(Recommendation {
                kind: RecommendationKind::AddGamification,
                priority: 4,
                rationale: format!(
                    "Katılım puanı {:.0}; puan/rozet gibi oyun ögeleri ekle.",
                    analysis.engagement.score
                ),
                difficulty_delta: None,
            });
        }

        if !analysis.difficulty_match.is_optimal {
            let delta = analysis.difficulty_match.adjustment;
            let direction = if delta > 0.0 { "artır" } else { "azalt" };
            let mut rationale = format!("Soru zorluğunu {direction} ({delta:+.1}).");
            if let Some(trigger) = patterns.emotional_transitions.frustration_trigger.as_ref() {
                if delta < 0.0 {
                    rationale.push_str(&format!(
                        " \"{}\" bağlamı sık sık hayal kırıklığına yol açıyor.",
                        trigger.0
                    ));
                }
            }
            recommendations.push(Recommendation {
                kind: RecommendationKind::AdjustDifficulty,
                priority: 5,
                rationale,
                difficulty_delta: Some(delta),
            });
        }

        recommendations.sort_by_key(|r| r.priority);
        recommendations
    }

    /// Cached best response for a teaching situation, if one has been
    /// recorded; callers fall back to their rule-table text otherwise.
    pub fn best_response(
        &self,
        context: &str,
        emotion: Emotion,
        level: ComprehensionLevel,
    ) -> Option<BestResponse> {
        let records = self.records.read();
        let record = records.get(&situation_key(context, emotion, level))?;
        record.best_response.as_ref().map(|r| BestResponse {
            text: r.text.clone(),
            confidence: Confidence::High,
        })
    }

    /// Like `best_response`, but falls back to the caller's rule-table text
    /// at low confidence when the situation has no history yet.
    pub fn best_response_or(
        &self,
        context: &str,
        emotion: Emotion,
        level: ComprehensionLevel,
        fallback: &str,
    ) -> BestResponse {
        self.best_response(context, emotion, level)
            .unwrap_or_else(|| BestResponse {
                text: fallback.to_string(),
                confidence: Confidence::Low,
            })
    }

    /// Whether a scored reply counts as a successful outcome for the
    /// response that preceded it.
    pub fn is_success(&self, comprehension_score: f64, emotion: Emotion) -> bool {
        comprehension_score >= self.config.success_threshold && emotion != Emotion::Frustrated
    }

    /// Files the tutor's response under the situation it was used in, on the
    /// success/failure side given how the student's next reply scored.
    pub fn record_outcome(
        &self,
        context: &str,
        emotion: Emotion,
        level: ComprehensionLevel,
        response_text: &str,
        score: f64,
        success: bool,
    ) {
        let score = score.clamp(0.0, 100.0);
        let entry = ScoredResponse {
            text: response_text.to_string(),
            score,
            ts: chrono::Utc::now().timestamp_millis(),
        };

        let mut records = self.records.write();
        let record = records
            .entry(situation_key(context, emotion, level))
            .or_default();
        if success {
            let is_new_best = record
                .best_response
                .as_ref()
                .map(|best| entry.score > best.score)
                .unwrap_or(true);
            if is_new_best {
                record.best_response = Some(entry.clone());
            }
            record.successful_responses.push(entry);
        } else {
            record.failed_responses.push(entry);
        }
    }

    /// Per-method effectiveness bookkeeping from the analyzer's score.
    pub fn record_method_effectiveness(&self, method: TeachingMethod, score: f64) {
        let score = score.clamp(0.0, 100.0);
        let mut stats = self.method_stats.write();
        let entry = stats.entry(method).or_default();
        entry.mean_score =
            (entry.mean_score * entry.samples as f64 + score) / (entry.samples + 1) as f64;
        entry.samples += 1;
    }

    pub fn method_stats(&self) -> HashMap<TeachingMethod, MethodStats> {
        self.method_stats.read().clone()
    }
}

fn situation_key(context: &str, emotion: Emotion, level: ComprehensionLevel) -> String {
    format!("{}|{}|{}", context, emotion.as_str(), level.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalyzerConfig, EngagementWeights};
    use crate::engine::analyzer::ResponseAnalyzer;
    use crate::engine::types::{Interaction, StudentProfile};

    fn advisor() -> StrategyAdvisor {
        StrategyAdvisor::new(StrategyConfig::default())
    }

    fn analysis_for(message: &str) -> AnalysisResult {
        let analyzer =
            ResponseAnalyzer::new(AnalyzerConfig::default(), EngagementWeights::default());
        analyzer.analyze(&Interaction::new("s1", message), &StudentProfile::new("s1"))
    }

    #[test]
    fn frustration_yields_emotional_support_first() {
        let analysis = analysis_for("bıktım artık yapamıyorum 😤");
        let recommendations = advisor().recommend(&analysis, &PatternSet::default());
        assert_eq!(
            recommendations[0].kind,
            RecommendationKind::EmotionalSupport
        );
    }

    #[test]
    fn low_comprehension_yields_simplify_and_visual() {
        let mut analysis = analysis_for("bilmiyorum");
        analysis.comprehension.score = 20.0;
        let recommendations = advisor().recommend(&analysis, &PatternSet::default());
        let kinds: Vec<RecommendationKind> =
            recommendations.iter().map(|r| r.kind).collect();
        assert!(kinds.contains(&RecommendationKind::Simplify));
        assert!(kinds.contains(&RecommendationKind::AddVisual));
    }

    #[test]
    fn best_response_tracks_highest_scoring_success() {
        let advisor = advisor();
        let key = ("quiz", Emotion::Confused, ComprehensionLevel::Low);
        assert!(advisor.best_response(key.0, key.1, key.2).is_none());

        advisor.record_outcome(key.0, key.1, key.2, "ilk açıklama", 65.0, true);
        advisor.record_outcome(key.0, key.1, key.2, "daha iyi açıklama", 90.0, true);
        advisor.record_outcome(key.0, key.1, key.2, "başarısız açıklama", 10.0, false);

        let best = advisor.best_response(key.0, key.1, key.2).unwrap();
        assert_eq!(best.text, "daha iyi açıklama");
        assert_eq!(best.confidence, Confidence::High);
    }

    #[test]
    fn failures_never_become_best() {
        let advisor = advisor();
        advisor.record_outcome("lesson", Emotion::Neutral, ComprehensionLevel::Medium, "kötü", 10.0, false);
        assert!(advisor
            .best_response("lesson", Emotion::Neutral, ComprehensionLevel::Medium)
            .is_none());
    }

    #[test]
    fn situations_are_isolated() {
        let advisor = advisor();
        advisor.record_outcome("quiz", Emotion::Happy, ComprehensionLevel::High, "aferin", 95.0, true);
        assert!(advisor
            .best_response("quiz", Emotion::Confused, ComprehensionLevel::High)
            .is_none());
        assert!(advisor
            .best_response("quiz", Emotion::Happy, ComprehensionLevel::High)
            .is_some());
    }

    #[test]
    fn unknown_situation_falls_back_at_low_confidence() {
        let advisor = advisor();
        let best = advisor.best_response_or(
            "lesson",
            Emotion::Bored,
            ComprehensionLevel::Medium,
            "yerel şablon",
        );
        assert_eq!(best.text, "yerel şablon");
        assert_eq!(best.confidence, Confidence::Low);
    }

    #[test]
    fn success_needs_comprehension_and_calm() {
        let advisor = advisor();
        assert!(advisor.is_success(60.0, Emotion::Neutral));
        assert!(!advisor.is_success(59.9, Emotion::Neutral));
        assert!(!advisor.is_success(90.0, Emotion::Frustrated));
    }

    #[test]
    fn method_stats_running_mean() {
        let advisor = advisor();
        advisor.record_method_effectiveness(TeachingMethod::Visual, 80.0);
        advisor.record_method_effectiveness(TeachingMethod::Visual, 60.0);
        let stats = advisor.method_stats();
        let visual = stats.get(&TeachingMethod::Visual).unwrap();
        assert_eq!(visual.samples, 2);
        assert!((visual.mean_score - 70.0).abs() < 1e-9);
    }
}
