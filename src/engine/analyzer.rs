//! Multi-dimensional scoring of one raw interaction.
//!
//! `analyze` is a pure function of the interaction plus a read-only view of
//! the student's profile; it never mutates state and never fails. Missing
//! optional fields contribute nothing to their term.

use std::collections::HashMap;

use crate::config::{AnalyzerConfig, EngagementWeights};
use crate::engine::classifier::{
    emotion_keywords, has_expressive_symbol, HIGH_COMPREHENSION_MARKERS,
    LOW_COMPREHENSION_MARKERS,
};
use crate::engine::types::{
    AnalysisResult, ComprehensionAnalysis, ComprehensionLevel, DifficultyAdjustment,
    DifficultyMatch, Emotion, EmotionAnalysis, EmotionTrend, EngagementAnalysis, Interaction,
    StudentProfile, TeachingEffectiveness,
};

pub struct ResponseAnalyzer {
    config: AnalyzerConfig,
    engagement: EngagementWeights,
}

impl ResponseAnalyzer {
    pub fn new(config: AnalyzerConfig, engagement: EngagementWeights) -> Self {
        Self { config, engagement }
    }

    pub fn analyze(&self, interaction: &Interaction, profile: &StudentProfile) -> AnalysisResult {
        let emotion = self.score_emotion(interaction, profile);
        let comprehension = self.score_comprehension(interaction);
        let engagement = self.score_engagement(interaction);
        let difficulty_match = self.match_difficulty(interaction, profile);
        let teaching_effectiveness = self.score_teaching_method(
            interaction,
            profile,
            comprehension.score,
            engagement.score,
        );

        AnalysisResult {
            emotion,
            comprehension,
            engagement,
            difficulty_match,
            teaching_effectiveness,
        }
    }

    fn score_emotion(&self, interaction: &Interaction, profile: &StudentProfile) -> EmotionAnalysis {
        let lower = interaction.message.to_lowercase();
        let mut scores: HashMap<Emotion, f64> = HashMap::new();

        let mut current = Emotion::Neutral;
        let mut best = f64::MIN;
        // Iteration over ALL fixes the tie-break: first declared wins.
        for emotion in Emotion::ALL {
            let score = emotion_keywords(emotion).score(
                &lower,
                self.config.keyword_weight,
                self.config.symbol_weight,
            );
            scores.insert(emotion, score);
            if score > best {
                best = score;
                current = emotion;
            }
        }
        if best <= 0.0 {
            current = Emotion::Neutral;
        }

        EmotionAnalysis {
            current,
            scores,
            trend: self.emotion_trend(profile),
        }
    }

    fn emotion_trend(&self, profile: &StudentProfile) -> EmotionTrend {
        let window = self.config.trend_window;
        let history = &profile.emotional_history;
        if history.len() < window {
            return EmotionTrend::Stable;
        }
        let positive = history
            .iter()
            .rev()
            .take(window)
            .filter(|r| r.emotion.is_positive())
            .count();
        if positive >= window - 1 {
            EmotionTrend::Improving
        } else if positive <= 1 {
            EmotionTrend::Declining
        } else {
            EmotionTrend::Stable
        }
    }

    fn score_comprehension(&self, interaction: &Interaction) -> ComprehensionAnalysis {
        let mut score = 50.0;
        let mut factors = Vec::new();

        if let Some(rt) = interaction.response_time_seconds {
            let fast = self.config.fast_reply_secs;
            let slow = self.config.slow_reply_secs;
            let timing = if rt <= fast {
                20.0
            } else if rt >= slow {
                -20.0
            } else {
                // Linear from +20 at the fast bound to -20 at the slow bound.
                20.0 - 40.0 * (rt - fast) / (slow - fast)
            };
            score += timing;
            factors.push(format!("responseTime:{timing:+.0}"));
        }

        if let Some(correct) = interaction.is_correct {
            let delta = if correct {
                self.config.correctness_bonus
            } else {
                -self.config.correctness_bonus
            };
            score += delta;
            factors.push(format!("correctness:{delta:+.0}"));
        }

        if let Some(hints) = interaction.hints_used {
            if hints > 0 {
                let penalty = hints as f64 * self.config.hint_penalty;
                score -= penalty;
                factors.push(format!("hints:-{penalty:.0}"));
            }
        }

        let lower = interaction.message.to_lowercase();
        if HIGH_COMPREHENSION_MARKERS.matches(&lower) {
            score += self.config.phrase_marker_bonus;
            factors.push(format!("highMarkers:+{:.0}", self.config.phrase_marker_bonus));
        }
        if LOW_COMPREHENSION_MARKERS.matches(&lower) {
            score -= self.config.phrase_marker_bonus;
            factors.push(format!("lowMarkers:-{:.0}", self.config.phrase_marker_bonus));
        }

        let score = score.clamp(0.0, 100.0);
        ComprehensionAnalysis {
            score,
            level: ComprehensionLevel::from_score(score),
            factors,
        }
    }

    fn score_engagement(&self, interaction: &Interaction) -> EngagementAnalysis {
        let w = &self.engagement;
        let lower = interaction.message.to_lowercase();
        let mut sum = 0.0;
        let mut factors = Vec::new();

        let length_ratio =
            (interaction.message.chars().count() as f64 / w.message_length_cap as f64).min(1.0);
        sum += w.message_length * length_ratio;
        factors.push(format!("length:{:.2}", length_ratio));

        if lower.contains('?') {
            sum += w.question_mark;
            factors.push("question".to_string());
        }

        if has_expressive_symbol(&lower) {
            sum += w.expressive_symbols;
            factors.push("expressive".to_string());
        }

        if let Some(rt) = interaction.response_time_seconds {
            if rt <= self.config.fast_reply_secs {
                sum += w.fast_response;
                factors.push("fastResponse".to_string());
            }
        }

        let activity_ratio = (interaction.session_interaction_count as f64
            / w.session_activity_cap as f64)
            .min(1.0);
        sum += w.session_activity * activity_ratio;
        factors.push(format!("activity:{:.2}", activity_ratio));

        if interaction.is_voluntary {
            sum += w.voluntary;
            factors.push("voluntary".to_string());
        }

        let max_sum = w.message_length
            + w.question_mark
            + w.expressive_symbols
            + w.fast_response
            + w.session_activity
            + w.voluntary;
        let score = if max_sum > 0.0 {
            (sum / max_sum * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        EngagementAnalysis { score, factors }
    }

    fn match_difficulty(
        &self,
        interaction: &Interaction,
        profile: &StudentProfile,
    ) -> DifficultyMatch {
        let difficulty = interaction.question_difficulty.unwrap_or(profile.level);
        let gap = difficulty - profile.level;

        let mut suggestion = if gap > 1.0 {
            Some(DifficultyAdjustment::Decrease)
        } else if gap < -1.0 {
            Some(DifficultyAdjustment::Increase)
        } else {
            None
        };

        // The rolling success rate overrides the static gap reading.
        let success_rate = profile.success_rate();
        if success_rate > 0.8 && gap >= 0.0 {
            suggestion = Some(DifficultyAdjustment::Increase);
        } else if success_rate < 0.4 && gap <= 0.0 {
            suggestion = Some(DifficultyAdjustment::Decrease);
        }

        let adjustment = match suggestion {
            Some(DifficultyAdjustment::Increase) => 0.5,
            Some(DifficultyAdjustment::Decrease) => -0.5,
            None => 0.0,
        };

        DifficultyMatch {
            is_optimal: suggestion.is_none(),
            adjustment,
            suggestion,
        }
    }

    fn score_teaching_method(
        &self,
        interaction: &Interaction,
        profile: &StudentProfile,
        comprehension: f64,
        engagement: f64,
    ) -> TeachingEffectiveness {
        let style_match = match interaction.teaching_method {
            Some(method) if method.matches_style(profile.learning_style) => 100.0,
            Some(_) => 50.0,
            // No declared method reads as neutral.
            None => 75.0,
        };

        let retention = interaction
            .topic
            .as_deref()
            .and_then(|t| profile.retention_estimate(t, interaction.timestamp))
            .map(|r| (r * 100.0).clamp(0.0, 100.0))
            .unwrap_or(75.0);

        let score = ((style_match + comprehension + engagement + retention) / 4.0)
            .clamp(0.0, 100.0);

        let recommendation = if score >= 70.0 {
            "Mevcut yöntem iyi çalışıyor, devam et.".to_string()
        } else if style_match <= 50.0 {
            format!(
                "Öğrencinin {} stiline uygun materyale geç.",
                profile.learning_style.as_str()
            )
        } else {
            "Yöntemi sadeleştir ve daha fazla örnekle destekle.".to_string()
        };

        TeachingEffectiveness {
            score,
            recommendation,
        }
    }
}
