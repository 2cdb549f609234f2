//! Periodic mining of the recent interaction window.
//!
//! Every structure here is rebuilt from scratch on each pass and swapped in
//! atomically; the miner holds no state of its own between passes, which is
//! what makes reruns over an unchanged window idempotent.

use std::collections::{BTreeMap, HashMap};

use crate::config::MiningConfig;
use crate::engine::classifier::remediation_for;
use crate::engine::types::{
    Emotion, EmotionalTransitionPattern, Interaction, MisconceptionPattern, PatternSet,
    ProductiveHour, TopicTrend, TrendClass,
};
use chrono::{TimeZone, Timelike, Utc};

pub struct PatternMiner {
    config: MiningConfig,
}

impl PatternMiner {
    pub fn new(config: MiningConfig) -> Self {
        Self { config }
    }

    /// One full pass over the window. The caller is responsible for swapping
    /// the result into the shared cache.
    pub fn mine(&self, window: &[Interaction]) -> PatternSet {
        PatternSet {
            misconceptions: self.mine_misconceptions(window),
            emotional_transitions: self.mine_emotional_transitions(window),
            productive_hours: self.mine_productive_hours(window),
            topic_trends: self.mine_topic_trends(window),
            mined_at: Utc::now().timestamp_millis(),
        }
    }

    /// Groups incorrect answers by topic and extracts the significant words
    /// shared by at least half of the error messages.
    fn mine_misconceptions(&self, window: &[Interaction]) -> Vec<MisconceptionPattern> {
        let mut errors_by_topic: BTreeMap<&str, Vec<&Interaction>> = BTreeMap::new();
        for interaction in window {
            if interaction.is_correct == Some(false) {
                if let Some(topic) = interaction.topic.as_deref() {
                    errors_by_topic.entry(topic).or_default().push(interaction);
                }
            }
        }

        let mut patterns = Vec::new();
        for (topic, errors) in errors_by_topic {
            if errors.len() < self.config.misconception_min_errors {
                continue;
            }

            let mut word_counts: BTreeMap<String, usize> = BTreeMap::new();
            for error in &errors {
                let mut seen = std::collections::HashSet::new();
                for word in error.message.to_lowercase().split_whitespace() {
                    let word = word.trim_matches(|c: char| !c.is_alphanumeric());
                    if word.chars().count() >= self.config.misconception_min_word_len
                        && seen.insert(word.to_string())
                    {
                        *word_counts.entry(word.to_string()).or_insert(0) += 1;
                    }
                }
            }

            let threshold =
                (errors.len() as f64 * self.config.misconception_word_share).ceil() as usize;
            let mut common_words: Vec<(String, usize)> = word_counts
                .into_iter()
                .filter(|(_, count)| *count >= threshold)
                .collect();
            common_words.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            let common_words: Vec<String> =
                common_words.into_iter().take(5).map(|(w, _)| w).collect();

            if common_words.is_empty() {
                continue;
            }

            let suggestion = remediation_for(&common_words);
            patterns.push(MisconceptionPattern {
                topic: topic.to_string(),
                error_count: errors.len(),
                common_words,
                suggestion,
            });
        }
        patterns
    }

    /// Builds (previous → current) emotion pairs per student and finds the
    /// context most often immediately preceding a slide into frustration.
    fn mine_emotional_transitions(&self, window: &[Interaction]) -> EmotionalTransitionPattern {
        let mut by_student: BTreeMap<&str, Vec<&Interaction>> = BTreeMap::new();
        for interaction in window {
            if interaction.analysis.is_some() {
                by_student
                    .entry(interaction.student_id.as_str())
                    .or_default()
                    .push(interaction);
            }
        }

        let mut transitions: HashMap<String, usize> = HashMap::new();
        let mut trigger_counts: BTreeMap<String, usize> = BTreeMap::new();
        let trigger_window_ms = self.config.frustration_trigger_window_mins * 60_000;

        for list in by_student.values() {
            for pair in list.windows(2) {
                let (prev, curr) = (pair[0], pair[1]);
                let prev_emotion = emotion_of(prev);
                let curr_emotion = emotion_of(curr);
                let key = format!("{}_to_{}", prev_emotion.as_str(), curr_emotion.as_str());
                *transitions.entry(key).or_insert(0) += 1;

                if curr_emotion == Emotion::Frustrated
                    && prev_emotion != Emotion::Frustrated
                    && curr.timestamp - prev.timestamp <= trigger_window_ms
                {
                    *trigger_counts.entry(prev.context.clone()).or_insert(0) += 1;
                }
            }
        }

        let frustration_trigger = trigger_counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
            .filter(|(_, count)| *count > 0);

        EmotionalTransitionPattern {
            transitions,
            frustration_trigger,
        }
    }

    /// Buckets comprehension by hour of day, keeps the top N by mean.
    fn mine_productive_hours(&self, window: &[Interaction]) -> Vec<ProductiveHour> {
        let mut buckets: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
        for interaction in window {
            let Some(analysis) = interaction.analysis.as_ref() else {
                continue;
            };
            let Some(ts) = Utc.timestamp_millis_opt(interaction.timestamp).single() else {
                continue;
            };
            let entry = buckets.entry(ts.hour()).or_insert((0.0, 0));
            entry.0 += analysis.comprehension.score;
            entry.1 += 1;
        }

        let mut hours: Vec<ProductiveHour> = buckets
            .into_iter()
            .map(|(hour, (sum, count))| ProductiveHour {
                hour,
                mean_comprehension: sum / count as f64,
                samples: count,
            })
            .collect();
        hours.sort_by(|a, b| {
            b.mean_comprehension
                .partial_cmp(&a.mean_comprehension)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.hour.cmp(&b.hour))
        });
        hours.truncate(self.config.productive_hours_kept);
        hours
    }

    /// last − first comprehension per topic, over topics with enough samples.
    fn mine_topic_trends(&self, window: &[Interaction]) -> Vec<TopicTrend> {
        let mut by_topic: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for interaction in window {
            if let (Some(topic), Some(analysis)) =
                (interaction.topic.as_deref(), interaction.analysis.as_ref())
            {
                by_topic
                    .entry(topic)
                    .or_default()
                    .push(analysis.comprehension.score);
            }
        }

        by_topic
            .into_iter()
            .filter(|(_, scores)| scores.len() >= self.config.trend_min_interactions)
            .map(|(topic, scores)| {
                let delta = scores[scores.len() - 1] - scores[0];
                let class = if delta > self.config.trend_threshold {
                    TrendClass::Improving
                } else if delta < -self.config.trend_threshold {
                    TrendClass::Declining
                } else {
                    TrendClass::Stable
                };
                TopicTrend {
                    topic: topic.to_string(),
                    delta,
                    class,
                }
            })
            .collect()
    }
}

fn emotion_of(interaction: &Interaction) -> Emotion {
    interaction
        .analysis
        .as_ref()
        .map(|a| a.emotion.current)
        .unwrap_or_default()
}
