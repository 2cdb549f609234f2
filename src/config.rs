use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Weight added per matched keyword in emotion scoring.
    pub keyword_weight: f64,
    /// Weight added per matched expressive symbol (larger than keywords).
    pub symbol_weight: f64,
    /// Response-time bounds for the comprehension timing term, seconds.
    pub fast_reply_secs: f64,
    pub slow_reply_secs: f64,
    pub correctness_bonus: f64,
    pub hint_penalty: f64,
    pub phrase_marker_bonus: f64,
    /// Emotions counted back for the 3-point trend.
    pub trend_window: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            keyword_weight: 2.0,
            symbol_weight: 3.0,
            fast_reply_secs: 10.0,
            slow_reply_secs: 120.0,
            correctness_bonus: 30.0,
            hint_penalty: 10.0,
            phrase_marker_bonus: 15.0,
            trend_window: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementWeights {
    pub message_length: f64,
    pub question_mark: f64,
    pub expressive_symbols: f64,
    pub fast_response: f64,
    pub session_activity: f64,
    pub voluntary: f64,
    /// Session interaction count at which the activity term saturates.
    pub session_activity_cap: i32,
    /// Message length (chars) at which the length term saturates.
    pub message_length_cap: usize,
}

impl Default for EngagementWeights {
    fn default() -> Self {
        Self {
            message_length: 20.0,
            question_mark: 15.0,
            expressive_symbols: 15.0,
            fast_response: 20.0,
            session_activity: 15.0,
            voluntary: 15.0,
            session_activity_cap: 10,
            message_length_cap: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Learning style is recomputed every this many updates, not per write.
    pub style_recompute_interval: i32,
    /// Trailing performance records evaluated for a level step.
    pub level_window: usize,
    pub level_up_threshold: f64,
    pub level_down_threshold: f64,
    pub emotional_history_cap: usize,
    pub performance_history_cap: usize,
    pub style_evidence_cap: usize,
    pub correctness_window: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            style_recompute_interval: 20,
            level_window: 10,
            level_up_threshold: 80.0,
            level_down_threshold: 40.0,
            emotional_history_cap: 100,
            performance_history_cap: 100,
            style_evidence_cap: 200,
            correctness_window: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    /// A mining pass runs every this many newly recorded interactions.
    pub mining_interval: i32,
    /// Most-recent interactions scanned per pass.
    pub window_size: usize,
    pub misconception_min_errors: usize,
    /// Significant words must appear in at least this share of error messages.
    pub misconception_word_share: f64,
    pub misconception_min_word_len: usize,
    /// Window for attributing a frustration transition to a context, minutes.
    pub frustration_trigger_window_mins: i64,
    pub productive_hours_kept: usize,
    pub trend_min_interactions: usize,
    pub trend_threshold: f64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            mining_interval: 10,
            window_size: 100,
            misconception_min_errors: 5,
            misconception_word_share: 0.5,
            misconception_min_word_len: 4,
            frustration_trigger_window_mins: 10,
            productive_hours_kept: 3,
            trend_min_interactions: 3,
            trend_threshold: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub low_comprehension_threshold: f64,
    pub low_engagement_threshold: f64,
    /// Comprehension at or above this marks an interaction successful for
    /// response-cache bookkeeping.
    pub success_threshold: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            low_comprehension_threshold: 40.0,
            low_engagement_threshold: 50.0,
            success_threshold: 60.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    pub data_dir: String,
    /// Six-field cron expression for the snapshot flush job.
    pub flush_schedule: String,
    /// Interaction log entries included in each student snapshot.
    pub log_tail_len: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data/students".to_string(),
            flush_schedule: "*/30 * * * * *".to_string(),
            log_tail_len: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
    pub max_retries: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/v1/tutor".to_string(),
            api_key: None,
            model: "tutor-default".to_string(),
            timeout_ms: 8_000,
            max_retries: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive string, e.g. "info" or "tutor_engine=debug".
    pub level: String,
    /// Directory for the daily-rolling log file when file output is on.
    pub dir: String,
    pub file_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "./logs".to_string(),
            file_output: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorConfig {
    pub analyzer: AnalyzerConfig,
    pub engagement: EngagementWeights,
    pub profile: ProfileConfig,
    pub mining: MiningConfig,
    pub strategy: StrategyConfig,
    pub persistence: PersistenceConfig,
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
    /// Global interaction log bound; older entries are trimmed, never rewritten.
    pub log_cap: usize,
    /// Lesson sessions idle longer than this are discarded.
    pub session_max_idle_ms: i64,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerConfig::default(),
            engagement: EngagementWeights::default(),
            profile: ProfileConfig::default(),
            mining: MiningConfig::default(),
            strategy: StrategyConfig::default(),
            persistence: PersistenceConfig::default(),
            gateway: GatewayConfig::default(),
            logging: LoggingConfig::default(),
            log_cap: 500,
            session_max_idle_ms: 30 * 60 * 1000,
        }
    }
}

impl TutorConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("TUTOR_DATA_DIR") {
            if !val.trim().is_empty() {
                config.persistence.data_dir = val;
            }
        }
        if let Ok(val) = std::env::var("TUTOR_FLUSH_SCHEDULE") {
            if !val.trim().is_empty() {
                config.persistence.flush_schedule = val;
            }
        }
        if let Ok(val) = std::env::var("TUTOR_MINING_INTERVAL") {
            if let Ok(parsed) = val.parse::<i32>() {
                // Zero or negative would stall (or break) the mining cadence.
                config.mining.mining_interval = parsed.max(1);
            }
        }
        if let Ok(val) = std::env::var("TUTOR_GATEWAY_ENDPOINT") {
            if !val.trim().is_empty() {
                config.gateway.endpoint = val;
            }
        }
        if let Ok(val) = std::env::var("TUTOR_GATEWAY_API_KEY") {
            if !val.trim().is_empty() {
                config.gateway.api_key = Some(val);
            }
        }
        if let Ok(val) = std::env::var("TUTOR_GATEWAY_TIMEOUT_MS") {
            if let Ok(parsed) = val.parse() {
                config.gateway.timeout_ms = parsed;
            }
        }
        if let Ok(val) = std::env::var("TUTOR_LOG_LEVEL") {
            if !val.trim().is_empty() {
                config.logging.level = val;
            }
        }
        if let Ok(val) = std::env::var("TUTOR_LOG_DIR") {
            if !val.trim().is_empty() {
                config.logging.dir = val;
            }
        }
        if let Ok(val) = std::env::var("TUTOR_ENABLE_FILE_LOGS") {
            config.logging.file_output = val == "true" || val == "1";
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let config = TutorConfig::default();
        assert!(config.analyzer.fast_reply_secs < config.analyzer.slow_reply_secs);
        assert!(config.profile.level_down_threshold < config.profile.level_up_threshold);
        assert!(config.mining.misconception_word_share > 0.0);
        assert!(config.mining.misconception_word_share <= 1.0);
    }

    #[test]
    fn mining_interval_override_is_clamped_to_one() {
        std::env::set_var("TUTOR_MINING_INTERVAL", "0");
        assert_eq!(TutorConfig::from_env().mining.mining_interval, 1);
        std::env::set_var("TUTOR_MINING_INTERVAL", "-3");
        assert_eq!(TutorConfig::from_env().mining.mining_interval, 1);
        std::env::set_var("TUTOR_MINING_INTERVAL", "25");
        assert_eq!(TutorConfig::from_env().mining.mining_interval, 25);
        std::env::remove_var("TUTOR_MINING_INTERVAL");
    }

    #[test]
    fn engagement_weights_sum_positive() {
        let w = EngagementWeights::default();
        let total = w.message_length
            + w.question_mark
            + w.expressive_symbols
            + w.fast_response
            + w.session_activity
            + w.voluntary;
        assert!(total > 0.0);
    }
}
