//! Tracing bootstrap for the embedding application: stdout always, plus a
//! daily-rolling file layer when `LoggingConfig` asks for one.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "tutor.log";

/// Keeps the non-blocking file writer alive; drop it on shutdown so buffered
/// lines reach disk.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Installs the global subscriber described by `config`. Later calls are
/// no-ops against the first subscriber, so embedding applications (and tests)
/// may call this unconditionally. Returns a guard only when file output is
/// active.
pub fn init_tracing(config: &LoggingConfig) -> Option<FileLogGuard> {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout = fmt::layer().with_target(true);
    let base = tracing_subscriber::registry().with(filter).with(stdout);

    if !config.file_output {
        let _ = base.try_init();
        return None;
    }
    if let Err(err) = std::fs::create_dir_all(&config.dir) {
        eprintln!("file logging disabled, cannot create {}: {err}", config.dir);
        let _ = base.try_init();
        return None;
    }

    let appender = RollingFileAppender::new(Rotation::DAILY, &config.dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);
    let _ = base.with(file).try_init();
    Some(FileLogGuard { _guard: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_output_creates_the_log_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("logs");
        let config = LoggingConfig {
            level: "debug".to_string(),
            dir: dir.display().to_string(),
            file_output: true,
        };
        let guard = init_tracing(&config);
        assert!(guard.is_some());
        assert!(dir.is_dir());
        tracing::info!("log pipeline check");
    }

    #[test]
    fn reinitialization_keeps_the_first_subscriber() {
        init_tracing(&LoggingConfig::default());
        // Must neither panic nor return a guard without file output.
        assert!(init_tracing(&LoggingConfig::default()).is_none());
    }
}
