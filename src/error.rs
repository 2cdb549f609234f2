use thiserror::Error;

/// Errors the engine itself can surface to its embedding application.
///
/// Dialogue-level conditions (unclassifiable replies, wrong quiz answers,
/// gateway failures) are designed branches, not errors; they never appear
/// here. A lesson in progress is never aborted by any of these.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no active lesson session for student {0}")]
    NoActiveSession(String),
    #[error("lesson already completed")]
    LessonCompleted,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encode failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("snapshot decode failed for {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("request timed out after {0} ms")]
    Timeout(u64),
    #[error("empty response")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}
