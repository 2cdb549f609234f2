//! Optional speech output sink.
//!
//! Dialogue messages are mirrored here fire-and-forget; a full or closed
//! channel is logged and dropped, never blocking phase progression.

use tokio::sync::mpsc;

#[derive(Clone)]
pub struct SpeechSink {
    tx: mpsc::Sender<String>,
}

impl SpeechSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub fn speak(&self, text: &str) {
        if let Err(e) = self.tx.try_send(text.to_string()) {
            tracing::debug!(error = %e, "speech sink dropped a message");
        }
    }
}
