//! Remote tutoring backend client.
//!
//! Every call carries an explicit timeout; callers treat any error as a cue
//! to fall back to the local phase script, so a dead backend degrades the
//! lesson text but never the lesson flow.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::warn;

use crate::config::GatewayConfig;
use crate::error::GatewayError;

const BASE_BACKOFF_MS: u64 = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorRequest {
    pub message: String,
    pub grade_level: i32,
    pub subject: String,
    pub student_name: String,
    pub conversation_history: Vec<TurnMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorResponse {
    pub text: String,
    pub model: Option<String>,
    pub provider: Option<String>,
}

#[derive(Clone)]
pub struct RemoteTutorGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl RemoteTutorGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    pub fn is_available(&self) -> bool {
        !self.config.endpoint.trim().is_empty()
    }

    pub async fn generate(&self, request: &TutorRequest) -> Result<String, GatewayError> {
        if self.config.endpoint.trim().is_empty() {
            return Err(GatewayError::NotConfigured("endpoint"));
        }
        let payload = serde_json::json!({
            "model": self.config.model,
            "message": request.message,
            "gradeLevel": request.grade_level,
            "subject": request.subject,
            "studentName": request.student_name,
            "conversationHistory": request.conversation_history,
        });
        let response = self.post_with_retry(&payload).await?;
        let text = response.text.trim();
        if text.is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(text.to_string())
    }

    async fn post_with_retry(
        &self,
        payload: &serde_json::Value,
    ) -> Result<TutorResponse, GatewayError> {
        let mut last_error: Option<GatewayError> = None;

        for retry in 0..=self.config.max_retries {
            let mut builder = self.client.post(&self.config.endpoint).json(payload);
            if let Some(key) = self.config.api_key.as_deref() {
                builder = builder.bearer_auth(key);
            }
            match builder.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp.json::<TutorResponse>().await?);
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = GatewayError::HttpStatus { status, body };
                    if retry < self.config.max_retries && is_retryable(status) {
                        let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
                        warn!(retry, ?status, "tutor gateway request failed, retrying");
                        sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    let err = if e.is_timeout() {
                        GatewayError::Timeout(self.config.timeout_ms)
                    } else {
                        GatewayError::Request(e)
                    };
                    if retry < self.config.max_retries {
                        let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
                        warn!(retry, "tutor gateway request error, retrying");
                        sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }
        Err(last_error.unwrap_or(GatewayError::NotConfigured("endpoint")))
    }
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_endpoint_is_unavailable() {
        let mut config = GatewayConfig::default();
        config.endpoint = "  ".to_string();
        let gateway = RemoteTutorGateway::new(config);
        assert!(!gateway.is_available());
    }

    #[tokio::test]
    async fn generate_without_endpoint_fails_fast() {
        let mut config = GatewayConfig::default();
        config.endpoint = String::new();
        let gateway = RemoteTutorGateway::new(config);
        let request = TutorRequest {
            message: "merhaba".to_string(),
            grade_level: 3,
            subject: "matematik".to_string(),
            student_name: "Ayşe".to_string(),
            conversation_history: Vec::new(),
        };
        assert!(matches!(
            gateway.generate(&request).await,
            Err(GatewayError::NotConfigured(_))
        ));
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_retryable(reqwest::StatusCode::BAD_REQUEST));
    }
}
