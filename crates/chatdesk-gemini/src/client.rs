// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini `generateContent` API.

use std::time::Duration;

use chatdesk_core::ChatdeskError;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, GenerateRequest, GenerateResponse};

/// Delay before the single retry of a transient failure.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Authenticated client bound to one model.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl GeminiClient {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, ChatdeskError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| ChatdeskError::Config(format!("invalid Gemini API key: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| unavailable(format!("failed to build HTTP client: {e}"), Some(e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_retries: 1,
            retry_delay: RETRY_DELAY,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Shortens the retry delay (for tests against a mock server).
    #[cfg(test)]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Sends one request. Transient statuses (429, 500, 503) are retried
    /// once after a short delay.
    pub async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, ChatdeskError> {
        let url = self.endpoint();
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying Gemini request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self
                .client
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| unavailable(format!("HTTP request failed: {e}"), Some(e)))?;

            let status = response.status();
            debug!(status = %status, attempt, model = %self.model, "Gemini response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| {
                    unavailable(format!("failed to read response body: {e}"), Some(e))
                })?;
                return serde_json::from_str(&body).map_err(|e| {
                    unavailable(format!("failed to parse Gemini response: {e}"), Some(e))
                });
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(unavailable(
                    format!("API returned {status}: {body}"),
                    None::<reqwest::Error>,
                ));
                continue;
            }

            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!(
                    "Gemini API error ({} {}): {}",
                    api_err.error.code, api_err.error.status, api_err.error.message
                ),
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(unavailable(message, None::<reqwest::Error>));
        }

        Err(last_error.unwrap_or_else(|| {
            unavailable("Gemini request failed after retries", None::<reqwest::Error>)
        }))
    }
}

fn unavailable<E>(message: impl Into<String>, source: Option<E>) -> ChatdeskError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ChatdeskError::ResponderUnavailable {
        message: message.into(),
        source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
    }
}

/// HTTP statuses worth one more attempt.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}
