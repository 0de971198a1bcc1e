// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gemini-backed [`ResponderAdapter`] for chatdesk.
//!
//! Builds a phase-specific system instruction, sends the conversation
//! history plus the new message to `generateContent`, and reads an optional
//! `[[action:...]]` tag off the reply.

pub mod client;
pub mod prompt;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use chatdesk_config::model::GeminiConfig;
use chatdesk_core::{
    AdapterType, ChatdeskError, HealthStatus, HistoryEntry, PhaseContext, PluginAdapter,
    ResponderAdapter, ResponderReply,
};
use tracing::{debug, info, warn};

use crate::client::GeminiClient;
use crate::types::{Content, GenerateRequest, GenerationConfig};

const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Responder backed by the Gemini API. Without an API key it reports itself
/// unconfigured and the auto-response hook stays silent.
pub struct GeminiResponder {
    client: Option<GeminiClient>,
}

impl GeminiResponder {
    /// API key resolution: `gemini.api_key`, then `GEMINI_API_KEY`.
    pub fn new(config: &GeminiConfig) -> Result<Self, ChatdeskError> {
        let Some(api_key) = resolve_api_key(config.api_key.as_deref()) else {
            warn!("no Gemini API key configured, automated replies disabled");
            return Ok(Self { client: None });
        };
        let client = GeminiClient::new(
            &api_key,
            &config.base_url,
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(model = %config.model, "Gemini responder initialized");
        Ok(Self {
            client: Some(client),
        })
    }

    fn request(prompt: &str, history: &[HistoryEntry], context: PhaseContext) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content::user(prompt::user_prompt(prompt, history))],
            system_instruction: Some(Content::instruction(prompt::system_instruction(context))),
            generation_config: Some(GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 512,
            }),
        }
    }
}

fn resolve_api_key(configured: Option<&str>) -> Option<String> {
    if let Some(key) = configured.filter(|k| !k.trim().is_empty()) {
        return Some(key.to_string());
    }
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|k| !k.trim().is_empty())
}

#[async_trait]
impl PluginAdapter for GeminiResponder {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Responder
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatdeskError> {
        // A live request would spend quota.
        Ok(match self.client {
            Some(_) => HealthStatus::Healthy,
            None => HealthStatus::Degraded("no API key".into()),
        })
    }

    async fn shutdown(&self) -> Result<(), ChatdeskError> {
        debug!("Gemini responder shutting down");
        Ok(())
    }
}

#[async_trait]
impl ResponderAdapter for GeminiResponder {
    fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    async fn generate(
        &self,
        prompt: &str,
        history: &[HistoryEntry],
        context: PhaseContext,
    ) -> Result<ResponderReply, ChatdeskError> {
        let Some(client) = &self.client else {
            return Err(ChatdeskError::ResponderUnavailable {
                message: "Gemini API key not configured".into(),
                source: None,
            });
        };

        let response = client
            .generate(&Self::request(prompt, history, context))
            .await?;
        let Some(raw) = response.text() else {
            debug!(model = client.model(), "Gemini returned no text");
            return Ok(ResponderReply::default());
        };

        let (text, action) = prompt::split_action(&raw);
        debug!(model = client.model(), %action, chars = text.len(), "Gemini reply parsed");
        Ok(ResponderReply {
            text: (!text.is_empty()).then_some(text),
            action,
        })
    }
}
