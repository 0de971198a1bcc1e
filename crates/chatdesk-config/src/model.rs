// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! Every struct uses `#[serde(deny_unknown_fields)]` so typos are caught at
//! startup instead of silently falling back to defaults.

use serde::{Deserialize, Serialize};

/// Top-level chatdesk configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatdeskConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Session lifecycle settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Ingestion pipeline settings.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Queue menu settings.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Automated responder gate settings.
    #[serde(default)]
    pub autoreply: AutoReplyConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Messaging-client sidecar connection.
    #[serde(default)]
    pub sidecar: SidecarConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Messaging accounts and their queues.
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

/// Process identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "chatdesk".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// SQLite database and media directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory downloaded media is written to.
    #[serde(default = "default_media_dir")]
    pub media_dir: String,

    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            media_dir: default_media_dir(),
            wal_mode: true,
        }
    }
}

fn data_dir() -> std::path::PathBuf {
    dirs::data_dir()
        .map(|p| p.join("chatdesk"))
        .unwrap_or_else(|| std::path::PathBuf::from("."))
}

fn default_database_path() -> String {
    data_dir().join("chatdesk.db").to_string_lossy().into_owned()
}

fn default_media_dir() -> String {
    data_dir().join("media").to_string_lossy().into_owned()
}

fn default_true() -> bool {
    true
}

/// Session lifecycle settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Fixed delay before reconnecting a dropped session.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Replay unread chats through the pipeline once a session is ready.
    #[serde(default = "default_true")]
    pub sync_unread_on_ready: bool,

    /// How long `start` waits for the session to become ready (QR scan
    /// included).
    #[serde(default = "default_start_timeout_secs")]
    pub start_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: default_reconnect_delay_secs(),
            sync_unread_on_ready: true,
            start_timeout_secs: default_start_timeout_secs(),
        }
    }
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_start_timeout_secs() -> u64 {
    120
}

/// Ingestion pipeline settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// `hl` parameter of the static map link built for location messages.
    #[serde(default = "default_map_language")]
    pub map_language: String,

    /// Delay before looking up a message an ack refers to.
    #[serde(default = "default_ack_delay_ms")]
    pub ack_delay_ms: u64,

    /// A non-group contact writing again within this window gets their
    /// previous ticket back instead of a new one.
    #[serde(default = "default_reopen_window_hours")]
    pub reopen_window_hours: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            map_language: default_map_language(),
            ack_delay_ms: default_ack_delay_ms(),
            reopen_window_hours: default_reopen_window_hours(),
        }
    }
}

fn default_map_language() -> String {
    "pt-BR".to_string()
}

fn default_ack_delay_ms() -> u64 {
    500
}

fn default_reopen_window_hours() -> u64 {
    2
}

/// Queue menu settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Burst window collapsed into a single menu send, per ticket.
    #[serde(default = "default_menu_debounce_ms")]
    pub menu_debounce_ms: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            menu_debounce_ms: default_menu_debounce_ms(),
        }
    }
}

fn default_menu_debounce_ms() -> u64 {
    3000
}

/// Automated responder gate settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AutoReplyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Agent the ticket is handed to when the responder asks for a human.
    #[serde(default = "default_fallback_agent_id")]
    pub fallback_agent_id: i64,

    /// Number of prior messages passed to the responder.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default = "default_responder_timeout_secs")]
    pub responder_timeout_secs: u64,

    /// When non-empty, only these numbers get automated replies.
    #[serde(default)]
    pub test_numbers: Vec<String>,
}

impl Default for AutoReplyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fallback_agent_id: default_fallback_agent_id(),
            history_limit: default_history_limit(),
            responder_timeout_secs: default_responder_timeout_secs(),
            test_numbers: Vec::new(),
        }
    }
}

fn default_fallback_agent_id() -> i64 {
    1
}

fn default_history_limit() -> usize {
    10
}

fn default_responder_timeout_secs() -> u64 {
    30
}

/// Gemini responder settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key. Falls back to the `GEMINI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    #[serde(default = "default_gemini_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
            timeout_secs: default_gemini_timeout_secs(),
        }
    }
}

fn default_gemini_model() -> String {
    "gemini-pro".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_timeout_secs() -> u64 {
    30
}

/// Messaging-client sidecar connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SidecarConfig {
    #[serde(default = "default_sidecar_url")]
    pub url: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Timeout for a single request/response exchange with the sidecar.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            url: default_sidecar_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_sidecar_url() -> String {
    "ws://127.0.0.1:3100".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Prometheus exporter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_bind")]
    pub bind_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: default_metrics_bind(),
        }
    }
}

fn default_metrics_bind() -> String {
    "127.0.0.1:9464".to_string()
}

/// A messaging account.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    pub id: i64,

    pub name: String,

    /// Shown above the queue menu.
    #[serde(default)]
    pub greeting_message: String,

    /// Closing message; an identical echo with nothing unread is ignored.
    #[serde(default)]
    pub farewell_message: String,

    /// Start the session when the service starts.
    #[serde(default = "default_true")]
    pub auto_start: bool,

    /// Queues in menu order.
    #[serde(default)]
    pub queues: Vec<QueueConfig>,
}

/// A routing bucket attached to an account.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    pub name: String,

    /// Sent once the customer picks this queue. Supports `{{name}}`.
    #[serde(default)]
    pub greeting_message: String,
}
