// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Merge order (later overrides earlier):
//! 1. Compiled defaults
//! 2. `/etc/chatdesk/chatdesk.toml`
//! 3. `~/.config/chatdesk/chatdesk.toml`
//! 4. `./chatdesk.toml`
//! 5. `CHATDESK_*` environment variables

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ChatdeskConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/chatdesk/chatdesk.toml";
pub(crate) const LOCAL_CONFIG: &str = "chatdesk.toml";

/// Sections reachable from `CHATDESK_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "service",
    "storage",
    "session",
    "ingest",
    "routing",
    "autoreply",
    "gemini",
    "sidecar",
    "metrics",
];

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("chatdesk/chatdesk.toml"))
        .unwrap_or_default()
}

/// Builds the full layered Figment without extracting it.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ChatdeskConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Loads configuration from the standard hierarchy with env overrides.
pub fn load_config() -> Result<ChatdeskConfig, figment::Error> {
    build_figment().extract()
}

/// Loads configuration from a TOML string on top of defaults. No files, no env.
pub fn load_config_from_str(toml_content: &str) -> Result<ChatdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatdeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Loads configuration from an explicit file with env overrides.
pub fn load_config_from_path(path: &Path) -> Result<ChatdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatdeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Maps `CHATDESK_SECTION_KEY_NAME` to `section.key_name`.
///
/// Only the leading section is split off so keys that contain underscores
/// keep them (`CHATDESK_SESSION_RECONNECT_DELAY_SECS` becomes
/// `session.reconnect_delay_secs`).
fn env_provider() -> Env {
    Env::prefixed("CHATDESK_").map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
