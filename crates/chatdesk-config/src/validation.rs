// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::ChatdeskConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validates a deserialized configuration, collecting every problem instead
/// of stopping at the first.
pub fn validate_config(config: &ChatdeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "service.log_level `{}` must be one of {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }
    if config.storage.media_dir.trim().is_empty() {
        errors.push(ConfigError::validation("storage.media_dir must not be empty"));
    }

    if config.session.reconnect_delay_secs == 0 {
        errors.push(ConfigError::validation(
            "session.reconnect_delay_secs must be at least 1",
        ));
    }

    if config.autoreply.history_limit == 0 {
        errors.push(ConfigError::validation(
            "autoreply.history_limit must be at least 1",
        ));
    }
    if config.autoreply.responder_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "autoreply.responder_timeout_secs must be at least 1",
        ));
    }
    for number in &config.autoreply.test_numbers {
        if !number.chars().any(|c| c.is_ascii_digit()) {
            errors.push(ConfigError::validation(format!(
                "autoreply.test_numbers entry `{number}` contains no digits"
            )));
        }
    }

    if !config.sidecar.url.starts_with("ws://") && !config.sidecar.url.starts_with("wss://") {
        errors.push(ConfigError::validation(format!(
            "sidecar.url `{}` must use ws:// or wss://",
            config.sidecar.url
        )));
    }

    if config.metrics.enabled
        && config
            .metrics
            .bind_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ConfigError::validation(format!(
            "metrics.bind_address `{}` is not a socket address",
            config.metrics.bind_address
        )));
    }

    let mut seen = HashSet::new();
    for account in &config.accounts {
        if !seen.insert(account.id) {
            errors.push(ConfigError::validation(format!(
                "duplicate account id {}",
                account.id
            )));
        }
        if account.name.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "account {} must have a name",
                account.id
            )));
        }
        for queue in &account.queues {
            if queue.name.trim().is_empty() {
                errors.push(ConfigError::validation(format!(
                    "account {} has a queue without a name",
                    account.id
                )));
            }
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
