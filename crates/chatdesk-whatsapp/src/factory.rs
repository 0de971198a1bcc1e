// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use chatdesk_config::model::SidecarConfig;
use chatdesk_core::{
    Account, AdapterType, ChatdeskError, HealthStatus, PluginAdapter, TransportConnection,
    TransportFactory,
};

use crate::transport::{SidecarSettings, SidecarTransport};

/// Opens a fresh sidecar socket for every session (re)start.
pub struct SidecarFactory {
    settings: SidecarSettings,
}

impl SidecarFactory {
    pub fn new(config: &SidecarConfig) -> Self {
        Self {
            settings: SidecarSettings::from(config),
        }
    }

    pub fn settings(&self) -> &SidecarSettings {
        &self.settings
    }
}

#[async_trait]
impl PluginAdapter for SidecarFactory {
    fn name(&self) -> &str {
        "whatsapp-sidecar"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatdeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChatdeskError> {
        Ok(())
    }
}

#[async_trait]
impl TransportFactory for SidecarFactory {
    async fn connect(&self, account: &Account) -> Result<TransportConnection, ChatdeskError> {
        SidecarTransport::connect(&self.settings, account).await
    }
}
