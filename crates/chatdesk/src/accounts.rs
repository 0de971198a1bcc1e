// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatdesk accounts`: configured accounts as the store sees them, then
//! the health of each adapter the service would start with.

use chatdesk_config::ChatdeskConfig;
use chatdesk_core::{Account, ChatdeskError, HealthStatus, PluginAdapter, Queue, StorageAdapter};
use chatdesk_gemini::GeminiResponder;
use chatdesk_storage::SqliteStore;
use chatdesk_whatsapp::SidecarFactory;

pub async fn run_accounts(config: &ChatdeskConfig) -> Result<(), ChatdeskError> {
    let store = SqliteStore::new(config.storage.clone());
    store.initialize().await?;
    store.sync_accounts(&config.accounts).await?;

    let accounts = store.list_accounts().await?;
    if accounts.is_empty() {
        println!("no accounts configured");
    }
    for account in &accounts {
        let queues = store.queues_for_account(account.id).await?;
        println!("{}", describe(account, &queues));
    }

    let responder = GeminiResponder::new(&config.gemini)?;
    let sidecar = SidecarFactory::new(&config.sidecar);
    let adapters: [&dyn PluginAdapter; 3] = [&store, &responder, &sidecar];
    println!();
    for adapter in adapters {
        let health = adapter.health_check().await;
        println!("{}", describe_health(adapter.name(), &health));
    }

    store.close().await
}

fn describe(account: &Account, queues: &[Queue]) -> String {
    let mut line = format!(
        "{:>4}  {:<20} {:<12} retries={}",
        account.id, account.name, account.status, account.retries
    );
    if queues.is_empty() {
        line.push_str("  (no queues)");
    } else {
        let names: Vec<&str> = queues.iter().map(|q| q.name.as_str()).collect();
        line.push_str(&format!("  queues: {}", names.join(", ")));
    }
    line
}

fn describe_health(name: &str, health: &Result<HealthStatus, ChatdeskError>) -> String {
    match health {
        Ok(HealthStatus::Healthy) => format!("  [OK]   {name:<20} healthy"),
        Ok(HealthStatus::Degraded(reason)) => format!("  [WARN] {name:<20} {reason}"),
        Ok(HealthStatus::Unhealthy(reason)) => format!("  [FAIL] {name:<20} {reason}"),
        Err(e) => format!("  [FAIL] {name:<20} {e}"),
    }
}

#[cfg(test)]
mod tests {
    use chatdesk_core::AccountStatus;

    use super::*;

    fn account() -> Account {
        Account {
            id: 3,
            name: "soporte".into(),
            status: AccountStatus::Qrcode,
            qrcode: Some("QR".into()),
            retries: 2,
            greeting_message: String::new(),
            farewell_message: String::new(),
        }
    }

    #[test]
    fn describe_lists_queues_in_order() {
        let queues = vec![
            Queue {
                id: 1,
                name: "Ventas".into(),
                greeting_message: String::new(),
                position: 0,
            },
            Queue {
                id: 2,
                name: "Soporte".into(),
                greeting_message: String::new(),
                position: 1,
            },
        ];
        let line = describe(&account(), &queues);
        assert!(line.contains("soporte"));
        assert!(line.contains("QRCODE"));
        assert!(line.contains("retries=2"));
        assert!(line.ends_with("queues: Ventas, Soporte"));
    }

    #[test]
    fn describe_flags_missing_queues() {
        assert!(describe(&account(), &[]).ends_with("(no queues)"));
    }

    #[test]
    fn health_lines_mark_severity() {
        assert_eq!(
            describe_health("sqlite", &Ok(HealthStatus::Healthy)),
            "  [OK]   sqlite               healthy"
        );
        let degraded = HealthStatus::Degraded("no API key".into());
        let degraded = describe_health("gemini", &Ok(degraded));
        assert!(degraded.starts_with("  [WARN] gemini"));
        assert!(degraded.ends_with("no API key"));
        let down = describe_health("sqlite", &Ok(HealthStatus::Unhealthy("locked".into())));
        assert!(down.starts_with("  [FAIL] sqlite") && down.ends_with("locked"));
    }

    #[test]
    fn health_errors_are_failures() {
        let err = ChatdeskError::Storage {
            source: "database is locked".into(),
        };
        let line = describe_health("sqlite", &Err(err));
        assert!(line.starts_with("  [FAIL] sqlite"), "{line}");
        assert!(line.contains("database is locked"), "{line}");
    }

    #[tokio::test]
    async fn run_accounts_syncs_into_a_fresh_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = chatdesk_config::load_and_validate_str(&format!(
            r#"
[storage]
database_path = "{}"
media_dir = "{}"

[[accounts]]
id = 1
name = "ventas"

[[accounts.queues]]
name = "Ventas"
"#,
            dir.path().join("chatdesk.db").display(),
            dir.path().join("media").display(),
        ))
        .unwrap();

        run_accounts(&config).await.unwrap();
        assert!(dir.path().join("chatdesk.db").exists());
    }
}
