// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account and queue operations.

use chatdesk_config::model::AccountConfig;
use chatdesk_core::{Account, AccountId, AccountStatusUpdate, ChatdeskError, Queue};
use rusqlite::{OptionalExtension, params};

use super::parse_col;
use crate::database::{Database, map_tr_err, now_ts};

const ACCOUNT_COLUMNS: &str =
    "id, name, status, qrcode, retries, greeting_message, farewell_message";

fn account_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        status: parse_col(row, 2)?,
        qrcode: row.get(3)?,
        retries: row.get(4)?,
        greeting_message: row.get(5)?,
        farewell_message: row.get(6)?,
    })
}

/// Upserts configured accounts and their queues. Queue ids are stable per
/// (account, position); queues beyond the configured list are removed.
pub async fn sync_accounts(db: &Database, accounts: &[AccountConfig]) -> Result<(), ChatdeskError> {
    let accounts = accounts.to_vec();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            let now = now_ts();
            for account in &accounts {
                tx.execute(
                    "INSERT INTO accounts (id, name, greeting_message, farewell_message, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        greeting_message = excluded.greeting_message,
                        farewell_message = excluded.farewell_message,
                        updated_at = excluded.updated_at",
                    params![
                        account.id,
                        account.name,
                        account.greeting_message,
                        account.farewell_message,
                        now
                    ],
                )?;
                for (position, queue) in account.queues.iter().enumerate() {
                    tx.execute(
                        "INSERT INTO queues (account_id, position, name, greeting_message)
                         VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(account_id, position) DO UPDATE SET
                            name = excluded.name,
                            greeting_message = excluded.greeting_message",
                        params![account.id, position as i64, queue.name, queue.greeting_message],
                    )?;
                }
                tx.execute(
                    "DELETE FROM queues WHERE account_id = ?1 AND position >= ?2",
                    params![account.id, account.queues.len() as i64],
                )?;
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_account(db: &Database, id: AccountId) -> Result<Option<Account>, ChatdeskError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
                params![id],
                account_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_accounts(db: &Database) -> Result<Vec<Account>, ChatdeskError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id"))?;
            let accounts = stmt
                .query_map([], account_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(accounts)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_account_status(
    db: &Database,
    id: AccountId,
    update: &AccountStatusUpdate,
) -> Result<(), ChatdeskError> {
    let status = update.status.to_string();
    let qrcode = update.qrcode.clone();
    let retries = update.retries;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE accounts SET status = ?1, qrcode = ?2, retries = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![status, qrcode, retries, now_ts(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Queues of an account in menu order.
pub async fn queues_for_account(
    db: &Database,
    account_id: AccountId,
) -> Result<Vec<Queue>, ChatdeskError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, greeting_message, position FROM queues
                 WHERE account_id = ?1 ORDER BY position",
            )?;
            let queues = stmt
                .query_map(params![account_id], |row| {
                    Ok(Queue {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        greeting_message: row.get(2)?,
                        position: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(queues)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdesk_config::model::QueueConfig;
    use chatdesk_core::AccountStatus;

    async fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap(), true)
            .await
            .unwrap();
        (dir, db)
    }

    fn account(queues: &[&str]) -> AccountConfig {
        AccountConfig {
            id: 1,
            name: "main".into(),
            greeting_message: "Choose:".into(),
            farewell_message: "Bye".into(),
            auto_start: true,
            queues: queues
                .iter()
                .map(|n| QueueConfig {
                    name: n.to_string(),
                    greeting_message: format!("{n} here"),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn sync_keeps_queue_ids_stable_and_trims() {
        let (_dir, db) = open().await;
        sync_accounts(&db, &[account(&["Sales", "Support", "Billing"])])
            .await
            .unwrap();
        let first = queues_for_account(&db, 1).await.unwrap();
        assert_eq!(first.len(), 3);

        sync_accounts(&db, &[account(&["Sales", "Help"])]).await.unwrap();
        let second = queues_for_account(&db, 1).await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].id, first[0].id);
        assert_eq!(second[1].id, first[1].id);
        assert_eq!(second[1].name, "Help");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn status_updates_round_trip() {
        let (_dir, db) = open().await;
        sync_accounts(&db, &[account(&[])]).await.unwrap();

        let fresh = get_account(&db, 1).await.unwrap().unwrap();
        assert_eq!(fresh.status, AccountStatus::Opening);
        assert_eq!(fresh.farewell_message, "Bye");

        update_account_status(
            &db,
            1,
            &AccountStatusUpdate {
                status: AccountStatus::Qrcode,
                qrcode: Some("2@abc".into()),
                retries: 0,
            },
        )
        .await
        .unwrap();
        let account = get_account(&db, 1).await.unwrap().unwrap();
        assert_eq!(account.status, AccountStatus::Qrcode);
        assert_eq!(account.qrcode.as_deref(), Some("2@abc"));

        assert!(get_account(&db, 99).await.unwrap().is_none());
        assert_eq!(list_accounts(&db).await.unwrap().len(), 1);
        db.close().await.unwrap();
    }
}
