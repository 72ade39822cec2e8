// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message row operations, including the idempotent delivery-status apply.
//!
//! `apply_delivery_status` is the only write path shared between the
//! dispatcher and the webhook reconciler; it enforces the monotonic
//! transition rule and refreshes the owning run's counters in the same
//! transaction.

use aurum_core::AurumError;
use aurum_core::types::MessageStatus;
use chrono::{DateTime, Utc};
use rusqlite::{Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::{Message, column_enum};
use crate::queries::runs::recount_run_counters;

const MESSAGE_COLUMNS: &str = "id, jeweller_id, contact_id, campaign_run_id, phone_number,
     template_name, language, message_body, provider_message_id, status, queued_at,
     sent_at, delivered_at, read_at, failed_at, failure_reason, retry_count";

fn map_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        jeweller_id: row.get(1)?,
        contact_id: row.get(2)?,
        campaign_run_id: row.get(3)?,
        phone_number: row.get(4)?,
        template_name: row.get(5)?,
        language: column_enum(6, row.get(6)?)?,
        message_body: row.get(7)?,
        provider_message_id: row.get(8)?,
        status: column_enum(9, row.get(9)?)?,
        queued_at: row.get(10)?,
        sent_at: row.get(11)?,
        delivered_at: row.get(12)?,
        read_at: row.get(13)?,
        failed_at: row.get(14)?,
        failure_reason: row.get(15)?,
        retry_count: row.get(16)?,
    })
}

/// Insert a new message in QUEUED state.
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), AurumError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, jeweller_id, contact_id, campaign_run_id,
                     phone_number, template_name, language, message_body,
                     provider_message_id, status, queued_at, sent_at, delivered_at,
                     read_at, failed_at, failure_reason, retry_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                     ?15, ?16, ?17)",
                params![
                    msg.id,
                    msg.jeweller_id,
                    msg.contact_id,
                    msg.campaign_run_id,
                    msg.phone_number,
                    msg.template_name,
                    msg.language.to_string(),
                    msg.message_body,
                    msg.provider_message_id,
                    msg.status.to_string(),
                    msg.queued_at,
                    msg.sent_at,
                    msg.delivered_at,
                    msg.read_at,
                    msg.failed_at,
                    msg.failure_reason,
                    msg.retry_count,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a successful provider send: QUEUED -> SENT with the provider id.
pub async fn mark_sent(
    db: &Database,
    id: &str,
    provider_message_id: &str,
    sent_at: DateTime<Utc>,
) -> Result<(), AurumError> {
    let id = id.to_string();
    let provider_message_id = provider_message_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET status = 'SENT', provider_message_id = ?1,
                 sent_at = ?2, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![provider_message_id, sent_at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a terminal send failure with the last error and retry count.
pub async fn mark_send_failed(
    db: &Database,
    id: &str,
    reason: &str,
    retry_count: i64,
    failed_at: DateTime<Utc>,
) -> Result<(), AurumError> {
    let id = id.to_string();
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET status = 'FAILED', failure_reason = ?1,
                 retry_count = ?2, failed_at = ?3,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?4",
                params![reason, retry_count, failed_at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch one message by id.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, AurumError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], map_message)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Look a message up by its provider-assigned id.
pub async fn find_by_provider_id(
    db: &Database,
    provider_message_id: &str,
) -> Result<Option<Message>, AurumError> {
    let provider_message_id = provider_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE provider_message_id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![provider_message_id], map_message)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// All messages belonging to a run, oldest first.
pub async fn list_for_run(db: &Database, run_id: &str) -> Result<Vec<Message>, AurumError> {
    let run_id = run_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE campaign_run_id = ?1 ORDER BY queued_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![run_id], map_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Outcome of applying one delivery-status callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusApply {
    /// The message advanced; the owning run's counters were refreshed.
    Applied { run_id: String, jeweller_id: String },
    /// The callback was at or behind the current status (duplicate or
    /// out-of-order delivery) and changed nothing.
    NoOp,
    /// No message carries this provider id.
    NotFound,
}

/// Apply a provider delivery-status callback to the matching message.
///
/// Forward progress only: a status at or behind the current one is a no-op,
/// which is what makes at-least-once callback delivery safe to replay. The
/// message update and the owning run's counter recount commit in one
/// transaction.
pub async fn apply_delivery_status(
    db: &Database,
    provider_message_id: &str,
    new_status: MessageStatus,
    at: DateTime<Utc>,
    error_detail: Option<String>,
) -> Result<StatusApply, AurumError> {
    let provider_message_id = provider_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let row = {
                let mut stmt = tx.prepare(
                    "SELECT id, campaign_run_id, jeweller_id, status FROM messages
                     WHERE provider_message_id = ?1",
                )?;
                let mut rows = stmt.query_map(params![provider_message_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?;
                match rows.next() {
                    Some(row) => Some(row?),
                    None => None,
                }
            };

            let Some((message_id, run_id, jeweller_id, current)) = row else {
                tx.commit()?;
                return Ok(StatusApply::NotFound);
            };
            let current: MessageStatus = column_enum(3, current)?;

            if !current.can_advance_to(new_status) {
                tx.commit()?;
                return Ok(StatusApply::NoOp);
            }

            let ts_column = match new_status {
                MessageStatus::Sent => "sent_at",
                MessageStatus::Delivered => "delivered_at",
                MessageStatus::Read => "read_at",
                MessageStatus::Failed => "failed_at",
                // can_advance_to never admits QUEUED as a target.
                MessageStatus::Queued => {
                    tx.commit()?;
                    return Ok(StatusApply::NoOp);
                }
            };

            tx.execute(
                &format!(
                    "UPDATE messages SET status = ?1, {ts_column} = ?2,
                     failure_reason = COALESCE(?3, failure_reason),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?4"
                ),
                params![new_status.to_string(), at, error_detail, message_id],
            )?;

            recount_run_counters(&tx, &run_id)?;
            tx.commit()?;

            Ok(StatusApply::Applied { run_id, jeweller_id })
        })
        .await
        .map_err(map_tr_err)
}
