// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook event audit trail.
//!
//! Every inbound callback batch is recorded before processing; orphan
//! status updates (unknown provider message id) get their own rows so they
//! are diagnosable after the fact.

use aurum_core::AurumError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::WebhookEvent;

/// Record an inbound event payload. Returns the audit row id.
pub async fn insert_event(
    db: &Database,
    event_type: &str,
    payload: &str,
) -> Result<i64, AurumError> {
    let event_type = event_type.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO webhook_events (event_type, payload) VALUES (?1, ?2)",
                params![event_type, payload],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an event as processed, stamping the resolved tenant when known.
pub async fn mark_processed(
    db: &Database,
    id: i64,
    jeweller_id: Option<String>,
) -> Result<(), AurumError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE webhook_events SET processed = 1,
                 jeweller_id = COALESCE(?1, jeweller_id),
                 processed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![jeweller_id, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a processing failure on an event without marking it processed.
pub async fn mark_error(db: &Database, id: i64, error: &str) -> Result<(), AurumError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE webhook_events SET processed = 0, error_message = ?1,
                 processed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![error, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch one audit row by id.
pub async fn get_event(db: &Database, id: i64) -> Result<Option<WebhookEvent>, AurumError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, jeweller_id, event_type, payload, processed, error_message
                 FROM webhook_events WHERE id = ?1",
            )?;
            let mut rows = stmt.query_map(params![id], |row| {
                Ok(WebhookEvent {
                    id: row.get(0)?,
                    jeweller_id: row.get(1)?,
                    event_type: row.get(2)?,
                    payload: row.get(3)?,
                    processed: row.get(4)?,
                    error_message: row.get(5)?,
                })
            })?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}
