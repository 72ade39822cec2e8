// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign run operations.
//!
//! The UNIQUE(campaign_id, scheduled_at) constraint is the authoritative
//! dedup guard: `insert_run` reports a constraint conflict as
//! [`RunInsert::DuplicatePeriod`] so a concurrent or retrying scheduler
//! treats the period as already triggered instead of erroring.

use aurum_core::AurumError;
use chrono::{DateTime, Utc};
use rusqlite::{Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::{CampaignRun, column_enum};

const RUN_COLUMNS: &str = "id, campaign_id, jeweller_id, scheduled_at, started_at, completed_at,
     status, total_contacts, eligible_contacts, messages_queued, messages_sent,
     messages_delivered, messages_read, messages_failed, error_message";

fn map_run(row: &Row<'_>) -> rusqlite::Result<CampaignRun> {
    Ok(CampaignRun {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        jeweller_id: row.get(2)?,
        scheduled_at: row.get(3)?,
        started_at: row.get(4)?,
        completed_at: row.get(5)?,
        status: column_enum(6, row.get(6)?)?,
        total_contacts: row.get(7)?,
        eligible_contacts: row.get(8)?,
        messages_queued: row.get(9)?,
        messages_sent: row.get(10)?,
        messages_delivered: row.get(11)?,
        messages_read: row.get(12)?,
        messages_failed: row.get(13)?,
        error_message: row.get(14)?,
    })
}

/// Outcome of a guarded run insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunInsert {
    Created,
    /// A run already exists for this (campaign, period) key.
    DuplicatePeriod,
}

/// Insert a run guarded by the (campaign_id, scheduled_at) unique key.
pub async fn insert_run(db: &Database, run: &CampaignRun) -> Result<RunInsert, AurumError> {
    let run = run.clone();
    db.connection()
        .call(move |conn| {
            let result = conn.execute(
                "INSERT INTO campaign_runs (id, campaign_id, jeweller_id, scheduled_at,
                     started_at, completed_at, status, total_contacts, eligible_contacts,
                     messages_queued, messages_sent, messages_delivered, messages_read,
                     messages_failed, error_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    run.id,
                    run.campaign_id,
                    run.jeweller_id,
                    run.scheduled_at,
                    run.started_at,
                    run.completed_at,
                    run.status.to_string(),
                    run.total_contacts,
                    run.eligible_contacts,
                    run.messages_queued,
                    run.messages_sent,
                    run.messages_delivered,
                    run.messages_read,
                    run.messages_failed,
                    run.error_message,
                ],
            );
            match result {
                Ok(_) => Ok(RunInsert::Created),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(RunInsert::DuplicatePeriod)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch one run by id.
pub async fn get_run(db: &Database, id: &str) -> Result<Option<CampaignRun>, AurumError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RUN_COLUMNS} FROM campaign_runs WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], map_run)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Whether a RUNNING or COMPLETED run exists at or after the period start.
///
/// For ONCE campaigns the period start is the campaign start, so this
/// doubles as the "has it ever executed" check.
pub async fn has_run_in_period(
    db: &Database,
    campaign_id: &str,
    period_start: DateTime<Utc>,
) -> Result<bool, AurumError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM campaign_runs
                 WHERE campaign_id = ?1 AND scheduled_at >= ?2
                   AND status IN ('RUNNING', 'COMPLETED')",
                params![campaign_id, period_start],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Transition a run PENDING -> RUNNING.
pub async fn mark_running(
    db: &Database,
    id: &str,
    started_at: DateTime<Utc>,
) -> Result<(), AurumError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaign_runs SET status = 'RUNNING', started_at = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![started_at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Transition a run to COMPLETED. All sends were attempted, regardless of
/// individual outcomes.
pub async fn mark_completed(
    db: &Database,
    id: &str,
    completed_at: DateTime<Utc>,
) -> Result<(), AurumError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaign_runs SET status = 'COMPLETED', completed_at = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![completed_at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Transition a run to FAILED with a reason (unrecoverable error only).
pub async fn mark_failed(
    db: &Database,
    id: &str,
    error: &str,
    completed_at: DateTime<Utc>,
) -> Result<(), AurumError> {
    let id = id.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaign_runs SET status = 'FAILED', error_message = ?1,
                 completed_at = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![error, completed_at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Recompute a run's per-status message counters by full recount.
///
/// Correlated subqueries keep the whole refresh a single statement, so a
/// racing send and callback can never interleave partial counter writes.
pub(crate) fn recount_run_counters(
    conn: &rusqlite::Connection,
    run_id: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE campaign_runs SET
             messages_queued = (SELECT COUNT(*) FROM messages
                 WHERE campaign_run_id = ?1 AND status = 'QUEUED'),
             messages_sent = (SELECT COUNT(*) FROM messages
                 WHERE campaign_run_id = ?1 AND status = 'SENT'),
             messages_delivered = (SELECT COUNT(*) FROM messages
                 WHERE campaign_run_id = ?1 AND status = 'DELIVERED'),
             messages_read = (SELECT COUNT(*) FROM messages
                 WHERE campaign_run_id = ?1 AND status = 'READ'),
             messages_failed = (SELECT COUNT(*) FROM messages
                 WHERE campaign_run_id = ?1 AND status = 'FAILED'),
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1",
        params![run_id],
    )?;
    Ok(())
}

/// Refresh a run's counters from its message rows.
pub async fn refresh_counters(db: &Database, run_id: &str) -> Result<(), AurumError> {
    let run_id = run_id.to_string();
    db.connection()
        .call(move |conn| {
            recount_run_counters(conn, &run_id)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// RUNNING runs with no progress since `cutoff`, candidates for the
/// operational recovery sweep. Progress is tracked through `updated_at`,
/// which every counter refresh bumps.
pub async fn list_stale_running(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<CampaignRun>, AurumError> {
    // Match the strftime('%Y-%m-%dT%H:%M:%fZ') format used for updated_at.
    let cutoff = cutoff.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RUN_COLUMNS} FROM campaign_runs
                 WHERE status = 'RUNNING' AND updated_at <= ?1
                 ORDER BY updated_at ASC"
            ))?;
            let rows = stmt.query_map(params![cutoff], map_run)?;
            let mut runs = Vec::new();
            for row in rows {
                runs.push(row?);
            }
            Ok(runs)
        })
        .await
        .map_err(map_tr_err)
}
