// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery-status reconciliation.
//!
//! Applies provider callbacks to persisted message state. Idempotent under
//! at-least-once delivery: duplicates and out-of-order events become no-ops
//! through the monotonic transition rule in storage. Unknown message ids
//! and unknown status strings are recorded for audit, never fatal.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use aurum_core::AurumError;
use aurum_core::types::MessageStatus;
use aurum_storage::Database;
use aurum_storage::queries::events;
use aurum_storage::queries::messages::{self, StatusApply};

use crate::payload::{ChangeKind, StatusEvent, WebhookPayload, map_external_status};

/// Outcome of reconciling a single status event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied { run_id: String, jeweller_id: String },
    /// Duplicate or out-of-order event; nothing changed.
    NoOp,
    /// No message carries this provider id; recorded for audit.
    Orphan,
    /// The provider sent a status string this pipeline does not model.
    UnknownStatus,
}

/// Aggregate counts for one reconciled batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub applied: usize,
    pub no_ops: usize,
    pub orphans: usize,
    pub unknown: usize,
    /// Tenant resolved from the first applied event, for audit stamping.
    pub jeweller_id: Option<String>,
}

/// Applies delivery callbacks to message state. Runs on the webhook path,
/// fully decoupled from the dispatcher; the two share only message rows.
pub struct Reconciler {
    db: Arc<Database>,
}

impl Reconciler {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Reconcile every status event in a decoded batch.
    pub async fn apply_batch(&self, payload: &WebhookPayload) -> Result<BatchReport, AurumError> {
        let mut report = BatchReport::default();

        for entry in &payload.entry {
            for change in &entry.changes {
                match change.kind() {
                    ChangeKind::Unknown(field) => {
                        warn!(field, "ignoring unknown webhook change field");
                    }
                    ChangeKind::Messages(value) => {
                        for event in &value.statuses {
                            match self.apply_status_update(event).await? {
                                ReconcileOutcome::Applied { jeweller_id, .. } => {
                                    report.applied += 1;
                                    report.jeweller_id.get_or_insert(jeweller_id);
                                }
                                ReconcileOutcome::NoOp => report.no_ops += 1,
                                ReconcileOutcome::Orphan => report.orphans += 1,
                                ReconcileOutcome::UnknownStatus => report.unknown += 1,
                            }
                        }
                        for inbound in &value.messages {
                            // Inbound user messages are out of scope here.
                            debug!(
                                from = inbound.from.as_str(),
                                message_type = inbound.message_type.as_str(),
                                "ignoring inbound user message"
                            );
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    /// Apply one status event to its message.
    pub async fn apply_status_update(
        &self,
        event: &StatusEvent,
    ) -> Result<ReconcileOutcome, AurumError> {
        let Some(status) = map_external_status(&event.status) else {
            warn!(
                provider_message_id = event.id.as_str(),
                status = event.status.as_str(),
                "unknown delivery status"
            );
            self.audit("unknown_status", event).await?;
            return Ok(ReconcileOutcome::UnknownStatus);
        };

        let at = event.timestamp_utc().unwrap_or_else(Utc::now);
        let error_detail = (status == MessageStatus::Failed)
            .then(|| event.errors.first().map(|e| e.message.clone()))
            .flatten();

        match messages::apply_delivery_status(&self.db, &event.id, status, at, error_detail)
            .await?
        {
            StatusApply::Applied { run_id, jeweller_id } => {
                debug!(
                    provider_message_id = event.id.as_str(),
                    status = %status,
                    run_id = run_id.as_str(),
                    "delivery status applied"
                );
                Ok(ReconcileOutcome::Applied { run_id, jeweller_id })
            }
            StatusApply::NoOp => Ok(ReconcileOutcome::NoOp),
            StatusApply::NotFound => {
                warn!(
                    provider_message_id = event.id.as_str(),
                    "status update for unknown message"
                );
                self.audit("orphan_status", event).await?;
                Ok(ReconcileOutcome::Orphan)
            }
        }
    }

    async fn audit(&self, event_type: &str, event: &StatusEvent) -> Result<(), AurumError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| AurumError::Internal(format!("failed to serialize audit event: {e}")))?;
        events::insert_event(&self.db, event_type, &payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurum_core::types::Recurrence;
    use aurum_storage::queries::{messages as message_queries, runs};
    use aurum_test_utils::fixtures;
    use chrono::TimeZone;

    fn event(id: &str, status: &str) -> StatusEvent {
        StatusEvent {
            id: id.into(),
            status: status.into(),
            timestamp: Some("1767072600".into()),
            recipient_id: None,
            errors: vec![],
        }
    }

    async fn seeded() -> (Arc<Database>, tempfile::TempDir, Reconciler) {
        let (db, dir) = fixtures::open_temp_db().await;
        fixtures::seed_campaign(&db, &fixtures::campaign("camp-1", "j-1", Recurrence::Daily))
            .await;
        let contacts = fixtures::seed_contacts(&db, "j-1", 1).await;
        let period = chrono::Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        runs::insert_run(&db, &fixtures::run("run-1", "camp-1", "j-1", period))
            .await
            .unwrap();

        let msg = aurum_storage::models::Message {
            id: "m-1".into(),
            jeweller_id: "j-1".into(),
            contact_id: contacts[0].id.clone(),
            campaign_run_id: "run-1".into(),
            phone_number: contacts[0].phone_number.clone(),
            template_name: "festival_offer".into(),
            language: aurum_core::types::Language::English,
            message_body: "hi".into(),
            provider_message_id: None,
            status: MessageStatus::Queued,
            queued_at: period,
            sent_at: None,
            delivered_at: None,
            read_at: None,
            failed_at: None,
            failure_reason: None,
            retry_count: 0,
        };
        message_queries::insert_message(&db, &msg).await.unwrap();
        message_queries::mark_sent(&db, "m-1", "wamid.1", period)
            .await
            .unwrap();

        let reconciler = Reconciler::new(db.clone());
        (db, dir, reconciler)
    }

    #[tokio::test]
    async fn applies_and_reports_tenant() {
        let (db, _dir, reconciler) = seeded().await;

        let outcome = reconciler
            .apply_status_update(&event("wamid.1", "delivered"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Applied {
                run_id: "run-1".into(),
                jeweller_id: "j-1".into()
            }
        );

        let run = runs::get_run(&db, "run-1").await.unwrap().unwrap();
        assert_eq!(run.messages_delivered, 1);
    }

    #[tokio::test]
    async fn orphan_event_is_audited() {
        let (db, _dir, reconciler) = seeded().await;

        let outcome = reconciler
            .apply_status_update(&event("wamid.ghost", "delivered"))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Orphan);

        // An audit row exists for the orphan.
        let count: i64 = db
            .connection()
            .call(|conn| {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM webhook_events WHERE event_type = 'orphan_status'",
                    [],
                    |row| row.get(0),
                )?;
                Ok::<_, rusqlite::Error>(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn unknown_status_is_audited_not_applied() {
        let (db, _dir, reconciler) = seeded().await;

        let outcome = reconciler
            .apply_status_update(&event("wamid.1", "warehoused"))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::UnknownStatus);

        let msg = message_queries::get_message(&db, "m-1").await.unwrap().unwrap();
        assert_eq!(msg.status, MessageStatus::Sent);
    }

    #[tokio::test]
    async fn batch_reconciles_out_of_order_and_duplicates() {
        let (db, _dir, reconciler) = seeded().await;

        // READ before DELIVERED, plus a duplicate DELIVERED afterwards.
        let payload = WebhookPayload {
            object: "whatsapp_business_account".into(),
            entry: vec![crate::payload::Entry {
                id: "acct".into(),
                changes: vec![crate::payload::Change {
                    field: "messages".into(),
                    value: crate::payload::ChangeValue {
                        statuses: vec![
                            event("wamid.1", "read"),
                            event("wamid.1", "delivered"),
                            event("wamid.1", "delivered"),
                        ],
                        messages: vec![],
                    },
                }],
            }],
        };

        let report = reconciler.apply_batch(&payload).await.unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.no_ops, 2);
        assert_eq!(report.jeweller_id.as_deref(), Some("j-1"));

        let msg = message_queries::get_message(&db, "m-1").await.unwrap().unwrap();
        assert_eq!(msg.status, MessageStatus::Read);

        let run = runs::get_run(&db, "run-1").await.unwrap().unwrap();
        assert_eq!(run.messages_read, 1);
        assert_eq!(run.messages_delivered, 0);
    }

    #[tokio::test]
    async fn failed_event_captures_provider_error() {
        let (db, _dir, reconciler) = seeded().await;

        let mut failed = event("wamid.1", "failed");
        failed.errors = vec![crate::payload::StatusError {
            message: "Receiver incapable".into(),
            code: Some(131026),
        }];

        let outcome = reconciler.apply_status_update(&failed).await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Applied { .. }));

        let msg = message_queries::get_message(&db, "m-1").await.unwrap().unwrap();
        assert_eq!(msg.status, MessageStatus::Failed);
        assert_eq!(msg.failure_reason.as_deref(), Some("Receiver incapable"));
    }
}
