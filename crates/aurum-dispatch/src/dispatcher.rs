// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign run execution.
//!
//! One spawned task per run fans sends out under a semaphore bound, retries
//! transient provider failures per the retry policy, and finalizes the run
//! counters by full recount. Per-message failures are isolated; only an
//! infrastructure failure (storage unavailable) fails the run as a whole.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use aurum_config::model::DispatchConfig;
use aurum_core::types::MessageStatus;
use aurum_core::{AurumError, ProviderClient, TemplateRenderer};
use aurum_storage::Database;
use aurum_storage::models::{Campaign, Contact, Message};
use aurum_storage::queries::{campaigns, contacts, messages, runs};
use aurum_whatsapp::RetryPolicy;

use crate::render::build_params;

/// Final counters of a dispatched run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub queued: i64,
    pub sent: i64,
    pub failed: i64,
}

/// Observable completion signal for a submitted run.
///
/// Dropping the handle detaches the run (it still executes); awaiting it
/// lets callers and tests observe completion deterministically instead of
/// polling the clock.
pub struct DispatchHandle {
    run_id: String,
    handle: JoinHandle<Result<RunSummary, AurumError>>,
}

impl DispatchHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Wait for the run to finish and return its summary.
    pub async fn wait(self) -> Result<RunSummary, AurumError> {
        self.handle
            .await
            .map_err(|e| AurumError::Internal(format!("dispatch task panicked: {e}")))?
    }
}

/// Executes campaign runs against the delivery provider.
///
/// Explicitly constructed and wired at startup; tests assemble isolated
/// instances around mock collaborators.
pub struct Dispatcher {
    db: Arc<Database>,
    provider: Arc<dyn ProviderClient>,
    renderer: Arc<dyn TemplateRenderer>,
    worker_count: usize,
    retry: RetryPolicy,
}

impl Dispatcher {
    pub fn new(
        db: Arc<Database>,
        provider: Arc<dyn ProviderClient>,
        renderer: Arc<dyn TemplateRenderer>,
        config: &DispatchConfig,
    ) -> Self {
        Self {
            db,
            provider,
            renderer,
            worker_count: config.worker_count.max(1),
            retry: RetryPolicy::new(
                config.max_attempts,
                std::time::Duration::from_millis(config.retry_base_delay_ms),
            ),
        }
    }

    /// Submit a run for asynchronous execution.
    pub fn submit(&self, run_id: impl Into<String>) -> DispatchHandle {
        let run_id = run_id.into();
        let db = self.db.clone();
        let provider = self.provider.clone();
        let renderer = self.renderer.clone();
        let worker_count = self.worker_count;
        let retry = self.retry;

        let task_run_id = run_id.clone();
        let handle = tokio::spawn(async move {
            let result =
                execute_run(&db, provider, renderer, worker_count, retry, &task_run_id).await;
            if let Err(ref e) = result {
                error!(run_id = task_run_id.as_str(), error = %e, "campaign run failed");
                // Best-effort: leave an honest terminal state behind.
                if let Err(mark_err) =
                    runs::mark_failed(&db, &task_run_id, &e.to_string(), Utc::now()).await
                {
                    error!(
                        run_id = task_run_id.as_str(),
                        error = %mark_err,
                        "failed to record run failure"
                    );
                }
            }
            result
        });

        DispatchHandle { run_id, handle }
    }
}

async fn execute_run(
    db: &Arc<Database>,
    provider: Arc<dyn ProviderClient>,
    renderer: Arc<dyn TemplateRenderer>,
    worker_count: usize,
    retry: RetryPolicy,
    run_id: &str,
) -> Result<RunSummary, AurumError> {
    let Some(run) = runs::get_run(db, run_id).await? else {
        return Err(AurumError::Internal(format!("campaign run {run_id} not found")));
    };

    // Resubmitting a finished run is a no-op, not a resend.
    if run.status.is_terminal() {
        debug!(run_id, status = %run.status, "run already terminal, skipping");
        return Ok(RunSummary {
            run_id: run_id.to_string(),
            queued: run.messages_queued,
            sent: run.messages_sent,
            failed: run.messages_failed,
        });
    }

    let Some(campaign) = campaigns::get_campaign(db, &run.campaign_id).await? else {
        return Err(AurumError::Internal(format!(
            "campaign {} for run {run_id} not found",
            run.campaign_id
        )));
    };

    runs::mark_running(db, run_id, Utc::now()).await?;
    info!(
        run_id,
        campaign = campaign.name.as_str(),
        "starting campaign run"
    );

    // The eligible set is re-resolved with the same predicate the snapshot
    // used; the counts frozen on the run at creation stay authoritative.
    let audience = contacts::audience_for(db, &campaign.jeweller_id, campaign.sub_segment).await?;

    if audience.contacts.is_empty() {
        warn!(run_id, campaign = campaign.name.as_str(), "no eligible contacts");
        runs::refresh_counters(db, run_id).await?;
        runs::mark_completed(db, run_id, Utc::now()).await?;
        return Ok(RunSummary {
            run_id: run_id.to_string(),
            queued: 0,
            sent: 0,
            failed: 0,
        });
    }

    let semaphore = Arc::new(Semaphore::new(worker_count));
    let mut handles = Vec::with_capacity(audience.contacts.len());
    for contact in audience.contacts {
        let db = db.clone();
        let provider = provider.clone();
        let renderer = renderer.clone();
        let campaign = campaign.clone();
        let run_id = run_id.to_string();
        let semaphore = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| AurumError::Internal(format!("worker pool closed: {e}")))?;
            send_one(&db, &*provider, &*renderer, &campaign, &run_id, &contact, retry).await
        }));
    }

    // Message-level failures were already persisted inside send_one; only
    // storage errors propagate and fail the run.
    let mut first_error = None;
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => first_error = first_error.or(Some(e)),
            Err(e) => {
                first_error = first_error
                    .or_else(|| Some(AurumError::Internal(format!("send task panicked: {e}"))));
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    runs::refresh_counters(db, run_id).await?;
    runs::mark_completed(db, run_id, Utc::now()).await?;

    let finished = runs::get_run(db, run_id)
        .await?
        .ok_or_else(|| AurumError::Internal(format!("run {run_id} vanished mid-finalize")))?;
    info!(
        run_id,
        sent = finished.messages_sent,
        failed = finished.messages_failed,
        "campaign run completed"
    );

    Ok(RunSummary {
        run_id: run_id.to_string(),
        queued: finished.messages_queued,
        sent: finished.messages_sent,
        failed: finished.messages_failed,
    })
}

/// Render, persist, and deliver one message. Never fails the run for a
/// provider error; returns `Err` only on storage failure.
async fn send_one(
    db: &Database,
    provider: &dyn ProviderClient,
    renderer: &dyn TemplateRenderer,
    campaign: &Campaign,
    run_id: &str,
    contact: &Contact,
    retry: RetryPolicy,
) -> Result<(), AurumError> {
    let message_id = Uuid::new_v4().to_string();
    let params = build_params(campaign.variable_mapping.as_deref(), contact);
    let now = Utc::now();

    let body = match renderer.render(&campaign.template_name, campaign.language, &params) {
        Ok(body) => body,
        Err(e) => {
            // Rendering failure is permanent for this contact.
            warn!(
                contact = contact.id.as_str(),
                error = %e,
                "template rendering failed"
            );
            let msg = Message {
                id: message_id,
                jeweller_id: campaign.jeweller_id.clone(),
                contact_id: contact.id.clone(),
                campaign_run_id: run_id.to_string(),
                phone_number: contact.phone_number.clone(),
                template_name: campaign.template_name.clone(),
                language: campaign.language,
                message_body: String::new(),
                provider_message_id: None,
                status: MessageStatus::Failed,
                queued_at: now,
                sent_at: None,
                delivered_at: None,
                read_at: None,
                failed_at: Some(now),
                failure_reason: Some(format!("template rendering failed: {e}")),
                retry_count: 0,
            };
            return messages::insert_message(db, &msg).await;
        }
    };

    let msg = Message {
        id: message_id.clone(),
        jeweller_id: campaign.jeweller_id.clone(),
        contact_id: contact.id.clone(),
        campaign_run_id: run_id.to_string(),
        phone_number: contact.phone_number.clone(),
        template_name: campaign.template_name.clone(),
        language: campaign.language,
        message_body: body,
        provider_message_id: None,
        status: MessageStatus::Queued,
        queued_at: now,
        sent_at: None,
        delivered_at: None,
        read_at: None,
        failed_at: None,
        failure_reason: None,
        retry_count: 0,
    };
    messages::insert_message(db, &msg).await?;

    let mut attempt = 1u32;
    loop {
        match provider
            .send_template(
                &contact.phone_number,
                &campaign.template_name,
                campaign.language,
                &params,
            )
            .await
        {
            Ok(provider_id) => {
                messages::mark_sent(db, &message_id, &provider_id.0, Utc::now()).await?;
                debug!(
                    message = message_id.as_str(),
                    to = contact.phone_number.as_str(),
                    "message sent"
                );
                return Ok(());
            }
            Err(e) if retry.should_retry(&e, attempt) => {
                warn!(
                    message = message_id.as_str(),
                    attempt,
                    error = %e,
                    "transient send failure, retrying"
                );
                tokio::time::sleep(retry.delay_for(attempt)).await;
                attempt += 1;
            }
            Err(e) => {
                let retries = i64::from(attempt - 1);
                warn!(
                    message = message_id.as_str(),
                    retries,
                    error = %e,
                    "message failed"
                );
                messages::mark_send_failed(db, &message_id, &e.message, retries, Utc::now())
                    .await?;
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use aurum_core::types::{Recurrence, RunStatus, SendError};
    use aurum_storage::queries::runs::{RunInsert, insert_run};
    use aurum_test_utils::fixtures;
    use aurum_test_utils::MockProvider;
    use chrono::TimeZone;

    use crate::render::CatalogRenderer;

    fn renderer() -> Arc<dyn TemplateRenderer> {
        let mut templates = HashMap::new();
        templates.insert(
            "festival_offer".to_string(),
            "Hi {{1}}, our festival collection is live!".to_string(),
        );
        Arc::new(CatalogRenderer::new(templates))
    }

    fn dispatch_config() -> DispatchConfig {
        DispatchConfig {
            worker_count: 4,
            max_attempts: 3,
            retry_base_delay_ms: 1,
            stale_run_secs: 1800,
        }
    }

    async fn setup(
        contact_count: usize,
    ) -> (
        Arc<Database>,
        tempfile::TempDir,
        Arc<MockProvider>,
        Dispatcher,
        Vec<aurum_storage::models::Contact>,
    ) {
        let (db, dir) = fixtures::open_temp_db().await;
        let campaign = fixtures::campaign("camp-1", "j-1", Recurrence::Daily);
        fixtures::seed_campaign(&db, &campaign).await;
        let contacts = fixtures::seed_contacts(&db, "j-1", contact_count).await;

        let period = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        let run = fixtures::run("run-1", "camp-1", "j-1", period);
        assert_eq!(insert_run(&db, &run).await.unwrap(), RunInsert::Created);

        let provider = Arc::new(MockProvider::new());
        let dispatcher = Dispatcher::new(
            db.clone(),
            provider.clone(),
            renderer(),
            &dispatch_config(),
        );
        (db, dir, provider, dispatcher, contacts)
    }

    #[tokio::test]
    async fn all_sends_succeed() {
        let (db, _dir, provider, dispatcher, _contacts) = setup(10).await;

        let summary = dispatcher.submit("run-1").wait().await.unwrap();
        assert_eq!(summary.sent, 10);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.queued, 0);
        assert_eq!(provider.sent_count().await, 10);

        let run = runs::get_run(&db, "run-1").await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.started_at.is_some());
        assert!(run.completed_at.is_some());
        assert_eq!(run.messages_sent, 10);
        assert_eq!(run.messages_failed, 0);

        // Every message carries a provider id and a rendered body.
        let msgs = messages::list_for_run(&db, "run-1").await.unwrap();
        assert_eq!(msgs.len(), 10);
        for msg in &msgs {
            assert_eq!(msg.status, MessageStatus::Sent);
            assert!(msg.provider_message_id.is_some());
            assert!(msg.message_body.contains("festival collection"));
        }
    }

    #[tokio::test]
    async fn permanent_failures_are_isolated() {
        let (db, _dir, provider, dispatcher, contacts) = setup(10).await;
        for contact in contacts.iter().take(3) {
            provider
                .script(
                    &contact.phone_number,
                    vec![Err(SendError::permanent("invalid recipient"))],
                )
                .await;
        }

        let summary = dispatcher.submit("run-1").wait().await.unwrap();
        assert_eq!(summary.sent, 7);
        assert_eq!(summary.failed, 3);

        let run = runs::get_run(&db, "run-1").await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.messages_sent, 7);
        assert_eq!(run.messages_failed, 3);

        let msgs = messages::list_for_run(&db, "run-1").await.unwrap();
        let failed: Vec<_> = msgs
            .iter()
            .filter(|m| m.status == MessageStatus::Failed)
            .collect();
        assert_eq!(failed.len(), 3);
        for msg in failed {
            assert_eq!(msg.failure_reason.as_deref(), Some("invalid recipient"));
            assert_eq!(msg.retry_count, 0);
            assert!(msg.failed_at.is_some());
        }
        // Permanent errors are not retried: 10 contacts, 10 attempts.
        assert_eq!(provider.sent_count().await, 10);
    }

    #[tokio::test]
    async fn transient_failure_retries_then_succeeds() {
        let (db, _dir, provider, dispatcher, contacts) = setup(1).await;
        provider
            .script(
                &contacts[0].phone_number,
                vec![Err(SendError::transient("timeout"))],
            )
            .await;

        let summary = dispatcher.submit("run-1").wait().await.unwrap();
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.failed, 0);
        // First attempt plus one retry.
        assert_eq!(provider.sent_count().await, 2);

        let msgs = messages::list_for_run(&db, "run-1").await.unwrap();
        assert_eq!(msgs[0].status, MessageStatus::Sent);
    }

    #[tokio::test]
    async fn transient_failures_exhaust_retry_budget() {
        let (db, _dir, provider, dispatcher, contacts) = setup(1).await;
        provider
            .script(
                &contacts[0].phone_number,
                vec![
                    Err(SendError::transient("timeout")),
                    Err(SendError::transient("timeout")),
                    Err(SendError::transient("timeout")),
                ],
            )
            .await;

        let summary = dispatcher.submit("run-1").wait().await.unwrap();
        assert_eq!(summary.sent, 0);
        assert_eq!(summary.failed, 1);
        assert_eq!(provider.sent_count().await, 3);

        let msgs = messages::list_for_run(&db, "run-1").await.unwrap();
        assert_eq!(msgs[0].status, MessageStatus::Failed);
        assert_eq!(msgs[0].retry_count, 2);
        assert_eq!(msgs[0].failure_reason.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn empty_audience_completes_with_zero_counters() {
        let (db, _dir, provider, dispatcher, _contacts) = setup(0).await;

        let summary = dispatcher.submit("run-1").wait().await.unwrap();
        assert_eq!(summary.sent, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(provider.sent_count().await, 0);

        let run = runs::get_run(&db, "run-1").await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn missing_run_is_an_error() {
        let (_db, _dir, _provider, dispatcher, _contacts) = setup(0).await;
        let result = dispatcher.submit("run-ghost").wait().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn terminal_run_is_not_re_executed() {
        let (db, _dir, provider, dispatcher, _contacts) = setup(5).await;

        let first = dispatcher.submit("run-1").wait().await.unwrap();
        assert_eq!(first.sent, 5);
        assert_eq!(provider.sent_count().await, 5);

        let second = dispatcher.submit("run-1").wait().await.unwrap();
        assert_eq!(second.sent, 5);
        // No additional provider traffic on resubmission.
        assert_eq!(provider.sent_count().await, 5);

        let run = runs::get_run(&db, "run-1").await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
    }
}
