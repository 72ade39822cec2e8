// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run coordination: evaluate, snapshot, create exactly one run, dispatch.
//!
//! Creation is double-guarded: the period-existence query avoids wasted
//! snapshot work, and the UNIQUE(campaign_id, scheduled_at) constraint
//! catches concurrent or retrying schedulers. A conflict means "already
//! triggered", never an error. If snapshotting or insertion fails, no run
//! row persists and the campaign stays eligible on the next tick.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};
use uuid::Uuid;

use aurum_core::AurumError;
use aurum_core::types::{CampaignStatus, RunStatus};
use aurum_dispatch::{DispatchHandle, Dispatcher};
use aurum_storage::Database;
use aurum_storage::models::{Campaign, CampaignRun};
use aurum_storage::queries::{campaigns, runs};

use crate::audience;
use crate::recurrence::{self, Outcome};

/// Orchestrates one scheduler tick over all ACTIVE campaigns.
pub struct Coordinator {
    db: Arc<Database>,
    dispatcher: Arc<Dispatcher>,
}

impl Coordinator {
    pub fn new(db: Arc<Database>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { db, dispatcher }
    }

    /// Evaluate every ACTIVE campaign whose start has passed and trigger
    /// the due ones.
    ///
    /// Returns a [`DispatchHandle`] per triggered run; the coordinator does
    /// not await dispatch completion itself. Per-campaign failures are
    /// isolated: one broken campaign never starves the rest of the sweep.
    pub async fn trigger_due_campaigns(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DispatchHandle>, AurumError> {
        let candidates = campaigns::list_active_started(&self.db, now).await?;
        debug!(count = candidates.len(), "evaluating active campaigns");

        let mut handles = Vec::new();
        for campaign in candidates {
            match self.trigger_one(&campaign, now).await {
                Ok(Some(handle)) => handles.push(handle),
                Ok(None) => {}
                Err(e) => {
                    error!(
                        campaign = campaign.id.as_str(),
                        error = %e,
                        "campaign trigger failed, will retry next tick"
                    );
                }
            }
        }
        Ok(handles)
    }

    async fn trigger_one(
        &self,
        campaign: &Campaign,
        now: DateTime<Utc>,
    ) -> Result<Option<DispatchHandle>, AurumError> {
        // Activation enforces this; a row that slipped through would blast
        // the whole contact base, so re-check before targeting.
        if campaign.campaign_type.requires_sub_segment() && campaign.sub_segment.is_none() {
            error!(
                campaign = campaign.id.as_str(),
                "active utility campaign without a sub-segment, skipping"
            );
            return Ok(None);
        }

        let period_start = match recurrence::evaluate(campaign, now) {
            Outcome::Expired => {
                info!(
                    campaign = campaign.id.as_str(),
                    name = campaign.name.as_str(),
                    "campaign end date passed, completing"
                );
                campaigns::set_status(&self.db, &campaign.id, CampaignStatus::Completed).await?;
                return Ok(None);
            }
            Outcome::NotDue => return Ok(None),
            Outcome::Due { period_start } => period_start,
        };

        if runs::has_run_in_period(&self.db, &campaign.id, period_start).await? {
            return Ok(None);
        }

        let snapshot = audience::snapshot(&self.db, campaign).await?;

        let run = CampaignRun {
            id: Uuid::new_v4().to_string(),
            campaign_id: campaign.id.clone(),
            jeweller_id: campaign.jeweller_id.clone(),
            scheduled_at: period_start,
            started_at: None,
            completed_at: None,
            status: RunStatus::Pending,
            total_contacts: snapshot.total,
            eligible_contacts: snapshot.eligible,
            messages_queued: 0,
            messages_sent: 0,
            messages_delivered: 0,
            messages_read: 0,
            messages_failed: 0,
            error_message: None,
        };

        match runs::insert_run(&self.db, &run).await? {
            runs::RunInsert::DuplicatePeriod => {
                debug!(
                    campaign = campaign.id.as_str(),
                    period_start = %period_start,
                    "period already has a run"
                );
                Ok(None)
            }
            runs::RunInsert::Created => {
                info!(
                    campaign = campaign.id.as_str(),
                    name = campaign.name.as_str(),
                    run_id = run.id.as_str(),
                    period_start = %period_start,
                    eligible = snapshot.eligible,
                    "campaign run created"
                );
                Ok(Some(self.dispatcher.submit(run.id)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use aurum_config::model::DispatchConfig;
    use aurum_core::types::Recurrence;
    use aurum_dispatch::CatalogRenderer;
    use aurum_test_utils::{MockProvider, fixtures};
    use chrono::{NaiveDate, TimeZone};

    fn dispatcher(db: Arc<Database>, provider: Arc<MockProvider>) -> Arc<Dispatcher> {
        let mut templates = HashMap::new();
        templates.insert(
            "festival_offer".to_string(),
            "Hi {{1}}, our festival collection is live!".to_string(),
        );
        Arc::new(Dispatcher::new(
            db,
            provider,
            Arc::new(CatalogRenderer::new(templates)),
            &DispatchConfig {
                worker_count: 4,
                max_attempts: 3,
                retry_base_delay_ms: 1,
                stale_run_secs: 1800,
            },
        ))
    }

    async fn run_count(db: &Database, campaign_id: &str) -> i64 {
        let campaign_id = campaign_id.to_string();
        db.connection()
            .call(move |conn| {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM campaign_runs WHERE campaign_id = ?1",
                    rusqlite::params![campaign_id],
                    |row| row.get(0),
                )?;
                Ok::<_, rusqlite::Error>(n)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn double_trigger_in_one_period_creates_one_run() {
        let (db, _dir) = fixtures::open_temp_db().await;
        fixtures::seed_campaign(&db, &fixtures::campaign("camp-1", "j-1", Recurrence::Daily))
            .await;
        fixtures::seed_contacts(&db, "j-1", 3).await;

        let provider = Arc::new(MockProvider::new());
        let coordinator = Coordinator::new(db.clone(), dispatcher(db.clone(), provider));
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();

        let handles = coordinator.trigger_due_campaigns(now).await.unwrap();
        assert_eq!(handles.len(), 1);
        for handle in handles {
            handle.wait().await.unwrap();
        }

        // Same period, later in the day: nothing new.
        let later = Utc.with_ymd_and_hms(2026, 3, 10, 21, 0, 0).unwrap();
        let handles = coordinator.trigger_due_campaigns(later).await.unwrap();
        assert!(handles.is_empty());
        assert_eq!(run_count(&db, "camp-1").await, 1);

        // Next day is a new period.
        let next_day = Utc.with_ymd_and_hms(2026, 3, 11, 9, 0, 0).unwrap();
        let handles = coordinator.trigger_due_campaigns(next_day).await.unwrap();
        assert_eq!(handles.len(), 1);
        for handle in handles {
            handle.wait().await.unwrap();
        }
        assert_eq!(run_count(&db, "camp-1").await, 2);
    }

    #[tokio::test]
    async fn immediate_retrigger_hits_the_unique_guard() {
        let (db, _dir) = fixtures::open_temp_db().await;
        fixtures::seed_campaign(&db, &fixtures::campaign("camp-1", "j-1", Recurrence::Daily))
            .await;
        fixtures::seed_contacts(&db, "j-1", 1).await;

        let provider = Arc::new(MockProvider::new());
        let coordinator = Coordinator::new(db.clone(), dispatcher(db.clone(), provider));
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();

        // Trigger twice without waiting for dispatch: whichever guard fires
        // (period query or unique constraint), exactly one run exists.
        let first = coordinator.trigger_due_campaigns(now).await.unwrap();
        let second = coordinator.trigger_due_campaigns(now).await.unwrap();
        assert_eq!(first.len() + second.len(), 1);
        assert_eq!(run_count(&db, "camp-1").await, 1);

        for handle in first.into_iter().chain(second) {
            handle.wait().await.unwrap();
        }
    }

    #[tokio::test]
    async fn once_campaign_runs_at_most_once_ever() {
        let (db, _dir) = fixtures::open_temp_db().await;
        fixtures::seed_campaign(&db, &fixtures::campaign("camp-1", "j-1", Recurrence::Once))
            .await;
        fixtures::seed_contacts(&db, "j-1", 2).await;

        let provider = Arc::new(MockProvider::new());
        let coordinator = Coordinator::new(db.clone(), dispatcher(db.clone(), provider));

        let handles = coordinator
            .trigger_due_campaigns(Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(handles.len(), 1);
        for handle in handles {
            handle.wait().await.unwrap();
        }

        // Days and months of later ticks never re-run it.
        for day in [11, 20, 28] {
            let tick = Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap();
            let handles = coordinator.trigger_due_campaigns(tick).await.unwrap();
            assert!(handles.is_empty());
        }
        assert_eq!(run_count(&db, "camp-1").await, 1);
    }

    #[tokio::test]
    async fn expired_campaign_completes_without_a_run() {
        let (db, _dir) = fixtures::open_temp_db().await;
        let mut campaign = fixtures::campaign("camp-1", "j-1", Recurrence::Daily);
        campaign.end_date = Some(NaiveDate::from_ymd_opt(2026, 3, 5).unwrap());
        fixtures::seed_campaign(&db, &campaign).await;
        fixtures::seed_contacts(&db, "j-1", 2).await;

        let provider = Arc::new(MockProvider::new());
        let coordinator = Coordinator::new(db.clone(), dispatcher(db.clone(), provider.clone()));

        let after_end = Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap();
        let handles = coordinator.trigger_due_campaigns(after_end).await.unwrap();
        assert!(handles.is_empty());
        assert_eq!(run_count(&db, "camp-1").await, 0);
        assert_eq!(provider.sent_count().await, 0);

        let loaded = campaigns::get_campaign(&db, "camp-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, CampaignStatus::Completed);

        // Completed campaigns drop out of later sweeps entirely.
        let next = coordinator
            .trigger_due_campaigns(Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap())
            .await
            .unwrap();
        assert!(next.is_empty());
    }

    #[tokio::test]
    async fn paused_and_draft_campaigns_are_ignored() {
        let (db, _dir) = fixtures::open_temp_db().await;
        let mut paused = fixtures::campaign("camp-paused", "j-1", Recurrence::Daily);
        paused.status = CampaignStatus::Paused;
        fixtures::seed_campaign(&db, &paused).await;

        let mut draft = fixtures::campaign("camp-draft", "j-1", Recurrence::Daily);
        draft.status = CampaignStatus::Draft;
        fixtures::seed_campaign(&db, &draft).await;

        fixtures::seed_contacts(&db, "j-1", 2).await;

        let provider = Arc::new(MockProvider::new());
        let coordinator = Coordinator::new(db.clone(), dispatcher(db.clone(), provider));

        let handles = coordinator
            .trigger_due_campaigns(Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap())
            .await
            .unwrap();
        assert!(handles.is_empty());
        assert_eq!(run_count(&db, "camp-paused").await, 0);
        assert_eq!(run_count(&db, "camp-draft").await, 0);
    }

    #[tokio::test]
    async fn utility_campaign_without_segment_is_skipped() {
        let (db, _dir) = fixtures::open_temp_db().await;
        let mut campaign = fixtures::campaign("camp-1", "j-1", Recurrence::Daily);
        campaign.sub_segment = None;
        fixtures::seed_campaign(&db, &campaign).await;
        fixtures::seed_contacts(&db, "j-1", 2).await;

        let provider = Arc::new(MockProvider::new());
        let coordinator = Coordinator::new(db.clone(), dispatcher(db.clone(), provider));

        let handles = coordinator
            .trigger_due_campaigns(Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap())
            .await
            .unwrap();
        assert!(handles.is_empty());
        assert_eq!(run_count(&db, "camp-1").await, 0);
    }

    #[tokio::test]
    async fn snapshot_counts_are_frozen_on_the_run() {
        let (db, _dir) = fixtures::open_temp_db().await;
        fixtures::seed_campaign(&db, &fixtures::campaign("camp-1", "j-1", Recurrence::Daily))
            .await;
        fixtures::seed_contacts(&db, "j-1", 4).await;
        let mut opted_out = fixtures::contact("c-out", "j-1", "+919999999999");
        opted_out.opted_out = true;
        aurum_storage::queries::contacts::insert_contact(&db, &opted_out)
            .await
            .unwrap();

        let provider = Arc::new(MockProvider::new());
        let coordinator = Coordinator::new(db.clone(), dispatcher(db.clone(), provider));

        let handles = coordinator
            .trigger_due_campaigns(Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap())
            .await
            .unwrap();
        let run_id = handles[0].run_id().to_string();
        for handle in handles {
            handle.wait().await.unwrap();
        }

        let run = runs::get_run(&db, &run_id).await.unwrap().unwrap();
        assert_eq!(run.total_contacts, 5);
        assert_eq!(run.eligible_contacts, 4);
        assert_eq!(run.messages_sent, 4);
    }
}
