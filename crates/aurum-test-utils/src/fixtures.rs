// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database fixtures shared by integration tests across the workspace.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use aurum_core::types::{CampaignStatus, CampaignType, Language, Recurrence, RunStatus, Segment};
use aurum_storage::Database;
use aurum_storage::models::{Campaign, CampaignRun, Contact};
use aurum_storage::queries::{campaigns, contacts};

/// Open a migrated SQLite database in a fresh temp directory.
///
/// Keep the returned `TempDir` alive for the duration of the test.
pub async fn open_temp_db() -> (Arc<Database>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db_path = dir.path().join("aurum-test.db");
    let db = Database::open(db_path.to_str().expect("utf-8 temp path"))
        .await
        .expect("open test database");
    (Arc::new(db), dir)
}

/// An ACTIVE daily utility campaign targeting the GOLD_LOAN segment,
/// started well in the past.
pub fn campaign(id: &str, jeweller_id: &str, recurrence: Recurrence) -> Campaign {
    Campaign {
        id: id.to_string(),
        jeweller_id: jeweller_id.to_string(),
        name: format!("{id} campaign"),
        description: None,
        campaign_type: CampaignType::Utility,
        sub_segment: Some(Segment::GoldLoan),
        recurrence,
        start_at: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
        end_date: None,
        timezone: "Asia/Kolkata".to_string(),
        status: CampaignStatus::Active,
        template_name: "festival_offer".to_string(),
        language: Language::English,
        variable_mapping: Some(r#"{"1":"name"}"#.to_string()),
    }
}

/// An opted-in GOLD_LOAN contact.
pub fn contact(id: &str, jeweller_id: &str, phone: &str) -> Contact {
    Contact {
        id: id.to_string(),
        jeweller_id: jeweller_id.to_string(),
        phone_number: phone.to_string(),
        name: Some(format!("Contact {id}")),
        customer_id: None,
        segment: Segment::GoldLoan,
        preferred_language: Language::English,
        opted_out: false,
        is_deleted: false,
    }
}

/// A PENDING run for the given period boundary, counters zeroed.
pub fn run(
    id: &str,
    campaign_id: &str,
    jeweller_id: &str,
    scheduled_at: DateTime<Utc>,
) -> CampaignRun {
    CampaignRun {
        id: id.to_string(),
        campaign_id: campaign_id.to_string(),
        jeweller_id: jeweller_id.to_string(),
        scheduled_at,
        started_at: None,
        completed_at: None,
        status: RunStatus::Pending,
        total_contacts: 0,
        eligible_contacts: 0,
        messages_queued: 0,
        messages_sent: 0,
        messages_delivered: 0,
        messages_read: 0,
        messages_failed: 0,
        error_message: None,
    }
}

/// Seed a campaign row.
pub async fn seed_campaign(db: &Database, c: &Campaign) {
    campaigns::insert_campaign(db, c).await.expect("seed campaign");
}

/// Seed `count` eligible contacts for a jeweller, phones `+91900000NNNN`.
pub async fn seed_contacts(db: &Database, jeweller_id: &str, count: usize) -> Vec<Contact> {
    let mut seeded = Vec::with_capacity(count);
    for i in 0..count {
        let c = contact(
            &format!("{jeweller_id}-c{i}"),
            jeweller_id,
            &format!("+91900000{i:04}"),
        );
        contacts::insert_contact(db, &c).await.expect("seed contact");
        seeded.push(c);
    }
    seeded
}
