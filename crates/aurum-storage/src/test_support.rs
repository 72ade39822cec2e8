// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for the storage unit tests.

use chrono::{DateTime, TimeZone, Utc};

use aurum_core::types::{
    CampaignStatus, CampaignType, Language, MessageStatus, Recurrence, RunStatus, Segment,
};

use crate::database::Database;
use crate::models::{Campaign, CampaignRun, Contact, Message};

pub(crate) async fn open_test_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
    (db, dir)
}

pub(crate) fn sample_campaign(id: &str, jeweller_id: &str, recurrence: Recurrence) -> Campaign {
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

pub(crate) fn sample_contact(id: &str, jeweller_id: &str, phone: &str) -> Contact {
    Contact {
        id: id.to_string(),
        jeweller_id: jeweller_id.to_string(),
        phone_number: phone.to_string(),
        name: Some("Asha".to_string()),
        customer_id: None,
        segment: Segment::GoldLoan,
        preferred_language: Language::English,
        opted_out: false,
        is_deleted: false,
    }
}

pub(crate) fn sample_run(
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

pub(crate) fn sample_message(
    id: &str,
    campaign_run_id: &str,
    contact_id: &str,
    jeweller_id: &str,
) -> Message {
    Message {
        id: id.to_string(),
        jeweller_id: jeweller_id.to_string(),
        contact_id: contact_id.to_string(),
        campaign_run_id: campaign_run_id.to_string(),
        phone_number: "+911111111111".to_string(),
        template_name: "festival_offer".to_string(),
        language: Language::English,
        message_body: "Hi Asha, our festival collection is live!".to_string(),
        provider_message_id: None,
        status: MessageStatus::Queued,
        queued_at: Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap(),
        sent_at: None,
        delivered_at: None,
        read_at: None,
        failed_at: None,
        failure_reason: None,
        retry_count: 0,
    }
}
