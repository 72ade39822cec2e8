// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for the persisted campaign entities.
//!
//! Status columns are stored as their canonical strings and parsed back
//! into the `aurum-core` enums when rows are read.

use chrono::{DateTime, NaiveDate, Utc};

use aurum_core::types::{
    CampaignStatus, CampaignType, Language, MessageStatus, Recurrence, RunStatus, Segment,
};

/// A tenant-owned campaign definition. Read-only to the pipeline except for
/// the COMPLETED transition written on expiry.
#[derive(Debug, Clone)]
pub struct Campaign {
    pub id: String,
    pub jeweller_id: String,
    pub name: String,
    pub description: Option<String>,
    pub campaign_type: CampaignType,
    /// Required before activation when `campaign_type` demands it.
    pub sub_segment: Option<Segment>,
    pub recurrence: Recurrence,
    pub start_at: DateTime<Utc>,
    /// Last calendar day (campaign timezone) the campaign may run.
    pub end_date: Option<NaiveDate>,
    /// IANA timezone name governing all period-boundary math.
    pub timezone: String,
    pub status: CampaignStatus,
    pub template_name: String,
    pub language: Language,
    /// JSON object mapping template placeholder -> contact field name.
    pub variable_mapping: Option<String>,
}

/// One execution instance of a campaign for a recurrence period.
#[derive(Debug, Clone)]
pub struct CampaignRun {
    pub id: String,
    pub campaign_id: String,
    pub jeweller_id: String,
    /// Canonical period boundary, the dedup key. Not the trigger time.
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub total_contacts: i64,
    pub eligible_contacts: i64,
    pub messages_queued: i64,
    pub messages_sent: i64,
    pub messages_delivered: i64,
    pub messages_read: i64,
    pub messages_failed: i64,
    pub error_message: Option<String>,
}

/// One outbound message addressed to one contact within one run.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub jeweller_id: String,
    pub contact_id: String,
    pub campaign_run_id: String,
    pub phone_number: String,
    pub template_name: String,
    pub language: Language,
    pub message_body: String,
    pub provider_message_id: Option<String>,
    pub status: MessageStatus,
    pub queued_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub retry_count: i64,
}

/// A tenant-scoped contact. Consumed read-only as an audience predicate.
#[derive(Debug, Clone)]
pub struct Contact {
    pub id: String,
    pub jeweller_id: String,
    pub phone_number: String,
    pub name: Option<String>,
    pub customer_id: Option<String>,
    pub segment: Segment,
    pub preferred_language: Language,
    pub opted_out: bool,
    pub is_deleted: bool,
}

impl Contact {
    /// Resolve a contact field by name for template variable mapping.
    ///
    /// Unknown or unset fields resolve to an empty string so one contact's
    /// missing data never fails a whole send.
    pub fn field(&self, name: &str) -> String {
        match name {
            "name" => self.name.clone().unwrap_or_default(),
            "phone_number" => self.phone_number.clone(),
            "customer_id" => self.customer_id.clone().unwrap_or_default(),
            "segment" => self.segment.to_string(),
            "preferred_language" => self.preferred_language.to_string(),
            _ => String::new(),
        }
    }
}

/// Audit record for one inbound webhook call.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub id: i64,
    pub jeweller_id: Option<String>,
    pub event_type: String,
    pub payload: String,
    pub processed: bool,
    pub error_message: Option<String>,
}

/// Parse a TEXT column into a strum-derived enum, mapping parse failures to
/// a rusqlite conversion error so they surface through the query layer.
pub(crate) fn column_enum<T>(idx: usize, value: String) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
