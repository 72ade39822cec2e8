// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed decode of the provider's webhook batch payload.
//!
//! The provider posts `entry[].changes[].value` envelopes where each value
//! carries delivery `statuses` and/or inbound `messages`. Everything the
//! pipeline does not understand surfaces as an explicit variant
//! ([`ChangeKind::Unknown`], [`map_external_status`] returning `None`)
//! rather than a silent lookup miss.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use aurum_core::types::MessageStatus;

/// Top-level webhook batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

/// One business-account entry in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<Change>,
}

/// One change notification inside an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: ChangeValue,
}

/// The payload of a change: status updates and/or inbound user messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeValue {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statuses: Vec<StatusEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<InboundMessage>,
}

/// One delivery-status event for a previously sent message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Provider message id assigned at send time.
    pub id: String,
    /// External status string: sent, delivered, read, failed.
    pub status: String,
    /// Epoch seconds, as a string per the provider's wire format.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<StatusError>,
}

/// Error detail attached to a failed status event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<i64>,
}

/// An inbound user message. Acknowledged and logged only; replying is out
/// of this pipeline's scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub from: String,
    #[serde(rename = "type", default)]
    pub message_type: String,
}

/// Classification of a change for processing.
#[derive(Debug)]
pub enum ChangeKind<'a> {
    /// The message field: carries statuses and/or inbound messages.
    Messages(&'a ChangeValue),
    /// A field this pipeline does not process.
    Unknown(&'a str),
}

impl Change {
    pub fn kind(&self) -> ChangeKind<'_> {
        if self.field == "messages" {
            ChangeKind::Messages(&self.value)
        } else {
            ChangeKind::Unknown(&self.field)
        }
    }
}

impl StatusEvent {
    /// Callback timestamp as a UTC instant, when present and well-formed.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        let secs = self.timestamp.as_deref()?.parse::<i64>().ok()?;
        Utc.timestamp_opt(secs, 0).single()
    }
}

/// Map an external status string to the internal lifecycle state.
///
/// `None` means the provider sent a status this pipeline does not model;
/// callers record it for audit instead of guessing.
pub fn map_external_status(status: &str) -> Option<MessageStatus> {
    match status.to_ascii_lowercase().as_str() {
        "sent" => Some(MessageStatus::Sent),
        "delivered" => Some(MessageStatus::Delivered),
        "read" => Some(MessageStatus::Read),
        "failed" => Some(MessageStatus::Failed),
        _ => None,
    }
}
