// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Aurum workspace.
//!
//! Status enums serialize to the exact strings persisted in SQLite and are
//! derived with strum so storage round-trips through `Display`/`FromStr`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Provider-assigned identifier for a dispatched message.
///
/// Assigned by the delivery provider on a successful send and used as the
/// correlation key for delivery-status callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderMessageId(pub String);

/// Campaign lifecycle status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
}

/// Campaign execution-run status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// A run in a terminal state is never resumed by the dispatcher.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Campaign category. Utility campaigns require a sub-segment filter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignType {
    Utility,
    Marketing,
}

impl CampaignType {
    /// Whether campaigns of this type must target a contact sub-segment.
    pub fn requires_sub_segment(self) -> bool {
        matches!(self, Self::Utility)
    }
}

/// Contact segment tags.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Segment {
    GoldLoan,
    GoldSip,
    Marketing,
}

/// Campaign recurrence patterns. A fixed closed set, not a cron grammar.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recurrence {
    Once,
    Daily,
    Weekly,
    Monthly,
}

/// Supported template languages, serialized as BCP 47-ish codes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum Language {
    #[strum(serialize = "en")]
    #[serde(rename = "en")]
    English,
    #[strum(serialize = "hi")]
    #[serde(rename = "hi")]
    Hindi,
    #[strum(serialize = "kn")]
    #[serde(rename = "kn")]
    Kannada,
    #[strum(serialize = "ta")]
    #[serde(rename = "ta")]
    Tamil,
    #[strum(serialize = "pa")]
    #[serde(rename = "pa")]
    Punjabi,
}

impl Default for Language {
    fn default() -> Self {
        Self::English
    }
}

/// Message delivery-lifecycle status.
///
/// Transitions are monotonic along QUEUED < SENT < DELIVERED < READ.
/// FAILED is reachable from any non-terminal state and never exited.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Queued,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    /// Position in the monotonic success chain.
    fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Sent => 1,
            Self::Delivered => 2,
            Self::Read => 3,
            Self::Failed => 4,
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Read | Self::Failed)
    }

    /// Whether moving from `self` to `next` is forward progress.
    ///
    /// Duplicate and out-of-order callbacks land here as `false` and become
    /// no-ops in the reconciler rather than regressions.
    pub fn can_advance_to(self, next: MessageStatus) -> bool {
        match (self, next) {
            (Self::Failed, _) | (Self::Read, _) => false,
            (_, Self::Failed) => true,
            (current, next) => next.rank() > current.rank(),
        }
    }
}

/// Classification of a provider send failure, driving retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendErrorKind {
    /// Timeouts, 5xx, rate limits. Retried up to the policy cap.
    Transient,
    /// Invalid recipient, rejected template. Never retried.
    Permanent,
}

/// A structured send failure returned by a [`crate::ProviderClient`].
#[derive(Debug, Clone, Error)]
#[error("send failed: {message}")]
pub struct SendError {
    pub kind: SendErrorKind,
    /// Provider error code, when the provider returned a structured error.
    pub code: Option<i64>,
    pub message: String,
}

impl SendError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: SendErrorKind::Transient,
            code: None,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: SendErrorKind::Permanent,
            code: None,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == SendErrorKind::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_strings_round_trip() {
        for status in [
            MessageStatus::Queued,
            MessageStatus::Sent,
            MessageStatus::Delivered,
            MessageStatus::Read,
            MessageStatus::Failed,
        ] {
            let s = status.to_string();
            assert_eq!(MessageStatus::from_str(&s).unwrap(), status);
        }
        assert_eq!(CampaignStatus::Active.to_string(), "ACTIVE");
        assert_eq!(Segment::GoldLoan.to_string(), "GOLD_LOAN");
        assert_eq!(Recurrence::Once.to_string(), "ONCE");
        assert_eq!(Language::Kannada.to_string(), "kn");
        assert_eq!(Language::from_str("ta").unwrap(), Language::Tamil);
    }

    #[test]
    fn transitions_are_monotonic() {
        use MessageStatus::*;

        assert!(Queued.can_advance_to(Sent));
        assert!(Sent.can_advance_to(Delivered));
        assert!(Delivered.can_advance_to(Read));
        // Skipping intermediate states is still forward progress.
        assert!(Queued.can_advance_to(Read));
        assert!(Sent.can_advance_to(Read));

        // Backward moves are rejected.
        assert!(!Read.can_advance_to(Delivered));
        assert!(!Delivered.can_advance_to(Sent));
        assert!(!Sent.can_advance_to(Queued));
        // Duplicates are rejected.
        assert!(!Delivered.can_advance_to(Delivered));
    }

    #[test]
    fn failed_reachable_from_non_terminal_only() {
        use MessageStatus::*;

        assert!(Queued.can_advance_to(Failed));
        assert!(Sent.can_advance_to(Failed));
        assert!(Delivered.can_advance_to(Failed));
        // Terminal states never exit.
        assert!(!Read.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Sent));
        assert!(!Failed.can_advance_to(Failed));
    }

    #[test]
    fn utility_requires_sub_segment() {
        assert!(CampaignType::Utility.requires_sub_segment());
        assert!(!CampaignType::Marketing.requires_sub_segment());
    }

    #[test]
    fn send_error_classification() {
        let e = SendError::transient("timeout");
        assert!(e.is_transient());
        let e = SendError::permanent("invalid recipient");
        assert!(!e.is_transient());
        assert!(e.to_string().contains("invalid recipient"));
    }
}
