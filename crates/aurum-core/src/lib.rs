// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Aurum campaign engine.
//!
//! Provides the error type, domain status enums with their monotonic
//! transition rules, and the collaborator traits (delivery provider,
//! template renderer) implemented by the outer crates.

pub mod error;
pub mod traits;
pub mod types;

pub use error::AurumError;
pub use traits::{ProviderClient, TemplateRenderer};
pub use types::{
    CampaignStatus, CampaignType, Language, MessageStatus, ProviderMessageId, Recurrence,
    RunStatus, Segment, SendError, SendErrorKind,
};
