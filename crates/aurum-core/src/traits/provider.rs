// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery provider client trait.

use async_trait::async_trait;

use crate::types::{Language, ProviderMessageId, SendError};

/// Client for an external message-delivery provider.
///
/// The dispatcher fans one `send_template` call out per eligible contact.
/// The [`SendError`] classification on the failure path is the contract
/// that drives retry-vs-fail decisions, so implementations must classify
/// honestly: only errors a retry could plausibly cure are `Transient`.
#[async_trait]
pub trait ProviderClient: Send + Sync + 'static {
    /// Sends one templated message and returns the provider-assigned id.
    async fn send_template(
        &self,
        to: &str,
        template_name: &str,
        language: Language,
        body_params: &[String],
    ) -> Result<ProviderMessageId, SendError>;
}
