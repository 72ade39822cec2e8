// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API provider client for the Aurum campaign engine.
//!
//! Implements [`aurum_core::ProviderClient`] over the Graph API `/messages`
//! endpoint, with transient/permanent failure classification and an
//! explicit [`RetryPolicy`] value consumed by the dispatcher.

pub mod client;
pub mod retry;

pub use client::{CloudApiClient, classify_response};
pub use retry::RetryPolicy;
