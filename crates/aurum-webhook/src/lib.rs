// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery-status webhook boundary for the Aurum campaign engine.
//!
//! An axum server receives the provider's callback batches, verifies the
//! HMAC signature over the raw body, decodes the payload into typed
//! variants, and reconciles each status event into the persisted message
//! lifecycle. The reconciler never blocks on (or orders against) the
//! dispatcher: they share only message rows keyed by provider message id.

pub mod handlers;
pub mod payload;
pub mod reconciler;
pub mod server;
pub mod signature;

pub use payload::{WebhookPayload, map_external_status};
pub use reconciler::{BatchReport, ReconcileOutcome, Reconciler};
pub use server::{WebhookState, router, start_server};
pub use signature::{sign, verify_signature};
