// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Aurum campaign engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed query
//! modules for campaigns, runs, contacts, messages, and webhook events.
//!
//! The dispatcher and the webhook reconciler share one [`Database`] handle;
//! all counter updates go through single statements or transactions on the
//! serialized writer, which is what rules out lost updates when sends and
//! callbacks race for the same run's aggregates.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

#[cfg(test)]
pub(crate) mod test_support;

pub use database::Database;
pub use models::*;
