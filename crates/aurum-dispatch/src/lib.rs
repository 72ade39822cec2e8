// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign run dispatcher for the Aurum campaign engine.
//!
//! Fans one templated send out per eligible contact with a bounded worker
//! pool, retries transient provider failures with exponential backoff, and
//! finalizes run counters from the persisted message rows. Submission
//! returns a [`DispatchHandle`] so callers can await completion instead of
//! polling.

pub mod dispatcher;
pub mod render;

pub use dispatcher::{DispatchHandle, Dispatcher, RunSummary};
pub use render::{CatalogRenderer, build_params};
