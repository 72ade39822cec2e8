// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Aurum integration tests.
//!
//! Provides a scripted mock delivery provider and SQLite fixtures so the
//! scheduler, dispatcher, and webhook crates can drive the real pipeline
//! against deterministic collaborators.

pub mod fixtures;
pub mod mock_provider;

pub use mock_provider::{MockProvider, SentRecord};
