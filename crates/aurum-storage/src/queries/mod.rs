// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules for the persisted campaign entities.

pub mod campaigns;
pub mod contacts;
pub mod events;
pub mod messages;
pub mod runs;
