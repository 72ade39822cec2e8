// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Aurum campaign engine.
//!
//! TOML files merged across the XDG hierarchy with `AURUM_*` environment
//! variable overrides, extracted into strongly-typed model structs that
//! reject unknown keys.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::AurumConfig;
