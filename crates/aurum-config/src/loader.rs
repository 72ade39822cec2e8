// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./aurum.toml` > `~/.config/aurum/aurum.toml` >
//! `/etc/aurum/aurum.toml` with environment variable overrides via the
//! `AURUM_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::AurumConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/aurum/aurum.toml` (system-wide)
/// 3. `~/.config/aurum/aurum.toml` (user XDG config)
/// 4. `./aurum.toml` (local directory)
/// 5. `AURUM_*` environment variables
pub fn load_config() -> Result<AurumConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AurumConfig::default()))
        .merge(Toml::file("/etc/aurum/aurum.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("aurum/aurum.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("aurum.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from an inline TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<AurumConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AurumConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AurumConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AurumConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `AURUM_WHATSAPP_PHONE_NUMBER_ID` must map
/// to `whatsapp.phone_number_id`, not `whatsapp.phone.number.id`.
fn env_provider() -> Env {
    Env::prefixed("AURUM_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("whatsapp_", "whatsapp.", 1)
            .replacen("scheduler_", "scheduler.", 1)
            .replacen("dispatch_", "dispatch.", 1)
            .replacen("webhook_", "webhook.", 1)
            .replacen("templates_", "templates.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_extract_cleanly() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.service.name, "aurum");
        assert_eq!(config.scheduler.tick_interval_secs, 60);
        assert_eq!(config.dispatch.max_attempts, 3);
        assert_eq!(config.whatsapp.api_version, "v18.0");
        assert!(config.whatsapp.app_secret.is_none());
        assert!(config.templates.is_empty());
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
            [scheduler]
            tick_interval_secs = 5

            [dispatch]
            worker_count = 2
            max_attempts = 1

            [whatsapp]
            phone_number_id = "123456"
            access_token = "token"
            app_secret = "secret"
            verify_token = "verify"

            [templates]
            festival_offer = "Hi {{1}}, our {{2}} collection is live!"
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.tick_interval_secs, 5);
        assert_eq!(config.dispatch.worker_count, 2);
        assert_eq!(config.dispatch.max_attempts, 1);
        assert_eq!(config.whatsapp.phone_number_id.as_deref(), Some("123456"));
        assert_eq!(
            config.templates.get("festival_offer").map(String::as_str),
            Some("Hi {{1}}, our {{2}} collection is live!")
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = load_config_from_str(
            r#"
            [scheduler]
            tick_interval_sec = 5
            "#,
        );
        assert!(result.is_err(), "typo'd key must fail extraction");
    }
}
