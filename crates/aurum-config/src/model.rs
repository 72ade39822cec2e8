// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Aurum campaign engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup rather than silently ignoring typos.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level Aurum configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections default to sensible values; only the
/// WhatsApp credentials are genuinely required to send real traffic.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AurumConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// WhatsApp Cloud API settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Campaign scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Dispatcher fan-out and retry settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Delivery-status webhook server settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Local template catalog: template name -> body with `{{n}}` placeholders.
    ///
    /// Used by the built-in renderer to produce the persisted message body.
    /// The provider renders from its own approved copy of the template.
    #[serde(default)]
    pub templates: HashMap<String, String>,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "aurum".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("aurum").join("aurum.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("aurum.db"))
        .to_string_lossy()
        .into_owned()
}

/// WhatsApp Cloud API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Phone number id the messages are sent from. `None` disables sending.
    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Graph API bearer token.
    #[serde(default)]
    pub access_token: Option<String>,

    /// App secret used to verify webhook signatures. `None` skips
    /// verification (development mode only).
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Pre-shared token echoed during the webhook registration handshake.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// Graph API version segment.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Graph API base URL. Overridden in tests to point at a mock server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-call send timeout in seconds, distinct from any run deadline.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            phone_number_id: None,
            access_token: None,
            app_secret: None,
            verify_token: None,
            api_version: default_api_version(),
            base_url: default_base_url(),
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

fn default_api_version() -> String {
    "v18.0".to_string()
}

fn default_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_send_timeout_secs() -> u64 {
    30
}

/// Campaign scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Seconds between scheduler ticks. Campaigns become due at tick
    /// granularity; this is the accepted latency bound.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

fn default_tick_interval_secs() -> u64 {
    60
}

/// Dispatcher fan-out and retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Bound on concurrent provider sends per run.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Maximum send attempts per message (first try included).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential retry backoff, in milliseconds.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// A RUNNING run with no progress for this many seconds is considered
    /// stale and surfaced to the operational recovery sweep.
    #[serde(default = "default_stale_run_secs")]
    pub stale_run_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            stale_run_secs: default_stale_run_secs(),
        }
    }
}

fn default_worker_count() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_stale_run_secs() -> u64 {
    1800
}

/// Delivery-status webhook server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Host address to bind.
    #[serde(default = "default_webhook_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_webhook_port")]
    pub port: u16,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: default_webhook_host(),
            port: default_webhook_port(),
        }
    }
}

fn default_webhook_host() -> String {
    "127.0.0.1".to_string()
}

fn default_webhook_port() -> u16 {
    8080
}
