// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `aurum serve` command implementation.
//!
//! Wires the explicitly constructed pipeline: storage, provider client,
//! renderer, dispatcher, coordinator, scheduler loop, and the webhook
//! server. No global singletons; every component is a value handed its
//! dependencies, so tests can assemble isolated instances the same way.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use aurum_config::AurumConfig;
use aurum_core::{AurumError, ProviderClient, TemplateRenderer};
use aurum_dispatch::{CatalogRenderer, Dispatcher};
use aurum_scheduler::{Coordinator, SchedulerLoop};
use aurum_storage::Database;
use aurum_storage::queries::runs;
use aurum_webhook::WebhookState;
use aurum_whatsapp::CloudApiClient;

use crate::shutdown;

/// Runs the `aurum serve` command until SIGINT/SIGTERM.
pub async fn run_serve(config: AurumConfig) -> Result<(), AurumError> {
    init_tracing(&config.service.log_level);
    info!(service = config.service.name.as_str(), "starting aurum serve");

    let db = Arc::new(Database::open(&config.storage.database_path).await?);

    let provider: Arc<dyn ProviderClient> = {
        let client = CloudApiClient::new(&config.whatsapp).map_err(|e| {
            error!(error = %e, "failed to initialize WhatsApp client");
            eprintln!(
                "error: WhatsApp credentials required. Set whatsapp.phone_number_id and \
                 whatsapp.access_token via config or AURUM_WHATSAPP_* environment variables."
            );
            e
        })?;
        Arc::new(client)
    };

    let renderer: Arc<dyn TemplateRenderer> =
        Arc::new(CatalogRenderer::new(config.templates.clone()));
    if config.templates.is_empty() {
        warn!("template catalog is empty; campaign sends will fail to render");
    }

    let dispatcher = Arc::new(Dispatcher::new(
        db.clone(),
        provider,
        renderer,
        &config.dispatch,
    ));
    let coordinator = Arc::new(Coordinator::new(db.clone(), dispatcher));

    // Crash-recovery visibility: surface runs a previous process left
    // RUNNING. Recovery itself is an operational concern, not automatic.
    let stale_cutoff = Utc::now() - chrono::Duration::seconds(config.dispatch.stale_run_secs as i64);
    let stale = runs::list_stale_running(&db, stale_cutoff).await?;
    for run in &stale {
        warn!(
            run_id = run.id.as_str(),
            campaign = run.campaign_id.as_str(),
            "stale RUNNING run found; needs operational recovery"
        );
    }

    let cancel = shutdown::install_signal_handler();

    // Webhook server runs on its own task, decoupled from the scheduler.
    let webhook_state = WebhookState::new(db.clone(), &config.whatsapp);
    if webhook_state.app_secret.is_none() {
        warn!("whatsapp.app_secret not set; webhook signatures will NOT be verified");
    }
    let webhook_config = config.webhook.clone();
    let webhook_cancel = cancel.clone();
    let webhook_task = tokio::spawn(async move {
        if let Err(e) =
            aurum_webhook::start_server(&webhook_config, webhook_state, webhook_cancel).await
        {
            error!(error = %e, "webhook server exited with error");
        }
    });

    // The scheduler loop is the foreground task; it returns on shutdown.
    SchedulerLoop::new(coordinator, &config.scheduler)
        .run(cancel.clone())
        .await;

    if let Err(e) = webhook_task.await {
        error!(error = %e, "webhook server task panicked");
    }

    info!("aurum serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("aurum={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
