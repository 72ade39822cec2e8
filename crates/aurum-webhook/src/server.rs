// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use aurum_config::model::{WebhookConfig, WhatsAppConfig};
use aurum_core::AurumError;
use aurum_storage::Database;

use crate::handlers;
use crate::reconciler::Reconciler;

/// Shared state for the webhook handlers.
#[derive(Clone)]
pub struct WebhookState {
    pub db: Arc<Database>,
    pub reconciler: Arc<Reconciler>,
    /// App secret for signature verification. `None` skips verification.
    pub app_secret: Option<String>,
    /// Pre-shared token for the registration handshake.
    pub verify_token: Option<String>,
}

impl WebhookState {
    pub fn new(db: Arc<Database>, whatsapp: &WhatsAppConfig) -> Self {
        Self {
            reconciler: Arc::new(Reconciler::new(db.clone())),
            db,
            app_secret: whatsapp.app_secret.clone(),
            verify_token: whatsapp.verify_token.clone(),
        }
    }
}

/// Build the webhook router: GET handshake + POST status callbacks.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route(
            "/webhooks/whatsapp",
            get(handlers::verify_subscription).post(handlers::receive_status_batch),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve the webhook endpoint until the token is cancelled.
pub async fn start_server(
    config: &WebhookConfig,
    state: WebhookState,
    cancel: CancellationToken,
) -> Result<(), AurumError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AurumError::Webhook(format!("failed to bind webhook server to {addr}: {e}")))?;

    info!("webhook server listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| AurumError::Webhook(format!("webhook server error: {e}")))?;

    Ok(())
}
