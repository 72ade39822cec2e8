// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook endpoint handlers.
//!
//! GET is the provider's registration handshake; POST is the status
//! callback path. The raw body is verified against the signature header
//! before any parsing. A well-formed, authenticated batch always returns
//! 200 so the provider does not retry poison payloads forever; processing
//! errors are recorded on the audit row instead.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{info, warn};

use aurum_storage::queries::events;

use crate::payload::WebhookPayload;
use crate::server::WebhookState;
use crate::signature::verify_signature;

/// Registration handshake: echo `hub.challenge` when the verify token
/// matches. With no token configured, the handshake is accepted
/// (development mode).
pub async fn verify_subscription(
    State(state): State<WebhookState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge");

    if mode == Some("subscribe")
        && let Some(challenge) = challenge
    {
        let accepted = match state.verify_token.as_deref() {
            None => true,
            Some(expected) => token == Some(expected),
        };
        if accepted {
            info!("webhook verification handshake accepted");
            return (StatusCode::OK, challenge.clone()).into_response();
        }
    }

    warn!("webhook verification handshake rejected");
    StatusCode::FORBIDDEN.into_response()
}

/// Status callback: verify, decode, audit, reconcile.
pub async fn receive_status_batch(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok());
    if !verify_signature(state.app_secret.as_deref(), signature, &body) {
        warn!("webhook rejected: invalid signature");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid signature" })),
        )
            .into_response();
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "webhook rejected: malformed payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "malformed payload" })),
            )
                .into_response();
        }
    };

    // Audit first: the raw batch is recorded even if reconciliation fails.
    let event_id = match events::insert_event(
        &state.db,
        "message_status",
        &String::from_utf8_lossy(&body),
    )
    .await
    {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "failed to record webhook event");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "storage unavailable" })),
            )
                .into_response();
        }
    };

    match state.reconciler.apply_batch(&payload).await {
        Ok(report) => {
            if let Err(e) = events::mark_processed(&state.db, event_id, report.jeweller_id.clone()).await
            {
                tracing::error!(error = %e, "failed to mark webhook event processed");
            }
            info!(
                applied = report.applied,
                no_ops = report.no_ops,
                orphans = report.orphans,
                "webhook batch reconciled"
            );
            (StatusCode::OK, Json(json!({ "status": "success" }))).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "webhook batch reconciliation failed");
            if let Err(mark_err) = events::mark_error(&state.db, event_id, &e.to_string()).await {
                tracing::error!(error = %mark_err, "failed to record webhook event error");
            }
            // Still 200: the batch is recorded, retries would not help.
            (
                StatusCode::OK,
                Json(json!({ "status": "error", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}
