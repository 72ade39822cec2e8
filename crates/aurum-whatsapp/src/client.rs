// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API client.
//!
//! Sends approved template messages via the Graph API and classifies
//! failures into transient (retry) and permanent (fail now). The per-call
//! timeout lives on the underlying HTTP client, distinct from any run-level
//! deadline.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use aurum_config::model::WhatsAppConfig;
use aurum_core::types::{Language, ProviderMessageId, SendError, SendErrorKind};
use aurum_core::{AurumError, ProviderClient};

/// Graph API error codes that signal throttling rather than a bad request.
/// 4 = app-level rate limit, 80007 = WABA rate limit, 130429 = pair rate limit.
const THROTTLING_CODES: [i64; 3] = [4, 80007, 130429];

/// WhatsApp Cloud API implementation of [`ProviderClient`].
pub struct CloudApiClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    phone_number_id: String,
    access_token: String,
}

impl CloudApiClient {
    /// Build a client from configuration.
    ///
    /// Requires `whatsapp.phone_number_id` and `whatsapp.access_token`.
    pub fn new(config: &WhatsAppConfig) -> Result<Self, AurumError> {
        let phone_number_id = config.phone_number_id.clone().ok_or_else(|| {
            AurumError::Config("whatsapp.phone_number_id is required to send messages".into())
        })?;
        let access_token = config.access_token.clone().ok_or_else(|| {
            AurumError::Config("whatsapp.access_token is required to send messages".into())
        })?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.send_timeout_secs))
            .build()
            .map_err(|e| AurumError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            phone_number_id,
            access_token,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.base_url, self.api_version, self.phone_number_id
        )
    }
}

#[derive(Serialize)]
struct SendTemplateRequest<'a> {
    messaging_product: &'a str,
    to: &'a str,
    #[serde(rename = "type")]
    message_type: &'a str,
    template: TemplatePayload<'a>,
}

#[derive(Serialize)]
struct TemplatePayload<'a> {
    name: &'a str,
    language: LanguagePayload<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    components: Vec<ComponentPayload<'a>>,
}

#[derive(Serialize)]
struct LanguagePayload<'a> {
    code: &'a str,
}

#[derive(Serialize)]
struct ComponentPayload<'a> {
    #[serde(rename = "type")]
    component_type: &'a str,
    parameters: Vec<ParameterPayload<'a>>,
}

#[derive(Serialize)]
struct ParameterPayload<'a> {
    #[serde(rename = "type")]
    parameter_type: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct SendTemplateResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Deserialize)]
struct GraphErrorResponse {
    error: GraphError,
}

/// Structured error body returned by the Graph API.
#[derive(Debug, Deserialize)]
pub struct GraphError {
    #[serde(default)]
    pub message: String,
    pub code: Option<i64>,
}

/// Classify a provider HTTP failure into transient vs permanent.
///
/// 5xx and 429 are transient regardless of body; otherwise the Graph error
/// code decides: known throttling codes retry, everything else (invalid
/// recipient, rejected template, bad token) is permanent.
pub fn classify_response(status: StatusCode, error: Option<&GraphError>) -> SendError {
    let code = error.and_then(|e| e.code);
    let message = error
        .map(|e| e.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("provider returned HTTP {status}"));

    let kind = if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        SendErrorKind::Transient
    } else if code.is_some_and(|c| THROTTLING_CODES.contains(&c)) {
        SendErrorKind::Transient
    } else {
        SendErrorKind::Permanent
    };

    SendError {
        kind,
        code,
        message,
    }
}

/// Transport-level failures (timeout, refused connection, reset) are all
/// transient: a retry may reach the provider.
fn classify_transport_error(e: reqwest::Error) -> SendError {
    SendError::transient(format!("provider request failed: {e}"))
}

#[async_trait]
impl ProviderClient for CloudApiClient {
    async fn send_template(
        &self,
        to: &str,
        template_name: &str,
        language: Language,
        body_params: &[String],
    ) -> Result<ProviderMessageId, SendError> {
        let language_code = language.to_string();
        let components = if body_params.is_empty() {
            Vec::new()
        } else {
            vec![ComponentPayload {
                component_type: "body",
                parameters: body_params
                    .iter()
                    .map(|p| ParameterPayload {
                        parameter_type: "text",
                        text: p,
                    })
                    .collect(),
            }]
        };

        let request = SendTemplateRequest {
            messaging_product: "whatsapp",
            to,
            message_type: "template",
            template: TemplatePayload {
                name: template_name,
                language: LanguagePayload {
                    code: &language_code,
                },
                components,
            },
        };

        let response = self
            .http
            .post(self.messages_url())
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status.is_success() {
            let body: SendTemplateResponse = response
                .json()
                .await
                .map_err(|e| SendError::transient(format!("malformed provider response: {e}")))?;
            let id = body
                .messages
                .into_iter()
                .next()
                .map(|m| m.id)
                .ok_or_else(|| SendError::transient("provider response missing message id"))?;
            debug!(to, template_name, provider_message_id = id.as_str(), "template sent");
            Ok(ProviderMessageId(id))
        } else {
            let graph_error = response
                .json::<GraphErrorResponse>()
                .await
                .ok()
                .map(|b| b.error);
            Err(classify_response(status, graph_error.as_ref()))
        }
    }
}
