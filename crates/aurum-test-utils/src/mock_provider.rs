// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock delivery provider for deterministic testing.
//!
//! `MockProvider` implements [`ProviderClient`] with per-recipient scripted
//! outcomes and captured send attempts for assertion in tests. Unscripted
//! sends succeed with a generated provider message id.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use aurum_core::ProviderClient;
use aurum_core::types::{Language, ProviderMessageId, SendError};

/// One captured send attempt.
#[derive(Debug, Clone)]
pub struct SentRecord {
    pub to: String,
    pub template_name: String,
    pub language: Language,
    pub params: Vec<String>,
}

/// A mock delivery provider for testing.
///
/// Outcomes are scripted per recipient phone number so tests stay
/// deterministic under concurrent fan-out. Every attempt (including
/// retries) is captured.
#[derive(Default)]
pub struct MockProvider {
    scripted: Mutex<HashMap<String, VecDeque<Result<ProviderMessageId, SendError>>>>,
    sent: Mutex<Vec<SentRecord>>,
    counter: AtomicU64,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next outcomes for sends to `phone`. Once the queue is
    /// drained, further sends to that phone succeed.
    pub async fn script(
        &self,
        phone: &str,
        outcomes: Vec<Result<ProviderMessageId, SendError>>,
    ) {
        self.scripted
            .lock()
            .await
            .entry(phone.to_string())
            .or_default()
            .extend(outcomes);
    }

    /// All captured send attempts, in arrival order.
    pub async fn sent(&self) -> Vec<SentRecord> {
        self.sent.lock().await.clone()
    }

    /// Count of captured send attempts.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    async fn send_template(
        &self,
        to: &str,
        template_name: &str,
        language: Language,
        body_params: &[String],
    ) -> Result<ProviderMessageId, SendError> {
        self.sent.lock().await.push(SentRecord {
            to: to.to_string(),
            template_name: template_name.to_string(),
            language,
            params: body_params.to_vec(),
        });

        if let Some(queue) = self.scripted.lock().await.get_mut(to)
            && let Some(outcome) = queue.pop_front()
        {
            return outcome;
        }

        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(ProviderMessageId(format!("wamid.mock-{n}")))
    }
}
