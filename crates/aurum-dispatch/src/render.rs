// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template parameter mapping and the built-in catalog renderer.

use std::collections::HashMap;

use tracing::warn;

use aurum_core::types::Language;
use aurum_core::{AurumError, TemplateRenderer};
use aurum_storage::models::Contact;

/// Resolve a campaign's variable mapping against a contact.
///
/// The mapping is a JSON object of placeholder position -> contact field
/// name, e.g. `{"1": "name", "2": "customer_id"}`. Positions are ordered
/// numerically; a malformed mapping yields no parameters rather than
/// failing the send.
pub fn build_params(variable_mapping: Option<&str>, contact: &Contact) -> Vec<String> {
    let Some(raw) = variable_mapping else {
        return Vec::new();
    };
    let map: HashMap<String, String> = match serde_json::from_str(raw) {
        Ok(map) => map,
        Err(e) => {
            warn!(error = %e, "malformed variable_mapping, sending without parameters");
            return Vec::new();
        }
    };

    let mut entries: Vec<(String, String)> = map.into_iter().collect();
    entries.sort_by_key(|(position, _)| position.parse::<u32>().unwrap_or(u32::MAX));
    entries
        .into_iter()
        .map(|(_, field)| contact.field(&field))
        .collect()
}

/// Renderer backed by a local template catalog.
///
/// Bodies carry `{{1}}`-style positional placeholders. Translation lookup
/// is an external concern; the catalog holds one body per template name and
/// the provider renders its own approved copy per language.
pub struct CatalogRenderer {
    templates: HashMap<String, String>,
}

impl CatalogRenderer {
    pub fn new(templates: HashMap<String, String>) -> Self {
        Self { templates }
    }
}

impl TemplateRenderer for CatalogRenderer {
    fn render(
        &self,
        template_name: &str,
        _language: Language,
        params: &[String],
    ) -> Result<String, AurumError> {
        let body = self.templates.get(template_name).ok_or_else(|| {
            AurumError::Internal(format!("template {template_name} not in catalog"))
        })?;

        let mut rendered = body.clone();
        for (i, param) in params.iter().enumerate() {
            rendered = rendered.replace(&format!("{{{{{}}}}}", i + 1), param);
        }
        Ok(rendered)
    }
}
