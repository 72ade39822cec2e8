// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template rendering collaborator trait.

use crate::error::AurumError;
use crate::types::Language;

/// Renders an approved template into a concrete message body.
///
/// Template content management (approval, translation) lives outside this
/// core; the pipeline consumes rendering as a pure function of
/// (template, language, ordered parameters). The rendered body is persisted
/// on the message row for audit, independent of what the provider delivers.
pub trait TemplateRenderer: Send + Sync + 'static {
    fn render(
        &self,
        template_name: &str,
        language: Language,
        params: &[String],
    ) -> Result<String, AurumError>;
}
