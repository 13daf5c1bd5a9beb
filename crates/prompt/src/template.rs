//! Prompt templates with named slots.
//!
//! Prompts are structured templates rendered with Handlebars, not string
//! concatenation scattered through call sites. A template declares its
//! required slots and is validated at construction time: a required slot
//! missing from the template body, or a render call that omits a required
//! variable, is an error rather than a silently empty substitution.

use docqa_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// A validated prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Template identifier (e.g., "rag.answer")
    id: String,

    /// Handlebars template body
    body: String,

    /// Slot names that must be present in the body and supplied at render
    required_slots: Vec<String>,
}

impl PromptTemplate {
    /// Construct and validate a template.
    ///
    /// Fails if the body does not compile as a Handlebars template or if
    /// any required slot placeholder is absent from the body.
    pub fn new(
        id: impl Into<String>,
        body: impl Into<String>,
        required_slots: &[&str],
    ) -> AppResult<Self> {
        let id = id.into();
        let body = body.into();

        // Compile once up front so malformed templates fail at
        // construction, not first use.
        let mut handlebars = Handlebars::new();
        handlebars
            .register_template_string(&id, &body)
            .map_err(|e| AppError::Prompt(format!("Template '{}' failed to compile: {}", id, e)))?;

        for slot in required_slots {
            let placeholder = format!("{{{{{}}}}}", slot);
            if !body.contains(&placeholder) {
                return Err(AppError::Prompt(format!(
                    "Template '{}' is missing required slot '{}'",
                    id, slot
                )));
            }
        }

        Ok(Self {
            id,
            body,
            required_slots: required_slots.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Template identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Render the template with the given variables.
    ///
    /// All required slots must be supplied; extra variables are allowed.
    pub fn render(&self, variables: &HashMap<String, String>) -> AppResult<String> {
        for slot in &self.required_slots {
            if !variables.contains_key(slot) {
                return Err(AppError::Prompt(format!(
                    "Template '{}' rendered without required variable '{}'",
                    self.id, slot
                )));
            }
        }

        let mut handlebars = Handlebars::new();

        // Disable HTML escaping; prompts are plain text
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars
            .register_template_string(&self.id, &self.body)
            .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

        let rendered = handlebars
            .render(&self.id, variables)
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

        tracing::debug!(
            "Rendered template '{}' ({} chars)",
            self.id,
            rendered.len()
        );

        Ok(rendered)
    }
}

/// Convenience builder for render variables.
pub fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
