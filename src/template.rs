//! Path templates
//!
//! Handles `{{ variable }}` interpolation in listing paths, e.g.
//! `/jobs/{{ params.job_id }}/tasks`. Variables resolve against the
//! serialized listing parameters (`params.*`) and the configured
//! variables (`vars.*`); bare names try the parameters first.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}")
        .expect("template pattern is valid")
});

/// Values available to a template
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Listing parameters
    pub params: JsonValue,
    /// Configured variables
    pub vars: JsonValue,
}

impl TemplateContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context from serializable listing parameters
    pub fn for_params<P: Serialize>(params: &P) -> Result<Self> {
        Ok(Self {
            params: serde_json::to_value(params)?,
            vars: JsonValue::Null,
        })
    }

    /// Set configured variables
    #[must_use]
    pub fn with_vars(mut self, vars: JsonValue) -> Self {
        self.vars = vars;
        self
    }

    /// Get a value by path (e.g. "params.job_id")
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let parts: Vec<&str> = path.split('.').collect();
        let (root, rest) = match parts.split_first() {
            Some((&"params", rest)) => (&self.params, rest),
            Some((&"vars", rest)) => (&self.vars, rest),
            Some(_) => {
                return get_nested_value(&self.params, &parts)
                    .or_else(|| get_nested_value(&self.vars, &parts));
            }
            None => return None,
        };
        get_nested_value(root, rest)
    }
}

fn get_nested_value<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    path.iter().try_fold(value, |current, part| match current {
        JsonValue::Object(map) => map.get(*part),
        _ => None,
    })
}

/// Render a template string with the given context
///
/// Fails with a configuration error naming every unresolved variable.
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut missing = Vec::new();
    let rendered = TEMPLATE_REGEX.replace_all(template, |caps: &regex::Captures<'_>| {
        let var_path = &caps[1];
        match ctx.get(var_path) {
            Some(value) => value_to_string(value),
            None => {
                missing.push(var_path.to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::config(format!(
            "Undefined template variable(s): {}",
            missing.join(", ")
        )))
    }
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

fn value_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Null => String::new(),
        _ => value.to_string(),
    }
}
