use std::collections::{BTreeSet, HashMap};

use regex::{Captures, Regex};

use crate::error::{LanternError, Result};

fn placeholder_pattern() -> Result<Regex> {
    // `{{` and `}}` are literal braces
    Regex::new(r"\{\{|\}\}|\{\s*(\w+)\s*\}").map_err(|e| LanternError::TemplateError(e.to_string()))
}

/// Prompt with `{name}` placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names, sorted and deduplicated
    pub fn input_variables(&self) -> Result<Vec<String>> {
        let names: BTreeSet<String> = placeholder_pattern()?
            .captures_iter(&self.template)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .collect();
        Ok(names.into_iter().collect())
    }

    /// Substitute every placeholder; a variable without a value is an error.
    pub fn format(&self, vars: &HashMap<String, String>) -> Result<String> {
        let missing: Vec<String> = self
            .input_variables()?
            .into_iter()
            .filter(|name| !vars.contains_key(name))
            .collect();
        if !missing.is_empty() {
            return Err(LanternError::TemplateError(format!(
                "missing variables: {}",
                missing.join(", ")
            )));
        }

        let rendered = placeholder_pattern()?.replace_all(&self.template, |caps: &Captures| {
            match (caps.get(0).map(|m| m.as_str()), caps.get(1)) {
                (_, Some(name)) => vars.get(name.as_str()).cloned().unwrap_or_default(),
                (Some("{{"), None) => "{".to_string(),
                _ => "}".to_string(),
            }
        });
        Ok(rendered.into_owned())
    }
}
