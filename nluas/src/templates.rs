//! Parameter template catalog.
//!
//! `parameter_templates.json` maps a semantic template name (the `template`
//! field of an action) to a JSON object describing that template's slots.

use indexmap::IndexMap;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{SolverError, SolverResult};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TemplateCatalog {
    templates: IndexMap<String, Value>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> SolverResult<Self> {
        let templates: IndexMap<String, Value> = serde_json::from_str(text)?;
        Ok(Self { templates })
    }

    pub fn load(path: impl AsRef<Path>) -> SolverResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            SolverError::Config(format!(
                "failed to read templates '{}': {}",
                path.display(),
                e
            ))
        })?;
        let catalog = Self::from_json_str(&text)?;
        debug!(
            path = %path.display(),
            count = catalog.len(),
            "loaded parameter templates"
        );
        Ok(catalog)
    }

    pub fn insert(&mut self, name: impl Into<String>, template: Value) {
        self.templates.insert(name.into(), template);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.templates.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
