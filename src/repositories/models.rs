use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One configured upstream; serde is confined to this module tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub(crate) name: String,
    pub(crate) url: String,
    #[serde(rename = "parameters", default)]
    pub(crate) other_parameters: Option<HashMap<String, String>>,
}

impl Repository {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            other_parameters: None,
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.other_parameters
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    // Borrowing getters (no clones).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn other_parameters(&self) -> Option<&HashMap<String, String>> {
        self.other_parameters.as_ref()
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.other_parameters.as_ref()?.get(key).map(String::as_str)
    }
}
