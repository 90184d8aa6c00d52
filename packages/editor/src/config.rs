use crate::error::EditorResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "quire.config.json";

/// Manager configuration file format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSettings {
    /// Handler used when string content is given without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_string_handler: Option<String>,

    /// Priority overrides by extension name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub priority: BTreeMap<String, i32>,

    /// Extensions removed after presets are expanded
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

impl ManagerSettings {
    /// Load settings from a directory; a missing file yields defaults
    pub fn load(dir: impl AsRef<Path>) -> EditorResult<Self> {
        let path = dir.as_ref().join(DEFAULT_CONFIG_NAME);
        if path.exists() {
            Self::load_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_file(path: impl AsRef<Path>) -> EditorResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_default_string_handler(mut self, name: impl Into<String>) -> Self {
        self.default_string_handler = Some(name.into());
        self
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|e| e == name)
    }
}
