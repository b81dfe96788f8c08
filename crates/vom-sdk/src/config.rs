use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use vom_types::{Attributes, Value};

use crate::error::{SdkError, SdkResult};

/// Session configuration, usually read from a TOML file:
///
/// ```toml
/// mapleader = ","
///
/// [window]
/// columns = 120
/// rows = 40
///
/// [window.options]
/// relativenumber = true
/// scrolloff = 5
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VomConfig {
    /// Seeded into `g:mapleader` by [`Vom::initialize`](crate::Vom::initialize).
    pub mapleader: String,
    /// Seeded into `g:maplocalleader`.
    pub maplocalleader: String,
    pub window: WindowConfig,
}

impl Default for VomConfig {
    fn default() -> Self {
        Self {
            mapleader: "\\".into(),
            maplocalleader: "\\".into(),
            window: WindowConfig::default(),
        }
    }
}

/// Defaults for newly created windows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub columns: u16,
    pub rows: u16,
    /// Layered over the built-in window options.
    pub options: BTreeMap<String, serde_json::Value>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        let (columns, rows) = vom_layout::window::DEFAULT_SIZE;
        Self {
            columns,
            rows,
            options: BTreeMap::new(),
        }
    }
}

impl WindowConfig {
    pub fn size(&self) -> (u16, u16) {
        (self.columns, self.rows)
    }

    pub fn option_overrides(&self) -> Attributes {
        self.options
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect()
    }
}

impl VomConfig {
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Config(e.to_string()))
    }
}
