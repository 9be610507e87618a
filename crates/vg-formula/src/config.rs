//! # Engine Configuration
//!
//! Limits applied by the statement parsers, loaded from a TOML file:
//!
//! ```toml
//! [parser]
//! max_nesting_depth = 32
//! max_tree_depth = 96
//! max_in_values = 1024
//! max_statement_len = 16384
//! ```
//!
//! Every key is optional and falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub parser: ParserConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Deepest allowed nesting of parentheses and function calls.
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
    /// Most levels in a parsed formula tree. Evaluation and rendering
    /// recurse once per level.
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
    /// Most values accepted in one `IN (...)` list.
    #[serde(default = "default_max_in_values")]
    pub max_in_values: usize,
    /// Longest statement, in bytes, handed to a parser.
    #[serde(default = "default_max_statement_len")]
    pub max_statement_len: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: default_max_nesting_depth(),
            max_tree_depth: default_max_tree_depth(),
            max_in_values: default_max_in_values(),
            max_statement_len: default_max_statement_len(),
        }
    }
}

fn default_max_nesting_depth() -> usize {
    64
}
fn default_max_tree_depth() -> usize {
    128
}
fn default_max_in_values() -> usize {
    4096
}
fn default_max_statement_len() -> usize {
    64 * 1024
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load from `path`. A missing file yields the defaults; an unreadable
    /// or invalid one is logged and also yields the defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to read engine config {:?}: {}", path, e);
                return Self::default();
            }
        };
        match Self::from_toml_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Invalid engine config {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}
