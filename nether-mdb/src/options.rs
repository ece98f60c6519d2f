//! Decode options
//!
//! Hosts usually embed these in their own TOML config, so every field has a
//! serde default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Maximum node nesting depth (root is depth 0)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Maximum number of nodes in one model
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
    /// How long to wait for each texture request, `None` waits indefinitely
    #[serde(default)]
    pub texture_timeout_ms: Option<u64>,
}

fn default_max_depth() -> usize { 256 }
fn default_max_nodes() -> usize { 65_536 }

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_nodes: default_max_nodes(),
            texture_timeout_ms: None,
        }
    }
}

impl DecodeOptions {
    pub fn texture_timeout(&self) -> Option<Duration> {
        self.texture_timeout_ms.map(Duration::from_millis)
    }
}
