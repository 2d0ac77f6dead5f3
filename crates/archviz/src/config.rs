//! Configuration management for archviz.
//!
//! Settings are read from a YAML file:
//!
//! ```yaml
//! relayout-delay-ms: 0
//! node-font-size: 10.0
//! circle-padding: 1.0
//! initial-fold: true
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

/// Default debounce delay before a coalesced relayout runs.
pub const DEFAULT_RELAYOUT_DELAY_MS: u64 = 0;

/// Default font size of node labels.
pub const DEFAULT_NODE_FONT_SIZE: f64 = 10.0;

/// Default padding between nested node circles.
pub const DEFAULT_CIRCLE_PADDING: f64 = 1.0;

/// Visualization configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct VizConfig {
    /// Delay before a burst of filter changes triggers its single relayout
    pub relayout_delay_ms: u64,

    /// Font size of node labels
    pub node_font_size: f64,

    /// Padding between nested node circles
    pub circle_padding: f64,

    /// Whether every node starts out folded
    pub initial_fold: bool,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            relayout_delay_ms: DEFAULT_RELAYOUT_DELAY_MS,
            node_font_size: DEFAULT_NODE_FONT_SIZE,
            circle_padding: DEFAULT_CIRCLE_PADDING,
            initial_fold: true,
        }
    }
}

impl VizConfig {
    /// Load configuration from a file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {}", e)))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.node_font_size > 0.0) {
            return Err(Error::Config(format!(
                "node-font-size must be positive, got {}",
                self.node_font_size
            )));
        }
        if !(self.circle_padding >= 0.0) {
            return Err(Error::Config(format!(
                "circle-padding must not be negative, got {}",
                self.circle_padding
            )));
        }
        Ok(())
    }

    /// The relayout debounce delay.
    pub fn relayout_delay(&self) -> Duration {
        Duration::from_millis(self.relayout_delay_ms)
    }
}
