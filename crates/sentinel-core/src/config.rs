//! Startup configuration.
//!
//! Two selectors and a margin, fixed for the lifetime of a trigger. Hosts pass
//! the config as JSON; every field is optional.
//!
//! ```
//! use sentinel_core::config::SentinelConfig;
//!
//! let config = SentinelConfig::from_json(r##"{"container_selector": "#feed"}"##).unwrap();
//! assert_eq!(config.marker_selector, ".sentinel");
//! assert_eq!(config.container_selector, "#feed");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, SentinelError};
use crate::margin::RootMargin;

pub const DEFAULT_MARKER_SELECTOR: &str = ".sentinel";
pub const DEFAULT_CONTAINER_SELECTOR: &str = ".grid";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SentinelConfig {
    /// Selector for the sentinel markers to observe.
    pub marker_selector: String,
    /// Selector for the content container whose children are watched.
    pub container_selector: String,
    /// Proximity margin around the viewport.
    pub root_margin: RootMargin,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            marker_selector: DEFAULT_MARKER_SELECTOR.to_string(),
            container_selector: DEFAULT_CONTAINER_SELECTOR.to_string(),
            root_margin: RootMargin::default(),
        }
    }
}

impl SentinelConfig {
    #[must_use]
    pub fn new(marker_selector: impl Into<String>, container_selector: impl Into<String>) -> Self {
        Self {
            marker_selector: marker_selector.into(),
            container_selector: container_selector.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_root_margin(mut self, root_margin: RootMargin) -> Self {
        self.root_margin = root_margin;
        self
    }

    /// Parse and validate. Blank input yields the defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(json)
            .map_err(|err| SentinelError::invalid_config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Selectors must be non-blank. Syntax is left to the host.
    pub fn validate(&self) -> Result<()> {
        if self.marker_selector.trim().is_empty() {
            return Err(SentinelError::invalid_config("marker_selector is empty"));
        }
        if self.container_selector.trim().is_empty() {
            return Err(SentinelError::invalid_config("container_selector is empty"));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
