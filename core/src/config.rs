use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};

/// Default bound on elements queued for a single lagging branch.
pub const DEFAULT_MAX_SPLIT_BUFFER: usize = 1 << 20;

/// Execution settings shared by every traversal built from a route.
///
/// Loadable from JSON; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Seed for sampling stages. `None` seeds from OS entropy.
    pub sample_seed: Option<u64>,
    /// Maximum elements a split may queue for one branch before
    /// failing with `SplitOverflow`.
    pub max_split_buffer: usize,
    /// Emit the route description at debug level whenever a traversal is built.
    pub log_routes: bool,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            sample_seed: None,
            max_split_buffer: DEFAULT_MAX_SPLIT_BUFFER,
            log_routes: false,
        }
    }
}

impl RouteConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| RouteError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_split_buffer == 0 {
            return Err(RouteError::InvalidConfig(
                "max_split_buffer must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }

    pub fn with_max_split_buffer(mut self, limit: usize) -> Self {
        self.max_split_buffer = limit;
        self
    }
}
