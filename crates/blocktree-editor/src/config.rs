//! Drop resolver configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EditError, EditResult};

/// Default search radius around the pointer, in presentation units.
pub const DEFAULT_MAX_DISTANCE: f64 = 80.0;

/// Tunables for drop-target resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Zones farther than this from the pointer are not candidates.
    /// Trailing list slots ignore the cutoff.
    pub max_distance: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_distance: DEFAULT_MAX_DISTANCE,
        }
    }
}

impl ResolverConfig {
    pub fn new(max_distance: f64) -> EditResult<Self> {
        let config = Self { max_distance };
        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> EditResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EditError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> EditResult<()> {
        if !self.max_distance.is_finite() || self.max_distance < 0.0 {
            return Err(EditError::InvalidConfig(format!(
                "max_distance must be a non-negative number, got {}",
                self.max_distance
            )));
        }
        Ok(())
    }
}
