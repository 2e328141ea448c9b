//! Per-world physics settings.
//!
//! Provides JSON save/load so a world can be configured from a data file.

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, Result};
use crate::math::Rect;

/// Settings a `PhysicsWorld` is constructed with.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Every move result is clamped into this rectangle.
    pub bounds: Option<Rect>,
    /// Also reject moves whose center-to-center path crosses another box.
    pub sweep_moves: bool,
    /// Length of angle raycasts that were given no maximum distance.
    /// `None` derives it from the registered geometry.
    pub ray_length: Option<f64>,
}

impl PhysicsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_sweep_moves(mut self, sweep: bool) -> Self {
        self.sweep_moves = sweep;
        self
    }

    pub fn with_ray_length(mut self, length: f64) -> Self {
        self.ray_length = Some(length);
        self
    }

    /// Check for values no world can work with.
    pub fn validate(&self) -> Result<()> {
        if let Some(bounds) = self.bounds {
            validate_bounds(&bounds)?;
        }
        if let Some(length) = self.ray_length {
            if !length.is_finite() || length <= 0.0 {
                return Err(PhysicsError::InvalidArgument(format!(
                    "ray length must be positive and finite, got {length}"
                )));
            }
        }
        Ok(())
    }

    /// Serialize this configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize and validate a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save this configuration to a file.
    pub fn save_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a configuration from a file.
    pub fn load_from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&json)?)
    }
}

pub(crate) fn validate_bounds(bounds: &Rect) -> Result<()> {
    let finite = [bounds.x, bounds.y, bounds.width, bounds.height]
        .iter()
        .all(|v| v.is_finite());
    if !finite || bounds.width < 0.0 || bounds.height < 0.0 {
        return Err(PhysicsError::InvalidArgument(format!(
            "world bounds must be finite with non-negative size, got {bounds:?}"
        )));
    }
    Ok(())
}
