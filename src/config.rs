// src/config.rs

use crate::{ReticleError, Result};
use serde::{Deserialize, Serialize};

/// Linear RGBA color with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with the alpha channel replaced.
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Checks every channel is finite and within `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        for (channel, value) in [("r", self.r), ("g", self.g), ("b", self.b), ("a", self.a)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ReticleError::InvalidColor { channel, value });
            }
        }
        Ok(())
    }
}

/// Default reticle color (open surface and billboard).
pub const DEFAULT_COLOR: Rgba = Rgba::new(0.0, 0.0, 1.0, 1.0);

/// Reticle color once the hit lies on a confirmed plane anchor.
pub const CLOSED_COLOR: Rgba = Rgba::new(1.0, 0.0, 0.0, 1.0);

/// Host-tunable reticle options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReticleConfig {
    /// Color used for the open (free surface) and default billboard display.
    pub color: Rgba,
}

impl Default for ReticleConfig {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR,
        }
    }
}

impl ReticleConfig {
    pub fn validate(&self) -> Result<()> {
        self.color.validate()
    }

    /// Parses and validates a JSON config document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ReticleError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
