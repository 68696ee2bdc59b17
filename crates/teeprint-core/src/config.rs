//! Engine configuration.

use crate::area::{PrintableArea, REFERENCE_WIDTH};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tunables for a composition session.
///
/// Every field has a default, so a config file only needs to name the values
/// it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Printable area of the garment template, in reference space.
    pub printable_area: PrintableArea,
    /// Container width assumed until the first resize observation.
    pub initial_container_width: f64,
    /// Smallest width/height an image may be resized to (reference units).
    pub min_image_extent: f64,
    /// Largest image extent as a multiple of the printable area's dimension.
    pub max_extent_factor: f64,
    /// Extra shrink applied to the initial placement of images larger than the area.
    pub fit_margin: f64,
    /// Cover ratio divisor used by the pocket preset.
    pub pocket_divisor: f64,
    /// Font size for text added without an explicit size.
    pub default_font_size: f64,
    /// Whether the dashed printable-area outline is drawn.
    pub show_printable_area: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            printable_area: PrintableArea::default(),
            initial_container_width: REFERENCE_WIDTH,
            min_image_extent: 20.0,
            max_extent_factor: 1.5,
            fit_margin: 1.0,
            pocket_divisor: 3.0,
            default_font_size: 20.0,
            show_printable_area: true,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Reject values that would make placement math degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let area = &self.printable_area;
        if !(area.width > 0.0 && area.height > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "printable area must have a positive size, got {}x{}",
                area.width, area.height
            )));
        }
        if !(self.initial_container_width > 0.0 && self.initial_container_width.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "initial_container_width must be positive, got {}",
                self.initial_container_width
            )));
        }
        if self.min_image_extent <= 0.0 || self.max_extent_factor <= 0.0 {
            return Err(ConfigError::Invalid("image extent bounds must be positive".to_string()));
        }
        if !(self.fit_margin > 0.0 && self.fit_margin <= 1.0) {
            return Err(ConfigError::Invalid(format!("fit_margin must be in (0, 1], got {}", self.fit_margin)));
        }
        if self.pocket_divisor <= 0.0 {
            return Err(ConfigError::Invalid(format!("pocket_divisor must be positive, got {}", self.pocket_divisor)));
        }
        if self.default_font_size <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "default_font_size must be positive, got {}",
                self.default_font_size
            )));
        }
        Ok(())
    }
}
