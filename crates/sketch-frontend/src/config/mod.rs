//! Sketch engine configuration module
//!
//! This module handles configuration for the interactive sketch engine:
//! duplicate tolerances, the accidental-click guard, and completion options.

mod manager;

pub use manager::{ConfigError, ConfigManager};

use serde::{Deserialize, Serialize};
use sketch_core::{DEFAULT_CIRCLE_SEGMENTS, Tolerance};

/// Sketch interaction preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SketchConfig {
    /// Tolerances for duplicate-anchor rejection
    pub tolerance: Tolerance,
    /// Clicks closer than this to the first click (pixels) are ignored
    pub click_tolerance_px: f32,
    /// Double-click on a polygon extrudes instead of finalizing flat
    pub extrude_polygons: bool,
    /// Segments used by the planar engine to approximate circles
    pub circle_segments: u32,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            click_tolerance_px: 4.0,
            extrude_polygons: false,
            circle_segments: DEFAULT_CIRCLE_SEGMENTS,
        }
    }
}

/// Per-field overrides of a [`SketchConfig`]; unset fields keep the base value
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SketchOverrides {
    pub tolerance: Option<Tolerance>,
    pub click_tolerance_px: Option<f32>,
    pub extrude_polygons: Option<bool>,
    pub circle_segments: Option<u32>,
}

impl SketchOverrides {
    /// Apply the overrides on top of a base configuration
    pub fn apply(&self, base: &SketchConfig) -> SketchConfig {
        SketchConfig {
            tolerance: self.tolerance.unwrap_or(base.tolerance),
            click_tolerance_px: self.click_tolerance_px.unwrap_or(base.click_tolerance_px),
            extrude_polygons: self.extrude_polygons.unwrap_or(base.extrude_polygons),
            circle_segments: self.circle_segments.unwrap_or(base.circle_segments),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    /// Configuration format version
    #[serde(default)]
    pub version: u32,
    /// Sketch settings
    #[serde(default)]
    pub sketch: SketchConfig,
}

impl AppConfig {
    /// Current configuration version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            ..Default::default()
        }
    }
}
