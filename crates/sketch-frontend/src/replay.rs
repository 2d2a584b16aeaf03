//! Scripted sketch sessions
//!
//! A replay script is a RON document holding a viewport, sketch setting
//! overrides and an ordered list of steps. It runs through a controller backed by the
//! planar engine and yields every feature the session emitted.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use sketch_core::{Feature, PlanarEngine, SketchKind, Viewport};

use crate::config::{SketchConfig, SketchOverrides};
use crate::controller::SketchController;
use crate::input::SketchInput;
use crate::layers::{MemoryLayerStore, SharedLayerStore};
use crate::state::InteractionMode;

/// Replay errors
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Failed to read script: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse script: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// One scripted step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplayStep {
    /// Host changes the interaction mode
    Mode(InteractionMode),
    /// Host arms a kind
    Begin(SketchKind),
    /// Raw pointer or key event
    Input(SketchInput),
    /// Host requests extrusion
    Extrude,
    /// Host requests completion
    Finalize,
}

/// A replay script
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayScript {
    pub viewport: Viewport,
    /// Applied on top of the user configuration
    pub sketch: SketchOverrides,
    /// Merge features into an active sketch layer instead of the listener
    pub sketch_layer: bool,
    pub steps: Vec<ReplayStep>,
}

impl ReplayScript {
    pub fn from_ron(text: &str) -> Result<Self, ReplayError> {
        let options = ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME);
        Ok(options.from_str(text)?)
    }
}

/// Run a script against a base configuration and collect the emitted features in order
pub fn run_script(script: &ReplayScript, base: &SketchConfig) -> Vec<Feature> {
    let config = script.sketch.apply(base);
    debug!("Replay config {:?}", config);
    let mut controller = SketchController::new(PlanarEngine::new(script.viewport), config);

    let emitted: Arc<Mutex<Vec<Feature>>> = Arc::default();
    {
        let emitted = emitted.clone();
        controller.on_feature_created(move |feature| {
            if let Some(feature) = feature {
                emitted.lock().push(feature);
            }
        });
    }

    let store: Option<(SharedLayerStore, String)> = script.sketch_layer.then(|| {
        let mut layers = MemoryLayerStore::new();
        let id = layers.add_sketch_layer();
        layers.set_active(Some(id.clone()));
        (Arc::new(Mutex::new(layers)), id)
    });
    if let Some((layers, _)) = &store {
        controller = controller.with_layer_store(layers.clone());
    }

    for (index, step) in script.steps.iter().enumerate() {
        let consumed = match step {
            ReplayStep::Mode(mode) => {
                controller.set_mode(*mode);
                true
            }
            ReplayStep::Begin(kind) => controller.begin_draw(*kind),
            ReplayStep::Input(input) => controller.handle_input(*input),
            ReplayStep::Extrude => controller.extrude(),
            ReplayStep::Finalize => controller.finalize().is_some(),
        };
        debug!("Step {} {:?} -> {} ({})", index, step, controller.state(), consumed);
    }

    let mut features = std::mem::take(&mut *emitted.lock());
    if let Some((layers, id)) = store {
        features.extend_from_slice(layers.lock().features(&id));
    }
    info!("Replay produced {} features", features.len());
    features
}

/// Load and run a script file
pub fn run_file(path: &Path, base: &SketchConfig) -> Result<Vec<Feature>, ReplayError> {
    let text = std::fs::read_to_string(path)?;
    let script = ReplayScript::from_ron(&text)?;
    info!("Replaying {} steps from {:?}", script.steps.len(), path);
    Ok(run_script(&script, base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketch_core::GeometryType;

    const POLYGON: &str = r#"(
        steps: [
            Mode(sketch),
            Begin(polygon),
            Input(PointerDown(pos: (200.0, 200.0))),
            Input(PointerUp(pos: (200.0, 200.0))),
            Input(PointerDown(pos: (600.0, 200.0))),
            Input(PointerUp(pos: (600.0, 200.0))),
            Input(PointerDown(pos: (600.0, 400.0))),
            Input(PointerUp(pos: (600.0, 400.0))),
            Input(DoubleClick(pos: (600.0, 400.0))),
        ],
    )"#;

    #[test]
    fn test_parse_and_run_polygon() {
        let script = ReplayScript::from_ron(POLYGON).unwrap();
        assert_eq!(script.viewport, Viewport::default());
        assert_eq!(script.steps.len(), 9);

        let features = run_script(&script, &SketchConfig::default());
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].geometry.geometry_type(), GeometryType::Polygon);
        assert_eq!(features[0].properties.positions.len(), 3);
    }

    #[test]
    fn test_steps_ignored_outside_sketch_mode() {
        let mut script = ReplayScript::from_ron(POLYGON).unwrap();
        script.steps.remove(0);
        assert!(run_script(&script, &SketchConfig::default()).is_empty());
    }

    #[test]
    fn test_sketch_layer_collects_features() {
        let mut script = ReplayScript::from_ron(POLYGON).unwrap();
        script.sketch_layer = true;
        let features = run_script(&script, &SketchConfig::default());
        assert_eq!(features.len(), 1);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            ReplayScript::from_ron("(steps: [Bogus])"),
            Err(ReplayError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join(format!("missing-{}.ron", uuid::Uuid::new_v4()));
        assert!(matches!(
            run_file(&path, &SketchConfig::default()),
            Err(ReplayError::Io(_))
        ));
    }

    #[test]
    fn test_script_overrides_base_config() {
        let script = ReplayScript::from_ron("(sketch: (extrude_polygons: false))").unwrap();
        assert_eq!(script.sketch.extrude_polygons, Some(false));
        assert_eq!(script.sketch.circle_segments, None);

        let base = SketchConfig {
            extrude_polygons: true,
            circle_segments: 12,
            ..Default::default()
        };
        let merged = script.sketch.apply(&base);
        assert!(!merged.extrude_polygons);
        assert_eq!(merged.circle_segments, 12);
    }

    #[test]
    fn test_base_config_drives_polygon_extrusion() {
        let base = SketchConfig {
            extrude_polygons: true,
            ..Default::default()
        };
        let script = ReplayScript::from_ron(POLYGON).unwrap();

        // Double-click extrudes instead of finalizing
        assert!(run_script(&script, &base).is_empty());

        let mut flat = script.clone();
        flat.sketch.extrude_polygons = Some(false);
        assert_eq!(run_script(&flat, &base).len(), 1);
    }
}
