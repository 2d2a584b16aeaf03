//! Duplicate-point rejection

use serde::{Deserialize, Serialize};

use super::Anchor;
use crate::engine::{SketchEngine, WorldPoint};

/// Tolerances for treating two anchors as the same point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Relative epsilon (scaled by coordinate magnitude)
    pub relative: f64,
    /// Absolute epsilon in engine units
    pub absolute: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            relative: 1e-7,
            absolute: 1e-7,
        }
    }
}

/// Check if `candidate` equals any existing anchor within tolerance
pub fn is_duplicate<E: SketchEngine + ?Sized>(
    engine: &E,
    candidate: WorldPoint,
    anchors: &[Anchor],
    tolerance: Tolerance,
) -> bool {
    anchors.iter().any(|anchor| {
        engine.epsilon_equal(candidate, anchor.world, tolerance.relative, tolerance.absolute)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{PlanarEngine, Viewport};
    use glam::{DVec3, Vec2};

    #[test]
    fn test_detects_any_existing_anchor() {
        let engine = PlanarEngine::new(Viewport::default());
        let anchors = [
            Anchor::new(DVec3::new(1.0, 1.0, 0.0), Vec2::ZERO),
            Anchor::new(DVec3::new(5.0, 1.0, 0.0), Vec2::ZERO),
        ];
        let tolerance = Tolerance::default();

        assert!(is_duplicate(&engine, DVec3::new(5.0, 1.0, 0.0), &anchors, tolerance));
        assert!(is_duplicate(&engine, DVec3::new(1.0, 1.0 + 1e-9, 0.0), &anchors, tolerance));
        assert!(!is_duplicate(&engine, DVec3::new(3.0, 1.0, 0.0), &anchors, tolerance));
        assert!(!is_duplicate(&engine, DVec3::new(3.0, 1.0, 0.0), &[], tolerance));
    }
}
