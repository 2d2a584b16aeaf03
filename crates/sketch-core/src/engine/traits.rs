//! Host engine trait definitions
//!
//! These traits define the queries the sketch state machine needs from the
//! 3D engine that owns the viewport. Every query is synchronous and
//! side-effect free from the sketch engine's point of view.

use glam::{DVec3, Vec2};
use serde::{Deserialize, Serialize};

use crate::sketch::SketchKind;

/// World-space point in engine coordinates
pub type WorldPoint = DVec3;

/// Screen-space pointer position in pixels (origin top-left)
pub type ScreenPos = Vec2;

/// Geometry type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPolygon,
}

impl GeometryType {
    /// Get the GeoJSON name of this geometry type
    pub fn name(&self) -> &'static str {
        match self {
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPolygon => "MultiPolygon",
        }
    }
}

/// Geometry built by the engine from a kind and its anchors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// A single position
    Point(WorldPoint),
    /// An open chain of positions
    LineString(Vec<WorldPoint>),
    /// Closed rings; the first ring is the outer boundary
    Polygon(Vec<Vec<WorldPoint>>),
    /// Several polygons
    MultiPolygon(Vec<Vec<Vec<WorldPoint>>>),
}

impl Geometry {
    /// Get the type tag of this geometry
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
            Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
        }
    }

    /// Total number of positions in the geometry
    pub fn position_count(&self) -> usize {
        match self {
            Geometry::Point(_) => 1,
            Geometry::LineString(line) => line.len(),
            Geometry::Polygon(rings) => rings.iter().map(Vec::len).sum(),
            Geometry::MultiPolygon(polygons) => polygons
                .iter()
                .flat_map(|rings| rings.iter())
                .map(Vec::len)
                .sum(),
        }
    }
}

/// Component-wise epsilon equality.
///
/// Two points are equal when every component pair differs by at most
/// `absolute`, or by at most `relative` times the larger magnitude of the pair.
pub fn epsilon_equal(a: WorldPoint, b: WorldPoint, relative: f64, absolute: f64) -> bool {
    fn component(l: f64, r: f64, relative: f64, absolute: f64) -> bool {
        let diff = (l - r).abs();
        diff <= absolute || diff <= relative * l.abs().max(r.abs())
    }

    component(a.x, b.x, relative, absolute)
        && component(a.y, b.y, relative, absolute)
        && component(a.z, b.z, relative, absolute)
}

/// The host engine trait
///
/// Implementations of this trait bridge the sketch engine to whatever
/// renders the viewport (a globe, a planar scene, a test stub).
pub trait SketchEngine {
    /// Get the name of this engine
    fn name(&self) -> &str;

    /// Check if the engine has a live rendering surface
    fn is_available(&self) -> bool {
        true
    }

    /// Project a screen position onto the world.
    ///
    /// Returns None when the position has no valid world projection.
    fn screen_to_world(&self, screen: ScreenPos) -> Option<WorldPoint>;

    /// Tolerance-based equality of two world points
    fn epsilon_equal(&self, a: WorldPoint, b: WorldPoint, relative: f64, absolute: f64) -> bool {
        epsilon_equal(a, b, relative, absolute)
    }

    /// Sample the extrusion height implied by the pointer relative to an anchor
    fn sample_extrusion_height(&self, anchor: WorldPoint, screen: ScreenPos) -> Option<f64>;

    /// Build geometry from control points.
    ///
    /// Returns None when the anchors cannot form the requested kind.
    fn build_geometry(&self, kind: SketchKind, anchors: &[WorldPoint]) -> Option<Geometry>;

    /// Set how many segments approximate a circle, if the engine tessellates
    fn set_circle_segments(&mut self, _segments: u32) {}
}

impl<E: SketchEngine + ?Sized> SketchEngine for &E {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn screen_to_world(&self, screen: ScreenPos) -> Option<WorldPoint> {
        (**self).screen_to_world(screen)
    }

    fn epsilon_equal(&self, a: WorldPoint, b: WorldPoint, relative: f64, absolute: f64) -> bool {
        (**self).epsilon_equal(a, b, relative, absolute)
    }

    fn sample_extrusion_height(&self, anchor: WorldPoint, screen: ScreenPos) -> Option<f64> {
        (**self).sample_extrusion_height(anchor, screen)
    }

    fn build_geometry(&self, kind: SketchKind, anchors: &[WorldPoint]) -> Option<Geometry> {
        (**self).build_geometry(kind, anchors)
    }
}

/// A null engine with no rendering surface (every query fails)
#[derive(Debug, Default)]
pub struct NullEngine;

impl SketchEngine for NullEngine {
    fn name(&self) -> &str {
        "null"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn screen_to_world(&self, _screen: ScreenPos) -> Option<WorldPoint> {
        None
    }

    fn sample_extrusion_height(&self, _anchor: WorldPoint, _screen: ScreenPos) -> Option<f64> {
        None
    }

    fn build_geometry(&self, _kind: SketchKind, _anchors: &[WorldPoint]) -> Option<Geometry> {
        None
    }
}
