//! Planar Engine Backend
//!
//! Pure Rust engine that projects the pointer onto a flat ground plane
//! through a perspective viewport.
//!
//! Used by headless hosts, the replay tool, and tests.

use glam::{DMat4, DVec2, DVec3, DVec4, Vec2};
use serde::{Deserialize, Serialize};

use super::{Geometry, ScreenPos, SketchEngine, WorldPoint};
use crate::sketch::SketchKind;

/// Default number of segments used to approximate a circle
pub const DEFAULT_CIRCLE_SEGMENTS: u32 = 64;

/// Perspective viewport looking at the scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Camera position
    pub eye: DVec3,
    /// Point the camera looks at
    pub target: DVec3,
    /// Camera up vector
    pub up: DVec3,
    /// Vertical field of view in radians
    pub fov_y: f64,
    /// Viewport width in pixels
    pub width: f64,
    /// Viewport height in pixels
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            eye: DVec3::new(0.0, -50.0, 50.0),
            target: DVec3::ZERO,
            up: DVec3::Z,
            fov_y: std::f64::consts::FRAC_PI_4,
            width: 800.0,
            height: 600.0,
        }
    }
}

impl Viewport {
    const NEAR: f64 = 0.1;
    const FAR: f64 = 10_000.0;

    /// Combined view-projection matrix
    pub fn view_projection(&self) -> DMat4 {
        let aspect = if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        };
        let projection = DMat4::perspective_rh(self.fov_y, aspect, Self::NEAR, Self::FAR);
        let view = DMat4::look_at_rh(self.eye, self.target, self.up);
        projection * view
    }

    /// Convert a screen position to a world-space ray (origin, normalized direction)
    pub fn screen_to_ray(&self, screen: ScreenPos) -> (DVec3, DVec3) {
        let ndc = DVec2::new(
            2.0 * screen.x as f64 / self.width - 1.0,
            1.0 - 2.0 * screen.y as f64 / self.height,
        );
        let inverse = self.view_projection().inverse();

        let near = inverse * DVec4::new(ndc.x, ndc.y, 0.0, 1.0);
        let far = inverse * DVec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let near = near.truncate() / near.w;
        let far = far.truncate() / far.w;

        (near, (far - near).normalize())
    }

    /// Project a world point to screen coordinates.
    ///
    /// Returns None for points behind the camera.
    pub fn world_to_screen(&self, point: WorldPoint) -> Option<ScreenPos> {
        let clip = self.view_projection() * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(
            ((ndc.x + 1.0) * 0.5 * self.width) as f32,
            ((1.0 - ndc.y) * 0.5 * self.height) as f32,
        ))
    }
}

/// Ground plane the sketch is drawn on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundPlane {
    /// Origin of the plane
    pub origin: DVec3,
    /// Normal of the plane (extrusion direction)
    pub normal: DVec3,
    /// X axis of the plane (rectangle edges run along this axis)
    pub x_axis: DVec3,
}

impl Default for GroundPlane {
    fn default() -> Self {
        Self {
            origin: DVec3::ZERO,
            normal: DVec3::Z,
            x_axis: DVec3::X,
        }
    }
}

impl GroundPlane {
    /// Y axis of the plane
    pub fn y_axis(&self) -> DVec3 {
        self.normal.cross(self.x_axis).normalize()
    }

    /// Convert a 3D world point to 2D plane coordinates
    pub fn to_local(&self, point: WorldPoint) -> DVec2 {
        let local = point - self.origin;
        DVec2::new(local.dot(self.x_axis), local.dot(self.y_axis()))
    }

    /// Convert 2D plane coordinates back to world, keeping a height offset
    pub fn to_world(&self, point: DVec2, height: f64) -> WorldPoint {
        self.origin + self.x_axis * point.x + self.y_axis() * point.y + self.normal * height
    }

    /// Height of a world point above the plane
    pub fn height_of(&self, point: WorldPoint) -> f64 {
        (point - self.origin).dot(self.normal)
    }
}

/// Planar engine
#[derive(Debug, Clone, Default)]
pub struct PlanarEngine {
    /// Camera used for pointer projection
    pub viewport: Viewport,
    /// Plane the pointer is projected onto
    pub plane: GroundPlane,
    /// Segments used to approximate circles
    pub circle_segments: u32,
}

impl PlanarEngine {
    /// Create a planar engine for a viewport, drawing on the XY plane
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            plane: GroundPlane::default(),
            circle_segments: DEFAULT_CIRCLE_SEGMENTS,
        }
    }
}

impl SketchEngine for PlanarEngine {
    fn name(&self) -> &str {
        "planar"
    }

    fn is_available(&self) -> bool {
        self.viewport.width > 0.0 && self.viewport.height > 0.0
    }

    fn screen_to_world(&self, screen: ScreenPos) -> Option<WorldPoint> {
        let (ray_origin, ray_dir) = self.viewport.screen_to_ray(screen);

        let denom = ray_dir.dot(self.plane.normal);
        if denom.abs() < 1e-9 {
            return None; // Ray is parallel to the plane
        }

        let t = (self.plane.origin - ray_origin).dot(self.plane.normal) / denom;
        if t < 0.0 {
            return None; // Intersection is behind the camera
        }

        Some(ray_origin + ray_dir * t)
    }

    fn sample_extrusion_height(&self, anchor: WorldPoint, screen: ScreenPos) -> Option<f64> {
        // Closest point between the anchor's vertical axis and the pointer ray
        let (ray_origin, ray_dir) = self.viewport.screen_to_ray(screen);
        let axis = self.plane.normal;

        let w0 = anchor - ray_origin;
        let a = axis.dot(axis);
        let b = axis.dot(ray_dir);
        let c = ray_dir.dot(ray_dir);
        let d = axis.dot(w0);
        let e = ray_dir.dot(w0);

        let denom = a * c - b * b;
        if denom.abs() < 1e-12 {
            return None; // Looking straight down the axis
        }

        let along_axis = (b * e - c * d) / denom;
        if !along_axis.is_finite() {
            return None;
        }
        Some(along_axis)
    }

    fn build_geometry(&self, kind: SketchKind, anchors: &[WorldPoint]) -> Option<Geometry> {
        build_planar_geometry(&self.plane, self.circle_segments, kind, anchors)
    }

    fn set_circle_segments(&mut self, segments: u32) {
        self.circle_segments = segments;
    }
}

/// Build geometry for a kind on a ground plane.
///
/// Returns None for too few anchors or degenerate shapes.
pub fn build_planar_geometry(
    plane: &GroundPlane,
    circle_segments: u32,
    kind: SketchKind,
    anchors: &[WorldPoint],
) -> Option<Geometry> {
    match kind {
        SketchKind::Marker => anchors.first().map(|p| Geometry::Point(*p)),
        SketchKind::Polyline => {
            if anchors.len() < 2 {
                return None;
            }
            Some(Geometry::LineString(anchors.to_vec()))
        }
        SketchKind::Polygon => {
            if anchors.len() < 3 {
                return None;
            }
            Some(Geometry::Polygon(vec![close_ring(anchors.to_vec())]))
        }
        SketchKind::Rectangle => {
            let [c1, c2] = [anchors.first()?, anchors.get(1)?];
            let height = plane.height_of(*c1);
            let p1 = plane.to_local(*c1);
            let p2 = plane.to_local(*c2);
            if (p2.x - p1.x).abs() < 1e-9 || (p2.y - p1.y).abs() < 1e-9 {
                return None;
            }

            let corners = [
                p1,
                DVec2::new(p2.x, p1.y),
                p2,
                DVec2::new(p1.x, p2.y),
            ];
            let ring = corners
                .iter()
                .map(|&c| plane.to_world(c, height))
                .collect();
            Some(Geometry::Polygon(vec![close_ring(ring)]))
        }
        SketchKind::Circle => {
            let [center, rim] = [anchors.first()?, anchors.get(1)?];
            let height = plane.height_of(*center);
            let c = plane.to_local(*center);
            let radius = (plane.to_local(*rim) - c).length();
            if radius < 1e-9 || circle_segments < 3 {
                return None;
            }

            let ring = (0..circle_segments)
                .map(|i| {
                    let angle = (i as f64 / circle_segments as f64) * std::f64::consts::TAU;
                    let offset = DVec2::new(angle.cos() * radius, angle.sin() * radius);
                    plane.to_world(c + offset, height)
                })
                .collect();
            Some(Geometry::Polygon(vec![close_ring(ring)]))
        }
    }
}

/// Repeat the first position at the end of a ring
fn close_ring(mut ring: Vec<WorldPoint>) -> Vec<WorldPoint> {
    if let Some(&first) = ring.first() {
        ring.push(first);
    }
    ring
}
