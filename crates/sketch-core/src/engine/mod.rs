//! Host Engine Abstraction Layer
//!
//! Provides a trait-based abstraction over the 3D engine that owns the
//! viewport, so the sketch state machine can run against a globe, a flat
//! scene, or a test stub.

mod planar;
mod traits;

pub use planar::{
    DEFAULT_CIRCLE_SEGMENTS, GroundPlane, PlanarEngine, Viewport, build_planar_geometry,
};
pub use traits::*;
