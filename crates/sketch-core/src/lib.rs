//! Sketch Engine Core
//!
//! This crate contains the host-independent parts of the interactive sketch
//! engine:
//! - Engine: trait over the 3D engine that owns the viewport, plus a planar backend
//! - Sketch: geometry kinds, anchors, duplicate filter, and the session state machine
//! - Feature: the finished artifact handed to the host

pub mod engine;
pub mod feature;
pub mod sketch;

pub use engine::*;
pub use feature::*;
pub use sketch::*;
