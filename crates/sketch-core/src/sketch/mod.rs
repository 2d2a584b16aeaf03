//! Interactive Sketch State Machine
//!
//! Provides the session state machine that turns placed anchors into a
//! finished feature:
//! - Geometry kinds and their completion policy
//! - Ordered anchors with undo by popping
//! - Duplicate-point rejection
//! - Idle / Drawing / Extruding transitions

mod anchor;
mod filter;
mod kind;
mod machine;

pub use anchor::*;
pub use filter::*;
pub use kind::*;
pub use machine::*;

use thiserror::Error;

use crate::engine::GeometryType;

/// Rejected sketch commands.
///
/// A rejected command never changes the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SketchError {
    #[error("No sketch session is open")]
    NoSession,

    #[error("A {0} session is already open")]
    SessionOpen(SketchKind),

    #[error("Command not valid while {0}")]
    InvalidState(SketchState),

    #[error("Anchor duplicates an existing anchor")]
    DuplicateAnchor,

    #[error("A {kind} holds at most {max} anchors")]
    AnchorLimit { kind: SketchKind, max: usize },

    #[error("A {0} cannot be extruded")]
    NotExtrudable(SketchKind),

    #[error("Cannot build {kind} geometry from {anchors} anchors")]
    UnbuildableGeometry { kind: SketchKind, anchors: usize },

    #[error("Engine built a {found:?} for a {kind}")]
    GeometryMismatch { kind: SketchKind, found: GeometryType },
}

/// Result type for sketch commands
pub type SketchResult<T> = Result<T, SketchError>;

/// State of the sketch machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SketchState {
    /// No session
    #[default]
    Idle,
    /// Placing anchors
    Drawing(SketchKind),
    /// Anchors capped, height follows the pointer
    Extruding(SketchKind),
}

impl SketchState {
    /// Kind of the open session
    pub fn kind(&self) -> Option<SketchKind> {
        match self {
            SketchState::Idle => None,
            SketchState::Drawing(kind) | SketchState::Extruding(kind) => Some(*kind),
        }
    }

    /// Check if idle
    pub fn is_idle(&self) -> bool {
        matches!(self, SketchState::Idle)
    }

    /// Check if drawing
    pub fn is_drawing(&self) -> bool {
        matches!(self, SketchState::Drawing(_))
    }

    /// Check if extruding
    pub fn is_extruding(&self) -> bool {
        matches!(self, SketchState::Extruding(_))
    }
}

impl std::fmt::Display for SketchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SketchState::Idle => f.write_str("idle"),
            SketchState::Drawing(kind) => write!(f, "drawing {}", kind),
            SketchState::Extruding(kind) => write!(f, "extruding {}", kind),
        }
    }
}
