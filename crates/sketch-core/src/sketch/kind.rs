//! Sketch Geometry Kinds
//!
//! Defines the shapes a sketch session can produce and the per-kind
//! completion policy that drives the state machine.

use serde::{Deserialize, Serialize};

/// The kind of geometry a session draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SketchKind {
    /// A single point
    Marker,
    /// An open line through any number of anchors
    Polyline,
    /// A circle from centre and rim anchors
    Circle,
    /// An axis-aligned rectangle from two opposite corners
    Rectangle,
    /// A closed polygon through any number of anchors
    Polygon,
}

/// Completion policy for a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindPolicy {
    /// Anchor count at which adding a vertex moves straight to extruding
    pub extrude_at: Option<usize>,
    /// Maximum number of anchors a session may hold
    pub max_anchors: Option<usize>,
    /// Whether an explicit extrude command is accepted
    pub extrudable: bool,
    /// Anchor count at which a pointer release finalizes the shape
    pub complete_at: Option<usize>,
}

impl SketchKind {
    /// All kinds
    pub const ALL: [SketchKind; 5] = [
        SketchKind::Marker,
        SketchKind::Polyline,
        SketchKind::Circle,
        SketchKind::Rectangle,
        SketchKind::Polygon,
    ];

    /// Get the type name of this kind
    pub fn type_name(&self) -> &'static str {
        match self {
            SketchKind::Marker => "marker",
            SketchKind::Polyline => "polyline",
            SketchKind::Circle => "circle",
            SketchKind::Rectangle => "rectangle",
            SketchKind::Polygon => "polygon",
        }
    }

    /// Completion policy table
    pub fn policy(&self) -> KindPolicy {
        match self {
            SketchKind::Marker => KindPolicy {
                extrude_at: Some(2),
                max_anchors: None,
                extrudable: false,
                complete_at: Some(1),
            },
            SketchKind::Polyline => KindPolicy {
                extrude_at: None,
                max_anchors: None,
                extrudable: false,
                complete_at: None,
            },
            SketchKind::Circle => KindPolicy {
                extrude_at: Some(2),
                max_anchors: Some(2),
                extrudable: true,
                complete_at: Some(2),
            },
            SketchKind::Rectangle => KindPolicy {
                extrude_at: None,
                max_anchors: Some(2),
                extrudable: true,
                complete_at: Some(2),
            },
            SketchKind::Polygon => KindPolicy {
                extrude_at: None,
                max_anchors: None,
                extrudable: true,
                complete_at: None,
            },
        }
    }

    /// Check if a session with `anchor_count` anchors is finished on release
    pub fn is_complete(&self, anchor_count: usize) -> bool {
        self.policy()
            .complete_at
            .is_some_and(|n| anchor_count >= n)
    }

    /// Check if another anchor fits after `anchor_count` anchors
    pub fn accepts_anchor(&self, anchor_count: usize) -> bool {
        self.policy().max_anchors.is_none_or(|max| anchor_count < max)
    }

    /// Check if adding the anchor that brings the session to `anchor_count`
    /// moves it straight to extruding
    pub fn extrudes_at(&self, anchor_count: usize) -> bool {
        self.policy().extrude_at == Some(anchor_count)
    }

    /// Check if the accidental-click guard applies to this kind
    pub fn guards_first_click(&self) -> bool {
        !matches!(self, SketchKind::Marker)
    }
}

impl std::fmt::Display for SketchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}
