//! Anchor storage for an open session

use serde::{Deserialize, Serialize};

use crate::engine::{ScreenPos, WorldPoint};

/// A control point placed by the user
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// Position in engine coordinates
    pub world: WorldPoint,
    /// Pointer position that produced it
    pub screen: ScreenPos,
}

impl Anchor {
    pub fn new(world: WorldPoint, screen: ScreenPos) -> Self {
        Self { world, screen }
    }
}

/// Ordered anchors with a logical length.
///
/// Undo lowers the length instead of keeping a separate history; pushing
/// truncates to the logical length first, so popped anchors never reappear.
#[derive(Debug, Clone, Default)]
pub struct AnchorTrail {
    anchors: Vec<Anchor>,
    len: usize,
}

impl AnchorTrail {
    /// Create a trail holding one anchor
    pub fn with_first(anchor: Anchor) -> Self {
        Self {
            anchors: vec![anchor],
            len: 1,
        }
    }

    /// Number of live anchors
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the trail has no live anchors
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append an anchor after the live ones
    pub fn push(&mut self, anchor: Anchor) {
        self.anchors.truncate(self.len);
        self.anchors.push(anchor);
        self.len += 1;
    }

    /// Drop the last live anchor, returning it
    pub fn pop(&mut self) -> Option<Anchor> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        self.anchors.get(self.len).copied()
    }

    /// Live anchors in insertion order
    pub fn as_slice(&self) -> &[Anchor] {
        &self.anchors[..self.len]
    }

    /// First live anchor
    pub fn first(&self) -> Option<&Anchor> {
        self.as_slice().first()
    }

    /// Most recently accepted anchor
    pub fn last(&self) -> Option<&Anchor> {
        self.as_slice().last()
    }

    /// World positions of the live anchors
    pub fn positions(&self) -> Vec<WorldPoint> {
        self.as_slice().iter().map(|a| a.world).collect()
    }
}
