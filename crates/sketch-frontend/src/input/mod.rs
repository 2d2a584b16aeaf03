//! Raw host input events

mod viewport;

pub use viewport::{collect_inputs, handle_egui_input};

use serde::{Deserialize, Serialize};
use sketch_core::ScreenPos;

/// Keys the sketch engine reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SketchKey {
    /// Undo the last anchor
    Escape,
    /// Finish the shape
    Enter,
    Other,
}

/// A raw pointer or keyboard event forwarded by the host.
///
/// Positions are in viewport pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SketchInput {
    PointerDown { pos: ScreenPos },
    PointerMove { pos: ScreenPos },
    PointerUp { pos: ScreenPos },
    DoubleClick { pos: ScreenPos },
    KeyDown { key: SketchKey },
}
