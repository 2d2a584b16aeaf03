//! Host interaction mode

use serde::{Deserialize, Serialize};

/// Global interaction mode owned by the host.
///
/// The sketch engine only reacts to input while the mode is `Sketch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InteractionMode {
    #[default]
    Default,
    Move,
    Selection,
    Sketch,
}

impl InteractionMode {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionMode::Default => "default",
            InteractionMode::Move => "move",
            InteractionMode::Selection => "selection",
            InteractionMode::Sketch => "sketch",
        }
    }

    /// Check if the sketch engine should react to input
    pub fn is_sketch(&self) -> bool {
        matches!(self, InteractionMode::Sketch)
    }
}
