//! Sketch Engine Frontend
//!
//! Host-facing side of the sketch engine: input gating on the interaction
//! mode, raw input to command mapping, listener registration, and dispatch of
//! finished features into sketch layers.

pub mod config;
pub mod controller;
pub mod input;
pub mod layers;
pub mod replay;
pub mod state;

pub use config::{AppConfig, ConfigManager, SketchConfig, SketchOverrides};
pub use controller::{Preview, SketchController};
pub use input::{SketchInput, SketchKey, collect_inputs, handle_egui_input};
pub use layers::{Dispatch, LayerError, LayerStore, MemoryLayerStore, SharedLayerStore};
pub use state::{InteractionMode, ListenerHandle};
