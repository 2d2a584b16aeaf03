//! Controller state types

mod listeners;
mod mode;

pub use listeners::{FeatureListener, ListenerHandle, Listeners, TypeListener};
pub use mode::InteractionMode;
