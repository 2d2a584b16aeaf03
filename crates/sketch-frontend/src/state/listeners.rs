//! Host listener registration
//!
//! Any number of "type changed" listeners may coexist; "feature created" is a
//! single slot and a new registration replaces the previous one.

use sketch_core::{Feature, SketchKind};

/// Listener for the armed sketch kind (None when drawing ends or aborts)
pub type TypeListener = Box<dyn FnMut(Option<SketchKind>) + Send>;

/// Listener for finished features (None on abort or a rejected finalize)
pub type FeatureListener = Box<dyn FnMut(Option<Feature>) + Send>;

/// Handle for a registered type listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

/// Registered host listeners
#[derive(Default)]
pub struct Listeners {
    next_id: u64,
    type_changed: Vec<(ListenerHandle, TypeListener)>,
    feature_created: Option<FeatureListener>,
}

impl Listeners {
    /// Register a type listener
    pub fn add_type_listener(&mut self, listener: TypeListener) -> ListenerHandle {
        let handle = ListenerHandle(self.next_id);
        self.next_id += 1;
        self.type_changed.push((handle, listener));
        handle
    }

    /// Remove a type listener; returns false if the handle is unknown
    pub fn remove_type_listener(&mut self, handle: ListenerHandle) -> bool {
        let before = self.type_changed.len();
        self.type_changed.retain(|(h, _)| *h != handle);
        self.type_changed.len() != before
    }

    /// Set the feature listener, replacing any previous one
    pub fn set_feature_listener(&mut self, listener: FeatureListener) {
        self.feature_created = Some(listener);
    }

    pub fn notify_type(&mut self, kind: Option<SketchKind>) {
        for (_, listener) in &mut self.type_changed {
            listener(kind);
        }
    }

    pub fn notify_feature(&mut self, feature: Option<Feature>) {
        if let Some(listener) = &mut self.feature_created {
            listener(feature);
        }
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("type_changed", &self.type_changed.len())
            .field("feature_created", &self.feature_created.is_some())
            .finish()
    }
}
