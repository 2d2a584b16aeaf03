//! Host layer store and feature dispatch
//!
//! A finished feature either joins the active sketch-owned layer or is handed
//! to the host's "feature created" listener. Exactly one path fires.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use sketch_core::Feature;

use crate::state::Listeners;

/// Prefix of plugin-generated sketch layer identifiers
pub const SKETCH_LAYER_PREFIX: &str = "sketch-";

/// Layer store errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayerError {
    #[error("Layer not found: {0}")]
    NotFound(String),

    #[error("Layer {0} does not hold a feature collection")]
    NotFeatureCollection(String),
}

/// Generate a fresh sketch layer identifier
pub fn new_sketch_layer_id() -> String {
    format!("{}{}", SKETCH_LAYER_PREFIX, Uuid::new_v4())
}

/// Check if an identifier has the sketch layer format
pub fn is_sketch_layer_id(id: &str) -> bool {
    id.strip_prefix(SKETCH_LAYER_PREFIX)
        .is_some_and(|rest| Uuid::parse_str(rest).is_ok())
}

/// Host-owned layer storage
pub trait LayerStore {
    /// Identifier of the currently active layer
    fn active_layer(&self) -> Option<String>;

    /// Check if a layer is owned by the sketch engine and holds a feature collection
    fn is_sketch_layer(&self, layer: &str) -> bool;

    /// Append a feature to a layer's feature collection
    fn merge_feature(&mut self, layer: &str, feature: &Feature) -> Result<(), LayerError>;

    /// Ask the host to select a feature on the next render tick
    fn select_feature_next_tick(&mut self, layer: &str, feature_id: Uuid);
}

/// Contents of an in-memory layer
#[derive(Debug, Clone, PartialEq)]
pub enum LayerData {
    /// A collection of features
    FeatureCollection(Vec<Feature>),
    /// Any other layer source (tiles, imagery, remote URL)
    External(String),
}

/// A layer held by [`MemoryLayerStore`]
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: String,
    pub data: LayerData,
}

/// In-memory layer store
#[derive(Debug, Clone, Default)]
pub struct MemoryLayerStore {
    layers: Vec<Layer>,
    active: Option<String>,
    pending_selection: Option<(String, Uuid)>,
}

impl MemoryLayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty sketch layer and return its identifier
    pub fn add_sketch_layer(&mut self) -> String {
        let id = new_sketch_layer_id();
        self.add_layer(id.clone(), LayerData::FeatureCollection(Vec::new()));
        id
    }

    /// Add a layer
    pub fn add_layer(&mut self, id: impl Into<String>, data: LayerData) {
        self.layers.push(Layer {
            id: id.into(),
            data,
        });
    }

    /// Set the active layer
    pub fn set_active(&mut self, id: Option<String>) {
        self.active = id;
    }

    /// Get a layer by identifier
    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Features of a feature-collection layer
    pub fn features(&self, id: &str) -> &[Feature] {
        match self.layer(id).map(|l| &l.data) {
            Some(LayerData::FeatureCollection(features)) => features,
            _ => &[],
        }
    }

    /// Take the selection requested for the next render tick
    pub fn take_pending_selection(&mut self) -> Option<(String, Uuid)> {
        self.pending_selection.take()
    }
}

impl LayerStore for MemoryLayerStore {
    fn active_layer(&self) -> Option<String> {
        self.active.clone()
    }

    fn is_sketch_layer(&self, layer: &str) -> bool {
        is_sketch_layer_id(layer)
            && matches!(
                self.layer(layer).map(|l| &l.data),
                Some(LayerData::FeatureCollection(_))
            )
    }

    fn merge_feature(&mut self, layer: &str, feature: &Feature) -> Result<(), LayerError> {
        let entry = self
            .layers
            .iter_mut()
            .find(|l| l.id == layer)
            .ok_or_else(|| LayerError::NotFound(layer.to_string()))?;

        match &mut entry.data {
            LayerData::FeatureCollection(features) => {
                features.push(feature.clone());
                Ok(())
            }
            LayerData::External(_) => Err(LayerError::NotFeatureCollection(layer.to_string())),
        }
    }

    fn select_feature_next_tick(&mut self, layer: &str, feature_id: Uuid) {
        self.pending_selection = Some((layer.to_string(), feature_id));
    }
}

/// Layer store shared between the host and the controller
pub type SharedLayerStore = Arc<Mutex<MemoryLayerStore>>;

impl<S: LayerStore> LayerStore for Arc<Mutex<S>> {
    fn active_layer(&self) -> Option<String> {
        self.lock().active_layer()
    }

    fn is_sketch_layer(&self, layer: &str) -> bool {
        self.lock().is_sketch_layer(layer)
    }

    fn merge_feature(&mut self, layer: &str, feature: &Feature) -> Result<(), LayerError> {
        self.lock().merge_feature(layer, feature)
    }

    fn select_feature_next_tick(&mut self, layer: &str, feature_id: Uuid) {
        self.lock().select_feature_next_tick(layer, feature_id);
    }
}

/// Which dispatch path a finished feature took
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Merged into an existing sketch layer
    Layer { layer: String, feature_id: Uuid },
    /// Handed to the "feature created" listener
    Callback { feature_id: Uuid },
}

/// Dispatch a finished feature to the active sketch layer or the listener
pub fn emit_feature(
    feature: Feature,
    layers: Option<&mut (dyn LayerStore + Send + 'static)>,
    listeners: &mut Listeners,
) -> Dispatch {
    let feature_id = feature.id;

    if let Some(store) = layers
        && let Some(layer) = store.active_layer()
        && store.is_sketch_layer(&layer)
    {
        match store.merge_feature(&layer, &feature) {
            Ok(()) => {
                store.select_feature_next_tick(&layer, feature_id);
                info!("Merged {} feature {} into layer {}", feature.kind(), feature_id, layer);
                return Dispatch::Layer { layer, feature_id };
            }
            Err(e) => warn!("Failed to merge feature into {}: {}", layer, e),
        }
    }

    info!("Created standalone {} feature {}", feature.kind(), feature_id);
    listeners.notify_feature(Some(feature));
    Dispatch::Callback { feature_id }
}
