//! Sketch Features
//!
//! The immutable artifact a finalized session produces: engine-built
//! geometry plus the properties the host needs to re-edit or style it.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::engine::{Geometry, WorldPoint};
use crate::sketch::SketchKind;

/// Feature properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureProperties {
    /// Same identifier as the owning feature
    pub id: Uuid,
    /// Kind of the session that produced the feature
    #[serde(rename = "type")]
    pub kind: SketchKind,
    /// Copy of the session anchors
    pub positions: Vec<WorldPoint>,
    /// Extrusion height (0 for flat features)
    pub extruded_height: f64,
}

/// A finished sketch feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Unique identifier
    pub id: Uuid,
    /// Geometry built by the engine
    pub geometry: Geometry,
    /// Sketch properties
    pub properties: FeatureProperties,
}

/// Presentation tag of a feature, including extruded variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureType {
    Marker,
    Polyline,
    Circle,
    ExtrudedCircle,
    Rectangle,
    ExtrudedRectangle,
    Polygon,
    ExtrudedPolygon,
}

impl FeatureType {
    /// Derive the presentation tag from a kind and its extrusion height
    pub fn from_kind(kind: SketchKind, extruded_height: f64) -> Self {
        let extruded = extruded_height > 0.0;
        match (kind, extruded) {
            (SketchKind::Marker, _) => FeatureType::Marker,
            (SketchKind::Polyline, _) => FeatureType::Polyline,
            (SketchKind::Circle, false) => FeatureType::Circle,
            (SketchKind::Circle, true) => FeatureType::ExtrudedCircle,
            (SketchKind::Rectangle, false) => FeatureType::Rectangle,
            (SketchKind::Rectangle, true) => FeatureType::ExtrudedRectangle,
            (SketchKind::Polygon, false) => FeatureType::Polygon,
            (SketchKind::Polygon, true) => FeatureType::ExtrudedPolygon,
        }
    }

    /// Get the type name
    pub fn name(&self) -> &'static str {
        match self {
            FeatureType::Marker => "marker",
            FeatureType::Polyline => "polyline",
            FeatureType::Circle => "circle",
            FeatureType::ExtrudedCircle => "extrudedCircle",
            FeatureType::Rectangle => "rectangle",
            FeatureType::ExtrudedRectangle => "extrudedRectangle",
            FeatureType::Polygon => "polygon",
            FeatureType::ExtrudedPolygon => "extrudedPolygon",
        }
    }
}

impl Feature {
    /// Create a feature with a fresh identifier
    pub fn new(
        kind: SketchKind,
        geometry: Geometry,
        positions: Vec<WorldPoint>,
        extruded_height: f64,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            geometry,
            properties: FeatureProperties {
                id,
                kind,
                positions,
                extruded_height,
            },
        }
    }

    /// Kind of the session that produced this feature
    pub fn kind(&self) -> SketchKind {
        self.properties.kind
    }

    /// Extrusion height
    pub fn extruded_height(&self) -> f64 {
        self.properties.extruded_height
    }

    /// Presentation tag derived from kind and height
    pub fn display_type(&self) -> FeatureType {
        FeatureType::from_kind(self.properties.kind, self.properties.extruded_height)
    }

    /// Render as a GeoJSON `Feature` object
    pub fn to_geojson(&self) -> Value {
        json!({
            "type": "Feature",
            "id": self.id.to_string(),
            "geometry": self.geometry,
            "properties": {
                "id": self.properties.id.to_string(),
                "type": self.properties.kind.type_name(),
                "displayType": self.display_type().name(),
                "positions": self.properties.positions,
                "extrudedHeight": self.properties.extruded_height,
            },
        })
    }
}

/// Render a feature list as a GeoJSON `FeatureCollection`
pub fn feature_collection(features: &[Feature]) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": features.iter().map(Feature::to_geojson).collect::<Vec<_>>(),
    })
}
