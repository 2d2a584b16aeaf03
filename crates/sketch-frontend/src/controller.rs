//! Sketch controller
//!
//! Maps raw host input onto state machine commands. Input is only accepted
//! while the host is in sketch mode and the engine has a live surface; any
//! rejected command leaves the session untouched and is logged at debug level.

use tracing::{debug, info};

use sketch_core::{
    Anchor, Feature, Geometry, ScreenPos, Session, SketchEngine, SketchKind, SketchMachine,
    SketchState, WorldPoint, is_duplicate,
};

use crate::config::SketchConfig;
use crate::input::{SketchInput, SketchKey};
use crate::layers::{Dispatch, LayerStore, emit_feature};
use crate::state::{InteractionMode, ListenerHandle, Listeners};

/// Live preview of the open session, derived from the anchors and the pointer
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub kind: SketchKind,
    /// Anchors, plus the pointer position while drawing
    pub positions: Vec<WorldPoint>,
    /// Geometry for the positions, if the engine can build it
    pub geometry: Option<Geometry>,
    pub extruded_height: f64,
}

/// Drives one sketch session from host input
pub struct SketchController<E> {
    engine: E,
    machine: SketchMachine,
    config: SketchConfig,
    mode: InteractionMode,
    /// Kind armed by the host; the next pointer-down opens a session of it
    armed: Option<SketchKind>,
    last_pointer: Option<ScreenPos>,
    /// Set when the host or a double-click requested extrusion
    explicit_extrusion: bool,
    listeners: Listeners,
    layers: Option<Box<dyn LayerStore + Send>>,
}

impl<E: SketchEngine> SketchController<E> {
    pub fn new(mut engine: E, config: SketchConfig) -> Self {
        engine.set_circle_segments(config.circle_segments);
        Self {
            engine,
            machine: SketchMachine::new(config.tolerance),
            config,
            mode: InteractionMode::default(),
            armed: None,
            last_pointer: None,
            explicit_extrusion: false,
            listeners: Listeners::default(),
            layers: None,
        }
    }

    /// Attach the host's layer store for merging into sketch layers
    pub fn with_layer_store(mut self, store: impl LayerStore + Send + 'static) -> Self {
        self.layers = Some(Box::new(store));
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn machine(&self) -> &SketchMachine {
        &self.machine
    }

    pub fn state(&self) -> SketchState {
        self.machine.state()
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Kind armed for the next session
    pub fn armed_kind(&self) -> Option<SketchKind> {
        self.armed
    }

    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    /// Replace the configuration; applies to the open session too
    pub fn set_config(&mut self, config: SketchConfig) {
        self.machine.set_tolerance(config.tolerance);
        self.engine.set_circle_segments(config.circle_segments);
        self.config = config;
    }

    /// Last known pointer position
    pub fn last_pointer(&self) -> Option<ScreenPos> {
        self.last_pointer
    }

    /// Register a listener for the armed kind
    pub fn on_type_changed(
        &mut self,
        listener: impl FnMut(Option<SketchKind>) + Send + 'static,
    ) -> ListenerHandle {
        self.listeners.add_type_listener(Box::new(listener))
    }

    pub fn remove_type_listener(&mut self, handle: ListenerHandle) -> bool {
        self.listeners.remove_type_listener(handle)
    }

    /// Set the feature listener, replacing any previous one
    pub fn on_feature_created(&mut self, listener: impl FnMut(Option<Feature>) + Send + 'static) {
        self.listeners.set_feature_listener(Box::new(listener));
    }

    /// Follow the host's interaction mode; leaving sketch mode aborts the session
    pub fn set_mode(&mut self, mode: InteractionMode) {
        if self.mode == mode {
            return;
        }
        info!("Interaction mode {} -> {}", self.mode.name(), mode.name());
        self.mode = mode;

        if !mode.is_sketch() {
            self.abort();
        }
    }

    /// Check if input is currently handled
    pub fn accepts_input(&self) -> bool {
        self.mode.is_sketch() && self.engine.is_available()
    }

    /// Arm a kind; the next pointer-down opens a session of it.
    ///
    /// Rejected while a session is open.
    pub fn begin_draw(&mut self, kind: SketchKind) -> bool {
        if !self.accepts_input() {
            return false;
        }
        if let Some(open) = self.machine.kind() {
            debug!("Ignoring begin {}: {} session already open", kind, open);
            return false;
        }

        self.armed = Some(kind);
        info!("Armed {} tool", kind);
        self.listeners.notify_type(Some(kind));
        true
    }

    /// Forward one raw input event. Returns true if it was consumed.
    pub fn handle_input(&mut self, input: SketchInput) -> bool {
        match input {
            SketchInput::PointerDown { pos } => self.pointer_down(pos),
            SketchInput::PointerMove { pos } => self.pointer_move(pos),
            SketchInput::PointerUp { pos } => self.pointer_up(pos),
            SketchInput::DoubleClick { pos } => self.double_click(pos),
            SketchInput::KeyDown { key } => self.key_down(key),
        }
    }

    pub fn pointer_down(&mut self, pos: ScreenPos) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.last_pointer = Some(pos);

        match self.machine.state() {
            SketchState::Idle => {
                let Some(kind) = self.armed else {
                    return false;
                };
                let Some(anchor) = self.anchor_at(pos) else {
                    return false;
                };
                match self.machine.begin_draw(kind, anchor) {
                    Ok(()) => {
                        info!("Started {} sketch", kind);
                        true
                    }
                    Err(e) => {
                        debug!("Rejected begin: {}", e);
                        false
                    }
                }
            }
            SketchState::Drawing(kind) => {
                if self.is_accidental_click(kind, pos) {
                    debug!("Ignoring click near the first anchor at {:?}", pos);
                    return false;
                }
                let Some(anchor) = self.anchor_at(pos) else {
                    return false;
                };
                match self.machine.add_vertex(&self.engine, anchor) {
                    Ok(state) => {
                        debug!("Anchor {} -> {}", self.machine.anchors().len(), state);
                        true
                    }
                    Err(e) => {
                        debug!("Rejected anchor: {}", e);
                        false
                    }
                }
            }
            SketchState::Extruding(_) => self.finalize().is_some(),
        }
    }

    pub fn pointer_move(&mut self, pos: ScreenPos) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.last_pointer = Some(pos);

        match self.machine.state() {
            SketchState::Idle => false,
            // The preview is derived on demand from the last pointer
            SketchState::Drawing(_) => true,
            SketchState::Extruding(_) => self.machine.update_extrusion(&self.engine, pos).is_ok(),
        }
    }

    /// Two-point kinds complete on the pointer-up that gives them their last
    /// anchor, unless extrusion was requested explicitly.
    pub fn pointer_up(&mut self, pos: ScreenPos) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.last_pointer = Some(pos);

        let Some(session) = self.machine.session() else {
            return false;
        };
        if self.explicit_extrusion || !session.kind().is_complete(session.anchors().len()) {
            return false;
        }
        self.finalize().is_some()
    }

    pub fn double_click(&mut self, pos: ScreenPos) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.last_pointer = Some(pos);

        match self.machine.state() {
            SketchState::Drawing(SketchKind::Polyline) => self.finalize().is_some(),
            SketchState::Drawing(SketchKind::Polygon) if self.config.extrude_polygons => {
                self.extrude()
            }
            SketchState::Drawing(SketchKind::Polygon) => self.finalize().is_some(),
            _ => false,
        }
    }

    pub fn key_down(&mut self, key: SketchKey) -> bool {
        if !self.accepts_input() {
            return false;
        }

        match key {
            SketchKey::Escape => self.cancel(),
            SketchKey::Enter if !self.machine.is_idle() => self.finalize().is_some(),
            _ => false,
        }
    }

    /// Cap the anchors at the pointer and start extruding
    pub fn extrude(&mut self) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let Some(fallback) = self.machine.session().and_then(Session::last_anchor).copied() else {
            return false;
        };
        let anchor = self
            .last_pointer
            .and_then(|pos| self.anchor_at(pos))
            .unwrap_or(fallback);

        match self.machine.extrude(&self.engine, anchor) {
            Ok(state) => {
                self.explicit_extrusion = true;
                info!("Sketch -> {}", state);
                true
            }
            Err(e) => {
                debug!("Rejected extrude: {}", e);
                false
            }
        }
    }

    /// Finish the session and dispatch the feature.
    ///
    /// A rejected finalize keeps the session and notifies the feature
    /// listener with None.
    pub fn finalize(&mut self) -> Option<Dispatch> {
        if !self.accepts_input() || self.machine.is_idle() {
            return None;
        }

        match self.machine.finalize(&self.engine) {
            Ok(feature) => {
                self.explicit_extrusion = false;
                info!(
                    "Finished {} ({} anchors, height {})",
                    feature.display_type().name(),
                    feature.properties.positions.len(),
                    feature.extruded_height()
                );
                let dispatch =
                    emit_feature(feature, self.layers.as_deref_mut(), &mut self.listeners);
                self.disarm();
                Some(dispatch)
            }
            Err(e) => {
                debug!("Rejected finalize: {}", e);
                self.listeners.notify_feature(None);
                None
            }
        }
    }

    /// Undo the last anchor, closing the session when only one is left.
    ///
    /// While idle with an armed kind this disarms it.
    pub fn cancel(&mut self) -> bool {
        if !self.accepts_input() {
            return false;
        }

        match self.machine.cancel() {
            Ok(SketchState::Idle) => {
                self.explicit_extrusion = false;
                info!("Cancelled sketch");
                self.listeners.notify_feature(None);
                self.disarm();
                true
            }
            Ok(state) => {
                self.explicit_extrusion = false;
                debug!("Undid anchor -> {}", state);
                true
            }
            Err(_) if self.armed.is_some() => {
                self.disarm();
                true
            }
            Err(_) => false,
        }
    }

    /// Discard the session and disarm, regardless of anchor count
    pub fn abort(&mut self) {
        self.explicit_extrusion = false;
        if let Some(kind) = self.machine.abort() {
            info!("Aborted {} sketch", kind);
            self.listeners.notify_feature(None);
        }
        self.disarm();
    }

    /// Current preview of the open session
    pub fn preview(&self) -> Option<Preview> {
        let session = self.machine.session()?;
        let kind = session.kind();
        let mut positions = session.positions();

        if session.extrusion().is_none()
            && kind.accepts_anchor(positions.len())
            && let Some(world) = self
                .last_pointer
                .and_then(|pos| self.engine.screen_to_world(pos))
            && !is_duplicate(&self.engine, world, session.anchors(), self.machine.tolerance())
        {
            positions.push(world);
        }

        let geometry = self.engine.build_geometry(kind, &positions);
        Some(Preview {
            kind,
            positions,
            geometry,
            extruded_height: self.machine.extruded_height(),
        })
    }

    fn disarm(&mut self) {
        if self.armed.take().is_some() {
            self.listeners.notify_type(None);
        }
    }

    fn anchor_at(&self, pos: ScreenPos) -> Option<Anchor> {
        match self.engine.screen_to_world(pos) {
            Some(world) => Some(Anchor::new(world, pos)),
            None => {
                debug!("No world projection at {:?}", pos);
                None
            }
        }
    }

    fn is_accidental_click(&self, kind: SketchKind, pos: ScreenPos) -> bool {
        kind.guards_first_click()
            && self
                .machine
                .session()
                .and_then(Session::first_anchor)
                .is_some_and(|first| first.screen.distance(pos) <= self.config.click_tolerance_px)
    }
}

impl<E> std::fmt::Debug for SketchController<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SketchController")
            .field("machine", &self.machine)
            .field("mode", &self.mode)
            .field("armed", &self.armed)
            .field("last_pointer", &self.last_pointer)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{LayerData, MemoryLayerStore, SharedLayerStore, new_sketch_layer_id};
    use approx::assert_relative_eq;
    use glam::{DVec3, Vec2};
    use parking_lot::Mutex;
    use sketch_core::{
        GeometryType, GroundPlane, NullEngine, PlanarEngine, Viewport, build_planar_geometry,
    };
    use std::sync::Arc;

    /// Screen pixels map onto the XY plane; height is the upward pointer
    /// displacement from the anchor's row.
    struct StubEngine;

    impl SketchEngine for StubEngine {
        fn name(&self) -> &str {
            "stub"
        }

        fn screen_to_world(&self, screen: ScreenPos) -> Option<WorldPoint> {
            Some(DVec3::new(screen.x as f64, screen.y as f64, 0.0))
        }

        fn sample_extrusion_height(&self, anchor: WorldPoint, screen: ScreenPos) -> Option<f64> {
            Some(anchor.y - screen.y as f64)
        }

        fn build_geometry(&self, kind: SketchKind, anchors: &[WorldPoint]) -> Option<Geometry> {
            build_planar_geometry(&GroundPlane::default(), 8, kind, anchors)
        }
    }

    type Log<T> = Arc<Mutex<Vec<T>>>;

    struct Harness {
        controller: SketchController<StubEngine>,
        types: Log<Option<SketchKind>>,
        features: Log<Option<Feature>>,
    }

    fn harness() -> Harness {
        let mut controller = SketchController::new(StubEngine, SketchConfig::default());
        let types: Log<Option<SketchKind>> = Arc::default();
        let features: Log<Option<Feature>> = Arc::default();
        {
            let types = types.clone();
            controller.on_type_changed(move |k| types.lock().push(k));
        }
        {
            let features = features.clone();
            controller.on_feature_created(move |f| features.lock().push(f));
        }
        controller.set_mode(InteractionMode::Sketch);
        Harness {
            controller,
            types,
            features,
        }
    }

    fn at(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    fn world(x: f32, y: f32) -> DVec3 {
        DVec3::new(x as f64, y as f64, 0.0)
    }

    impl Harness {
        fn click(&mut self, pos: Vec2) {
            self.controller.pointer_down(pos);
            self.controller.pointer_up(pos);
        }

        fn positions(&self) -> Vec<DVec3> {
            self.controller
                .machine()
                .anchors()
                .iter()
                .map(|a| a.world)
                .collect()
        }

        fn emitted(&self) -> Vec<Feature> {
            self.features.lock().iter().flatten().cloned().collect()
        }
    }

    #[test]
    fn test_polygon_double_click_finalizes_flat() {
        let mut h = harness();
        h.controller.begin_draw(SketchKind::Polygon);
        for pos in [at(0.0, 0.0), at(20.0, 0.0), at(20.0, 20.0), at(0.0, 20.0)] {
            h.click(pos);
        }
        assert_eq!(h.controller.state(), SketchState::Drawing(SketchKind::Polygon));

        // Second click of the double-click lands on the last anchor
        h.click(at(0.0, 20.0));
        h.controller.double_click(at(0.0, 20.0));

        let emitted = h.emitted();
        assert_eq!(emitted.len(), 1);
        let feature = &emitted[0];
        assert_eq!(feature.geometry.geometry_type(), GeometryType::Polygon);
        assert_eq!(feature.properties.positions, vec![
            world(0.0, 0.0),
            world(20.0, 0.0),
            world(20.0, 20.0),
            world(0.0, 20.0),
        ]);
        assert_eq!(feature.extruded_height(), 0.0);
        assert_eq!(h.controller.state(), SketchState::Idle);
    }

    #[test]
    fn test_rectangle_completes_on_second_pointer_up() {
        let mut h = harness();
        h.controller.begin_draw(SketchKind::Rectangle);
        h.click(at(0.0, 0.0));
        assert_eq!(h.controller.state(), SketchState::Drawing(SketchKind::Rectangle));

        h.controller.pointer_down(at(30.0, 10.0));
        assert_eq!(h.controller.state(), SketchState::Drawing(SketchKind::Rectangle));
        assert!(h.features.lock().is_empty());

        h.controller.pointer_up(at(30.0, 10.0));
        let emitted = h.emitted();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].geometry.geometry_type(), GeometryType::Polygon);
        assert_eq!(emitted[0].extruded_height(), 0.0);
        assert!(h.controller.machine().is_idle());
    }

    #[test]
    fn test_duplicate_vertex_is_ignored() {
        let mut h = harness();
        h.controller.begin_draw(SketchKind::Polygon);
        h.click(at(5.0, 5.0));
        h.click(at(5.0, 5.0));
        assert_eq!(h.positions(), vec![world(5.0, 5.0)]);
        assert_eq!(h.controller.state(), SketchState::Drawing(SketchKind::Polygon));
    }

    #[test]
    fn test_escape_unwinds_then_closes() {
        let mut h = harness();
        h.controller.begin_draw(SketchKind::Polygon);
        for pos in [at(0.0, 0.0), at(10.0, 0.0), at(10.0, 10.0)] {
            h.click(pos);
        }

        assert!(h.controller.key_down(SketchKey::Escape));
        assert_eq!(h.positions(), vec![world(0.0, 0.0), world(10.0, 0.0)]);
        assert_eq!(h.controller.state(), SketchState::Drawing(SketchKind::Polygon));

        h.controller.key_down(SketchKey::Escape);
        assert_eq!(h.positions(), vec![world(0.0, 0.0)]);

        h.controller.key_down(SketchKey::Escape);
        assert_eq!(h.controller.state(), SketchState::Idle);
        assert!(h.emitted().is_empty());
        assert_eq!(h.types.lock().last(), Some(&None));
    }

    #[test]
    fn test_mode_loss_aborts_and_notifies() {
        let mut h = harness();
        h.controller.begin_draw(SketchKind::Polyline);
        h.click(at(0.0, 0.0));
        h.click(at(10.0, 0.0));
        h.click(at(10.0, 10.0));

        h.controller.set_mode(InteractionMode::Move);

        assert_eq!(h.controller.state(), SketchState::Idle);
        assert_eq!(h.controller.armed_kind(), None);
        assert_eq!(*h.features.lock(), vec![None]);
        assert_eq!(*h.types.lock(), vec![Some(SketchKind::Polyline), None]);

        // Input is swallowed outside sketch mode
        assert!(!h.controller.pointer_down(at(1.0, 1.0)));
        assert!(!h.controller.begin_draw(SketchKind::Marker));
    }

    #[test]
    fn test_mode_loss_while_extruding() {
        let mut h = harness();
        h.controller.begin_draw(SketchKind::Circle);
        h.click(at(0.0, 0.0));
        h.controller.pointer_down(at(10.0, 0.0));
        h.controller.pointer_move(at(10.0, -5.0));
        assert_eq!(h.controller.state(), SketchState::Extruding(SketchKind::Circle));

        h.controller.set_mode(InteractionMode::Move);

        assert_eq!(h.controller.state(), SketchState::Idle);
        assert_eq!(h.controller.machine().extruded_height(), 0.0);
        assert_eq!(*h.features.lock(), vec![None]);
        assert_eq!(*h.types.lock(), vec![Some(SketchKind::Circle), None]);
    }

    #[test]
    fn test_double_click_extrude_rejected_on_single_anchor() {
        let mut h = harness();
        h.controller.set_config(SketchConfig {
            extrude_polygons: true,
            ..Default::default()
        });
        h.controller.begin_draw(SketchKind::Polygon);
        h.click(at(0.0, 0.0));

        assert!(!h.controller.double_click(at(0.0, 0.0)));
        assert_eq!(h.controller.state(), SketchState::Drawing(SketchKind::Polygon));

        // Drawing carries on without spurious notifications
        h.click(at(30.0, 0.0));
        h.click(at(30.0, 30.0));
        assert_eq!(h.positions().len(), 3);
        assert!(h.features.lock().is_empty());
    }

    #[test]
    fn test_escape_after_double_click_extrude_keeps_anchors() {
        let mut h = harness();
        h.controller.set_config(SketchConfig {
            extrude_polygons: true,
            ..Default::default()
        });
        h.controller.begin_draw(SketchKind::Polygon);
        for pos in [at(0.0, 0.0), at(10.0, 0.0), at(10.0, 10.0)] {
            h.click(pos);
        }
        assert!(h.controller.double_click(at(10.0, 10.0)));

        assert!(h.controller.key_down(SketchKey::Escape));
        assert_eq!(h.controller.state(), SketchState::Drawing(SketchKind::Polygon));
        assert_eq!(h.positions(), vec![
            world(0.0, 0.0),
            world(10.0, 0.0),
            world(10.0, 10.0),
        ]);
        assert!(h.features.lock().is_empty());
    }

    #[test]
    fn test_config_applies_circle_segments_to_engine() {
        let config = SketchConfig {
            circle_segments: 12,
            ..Default::default()
        };
        let mut controller = SketchController::new(PlanarEngine::new(Viewport::default()), config);
        assert_eq!(controller.engine().circle_segments, 12);

        controller.set_config(SketchConfig {
            circle_segments: 48,
            ..Default::default()
        });
        assert_eq!(controller.engine().circle_segments, 48);
    }

    #[test]
    fn test_marker_ignores_vertical_drag() {
        let mut h = harness();
        h.controller.begin_draw(SketchKind::Marker);
        h.controller.pointer_down(at(4.0, 4.0));
        h.controller.pointer_move(at(4.0, -400.0));

        let dispatch = h.controller.finalize();
        assert!(matches!(dispatch, Some(Dispatch::Callback { .. })));

        let emitted = h.emitted();
        assert_eq!(emitted[0].geometry, Geometry::Point(world(4.0, 4.0)));
        assert_eq!(emitted[0].extruded_height(), 0.0);
    }

    #[test]
    fn test_marker_click_finalizes() {
        let mut h = harness();
        h.controller.begin_draw(SketchKind::Marker);
        h.click(at(2.0, 3.0));
        assert_eq!(h.emitted().len(), 1);
        assert!(h.controller.machine().is_idle());
    }

    #[test]
    fn test_circle_drag_sets_height() {
        let mut h = harness();
        h.controller.begin_draw(SketchKind::Circle);
        h.click(at(0.0, 0.0));
        h.controller.pointer_down(at(10.0, 0.0));
        assert_eq!(h.controller.state(), SketchState::Extruding(SketchKind::Circle));

        h.controller.pointer_move(at(10.0, -15.0));
        h.controller.pointer_up(at(10.0, -15.0));

        let emitted = h.emitted();
        assert_eq!(emitted.len(), 1);
        assert_relative_eq!(emitted[0].extruded_height(), 15.0);
        assert_eq!(emitted[0].display_type().name(), "extrudedCircle");
    }

    #[test]
    fn test_explicit_rectangle_extrusion() {
        let mut h = harness();
        h.controller.begin_draw(SketchKind::Rectangle);
        h.click(at(0.0, 0.0));
        h.controller.pointer_move(at(8.0, 6.0));
        assert!(h.controller.extrude());
        assert_eq!(h.controller.state(), SketchState::Extruding(SketchKind::Rectangle));

        // Pointer-up no longer completes the shape
        h.controller.pointer_up(at(8.0, 6.0));
        assert!(h.emitted().is_empty());

        h.controller.pointer_move(at(8.0, 2.0));
        h.controller.pointer_down(at(8.0, 2.0));
        let emitted = h.emitted();
        assert_eq!(emitted.len(), 1);
        assert_relative_eq!(emitted[0].extruded_height(), 4.0);
    }

    #[test]
    fn test_polygon_double_click_extrudes_when_configured() {
        let mut h = harness();
        h.controller.set_config(SketchConfig {
            extrude_polygons: true,
            ..Default::default()
        });

        h.controller.begin_draw(SketchKind::Polygon);
        for pos in [at(0.0, 0.0), at(10.0, 0.0), at(10.0, 10.0)] {
            h.click(pos);
        }
        h.controller.double_click(at(10.0, 10.0));
        assert_eq!(h.controller.state(), SketchState::Extruding(SketchKind::Polygon));
        assert_eq!(h.positions().len(), 3);

        h.controller.pointer_move(at(3.0, 5.0));
        h.controller.key_down(SketchKey::Enter);
        let emitted = h.emitted();
        assert_relative_eq!(emitted[0].extruded_height(), 5.0);
        assert_eq!(emitted[0].display_type().name(), "extrudedPolygon");
    }

    #[test]
    fn test_accidental_click_near_first_anchor() {
        let mut h = harness();
        h.controller.begin_draw(SketchKind::Polyline);
        h.click(at(50.0, 50.0));
        h.click(at(52.0, 51.0));
        assert_eq!(h.positions().len(), 1);

        h.click(at(60.0, 50.0));
        assert_eq!(h.positions().len(), 2);
    }

    #[test]
    fn test_enter_on_unbuildable_polygon_notifies_none() {
        let mut h = harness();
        h.controller.begin_draw(SketchKind::Polygon);
        h.click(at(0.0, 0.0));
        h.click(at(10.0, 0.0));

        assert!(!h.controller.key_down(SketchKey::Enter));
        assert_eq!(*h.features.lock(), vec![None]);
        assert_eq!(h.controller.state(), SketchState::Drawing(SketchKind::Polygon));
        assert_eq!(h.positions().len(), 2);
    }

    #[test]
    fn test_begin_draw_rejected_while_session_open() {
        let mut h = harness();
        h.controller.begin_draw(SketchKind::Polyline);
        h.click(at(0.0, 0.0));
        assert!(!h.controller.begin_draw(SketchKind::Circle));
        assert_eq!(h.controller.machine().kind(), Some(SketchKind::Polyline));
        assert_eq!(*h.types.lock(), vec![Some(SketchKind::Polyline)]);
    }

    #[test]
    fn test_preview_follows_pointer() {
        let mut h = harness();
        h.controller.begin_draw(SketchKind::Polygon);
        h.click(at(0.0, 0.0));
        h.click(at(10.0, 0.0));
        h.controller.pointer_move(at(10.0, 10.0));

        let preview = h.controller.preview().unwrap();
        assert_eq!(preview.positions.len(), 3);
        assert!(preview.geometry.is_some());

        // After undo the preview rebuilds from the shorter list
        h.controller.key_down(SketchKey::Escape);
        let preview = h.controller.preview().unwrap();
        assert_eq!(preview.positions, vec![world(0.0, 0.0), world(10.0, 10.0)]);
        assert!(preview.geometry.is_none());
    }

    #[test]
    fn test_unavailable_engine_swallows_input() {
        let mut controller = SketchController::new(NullEngine, SketchConfig::default());
        controller.set_mode(InteractionMode::Sketch);
        assert!(!controller.begin_draw(SketchKind::Polygon));
        assert!(!controller.pointer_down(at(1.0, 1.0)));
        assert!(controller.machine().is_idle());
    }

    #[test]
    fn test_finalize_merges_into_active_sketch_layer() {
        let store: SharedLayerStore = Arc::new(Mutex::new(MemoryLayerStore::new()));
        let layer = {
            let mut store = store.lock();
            let id = store.add_sketch_layer();
            store.set_active(Some(id.clone()));
            id
        };

        let mut h = harness();
        h.controller = SketchController::new(StubEngine, SketchConfig::default())
            .with_layer_store(store.clone());
        {
            let features = h.features.clone();
            h.controller.on_feature_created(move |f| features.lock().push(f));
        }
        h.controller.set_mode(InteractionMode::Sketch);

        h.controller.begin_draw(SketchKind::Marker);
        h.click(at(1.0, 1.0));

        let store = store.lock();
        assert_eq!(store.features(&layer).len(), 1);
        assert!(h.features.lock().is_empty());
    }

    #[test]
    fn test_non_sketch_active_layer_uses_callback() {
        let mut store = MemoryLayerStore::new();
        store.add_layer("imagery", LayerData::External("tiles".into()));
        store.set_active(Some("imagery".into()));
        assert!(!store.is_sketch_layer(&new_sketch_layer_id()));

        let mut controller =
            SketchController::new(StubEngine, SketchConfig::default()).with_layer_store(store);
        controller.set_mode(InteractionMode::Sketch);
        controller.begin_draw(SketchKind::Polyline);
        controller.pointer_down(at(0.0, 0.0));
        controller.pointer_up(at(0.0, 0.0));
        controller.pointer_down(at(10.0, 0.0));

        assert!(matches!(
            controller.finalize(),
            Some(Dispatch::Callback { .. })
        ));
    }

    #[test]
    fn test_scripted_inputs() {
        let mut h = harness();
        h.controller.begin_draw(SketchKind::Polyline);
        let inputs = [
            SketchInput::PointerDown { pos: at(0.0, 0.0) },
            SketchInput::PointerUp { pos: at(0.0, 0.0) },
            SketchInput::PointerMove { pos: at(15.0, 0.0) },
            SketchInput::PointerDown { pos: at(15.0, 0.0) },
            SketchInput::PointerUp { pos: at(15.0, 0.0) },
            SketchInput::DoubleClick { pos: at(15.0, 0.0) },
        ];
        for input in inputs {
            h.controller.handle_input(input);
        }

        let emitted = h.emitted();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].geometry.geometry_type(), GeometryType::LineString);
    }
}
