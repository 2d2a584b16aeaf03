//! Sketch state machine
//!
//! Owns the single session and applies commands to it. Every command either
//! fully applies or is rejected with the session left untouched.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    Anchor, AnchorTrail, SketchError, SketchKind, SketchResult, SketchState, Tolerance,
    is_duplicate,
};
use crate::engine::{GeometryType, ScreenPos, SketchEngine, WorldPoint};
use crate::feature::Feature;

/// Extrusion context, present only while extruding
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extrusion {
    /// Live extrusion height
    pub height: f64,
    /// Whether entering extrusion appended an anchor
    pub capped: bool,
}

/// An open sketch session
#[derive(Debug, Clone)]
pub struct Session {
    kind: SketchKind,
    anchors: AnchorTrail,
    extrusion: Option<Extrusion>,
}

impl Session {
    fn new(kind: SketchKind, first: Anchor) -> Self {
        Self {
            kind,
            anchors: AnchorTrail::with_first(first),
            extrusion: None,
        }
    }

    /// Geometry kind being drawn
    pub fn kind(&self) -> SketchKind {
        self.kind
    }

    /// Anchors in insertion order
    pub fn anchors(&self) -> &[Anchor] {
        self.anchors.as_slice()
    }

    /// Most recently accepted anchor
    pub fn last_anchor(&self) -> Option<&Anchor> {
        self.anchors.last()
    }

    /// First anchor of the session
    pub fn first_anchor(&self) -> Option<&Anchor> {
        self.anchors.first()
    }

    /// Pointer position of the last accepted anchor
    pub fn last_pointer_screen_pos(&self) -> Option<ScreenPos> {
        self.anchors.last().map(|a| a.screen)
    }

    /// World positions of the anchors
    pub fn positions(&self) -> Vec<WorldPoint> {
        self.anchors.positions()
    }

    /// Extrusion context, if extruding
    pub fn extrusion(&self) -> Option<&Extrusion> {
        self.extrusion.as_ref()
    }

    /// Current state
    pub fn state(&self) -> SketchState {
        if self.extrusion.is_some() {
            SketchState::Extruding(self.kind)
        } else {
            SketchState::Drawing(self.kind)
        }
    }

    fn enter_extrusion(&mut self, capped: bool) {
        self.extrusion = Some(Extrusion {
            height: 0.0,
            capped,
        });
    }
}

/// A command for the state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SketchCommand {
    /// Open a session with its first anchor
    BeginDraw { kind: SketchKind, anchor: Anchor },
    /// Append an anchor
    AddVertex { anchor: Anchor },
    /// Cap the anchors and start extruding
    Extrude { anchor: Anchor },
    /// Resample the extrusion height for a pointer position
    UpdateExtrusion { screen: ScreenPos },
    /// Emit the feature and close the session
    Finalize,
    /// Undo the last anchor, or close the session if only one is left
    Cancel,
    /// Close the session unconditionally
    Abort,
}

/// Result of an applied command
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// A session was opened
    Started(SketchKind),
    /// The session changed and is now in this state
    Moved(SketchState),
    /// The extrusion height was resampled
    HeightSampled(f64),
    /// The session produced a feature and closed
    Finalized(Feature),
    /// The session closed without a feature
    Aborted(SketchKind),
}

/// The sketch state machine
#[derive(Debug, Clone, Default)]
pub struct SketchMachine {
    session: Option<Session>,
    tolerance: Tolerance,
}

impl SketchMachine {
    /// Create an idle machine with the given duplicate tolerance
    pub fn new(tolerance: Tolerance) -> Self {
        Self {
            session: None,
            tolerance,
        }
    }

    /// Duplicate tolerance
    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Replace the duplicate tolerance
    pub fn set_tolerance(&mut self, tolerance: Tolerance) {
        self.tolerance = tolerance;
    }

    /// Current state
    pub fn state(&self) -> SketchState {
        self.session
            .as_ref()
            .map_or(SketchState::Idle, Session::state)
    }

    /// Check if no session is open
    pub fn is_idle(&self) -> bool {
        self.session.is_none()
    }

    /// The open session
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Kind of the open session
    pub fn kind(&self) -> Option<SketchKind> {
        self.session.as_ref().map(Session::kind)
    }

    /// Anchors of the open session (empty when idle)
    pub fn anchors(&self) -> &[Anchor] {
        self.session
            .as_ref()
            .map(Session::anchors)
            .unwrap_or_default()
    }

    /// Live extrusion height (0 unless extruding)
    pub fn extruded_height(&self) -> f64 {
        self.session
            .as_ref()
            .and_then(Session::extrusion)
            .map_or(0.0, |e| e.height)
    }

    /// Apply a command
    pub fn apply<E: SketchEngine + ?Sized>(
        &mut self,
        engine: &E,
        command: SketchCommand,
    ) -> SketchResult<Transition> {
        match command {
            SketchCommand::BeginDraw { kind, anchor } => {
                self.begin_draw(kind, anchor)?;
                Ok(Transition::Started(kind))
            }
            SketchCommand::AddVertex { anchor } => {
                self.add_vertex(engine, anchor).map(Transition::Moved)
            }
            SketchCommand::Extrude { anchor } => {
                self.extrude(engine, anchor).map(Transition::Moved)
            }
            SketchCommand::UpdateExtrusion { screen } => self
                .update_extrusion(engine, screen)
                .map(Transition::HeightSampled),
            SketchCommand::Finalize => self.finalize(engine).map(Transition::Finalized),
            SketchCommand::Cancel => {
                let kind = self.kind().ok_or(SketchError::NoSession)?;
                match self.cancel()? {
                    SketchState::Idle => Ok(Transition::Aborted(kind)),
                    state => Ok(Transition::Moved(state)),
                }
            }
            SketchCommand::Abort => self
                .abort()
                .map(Transition::Aborted)
                .ok_or(SketchError::NoSession),
        }
    }

    /// Open a session with its first anchor
    pub fn begin_draw(&mut self, kind: SketchKind, anchor: Anchor) -> SketchResult<()> {
        if let Some(session) = &self.session {
            return Err(SketchError::SessionOpen(session.kind));
        }
        self.session = Some(Session::new(kind, anchor));
        debug!("Began {} session", kind);
        Ok(())
    }

    /// Append an anchor while drawing.
    ///
    /// Returns the state after the anchor was accepted.
    pub fn add_vertex<E: SketchEngine + ?Sized>(
        &mut self,
        engine: &E,
        anchor: Anchor,
    ) -> SketchResult<SketchState> {
        let tolerance = self.tolerance;
        let session = self.drawing_session_mut()?;
        let kind = session.kind;
        let count = session.anchors.len();

        if !kind.accepts_anchor(count) {
            return Err(SketchError::AnchorLimit { kind, max: count });
        }
        if is_duplicate(engine, anchor.world, session.anchors.as_slice(), tolerance) {
            return Err(SketchError::DuplicateAnchor);
        }

        session.anchors.push(anchor);
        if kind.extrudes_at(session.anchors.len()) {
            session.enter_extrusion(true);
        }

        let state = session.state();
        debug!("Added anchor {} to {} session -> {}", session.anchors.len(), kind, state);
        Ok(state)
    }

    /// Cap the anchors with a final one and start extruding.
    ///
    /// The final anchor is skipped when it duplicates an existing anchor or
    /// the kind is already at capacity. Rejected when the resulting anchors
    /// cannot build the kind, so extrusion always ends in a buildable shape.
    pub fn extrude<E: SketchEngine + ?Sized>(
        &mut self,
        engine: &E,
        anchor: Anchor,
    ) -> SketchResult<SketchState> {
        let tolerance = self.tolerance;
        let session = self.drawing_session_mut()?;
        let kind = session.kind;

        if !kind.policy().extrudable {
            return Err(SketchError::NotExtrudable(kind));
        }

        let capped = kind.accepts_anchor(session.anchors.len())
            && !is_duplicate(engine, anchor.world, session.anchors.as_slice(), tolerance);
        let mut positions = session.positions();
        if capped {
            positions.push(anchor.world);
        }
        if engine.build_geometry(kind, &positions).is_none() {
            return Err(SketchError::UnbuildableGeometry {
                kind,
                anchors: positions.len(),
            });
        }

        if capped {
            session.anchors.push(anchor);
        }
        session.enter_extrusion(capped);

        debug!("Extruding {} session with {} anchors", kind, session.anchors.len());
        Ok(session.state())
    }

    /// Resample the extrusion height from the last anchor and a pointer position.
    ///
    /// Keeps the previous height when the engine cannot sample.
    pub fn update_extrusion<E: SketchEngine + ?Sized>(
        &mut self,
        engine: &E,
        screen: ScreenPos,
    ) -> SketchResult<f64> {
        let state = self.state();
        let session = self.session.as_mut().ok_or(SketchError::NoSession)?;
        let last = session.anchors.last().map(|a| a.world);
        let (Some(extrusion), Some(last)) = (session.extrusion.as_mut(), last) else {
            return Err(SketchError::InvalidState(state));
        };

        if let Some(height) = engine.sample_extrusion_height(last, screen) {
            extrusion.height = height;
        }
        Ok(extrusion.height)
    }

    /// Build the feature and close the session.
    ///
    /// On rejection the session is left exactly as it was.
    pub fn finalize<E: SketchEngine + ?Sized>(&mut self, engine: &E) -> SketchResult<Feature> {
        let session = self.session.as_ref().ok_or(SketchError::NoSession)?;
        let kind = session.kind;
        let positions = session.positions();

        let geometry = engine
            .build_geometry(kind, &positions)
            .ok_or(SketchError::UnbuildableGeometry {
                kind,
                anchors: positions.len(),
            })?;

        let found = geometry.geometry_type();
        if found == GeometryType::LineString && kind != SketchKind::Polyline {
            return Err(SketchError::GeometryMismatch { kind, found });
        }

        let extruded_height = match kind {
            SketchKind::Marker => 0.0,
            _ => session.extrusion.map_or(0.0, |e| e.height),
        };

        let feature = Feature::new(kind, geometry, positions, extruded_height);
        self.session = None;
        debug!("Finalized {} feature {}", kind, feature.id);
        Ok(feature)
    }

    /// Undo the last anchor.
    ///
    /// Leaving an extrusion that did not append a cap only drops the
    /// extrusion. Otherwise, with more than one anchor the last is dropped and
    /// the session returns to drawing; with one anchor the session closes.
    /// Returns the new state.
    pub fn cancel(&mut self) -> SketchResult<SketchState> {
        let session = self.session.as_mut().ok_or(SketchError::NoSession)?;

        if session.extrusion.take().is_some_and(|e| !e.capped) {
            let state = session.state();
            debug!("Left extrusion -> {} ({} anchors)", state, session.anchors.len());
            return Ok(state);
        }

        if session.anchors.len() > 1 {
            session.anchors.pop();
            let state = session.state();
            debug!("Undid anchor -> {} ({} left)", state, session.anchors.len());
            return Ok(state);
        }

        let kind = session.kind;
        self.session = None;
        debug!("Cancelled {} session", kind);
        Ok(SketchState::Idle)
    }

    /// Close the session regardless of anchor count.
    ///
    /// Returns the kind of the closed session, or None if already idle.
    pub fn abort(&mut self) -> Option<SketchKind> {
        let kind = self.session.take().map(|s| s.kind)?;
        debug!("Aborted {} session", kind);
        Some(kind)
    }

    fn drawing_session_mut(&mut self) -> SketchResult<&mut Session> {
        let state = self.state();
        match self.session.as_mut() {
            Some(session) if session.extrusion.is_none() => Ok(session),
            Some(_) => Err(SketchError::InvalidState(state)),
            None => Err(SketchError::NoSession),
        }
    }
}
