//! Connection geometry: anchor coordinates and edge routing.
//!
//! Every edge endpoint caches the coordinates of the anchor it binds to. The
//! cache is rewritten whenever the bound vertex moves or its visible rows
//! change, so at rest an endpoint always equals [`anchor_point`] for its
//! `(vertex_id, prop)`. Sources bind to output anchors on the right edge,
//! targets to input anchors on the left edge.

#[cfg(test)]
#[path = "connect_test.rs"]
mod connect_test;

use tracing::{debug, info};

use crate::doc::{Edge, EdgeNote, EdgeStyle, Endpoint, NewEdge, ObjectId, Vertex, VertexMetrics};
use crate::engine::{Action, EngineCore, ObjectKind};
use crate::error::EngineError;
use crate::geom::{Point, path_between};
use crate::hit::hit_anchor;
use crate::input::{EdgeEnd, InputState};
use crate::visibility::ViewMode;

/// Side of a property row an anchor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorSide {
    /// Left edge; edges arrive here.
    Input,
    /// Right edge; edges leave from here.
    Output,
}

/// A connection point on a vertex. `offset` is relative to the vertex origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    /// Row connection key, or `None` for the header anchor.
    pub prop: Option<String>,
    /// `None` for the header anchor, which serves both directions.
    pub side: Option<AnchorSide>,
    pub offset: Point,
}

/// Absolute anchor coordinates for a vertex or one of its rows.
///
/// Without `prop` the anchor is the middle of the header's top edge. With a
/// `prop` the row index counts visible rows only, so the result depends on the
/// current display policy.
#[must_use]
pub fn anchor_point(vertex: &Vertex, metrics: &VertexMetrics, prop: Option<&str>, side: AnchorSide) -> Point {
    let Some(prop) = prop else {
        return Point::new(vertex.x + metrics.width / 2.0, vertex.y);
    };
    let index = vertex.visible_index_of(prop);
    let x = match side {
        AnchorSide::Output => vertex.x + metrics.width,
        AnchorSide::Input => vertex.x,
    };
    Point::new(x, vertex.y + row_center(metrics, index))
}

#[allow(clippy::cast_precision_loss)]
fn row_center(metrics: &VertexMetrics, visible_index: usize) -> f64 {
    metrics.header_height + visible_index as f64 * metrics.row_height + metrics.row_height / 2.0
}

/// Anchors a vertex currently exposes.
///
/// The header anchor is always present. Rows get an input and an output
/// anchor; in the reduced view only rows that carry an edge have them.
#[must_use]
pub fn vertex_anchors(vertex: &Vertex, metrics: &VertexMetrics) -> Vec<Anchor> {
    let mut anchors = vec![Anchor { prop: None, side: None, offset: Point::new(metrics.width / 2.0, 0.0) }];
    let rows: Vec<usize> = if vertex.anchors_reduced {
        vertex.reduced_anchors.iter().copied().filter(|row| vertex.is_row_visible(*row)).collect()
    } else {
        vertex.visible_rows().collect()
    };
    for row in rows {
        let key = vertex.row_key(row);
        let y = row_center(metrics, vertex.visible_index_of(&key));
        anchors.push(Anchor { prop: Some(key.clone()), side: Some(AnchorSide::Input), offset: Point::new(0.0, y) });
        anchors.push(Anchor { prop: Some(key), side: Some(AnchorSide::Output), offset: Point::new(metrics.width, y) });
    }
    anchors
}

/// Replacement endpoints for an existing edge. `None` leaves that end as is.
#[derive(Debug, Clone, Default)]
pub struct EndpointUpdate {
    pub source: Option<Endpoint>,
    pub target: Option<Endpoint>,
}

impl EngineCore {
    /// Anchor coordinates of `(vertex_id, prop)` on the given side.
    ///
    /// # Errors
    ///
    /// `VertexNotFound` if the vertex is unknown.
    pub fn coordinate_property(
        &self,
        vertex_id: &ObjectId,
        prop: Option<&str>,
        side: AnchorSide,
    ) -> Result<Point, EngineError> {
        let vertex = self.doc.vertex(vertex_id).ok_or_else(|| EngineError::VertexNotFound(vertex_id.clone()))?;
        Ok(anchor_point(vertex, &self.doc.metrics(), prop, side))
    }

    /// Anchors the vertex exposes; empty for an unknown id.
    #[must_use]
    pub fn active_anchors(&self, vertex_id: &ObjectId) -> Vec<Anchor> {
        self.doc
            .vertex(vertex_id)
            .map(|v| vertex_anchors(v, &self.doc.metrics()))
            .unwrap_or_default()
    }

    /// Recompute every endpoint bound to `vertex_id` and re-derive the paths.
    ///
    /// # Errors
    ///
    /// `VertexNotFound` if the vertex is unknown.
    pub fn update_vertex_paths(&mut self, vertex_id: &ObjectId) -> Result<(), EngineError> {
        if self.doc.vertex(vertex_id).is_none() {
            return Err(EngineError::VertexNotFound(vertex_id.clone()));
        }
        self.reroute_vertex(vertex_id);
        Ok(())
    }

    pub(crate) fn reroute_vertex(&mut self, vertex_id: &ObjectId) {
        let Some(vertex) = self.doc.vertex(vertex_id) else {
            return;
        };
        let metrics = self.doc.metrics();
        let mut updates = Vec::new();
        for edge in self.doc.edges().iter().filter(|e| e.touches(vertex_id)) {
            let source = (edge.source.vertex_id == *vertex_id)
                .then(|| anchor_point(vertex, &metrics, edge.source.prop.as_deref(), AnchorSide::Output));
            let target = (edge.target.vertex_id == *vertex_id)
                .then(|| anchor_point(vertex, &metrics, edge.target.prop.as_deref(), AnchorSide::Input));
            updates.push((edge.id.clone(), source, target));
        }
        for (edge_id, source, target) in updates {
            let Some(edge) = self.doc.edge_mut(&edge_id) else {
                continue;
            };
            if let Some(at) = source {
                edge.source.x = at.x;
                edge.source.y = at.y;
            }
            if let Some(at) = target {
                edge.target.x = at.x;
                edge.target.y = at.y;
            }
            let d = edge.path();
            self.emit(Action::SetPath { edge_id, d });
        }
    }

    fn check_endpoint(&self, endpoint: &Endpoint) -> Result<(), EngineError> {
        let vertex = self
            .doc
            .vertex(&endpoint.vertex_id)
            .ok_or_else(|| EngineError::VertexNotFound(endpoint.vertex_id.clone()))?;
        match &endpoint.prop {
            Some(prop) if vertex.row_of(prop).is_none() => {
                Err(EngineError::UnknownProperty { vertex: vertex.id.clone(), prop: prop.clone() })
            }
            _ => Ok(()),
        }
    }

    /// Create an edge and return its id.
    ///
    /// Endpoint coordinates are re-derived from the bound anchors. In the
    /// reduced view, rows the new edge binds to become visible.
    ///
    /// # Errors
    ///
    /// `VertexNotFound` / `UnknownProperty` for a bad endpoint, `DuplicateId`
    /// for a taken id.
    pub fn create_edge(&mut self, new: NewEdge) -> Result<ObjectId, EngineError> {
        self.check_endpoint(&new.source)?;
        self.check_endpoint(&new.target)?;
        let mut edge = new.into_edge();
        if self.doc.contains(&edge.id) {
            return Err(EngineError::DuplicateId(edge.id));
        }
        let source = self.coordinate_property(&edge.source.vertex_id, edge.source.prop.as_deref(), AnchorSide::Output)?;
        let target = self.coordinate_property(&edge.target.vertex_id, edge.target.prop.as_deref(), AnchorSide::Input)?;
        edge.source = Endpoint::new(edge.source.vertex_id, edge.source.prop, source);
        edge.target = Endpoint::new(edge.target.vertex_id, edge.target.prop, target);

        let id = edge.id.clone();
        let ends = [edge.source.vertex_id.clone(), edge.target.vertex_id.clone()];
        let d = edge.path();
        self.doc.insert_edge(edge)?;
        info!(%id, source = %ends[0], target = %ends[1], "edge created");
        self.emit(Action::ObjectCreated { id: id.clone(), kind: ObjectKind::Edge });
        self.emit(Action::SetPath { edge_id: id.clone(), d });

        if self.session.view == ViewMode::Reduced {
            self.reveal_connected(&ends);
        }
        Ok(id)
    }

    /// Overwrite the supplied endpoints verbatim and re-derive the path.
    ///
    /// # Errors
    ///
    /// `EdgeNotFound` for an unknown edge, `VertexNotFound` /
    /// `UnknownProperty` for a bad replacement endpoint.
    pub fn update_path_connect(&mut self, edge_id: &ObjectId, update: EndpointUpdate) -> Result<(), EngineError> {
        if self.doc.edge(edge_id).is_none() {
            return Err(EngineError::EdgeNotFound(edge_id.clone()));
        }
        for endpoint in update.source.iter().chain(update.target.iter()) {
            self.check_endpoint(endpoint)?;
        }
        let Some(edge) = self.doc.edge_mut(edge_id) else {
            return Err(EngineError::EdgeNotFound(edge_id.clone()));
        };
        if let Some(source) = update.source {
            edge.source = source;
        }
        if let Some(target) = update.target {
            edge.target = target;
        }
        let d = edge.path();
        self.emit(Action::SetPath { edge_id: edge_id.clone(), d });
        Ok(())
    }

    /// # Errors
    ///
    /// `EdgeNotFound` if `edge_id` is unknown.
    pub fn remove_edge(&mut self, edge_id: &ObjectId) -> Result<(), EngineError> {
        self.doc.remove_edge(edge_id).ok_or_else(|| EngineError::EdgeNotFound(edge_id.clone()))?;
        debug!(%edge_id, "edge removed");
        self.emit(Action::ObjectRemoved { id: edge_id.clone(), kind: ObjectKind::Edge });
        Ok(())
    }

    /// # Errors
    ///
    /// `EdgeNotFound` if `edge_id` is unknown.
    pub fn set_edge_style(&mut self, edge_id: &ObjectId, style: EdgeStyle) -> Result<(), EngineError> {
        let edge = self.doc.edge_mut(edge_id).ok_or_else(|| EngineError::EdgeNotFound(edge_id.clone()))?;
        edge.style = style;
        self.emit(Action::LabelsChanged { id: edge_id.clone() });
        Ok(())
    }

    /// # Errors
    ///
    /// `EdgeNotFound` if `edge_id` is unknown.
    pub fn set_edge_notes(&mut self, edge_id: &ObjectId, note: EdgeNote) -> Result<(), EngineError> {
        let edge = self.doc.edge_mut(edge_id).ok_or_else(|| EngineError::EdgeNotFound(edge_id.clone()))?;
        edge.note = note;
        self.emit(Action::LabelsChanged { id: edge_id.clone() });
        Ok(())
    }

    #[must_use]
    pub fn edge(&self, edge_id: &ObjectId) -> Option<&Edge> {
        self.doc.edge(edge_id)
    }

    // --- Edge gestures ---

    /// Start drawing a new edge out of an output anchor.
    ///
    /// # Errors
    ///
    /// `ModeBusy` while another gesture is active, `VertexNotFound` /
    /// `UnknownProperty` for a bad anchor.
    pub fn start_connect(&mut self, vertex_id: &ObjectId, prop: Option<String>) -> Result<Vec<Action>, EngineError> {
        self.ensure_idle()?;
        let source = Endpoint::new(vertex_id.clone(), prop, Point::default());
        self.check_endpoint(&source)?;
        let at = self.coordinate_property(vertex_id, source.prop.as_deref(), AnchorSide::Output)?;
        self.input = InputState::CreatingEdge { source: Endpoint { x: at.x, y: at.y, ..source } };
        Ok(self.take_actions())
    }

    /// Follow the pointer with a preview path.
    ///
    /// # Errors
    ///
    /// `NoActiveGesture` unless an edge is being drawn.
    pub fn draw_connect(&mut self, pointer: Point) -> Result<Vec<Action>, EngineError> {
        let InputState::CreatingEdge { source } = &self.input else {
            return Err(EngineError::NoActiveGesture);
        };
        let d = path_between(source.point(), pointer);
        self.emit(Action::PreviewPath { d });
        Ok(self.take_actions())
    }

    /// Finish drawing. Dropping on another anchor creates the edge; dropping
    /// anywhere else discards it.
    ///
    /// # Errors
    ///
    /// `NoActiveGesture` unless an edge is being drawn.
    pub fn end_connect(&mut self, drop: Point) -> Result<Vec<Action>, EngineError> {
        if !matches!(self.input, InputState::CreatingEdge { .. }) {
            return Err(EngineError::NoActiveGesture);
        }
        let InputState::CreatingEdge { source } = std::mem::take(&mut self.input) else {
            return Err(EngineError::NoActiveGesture);
        };
        self.emit(Action::HidePreview);
        if let Some(hit) = hit_anchor(&self.doc, drop) {
            let same_anchor = hit.vertex_id == source.vertex_id && hit.prop == source.prop;
            if !same_anchor {
                let at = self.coordinate_property(&hit.vertex_id, hit.prop.as_deref(), AnchorSide::Input)?;
                let target = Endpoint::new(hit.vertex_id, hit.prop, at);
                self.create_edge(NewEdge::new(source, target))?;
            }
        }
        self.refresh_canvas_size();
        Ok(self.take_actions())
    }

    /// Start moving one end of an existing edge.
    ///
    /// # Errors
    ///
    /// `ModeBusy` while another gesture is active, `EdgeNotFound` for an
    /// unknown edge.
    pub fn start_retarget(&mut self, edge_id: &ObjectId, end: EdgeEnd) -> Result<Vec<Action>, EngineError> {
        self.ensure_idle()?;
        let edge = self.doc.edge(edge_id).ok_or_else(|| EngineError::EdgeNotFound(edge_id.clone()))?;
        let fixed = match end {
            EdgeEnd::Source => edge.target.point(),
            EdgeEnd::Target => edge.source.point(),
        };
        self.input = InputState::RetargetingEdge { edge_id: edge_id.clone(), end, fixed };
        Ok(self.take_actions())
    }

    /// Follow the pointer with the moving end of the edge.
    ///
    /// # Errors
    ///
    /// `NoActiveGesture` unless an edge end is being moved.
    pub fn drag_retarget(&mut self, pointer: Point) -> Result<Vec<Action>, EngineError> {
        let InputState::RetargetingEdge { end, fixed, .. } = &self.input else {
            return Err(EngineError::NoActiveGesture);
        };
        let d = match end {
            EdgeEnd::Source => path_between(pointer, *fixed),
            EdgeEnd::Target => path_between(*fixed, pointer),
        };
        self.emit(Action::PreviewPath { d });
        Ok(self.take_actions())
    }

    /// Drop the moving end. On an anchor the edge is rebound; elsewhere the
    /// edge is left unchanged.
    ///
    /// # Errors
    ///
    /// `NoActiveGesture` unless an edge end is being moved.
    pub fn end_retarget(&mut self, drop: Point) -> Result<Vec<Action>, EngineError> {
        if !matches!(self.input, InputState::RetargetingEdge { .. }) {
            return Err(EngineError::NoActiveGesture);
        }
        let InputState::RetargetingEdge { edge_id, end, .. } = std::mem::take(&mut self.input) else {
            return Err(EngineError::NoActiveGesture);
        };
        self.emit(Action::HidePreview);
        if let Some(hit) = hit_anchor(&self.doc, drop) {
            let side = match end {
                EdgeEnd::Source => AnchorSide::Output,
                EdgeEnd::Target => AnchorSide::Input,
            };
            let at = self.coordinate_property(&hit.vertex_id, hit.prop.as_deref(), side)?;
            let vertex_id = hit.vertex_id.clone();
            let endpoint = Endpoint::new(hit.vertex_id, hit.prop, at);
            let update = match end {
                EdgeEnd::Source => EndpointUpdate { source: Some(endpoint), target: None },
                EdgeEnd::Target => EndpointUpdate { source: None, target: Some(endpoint) },
            };
            self.update_path_connect(&edge_id, update)?;
            if self.session.view == ViewMode::Reduced {
                self.reveal_connected(&[vertex_id]);
            }
        }
        Ok(self.take_actions())
    }

    /// Abandon the active gesture. A cancelled drag returns the object to
    /// where it started.
    pub fn cancel_gesture(&mut self) -> Vec<Action> {
        match std::mem::take(&mut self.input) {
            InputState::Idle => {}
            InputState::DraggingObject { id, orig, .. } => {
                self.place_object(&id, orig);
                self.reset_size_boundary();
                self.update_height_boundary();
            }
            InputState::CreatingEdge { .. } | InputState::RetargetingEdge { .. } => self.emit(Action::HidePreview),
        }
        self.take_actions()
    }
}
