use tracing::{debug, info};

use crate::config::EditorConfig;
use crate::connect::Anchor;
use crate::consts::{CANVAS_GROW_MARGIN, VERTEX_ID_PREFIX};
use crate::doc::{BoxSource, DocStore, MemberKind, ObjectId, PropertyRow, Vertex};
use crate::error::EngineError;
use crate::geom::{Point, Size};
use crate::input::InputState;
use crate::schema::{FieldFormat, TypeDefinition, TypeRegistry};
use crate::visibility::ViewMode;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Kind of object named in a host action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Vertex,
    Boundary,
    Edge,
}

impl From<MemberKind> for ObjectKind {
    fn from(kind: MemberKind) -> Self {
        match kind {
            MemberKind::Vertex => Self::Vertex,
            MemberKind::Boundary => Self::Boundary,
        }
    }
}

/// Geometry and state updates for the host to render.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ObjectCreated { id: ObjectId, kind: ObjectKind },
    ObjectRemoved { id: ObjectId, kind: ObjectKind },
    MoveObject { id: ObjectId, x: f64, y: f64 },
    ResizeObject { id: ObjectId, width: f64, height: f64 },
    SetPath { edge_id: ObjectId, d: String },
    /// Rubber-band path drawn while an edge gesture is active.
    PreviewPath { d: String },
    HidePreview,
    SetRowVisible { vertex_id: ObjectId, row: usize, visible: bool },
    SetObjectVisible { id: ObjectId, visible: bool },
    SetAnchors { vertex_id: ObjectId, anchors: Vec<Anchor> },
    SetCanvasMinSize { width: f64, height: f64 },
    /// Name, description or row labels of an object changed.
    LabelsChanged { id: ObjectId },
    Cleared,
    /// Non-fatal message for the user.
    Warning(String),
}

/// Per-document editing context: loaded types and the display policy.
///
/// Reset by `clear_all`, except for a type definition loaded on its own.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Types used for menus, form layout and the reduced-view exemption.
    pub types: Option<TypeRegistry>,
    /// Type snapshot embedded in the currently loaded graph.
    pub embedded: Option<TypeDefinition>,
    /// Whether `types` came from a standalone definition file.
    pub definition_imported: bool,
    pub view: ViewMode,
}

impl Session {
    #[must_use]
    pub fn new(view: ViewMode) -> Self {
        Self { view, ..Self::default() }
    }

    /// Whether a vertex type is exempt from the reduced view.
    #[must_use]
    pub fn shows_full(&self, vertex_type: &str) -> bool {
        self.types.as_ref().is_some_and(|t| t.shows_full(vertex_type))
    }
}

/// Parameters for creating a vertex.
#[derive(Debug, Clone, Default)]
pub struct NewVertex {
    pub vertex_type: String,
    pub at: Point,
    pub id: Option<ObjectId>,
    /// Defaults to the vertex type.
    pub name: Option<String>,
    pub description: Option<String>,
    pub group_type: String,
    pub data: Vec<PropertyRow>,
    pub mandatory: bool,
    /// Zero is treated as one.
    pub repeat: u32,
}

impl NewVertex {
    #[must_use]
    pub fn new(vertex_type: impl Into<String>, at: Point) -> Self {
        Self { vertex_type: vertex_type.into(), at, ..Self::default() }
    }
}

/// Edits from the vertex form. `data` must keep the vertex's row count.
#[derive(Debug, Clone, Default)]
pub struct VertexInfoUpdate {
    pub name: String,
    pub description: String,
    pub repeat: u32,
    pub mandatory: bool,
    pub data: Option<Vec<PropertyRow>>,
}

/// Core engine state: the document, the editing session, and the gesture in
/// progress. Mutations queue `Action`s for the host; drain them with
/// [`EngineCore::take_actions`].
pub struct EngineCore {
    pub doc: DocStore,
    pub session: Session,
    pub config: EditorConfig,
    pub input: InputState,
    canvas: Size,
    actions: Vec<Action>,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        let canvas = Size::new(
            config.canvas_min_width + config.canvas_padding,
            config.canvas_min_height + config.canvas_padding,
        );
        Self {
            doc: DocStore::new(config.metrics()),
            session: Session::new(config.initial_view),
            input: InputState::default(),
            canvas,
            actions: Vec::new(),
            config,
        }
    }

    /// Drain the queued host actions.
    pub fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }

    pub(crate) fn emit(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Current minimum canvas size.
    #[must_use]
    pub fn canvas_size(&self) -> Size {
        self.canvas
    }

    pub(crate) fn ensure_idle(&self) -> Result<(), EngineError> {
        if self.input.is_idle() {
            Ok(())
        } else {
            Err(EngineError::ModeBusy { active: self.input.mode() })
        }
    }

    // --- Vertices ---

    /// Create a vertex and return its id.
    ///
    /// # Errors
    ///
    /// `MissingVertexType` for an empty type, `DuplicateId` for a taken id.
    pub fn create_vertex(&mut self, new: NewVertex) -> Result<ObjectId, EngineError> {
        if new.vertex_type.is_empty() {
            return Err(EngineError::MissingVertexType);
        }
        let id = new.id.unwrap_or_else(|| ObjectId::generate(VERTEX_ID_PREFIX));
        let name = match new.name {
            Some(name) if !name.is_empty() => name,
            _ => new.vertex_type.clone(),
        };
        let description = match new.description {
            Some(description) if !description.is_empty() => description,
            _ => "Description".to_string(),
        };
        let vertex = Vertex {
            id: id.clone(),
            x: new.at.x,
            y: new.at.y,
            vertex_type: new.vertex_type,
            group_type: new.group_type,
            name,
            description,
            data: new.data,
            parent: None,
            mandatory: new.mandatory,
            repeat: self.config.clamp_repeat(new.repeat),
            hidden_rows: Default::default(),
            anchors_reduced: false,
            reduced_anchors: Vec::new(),
        };
        self.doc.insert_vertex(vertex)?;
        debug!(%id, "vertex created");

        self.emit(Action::ObjectCreated { id: id.clone(), kind: ObjectKind::Vertex });
        self.emit(Action::MoveObject { id: id.clone(), x: new.at.x, y: new.at.y });
        if self.session.view == ViewMode::Reduced {
            self.reduce_vertex(&id);
        }
        self.emit_vertex_shape(&id);
        self.refresh_canvas_size();
        Ok(id)
    }

    /// Create a vertex from the loaded type definition, copying its rows,
    /// description and group.
    ///
    /// # Errors
    ///
    /// `UnknownVertexType` when no loaded definition has `vertex_type`.
    pub fn create_vertex_from_type(&mut self, vertex_type: &str, at: Point) -> Result<ObjectId, EngineError> {
        let template = self
            .session
            .types
            .as_ref()
            .and_then(|types| types.find(vertex_type))
            .ok_or_else(|| EngineError::UnknownVertexType(vertex_type.to_string()))?;
        let new = NewVertex {
            vertex_type: vertex_type.to_string(),
            at,
            description: Some(template.description.clone()),
            group_type: template.group_type.clone(),
            data: template.data.clone(),
            ..NewVertex::default()
        };
        self.create_vertex(new)
    }

    /// Duplicate a vertex next to the original. The copy has no parent and no edges.
    ///
    /// # Errors
    ///
    /// `VertexNotFound` if `id` is unknown.
    pub fn copy_vertex(&mut self, id: &ObjectId) -> Result<ObjectId, EngineError> {
        let source = self.doc.vertex(id).ok_or_else(|| EngineError::VertexNotFound(id.clone()))?;
        let offset = self.config.copy_offset;
        let new = NewVertex {
            vertex_type: source.vertex_type.clone(),
            at: Point::new(source.x + offset, source.y + offset),
            id: None,
            name: Some(source.name.clone()),
            description: Some(source.description.clone()),
            group_type: source.group_type.clone(),
            data: source.data.clone(),
            mandatory: source.mandatory,
            repeat: source.repeat,
        };
        self.create_vertex(new)
    }

    /// Remove a vertex, its membership entry and every incident edge, then
    /// refit the boundaries that held it.
    ///
    /// # Errors
    ///
    /// `VertexNotFound` if `id` is unknown.
    pub fn remove_vertex(&mut self, id: &ObjectId) -> Result<(), EngineError> {
        let parent = self
            .doc
            .vertex(id)
            .ok_or_else(|| EngineError::VertexNotFound(id.clone()))?
            .parent
            .clone();
        if let Some(parent) = &parent {
            self.remove_member_from_boundary(parent, id)?;
        }
        self.delete_vertex(id)?;
        if let Some(parent) = parent {
            self.resize_parent_boundary(&parent)?;
            self.relayout_from(&parent);
        }
        Ok(())
    }

    /// Remove a vertex and its edges without touching membership lists.
    ///
    /// Used while a boundary tears down its own members.
    ///
    /// # Errors
    ///
    /// `VertexNotFound` if `id` is unknown.
    pub fn delete_vertex(&mut self, id: &ObjectId) -> Result<(), EngineError> {
        if self.doc.vertex(id).is_none() {
            return Err(EngineError::VertexNotFound(id.clone()));
        }
        for edge_id in self.doc.edges_touching(id) {
            self.remove_edge(&edge_id)?;
        }
        self.doc.remove_vertex(id);
        debug!(%id, "vertex removed");
        self.emit(Action::ObjectRemoved { id: id.clone(), kind: ObjectKind::Vertex });
        self.refresh_canvas_size();
        Ok(())
    }

    /// Apply the vertex form. Boolean fields are coerced by truthiness.
    ///
    /// # Errors
    ///
    /// `VertexNotFound` if `id` is unknown, `RowCountMismatch` when `data`
    /// adds or drops rows.
    pub fn update_vertex_info(&mut self, id: &ObjectId, update: VertexInfoUpdate) -> Result<(), EngineError> {
        let vertex = self.doc.vertex(id).ok_or_else(|| EngineError::VertexNotFound(id.clone()))?;
        if let Some(data) = &update.data {
            if data.len() != vertex.data.len() {
                return Err(EngineError::RowCountMismatch {
                    vertex: id.clone(),
                    expected: vertex.data.len(),
                    found: data.len(),
                });
            }
        }
        let group_type = vertex.group_type.clone();
        let data = update.data.map(|rows| self.coerce_rows(&group_type, rows));
        let repeat = self.config.clamp_repeat(update.repeat);

        if let Some(vertex) = self.doc.vertex_mut(id) {
            vertex.name = update.name;
            vertex.description = update.description;
            vertex.repeat = repeat;
            vertex.mandatory = update.mandatory;
            if let Some(data) = data {
                vertex.data = data;
            }
        }
        self.emit(Action::LabelsChanged { id: id.clone() });
        Ok(())
    }

    fn coerce_rows(&self, group_type: &str, rows: Vec<PropertyRow>) -> Vec<PropertyRow> {
        let Some(types) = &self.session.types else {
            return rows;
        };
        rows.into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(field, value)| {
                        if types.field_format(group_type, &field) == Some(FieldFormat::Boolean) {
                            let truthy = is_truthy(&value);
                            (field, serde_json::Value::Bool(truthy))
                        } else {
                            (field, value)
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Move a vertex and re-route its edges. Membership is not re-evaluated.
    ///
    /// # Errors
    ///
    /// `VertexNotFound` if `id` is unknown.
    pub fn set_vertex_position(&mut self, id: &ObjectId, at: Point) -> Result<(), EngineError> {
        if self.doc.vertex(id).is_none() {
            return Err(EngineError::VertexNotFound(id.clone()));
        }
        self.place_object(id, at);
        Ok(())
    }

    /// Commit an origin and emit the move; vertices re-route their edges and
    /// boundaries restack their members.
    pub(crate) fn place_object(&mut self, id: &ObjectId, at: Point) {
        self.doc.set_origin(id, at);
        self.emit(Action::MoveObject { id: id.clone(), x: at.x, y: at.y });
        match self.doc.kind_of(id) {
            Some(MemberKind::Vertex) => self.reroute_vertex(id),
            Some(MemberKind::Boundary) => self.layout_members(id),
            None => {}
        }
    }

    /// Emit the current size and anchors of a vertex.
    pub(crate) fn emit_vertex_shape(&mut self, id: &ObjectId) {
        let Some(size) = self.doc.bounding_box(id) else {
            return;
        };
        let anchors = self.active_anchors(id);
        self.emit(Action::ResizeObject { id: id.clone(), width: size.width, height: size.height });
        self.emit(Action::SetAnchors { vertex_id: id.clone(), anchors });
    }

    // --- Drag gestures ---

    /// Begin dragging a vertex or boundary.
    ///
    /// Top-level objects grow other top-level boundaries they would eclipse.
    ///
    /// # Errors
    ///
    /// `ModeBusy` while another gesture is active, `ObjectNotFound` for an
    /// unknown id.
    pub fn on_drag_start(&mut self, id: &ObjectId) -> Result<Vec<Action>, EngineError> {
        self.ensure_idle()?;
        let kind = self.doc.kind_of(id).ok_or_else(|| EngineError::ObjectNotFound(id.clone()))?;
        let orig = self.doc.origin_of(id).unwrap_or_default();
        if self.doc.parent_of(id).is_none() {
            self.resize_boundary_as_object_dragged(id)?;
        }
        self.input = InputState::DraggingObject { id: id.clone(), kind, orig };
        Ok(self.take_actions())
    }

    /// Move the dragged object to `at`, clamped to the minimum offset.
    ///
    /// # Errors
    ///
    /// `NoActiveGesture` unless a drag is in progress.
    pub fn on_drag(&mut self, at: Point) -> Result<Vec<Action>, EngineError> {
        let InputState::DraggingObject { id, .. } = &self.input else {
            return Err(EngineError::NoActiveGesture);
        };
        let id = id.clone();
        self.drag_to(&id, at);
        Ok(self.take_actions())
    }

    /// Drop the dragged object at `at` and settle containment.
    ///
    /// A child that left its parent may enter another top-level boundary; a
    /// child still inside is re-ordered by position. Boundaries are then
    /// refitted and restacked and the canvas size recomputed.
    ///
    /// # Errors
    ///
    /// `NoActiveGesture` unless a drag is in progress.
    pub fn on_drag_end(&mut self, at: Point) -> Result<Vec<Action>, EngineError> {
        let InputState::DraggingObject { id, .. } = &self.input else {
            return Err(EngineError::NoActiveGesture);
        };
        let id = id.clone();
        self.drag_to(&id, at);
        self.input = InputState::Idle;

        if self.doc.parent_of(&id).is_some() {
            if self.check_drag_object_outside_boundary(&id)? {
                self.check_drag_object_inside_boundary(&id)?;
            } else {
                self.change_index_in_boundary_for_object(&id)?;
            }
        } else {
            self.check_drag_object_inside_boundary(&id)?;
        }
        self.reset_size_boundary();
        self.update_height_boundary();
        Ok(self.take_actions())
    }

    fn drag_to(&mut self, id: &ObjectId, at: Point) {
        let min = self.config.min_offset;
        let clamped = Point::new(at.x.max(min), at.y.max(min));
        self.place_object(id, clamped);
        self.grow_canvas_for(id);
    }

    // --- Canvas ---

    /// Recompute the minimum canvas size from every top-level object.
    pub fn refresh_canvas_size(&mut self) {
        let floor = self.config.canvas_floor();
        let (mut width, mut height) = (floor.width, floor.height);
        let top_level = self
            .doc
            .vertices()
            .iter()
            .filter(|v| v.parent.is_none())
            .map(|v| v.id.clone())
            .chain(self.doc.boundaries().iter().filter(|b| b.parent.is_none()).map(|b| b.id.clone()));
        for id in top_level {
            if let Some(rect) = self.doc.rect_of(&id) {
                width = width.max(rect.right());
                height = height.max(rect.bottom());
            }
        }
        let padding = self.config.canvas_padding;
        self.canvas = Size::new(width + padding, height + padding);
        self.emit(Action::SetCanvasMinSize { width: self.canvas.width, height: self.canvas.height });
    }

    /// Grow the canvas when `id` crosses its right or bottom edge.
    pub(crate) fn grow_canvas_for(&mut self, id: &ObjectId) {
        let Some(rect) = self.doc.rect_of(id) else {
            return;
        };
        let mut grown = false;
        if rect.right() > self.canvas.width {
            self.canvas.width = rect.right() + CANVAS_GROW_MARGIN;
            grown = true;
        }
        if rect.bottom() > self.canvas.height {
            self.canvas.height = rect.bottom() + CANVAS_GROW_MARGIN;
            grown = true;
        }
        if grown {
            self.emit(Action::SetCanvasMinSize { width: self.canvas.width, height: self.canvas.height });
        }
    }

    // --- Reset ---

    /// Drop every object, return to the full view and idle mode.
    ///
    /// A type definition loaded from its own file survives; the graph's
    /// embedded snapshot does not.
    pub fn clear_all(&mut self) {
        self.doc.clear();
        self.input = InputState::Idle;
        self.session.view = ViewMode::Full;
        self.session.embedded = None;
        info!("document cleared");
        self.emit(Action::Cleared);
        self.refresh_canvas_size();
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}
