//! Document model: vertices, edges, boundaries, and the in-memory store.
//!
//! This module defines the records that describe what is on the canvas
//! (`Vertex`, `Edge`, `Boundary`), the ordered membership entries boundaries
//! keep for their children (`Member`), and the runtime store that owns all
//! live records (`DocStore`).
//!
//! Records serialize in the document wire shape. Working state that only the
//! engine needs (cached boundary sizes, hidden rows, reduced-view anchors,
//! stacking order) is marked `#[serde(skip)]` so export never carries it.
//!
//! Ownership is split: a boundary owns the order of its members, each record
//! owns its own position. `parent` on a record and the owning boundary's
//! `member` list must agree; [`DocStore::membership_violations`] audits that.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::consts::{CONNECT_KEY, EDGE_ID_PREFIX};
use crate::error::EngineError;
use crate::geom::{Point, Rect, Size, path_between};

// =============================================================================
// IDS
// =============================================================================

/// Identifier shared by vertices, edges and boundaries.
///
/// Generated ids are a kind prefix followed by a random suffix; imported ids
/// are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id with the given kind prefix.
    #[must_use]
    pub fn generate(prefix: char) -> Self {
        Self(format!("{prefix}{}", Uuid::new_v4().simple()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Kind of a containable object, as tagged in boundary member lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    #[serde(rename = "V")]
    Vertex,
    #[serde(rename = "B")]
    Boundary,
}

// =============================================================================
// VERTEX
// =============================================================================

/// One property row of a vertex: field name to value.
pub type PropertyRow = serde_json::Map<String, serde_json::Value>;

/// Fixed vertex dimensions used to derive vertex boxes and anchors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexMetrics {
    pub width: f64,
    pub header_height: f64,
    pub row_height: f64,
}

impl Default for VertexMetrics {
    fn default() -> Self {
        Self { width: 160.0, header_height: 20.0, row_height: 18.0 }
    }
}

/// A typed node with an ordered list of property rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vertex {
    pub id: ObjectId,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub vertex_type: String,
    #[serde(default)]
    pub group_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Row order defines the row index and therefore the anchor offset.
    #[serde(default)]
    pub data: Vec<PropertyRow>,
    #[serde(default)]
    pub parent: Option<ObjectId>,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default = "default_repeat", deserialize_with = "deserialize_repeat")]
    pub repeat: u32,
    /// Rows currently hidden by the reduced view.
    #[serde(skip)]
    pub hidden_rows: BTreeSet<usize>,
    /// Set while the reduced view replaces the per-row anchors.
    #[serde(skip)]
    pub anchors_reduced: bool,
    /// Rows that received an anchor for the reduced view, in insertion order.
    #[serde(skip)]
    pub reduced_anchors: Vec<usize>,
}

fn default_repeat() -> u32 {
    1
}

/// Accepts `repeat` as a number or a numeric string; form edits store strings.
fn deserialize_repeat<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Null => Some(1),
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => match s.trim().parse::<u64>() {
            Ok(n) => Some(n),
            Err(_) => None,
        },
        _ => None,
    };
    match parsed.map(u32::try_from) {
        Some(Ok(n)) => Ok(n.max(1)),
        _ => Err(serde::de::Error::custom(format!("invalid repeat value: {value}"))),
    }
}

impl Vertex {
    /// Connection key of a property row, as stored in edge endpoints.
    #[must_use]
    pub fn row_key(&self, row: usize) -> String {
        format!("{}{CONNECT_KEY}{row}", self.id)
    }

    /// Resolve a connection key back to its raw row index.
    #[must_use]
    pub fn row_of(&self, prop: &str) -> Option<usize> {
        let index = prop.strip_prefix(self.id.as_str())?.strip_prefix(CONNECT_KEY)?;
        match index.parse::<usize>() {
            Ok(row) if row < self.data.len() => Some(row),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_row_visible(&self, row: usize) -> bool {
        !self.hidden_rows.contains(&row)
    }

    /// Raw indices of the visible rows, in data order.
    pub fn visible_rows(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.data.len()).filter(|row| self.is_row_visible(*row))
    }

    #[must_use]
    pub fn visible_row_count(&self) -> usize {
        self.visible_rows().count()
    }

    /// Position of `prop` among the visible rows.
    ///
    /// A key that is hidden or unknown resolves to the slot just past the last
    /// visible row.
    #[must_use]
    pub fn visible_index_of(&self, prop: &str) -> usize {
        let target = self.row_of(prop);
        self.visible_rows()
            .position(|row| Some(row) == target)
            .unwrap_or_else(|| self.visible_row_count())
    }

    /// Header plus one row height per visible row.
    #[must_use]
    pub fn size(&self, metrics: &VertexMetrics) -> Size {
        #[allow(clippy::cast_precision_loss)]
        let rows = self.visible_row_count() as f64;
        Size::new(metrics.width, metrics.header_height + metrics.row_height * rows)
    }

    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// One end of an edge. `x`/`y` are cached from the anchor of `(vertex_id, prop)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub vertex_id: ObjectId,
    /// Row connection key, or `None` for the whole-vertex anchor.
    #[serde(default)]
    pub prop: Option<String>,
}

impl Endpoint {
    #[must_use]
    pub fn new(vertex_id: ObjectId, prop: Option<String>, at: Point) -> Self {
        Self { x: at.x, y: at.y, vertex_id, prop }
    }

    #[must_use]
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    #[default]
    Solid,
    Dash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArrowFlag {
    #[default]
    #[serde(rename = "Y")]
    Yes,
    #[serde(rename = "N")]
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub line: LineType,
    pub arrow: ArrowFlag,
}

/// Labels drawn at the start, middle and end of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeNote {
    #[serde(default)]
    pub origin_note: String,
    #[serde(default)]
    pub middle_note: String,
    #[serde(default)]
    pub dest_note: String,
}

/// A directed connector between two anchors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: ObjectId,
    pub source: Endpoint,
    pub target: Endpoint,
    #[serde(default)]
    pub style: EdgeStyle,
    #[serde(default)]
    pub note: EdgeNote,
}

impl Edge {
    #[must_use]
    pub fn touches(&self, vertex_id: &ObjectId) -> bool {
        self.source.vertex_id == *vertex_id || self.target.vertex_id == *vertex_id
    }

    /// Path geometry handed to the renderer.
    #[must_use]
    pub fn path(&self) -> String {
        path_between(self.source.point(), self.target.point())
    }
}

/// Parameters for creating an edge. Missing style, note and id get defaults.
#[derive(Debug, Clone)]
pub struct NewEdge {
    pub source: Endpoint,
    pub target: Endpoint,
    pub style: Option<EdgeStyle>,
    pub note: Option<EdgeNote>,
    pub id: Option<ObjectId>,
}

impl NewEdge {
    #[must_use]
    pub fn new(source: Endpoint, target: Endpoint) -> Self {
        Self { source, target, style: None, note: None, id: None }
    }

    #[must_use]
    pub fn into_edge(self) -> Edge {
        Edge {
            id: self.id.unwrap_or_else(|| ObjectId::generate(EDGE_ID_PREFIX)),
            source: self.source,
            target: self.target,
            style: self.style.unwrap_or_default(),
            note: self.note.unwrap_or_default(),
        }
    }
}

// =============================================================================
// BOUNDARY
// =============================================================================

/// Entry in a boundary's ordered member list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub kind: MemberKind,
    #[serde(default = "default_show")]
    pub show: bool,
}

fn default_show() -> bool {
    true
}

impl Member {
    #[must_use]
    pub fn new(id: ObjectId, kind: MemberKind) -> Self {
        Self { id, kind, show: true }
    }
}

/// A grouping container. `member` order is the vertical stacking order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub id: ObjectId,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent: Option<ObjectId>,
    #[serde(default)]
    pub member: Vec<Member>,
    #[serde(skip)]
    pub width: f64,
    #[serde(skip)]
    pub height: f64,
    /// Stacking order; higher values are drawn above lower ones.
    #[serde(skip)]
    pub z_index: i64,
}

impl Boundary {
    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.origin(), self.size())
    }

    #[must_use]
    pub fn member_index(&self, id: &ObjectId) -> Option<usize> {
        self.member.iter().position(|m| m.id == *id)
    }
}

// =============================================================================
// BOX SOURCE
// =============================================================================

/// Size and membership lookups the containment logic depends on.
pub trait BoxSource {
    /// Rendered size of a vertex or boundary.
    fn bounding_box(&self, id: &ObjectId) -> Option<Size>;

    /// Ordered member list of a boundary.
    fn members(&self, id: &ObjectId) -> Option<&[Member]>;
}

// =============================================================================
// STORE
// =============================================================================

/// In-memory store of diagram records, kept in creation order.
#[derive(Debug, Clone, Default)]
pub struct DocStore {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    boundaries: Vec<Boundary>,
    metrics: VertexMetrics,
    next_z: i64,
}

impl DocStore {
    /// Create an empty store that sizes vertices with `metrics`.
    #[must_use]
    pub fn new(metrics: VertexMetrics) -> Self {
        Self { metrics, ..Self::default() }
    }

    #[must_use]
    pub fn metrics(&self) -> VertexMetrics {
        self.metrics
    }

    /// Whether any record of any kind uses `id`.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.vertex(id).is_some() || self.edge(id).is_some() || self.boundary(id).is_some()
    }

    /// Drop every record. Metrics are kept; stacking order restarts.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        self.boundaries.clear();
        self.next_z = 0;
    }

    // --- Insertion ---

    /// # Errors
    ///
    /// Returns `DuplicateId` if the id is already in use.
    pub fn insert_vertex(&mut self, vertex: Vertex) -> Result<(), EngineError> {
        if self.contains(&vertex.id) {
            return Err(EngineError::DuplicateId(vertex.id));
        }
        self.vertices.push(vertex);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DuplicateId` if the id is already in use.
    pub fn insert_edge(&mut self, edge: Edge) -> Result<(), EngineError> {
        if self.contains(&edge.id) {
            return Err(EngineError::DuplicateId(edge.id));
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Insert a boundary on top of every existing one.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateId` if the id is already in use.
    pub fn insert_boundary(&mut self, mut boundary: Boundary) -> Result<(), EngineError> {
        if self.contains(&boundary.id) {
            return Err(EngineError::DuplicateId(boundary.id));
        }
        boundary.z_index = self.next_z;
        self.next_z += 1;
        self.boundaries.push(boundary);
        Ok(())
    }

    // --- Lookup ---

    #[must_use]
    pub fn vertex(&self, id: &ObjectId) -> Option<&Vertex> {
        self.vertices.iter().find(|v| v.id == *id)
    }

    pub fn vertex_mut(&mut self, id: &ObjectId) -> Option<&mut Vertex> {
        self.vertices.iter_mut().find(|v| v.id == *id)
    }

    #[must_use]
    pub fn edge(&self, id: &ObjectId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == *id)
    }

    pub fn edge_mut(&mut self, id: &ObjectId) -> Option<&mut Edge> {
        self.edges.iter_mut().find(|e| e.id == *id)
    }

    #[must_use]
    pub fn boundary(&self, id: &ObjectId) -> Option<&Boundary> {
        self.boundaries.iter().find(|b| b.id == *id)
    }

    pub fn boundary_mut(&mut self, id: &ObjectId) -> Option<&mut Boundary> {
        self.boundaries.iter_mut().find(|b| b.id == *id)
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    /// Boundaries ordered topmost first.
    #[must_use]
    pub fn boundaries_top_down(&self) -> Vec<&Boundary> {
        let mut ordered: Vec<&Boundary> = self.boundaries.iter().collect();
        ordered.sort_by(|a, b| b.z_index.cmp(&a.z_index).then_with(|| a.id.cmp(&b.id)));
        ordered
    }

    /// Ids of every edge with an endpoint on `vertex_id`.
    #[must_use]
    pub fn edges_touching(&self, vertex_id: &ObjectId) -> Vec<ObjectId> {
        self.edges
            .iter()
            .filter(|e| e.touches(vertex_id))
            .map(|e| e.id.clone())
            .collect()
    }

    #[must_use]
    pub fn kind_of(&self, id: &ObjectId) -> Option<MemberKind> {
        if self.vertex(id).is_some() {
            Some(MemberKind::Vertex)
        } else if self.boundary(id).is_some() {
            Some(MemberKind::Boundary)
        } else {
            None
        }
    }

    /// Parent boundary of a vertex or boundary; `None` for top-level or unknown ids.
    #[must_use]
    pub fn parent_of(&self, id: &ObjectId) -> Option<&ObjectId> {
        match self.kind_of(id)? {
            MemberKind::Vertex => self.vertex(id)?.parent.as_ref(),
            MemberKind::Boundary => self.boundary(id)?.parent.as_ref(),
        }
    }

    pub(crate) fn set_parent(&mut self, id: &ObjectId, parent: Option<ObjectId>) {
        if let Some(v) = self.vertex_mut(id) {
            v.parent = parent;
        } else if let Some(b) = self.boundary_mut(id) {
            b.parent = parent;
        }
    }

    #[must_use]
    pub fn origin_of(&self, id: &ObjectId) -> Option<Point> {
        match self.kind_of(id)? {
            MemberKind::Vertex => self.vertex(id).map(Vertex::origin),
            MemberKind::Boundary => self.boundary(id).map(Boundary::origin),
        }
    }

    pub(crate) fn set_origin(&mut self, id: &ObjectId, at: Point) {
        if let Some(v) = self.vertex_mut(id) {
            v.x = at.x;
            v.y = at.y;
        } else if let Some(b) = self.boundary_mut(id) {
            b.x = at.x;
            b.y = at.y;
        }
    }

    /// Box of a vertex or boundary from its committed origin and current size.
    #[must_use]
    pub fn rect_of(&self, id: &ObjectId) -> Option<Rect> {
        Some(Rect::new(self.origin_of(id)?, self.bounding_box(id)?))
    }

    /// Number of boundaries above `id` in the containment forest.
    #[must_use]
    pub fn depth_of(&self, id: &ObjectId) -> usize {
        self.ancestors(id).len()
    }

    /// Whether `ancestor` encloses `id`, directly or transitively.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: &ObjectId, id: &ObjectId) -> bool {
        self.ancestors(id).iter().any(|a| a == ancestor)
    }

    /// Parent chain of `id`, nearest first. Stops early on a malformed loop.
    #[must_use]
    pub fn ancestors(&self, id: &ObjectId) -> Vec<ObjectId> {
        let mut chain = Vec::new();
        let mut current = self.parent_of(id).cloned();
        while let Some(parent) = current {
            if chain.contains(&parent) || chain.len() > self.boundaries.len() {
                break;
            }
            current = self.parent_of(&parent).cloned();
            chain.push(parent);
        }
        chain
    }

    /// Whether `id` is shown, i.e. no enclosing member entry hides it.
    #[must_use]
    pub fn is_shown(&self, id: &ObjectId) -> bool {
        let mut child = id.clone();
        for parent in self.ancestors(id) {
            let shown = self
                .boundary(&parent)
                .and_then(|b| b.member.iter().find(|m| m.id == child))
                .map_or(true, |m| m.show);
            if !shown {
                return false;
            }
            child = parent;
        }
        true
    }

    /// Every object nested under `boundary_id`, parents before children.
    #[must_use]
    pub fn descendants(&self, boundary_id: &ObjectId) -> Vec<(ObjectId, MemberKind)> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect_descendants(boundary_id, &mut out, &mut seen);
        out
    }

    fn collect_descendants(
        &self,
        boundary_id: &ObjectId,
        out: &mut Vec<(ObjectId, MemberKind)>,
        seen: &mut HashSet<ObjectId>,
    ) {
        let Some(boundary) = self.boundary(boundary_id) else {
            return;
        };
        for member in &boundary.member {
            if !seen.insert(member.id.clone()) {
                continue;
            }
            out.push((member.id.clone(), member.kind));
            if member.kind == MemberKind::Boundary {
                self.collect_descendants(&member.id, out, seen);
            }
        }
    }

    // --- Removal ---

    pub fn remove_vertex(&mut self, id: &ObjectId) -> Option<Vertex> {
        let index = self.vertices.iter().position(|v| v.id == *id)?;
        Some(self.vertices.remove(index))
    }

    pub fn remove_edge(&mut self, id: &ObjectId) -> Option<Edge> {
        let index = self.edges.iter().position(|e| e.id == *id)?;
        Some(self.edges.remove(index))
    }

    pub fn remove_boundary(&mut self, id: &ObjectId) -> Option<Boundary> {
        let index = self.boundaries.iter().position(|b| b.id == *id)?;
        Some(self.boundaries.remove(index))
    }

    // --- Audit ---

    /// Disagreements between `parent` pointers and member lists.
    ///
    /// Empty when the containment forest is consistent.
    #[must_use]
    pub fn membership_violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        for boundary in &self.boundaries {
            let mut seen = HashSet::new();
            for member in &boundary.member {
                if !seen.insert(&member.id) {
                    out.push(format!("{} lists {} twice", boundary.id, member.id));
                }
                match self.parent_of(&member.id) {
                    Some(parent) if *parent == boundary.id => {}
                    _ if self.kind_of(&member.id).is_none() => {
                        out.push(format!("{} lists unknown member {}", boundary.id, member.id));
                    }
                    _ => out.push(format!("{} lists {} but its parent disagrees", boundary.id, member.id)),
                }
            }
        }
        let parented = self
            .vertices
            .iter()
            .filter_map(|v| v.parent.as_ref().map(|p| (&v.id, p)))
            .chain(self.boundaries.iter().filter_map(|b| b.parent.as_ref().map(|p| (&b.id, p))));
        for (id, parent) in parented {
            let listed = self
                .boundary(parent)
                .is_some_and(|b| b.member_index(id).is_some());
            if !listed {
                out.push(format!("{id} names parent {parent} which does not list it"));
            }
            if self.is_ancestor(id, id) {
                out.push(format!("{id} is its own ancestor"));
            }
        }
        out
    }

    /// Total number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len() + self.edges.len() + self.boundaries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BoxSource for DocStore {
    fn bounding_box(&self, id: &ObjectId) -> Option<Size> {
        match self.kind_of(id)? {
            MemberKind::Vertex => self.vertex(id).map(|v| v.size(&self.metrics)),
            MemberKind::Boundary => self.boundary(id).map(Boundary::size),
        }
    }

    fn members(&self, id: &ObjectId) -> Option<&[Member]> {
        self.boundary(id).map(|b| b.member.as_slice())
    }
}
