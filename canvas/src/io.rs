//! Graph documents: parsing, validation, the import pipeline, and export.
//!
//! A graph document carries vertex, edge and boundary records, a separate
//! `position` list joined to records by id, and the vertex types the graph was
//! drawn with. Import runs parse, validate, schema check, clear, populate,
//! settle geometry, in that order; anything that fails before the clear leaves
//! the current document untouched.

#[cfg(test)]
#[path = "io_test.rs"]
mod io_test;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::consts::BOUNDARY_HEADER_HEIGHT;
use crate::doc::{Boundary, Edge, MemberKind, ObjectId, Vertex};
use crate::engine::{Action, EngineCore, ObjectKind};
use crate::error::ImportError;
use crate::geom::Point;
use crate::schema::{SchemaMismatch, TypeDefinition, TypeRegistry, check_graph_structure, check_vertex_types};
use crate::visibility::ViewMode;

/// Shown once when a graph does not match its own embedded types.
pub const CORRUPTED_MESSAGE: &str = "Format or data in Data Graph Structure is corrupted. You should check it!";

/// Shown once when the loaded type definition disagrees with a graph's types.
pub const MISMATCH_MESSAGE: &str =
    "Vertex type in Vertex Type Definition and Data Graph Structure are mismatch. Please check again!";

/// Top-level keys that mark a graph document.
const GRAPH_KEYS: [&str; 5] = ["vertex", "edge", "boundary", "position", "vertexTypes"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: ObjectId,
    pub x: f64,
    pub y: f64,
}

/// The persisted graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDocument {
    #[serde(default)]
    pub vertex: Vec<Vertex>,
    #[serde(default)]
    pub edge: Vec<Edge>,
    #[serde(default)]
    pub boundary: Vec<Boundary>,
    #[serde(default)]
    pub position: Vec<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex_types: Option<TypeDefinition>,
}

impl GraphDocument {
    /// Parse and validate a graph document.
    ///
    /// # Errors
    ///
    /// `Json` for malformed input, otherwise the first structural problem
    /// found by [`GraphDocument::validate`].
    pub fn parse(text: &str) -> Result<Self, ImportError> {
        let document: Self = serde_json::from_str(text)?;
        document.validate()?;
        Ok(document)
    }

    /// Reject documents that cannot be loaded into a consistent store.
    ///
    /// # Errors
    ///
    /// `DuplicateId`, `MissingPosition`, `DanglingEdge`, `UnknownMember`,
    /// `SharedMember` or `ContainmentCycle`.
    pub fn validate(&self) -> Result<(), ImportError> {
        let mut ids = HashSet::new();
        let record_ids = self
            .vertex
            .iter()
            .map(|v| &v.id)
            .chain(self.boundary.iter().map(|b| &b.id))
            .chain(self.edge.iter().map(|e| &e.id));
        for id in record_ids {
            if !ids.insert(id) {
                return Err(ImportError::DuplicateId(id.clone()));
            }
        }

        let placed: HashSet<&ObjectId> = self.position.iter().map(|p| &p.id).collect();
        let placeable = self.vertex.iter().map(|v| &v.id).chain(self.boundary.iter().map(|b| &b.id));
        for id in placeable {
            if !placed.contains(id) {
                return Err(ImportError::MissingPosition(id.clone()));
            }
        }

        let vertex_ids: HashSet<&ObjectId> = self.vertex.iter().map(|v| &v.id).collect();
        for edge in &self.edge {
            for end in [&edge.source, &edge.target] {
                if !vertex_ids.contains(&end.vertex_id) {
                    return Err(ImportError::DanglingEdge { edge: edge.id.clone(), vertex: end.vertex_id.clone() });
                }
            }
        }

        let boundary_ids: HashSet<&ObjectId> = self.boundary.iter().map(|b| &b.id).collect();
        let mut owner: HashMap<&ObjectId, &ObjectId> = HashMap::new();
        for boundary in &self.boundary {
            for member in &boundary.member {
                if !vertex_ids.contains(&member.id) && !boundary_ids.contains(&member.id) {
                    return Err(ImportError::UnknownMember { boundary: boundary.id.clone(), member: member.id.clone() });
                }
                if owner.insert(&member.id, &boundary.id).is_some() {
                    return Err(ImportError::SharedMember(member.id.clone()));
                }
            }
        }

        for boundary in &self.boundary {
            let mut current = owner.get(&boundary.id).copied();
            let mut steps = 0;
            while let Some(parent) = current {
                steps += 1;
                if parent == &boundary.id || steps > self.boundary.len() {
                    return Err(ImportError::ContainmentCycle(boundary.id.clone()));
                }
                current = owner.get(parent).copied();
            }
        }
        Ok(())
    }

    fn position_of(&self, id: &ObjectId) -> Option<Point> {
        self.position.iter().find(|p| p.id == *id).map(|p| Point::new(p.x, p.y))
    }
}

/// Parse a standalone type definition file.
///
/// # Errors
///
/// `InvalidTypeDefinition` when the document carries graph keys, `Json` for
/// malformed input.
pub fn parse_type_definition(text: &str) -> Result<TypeDefinition, ImportError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if let Some(object) = value.as_object() {
        if GRAPH_KEYS.iter().any(|key| object.contains_key(*key)) {
            return Err(ImportError::InvalidTypeDefinition);
        }
    }
    Ok(serde_json::from_value(value)?)
}

/// Outcome of a successful import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub vertices: usize,
    pub edges: usize,
    pub boundaries: usize,
    /// The graph disagrees with its own embedded types.
    pub corrupted: Option<SchemaMismatch>,
    /// The loaded type definition disagrees with the graph's types.
    pub mismatch: Option<SchemaMismatch>,
}

impl ImportReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.corrupted.is_none() && self.mismatch.is_none()
    }
}

impl EngineCore {
    /// Load a type definition file for menus, forms and the reduced-view
    /// exemption. Returns how it disagrees with the current graph's types.
    ///
    /// # Errors
    ///
    /// See [`parse_type_definition`]. Nothing changes on error.
    pub fn load_type_definition(&mut self, text: &str) -> Result<Option<SchemaMismatch>, ImportError> {
        let definition = parse_type_definition(text)?;
        let mismatch = self.session.embedded.as_ref().and_then(|embedded| check_vertex_types(&definition, embedded));
        info!(types = definition.vertex.len(), groups = definition.vertex_group.len(), "type definition loaded");
        self.session.types = Some(TypeRegistry::from_definition(definition));
        self.session.definition_imported = true;
        if let Some(reason) = &mismatch {
            warn!(%reason, "type definition disagrees with graph");
            self.emit(Action::Warning(MISMATCH_MESSAGE.to_string()));
        }
        Ok(mismatch)
    }

    /// Replace the document with a parsed graph.
    ///
    /// Schema disagreements are reported and the import continues. A reduced
    /// view active before the import is applied again afterwards.
    ///
    /// # Errors
    ///
    /// See [`GraphDocument::parse`]. Nothing changes on error.
    pub fn import_graph(&mut self, text: &str) -> Result<ImportReport, ImportError> {
        let document = match GraphDocument::parse(text) {
            Ok(document) => document,
            Err(err) => {
                warn!(error = %err, "graph import aborted");
                return Err(err);
            }
        };

        let corrupted = check_graph_structure(&document.vertex, document.vertex_types.as_ref());
        let mismatch = match (&self.session.types, &document.vertex_types) {
            (Some(types), Some(embedded)) if self.session.definition_imported => {
                check_vertex_types(types.definition(), embedded)
            }
            _ => None,
        };

        let was_reduced = self.session.view == ViewMode::Reduced;
        self.clear_all();
        if !self.session.definition_imported {
            self.session.types = document.vertex_types.clone().map(TypeRegistry::from_definition);
        }
        self.session.embedded.clone_from(&document.vertex_types);

        self.populate(&document);
        let vertex_ids: Vec<ObjectId> = self.doc.vertices().iter().map(|v| v.id.clone()).collect();
        for id in &vertex_ids {
            self.reroute_vertex(id);
        }
        self.reset_size_boundary();
        self.update_height_boundary();
        if was_reduced {
            self.show_reduced();
        }

        let mut messages = Vec::new();
        if let Some(reason) = &corrupted {
            warn!(%reason, "graph does not match its embedded types");
            messages.push(CORRUPTED_MESSAGE);
        }
        if let Some(reason) = &mismatch {
            warn!(%reason, "graph types disagree with loaded definition");
            messages.push(MISMATCH_MESSAGE);
        }
        if !messages.is_empty() {
            self.emit(Action::Warning(messages.join("\n")));
        }
        for violation in self.doc.membership_violations() {
            warn!(%violation, "membership inconsistency after import");
        }

        let report = ImportReport {
            vertices: document.vertex.len(),
            edges: document.edge.len(),
            boundaries: document.boundary.len(),
            corrupted,
            mismatch,
        };
        info!(vertices = report.vertices, edges = report.edges, boundaries = report.boundaries, "graph imported");
        Ok(report)
    }

    fn populate(&mut self, document: &GraphDocument) {
        for record in &document.boundary {
            let at = document.position_of(&record.id).unwrap_or_default();
            let boundary = Boundary {
                x: at.x,
                y: at.y,
                parent: None,
                width: self.config.boundary_min_width,
                height: BOUNDARY_HEADER_HEIGHT,
                ..record.clone()
            };
            let size = boundary.size();
            if self.doc.insert_boundary(boundary).is_err() {
                continue;
            }
            self.emit(Action::ObjectCreated { id: record.id.clone(), kind: ObjectKind::Boundary });
            self.emit(Action::MoveObject { id: record.id.clone(), x: at.x, y: at.y });
            self.emit(Action::ResizeObject { id: record.id.clone(), width: size.width, height: size.height });
        }

        for record in &document.vertex {
            let at = document.position_of(&record.id).unwrap_or_default();
            let vertex = Vertex {
                x: at.x,
                y: at.y,
                parent: None,
                repeat: self.config.clamp_repeat(record.repeat),
                ..record.clone()
            };
            if self.doc.insert_vertex(vertex).is_err() {
                continue;
            }
            self.emit(Action::ObjectCreated { id: record.id.clone(), kind: ObjectKind::Vertex });
            self.emit(Action::MoveObject { id: record.id.clone(), x: at.x, y: at.y });
            self.emit_vertex_shape(&record.id);
        }

        for record in &document.boundary {
            for member in &record.member {
                let Some(kind) = self.doc.kind_of(&member.id) else {
                    continue;
                };
                self.doc.set_parent(&member.id, Some(record.id.clone()));
                let entry = self
                    .doc
                    .boundary_mut(&record.id)
                    .and_then(|b| b.member.iter_mut().find(|m| m.id == member.id));
                if let Some(entry) = entry {
                    entry.kind = kind;
                }
            }
        }

        for record in &document.edge {
            if self.doc.insert_edge(record.clone()).is_err() {
                continue;
            }
            self.emit(Action::ObjectCreated { id: record.id.clone(), kind: ObjectKind::Edge });
        }

        for record in &document.boundary {
            for member in record.member.iter().filter(|m| !m.show) {
                let mut hidden = vec![member.id.clone()];
                if self.doc.kind_of(&member.id) == Some(MemberKind::Boundary) {
                    hidden.extend(self.doc.descendants(&member.id).into_iter().map(|(id, _)| id));
                }
                for id in hidden {
                    self.emit(Action::SetObjectVisible { id, visible: false });
                }
            }
        }
    }

    /// Snapshot the document in its persisted shape.
    #[must_use]
    pub fn export_graph(&self) -> GraphDocument {
        let vertex = self.doc.vertices().to_vec();
        let boundary = self.doc.boundaries().to_vec();
        let position = vertex
            .iter()
            .map(|v| Position { id: v.id.clone(), x: v.x, y: v.y })
            .chain(boundary.iter().map(|b| Position { id: b.id.clone(), x: b.x, y: b.y }))
            .collect();
        GraphDocument {
            vertex,
            edge: self.doc.edges().to_vec(),
            boundary,
            position,
            vertex_types: self.session.types.as_ref().map(|t| t.definition().clone()),
        }
    }

    /// [`EngineCore::export_graph`] as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.export_graph())
    }
}
