//! Vertex type definitions and the schema consistency check.
//!
//! A type definition document lists vertex types (`VERTEX`) and the groups
//! they belong to (`VERTEX_GROUP`). Groups carry the field layout of a
//! property row, the presentation mapping for labels, and option flags such
//! as `SHOW_FULL_ALWAYS`.
//!
//! The consistency check compares key sets taken from the first property row
//! of each type or vertex. It never blocks: a disagreement is reported as a
//! [`SchemaMismatch`] that the caller surfaces as a warning.

#[cfg(test)]
#[path = "schema_test.rs"]
mod schema_test;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::doc::{ObjectId, PropertyRow, Vertex};

/// Group option that exempts a group's vertex types from the reduced view.
pub const SHOW_FULL_ALWAYS: &str = "SHOW_FULL_ALWAYS";

// =============================================================================
// DEFINITION DOCUMENT
// =============================================================================

/// One vertex type: its group and the template property rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexType {
    pub vertex_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub group_type: String,
    #[serde(default)]
    pub data: Vec<PropertyRow>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Which row fields label a vertex row and its tooltip.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub key_tooltip: String,
    #[serde(default)]
    pub value_tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexGroup {
    pub group_type: String,
    #[serde(default)]
    pub option: Vec<String>,
    /// Field name to a sample value; the sample's JSON type is the field format.
    #[serde(default)]
    pub data_element_format: PropertyRow,
    #[serde(default)]
    pub vertex_presentation: Presentation,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The `{VERTEX, VERTEX_GROUP}` document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypeDefinition {
    #[serde(rename = "VERTEX", default)]
    pub vertex: Vec<VertexType>,
    #[serde(rename = "VERTEX_GROUP", default)]
    pub vertex_group: Vec<VertexGroup>,
}

impl TypeDefinition {
    #[must_use]
    pub fn find(&self, vertex_type: &str) -> Option<&VertexType> {
        self.vertex.iter().find(|t| t.vertex_type == vertex_type)
    }

    /// Vertex type names in document order.
    #[must_use]
    pub fn type_names(&self) -> Vec<&str> {
        self.vertex.iter().map(|t| t.vertex_type.as_str()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertex.is_empty() && self.vertex_group.is_empty()
    }
}

/// Editor control kind for a row field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    Boolean,
    Array,
    Number,
    String,
}

impl FieldFormat {
    /// Format implied by a sample value. Anything unrecognised edits as text.
    #[must_use]
    pub fn of_sample(sample: &serde_json::Value) -> Self {
        match sample {
            serde_json::Value::Bool(_) => Self::Boolean,
            serde_json::Value::Array(_) => Self::Array,
            serde_json::Value::Number(_) => Self::Number,
            _ => Self::String,
        }
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Loaded type definition with the lookups derived from it.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    definition: TypeDefinition,
    formats: HashMap<String, Vec<(String, FieldFormat)>>,
    /// Group option name to the vertex types of every group carrying it.
    options: HashMap<String, Vec<String>>,
}

impl TypeRegistry {
    #[must_use]
    pub fn from_definition(definition: TypeDefinition) -> Self {
        let formats = definition
            .vertex_group
            .iter()
            .map(|group| {
                let fields = group
                    .data_element_format
                    .iter()
                    .map(|(field, sample)| (field.clone(), FieldFormat::of_sample(sample)))
                    .collect();
                (group.group_type.clone(), fields)
            })
            .collect();

        let mut options: HashMap<String, Vec<String>> = HashMap::new();
        for group in &definition.vertex_group {
            let members: Vec<&VertexType> = definition
                .vertex
                .iter()
                .filter(|t| t.group_type == group.group_type)
                .collect();
            for option in &group.option {
                let entry = options.entry(option.clone()).or_default();
                for vertex_type in &members {
                    if !entry.contains(&vertex_type.vertex_type) {
                        entry.push(vertex_type.vertex_type.clone());
                    }
                }
            }
        }

        Self { definition, formats, options }
    }

    #[must_use]
    pub fn definition(&self) -> &TypeDefinition {
        &self.definition
    }

    #[must_use]
    pub fn vertex_types(&self) -> &[VertexType] {
        &self.definition.vertex
    }

    /// Entries of the vertex creation menu: one per vertex type.
    #[must_use]
    pub fn menu_items(&self) -> Vec<&str> {
        self.definition.type_names()
    }

    #[must_use]
    pub fn find(&self, vertex_type: &str) -> Option<&VertexType> {
        self.definition.find(vertex_type)
    }

    #[must_use]
    pub fn group(&self, group_type: &str) -> Option<&VertexGroup> {
        self.definition.vertex_group.iter().find(|g| g.group_type == group_type)
    }

    #[must_use]
    pub fn presentation(&self, group_type: &str) -> Option<&Presentation> {
        self.group(group_type).map(|g| &g.vertex_presentation)
    }

    /// Row field names of a group, in definition order.
    #[must_use]
    pub fn header_fields(&self, group_type: &str) -> Vec<&str> {
        self.formats
            .get(group_type)
            .map(|fields| fields.iter().map(|(name, _)| name.as_str()).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn field_format(&self, group_type: &str, field: &str) -> Option<FieldFormat> {
        self.formats
            .get(group_type)?
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, format)| *format)
    }

    /// Vertex types whose group carries `option`.
    #[must_use]
    pub fn types_with_option(&self, option: &str) -> &[String] {
        self.options.get(option).map_or(&[], Vec::as_slice)
    }

    /// Whether vertices of this type are exempt from the reduced view.
    #[must_use]
    pub fn shows_full(&self, vertex_type: &str) -> bool {
        self.types_with_option(SHOW_FULL_ALWAYS).iter().any(|t| t == vertex_type)
    }
}

// =============================================================================
// CONSISTENCY CHECK
// =============================================================================

/// Why an imported graph or type definition disagrees with its reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaMismatch {
    /// The document has no usable embedded type snapshot.
    MissingEmbeddedTypes,
    /// A vertex declares a type the embedded snapshot does not list.
    UnknownVertexType { vertex: ObjectId, vertex_type: String },
    /// A vertex's row keys disagree with its declared type.
    VertexKeys { vertex: ObjectId, vertex_type: String },
    /// The two definitions list a different number of types.
    TypeCount { current: usize, reference: usize },
    /// A type of the current definition is absent from the reference.
    TypeMissing(String),
    /// A type's row keys differ between the two definitions.
    TypeKeys(String),
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEmbeddedTypes => write!(f, "graph carries no embedded vertex types"),
            Self::UnknownVertexType { vertex, vertex_type } => {
                write!(f, "vertex {vertex} uses type {vertex_type} missing from the embedded types")
            }
            Self::VertexKeys { vertex, vertex_type } => {
                write!(f, "vertex {vertex} rows do not match the keys of type {vertex_type}")
            }
            Self::TypeCount { current, reference } => {
                write!(f, "definition lists {current} vertex types, graph lists {reference}")
            }
            Self::TypeMissing(name) => write!(f, "vertex type {name} is not present in the graph"),
            Self::TypeKeys(name) => write!(f, "vertex type {name} has different row keys"),
        }
    }
}

/// Keys of the first row; an empty row list has no keys.
#[must_use]
pub fn row_keys(rows: &[PropertyRow]) -> Vec<&str> {
    rows.first()
        .map(|row| row.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Whether `current` uses a key that `reference` lacks.
///
/// Keys present only in `reference` are tolerated.
#[must_use]
pub fn has_unknown_keys(current: &[&str], reference: &[&str]) -> bool {
    current.iter().any(|key| !reference.contains(key))
}

/// Full key-set comparison: counts must agree and `current` may not use a key
/// that `reference` lacks.
#[must_use]
pub fn key_sets_mismatch(current: &[&str], reference: &[&str]) -> bool {
    current.len() != reference.len() || has_unknown_keys(current, reference)
}

/// Compare the loaded definition against the snapshot embedded in a graph.
#[must_use]
pub fn check_vertex_types(current: &TypeDefinition, reference: &TypeDefinition) -> Option<SchemaMismatch> {
    let current_names = current.type_names();
    let reference_names = reference.type_names();
    if current_names.len() != reference_names.len() {
        return Some(SchemaMismatch::TypeCount { current: current_names.len(), reference: reference_names.len() });
    }
    if let Some(missing) = current_names.iter().find(|name| !reference_names.contains(name)) {
        return Some(SchemaMismatch::TypeMissing((*missing).to_string()));
    }
    for vertex_type in &current.vertex {
        let Some(other) = reference.find(&vertex_type.vertex_type) else {
            continue;
        };
        if key_sets_mismatch(&row_keys(&vertex_type.data), &row_keys(&other.data)) {
            return Some(SchemaMismatch::TypeKeys(vertex_type.vertex_type.clone()));
        }
    }
    None
}

/// Compare every vertex's row keys against its declared embedded type.
#[must_use]
pub fn check_graph_structure(vertices: &[Vertex], embedded: Option<&TypeDefinition>) -> Option<SchemaMismatch> {
    let embedded = match embedded {
        Some(def) if !def.vertex.is_empty() => def,
        _ => return Some(SchemaMismatch::MissingEmbeddedTypes),
    };
    for vertex in vertices {
        let Some(declared) = embedded.find(&vertex.vertex_type) else {
            return Some(SchemaMismatch::UnknownVertexType {
                vertex: vertex.id.clone(),
                vertex_type: vertex.vertex_type.clone(),
            });
        };
        if key_sets_mismatch(&row_keys(&vertex.data), &row_keys(&declared.data)) {
            return Some(SchemaMismatch::VertexKeys { vertex: vertex.id.clone(), vertex_type: vertex.vertex_type.clone() });
        }
    }
    None
}
