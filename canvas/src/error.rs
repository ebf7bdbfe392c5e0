//! Error types for the canvas engine.
//!
//! `EngineError` covers operations that reference ids the store does not hold
//! or that conflict with the current interaction mode. Every mutating engine
//! call checks its references before the first write, so an `Err` means the
//! store is unchanged. `ImportError` covers documents that cannot be loaded at
//! all; schema disagreements are warnings, not errors.

use crate::doc::ObjectId;
use crate::input::Mode;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("vertex not found: {0}")]
    VertexNotFound(ObjectId),
    #[error("edge not found: {0}")]
    EdgeNotFound(ObjectId),
    #[error("boundary not found: {0}")]
    BoundaryNotFound(ObjectId),
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),
    #[error("id already in use: {0}")]
    DuplicateId(ObjectId),
    #[error("vertex type is required")]
    MissingVertexType,
    #[error("unknown vertex type: {0}")]
    UnknownVertexType(String),
    #[error("vertex {vertex} has no property {prop}")]
    UnknownProperty { vertex: ObjectId, prop: String },
    #[error("vertex {vertex} has {expected} property rows, update supplied {found}")]
    RowCountMismatch { vertex: ObjectId, expected: usize, found: usize },
    #[error("{member} is not a member of boundary {boundary}")]
    NotAMember { boundary: ObjectId, member: ObjectId },
    #[error("{member} is already a member of boundary {boundary}")]
    AlreadyMember { boundary: ObjectId, member: ObjectId },
    #[error("adding {object} to {boundary} would make it its own ancestor")]
    WouldCycle { object: ObjectId, boundary: ObjectId },
    #[error("member index {index} out of range for boundary {boundary}")]
    IndexOutOfRange { boundary: ObjectId, index: usize },
    #[error("cannot start a gesture while {active} is active")]
    ModeBusy { active: Mode },
    #[error("no gesture of this kind is active")]
    NoActiveGesture,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid structure for a vertex type definition file")]
    InvalidTypeDefinition,
    #[error("no position entry for {0}")]
    MissingPosition(ObjectId),
    #[error("duplicate id in document: {0}")]
    DuplicateId(ObjectId),
    #[error("edge {edge} references unknown vertex {vertex}")]
    DanglingEdge { edge: ObjectId, vertex: ObjectId },
    #[error("boundary {boundary} lists unknown member {member}")]
    UnknownMember { boundary: ObjectId, member: ObjectId },
    #[error("{0} is listed as a member of more than one boundary")]
    SharedMember(ObjectId),
    #[error("boundary containment loops through {0}")]
    ContainmentCycle(ObjectId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown GRAPHBOARD_VIEW: {0} (expected 'full' or 'reduced')")]
    UnknownView(String),
    #[error("GRAPHBOARD_REPEAT_MAX must be at least 1, got {0}")]
    RepeatRange(u32),
}
