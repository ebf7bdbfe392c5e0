//! Interaction modes and the gesture state machine.
//!
//! `InputState` is the gesture being tracked between pointer-down and
//! pointer-up. Only one gesture is active at a time; the engine refuses to
//! start a new one until the current gesture ends or is cancelled.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::fmt;

use crate::doc::{Endpoint, MemberKind, ObjectId};
use crate::geom::Point;

/// Coarse interaction mode, derived from the active gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    /// Moving a vertex or boundary.
    Dragging,
    /// Dragging from a fresh anchor toward a new target.
    CreatingEdge,
    /// Dragging an existing edge's endpoint to a new anchor.
    RetargetingEdge,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Dragging => "dragging",
            Self::CreatingEdge => "creating-edge",
            Self::RetargetingEdge => "retargeting-edge",
        };
        f.write_str(name)
    }
}

/// Which end of an edge a retarget gesture moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeEnd {
    Source,
    Target,
}

/// The active gesture.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InputState {
    #[default]
    Idle,
    /// Moving an object. `orig` is its committed origin at drag start.
    DraggingObject { id: ObjectId, kind: MemberKind, orig: Point },
    /// Drawing a new edge out of `source`.
    CreatingEdge { source: Endpoint },
    /// Moving one end of `edge_id`; `fixed` is the end that stays put.
    RetargetingEdge { edge_id: ObjectId, end: EdgeEnd, fixed: Point },
}

impl InputState {
    #[must_use]
    pub fn mode(&self) -> Mode {
        match self {
            Self::Idle => Mode::Idle,
            Self::DraggingObject { .. } => Mode::Dragging,
            Self::CreatingEdge { .. } => Mode::CreatingEdge,
            Self::RetargetingEdge { .. } => Mode::RetargetingEdge,
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
