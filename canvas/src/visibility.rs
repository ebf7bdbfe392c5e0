//! Full and reduced display policies.
//!
//! In the reduced view a vertex shows only the rows that carry an edge, and
//! exposes anchors for those rows alone. Vertices whose type belongs to a
//! `SHOW_FULL_ALWAYS` group are exempt. Switching views re-routes edges,
//! refits boundaries and recomputes the canvas size.

#[cfg(test)]
#[path = "visibility_test.rs"]
mod visibility_test;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::doc::ObjectId;
use crate::engine::{Action, EngineCore};
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Full,
    Reduced,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Reduced => f.write_str("reduced"),
        }
    }
}

impl FromStr for ViewMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "reduced" => Ok(Self::Reduced),
            other => Err(ConfigError::UnknownView(other.to_string())),
        }
    }
}

impl EngineCore {
    pub fn set_view(&mut self, mode: ViewMode) {
        match mode {
            ViewMode::Full => self.show_full(),
            ViewMode::Reduced => self.show_reduced(),
        }
    }

    /// Hide every row that carries no edge, except on exempt vertices.
    pub fn show_reduced(&mut self) {
        self.session.view = ViewMode::Reduced;
        let connected = self.connected_props();
        let ids: Vec<(ObjectId, bool)> = self
            .doc
            .vertices()
            .iter()
            .map(|v| (v.id.clone(), self.session.shows_full(&v.vertex_type)))
            .collect();
        for (id, exempt) in &ids {
            if *exempt {
                self.restore_vertex(id);
            } else {
                let props = connected.get(id).map_or(&[][..], Vec::as_slice);
                self.apply_reduction(id, props);
            }
        }
        for (id, _) in &ids {
            self.reroute_vertex(id);
        }
        self.reset_size_boundary();
        self.update_height_boundary();
        info!(vertices = ids.len(), "reduced view applied");
    }

    /// Show every row again and drop the reduced-view anchors.
    pub fn show_full(&mut self) {
        self.session.view = ViewMode::Full;
        let ids: Vec<ObjectId> = self.doc.vertices().iter().map(|v| v.id.clone()).collect();
        for id in &ids {
            self.restore_vertex(id);
        }
        let routed: Vec<ObjectId> = ids.into_iter().filter(|id| !self.doc.edges_touching(id).is_empty()).collect();
        for id in &routed {
            self.reroute_vertex(id);
        }
        self.reset_size_boundary();
        self.update_height_boundary();
        info!(rerouted = routed.len(), "full view applied");
    }

    /// Apply the reduced view to a single vertex from its current edges.
    pub(crate) fn reduce_vertex(&mut self, id: &ObjectId) {
        let Some(vertex) = self.doc.vertex(id) else {
            return;
        };
        if self.session.shows_full(&vertex.vertex_type) {
            return;
        }
        let props = self.connected_props().remove(id).unwrap_or_default();
        self.apply_reduction(id, &props);
    }

    /// Re-reduce vertices whose edge set grew, then settle geometry.
    pub(crate) fn reveal_connected(&mut self, ids: &[ObjectId]) {
        for id in ids {
            self.reduce_vertex(id);
            self.reroute_vertex(id);
        }
        self.reset_size_boundary();
        self.update_height_boundary();
    }

    /// Row keys bound by edges, per vertex, in edge order without repeats.
    fn connected_props(&self) -> HashMap<ObjectId, Vec<String>> {
        let mut out: HashMap<ObjectId, Vec<String>> = HashMap::new();
        for edge in self.doc.edges() {
            for end in [&edge.source, &edge.target] {
                let props = out.entry(end.vertex_id.clone()).or_default();
                if let Some(prop) = &end.prop {
                    if !props.contains(prop) {
                        props.push(prop.clone());
                    }
                }
            }
        }
        out
    }

    fn apply_reduction(&mut self, id: &ObjectId, props: &[String]) {
        let Some(vertex) = self.doc.vertex_mut(id) else {
            return;
        };
        let mut kept: Vec<usize> = Vec::new();
        for row in props.iter().filter_map(|p| vertex.row_of(p)) {
            if !kept.contains(&row) {
                kept.push(row);
            }
        }
        let rows = vertex.data.len();
        vertex.hidden_rows = (0..rows).filter(|row| !kept.contains(row)).collect();
        vertex.anchors_reduced = true;
        vertex.reduced_anchors = kept;
        self.emit_rows(id, rows);
    }

    fn restore_vertex(&mut self, id: &ObjectId) {
        let Some(vertex) = self.doc.vertex_mut(id) else {
            return;
        };
        vertex.hidden_rows.clear();
        vertex.anchors_reduced = false;
        vertex.reduced_anchors.clear();
        let rows = vertex.data.len();
        self.emit_rows(id, rows);
    }

    fn emit_rows(&mut self, id: &ObjectId, rows: usize) {
        for row in 0..rows {
            let visible = self.doc.vertex(id).is_some_and(|v| v.is_row_visible(row));
            self.emit(Action::SetRowVisible { vertex_id: id.clone(), row, visible });
        }
        let shown = self.doc.is_shown(id);
        self.emit(Action::SetObjectVisible { id: id.clone(), visible: shown });
        self.emit_vertex_shape(id);
    }
}
