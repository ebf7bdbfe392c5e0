#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;
use crate::connect::Anchor;
use crate::doc::{Endpoint, NewEdge, PropertyRow};
use crate::engine::NewVertex;
use crate::geom::{Point, Size};
use crate::schema::{TypeDefinition, TypeRegistry};

// =============================================================
// Helpers
// =============================================================

fn id(s: &str) -> ObjectId {
    ObjectId::from(s)
}

fn add_vertex(core: &mut EngineCore, name: &str, vertex_type: &str, x: f64, rows: usize) -> ObjectId {
    let mut new = NewVertex::new(vertex_type, Point::new(x, 0.0));
    new.id = Some(id(name));
    new.data = (0..rows)
        .map(|i| {
            let mut row = PropertyRow::new();
            row.insert("name".into(), json!(format!("f{i}")));
            row
        })
        .collect();
    core.create_vertex(new).unwrap()
}

fn connect(core: &mut EngineCore, source: (&str, Option<&str>), target: (&str, Option<&str>)) -> ObjectId {
    let source = Endpoint::new(id(source.0), source.1.map(str::to_string), Point::default());
    let target = Endpoint::new(id(target.0), target.1.map(str::to_string), Point::default());
    core.create_edge(NewEdge::new(source, target)).unwrap()
}

fn hidden(core: &EngineCore, vertex: &str) -> Vec<usize> {
    core.doc.vertex(&id(vertex)).unwrap().hidden_rows.iter().copied().collect()
}

fn size(core: &EngineCore, vertex: &str) -> Size {
    core.doc.vertex(&id(vertex)).unwrap().size(&core.doc.metrics())
}

/// V1 (3 rows) row 1 feeds V2 (2 rows) row 0; V3 (2 rows) has no edges.
fn fixture() -> (EngineCore, ObjectId) {
    let mut core = EngineCore::default();
    add_vertex(&mut core, "V1", "Pump", 0.0, 3);
    add_vertex(&mut core, "V2", "Pump", 400.0, 2);
    add_vertex(&mut core, "V3", "Pump", 800.0, 2);
    let e = connect(&mut core, ("V1", Some("V1Connected1")), ("V2", Some("V2Connected0")));
    (core, e)
}

fn registry_with_full_notes() -> TypeRegistry {
    let definition: TypeDefinition = serde_json::from_value(json!({
        "VERTEX": [
            {"vertexType": "Pump", "groupType": "DEVICE", "data": [{"name": ""}]},
            {"vertexType": "Note", "groupType": "ANNOTATION", "data": [{"name": ""}]}
        ],
        "VERTEX_GROUP": [
            {"groupType": "DEVICE", "option": [], "dataElementFormat": {"name": ""}},
            {"groupType": "ANNOTATION", "option": ["SHOW_FULL_ALWAYS"], "dataElementFormat": {"name": ""}}
        ]
    }))
    .unwrap();
    TypeRegistry::from_definition(definition)
}

type Snapshot = Vec<(ObjectId, Vec<usize>, Vec<Anchor>)>;

fn snapshot(core: &EngineCore) -> (Snapshot, Vec<(Point, Point)>) {
    let vertices = core
        .doc
        .vertices()
        .iter()
        .map(|v| (v.id.clone(), v.visible_rows().collect(), core.active_anchors(&v.id)))
        .collect();
    let edges = core.doc.edges().iter().map(|e| (e.source.point(), e.target.point())).collect();
    (vertices, edges)
}

// =============================================================
// ViewMode
// =============================================================

#[test]
fn view_mode_parses_and_displays() {
    assert_eq!("reduced".parse::<ViewMode>(), Ok(ViewMode::Reduced));
    assert_eq!("full".parse::<ViewMode>(), Ok(ViewMode::Full));
    assert_eq!("compact".parse::<ViewMode>(), Err(ConfigError::UnknownView("compact".into())));
    assert_eq!(ViewMode::Reduced.to_string(), "reduced");
    assert_eq!(serde_json::to_value(ViewMode::Full).unwrap(), json!("full"));
}

// =============================================================
// Reduced view
// =============================================================

#[test]
fn reduced_view_keeps_only_connected_rows() {
    let (mut core, _) = fixture();
    core.show_reduced();
    assert_eq!(core.session.view, ViewMode::Reduced);
    assert_eq!(hidden(&core, "V1"), vec![0, 2]);
    assert_eq!(hidden(&core, "V2"), vec![1]);
    assert_eq!(size(&core, "V1"), Size::new(160.0, 38.0));
}

#[test]
fn unconnected_vertex_collapses_to_header() {
    let (mut core, _) = fixture();
    core.show_reduced();
    assert_eq!(hidden(&core, "V3"), vec![0, 1]);
    assert_eq!(size(&core, "V3"), Size::new(160.0, 20.0));
    assert_eq!(core.active_anchors(&id("V3")).len(), 1);
}

#[test]
fn reduced_anchors_cover_connected_rows_only() {
    let (mut core, _) = fixture();
    core.show_reduced();
    let anchors = core.active_anchors(&id("V1"));
    assert_eq!(anchors.len(), 3);
    assert!(anchors.iter().skip(1).all(|a| a.prop.as_deref() == Some("V1Connected1")));
    assert_eq!(anchors[2].offset, Point::new(160.0, 29.0));
}

#[test]
fn reduced_view_reroutes_edges() {
    let (mut core, e) = fixture();
    assert_eq!(core.edge(&e).unwrap().source.point(), Point::new(160.0, 47.0));
    core.take_actions();
    core.show_reduced();
    assert_eq!(core.edge(&e).unwrap().source.point(), Point::new(160.0, 29.0));
    assert_eq!(core.edge(&e).unwrap().target.point(), Point::new(400.0, 29.0));

    let actions = core.take_actions();
    assert!(actions.contains(&Action::SetRowVisible { vertex_id: id("V1"), row: 0, visible: false }));
    assert!(actions.contains(&Action::SetRowVisible { vertex_id: id("V1"), row: 1, visible: true }));
    assert!(actions.iter().any(|a| matches!(a, Action::SetPath { edge_id, .. } if *edge_id == e)));
}

#[test]
fn exempt_types_stay_full() {
    let (mut core, _) = fixture();
    core.session.types = Some(registry_with_full_notes());
    add_vertex(&mut core, "N1", "Note", 1200.0, 3);
    core.show_reduced();
    assert!(hidden(&core, "N1").is_empty());
    assert_eq!(core.active_anchors(&id("N1")).len(), 7);
    assert_eq!(hidden(&core, "V3"), vec![0, 1]);
}

#[test]
fn reduced_view_refits_boundaries() {
    let (mut core, _) = fixture();
    let b = core.create_boundary(crate::containment::NewBoundary::at(Point::new(0.0, 400.0))).unwrap();
    core.add_member_to_boundary_with_index(&b, crate::doc::Member::new(id("V3"), crate::doc::MemberKind::Vertex), 0)
        .unwrap();
    core.reset_size_boundary();
    assert_eq!(core.doc.boundary(&b).unwrap().height, 42.0 + 56.0 + 5.0);

    core.show_reduced();
    assert_eq!(core.doc.boundary(&b).unwrap().height, 42.0 + 20.0 + 5.0);
    core.show_full();
    assert_eq!(core.doc.boundary(&b).unwrap().height, 42.0 + 56.0 + 5.0);
}

// =============================================================
// Round trip
// =============================================================

#[test]
fn full_reduced_full_restores_rows_and_anchors() {
    let (mut core, _) = fixture();
    let before = snapshot(&core);
    core.show_reduced();
    assert_ne!(snapshot(&core), before);
    core.show_full();
    assert_eq!(snapshot(&core), before);
    assert_eq!(core.session.view, ViewMode::Full);
    assert!(core.doc.vertices().iter().all(|v| !v.anchors_reduced && v.reduced_anchors.is_empty()));
}

#[test]
fn set_view_dispatches() {
    let (mut core, _) = fixture();
    core.set_view(ViewMode::Reduced);
    assert_eq!(hidden(&core, "V3"), vec![0, 1]);
    core.set_view(ViewMode::Full);
    assert!(hidden(&core, "V3").is_empty());
}

// =============================================================
// Editing while reduced
// =============================================================

#[test]
fn new_vertex_in_reduced_view_starts_collapsed() {
    let (mut core, _) = fixture();
    core.show_reduced();
    add_vertex(&mut core, "V4", "Pump", 1200.0, 3);
    assert_eq!(hidden(&core, "V4"), vec![0, 1, 2]);
    assert_eq!(core.active_anchors(&id("V4")).len(), 1);
}

#[test]
fn new_edge_in_reduced_view_reveals_its_rows() {
    let (mut core, _) = fixture();
    core.show_reduced();
    let e = connect(&mut core, ("V3", Some("V3Connected1")), ("V1", None));
    assert_eq!(hidden(&core, "V3"), vec![0]);
    assert_eq!(core.edge(&e).unwrap().source.point(), Point::new(960.0, 29.0));
    assert!(core.doc.vertex(&id("V3")).unwrap().reduced_anchors.contains(&1));
    // Header endpoints reveal nothing.
    assert_eq!(hidden(&core, "V1"), vec![0, 2]);
}

#[test]
fn retarget_keeps_old_rows_until_view_recomputed() {
    let (mut core, e) = fixture();
    core.show_reduced();
    core.start_retarget(&e, crate::input::EdgeEnd::Target).unwrap();
    // V3 is collapsed, so only its header anchor at (880, 0) can be hit.
    core.end_retarget(Point::new(880.0, 2.0)).unwrap();
    assert_eq!(core.edge(&e).unwrap().target.vertex_id, id("V3"));
    assert_eq!(hidden(&core, "V3"), vec![0, 1]);
    // The old target keeps its row until the view is recomputed.
    assert_eq!(hidden(&core, "V2"), vec![1]);
    core.show_reduced();
    assert_eq!(hidden(&core, "V2"), vec![0, 1]);
}
