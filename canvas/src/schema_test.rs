use serde_json::json;

use super::*;

// =============================================================
// Helpers
// =============================================================

fn definition() -> TypeDefinition {
    serde_json::from_value(json!({
        "VERTEX": [
            {
                "vertexType": "Pump",
                "description": "Fluid pump",
                "groupType": "DEVICE",
                "data": [{"name": "spd", "type": "int", "required": true}]
            },
            {
                "vertexType": "Valve",
                "groupType": "DEVICE",
                "data": [{"name": "open", "type": "bool", "required": false}]
            },
            {
                "vertexType": "Note",
                "groupType": "ANNOTATION",
                "data": [{"text": ""}]
            }
        ],
        "VERTEX_GROUP": [
            {
                "groupType": "DEVICE",
                "option": [],
                "dataElementFormat": {"name": "", "type": "", "required": false, "tags": [], "size": 0},
                "vertexPresentation": {"key": "name", "value": "type", "keyTooltip": "name", "valueTooltip": "type"}
            },
            {
                "groupType": "ANNOTATION",
                "option": ["SHOW_FULL_ALWAYS"],
                "dataElementFormat": {"text": ""},
                "vertexPresentation": {"key": "text", "value": "text"}
            }
        ]
    }))
    .unwrap()
}

fn vertex(id: &str, vertex_type: &str, row: serde_json::Value) -> Vertex {
    serde_json::from_value(json!({
        "id": id,
        "vertexType": vertex_type,
        "data": [row]
    }))
    .unwrap()
}

// =============================================================
// Key set comparison
// =============================================================

#[test]
fn subset_of_reference_has_no_unknown_keys() {
    assert!(!has_unknown_keys(&["a", "b"], &["a", "b", "c"]));
}

#[test]
fn extra_current_key_is_unknown() {
    assert!(has_unknown_keys(&["a", "b", "d"], &["a", "b", "c"]));
    assert!(key_sets_mismatch(&["a", "b", "d"], &["a", "b", "c"]));
}

#[test]
fn full_comparison_also_requires_equal_counts() {
    assert!(key_sets_mismatch(&["a", "b"], &["a", "b", "c"]));
    assert!(!key_sets_mismatch(&["b", "a"], &["a", "b"]));
}

#[test]
fn row_keys_reads_first_row_only() {
    let rows: Vec<PropertyRow> = serde_json::from_value(json!([{"a": 1, "b": 2}, {"z": 3}])).unwrap();
    assert_eq!(row_keys(&rows), vec!["a", "b"]);
    assert!(row_keys(&[]).is_empty());
}

// =============================================================
// Registry
// =============================================================

#[test]
fn field_formats_follow_sample_values() {
    let registry = TypeRegistry::from_definition(definition());
    assert_eq!(registry.field_format("DEVICE", "name"), Some(FieldFormat::String));
    assert_eq!(registry.field_format("DEVICE", "required"), Some(FieldFormat::Boolean));
    assert_eq!(registry.field_format("DEVICE", "tags"), Some(FieldFormat::Array));
    assert_eq!(registry.field_format("DEVICE", "size"), Some(FieldFormat::Number));
    assert_eq!(registry.field_format("DEVICE", "missing"), None);
}

#[test]
fn header_fields_keep_definition_order() {
    let registry = TypeRegistry::from_definition(definition());
    assert_eq!(registry.header_fields("DEVICE"), vec!["name", "type", "required", "tags", "size"]);
    assert!(registry.header_fields("NOPE").is_empty());
}

#[test]
fn show_full_membership_comes_from_group_options() {
    let registry = TypeRegistry::from_definition(definition());
    assert!(registry.shows_full("Note"));
    assert!(!registry.shows_full("Pump"));
    assert_eq!(registry.types_with_option(SHOW_FULL_ALWAYS), ["Note".to_string()]);
    assert!(registry.types_with_option("OTHER").is_empty());
}

#[test]
fn option_shared_by_two_groups_collects_both() {
    let mut def = definition();
    def.vertex_group[0].option.push(SHOW_FULL_ALWAYS.to_string());
    let registry = TypeRegistry::from_definition(def);
    assert!(registry.shows_full("Pump"));
    assert!(registry.shows_full("Valve"));
    assert!(registry.shows_full("Note"));
}

#[test]
fn menu_lists_every_vertex_type() {
    let registry = TypeRegistry::from_definition(definition());
    assert_eq!(registry.menu_items(), vec!["Pump", "Valve", "Note"]);
    assert_eq!(registry.find("Pump").map(|t| t.description.as_str()), Some("Fluid pump"));
    assert_eq!(registry.presentation("DEVICE").map(|p| p.key.as_str()), Some("name"));
}

// =============================================================
// check_vertex_types
// =============================================================

#[test]
fn identical_definitions_match() {
    assert_eq!(check_vertex_types(&definition(), &definition()), None);
}

#[test]
fn differing_type_count_is_reported() {
    let mut reference = definition();
    reference.vertex.pop();
    assert_eq!(
        check_vertex_types(&definition(), &reference),
        Some(SchemaMismatch::TypeCount { current: 3, reference: 2 })
    );
}

#[test]
fn renamed_type_is_reported() {
    let mut reference = definition();
    reference.vertex[1].vertex_type = "Gate".into();
    assert_eq!(check_vertex_types(&definition(), &reference), Some(SchemaMismatch::TypeMissing("Valve".into())));
}

#[test]
fn changed_row_keys_are_reported() {
    let mut reference = definition();
    reference.vertex[0].data = serde_json::from_value(json!([{"name": "", "kind": "", "required": false}])).unwrap();
    assert_eq!(check_vertex_types(&definition(), &reference), Some(SchemaMismatch::TypeKeys("Pump".into())));
}

// =============================================================
// check_graph_structure
// =============================================================

#[test]
fn vertices_matching_their_types_pass() {
    let def = definition();
    let vertices = vec![
        vertex("V1", "Pump", json!({"name": "a", "type": "b", "required": true})),
        vertex("V2", "Note", json!({"text": "hi"})),
    ];
    assert_eq!(check_graph_structure(&vertices, Some(&def)), None);
}

#[test]
fn missing_snapshot_is_reported() {
    assert_eq!(check_graph_structure(&[], None), Some(SchemaMismatch::MissingEmbeddedTypes));
    assert_eq!(
        check_graph_structure(&[], Some(&TypeDefinition::default())),
        Some(SchemaMismatch::MissingEmbeddedTypes)
    );
}

#[test]
fn undeclared_vertex_type_is_reported() {
    let def = definition();
    let vertices = vec![vertex("V1", "Motor", json!({"name": "a"}))];
    assert!(matches!(
        check_graph_structure(&vertices, Some(&def)),
        Some(SchemaMismatch::UnknownVertexType { .. })
    ));
}

#[test]
fn vertex_with_unknown_key_is_reported() {
    let def = definition();
    let vertices = vec![vertex("V1", "Pump", json!({"name": "a", "type": "b", "color": "red"}))];
    let mismatch = check_graph_structure(&vertices, Some(&def)).unwrap();
    assert_eq!(mismatch, SchemaMismatch::VertexKeys { vertex: ObjectId::from("V1"), vertex_type: "Pump".into() });
    assert!(mismatch.to_string().contains("V1"));
}
