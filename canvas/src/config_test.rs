#![allow(clippy::float_cmp)]

use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
    move |key| map.get(key).cloned()
}

/// # Safety
/// Tests must run with `--test-threads=1` to avoid env races.
unsafe fn clear_graphboard_env() {
    unsafe {
        std::env::remove_var("GRAPHBOARD_VIEW");
        std::env::remove_var("GRAPHBOARD_ROW_HEIGHT");
        std::env::remove_var("GRAPHBOARD_REPEAT_MAX");
    }
}

// =============================================================
// from_lookup
// =============================================================

#[test]
fn empty_lookup_yields_defaults() {
    let cfg = EditorConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg, EditorConfig::default());
    assert_eq!(cfg.vertex_width, 160.0);
    assert_eq!(cfg.canvas_floor(), Size::new(1900.0, 959.0));
    assert_eq!(cfg.initial_view, ViewMode::Full);
}

#[test]
fn numeric_overrides_are_applied() {
    let cfg = EditorConfig::from_lookup(lookup_from(&[
        ("GRAPHBOARD_VERTEX_WIDTH", "180"),
        ("GRAPHBOARD_ROW_HEIGHT", " 22.5 "),
        ("GRAPHBOARD_REPEAT_MAX", "12"),
    ]))
    .unwrap();
    assert_eq!(cfg.vertex_width, 180.0);
    assert_eq!(cfg.row_height, 22.5);
    assert_eq!(cfg.repeat_max, 12);
    assert_eq!(cfg.metrics().row_height, 22.5);
}

#[test]
fn unparsable_numbers_fall_back_to_default() {
    let cfg = EditorConfig::from_lookup(lookup_from(&[
        ("GRAPHBOARD_HEADER_HEIGHT", "tall"),
        ("GRAPHBOARD_COPY_OFFSET", "-3"),
        ("GRAPHBOARD_REPEAT_MAX", "lots"),
    ]))
    .unwrap();
    assert_eq!(cfg.header_height, DEFAULT_HEADER_HEIGHT);
    assert_eq!(cfg.copy_offset, DEFAULT_COPY_OFFSET);
    assert_eq!(cfg.repeat_max, DEFAULT_REPEAT_MAX);
}

#[test]
fn reduced_view_is_accepted() {
    let cfg = EditorConfig::from_lookup(lookup_from(&[("GRAPHBOARD_VIEW", "reduced")])).unwrap();
    assert_eq!(cfg.initial_view, ViewMode::Reduced);
}

#[test]
fn unknown_view_is_rejected() {
    let err = EditorConfig::from_lookup(lookup_from(&[("GRAPHBOARD_VIEW", "compact")])).unwrap_err();
    assert_eq!(err, ConfigError::UnknownView("compact".into()));
}

#[test]
fn zero_repeat_max_is_rejected() {
    let err = EditorConfig::from_lookup(lookup_from(&[("GRAPHBOARD_REPEAT_MAX", "0")])).unwrap_err();
    assert_eq!(err, ConfigError::RepeatRange(0));
}

// =============================================================
// clamp_repeat
// =============================================================

#[test]
fn repeat_is_clamped_into_range() {
    let cfg = EditorConfig { repeat_max: 10, ..EditorConfig::default() };
    assert_eq!(cfg.clamp_repeat(0), 1);
    assert_eq!(cfg.clamp_repeat(4), 4);
    assert_eq!(cfg.clamp_repeat(99), 10);
}

// =============================================================
// from_env
// =============================================================

#[test]
fn from_env_reads_process_environment() {
    unsafe {
        clear_graphboard_env();
        std::env::set_var("GRAPHBOARD_VIEW", "reduced");
        std::env::set_var("GRAPHBOARD_ROW_HEIGHT", "24");
    }

    let cfg = EditorConfig::from_env().unwrap();
    assert_eq!(cfg.initial_view, ViewMode::Reduced);
    assert_eq!(cfg.row_height, 24.0);

    unsafe { clear_graphboard_env() };
}
