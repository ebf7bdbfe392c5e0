//! Hygiene: source scans for patterns the engine does not allow.
//!
//! Production files under `src/` (sibling `*_test.rs` files excluded) are
//! searched line by line. Every budget is zero; the engine reports failures
//! through `EngineError`/`ImportError` and logs through `tracing`.
#![allow(clippy::absurd_extreme_comparisons)]

use std::fs;
use std::path::Path;

struct SourceFile {
    path: String,
    content: String,
}

fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    collect(Path::new("src"), &mut files);
    files
}

fn collect(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(&path, out);
            continue;
        }
        let name = path.to_string_lossy().to_string();
        if !name.ends_with(".rs") || name.ends_with("_test.rs") {
            continue;
        }
        if let Ok(content) = fs::read_to_string(&path) {
            out.push(SourceFile { path: name, content });
        }
    }
}

fn assert_budget(pattern: &str, max: usize, what: &str) {
    let files = source_files();
    assert!(!files.is_empty(), "no sources found; run from the crate root");
    let hits: Vec<(String, usize)> = files
        .iter()
        .map(|f| (f.path.clone(), f.content.lines().filter(|l| l.contains(pattern)).count()))
        .filter(|(_, n)| *n > 0)
        .collect();
    let count: usize = hits.iter().map(|(_, n)| n).sum();
    let listing = hits
        .iter()
        .map(|(path, n)| format!("  {path}: {n}"))
        .collect::<Vec<_>>()
        .join("\n");
    assert!(count <= max, "{what}: found {count} `{pattern}`, budget {max}\n{listing}");
}

// =============================================================
// Panics
// =============================================================

#[test]
fn no_unwrap() {
    assert_budget(".unwrap()", 0, "unwrap in production code");
}

#[test]
fn no_expect() {
    assert_budget(".expect(", 0, "expect in production code");
}

#[test]
fn no_panic_macros() {
    for pattern in ["panic!(", "unreachable!(", "todo!(", "unimplemented!("] {
        assert_budget(pattern, 0, "panicking macro in production code");
    }
}

// =============================================================
// Silent loss
// =============================================================

#[test]
fn no_discarded_results() {
    assert_budget("let _ =", 0, "discarded value");
}

#[test]
fn no_dot_ok() {
    assert_budget(".ok()", 0, "error converted to None");
}

// =============================================================
// Output and structure
// =============================================================

#[test]
fn no_direct_printing() {
    for pattern in ["println!(", "eprintln!(", "dbg!("] {
        assert_budget(pattern, 0, "printing instead of tracing");
    }
}

#[test]
fn no_dead_code_allowances() {
    assert_budget("#[allow(dead_code)]", 0, "dead code allowance");
}
