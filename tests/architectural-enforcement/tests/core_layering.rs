//! Integration Test: Core Layering
//!
//! **Policy**: `mascot-core` is headless. It MUST NOT depend on a display
//! protocol or do blocking I/O; windowing lives behind the `Surface` trait.

use std::fs;

use architectural_enforcement::{find_violations, workspace_root};

#[test]
fn test_core_has_no_windowing_imports() {
    let violations = find_violations(&["mascot/core/src"], |code| {
        code.contains("x11rb") || code.contains("xcb") || code.contains("wayland")
    });

    if !violations.is_empty() {
        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }
        panic!(
            "\nFound {} windowing reference(s) in mascot-core.\nMove them behind the Surface trait.",
            violations.len()
        );
    }
}

#[test]
fn test_core_manifest_has_no_windowing_dependency() {
    let manifest = fs::read_to_string(workspace_root().join("mascot/core/Cargo.toml")).unwrap();
    assert!(
        !manifest.contains("x11rb"),
        "mascot-core must not depend on x11rb"
    );
}

#[test]
fn test_core_does_no_blocking_io() {
    let violations = find_violations(&["mascot/core/src"], |code| {
        code.contains("std::fs")
            || code.contains("std::net")
            || code.contains("std::process::Command")
    });

    if !violations.is_empty() {
        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }
        panic!(
            "\nFound {} blocking I/O call(s) in mascot-core.\nAssets are embedded; I/O belongs to the surface.",
            violations.len()
        );
    }
}
