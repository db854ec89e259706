//! Integration Test: Panic Prohibition
//!
//! **Policy**: Production code propagates errors. `unwrap()` and `expect()`
//! are for tests only; a bad notification or a broken connection must never
//! abort the mascot through a panic.

use architectural_enforcement::{find_violations, PRODUCTION_SOURCES};

#[test]
fn test_no_unwrap_in_production_code() {
    let violations = find_violations(PRODUCTION_SOURCES, |code| {
        code.contains(".unwrap()") || code.contains(".expect(")
    });

    if !violations.is_empty() {
        eprintln!("\n❌ Panicking shortcuts found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }
        panic!(
            "\nFound {} unwrap/expect call(s) in production code.\nPropagate the error instead.",
            violations.len()
        );
    }
}
