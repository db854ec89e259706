//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT sleep. The scheduler waits on surface
//! I/O raced against a deadline (`sleep_until` inside `select!`); nothing
//! else may block the loop.

use architectural_enforcement::{find_violations, PRODUCTION_SOURCES};

#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_violations(PRODUCTION_SOURCES, |code| {
        code.contains("thread::sleep") || code.contains("sleep(")
    });

    if !violations.is_empty() {
        eprintln!("\n❌ Sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }
        eprintln!("\n✅ ACCEPTABLE:");
        eprintln!("  - tokio::time::sleep_until raced against I/O in the scheduler");
        eprintln!("  - Test code");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}
