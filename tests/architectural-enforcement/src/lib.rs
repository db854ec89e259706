//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - The animation core stays free of windowing dependencies
//! - No sleeping in production code; the scheduler only waits on I/O or a deadline
//! - No panicking shortcuts (`unwrap`/`expect`) outside tests
//!
//! The helpers below locate crate sources relative to the workspace root and
//! yield only production lines: comments are stripped and scanning stops at
//! the first `#[cfg(test)]`.

use std::fs;
use std::path::{Path, PathBuf};

/// Source directories of the production crates
pub const PRODUCTION_SOURCES: &[&str] = &["mascot/core/src", "x11/src"];

/// Workspace root, two levels above this package
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Every `.rs` file under a workspace-relative directory
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let path = workspace_root().join(dir);
    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect()
}

/// Production code lines of a file as `(line_number, code)`
///
/// Comments are removed; everything from the first `#[cfg(test)]` on is
/// treated as test code and skipped.
pub fn production_lines(path: &Path) -> Vec<(usize, String)> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };

    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .map(|(idx, line)| {
            let code = line.split("//").next().unwrap_or(line);
            (idx + 1, code.to_string())
        })
        .filter(|(_, code)| !code.trim().is_empty())
        .collect()
}

/// Scan production sources for lines matching `is_violation`
pub fn find_violations(dirs: &[&str], is_violation: impl Fn(&str) -> bool) -> Vec<String> {
    let mut violations = Vec::new();
    for dir in dirs {
        for file in rust_files(dir) {
            for (line_number, code) in production_lines(&file) {
                if is_violation(&code) {
                    violations.push(format!(
                        "{}:{} - {}",
                        file.display(),
                        line_number,
                        code.trim()
                    ));
                }
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_sources_exist() {
        for dir in PRODUCTION_SOURCES {
            assert!(
                !rust_files(dir).is_empty(),
                "no Rust sources found under {dir}"
            );
        }
    }

    #[test]
    fn test_production_lines_skip_comments_and_tests() {
        let dir = std::env::temp_dir().join(format!("arch-enforcement-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("sample.rs");
        fs::write(
            &file,
            "fn a() {} // x.unwrap()\n\n/// docs\nfn b() {}\n#[cfg(test)]\nmod tests { fn c() { x.unwrap() } }\n",
        )
        .unwrap();

        let lines = production_lines(&file);
        assert_eq!(
            lines,
            vec![(1, "fn a() {} ".to_string()), (4, "fn b() {}".to_string())]
        );
        fs::remove_dir_all(&dir).unwrap();
    }
}
