//! Integration Test: Panic Prohibition
//!
//! **Policy**: Production code in botmux-core MUST NOT contain panicking
//! calls. The multiplexer's whole contract is that malformed input from a
//! generative model never throws; a stray `unwrap()` on a parsing path would
//! break that silently.
//!
//! **Exceptions**: test code (`#[cfg(test)]` modules and the `tests/`
//! directories are not scanned).

use std::fs;
use std::path::{Path, PathBuf};

const FORBIDDEN_CALLS: &[&str] = &[
    ".unwrap()",
    ".expect(",
    "panic!(",
    "todo!(",
    "unimplemented!(",
];

/// Test that production code does not contain panicking calls
#[test]
fn test_no_panicking_calls_in_production_code() {
    let violations = find_panic_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Panicking calls found in production code!");
        eprintln!("Malformed bot output must degrade to content, never crash.\n");

        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }

        eprintln!("\n❌ FORBIDDEN in production code:");
        eprintln!("  - .unwrap(), .expect(...)");
        eprintln!("  - panic!(...), todo!(...), unimplemented!(...)");
        eprintln!("\n✅ REQUIRED instead:");
        eprintln!("  - Propagate errors with ? and thiserror enums");
        eprintln!("  - Recover leniently from malformed markup");
        eprintln!("  - unwrap_or / map_or for defaults");
        eprintln!("\n✅ ACCEPTABLE panicking calls:");
        eprintln!("  - #[cfg(test)] modules and tests/ directories");

        panic!(
            "\nFound {} panicking call(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all panicking calls in production code
fn find_panic_violations() -> Vec<String> {
    let mut violations = Vec::new();
    check_directory(
        &workspace_root().join("botmux/core/src"),
        &mut violations,
    );
    violations
}

/// Resolve the workspace root from this member's manifest directory.
fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

fn check_directory(dir: &Path, violations: &mut Vec<String>) {
    if !dir.exists() {
        return;
    }

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
            check_file(entry.path(), violations);
        }
    }
}

fn check_file(path: &Path, violations: &mut Vec<String>) {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (idx, line) in content.lines().enumerate() {
        // Unit tests live in #[cfg(test)] modules at the bottom of each
        // source file; everything from that marker on is test code.
        if line.contains("#[cfg(test)]") {
            break;
        }

        let line_number = idx + 1;

        // Skip comments
        let code_part = line.split("//").next().unwrap_or(line);

        for forbidden in FORBIDDEN_CALLS {
            if code_part.contains(forbidden) {
                violations.push(format!(
                    "{}:{}: {}",
                    path.display(),
                    line_number,
                    line.trim()
                ));
            }
        }
    }
}
