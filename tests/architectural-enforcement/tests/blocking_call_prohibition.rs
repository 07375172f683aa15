//! Integration Test: Blocking Call Prohibition
//!
//! **Policy**: Production code in botmux-core MUST NOT block the runtime.
//! The multiplexer's worker shares its thread with every other task on the
//! runtime; a blocking sleep or blocking I/O call there stalls unrelated
//! topics, not just its own.
//!
//! **Required**: awaiting subscriber futures is the only suspension point.
//! Use `tokio::sync` primitives and `tokio::time`, never `std::thread::sleep`
//! or `std::fs`/`std::net`.
//!
//! **Exceptions**: test code (`#[cfg(test)]` modules and `tests/`
//! directories are not scanned).

use std::fs;
use std::path::{Path, PathBuf};

const FORBIDDEN_CALLS: &[&str] = &[
    "std::thread::sleep",
    "thread::sleep(",
    "std::fs::",
    "std::net::",
    "std::process::Command",
    "reqwest::blocking",
];

/// Test that production code does not contain blocking calls
#[test]
fn test_no_blocking_calls_in_production_code() {
    let violations = find_blocking_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking calls found in production code!");
        eprintln!("The worker task must only suspend on subscriber futures.\n");

        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }

        eprintln!("\n❌ FORBIDDEN blocking calls:");
        eprintln!("  - std::thread::sleep()");
        eprintln!("  - std::fs::*, std::net::*, std::process::Command");
        eprintln!("  - reqwest::blocking::*");
        eprintln!("\n✅ REQUIRED async alternatives:");
        eprintln!("  - tokio::sync channels and oneshot acks");
        eprintln!("  - tokio::time::timeout / interval where timing matters");
        eprintln!("\n✅ ACCEPTABLE blocking calls:");
        eprintln!("  - Test code (#[cfg(test)] modules, tests/ directories)");

        panic!(
            "\nFound {} blocking call(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all blocking calls in production code
fn find_blocking_violations() -> Vec<String> {
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
