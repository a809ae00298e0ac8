use std::fs;
use std::path::{Path, PathBuf};

/// Only the orchestrator fans out tasks; collectors run inside it.
const ALLOWED_SPAWN_CALLERS: &[&str] = &["src/orchestrator.rs"];

/// Standard output is reserved for command results.
const ALLOWED_PRINT_CALLERS: &[&str] = &["src/cli.rs"];

fn collect_rust_files(root: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rust_files(&path, out);
            continue;
        }
        if path.extension().and_then(|s| s.to_str()) == Some("rs") {
            out.push(path);
        }
    }
}

/// Non-test source lines as (relative path, line number, trimmed line)
fn production_lines() -> Vec<(String, usize, String)> {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut files = Vec::new();
    collect_rust_files(&repo_root.join("src"), &mut files);

    let mut lines = Vec::new();
    for file in files {
        let rel = file
            .strip_prefix(repo_root)
            .unwrap_or(&file)
            .to_string_lossy()
            .replace('\\', "/");
        let content = fs::read_to_string(&file).unwrap_or_default();
        for (idx, line) in content.lines().enumerate() {
            // Test modules sit at the end of each file
            if line.trim() == "#[cfg(test)]" {
                break;
            }
            lines.push((rel.clone(), idx + 1, line.trim().to_string()));
        }
    }
    lines
}

fn offenders(pattern: &str, allowed: &[&str]) -> Vec<String> {
    production_lines()
        .into_iter()
        .filter(|(_, _, line)| line.contains(pattern) && !line.starts_with("//"))
        .filter(|(rel, _, _)| !allowed.iter().any(|a| a == rel))
        .map(|(rel, n, line)| format!("{rel}:{n}: {line}"))
        .collect()
}

#[test]
fn task_spawning_is_limited_to_the_orchestrator() {
    let found = offenders("tokio::spawn(", ALLOWED_SPAWN_CALLERS);
    assert!(
        found.is_empty(),
        "task spawn detected outside the orchestrator:\n{}",
        found.join("\n")
    );
}

#[test]
fn stdout_printing_is_limited_to_cli() {
    let found = offenders("println!(", ALLOWED_PRINT_CALLERS);
    assert!(
        found.is_empty(),
        "stdout output detected outside the CLI:\n{}",
        found.join("\n")
    );
}

#[test]
fn production_code_does_not_unwrap() {
    let mut found = offenders(".unwrap()", &[]);
    found.extend(offenders(".expect(", &[]));
    assert!(
        found.is_empty(),
        "unwrap/expect in non-test code:\n{}",
        found.join("\n")
    );
}
