//! Interactive trajectory file picker.
//!
//! This is kept separate from clap parsing:
//! - clap handles structured flags/subcommands
//! - the picker provides the "run `msd` and choose a file" UX
//!
//! The picker searches for trajectory files (`*.csv`, `*.txt`, `*.xlsx`,
//! `*.xls`) under the current working directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Default directory recursion depth for finding trajectory files.
const DEFAULT_SEARCH_DEPTH: usize = 4;

/// File extensions the ingest layer reads.
const EXTENSIONS: [&str; 4] = ["csv", "txt", "xlsx", "xls"];

/// Prompt the user to select a trajectory file from the current directory tree.
///
/// Accepts either a number from the list or an explicit path; `q` cancels.
pub fn prompt_for_trajectory_path() -> Result<PathBuf, AppError> {
    let files = discover_trajectory_files();
    if files.is_empty() {
        return Err(AppError::input(
            "No .csv/.txt/.xlsx files found. Provide one with `msd analyze -f <tracks.csv>`.",
        ));
    }

    println!("Found {} trajectory file(s):", files.len());
    for (idx, path) in files.iter().enumerate() {
        println!("{:>3}) {}", idx + 1, pretty_path(path));
    }

    loop {
        print!("Select a file by number (1-{}) or type a path (q to quit): ", files.len());
        io::stdout()
            .flush()
            .map_err(|e| AppError::input(format!("Failed to write prompt: {e}")))?;

        let mut input = String::new();
        let bytes = io::stdin()
            .read_line(&mut input)
            .map_err(|e| AppError::input(format!("Failed to read input: {e}")))?;
        if bytes == 0 {
            return Err(AppError::input(
                "No input received. Provide a file with `msd analyze -f <tracks.csv>`.",
            ));
        }

        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Err(AppError::input("Canceled."));
        }

        if let Ok(choice) = input.parse::<usize>() {
            if (1..=files.len()).contains(&choice) {
                return validate_trajectory_path(&files[choice - 1]);
            }
            println!("Invalid choice: {choice}. Enter a number between 1 and {}.", files.len());
            continue;
        }

        match validate_trajectory_path(Path::new(input)) {
            Ok(path) => return Ok(path),
            Err(err) => println!("{err}"),
        }
    }
}

fn has_trajectory_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Validate the provided path points to a readable trajectory file.
pub fn validate_trajectory_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.exists() {
        return Err(AppError::input(format!("File not found: {}", path.display())));
    }
    if path.is_dir() {
        return Err(AppError::input(format!(
            "Expected a file, got a directory: {}",
            path.display()
        )));
    }
    if !has_trajectory_extension(path) {
        return Err(AppError::input(format!(
            "Expected a .csv, .txt, .xlsx or .xls file (got: {}).",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

/// Discover trajectory files under the current directory (deterministic order).
pub fn discover_trajectory_files() -> Vec<PathBuf> {
    find_files(Path::new("."), DEFAULT_SEARCH_DEPTH)
}

fn find_files(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut out = Vec::new();
    find_files_inner(root, 0, max_depth, &mut out);
    out.sort_by_key(|p| pretty_path(p));
    out
}

fn find_files_inner(root: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if !should_skip_dir(&path) {
                find_files_inner(&path, depth + 1, max_depth, out);
            }
        } else if file_type.is_file() && has_trajectory_extension(&path) {
            out.push(path);
        }
    }
}

/// Build output and VCS directories never hold input tracks.
fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    matches!(name, ".git" | "target" | "node_modules" | "msd_output")
}

fn pretty_path(path: &Path) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    stripped.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_trajectory_files_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), "t,x,y\n").unwrap();
        fs::write(dir.path().join("a.TXT"), "t,x,y\n").unwrap();
        fs::write(dir.path().join("c.xlsx"), "").unwrap();
        fs::write(dir.path().join("notes.md"), "").unwrap();
        fs::create_dir(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("target/skip.csv"), "").unwrap();

        let found = find_files(dir.path(), 2);
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.TXT", "b.csv", "c.xlsx"]);
    }

    #[test]
    fn rejects_missing_and_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let md = dir.path().join("notes.md");
        fs::write(&md, "").unwrap();
        assert!(validate_trajectory_path(&md).is_err());
        assert!(validate_trajectory_path(&dir.path().join("none.csv")).is_err());
        assert!(validate_trajectory_path(dir.path()).is_err());
    }
}
