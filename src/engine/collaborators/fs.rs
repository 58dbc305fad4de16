//! File operations: cleaning, copying, glob resolution, concatenation

use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use super::StaticCopier;
use crate::engine::executor::ActionError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiles glob strings
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, ActionError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|source| ActionError::Pattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

/// Resolves globs against a root, keeping the listed pattern order
///
/// Matches of one pattern are sorted; a file matched by several patterns
/// keeps its first position.
pub fn resolve_globs(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, ActionError> {
    let mut files = Vec::new();

    for pattern in patterns {
        let full = root.join(pattern);
        let full = full.to_string_lossy();
        let entries = glob::glob_with(&full, MATCH_OPTIONS).map_err(|source| ActionError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;

        let mut matched: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect();
        matched.sort();

        for path in matched {
            if !files.contains(&path) {
                files.push(path);
            }
        }
    }

    Ok(files)
}

/// Removes a file or directory tree; a missing path is not an error
pub fn remove_path(path: &Path) -> Result<(), ActionError> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        return Ok(());
    };

    result.map_err(ActionError::io(path))
}

fn ensure_parent(path: &Path) -> Result<(), ActionError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(ActionError::io(parent))?;
    }
    Ok(())
}

/// Joins files with newlines into `output`
pub fn concat_files(files: &[PathBuf], output: &Path) -> Result<(), ActionError> {
    let mut bundle = String::new();

    for (i, file) in files.iter().enumerate() {
        if i > 0 {
            bundle.push('\n');
        }
        let content = fs::read_to_string(file).map_err(ActionError::io(file))?;
        bundle.push_str(&content);
    }

    write_file(output, bundle.as_bytes())
}

/// Writes a file, creating its parent directories
pub fn write_file(path: &Path, content: &[u8]) -> Result<(), ActionError> {
    ensure_parent(path)?;
    fs::write(path, content).map_err(ActionError::io(path))
}

/// Copies with `std::fs`, skipping excluded paths
#[derive(Debug, Default)]
pub struct FsCopier;

impl FsCopier {
    fn copy_dir(
        &self,
        source_root: &Path,
        dir: &Path,
        exclude: &[Pattern],
        dest: &Path,
        copied: &mut usize,
    ) -> Result<(), ActionError> {
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(ActionError::io(dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        entries.sort();

        for path in entries {
            if path.is_dir() {
                self.copy_dir(source_root, &path, exclude, dest, copied)?;
                continue;
            }

            let relative = path.strip_prefix(source_root).unwrap_or(&path);
            if exclude.iter().any(|p| p.matches_path_with(relative, MATCH_OPTIONS)) {
                continue;
            }

            let target = dest.join(relative);
            ensure_parent(&target)?;
            fs::copy(&path, &target).map_err(ActionError::io(&path))?;
            *copied += 1;
        }

        Ok(())
    }
}

impl StaticCopier for FsCopier {
    fn copy(&self, source: &Path, exclude: &[Pattern], dest: &Path) -> Result<usize, ActionError> {
        let mut copied = 0;
        if !source.is_dir() {
            return Ok(copied);
        }

        fs::create_dir_all(dest).map_err(ActionError::io(dest))?;
        self.copy_dir(source, source, exclude, dest, &mut copied)?;
        Ok(copied)
    }
}
