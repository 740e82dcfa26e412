//! Class-file enumeration
//!
//! Walks a package's classes directory and returns every `.class` file in
//! sorted relative-path order. Every consumer (hashing, indexing,
//! analysis) sees the same deterministic order, which is what makes
//! content hashes and edge ordering reproducible across runs.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Enumerate `*.class` files under `classes_dir`, sorted by relative path.
///
/// Symlinks are not followed. A missing directory yields an empty list
/// rather than an error; packages without compiled classes are skipped
/// upstream.
pub fn class_files(classes_dir: &Path) -> Result<Vec<PathBuf>> {
    if !classes_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(classes_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
    {
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) == Some("class") {
            files.push(path.to_path_buf());
        }
    }

    // Sort by relative path so ordering does not depend on where the
    // cache lives on disk.
    files.sort_by(|a, b| {
        let ra = a.strip_prefix(classes_dir).unwrap_or(a);
        let rb = b.strip_prefix(classes_dir).unwrap_or(b);
        ra.cmp(rb)
    });

    Ok(files)
}

/// Relative path of a class file within its classes directory.
pub fn relative_class_path<'a>(classes_dir: &Path, class_file: &'a Path) -> Result<&'a Path> {
    class_file
        .strip_prefix(classes_dir)
        .with_context(|| format!("class file {} escapes its package root", class_file.display()))
}
