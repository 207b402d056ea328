// src/output/paths.rs
//! Pure functions for path calculations and filename generation.
//!
//! This module handles all path-related operations without
//! performing any I/O operations.

use crate::constants::{README_ARCHIVE_NAME, README_FILENAME};
use std::path::{Path, PathBuf};

/// Derives a local file name from a resource URL.
///
/// The last path segment wins, cut at the first `&` and then at the first
/// `?`. Equal URLs always give equal names.
pub fn name_from_url(url: &str) -> String {
    let tail = url.rsplit(['/', '\\']).next().unwrap_or(url);
    let tail = tail.split('&').next().unwrap_or(tail);
    let tail = tail.split('?').next().unwrap_or(tail);
    let tail = tail.split('#').next().unwrap_or(tail);
    if tail.is_empty() {
        sanitize_filename(url.trim_end_matches('/').rsplit('/').next().unwrap_or(url))
    } else {
        sanitize_filename(tail)
    }
}

/// Sanitizes a string to be safe for use as a filename.
pub fn sanitize_filename(name: &str) -> String {
    let mut safe_name = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>();

    // Trim whitespace and dots
    safe_name = safe_name.trim().trim_matches('.').to_string();

    // Limit length
    if safe_name.chars().count() > 100 {
        safe_name = safe_name.chars().take(100).collect();
    }

    // Default if empty
    if safe_name.is_empty() {
        safe_name = "unnamed".to_string();
    }

    safe_name
}

/// Makes `candidate` unique among `taken` by adding `-2`, `-3`, ...
/// before the extension.
pub fn disambiguate_name<F>(candidate: &str, is_taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    if !is_taken(candidate) {
        return candidate.to_string();
    }

    let path = Path::new(candidate);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(candidate);
    let ext = path.extension().and_then(|s| s.to_str());

    (2..)
        .map(|n| match ext {
            Some(ext) => format!("{}-{}.{}", stem, n, ext),
            None => format!("{}-{}", stem, n),
        })
        .find(|name| !is_taken(name))
        .unwrap_or_else(|| candidate.to_string())
}

/// Archive name for a Markdown document: `index.zip` for a README,
/// `<stem>.zip` otherwise.
pub fn archive_name_for(document: &Path) -> String {
    let file_name = document
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    if file_name.eq_ignore_ascii_case(README_FILENAME) {
        return README_ARCHIVE_NAME.to_string();
    }
    let stem = document
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("index");
    format!("{}.zip", sanitize_filename(stem))
}

/// Mirrors `source_dir` (below `source_root`) under `output_root`.
pub fn mirror_dir(source_root: &Path, source_dir: &Path, output_root: &Path) -> PathBuf {
    match source_dir.strip_prefix(source_root) {
        Ok(relative) => output_root.join(relative),
        Err(_) => output_root.to_path_buf(),
    }
}

/// Calculates a path relative to the directory `base_dir`.
///
/// Falls back to the target as given when no relative form exists.
pub fn get_relative_path(base_dir: &Path, to: &Path) -> String {
    let relative = pathdiff::diff_paths(to, base_dir).unwrap_or_else(|| to.to_path_buf());

    // Forward slashes keep the tree portable
    relative.to_string_lossy().replace('\\', "/")
}
