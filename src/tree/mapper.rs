// src/tree/mapper.rs
//! Filesystem paths → logical URLs and ancestor levels.
//!
//! The mapper never touches the filesystem. A path ending in a Markdown file
//! name maps to its containing directory, so every document of a directory
//! shares the directory's key.

use crate::constants::MARKDOWN_EXTENSION;
use crate::types::{LogicalUrl, ValidatedUrl};
use std::path::{Component, Path, PathBuf};
use url::Url;

/// One ancestor directory: its canonical URL and its on-disk name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub url: LogicalUrl,
    pub name: String,
}

/// Maps paths below `root` onto URLs below `base`.
#[derive(Debug, Clone)]
pub struct UrlMapper {
    root: PathBuf,
    base: Url,
}

impl UrlMapper {
    pub fn new(root: impl Into<PathBuf>, base: &ValidatedUrl) -> Self {
        Self {
            root: root.into(),
            base: base.as_url().clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// URL of the root directory itself.
    pub fn root_url(&self) -> LogicalUrl {
        LogicalUrl::from_segments::<&str>(&self.base, &[])
    }

    /// Canonical URL of the directory `path` denotes.
    pub fn url_of(&self, path: &Path) -> LogicalUrl {
        LogicalUrl::from_segments(&self.base, &self.directory_segments(path))
    }

    /// Strict ancestors of `path`'s directory, outermost first.
    ///
    /// Neither the root nor the directory itself is included: a first-level
    /// directory has no levels and hangs off the channel root.
    pub fn levels_of(&self, path: &Path) -> Vec<Level> {
        let segments = self.directory_segments(path);
        (1..segments.len())
            .map(|depth| Level {
                url: LogicalUrl::from_segments(&self.base, &segments[..depth]),
                name: segments[depth - 1].clone(),
            })
            .collect()
    }

    /// Directory components of `path` relative to the root.
    ///
    /// Paths outside the root keep all of their components so the mapping
    /// stays total.
    fn directory_segments(&self, path: &Path) -> Vec<String> {
        let directory = if is_markdown_file_name(path) {
            path.parent().unwrap_or(path)
        } else {
            path
        };
        let relative = directory.strip_prefix(&self.root).unwrap_or(directory);

        let mut segments: Vec<String> = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(name) => segments.push(name.to_string_lossy().into_owned()),
                Component::ParentDir => {
                    segments.pop();
                }
                _ => {}
            }
        }
        segments
    }
}

fn is_markdown_file_name(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(MARKDOWN_EXTENSION))
}
