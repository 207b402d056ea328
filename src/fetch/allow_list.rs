// src/fetch/allow_list.rs
//! Persisted URL → approval maps gating media downloads.
//!
//! The file is a JSON object `{url: 0|1}`. A URL seen for the first time is
//! recorded with 0 (seen, not approved) unless new media are approved
//! automatically; an operator flips entries to 1 between runs.

use crate::error::AppError;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

const APPROVED: u8 = 1;
const UNAPPROVED: u8 = 0;

/// Whether a discovered URL may be downloaded this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowListDecision {
    Approved,
    Unapproved,
}

/// One allow-list file, loaded once and written back once.
#[derive(Debug, Clone)]
pub struct UrlAllowList {
    path: PathBuf,
    entries: IndexMap<String, u8>,
    approve_new: bool,
    added: usize,
}

impl UrlAllowList {
    /// Loads the list at `path`; a missing file is an empty list.
    pub fn load(path: impl Into<PathBuf>, approve_new: bool) -> Result<Self, AppError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => IndexMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| AppError::JsonFile {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => IndexMap::new(),
            Err(e) => return Err(e.into()),
        };
        log::debug!("Loaded {} allow-list entries from {}", entries.len(), path.display());
        Ok(Self {
            path,
            entries,
            approve_new,
            added: 0,
        })
    }

    /// An empty in-memory list.
    pub fn empty(path: impl Into<PathBuf>, approve_new: bool) -> Self {
        Self {
            path: path.into(),
            entries: IndexMap::new(),
            approve_new,
            added: 0,
        }
    }

    /// Looks `url` up, recording it when new.
    pub fn record(&mut self, url: &str) -> AllowListDecision {
        let flag = match self.entries.get(url) {
            Some(flag) => *flag,
            None => {
                let flag = if self.approve_new { APPROVED } else { UNAPPROVED };
                self.entries.insert(url.to_string(), flag);
                self.added += 1;
                log::info!("New media URL recorded in {}: {}", self.file_name(), url);
                flag
            }
        };
        if flag == APPROVED {
            AllowListDecision::Approved
        } else {
            AllowListDecision::Unapproved
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries added since loading.
    pub fn added(&self) -> usize {
        self.added
    }

    /// Whether the file needs writing back.
    pub fn is_dirty(&self) -> bool {
        self.added > 0
    }

    /// The list as pretty JSON, in first-seen order.
    pub fn render(&self) -> Result<String, AppError> {
        serde_json::to_string_pretty(&self.entries).map_err(|source| AppError::JsonFile {
            path: self.path.clone(),
            source,
        })
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_urls_start_unapproved() {
        let mut list = UrlAllowList::empty("pdfs_allow_list.json", false);
        assert_eq!(list.record("https://x.org/a.pdf"), AllowListDecision::Unapproved);
        assert_eq!(list.record("https://x.org/a.pdf"), AllowListDecision::Unapproved);
        assert_eq!(list.added(), 1);
        assert!(list.is_dirty());
    }

    #[test]
    fn test_load_honors_saved_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("videos_allow_list.json");
        std::fs::write(
            &path,
            r#"{"https://www.youtube.com/watch?v=a": 1, "https://www.youtube.com/watch?v=b": 0}"#,
        )
        .unwrap();

        let mut list = UrlAllowList::load(&path, false).unwrap();
        assert_eq!(
            list.record("https://www.youtube.com/watch?v=a"),
            AllowListDecision::Approved
        );
        assert_eq!(
            list.record("https://www.youtube.com/watch?v=b"),
            AllowListDecision::Unapproved
        );
        assert!(!list.is_dirty());
    }

    #[test]
    fn test_approve_new_and_render_in_order() {
        let mut list = UrlAllowList::empty("x.json", true);
        assert_eq!(list.record("https://b.org/2.pdf"), AllowListDecision::Approved);
        list.record("https://a.org/1.pdf");
        assert_eq!(
            list.render().unwrap(),
            "{\n  \"https://b.org/2.pdf\": 1,\n  \"https://a.org/1.pdf\": 1\n}"
        );
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let list = UrlAllowList::load(dir.path().join("none.json"), false).unwrap();
        assert!(list.is_empty());
    }
}
