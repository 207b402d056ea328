// src/types/logical_url.rs
//! Canonical node keys.
//!
//! A `LogicalUrl` is the only key the output tree is indexed by, so every way
//! of spelling the same location must collapse to one value here. The
//! canonical form has percent-encoded path segments and no trailing slash:
//! `https://github.com/Laboratoria/curricula-js/` and
//! `https://github.com/Laboratoria/curricula-js` are the same key.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalUrl(String);

impl LogicalUrl {
    /// Canonicalizes an already-composed URL string.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let authority_end = raw.find("://").map(|i| i + 3).unwrap_or(0);
        let mut end = raw.len();
        while end > authority_end && raw[..end].ends_with('/') {
            end -= 1;
        }
        Self(raw[..end].to_string())
    }

    /// Joins `segments` under `base`, one path segment each.
    pub fn from_segments<S: AsRef<str>>(base: &Url, segments: &[S]) -> Self {
        let mut url = base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments.iter().map(|s| s.as_ref()));
        }
        Self::parse(url.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &LogicalUrl) -> bool {
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0[ancestor.0.len()..].starts_with('/')
    }

    /// Source locator for a document living at this location.
    pub fn leaf(&self, name: &str) -> String {
        format!("{}/{}", self.0, name)
    }
}

impl fmt::Display for LogicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
