// src/fetch/cache.rs
//! Disk-based response cache for resource downloads.
//!
//! Caches successful responses keyed by URL. Responses from below the base
//! content URL never expire; everything else lives for a TTL. Each entry is
//! a small JSON header (`<key>.json`) plus the raw body (`<key>.body`).

use super::{FetchedResource, ResourceSource};
use crate::error::FetchFailure;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

// ---------------------------------------------------------------------------
// Disk cache
// ---------------------------------------------------------------------------

/// URL-keyed file cache for response bodies.
///
/// Cache operations are best-effort: read/write failures are silently
/// ignored so a broken cache never prevents fresh downloads.
pub struct DiskCache {
    cache_dir: PathBuf,
    ttl_secs: u64,
    forever_prefix: Option<String>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct CacheEntry {
    url: String,
    content_type: Option<String>,
    #[serde(default)]
    cookies: Vec<String>,
    cached_at: u64,
    /// `None` for entries that never expire.
    ttl_secs: Option<u64>,
}

impl CacheEntry {
    fn is_expired(&self, now: u64) -> bool {
        self.ttl_secs
            .is_some_and(|ttl| now.saturating_sub(self.cached_at) > ttl)
    }
}

impl DiskCache {
    /// Opens (creating) a cache in `cache_dir`.
    ///
    /// On creation, expired entries are purged to prevent unbounded disk growth.
    pub fn new(cache_dir: impl Into<PathBuf>, ttl_secs: u64) -> Result<Self, std::io::Error> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        let cache = Self {
            cache_dir,
            ttl_secs,
            forever_prefix: None,
        };
        cache.purge_expired();
        Ok(cache)
    }

    /// Keeps responses for URLs starting with `prefix` forever.
    pub fn with_forever_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.forever_prefix = Some(prefix.into());
        self
    }

    /// Returns the cached response if the entry exists and has not expired.
    pub fn get(&self, url: &str) -> Option<FetchedResource> {
        let (meta_path, body_path) = self.key_to_paths(url);
        let content = fs::read_to_string(&meta_path).ok()?;
        let entry: CacheEntry = serde_json::from_str(&content).ok()?;
        if entry.url != url {
            return None;
        }
        if entry.is_expired(now_secs()?) {
            let _ = fs::remove_file(&meta_path);
            let _ = fs::remove_file(&body_path);
            return None;
        }
        let bytes = fs::read(&body_path).ok()?;
        Some(FetchedResource {
            bytes,
            content_type: entry.content_type,
            cookies: entry.cookies,
        })
    }

    /// Stores a response. Errors are silently ignored (cache is best-effort).
    pub fn set(&self, url: &str, resource: &FetchedResource) {
        let entry = CacheEntry {
            url: url.to_string(),
            content_type: resource.content_type.clone(),
            cookies: resource.cookies.clone(),
            cached_at: now_secs().unwrap_or_default(),
            ttl_secs: self.ttl_for(url),
        };
        let (meta_path, body_path) = self.key_to_paths(url);
        if fs::write(&body_path, &resource.bytes).is_err() {
            return;
        }
        if let Ok(json) = serde_json::to_string(&entry) {
            let _ = fs::write(meta_path, json);
        }
    }

    fn ttl_for(&self, url: &str) -> Option<u64> {
        match &self.forever_prefix {
            Some(prefix) if url.starts_with(prefix.as_str()) => None,
            _ => Some(self.ttl_secs),
        }
    }

    /// Removes all expired cache entries from disk.
    ///
    /// Called automatically on construction. Errors are silently ignored.
    fn purge_expired(&self) {
        let Some(now) = now_secs() else {
            return;
        };
        let Ok(dir) = fs::read_dir(&self.cache_dir) else {
            return;
        };

        for entry in dir.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(content) = fs::read_to_string(&path) {
                if let Ok(cached) = serde_json::from_str::<CacheEntry>(&content) {
                    if cached.is_expired(now) {
                        let _ = fs::remove_file(path.with_extension("body"));
                        let _ = fs::remove_file(&path);
                    }
                }
            }
        }
    }

    fn key_to_paths(&self, url: &str) -> (PathBuf, PathBuf) {
        let mut hasher = DefaultHasher::new();
        url.hash(&mut hasher);
        let stem = format!("{:016x}", hasher.finish());
        (
            self.cache_dir.join(format!("{}.json", stem)),
            self.cache_dir.join(format!("{}.body", stem)),
        )
    }
}

fn now_secs() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

// ---------------------------------------------------------------------------
// Cached source
// ---------------------------------------------------------------------------

/// A [`ResourceSource`] that answers from a [`DiskCache`] when it can.
pub struct CachedSource<S> {
    inner: S,
    cache: DiskCache,
}

impl<S: ResourceSource> CachedSource<S> {
    pub fn new(inner: S, cache: DiskCache) -> Self {
        Self { inner, cache }
    }
}

impl<S: ResourceSource> ResourceSource for CachedSource<S> {
    fn fetch(&self, url: &str) -> Result<FetchedResource, FetchFailure> {
        if let Some(cached) = self.cache.get(url) {
            log::debug!("Cache hit: {}", url);
            return Ok(cached);
        }

        log::debug!("Cache miss: {}", url);
        let fetched = self.inner.fetch(url)?;
        self.cache.set(url, &fetched);
        Ok(fetched)
    }
}
