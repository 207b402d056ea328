// src/fetch/mod.rs
//! Resource retrieval: the ability to turn a resource URL into bytes.
//!
//! The crawl depends on [`ResourceSource`] and [`VideoBackend`], never on
//! HTTP or subprocess details, so tests drive the walk with stubs.

mod allow_list;
mod cache;
mod client;
mod media;
mod video;

pub use allow_list::{AllowListDecision, UrlAllowList};
pub use cache::{CachedSource, DiskCache};
pub use client::HttpFetcher;
pub use media::{confirm_token, fetch_drive_pdf, fetch_image, fetch_pdf, is_pdf_content_type};
pub use video::{
    select_format, validate_video_url, DownloadRequest, DownloadedVideo, VideoBackend,
    VideoFetcher, VideoFormat, VideoInfo, VideoOutcome, VideoSettings, YtDlpBackend,
};

use crate::error::FetchFailure;

/// A successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
    pub bytes: Vec<u8>,
    /// `Content-Type` header as sent, parameters included.
    pub content_type: Option<String>,
    /// Raw `Set-Cookie` header values.
    pub cookies: Vec<String>,
}

impl FetchedResource {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.map(str::to_string),
            cookies: Vec::new(),
        }
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookies.push(cookie.into());
        self
    }

    /// Media type without parameters, lowercased.
    pub fn media_type(&self) -> Option<String> {
        self.content_type.as_deref().map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or(value)
                .trim()
                .to_ascii_lowercase()
        })
    }
}

/// The ability to download a URL.
///
/// Non-success statuses are failures; a successful response is returned
/// whatever its content type.
pub trait ResourceSource {
    fn fetch(&self, url: &str) -> Result<FetchedResource, FetchFailure>;
}

impl<S: ResourceSource + ?Sized> ResourceSource for &S {
    fn fetch(&self, url: &str) -> Result<FetchedResource, FetchFailure> {
        (**self).fetch(url)
    }
}

impl<S: ResourceSource + ?Sized> ResourceSource for Box<S> {
    fn fetch(&self, url: &str) -> Result<FetchedResource, FetchFailure> {
        (**self).fetch(url)
    }
}
