// src/lib.rs
//! md2channel library, which crawls Markdown curriculum repositories into a
//! channel tree of HTML bundles, PDFs and videos.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `FetchFailure`, `ConvertError`, `ValidationError`
//! - **Configuration**: `CommandLineInput`, `CrawlConfig`, `Capabilities`
//! - **Channel tree**: `ChannelTree`, `TreeBuilder`, `UrlMapper`, `normalize`
//! - **Documents**: `DocumentConverter`, `extract`, `read_menu`
//! - **Fetching**: `ResourceSource`, `HttpFetcher`, `VideoFetcher`, `DiskCache`

pub mod analytics;
pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod error_recovery;
pub mod fetch;
pub mod html;
pub mod output;
pub mod package;
pub mod pipeline;
pub mod repository;
pub mod tree;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, ConvertError, FetchFailure};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{Capabilities, CommandLineInput, CrawlConfig};
pub use crate::repository::{resolve_repository, RepositorySelector};

// --- Domain Types ---
pub use crate::types::{
    IssueKind, Language, License, LogicalUrl, ValidatedUrl, Warning, WarningLevel,
};

// --- Channel Tree ---
pub use crate::tree::{
    normalize, render_channel_json, BuildSettings, ChannelInfo, ChannelTree, ContentItem,
    ContentKind, CrawlOutcome, CrawlReport, NormalizeSummary, ParentRef, RunContext,
    TreeBuilder, UrlMapper,
};

// --- Documents ---
pub use crate::document::{Document, DocumentConverter, Resource, ResourceKind};

// --- Fetching ---
pub use crate::fetch::{
    CachedSource, DiskCache, FetchedResource, HttpFetcher, ResourceSource, UrlAllowList,
    VideoBackend, VideoFetcher, YtDlpBackend,
};

// --- Pipeline Traits ---
pub use crate::pipeline::{ChannelDelivery, ChannelSource, TreeNormalizer};
