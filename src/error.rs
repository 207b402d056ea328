// src/error.rs
//! Application error types with structured error handling.
//!
//! Two families live here. [`AppError`] is the vocabulary of failures that
//! stop a run: configuration that cannot be resolved and I/O that cannot be
//! recovered from. [`FetchFailure`] and [`ConvertError`] describe failures of
//! a single resource or document; the tree builder logs them, records a
//! warning and keeps walking.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Cannot resolve repository '{selector}': {reason}")]
    UnresolvableRepository { selector: String, reason: String },

    #[error("Output directory {path} is not writable: {source}")]
    OutputNotWritable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error for {path}: {source}")]
    JsonFile {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Template render error for template {name}: {message}")]
    Template { name: String, message: String },

    #[error("Output delivery failed: {}", failures.join(", "))]
    DeliveryFailed { failures: Vec<String> },

    #[error(transparent)]
    Validation(#[from] crate::types::ValidationError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

// Allow converting from anyhow::Error, preserving the message
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
            source: None,
        }
    }
}

/// Why a single resource could not be fetched.
///
/// Every variant is recoverable at the level of the crawl: the resource is
/// omitted from its node and the walk continues. The variant decides whether
/// the fetcher should try again first.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchFailure {
    /// The server (or the local checkout) has no such resource.
    NotFound { url: String },

    /// Connection-level failure: DNS, refused connection, reset stream.
    Network { url: String, message: String },

    /// The request did not complete in time.
    Timeout { url: String },

    /// The redirect chain was too long or looped.
    TooManyRedirects { url: String },

    /// The server answered with a non-success status other than 404.
    HttpStatus { url: String, status: u16 },

    /// The response was fine but not the kind of content the resource claims
    /// to be (an HTML page behind a `.pdf` link).
    UnsupportedContentType {
        url: String,
        content_type: Option<String>,
    },

    /// The video backend reported a failure.
    Extractor {
        url: String,
        message: String,
        /// Unavailable, removed or private videos never come back.
        terminal: bool,
    },

    /// The URL was rejected before any network call.
    Rejected { url: String, reason: String },

    /// Writing the downloaded bytes to disk failed.
    LocalIo { path: PathBuf, message: String },
}

impl FetchFailure {
    /// Returns `true` if this failure is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => matches!(status, 408 | 429 | 500..=599),
            Self::Extractor { terminal, .. } => !terminal,
            _ => false,
        }
    }

    /// Returns `true` if the resource will never be fetchable.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::Rejected { .. } => true,
            Self::Extractor { terminal, .. } => *terminal,
            _ => false,
        }
    }

    /// The URL (or path) the failure is about.
    pub fn locator(&self) -> String {
        match self {
            Self::NotFound { url }
            | Self::Network { url, .. }
            | Self::Timeout { url }
            | Self::TooManyRedirects { url }
            | Self::HttpStatus { url, .. }
            | Self::UnsupportedContentType { url, .. }
            | Self::Extractor { url, .. }
            | Self::Rejected { url, .. } => url.clone(),
            Self::LocalIo { path, .. } => path.display().to_string(),
        }
    }

    /// Classifies a transport error from reqwest into the failure vocabulary.
    pub fn from_transport(url: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if err.is_redirect() {
            Self::TooManyRedirects {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::from_status(url, status.as_u16())
        } else {
            Self::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// Classifies a non-success HTTP status.
    pub fn from_status(url: &str, status: u16) -> Self {
        match status {
            404 | 410 => Self::NotFound {
                url: url.to_string(),
            },
            _ => Self::HttpStatus {
                url: url.to_string(),
                status,
            },
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { url } => write!(f, "Not found: {}", url),
            Self::Network { url, message } => write!(f, "Network error for {}: {}", url, message),
            Self::Timeout { url } => write!(f, "Timed out: {}", url),
            Self::TooManyRedirects { url } => write!(f, "Too many redirects: {}", url),
            Self::HttpStatus { url, status } => write!(f, "HTTP {} for {}", status, url),
            Self::UnsupportedContentType { url, content_type } => write!(
                f,
                "Unsupported content type {} for {}",
                content_type.as_deref().unwrap_or("<none>"),
                url
            ),
            Self::Extractor {
                url,
                message,
                terminal,
            } => {
                write!(f, "Video extractor error for {}: {}", url, message)?;
                if *terminal {
                    write!(f, " (unavailable)")?;
                }
                Ok(())
            }
            Self::Rejected { url, reason } => write!(f, "Rejected {}: {}", url, reason),
            Self::LocalIo { path, message } => {
                write!(f, "Could not store {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for FetchFailure {}

/// Why a single document could not be converted.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Document not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Could not parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Could not package {}: {source}", path.display())]
    Package {
        path: PathBuf,
        #[source]
        source: AppError,
    },
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;
