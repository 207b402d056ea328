// src/tree/report.rs
//! What a crawl did and what it had to give up on.

use crate::error::{ConvertError, FetchFailure};
use crate::types::{IssueKind, Warning, WarningLevel};

/// Counters and recoverable failures of one crawl.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlReport {
    /// Markdown files converted
    pub documents: usize,
    /// HTML bundles written
    pub bundles: usize,
    pub images: usize,
    pub pdfs: usize,
    pub videos: usize,
    /// Videos probed without downloading
    pub metadata_only: usize,
    /// Media skipped because the allow-list does not approve them
    pub unapproved: usize,
    pub warnings: Vec<Warning>,
}

impl CrawlReport {
    /// Logs and records a recoverable failure.
    pub fn warn(&mut self, kind: IssueKind, message: impl Into<String>, context: impl Into<String>) {
        let warning = Warning::new(WarningLevel::Warning, kind, message).with_context(context);
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Records a resource that could not be fetched.
    pub fn fetch_failed(&mut self, failure: &FetchFailure, document: &str) {
        let kind = match failure {
            FetchFailure::Extractor { terminal: true, .. } => IssueKind::ExtractorFailure,
            _ => IssueKind::FetchFailure,
        };
        self.warn(kind, failure.to_string(), document);
    }

    /// Records a document that could not be converted or packaged.
    pub fn convert_failed(&mut self, error: &ConvertError) {
        let (kind, context) = match error {
            ConvertError::NotFound { path } => (IssueKind::SourceMissing, path),
            ConvertError::Parse { path, .. } => (IssueKind::ParseFailure, path),
            ConvertError::Package { path, .. } => (IssueKind::PackageFailure, path),
        };
        self.warn(kind, error.to_string(), context.display().to_string());
    }

    /// Adopts warnings recorded elsewhere.
    pub fn absorb(&mut self, warnings: &[Warning]) {
        self.warnings.extend_from_slice(warnings);
    }

    pub fn count_of(&self, kind: IssueKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }
}
