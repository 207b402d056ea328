// src/pipeline.rs
//! Pipeline capability traits for the three stages of a run:
//! crawl, normalize, deliver.
//!
//! Each trait describes a single capability, enabling testing each stage in isolation.

use crate::error::AppError;
use crate::output::OutputReport;
use crate::tree::{ChannelTree, CrawlOutcome, NormalizeSummary};

/// Builds a channel tree from the configured repositories.
pub trait ChannelSource {
    fn crawl(&self) -> Result<CrawlOutcome, AppError>;
}

/// Collapses redundant structure in a built tree.
pub trait TreeNormalizer {
    fn normalize(&self, tree: &mut ChannelTree) -> NormalizeSummary;
}

/// Writes the tree and the run state to their destinations.
pub trait ChannelDelivery {
    fn deliver(&self, outcome: &CrawlOutcome) -> Result<OutputReport, AppError>;
}
