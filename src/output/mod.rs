// src/output/mod.rs
//! Output handling with clear separation of planning and execution.
//!
//! Path arithmetic for bundles, PDFs and the tree file is pure. Writing the
//! channel tree and the allow-lists goes through an [`OutputPlan`] that
//! [`deliver`] executes.

mod paths;
mod types;
mod writer;

pub use paths::{
    archive_name_for, disambiguate_name, get_relative_path, mirror_dir, name_from_url,
    sanitize_filename,
};
pub use types::{CompletedOperation, DeliveryTarget, FailedOperation, OutputPlan, OutputReport};
pub use writer::{deliver, prepare_output_dir};
