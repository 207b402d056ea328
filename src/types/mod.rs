//! Domain newtypes shared by every stage of the crawl.

use thiserror::Error;

mod domain_types;
mod logical_url;

pub use domain_types::*;
pub use logical_url::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),

    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),

    #[error("Value out of bounds: {value}, expected {min}..={max}")]
    OutOfBounds { value: u32, min: u32, max: u32 },

    #[error("Invalid repository selector: {selector} - {reason}")]
    InvalidRepository { selector: String, reason: String },
}
