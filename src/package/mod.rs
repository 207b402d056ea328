//! Bundle packaging: the rendered page, its static assets and its resources
//! in one zip archive.

mod archive;
mod template;

pub use archive::HtmlZipWriter;
pub use template::{PageContent, PageRenderer, SCRIPT_ENTRY, STYLESHEET_ENTRY};
