//! Markdown rendering and the owned HTML tree documents are rewritten in.

mod dom;
mod escape;
mod markdown;

pub use dom::{Element, HtmlDocument, HtmlNode};
pub use escape::{escape_attr, unescape};
pub use markdown::{markdown_to_html, MarkdownOptions};
