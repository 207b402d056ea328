// src/tree/mod.rs
//! The channel tree: how it is keyed, built, normalized and serialized.

mod builder;
mod channel_tree;
mod json;
mod mapper;
mod normalize;
mod report;

pub use builder::{BuildSettings, CrawlOutcome, RunContext, TreeBuilder};
pub use channel_tree::{
    ChannelInfo, ChannelTree, ContentItem, ContentKind, ContentOrigin, FileEntry, FileType,
    NodeId, ParentRef, Topic, TreeNode,
};
pub use json::{channel_document, render_channel_json, truncate_chars, ChannelDocument};
pub use mapper::{Level, UrlMapper};
pub use normalize::{normalize, NormalizeSummary};
pub use report::CrawlReport;
