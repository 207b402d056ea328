// src/tree/json.rs
//! Serialized shape of the channel tree.
//!
//! The arena is projected into borrowed serde structs so the node shape of
//! the JSON file is spelled out in one place. File paths are written relative
//! to the directory holding the JSON file.

use super::channel_tree::{ChannelTree, ContentKind, FileType, NodeId, TreeNode};
use crate::constants::DESCRIPTION_MAX_CHARS;
use crate::error::AppError;
use crate::output::get_relative_path;
use crate::types::{Language, License};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct ChannelDocument<'a> {
    pub source_domain: &'a str,
    pub source_id: &'a str,
    pub title: &'a str,
    pub description: String,
    pub thumbnail: Option<String>,
    pub language: &'a Language,
    pub license: &'a License,
    pub children: Vec<NodeDocument<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum NodeDocument<'a> {
    Topic(TopicDocument<'a>),
    Content(ContentDocument<'a>),
}

#[derive(Debug, Serialize)]
pub struct TopicDocument<'a> {
    pub kind: &'static str,
    pub source_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub language: &'a Language,
    pub children: Vec<NodeDocument<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ContentDocument<'a> {
    pub kind: ContentKind,
    pub source_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub language: &'a Language,
    pub license: &'a License,
    pub files: Vec<FileDocument<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct FileDocument<'a> {
    pub file_type: FileType,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<&'a Language>,
}

/// Projects `tree` into its serialized shape, paths relative to `json_dir`.
pub fn channel_document<'a>(tree: &'a ChannelTree, json_dir: &Path) -> ChannelDocument<'a> {
    let info = tree.info();
    ChannelDocument {
        source_domain: &info.source_domain,
        source_id: &info.source_id,
        title: &info.title,
        description: truncate_chars(&info.description, DESCRIPTION_MAX_CHARS),
        thumbnail: info
            .thumbnail
            .as_deref()
            .map(|p| get_relative_path(json_dir, p)),
        language: &info.language,
        license: &info.license,
        children: project_children(tree, tree.root_children(), json_dir),
    }
}

/// Renders the tree as pretty-printed JSON.
pub fn render_channel_json(tree: &ChannelTree, json_dir: &Path) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(&channel_document(tree, json_dir))?)
}

fn project_children<'a>(
    tree: &'a ChannelTree,
    children: &[NodeId],
    json_dir: &Path,
) -> Vec<NodeDocument<'a>> {
    children
        .iter()
        .map(|&id| project_node(tree, id, json_dir))
        .collect()
}

fn project_node<'a>(tree: &'a ChannelTree, id: NodeId, json_dir: &Path) -> NodeDocument<'a> {
    match tree.node(id) {
        TreeNode::Topic(topic) => NodeDocument::Topic(TopicDocument {
            kind: "topic",
            source_id: topic.url.as_str(),
            title: &topic.title,
            description: &topic.description,
            language: &topic.language,
            children: project_children(tree, &topic.children, json_dir),
        }),
        TreeNode::Content(item) => NodeDocument::Content(ContentDocument {
            kind: item.kind,
            source_id: &item.source_id,
            title: &item.title,
            description: &item.description,
            language: &item.language,
            license: &item.license,
            files: item
                .files
                .iter()
                .map(|file| FileDocument {
                    file_type: file.file_type,
                    path: get_relative_path(json_dir, &file.path),
                    language: file.language.as_ref(),
                })
                .collect(),
            thumbnail: item
                .thumbnail
                .as_deref()
                .map(|p| get_relative_path(json_dir, p)),
            author: item.author.as_deref(),
        }),
    }
}

/// First `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::channel_tree::{
        ChannelInfo, ContentItem, ContentOrigin, FileEntry, ParentRef,
    };
    use crate::types::LogicalUrl;
    use std::path::PathBuf;

    fn sample_tree() -> ChannelTree {
        let language = Language::new("es").unwrap();
        let license = License::new("CC BY-NC-SA", "Laboratoria");
        let mut tree = ChannelTree::new(ChannelInfo {
            source_domain: "github.com".to_string(),
            source_id: "curricula-js".to_string(),
            title: "Curricula JS".to_string(),
            description: "x".repeat(450),
            thumbnail: None,
            language: language.clone(),
            license: license.clone(),
        });
        let topic = tree.resolve_topic(
            &LogicalUrl::parse("https://github.com/Laboratoria/curricula-js/01-intro"),
            &[],
            "01-intro",
        );
        tree.append_content(
            ParentRef::Node(topic),
            ContentItem {
                kind: ContentKind::Document,
                source_id: "https://x.org/guide.pdf".to_string(),
                title: "guide.pdf".to_string(),
                description: String::new(),
                language,
                license,
                files: vec![FileEntry::new(
                    FileType::Document,
                    "chefdata/content/01-intro/pdfs/guide.pdf",
                )],
                thumbnail: None,
                author: None,
                origin: ContentOrigin::Remote,
            },
        );
        tree
    }

    #[test]
    fn test_channel_json_shape() {
        let tree = sample_tree();
        let value =
            serde_json::to_value(channel_document(&tree, &PathBuf::from("chefdata/content")))
                .unwrap();

        assert_eq!(value["source_domain"], "github.com");
        assert_eq!(value["description"].as_str().unwrap().chars().count(), 400);
        assert_eq!(value["license"]["license_id"], "CC BY-NC-SA");

        let topic = &value["children"][0];
        assert_eq!(topic["kind"], "topic");
        assert_eq!(topic["title"], "01-intro");

        let pdf = &topic["children"][0];
        assert_eq!(pdf["kind"], "document");
        assert_eq!(pdf["files"][0]["file_type"], "document");
        assert_eq!(pdf["files"][0]["path"], "01-intro/pdfs/guide.pdf");
        assert!(pdf.get("author").is_none());
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("añoño", 2), "añ");
        assert_eq!(truncate_chars("short", 400), "short");
    }
}
