// src/tree/channel_tree.rs
//! Arena-backed channel tree with URL-keyed lookup-or-create.
//!
//! The assembly story reads as three named steps:
//!   1. Resolve the topic for a directory URL, creating missing ancestors
//!   2. Claim a placeholder topic once its directory's README is visited
//!   3. Append content items to the resolved topic
//!
//! Nodes live in one `Vec` and are addressed by [`NodeId`]. The index maps
//! each canonical [`LogicalUrl`] to its single topic, so a topic requested
//! before its structural parent was visited is still found later.

use super::mapper::Level;
use crate::types::{IssueKind, Language, License, LogicalUrl, Warning, WarningLevel};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Where a node hangs: the channel root or another topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    Root,
    Node(NodeId),
}

/// Kind of a content node in the channel JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Document,
    Html5,
    Video,
}

/// Kind of a file attached to a content node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Document,
    Html5,
    Video,
    Subtitles,
}

/// One file attached to a content node.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub file_type: FileType,
    pub path: PathBuf,
    pub language: Option<Language>,
}

impl FileEntry {
    pub fn new(file_type: FileType, path: impl Into<PathBuf>) -> Self {
        Self {
            file_type,
            path: path.into(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }
}

/// Where a content item's bytes came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentOrigin {
    /// A document of the repository checkout.
    Repository(PathBuf),
    /// A resource downloaded from a remote URL.
    Remote,
}

/// A packaged document or media item.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub kind: ContentKind,
    pub source_id: String,
    pub title: String,
    pub description: String,
    pub language: Language,
    pub license: License,
    pub files: Vec<FileEntry>,
    pub thumbnail: Option<PathBuf>,
    pub author: Option<String>,
    pub origin: ContentOrigin,
}

impl ContentItem {
    /// Whether this is an HTML bundle built from a repository document.
    pub fn is_local_bundle(&self) -> bool {
        self.kind == ContentKind::Html5 && matches!(self.origin, ContentOrigin::Repository(_))
    }
}

/// A folder-level grouping keyed by its canonical URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub url: LogicalUrl,
    /// On-disk directory name.
    pub name: String,
    pub title: String,
    pub description: String,
    pub language: Language,
    pub children: Vec<NodeId>,
    /// Still titled after its directory name.
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Topic(Topic),
    Content(ContentItem),
}

impl TreeNode {
    pub fn as_topic(&self) -> Option<&Topic> {
        match self {
            TreeNode::Topic(topic) => Some(topic),
            TreeNode::Content(_) => None,
        }
    }

    pub fn as_content(&self) -> Option<&ContentItem> {
        match self {
            TreeNode::Content(item) => Some(item),
            TreeNode::Topic(_) => None,
        }
    }
}

/// Root metadata of the channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    pub source_domain: String,
    pub source_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: Option<PathBuf>,
    pub language: Language,
    pub license: License,
}

/// The output hierarchy of one crawl run.
#[derive(Debug, Clone)]
pub struct ChannelTree {
    info: ChannelInfo,
    nodes: Vec<TreeNode>,
    /// Topics indexed by their canonical URL
    index: IndexMap<LogicalUrl, NodeId>,
    /// Children of the channel root, in insertion order
    root_children: Vec<NodeId>,
    warnings: Vec<Warning>,
}

impl ChannelTree {
    /// Creates an empty tree under the given channel metadata.
    pub fn new(info: ChannelInfo) -> Self {
        Self::with_capacity(info, 128)
    }

    /// Creates an empty tree with a capacity hint.
    pub fn with_capacity(info: ChannelInfo, expected_nodes: usize) -> Self {
        Self {
            info,
            nodes: Vec::with_capacity(expected_nodes),
            index: IndexMap::with_capacity(expected_nodes / 2),
            root_children: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn info(&self) -> &ChannelInfo {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut ChannelInfo {
        &mut self.info
    }

    pub fn root_children(&self) -> &[NodeId] {
        &self.root_children
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn topic(&self, id: NodeId) -> Option<&Topic> {
        self.nodes.get(id.0).and_then(TreeNode::as_topic)
    }

    /// Looks up the topic registered for `url`.
    pub fn find_topic(&self, url: &LogicalUrl) -> Option<NodeId> {
        self.index.get(url).copied()
    }

    /// Number of distinct topic URLs registered.
    pub fn topic_count(&self) -> usize {
        self.index.len()
    }

    /// Children of a parent, root included.
    pub fn children_of(&self, parent: ParentRef) -> &[NodeId] {
        match parent {
            ParentRef::Root => &self.root_children,
            ParentRef::Node(id) => match &self.nodes[id.0] {
                TreeNode::Topic(topic) => &topic.children,
                TreeNode::Content(_) => &[],
            },
        }
    }

    /// Consistency warnings recorded while resolving topics.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    // --- Resolution: the single mutation point for topics ---

    /// Returns the topic for `url`, creating it and any missing ancestors.
    ///
    /// `levels` are the strict ancestors of `url`, outermost first. A new
    /// topic is appended to the topic of the nearest level, or to the root
    /// when there are none. A new topic starts as a placeholder titled `name`.
    pub fn resolve_topic(&mut self, url: &LogicalUrl, levels: &[Level], name: &str) -> NodeId {
        if let Some(existing) = self.find_topic(url) {
            return existing;
        }

        let parent = match levels.split_last() {
            None => ParentRef::Root,
            Some((nearest, outer)) if url.is_descendant_of(&nearest.url) => {
                ParentRef::Node(self.resolve_topic(&nearest.url, outer, &nearest.name))
            }
            Some((nearest, _)) => {
                log::warn!(
                    "Level {} is not an ancestor of {}; attaching to the channel root",
                    nearest.url,
                    url
                );
                self.warnings.push(
                    Warning::new(
                        WarningLevel::Warning,
                        IssueKind::TreeConsistencyViolation,
                        format!("parent level {} cannot hold {}", nearest.url, url),
                    )
                    .with_context(url.to_string()),
                );
                ParentRef::Root
            }
        };

        let topic = Topic {
            url: url.clone(),
            name: name.to_string(),
            title: name.to_string(),
            description: String::new(),
            language: self.info.language.clone(),
            children: Vec::new(),
            placeholder: true,
        };
        let id = self.push_node(TreeNode::Topic(topic), parent);
        self.index.insert(url.clone(), id);
        log::debug!("Created topic '{}' at {}", name, url);
        id
    }

    /// Retitles a placeholder topic from its directory's representative document.
    ///
    /// Only the first claim takes effect; later documents of the same
    /// directory leave the title alone.
    pub fn claim_topic(&mut self, id: NodeId, title: &str, description: &str) {
        if let Some(TreeNode::Topic(topic)) = self.nodes.get_mut(id.0) {
            if topic.placeholder {
                log::debug!("Titling topic {} as '{}'", topic.url, title);
                topic.title = title.to_string();
                topic.description = description.to_string();
                topic.placeholder = false;
            }
        }
    }

    /// Appends a content item under `parent`.
    pub fn append_content(&mut self, parent: ParentRef, item: ContentItem) -> NodeId {
        log::debug!("Appending {:?} '{}'", item.kind, item.title);
        self.push_node(TreeNode::Content(item), parent)
    }

    fn push_node(&mut self, node: TreeNode, parent: ParentRef) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        match parent {
            ParentRef::Root => self.root_children.push(id),
            ParentRef::Node(parent_id) => match &mut self.nodes[parent_id.0] {
                TreeNode::Topic(topic) => topic.children.push(id),
                TreeNode::Content(_) => self.root_children.push(id),
            },
        }
        id
    }

    // --- Rewriting: used by the normalizer after the build ---

    pub(super) fn replace_children(&mut self, parent: ParentRef, children: Vec<NodeId>) {
        match parent {
            ParentRef::Root => self.root_children = children,
            ParentRef::Node(id) => {
                if let TreeNode::Topic(topic) = &mut self.nodes[id.0] {
                    topic.children = children;
                }
            }
        }
    }

    pub(super) fn content_mut(&mut self, id: NodeId) -> Option<&mut ContentItem> {
        match self.nodes.get_mut(id.0) {
            Some(TreeNode::Content(item)) => Some(item),
            _ => None,
        }
    }

    /// Drops a topic from the URL index once it is no longer reachable.
    pub(super) fn forget_topic(&mut self, id: NodeId) {
        if let Some(TreeNode::Topic(topic)) = self.nodes.get(id.0) {
            let url = topic.url.clone();
            self.index.shift_remove(&url);
        }
    }

    /// Every topic reachable from the root, parents before children.
    pub fn reachable_topics(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack: Vec<NodeId> = self.root_children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let TreeNode::Topic(topic) = &self.nodes[id.0] {
                order.push(id);
                stack.extend(topic.children.iter().rev().copied());
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::mapper::UrlMapper;
    use crate::types::ValidatedUrl;
    use std::path::Path;

    fn info() -> ChannelInfo {
        ChannelInfo {
            source_domain: "github.com".to_string(),
            source_id: "curricula-js".to_string(),
            title: "Curricula".to_string(),
            description: String::new(),
            thumbnail: None,
            language: Language::new("es").unwrap(),
            license: License::new("CC BY-NC-SA", "Laboratoria"),
        }
    }

    fn mapper() -> UrlMapper {
        let base = ValidatedUrl::parse("https://github.com/Laboratoria/curricula-js").unwrap();
        UrlMapper::new("/repo", &base)
    }

    fn resolve(tree: &mut ChannelTree, mapper: &UrlMapper, path: &str) -> NodeId {
        let path = Path::new(path);
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        tree.resolve_topic(&mapper.url_of(path), &mapper.levels_of(path), &name)
    }

    #[test]
    fn test_child_before_parent_creates_parent_once() {
        let mapper = mapper();
        let mut tree = ChannelTree::new(info());

        let deep = resolve(&mut tree, &mapper, "/repo/01-a/02-b");
        let parent = resolve(&mut tree, &mapper, "/repo/01-a");

        assert_eq!(tree.topic_count(), 2);
        assert_eq!(tree.root_children(), &[parent]);
        assert_eq!(tree.topic(parent).unwrap().children, vec![deep]);
        assert!(tree.warnings().is_empty());
    }

    #[test]
    fn test_resolve_is_lookup_or_create() {
        let mapper = mapper();
        let mut tree = ChannelTree::new(info());

        let first = resolve(&mut tree, &mapper, "/repo/01-a");
        let second = resolve(&mut tree, &mapper, "/repo/01-a/");
        assert_eq!(first, second);
        assert_eq!(tree.root_children().len(), 1);
    }

    #[test]
    fn test_claim_retitles_placeholder_once() {
        let mapper = mapper();
        let mut tree = ChannelTree::new(info());
        let id = resolve(&mut tree, &mapper, "/repo/01-a");

        assert!(tree.topic(id).unwrap().placeholder);
        tree.claim_topic(id, "Fundamentos", "intro");
        tree.claim_topic(id, "Other", "ignored");

        let topic = tree.topic(id).unwrap();
        assert_eq!(topic.title, "Fundamentos");
        assert_eq!(topic.description, "intro");
        assert!(!topic.placeholder);
    }

    #[test]
    fn test_foreign_level_attaches_to_root() {
        let mut tree = ChannelTree::new(info());
        let url = LogicalUrl::parse("https://x.org/a/b");
        let levels = vec![Level {
            url: LogicalUrl::parse("https://y.org/z"),
            name: "z".to_string(),
        }];

        let id = tree.resolve_topic(&url, &levels, "b");

        assert_eq!(tree.root_children(), &[id]);
        assert_eq!(tree.warnings().len(), 1);
        assert_eq!(
            tree.warnings()[0].kind,
            IssueKind::TreeConsistencyViolation
        );
    }
}
