// src/tree/normalize.rs
//! Collapses topics that only wrap a single content item.
//!
//! One pass hoists one level. Eligibility is taken from the tree as it stood
//! when the pass began, so a topic that becomes a single-child wrapper
//! because of this pass is left for the next one.

use super::channel_tree::{ChannelTree, NodeId, ParentRef, TreeNode};
use std::collections::HashMap;

/// Outcome of one normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeSummary {
    pub hoisted: usize,
    pub renamed: usize,
}

/// Runs one bottom-up collapse pass over `tree`.
pub fn normalize(tree: &mut ChannelTree) -> NormalizeSummary {
    let topics = tree.reachable_topics();

    // Eligible topic → its sole content child, decided before any rewrite.
    let eligible: HashMap<NodeId, NodeId> = topics
        .iter()
        .filter_map(|&id| sole_content_child(tree, id).map(|child| (id, child)))
        .collect();

    if eligible.is_empty() {
        return NormalizeSummary::default();
    }

    let mut summary = NormalizeSummary::default();
    let mut parents: Vec<ParentRef> = topics.iter().rev().map(|&id| ParentRef::Node(id)).collect();
    parents.push(ParentRef::Root);

    for parent in parents {
        let children = tree.children_of(parent);
        if !children.iter().any(|child| eligible.contains_key(child)) {
            continue;
        }

        let mut rewritten = Vec::with_capacity(children.len());
        let mut hoisted = Vec::new();
        for &child in children {
            match eligible.get(&child) {
                Some(&leaf) => {
                    rewritten.push(leaf);
                    hoisted.push((child, leaf));
                }
                None => rewritten.push(child),
            }
        }
        tree.replace_children(parent, rewritten);

        for (former_parent, leaf) in hoisted {
            summary.hoisted += 1;
            if rename_hoisted(tree, former_parent, leaf) {
                summary.renamed += 1;
            }
            tree.forget_topic(former_parent);
        }
    }

    log::debug!(
        "Normalized tree: {} topics collapsed, {} leaves renamed",
        summary.hoisted,
        summary.renamed
    );
    summary
}

fn sole_content_child(tree: &ChannelTree, id: NodeId) -> Option<NodeId> {
    match tree.children_of(ParentRef::Node(id)) {
        [only] => match tree.node(*only) {
            TreeNode::Content(_) => Some(*only),
            TreeNode::Topic(_) => None,
        },
        _ => None,
    }
}

/// Prefixes a hoisted local bundle with its former parent's directory name.
fn rename_hoisted(tree: &mut ChannelTree, former_parent: NodeId, leaf: NodeId) -> bool {
    let Some(dir_name) = tree.topic(former_parent).map(|t| t.name.clone()) else {
        return false;
    };
    match tree.content_mut(leaf) {
        Some(item) if item.is_local_bundle() => {
            item.title = format!("{}: {}", dir_name, item.title);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::channel_tree::{
        ChannelInfo, ContentItem, ContentKind, ContentOrigin, FileEntry, FileType,
    };
    use crate::tree::mapper::Level;
    use crate::types::{Language, License, LogicalUrl};
    use std::path::PathBuf;

    fn tree() -> ChannelTree {
        ChannelTree::new(ChannelInfo {
            source_domain: "github.com".to_string(),
            source_id: "repo".to_string(),
            title: "Repo".to_string(),
            description: String::new(),
            thumbnail: None,
            language: Language::new("es").unwrap(),
            license: License::new("CC BY-NC-SA", ""),
        })
    }

    fn bundle(title: &str) -> ContentItem {
        ContentItem {
            kind: ContentKind::Html5,
            source_id: format!("https://x.org/{}", title),
            title: title.to_string(),
            description: String::new(),
            language: Language::new("es").unwrap(),
            license: License::new("CC BY-NC-SA", ""),
            files: vec![FileEntry::new(FileType::Html5, "out/index.zip")],
            thumbnail: None,
            author: None,
            origin: ContentOrigin::Repository(PathBuf::from("repo/README.md")),
        }
    }

    fn level(url: &str, name: &str) -> Level {
        Level {
            url: LogicalUrl::parse(url),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_single_content_child_is_hoisted_and_renamed() {
        let mut tree = tree();
        let topic = tree.resolve_topic(&LogicalUrl::parse("https://x.org/01-a"), &[], "01-a");
        let leaf = tree.append_content(ParentRef::Node(topic), bundle("Intro"));

        let summary = normalize(&mut tree);

        assert_eq!(summary, NormalizeSummary { hoisted: 1, renamed: 1 });
        assert_eq!(tree.root_children(), &[leaf]);
        assert_eq!(tree.node(leaf).as_content().unwrap().title, "01-a: Intro");
        assert!(tree.find_topic(&LogicalUrl::parse("https://x.org/01-a")).is_none());
    }

    #[test]
    fn test_remote_leaf_keeps_title() {
        let mut tree = tree();
        let topic = tree.resolve_topic(&LogicalUrl::parse("https://x.org/01-a"), &[], "01-a");
        let mut pdf = bundle("guide.pdf");
        pdf.kind = ContentKind::Document;
        pdf.origin = ContentOrigin::Remote;
        let leaf = tree.append_content(ParentRef::Node(topic), pdf);

        normalize(&mut tree);

        assert_eq!(tree.node(leaf).as_content().unwrap().title, "guide.pdf");
    }

    #[test]
    fn test_chain_collapses_one_level_per_pass() {
        let mut tree = tree();
        let a = level("https://x.org/a", "a");
        let b = level("https://x.org/a/b", "b");
        let c = tree.resolve_topic(&LogicalUrl::parse("https://x.org/a/b/c"), &[a, b], "c");
        let leaf = tree.append_content(ParentRef::Node(c), bundle("Leaf"));

        let first = normalize(&mut tree);
        assert_eq!(first.hoisted, 1);
        let b_id = tree.find_topic(&LogicalUrl::parse("https://x.org/a/b")).unwrap();
        assert_eq!(tree.topic(b_id).unwrap().children, vec![leaf]);

        let second = normalize(&mut tree);
        assert_eq!(second.hoisted, 1);
        let a_id = tree.find_topic(&LogicalUrl::parse("https://x.org/a")).unwrap();
        assert_eq!(tree.topic(a_id).unwrap().children, vec![leaf]);
        assert_eq!(tree.node(leaf).as_content().unwrap().title, "b: c: Leaf");
    }

    #[test]
    fn test_normalized_tree_is_unchanged() {
        let mut tree = tree();
        let topic = tree.resolve_topic(&LogicalUrl::parse("https://x.org/01-a"), &[], "01-a");
        tree.append_content(ParentRef::Node(topic), bundle("One"));
        tree.append_content(ParentRef::Node(topic), bundle("Two"));
        tree.resolve_topic(&LogicalUrl::parse("https://x.org/02-b"), &[], "02-b");

        let before: Vec<TreeNode> = tree
            .reachable_topics()
            .iter()
            .map(|&id| tree.node(id).clone())
            .collect();
        let roots = tree.root_children().to_vec();

        assert_eq!(normalize(&mut tree), NormalizeSummary::default());

        let after: Vec<TreeNode> = tree
            .reachable_topics()
            .iter()
            .map(|&id| tree.node(id).clone())
            .collect();
        assert_eq!(before, after);
        assert_eq!(roots, tree.root_children());
    }
}
