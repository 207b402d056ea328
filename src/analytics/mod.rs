// src/analytics/mod.rs
//! Shape measurements of a built channel tree.

use crate::tree::{ChannelTree, ContentKind, NodeId, ParentRef, TreeNode};

/// Quick statistics for the completion message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSummary {
    pub topics: usize,
    pub content_items: usize,
    pub deepest_nesting: usize,
}

/// Detailed breakdown for verbose runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeMeasurement {
    pub topics: usize,
    pub bundles: usize,
    pub documents: usize,
    pub videos: usize,
    pub deepest_nesting: usize,
    /// Topics without any children; the walk leaves these behind for
    /// directories whose documents all failed.
    pub empty_topics: usize,
}

impl TreeMeasurement {
    pub fn content_items(&self) -> usize {
        self.bundles + self.documents + self.videos
    }
}

/// Measures the reachable part of `tree`.
pub fn measure_tree(tree: &ChannelTree) -> TreeSummary {
    let detailed = measure_tree_detailed(tree);
    TreeSummary {
        topics: detailed.topics,
        content_items: detailed.content_items(),
        deepest_nesting: detailed.deepest_nesting,
    }
}

pub fn measure_tree_detailed(tree: &ChannelTree) -> TreeMeasurement {
    let mut metrics = TreeMeasurement::default();
    for &id in tree.children_of(ParentRef::Root) {
        walk_node(tree, id, 1, &mut metrics);
    }
    metrics
}

fn walk_node(tree: &ChannelTree, id: NodeId, depth: usize, metrics: &mut TreeMeasurement) {
    metrics.deepest_nesting = metrics.deepest_nesting.max(depth);
    match tree.node(id) {
        TreeNode::Topic(topic) => {
            metrics.topics += 1;
            if topic.children.is_empty() {
                metrics.empty_topics += 1;
            }
            for &child in &topic.children {
                walk_node(tree, child, depth + 1, metrics);
            }
        }
        TreeNode::Content(item) => match item.kind {
            ContentKind::Html5 => metrics.bundles += 1,
            ContentKind::Document => metrics.documents += 1,
            ContentKind::Video => metrics.videos += 1,
        },
    }
}
