// tests/common/mod.rs
//! Shared fixtures: an in-memory network, a fake video backend and a small
//! curriculum checkout written to a temporary directory.

#![allow(dead_code)]

use md2channel::config::Capabilities;
use md2channel::document::DocumentConverter;
use md2channel::error::FetchFailure;
use md2channel::error_recovery::RetryPolicy;
use md2channel::fetch::{
    DownloadRequest, DownloadedVideo, FetchedResource, ResourceSource, VideoBackend,
    VideoFetcher, VideoInfo, VideoSettings,
};
use md2channel::tree::{
    BuildSettings, ChannelInfo, ChannelTree, CrawlOutcome, CrawlReport, NodeId, ParentRef,
    RunContext, TreeBuilder, TreeNode,
};
use md2channel::types::{Language, License, ValidatedUrl};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const BASE_URL: &str = "https://github.com/Laboratoria/";
pub const REPO: &str = "curricula-js";

/// Serves canned responses; unknown URLs are 404s.
#[derive(Default)]
pub struct StubSource {
    responses: HashMap<String, FetchedResource>,
    pub requests: RefCell<Vec<String>>,
}

impl StubSource {
    pub fn with(mut self, url: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.responses.insert(
            url.to_string(),
            FetchedResource::new(bytes.to_vec(), Some(content_type)),
        );
        self
    }
}

impl ResourceSource for StubSource {
    fn fetch(&self, url: &str) -> Result<FetchedResource, FetchFailure> {
        self.requests.borrow_mut().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| FetchFailure::NotFound {
                url: url.to_string(),
            })
    }
}

/// Every video is "Clase <id>" and downloads as a few bytes.
#[derive(Default)]
pub struct StubVideos {
    pub downloads: RefCell<Vec<String>>,
}

impl VideoBackend for StubVideos {
    fn probe(&self, url: &str) -> Result<VideoInfo, FetchFailure> {
        let id = url.rsplit('=').next().unwrap_or(url).to_string();
        Ok(VideoInfo {
            title: format!("Clase {}", id),
            uploader: Some("Laboratoria".to_string()),
            id,
            ..VideoInfo::default()
        })
    }

    fn download(
        &self,
        url: &str,
        request: &DownloadRequest,
    ) -> Result<DownloadedVideo, FetchFailure> {
        self.downloads.borrow_mut().push(url.to_string());
        fs::write(&request.target, b"video").unwrap();
        Ok(DownloadedVideo {
            path: request.target.clone(),
            subtitles: Vec::new(),
        })
    }
}

pub fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A checkout with a menu README, one unit with media, a nested lesson and
/// a unit whose only PDF link serves HTML.
pub fn curriculum(root: &Path) -> PathBuf {
    let repo = root.join(REPO);
    write(
        &repo.join("README.md"),
        "# Curricula JS\n\nCurrículo de JavaScript.\n\n\
         ### [Introducción](01-intro)\n\n### [Setup](02-setup/README.md)\n\n\
         ## Copyright\n\nLaboratoria 2017\n",
    );
    write(&repo.join("CONTRIBUTING.md"), "# Contributing\n");
    write(&repo.join("00-template/README.md"), "# Template\n");
    write(
        &repo.join("01-intro/README.md"),
        "# Introducción\n\nPrimera unidad.\n\n![logo](logo.png)\n\n\
         [Guía](https://example.org/guide.pdf)\n\n\
         [Video](https://youtu.be/ABC123)\n\n\
         <iframe src=\"https://www.youtube.com/embed/ABC123\"></iframe>\n",
    );
    fs::write(repo.join("01-intro/logo.png"), b"\x89PNG").unwrap();
    write(
        &repo.join("01-intro/01-history/README.md"),
        "# Historia\n\nSolo una lección.\n",
    );
    write(
        &repo.join("02-setup/README.md"),
        "# Setup\n\nInstalar.\n\n![remote](https://example.org/missing.png)\n\n\
         [Notas](https://example.org/notes.pdf)\n",
    );
    repo
}

pub fn network() -> StubSource {
    StubSource::default()
        .with(
            "https://example.org/guide.pdf",
            "application/pdf",
            b"%PDF-1.4",
        )
        .with(
            "https://example.org/notes.pdf",
            "text/html; charset=utf-8",
            b"<html>login</html>",
        )
}

pub fn channel_info() -> ChannelInfo {
    ChannelInfo {
        source_domain: "github.com".to_string(),
        source_id: REPO.to_string(),
        title: String::new(),
        description: String::new(),
        thumbnail: None,
        language: Language::new("es").unwrap(),
        license: License::new("CC BY-NC-SA", ""),
    }
}

/// Crawls `repos` into `output_dir` with every capability on.
pub fn crawl(
    repos: &[PathBuf],
    output_dir: &Path,
    source: &dyn ResourceSource,
    videos: &dyn VideoBackend,
) -> CrawlOutcome {
    let language = Language::new("es").unwrap();
    let ctx = RunContext {
        settings: BuildSettings {
            base_url: ValidatedUrl::parse(BASE_URL).unwrap(),
            output_dir: output_dir.to_path_buf(),
            language: language.clone(),
            capabilities: Capabilities {
                multi_repo: repos.len() > 1,
                ..Capabilities::default()
            },
        },
        source,
        videos: VideoFetcher::new(
            videos,
            VideoSettings {
                max_height: 480,
                container: "mp4".to_string(),
                download: true,
            },
            RetryPolicy::immediate(1),
        ),
        pdf_allow_list: None,
        video_allow_list: None,
        report: CrawlReport::default(),
    };
    let converter = DocumentConverter::new(language).unwrap();
    let mut builder = TreeBuilder::new(ctx, converter, channel_info());
    for repo in repos {
        builder.crawl_repository(repo);
    }
    builder.finish()
}

/// One line per node, indented by depth: `<kind> <title>`.
pub fn outline(tree: &ChannelTree) -> String {
    let mut lines = Vec::new();
    for &id in tree.children_of(ParentRef::Root) {
        outline_node(tree, id, 0, &mut lines);
    }
    lines.join("\n")
}

fn outline_node(tree: &ChannelTree, id: NodeId, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match tree.node(id) {
        TreeNode::Topic(topic) => {
            lines.push(format!("{}topic {}", indent, topic.title));
            for &child in &topic.children {
                outline_node(tree, child, depth + 1, lines);
            }
        }
        TreeNode::Content(item) => {
            let kind = serde_json::to_value(item.kind).unwrap();
            lines.push(format!("{}{} {}", indent, kind.as_str().unwrap(), item.title));
        }
    }
}
