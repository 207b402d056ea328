// src/document/extractor.rs
//! Finds the resources a document embeds and classifies them.
//!
//! Every extraction is scoped to one document and deduplicated by the
//! resolved absolute URL. Image extraction also rewrites each `src` to the
//! local name the image will have inside the bundle.

use crate::constants::EXTRA_FILES_PREFIX;
use crate::html::{Element, HtmlDocument};
use crate::output::{disambiguate_name, name_from_url};
use crate::types::LogicalUrl;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

static DRIVE_FILE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/file/d/([A-Za-z0-9_-]+)").expect("valid drive id pattern"));

static YOUTUBE_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:www|m)\.)?(?:youtube\.com|youtube-nocookie\.com|youtu\.be)$")
        .expect("valid youtube host pattern")
});

const DRIVE_HOSTS: [&str; 2] = ["drive.google.com", "docs.google.com"];

/// Which resources to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    Pdf,
    DrivePdf,
    YoutubeLink,
    YoutubeEmbed,
}

/// One embedded resource, before it is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub kind: ResourceKind,
    /// Absolute URL, the deduplication key.
    pub source_url: String,
    /// Name the fetched file gets locally.
    pub file_name: String,
    /// Where the file would sit in the checkout when referenced relatively.
    pub local_candidate: Option<PathBuf>,
}

/// Where a document lives, for resolving its references.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
    /// Base content-source URL; root-absolute references resolve against it.
    pub base: &'a Url,
    /// Logical URL of the document's directory.
    pub document_url: &'a LogicalUrl,
    /// The document's directory in the checkout.
    pub document_dir: &'a Path,
}

/// Extracts resources of `kind` from `dom`.
///
/// Only [`ResourceKind::Image`] mutates the tree.
pub fn extract(
    dom: &mut HtmlDocument,
    kind: ResourceKind,
    ctx: &ExtractionContext<'_>,
) -> Vec<Resource> {
    match kind {
        ResourceKind::Image => extract_images(dom, ctx),
        ResourceKind::Pdf => extract_pdfs(dom, ctx),
        ResourceKind::DrivePdf => extract_drive_files(dom),
        ResourceKind::YoutubeLink => extract_videos(dom, "a", "href", ResourceKind::YoutubeLink),
        ResourceKind::YoutubeEmbed => {
            extract_videos(dom, "iframe", "src", ResourceKind::YoutubeEmbed)
        }
    }
}

// --- Images ---

fn extract_images(dom: &mut HtmlDocument, ctx: &ExtractionContext<'_>) -> Vec<Resource> {
    let mut images: IndexMap<String, Resource> = IndexMap::new();
    let mut taken: HashSet<String> = HashSet::new();

    dom.for_each_element_mut(|element| {
        if !element.is("img") {
            return;
        }
        let Some(src) = element.attr("src") else {
            return;
        };
        let Some((url, local)) = resolve_reference(src, ctx) else {
            return;
        };

        let file_name = match images.get(&url) {
            Some(existing) => existing.file_name.clone(),
            None => {
                let name = disambiguate_name(&name_from_url(&url), |n| taken.contains(n));
                taken.insert(name.clone());
                images.insert(
                    url.clone(),
                    Resource {
                        kind: ResourceKind::Image,
                        source_url: url,
                        file_name: name.clone(),
                        local_candidate: local,
                    },
                );
                name
            }
        };
        element.set_attr("src", format!("{}{}", EXTRA_FILES_PREFIX, file_name));
    });

    images.into_values().collect()
}

/// Points the images that could not be fetched back at their source URLs.
///
/// `failed` holds resources previously returned by image extraction.
pub fn restore_image_sources(dom: &mut HtmlDocument, failed: &[Resource]) {
    if failed.is_empty() {
        return;
    }
    let by_local: IndexMap<String, &str> = failed
        .iter()
        .map(|r| {
            (
                format!("{}{}", EXTRA_FILES_PREFIX, r.file_name),
                r.source_url.as_str(),
            )
        })
        .collect();

    dom.for_each_element_mut(|element| {
        if !element.is("img") {
            return;
        }
        let restored = element
            .attr("src")
            .and_then(|src| by_local.get(src))
            .map(|url| url.to_string());
        if let Some(url) = restored {
            element.set_attr("src", url);
        }
    });
}

// --- PDFs ---

fn extract_pdfs(dom: &HtmlDocument, ctx: &ExtractionContext<'_>) -> Vec<Resource> {
    let mut found: IndexMap<String, Resource> = IndexMap::new();
    let mut taken: HashSet<String> = HashSet::new();

    let links = dom.elements().into_iter().filter_map(|e| match e.name.as_str() {
        "a" => e.attr("href"),
        _ => None,
    });
    let frames = dom.elements().into_iter().filter_map(|e| match e.name.as_str() {
        "iframe" => e.attr("src"),
        _ => None,
    });

    for reference in links.chain(frames) {
        if !path_ends_with_pdf(reference) {
            continue;
        }
        let Some((url, local)) = resolve_reference(reference, ctx) else {
            continue;
        };
        if found.contains_key(&url) {
            continue;
        }
        let file_name = disambiguate_name(&name_from_url(&url), |n| taken.contains(n));
        taken.insert(file_name.clone());
        found.insert(
            url.clone(),
            Resource {
                kind: ResourceKind::Pdf,
                source_url: url,
                file_name,
                local_candidate: local,
            },
        );
    }

    found.into_values().collect()
}

fn path_ends_with_pdf(reference: &str) -> bool {
    let path = reference.split(['?', '#']).next().unwrap_or(reference);
    path.to_ascii_lowercase().ends_with(".pdf")
}

// --- Drive files ---

fn extract_drive_files(dom: &HtmlDocument) -> Vec<Resource> {
    let mut found: IndexMap<String, Resource> = IndexMap::new();

    for href in dom
        .elements()
        .into_iter()
        .filter(|e| e.is("a"))
        .filter_map(|e| e.attr("href"))
    {
        let Some(id) = drive_file_id(href) else {
            continue;
        };
        let url = drive_download_url(&id);
        found.entry(url.clone()).or_insert_with(|| Resource {
            kind: ResourceKind::DrivePdf,
            source_url: url,
            file_name: format!("{}.pdf", id),
            local_candidate: None,
        });
    }

    found.into_values().collect()
}

/// File id of a Drive link, from `/file/d/<id>/` or an `id` query parameter.
pub fn drive_file_id(href: &str) -> Option<String> {
    let url = Url::parse(href.trim()).ok()?;
    if !DRIVE_HOSTS.contains(&url.host_str()?) {
        return None;
    }
    if let Some(caps) = DRIVE_FILE_ID.captures(url.path()) {
        return Some(caps[1].to_string());
    }
    url.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}

/// Direct download URL of a Drive file.
pub fn drive_download_url(id: &str) -> String {
    format!("https://drive.google.com/uc?export=download&id={}", id)
}

// --- Videos ---

fn extract_videos(
    dom: &HtmlDocument,
    tag: &str,
    attribute: &str,
    kind: ResourceKind,
) -> Vec<Resource> {
    let mut found: IndexMap<String, Resource> = IndexMap::new();

    let references = dom
        .elements()
        .into_iter()
        .filter(|e: &&Element| e.is(tag))
        .filter_map(|e| e.attr(attribute));

    for reference in references {
        let Some(url) = normalize_youtube_url(reference) else {
            continue;
        };
        found.entry(url.clone()).or_insert_with(|| Resource {
            kind,
            file_name: video_file_stem(&url),
            source_url: url,
            local_candidate: None,
        });
    }

    found.into_values().collect()
}

/// Canonical form of a YouTube URL, or `None` for other hosts.
///
/// `embed/<id>` becomes `watch?v=<id>` with the query dropped, `youtu.be`
/// short links become `https://www.youtube.com/watch?v=<id>`, and watch
/// links keep only their `v` parameter. Anything else on a YouTube host is
/// returned unchanged so the fetcher can reject it.
pub fn normalize_youtube_url(reference: &str) -> Option<String> {
    let reference = reference.trim();
    let absolute = if reference.starts_with("//") {
        format!("https:{}", reference)
    } else {
        reference.to_string()
    };
    let url = Url::parse(&absolute).ok()?;
    let host = url.host_str()?;
    if !YOUTUBE_HOST.is_match(host) {
        return None;
    }

    let origin = format!("{}://{}", url.scheme(), host);
    let path = url.path();

    if host.ends_with("youtu.be") {
        let id = path.trim_matches('/');
        return (!id.is_empty()).then(|| format!("https://www.youtube.com/watch?v={}", id));
    }
    if let Some(id) = path.strip_prefix("/embed/") {
        let id = id.trim_end_matches('/');
        return (!id.is_empty()).then(|| format!("{}/watch?v={}", origin, id));
    }
    if path == "/watch" {
        if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == "v") {
            return Some(format!("{}/watch?v={}", origin, id));
        }
    }
    Some(absolute)
}

/// Local name stem of a video: its id when the URL carries one.
fn video_file_stem(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, id)| id.into_owned())
        })
        .unwrap_or_else(|| name_from_url(url))
}

// --- Reference resolution ---

/// Resolves a reference as written in the document to an absolute URL and,
/// for relative references, its location in the checkout.
pub fn resolve_reference(
    reference: &str,
    ctx: &ExtractionContext<'_>,
) -> Option<(String, Option<PathBuf>)> {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with('#') || reference.starts_with("data:") {
        return None;
    }

    if reference.starts_with("//") {
        return Some((format!("https:{}", reference), None));
    }

    if let Ok(url) = Url::parse(reference) {
        return matches!(url.scheme(), "http" | "https").then(|| (url.to_string(), None));
    }

    if reference.starts_with('/') {
        let url = ctx.base.join(reference).ok()?;
        return Some((url.to_string(), None));
    }

    let directory = Url::parse(&format!("{}/", ctx.document_url)).ok()?;
    let url = directory.join(reference).ok()?;
    let relative_path = reference.split(['?', '#']).next().unwrap_or(reference);
    Some((url.to_string(), Some(ctx.document_dir.join(relative_path))))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        base: Url,
        document_url: LogicalUrl,
        document_dir: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                base: Url::parse("https://github.com/Laboratoria/").unwrap(),
                document_url: LogicalUrl::parse(
                    "https://github.com/Laboratoria/curricula-js/01-intro",
                ),
                document_dir: PathBuf::from("/repo/01-intro"),
            }
        }

        fn ctx(&self) -> ExtractionContext<'_> {
            ExtractionContext {
                base: &self.base,
                document_url: &self.document_url,
                document_dir: &self.document_dir,
            }
        }
    }

    #[test]
    fn test_same_image_three_times_is_one_resource() {
        let fixture = Fixture::new();
        let mut dom = HtmlDocument::parse(
            r#"<img src="https://x.org/a/logo.png"><p><img src="https://x.org/a/logo.png"></p><img src="https://x.org/a/logo.png">"#,
        )
        .unwrap();

        let images = extract(&mut dom, ResourceKind::Image, &fixture.ctx());

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].file_name, "logo.png");
        let srcs: Vec<&str> = dom
            .elements()
            .into_iter()
            .filter(|e| e.is("img"))
            .filter_map(|e| e.attr("src"))
            .collect();
        assert_eq!(srcs, vec!["files/logo.png"; 3]);
    }

    #[test]
    fn test_image_resolution_rules() {
        let fixture = Fixture::new();
        let mut dom = HtmlDocument::parse(
            r#"<img src="/static/a.png"><img src="img/b.png"><img alt="no source"><img src="https://cdn.org/c.png?raw=1">"#,
        )
        .unwrap();

        let images = extract(&mut dom, ResourceKind::Image, &fixture.ctx());
        let urls: Vec<&str> = images.iter().map(|r| r.source_url.as_str()).collect();

        assert_eq!(
            urls,
            vec![
                "https://github.com/static/a.png",
                "https://github.com/Laboratoria/curricula-js/01-intro/img/b.png",
                "https://cdn.org/c.png?raw=1",
            ]
        );
        assert_eq!(
            images[1].local_candidate.as_deref(),
            Some(Path::new("/repo/01-intro/img/b.png"))
        );
        assert_eq!(images[2].file_name, "c.png");
    }

    #[test]
    fn test_colliding_image_names_get_suffix() {
        let fixture = Fixture::new();
        let mut dom = HtmlDocument::parse(
            r#"<img src="https://x.org/a/logo.png"><img src="https://y.org/b/logo.png">"#,
        )
        .unwrap();

        let images = extract(&mut dom, ResourceKind::Image, &fixture.ctx());
        let names: Vec<&str> = images.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["logo.png", "logo-2.png"]);
    }

    #[test]
    fn test_restore_failed_image() {
        let fixture = Fixture::new();
        let mut dom = HtmlDocument::parse(r#"<img src="https://x.org/a/logo.png">"#).unwrap();
        let images = extract(&mut dom, ResourceKind::Image, &fixture.ctx());

        restore_image_sources(&mut dom, &images);

        assert_eq!(
            dom.find_first("img").unwrap().attr("src"),
            Some("https://x.org/a/logo.png")
        );
    }

    #[test]
    fn test_pdf_links_and_iframes() {
        let fixture = Fixture::new();
        let mut dom = HtmlDocument::parse(
            r#"<a href="https://x.org/guide.pdf">g</a><a href="https://x.org/guide.pdf">again</a><iframe src="slides.PDF"></iframe><a href="https://x.org/page.html">no</a>"#,
        )
        .unwrap();

        let pdfs = extract(&mut dom, ResourceKind::Pdf, &fixture.ctx());
        let urls: Vec<&str> = pdfs.iter().map(|r| r.source_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://x.org/guide.pdf",
                "https://github.com/Laboratoria/curricula-js/01-intro/slides.PDF",
            ]
        );
    }

    #[test]
    fn test_drive_ids() {
        assert_eq!(
            drive_file_id("https://drive.google.com/file/d/1AbC_d-9/view?usp=sharing").as_deref(),
            Some("1AbC_d-9")
        );
        assert_eq!(
            drive_file_id("https://drive.google.com/open?id=XYZ123").as_deref(),
            Some("XYZ123")
        );
        assert_eq!(drive_file_id("https://example.org/file/d/abc/"), None);
    }

    #[test]
    fn test_youtube_embed_normalization() {
        assert_eq!(
            normalize_youtube_url("https://youtube.com/embed/XYZ?foo=bar").as_deref(),
            Some("https://youtube.com/watch?v=XYZ")
        );
        assert_eq!(
            normalize_youtube_url("https://youtu.be/abc123").as_deref(),
            Some("https://www.youtube.com/watch?v=abc123")
        );
        assert_eq!(
            normalize_youtube_url("https://www.youtube.com/watch?v=abc&t=10s").as_deref(),
            Some("https://www.youtube.com/watch?v=abc")
        );
        assert_eq!(normalize_youtube_url("https://vimeo.com/123"), None);
    }

    #[test]
    fn test_video_links_are_deduplicated() {
        let fixture = Fixture::new();
        let mut dom = HtmlDocument::parse(
            r#"<a href="https://www.youtube.com/watch?v=abc">one</a><a href="https://www.youtube.com/watch?v=abc&t=5">two</a><iframe src="https://www.youtube.com/embed/def"></iframe>"#,
        )
        .unwrap();

        let links = extract(&mut dom, ResourceKind::YoutubeLink, &fixture.ctx());
        let embeds = extract(&mut dom, ResourceKind::YoutubeEmbed, &fixture.ctx());

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].file_name, "abc");
        assert_eq!(embeds[0].source_url, "https://www.youtube.com/watch?v=def");
    }
}
