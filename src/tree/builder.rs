// src/tree/builder.rs
//! The recursive walk that turns checkouts into a channel tree.
//!
//! One activation per directory, depth first, parents before children:
//!   1. List the directory's Markdown files, README first
//!   2. Resolve the directory's topic (lookup-or-create by URL)
//!   3. Convert each document, fetch its resources, package its bundle
//!   4. Append bundle, PDFs and videos to the topic, in that order
//!   5. Register menu subdirectories as placeholders, then recurse
//!
//! Nothing in the walk is fatal. Missing files, unparsable documents and
//! failed downloads are logged, recorded in the [`CrawlReport`] and skipped.

use super::channel_tree::{
    ChannelInfo, ChannelTree, ContentItem, ContentKind, ContentOrigin, FileEntry, FileType,
    ParentRef,
};
use super::mapper::UrlMapper;
use super::report::CrawlReport;
use crate::config::Capabilities;
use crate::constants::{
    CONTRIBUTING_FILENAME, DESCRIPTION_MAX_CHARS, MARKDOWN_EXTENSION, PDFS_SUBDIR,
    README_FILENAME, TEMPLATE_DIRNAME, VIDEOS_SUBDIR,
};
use crate::document::{
    extract, read_menu, restore_image_sources, BundleFile, Document, DocumentConverter,
    ExtractionContext, Resource, ResourceKind,
};
use crate::error::ConvertError;
use crate::fetch::{
    fetch_drive_pdf, fetch_image, fetch_pdf, AllowListDecision, ResourceSource, UrlAllowList,
    VideoFetcher, VideoOutcome,
};
use crate::output::{archive_name_for, disambiguate_name, mirror_dir};
use crate::types::{IssueKind, Language, LogicalUrl, ValidatedUrl};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings the walk reads but never changes.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub base_url: ValidatedUrl,
    pub output_dir: PathBuf,
    pub language: Language,
    pub capabilities: Capabilities,
}

/// Everything a run threads through the walk.
pub struct RunContext<'a> {
    pub settings: BuildSettings,
    pub source: &'a dyn ResourceSource,
    pub videos: VideoFetcher<'a>,
    /// Gates PDF downloads when present.
    pub pdf_allow_list: Option<UrlAllowList>,
    /// Gates video downloads when present.
    pub video_allow_list: Option<UrlAllowList>,
    pub report: CrawlReport,
}

/// Result of a finished walk.
pub struct CrawlOutcome {
    pub tree: ChannelTree,
    pub report: CrawlReport,
    pub pdf_allow_list: Option<UrlAllowList>,
    pub video_allow_list: Option<UrlAllowList>,
}

/// The repository being walked.
struct RepoScope {
    mapper: UrlMapper,
    root_dir: PathBuf,
    root_url: LogicalUrl,
}

/// Builds one channel tree from one or more checkouts.
pub struct TreeBuilder<'a> {
    ctx: RunContext<'a>,
    converter: DocumentConverter,
    tree: ChannelTree,
    visited: HashSet<PathBuf>,
    /// Keyed by output directory, shared by every document of a directory.
    outputs: HashMap<PathBuf, OutputNames>,
    channel_claimed: bool,
}

/// Local names handed out in one output directory, and the media already
/// attached to its topic.
#[derive(Debug, Default)]
struct OutputNames {
    archives: HashSet<String>,
    pdfs: HashSet<String>,
    attached: HashSet<String>,
}

impl OutputNames {
    fn archive_name(&mut self, document: &Path) -> String {
        let name = disambiguate_name(&archive_name_for(document), |n| self.archives.contains(n));
        self.archives.insert(name.clone());
        name
    }

    /// Claims `resource` for this directory. `None` when an earlier document
    /// already brought the same URL.
    fn attach(&mut self, resource: &Resource) -> Option<Resource> {
        if !self.attached.insert(resource.source_url.clone()) {
            return None;
        }
        Some(resource.clone())
    }

    /// Like [`OutputNames::attach`], also renaming the PDF away from names
    /// other documents of the directory already use.
    fn attach_pdf(&mut self, resource: &Resource) -> Option<Resource> {
        let mut resource = self.attach(resource)?;
        resource.file_name = disambiguate_name(&resource.file_name, |n| self.pdfs.contains(n));
        self.pdfs.insert(resource.file_name.clone());
        Some(resource)
    }
}

impl<'a> TreeBuilder<'a> {
    pub fn new(ctx: RunContext<'a>, converter: DocumentConverter, info: ChannelInfo) -> Self {
        Self {
            ctx,
            converter,
            tree: ChannelTree::new(info),
            visited: HashSet::new(),
            outputs: HashMap::new(),
            channel_claimed: false,
        }
    }

    /// Walks one checkout into the shared tree.
    pub fn crawl_repository(&mut self, repo_dir: &Path) {
        let mapper_root = repo_dir.parent().unwrap_or(repo_dir);
        let mapper = UrlMapper::new(mapper_root, &self.ctx.settings.base_url);
        let scope = RepoScope {
            root_url: mapper.url_of(repo_dir),
            root_dir: repo_dir.to_path_buf(),
            mapper,
        };
        log::info!("Crawling {} as {}", repo_dir.display(), scope.root_url);
        self.walk_directory(&scope, repo_dir);
    }

    /// Ends the walk, handing back the tree and the run state.
    pub fn finish(self) -> CrawlOutcome {
        let mut tree = self.tree;
        let mut report = self.ctx.report;
        report.absorb(tree.warnings());

        if tree.info().title.is_empty() {
            let fallback = tree.info().source_id.clone();
            tree.info_mut().title = fallback;
        }

        CrawlOutcome {
            tree,
            report,
            pdf_allow_list: self.ctx.pdf_allow_list,
            video_allow_list: self.ctx.video_allow_list,
        }
    }

    // --- Directory activation ---

    fn walk_directory(&mut self, scope: &RepoScope, dir: &Path) {
        let key = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        if !self.visited.insert(key) {
            log::debug!("Already walked {}", dir.display());
            return;
        }
        if !dir.is_dir() {
            self.ctx.report.warn(
                IssueKind::SourceMissing,
                "directory does not exist",
                dir.display().to_string(),
            );
            return;
        }

        let parent = self.topic_for_dir(scope, dir);
        let files = match markdown_files(dir) {
            Ok(files) => files,
            Err(e) => {
                self.ctx.report.warn(
                    IssueKind::SourceMissing,
                    format!("cannot list directory: {}", e),
                    dir.display().to_string(),
                );
                Vec::new()
            }
        };

        let mut menu = Vec::new();
        if files.is_empty() {
            // placeholder: the topic exists, titled after the directory
            if let ParentRef::Node(id) = parent {
                self.tree.claim_topic(id, &dir_name(dir), "");
            }
        }
        for file in &files {
            for entry in self
                .process_document(scope, dir, file, parent)
                .unwrap_or_default()
            {
                if !menu_contains(&menu, &entry) {
                    menu.push(entry);
                }
            }
        }

        let top_level = dir == scope.root_dir;
        let subdirs: Vec<PathBuf> = if menu.is_empty() {
            match subdirectories(dir) {
                Ok(dirs) => dirs,
                Err(e) => {
                    self.ctx.report.warn(
                        IssueKind::SourceMissing,
                        format!("cannot list directory: {}", e),
                        dir.display().to_string(),
                    );
                    Vec::new()
                }
            }
        } else {
            menu.iter().map(|entry| dir.join(entry)).collect()
        };
        let subdirs: Vec<PathBuf> = subdirs
            .into_iter()
            .filter(|sub| !(top_level && dir_name(sub) == TEMPLATE_DIRNAME))
            .collect();

        if !menu.is_empty() {
            for sub in &subdirs {
                self.topic_for_dir(scope, sub);
            }
            log::debug!(
                "Registered {} menu topics under {}",
                subdirs.len(),
                dir.display()
            );
        }

        for sub in subdirs {
            self.walk_directory(scope, &sub);
        }
    }

    /// Resolves the topic `dir` hangs its content on.
    ///
    /// With a single repository its root directory is the channel itself.
    fn topic_for_dir(&mut self, scope: &RepoScope, dir: &Path) -> ParentRef {
        let url = scope.mapper.url_of(dir);
        let single_repo = !self.ctx.settings.capabilities.multi_repo;
        if single_repo && url == scope.root_url {
            return ParentRef::Root;
        }
        let levels: Vec<_> = scope
            .mapper
            .levels_of(dir)
            .into_iter()
            .filter(|level| !(single_repo && level.url == scope.root_url))
            .collect();
        ParentRef::Node(self.tree.resolve_topic(&url, &levels, &dir_name(dir)))
    }

    // --- Document activation ---

    /// Converts one document and appends its content. Returns the README
    /// menu, if the document has one.
    fn process_document(
        &mut self,
        scope: &RepoScope,
        dir: &Path,
        file: &Path,
        parent: ParentRef,
    ) -> Option<Vec<String>> {
        let is_readme = file_name(file).eq_ignore_ascii_case(README_FILENAME);
        let default_title = if is_readme {
            dir_name(dir)
        } else {
            file.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        log::info!("Converting {}", file.display());
        let mut document = match self.converter.convert(file, &scope.mapper, &default_title) {
            Ok(document) => document,
            Err(ConvertError::Parse { path, reason }) => {
                self.ctx
                    .report
                    .convert_failed(&ConvertError::Parse { path, reason });
                let placeholder = Document::placeholder(file, &scope.mapper, &default_title);
                self.claim(scope, dir, parent, &placeholder);
                return None;
            }
            Err(e) => {
                self.ctx.report.convert_failed(&e);
                return None;
            }
        };
        self.ctx.report.documents += 1;
        self.claim(scope, dir, parent, &document);

        let menu = match (is_readme, document.dom.as_mut()) {
            (true, Some(dom)) => Some(read_menu(dom)).filter(|entries| !entries.is_empty()),
            _ => None,
        };

        let out_dir = mirror_dir(scope.mapper.root(), dir, &self.ctx.settings.output_dir);
        let resources = self.extract_resources(scope, &mut document, dir);
        let source_label = file.display().to_string();

        let mut items = Vec::new();
        let bundle_files = self.fetch_images(&mut document, &resources.images, &source_label);
        let archive_name = self
            .outputs
            .entry(out_dir.clone())
            .or_default()
            .archive_name(file);
        let archive_path = out_dir.join(archive_name);
        match self
            .converter
            .package(&mut document, &bundle_files, &archive_path)
        {
            Ok(path) => {
                self.ctx.report.bundles += 1;
                items.push(self.bundle_item(&document, path));
            }
            Err(e) => self.ctx.report.convert_failed(&e),
        }

        let names = self.outputs.entry(out_dir.clone()).or_default();
        let pdfs: Vec<Resource> = resources
            .pdfs
            .iter()
            .filter_map(|r| names.attach_pdf(r))
            .collect();
        let videos: Vec<Resource> = resources
            .videos
            .iter()
            .filter_map(|r| names.attach(r))
            .collect();
        let repeated = resources.pdfs.len() + resources.videos.len() - pdfs.len() - videos.len();
        if repeated > 0 {
            log::debug!(
                "{}: {} media links already attached by another document",
                file.display(),
                repeated
            );
        }

        for resource in &pdfs {
            if let Some(item) = self.fetch_pdf_item(resource, &out_dir, &source_label) {
                items.push(item);
            }
        }
        for resource in &videos {
            if let Some(item) = self.fetch_video_item(resource, &out_dir, &source_label) {
                items.push(item);
            }
        }

        for item in items {
            self.tree.append_content(parent, item);
        }
        menu
    }

    /// Lets a document title its directory's topic, or the channel for a
    /// repository root.
    fn claim(&mut self, scope: &RepoScope, dir: &Path, parent: ParentRef, document: &Document) {
        if let ParentRef::Node(id) = parent {
            self.tree
                .claim_topic(id, &document.title, &document.description);
        }
        if dir != scope.root_dir || self.channel_claimed {
            return;
        }
        self.channel_claimed = true;

        let info = self.tree.info_mut();
        if info.title.is_empty() {
            info.title = document.title.clone();
        }
        if info.description.is_empty() {
            info.description = document.description.clone();
        }
        if info.license.copyright_holder.is_empty() {
            if let Some(holder) = &document.copyright {
                log::info!("Copyright holder taken from {}: {}", document.path.display(), holder);
                info.license = info.license.with_holder(holder.clone());
            }
        }
    }

    // --- Resources ---

    fn extract_resources(
        &self,
        scope: &RepoScope,
        document: &mut Document,
        dir: &Path,
    ) -> ExtractedResources {
        let mut found = ExtractedResources::default();
        let Some(dom) = document.dom.as_mut() else {
            return found;
        };
        let capabilities = self.ctx.settings.capabilities;
        let dir_url = scope.mapper.url_of(dir);
        let ctx = ExtractionContext {
            base: self.ctx.settings.base_url.as_url(),
            document_url: &dir_url,
            document_dir: dir,
        };

        if capabilities.fetch_images {
            found.images = extract(dom, ResourceKind::Image, &ctx);
        }
        if capabilities.fetch_pdfs {
            found.pdfs = extract(dom, ResourceKind::Pdf, &ctx);
            found.pdfs.extend(extract(dom, ResourceKind::DrivePdf, &ctx));
        }
        if capabilities.fetch_videos {
            for kind in [ResourceKind::YoutubeLink, ResourceKind::YoutubeEmbed] {
                for video in extract(dom, kind, &ctx) {
                    if !found.videos.iter().any(|v| v.source_url == video.source_url) {
                        found.videos.push(video);
                    }
                }
            }
        }
        log::debug!(
            "{}: {} images, {} PDFs, {} videos",
            document.path.display(),
            found.images.len(),
            found.pdfs.len(),
            found.videos.len()
        );
        found
    }

    /// Fetches images for the bundle; failed ones point back at their source.
    fn fetch_images(
        &mut self,
        document: &mut Document,
        images: &[Resource],
        source_label: &str,
    ) -> Vec<BundleFile> {
        let mut files = Vec::with_capacity(images.len());
        let mut failed = Vec::new();
        for image in images {
            match fetch_image(self.ctx.source, image) {
                Ok(bytes) => {
                    self.ctx.report.images += 1;
                    files.push(BundleFile {
                        name: image.file_name.clone(),
                        bytes,
                    });
                }
                Err(e) => {
                    self.ctx.report.fetch_failed(&e, source_label);
                    failed.push(image.clone());
                }
            }
        }
        if let (Some(dom), false) = (document.dom.as_mut(), failed.is_empty()) {
            restore_image_sources(dom, &failed);
        }
        files
    }

    fn fetch_pdf_item(
        &mut self,
        resource: &Resource,
        out_dir: &Path,
        source_label: &str,
    ) -> Option<ContentItem> {
        if !approved(&mut self.ctx.pdf_allow_list, &resource.source_url) {
            self.ctx.report.unapproved += 1;
            return None;
        }
        let dest = out_dir.join(PDFS_SUBDIR);
        let result = match resource.kind {
            ResourceKind::DrivePdf => fetch_drive_pdf(self.ctx.source, resource, &dest),
            _ => fetch_pdf(self.ctx.source, resource, &dest),
        };
        match result {
            Ok(path) => {
                self.ctx.report.pdfs += 1;
                Some(ContentItem {
                    kind: ContentKind::Document,
                    source_id: resource.source_url.clone(),
                    title: resource.file_name.clone(),
                    description: String::new(),
                    language: self.ctx.settings.language.clone(),
                    license: self.tree.info().license.clone(),
                    files: vec![FileEntry::new(FileType::Document, path)],
                    thumbnail: None,
                    author: None,
                    origin: ContentOrigin::Remote,
                })
            }
            Err(e) => {
                self.ctx.report.fetch_failed(&e, source_label);
                None
            }
        }
    }

    fn fetch_video_item(
        &mut self,
        resource: &Resource,
        out_dir: &Path,
        source_label: &str,
    ) -> Option<ContentItem> {
        if !approved(&mut self.ctx.video_allow_list, &resource.source_url) {
            self.ctx.report.unapproved += 1;
            return None;
        }
        let outcome = self
            .ctx
            .videos
            .fetch(&resource.source_url, &out_dir.join(VIDEOS_SUBDIR));
        match outcome {
            Ok(VideoOutcome::Downloaded { info, video }) => {
                self.ctx.report.videos += 1;
                let mut files = vec![FileEntry::new(FileType::Video, video.path)];
                for (language, path) in video.subtitles {
                    let entry = FileEntry::new(FileType::Subtitles, path);
                    files.push(match Language::new(language) {
                        Ok(language) => entry.with_language(language),
                        Err(_) => entry,
                    });
                }
                let title = if info.title.is_empty() {
                    resource.file_name.clone()
                } else {
                    info.title
                };
                Some(ContentItem {
                    kind: ContentKind::Video,
                    source_id: resource.source_url.clone(),
                    title,
                    description: super::truncate_chars(&info.description, DESCRIPTION_MAX_CHARS),
                    language: self.ctx.settings.language.clone(),
                    license: self.tree.info().license.clone(),
                    files,
                    thumbnail: None,
                    author: info.uploader,
                    origin: ContentOrigin::Remote,
                })
            }
            Ok(VideoOutcome::MetadataOnly(info)) => {
                log::info!("   - Video metadata: {} ({})", info.title, resource.source_url);
                self.ctx.report.metadata_only += 1;
                None
            }
            Err(e) => {
                self.ctx.report.fetch_failed(&e, source_label);
                None
            }
        }
    }

    fn bundle_item(&self, document: &Document, path: PathBuf) -> ContentItem {
        ContentItem {
            kind: ContentKind::Html5,
            source_id: document.source_id(),
            title: document.title.clone(),
            description: document.description.clone(),
            language: self.ctx.settings.language.clone(),
            license: self.tree.info().license.clone(),
            files: vec![FileEntry::new(FileType::Html5, path)],
            thumbnail: None,
            author: None,
            origin: ContentOrigin::Repository(document.path.clone()),
        }
    }
}

#[derive(Default)]
struct ExtractedResources {
    images: Vec<Resource>,
    /// Links and iframes first, then Drive files
    pdfs: Vec<Resource>,
    videos: Vec<Resource>,
}

/// Whether `url` may be downloaded; every URL passes without an allow-list.
fn approved(allow_list: &mut Option<UrlAllowList>, url: &str) -> bool {
    match allow_list {
        Some(list) => {
            let decision = list.record(url);
            if decision == AllowListDecision::Unapproved {
                log::info!("   - Not approved yet: {}", url);
            }
            decision == AllowListDecision::Approved
        }
        None => true,
    }
}

// --- Directory listing ---

/// Markdown files of `dir`, sorted, README first, contributor guide excluded.
fn markdown_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(MARKDOWN_EXTENSION))
        })
        .filter(|path| !file_name(path).eq_ignore_ascii_case(CONTRIBUTING_FILENAME))
        .collect();
    files.sort();
    if let Some(readme) = files
        .iter()
        .position(|path| file_name(path).eq_ignore_ascii_case(README_FILENAME))
    {
        let readme = files.remove(readme);
        files.insert(0, readme);
    }
    Ok(files)
}

/// Subdirectories of `dir`, sorted, dot-directories excluded.
fn subdirectories(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .filter(|path| !file_name(path).starts_with('.'))
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn dir_name(dir: &Path) -> String {
    file_name(dir)
}

fn menu_contains(menu: &[String], entry: &str) -> bool {
    menu.iter().any(|existing| existing == entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "# x\n").unwrap();
    }

    #[test]
    fn test_markdown_files_readme_first() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.md", "README.md", "CONTRIBUTING.md", "a.md", "notes.txt"] {
            touch(&dir.path().join(name));
        }
        let names: Vec<String> = markdown_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["README.md", "a.md", "b.md"]);
    }

    #[test]
    fn test_subdirectories_skip_dot_dirs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["02-b", ".git", "01-a"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        let names: Vec<String> = subdirectories(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["01-a", "02-b"]);
    }

    fn pdf(url: &str, file_name: &str) -> Resource {
        Resource {
            kind: ResourceKind::Pdf,
            source_url: url.to_string(),
            file_name: file_name.to_string(),
            local_candidate: None,
        }
    }

    #[test]
    fn test_output_names_keep_pdfs_apart_across_documents() {
        let mut names = OutputNames::default();

        let first = names.attach_pdf(&pdf("https://a.org/guide.pdf", "guide.pdf")).unwrap();
        let second = names.attach_pdf(&pdf("https://b.org/guide.pdf", "guide.pdf")).unwrap();
        let drive = names.attach_pdf(&pdf("https://drive.google.com/uc?id=x", "guide.pdf"));

        assert_eq!(first.file_name, "guide.pdf");
        assert_eq!(second.file_name, "guide-2.pdf");
        assert_eq!(drive.unwrap().file_name, "guide-3.pdf");
        assert!(names.attach_pdf(&pdf("https://a.org/guide.pdf", "guide.pdf")).is_none());
    }

    #[test]
    fn test_output_names_archives() {
        let mut names = OutputNames::default();
        assert_eq!(names.archive_name(Path::new("/r/01-a/README.md")), "index.zip");
        assert_eq!(names.archive_name(Path::new("/r/01-a/index.md")), "index-2.zip");
        assert_eq!(names.archive_name(Path::new("/r/01-a/notes.md")), "notes.zip");
    }

    #[test]
    fn test_without_allow_list_everything_is_approved() {
        let mut none = None;
        assert!(approved(&mut none, "https://x.org/a.pdf"));
        let mut list = Some(UrlAllowList::empty("p.json", false));
        assert!(!approved(&mut list, "https://x.org/a.pdf"));
    }
}
