// src/document/converter.rs
//! Markdown document → rewritten DOM → HTML bundle.
//!
//! Conversion is split in two so the walk can work on the DOM in between:
//! [`DocumentConverter::convert`] loads and parses a file and derives its
//! metadata; [`DocumentConverter::package`] strips navigation links, renders
//! the page and writes the bundle once resources have been fetched.

use crate::constants::{COPYRIGHT_MARKER, DESCRIPTION_MAX_CHARS};
use crate::error::{AppError, ConvertError};
use crate::html::{markdown_to_html, HtmlDocument, MarkdownOptions};
use crate::package::{HtmlZipWriter, PageContent, PageRenderer};
use crate::tree::{truncate_chars, UrlMapper};
use crate::types::{Language, LogicalUrl};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One Markdown source, loaded and parsed.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub url: LogicalUrl,
    pub title: String,
    pub description: String,
    pub copyright: Option<String>,
    /// Absent for placeholders and documents that failed to parse.
    pub dom: Option<HtmlDocument>,
}

impl Document {
    /// A title-only document standing in for a directory without Markdown or
    /// a file that could not be parsed.
    pub fn placeholder(path: &Path, mapper: &UrlMapper, title: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            url: mapper.url_of(path),
            title: title.to_string(),
            description: String::new(),
            copyright: None,
            dom: None,
        }
    }

    /// Source locator of the bundle built from this document.
    pub fn source_id(&self) -> String {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.url.leaf(&file_name)
    }
}

/// A fetched resource on its way into a bundle.
#[derive(Debug, Clone)]
pub struct BundleFile {
    /// Name under `files/`.
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Converts and packages Markdown documents.
pub struct DocumentConverter {
    options: MarkdownOptions,
    renderer: PageRenderer,
    language: Language,
}

impl DocumentConverter {
    pub fn new(language: Language) -> Result<Self, AppError> {
        Ok(Self {
            options: MarkdownOptions::default(),
            renderer: PageRenderer::new()?,
            language,
        })
    }

    /// Loads `path`, renders it and parses the result.
    ///
    /// The title is the first `<h1>`, else `default_title`. The copyright
    /// is the first paragraph after an `<h2>` mentioning "Copyright". The
    /// description is the first paragraph, truncated.
    pub fn convert(
        &self,
        path: &Path,
        mapper: &UrlMapper,
        default_title: &str,
    ) -> Result<Document, ConvertError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConvertError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ConvertError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;

        let html = markdown_to_html(&text, &self.options);
        let dom = HtmlDocument::parse(&html).map_err(|reason| ConvertError::Parse {
            path: path.to_path_buf(),
            reason,
        })?;

        let title = dom
            .first_text_of("h1")
            .unwrap_or_else(|| default_title.to_string());
        let copyright = dom
            .paragraph_after_heading(COPYRIGHT_MARKER)
            .filter(|text| !text.is_empty());
        let description = dom
            .first_text_of("p")
            .map(|text| truncate_chars(&text, DESCRIPTION_MAX_CHARS))
            .unwrap_or_default();

        log::debug!("Converted {} as '{}'", path.display(), title);

        Ok(Document {
            path: path.to_path_buf(),
            url: mapper.url_of(path),
            title,
            description,
            copyright,
            dom: Some(dom),
        })
    }

    /// Writes the bundle of `document` to `archive_path`.
    ///
    /// Entries go in order: the rendered index, the static assets, then
    /// `files`. Navigation anchors are unwrapped first. A document without a
    /// DOM is packaged with an empty body.
    pub fn package(
        &self,
        document: &mut Document,
        files: &[BundleFile],
        archive_path: &Path,
    ) -> Result<PathBuf, ConvertError> {
        let body = match document.dom.as_mut() {
            Some(dom) => {
                let unwrapped = strip_anchors(dom);
                if unwrapped > 0 {
                    log::debug!(
                        "Unwrapped {} links in {}",
                        unwrapped,
                        document.path.display()
                    );
                }
                dom.to_html()
            }
            None => String::new(),
        };

        let page = PageContent::new(&document.title, self.language.as_str(), &body)
            .with_copyright(document.copyright.as_deref());
        let html = self.renderer.render(&page).map_err(|source| ConvertError::Package {
            path: document.path.clone(),
            source,
        })?;

        HtmlZipWriter::write_with(archive_path, |zip| {
            zip.write_index(&html)?;
            zip.write_static_assets()?;
            for file in files {
                zip.write_resource(&file.name, &file.bytes)?;
            }
            Ok(())
        })
        .map_err(|source| ConvertError::Package {
            path: document.path.clone(),
            source,
        })
    }
}

/// Unwraps every `<a>`, keeping its children.
///
/// A bundle is viewed offline, so no link has anywhere to go.
pub fn strip_anchors(dom: &mut HtmlDocument) -> usize {
    dom.unwrap_elements(|element| element.is("a"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValidatedUrl;
    use std::fs::File;
    use std::io::Read;

    fn mapper(root: &Path) -> UrlMapper {
        UrlMapper::new(
            root,
            &ValidatedUrl::parse("https://github.com/Laboratoria/").unwrap(),
        )
    }

    fn converter() -> DocumentConverter {
        DocumentConverter::new(Language::new("es").unwrap()).unwrap()
    }

    #[test]
    fn test_convert_reads_title_copyright_description() {
        let dir = tempfile::tempdir().unwrap();
        let unit = dir.path().join("curricula-js").join("01-intro");
        std::fs::create_dir_all(&unit).unwrap();
        let path = unit.join("README.md");
        std::fs::write(
            &path,
            "# Introducción\n\nPrimer párrafo.\n\n## License and Copyright\n\nLaboratoria\n",
        )
        .unwrap();

        let doc = converter()
            .convert(&path, &mapper(dir.path()), "01-intro")
            .unwrap();

        assert_eq!(doc.title, "Introducción");
        assert_eq!(doc.description, "Primer párrafo.");
        assert_eq!(doc.copyright.as_deref(), Some("Laboratoria"));
        assert_eq!(
            doc.url.as_str(),
            "https://github.com/Laboratoria/curricula-js/01-intro"
        );
        assert_eq!(
            doc.source_id(),
            "https://github.com/Laboratoria/curricula-js/01-intro/README.md"
        );
    }

    #[test]
    fn test_convert_falls_back_to_default_title() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "Just text.\n").unwrap();

        let doc = converter()
            .convert(&path, &mapper(dir.path()), "notes")
            .unwrap();
        assert_eq!(doc.title, "notes");
        assert_eq!(doc.copyright, None);
    }

    #[test]
    fn test_missing_document_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = converter().convert(&dir.path().join("README.md"), &mapper(dir.path()), "x");
        assert!(matches!(result, Err(ConvertError::NotFound { .. })));
    }

    #[test]
    fn test_strip_anchors_unwraps_every_link() {
        let mut dom = HtmlDocument::parse(
            r#"<p><a href="../02-setup/README.md">next</a> and <a href="https://mdn.io"><em>mdn</em></a></p>"#,
        )
        .unwrap();
        assert_eq!(strip_anchors(&mut dom), 2);
        assert_eq!(dom.to_html(), r#"<p>next and <em>mdn</em></p>"#);
    }

    #[test]
    fn test_package_writes_index_assets_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("README.md");
        std::fs::write(&path, "# Hola\n\n![logo](logo.png)\n").unwrap();
        let converter = converter();
        let mut doc = converter.convert(&path, &mapper(dir.path()), "x").unwrap();

        let archive = dir.path().join("out").join("index.zip");
        let written = converter
            .package(
                &mut doc,
                &[BundleFile {
                    name: "logo.png".to_string(),
                    bytes: b"png".to_vec(),
                }],
                &archive,
            )
            .unwrap();

        let mut zip = zip::ZipArchive::new(File::open(&written).unwrap()).unwrap();
        let names: Vec<String> = zip.file_names().map(str::to_string).collect();
        assert!(names.contains(&"index.html".to_string()));
        assert!(names.contains(&"css/styles.css".to_string()));
        assert!(names.contains(&"js/scripts.js".to_string()));
        assert!(names.contains(&"files/logo.png".to_string()));

        let mut index = String::new();
        zip.by_name("index.html")
            .unwrap()
            .read_to_string(&mut index)
            .unwrap();
        assert!(index.contains("<title>Hola</title>"));
    }
}
