// src/html/markdown.rs
//! Markdown to HTML using pulldown-cmark.

use pulldown_cmark::{html, Options, Parser};

/// Options for markdown conversion
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    /// Enable tables extension
    pub tables: bool,
    /// Enable footnotes extension
    pub footnotes: bool,
    /// Enable strikethrough extension
    pub strikethrough: bool,
    /// Enable task lists extension
    pub task_lists: bool,
}

impl Default for MarkdownOptions {
    /// Curriculum READMEs are written for GitHub, so its extensions are on.
    fn default() -> Self {
        Self {
            tables: true,
            footnotes: true,
            strikethrough: true,
            task_lists: true,
        }
    }
}

impl MarkdownOptions {
    /// Plain CommonMark, no extensions.
    pub fn commonmark() -> Self {
        Self {
            tables: false,
            footnotes: false,
            strikethrough: false,
            task_lists: false,
        }
    }

    /// Convert to pulldown-cmark Options
    fn to_pulldown_options(&self) -> Options {
        let mut opts = Options::empty();
        if self.tables {
            opts.insert(Options::ENABLE_TABLES);
        }
        if self.footnotes {
            opts.insert(Options::ENABLE_FOOTNOTES);
        }
        if self.strikethrough {
            opts.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.task_lists {
            opts.insert(Options::ENABLE_TASKLISTS);
        }
        opts
    }
}

/// Renders Markdown source to an HTML body fragment.
///
/// Raw HTML in the source (iframes, `<img>` with attributes) passes through
/// untouched so the extractor sees it.
pub fn markdown_to_html(markdown: &str, options: &MarkdownOptions) -> String {
    let parser = Parser::new_ext(markdown, options.to_pulldown_options());
    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_and_links() {
        let html = markdown_to_html(
            "# Title\n\n### [Intro](01-intro)\n",
            &MarkdownOptions::default(),
        );
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains(r#"<h3><a href="01-intro">Intro</a></h3>"#));
    }

    #[test]
    fn test_raw_iframe_passes_through() {
        let html = markdown_to_html(
            "<iframe src=\"https://www.youtube.com/embed/abc\"></iframe>\n",
            &MarkdownOptions::default(),
        );
        assert!(html.contains(r#"<iframe src="https://www.youtube.com/embed/abc"></iframe>"#));
    }

    #[test]
    fn test_tables_follow_options() {
        let source = "| a | b |\n|---|---|\n| 1 | 2 |\n";
        assert!(markdown_to_html(source, &MarkdownOptions::default()).contains("<table>"));
        assert!(!markdown_to_html(source, &MarkdownOptions::commonmark()).contains("<table>"));
    }
}
