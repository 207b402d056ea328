// src/package/template.rs
//! Renders the `index.html` shell every bundle opens with.

use crate::error::AppError;
use handlebars::Handlebars;
use serde::Serialize;

const INDEX_TEMPLATE_NAME: &str = "index";
const INDEX_TEMPLATE: &str = include_str!("../../templates/index.hbs");

/// Stylesheet shipped in every bundle.
pub const STYLESHEET: &str = include_str!("../../assets/styles.css");

/// Script shipped in every bundle.
pub const SCRIPT: &str = include_str!("../../assets/scripts.js");

/// Archive entry of the stylesheet.
pub const STYLESHEET_ENTRY: &str = "css/styles.css";

/// Archive entry of the script.
pub const SCRIPT_ENTRY: &str = "js/scripts.js";

/// Data the index template is rendered with.
#[derive(Debug, Serialize)]
pub struct PageContent<'a> {
    pub title: &'a str,
    pub language: &'a str,
    /// Rewritten document body, inserted unescaped.
    pub body: &'a str,
    pub copyright: Option<&'a str>,
    pub stylesheet: &'a str,
    pub script: &'a str,
}

impl<'a> PageContent<'a> {
    pub fn new(title: &'a str, language: &'a str, body: &'a str) -> Self {
        Self {
            title,
            language,
            body,
            copyright: None,
            stylesheet: STYLESHEET_ENTRY,
            script: SCRIPT_ENTRY,
        }
    }

    pub fn with_copyright(mut self, copyright: Option<&'a str>) -> Self {
        self.copyright = copyright;
        self
    }
}

/// Handlebars registry holding the index template.
pub struct PageRenderer {
    handlebars: Handlebars<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, AppError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars
            .register_template_string(INDEX_TEMPLATE_NAME, INDEX_TEMPLATE)
            .map_err(|e| AppError::Template {
                name: INDEX_TEMPLATE_NAME.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { handlebars })
    }

    /// Renders a full HTML page around `page.body`.
    pub fn render(&self, page: &PageContent<'_>) -> Result<String, AppError> {
        self.handlebars
            .render(INDEX_TEMPLATE_NAME, page)
            .map_err(|e| AppError::Template {
                name: INDEX_TEMPLATE_NAME.to_string(),
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_escapes_title_not_body() {
        let renderer = PageRenderer::new().unwrap();
        let html = renderer
            .render(
                &PageContent::new("Tips & <tricks>", "es", "<h1>Hola</h1>")
                    .with_copyright(Some("Laboratoria")),
            )
            .unwrap();

        assert!(html.contains("<title>Tips &amp; &lt;tricks&gt;</title>"));
        assert!(html.contains("<h1>Hola</h1>"));
        assert!(html.contains(r#"<html lang="es">"#));
        assert!(html.contains(r#"href="css/styles.css""#));
        assert!(html.contains(r#"src="js/scripts.js""#));
        assert!(html.contains("Laboratoria"));
    }

    #[test]
    fn test_render_without_copyright() {
        let renderer = PageRenderer::new().unwrap();
        let html = renderer
            .render(&PageContent::new("T", "es", "<p>x</p>"))
            .unwrap();
        assert!(!html.contains("class=\"copyright\""));
    }
}
