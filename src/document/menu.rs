// src/document/menu.rs
//! Numbered subdirectory menus in README files.
//!
//! A curriculum README lists its units as links inside `<h3>` headings
//! (`### [Intro](01-intro)`). Those links name the directories to walk next
//! and point nowhere inside a bundle, so their `href` is blanked.

use crate::html::HtmlDocument;
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBERED_DIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}-").expect("valid numbered directory pattern"));

/// Reads the menu of `dom`, returning directory names in menu order.
///
/// Matching anchors have their `href` blanked. A directory linked twice is
/// listed once.
pub fn read_menu(dom: &mut HtmlDocument) -> Vec<String> {
    let mut entries: Vec<String> = Vec::new();

    dom.for_each_within_mut("h3", |element| {
        if !element.is("a") {
            return;
        }
        let Some(dir) = element.attr("href").and_then(menu_directory) else {
            return;
        };
        element.set_attr("href", "");
        if !entries.contains(&dir) {
            entries.push(dir);
        }
    });

    if !entries.is_empty() {
        log::debug!("Menu lists {} subdirectories", entries.len());
    }
    entries
}

/// Directory a menu link points at, when it is a numbered sibling directory.
fn menu_directory(href: &str) -> Option<String> {
    let href = href.trim();
    if href.contains("://") || href.starts_with('#') {
        return None;
    }
    let first = href
        .trim_start_matches("./")
        .split(['/', '?', '#'])
        .find(|segment| !segment.is_empty())?;
    NUMBERED_DIR.is_match(first).then(|| first.to_string())
}
