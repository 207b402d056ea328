// src/package/archive.rs
//! Zip bundles written under a temporary name and moved into place.
//!
//! A bundle is written to `<name>.part` next to its final path. Only a
//! successful [`HtmlZipWriter::finish`] renames it; dropping the writer
//! before that removes the partial file, so no half-written archive ever
//! sits under the final name.

use super::template::{SCRIPT, SCRIPT_ENTRY, STYLESHEET, STYLESHEET_ENTRY};
use crate::constants::{BUNDLE_INDEX_ENTRY, EXTRA_FILES_PREFIX};
use crate::error::AppError;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Writer for one HTML bundle.
pub struct HtmlZipWriter {
    final_path: PathBuf,
    part_path: PathBuf,
    zip: Option<ZipWriter<BufWriter<File>>>,
    entries: HashSet<String>,
    options: SimpleFileOptions,
}

impl HtmlZipWriter {
    /// Opens `<path>.part` for writing, creating parent directories.
    pub fn create(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let part_path = part_path_for(path);
        let file = File::create(&part_path)?;
        log::debug!("Writing bundle {}", part_path.display());

        Ok(Self {
            final_path: path.to_path_buf(),
            part_path,
            zip: Some(ZipWriter::new(BufWriter::new(file))),
            entries: HashSet::new(),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        })
    }

    /// Writes a bundle in one scope: `fill` adds entries, then the archive
    /// is finished on success or discarded on failure.
    pub fn write_with<F>(path: &Path, fill: F) -> Result<PathBuf, AppError>
    where
        F: FnOnce(&mut HtmlZipWriter) -> Result<(), AppError>,
    {
        let mut writer = Self::create(path)?;
        fill(&mut writer)?;
        writer.finish()
    }

    /// Writes the rendered page as `index.html`.
    pub fn write_index(&mut self, html: &str) -> Result<(), AppError> {
        self.write_entry(BUNDLE_INDEX_ENTRY, html.as_bytes())
    }

    /// Writes the shared stylesheet and script.
    pub fn write_static_assets(&mut self) -> Result<(), AppError> {
        self.write_entry(STYLESHEET_ENTRY, STYLESHEET.as_bytes())?;
        self.write_entry(SCRIPT_ENTRY, SCRIPT.as_bytes())
    }

    /// Writes a resource under `files/<name>`.
    pub fn write_resource(&mut self, name: &str, bytes: &[u8]) -> Result<(), AppError> {
        self.write_entry(&format!("{}{}", EXTRA_FILES_PREFIX, name), bytes)
    }

    /// Writes one entry. An entry name already written is skipped, so later
    /// writes never clobber earlier ones.
    pub fn write_entry(&mut self, name: &str, bytes: &[u8]) -> Result<(), AppError> {
        if !self.entries.insert(name.to_string()) {
            log::debug!("Bundle entry {} already written", name);
            return Ok(());
        }
        let zip = self.zip.as_mut().ok_or_else(|| AppError::Internal {
            message: format!("bundle {} already closed", self.final_path.display()),
            source: None,
        })?;
        zip.start_file(name, self.options)?;
        zip.write_all(bytes)?;
        Ok(())
    }

    /// Closes the archive and moves it to its final name.
    pub fn finish(mut self) -> Result<PathBuf, AppError> {
        let zip = self.zip.take().ok_or_else(|| AppError::Internal {
            message: format!("bundle {} already closed", self.final_path.display()),
            source: None,
        })?;
        let mut buffered = zip.finish()?;
        buffered.flush()?;
        drop(buffered);

        fs::rename(&self.part_path, &self.final_path)?;
        log::debug!(
            "Bundle {} complete ({} entries)",
            self.final_path.display(),
            self.entries.len()
        );
        Ok(self.final_path.clone())
    }
}

impl Drop for HtmlZipWriter {
    fn drop(&mut self) {
        if self.zip.take().is_some() {
            if let Err(e) = fs::remove_file(&self.part_path) {
                log::warn!(
                    "Could not remove partial bundle {}: {}",
                    self.part_path.display(),
                    e
                );
            }
        } else if self.part_path.exists() {
            // finish failed between closing and renaming
            let _ = fs::remove_file(&self.part_path);
        }
    }
}

fn part_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_entry(path: &Path, name: &str) -> String {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut text = String::new();
        entry.read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn test_finished_bundle_has_all_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("01-a").join("index.zip");

        let written = HtmlZipWriter::write_with(&path, |zip| {
            zip.write_index("<p>hi</p>")?;
            zip.write_static_assets()?;
            zip.write_resource("logo.png", b"png")?;
            zip.write_resource("logo.png", b"other")
        })
        .unwrap();

        assert_eq!(written, path);
        assert!(!part_path_for(&path).exists());
        assert_eq!(read_entry(&path, "index.html"), "<p>hi</p>");
        assert_eq!(read_entry(&path, "files/logo.png"), "png");
        assert_eq!(read_entry(&path, "css/styles.css"), STYLESHEET);
    }

    #[test]
    fn test_failed_bundle_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.zip");

        let result = HtmlZipWriter::write_with(&path, |zip| {
            zip.write_index("<p>hi</p>")?;
            Err(AppError::Internal {
                message: "boom".to_string(),
                source: None,
            })
        });

        assert!(result.is_err());
        assert!(!path.exists());
        assert!(!part_path_for(&path).exists());
    }
}
