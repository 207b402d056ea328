// src/fetch/media.rs
//! Images, PDFs and Drive files.
//!
//! Validity is decided by what the server sends, never by the URL: a `.pdf`
//! link answering with an HTML page is not a PDF. Files referenced relatively
//! are read from the checkout when they exist there.

use super::{FetchedResource, ResourceSource};
use crate::document::Resource;
use crate::error::FetchFailure;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

static CONFIRM_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"confirm=([0-9A-Za-z_-]+)").expect("valid confirm pattern"));

const PDF_MAGIC: &[u8] = b"%PDF-";
const DRIVE_WARNING_COOKIE: &str = "download_warning";

/// Bytes of an image, from the checkout or the network.
pub fn fetch_image<S>(source: &S, resource: &Resource) -> Result<Vec<u8>, FetchFailure>
where
    S: ResourceSource + ?Sized,
{
    if let Some(bytes) = read_local(resource)? {
        return Ok(bytes);
    }
    let fetched = source.fetch(&resource.source_url)?;
    if fetched.media_type().as_deref() == Some("text/html") {
        return Err(unsupported(&resource.source_url, &fetched));
    }
    Ok(fetched.bytes)
}

/// Downloads a PDF into `dest_dir`, overwriting an earlier copy.
pub fn fetch_pdf<S>(source: &S, resource: &Resource, dest_dir: &Path) -> Result<PathBuf, FetchFailure>
where
    S: ResourceSource + ?Sized,
{
    if let Some(bytes) = read_local(resource)? {
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(FetchFailure::UnsupportedContentType {
                url: resource.source_url.clone(),
                content_type: None,
            });
        }
        return store(dest_dir, &resource.file_name, &bytes);
    }

    let fetched = source.fetch(&resource.source_url)?;
    if !is_pdf_content_type(&fetched) {
        return Err(unsupported(&resource.source_url, &fetched));
    }
    store(dest_dir, &resource.file_name, &fetched.bytes)
}

/// Downloads a Drive file into `dest_dir`, passing the virus-scan
/// interstitial when Drive shows one.
pub fn fetch_drive_pdf<S>(
    source: &S,
    resource: &Resource,
    dest_dir: &Path,
) -> Result<PathBuf, FetchFailure>
where
    S: ResourceSource + ?Sized,
{
    let first = source.fetch(&resource.source_url)?;
    if is_pdf_content_type(&first) {
        return store(dest_dir, &resource.file_name, &first.bytes);
    }

    let Some(token) = confirm_token(&first) else {
        return Err(unsupported(&resource.source_url, &first));
    };
    log::debug!("Confirming Drive download of {}", resource.source_url);
    let confirmed_url = format!("{}&confirm={}", resource.source_url, token);
    let confirmed = source.fetch(&confirmed_url)?;
    if !is_pdf_content_type(&confirmed) {
        return Err(unsupported(&resource.source_url, &confirmed));
    }
    store(dest_dir, &resource.file_name, &confirmed.bytes)
}

/// Confirmation token of a Drive interstitial: a `download_warning*` cookie,
/// else a `confirm=` parameter in the page.
pub fn confirm_token(response: &FetchedResource) -> Option<String> {
    let from_cookie = response.cookies.iter().find_map(|cookie| {
        let pair = cookie.split(';').next()?.trim();
        let (name, value) = pair.split_once('=')?;
        (name.starts_with(DRIVE_WARNING_COOKIE) && !value.is_empty()).then(|| value.to_string())
    });
    from_cookie.or_else(|| {
        let body = String::from_utf8_lossy(&response.bytes);
        CONFIRM_PARAM
            .captures(&body)
            .map(|caps| caps[1].to_string())
    })
}

pub fn is_pdf_content_type(response: &FetchedResource) -> bool {
    response.media_type().as_deref() == Some("application/pdf")
}

fn unsupported(url: &str, response: &FetchedResource) -> FetchFailure {
    FetchFailure::UnsupportedContentType {
        url: url.to_string(),
        content_type: response.content_type.clone(),
    }
}

/// Reads the checkout copy of a relatively referenced resource, if any.
fn read_local(resource: &Resource) -> Result<Option<Vec<u8>>, FetchFailure> {
    let Some(path) = resource.local_candidate.as_deref() else {
        return Ok(None);
    };
    if !path.is_file() {
        return Ok(None);
    }
    log::debug!("Reading {} from the checkout", path.display());
    fs::read(path).map(Some).map_err(|e| FetchFailure::LocalIo {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn store(dest_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, FetchFailure> {
    let path = dest_dir.join(file_name);
    let to_failure = |e: std::io::Error| FetchFailure::LocalIo {
        path: path.clone(),
        message: e.to_string(),
    };
    fs::create_dir_all(dest_dir).map_err(to_failure)?;
    fs::write(&path, bytes).map_err(to_failure)?;
    log::info!("   - Got file: {}", file_name);
    Ok(path)
}
