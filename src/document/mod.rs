//! Per-document work: conversion, resource extraction and README menus.

mod converter;
mod extractor;
mod menu;

pub use converter::{strip_anchors, BundleFile, Document, DocumentConverter};
pub use extractor::{
    drive_download_url, drive_file_id, extract, normalize_youtube_url, resolve_reference,
    restore_image_sources, ExtractionContext, Resource, ResourceKind,
};
pub use menu::read_menu;
