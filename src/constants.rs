// src/constants.rs
//! Domain constants that define the operational boundaries of the crawler.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role. Reading these constants should tell you how a crawl is
//! laid out on disk, what it skips, and how hard it tries the network.

// ---------------------------------------------------------------------------
// Source repository conventions
// ---------------------------------------------------------------------------

/// The document that represents its directory.
pub const README_FILENAME: &str = "README.md";

/// Contributor guides are repository plumbing, not curriculum.
pub const CONTRIBUTING_FILENAME: &str = "CONTRIBUTING.md";

/// Example directory that every curriculum repository carries at its top level.
///
/// Skipped at the top level only; a nested directory with the same name is
/// crawled like any other.
pub const TEMPLATE_DIRNAME: &str = "00-template";

/// Extension of the documents the walk converts.
pub const MARKDOWN_EXTENSION: &str = "md";

// ---------------------------------------------------------------------------
// Defaults for the run configuration
// ---------------------------------------------------------------------------

/// Base under which every logical URL is composed.
pub const DEFAULT_BASE_URL: &str = "https://github.com/Laboratoria/";

/// Directory holding persisted run state (allow-lists).
pub const DEFAULT_DATA_DIR: &str = "chefdata";

/// Directory receiving archives, PDFs and videos.
pub const DEFAULT_OUTPUT_DIR: &str = "chefdata/content";

/// Where repositories given as git URLs are cloned.
pub const DEFAULT_WORK_DIR: &str = "/tmp/md2channel";

/// Name of the serialized channel tree inside the output directory.
pub const DEFAULT_TREE_FILENAME: &str = "channel_tree.json";

/// Language tag stamped on nodes unless configured otherwise.
pub const DEFAULT_LANGUAGE: &str = "es";

/// License every node is published under.
pub const DEFAULT_LICENSE_ID: &str = "CC BY-NC-SA";

/// Web cache location, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = ".webcache";

/// TTL for cached responses outside the base URL, in seconds (one day).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 86_400;

// ---------------------------------------------------------------------------
// Bundle layout
// ---------------------------------------------------------------------------

/// Prefix under which a bundle's local resources live, both in the rewritten
/// `src` attributes and inside the archive.
pub const EXTRA_FILES_PREFIX: &str = "files/";

/// Entry name of the rendered page inside a bundle.
pub const BUNDLE_INDEX_ENTRY: &str = "index.html";

/// Archive name used for a directory's README.
pub const README_ARCHIVE_NAME: &str = "index.zip";

/// Written and removed once to check the output directory before a crawl.
pub const WRITE_CHECK_FILENAME: &str = ".md2channel-write-check";

/// Subdirectory of a topic's output directory receiving raw PDFs.
pub const PDFS_SUBDIR: &str = "pdfs";

/// Subdirectory of a topic's output directory receiving videos and subtitles.
pub const VIDEOS_SUBDIR: &str = "videos";

/// Allow-list file names inside the data directory.
pub const PDF_ALLOW_LIST_FILENAME: &str = "pdfs_allow_list.json";
pub const VIDEO_ALLOW_LIST_FILENAME: &str = "videos_allow_list.json";

// ---------------------------------------------------------------------------
// Text limits
// ---------------------------------------------------------------------------

/// Maximum characters of a node description.
pub const DESCRIPTION_MAX_CHARS: usize = 400;

/// Heading text that marks the copyright section of a README.
pub const COPYRIGHT_MARKER: &str = "Copyright";

// ---------------------------------------------------------------------------
// Network behaviour
// ---------------------------------------------------------------------------

/// Tallest video stream the crawler downloads.
pub const DEFAULT_MAX_VIDEO_HEIGHT: u32 = 480;

/// Container the downloaded video stream must use.
pub const DEFAULT_VIDEO_FORMAT: &str = "mp4";

/// Attempts per resource before giving up on a transient failure.
pub const FETCH_MAX_ATTEMPTS: u32 = 3;

/// First backoff delay between attempts, in milliseconds.
pub const FETCH_INITIAL_BACKOFF_MS: u64 = 1_000;

/// Cap on the backoff delay, in milliseconds.
pub const FETCH_MAX_BACKOFF_MS: u64 = 5_000;

/// Per-request timeout for resource downloads, in seconds.
pub const FETCH_TIMEOUT_SECS: u64 = 60;

/// Redirects followed before a fetch is reported as a redirect loop.
pub const FETCH_MAX_REDIRECTS: usize = 10;

/// Maximum characters shown when previewing error output from a subprocess.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
