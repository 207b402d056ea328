// src/config.rs
use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_CACHE_DIR, DEFAULT_CACHE_TTL_SECS, DEFAULT_DATA_DIR,
    DEFAULT_LANGUAGE, DEFAULT_LICENSE_ID, DEFAULT_MAX_VIDEO_HEIGHT, DEFAULT_OUTPUT_DIR,
    DEFAULT_TREE_FILENAME, DEFAULT_VIDEO_FORMAT, DEFAULT_WORK_DIR, PDF_ALLOW_LIST_FILENAME,
    VIDEO_ALLOW_LIST_FILENAME,
};
use crate::error::AppError;
use crate::error_recovery::RetryPolicy;
use crate::fetch::VideoSettings;
use crate::repository::RepositorySelector;
use crate::types::{Language, License, ValidatedUrl, ValidationError};
use clap::Parser;
use std::path::PathBuf;

const MIN_VIDEO_HEIGHT: u32 = 144;
const MAX_VIDEO_HEIGHT: u32 = 2160;

/// Parsed and validated command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Curriculum repository: a local directory or a git URL (repeatable)
    #[arg(short, long = "repository", value_name = "DIR_OR_URL")]
    pub repositories: Vec<String>,

    /// Directory git repositories are cloned into
    #[arg(long, default_value = DEFAULT_WORK_DIR)]
    pub work_dir: PathBuf,

    /// Directory receiving bundles, PDFs, videos and the channel tree
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Directory holding the media allow-lists
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// File name of the channel tree (relative to the output directory)
    #[arg(long, default_value = DEFAULT_TREE_FILENAME)]
    pub tree_file: PathBuf,

    /// Base URL every node URL is composed under
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Channel title (defaults to the first repository's README title)
    #[arg(long)]
    pub title: Option<String>,

    /// Language tag stamped on every node
    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    pub language: String,

    /// Copyright holder for the license (defaults to the README's copyright notice)
    #[arg(long, env = "MD2CHANNEL_COPYRIGHT_HOLDER")]
    pub copyright_holder: Option<String>,

    /// Channel thumbnail image
    #[arg(long)]
    pub thumbnail: Option<PathBuf>,

    /// Tallest video stream to download
    #[arg(long, default_value_t = DEFAULT_MAX_VIDEO_HEIGHT)]
    pub max_video_height: u32,

    /// Container of downloaded videos
    #[arg(long, default_value = DEFAULT_VIDEO_FORMAT)]
    pub video_format: String,

    /// Probe videos and record them, but download nothing
    #[arg(long, default_value_t = false)]
    pub no_video_download: bool,

    /// Do not package images into bundles
    #[arg(long, default_value_t = false)]
    pub no_images: bool,

    /// Do not download linked PDFs
    #[arg(long, default_value_t = false)]
    pub no_pdfs: bool,

    /// Ignore embedded and linked videos
    #[arg(long, default_value_t = false)]
    pub no_videos: bool,

    /// Gate PDF and video downloads through the allow-lists in the data directory
    #[arg(long, default_value_t = false)]
    pub allow_lists: bool,

    /// Record newly discovered media as approved
    #[arg(long, default_value_t = false)]
    pub approve_new_media: bool,

    /// Disable the response cache (always fetch fresh data)
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,

    /// Cache TTL in seconds for responses outside the base URL
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL_SECS)]
    pub cache_ttl: u64,

    /// Pipe mode - print the channel tree to stdout instead of writing it
    #[arg(short = 'p', long, default_value_t = false)]
    pub pipe: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Which parts of a document the crawl harvests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub fetch_images: bool,
    pub fetch_pdfs: bool,
    pub fetch_videos: bool,
    /// Each repository becomes a top-level topic; with a single repository
    /// its contents sit directly under the channel.
    pub multi_repo: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            fetch_images: true,
            fetch_pdfs: true,
            fetch_videos: true,
            multi_repo: false,
        }
    }
}

/// Response cache settings; absent when caching is disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub dir: PathBuf,
    pub ttl_secs: u64,
}

/// Resolved crawl configuration: validated and ready to drive a run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub repositories: Vec<RepositorySelector>,
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Full path of the channel tree JSON.
    pub tree_path: PathBuf,
    pub base_url: ValidatedUrl,
    pub title: Option<String>,
    pub language: Language,
    pub license_id: String,
    pub copyright_holder: Option<String>,
    pub thumbnail: Option<PathBuf>,
    pub video: VideoSettings,
    pub capabilities: Capabilities,
    pub allow_lists: bool,
    pub approve_new_media: bool,
    pub cache: Option<CacheSettings>,
    pub retry: RetryPolicy,
    pub pipe: bool,
    pub verbose: bool,
}

impl CrawlConfig {
    /// Resolves a complete crawl configuration from CLI input.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        if cli.repositories.is_empty() {
            return Err(AppError::MissingConfiguration(
                "at least one --repository is required".to_string(),
            ));
        }
        let repositories = cli
            .repositories
            .iter()
            .map(|selector| RepositorySelector::parse(selector))
            .collect::<Result<Vec<_>, _>>()?;

        let base_url = ValidatedUrl::parse(&cli.base_url)?;
        let language = Language::new(cli.language)?;

        if !(MIN_VIDEO_HEIGHT..=MAX_VIDEO_HEIGHT).contains(&cli.max_video_height) {
            return Err(ValidationError::OutOfBounds {
                value: cli.max_video_height,
                min: MIN_VIDEO_HEIGHT,
                max: MAX_VIDEO_HEIGHT,
            }
            .into());
        }
        let container = cli.video_format.trim().to_ascii_lowercase();
        if container.is_empty() || !container.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::InvalidConfiguration(format!(
                "video format '{}' is not a container extension",
                cli.video_format
            )));
        }

        let tree_path = if cli.tree_file.is_absolute() {
            cli.tree_file
        } else {
            cli.output_dir.join(cli.tree_file)
        };

        let capabilities = Capabilities {
            fetch_images: !cli.no_images,
            fetch_pdfs: !cli.no_pdfs,
            fetch_videos: !cli.no_videos,
            multi_repo: repositories.len() > 1,
        };

        Ok(CrawlConfig {
            repositories,
            work_dir: cli.work_dir,
            output_dir: cli.output_dir,
            data_dir: cli.data_dir,
            tree_path,
            base_url,
            title: cli.title.filter(|t| !t.trim().is_empty()),
            language,
            license_id: DEFAULT_LICENSE_ID.to_string(),
            copyright_holder: cli.copyright_holder.filter(|h| !h.trim().is_empty()),
            thumbnail: cli.thumbnail,
            video: VideoSettings {
                max_height: cli.max_video_height,
                container,
                download: !cli.no_video_download,
            },
            capabilities,
            allow_lists: cli.allow_lists,
            approve_new_media: cli.approve_new_media,
            cache: (!cli.no_cache).then(|| CacheSettings {
                dir: PathBuf::from(DEFAULT_CACHE_DIR),
                ttl_secs: cli.cache_ttl,
            }),
            retry: RetryPolicy::default(),
            pipe: cli.pipe,
            verbose: cli.verbose,
        })
    }

    /// License with the configured holder, or `fallback_holder`.
    pub fn license(&self, fallback_holder: Option<&str>) -> License {
        let holder = self
            .copyright_holder
            .as_deref()
            .or(fallback_holder)
            .unwrap_or_default();
        License::new(self.license_id.clone(), holder)
    }

    pub fn pdf_allow_list_path(&self) -> PathBuf {
        self.data_dir.join(PDF_ALLOW_LIST_FILENAME)
    }

    pub fn video_allow_list_path(&self) -> PathBuf {
        self.data_dir.join(VIDEO_ALLOW_LIST_FILENAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CommandLineInput {
        let mut argv = vec!["md2channel"];
        argv.extend_from_slice(args);
        CommandLineInput::parse_from(argv)
    }

    #[test]
    fn test_defaults_resolve() {
        let config = CrawlConfig::resolve(parse(&["--repository", "./curricula-js"])).unwrap();
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.language.as_str(), "es");
        assert_eq!(config.video.max_height, 480);
        assert_eq!(config.video.container, "mp4");
        assert!(config.video.download);
        assert_eq!(config.capabilities, Capabilities::default());
        assert_eq!(
            config.tree_path,
            PathBuf::from(DEFAULT_OUTPUT_DIR).join(DEFAULT_TREE_FILENAME)
        );
        assert!(config.cache.is_some());
    }

    #[test]
    fn test_capability_flags() {
        let config = CrawlConfig::resolve(parse(&[
            "-r",
            "a",
            "-r",
            "https://github.com/Laboratoria/b.git",
            "--no-pdfs",
            "--no-video-download",
            "--no-cache",
        ]))
        .unwrap();
        assert!(config.capabilities.multi_repo);
        assert!(!config.capabilities.fetch_pdfs);
        assert!(config.capabilities.fetch_images);
        assert!(!config.video.download);
        assert!(config.cache.is_none());
    }

    #[test]
    fn test_missing_repository_is_fatal() {
        assert!(matches!(
            CrawlConfig::resolve(parse(&[])),
            Err(AppError::MissingConfiguration(_))
        ));
    }

    #[test]
    fn test_invalid_base_url_is_fatal() {
        assert!(CrawlConfig::resolve(parse(&["-r", "a", "--base-url", "ftp://x.org/"])).is_err());
        assert!(CrawlConfig::resolve(parse(&["-r", "a", "--max-video-height", "9000"])).is_err());
    }

    #[test]
    fn test_license_holder_fallback() {
        let config = CrawlConfig::resolve(parse(&["-r", "a"])).unwrap();
        let license = config.license(Some("Laboratoria"));
        assert_eq!(license.license_id, DEFAULT_LICENSE_ID);
        if config.copyright_holder.is_none() {
            assert_eq!(license.copyright_holder, "Laboratoria");
        }
    }
}
