// src/fetch/video.rs
//! YouTube videos: probe, pick a stream, download with subtitles.
//!
//! The network side sits behind [`VideoBackend`]; the production backend
//! runs `yt-dlp`. [`VideoFetcher`] holds the rules that do not depend on the
//! backend: which URLs are accepted, which stream is picked, when a download
//! is skipped and what counts as a failed download.

use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::error::FetchFailure;
use crate::error_recovery::RetryPolicy;
use crate::output::sanitize_filename;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Extractor messages after which a video never comes back.
const UNAVAILABLE_MARKERS: [&str; 5] = [
    "Video unavailable",
    "has been removed",
    "Private video",
    "This video is private",
    "removed by the uploader",
];

/// URL paths that name a collection rather than one video.
const COLLECTION_PATHS: [&str; 4] = ["/playlist", "/channel/", "/user/", "/c/"];

const SUBTITLE_EXTENSION: &str = "vtt";

// --- Backend capability ---

/// One downloadable stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFormat {
    pub format_id: String,
    pub ext: String,
    pub height: Option<u32>,
    pub has_video: bool,
    pub has_audio: bool,
}

/// Metadata reported by the backend before any download.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub uploader: Option<String>,
    pub subtitle_languages: Vec<String>,
    pub formats: Vec<VideoFormat>,
}

/// What to download and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Backend format selector.
    pub format: String,
    /// Final path of the video file.
    pub target: PathBuf,
    pub subtitle_languages: Vec<String>,
}

/// A video file with its subtitle tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedVideo {
    pub path: PathBuf,
    /// `(language, path)` per track.
    pub subtitles: Vec<(String, PathBuf)>,
}

/// The ability to inspect and download a video URL.
pub trait VideoBackend {
    fn probe(&self, url: &str) -> Result<VideoInfo, FetchFailure>;
    fn download(&self, url: &str, request: &DownloadRequest)
        -> Result<DownloadedVideo, FetchFailure>;
}

// --- Fetch rules ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSettings {
    pub max_height: u32,
    /// Container extension, e.g. `mp4`.
    pub container: String,
    /// When false only metadata is fetched.
    pub download: bool,
}

/// Result of handling one video URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoOutcome {
    Downloaded {
        info: VideoInfo,
        video: DownloadedVideo,
    },
    MetadataOnly(VideoInfo),
}

/// Applies the video rules on top of a backend.
pub struct VideoFetcher<'a> {
    backend: &'a dyn VideoBackend,
    settings: VideoSettings,
    retry: RetryPolicy,
}

impl<'a> VideoFetcher<'a> {
    pub fn new(backend: &'a dyn VideoBackend, settings: VideoSettings, retry: RetryPolicy) -> Self {
        Self {
            backend,
            settings,
            retry,
        }
    }

    /// Probes `url` and downloads it into `dest_dir` unless a non-empty copy
    /// is already there.
    ///
    /// An empty download is deleted and counts as a retryable failure, so it
    /// is attempted again within the retry budget.
    pub fn fetch(&self, url: &str, dest_dir: &Path) -> Result<VideoOutcome, FetchFailure> {
        validate_video_url(url)?;

        let info = self.retry.run(|| self.backend.probe(url))?;
        if !self.settings.download {
            log::debug!("Metadata only for {}", url);
            return Ok(VideoOutcome::MetadataOnly(info));
        }

        let stem = sanitize_filename(&info.id);
        let target = dest_dir.join(format!("{}.{}", stem, self.settings.container));
        if is_non_empty_file(&target) {
            log::info!("   - Video already downloaded: {}", target.display());
            let subtitles = existing_subtitles(dest_dir, &stem, &info.subtitle_languages);
            return Ok(VideoOutcome::Downloaded {
                info,
                video: DownloadedVideo {
                    path: target,
                    subtitles,
                },
            });
        }

        fs::create_dir_all(dest_dir).map_err(|e| FetchFailure::LocalIo {
            path: dest_dir.to_path_buf(),
            message: e.to_string(),
        })?;

        let request = DownloadRequest {
            format: select_format(&info.formats, self.settings.max_height, &self.settings.container),
            target,
            subtitle_languages: info.subtitle_languages.clone(),
        };
        log::debug!("Downloading {} with format {}", url, request.format);

        let video = self.retry.run(|| {
            let video = self.backend.download(url, &request)?;
            if is_non_empty_file(&video.path) {
                return Ok(video);
            }
            log::warn!("Empty video download for {}; discarding it", url);
            let _ = fs::remove_file(&video.path);
            Err(FetchFailure::Extractor {
                url: url.to_string(),
                message: "download produced an empty file".to_string(),
                terminal: false,
            })
        })?;

        log::info!("   - Got video: {}", video.path.display());
        Ok(VideoOutcome::Downloaded { info, video })
    }
}

/// Rejects collection URLs and URLs that do not name a single watch page.
pub fn validate_video_url(url: &str) -> Result<(), FetchFailure> {
    let reject = |reason: &str| {
        Err(FetchFailure::Rejected {
            url: url.to_string(),
            reason: reason.to_string(),
        })
    };

    let path = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .and_then(|rest| rest.find('/').map(|i| &rest[i..]))
        .unwrap_or("");
    if COLLECTION_PATHS.iter().any(|prefix| path.starts_with(prefix)) {
        return reject("playlist, channel and user pages are not single videos");
    }
    if !url.contains("watch?") {
        return reject("not a watch URL");
    }
    Ok(())
}

/// Format selector for the tallest stream within `max_height` in `container`.
///
/// Falls back to a generic selector when the probe listed no usable stream.
pub fn select_format(formats: &[VideoFormat], max_height: u32, container: &str) -> String {
    let best = formats
        .iter()
        .filter(|f| f.has_video && f.ext == container)
        .filter(|f| f.height.is_some_and(|h| h <= max_height))
        .max_by_key(|f| (f.height, f.has_audio));

    match best {
        Some(format) if format.has_audio => format.format_id.clone(),
        Some(format) => format!("{}+bestaudio", format.format_id),
        None => format!(
            "bestvideo[height<={h}][ext={c}]+bestaudio/best[height<={h}]",
            h = max_height,
            c = container
        ),
    }
}

fn is_non_empty_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.len() > 0)
}

fn subtitle_path(dir: &Path, stem: &str, language: &str) -> PathBuf {
    dir.join(format!("{}.{}.{}", stem, language, SUBTITLE_EXTENSION))
}

fn existing_subtitles(dir: &Path, stem: &str, languages: &[String]) -> Vec<(String, PathBuf)> {
    languages
        .iter()
        .map(|lang| (lang.clone(), subtitle_path(dir, stem, lang)))
        .filter(|(_, path)| is_non_empty_file(path))
        .collect()
}

// --- yt-dlp ---

/// Runs the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlpBackend {
    program: PathBuf,
}

#[derive(Deserialize)]
struct ProbeJson {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    subtitles: indexmap::IndexMap<String, serde_json::Value>,
    #[serde(default)]
    formats: Vec<FormatJson>,
}

#[derive(Deserialize)]
struct FormatJson {
    format_id: String,
    #[serde(default)]
    ext: String,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
}

impl YtDlpBackend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, url: &str, args: &[&str]) -> Result<Vec<u8>, FetchFailure> {
        log::debug!("Running {} {}", self.program.display(), args.join(" "));
        let output = Command::new(&self.program)
            .args(args)
            .arg(url)
            .output()
            .map_err(|e| FetchFailure::Extractor {
                url: url.to_string(),
                message: format!("failed to run {}: {}", self.program.display(), e),
                terminal: true,
            })?;

        if output.status.success() {
            return Ok(output.stdout);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(classify_extractor_error(url, &stderr))
    }
}

impl Default for YtDlpBackend {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl VideoBackend for YtDlpBackend {
    fn probe(&self, url: &str) -> Result<VideoInfo, FetchFailure> {
        let stdout = self.run(url, &["--dump-json", "--no-playlist", "--skip-download"])?;
        let probe: ProbeJson =
            serde_json::from_slice(&stdout).map_err(|e| FetchFailure::Extractor {
                url: url.to_string(),
                message: format!("unreadable metadata: {}", e),
                terminal: false,
            })?;

        Ok(VideoInfo {
            id: probe.id,
            title: probe.title,
            description: probe.description.unwrap_or_default(),
            uploader: probe.uploader,
            subtitle_languages: probe.subtitles.keys().cloned().collect(),
            formats: probe
                .formats
                .into_iter()
                .map(|f| VideoFormat {
                    has_video: f.vcodec.as_deref() != Some("none"),
                    has_audio: f.acodec.as_deref() != Some("none"),
                    format_id: f.format_id,
                    ext: f.ext,
                    height: f.height,
                })
                .collect(),
        })
    }

    fn download(
        &self,
        url: &str,
        request: &DownloadRequest,
    ) -> Result<DownloadedVideo, FetchFailure> {
        let dir = request.target.parent().unwrap_or_else(|| Path::new("."));
        let stem = request
            .target
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let container = request
            .target
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let template = dir
            .join(format!("{}.%(ext)s", stem))
            .to_string_lossy()
            .into_owned();
        let languages = request.subtitle_languages.join(",");

        let mut args = vec![
            "--no-playlist",
            "-f",
            request.format.as_str(),
            "--merge-output-format",
            container.as_str(),
            "-o",
            template.as_str(),
        ];
        if !languages.is_empty() {
            args.extend([
                "--write-subs",
                "--sub-format",
                SUBTITLE_EXTENSION,
                "--sub-langs",
                languages.as_str(),
            ]);
        }
        self.run(url, &args)?;

        Ok(DownloadedVideo {
            path: request.target.clone(),
            subtitles: existing_subtitles(dir, &stem, &request.subtitle_languages),
        })
    }
}

/// Turns extractor stderr into a failure, terminal when the video is gone.
fn classify_extractor_error(url: &str, stderr: &str) -> FetchFailure {
    let terminal = UNAVAILABLE_MARKERS
        .iter()
        .any(|marker| stderr.contains(marker));
    let line = stderr
        .lines()
        .find(|line| line.contains("ERROR"))
        .unwrap_or(stderr)
        .trim();
    FetchFailure::Extractor {
        url: url.to_string(),
        message: line.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect(),
        terminal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn format(id: &str, ext: &str, height: u32, audio: bool) -> VideoFormat {
        VideoFormat {
            format_id: id.to_string(),
            ext: ext.to_string(),
            height: Some(height),
            has_video: true,
            has_audio: audio,
        }
    }

    struct StubBackend {
        empty_downloads: usize,
        downloads: Cell<usize>,
    }

    impl VideoBackend for StubBackend {
        fn probe(&self, _url: &str) -> Result<VideoInfo, FetchFailure> {
            Ok(VideoInfo {
                id: "XYZ".to_string(),
                title: "Clase".to_string(),
                ..VideoInfo::default()
            })
        }

        fn download(
            &self,
            _url: &str,
            request: &DownloadRequest,
        ) -> Result<DownloadedVideo, FetchFailure> {
            let n = self.downloads.get();
            self.downloads.set(n + 1);
            let bytes: &[u8] = if n < self.empty_downloads { b"" } else { b"mp4" };
            fs::write(&request.target, bytes).unwrap();
            Ok(DownloadedVideo {
                path: request.target.clone(),
                subtitles: Vec::new(),
            })
        }
    }

    fn settings() -> VideoSettings {
        VideoSettings {
            max_height: 480,
            container: "mp4".to_string(),
            download: true,
        }
    }

    const URL: &str = "https://www.youtube.com/watch?v=XYZ";

    #[test]
    fn test_collection_urls_rejected() {
        for url in [
            "https://www.youtube.com/playlist?list=PL1",
            "https://www.youtube.com/channel/UC1",
            "https://www.youtube.com/user/someone",
            "https://www.youtube.com/embed/XYZ",
        ] {
            assert!(
                matches!(validate_video_url(url), Err(FetchFailure::Rejected { .. })),
                "{}",
                url
            );
        }
        assert!(validate_video_url(URL).is_ok());
    }

    #[test]
    fn test_select_format_within_height() {
        let formats = vec![
            format("18", "mp4", 360, true),
            format("135", "mp4", 480, false),
            format("136", "mp4", 720, false),
            format("244", "webm", 480, false),
        ];
        assert_eq!(select_format(&formats, 480, "mp4"), "135+bestaudio");
        assert_eq!(select_format(&formats, 360, "mp4"), "18");
        assert!(select_format(&[], 480, "mp4").starts_with("bestvideo[height<=480]"));
    }

    #[test]
    fn test_empty_download_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let backend = StubBackend {
            empty_downloads: 1,
            downloads: Cell::new(0),
        };
        let fetcher = VideoFetcher::new(&backend, settings(), RetryPolicy::immediate(3));

        let outcome = fetcher.fetch(URL, dir.path()).unwrap();
        let VideoOutcome::Downloaded { video, .. } = outcome else {
            panic!("expected a download");
        };
        assert_eq!(video.path, dir.path().join("XYZ.mp4"));
        assert_eq!(fs::read(&video.path).unwrap(), b"mp4");
        assert_eq!(backend.downloads.get(), 2);
    }

    #[test]
    fn test_empty_download_fails_when_budget_runs_out() {
        let dir = tempfile::tempdir().unwrap();
        let backend = StubBackend {
            empty_downloads: 5,
            downloads: Cell::new(0),
        };
        let fetcher = VideoFetcher::new(&backend, settings(), RetryPolicy::immediate(2));

        assert!(fetcher.fetch(URL, dir.path()).is_err());
        assert!(!dir.path().join("XYZ.mp4").exists());
        assert_eq!(backend.downloads.get(), 2);
    }

    #[test]
    fn test_existing_file_skips_download() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("XYZ.mp4"), b"already").unwrap();
        let backend = StubBackend {
            empty_downloads: 0,
            downloads: Cell::new(0),
        };
        let fetcher = VideoFetcher::new(&backend, settings(), RetryPolicy::immediate(3));

        assert!(matches!(
            fetcher.fetch(URL, dir.path()).unwrap(),
            VideoOutcome::Downloaded { .. }
        ));
        assert_eq!(backend.downloads.get(), 0);
    }

    #[test]
    fn test_metadata_only_mode() {
        let dir = tempfile::tempdir().unwrap();
        let backend = StubBackend {
            empty_downloads: 0,
            downloads: Cell::new(0),
        };
        let mut settings = settings();
        settings.download = false;
        let fetcher = VideoFetcher::new(&backend, settings, RetryPolicy::immediate(3));

        let outcome = fetcher.fetch(URL, dir.path()).unwrap();
        assert!(matches!(outcome, VideoOutcome::MetadataOnly(ref info) if info.id == "XYZ"));
        assert_eq!(backend.downloads.get(), 0);
    }

    #[test]
    fn test_unavailable_is_terminal() {
        let err = classify_extractor_error(
            URL,
            "[youtube] XYZ: Downloading webpage\nERROR: [youtube] XYZ: Video unavailable\n",
        );
        assert!(err.is_terminal());
        assert!(!err.is_retryable());
        assert!(!classify_extractor_error(URL, "ERROR: HTTP Error 503").is_terminal());
    }
}
