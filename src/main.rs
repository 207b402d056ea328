// src/main.rs

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use md2channel::analytics::{measure_tree, measure_tree_detailed};
use md2channel::document::DocumentConverter;
use md2channel::fetch::{
    CachedSource, DiskCache, HttpFetcher, ResourceSource, UrlAllowList, VideoFetcher,
    YtDlpBackend,
};
use md2channel::output::{deliver, prepare_output_dir, DeliveryTarget, OutputPlan, OutputReport};
use md2channel::pipeline::{ChannelDelivery, ChannelSource, TreeNormalizer};
use md2channel::repository::resolve_repository;
use md2channel::tree::{
    normalize, render_channel_json, BuildSettings, ChannelInfo, ChannelTree, CrawlOutcome,
    CrawlReport, NormalizeSummary, RunContext, TreeBuilder,
};
use md2channel::{AppError, CommandLineInput, CrawlConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let log_file_path = std::env::temp_dir().join("md2channel.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    // stderr keeps stdout clean for pipe mode
    let console_appender = ConsoleAppender::builder()
        .target(log4rs::append::console::Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("console", Box::new(console_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("console")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::debug!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Executes the three-stage run: crawl → normalize → deliver.
fn execute_pipeline(config: &CrawlConfig) -> Result<(), AppError> {
    let pipeline = Md2Channel::new(config);

    let mut outcome = pipeline.crawl()?;
    let summary = pipeline.normalize(&mut outcome.tree);
    let report = pipeline.deliver(&outcome)?;
    pipeline.report_completion(&outcome, &summary, &report);

    Ok(())
}

/// Orchestrates crawling the repositories and delivering the channel tree.
struct Md2Channel<'a> {
    config: &'a CrawlConfig,
}

impl<'a> Md2Channel<'a> {
    fn new(config: &'a CrawlConfig) -> Self {
        Self { config }
    }

    /// Network access, cached unless disabled. Responses under the base URL
    /// never expire.
    fn resource_source(&self) -> Result<Box<dyn ResourceSource>, AppError> {
        let fetcher = HttpFetcher::new(self.config.retry)?;
        match &self.config.cache {
            None => {
                log::info!("Cache disabled, every resource is fetched fresh");
                Ok(Box::new(fetcher))
            }
            Some(settings) => {
                log::info!(
                    "Cache enabled at {} (TTL: {}s)",
                    settings.dir.display(),
                    settings.ttl_secs
                );
                let cache = DiskCache::new(&settings.dir, settings.ttl_secs)
                    .map_err(|source| AppError::OutputNotWritable {
                        path: settings.dir.clone(),
                        source,
                    })?
                    .with_forever_prefix(self.config.base_url.as_str());
                Ok(Box::new(CachedSource::new(fetcher, cache)))
            }
        }
    }

    fn load_allow_lists(&self) -> Result<(Option<UrlAllowList>, Option<UrlAllowList>), AppError> {
        if !self.config.allow_lists {
            return Ok((None, None));
        }
        let approve = self.config.approve_new_media;
        let pdfs = UrlAllowList::load(self.config.pdf_allow_list_path(), approve)?;
        let videos = UrlAllowList::load(self.config.video_allow_list_path(), approve)?;
        log::info!(
            "Allow-lists loaded: {} PDFs, {} videos",
            pdfs.len(),
            videos.len()
        );
        Ok((Some(pdfs), Some(videos)))
    }

    fn channel_info(&self, checkouts: &[PathBuf]) -> ChannelInfo {
        let source_id = checkouts
            .iter()
            .filter_map(|dir| dir.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("+");
        ChannelInfo {
            source_domain: self.config.base_url.host().to_string(),
            source_id,
            title: self.config.title.clone().unwrap_or_default(),
            description: String::new(),
            thumbnail: self.config.thumbnail.clone(),
            language: self.config.language.clone(),
            license: self.config.license(None),
        }
    }

    /// Builds the tree file plan: the JSON, plus any allow-list that grew.
    fn delivery_plan(&self, outcome: &CrawlOutcome) -> Result<OutputPlan, AppError> {
        let json_dir = self
            .config
            .tree_path
            .parent()
            .unwrap_or_else(|| Path::new("."));
        let json = render_channel_json(&outcome.tree, json_dir)?;

        let mut plan = OutputPlan::new();
        plan = if self.config.pipe {
            plan.with_operation(DeliveryTarget::PrintToStdout { content: json })
        } else {
            plan.with_operation(DeliveryTarget::WriteFile {
                path: self.config.tree_path.clone(),
                content: json,
            })
        };

        for list in [&outcome.pdf_allow_list, &outcome.video_allow_list]
            .into_iter()
            .flatten()
            .filter(|list| list.is_dirty())
        {
            plan = plan.with_operation(DeliveryTarget::WriteFile {
                path: list.path().to_path_buf(),
                content: list.render()?,
            });
        }
        Ok(plan)
    }

    /// Reports completion to the user with stats and delivery confirmations.
    fn report_completion(
        &self,
        outcome: &CrawlOutcome,
        summary: &NormalizeSummary,
        report: &OutputReport,
    ) {
        if self.config.pipe {
            return;
        }

        let stats = measure_tree(&outcome.tree);
        let crawl: &CrawlReport = &outcome.report;
        println!(
            "📄 Crawled {} documents into {} topics and {} content items.",
            crawl.documents, stats.topics, stats.content_items
        );
        println!(
            "   {} bundles, {} images, {} PDFs, {} videos",
            crawl.bundles, crawl.images, crawl.pdfs, crawl.videos
        );
        if summary.hoisted > 0 {
            println!("   {} single-item topics collapsed", summary.hoisted);
        }
        if crawl.metadata_only > 0 {
            println!("   {} videos recorded without download", crawl.metadata_only);
        }
        if crawl.unapproved > 0 {
            eprintln!(
                "⚠️  {} media files await approval in the allow-lists.",
                crawl.unapproved
            );
        }
        if !crawl.warnings.is_empty() {
            eprintln!(
                "⚠️  {} problems were skipped. See the log for details.",
                crawl.warnings.len()
            );
        }

        if self.config.verbose {
            let detailed = measure_tree_detailed(&outcome.tree);
            log::debug!(
                "Tree depth {}, {} empty topics",
                detailed.deepest_nesting,
                detailed.empty_topics
            );
        }

        for completed in &report.completed {
            if let DeliveryTarget::WriteFile { path, .. } = &completed.operation {
                println!("✓ Saved {}", path.display());
            }
        }
    }
}

impl ChannelSource for Md2Channel<'_> {
    fn crawl(&self) -> Result<CrawlOutcome, AppError> {
        prepare_output_dir(&self.config.output_dir)?;

        let checkouts = self
            .config
            .repositories
            .iter()
            .map(|selector| resolve_repository(selector, &self.config.work_dir))
            .collect::<Result<Vec<_>, _>>()?;

        let source = self.resource_source()?;
        let backend = YtDlpBackend::default();
        let (pdf_allow_list, video_allow_list) = self.load_allow_lists()?;

        let ctx = RunContext {
            settings: BuildSettings {
                base_url: self.config.base_url.clone(),
                output_dir: self.config.output_dir.clone(),
                language: self.config.language.clone(),
                capabilities: self.config.capabilities,
            },
            source: source.as_ref(),
            videos: VideoFetcher::new(&backend, self.config.video.clone(), self.config.retry),
            pdf_allow_list,
            video_allow_list,
            report: CrawlReport::default(),
        };
        let converter = DocumentConverter::new(self.config.language.clone())?;
        let mut builder = TreeBuilder::new(ctx, converter, self.channel_info(&checkouts));

        for checkout in &checkouts {
            builder.crawl_repository(checkout);
        }

        let outcome = builder.finish();
        log::info!(
            "Crawl finished: {} documents, {} topics, {} warnings",
            outcome.report.documents,
            outcome.tree.topic_count(),
            outcome.report.warnings.len()
        );
        Ok(outcome)
    }
}

impl TreeNormalizer for Md2Channel<'_> {
    fn normalize(&self, tree: &mut ChannelTree) -> NormalizeSummary {
        let summary = normalize(tree);
        log::info!(
            "Normalized tree: {} topics collapsed, {} items renamed",
            summary.hoisted,
            summary.renamed
        );
        summary
    }
}

impl ChannelDelivery for Md2Channel<'_> {
    fn deliver(&self, outcome: &CrawlOutcome) -> Result<OutputReport, AppError> {
        let report = deliver(self.delivery_plan(outcome)?)?;

        if !report.is_success() {
            return Err(AppError::DeliveryFailed {
                failures: report.failed.iter().map(|f| f.error.clone()).collect(),
            });
        }

        Ok(report)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose).map_err(|e| anyhow::anyhow!("failed to set up logging: {}", e))?;

    let config = CrawlConfig::resolve(cli).context("invalid configuration")?;

    execute_pipeline(&config)?;

    Ok(())
}
