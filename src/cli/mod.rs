//! Command-line interface for topicpath.
//!
//! Provides commands for resolving content paths, inspecting category
//! counts, scanning and watching the content root, and draining the job
//! queue.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{AvailabilityRecords, DiskAvailability, JobDispatch};
use crate::config::{self, ResolvedConfig};
use crate::core::{spawn_dispatcher, AggregateCache, ContentService, Page, Reconciler, Resolved, Resolver};
use crate::ingest::{run_pending_jobs, ContentScanner, ContentWatcher, JobQueue, WatcherConfig};
use crate::library::Catalog;

/// topicpath - Content path resolver for an offline course library
#[derive(Parser, Debug)]
#[command(name = "topicpath")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a content path and show its page data
    Resolve {
        /// Slash-delimited path (e.g. math/arithmetic/v/add-sub)
        path: String,

        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show availability counts for a category path
    Counts {
        /// Category path (e.g. math/arithmetic)
        path: String,
    },

    /// List top-level topics
    Home,

    /// Print every exercise path as JSON
    Exercises,

    /// Scan the content root and refresh availability records
    Scan,

    /// Watch the content root and rescan on change
    Watch,

    /// Show job queue status
    Jobs {
        /// Run pending jobs before reporting
        #[arg(long)]
        run: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Shared services built from configuration
struct Runtime {
    catalog: Arc<Catalog>,
    cache: Arc<AggregateCache>,
    records: Arc<AvailabilityRecords>,
    oracle: Arc<DiskAvailability>,
    queue: Arc<JobQueue>,
}

impl Runtime {
    async fn open(cfg: &ResolvedConfig) -> Result<Self> {
        let catalog = Catalog::load(&cfg.catalog)
            .await
            .with_context(|| format!("Failed to load catalog: {}", cfg.catalog.display()))?;

        let records = Arc::new(AvailabilityRecords::open(cfg.records_path())?);
        let oracle = Arc::new(DiskAvailability::new(
            &cfg.content_root,
            cfg.scan.extensions.clone(),
            records.clone(),
        ));
        let cache = Arc::new(AggregateCache::new(oracle.clone()));
        let queue = Arc::new(JobQueue::open_default().await?);

        Ok(Self {
            catalog: Arc::new(catalog),
            cache,
            records,
            oracle,
            queue,
        })
    }

    fn scanner(&self, cfg: &ResolvedConfig) -> ContentScanner {
        ContentScanner::new(
            &cfg.content_root,
            cfg.scan.extensions.clone(),
            self.records.clone(),
            self.cache.clone(),
        )
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = config::config()?;

        match self.command {
            Commands::Resolve { path, json } => resolve(cfg, &path, json).await,
            Commands::Counts { path } => show_counts(cfg, &path).await,
            Commands::Home => show_home(cfg).await,
            Commands::Exercises => show_exercises(cfg).await,
            Commands::Scan => scan(cfg).await,
            Commands::Watch => watch(cfg).await,
            Commands::Jobs { run } => show_jobs(cfg, run).await,
            Commands::Config => show_config(cfg),
        }
    }
}

/// Resolve a path and print its page
async fn resolve(cfg: &ResolvedConfig, path: &str, json: bool) -> Result<()> {
    let runtime = Runtime::open(cfg).await?;

    let (reconciler, requests) = Reconciler::channel(runtime.oracle.clone(), cfg.reconcile_capacity);
    let dispatcher: Arc<dyn JobDispatch> = runtime.queue.clone();
    let dispatch = spawn_dispatcher(requests, dispatcher);

    {
        let service = ContentService::new(runtime.catalog.clone(), runtime.cache.clone(), reconciler);
        let page = service.open(path)?;

        if json {
            println!("{}", serde_json::to_string_pretty(&page)?);
        } else {
            print_page(&page);
        }
    }

    // Service dropped, so the channel is closed and the dispatcher drains
    let queued = dispatch.await?;
    if queued > 0 {
        eprintln!("\n[Requested videoscan for unrecorded video]");
    }

    Ok(())
}

fn print_page(page: &Page<'_>) {
    match page {
        Page::Topic {
            topic,
            description,
            counts,
            videos,
            exercises,
            subtopics,
        } => {
            println!("Topic: {} ({})", topic.title, topic.path);
            if !description.is_empty() {
                println!("  {}", description);
            }
            println!("Videos available: {}", counts);

            if !subtopics.is_empty() {
                println!("\n{:<40} {:<30} {:>10}", "TOPIC", "PATH", "VIDEOS");
                println!("{}", "-".repeat(82));
                for sub in subtopics {
                    println!("{:<40} {:<30} {:>10}", sub.title, sub.path, sub.counts.to_string());
                }
            }
            for video in videos {
                println!("  [video]    {:<40} {}", video.title, video.path);
            }
            for exercise in exercises {
                println!("  [exercise] {:<40} {}", exercise.title, exercise.path);
            }
        }
        Page::Video {
            video,
            available,
            previous,
            next,
        } => {
            println!("Video: {} ({})", video.title, video.path);
            println!("  ID: {}", video.id);
            if let Some(duration) = video.duration {
                println!("  Duration: {}s", duration);
            }
            println!("  Available: {}", if *available { "yes" } else { "no" });
            if let Some(prev) = previous {
                println!("  Previous: {} ({})", prev.title, prev.path);
            }
            if let Some(next) = next {
                println!("  Next: {} ({})", next.title, next.path);
            }
        }
        Page::Exercise {
            exercise,
            related_videos,
        } => {
            println!("Exercise: {} ({})", exercise.title, exercise.path);
            if related_videos.is_empty() {
                println!("  No related videos");
            }
            for video in related_videos {
                println!("  Related: {} ({})", video.title, video.path);
            }
        }
    }
}

/// Show counts for a category path
async fn show_counts(cfg: &ResolvedConfig, path: &str) -> Result<()> {
    let runtime = Runtime::open(cfg).await?;

    let resolved = Resolver::new(&runtime.catalog).resolve_path(path)?;
    let Resolved::Category(category) = resolved else {
        anyhow::bail!("Not a topic: {} is a {}", resolved.path(), resolved.kind());
    };

    let counts = runtime.cache.get_counts(category);
    println!("{}: {} videos available", category.path, counts);

    Ok(())
}

/// List top-level topics
async fn show_home(cfg: &ResolvedConfig) -> Result<()> {
    let runtime = Runtime::open(cfg).await?;
    let (reconciler, _requests) = Reconciler::channel(runtime.oracle.clone(), 1);
    let service = ContentService::new(runtime.catalog.clone(), runtime.cache.clone(), reconciler);

    let topics = service.home();
    if topics.is_empty() {
        println!("Catalog has no visible topics.");
        return Ok(());
    }

    println!("{:<40} {:<40}", "TOPIC", "PATH");
    println!("{}", "-".repeat(80));
    for topic in topics {
        println!("{:<40} {:<40}", topic.title, topic.path);
    }

    Ok(())
}

/// Print exercise paths
async fn show_exercises(cfg: &ResolvedConfig) -> Result<()> {
    let runtime = Runtime::open(cfg).await?;
    let (reconciler, _requests) = Reconciler::channel(runtime.oracle.clone(), 1);
    let service = ContentService::new(runtime.catalog.clone(), runtime.cache.clone(), reconciler);

    println!("{}", serde_json::to_string_pretty(&service.exercise_paths())?);
    Ok(())
}

/// Scan once
async fn scan(cfg: &ResolvedConfig) -> Result<()> {
    let runtime = Runtime::open(cfg).await?;
    let report = runtime.scanner(cfg).scan().await?;

    println!("Videos on disk: {}", report.found);
    println!("Newly recorded: {}", report.added);
    println!("Removed:        {}", report.removed);

    Ok(())
}

/// Watch the content root until interrupted
async fn watch(cfg: &ResolvedConfig) -> Result<()> {
    let runtime = Runtime::open(cfg).await?;
    let scanner = Arc::new(runtime.scanner(cfg));

    // Bring records up to date before watching
    let initial = scanner.scan().await?;
    eprintln!("Initial scan: {} videos on disk", initial.found);

    let watcher = ContentWatcher::new(
        scanner,
        WatcherConfig {
            stability_delay_secs: cfg.scan.stability_delay_secs,
        },
    );
    let (mut reports, handle) = watcher.watch()?;

    eprintln!("Watching {} (Ctrl-C to stop)", cfg.content_root.display());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            report = reports.recv() => match report {
                Some(report) if report.changed() => {
                    eprintln!("Rescanned: {} on disk (+{} / -{})", report.found, report.added, report.removed);
                }
                Some(_) => {}
                None => break,
            },
        }
    }

    handle.stop().await
}

/// Show (and optionally run) queued jobs
async fn show_jobs(cfg: &ResolvedConfig, run: bool) -> Result<()> {
    let runtime = Runtime::open(cfg).await?;

    if run {
        let summary = run_pending_jobs(&runtime.queue, &runtime.scanner(cfg)).await?;
        eprintln!(
            "Ran jobs: {} completed, {} failed ({} stalled jobs retried)",
            summary.completed, summary.failed, summary.retried
        );
    }

    let status = runtime.queue.status().await?;
    println!(
        "Jobs: {} pending, {} processing, {} done, {} failed",
        status.pending, status.processing, status.done, status.failed
    );

    if !status.recent.is_empty() {
        println!("\n{:<38} {:<20} {:<12} {:>7}", "JOB ID", "NAME", "STATUS", "RETRIES");
        println!("{}", "-".repeat(80));
        for job in &status.recent {
            let status = format!("{:?}", job.status);
            println!("{:<38} {:<20} {:<12} {:>7}", job.id, job.name, status, job.retry_count);
        }
    }

    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!("Config file: {}", cfg.config_file.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "(none - using defaults)".to_string()));
    println!();
    println!("Paths:");
    println!("  Home (state):    {}", cfg.home.display());
    println!("  Content root:    {}", cfg.content_root.display());
    println!("  Catalog:         {}", cfg.catalog.display());
    println!("  Job queue:       {}", cfg.job_queue_path().display());
    println!("  Records:         {}", cfg.records_path().display());
    println!();
    println!("Scan:");
    println!("  Extensions:      {}", cfg.scan.extensions.join(", "));
    println!("  Stability delay: {}s", cfg.scan.stability_delay_secs);
    println!();
    println!("Reconcile channel capacity: {}", cfg.reconcile_capacity);

    Ok(())
}
