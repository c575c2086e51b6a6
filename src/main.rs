//! Command-line front-end for the harvest pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nber_harvest::config::{load_config, Config};
use nber_harvest::pipeline::{Pipeline, PipelineJob, PipelineOutput};
use nber_harvest::progress::{ProgressEvent, ProgressObserver};

#[derive(Parser, Debug)]
#[command(name = "nber-harvest", version, about = "Scrape NBER working paper metadata and bulk-download PDFs")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape the listing page into a metadata spreadsheet
    Scrape {
        /// Listing URL (defaults to the configured NBER listing)
        #[arg(long)]
        url: Option<String>,
    },
    /// Bulk-download PDFs for an inclusive identifier range
    Download {
        /// First working-paper number
        start: u32,
        /// Last working-paper number (inclusive)
        end: u32,
    },
    /// Scrape the listing and download a range in one run
    Run {
        /// First working-paper number
        start: u32,
        /// Last working-paper number (inclusive)
        end: u32,
        /// Listing URL (defaults to the configured NBER listing)
        #[arg(long)]
        url: Option<String>,
    },
}

/// Drives an indicatif bar from pipeline progress events
struct BarObserver {
    bar: ProgressBar,
}

impl BarObserver {
    fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }
}

impl ProgressObserver for BarObserver {
    fn on_progress(&self, event: ProgressEvent) {
        self.bar.inc(1);
        self.bar.set_message(format!("{:?}", event.status));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("nber_harvest={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let (job, total_items) = match &cli.command {
        Commands::Scrape { url } => {
            let url = url.clone().unwrap_or_else(|| config.source.listing_url.clone());
            (PipelineJob::listing(url), 1)
        }
        Commands::Download { start, end } => {
            (PipelineJob::range(*start, *end), range_len(*start, *end))
        }
        Commands::Run { start, end, url } => {
            let url = url.clone().unwrap_or_else(|| config.source.listing_url.clone());
            (PipelineJob::full(url, *start, *end), range_len(*start, *end) + 1)
        }
    };

    let observer = Arc::new(BarObserver::new(total_items));
    let output_paths = config.output.clone();
    let pipeline = Pipeline::new(config)?.with_observer(Arc::clone(&observer) as _);

    // Ctrl-C requests a cooperative stop; the in-flight item finishes
    let cancel = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("stop requested, finishing in-flight items");
            cancel.cancel();
        }
    });

    let output = pipeline.run(job).await?;
    observer.bar.finish_and_clear();

    write_artifacts(&output, &output_paths)?;
    report_summary(&output);
    Ok(())
}

fn range_len(start: u32, end: u32) -> u64 {
    u64::from(end.saturating_sub(start)) + 1
}

fn write_artifacts(output: &PipelineOutput, paths: &nber_harvest::config::OutputConfig) -> Result<()> {
    if !output.result.records.is_empty() {
        std::fs::write(&paths.table_path, &output.bundle.tabular_bytes)
            .with_context(|| format!("writing {}", paths.table_path.display()))?;
        println!("wrote {}", paths.table_path.display());
    }
    if let Some(archive) = &output.bundle.archive_bytes {
        std::fs::write(&paths.archive_path, archive)
            .with_context(|| format!("writing {}", paths.archive_path.display()))?;
        println!("wrote {}", paths.archive_path.display());
    }
    if let Some(pages) = &output.bundle.page_report_bytes {
        std::fs::write(&paths.page_report_path, pages)
            .with_context(|| format!("writing {}", paths.page_report_path.display()))?;
        println!("wrote {}", paths.page_report_path.display());
    }
    Ok(())
}

fn report_summary(output: &PipelineOutput) {
    let result = &output.result;
    println!(
        "{} records, {} downloaded, {} failed, {} listing entries skipped",
        result.records.len(),
        result.succeeded,
        result.failed,
        result.skipped_entries
    );
    for failure in result.failure_list() {
        println!(
            "  failed w{}: {}",
            failure.identifier,
            failure.error_detail.as_deref().unwrap_or("unknown error")
        );
    }
}
