//! `assetctl`: headless front end for the asset installer

use anyhow::{Context, Result, bail};
use asset_installer::{
    ArchiveExtractor, AssetFetcher, AssetId, AssetLibraryClient, CompositeObserver,
    ExtractMode, InstallObserver, InstallationQueue, InstallerConfig, LoggingObserver, Progress,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{Level, info, warn};

#[derive(Parser)]
#[command(name = "assetctl", version, about = "Download and install asset library packages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Asset library API base URL
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Directory for downloaded archives
    #[arg(long, global = true)]
    temp_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Install assets into a project, one after another
    Install {
        /// Project directory
        #[arg(short, long)]
        project: PathBuf,
        /// Asset IDs, installed in the given order
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show the metadata of an asset
    Info { id: String },
    /// Extract a local archive
    Extract {
        archive: PathBuf,
        destination: PathBuf,
        /// Unpack verbatim instead of locating the addon payload
        #[arg(long)]
        full: bool,
    },
}

/// Prints narration and coarse progress to stdout
#[derive(Default)]
struct ConsoleObserver {
    last_decile: AtomicU8,
}

impl InstallObserver for ConsoleObserver {
    fn on_status(&self, message: &str) {
        println!("{}", message);
    }

    fn on_progress(&self, progress: Progress) {
        if let Progress::Percent(p) = progress {
            let decile = p / 10;
            if self.last_decile.fetch_max(decile, Ordering::SeqCst) < decile {
                println!("  [{:>3}%]", p);
            }
        }
    }

    fn on_cancel_requested(&self) {
        println!("Cancellation requested, waiting for the current step to stop...");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let mut config = InstallerConfig::from_env();
    if let Some(base) = cli.api_base {
        config.api_base_url = base;
    }
    if let Some(dir) = cli.temp_dir {
        config.temp_dir = dir;
    }
    config
        .validate()
        .context("Invalid installer configuration")?;

    match cli.command {
        Commands::Install { project, ids } => install(config, project, ids).await,
        Commands::Info { id } => show_info(config, id).await,
        Commands::Extract {
            archive,
            destination,
            full,
        } => extract(config, archive, destination, full).await,
    }
}

async fn install(config: InstallerConfig, project: PathBuf, ids: Vec<String>) -> Result<()> {
    let fetcher = AssetLibraryClient::new(&config).context("Failed to create HTTP client")?;
    let queue = InstallationQueue::new(Arc::new(fetcher), config);

    let cancel = queue.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling installation");
            cancel.cancel();
        }
    });

    let observer = CompositeObserver::new()
        .add_observer(Arc::new(ConsoleObserver::default()))
        .add_observer(Arc::new(LoggingObserver));

    let ids: Vec<AssetId> = ids.into_iter().map(AssetId::from).collect();
    let summary = queue.run(ids, &project, Arc::new(observer)).await;

    for result in &summary.results {
        let marker = if result.success() { "ok" } else { "--" };
        println!("  {} {}", marker, result.message);
    }

    if !summary.all_succeeded() {
        bail!(
            "{} of {} assets installed",
            summary.succeeded_count,
            summary.total_requested
        );
    }
    Ok(())
}

async fn show_info(config: InstallerConfig, id: String) -> Result<()> {
    let fetcher = AssetLibraryClient::new(&config).context("Failed to create HTTP client")?;
    let asset_id = AssetId::from(id);
    let metadata = fetcher
        .fetch_asset_metadata(&asset_id)
        .await
        .with_context(|| format!("Failed to look up asset {}", asset_id))?;

    println!("ID:       {}", asset_id);
    println!("Title:    {}", metadata.title);
    if metadata.has_download_url() {
        println!("Download: {}", metadata.download_url);
    } else {
        println!("Download: (none)");
    }
    Ok(())
}

async fn extract(
    config: InstallerConfig,
    archive: PathBuf,
    destination: PathBuf,
    full: bool,
) -> Result<()> {
    let mode = if full { ExtractMode::Full } else { ExtractMode::Smart };
    let extractor = ArchiveExtractor::new(&config);

    info!("Extracting {} ({:?})", archive.display(), mode);
    let target = destination.clone();
    tokio::task::spawn_blocking(move || extractor.extract_with_mode(&archive, &target, mode))
        .await
        .context("Extraction task failed")?
        .context("Extraction failed")?;

    println!("Extracted into {}", destination.display());
    Ok(())
}
