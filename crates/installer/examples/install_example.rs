//! Example installing a couple of assets into a scratch project
//!
//! Run this example with:
//! ```
//! cargo run --example install_example -- 1234 5678
//! ```
//! Press Ctrl-C to cancel the running installation.

use asset_installer::{
    AssetId, AssetLibraryClient, CompositeObserver, InstallObserver, InstallationQueue,
    InstallerConfig, LoggingObserver, Progress,
};
use std::sync::Arc;
use tempfile::tempdir;
use tracing::Level;

/// Prints every status line and progress update
struct PrintObserver;

impl InstallObserver for PrintObserver {
    fn on_status(&self, message: &str) {
        println!("📋 {}", message);
    }

    fn on_progress(&self, progress: Progress) {
        match progress {
            Progress::Percent(p) => println!("📊 {}%", p),
            Progress::Indeterminate => println!("📊 ..."),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let ids: Vec<AssetId> = std::env::args().skip(1).map(AssetId::from).collect();
    if ids.is_empty() {
        println!("Usage: install_example <ASSET_ID>...");
        return Ok(());
    }

    let project = tempdir()?;
    println!("📁 Project directory: {}", project.path().display());

    let config = InstallerConfig::from_env();
    config.validate()?;
    let fetcher = Arc::new(AssetLibraryClient::new(&config)?);
    let queue = InstallationQueue::new(fetcher, config);

    let observer = CompositeObserver::new()
        .add_observer(Arc::new(PrintObserver))
        .add_observer(Arc::new(LoggingObserver));

    let handle = queue.spawn(ids, project.path().to_path_buf(), Arc::new(observer));
    let cancel = handle.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let summary = handle.wait().await?;
    println!("✅ {}", summary.message());
    for result in &summary.results {
        println!("   {} -> {:?}", result.asset_id, result.status);
    }

    Ok(())
}
