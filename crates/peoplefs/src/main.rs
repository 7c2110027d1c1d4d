//! # peoplefs CLI
//!
//! Mounts a read-only view of a photo collection with one top-level
//! directory per person tagged in the photos (`RegionPersonDisplayName` /
//! `RegionName`, read with exiftool). Photos without any person tag are
//! listed under `no one`.
//!
//! ## Example
//!
//! ```bash
//! peoplefs ~/Pictures /mnt/people
//! ls "/mnt/people/Alice/2023/summer"
//! ```
//!
//! The index is rebuilt in the background whenever the input tree changes.
//! Ctrl+C (or SIGTERM) unmounts and exits.

use anyhow::{Context, Result};
use clap::Parser;
use peoplefs_fuse::{mount, PeopleFs};
use peoplefs_index::{
    BuilderConfig, ExiftoolExtractor, FileWatcher, IndexBuilder, IndexStore, RebuildTrigger,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod config;

use config::Config;

/// Debounce applied by the watcher itself, before the rebuild quiet period.
const WATCH_DEBOUNCE: Duration = Duration::from_millis(100);

/// How long shutdown waits for an in-flight rebuild.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "peoplefs")]
#[command(about = "Browse a photo collection by the people tagged in it")]
#[command(version)]
struct Cli {
    /// Directory containing the photos
    input: PathBuf,

    /// Mount point
    mountpoint: PathBuf,

    /// Path to config file (default: ~/.config/peoplefs/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Allow other users to access the mount
    #[arg(long)]
    allow_other: bool,

    /// Quiet period before the index is rebuilt after a change
    #[arg(long, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// exiftool binary to run
    #[arg(long, value_name = "PATH")]
    exiftool: Option<PathBuf>,
}

impl Cli {
    /// Fold command line overrides into the file configuration.
    fn apply(&self, config: &mut Config) {
        if self.allow_other {
            config.mount.allow_other = true;
        }
        if let Some(ms) = self.debounce_ms {
            config.watch.debounce_ms = ms;
        }
        if let Some(exiftool) = &self.exiftool {
            config.index.exiftool = exiftool.clone();
        }
    }
}

/// Canonicalize the input root and check it is a directory.
fn validate_input(input: &Path) -> Result<PathBuf> {
    let input = input
        .canonicalize()
        .with_context(|| format!("Input directory does not exist: {}", input.display()))?;
    if !input.is_dir() {
        anyhow::bail!("Input is not a directory: {}", input.display());
    }
    Ok(input)
}

/// Canonicalize the mount point and check it can host the mount.
fn validate_mountpoint(mountpoint: &Path, input: &Path) -> Result<PathBuf> {
    let mountpoint = mountpoint
        .canonicalize()
        .with_context(|| format!("Mount point does not exist: {}", mountpoint.display()))?;
    if !mountpoint.is_dir() {
        anyhow::bail!("Mount point is not a directory: {}", mountpoint.display());
    }
    // The index walk would otherwise descend into the mount itself.
    if mountpoint.starts_with(input) {
        anyhow::bail!(
            "Mount point {} must not be inside the input directory {}",
            mountpoint.display(),
            input.display()
        );
    }
    Ok(mountpoint)
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() -> Result<()> {
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to wait for Ctrl+C")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let input = validate_input(&cli.input)?;
    let mountpoint = validate_mountpoint(&cli.mountpoint, &input)?;
    info!("Mounting {:?} at {:?}", input, mountpoint);

    let extractor = Arc::new(
        ExiftoolExtractor::new(&config.index.exiftool).with_batch_size(config.index.batch_size),
    );
    let builder = Arc::new(IndexBuilder::with_config(
        input.clone(),
        extractor,
        BuilderConfig {
            include_hidden: config.index.include_hidden,
        },
    ));
    let store = Arc::new(IndexStore::new(&input));
    let trigger = Arc::new(RebuildTrigger::new(
        builder,
        store.clone(),
        config.watch.debounce(),
    ));

    // Watch before the first build so changes made during it are queued.
    let (event_tx, event_rx) = mpsc::channel(1024);
    let watcher = if config.watch.enabled {
        let mut file_watcher = FileWatcher::new(
            input.clone(),
            event_tx,
            WATCH_DEBOUNCE,
            config.index.include_hidden,
        )
        .context("Failed to create file watcher")?;
        file_watcher
            .watch()
            .with_context(|| format!("Failed to watch {}", input.display()))?;
        Some(file_watcher)
    } else {
        None
    };

    // Nothing to serve without a first index.
    trigger
        .initial_build()
        .await
        .context("Failed to build the initial index")?;

    let rebuild_task = if watcher.is_some() {
        info!(
            "Watching for changes (rebuild after {} ms of quiet)",
            config.watch.debounce_ms
        );
        Some(trigger.clone().spawn(event_rx))
    } else {
        None
    };

    // FUSE callbacks run on the session thread and block on this runtime.
    let fs = PeopleFs::new(store, tokio::runtime::Handle::current());
    let mount_config = peoplefs_fuse::MountConfig {
        allow_other: config.mount.allow_other,
    };
    let session = mount::spawn(fs, &mountpoint, &mount_config)
        .with_context(|| format!("Failed to mount at {}", mountpoint.display()))?;
    info!("Mounted. Press Ctrl+C to unmount.");

    shutdown_signal().await?;
    info!("Shutting down");

    trigger.stop();
    drop(watcher);
    drop(session);
    if let Err(e) = mount::unmount(&mountpoint) {
        warn!("Unmount failed: {}", e);
    }

    if let Some(task) = rebuild_task {
        if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
            warn!("Rebuild still running at shutdown, abandoning it");
        }
    }

    info!("Unmounted {:?}", mountpoint);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        config.logging.level()?
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    run(cli, config).await
}
