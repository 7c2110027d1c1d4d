//! Index building and publishing for peoplefs.
//!
//! This crate turns the photos under an input root into [`TagIndex`]
//! snapshots and keeps the published snapshot up to date:
//!
//! extraction (exiftool) → [`IndexBuilder`] → [`IndexStore`] ← [`RebuildTrigger`] ← [`FileWatcher`]
//!
//! # Components
//!
//! - [`ExiftoolExtractor`]: Reads person tags with the `exiftool` binary
//! - [`IndexBuilder`]: Walks the input root and folds extracted tags into a snapshot
//! - [`IndexStore`]: Holds the published snapshot and swaps it atomically
//! - [`FileWatcher`]: Monitors the input root for file changes
//! - [`RebuildTrigger`]: Debounces change events and republishes
//!
//! # Example
//!
//! ```rust,ignore
//! use peoplefs_index::{ExiftoolExtractor, IndexBuilder, IndexStore, RebuildTrigger};
//!
//! let extractor = Arc::new(ExiftoolExtractor::new("exiftool"));
//! let builder = Arc::new(IndexBuilder::new(root.clone(), extractor));
//! let store = Arc::new(IndexStore::new(&root));
//! let trigger = Arc::new(RebuildTrigger::new(builder, store.clone(), debounce));
//!
//! // Fatal if the very first build fails
//! trigger.initial_build().await?;
//!
//! // Rebuild on every quiet period after file changes
//! let handle = trigger.clone().spawn(events_rx);
//! ```
//!
//! [`TagIndex`]: peoplefs_core::TagIndex

pub mod builder;
pub mod exiftool;
pub mod store;
pub mod trigger;
pub mod watcher;

pub use builder::{BuilderConfig, IndexBuilder};
pub use exiftool::ExiftoolExtractor;
pub use store::IndexStore;
pub use trigger::{RebuildEvent, RebuildTrigger, TriggerState};
pub use watcher::FileWatcher;
