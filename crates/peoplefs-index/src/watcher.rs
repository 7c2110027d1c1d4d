//! File system watcher for detecting changes under the input root.

use notify_debouncer_full::notify::event::ModifyKind;
use notify_debouncer_full::notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{
    new_debouncer, DebounceEventResult, DebouncedEvent, Debouncer, RecommendedCache,
};
use peoplefs_core::FileEvent;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, error, warn};

/// Recursive file system watcher with debouncing.
///
/// Converted events are forwarded into a tokio channel; each one is a
/// rebuild trigger for whoever consumes the channel.
pub struct FileWatcher {
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    root: PathBuf,
}

impl FileWatcher {
    /// Create a watcher for the tree under `root`.
    ///
    /// Events about hidden entries below `root` (any dot-named component)
    /// are dropped unless `include_hidden` is set. Nothing is watched until
    /// [`FileWatcher::watch`] is called.
    pub fn new(
        root: impl Into<PathBuf>,
        event_tx: tokio_mpsc::Sender<FileEvent>,
        debounce_duration: Duration,
        include_hidden: bool,
    ) -> Result<Self, notify::Error> {
        let root = root.into();
        let filter = HiddenFilter {
            root: root.clone(),
            include_hidden,
        };
        let (tx, rx) = mpsc::channel();

        // Convert on a plain thread: the debouncer callback must not block.
        std::thread::spawn(move || {
            while let Ok(result) = rx.recv() {
                if !forward_events(result, &event_tx, &filter) {
                    debug!("Event channel closed, stopping watcher thread");
                    break;
                }
            }
        });

        let debouncer = new_debouncer(debounce_duration, None, move |result| {
            let _ = tx.send(result);
        })?;

        Ok(Self { debouncer, root })
    }

    /// Start watching the root recursively.
    pub fn watch(&mut self) -> Result<(), notify::Error> {
        debug!("Starting to watch: {:?}", self.root);
        self.debouncer.watch(&self.root, RecursiveMode::Recursive)
    }
}

/// Decides which event paths count as hidden.
#[derive(Debug, Clone)]
struct HiddenFilter {
    root: PathBuf,
    include_hidden: bool,
}

impl HiddenFilter {
    /// Whether any component of `path` below the root starts with `.`.
    fn is_hidden(&self, path: &Path) -> bool {
        if self.include_hidden {
            return false;
        }
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative.components().any(|component| match component {
            Component::Normal(name) => name.to_string_lossy().starts_with('.'),
            _ => false,
        })
    }
}

/// Returns `false` once the receiving side is gone.
fn forward_events(
    result: DebounceEventResult,
    event_tx: &tokio_mpsc::Sender<FileEvent>,
    filter: &HiddenFilter,
) -> bool {
    match result {
        Ok(events) => {
            for event in events {
                let Some(file_event) = convert_event(&event, filter) else {
                    continue;
                };
                // Blocking send: this runs on a std thread.
                if event_tx.blocking_send(file_event).is_err() {
                    warn!("Event channel closed");
                    return false;
                }
            }
        }
        Err(errors) => {
            for error in errors {
                error!("Watch error: {error}");
            }
        }
    }
    true
}

fn convert_event(event: &DebouncedEvent, filter: &HiddenFilter) -> Option<FileEvent> {
    let path = event.paths.first()?.clone();

    if event.paths.iter().all(|p| filter.is_hidden(p)) {
        return None;
    }

    match &event.kind {
        EventKind::Create(_) => Some(FileEvent::Created(path)),
        // Atime/permission changes don't affect tags.
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(ModifyKind::Name(_)) if event.paths.len() >= 2 => {
            Some(FileEvent::Renamed {
                from: path,
                to: event.paths[1].clone(),
            })
        }
        EventKind::Modify(_) => Some(FileEvent::Modified(path)),
        EventKind::Remove(_) => Some(FileEvent::Deleted(path)),
        EventKind::Other if event.paths.len() >= 2 => Some(FileEvent::Renamed {
            from: path,
            to: event.paths[1].clone(),
        }),
        _ => None,
    }
}
