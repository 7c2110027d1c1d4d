//! Rebuild triggering.
//!
//! The [`RebuildTrigger`] owns the "when" of index building: once at startup,
//! then after every burst of file events once the input tree has been quiet
//! for the configured period. Builds never overlap, and events arriving while
//! a build runs are folded into a single follow-up build.
//!
//! ```text
//!            event               quiet period elapsed
//!   Idle ───────────▶ (waiting) ─────────────────────▶ Building
//!    ▲                 │  ▲ event resets timer            │
//!    │                 └──┘                               │
//!    └──────────── publish on success / keep on failure ──┘
//! ```

use peoplefs_core::{FileEvent, Result, SnapshotBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::store::IndexStore;

/// Default quiet period before a rebuild.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Whether a build is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    Building,
}

/// Rebuild lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildEvent {
    Started,
    Published { persons: usize, files: usize },
    Failed { error: String },
}

/// Runs the snapshot builder and publishes its results.
pub struct RebuildTrigger {
    /// Snapshot builder
    builder: Arc<dyn SnapshotBuilder>,
    /// Where snapshots are published
    store: Arc<IndexStore>,
    /// Debounce window
    quiet_period: Duration,
    /// Current state
    state: Arc<RwLock<TriggerState>>,
    /// Held for the duration of a build
    build_lock: Mutex<()>,
    /// Update broadcast
    update_tx: broadcast::Sender<RebuildEvent>,
    /// Stop flag for the background loop
    shutdown: watch::Sender<bool>,
}

impl RebuildTrigger {
    /// Create a new trigger.
    pub fn new(
        builder: Arc<dyn SnapshotBuilder>,
        store: Arc<IndexStore>,
        quiet_period: Duration,
    ) -> Self {
        let (update_tx, _) = broadcast::channel(64);
        let (shutdown, _) = watch::channel(false);

        Self {
            builder,
            store,
            quiet_period,
            state: Arc::new(RwLock::new(TriggerState::Idle)),
            build_lock: Mutex::new(()),
            update_tx,
            shutdown,
        }
    }

    /// Subscribe to rebuild events.
    pub fn subscribe(&self) -> broadcast::Receiver<RebuildEvent> {
        self.update_tx.subscribe()
    }

    /// Get the current state.
    pub async fn state(&self) -> TriggerState {
        *self.state.read().await
    }

    /// The store snapshots are published to.
    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    /// Build the index once at startup.
    ///
    /// Unlike later rebuilds the caller is expected to treat an error here
    /// as fatal, since there is nothing to serve yet.
    pub async fn initial_build(&self) -> Result<()> {
        info!("Building initial index");
        self.rebuild().await
    }

    /// Run one build now and publish it on success.
    ///
    /// On failure the published snapshot is left untouched.
    pub async fn rebuild(&self) -> Result<()> {
        let _guard = self.build_lock.lock().await;
        self.set_state(TriggerState::Building).await;
        let _ = self.update_tx.send(RebuildEvent::Started);

        let result = self.builder.build().await;
        let outcome = match result {
            Ok(index) => {
                let persons = index.person_count();
                let files = index.file_count();
                self.store.publish(index).await;
                info!("Index updated: {} persons, {} files", persons, files);
                let _ = self
                    .update_tx
                    .send(RebuildEvent::Published { persons, files });
                Ok(())
            }
            Err(e) => {
                warn!("Index rebuild failed, keeping previous index: {}", e);
                let _ = self.update_tx.send(RebuildEvent::Failed {
                    error: e.to_string(),
                });
                Err(e)
            }
        };

        self.set_state(TriggerState::Idle).await;
        outcome
    }

    /// Start the background loop consuming file events.
    ///
    /// The loop ends on [`RebuildTrigger::stop`] or when every event sender
    /// is dropped.
    pub fn spawn(self: Arc<Self>, events: mpsc::Receiver<FileEvent>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(events).await })
    }

    /// Stop the background loop.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    async fn set_state(&self, state: TriggerState) {
        *self.state.write().await = state;
    }

    async fn run(&self, mut events: mpsc::Receiver<FileEvent>) {
        let mut shutdown = self.shutdown.subscribe();

        loop {
            if *shutdown.borrow() {
                break;
            }

            let event = tokio::select! {
                _ = shutdown.changed() => break,
                event = events.recv() => event,
            };
            let Some(event) = event else {
                debug!("Event channel closed");
                break;
            };
            debug!("Change at {:?}", event.path());

            match self.wait_quiet(&mut events, &mut shutdown).await {
                Quiet::Elapsed => {}
                Quiet::Closed => {
                    let _ = self.rebuild().await;
                    break;
                }
                Quiet::Stopped => break,
            }

            if let Err(e) = self.rebuild().await {
                error!("Rebuild failed: {}", e);
            }
        }

        debug!("Rebuild loop stopped");
    }

    /// Wait until no event arrives for a full quiet period.
    async fn wait_quiet(
        &self,
        events: &mut mpsc::Receiver<FileEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Quiet {
        loop {
            tokio::select! {
                _ = shutdown.changed() => return Quiet::Stopped,
                next = tokio::time::timeout(self.quiet_period, events.recv()) => match next {
                    Ok(Some(event)) => debug!("Change at {:?}, waiting for quiet", event.path()),
                    Ok(None) => return Quiet::Closed,
                    Err(_) => return Quiet::Elapsed,
                },
            }
        }
    }
}

enum Quiet {
    Elapsed,
    Closed,
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use peoplefs_core::{Error, FileTags, TagIndex};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    /// Counts builds; optionally blocks each build on a gate or fails it.
    struct MockBuilder {
        builds: AtomicUsize,
        gate: Option<Semaphore>,
        fail: AtomicBool,
    }

    impl MockBuilder {
        fn new() -> Self {
            Self {
                builds: AtomicUsize::new(0),
                gate: None,
                fail: AtomicBool::new(false),
            }
        }

        fn gated() -> Self {
            Self {
                gate: Some(Semaphore::new(0)),
                ..Self::new()
            }
        }

        fn builds(&self) -> usize {
            self.builds.load(Ordering::SeqCst)
        }

        fn open_gate(&self) {
            if let Some(gate) = &self.gate {
                gate.add_permits(1);
            }
        }
    }

    #[async_trait]
    impl SnapshotBuilder for MockBuilder {
        async fn build(&self) -> Result<TagIndex> {
            let n = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Other("exiftool exploded".to_string()));
            }
            Ok(TagIndex::from_tags(
                "/root",
                vec![FileTags::new("/root/a.jpg", vec![format!("Person {n}")])],
            ))
        }
    }

    fn setup(builder: Arc<MockBuilder>) -> Arc<RebuildTrigger> {
        let store = Arc::new(IndexStore::new("/root"));
        Arc::new(RebuildTrigger::new(builder, store, Duration::from_millis(500)))
    }

    fn event(name: &str) -> FileEvent {
        FileEvent::Modified(PathBuf::from("/root").join(name))
    }

    async fn wait_published(updates: &mut broadcast::Receiver<RebuildEvent>) {
        loop {
            match updates.recv().await.unwrap() {
                RebuildEvent::Published { .. } => return,
                RebuildEvent::Failed { error } => panic!("build failed: {error}"),
                RebuildEvent::Started => {}
            }
        }
    }

    // ===== Rebuild Tests =====

    #[tokio::test]
    async fn test_initial_build_publishes() {
        let builder = Arc::new(MockBuilder::new());
        let trigger = setup(builder.clone());
        let mut updates = trigger.subscribe();

        trigger.initial_build().await.unwrap();

        assert_eq!(updates.recv().await.unwrap(), RebuildEvent::Started);
        assert_eq!(
            updates.recv().await.unwrap(),
            RebuildEvent::Published {
                persons: 1,
                files: 1
            }
        );
        assert!(trigger.store().is_populated().await);
        assert_eq!(trigger.state().await, TriggerState::Idle);
    }

    #[tokio::test]
    async fn test_initial_build_failure_is_reported() {
        let builder = Arc::new(MockBuilder::new());
        builder.fail.store(true, Ordering::SeqCst);
        let trigger = setup(builder);

        let result = trigger.initial_build().await;
        assert!(result.is_err());
        assert!(!trigger.store().is_populated().await);
        assert_eq!(trigger.state().await, TriggerState::Idle);
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_snapshot() {
        let builder = Arc::new(MockBuilder::new());
        let trigger = setup(builder.clone());
        trigger.initial_build().await.unwrap();
        let before = trigger.store().snapshot().await;

        builder.fail.store(true, Ordering::SeqCst);
        let mut updates = trigger.subscribe();
        assert!(trigger.rebuild().await.is_err());

        let after = trigger.store().snapshot().await;
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.persons(), vec!["Person 1"]);
        assert_eq!(updates.recv().await.unwrap(), RebuildEvent::Started);
        assert!(matches!(
            updates.recv().await.unwrap(),
            RebuildEvent::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_state_is_building_during_build() {
        let builder = Arc::new(MockBuilder::gated());
        let trigger = setup(builder.clone());
        let mut updates = trigger.subscribe();

        let task = {
            let trigger = trigger.clone();
            tokio::spawn(async move { trigger.rebuild().await })
        };

        assert_eq!(updates.recv().await.unwrap(), RebuildEvent::Started);
        assert_eq!(trigger.state().await, TriggerState::Building);

        builder.open_gate();
        task.await.unwrap().unwrap();
        assert_eq!(trigger.state().await, TriggerState::Idle);
    }

    // ===== Debounce Tests =====

    #[tokio::test(start_paused = true)]
    async fn test_burst_yields_one_rebuild() {
        let builder = Arc::new(MockBuilder::new());
        let trigger = setup(builder.clone());
        let mut updates = trigger.subscribe();
        let (tx, rx) = mpsc::channel(16);
        let handle = trigger.clone().spawn(rx);

        for i in 0..5 {
            tx.send(event(&format!("{i}.jpg"))).await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        wait_published(&mut updates).await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(builder.builds(), 1);

        trigger.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_rebuild_before_quiet_period() {
        let builder = Arc::new(MockBuilder::new());
        let trigger = setup(builder.clone());
        let (tx, rx) = mpsc::channel(16);
        let handle = trigger.clone().spawn(rx);

        tx.send(event("a.jpg")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(builder.builds(), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(builder.builds(), 1);

        trigger.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_during_build_yield_one_more() {
        let builder = Arc::new(MockBuilder::gated());
        let trigger = setup(builder.clone());
        let mut updates = trigger.subscribe();
        let (tx, rx) = mpsc::channel(16);
        let handle = trigger.clone().spawn(rx);

        tx.send(event("a.jpg")).await.unwrap();
        assert_eq!(updates.recv().await.unwrap(), RebuildEvent::Started);

        // Three more changes land while the first build is blocked.
        for name in ["b.jpg", "c.jpg", "d.jpg"] {
            tx.send(event(name)).await.unwrap();
        }
        builder.open_gate();
        wait_published(&mut updates).await;

        assert_eq!(updates.recv().await.unwrap(), RebuildEvent::Started);
        builder.open_gate();
        wait_published(&mut updates).await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(builder.builds(), 2);
        assert_eq!(trigger.store().snapshot().await.persons(), vec!["Person 2"]);

        trigger.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_during_initial_build_is_picked_up() {
        let builder = Arc::new(MockBuilder::gated());
        let trigger = setup(builder.clone());
        let mut updates = trigger.subscribe();
        let (tx, rx) = mpsc::channel(16);

        let initial = {
            let trigger = trigger.clone();
            tokio::spawn(async move { trigger.initial_build().await })
        };
        assert_eq!(updates.recv().await.unwrap(), RebuildEvent::Started);

        // The watcher is already running; the loop is not.
        tx.send(event("late.jpg")).await.unwrap();
        builder.open_gate();
        initial.await.unwrap().unwrap();
        wait_published(&mut updates).await;
        assert_eq!(trigger.store().snapshot().await.persons(), vec!["Person 1"]);

        let handle = trigger.clone().spawn(rx);
        assert_eq!(updates.recv().await.unwrap(), RebuildEvent::Started);
        builder.open_gate();
        wait_published(&mut updates).await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(builder.builds(), 2);
        assert_eq!(trigger.store().snapshot().await.persons(), vec!["Person 2"]);

        trigger.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_loop_alive() {
        let builder = Arc::new(MockBuilder::new());
        let trigger = setup(builder.clone());
        let mut updates = trigger.subscribe();
        let (tx, rx) = mpsc::channel(16);
        let handle = trigger.clone().spawn(rx);

        builder.fail.store(true, Ordering::SeqCst);
        tx.send(event("a.jpg")).await.unwrap();
        assert_eq!(updates.recv().await.unwrap(), RebuildEvent::Started);
        assert!(matches!(
            updates.recv().await.unwrap(),
            RebuildEvent::Failed { .. }
        ));
        assert!(!trigger.store().is_populated().await);

        builder.fail.store(false, Ordering::SeqCst);
        tx.send(event("a.jpg")).await.unwrap();
        wait_published(&mut updates).await;
        assert!(trigger.store().is_populated().await);

        trigger.stop();
        handle.await.unwrap();
    }

    // ===== Lifecycle Tests =====

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_loop() {
        let builder = Arc::new(MockBuilder::new());
        let trigger = setup(builder.clone());
        let (_tx, rx) = mpsc::channel(16);
        let handle = trigger.clone().spawn(rx);

        trigger.stop();
        handle.await.unwrap();
        assert_eq!(builder.builds(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_ends_loop() {
        let builder = Arc::new(MockBuilder::new());
        let trigger = setup(builder.clone());
        let (tx, rx) = mpsc::channel::<FileEvent>(16);
        let handle = trigger.clone().spawn(rx);

        drop(tx);
        handle.await.unwrap();
        assert_eq!(builder.builds(), 0);
    }
}
