//! Snapshot building.
//!
//! [`IndexBuilder`] walks the input root, asks the metadata extractor for the
//! person tags of every regular file found, and folds the result into a new
//! [`TagIndex`]. A build either returns a complete snapshot or an error; it
//! never touches the published one.

use async_trait::async_trait;
use peoplefs_core::{Error, FileTags, MetadataExtractor, Result, SnapshotBuilder, TagIndex};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for the builder.
#[derive(Debug, Clone, Default)]
pub struct BuilderConfig {
    /// Index files and directories whose name starts with `.`
    pub include_hidden: bool,
}

/// Builds [`TagIndex`] snapshots for one input root.
pub struct IndexBuilder {
    /// Absolute input root
    root: PathBuf,
    /// Person tag reader
    extractor: Arc<dyn MetadataExtractor>,
    /// Configuration
    config: BuilderConfig,
}

impl IndexBuilder {
    /// Create a builder with the default configuration.
    pub fn new(root: PathBuf, extractor: Arc<dyn MetadataExtractor>) -> Self {
        Self::with_config(root, extractor, BuilderConfig::default())
    }

    /// Create a builder with an explicit configuration.
    pub fn with_config(
        root: PathBuf,
        extractor: Arc<dyn MetadataExtractor>,
        config: BuilderConfig,
    ) -> Self {
        Self {
            root,
            extractor,
            config,
        }
    }

    /// Collect every regular file under the root (blocking I/O off the runtime).
    async fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let root = self.root.clone();
        let include_hidden = self.config.include_hidden;

        tokio::task::spawn_blocking(move || scan_directory(&root, include_hidden))
            .await
            .map_err(|e| Error::Other(format!("scan task failed: {e}")))?
    }
}

#[async_trait]
impl SnapshotBuilder for IndexBuilder {
    async fn build(&self) -> Result<TagIndex> {
        info!(
            "Extracting person tags from: {:?} ({})",
            self.root,
            self.extractor.name()
        );

        let files = self.collect_files().await?;
        debug!("Found {} files under {:?}", files.len(), self.root);

        let extracted = if files.is_empty() {
            Vec::new()
        } else {
            self.extractor.extract(&files).await?
        };

        let mut people_by_file: HashMap<PathBuf, Vec<String>> = extracted
            .into_iter()
            .map(|tags| (tags.path, tags.people))
            .collect();

        // Every walked file ends up in the index, reported by the extractor or not.
        let tags: Vec<FileTags> = files
            .into_iter()
            .map(|path| {
                let people = people_by_file.remove(&path).unwrap_or_default();
                FileTags::new(path, people)
            })
            .collect();

        let index = TagIndex::from_tags(self.root.clone(), tags);

        for person in index.persons() {
            debug!("Person: {}, Files: {:?}", person, index.files_of(person));
        }
        info!(
            "Built index: {} persons, {} files",
            index.person_count(),
            index.file_count()
        );

        Ok(index)
    }
}

/// Walk `root` and return all regular files, sorted.
///
/// An unreadable root is an error. Unreadable subdirectories are skipped.
fn scan_directory(root: &Path, include_hidden: bool) -> Result<Vec<PathBuf>> {
    fn visit_dir(dir: &Path, include_hidden: bool, files: &mut Vec<PathBuf>) {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!("Cannot read directory {:?}: {}", dir, e);
                return;
            }
        };

        for entry in entries.flatten() {
            if !include_hidden && is_hidden(&entry.file_name()) {
                continue;
            }
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                visit_dir(&entry.path(), include_hidden, files);
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }

    // Probe the root first so an unreadable root fails the build.
    fs::read_dir(root).map_err(|source| Error::Walk {
        path: root.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    visit_dir(root, include_hidden, &mut files);
    files.sort();
    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
