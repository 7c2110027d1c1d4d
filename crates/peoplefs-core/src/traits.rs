//! Core traits for peoplefs components.
//!
//! - [`MetadataExtractor`]: Read person tags out of photo files
//! - [`SnapshotBuilder`]: Produce a complete [`TagIndex`] for the input root
//!
//! The rebuild trigger only knows about [`SnapshotBuilder`], which keeps the
//! exiftool-backed builder swappable for tests.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::{ExtractError, Result};
use crate::types::{FileTags, TagIndex};

/// Trait for reading person tags from files.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Name of this extractor, for logs.
    fn name(&self) -> &str;

    /// Extract person names for each of `files`.
    ///
    /// The result may omit files the reader could not parse; callers treat
    /// missing files as untagged.
    async fn extract(&self, files: &[PathBuf]) -> std::result::Result<Vec<FileTags>, ExtractError>;
}

/// Trait for building index snapshots.
#[async_trait]
pub trait SnapshotBuilder: Send + Sync {
    /// Build a fresh snapshot. Either the whole build succeeds or nothing is
    /// returned.
    async fn build(&self) -> Result<TagIndex>;
}
