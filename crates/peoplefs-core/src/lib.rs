//! # peoplefs-core
//!
//! Core types and traits for peoplefs, a read-only FUSE view that regroups a
//! photo collection into one directory per tagged person.
//!
//! This crate provides the foundational abstractions used by the other crates:
//!
//! - **Tag index**: [`TagIndex`], the immutable snapshot holding the
//!   person → files and file → people relations
//! - **Segment trees**: [`PersonTree`], the per-person directory tree
//!   materialized once per snapshot
//! - **Metadata extraction**: [`MetadataExtractor`] trait for reading person
//!   tags out of photo files
//! - **Snapshot building**: [`SnapshotBuilder`] trait for anything that can
//!   produce a fresh [`TagIndex`]
//!
//! ## Architecture
//!
//! ```text
//! input root ─► SnapshotBuilder ─► TagIndex ─► IndexStore ─► Resolver ─► FUSE
//!                   │
//!                   └─► MetadataExtractor (exiftool)
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TagIndex`] | One fully built, immutable index snapshot |
//! | [`PersonTree`] | Directory tree of one person's files |
//! | [`FileTags`] | Person names extracted from one file |
//! | [`TagValue`] | Raw single-or-list value of a tag field |
//! | [`FileEvent`] | Change notification from the watcher |
//!
//! ## Related Crates
//!
//! - `peoplefs-index`: builder, store, watcher and rebuild trigger
//! - `peoplefs-fuse`: namespace resolver and FUSE filesystem

pub mod error;
pub mod traits;
pub mod tree;
pub mod types;

pub use error::{Error, ExtractError, Result};
pub use traits::*;
pub use tree::{DirNode, PersonTree, TreeNode};
pub use types::*;
