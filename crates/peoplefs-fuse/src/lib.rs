//! FUSE filesystem for peoplefs.
//!
//! Exposes the published [`TagIndex`](peoplefs_core::TagIndex) as a read-only
//! tree with one top-level directory per person. Below each person the
//! original relative layout of that person's photos is kept.
//!
//! # Virtual Directory Structure
//!
//! ```text
//! /mountpoint/
//! ├── Alice/
//! │   └── vacation/
//! │       ├── photo1.jpg        # → <input>/vacation/photo1.jpg
//! │       └── extra/
//! │           └── photo2.jpg    # → <input>/vacation/extra/photo2.jpg
//! ├── Bob/
//! │   └── vacation/
//! │       └── extra/
//! │           └── photo2.jpg
//! └── no one/                   # files without any person tag
//! ```
//!
//! # Rust API Example
//!
//! ```rust,ignore
//! use peoplefs_fuse::{mount, PeopleFs};
//!
//! let fs = PeopleFs::new(store, runtime);
//! let session = mount::spawn(fs, &mountpoint, &mount::MountConfig::default())?;
//! ```

pub mod filesystem;
pub mod inode;
pub mod mount;
pub mod resolver;

pub use filesystem::PeopleFs;
pub use inode::{InodeEntry, InodeTable};
pub use mount::MountConfig;
pub use resolver::{DirEntry, EntryKind, Resolution, Resolver};
