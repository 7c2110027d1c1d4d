//! Inode management for virtual paths.
//!
//! Every inode stands for a virtual path (`Alice/vacation/photo1.jpg`), not
//! for a backing file: the same photo tagged with two people has two inodes.
//! What a path currently resolves to is decided per request against the
//! published snapshot, so inodes survive index rebuilds.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Inode of the mount root.
pub const ROOT_INO: u64 = 1;

/// Entry in the inode table.
#[derive(Debug, Clone)]
pub struct InodeEntry {
    /// Inode number
    pub ino: u64,
    /// Virtual path relative to the mount root (empty for the root)
    pub path: PathBuf,
    /// Parent inode
    pub parent: u64,
    /// Lookup count (for FUSE reference counting)
    pub lookup_count: u64,
}

/// Bidirectional inode ↔ virtual path table.
pub struct InodeTable {
    /// Inode number -> entry
    inodes: HashMap<u64, InodeEntry>,
    /// Virtual path -> inode
    path_to_ino: HashMap<PathBuf, u64>,
    /// Next available inode
    next_ino: u64,
}

impl InodeTable {
    /// Create a table holding only the root.
    pub fn new() -> Self {
        let mut table = Self {
            inodes: HashMap::new(),
            path_to_ino: HashMap::new(),
            next_ino: ROOT_INO + 1,
        };
        table.inodes.insert(
            ROOT_INO,
            InodeEntry {
                ino: ROOT_INO,
                path: PathBuf::new(),
                parent: ROOT_INO,
                lookup_count: 1,
            },
        );
        table.path_to_ino.insert(PathBuf::new(), ROOT_INO);
        table
    }

    /// Get an inode entry.
    pub fn get(&self, ino: u64) -> Option<&InodeEntry> {
        self.inodes.get(&ino)
    }

    /// Virtual path of `ino`.
    pub fn path_of(&self, ino: u64) -> Option<&Path> {
        self.inodes.get(&ino).map(|e| e.path.as_path())
    }

    /// Get or create the inode for `path`, a child of `parent`.
    pub fn get_or_create(&mut self, parent: u64, path: PathBuf) -> u64 {
        if let Some(&ino) = self.path_to_ino.get(&path) {
            return ino;
        }

        let ino = self.next_ino;
        self.next_ino += 1;

        self.inodes.insert(
            ino,
            InodeEntry {
                ino,
                path: path.clone(),
                parent,
                lookup_count: 0,
            },
        );
        self.path_to_ino.insert(path, ino);

        ino
    }

    /// Increment lookup count.
    pub fn lookup(&mut self, ino: u64) {
        if let Some(entry) = self.inodes.get_mut(&ino) {
            entry.lookup_count += 1;
        }
    }

    /// Decrement lookup count, dropping the entry once the kernel holds no
    /// more references. The root is never dropped.
    pub fn forget(&mut self, ino: u64, nlookup: u64) {
        let Some(entry) = self.inodes.get_mut(&ino) else {
            return;
        };
        entry.lookup_count = entry.lookup_count.saturating_sub(nlookup);

        if entry.lookup_count == 0 && ino != ROOT_INO {
            if let Some(entry) = self.inodes.remove(&ino) {
                self.path_to_ino.remove(&entry.path);
            }
        }
    }

    /// Get inode by virtual path.
    pub fn get_by_path(&self, path: &Path) -> Option<u64> {
        self.path_to_ino.get(path).copied()
    }

    /// Number of live inodes, root included.
    pub fn len(&self) -> usize {
        self.inodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inodes.is_empty()
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}
