//! Per-person directory trees.
//!
//! Each [`TagIndex`](crate::TagIndex) snapshot materializes one [`PersonTree`]
//! per person at construction time. A tree mirrors the relative layout of the
//! person's files under the input root, so listing a virtual directory is a
//! walk down the tree rather than a rescan of every file.
//!
//! Children are keyed by exact path segment. `2020` and `2020-trip` are two
//! different keys and never collapse into one entry.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

/// A node in a person tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    /// Intermediate directory
    Dir(DirNode),
    /// Leaf pointing at the backing file
    File(PathBuf),
}

impl TreeNode {
    /// Whether this node is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Dir(_))
    }
}

/// Directory node: children sorted by segment name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirNode {
    children: BTreeMap<OsString, TreeNode>,
}

impl DirNode {
    /// Iterate over the children in name order.
    pub fn children(&self) -> impl Iterator<Item = (&OsStr, &TreeNode)> {
        self.children.iter().map(|(name, node)| (name.as_os_str(), node))
    }

    /// Look up a direct child by exact name.
    #[must_use]
    pub fn child(&self, name: &OsStr) -> Option<&TreeNode> {
        self.children.get(name)
    }

    /// Number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the directory has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Directory tree of one person's files, relative to the input root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonTree {
    root: DirNode,
}

impl PersonTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The top-level directory of the tree (the `/<person>` directory).
    #[must_use]
    pub fn root(&self) -> &DirNode {
        &self.root
    }

    /// Insert a backing file at `relative`.
    ///
    /// Returns `false` if `relative` has no normal segments (empty, or made
    /// only of `.`/`..`/root components) and nothing was inserted.
    pub fn insert(&mut self, relative: &Path, backing: PathBuf) -> bool {
        let segments = normal_segments(relative);
        let Some((leaf, dirs)) = segments.split_last() else {
            return false;
        };

        let mut node = &mut self.root;
        for segment in dirs {
            let entry = node
                .children
                .entry(segment.to_os_string())
                .or_insert_with(|| TreeNode::Dir(DirNode::default()));
            // A file can't have children on a real filesystem; if the index
            // says otherwise the directory wins.
            if !entry.is_dir() {
                *entry = TreeNode::Dir(DirNode::default());
            }
            node = match entry {
                TreeNode::Dir(dir) => dir,
                TreeNode::File(_) => unreachable!("replaced by a directory above"),
            };
        }

        node.children
            .entry(leaf.to_os_string())
            .or_insert(TreeNode::File(backing));
        true
    }

    /// Find the directory at `relative`. An empty path is the tree root.
    /// Returns `None` if the path is unknown or names a file.
    #[must_use]
    pub fn dir(&self, relative: &Path) -> Option<&DirNode> {
        self.walk(&normal_segments(relative))
    }

    fn walk(&self, segments: &[&OsStr]) -> Option<&DirNode> {
        let mut dir = &self.root;
        for segment in segments {
            match dir.child(segment)? {
                TreeNode::Dir(next) => dir = next,
                TreeNode::File(_) => return None,
            }
        }
        Some(dir)
    }
}

fn normal_segments(path: &Path) -> Vec<&OsStr> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name),
            _ => None,
        })
        .collect()
}
