//! Virtual path resolution.
//!
//! Virtual paths have the form `/<person>/<relative path under the input
//! root>`. A [`Resolver`] answers both questions the filesystem asks about
//! such a path against one snapshot:
//!
//! - [`Resolver::list_children`]: what is inside this directory?
//! - [`Resolver::resolve`]: is this a directory, a file (and which backing
//!   file), or nothing?
//!
//! Neither ever fails. Unknown persons and prefixes list as empty
//! directories.

use peoplefs_core::{TagIndex, TreeNode};
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// A single child of a virtual directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: OsString,
    pub kind: EntryKind,
}

impl DirEntry {
    fn new(name: impl Into<OsString>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// What a virtual path refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Directory,
    /// Regular file backed by the given absolute path
    File(PathBuf),
    NotFound,
}

/// A virtual path split into its person and the path below it.
enum VirtualPath<'a> {
    Root,
    Person { person: Cow<'a, str>, rest: PathBuf },
}

/// Split `path` into person and remainder. `..` is rejected.
fn parse(path: &Path) -> Option<VirtualPath<'_>> {
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::Normal(name) => segments.push(name),
            Component::ParentDir | Component::Prefix(_) => return None,
        }
    }

    let Some((person, rest)) = segments.split_first() else {
        return Some(VirtualPath::Root);
    };
    Some(VirtualPath::Person {
        person: person.to_string_lossy(),
        rest: rest.iter().collect(),
    })
}

/// Answers namespace questions from a single snapshot.
pub struct Resolver<'a> {
    index: &'a TagIndex,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a TagIndex) -> Self {
        Self { index }
    }

    /// List the children of the virtual directory at `path`.
    ///
    /// The root lists one directory per person. Below a person, entries are
    /// the next path segment of each of that person's files: a directory if
    /// more segments follow, a file otherwise. Names come back sorted.
    pub fn list_children(&self, path: &Path) -> Vec<DirEntry> {
        match parse(path) {
            Some(VirtualPath::Root) => self
                .index
                .persons()
                .into_iter()
                .map(|person| DirEntry::new(person, EntryKind::Directory))
                .collect(),
            Some(VirtualPath::Person { person, rest }) => {
                let Some(dir) = self.index.tree(&person).and_then(|t| t.dir(&rest)) else {
                    return Vec::new();
                };
                dir.children()
                    .map(|(name, node)| DirEntry::new(name, kind_of(node)))
                    .collect()
            }
            None => Vec::new(),
        }
    }

    /// Resolve the virtual path `path`.
    ///
    /// `/` and `/<person>` are always directories. Deeper paths map to the
    /// candidate `<input root>/<rest>`:
    ///
    /// - indexed and tagged with `<person>`: the backing file;
    /// - indexed but not tagged with `<person>`: not found;
    /// - not indexed: a directory (possibly empty).
    pub fn resolve(&self, path: &Path) -> Resolution {
        let (person, rest) = match parse(path) {
            Some(VirtualPath::Root) => return Resolution::Directory,
            Some(VirtualPath::Person { person, rest }) => (person, rest),
            None => return Resolution::NotFound,
        };
        if rest.as_os_str().is_empty() {
            return Resolution::Directory;
        }

        let candidate = self.index.root().join(&rest);
        match self.index.people_of(&candidate) {
            Some(people) if people.iter().any(|p| *p == person) => Resolution::File(candidate),
            Some(_) => Resolution::NotFound,
            None => Resolution::Directory,
        }
    }

    /// Look up `name` inside the directory at `parent`.
    pub fn resolve_child(&self, parent: &Path, name: &OsStr) -> Resolution {
        self.resolve(&parent.join(name))
    }
}

fn kind_of(node: &TreeNode) -> EntryKind {
    match node {
        TreeNode::Dir(_) => EntryKind::Directory,
        TreeNode::File(_) => EntryKind::File,
    }
}
