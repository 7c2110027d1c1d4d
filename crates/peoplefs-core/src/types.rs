//! Core types for peoplefs.
//!
//! ## Index
//! - [`TagIndex`]: One immutable snapshot of the person/file relations
//! - [`NO_ONE`]: Reserved person bucketing untagged files
//!
//! ## Extraction
//! - [`TagValue`]: Raw value of a person tag field (single or list)
//! - [`FileTags`]: Normalized person names of one file
//!
//! ## Watching
//! - [`FileEvent`]: File system events for the watcher

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::tree::PersonTree;

/// Person name that untagged files are listed under.
pub const NO_ONE: &str = "no one";

// ============================================================================
// Extraction
// ============================================================================

/// Raw value of a person tag field as reported by the metadata reader.
///
/// Readers emit either a single scalar or a list. Scalars other than strings
/// (a person tagged `2020` comes back as a JSON number) are stringified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub enum TagValue {
    Single(String),
    Multiple(Vec<String>),
}

impl TagValue {
    /// Normalize into a list of person names, dropping blank entries.
    #[must_use]
    pub fn into_names(self) -> Vec<String> {
        let names = match self {
            Self::Single(name) => vec![name],
            Self::Multiple(names) => names,
        };
        names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()
    }
}

impl TryFrom<serde_json::Value> for TagValue {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        fn scalar(value: Value) -> Result<String, String> {
            match value {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                Value::Bool(b) => Ok(b.to_string()),
                other => Err(format!("unsupported tag value: {other}")),
            }
        }

        match value {
            Value::Array(items) => items
                .into_iter()
                .map(scalar)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Multiple),
            other => scalar(other).map(Self::Single),
        }
    }
}

/// Person names found in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTags {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Person names, possibly empty
    pub people: Vec<String>,
}

impl FileTags {
    /// Create a record for `path` with the given names.
    pub fn new(path: impl Into<PathBuf>, people: Vec<String>) -> Self {
        Self {
            path: path.into(),
            people,
        }
    }

    /// Create a record for a file without any person tag.
    pub fn untagged(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Vec::new())
    }
}

/// Whether `name` can be served as a single directory name.
///
/// Empty names, `.`, `..`, and names containing `/` or NUL are rejected.
#[must_use]
pub fn is_valid_person_name(name: &str) -> bool {
    !matches!(name, "" | "." | "..") && !name.contains(['/', '\0'])
}

// ============================================================================
// Tag Index
// ============================================================================

/// One fully built, immutable index snapshot.
///
/// Holds both directions of the (file, person) relation plus one
/// [`PersonTree`] per person. Both maps and the trees come from a single pass
/// over the same input, so they are always consistent inverses of each other.
#[derive(Debug, Clone)]
pub struct TagIndex {
    root: PathBuf,
    person_to_files: HashMap<String, Vec<PathBuf>>,
    file_to_people: HashMap<PathBuf, Vec<String>>,
    trees: HashMap<String, PersonTree>,
    built_at: DateTime<Utc>,
}

impl TagIndex {
    /// An index over `root` with no files.
    #[must_use]
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            person_to_files: HashMap::new(),
            file_to_people: HashMap::new(),
            trees: HashMap::new(),
            built_at: Utc::now(),
        }
    }

    /// Build an index over `root` from extracted tags.
    ///
    /// Files without any person name go under [`NO_ONE`]. Duplicate names on
    /// one file are collapsed. Names that cannot be a directory name (see
    /// [`is_valid_person_name`]) are dropped with a warning. Files outside
    /// `root` and repeated reports for the same file are ignored; the first
    /// report wins.
    pub fn from_tags(root: impl Into<PathBuf>, tags: impl IntoIterator<Item = FileTags>) -> Self {
        let mut index = Self::empty(root);

        for FileTags { path, people } in tags {
            let Ok(relative) = path.strip_prefix(&index.root) else {
                debug!("Skipping {:?}: outside {:?}", path, index.root);
                continue;
            };
            let relative = relative.to_path_buf();
            if relative.as_os_str().is_empty() {
                continue;
            }

            let mut names: Vec<String> = Vec::with_capacity(people.len().max(1));
            for name in people {
                if !is_valid_person_name(&name) {
                    warn!("Ignoring person tag {:?} in {:?}: not a valid name", name, path);
                    continue;
                }
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            if names.is_empty() {
                debug!("No people tags found in file: {:?}", path);
                names.push(NO_ONE.to_string());
            }

            let Entry::Vacant(slot) = index.file_to_people.entry(path.clone()) else {
                debug!("Duplicate report for {:?}, keeping the first", path);
                continue;
            };

            for name in &names {
                index
                    .person_to_files
                    .entry(name.clone())
                    .or_default()
                    .push(path.clone());
                index
                    .trees
                    .entry(name.clone())
                    .or_default()
                    .insert(&relative, path.clone());
            }
            slot.insert(names);
        }

        index
    }

    /// The input root this snapshot was built from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// When this snapshot was built.
    #[must_use]
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// All person names, sorted.
    #[must_use]
    pub fn persons(&self) -> Vec<&str> {
        let mut persons: Vec<&str> = self.person_to_files.keys().map(String::as_str).collect();
        persons.sort_unstable();
        persons
    }

    /// Files tagged with `person`, in build order. Unknown persons have none.
    #[must_use]
    pub fn files_of(&self, person: &str) -> &[PathBuf] {
        self.person_to_files
            .get(person)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Persons tagged on `path`, or `None` if the file is not indexed.
    #[must_use]
    pub fn people_of(&self, path: &Path) -> Option<&[String]> {
        self.file_to_people.get(path).map(Vec::as_slice)
    }

    /// Directory tree of `person`'s files.
    #[must_use]
    pub fn tree(&self, person: &str) -> Option<&PersonTree> {
        self.trees.get(person)
    }

    /// The person → files relation.
    #[must_use]
    pub fn person_to_files(&self) -> &HashMap<String, Vec<PathBuf>> {
        &self.person_to_files
    }

    /// The file → people relation.
    #[must_use]
    pub fn file_to_people(&self) -> &HashMap<PathBuf, Vec<String>> {
        &self.file_to_people
    }

    /// Number of distinct persons (including [`NO_ONE`]).
    #[must_use]
    pub fn person_count(&self) -> usize {
        self.person_to_files.len()
    }

    /// Number of indexed files.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.file_to_people.len()
    }

    /// Whether no file is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file_to_people.is_empty()
    }
}

// ============================================================================
// File Events
// ============================================================================

/// File system event from the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
}

impl FileEvent {
    /// The path the event is about (the destination for renames).
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(p) | Self::Modified(p) | Self::Deleted(p) => p,
            Self::Renamed { to, .. } => to,
        }
    }
}
