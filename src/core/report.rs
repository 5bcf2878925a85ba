use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use super::resolver::TypeRef;

/// Qualified name of an external declaration a line depends on.
///
/// Equality is equality of the canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyId(String);

impl DependencyId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Identifier for a type, or `None` when the type is a primitive, `void`
    /// or a type variable. Arrays contribute their element type.
    pub fn from_type(ty: &TypeRef) -> Option<Self> {
        match ty {
            TypeRef::Declared { name, .. } => Some(Self(name.clone())),
            TypeRef::Array(element) => Self::from_type(element),
            TypeRef::Primitive(_) | TypeRef::Variable(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-line identifier sets for one file, keyed by 1-based line number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineDependencies {
    lines: BTreeMap<usize, BTreeSet<DependencyId>>,
}

impl LineDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert identifiers at `line`. Duplicates collapse; an empty batch
    /// never creates a line entry.
    pub fn record<I>(&mut self, line: usize, ids: I)
    where
        I: IntoIterator<Item = DependencyId>,
    {
        let mut ids = ids.into_iter().peekable();
        if ids.peek().is_none() {
            return;
        }
        self.lines.entry(line).or_default().extend(ids);
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn get(&self, line: usize) -> Option<&BTreeSet<DependencyId>> {
        self.lines.get(&line)
    }

    /// Lines in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &BTreeSet<DependencyId>)> {
        self.lines.iter().map(|(line, ids)| (*line, ids))
    }
}

/// Final per-file, per-line result of one analysis run.
///
/// Files without any dependency are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    files: BTreeMap<PathBuf, LineDependencies>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the dependencies of one analyzed file. Returns `false` (and stores
    /// nothing) when the file contributed no dependency.
    pub fn add_file(&mut self, path: PathBuf, lines: LineDependencies) -> bool {
        if lines.is_empty() {
            return false;
        }
        self.files.insert(path, lines);
        true
    }

    /// Union with a partial report built on another worker. File identity is
    /// the key, so later entries replace earlier ones.
    pub fn merge(&mut self, other: Report) {
        self.files.extend(other.files);
    }

    pub fn file(&self, path: &Path) -> Option<&LineDependencies> {
        self.files.get(path)
    }

    pub fn files(&self) -> impl Iterator<Item = (&Path, &LineDependencies)> {
        self.files.iter().map(|(path, lines)| (path.as_path(), lines))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total number of (line, identifier) facts.
    pub fn dependency_count(&self) -> usize {
        self.files
            .values()
            .flat_map(|lines| lines.iter().map(|(_, ids)| ids.len()))
            .sum()
    }
}
