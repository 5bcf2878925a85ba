use anyhow::{Context, Result};
use rayon::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

pub const JAVA_EXTENSION: &str = "java";

/// An entry below a scanned root that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Files found by a scan, sorted, and the entries the walk could not read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub files: Vec<PathBuf>,
    pub failures: Vec<ScanFailure>,
}

/// Finds `.java` files below a set of roots, honouring exclude patterns that
/// are matched against the path relative to the scanned root.
#[derive(Debug, Clone, Default)]
pub struct FileScanner {
    excludes: Vec<Regex>,
}

impl FileScanner {
    pub fn new() -> Self {
        Self {
            excludes: Vec::new(),
        }
    }

    pub fn with_excludes<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let excludes = patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(pattern).with_context(|| format!("invalid exclude pattern `{pattern}`"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { excludes })
    }

    /// Sorted `.java` files under `root`. A file path is returned as-is.
    /// Unreadable entries below `root` are collected, not fatal; an
    /// unreadable `root` is.
    pub fn scan_directory(&self, root_path: &Path) -> Result<ScanOutcome> {
        if root_path.is_file() {
            let files = if is_java_file(root_path) {
                vec![root_path.to_path_buf()]
            } else {
                Vec::new()
            };
            return Ok(ScanOutcome {
                files,
                failures: Vec::new(),
            });
        }
        std::fs::read_dir(root_path)
            .with_context(|| format!("cannot read directory {}", root_path.display()))?;

        let mut entries = Vec::new();
        let mut failures = Vec::new();
        for entry in WalkDir::new(root_path).follow_links(false) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => entries.push(entry),
                Ok(_) => {}
                Err(err) => {
                    let path = err.path().unwrap_or(root_path).to_path_buf();
                    warn!("cannot scan {}: {err}", path.display());
                    failures.push(ScanFailure {
                        path,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let mut files: Vec<PathBuf> = entries
            .par_iter()
            .map(|entry| entry.path())
            .filter(|path| is_java_file(path))
            .filter(|path| !self.is_excluded(root_path, path))
            .map(Path::to_path_buf)
            .collect();

        files.sort();
        Ok(ScanOutcome { files, failures })
    }

    /// Scan all of `roots`; files sorted and without duplicates.
    pub fn scan_all(&self, roots: &[PathBuf]) -> Result<ScanOutcome> {
        let mut outcome = ScanOutcome::default();
        for root in roots {
            let scanned = self.scan_directory(root)?;
            outcome.files.extend(scanned.files);
            outcome.failures.extend(scanned.failures);
        }
        outcome.files.sort();
        outcome.files.dedup();
        outcome.failures.sort_by(|a, b| a.path.cmp(&b.path));
        outcome.failures.dedup_by(|a, b| a.path == b.path);
        Ok(outcome)
    }

    fn is_excluded(&self, root: &Path, path: &Path) -> bool {
        if self.excludes.is_empty() {
            return false;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        let relative = relative.to_string_lossy().replace('\\', "/");
        self.excludes.iter().any(|pattern| pattern.is_match(&relative))
    }
}

pub fn is_java_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(JAVA_EXTENSION)
}
