//! Source roots and classpath of the project being analyzed.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::error::AnalyzerError;

/// Ordered source directories and classpath entries for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSet {
    pub source_dirs: Vec<PathBuf>,
    pub classpath: Vec<PathBuf>,
}

/// Supplies the [`PathSet`] of a project. Queried once per run, before any
/// file is analyzed.
pub trait ProjectPaths {
    fn paths(&self, root: &Path) -> Result<PathSet, AnalyzerError>;
}

fn ensure_readable(root: &Path) -> Result<(), AnalyzerError> {
    if root.is_file() {
        return Ok(());
    }
    fs::read_dir(root)
        .map(|_| ())
        .map_err(|source| AnalyzerError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })
}

/// The root is the only source directory; the classpath is given verbatim.
#[derive(Debug, Clone, Default)]
pub struct ExplicitPaths {
    pub classpath: Vec<PathBuf>,
}

impl ExplicitPaths {
    pub fn new(classpath: Vec<PathBuf>) -> Self {
        Self { classpath }
    }
}

impl ProjectPaths for ExplicitPaths {
    fn paths(&self, root: &Path) -> Result<PathSet, AnalyzerError> {
        ensure_readable(root)?;
        Ok(PathSet {
            source_dirs: vec![root.to_path_buf()],
            classpath: self.classpath.clone(),
        })
    }
}

const BUILD_FILES: &[&str] = &["build.gradle", "build.gradle.kts", "pom.xml"];
const CLASS_OUTPUT_DIRS: &[&str] = &["build/classes/java/main", "target/classes"];
const LIBRARY_DIRS: &[&str] = &["libs", "lib"];
const SKIPPED_DIRS: &[&str] = &["build", "target", "out", "node_modules"];

/// Gradle and Maven conventions: every module directory contributes
/// `src/main/java` (and `src/test/java` when tests are included), its compiled
/// class directories and the jars in `libs/` or `lib/`.
#[derive(Debug, Clone, Default)]
pub struct ConventionalLayout {
    pub include_tests: bool,
    /// Appended after the discovered entries.
    pub extra_classpath: Vec<PathBuf>,
}

impl ConventionalLayout {
    pub fn new(include_tests: bool, extra_classpath: Vec<PathBuf>) -> Self {
        Self {
            include_tests,
            extra_classpath,
        }
    }

    /// Module directories under `root`, parents before children.
    pub fn modules(&self, root: &Path) -> Vec<PathBuf> {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !(entry.file_type().is_dir() && is_skipped_dir(entry.file_name().to_str()))
            });

        walker
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("module discovery skips {}: {err}", err.path().unwrap_or(root).display());
                    None
                }
            })
            .filter(|entry| entry.file_type().is_dir())
            .map(|entry| entry.into_path())
            .filter(|dir| is_module_dir(dir))
            .collect()
    }
}

fn is_skipped_dir(name: Option<&str>) -> bool {
    match name {
        Some(name) => name.starts_with('.') || SKIPPED_DIRS.contains(&name) || name == "src",
        None => true,
    }
}

fn is_module_dir(dir: &Path) -> bool {
    BUILD_FILES.iter().any(|file| dir.join(file).is_file()) || dir.join("src/main/java").is_dir()
}

impl ProjectPaths for ConventionalLayout {
    fn paths(&self, root: &Path) -> Result<PathSet, AnalyzerError> {
        ensure_readable(root)?;
        let modules = self.modules(root);
        if modules.is_empty() {
            debug!("no build modules under {}; using the root as source directory", root.display());
            return ExplicitPaths::new(self.extra_classpath.clone()).paths(root);
        }

        let mut set = PathSet::default();
        for module in &modules {
            let main = module.join("src/main/java");
            if main.is_dir() {
                set.source_dirs.push(main);
            }
            if self.include_tests {
                let test = module.join("src/test/java");
                if test.is_dir() {
                    set.source_dirs.push(test);
                }
            }
            for output in CLASS_OUTPUT_DIRS {
                let dir = module.join(output);
                if dir.is_dir() {
                    set.classpath.push(dir);
                }
            }
            for lib in LIBRARY_DIRS {
                set.classpath.extend(jars_in(&module.join(lib)));
            }
        }
        set.classpath.extend(self.extra_classpath.iter().cloned());

        debug!(
            "{} module(s): {} source dir(s), {} classpath entr(ies)",
            modules.len(),
            set.source_dirs.len(),
            set.classpath.len()
        );
        Ok(set)
    }
}

fn jars_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut jars: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(err) => {
                warn!("cannot list {}: {err}", dir.display());
                None
            }
        })
        .filter(|path| path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("jar"))
        .collect();
    jars.sort();
    jars
}
