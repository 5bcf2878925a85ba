use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::error::AnalyzerError;
use super::project::{PathSet, ProjectPaths};
use super::report::{LineDependencies, Report};
use super::resolver::Resolver;
use super::scanner::{FileScanner, ScanFailure};
use super::traversal::collect_dependencies;
use crate::parsers::common::TreeSitterParser;
use crate::parsers::JavaParser;
use crate::resolve::JavaResolver;

/// Stack size of analysis workers.
pub const WORKER_STACK_SIZE: usize = 32 * 1024 * 1024;

/// A file left out of the report because it could not be parsed, or a
/// directory whose files could not be listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisStats {
    pub files_scanned: usize,
    pub files_analyzed: usize,
    pub files_skipped: usize,
    pub files_with_dependencies: usize,
    pub nodes_visited: usize,
    pub nodes_unresolved: usize,
    pub nodes_faulted: usize,
}

impl AnalysisStats {
    pub fn absorb(&mut self, other: AnalysisStats) {
        self.files_scanned += other.files_scanned;
        self.files_analyzed += other.files_analyzed;
        self.files_skipped += other.files_skipped;
        self.files_with_dependencies += other.files_with_dependencies;
        self.nodes_visited += other.nodes_visited;
        self.nodes_unresolved += other.nodes_unresolved;
        self.nodes_faulted += other.nodes_faulted;
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    pub report: Report,
    pub skipped: Vec<SkippedFile>,
    pub stats: AnalysisStats,
}

#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    pub parallel: bool,
    pub strict_syntax: bool,
    /// Regexes matched against paths relative to each source directory.
    pub exclude: Vec<String>,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            strict_syntax: false,
            exclude: Vec::new(),
        }
    }
}

enum FileOutcome {
    Analyzed {
        path: PathBuf,
        lines: LineDependencies,
        stats: AnalysisStats,
    },
    Skipped(SkippedFile),
}

impl AnalysisOutcome {
    fn add(mut self, file: FileOutcome) -> Self {
        match file {
            FileOutcome::Analyzed {
                path,
                lines,
                mut stats,
            } => {
                if self.report.add_file(path, lines) {
                    stats.files_with_dependencies = 1;
                }
                self.stats.absorb(stats);
            }
            FileOutcome::Skipped(skipped) => {
                self.stats.files_skipped += 1;
                self.skipped.push(skipped);
            }
        }
        self
    }

    fn join(mut self, other: AnalysisOutcome) -> Self {
        self.report.merge(other.report);
        self.skipped.extend(other.skipped);
        self.stats.absorb(other.stats);
        self
    }
}

pub struct DependencyAnalyzer {
    options: AnalyzerOptions,
    file_scanner: FileScanner,
    parser: JavaParser,
    pool: ThreadPool,
}

impl DependencyAnalyzer {
    pub fn new(options: AnalyzerOptions) -> Result<Self, AnalyzerError> {
        let file_scanner = FileScanner::with_excludes(&options.exclude)
            .map_err(|err| AnalyzerError::ProjectPaths(format!("{err:#}")))?;
        let parser = JavaParser::new().strict(options.strict_syntax);
        let pool = ThreadPoolBuilder::new()
            .thread_name(|i| format!("linedeps-worker-{i}"))
            .stack_size(WORKER_STACK_SIZE)
            .build()?;
        Ok(Self {
            options,
            file_scanner,
            parser,
            pool,
        })
    }

    /// Query `project` for paths, build the resolver over them and analyze
    /// every source file.
    pub fn analyze(&self, root: &Path, project: &dyn ProjectPaths) -> Result<AnalysisOutcome, AnalyzerError> {
        let paths = project.paths(root)?;
        if paths.source_dirs.is_empty() {
            return Err(AnalyzerError::ProjectPaths(format!(
                "no source directories under {}",
                root.display()
            )));
        }
        info!(
            "{} source dir(s), {} classpath entr(ies)",
            paths.source_dirs.len(),
            paths.classpath.len()
        );

        TreeSitterParser::java().map_err(|err| AnalyzerError::ResolverInit(err.to_string()))?;
        let resolver = self.pool.install(|| JavaResolver::from_paths(&paths));
        self.analyze_with(&resolver, &paths)
    }

    pub fn analyze_with(&self, resolver: &dyn Resolver, paths: &PathSet) -> Result<AnalysisOutcome, AnalyzerError> {
        let scanned = self
            .file_scanner
            .scan_all(&paths.source_dirs)
            .map_err(|err| AnalyzerError::ProjectPaths(format!("{err:#}")))?;
        info!("found {} Java file(s) to analyze", scanned.files.len());

        let mut outcome = self.analyze_files(resolver, &scanned.files);
        for ScanFailure { path, reason } in scanned.failures {
            outcome.stats.files_skipped += 1;
            outcome.skipped.push(SkippedFile {
                path,
                reason: format!("cannot scan: {reason}"),
            });
        }
        outcome.skipped.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(outcome)
    }

    /// Analyze `files` independently; partial results are merged in path
    /// order.
    pub fn analyze_files(&self, resolver: &dyn Resolver, files: &[PathBuf]) -> AnalysisOutcome {
        let mut outcome = if self.options.parallel {
            self.pool.install(|| {
                files
                    .par_iter()
                    .map(|path| self.analyze_file(resolver, path))
                    .fold(AnalysisOutcome::default, AnalysisOutcome::add)
                    .reduce(AnalysisOutcome::default, AnalysisOutcome::join)
            })
        } else {
            files
                .iter()
                .map(|path| self.analyze_file(resolver, path))
                .fold(AnalysisOutcome::default(), AnalysisOutcome::add)
        };
        outcome.stats.files_scanned = files.len();

        info!(
            "analyzed {} file(s), {} with dependencies, {} skipped",
            outcome.stats.files_analyzed,
            outcome.stats.files_with_dependencies,
            outcome.stats.files_skipped
        );
        outcome
    }

    fn analyze_file(&self, resolver: &dyn Resolver, path: &Path) -> FileOutcome {
        let unit = match self.parser.parse_file(path) {
            Ok(unit) => unit,
            Err(err) => {
                warn!("skipping {}: {err}", path.display());
                return FileOutcome::Skipped(SkippedFile {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                });
            }
        };
        if unit.syntax_errors > 0 {
            warn!(
                "{} has {} syntax error(s); analyzing the recovered tree",
                path.display(),
                unit.syntax_errors
            );
        }

        let (lines, traversal) = collect_dependencies(resolver, &unit);
        debug!(
            file = %path.display(),
            lines = lines.line_count(),
            visited = traversal.nodes_visited,
            unresolved = traversal.unresolved,
            faulted = traversal.faulted,
            typed = unit.memo.len(),
            "file analyzed"
        );
        FileOutcome::Analyzed {
            path: path.to_path_buf(),
            lines,
            stats: AnalysisStats {
                files_analyzed: 1,
                nodes_visited: traversal.nodes_visited,
                nodes_unresolved: traversal.unresolved,
                nodes_faulted: traversal.faulted,
                ..AnalysisStats::default()
            },
        }
    }
}
