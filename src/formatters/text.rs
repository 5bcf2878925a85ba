use anyhow::Result;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use super::IdFilter;
use crate::core::{AnalysisOutcome, DependencyId, LineDependencies};

/// `File: <path>` followed by one `  Line N -> a, b` row per line, files in
/// path order.
#[derive(Debug, Clone, Default)]
pub struct TextFormatter {
    filter: IdFilter,
    base: Option<PathBuf>,
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: IdFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Print paths relative to `base` where possible.
    pub fn relative_to(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn format_to_file(&self, outcome: &AnalysisOutcome, output_path: &Path) -> Result<()> {
        fs::write(output_path, self.format(outcome))?;
        Ok(())
    }

    pub fn format(&self, outcome: &AnalysisOutcome) -> String {
        let mut out = String::new();
        for (path, lines) in outcome.report.files() {
            let rows = self.rows(lines);
            if rows.is_empty() {
                continue;
            }
            let _ = writeln!(out, "File: {}", self.display_path(path));
            for (line, ids) in rows {
                let _ = writeln!(out, "  Line {line} -> {}", ids.join(", "));
            }
        }
        out
    }

    fn rows<'a>(&self, lines: &'a LineDependencies) -> Vec<(usize, Vec<&'a str>)> {
        lines
            .iter()
            .map(|(line, ids)| {
                let kept = ids
                    .iter()
                    .filter(|id| self.filter.keeps(id))
                    .map(DependencyId::as_str)
                    .collect::<Vec<_>>();
                (line, kept)
            })
            .filter(|(_, ids)| !ids.is_empty())
            .collect()
    }

    fn display_path(&self, path: &Path) -> String {
        let shown = self
            .base
            .as_deref()
            .and_then(|base| path.strip_prefix(base).ok())
            .filter(|relative| !relative.as_os_str().is_empty())
            .unwrap_or(path);
        shown.display().to_string()
    }
}
