use anyhow::Result;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;

use super::IdFilter;
use crate::core::AnalysisOutcome;

/// `{"files": {path: {line: [ids]}}, "skipped": [{path, reason}]}`, pretty
/// printed. Files, lines and identifiers appear in ascending order; object
/// keys keep insertion order, so line `2` precedes line `10`.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    filter: IdFilter,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: IdFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn format_to_file(&self, outcome: &AnalysisOutcome, output_path: &Path) -> Result<()> {
        fs::write(output_path, self.format(outcome)?)?;
        Ok(())
    }

    pub fn format(&self, outcome: &AnalysisOutcome) -> Result<String> {
        let mut rendered = serde_json::to_string_pretty(&self.to_value(outcome))?;
        rendered.push('\n');
        Ok(rendered)
    }

    pub fn to_value(&self, outcome: &AnalysisOutcome) -> Value {
        let mut files = Map::new();
        for (path, lines) in outcome.report.files() {
            let mut by_line = Map::new();
            for (line, ids) in lines.iter() {
                let kept: Vec<&str> = ids
                    .iter()
                    .filter(|id| self.filter.keeps(id))
                    .map(|id| id.as_str())
                    .collect();
                if !kept.is_empty() {
                    by_line.insert(line.to_string(), json!(kept));
                }
            }
            if !by_line.is_empty() {
                files.insert(path.display().to_string(), Value::Object(by_line));
            }
        }

        json!({
            "files": files,
            "skipped": outcome.skipped,
        })
    }
}
