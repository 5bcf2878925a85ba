//! Configuration file parsing, defaults, and merging.
//!
//! Configuration is loaded in layers (last wins):
//! 1. Built-in defaults
//! 2. Per-project config from `<root>/.linedeps.toml`, or an explicit file
//! 3. Command-line flags
//!
//! Each layer only overrides fields it explicitly sets.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::AnalyzerOptions;

pub const CONFIG_FILE_NAME: &str = ".linedeps.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// How source directories and classpath are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Gradle/Maven module conventions, falling back to `flat`.
    #[default]
    Auto,
    /// The root is the only source directory.
    Flat,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalyzerConfig {
    pub scan: ScanConfig,
    pub analysis: AnalysisConfig,
    pub classpath: ClasspathConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanConfig {
    pub layout: Layout,
    /// Also analyze `src/test/java` of each module.
    pub include_tests: bool,
    /// Regexes matched against paths relative to each source directory.
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub parallel: bool,
    pub strict_syntax: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClasspathConfig {
    /// Relative entries are resolved against the project root.
    pub entries: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Identifier prefixes hidden from the printed report, e.g. `java.`.
    pub ignore_prefixes: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            strict_syntax: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ConfigOverlay {
    scan: Option<ScanOverlay>,
    analysis: Option<AnalysisOverlay>,
    classpath: Option<ClasspathOverlay>,
    output: Option<OutputOverlay>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ScanOverlay {
    layout: Option<Layout>,
    include_tests: Option<bool>,
    exclude: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct AnalysisOverlay {
    parallel: Option<bool>,
    strict_syntax: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ClasspathOverlay {
    entries: Option<Vec<PathBuf>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct OutputOverlay {
    format: Option<OutputFormat>,
    ignore_prefixes: Option<Vec<String>>,
}

/// Command-line layer. `None` and empty lists leave the file value alone;
/// classpath entries and ignore prefixes are appended.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub layout: Option<Layout>,
    pub include_tests: Option<bool>,
    pub sequential: bool,
    pub strict_syntax: Option<bool>,
    pub classpath: Vec<PathBuf>,
    pub format: Option<OutputFormat>,
    pub ignore_prefixes: Vec<String>,
}

impl AnalyzerConfig {
    fn apply_overlay(&mut self, overlay: ConfigOverlay, base_dir: &Path) {
        if let Some(scan) = overlay.scan {
            if let Some(v) = scan.layout {
                self.scan.layout = v;
            }
            if let Some(v) = scan.include_tests {
                self.scan.include_tests = v;
            }
            if let Some(v) = scan.exclude {
                self.scan.exclude = v;
            }
        }
        if let Some(analysis) = overlay.analysis {
            if let Some(v) = analysis.parallel {
                self.analysis.parallel = v;
            }
            if let Some(v) = analysis.strict_syntax {
                self.analysis.strict_syntax = v;
            }
        }
        if let Some(classpath) = overlay.classpath {
            if let Some(entries) = classpath.entries {
                self.classpath.entries = entries
                    .into_iter()
                    .map(|entry| if entry.is_relative() { base_dir.join(entry) } else { entry })
                    .collect();
            }
        }
        if let Some(output) = overlay.output {
            if let Some(v) = output.format {
                self.output.format = v;
            }
            if let Some(v) = output.ignore_prefixes {
                self.output.ignore_prefixes = v;
            }
        }
    }

    pub fn apply_cli(&mut self, cli: CliOverrides) {
        if let Some(v) = cli.layout {
            self.scan.layout = v;
        }
        if let Some(v) = cli.include_tests {
            self.scan.include_tests = v;
        }
        if cli.sequential {
            self.analysis.parallel = false;
        }
        if let Some(v) = cli.strict_syntax {
            self.analysis.strict_syntax = v;
        }
        self.classpath.entries.extend(cli.classpath);
        if let Some(v) = cli.format {
            self.output.format = v;
        }
        self.output.ignore_prefixes.extend(cli.ignore_prefixes);
    }

    /// Defaults overlaid with `explicit`, or with `<root>/.linedeps.toml`
    /// when no explicit file is given. A missing project file is not an
    /// error; a missing explicit file is.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<AnalyzerConfig> {
        let mut config = AnalyzerConfig::default();
        let base_dir = if root.is_dir() {
            root.to_path_buf()
        } else {
            root.parent().map(Path::to_path_buf).unwrap_or_default()
        };

        match explicit {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                config.apply_overlay(parse_overlay(&contents, path)?, &base_dir);
            }
            None => {
                let path = base_dir.join(CONFIG_FILE_NAME);
                if let Some(overlay) = load_overlay(&path)? {
                    config.apply_overlay(overlay, &base_dir);
                }
            }
        }

        Ok(config)
    }

    pub fn analyzer_options(&self) -> AnalyzerOptions {
        AnalyzerOptions {
            parallel: self.analysis.parallel,
            strict_syntax: self.analysis.strict_syntax,
            exclude: self.scan.exclude.clone(),
        }
    }
}

fn parse_overlay(contents: &str, path: &Path) -> Result<ConfigOverlay> {
    toml::from_str(contents)
        .with_context(|| format!("failed to parse config file: {}", path.display()))
}

/// `Ok(None)` if the file does not exist.
fn load_overlay(path: &Path) -> Result<Option<ConfigOverlay>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(parse_overlay(&contents, path)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(anyhow::anyhow!(
            "failed to read config file {}: {}",
            path.display(),
            e
        )),
    }
}
