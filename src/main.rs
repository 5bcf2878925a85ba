use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use linedeps::config::{AnalyzerConfig, CliOverrides, Layout, OutputFormat};
use linedeps::core::{
    AnalysisOutcome, ConventionalLayout, DependencyAnalyzer, ExplicitPaths, ProjectPaths,
};
use linedeps::formatters::{IdFilter, JsonFormatter, TextFormatter};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "linedeps",
    version,
    about = "Per-line dependency extraction for Java source trees"
)]
struct Cli {
    /// Project root or single source directory
    #[arg(value_name = "ROOT")]
    root: PathBuf,

    /// Additional classpath entries (class directories or jars)
    #[arg(value_name = "CLASSPATH")]
    classpath: Vec<PathBuf>,

    /// How to find source directories and classpath
    #[arg(long, value_enum)]
    layout: Option<Layout>,

    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Write the report here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Config file to use instead of <ROOT>/.linedeps.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Hide identifiers starting with this prefix (repeatable)
    #[arg(long = "ignore-prefix", value_name = "PREFIX")]
    ignore_prefixes: Vec<String>,

    /// Also analyze src/test/java of each module
    #[arg(long)]
    include_tests: bool,

    /// Skip files containing syntax errors
    #[arg(long)]
    strict_syntax: bool,

    /// Analyze files one at a time
    #[arg(long)]
    sequential: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(log_level(&cli));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn log_level(cli: &Cli) -> &'static str {
    if cli.quiet {
        return "error";
    }
    match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let start_time = Instant::now();
    let root = cli.root.clone();

    let mut config = AnalyzerConfig::load(&root, cli.config.as_deref())?;
    config.apply_cli(CliOverrides {
        layout: cli.layout,
        include_tests: cli.include_tests.then_some(true),
        sequential: cli.sequential,
        strict_syntax: cli.strict_syntax.then_some(true),
        classpath: cli.classpath,
        format: cli.format,
        ignore_prefixes: cli.ignore_prefixes,
    });

    let project: Box<dyn ProjectPaths> = match config.scan.layout {
        Layout::Auto => Box::new(ConventionalLayout::new(
            config.scan.include_tests,
            config.classpath.entries.clone(),
        )),
        Layout::Flat => Box::new(ExplicitPaths::new(config.classpath.entries.clone())),
    };

    let analyzer = DependencyAnalyzer::new(config.analyzer_options())?;
    let outcome = analyzer.analyze(&root, project.as_ref())?;
    tracing::info!(
        "analysis completed in {:.2}s: {} line-level dependencies in {} file(s)",
        start_time.elapsed().as_secs_f64(),
        outcome.report.dependency_count(),
        outcome.report.len()
    );

    write_report(&config, &root, &outcome, cli.output)
}

fn write_report(
    config: &AnalyzerConfig,
    root: &Path,
    outcome: &AnalysisOutcome,
    output: Option<PathBuf>,
) -> Result<()> {
    let filter = IdFilter::new(config.output.ignore_prefixes.clone());
    let text = || {
        TextFormatter::new()
            .with_filter(filter.clone())
            .relative_to(root)
    };
    let json = || JsonFormatter::new().with_filter(filter.clone());

    if let Some(path) = output {
        return match config.output.format {
            OutputFormat::Text => text().format_to_file(outcome, &path),
            OutputFormat::Json => json().format_to_file(outcome, &path),
        }
        .with_context(|| format!("failed to write {}", path.display()));
    }

    let rendered = match config.output.format {
        OutputFormat::Text => text().format(outcome),
        OutputFormat::Json => json().format(outcome)?,
    };
    let mut stdout = io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
