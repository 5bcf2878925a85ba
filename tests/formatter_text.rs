use linedeps::core::{AnalysisOutcome, DependencyId, LineDependencies, Report};
use linedeps::formatters::{IdFilter, TextFormatter};
use std::path::PathBuf;

fn lines(entries: &[(usize, &[&str])]) -> LineDependencies {
    let mut lines = LineDependencies::new();
    for (line, ids) in entries {
        lines.record(*line, ids.iter().map(|id| DependencyId::new(*id)));
    }
    lines
}

fn sample() -> AnalysisOutcome {
    let mut report = Report::new();
    report.add_file(
        PathBuf::from("/work/b/B.java"),
        lines(&[(3, &["x.Y", "a.B"])]),
    );
    report.add_file(
        PathBuf::from("/work/a/A.java"),
        lines(&[(10, &["java.util.List", "app.Foo"]), (2, &["java.lang.String"])]),
    );
    AnalysisOutcome {
        report,
        ..AnalysisOutcome::default()
    }
}

#[test]
fn text_lists_files_then_lines_in_order() {
    let out = TextFormatter::new().format(&sample());

    assert_eq!(
        out,
        "File: /work/a/A.java\n  Line 2 -> java.lang.String\n  Line 10 -> app.Foo, java.util.List\nFile: /work/b/B.java\n  Line 3 -> a.B, x.Y\n"
    );
}

#[test]
fn text_hides_ignored_prefixes_and_emptied_lines() {
    let out = TextFormatter::new()
        .with_filter(IdFilter::new(vec!["java.".to_string()]))
        .relative_to("/work")
        .format(&sample());

    assert_eq!(
        out,
        "File: a/A.java\n  Line 10 -> app.Foo\nFile: b/B.java\n  Line 3 -> a.B, x.Y\n"
    );
}

#[test]
fn text_omits_files_emptied_by_the_filter() {
    let out = TextFormatter::new()
        .with_filter(IdFilter::new(vec!["java.".to_string(), "app.".to_string()]))
        .format(&sample());

    assert!(!out.contains("A.java"));
    assert!(out.contains("File: /work/b/B.java"));
}

#[test]
fn text_of_empty_report_is_empty() {
    assert!(TextFormatter::new()
        .format(&AnalysisOutcome::default())
        .is_empty());
}

#[test]
fn text_written_to_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let out = dir.path().join("deps.txt");
    TextFormatter::new().format_to_file(&sample(), &out).unwrap();

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("File: /work/a/A.java\n"));
}
