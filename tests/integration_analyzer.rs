use linedeps::core::resolver::PRIMITIVE_TYPES;
use linedeps::core::{AnalyzerError, AnalyzerOptions, DependencyAnalyzer, DependencyId, ExplicitPaths};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn ids(names: &[&str]) -> BTreeSet<DependencyId> {
    names.iter().map(|name| DependencyId::new(*name)).collect()
}

fn analyzer(parallel: bool, strict_syntax: bool) -> DependencyAnalyzer {
    DependencyAnalyzer::new(AnalyzerOptions {
        parallel,
        strict_syntax,
        ..AnalyzerOptions::default()
    })
    .unwrap()
}

fn collections_project(root: &Path) {
    write(
        root,
        "collections/List.java",
        "package collections;\n\npublic interface List<E> {\n}\n",
    );
    write(
        root,
        "collections/ArrayList.java",
        "package collections;\n\npublic class ArrayList<E> implements List<E> {\n}\n",
    );
    write(
        root,
        "app/Main.java",
        "package app;\n\nimport collections.List;\nimport collections.ArrayList;\n\nclass Main {\n    void run() {\n        List<String> items = new ArrayList<>();\n    }\n}\n",
    );
}

#[test]
fn declaration_line_depends_on_both_collection_types() {
    let dir = tempfile::TempDir::new().unwrap();
    collections_project(dir.path());

    let outcome = analyzer(true, false)
        .analyze(dir.path(), &ExplicitPaths::default())
        .unwrap();

    let main = outcome
        .report
        .file(&dir.path().join("app/Main.java"))
        .expect("Main.java has dependencies");
    assert_eq!(
        main.get(8),
        Some(&ids(&["collections.List", "collections.ArrayList"]))
    );
    // Import lines reference the imported types.
    assert_eq!(main.get(3), Some(&ids(&["collections.List"])));
    assert_eq!(main.get(4), Some(&ids(&["collections.ArrayList"])));

    assert_eq!(outcome.stats.files_scanned, 3);
    assert_eq!(outcome.stats.files_analyzed, 3);
    assert!(outcome.skipped.is_empty());
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let dir = tempfile::TempDir::new().unwrap();
    collections_project(dir.path());
    write(
        dir.path(),
        "app/Other.java",
        "package app;\n\nimport collections.*;\n\nclass Other {\n    List<Main> mains;\n}\n",
    );

    let parallel = analyzer(true, false)
        .analyze(dir.path(), &ExplicitPaths::default())
        .unwrap();
    let sequential = analyzer(false, false)
        .analyze(dir.path(), &ExplicitPaths::default())
        .unwrap();
    let again = analyzer(true, false)
        .analyze(dir.path(), &ExplicitPaths::default())
        .unwrap();

    assert_eq!(parallel.report, sequential.report);
    assert_eq!(parallel.report, again.report);
    assert_eq!(
        parallel
            .report
            .file(&dir.path().join("app/Other.java"))
            .and_then(|lines| lines.get(6)),
        Some(&ids(&["collections.List", "app.Main"]))
    );
}

#[test]
fn files_without_dependencies_are_absent() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "p/package-info.java", "package p;\n");
    write(dir.path(), "p/Only.java", "package p;\n\n// nothing here\n");

    let outcome = analyzer(true, false)
        .analyze(dir.path(), &ExplicitPaths::default())
        .unwrap();

    assert!(outcome.report.is_empty());
    assert_eq!(outcome.stats.files_analyzed, 2);
    assert_eq!(outcome.stats.files_with_dependencies, 0);
}

#[test]
fn undecodable_file_is_skipped_and_the_rest_analyzed() {
    let dir = tempfile::TempDir::new().unwrap();
    collections_project(dir.path());
    let bad = dir.path().join("app/Bad.java");
    fs::write(&bad, [0x63, 0x6c, 0x61, 0x73, 0x73, 0x20, 0xff, 0xfe, 0x7b, 0x7d]).unwrap();

    let outcome = analyzer(true, false)
        .analyze(dir.path(), &ExplicitPaths::default())
        .unwrap();

    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].path, bad);
    assert!(outcome.skipped[0].reason.contains("UTF-8"));
    assert!(outcome.report.file(&bad).is_none());
    assert!(outcome
        .report
        .file(&dir.path().join("app/Main.java"))
        .is_some());
}

#[test]
fn syntax_errors_are_tolerated_unless_strict() {
    let dir = tempfile::TempDir::new().unwrap();
    collections_project(dir.path());
    write(
        dir.path(),
        "app/Broken.java",
        "package app;\n\nimport collections.List;\n\nclass Broken {\n    void f( {\n}\n",
    );
    let broken = dir.path().join("app/Broken.java");

    let tolerant = analyzer(false, false)
        .analyze(dir.path(), &ExplicitPaths::default())
        .unwrap();
    assert!(tolerant.skipped.is_empty());
    assert_eq!(
        tolerant.report.file(&broken).and_then(|lines| lines.get(3)),
        Some(&ids(&["collections.List"]))
    );

    let strict = analyzer(false, true)
        .analyze(dir.path(), &ExplicitPaths::default())
        .unwrap();
    assert_eq!(strict.skipped.len(), 1);
    assert_eq!(strict.skipped[0].path, broken);
    assert!(strict.skipped[0].reason.contains("syntax error"));
    assert!(strict.report.file(&broken).is_none());
}

#[test]
fn report_never_contains_primitives() {
    let dir = tempfile::TempDir::new().unwrap();
    write(
        dir.path(),
        "calc/Calc.java",
        "package calc;\n\nclass Calc {\n    int total;\n    long[] values;\n    double scale(int factor, char c) {\n        boolean ok = factor > 0;\n        return total * factor + values.length;\n    }\n}\n",
    );

    let outcome = analyzer(true, false)
        .analyze(dir.path(), &ExplicitPaths::default())
        .unwrap();

    for (_, lines) in outcome.report.files() {
        for (_, line_ids) in lines.iter() {
            for id in line_ids {
                assert!(!PRIMITIVE_TYPES.contains(&id.as_str()), "primitive {id}");
            }
        }
    }
}

#[test]
fn unreadable_root_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist");

    let err = analyzer(true, false)
        .analyze(&missing, &ExplicitPaths::default())
        .unwrap_err();
    assert!(matches!(err, AnalyzerError::RootUnreadable { .. }));
}

#[cfg(unix)]
#[test]
fn unreadable_directory_lands_on_the_skipped_list() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::TempDir::new().unwrap();
    collections_project(dir.path());
    write(
        dir.path(),
        "hidden/Secret.java",
        "package hidden;\n\nclass Secret {\n    collections.List items;\n}\n",
    );
    let hidden = dir.path().join("hidden");
    fs::set_permissions(&hidden, fs::Permissions::from_mode(0o000)).unwrap();
    let enforced = fs::read_dir(&hidden).is_err();
    let outcome = analyzer(true, false).analyze(dir.path(), &ExplicitPaths::default());
    fs::set_permissions(&hidden, fs::Permissions::from_mode(0o755)).unwrap();

    // Permission bits do not bind a privileged user.
    if !enforced {
        return;
    }
    let outcome = outcome.unwrap();
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].path, hidden);
    assert!(outcome.skipped[0].reason.starts_with("cannot scan"));
    assert_eq!(outcome.stats.files_skipped, 1);
    assert!(outcome
        .report
        .file(&dir.path().join("app/Main.java"))
        .is_some());
}
