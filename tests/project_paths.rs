use linedeps::core::{AnalyzerError, ConventionalLayout, ExplicitPaths, PathSet, ProjectPaths};
use std::fs;
use std::path::{Path, PathBuf};

fn mkdir(root: &Path, relative: &str) {
    fs::create_dir_all(root.join(relative)).unwrap();
}

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "").unwrap();
}

fn multi_module(root: &Path) {
    touch(root, "build.gradle");
    touch(root, "core/build.gradle");
    mkdir(root, "core/src/main/java/org/core");
    mkdir(root, "core/src/test/java/org/core");
    mkdir(root, "core/build/classes/java/main");
    touch(root, "core/libs/guava.jar");
    touch(root, "core/libs/notes.txt");
    touch(root, "app/pom.xml");
    mkdir(root, "app/src/main/java");
    mkdir(root, "app/target/classes");
    mkdir(root, ".gradle/src/main/java");
}

#[test]
fn conventional_layout_collects_module_sources_and_classpath() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    multi_module(root);

    let paths = ConventionalLayout::new(false, vec![PathBuf::from("/opt/extra.jar")])
        .paths(root)
        .unwrap();

    assert_eq!(
        paths,
        PathSet {
            source_dirs: vec![root.join("app/src/main/java"), root.join("core/src/main/java")],
            classpath: vec![
                root.join("app/target/classes"),
                root.join("core/build/classes/java/main"),
                root.join("core/libs/guava.jar"),
                PathBuf::from("/opt/extra.jar"),
            ],
        }
    );
}

#[test]
fn test_sources_follow_their_module_when_included() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    multi_module(root);

    let paths = ConventionalLayout::new(true, Vec::new()).paths(root).unwrap();

    assert_eq!(
        paths.source_dirs,
        vec![
            root.join("app/src/main/java"),
            root.join("core/src/main/java"),
            root.join("core/src/test/java"),
        ]
    );
}

#[test]
fn build_output_directories_are_not_modules() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    multi_module(root);
    touch(root, "core/build/tmp/pom.xml");

    let modules = ConventionalLayout::default().modules(root);
    assert_eq!(modules, vec![root.to_path_buf(), root.join("app"), root.join("core")]);
}

#[test]
fn plain_directory_falls_back_to_the_root() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    touch(root, "pkg/Thing.java");

    let paths = ConventionalLayout::new(false, vec![PathBuf::from("lib.jar")])
        .paths(root)
        .unwrap();

    assert_eq!(paths.source_dirs, vec![root.to_path_buf()]);
    assert_eq!(paths.classpath, vec![PathBuf::from("lib.jar")]);
}

#[test]
fn explicit_paths_use_the_root_verbatim() {
    let dir = tempfile::TempDir::new().unwrap();
    let paths = ExplicitPaths::new(vec![PathBuf::from("a.jar")])
        .paths(dir.path())
        .unwrap();

    assert_eq!(paths.source_dirs, vec![dir.path().to_path_buf()]);
    assert_eq!(paths.classpath, vec![PathBuf::from("a.jar")]);
}

#[test]
fn missing_root_is_unreadable() {
    let dir = tempfile::TempDir::new().unwrap();
    let missing = dir.path().join("gone");

    for project in [
        &ConventionalLayout::default() as &dyn ProjectPaths,
        &ExplicitPaths::default(),
    ] {
        let err = project.paths(&missing).unwrap_err();
        assert!(matches!(err, AnalyzerError::RootUnreadable { .. }));
    }
}
