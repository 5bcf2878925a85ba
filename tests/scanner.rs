use linedeps::core::scanner::FileScanner;
use std::fs;
use std::path::Path;

fn touch<P: AsRef<Path>>(p: P) {
    fs::write(p, "// test").unwrap();
}

#[test]
fn scanner_keeps_only_java_sources_in_sorted_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("b/nested")).unwrap();
    fs::create_dir_all(root.join("a")).unwrap();

    touch(root.join("b/nested/Zeta.java"));
    touch(root.join("a/Alpha.java"));
    touch(root.join("a/Alpha.class")); // ignored
    touch(root.join("b/readme.txt")); // ignored
    touch(root.join("b/Beta.java"));

    let files = FileScanner::new().scan_directory(root).unwrap().files;

    assert_eq!(
        files,
        vec![
            root.join("a/Alpha.java"),
            root.join("b/Beta.java"),
            root.join("b/nested/Zeta.java"),
        ]
    );
}

#[test]
fn excludes_match_paths_relative_to_the_root() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("generated/api")).unwrap();
    fs::create_dir_all(root.join("app")).unwrap();

    touch(root.join("generated/api/Stub.java"));
    touch(root.join("app/Main.java"));
    touch(root.join("app/MainTest.java"));

    let scanner = FileScanner::with_excludes(&["^generated/", "Test\\.java$"]).unwrap();
    let scanned = scanner.scan_directory(root).unwrap();

    assert_eq!(scanned.files, vec![root.join("app/Main.java")]);
    assert!(scanned.failures.is_empty());
}

#[test]
fn invalid_exclude_pattern_is_rejected() {
    assert!(FileScanner::with_excludes(&["(unclosed"]).is_err());
}

#[test]
fn single_file_root_and_overlapping_roots() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("src/pkg")).unwrap();
    touch(root.join("src/pkg/One.java"));
    touch(root.join("src/pkg/Two.java"));

    let scanner = FileScanner::new();
    assert_eq!(
        scanner.scan_directory(&root.join("src/pkg/One.java")).unwrap().files,
        vec![root.join("src/pkg/One.java")]
    );

    let files = scanner
        .scan_all(&[root.join("src/pkg"), root.join("src")])
        .unwrap()
        .files;
    assert_eq!(
        files,
        vec![root.join("src/pkg/One.java"), root.join("src/pkg/Two.java")]
    );
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    assert!(FileScanner::new()
        .scan_directory(&dir.path().join("absent"))
        .is_err());
}

#[cfg(unix)]
#[test]
fn unreadable_subdirectory_is_reported_not_dropped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("open")).unwrap();
    fs::create_dir_all(root.join("locked")).unwrap();
    touch(root.join("open/Visible.java"));
    touch(root.join("locked/Hidden.java"));

    let locked = root.join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    let enforced = fs::read_dir(&locked).is_err();
    let scanned = FileScanner::new().scan_all(&[root.to_path_buf()]);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    // Permission bits do not bind a privileged user.
    if !enforced {
        return;
    }
    let scanned = scanned.unwrap();
    assert_eq!(scanned.files, vec![root.join("open/Visible.java")]);
    assert_eq!(scanned.failures.len(), 1);
    assert_eq!(scanned.failures[0].path, locked);
}
