//! Type names contributed by classpath entries: class directories, source
//! directories and jar archives.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use super::index::TypeOrigin;
use crate::core::scanner::is_java_file;

#[derive(Debug)]
pub struct ClasspathEntry {
    pub class_names: Vec<String>,
    /// `.java` files found inside a classpath directory.
    pub source_files: Vec<PathBuf>,
    pub origin: TypeOrigin,
}

pub fn scan_classpath_entry(entry: &Path) -> Result<ClasspathEntry> {
    if entry.is_dir() {
        return scan_directory(entry);
    }
    if entry.is_file() && is_archive(entry) {
        return scan_archive(entry);
    }
    if !entry.exists() {
        bail!("no such file or directory");
    }
    bail!("not a directory or jar archive")
}

fn is_archive(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("jar") | Some("zip")
    )
}

fn scan_directory(dir: &Path) -> Result<ClasspathEntry> {
    std::fs::read_dir(dir).with_context(|| format!("cannot read {}", dir.display()))?;

    let mut class_names = Vec::new();
    let mut source_files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping part of classpath directory {}: {err}", dir.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if is_java_file(path) {
            source_files.push(path.to_path_buf());
            continue;
        }
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        if let Some(name) = class_file_type_name(&relative) {
            class_names.push(name);
        }
    }

    class_names.sort();
    class_names.dedup();
    source_files.sort();
    Ok(ClasspathEntry {
        class_names,
        source_files,
        origin: TypeOrigin::ClassFile(dir.to_path_buf()),
    })
}

fn scan_archive(jar: &Path) -> Result<ClasspathEntry> {
    let file = File::open(jar).with_context(|| format!("cannot open {}", jar.display()))?;
    let archive = zip::ZipArchive::new(file)
        .with_context(|| format!("{} is not a readable archive", jar.display()))?;

    let mut class_names: Vec<String> = archive
        .file_names()
        .filter_map(class_file_type_name)
        .collect();
    class_names.sort();
    class_names.dedup();

    Ok(ClasspathEntry {
        class_names,
        source_files: Vec::new(),
        origin: TypeOrigin::Archive(jar.to_path_buf()),
    })
}

/// `com/acme/Outer$Inner.class` -> `com.acme.Outer.Inner`. Anonymous and local
/// classes, `module-info` and `package-info` have no usable name.
pub fn class_file_type_name(entry: &str) -> Option<String> {
    let stem = entry.strip_suffix(".class")?;
    if stem.starts_with("META-INF/") {
        return None;
    }
    let file_name = stem.rsplit('/').next().unwrap_or(stem);
    if file_name == "module-info" || file_name == "package-info" {
        return None;
    }

    let mut segments = Vec::new();
    for segment in stem.split('/') {
        for part in segment.split('$') {
            if part.is_empty() || part.starts_with(|c: char| c.is_ascii_digit()) {
                return None;
            }
            segments.push(part);
        }
    }
    Some(segments.join("."))
}
