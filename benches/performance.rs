use criterion::{black_box, criterion_group, criterion_main, Criterion};
use linedeps::core::{AnalyzerOptions, DependencyAnalyzer, ExplicitPaths, PathSet};
use linedeps::resolve::JavaResolver;
use std::path::Path;
use tempfile::TempDir;

/// `count` services in one package, each holding and calling the previous one.
fn write_services(root: &Path, count: usize) {
    let package = root.join("bench/service");
    std::fs::create_dir_all(&package).unwrap();
    std::fs::write(
        package.join("Record.java"),
        "package bench.service;\n\npublic class Record {\n    public int value;\n    public Record next;\n}\n",
    )
    .unwrap();

    for i in 0..count {
        let previous = if i == 0 { "Record".to_string() } else { format!("Service{}", i - 1) };
        let content = format!(
            r#"package bench.service;

import java.util.List;

public class Service{i} {{
    private final {previous} upstream;
    private Record last;

    public Service{i}({previous} upstream) {{
        this.upstream = upstream;
    }}

    public Record process(Record input) {{
        var copy = new Record();
        copy.value = input.value + {i};
        copy.next = input;
        last = copy;
        return copy;
    }}

    public int total(List<Record> records) {{
        int sum = 0;
        for (Record record : records) {{
            sum += process(record).value;
        }}
        return sum;
    }}
}}
"#
        );
        std::fs::write(package.join(format!("Service{i}.java")), content).unwrap();
    }
}

fn benchmark_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("project_analysis");

    let small = TempDir::new().unwrap();
    write_services(small.path(), 10);
    group.bench_function("small_project", |b| {
        b.iter(|| {
            let analyzer = DependencyAnalyzer::new(AnalyzerOptions::default()).unwrap();
            let result = analyzer.analyze(black_box(small.path()), &ExplicitPaths::default());
            black_box(result)
        });
    });

    let large = TempDir::new().unwrap();
    write_services(large.path(), 200);
    group.bench_function("large_project", |b| {
        b.iter(|| {
            let analyzer = DependencyAnalyzer::new(AnalyzerOptions::default()).unwrap();
            let result = analyzer.analyze(black_box(large.path()), &ExplicitPaths::default());
            black_box(result)
        });
    });

    group.bench_function("large_project_sequential", |b| {
        b.iter(|| {
            let analyzer = DependencyAnalyzer::new(AnalyzerOptions {
                parallel: false,
                ..AnalyzerOptions::default()
            })
            .unwrap();
            let result = analyzer.analyze(black_box(large.path()), &ExplicitPaths::default());
            black_box(result)
        });
    });

    group.finish();
}

fn benchmark_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("type_index");

    let project = TempDir::new().unwrap();
    write_services(project.path(), 200);
    let paths = PathSet {
        source_dirs: vec![project.path().to_path_buf()],
        classpath: Vec::new(),
    };

    group.bench_function("build_index", |b| {
        b.iter(|| black_box(JavaResolver::from_paths(black_box(&paths))));
    });

    group.finish();
}

criterion_group!(benches, benchmark_analysis, benchmark_index);
criterion_main!(benches);
