use linedeps::core::{
    collect_dependencies, AnalysisOutcome, AnalyzerOptions, DependencyAnalyzer, DependencyId,
    ExplicitPaths, LineDependencies, PathSet,
};
use linedeps::parsers::JavaParser;
use linedeps::resolve::{JavaResolver, TypeOrigin};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn ids(names: &[&str]) -> BTreeSet<DependencyId> {
    names.iter().map(|name| DependencyId::new(*name)).collect()
}

fn analyze(root: &Path, classpath: Vec<PathBuf>) -> AnalysisOutcome {
    DependencyAnalyzer::new(AnalyzerOptions::default())
        .unwrap()
        .analyze(root, &ExplicitPaths::new(classpath))
        .unwrap()
}

fn lines_of<'a>(outcome: &'a AnalysisOutcome, file: &Path) -> &'a LineDependencies {
    outcome
        .report
        .file(file)
        .unwrap_or_else(|| panic!("no dependencies recorded for {}", file.display()))
}

const SHAPE: &str = "package shapes;

public interface Shape {
    double area();
    Point origin();
}
";

const POINT: &str = "package shapes;

public class Point {
    public static final Point ZERO = new Point(0, 0);
    public final int x;
    public final int y;

    public Point(int x, int y) {
        this.x = x;
        this.y = y;
    }

    public Point translate(Point delta) {
        return new Point(x + delta.x, y + delta.y);
    }
}
";

const CIRCLE: &str = "package shapes;

public class Circle implements Shape {
    private final Point center;
    protected double radius;

    public Circle(Point center, double radius) {
        this.center = center;
        this.radius = radius;
    }

    public double area() {
        return radius * radius;
    }

    public Point origin() {
        return center;
    }
}
";

const MAIN: &str = "package app;

import shapes.Circle;
import shapes.Point;
import shapes.Shape;
import static shapes.Point.ZERO;

public class Main {
    private Shape shape;

    void run(Object o) {
        var c = new Circle(ZERO, 2.0);
        Point p = c.origin().translate(Point.ZERO);
        if (o instanceof Circle) {
            ((Circle) o).origin();
        }
        int n = p.x;
        Class<?> k = Point.class;
    }
}
";

fn shapes_project(root: &Path) {
    write(root, "shapes/Shape.java", SHAPE);
    write(root, "shapes/Point.java", POINT);
    write(root, "shapes/Circle.java", CIRCLE);
    write(root, "app/Main.java", MAIN);
}

#[test]
fn index_contains_declared_types_and_packages() {
    let dir = tempfile::TempDir::new().unwrap();
    shapes_project(dir.path());

    let resolver = JavaResolver::from_paths(&PathSet {
        source_dirs: vec![dir.path().to_path_buf()],
        classpath: Vec::new(),
    });
    let index = resolver.index();

    assert_eq!(index.len(), 4);
    assert!(index.contains("shapes.Circle"));
    assert!(index.contains("app.Main"));
    assert!(index.is_package("shapes"));
    assert!(!index.contains("java.lang.String"));

    let circle = index.get("shapes.Circle").unwrap();
    assert!(matches!(circle.origin, TypeOrigin::Source(_)));
    let hierarchy: Vec<String> = index
        .hierarchy(&circle.self_type())
        .iter()
        .filter_map(|ty| ty.declared_name().map(str::to_string))
        .collect();
    assert!(hierarchy.contains(&"shapes.Shape".to_string()));
}

#[test]
fn imports_and_static_imports() {
    let dir = tempfile::TempDir::new().unwrap();
    shapes_project(dir.path());
    let outcome = analyze(dir.path(), Vec::new());
    let main = lines_of(&outcome, &dir.path().join("app/Main.java"));

    assert_eq!(main.get(3), Some(&ids(&["shapes.Circle"])));
    assert_eq!(main.get(6), Some(&ids(&["shapes.Point"])));
    assert_eq!(main.get(9), Some(&ids(&["shapes.Shape"])));
}

#[test]
fn var_locals_and_statically_imported_fields() {
    let dir = tempfile::TempDir::new().unwrap();
    shapes_project(dir.path());
    let outcome = analyze(dir.path(), Vec::new());
    let main = lines_of(&outcome, &dir.path().join("app/Main.java"));

    // `var c = new Circle(ZERO, 2.0);`
    assert_eq!(main.get(12), Some(&ids(&["shapes.Circle", "shapes.Point"])));
}

#[test]
fn chained_calls_resolve_through_return_types() {
    let dir = tempfile::TempDir::new().unwrap();
    shapes_project(dir.path());
    let outcome = analyze(dir.path(), Vec::new());
    let main = lines_of(&outcome, &dir.path().join("app/Main.java"));

    // `Point p = c.origin().translate(Point.ZERO);`
    assert_eq!(main.get(13), Some(&ids(&["shapes.Circle", "shapes.Point"])));
    // `((Circle) o).origin();`
    assert_eq!(main.get(15), Some(&ids(&["shapes.Circle", "shapes.Point"])));
}

#[test]
fn variables_obscure_types_of_the_same_name() {
    let dir = tempfile::TempDir::new().unwrap();
    write(
        dir.path(),
        "pick/Foo.java",
        "package pick;\n\npublic class Foo {\n    public static void bar() {\n    }\n}\n",
    );
    write(
        dir.path(),
        "pick/Other.java",
        "package pick;\n\npublic class Other {\n    public void bar() {\n    }\n}\n",
    );
    write(
        dir.path(),
        "pick/Use.java",
        "package pick;\n\nclass Use {\n    void run() {\n        Other Foo = new Other();\n        Foo.bar();\n    }\n}\n",
    );

    let outcome = analyze(dir.path(), Vec::new());
    let use_site = lines_of(&outcome, &dir.path().join("pick/Use.java"));

    // `Foo.bar();` calls `Other.bar` through the local, never `Foo.bar`.
    assert_eq!(use_site.get(6), Some(&ids(&["pick.Other"])));
}

#[test]
fn primitive_fields_report_only_their_declaring_type() {
    let dir = tempfile::TempDir::new().unwrap();
    shapes_project(dir.path());
    let outcome = analyze(dir.path(), Vec::new());
    let main = lines_of(&outcome, &dir.path().join("app/Main.java"));

    // `int n = p.x;`
    assert_eq!(main.get(17), Some(&ids(&["shapes.Point"])));
    // `Class<?> k = Point.class;` without an indexed java.lang.Class
    assert_eq!(main.get(18), Some(&ids(&["shapes.Point"])));
    // `if (o instanceof Circle) {` where `o` is an unindexed Object
    assert_eq!(main.get(14), Some(&ids(&["shapes.Circle"])));
}

#[test]
fn inherited_members_report_their_declaring_type() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "zoo/Food.java", "package zoo;\n\npublic class Food {\n}\n");
    write(
        dir.path(),
        "zoo/Animal.java",
        "package zoo;\n\npublic class Animal {\n    protected Food food;\n\n    public void feed(Food more) {\n    }\n}\n",
    );
    write(
        dir.path(),
        "zoo/Dog.java",
        "package zoo;\n\npublic class Dog extends Animal {\n    Food eat() {\n        return this.food;\n    }\n\n    void walk() {\n        feed(food);\n    }\n}\n",
    );

    let outcome = analyze(dir.path(), Vec::new());
    let dog = lines_of(&outcome, &dir.path().join("zoo/Dog.java"));

    assert_eq!(dog.get(3), Some(&ids(&["zoo.Dog", "zoo.Animal"])));
    assert_eq!(dog.get(5), Some(&ids(&["zoo.Food", "zoo.Animal"])));
    assert_eq!(dog.get(9), Some(&ids(&["zoo.Animal", "zoo.Food"])));
}

#[test]
fn generic_returns_are_substituted() {
    let dir = tempfile::TempDir::new().unwrap();
    write(
        dir.path(),
        "box/Box.java",
        "package box;\n\npublic class Box<T> {\n    private T value;\n\n    public T get() {\n        return value;\n    }\n}\n",
    );
    write(dir.path(), "box/Item.java", "package box;\n\npublic class Item {\n}\n");
    write(
        dir.path(),
        "box/UseBox.java",
        "package box;\n\nclass UseBox {\n    Item take(Box<Item> box) {\n        return box.get();\n    }\n}\n",
    );

    let outcome = analyze(dir.path(), Vec::new());
    let use_box = lines_of(&outcome, &dir.path().join("box/UseBox.java"));

    assert_eq!(use_box.get(5), Some(&ids(&["box.Box", "box.Item"])));
}

#[test]
fn enum_constants_resolve_to_their_enum() {
    let dir = tempfile::TempDir::new().unwrap();
    write(
        dir.path(),
        "zoo/Size.java",
        "package zoo;\n\npublic enum Size {\n    SMALL,\n    LARGE\n}\n",
    );
    write(
        dir.path(),
        "zoo/Cage.java",
        "package zoo;\n\nclass Cage {\n    Object pick() {\n        return Size.LARGE;\n    }\n}\n",
    );

    let outcome = analyze(dir.path(), Vec::new());
    let size = lines_of(&outcome, &dir.path().join("zoo/Size.java"));
    let cage = lines_of(&outcome, &dir.path().join("zoo/Cage.java"));

    assert_eq!(size.get(4), Some(&ids(&["zoo.Size"])));
    assert_eq!(cage.get(5), Some(&ids(&["zoo.Size"])));
}

#[test]
fn archive_classpath_provides_types_for_on_demand_imports() {
    let dir = tempfile::TempDir::new().unwrap();
    let src = dir.path().join("src");
    write(
        &src,
        "app/UsesWidget.java",
        "package app;\n\nimport org.acme.*;\n\nclass UsesWidget {\n    Widget widget;\n    Widget.Part part;\n}\n",
    );

    let jar = dir.path().join("acme.jar");
    let mut archive = zip::ZipWriter::new(fs::File::create(&jar).unwrap());
    for name in [
        "META-INF/MANIFEST.MF",
        "org/acme/Widget.class",
        "org/acme/Widget$Part.class",
        "org/acme/Widget$1.class",
    ] {
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        archive.start_file(name, options).unwrap();
        archive.write_all(b"\xca\xfe\xba\xbe").unwrap();
    }
    archive.finish().unwrap();

    let resolver = JavaResolver::from_paths(&PathSet {
        source_dirs: vec![src.clone()],
        classpath: vec![jar.clone()],
    });
    assert!(resolver.index().contains("org.acme.Widget.Part"));
    assert!(!resolver.index().contains("org.acme.Widget.1"));
    assert!(matches!(
        resolver.index().get("org.acme.Widget").map(|info| &info.origin),
        Some(TypeOrigin::Archive(_))
    ));

    let outcome = analyze(&src, vec![jar]);
    let uses = lines_of(&outcome, &src.join("app/UsesWidget.java"));

    assert_eq!(uses.get(6), Some(&ids(&["org.acme.Widget"])));
    assert_eq!(
        uses.get(7),
        Some(&ids(&["org.acme.Widget", "org.acme.Widget.Part"]))
    );
}

#[test]
fn class_directories_on_the_classpath_are_indexed() {
    let dir = tempfile::TempDir::new().unwrap();
    let src = dir.path().join("src");
    let classes = dir.path().join("classes");
    write(
        &src,
        "app/Client.java",
        "package app;\n\nimport net.http.Request;\n\nclass Client {\n    Request pending;\n}\n",
    );
    write(&classes, "net/http/Request.class", "");

    let outcome = analyze(&src, vec![classes]);
    let client = lines_of(&outcome, &src.join("app/Client.java"));

    assert_eq!(client.get(6), Some(&ids(&["net.http.Request"])));
}

const CHAIN_CALLS: usize = 1500;
const CONCAT_TERMS: usize = 2000;

fn deep_expressions_project(root: &Path) -> PathBuf {
    let chain = ".self()".repeat(CHAIN_CALLS);
    let concat = " + \"a\"".repeat(CONCAT_TERMS);
    let source = format!(
        "package deep;\n\nclass Text {{\n    Text self() {{\n        return this;\n    }}\n\n    Text chained() {{\n        return new Text(){chain};\n    }}\n\n    Object joined() {{\n        var s = self(){concat};\n        return s;\n    }}\n}}\n"
    );
    write(root, "deep/Text.java", &source);
    root.join("deep/Text.java")
}

#[test]
fn long_chains_and_deep_concatenations_resolve_in_every_mode() {
    let dir = tempfile::TempDir::new().unwrap();
    let text = deep_expressions_project(dir.path());

    for parallel in [true, false] {
        let outcome = DependencyAnalyzer::new(AnalyzerOptions {
            parallel,
            ..AnalyzerOptions::default()
        })
        .unwrap()
        .analyze(dir.path(), &ExplicitPaths::default())
        .unwrap();
        let lines = lines_of(&outcome, &text);

        assert_eq!(lines.get(9), Some(&ids(&["deep.Text"])));
        assert_eq!(
            lines.get(13),
            Some(&ids(&["deep.Text", "java.lang.String"]))
        );
        assert_eq!(lines.get(14), Some(&ids(&["java.lang.String"])));
        assert_eq!(outcome.stats.nodes_faulted, 0);
    }
}

#[test]
fn chain_receivers_are_typed_once_per_unit() {
    let dir = tempfile::TempDir::new().unwrap();
    let text = deep_expressions_project(dir.path());
    let resolver = JavaResolver::from_paths(&PathSet {
        source_dirs: vec![dir.path().to_path_buf()],
        classpath: Vec::new(),
    });
    let unit = JavaParser::new()
        .parse_source(&text, fs::read_to_string(&text).unwrap())
        .unwrap();

    let (lines, stats) = collect_dependencies(&resolver, &unit);

    assert_eq!(stats.faulted, 0);
    assert_eq!(lines.get(9), Some(&ids(&["deep.Text"])));
    // Every call of the chain and every operand of the concatenation has a
    // memoized type.
    assert!(unit.memo.len() > CHAIN_CALLS + CONCAT_TERMS);
    assert_eq!(unit.memo.depth(), 0);
}
