pub mod analyzer;
pub mod error;
pub mod line_index;
pub mod project;
pub mod report;
pub mod resolver;
pub mod scanner;
pub mod strategies;
pub mod traversal;

pub use analyzer::{AnalysisOutcome, AnalysisStats, AnalyzerOptions, DependencyAnalyzer, SkippedFile};
pub use error::AnalyzerError;
pub use line_index::LineIndex;
pub use project::{ConventionalLayout, ExplicitPaths, PathSet, ProjectPaths};
pub use report::{DependencyId, LineDependencies, Report};
pub use resolver::{
    Binding, MethodBinding, Resolution, ResolveError, Resolver, TypeRef, VariableBinding,
};
pub use scanner::FileScanner;
pub use strategies::{NodeKind, Strategy};
pub use traversal::{collect_dependencies, TraversalStats};
