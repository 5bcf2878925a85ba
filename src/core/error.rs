use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a run before any file is analyzed.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("cannot read project root {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot determine project paths: {0}")]
    ProjectPaths(String),

    #[error("cannot construct resolver: {0}")]
    ResolverInit(String),

    #[error("cannot start analysis workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
