pub mod common;
pub mod declarations;
pub mod java;

use std::path::PathBuf;
use thiserror::Error;

pub use java::{FileContext, JavaParser, ParsedUnit, StaticImport};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8", path.display())]
    Encoding { path: PathBuf },

    #[error("parser produced no syntax tree for {}", path.display())]
    NoTree { path: PathBuf },

    #[error("{} has {errors} syntax error(s)", path.display())]
    Syntax { path: PathBuf, errors: usize },

    #[error("failed to load grammar: {0}")]
    Language(String),
}
