pub mod json;
pub mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::core::DependencyId;

/// Hides identifiers by prefix when printing. The report itself is never
/// filtered.
#[derive(Debug, Clone, Default)]
pub struct IdFilter {
    ignore_prefixes: Vec<String>,
}

impl IdFilter {
    pub fn new(ignore_prefixes: Vec<String>) -> Self {
        Self {
            ignore_prefixes: ignore_prefixes
                .into_iter()
                .filter(|prefix| !prefix.is_empty())
                .collect(),
        }
    }

    pub fn keeps(&self, id: &DependencyId) -> bool {
        !self
            .ignore_prefixes
            .iter()
            .any(|prefix| id.as_str().starts_with(prefix.as_str()))
    }
}
