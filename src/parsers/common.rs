use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tree_sitter::{Language, Node as TSNode, Parser, Tree};

use super::ParseError;

pub struct TreeSitterParser {
    parser: Parser,
}

impl TreeSitterParser {
    pub fn new(language: Language) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(language)
            .map_err(|err| ParseError::Language(err.to_string()))?;
        Ok(Self { parser })
    }

    pub fn java() -> Result<Self, ParseError> {
        Self::new(tree_sitter_java::language())
    }

    pub fn parse_source(&mut self, file_path: &Path, source: &str) -> Result<Tree, ParseError> {
        self.parser
            .parse(source, None)
            .ok_or_else(|| ParseError::NoTree {
                path: file_path.to_path_buf(),
            })
    }

    /// Read a source file as UTF-8 with buffering sized to the file.
    pub fn read_source(file_path: &Path) -> Result<String, ParseError> {
        let read_error = |source| ParseError::Read {
            path: file_path.to_path_buf(),
            source,
        };
        let file = File::open(file_path).map_err(read_error)?;
        let file_size = file.metadata().map_err(read_error)?.len() as usize;

        let mut reader = BufReader::with_capacity(file_size.clamp(1, 8192), file);
        let mut bytes = Vec::with_capacity(file_size);
        reader.read_to_end(&mut bytes).map_err(read_error)?;

        String::from_utf8(bytes).map_err(|_| ParseError::Encoding {
            path: file_path.to_path_buf(),
        })
    }
}

pub fn extract_text<'a>(node: &TSNode, source: &'a [u8]) -> &'a str {
    std::str::from_utf8(&source[node.byte_range()]).unwrap_or("")
}

pub fn find_child_by_kind<'a>(node: &TSNode<'a>, kind: &str) -> Option<TSNode<'a>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|child| child.kind() == kind);
    found
}

pub fn named_children<'a>(node: &TSNode<'a>) -> Vec<TSNode<'a>> {
    let mut cursor = node.walk();
    let children = node.named_children(&mut cursor).collect();
    children
}

/// Number of `ERROR` and missing nodes below `node`.
pub fn count_syntax_errors(node: &TSNode) -> usize {
    if !node.has_error() {
        return 0;
    }
    let own = usize::from(node.is_error() || node.is_missing());
    let mut cursor = node.walk();
    let nested: usize = node
        .children(&mut cursor)
        .map(|child| count_syntax_errors(&child))
        .sum();
    own + nested
}
