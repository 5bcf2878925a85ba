use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tree_sitter::{Node as TSNode, Tree};

use super::common::{count_syntax_errors, extract_text, find_child_by_kind, TreeSitterParser};
use super::declarations::{collect_declarations, TypeDecl};
use super::ParseError;
use crate::core::resolver::ExpressionMemo;
use crate::core::LineIndex;

/// One parsed Java compilation unit. The syntax is immutable once built;
/// `memo` collects expression types resolved against it.
pub struct ParsedUnit {
    pub path: PathBuf,
    pub source: String,
    pub tree: Tree,
    pub lines: LineIndex,
    pub context: FileContext,
    pub syntax_errors: usize,
    pub memo: ExpressionMemo,
}

impl ParsedUnit {
    pub fn text(&self, node: &TSNode) -> &str {
        extract_text(node, self.source.as_bytes())
    }

    /// Node text with whitespace and line breaks removed, for dotted names.
    pub fn compact_text(&self, node: &TSNode) -> String {
        self.text(node).split_whitespace().collect()
    }

    pub fn declarations(&self) -> Vec<TypeDecl> {
        collect_declarations(self)
    }
}

/// `import static owner.member;` or `import static owner.*;` (`member == None`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticImport {
    pub owner: String,
    pub member: Option<String>,
}

/// Package and imports of one compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileContext {
    pub package: Option<String>,
    /// Simple name -> qualified name, from `import a.b.C;`.
    pub single_imports: HashMap<String, String>,
    /// Prefixes from `import a.b.*;`, in declaration order.
    pub on_demand_imports: Vec<String>,
    pub static_imports: Vec<StaticImport>,
}

impl FileContext {
    pub fn from_root(root: &TSNode, source: &[u8]) -> Self {
        let mut context = FileContext::default();
        let mut cursor = root.walk();

        for child in root.children(&mut cursor) {
            match child.kind() {
                "package_declaration" => {
                    if let Some(name) = dotted_name_child(&child, source) {
                        context.package = Some(name);
                    }
                }
                "import_declaration" => context.add_import(&child, source),
                _ => {}
            }
        }

        context
    }

    /// Qualify a top-level simple name with this file's package.
    pub fn qualify(&self, simple_name: &str) -> String {
        match &self.package {
            Some(package) => format!("{package}.{simple_name}"),
            None => simple_name.to_string(),
        }
    }

    fn add_import(&mut self, import_node: &TSNode, source: &[u8]) {
        let Some(name) = dotted_name_child(import_node, source) else {
            return;
        };
        let is_static = find_child_by_kind(import_node, "static").is_some();
        let on_demand = find_child_by_kind(import_node, "asterisk").is_some();

        match (is_static, on_demand) {
            (false, false) => {
                let simple = name.rsplit('.').next().unwrap_or(&name).to_string();
                self.single_imports.insert(simple, name);
            }
            (false, true) => self.on_demand_imports.push(name),
            (true, false) => {
                if let Some((owner, member)) = name.rsplit_once('.') {
                    self.static_imports.push(StaticImport {
                        owner: owner.to_string(),
                        member: Some(member.to_string()),
                    });
                }
            }
            (true, true) => self.static_imports.push(StaticImport {
                owner: name,
                member: None,
            }),
        }
    }
}

fn dotted_name_child(node: &TSNode, source: &[u8]) -> Option<String> {
    let name_node = find_child_by_kind(node, "scoped_identifier")
        .or_else(|| find_child_by_kind(node, "identifier"))?;
    Some(
        extract_text(&name_node, source)
            .split_whitespace()
            .collect(),
    )
}

/// Java front end. `strict` rejects trees containing syntax errors instead of
/// analyzing the recovered tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaParser {
    strict: bool,
}

impl JavaParser {
    pub fn new() -> Self {
        Self { strict: false }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn parse_file(&self, file_path: &Path) -> Result<ParsedUnit, ParseError> {
        let source = TreeSitterParser::read_source(file_path)?;
        self.parse_source(file_path, source)
    }

    pub fn parse_source(&self, file_path: &Path, source: String) -> Result<ParsedUnit, ParseError> {
        let mut parser = TreeSitterParser::java()?;
        let tree = parser.parse_source(file_path, &source)?;

        let root = tree.root_node();
        let syntax_errors = count_syntax_errors(&root);
        if self.strict && syntax_errors > 0 {
            return Err(ParseError::Syntax {
                path: file_path.to_path_buf(),
                errors: syntax_errors,
            });
        }

        let context = FileContext::from_root(&root, source.as_bytes());
        let lines = LineIndex::new(&source);

        Ok(ParsedUnit {
            path: file_path.to_path_buf(),
            source,
            tree,
            lines,
            context,
            syntax_errors,
            memo: ExpressionMemo::default(),
        })
    }
}
