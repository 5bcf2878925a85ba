//! Type declarations and unresolved type syntax collected from a unit, used to
//! build the project type index.

use tree_sitter::Node as TSNode;

use super::common::{extract_text, find_child_by_kind, named_children};
use super::java::ParsedUnit;

/// A type as written in source, before name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawType {
    Primitive(String),
    /// Dotted name as written (`Map.Entry`, `java.util.List`) with the type
    /// arguments of its last segment.
    Named { path: Vec<String>, args: Vec<RawType> },
    Array(Box<RawType>),
    /// `var`.
    Inferred,
}

impl RawType {
    pub fn named(path: &str) -> Self {
        RawType::Named {
            path: path.split('.').map(str::to_string).collect(),
            args: Vec::new(),
        }
    }

    pub fn from_node(node: &TSNode, source: &[u8]) -> Option<RawType> {
        match node.kind() {
            "integral_type" | "floating_point_type" | "boolean_type" | "void_type" => Some(
                RawType::Primitive(extract_text(node, source).trim().to_string()),
            ),
            "type_identifier" => {
                let name = extract_text(node, source).trim();
                if name == "var" {
                    Some(RawType::Inferred)
                } else {
                    Some(RawType::Named {
                        path: vec![name.to_string()],
                        args: Vec::new(),
                    })
                }
            }
            "scoped_type_identifier" => {
                let mut path = Vec::new();
                for child in named_children(node) {
                    match child.kind() {
                        "type_identifier" => {
                            path.push(extract_text(&child, source).trim().to_string())
                        }
                        "scoped_type_identifier" | "generic_type" => {
                            if let Some(RawType::Named { path: prefix, .. }) =
                                RawType::from_node(&child, source)
                            {
                                path.extend(prefix);
                            }
                        }
                        _ => {}
                    }
                }
                (!path.is_empty()).then(|| RawType::Named {
                    path,
                    args: Vec::new(),
                })
            }
            "generic_type" => {
                let mut base = None;
                let mut args = Vec::new();
                for child in named_children(node) {
                    match child.kind() {
                        "type_identifier" | "scoped_type_identifier" => {
                            base = RawType::from_node(&child, source)
                        }
                        "type_arguments" => {
                            args = named_children(&child)
                                .iter()
                                .filter_map(|arg| RawType::from_node(arg, source))
                                .collect()
                        }
                        _ => {}
                    }
                }
                match base? {
                    RawType::Named { path, .. } => Some(RawType::Named { path, args }),
                    other => Some(other),
                }
            }
            "array_type" => {
                let element = node
                    .child_by_field_name("element")
                    .and_then(|element| RawType::from_node(&element, source))?;
                let dims = node
                    .child_by_field_name("dimensions")
                    .map(|dims| count_dimensions(&dims, source))
                    .unwrap_or(1);
                Some(element.array_of(dims))
            }
            "wildcard" => {
                let bound = named_children(node)
                    .into_iter()
                    .filter(|child| child.kind() != "annotation" && child.kind() != "marker_annotation")
                    .find_map(|child| RawType::from_node(&child, source));
                let is_super = find_child_by_kind(node, "super").is_some();
                match bound {
                    Some(bound) if !is_super => Some(bound),
                    _ => Some(RawType::named("java.lang.Object")),
                }
            }
            "annotated_type" => named_children(node)
                .into_iter()
                .filter(|child| child.kind() != "annotation" && child.kind() != "marker_annotation")
                .find_map(|child| RawType::from_node(&child, source)),
            _ => None,
        }
    }

    pub fn array_of(self, dimensions: usize) -> RawType {
        (0..dimensions).fold(self, |ty, _| RawType::Array(Box::new(ty)))
    }
}

/// Number of `[]` pairs in a `dimensions` node.
pub fn count_dimensions(node: &TSNode, source: &[u8]) -> usize {
    extract_text(node, source).matches('[').count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

impl TypeKind {
    pub fn from_declaration_kind(kind: &str) -> Option<TypeKind> {
        match kind {
            "class_declaration" => Some(TypeKind::Class),
            "interface_declaration" => Some(TypeKind::Interface),
            "enum_declaration" => Some(TypeKind::Enum),
            "record_declaration" => Some(TypeKind::Record),
            "annotation_type_declaration" => Some(TypeKind::Annotation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: RawType,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: String,
    pub type_params: Vec<String>,
    pub params: Vec<RawType>,
    pub varargs: bool,
    /// `None` for constructors.
    pub return_type: Option<RawType>,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub fqn: String,
    pub kind: TypeKind,
    pub type_params: Vec<String>,
    /// Qualified names of the enclosing types, innermost first.
    pub enclosing: Vec<String>,
    pub superclass: Option<RawType>,
    pub interfaces: Vec<RawType>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
}

/// All top-level and member type declarations of `unit`.
pub fn collect_declarations(unit: &ParsedUnit) -> Vec<TypeDecl> {
    let mut collector = DeclarationCollector {
        source: unit.source.as_bytes(),
        decls: Vec::new(),
    };
    let root = unit.tree.root_node();
    let top_level_prefix = unit.context.package.clone();
    for child in named_children(&root) {
        collector.process_type(&child, top_level_prefix.as_deref(), &[]);
    }
    collector.decls
}

struct DeclarationCollector<'s> {
    source: &'s [u8],
    decls: Vec<TypeDecl>,
}

impl<'s> DeclarationCollector<'s> {
    fn text(&self, node: &TSNode) -> String {
        extract_text(node, self.source).trim().to_string()
    }

    fn process_type(&mut self, node: &TSNode, prefix: Option<&str>, enclosing: &[String]) {
        let Some(kind) = TypeKind::from_declaration_kind(node.kind()) else {
            return;
        };
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(&name_node);
        let fqn = match prefix {
            Some(prefix) => format!("{prefix}.{name}"),
            None => name,
        };

        let mut decl = TypeDecl {
            fqn: fqn.clone(),
            kind,
            type_params: self.type_parameters(node),
            enclosing: enclosing.to_vec(),
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        };

        if let Some(superclass) = node.child_by_field_name("superclass") {
            decl.superclass = named_children(&superclass)
                .iter()
                .find_map(|ty| RawType::from_node(ty, self.source));
        }
        if let Some(interfaces) = node.child_by_field_name("interfaces") {
            decl.interfaces.extend(self.type_list(&interfaces));
        }
        if let Some(extends) = find_child_by_kind(node, "extends_interfaces") {
            decl.interfaces.extend(self.type_list(&extends));
        }

        if kind == TypeKind::Record {
            self.record_components(node, &mut decl);
        }

        let mut nested_enclosing = Vec::with_capacity(enclosing.len() + 1);
        nested_enclosing.push(fqn.clone());
        nested_enclosing.extend_from_slice(enclosing);

        if let Some(body) = node.child_by_field_name("body") {
            self.process_body(&body, kind, &mut decl, &nested_enclosing);
        }

        self.decls.push(decl);
    }

    fn process_body(
        &mut self,
        body: &TSNode,
        kind: TypeKind,
        decl: &mut TypeDecl,
        enclosing: &[String],
    ) {
        let fqn = decl.fqn.clone();
        for member in named_children(body) {
            match member.kind() {
                "field_declaration" | "constant_declaration" => {
                    let is_static = kind == TypeKind::Interface || self.has_modifier(&member, "static");
                    self.process_field(&member, is_static, decl);
                }
                "method_declaration" | "annotation_type_element_declaration" => {
                    let is_static = self.has_modifier(&member, "static");
                    if let Some(method) = self.process_method(&member, true, is_static) {
                        decl.methods.push(method);
                    }
                }
                "constructor_declaration" => {
                    if let Some(method) = self.process_method(&member, false, false) {
                        decl.methods.push(method);
                    }
                }
                "enum_constant" => {
                    if let Some(name) = member.child_by_field_name("name") {
                        decl.fields.push(FieldDecl {
                            name: self.text(&name),
                            ty: RawType::named(&fqn),
                            is_static: true,
                        });
                    }
                }
                "enum_body_declarations" => self.process_body(&member, kind, decl, enclosing),
                _ => self.process_type(&member, Some(&fqn), enclosing),
            }
        }

        if kind == TypeKind::Enum && body.kind() == "enum_body" {
            decl.methods.push(MethodDecl {
                name: "values".to_string(),
                type_params: Vec::new(),
                params: Vec::new(),
                varargs: false,
                return_type: Some(RawType::named(&fqn).array_of(1)),
                is_static: true,
            });
            decl.methods.push(MethodDecl {
                name: "valueOf".to_string(),
                type_params: Vec::new(),
                params: vec![RawType::named("java.lang.String")],
                varargs: false,
                return_type: Some(RawType::named(&fqn)),
                is_static: true,
            });
        }
    }

    fn process_field(&self, field_node: &TSNode, is_static: bool, decl: &mut TypeDecl) {
        let Some(base) = field_node
            .child_by_field_name("type")
            .and_then(|ty| RawType::from_node(&ty, self.source))
        else {
            return;
        };

        for declarator in named_children(field_node) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            let dims = declarator
                .child_by_field_name("dimensions")
                .map(|dims| count_dimensions(&dims, self.source))
                .unwrap_or(0);
            decl.fields.push(FieldDecl {
                name: self.text(&name),
                ty: base.clone().array_of(dims),
                is_static,
            });
        }
    }

    fn process_method(
        &self,
        method_node: &TSNode,
        has_return: bool,
        is_static: bool,
    ) -> Option<MethodDecl> {
        let name = self.text(&method_node.child_by_field_name("name")?);
        let return_type = if has_return {
            Some(RawType::from_node(&method_node.child_by_field_name("type")?, self.source)?)
        } else {
            None
        };

        let mut params = Vec::new();
        let mut varargs = false;
        if let Some(parameters) = method_node.child_by_field_name("parameters") {
            for param in named_children(&parameters) {
                match param.kind() {
                    "formal_parameter" => {
                        if let Some(ty) = self.parameter_type(&param) {
                            params.push(ty);
                        }
                    }
                    "spread_parameter" => {
                        if let Some(ty) = named_children(&param)
                            .iter()
                            .find_map(|child| RawType::from_node(child, self.source))
                        {
                            params.push(ty.array_of(1));
                            varargs = true;
                        }
                    }
                    _ => {}
                }
            }
        }

        Some(MethodDecl {
            name,
            type_params: self.type_parameters(method_node),
            params,
            varargs,
            return_type,
            is_static,
        })
    }

    fn record_components(&self, record_node: &TSNode, decl: &mut TypeDecl) {
        let Some(parameters) = record_node.child_by_field_name("parameters") else {
            return;
        };
        for param in named_children(&parameters) {
            if param.kind() != "formal_parameter" {
                continue;
            }
            let (Some(name), Some(ty)) = (
                param.child_by_field_name("name"),
                self.parameter_type(&param),
            ) else {
                continue;
            };
            let name = self.text(&name);
            decl.methods.push(MethodDecl {
                name: name.clone(),
                type_params: Vec::new(),
                params: Vec::new(),
                varargs: false,
                return_type: Some(ty.clone()),
                is_static: false,
            });
            decl.fields.push(FieldDecl {
                name,
                ty,
                is_static: false,
            });
        }
    }

    fn parameter_type(&self, param: &TSNode) -> Option<RawType> {
        let ty = RawType::from_node(&param.child_by_field_name("type")?, self.source)?;
        let dims = param
            .child_by_field_name("dimensions")
            .map(|dims| count_dimensions(&dims, self.source))
            .unwrap_or(0);
        Some(ty.array_of(dims))
    }

    fn type_parameters(&self, node: &TSNode) -> Vec<String> {
        let Some(params) = node
            .child_by_field_name("type_parameters")
            .or_else(|| find_child_by_kind(node, "type_parameters"))
        else {
            return Vec::new();
        };
        type_parameter_names(&params, self.source)
    }

    fn type_list(&self, node: &TSNode) -> Vec<RawType> {
        let list = find_child_by_kind(node, "type_list").unwrap_or(*node);
        named_children(&list)
            .iter()
            .filter_map(|ty| RawType::from_node(ty, self.source))
            .collect()
    }

    fn has_modifier(&self, node: &TSNode, modifier: &str) -> bool {
        find_child_by_kind(node, "modifiers")
            .map(|modifiers| {
                extract_text(&modifiers, self.source)
                    .split_whitespace()
                    .any(|word| word == modifier)
            })
            .unwrap_or(false)
    }
}

/// Names declared by a `type_parameters` node.
pub fn type_parameter_names(params: &TSNode, source: &[u8]) -> Vec<String> {
    named_children(params)
        .iter()
        .filter(|param| param.kind() == "type_parameter")
        .filter_map(|param| {
            named_children(param)
                .into_iter()
                .find(|child| matches!(child.kind(), "type_identifier" | "identifier"))
                .map(|name| extract_text(&name, source).trim().to_string())
        })
        .collect()
}
