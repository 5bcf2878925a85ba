//! Syntax-only scope queries: enclosing declarations, type parameters and the
//! local variables visible at a node.

use tree_sitter::Node as TSNode;

use super::names::TypeScope;
use crate::parsers::common::{find_child_by_kind, named_children};
use crate::parsers::declarations::{count_dimensions, type_parameter_names};
use crate::parsers::ParsedUnit;

pub const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

pub fn is_type_declaration(node: &TSNode) -> bool {
    TYPE_DECLARATIONS.contains(&node.kind())
}

/// Qualified name of a type declaration node, derived from its nesting.
pub fn declaration_fqn(unit: &ParsedUnit, decl: TSNode<'_>) -> Option<String> {
    let mut names = Vec::new();
    let mut current = Some(decl);
    while let Some(node) = current {
        if is_type_declaration(&node) {
            names.push(unit.text(&node.child_by_field_name("name")?).to_string());
        }
        current = node.parent();
    }
    names.reverse();
    let simple = names.join(".");
    Some(unit.context.qualify(&simple))
}

/// Type names and type parameters visible at `node`.
pub fn type_scope<'u>(unit: &'u ParsedUnit, node: TSNode<'_>) -> TypeScope<'u> {
    let mut scope = TypeScope::new(&unit.context);
    let source = unit.source.as_bytes();

    let mut current = Some(node);
    while let Some(ancestor) = current {
        if is_type_declaration(&ancestor) {
            if let Some(fqn) = declaration_fqn(unit, ancestor) {
                scope.enclosing.push(fqn);
            }
        }
        if let Some(params) = type_parameters_of(&ancestor) {
            scope
                .type_params
                .extend(type_parameter_names(&params, source));
        }
        current = ancestor.parent();
    }

    scope
}

fn type_parameters_of<'t>(node: &TSNode<'t>) -> Option<TSNode<'t>> {
    match node.kind() {
        "class_declaration"
        | "interface_declaration"
        | "record_declaration"
        | "method_declaration"
        | "constructor_declaration" => node
            .child_by_field_name("type_parameters")
            .or_else(|| find_child_by_kind(node, "type_parameters")),
        _ => None,
    }
}

/// The nearest type whose members are in scope at `node`: a type declaration
/// or the body of an anonymous class.
#[derive(Debug, Clone, Copy)]
pub enum EnclosingType<'t> {
    Declared(TSNode<'t>),
    /// The `object_creation_expression` owning the anonymous body.
    Anonymous(TSNode<'t>),
}

/// Enclosing types of `node`, innermost first.
pub fn enclosing_types<'t>(node: TSNode<'t>) -> Vec<EnclosingType<'t>> {
    let mut found = Vec::new();
    let mut child = node;
    while let Some(parent) = child.parent() {
        if let Some(enclosing) = type_boundary(parent, child) {
            found.push(enclosing);
        }
        child = parent;
    }
    found
}

/// `Some` when moving from `child` to `parent` leaves a type body.
pub fn type_boundary<'t>(parent: TSNode<'t>, child: TSNode<'t>) -> Option<EnclosingType<'t>> {
    if is_type_declaration(&parent) {
        let in_name = parent
            .child_by_field_name("name")
            .map(|name| name.id() == child.id())
            .unwrap_or(false);
        return (!in_name).then_some(EnclosingType::Declared(parent));
    }
    if parent.kind() == "object_creation_expression" && child.kind() == "class_body" {
        return Some(EnclosingType::Anonymous(parent));
    }
    None
}

/// A local variable, parameter or pattern variable as declared in source.
#[derive(Debug, Clone, Copy)]
pub struct LocalVar<'t> {
    pub name: TSNode<'t>,
    /// `None` for implicitly typed lambda parameters.
    pub type_node: Option<TSNode<'t>>,
    pub dims: usize,
    /// Initializer, or the iterated expression of an enhanced `for`.
    pub init: Option<TSNode<'t>>,
    pub iterated: bool,
}

impl<'t> LocalVar<'t> {
    fn untyped(name: TSNode<'t>) -> Self {
        Self {
            name,
            type_node: None,
            dims: 0,
            init: None,
            iterated: false,
        }
    }
}

/// A local named `name` declared by `parent` and visible from its child
/// `child`.
pub fn local_in<'t>(unit: &ParsedUnit, parent: TSNode<'t>, child: TSNode<'t>, name: &str) -> Option<LocalVar<'t>> {
    let source = unit.source.as_bytes();
    let preceding = |sibling: &TSNode| sibling.end_byte() <= child.start_byte();

    match parent.kind() {
        "block" | "constructor_body" | "switch_block_statement_group" | "switch_rule" => named_children(&parent)
            .into_iter()
            .rev()
            .filter(preceding)
            .filter(|sibling| sibling.kind() == "local_variable_declaration")
            .find_map(|decl| declarator_in(unit, decl, name)),
        "for_statement" => named_children(&parent)
            .into_iter()
            .filter(|sibling| sibling.kind() == "local_variable_declaration" && sibling.id() != child.id())
            .find_map(|decl| declarator_in(unit, decl, name)),
        "enhanced_for_statement" => {
            let name_node = parent.child_by_field_name("name")?;
            let value = parent.child_by_field_name("value");
            let in_value = value.map(|v| v.id() == child.id()).unwrap_or(false);
            if in_value || unit.text(&name_node) != name {
                return None;
            }
            Some(LocalVar {
                name: name_node,
                type_node: parent.child_by_field_name("type"),
                dims: parent
                    .child_by_field_name("dimensions")
                    .map(|dims| count_dimensions(&dims, source))
                    .unwrap_or(0),
                init: value,
                iterated: true,
            })
        }
        "try_with_resources_statement" => {
            let resources = parent.child_by_field_name("resources")?;
            if resources.id() == child.id() {
                return None;
            }
            resource_in(unit, resources, None, name)
        }
        "resource_specification" => resource_in(unit, parent, Some(child), name),
        "catch_clause" => {
            let param = find_child_by_kind(&parent, "catch_formal_parameter")?;
            let name_node = param.child_by_field_name("name")?;
            if unit.text(&name_node) != name {
                return None;
            }
            let type_node = find_child_by_kind(&param, "catch_type")
                .and_then(|types| named_children(&types).into_iter().next());
            Some(LocalVar {
                type_node,
                ..LocalVar::untyped(name_node)
            })
        }
        "method_declaration" | "constructor_declaration" => {
            let params = parent.child_by_field_name("parameters")?;
            if let Some(param) = parameter_in(unit, params, name) {
                return Some(param);
            }
            pattern_variable_in(unit, parent, child, name)
        }
        "lambda_expression" => {
            let params = parent.child_by_field_name("parameters")?;
            let param = match params.kind() {
                "identifier" => (unit.text(&params) == name).then(|| LocalVar::untyped(params)),
                "inferred_parameters" => named_children(&params)
                    .into_iter()
                    .find(|param| unit.text(param) == name)
                    .map(LocalVar::untyped),
                _ => parameter_in(unit, params, name),
            };
            param.or_else(|| pattern_variable_in(unit, parent, child, name))
        }
        "static_initializer" | "field_declaration" => pattern_variable_in(unit, parent, child, name),
        _ => None,
    }
}

fn declarator_in<'t>(unit: &ParsedUnit, decl: TSNode<'t>, name: &str) -> Option<LocalVar<'t>> {
    let type_node = decl.child_by_field_name("type");
    named_children(&decl)
        .into_iter()
        .filter(|child| child.kind() == "variable_declarator")
        .find_map(|declarator| {
            let name_node = declarator.child_by_field_name("name")?;
            if unit.text(&name_node) != name {
                return None;
            }
            Some(LocalVar {
                name: name_node,
                type_node,
                dims: declarator
                    .child_by_field_name("dimensions")
                    .map(|dims| count_dimensions(&dims, unit.source.as_bytes()))
                    .unwrap_or(0),
                init: declarator.child_by_field_name("value"),
                iterated: false,
            })
        })
}

fn resource_in<'t>(
    unit: &ParsedUnit,
    resources: TSNode<'t>,
    before: Option<TSNode<'t>>,
    name: &str,
) -> Option<LocalVar<'t>> {
    named_children(&resources)
        .into_iter()
        .filter(|resource| resource.kind() == "resource")
        .filter(|resource| before.map_or(true, |b| resource.end_byte() <= b.start_byte()))
        .find_map(|resource| {
            let name_node = resource.child_by_field_name("name")?;
            (unit.text(&name_node) == name).then(|| LocalVar {
                type_node: resource.child_by_field_name("type"),
                init: resource.child_by_field_name("value"),
                ..LocalVar::untyped(name_node)
            })
        })
}

/// Formal parameter named `name` in a `formal_parameters` node.
pub fn parameter_in<'t>(unit: &ParsedUnit, params: TSNode<'t>, name: &str) -> Option<LocalVar<'t>> {
    let source = unit.source.as_bytes();
    for param in named_children(&params) {
        match param.kind() {
            "formal_parameter" => {
                let Some(name_node) = param.child_by_field_name("name") else {
                    continue;
                };
                if unit.text(&name_node) == name {
                    return Some(LocalVar {
                        type_node: param.child_by_field_name("type"),
                        dims: param
                            .child_by_field_name("dimensions")
                            .map(|dims| count_dimensions(&dims, source))
                            .unwrap_or(0),
                        ..LocalVar::untyped(name_node)
                    });
                }
            }
            "spread_parameter" => {
                let Some(name_node) = find_child_by_kind(&param, "variable_declarator")
                    .and_then(|declarator| declarator.child_by_field_name("name"))
                else {
                    continue;
                };
                if unit.text(&name_node) == name {
                    let type_node = named_children(&param)
                        .into_iter()
                        .find(|child| !matches!(child.kind(), "modifiers" | "variable_declarator"));
                    return Some(LocalVar {
                        type_node,
                        dims: 1,
                        ..LocalVar::untyped(name_node)
                    });
                }
            }
            _ => {}
        }
    }
    None
}

/// `x instanceof Foo name` declared inside `root` before `child` ends.
fn pattern_variable_in<'t>(
    unit: &ParsedUnit,
    root: TSNode<'t>,
    child: TSNode<'t>,
    name: &str,
) -> Option<LocalVar<'t>> {
    let limit = child.end_byte();
    let mut found = None;
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.start_byte() >= limit {
            continue;
        }
        if node.kind() == "instanceof_expression" {
            if let Some(var) = pattern_binding(unit, node, name) {
                if found
                    .as_ref()
                    .map_or(true, |prev: &LocalVar| prev.name.start_byte() < var.name.start_byte())
                {
                    found = Some(var);
                }
            }
        }
        stack.extend(named_children(&node));
    }
    found
}

fn pattern_binding<'t>(unit: &ParsedUnit, node: TSNode<'t>, name: &str) -> Option<LocalVar<'t>> {
    if let Some(name_node) = node.child_by_field_name("name") {
        return (unit.text(&name_node) == name).then(|| LocalVar {
            type_node: node.child_by_field_name("right"),
            ..LocalVar::untyped(name_node)
        });
    }
    let pattern = find_child_by_kind(&node, "type_pattern")
        .or_else(|| find_child_by_kind(&node, "pattern").and_then(|p| find_child_by_kind(&p, "type_pattern")))?;
    let children = named_children(&pattern);
    let name_node = children.iter().rev().find(|c| c.kind() == "identifier").copied()?;
    if unit.text(&name_node) != name {
        return None;
    }
    let type_node = children
        .into_iter()
        .find(|c| !matches!(c.kind(), "identifier" | "modifiers"));
    Some(LocalVar {
        type_node,
        ..LocalVar::untyped(name_node)
    })
}

/// Field or enum constant named `name` declared directly in a type body.
#[derive(Debug, Clone, Copy)]
pub struct DeclaredField<'t> {
    pub type_node: Option<TSNode<'t>>,
    pub dims: usize,
    /// Enum constants have no type node; their type is the enum.
    pub enum_constant: bool,
}

pub fn field_in_body<'t>(unit: &ParsedUnit, body: TSNode<'t>, name: &str) -> Option<DeclaredField<'t>> {
    for member in named_children(&body) {
        match member.kind() {
            "field_declaration" | "constant_declaration" => {
                if let Some(local) = declarator_in(unit, member, name) {
                    return Some(DeclaredField {
                        type_node: local.type_node,
                        dims: local.dims,
                        enum_constant: false,
                    });
                }
            }
            "enum_constant" => {
                let matches = member
                    .child_by_field_name("name")
                    .map(|n| unit.text(&n) == name)
                    .unwrap_or(false);
                if matches {
                    return Some(DeclaredField {
                        type_node: None,
                        dims: 0,
                        enum_constant: true,
                    });
                }
            }
            "enum_body_declarations" => {
                if let Some(field) = field_in_body(unit, member, name) {
                    return Some(field);
                }
            }
            _ => {}
        }
    }
    None
}
