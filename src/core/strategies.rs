//! Node-kind specific extraction strategies and the registry that selects them.
//!
//! Each strategy is a pure function of the node and the [`Resolver`]. It may
//! return duplicates; the aggregator collapses them per line.

use tree_sitter::Node as TSNode;

use super::report::DependencyId;
use super::resolver::{Binding, Resolution, ResolveError, Resolver};
use crate::parsers::ParsedUnit;

/// Closed set of syntax-node kinds the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    MethodCall,
    ObjectCreation,
    SimpleName,
    SimpleType,
    TypeLiteral,
    FieldAccess,
    QualifiedName,
    InstanceOf,
    /// Any syntax without a strategy.
    Ignored,
}

impl NodeKind {
    /// Classify by exact grammar kind. Related but differently named kinds
    /// (e.g. `generic_type`) are `Ignored`.
    pub fn of(node: &TSNode) -> NodeKind {
        Self::from_grammar_kind(node.kind())
    }

    pub fn from_grammar_kind(kind: &str) -> NodeKind {
        match kind {
            "method_invocation" => NodeKind::MethodCall,
            "object_creation_expression" => NodeKind::ObjectCreation,
            "identifier" => NodeKind::SimpleName,
            "type_identifier" => NodeKind::SimpleType,
            "class_literal" => NodeKind::TypeLiteral,
            "field_access" => NodeKind::FieldAccess,
            "scoped_identifier" | "scoped_type_identifier" => NodeKind::QualifiedName,
            "instanceof_expression" => NodeKind::InstanceOf,
            _ => NodeKind::Ignored,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::MethodCall => "method-call",
            NodeKind::ObjectCreation => "object-creation",
            NodeKind::SimpleName => "simple-name",
            NodeKind::SimpleType => "simple-type",
            NodeKind::TypeLiteral => "type-literal",
            NodeKind::FieldAccess => "field-access",
            NodeKind::QualifiedName => "qualified-name",
            NodeKind::InstanceOf => "instanceof",
            NodeKind::Ignored => "ignored",
        }
    }
}

pub type Strategy = fn(&dyn Resolver, &ParsedUnit, TSNode<'_>) -> Resolution<Vec<DependencyId>>;

/// Strategy registered for `kind`, if any.
pub fn strategy_for(kind: NodeKind) -> Option<Strategy> {
    let strategy: Strategy = match kind {
        NodeKind::MethodCall => method_call,
        NodeKind::ObjectCreation => object_creation,
        NodeKind::SimpleName => simple_name,
        NodeKind::SimpleType => simple_type,
        NodeKind::TypeLiteral => type_literal,
        NodeKind::FieldAccess => field_access,
        NodeKind::QualifiedName => qualified_name,
        NodeKind::InstanceOf => instanceof,
        NodeKind::Ignored => return None,
    };
    Some(strategy)
}

/// Run the registered strategy for `node`. Unregistered kinds yield nothing.
pub fn extract(
    resolver: &dyn Resolver,
    unit: &ParsedUnit,
    node: TSNode<'_>,
) -> Resolution<Vec<DependencyId>> {
    match strategy_for(NodeKind::of(&node)) {
        Some(strategy) => strategy(resolver, unit, node),
        None => Ok(Vec::new()),
    }
}

/// Declaring type, non-primitive parameter types, non-primitive return type.
pub fn method_call(
    resolver: &dyn Resolver,
    unit: &ParsedUnit,
    node: TSNode<'_>,
) -> Resolution<Vec<DependencyId>> {
    let method = resolver.resolve_method(unit, node)?;
    let mut ids = Vec::with_capacity(method.parameters.len() + 2);
    ids.extend(DependencyId::from_type(&method.declaring_type));
    ids.extend(method.parameters.iter().filter_map(DependencyId::from_type));
    if let Some(ret) = &method.return_type {
        ids.extend(DependencyId::from_type(ret));
    }
    Ok(ids)
}

/// The constructed type; type arguments are not emitted.
pub fn object_creation(
    resolver: &dyn Resolver,
    unit: &ParsedUnit,
    node: TSNode<'_>,
) -> Resolution<Vec<DependencyId>> {
    let ty = resolver.resolve_expression(unit, node)?;
    Ok(DependencyId::from_type(&ty).into_iter().collect())
}

pub fn simple_name(
    resolver: &dyn Resolver,
    unit: &ParsedUnit,
    node: TSNode<'_>,
) -> Resolution<Vec<DependencyId>> {
    let binding = resolver.resolve_name(unit, node)?;
    Ok(binding_ids(&binding))
}

pub fn simple_type(
    resolver: &dyn Resolver,
    unit: &ParsedUnit,
    node: TSNode<'_>,
) -> Resolution<Vec<DependencyId>> {
    let ty = resolver.resolve_type(unit, node)?;
    Ok(DependencyId::from_type(&ty).into_iter().collect())
}

/// `Foo.class` depends on `Foo`, not on `Class`.
pub fn type_literal(
    resolver: &dyn Resolver,
    unit: &ParsedUnit,
    node: TSNode<'_>,
) -> Resolution<Vec<DependencyId>> {
    let ty = resolver.resolve_expression(unit, node)?;
    let referenced = ty.type_args().first().unwrap_or(&ty);
    Ok(DependencyId::from_type(referenced).into_iter().collect())
}

/// Field type (if not primitive) and the field's declaring type.
pub fn field_access(
    resolver: &dyn Resolver,
    unit: &ParsedUnit,
    node: TSNode<'_>,
) -> Resolution<Vec<DependencyId>> {
    let field = resolver.resolve_field(unit, node)?;
    let mut ids = Vec::with_capacity(2);
    if let Some(ty) = &field.ty {
        ids.extend(DependencyId::from_type(ty));
    }
    if let Some(owner) = &field.declaring_type {
        ids.extend(DependencyId::from_type(owner));
    }
    Ok(ids)
}

pub fn qualified_name(
    resolver: &dyn Resolver,
    unit: &ParsedUnit,
    node: TSNode<'_>,
) -> Resolution<Vec<DependencyId>> {
    let binding = resolver.resolve_name(unit, node)?;
    Ok(binding_ids(&binding))
}

/// Only the checked type on the right-hand side; the left operand's static
/// type is never reported.
pub fn instanceof(
    resolver: &dyn Resolver,
    unit: &ParsedUnit,
    node: TSNode<'_>,
) -> Resolution<Vec<DependencyId>> {
    let right = instanceof_target(node)
        .ok_or_else(|| ResolveError::faulted("instanceof expression without a type operand"))?;
    let ty = resolver.resolve_type(unit, right)?;
    Ok(DependencyId::from_type(&ty).into_iter().collect())
}

/// Shared policy for simple and qualified names.
fn binding_ids(binding: &Binding) -> Vec<DependencyId> {
    match binding {
        Binding::Type(ty) => DependencyId::from_type(ty).into_iter().collect(),
        Binding::Variable(variable) => variable
            .ty
            .as_ref()
            .and_then(DependencyId::from_type)
            .into_iter()
            .collect(),
        Binding::Method(method) => DependencyId::from_type(&method.declaring_type)
            .into_iter()
            .collect(),
        Binding::Package(_) => Vec::new(),
    }
}

const TYPE_KINDS: &[&str] = &[
    "type_identifier",
    "scoped_type_identifier",
    "generic_type",
    "array_type",
];

/// Type operand of an instanceof expression, looking through type patterns.
fn instanceof_target<'t>(node: TSNode<'t>) -> Option<TSNode<'t>> {
    if let Some(right) = node.child_by_field_name("right") {
        return pattern_type(right);
    }
    let mut cursor = node.walk();
    let mut after_keyword = false;
    for child in node.children(&mut cursor) {
        if child.kind() == "instanceof" {
            after_keyword = true;
            continue;
        }
        if after_keyword && child.is_named() {
            if let Some(ty) = pattern_type(child) {
                return Some(ty);
            }
        }
    }
    None
}

fn pattern_type(node: TSNode<'_>) -> Option<TSNode<'_>> {
    if TYPE_KINDS.contains(&node.kind()) {
        return Some(node);
    }
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| TYPE_KINDS.contains(&child.kind()));
    found
}
