//! Java name and type resolution over a project-wide [`TypeIndex`].
//!
//! The index is built once from the project's source directories and
//! classpath, then shared read-only by every worker. Resolution itself is
//! purely syntactic plus index lookups: no bytecode is read, and JDK types
//! resolve only when something on the classpath declares them.

pub mod classpath;
mod expr;
pub mod index;
pub mod names;
pub mod scope;

use std::sync::Arc;
use tracing::info;
use tree_sitter::Node as TSNode;

pub use index::{FieldInfo, MethodInfo, TypeIndex, TypeIndexBuilder, TypeInfo, TypeOrigin};
pub use names::TypeScope;

use crate::core::project::PathSet;
use crate::core::resolver::{
    Binding, MethodBinding, Resolution, ResolveError, Resolver, TypeRef, VariableBinding,
};
use crate::parsers::common::{find_child_by_kind, named_children};
use crate::parsers::declarations::{count_dimensions, RawType};
use crate::parsers::ParsedUnit;
use scope::{EnclosingType, LocalVar};

/// What the qualifier of a dotted name or member access denotes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Variable(VariableBinding),
    Value(TypeRef),
    Type(TypeRef),
    Package(String),
}

/// [`Resolver`] backed by a [`TypeIndex`].
#[derive(Debug, Clone)]
pub struct JavaResolver {
    index: Arc<TypeIndex>,
}

impl JavaResolver {
    pub fn new(index: Arc<TypeIndex>) -> Self {
        Self { index }
    }

    /// Index the source directories and classpath of a project.
    pub fn from_paths(paths: &PathSet) -> Self {
        let mut builder = TypeIndex::builder();
        let sources = builder.add_source_dirs(&paths.source_dirs);
        builder.add_classpath(&paths.classpath);
        let index = builder.build();
        info!(
            "indexed {} type(s) from {} source file(s) and {} classpath entr(ies)",
            index.len(),
            sources,
            paths.classpath.len()
        );
        Self::new(Arc::new(index))
    }

    pub fn index(&self) -> &TypeIndex {
        &self.index
    }

    fn identifier_binding(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<Binding> {
        let name = unit.text(&node);
        let Some(parent) = node.parent() else {
            return Err(ResolveError::unresolved(name));
        };
        let is_field = |field: &str| {
            parent
                .child_by_field_name(field)
                .map_or(false, |child| child.id() == node.id())
        };

        match parent.kind() {
            _ if scope::is_type_declaration(&parent) && is_field("name") => {
                let fqn = scope::declaration_fqn(unit, parent)
                    .ok_or_else(|| ResolveError::faulted("type declaration without a name"))?;
                Ok(Binding::Type(TypeRef::declared(fqn)))
            }
            "method_declaration"
            | "constructor_declaration"
            | "compact_constructor_declaration"
            | "annotation_type_element_declaration"
                if is_field("name") =>
            {
                self.declared_method(unit, parent).map(Binding::Method)
            }
            "enum_constant" if is_field("name") => {
                let owner = self.enum_of_constant(unit, parent)?;
                Ok(Binding::Variable(VariableBinding {
                    name: name.to_string(),
                    ty: Some(owner.clone()),
                    declaring_type: Some(owner),
                }))
            }
            "variable_declarator"
            | "formal_parameter"
            | "catch_formal_parameter"
            | "enhanced_for_statement"
            | "resource"
            | "instanceof_expression"
                if is_field("name") =>
            {
                self.declaration_site_binding(unit, parent, node)
            }
            "type_parameter" => Ok(Binding::Type(TypeRef::Variable(name.to_string()))),
            "lambda_expression" | "inferred_parameters" => Ok(Binding::Variable(VariableBinding {
                name: name.to_string(),
                ty: None,
                declaring_type: None,
            })),
            "scoped_identifier" | "package_declaration" | "import_declaration" => {
                self.qualified_binding(unit, node)
            }
            "marker_annotation" | "annotation" if is_field("name") => {
                let scope = scope::type_scope(unit, node);
                self.index
                    .resolve_simple_type(&scope, name)
                    .map(Binding::Type)
                    .ok_or_else(|| ResolveError::unresolved(name))
            }
            "method_invocation" if is_field("name") => {
                self.invoked_method(unit, parent).map(Binding::Method)
            }
            "field_access" if is_field("field") => {
                self.accessed_field(unit, parent).map(Binding::Variable)
            }
            "method_reference" if named_children(&parent).first().map(|n| n.id()) != Some(node.id()) => {
                self.referenced_method(unit, parent, name).map(Binding::Method)
            }
            "labeled_statement" | "break_statement" | "continue_statement" => {
                Err(ResolveError::unresolved(name))
            }
            "element_value_pair" if is_field("key") => Err(ResolveError::unresolved(name)),
            _ => self.simple_name_binding(unit, node),
        }
    }

    /// Binding of an identifier used as a name in an expression: variable,
    /// then type, then package.
    fn simple_name_binding(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<Binding> {
        let name = unit.text(&node);
        if let Some(variable) = self.lookup_value(unit, node, name) {
            return Ok(Binding::Variable(variable));
        }
        let scope = scope::type_scope(unit, node);
        if let Some(ty) = self.index.resolve_simple_type(&scope, name) {
            return Ok(Binding::Type(ty));
        }
        if self.index.is_package(name) {
            return Ok(Binding::Package(name.to_string()));
        }
        Err(ResolveError::unresolved(name))
    }

    /// Binding of an identifier or `scoped_identifier` that is part of a
    /// dotted name.
    fn qualified_binding(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<Binding> {
        // The identifier after the last dot binds like the whole name.
        let node = match node.parent() {
            Some(parent)
                if parent.kind() == "scoped_identifier"
                    && parent.child_by_field_name("name").map(|n| n.id()) == Some(node.id()) =>
            {
                parent
            }
            _ => node,
        };
        let mut outer = node;
        while let Some(parent) = outer.parent() {
            if parent.kind() != "scoped_identifier" {
                break;
            }
            outer = parent;
        }
        let name = unit.compact_text(&node);
        let context = outer.parent();

        match context.map(|c| c.kind()) {
            Some("package_declaration") => Ok(Binding::Package(name)),
            Some("import_declaration") => {
                let import = context.ok_or_else(|| ResolveError::faulted("import without declaration"))?;
                self.import_binding(import, node, outer, name)
            }
            Some("marker_annotation") | Some("annotation") => {
                if self.index.contains(&name) || node.id() == outer.id() {
                    Ok(Binding::Type(TypeRef::declared(name)))
                } else {
                    Ok(Binding::Package(name))
                }
            }
            Some(
                "module_declaration"
                | "requires_module_directive"
                | "exports_module_directive"
                | "opens_module_directive",
            ) => Ok(Binding::Package(name)),
            _ => match self.target_of(unit, node)? {
                Target::Variable(variable) => Ok(Binding::Variable(variable)),
                Target::Type(ty) => Ok(Binding::Type(ty)),
                Target::Package(package) => Ok(Binding::Package(package)),
                Target::Value(_) => Err(ResolveError::unresolved(name)),
            },
        }
    }

    fn import_binding(
        &self,
        import: TSNode<'_>,
        node: TSNode<'_>,
        outer: TSNode<'_>,
        name: String,
    ) -> Resolution<Binding> {
        if self.index.contains(&name) {
            return Ok(Binding::Type(TypeRef::declared(name)));
        }
        let is_static = find_child_by_kind(&import, "static").is_some();
        let on_demand = find_child_by_kind(&import, "asterisk").is_some();
        let is_full = node.id() == outer.id();
        let is_static_owner = is_static
            && !on_demand
            && outer.child_by_field_name("scope").map(|s| s.id()) == Some(node.id());

        match (is_full, is_static, on_demand) {
            (true, false, false) | (true, true, true) => Ok(Binding::Type(TypeRef::declared(name))),
            (true, true, false) => {
                let (owner, member) = name
                    .rsplit_once('.')
                    .ok_or_else(|| ResolveError::unresolved(name.as_str()))?;
                self.static_member(&TypeRef::declared(owner), member)
                    .ok_or_else(|| ResolveError::unresolved(name.as_str()))
            }
            _ if is_static_owner => Ok(Binding::Type(TypeRef::declared(name))),
            _ => Ok(Binding::Package(name)),
        }
    }

    /// Field, member type or method named `member` reachable from `owner`.
    fn static_member(&self, owner: &TypeRef, member: &str) -> Option<Binding> {
        if let Some(field) = self.field_of_type(owner, member) {
            return Some(Binding::Variable(field));
        }
        if let Some(nested) = owner
            .declared_name()
            .and_then(|fqn| self.index.member_type(fqn, member))
        {
            return Some(Binding::Type(TypeRef::declared(nested)));
        }
        let methods = self.index.find_methods(owner, member);
        methods
            .first()
            .map(|method| Binding::Method(self.method_binding(method)))
    }

    fn declaration_site_binding(
        &self,
        unit: &ParsedUnit,
        parent: TSNode<'_>,
        name_node: TSNode<'_>,
    ) -> Resolution<Binding> {
        let name = unit.text(&name_node).to_string();
        let source = unit.source.as_bytes();
        let dims_of = |node: TSNode<'_>| {
            node.child_by_field_name("dimensions")
                .map(|dims| count_dimensions(&dims, source))
                .unwrap_or(0)
        };

        let mut local = LocalVar {
            name: name_node,
            type_node: None,
            dims: 0,
            init: None,
            iterated: false,
        };
        let mut declaring_type = None;

        match parent.kind() {
            "variable_declarator" => {
                let decl = parent
                    .parent()
                    .ok_or_else(|| ResolveError::faulted("declarator outside a declaration"))?;
                local.dims = dims_of(parent);
                local.init = parent.child_by_field_name("value");
                match decl.kind() {
                    "spread_parameter" => {
                        local.type_node = named_children(&decl)
                            .into_iter()
                            .find(|c| !matches!(c.kind(), "modifiers" | "variable_declarator"));
                        local.dims += 1;
                    }
                    kind => {
                        local.type_node = decl.child_by_field_name("type");
                        if matches!(kind, "field_declaration" | "constant_declaration") {
                            declaring_type = scope::enclosing_types(decl)
                                .first()
                                .and_then(|enclosing| self.enclosing_type_ref(unit, *enclosing));
                        }
                    }
                }
            }
            "catch_formal_parameter" => {
                local.type_node = find_child_by_kind(&parent, "catch_type")
                    .and_then(|types| named_children(&types).into_iter().next());
            }
            "enhanced_for_statement" => {
                local.type_node = parent.child_by_field_name("type");
                local.dims = dims_of(parent);
                local.init = parent.child_by_field_name("value");
                local.iterated = true;
            }
            "instanceof_expression" => local.type_node = parent.child_by_field_name("right"),
            _ => {
                local.type_node = parent.child_by_field_name("type");
                local.dims = dims_of(parent);
                local.init = parent.child_by_field_name("value");
            }
        }

        Ok(Binding::Variable(VariableBinding {
            name,
            ty: self.local_type(unit, local),
            declaring_type,
        }))
    }

    fn declared_method(&self, unit: &ParsedUnit, method: TSNode<'_>) -> Resolution<MethodBinding> {
        let name_node = method
            .child_by_field_name("name")
            .ok_or_else(|| ResolveError::faulted("method declaration without a name"))?;
        let declaring_type = scope::enclosing_types(method)
            .first()
            .and_then(|enclosing| self.enclosing_type_ref(unit, *enclosing))
            .ok_or_else(|| ResolveError::unresolved(unit.text(&name_node)))?;

        let parameters = method
            .child_by_field_name("parameters")
            .map(|params| {
                named_children(&params)
                    .into_iter()
                    .filter_map(|param| {
                        let name = match param.kind() {
                            "formal_parameter" => param.child_by_field_name("name")?,
                            "spread_parameter" => find_child_by_kind(&param, "variable_declarator")?
                                .child_by_field_name("name")?,
                            _ => return None,
                        };
                        let local = scope::parameter_in(unit, params, unit.text(&name))?;
                        self.local_type(unit, local)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let return_type = match method.kind() {
            "method_declaration" | "annotation_type_element_declaration" => method
                .child_by_field_name("type")
                .and_then(|ty| self.type_of_type_node(unit, ty).ok()),
            _ => None,
        };

        Ok(MethodBinding {
            name: unit.text(&name_node).to_string(),
            declaring_type: erase(&declaring_type),
            parameters,
            return_type,
        })
    }

    fn enum_of_constant(&self, unit: &ParsedUnit, constant: TSNode<'_>) -> Resolution<TypeRef> {
        scope::enclosing_types(constant)
            .into_iter()
            .find_map(|enclosing| match enclosing {
                EnclosingType::Declared(decl) if decl.kind() == "enum_declaration" => {
                    scope::declaration_fqn(unit, decl).map(TypeRef::declared)
                }
                _ => None,
            })
            .ok_or_else(|| ResolveError::faulted("enum constant outside an enum"))
    }

    /// Variable in scope at `node`: locals and parameters, then fields of each
    /// enclosing type, then statically imported fields.
    fn lookup_value(&self, unit: &ParsedUnit, node: TSNode<'_>, name: &str) -> Option<VariableBinding> {
        let mut child = node;
        while let Some(parent) = child.parent() {
            if let Some(local) = scope::local_in(unit, parent, child, name) {
                return Some(VariableBinding {
                    name: name.to_string(),
                    ty: self.local_type(unit, local),
                    declaring_type: None,
                });
            }
            if let Some(enclosing) = scope::type_boundary(parent, child) {
                if let Some(field) = self.field_of_enclosing(unit, enclosing, name) {
                    return Some(field);
                }
            }
            child = parent;
        }

        unit.context
            .static_imports
            .iter()
            .filter(|import| import.member.as_deref().map_or(true, |member| member == name))
            .find_map(|import| self.field_of_type(&TypeRef::declared(import.owner.clone()), name))
    }

    fn field_of_enclosing(
        &self,
        unit: &ParsedUnit,
        enclosing: EnclosingType<'_>,
        name: &str,
    ) -> Option<VariableBinding> {
        match enclosing {
            EnclosingType::Declared(decl) => {
                let fqn = scope::declaration_fqn(unit, decl)?;
                if let Some(info) = self.index.get(&fqn) {
                    return self.field_of_type(&info.self_type(), name);
                }
                let body = decl.child_by_field_name("body")?;
                self.body_field(unit, body, TypeRef::declared(fqn), name)
            }
            EnclosingType::Anonymous(creation) => {
                let created = creation
                    .child_by_field_name("type")
                    .and_then(|ty| self.type_of_type_node(unit, ty).ok())?;
                if let Some(body) = find_child_by_kind(&creation, "class_body") {
                    if let Some(field) = self.body_field(unit, body, created.clone(), name) {
                        return Some(field);
                    }
                }
                self.field_of_type(&created, name)
            }
        }
    }

    fn body_field(&self, unit: &ParsedUnit, body: TSNode<'_>, owner: TypeRef, name: &str) -> Option<VariableBinding> {
        let field = scope::field_in_body(unit, body, name)?;
        let ty = if field.enum_constant {
            Some(owner.clone())
        } else {
            field
                .type_node
                .and_then(|node| self.type_of_type_node(unit, node).ok())
                .map(|ty| ty.array_of(field.dims))
        };
        Some(VariableBinding {
            name: name.to_string(),
            ty,
            declaring_type: Some(erase(&owner)),
        })
    }

    /// Field `name` of `owner` or its supertypes; `length` of arrays.
    fn field_of_type(&self, owner: &TypeRef, name: &str) -> Option<VariableBinding> {
        if let TypeRef::Array(_) = owner {
            return (name == "length").then(|| VariableBinding {
                name: name.to_string(),
                ty: Some(TypeRef::Primitive("int".to_string())),
                declaring_type: None,
            });
        }
        let (member, ty) = self.index.find_field(owner, name)?;
        Some(VariableBinding {
            name: member.info.name.clone(),
            ty,
            declaring_type: Some(member.owner),
        })
    }

    fn local_type(&self, unit: &ParsedUnit, local: LocalVar<'_>) -> Option<TypeRef> {
        let type_node = local.type_node?;
        if unit.text(&type_node) == "var" {
            let init = self.expression_type(unit, local.init?).ok()?;
            return if local.iterated {
                self.iterated_element(init)
            } else {
                Some(init)
            };
        }
        self.type_of_type_node(unit, type_node)
            .ok()
            .map(|ty| ty.array_of(local.dims))
    }

    /// Type denoted by a syntactic type node.
    fn type_of_type_node(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<TypeRef> {
        let scope = scope::type_scope(unit, node);
        match node.kind() {
            "type_identifier" | "scoped_type_identifier" => {
                if unit.text(&node) == "var" {
                    return self.inferred_type(unit, node);
                }
                let (path, is_complete) = qualified_type_path(unit, node);
                self.index
                    .resolve_type_path(&scope, &path, is_complete)
                    .ok_or_else(|| ResolveError::unresolved(path.join(".")))
            }
            _ => {
                let raw = RawType::from_node(&node, unit.source.as_bytes()).ok_or_else(|| {
                    ResolveError::faulted(format!("`{}` is not a type", node.kind()))
                })?;
                self.index
                    .resolve_raw(&scope, &raw, true)
                    .ok_or_else(|| ResolveError::unresolved(unit.compact_text(&node)))
            }
        }
    }

    /// Type a `var` declaration infers from its initializer.
    fn inferred_type(&self, unit: &ParsedUnit, var_node: TSNode<'_>) -> Resolution<TypeRef> {
        let unresolved = || ResolveError::unresolved("var");
        let parent = var_node.parent().ok_or_else(unresolved)?;
        match parent.kind() {
            "local_variable_declaration" => {
                let value = find_child_by_kind(&parent, "variable_declarator")
                    .and_then(|declarator| declarator.child_by_field_name("value"))
                    .ok_or_else(unresolved)?;
                self.expression_type(unit, value)
            }
            "enhanced_for_statement" => {
                let value = parent.child_by_field_name("value").ok_or_else(unresolved)?;
                let iterable = self.expression_type(unit, value)?;
                self.iterated_element(iterable).ok_or_else(unresolved)
            }
            _ => Err(unresolved()),
        }
    }

    fn iterated_element(&self, iterable: TypeRef) -> Option<TypeRef> {
        match iterable {
            TypeRef::Array(element) => Some(*element),
            declared => self
                .index
                .hierarchy(&declared)
                .into_iter()
                .find(|ty| ty.declared_name() == Some("java.lang.Iterable"))
                .and_then(|ty| ty.type_args().first().cloned())
                .or_else(|| declared.type_args().first().cloned()),
        }
    }

    fn enclosing_type_ref(&self, unit: &ParsedUnit, enclosing: EnclosingType<'_>) -> Option<TypeRef> {
        match enclosing {
            EnclosingType::Declared(decl) => {
                let fqn = scope::declaration_fqn(unit, decl)?;
                Some(
                    self.index
                        .get(&fqn)
                        .map(TypeInfo::self_type)
                        .unwrap_or_else(|| TypeRef::declared(fqn)),
                )
            }
            EnclosingType::Anonymous(creation) => creation
                .child_by_field_name("type")
                .and_then(|ty| self.type_of_type_node(unit, ty).ok()),
        }
    }
}

impl Resolver for JavaResolver {
    fn resolve_name(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<Binding> {
        match node.kind() {
            "identifier" => self.identifier_binding(unit, node),
            "scoped_identifier" => self.qualified_binding(unit, node),
            "type_identifier" | "scoped_type_identifier" => {
                self.type_of_type_node(unit, node).map(Binding::Type)
            }
            other => Err(ResolveError::faulted(format!("`{other}` is not a name"))),
        }
    }

    fn resolve_type(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<TypeRef> {
        self.type_of_type_node(unit, node)
    }

    fn resolve_expression(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<TypeRef> {
        self.expression_type(unit, node)
    }

    fn resolve_method(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<MethodBinding> {
        if node.kind() != "method_invocation" {
            return Err(ResolveError::faulted(format!(
                "`{}` is not a method invocation",
                node.kind()
            )));
        }
        self.invoked_method(unit, node)
    }

    fn resolve_field(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<VariableBinding> {
        if node.kind() != "field_access" {
            return Err(ResolveError::faulted(format!(
                "`{}` is not a field access",
                node.kind()
            )));
        }
        self.accessed_field(unit, node)
    }
}

/// Segments of the dotted type name ending at `node`, and whether they are
/// the complete name.
fn qualified_type_path(unit: &ParsedUnit, node: TSNode<'_>) -> (Vec<String>, bool) {
    let mut outer = node;
    while let Some(parent) = outer.parent() {
        if parent.kind() != "scoped_type_identifier" {
            break;
        }
        outer = parent;
    }

    let mut segments = Vec::new();
    collect_type_segments(outer, &mut segments);
    if segments.is_empty() {
        return (vec![unit.compact_text(&node)], true);
    }
    let end = segments
        .iter()
        .rposition(|segment| segment.end_byte() <= node.end_byte())
        .unwrap_or(segments.len() - 1);
    let path = segments[..=end]
        .iter()
        .map(|segment| unit.text(segment).trim().to_string())
        .collect::<Vec<_>>();
    let is_complete = end + 1 >= segments.len();
    (path, is_complete)
}

fn collect_type_segments<'t>(node: TSNode<'t>, segments: &mut Vec<TSNode<'t>>) {
    match node.kind() {
        "type_identifier" => segments.push(node),
        "scoped_type_identifier" | "generic_type" => {
            for child in named_children(&node) {
                collect_type_segments(child, segments);
            }
        }
        _ => {}
    }
}

/// Declared type without its type arguments.
fn erase(ty: &TypeRef) -> TypeRef {
    match ty {
        TypeRef::Declared { name, .. } => TypeRef::declared(name.clone()),
        other => other.clone(),
    }
}
