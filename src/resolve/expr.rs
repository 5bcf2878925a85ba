//! Static typing of expressions, member access and overload selection.

use tree_sitter::Node as TSNode;

use super::index::{Member, MethodInfo};
use super::scope::{self, EnclosingType};
use super::{erase, JavaResolver, Target};
use crate::core::resolver::{
    Binding, MethodBinding, Resolution, ResolveError, TypeRef, VariableBinding,
};
use crate::parsers::common::named_children;
use crate::parsers::ParsedUnit;

const STRING: &str = "java.lang.String";

impl JavaResolver {
    /// Static type of `node`, memoized per unit.
    ///
    /// Receiver chains and left-deep operator chains are typed innermost
    /// first, so each step finds its operand already in the memo and the
    /// recursion stays shallow however long the chain is.
    pub(super) fn expression_type(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<TypeRef> {
        if let Some(known) = unit.memo.get(node.id()) {
            return known;
        }

        let mut pending = Vec::new();
        let mut operand = chain_operand(node);
        while let Some(inner) = operand {
            if unit.memo.contains(inner.id()) {
                break;
            }
            pending.push(inner);
            operand = chain_operand(inner);
        }
        for inner in pending.into_iter().rev() {
            let _ = self.memoized_type(unit, inner);
        }

        self.memoized_type(unit, node)
    }

    fn memoized_type(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<TypeRef> {
        let _level = unit.memo.enter()?;
        let ty = self.type_of_expression(unit, node);
        unit.memo.insert(node.id(), &ty);
        ty
    }

    fn type_of_expression(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<TypeRef> {
        let unresolved = || ResolveError::unresolved(unit.compact_text(&node));
        match node.kind() {
            "identifier" | "scoped_identifier" | "field_access" => {
                if node.kind() == "field_access" {
                    let is_qualified_this = node
                        .child_by_field_name("field")
                        .map_or(false, |field| field.kind() == "this");
                    if is_qualified_this {
                        let object = node.child_by_field_name("object").ok_or_else(unresolved)?;
                        return match self.target_of(unit, object)? {
                            Target::Type(ty) => Ok(ty),
                            _ => Err(unresolved()),
                        };
                    }
                }
                match self.target_of(unit, node)? {
                    Target::Variable(variable) => variable.ty.ok_or_else(unresolved),
                    Target::Value(ty) => Ok(ty),
                    Target::Type(_) | Target::Package(_) => Err(unresolved()),
                }
            }
            "this" => self.this_type(unit, node),
            "super" => self.super_type(unit, node),
            "method_invocation" => self
                .invoked_method(unit, node)?
                .return_type
                .ok_or_else(unresolved),
            "object_creation_expression" => {
                let ty = node
                    .child_by_field_name("type")
                    .ok_or_else(|| ResolveError::faulted("object creation without a type"))?;
                self.type_of_type_node(unit, ty)
            }
            "array_creation_expression" => {
                let ty = node
                    .child_by_field_name("type")
                    .ok_or_else(|| ResolveError::faulted("array creation without a type"))?;
                let dims = named_children(&node)
                    .iter()
                    .map(|child| match child.kind() {
                        "dimensions_expr" => 1,
                        "dimensions" => unit.text(child).matches('[').count(),
                        _ => 0,
                    })
                    .sum::<usize>()
                    .max(1);
                Ok(self.type_of_type_node(unit, ty)?.array_of(dims))
            }
            "cast_expression" => {
                let ty = node
                    .child_by_field_name("type")
                    .ok_or_else(|| ResolveError::faulted("cast without a type"))?;
                self.type_of_type_node(unit, ty)
            }
            "parenthesized_expression" => {
                let inner = named_children(&node)
                    .into_iter()
                    .find(|child| !is_comment(child))
                    .ok_or_else(unresolved)?;
                self.expression_type(unit, inner)
            }
            "array_access" => {
                let array = node.child_by_field_name("array").ok_or_else(unresolved)?;
                match self.expression_type(unit, array)? {
                    TypeRef::Array(element) => Ok(*element),
                    _ => Err(unresolved()),
                }
            }
            "ternary_expression" => ["consequence", "alternative"]
                .iter()
                .filter_map(|field| node.child_by_field_name(field))
                .find_map(|branch| self.expression_type(unit, branch).ok())
                .ok_or_else(unresolved),
            "assignment_expression" => {
                let left = node.child_by_field_name("left").ok_or_else(unresolved)?;
                self.expression_type(unit, left)
            }
            "string_literal" | "text_block" => Ok(TypeRef::declared(STRING)),
            "character_literal" => Ok(primitive("char")),
            "true" | "false" | "instanceof_expression" => Ok(primitive("boolean")),
            "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal" => {
                if unit.text(&node).ends_with(|c: char| c == 'l' || c == 'L') {
                    Ok(primitive("long"))
                } else {
                    Ok(primitive("int"))
                }
            }
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                if unit.text(&node).ends_with(|c: char| c == 'f' || c == 'F') {
                    Ok(primitive("float"))
                } else {
                    Ok(primitive("double"))
                }
            }
            "binary_expression" => self.binary_type(unit, node),
            "unary_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|op| unit.text(&op).to_string());
                if operator.as_deref() == Some("!") {
                    return Ok(primitive("boolean"));
                }
                let operand = node.child_by_field_name("operand").ok_or_else(unresolved)?;
                self.expression_type(unit, operand)
            }
            "update_expression" => {
                let operand = named_children(&node)
                    .into_iter()
                    .next()
                    .ok_or_else(unresolved)?;
                self.expression_type(unit, operand)
            }
            "class_literal" => {
                let ty = named_children(&node)
                    .into_iter()
                    .next()
                    .ok_or_else(|| ResolveError::faulted("class literal without a type"))?;
                let ty = self.type_of_type_node(unit, ty)?;
                Ok(TypeRef::generic("java.lang.Class", vec![ty.boxed()]))
            }
            _ => Err(unresolved()),
        }
    }

    fn binary_type(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<TypeRef> {
        let unresolved = || ResolveError::unresolved(unit.compact_text(&node));
        let operator = node
            .child_by_field_name("operator")
            .map(|op| unit.text(&op).to_string())
            .unwrap_or_default();
        match operator.as_str() {
            "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" => return Ok(primitive("boolean")),
            _ => {}
        }

        let left = node
            .child_by_field_name("left")
            .and_then(|left| self.expression_type(unit, left).ok());
        let right = node
            .child_by_field_name("right")
            .and_then(|right| self.expression_type(unit, right).ok());
        let is_string = |ty: &Option<TypeRef>| {
            ty.as_ref().and_then(TypeRef::declared_name) == Some(STRING)
        };
        if operator == "+" && (is_string(&left) || is_string(&right)) {
            return Ok(TypeRef::declared(STRING));
        }
        left.or(right).ok_or_else(unresolved)
    }

    /// What a qualifier denotes, for names, field accesses and arbitrary
    /// expressions.
    pub(super) fn target_of(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<Target> {
        let _level = unit.memo.enter()?;
        match node.kind() {
            "identifier" => match self.simple_name_binding(unit, node)? {
                Binding::Variable(variable) => Ok(Target::Variable(variable)),
                Binding::Type(ty) => Ok(Target::Type(ty)),
                Binding::Package(package) => Ok(Target::Package(package)),
                Binding::Method(method) => Err(ResolveError::faulted(format!(
                    "name `{}` bound to a method",
                    method.name
                ))),
            },
            "field_access" | "scoped_identifier" => {
                let (qualifier_field, member_field) = if node.kind() == "field_access" {
                    ("object", "field")
                } else {
                    ("scope", "name")
                };
                let qualifier = node
                    .child_by_field_name(qualifier_field)
                    .ok_or_else(|| ResolveError::faulted("member access without a qualifier"))?;
                let member = node
                    .child_by_field_name(member_field)
                    .ok_or_else(|| ResolveError::faulted("member access without a member"))?;
                if member.kind() == "this" {
                    return Ok(Target::Value(self.expression_type(unit, node)?));
                }
                let qualifier = match unit.memo.get(qualifier.id()) {
                    Some(Ok(ty)) => Target::Value(ty),
                    _ => self.target_of(unit, qualifier)?,
                };
                self.member_of(qualifier, unit.text(&member))
            }
            _ => Ok(Target::Value(self.expression_type(unit, node)?)),
        }
    }

    fn member_of(&self, qualifier: Target, name: &str) -> Resolution<Target> {
        match qualifier {
            Target::Package(package) => {
                let qualified = format!("{package}.{name}");
                if self.index.contains(&qualified) {
                    Ok(Target::Type(TypeRef::declared(qualified)))
                } else if self.index.is_package(&qualified) {
                    Ok(Target::Package(qualified))
                } else {
                    Err(ResolveError::unresolved(qualified))
                }
            }
            Target::Type(ty) => {
                if let Some(field) = self.field_of_type(&ty, name) {
                    return Ok(Target::Variable(field));
                }
                ty.declared_name()
                    .and_then(|fqn| self.index.member_type(fqn, name))
                    .map(|nested| Target::Type(TypeRef::declared(nested)))
                    .ok_or_else(|| ResolveError::unresolved(format!("{ty}.{name}")))
            }
            Target::Variable(VariableBinding { ty: Some(ty), .. }) | Target::Value(ty) => self
                .field_of_type(&ty, name)
                .map(Target::Variable)
                .ok_or_else(|| ResolveError::unresolved(format!("{ty}.{name}"))),
            Target::Variable(variable) => Err(ResolveError::unresolved(format!(
                "{}.{name}",
                variable.name
            ))),
        }
    }

    pub(super) fn accessed_field(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<VariableBinding> {
        match self.target_of(unit, node)? {
            Target::Variable(field) => Ok(field),
            _ => Err(ResolveError::unresolved(unit.compact_text(&node))),
        }
    }

    pub(super) fn invoked_method(&self, unit: &ParsedUnit, call: TSNode<'_>) -> Resolution<MethodBinding> {
        let name_node = call
            .child_by_field_name("name")
            .ok_or_else(|| ResolveError::faulted("method invocation without a name"))?;
        let name = unit.text(&name_node);
        let args = self.argument_types(unit, call);

        if let Some(object) = call.child_by_field_name("object") {
            let receiver = match self.target_of(unit, object)? {
                Target::Variable(variable) => variable
                    .ty
                    .ok_or_else(|| ResolveError::unresolved(variable.name))?,
                Target::Value(ty) | Target::Type(ty) => ty,
                Target::Package(package) => {
                    return Err(ResolveError::unresolved(format!("{package}.{name}")))
                }
            };
            return self
                .select_method(&receiver, name, &args)
                .ok_or_else(|| ResolveError::unresolved(format!("{receiver}.{name}")));
        }

        for enclosing in scope::enclosing_types(call) {
            let Some(owner) = self.enclosing_type_ref(unit, enclosing) else {
                continue;
            };
            if let Some(method) = self.select_method(&owner, name, &args) {
                return Ok(method);
            }
        }

        unit.context
            .static_imports
            .iter()
            .filter(|import| import.member.as_deref().map_or(true, |member| member == name))
            .find_map(|import| {
                self.select_method(&TypeRef::declared(import.owner.clone()), name, &args)
            })
            .ok_or_else(|| ResolveError::unresolved(name))
    }

    /// `Type::method` or `expr::method`; the first method with that name.
    pub(super) fn referenced_method(
        &self,
        unit: &ParsedUnit,
        reference: TSNode<'_>,
        name: &str,
    ) -> Resolution<MethodBinding> {
        let qualifier = named_children(&reference)
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::faulted("method reference without a qualifier"))?;
        let owner = match qualifier.kind() {
            "type_identifier" | "scoped_type_identifier" | "generic_type" | "array_type" => {
                self.type_of_type_node(unit, qualifier)?
            }
            _ => match self.target_of(unit, qualifier)? {
                Target::Variable(variable) => variable
                    .ty
                    .ok_or_else(|| ResolveError::unresolved(variable.name))?,
                Target::Value(ty) | Target::Type(ty) => ty,
                Target::Package(package) => return Err(ResolveError::unresolved(package)),
            },
        };
        self.index
            .find_methods(&owner, name)
            .first()
            .map(|method| self.method_binding(method))
            .ok_or_else(|| ResolveError::unresolved(format!("{owner}::{name}")))
    }

    fn argument_types(&self, unit: &ParsedUnit, call: TSNode<'_>) -> Vec<Option<TypeRef>> {
        call.child_by_field_name("arguments")
            .map(|args| {
                named_children(&args)
                    .into_iter()
                    .filter(|arg| !is_comment(arg))
                    .map(|arg| self.expression_type(unit, arg).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Most specific applicable method named `name` on `receiver`. Unknown
    /// argument types match any parameter.
    fn select_method(&self, receiver: &TypeRef, name: &str, args: &[Option<TypeRef>]) -> Option<MethodBinding> {
        let mut best: Option<(usize, Member<'_, MethodInfo>)> = None;
        for candidate in self.index.find_methods(receiver, name) {
            if !candidate.info.accepts_arity(args.len()) {
                continue;
            }
            let Some(score) = self.applicability(candidate.info, args) else {
                continue;
            };
            if best.as_ref().map_or(true, |(top, _)| score > *top) {
                best = Some((score, candidate));
            }
        }
        best.map(|(_, method)| self.method_binding(&method))
    }

    fn applicability(&self, method: &MethodInfo, args: &[Option<TypeRef>]) -> Option<usize> {
        let mut score = 0;
        for (i, arg) in args.iter().enumerate() {
            let param = if method.varargs && i + 1 >= method.params.len() {
                let last = method.params.last().and_then(Option::as_ref);
                match (last, arg) {
                    (Some(array @ TypeRef::Array(_)), Some(TypeRef::Array(_))) if args.len() == method.params.len() => {
                        Some(array.clone())
                    }
                    (Some(TypeRef::Array(element)), _) => Some((**element).clone()),
                    (other, _) => other.cloned(),
                }
            } else {
                method.params.get(i).cloned().flatten()
            };
            let (Some(arg), Some(param)) = (arg, param) else {
                continue;
            };
            score += self.conversion_score(arg, &param)?;
        }
        Some(score)
    }

    /// 2 for an exact match, 1 for an assignment conversion, `None` when the
    /// argument cannot be passed.
    fn conversion_score(&self, arg: &TypeRef, param: &TypeRef) -> Option<usize> {
        match (arg, param) {
            (_, TypeRef::Variable(_)) | (TypeRef::Variable(_), _) => Some(0),
            (TypeRef::Primitive(a), TypeRef::Primitive(p)) => Some(if a == p { 2 } else { 1 }),
            (TypeRef::Primitive(_), TypeRef::Declared { .. }) | (TypeRef::Declared { .. }, TypeRef::Primitive(_)) => {
                Some(1)
            }
            (TypeRef::Array(a), TypeRef::Array(p)) => self.conversion_score(a, p),
            (TypeRef::Array(_), TypeRef::Declared { name, .. }) => {
                (name == "java.lang.Object").then_some(1)
            }
            (TypeRef::Declared { name: a, .. }, TypeRef::Declared { name: p, .. }) => {
                if a == p {
                    return Some(2);
                }
                if p == "java.lang.Object" || !self.index.contains(a) {
                    return Some(1);
                }
                self.index
                    .hierarchy(arg)
                    .iter()
                    .any(|ancestor| ancestor.declared_name() == Some(p.as_str()))
                    .then_some(1)
            }
            _ => None,
        }
    }

    /// Binding with the owner's type arguments applied to the signature.
    pub(super) fn method_binding(&self, method: &Member<'_, MethodInfo>) -> MethodBinding {
        let info = method.owner.declared_name().and_then(|fqn| self.index.get(fqn));
        let substitute = |ty: &TypeRef| match info {
            Some(info) => ty.substitute(&info.bind_args(method.owner.type_args())),
            None => ty.clone(),
        };
        MethodBinding {
            name: method.info.name.clone(),
            declaring_type: erase(&method.owner),
            parameters: method.info.params.iter().flatten().map(&substitute).collect(),
            return_type: method.info.return_type.as_ref().map(substitute),
        }
    }

    fn this_type(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<TypeRef> {
        scope::enclosing_types(node)
            .into_iter()
            .next()
            .and_then(|enclosing| self.enclosing_type_ref(unit, enclosing))
            .ok_or_else(|| ResolveError::unresolved("this"))
    }

    fn super_type(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<TypeRef> {
        let unresolved = || ResolveError::unresolved("super");
        match scope::enclosing_types(node).into_iter().next() {
            Some(EnclosingType::Declared(decl)) => {
                let fqn = scope::declaration_fqn(unit, decl).ok_or_else(unresolved)?;
                if let Some(superclass) = self.index.get(&fqn).and_then(|info| info.superclass.clone()) {
                    return Ok(superclass);
                }
                let clause = decl.child_by_field_name("superclass").ok_or_else(unresolved)?;
                let ty = named_children(&clause)
                    .into_iter()
                    .next()
                    .ok_or_else(unresolved)?;
                self.type_of_type_node(unit, ty)
            }
            Some(anonymous @ EnclosingType::Anonymous(_)) => {
                self.enclosing_type_ref(unit, anonymous).ok_or_else(unresolved)
            }
            None => Err(unresolved()),
        }
    }
}

/// Operand a chain of this kind nests through: the receiver of a call or
/// field access, the array of an element access, the left operand of a
/// binary operator.
fn chain_operand(node: TSNode<'_>) -> Option<TSNode<'_>> {
    let field = match node.kind() {
        "method_invocation" | "field_access" => "object",
        "array_access" => "array",
        "binary_expression" => "left",
        _ => return None,
    };
    node.child_by_field_name(field)
}

fn primitive(name: &str) -> TypeRef {
    TypeRef::Primitive(name.to_string())
}

fn is_comment(node: &TSNode) -> bool {
    matches!(node.kind(), "line_comment" | "block_comment" | "comment")
}
