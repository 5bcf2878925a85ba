use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tree_sitter::Node as TSNode;

use crate::parsers::ParsedUnit;

/// Static type as reported by a [`Resolver`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// `int`, `boolean`, `void`, ...
    Primitive(String),
    /// Class, interface, enum, record or annotation type, by qualified name.
    Declared { name: String, args: Vec<TypeRef> },
    Array(Box<TypeRef>),
    /// Type parameter such as `T`.
    Variable(String),
}

pub const PRIMITIVE_TYPES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

impl TypeRef {
    pub fn declared(name: impl Into<String>) -> Self {
        TypeRef::Declared {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef::Declared {
            name: name.into(),
            args,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeRef::Primitive(_))
    }

    /// Qualified name of a declared type, ignoring type arguments.
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            TypeRef::Declared { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn type_args(&self) -> &[TypeRef] {
        match self {
            TypeRef::Declared { args, .. } => args,
            _ => &[],
        }
    }

    /// Element type with all array dimensions removed.
    pub fn element(&self) -> &TypeRef {
        match self {
            TypeRef::Array(inner) => inner.element(),
            other => other,
        }
    }

    pub fn array_of(self, dimensions: usize) -> TypeRef {
        (0..dimensions).fold(self, |ty, _| TypeRef::Array(Box::new(ty)))
    }

    /// Replace type variables using `lookup`; unknown variables stay as-is.
    pub fn substitute(&self, lookup: &dyn Fn(&str) -> Option<TypeRef>) -> TypeRef {
        match self {
            TypeRef::Variable(name) => lookup(name).unwrap_or_else(|| self.clone()),
            TypeRef::Declared { name, args } => TypeRef::Declared {
                name: name.clone(),
                args: args.iter().map(|arg| arg.substitute(lookup)).collect(),
            },
            TypeRef::Array(inner) => TypeRef::Array(Box::new(inner.substitute(lookup))),
            TypeRef::Primitive(_) => self.clone(),
        }
    }

    /// Boxed counterpart of a primitive, used for `int.class` and friends.
    pub fn boxed(&self) -> TypeRef {
        let boxed = match self {
            TypeRef::Primitive(name) => match name.as_str() {
                "boolean" => "java.lang.Boolean",
                "byte" => "java.lang.Byte",
                "char" => "java.lang.Character",
                "short" => "java.lang.Short",
                "int" => "java.lang.Integer",
                "long" => "java.lang.Long",
                "float" => "java.lang.Float",
                "double" => "java.lang.Double",
                _ => "java.lang.Void",
            },
            other => return other.clone(),
        };
        TypeRef::declared(boxed)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(name) | TypeRef::Variable(name) => f.write_str(name),
            TypeRef::Declared { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(",")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeRef::Array(inner) => write!(f, "{inner}[]"),
        }
    }
}

/// A variable, parameter, field or enum constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableBinding {
    pub name: String,
    /// `None` when the declared type could not be determined (e.g. an
    /// implicitly typed lambda parameter).
    pub ty: Option<TypeRef>,
    /// Present for fields and enum constants, absent for locals.
    pub declaring_type: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBinding {
    pub name: String,
    pub declaring_type: TypeRef,
    pub parameters: Vec<TypeRef>,
    /// `None` for constructors.
    pub return_type: Option<TypeRef>,
}

/// What a name refers to. Exactly one binding per node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Type(TypeRef),
    Variable(VariableBinding),
    Method(MethodBinding),
    Package(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The symbol or type could not be determined. Routine.
    #[error("could not resolve `{symbol}`")]
    Unresolved { symbol: String },

    /// The node was not shaped the way its kind promises.
    #[error("resolution fault: {reason}")]
    Faulted { reason: String },
}

impl ResolveError {
    pub fn unresolved(symbol: impl Into<String>) -> Self {
        ResolveError::Unresolved {
            symbol: symbol.into(),
        }
    }

    pub fn faulted(reason: impl Into<String>) -> Self {
        ResolveError::Faulted {
            reason: reason.into(),
        }
    }
}

pub type Resolution<T> = Result<T, ResolveError>;

/// Deepest expression nesting a resolver follows before giving up on a node.
pub const MAX_EXPRESSION_DEPTH: usize = 128;

/// Per-unit cache of expression types keyed by node id, plus the nesting
/// depth of the resolution in progress.
///
/// Lives on the [`ParsedUnit`] so a resolver shared across threads can reuse
/// work done for earlier nodes of the same file.
#[derive(Debug, Default)]
pub struct ExpressionMemo {
    types: RefCell<HashMap<usize, Resolution<TypeRef>>>,
    depth: Cell<usize>,
}

impl ExpressionMemo {
    pub fn get(&self, node_id: usize) -> Option<Resolution<TypeRef>> {
        self.types.borrow().get(&node_id).cloned()
    }

    pub fn contains(&self, node_id: usize) -> bool {
        self.types.borrow().contains_key(&node_id)
    }

    pub fn insert(&self, node_id: usize, result: &Resolution<TypeRef>) {
        self.types.borrow_mut().insert(node_id, result.clone());
    }

    pub fn len(&self) -> usize {
        self.types.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.borrow().is_empty()
    }

    /// Enter one nesting level, or fault once [`MAX_EXPRESSION_DEPTH`] is
    /// reached. The level is left when the guard drops, unwinding included.
    pub fn enter(&self) -> Resolution<DepthGuard<'_>> {
        let depth = self.depth.get();
        if depth >= MAX_EXPRESSION_DEPTH {
            return Err(ResolveError::faulted(format!(
                "expression nested deeper than {MAX_EXPRESSION_DEPTH} levels"
            )));
        }
        self.depth.set(depth + 1);
        Ok(DepthGuard { depth: &self.depth })
    }

    pub fn depth(&self) -> usize {
        self.depth.get()
    }
}

pub struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// Name and type resolution capability the extraction strategies run against.
///
/// Implementations are shared across worker threads; each call only reads
/// the unit it is given, apart from the unit's [`ExpressionMemo`].
pub trait Resolver: Send + Sync {
    /// Binding of an `identifier`, `scoped_identifier` or `scoped_type_identifier`.
    fn resolve_name(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<Binding>;

    /// Type denoted by a type node.
    fn resolve_type(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<TypeRef>;

    /// Static type of an expression node.
    fn resolve_expression(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<TypeRef>;

    /// Target of a `method_invocation`.
    fn resolve_method(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<MethodBinding>;

    /// Field selected by a `field_access`.
    fn resolve_field(&self, unit: &ParsedUnit, node: TSNode<'_>) -> Resolution<VariableBinding>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_guard_faults_at_the_limit_and_unwinds() {
        let memo = ExpressionMemo::default();
        let mut guards = Vec::new();
        for _ in 0..MAX_EXPRESSION_DEPTH {
            guards.push(memo.enter().unwrap());
        }
        assert_eq!(memo.depth(), MAX_EXPRESSION_DEPTH);
        assert!(matches!(memo.enter(), Err(ResolveError::Faulted { .. })));

        guards.truncate(10);
        assert_eq!(memo.depth(), 10);
        drop(guards);
        assert_eq!(memo.depth(), 0);
        assert!(memo.enter().is_ok());
    }

    #[test]
    fn memo_keeps_failures_as_well_as_types() {
        let memo = ExpressionMemo::default();
        memo.insert(1, &Ok(TypeRef::declared("pkg.A")));
        memo.insert(2, &Err(ResolveError::unresolved("x")));

        assert_eq!(memo.get(1), Some(Ok(TypeRef::declared("pkg.A"))));
        assert_eq!(memo.get(2), Some(Err(ResolveError::unresolved("x"))));
        assert!(!memo.contains(3));
        assert_eq!(memo.len(), 2);
    }
}
