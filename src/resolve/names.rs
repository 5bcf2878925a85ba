//! Type-name resolution: simple and dotted names to qualified types, in the
//! order Java scoping rules look them up.

use super::index::TypeIndex;
use crate::core::resolver::TypeRef;
use crate::parsers::declarations::RawType;
use crate::parsers::FileContext;

/// Names visible at a point in a compilation unit.
#[derive(Debug, Clone)]
pub struct TypeScope<'a> {
    pub context: &'a FileContext,
    /// Qualified names of the enclosing named types, innermost first.
    pub enclosing: Vec<String>,
    /// Type parameters in scope, from enclosing types and methods.
    pub type_params: Vec<String>,
}

impl<'a> TypeScope<'a> {
    pub fn new(context: &'a FileContext) -> Self {
        Self {
            context,
            enclosing: Vec::new(),
            type_params: Vec::new(),
        }
    }
}

impl TypeIndex {
    /// `trust_qualified` accepts a dotted name nobody declared as a fully
    /// qualified type. Only type positions should ask for that.
    pub fn resolve_raw(&self, scope: &TypeScope, raw: &RawType, trust_qualified: bool) -> Option<TypeRef> {
        match raw {
            RawType::Primitive(name) => Some(TypeRef::Primitive(name.clone())),
            RawType::Named { path, args } => {
                let base = self.resolve_type_path(scope, path, trust_qualified)?;
                if args.is_empty() {
                    return Some(base);
                }
                let args: Option<Vec<TypeRef>> = args
                    .iter()
                    .map(|arg| self.resolve_raw(scope, arg, trust_qualified))
                    .collect();
                match base {
                    TypeRef::Declared { name, .. } => Some(TypeRef::generic(name, args.unwrap_or_default())),
                    other => Some(other),
                }
            }
            RawType::Array(inner) => self
                .resolve_raw(scope, inner, trust_qualified)
                .map(|ty| ty.array_of(1)),
            RawType::Inferred => None,
        }
    }

    pub fn resolve_type_path(&self, scope: &TypeScope, path: &[String], trust_qualified: bool) -> Option<TypeRef> {
        let (first, rest) = path.split_first()?;
        if rest.is_empty() {
            return self.resolve_simple_type(scope, first);
        }

        if let Some(TypeRef::Declared { name, .. }) = self.resolve_simple_type(scope, first) {
            return Some(TypeRef::declared(self.descend(name, rest)));
        }

        // Package-qualified: the longest indexed prefix is the outermost type.
        for split in (1..path.len()).rev() {
            let candidate = path[..split].join(".");
            if self.contains(&candidate) {
                return Some(TypeRef::declared(self.descend(candidate, &path[split..])));
            }
        }
        let full = path.join(".");
        if self.contains(&full) || trust_qualified {
            return Some(TypeRef::declared(full));
        }
        None
    }

    /// Nested type lookup; segments the index does not know are appended as
    /// written.
    fn descend(&self, outer: String, segments: &[String]) -> String {
        segments.iter().fold(outer, |current, segment| {
            self.member_type(&current, segment)
                .unwrap_or_else(|| format!("{current}.{segment}"))
        })
    }

    pub fn resolve_simple_type(&self, scope: &TypeScope, name: &str) -> Option<TypeRef> {
        if scope.type_params.iter().any(|param| param == name) {
            return Some(TypeRef::Variable(name.to_string()));
        }

        for outer in &scope.enclosing {
            if simple_name_of(outer) == name {
                return Some(TypeRef::declared(outer.clone()));
            }
            if let Some(member) = self.member_type(outer, name) {
                return Some(TypeRef::declared(member));
            }
        }

        if let Some(imported) = scope.context.single_imports.get(name) {
            return Some(TypeRef::declared(imported.clone()));
        }

        let same_package = scope.context.qualify(name);
        if self.contains(&same_package) {
            return Some(TypeRef::declared(same_package));
        }

        for prefix in &scope.context.on_demand_imports {
            let candidate = format!("{prefix}.{name}");
            if self.contains(&candidate) {
                return Some(TypeRef::declared(candidate));
            }
            // `import pkg.Outer.*;` exposes member types of `Outer`.
            if let Some(member) = self.member_type(prefix, name) {
                return Some(TypeRef::declared(member));
            }
        }

        let implicit = format!("java.lang.{name}");
        if self.contains(&implicit) {
            return Some(TypeRef::declared(implicit));
        }

        None
    }
}

pub fn simple_name_of(fqn: &str) -> &str {
    fqn.rsplit('.').next().unwrap_or(fqn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::index::TypeOrigin;
    use std::path::PathBuf;

    fn index_of(names: &[&str]) -> TypeIndex {
        let mut builder = TypeIndex::builder();
        for name in names {
            builder.add_binary_type(*name, TypeOrigin::Archive(PathBuf::from("test.jar")));
        }
        builder.build()
    }

    #[test]
    fn single_import_beats_same_package() {
        let index = index_of(&["app.List", "java.util.List"]);
        let mut context = FileContext {
            package: Some("app".to_string()),
            ..FileContext::default()
        };
        context
            .single_imports
            .insert("List".to_string(), "java.util.List".to_string());
        let scope = TypeScope::new(&context);

        assert_eq!(
            index.resolve_simple_type(&scope, "List"),
            Some(TypeRef::declared("java.util.List"))
        );
    }

    #[test]
    fn implicit_java_lang_needs_an_indexed_type() {
        let context = FileContext::default();
        let scope = TypeScope::new(&context);

        assert_eq!(index_of(&[]).resolve_simple_type(&scope, "String"), None);
        assert_eq!(
            index_of(&["java.lang.String"]).resolve_simple_type(&scope, "String"),
            Some(TypeRef::declared("java.lang.String"))
        );
    }

    #[test]
    fn qualified_paths_descend_into_member_types() {
        let index = index_of(&["java.util.Map", "java.util.Map.Entry"]);
        let context = FileContext::default();
        let scope = TypeScope::new(&context);
        let path: Vec<String> = ["java", "util", "Map", "Entry"].iter().map(|s| s.to_string()).collect();

        assert_eq!(
            index.resolve_type_path(&scope, &path, false),
            Some(TypeRef::declared("java.util.Map.Entry"))
        );
        let unknown: Vec<String> = ["org", "x", "Y"].iter().map(|s| s.to_string()).collect();
        assert_eq!(index.resolve_type_path(&scope, &unknown, false), None);
        assert_eq!(
            index.resolve_type_path(&scope, &unknown, true),
            Some(TypeRef::declared("org.x.Y"))
        );
    }

    #[test]
    fn type_parameters_shadow_types() {
        let index = index_of(&["app.T"]);
        let context = FileContext {
            package: Some("app".to_string()),
            ..FileContext::default()
        };
        let mut scope = TypeScope::new(&context);
        scope.type_params.push("T".to_string());

        assert_eq!(
            index.resolve_simple_type(&scope, "T"),
            Some(TypeRef::Variable("T".to_string()))
        );
    }
}
