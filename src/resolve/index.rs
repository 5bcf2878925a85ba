use rayon::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::classpath::{scan_classpath_entry, ClasspathEntry};
use super::names::TypeScope;
use crate::core::resolver::TypeRef;
use crate::core::FileScanner;
use crate::parsers::declarations::{RawType, TypeDecl, TypeKind};
use crate::parsers::{FileContext, JavaParser, ParsedUnit};

/// Where a type's declaration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeOrigin {
    Source(PathBuf),
    ClassFile(PathBuf),
    Archive(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub ty: Option<TypeRef>,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub name: String,
    /// `None` entries are parameters whose type did not resolve.
    pub params: Vec<Option<TypeRef>>,
    pub varargs: bool,
    /// `None` for constructors and unresolvable return types.
    pub return_type: Option<TypeRef>,
    pub is_constructor: bool,
    pub is_static: bool,
}

impl MethodInfo {
    /// Whether a call with `argc` arguments can target this method.
    pub fn accepts_arity(&self, argc: usize) -> bool {
        if self.varargs {
            argc + 1 >= self.params.len()
        } else {
            argc == self.params.len()
        }
    }
}

/// Everything the index knows about one type. Types seen only on the
/// classpath carry a name and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub fqn: String,
    pub kind: Option<TypeKind>,
    pub type_params: Vec<String>,
    pub superclass: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub origin: TypeOrigin,
}

impl TypeInfo {
    fn named(fqn: String, origin: TypeOrigin) -> Self {
        Self {
            fqn,
            kind: None,
            type_params: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            origin,
        }
    }

    /// The type as seen from inside its own declaration.
    pub fn self_type(&self) -> TypeRef {
        TypeRef::generic(
            self.fqn.clone(),
            self.type_params
                .iter()
                .map(|param| TypeRef::Variable(param.clone()))
                .collect(),
        )
    }

    /// Map this type's parameters onto `args`. Raw uses map nothing.
    pub fn bind_args<'a>(&'a self, args: &'a [TypeRef]) -> impl Fn(&str) -> Option<TypeRef> + 'a {
        move |name: &str| {
            if args.len() != self.type_params.len() {
                return None;
            }
            self.type_params
                .iter()
                .position(|param| param == name)
                .map(|i| args[i].clone())
        }
    }

    fn supertypes(&self) -> impl Iterator<Item = &TypeRef> {
        self.superclass.iter().chain(self.interfaces.iter())
    }
}

/// A field or method found through the type hierarchy, with type arguments of
/// the owner applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member<'a, T> {
    pub owner: TypeRef,
    pub info: &'a T,
}

/// Immutable index of every type known to a run, built once before analysis.
#[derive(Debug, Default)]
pub struct TypeIndex {
    types: HashMap<String, TypeInfo>,
    packages: HashSet<String>,
}

impl TypeIndex {
    pub fn builder() -> TypeIndexBuilder {
        TypeIndexBuilder::new()
    }

    pub fn get(&self, fqn: &str) -> Option<&TypeInfo> {
        self.types.get(fqn)
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.types.contains_key(fqn)
    }

    /// Whether `name` is a known package or a prefix of one.
    pub fn is_package(&self, name: &str) -> bool {
        self.packages.contains(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// `ty` followed by all of its supertypes, breadth-first, with type
    /// arguments substituted along the way.
    pub fn hierarchy(&self, ty: &TypeRef) -> Vec<TypeRef> {
        let mut ordered = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([ty.clone()]);

        while let Some(current) = queue.pop_front() {
            let Some(name) = current.declared_name() else {
                continue;
            };
            if !seen.insert(name.to_string()) {
                continue;
            }
            if let Some(info) = self.get(name) {
                let bind = info.bind_args(current.type_args());
                for parent in info.supertypes() {
                    queue.push_back(parent.substitute(&bind));
                }
            }
            ordered.push(current);
        }

        ordered
    }

    /// Member type `name` declared in `owner` or inherited by it.
    pub fn member_type(&self, owner: &str, name: &str) -> Option<String> {
        self.hierarchy(&TypeRef::declared(owner))
            .iter()
            .filter_map(TypeRef::declared_name)
            .map(|ancestor| format!("{ancestor}.{name}"))
            .find(|candidate| self.contains(candidate))
    }

    pub fn find_field(&self, ty: &TypeRef, name: &str) -> Option<(Member<'_, FieldInfo>, Option<TypeRef>)> {
        for owner in self.hierarchy(ty) {
            let Some(info) = owner.declared_name().and_then(|fqn| self.get(fqn)) else {
                continue;
            };
            if let Some(field) = info.fields.iter().find(|field| field.name == name) {
                let bind = info.bind_args(owner.type_args());
                let field_ty = field.ty.as_ref().map(|ty| ty.substitute(&bind));
                return Some((
                    Member {
                        owner: TypeRef::declared(info.fqn.clone()),
                        info: field,
                    },
                    field_ty,
                ));
            }
        }
        None
    }

    /// Methods named `name` visible on `ty`, nearest declarations first.
    pub fn find_methods(&self, ty: &TypeRef, name: &str) -> Vec<Member<'_, MethodInfo>> {
        let mut found = Vec::new();
        for owner in self.hierarchy(ty) {
            let Some(info) = owner.declared_name().and_then(|fqn| self.get(fqn)) else {
                continue;
            };
            found.extend(
                info.methods
                    .iter()
                    .filter(|method| method.name == name && !method.is_constructor)
                    .map(|method| Member {
                        owner: owner.clone(),
                        info: method,
                    }),
            );
        }
        found
    }

    fn insert_package(&mut self, package: &str) {
        let mut prefix = String::with_capacity(package.len());
        for segment in package.split('.') {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(segment);
            self.packages.insert(prefix.clone());
        }
    }
}

struct SourceTypes {
    path: PathBuf,
    context: Arc<FileContext>,
    decls: Vec<TypeDecl>,
}

/// Collects declarations, then resolves all member signatures against the
/// complete set of names in [`TypeIndexBuilder::build`].
#[derive(Default)]
pub struct TypeIndexBuilder {
    sources: Vec<SourceTypes>,
    binary: Vec<(String, TypeOrigin)>,
    parser: JavaParser,
}

impl TypeIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unit(&mut self, unit: &ParsedUnit) {
        self.sources.push(SourceTypes {
            path: unit.path.clone(),
            context: Arc::new(unit.context.clone()),
            decls: unit.declarations(),
        });
    }

    /// Parse every `.java` file under `dirs` in parallel. Files that fail to
    /// parse are left out; the analyzer reports them separately.
    pub fn add_source_dirs(&mut self, dirs: &[PathBuf]) -> usize {
        let scanner = FileScanner::new();
        let files: Vec<PathBuf> = dirs
            .iter()
            .flat_map(|dir| match scanner.scan_directory(dir) {
                Ok(scanned) => scanned.files,
                Err(err) => {
                    warn!("cannot index source directory {}: {err:#}", dir.display());
                    Vec::new()
                }
            })
            .collect();
        self.add_source_files(&files)
    }

    pub fn add_source_files(&mut self, files: &[PathBuf]) -> usize {
        let parser = self.parser;
        let parsed: Vec<SourceTypes> = files
            .par_iter()
            .filter_map(|path| match parser.parse_file(path) {
                Ok(unit) => Some(SourceTypes {
                    path: unit.path.clone(),
                    context: Arc::new(unit.context.clone()),
                    decls: unit.declarations(),
                }),
                Err(err) => {
                    debug!("not indexing {}: {err}", path.display());
                    None
                }
            })
            .collect();
        let added = parsed.len();
        self.sources.extend(parsed);
        added
    }

    /// Index the type names contributed by classpath entries. Directories
    /// containing `.java` files are indexed as sources. Unreadable entries are
    /// skipped with a warning.
    pub fn add_classpath(&mut self, entries: &[PathBuf]) {
        for entry in entries {
            match scan_classpath_entry(entry) {
                Ok(ClasspathEntry {
                    class_names,
                    source_files,
                    origin,
                }) => {
                    debug!(
                        "classpath entry {}: {} class(es), {} source file(s)",
                        entry.display(),
                        class_names.len(),
                        source_files.len()
                    );
                    self.binary
                        .extend(class_names.into_iter().map(|name| (name, origin.clone())));
                    self.add_source_files(&source_files);
                }
                Err(err) => warn!("skipping classpath entry {}: {err:#}", entry.display()),
            }
        }
    }

    pub fn add_binary_type(&mut self, fqn: impl Into<String>, origin: TypeOrigin) {
        self.binary.push((fqn.into(), origin));
    }

    pub fn build(self) -> TypeIndex {
        let mut index = TypeIndex::default();

        // Phase 1: every name, so member signatures can refer to any of them.
        for (fqn, origin) in self.binary {
            if let Some((package, _)) = fqn.rsplit_once('.') {
                index.insert_package(package);
            }
            index
                .types
                .entry(fqn.clone())
                .or_insert_with(|| TypeInfo::named(fqn, origin));
        }
        for source in &self.sources {
            if let Some(package) = &source.context.package {
                index.insert_package(package);
            }
            for decl in &source.decls {
                let mut info = TypeInfo::named(decl.fqn.clone(), TypeOrigin::Source(source.path.clone()));
                info.kind = Some(decl.kind);
                info.type_params = decl.type_params.clone();
                index.types.insert(decl.fqn.clone(), info);
            }
        }

        // Phase 2: resolve signatures against the complete name set.
        let resolved: Vec<TypeInfo> = self
            .sources
            .par_iter()
            .flat_map_iter(|source| {
                let index = &index;
                source
                    .decls
                    .iter()
                    .map(move |decl| resolve_decl(index, &source.context, &source.path, decl))
            })
            .collect();
        for info in resolved {
            index.types.insert(info.fqn.clone(), info);
        }

        debug!(
            "type index: {} type(s), {} package prefix(es)",
            index.types.len(),
            index.packages.len()
        );
        index
    }
}

fn resolve_decl(index: &TypeIndex, context: &FileContext, path: &Path, decl: &TypeDecl) -> TypeInfo {
    let scope = TypeScope {
        context,
        enclosing: std::iter::once(decl.fqn.clone())
            .chain(decl.enclosing.iter().cloned())
            .collect(),
        type_params: decl.type_params.clone(),
    };
    let resolve = |raw: &RawType, scope: &TypeScope| index.resolve_raw(scope, raw, true);

    let superclass = decl
        .superclass
        .as_ref()
        .and_then(|raw| resolve(raw, &scope))
        .or_else(|| implicit_superclass(decl));

    let interfaces = decl
        .interfaces
        .iter()
        .filter_map(|raw| resolve(raw, &scope))
        .collect();

    let fields = decl
        .fields
        .iter()
        .map(|field| FieldInfo {
            name: field.name.clone(),
            ty: resolve(&field.ty, &scope),
            is_static: field.is_static,
        })
        .collect();

    let methods = decl
        .methods
        .iter()
        .map(|method| {
            let mut method_scope = scope.clone();
            method_scope.type_params.extend(method.type_params.iter().cloned());
            MethodInfo {
                name: method.name.clone(),
                params: method
                    .params
                    .iter()
                    .map(|raw| resolve(raw, &method_scope))
                    .collect(),
                varargs: method.varargs,
                return_type: method
                    .return_type
                    .as_ref()
                    .and_then(|raw| resolve(raw, &method_scope)),
                is_constructor: method.return_type.is_none(),
                is_static: method.is_static,
            }
        })
        .collect();

    TypeInfo {
        fqn: decl.fqn.clone(),
        kind: Some(decl.kind),
        type_params: decl.type_params.clone(),
        superclass,
        interfaces,
        fields,
        methods,
        origin: TypeOrigin::Source(path.to_path_buf()),
    }
}

fn implicit_superclass(decl: &TypeDecl) -> Option<TypeRef> {
    match decl.kind {
        TypeKind::Class if decl.fqn != "java.lang.Object" => Some(TypeRef::declared("java.lang.Object")),
        TypeKind::Enum => Some(TypeRef::generic(
            "java.lang.Enum",
            vec![TypeRef::declared(decl.fqn.clone())],
        )),
        TypeKind::Record => Some(TypeRef::declared("java.lang.Record")),
        _ => None,
    }
}
