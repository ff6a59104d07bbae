//! Validation context and codegen hints (spec §3.3). Grounded in the
//! teacher's `compiler/types.rs` `SymbolTable`/`Symbol` idea, reshaped
//! around this spec's closed AST instead of the teacher's open
//! `NodeData` tree.

use std::collections::HashMap;

use crate::ast::{ClassDecl, EnumDecl, FunctionDecl, NodeId, TypeAliasDecl, TypeAnnotation};
use crate::diagnostics::{ErrorKind, ValidationError};
use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignState {
    Unassigned,
    Maybe,
    Assigned,
}

impl AssignState {
    /// Branch-join per spec §4.2: assigned iff assigned on every path.
    pub fn join(a: &AssignState, b: &AssignState) -> AssignState {
        use AssignState::*;
        match (a, b) {
            (Assigned, Assigned) => Assigned,
            (Unassigned, Unassigned) => Unassigned,
            _ => Maybe,
        }
    }
}

/// One lexical scope's variable-visibility band, pushed/popped as the
/// statement validator walks blocks (spec §4.2, §3.3 "scope tracker").
#[derive(Debug, Default)]
pub struct Scope {
    pub vars: HashMap<String, AssignState>,
    pub types: HashMap<String, Type>,
    /// Per-name union narrowing in effect for this lexical band (spec
    /// §4.3), pushed/popped alongside `vars`/`types` so a narrowing
    /// guard's scope un-shadows automatically when its branch scope
    /// pops back off the stack.
    pub narrowed: HashMap<String, Vec<Type>>,
}

#[derive(Debug, Default)]
pub struct ScopeTracker {
    stack: Vec<Scope>,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self { stack: vec![Scope::default()] }
    }

    pub fn push(&mut self) {
        self.stack.push(Scope::default());
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    pub fn declare(&mut self, name: &str, state: AssignState) {
        self.stack
            .last_mut()
            .expect("scope stack never empty")
            .vars
            .insert(name.to_string(), state);
    }

    pub fn declare_typed(&mut self, name: &str, ty: Type, state: AssignState) {
        let scope = self.stack.last_mut().expect("scope stack never empty");
        scope.vars.insert(name.to_string(), state);
        scope.types.insert(name.to_string(), ty);
    }

    pub fn lookup(&self, name: &str) -> Option<&AssignState> {
        self.stack.iter().rev().find_map(|s| s.vars.get(name))
    }

    pub fn lookup_type(&self, name: &str) -> Option<&Type> {
        self.stack.iter().rev().find_map(|s| s.types.get(name))
    }

    pub fn set(&mut self, name: &str, state: AssignState) {
        for scope in self.stack.iter_mut().rev() {
            if scope.vars.contains_key(name) {
                scope.vars.insert(name.to_string(), state);
                return;
            }
        }
    }

    /// Narrow `name` to `members` for the current (innermost) scope
    /// band only (spec §4.3): a branch pushes its own scope before
    /// narrowing, so popping it un-narrows automatically.
    pub fn narrow(&mut self, name: &str, members: Vec<Type>) {
        self.stack
            .last_mut()
            .expect("scope stack never empty")
            .narrowed
            .insert(name.to_string(), members);
    }

    pub fn lookup_narrowed(&self, name: &str) -> Option<&Vec<Type>> {
        self.stack.iter().rev().find_map(|s| s.narrowed.get(name))
    }
}

/// Resolved target of a call (spec §4.2 "call dispatch").
#[derive(Debug, Clone, PartialEq)]
pub enum CalleeKind {
    Function(String),
    Method { class_name: String, method_name: String },
    Constructor(String),
    Builtin(String),
}

/// Recorded once per call-expression node so the backend need not
/// recompute overload resolution or reorder planning (spec §4.2,
/// §4.5 "named-argument lowering").
#[derive(Debug, Clone, PartialEq)]
pub struct CallDispatchRecord {
    pub callee: CalleeKind,
    /// Final positional order, length equal to the callee's param count.
    pub argument_order: Vec<usize>,
    /// True when any reordered argument expression is not
    /// side-effect-free, forcing a temporary-binding lowering.
    pub needs_temporaries: bool,
}

/// One discriminant-narrowing or `is`/nullability-narrowing outcome,
/// keyed by the AST node identity of the guarded expression (spec
/// §4.3 "narrowing records are per-AST-node").
#[derive(Debug, Clone, PartialEq)]
pub struct NarrowingRecord {
    /// The union members still possible after the guard succeeds.
    /// A single-element vector is a "flat" narrowing (direct access);
    /// more than one remains a visitor access.
    pub narrowed_members: Vec<Type>,
}

impl NarrowingRecord {
    pub fn is_flat(&self) -> bool {
        self.narrowed_members.len() == 1
    }
}

/// Which union member an ambiguous object literal was disambiguated
/// to resolve as (spec §4.3 "object-literal disambiguation").
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInstantiationRecord {
    pub selected_class: String,
}

#[derive(Debug, Default)]
pub struct CodegenHints {
    pub json_print_types: std::collections::HashSet<String>,
    pub json_from_types: std::collections::HashSet<String>,
    pub call_dispatch: HashMap<NodeId, CallDispatchRecord>,
    pub narrowing: HashMap<NodeId, NarrowingRecord>,
    pub object_instantiation: HashMap<NodeId, ObjectInstantiationRecord>,
    pub extern_dependencies: std::collections::HashSet<String>,
    /// Every expression's inferred type, keyed by node identity, so
    /// backends (particularly the VM's per-numeric-type opcode
    /// selection, spec §4.7) never re-run inference.
    pub inferred_types: HashMap<NodeId, Type>,
}

/// Everything known about one class: fields, discriminant, methods —
/// enough for the validator and both backends to resolve member
/// accesses and constructor calls without re-walking the AST.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub decl: ClassDecl,
    /// Field name -> resolved type, pre-computed at registration time.
    pub field_types: HashMap<String, Type>,
    /// Name of the field declared `const name = literal`, if any.
    pub discriminant_field: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub decl: FunctionDecl,
    pub param_types: Vec<Type>,
    pub return_type: Type,
}

#[derive(Debug, Clone)]
pub struct EnumInfo {
    pub decl: EnumDecl,
}

#[derive(Debug, Clone)]
pub struct TypeAliasInfo {
    pub decl: TypeAliasDecl,
    pub resolved: Type,
}

#[derive(Debug, Clone)]
pub struct ImportedSymbol {
    pub module_path: String,
    pub imported_name: String,
}

/// Per-file validation context (spec §3.3).
#[derive(Debug, Default)]
pub struct ValidationContext {
    pub filename: String,
    pub classes: HashMap<String, ClassInfo>,
    pub enums: HashMap<String, EnumInfo>,
    pub functions: HashMap<String, FunctionInfo>,
    pub type_aliases: HashMap<String, TypeAliasInfo>,
    pub imported_symbols: HashMap<String, ImportedSymbol>,
    pub errors: Vec<ValidationError>,
    pub global_symbols: HashMap<String, String>,
    pub hints: CodegenHints,
    pub scopes: ScopeTracker,
    pub allow_top_level_statements: bool,
}

impl ValidationContext {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            scopes: ScopeTracker::new(),
            ..Default::default()
        }
    }

    pub fn error(&mut self, err: ValidationError) {
        self.errors.push(err);
    }

    pub fn resolve_class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn resolve_function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.get(name)
    }

    /// Resolve a parsed annotation into the lattice type it denotes
    /// (spec §3.4: "typeAlias ... resolved eagerly in most contexts").
    pub fn resolve_type(&mut self, ann: &TypeAnnotation) -> Type {
        match ann {
            TypeAnnotation::Name { name, type_args } => {
                if let Some(prim) = primitive_from_name(name) {
                    return Type::Primitive(prim);
                }
                let resolved_args = type_args
                    .as_ref()
                    .map(|args| args.iter().map(|a| self.resolve_type(a)).collect());
                if self.enums.contains_key(name) {
                    Type::Enum(name.clone())
                } else if self.classes.contains_key(name) || self.imported_symbols.contains_key(name) {
                    Type::Class {
                        name: name.clone(),
                        type_args: resolved_args,
                        readonly: false,
                    }
                } else if let Some(alias) = self.type_aliases.get(name) {
                    alias.resolved.clone()
                } else if name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
                    && name.len() == 1
                {
                    Type::TypeParameter(name.clone())
                } else {
                    self.error(ValidationError::new(
                        ErrorKind::UnknownIdentifier,
                        format!("unknown type `{name}`"),
                    ));
                    Type::void()
                }
            }
            TypeAnnotation::Array { element, length } => Type::Array {
                element: Box::new(self.resolve_type(element)),
                length: *length,
            },
            TypeAnnotation::Map { key, value } => Type::Map {
                key: Box::new(self.resolve_type(key)),
                value: Box::new(self.resolve_type(value)),
            },
            TypeAnnotation::Set(elem) => Type::Set(Box::new(self.resolve_type(elem))),
            TypeAnnotation::Weak(name) => Type::WeakClass { name: name.clone() },
            TypeAnnotation::Union(members) => {
                let resolved: Vec<Type> = members.iter().map(|m| self.resolve_type(m)).collect();
                Type::Union(resolved).canonicalize()
            }
            TypeAnnotation::Nullable(inner) => {
                Type::Nullable(Box::new(self.resolve_type(inner))).canonicalize()
            }
            TypeAnnotation::Function { params, ret } => Type::Function {
                params: params.iter().map(|p| self.resolve_type(p)).collect(),
                ret: Box::new(self.resolve_type(ret)),
                concise: false,
            },
        }
    }
}

fn primitive_from_name(name: &str) -> Option<crate::types::Primitive> {
    use crate::types::Primitive::*;
    Some(match name {
        "int" => Int,
        "float" => Float,
        "double" => Double,
        "bool" => Bool,
        "string" => String,
        "char" => Char,
        "void" => Void,
        "null" => Null,
        _ => return None,
    })
}

/// Cross-file context (spec §3.3, §3.4): outlives every per-file
/// context within a run.
#[derive(Debug, Default)]
pub struct GlobalContext {
    pub files: HashMap<String, ValidationContext>,
    /// Canonical dotted module path, derived from a file's position
    /// relative to the nearest configured source root (spec §4.4).
    pub module_names: HashMap<String, String>,
    /// Merged table of every file's exported symbols, keyed by
    /// `module_name::symbol_name`.
    pub exported_symbols: HashMap<String, String>,
}

impl GlobalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all_errors(&self) -> Vec<ValidationError> {
        let mut errs: Vec<ValidationError> = self
            .files
            .values()
            .flat_map(|ctx| ctx.errors.iter().cloned())
            .collect();
        errs.sort_by(|a, b| {
            (a.filename.clone(), a.line, a.column).cmp(&(b.filename.clone(), b.line, b.column))
        });
        errs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_state_join_requires_all_branches_assigned() {
        assert_eq!(
            AssignState::join(&AssignState::Assigned, &AssignState::Assigned),
            AssignState::Assigned
        );
        assert_eq!(
            AssignState::join(&AssignState::Assigned, &AssignState::Unassigned),
            AssignState::Maybe
        );
    }

    #[test]
    fn scope_tracker_shadowing_resolves_innermost_first() {
        let mut tracker = ScopeTracker::new();
        tracker.declare("x", AssignState::Assigned);
        tracker.push();
        tracker.declare("x", AssignState::Unassigned);
        assert_eq!(tracker.lookup("x"), Some(&AssignState::Unassigned));
        tracker.pop();
        assert_eq!(tracker.lookup("x"), Some(&AssignState::Assigned));
    }

    #[test]
    fn narrowing_record_flat_iff_single_member() {
        let flat = NarrowingRecord {
            narrowed_members: vec![Type::int()],
        };
        assert!(flat.is_flat());
        let visitor = NarrowingRecord {
            narrowed_members: vec![Type::int(), Type::bool_()],
        };
        assert!(!visitor.is_flat());
    }
}
