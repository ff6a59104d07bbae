//! Generic monomorphization (spec §4.4): collect every concrete
//! instantiation of generic functions/classes, produce specialized
//! copies, and rewrite every referring annotation/call site.

use std::collections::{HashMap, HashSet};

use crate::ast::{
    ClassDecl, Decl, Expr, ExprKind, FunctionDecl, Param, Program, TypeAnnotation, TypeParam,
};
use crate::context::ValidationContext;
use crate::diagnostics::{ErrorKind, ValidationError};
use crate::types::Type;

/// A concrete instantiation: the generic declaration's name paired
/// with the type arguments it was invoked with, in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instantiation {
    pub generic_name: String,
    pub type_args: Vec<String>,
}

/// Encode a resolved `Type` the way a mangled name needs (spec §4.4:
/// `Box__primitive_int`, `identity__class_Widget`).
pub fn mangle_type(ty: &Type) -> String {
    match ty {
        Type::Primitive(p) => format!("primitive_{p}"),
        Type::Class { name, .. } => format!("class_{name}"),
        Type::Enum(name) => format!("enum_{name}"),
        Type::Array { element, .. } => format!("array_{}", mangle_type(element)),
        Type::Map { key, value } => format!("map_{}_{}", mangle_type(key), mangle_type(value)),
        Type::Set(elem) => format!("set_{}", mangle_type(elem)),
        Type::Nullable(inner) => format!("nullable_{}", mangle_type(inner)),
        Type::Union(members) => {
            let parts: Vec<String> = members.iter().map(mangle_type).collect();
            format!("union_{}", parts.join("_"))
        }
        Type::WeakClass { name } => format!("weak_{name}"),
        Type::TypeAlias { name, .. } => format!("alias_{name}"),
        Type::TypeParameter(name) => format!("param_{name}"),
        Type::Function { .. } => "fn".to_string(),
    }
}

pub fn mangled_name(generic_name: &str, type_args: &[Type]) -> String {
    let mut parts = vec![generic_name.to_string()];
    parts.extend(type_args.iter().map(mangle_type));
    parts.join("__")
}

/// Walk a file's AST collecting every generic instantiation: explicit
/// type arguments on calls, type annotations, positional-object
/// constructors, and method calls (spec §4.4).
pub fn collect_instantiations(
    ctx: &mut ValidationContext,
    program: &Program,
) -> HashSet<(String, Vec<Type>)> {
    let mut found = HashSet::new();
    for decl in &program.decls {
        match decl {
            Decl::Function(f) => walk_block_for_calls(ctx, &f.body, &mut found),
            Decl::Class(class) => {
                if let Some(ctor) = &class.constructor {
                    walk_block_for_calls(ctx, &ctor.body, &mut found);
                }
                for m in &class.methods {
                    walk_block_for_calls(ctx, &m.body, &mut found);
                }
            }
            _ => {}
        }
    }
    found
}

fn walk_block_for_calls(
    ctx: &mut ValidationContext,
    block: &crate::ast::Block,
    found: &mut HashSet<(String, Vec<Type>)>,
) {
    for stmt in &block.stmts {
        walk_stmt_for_calls(ctx, stmt, found);
    }
}

fn walk_stmt_for_calls(
    ctx: &mut ValidationContext,
    stmt: &crate::ast::Stmt,
    found: &mut HashSet<(String, Vec<Type>)>,
) {
    use crate::ast::Stmt;
    match stmt {
        Stmt::Var(decl) => {
            if let Some(e) = &decl.init {
                walk_expr_for_calls(ctx, e, found);
            }
        }
        Stmt::Expr(e, _) => walk_expr_for_calls(ctx, e, found),
        Stmt::Block(b) => walk_block_for_calls(ctx, b, found),
        Stmt::If { cond, then_branch, else_branch, .. } => {
            walk_expr_for_calls(ctx, cond, found);
            walk_block_for_calls(ctx, then_branch, found);
            if let Some(e) = else_branch {
                walk_stmt_for_calls(ctx, e, found);
            }
        }
        Stmt::While { cond, body, .. } => {
            walk_expr_for_calls(ctx, cond, found);
            walk_block_for_calls(ctx, body, found);
        }
        Stmt::For { body, .. } => walk_block_for_calls(ctx, body, found),
        Stmt::Switch { discriminant, cases, .. } => {
            walk_expr_for_calls(ctx, discriminant, found);
            for case in cases {
                for s in &case.body {
                    walk_stmt_for_calls(ctx, s, found);
                }
            }
        }
        Stmt::Return { value, .. } => {
            if let Some(e) = value {
                walk_expr_for_calls(ctx, e, found);
            }
        }
        Stmt::Break(_) | Stmt::Continue(_) => {}
    }
}

fn walk_expr_for_calls(
    ctx: &mut ValidationContext,
    expr: &Expr,
    found: &mut HashSet<(String, Vec<Type>)>,
) {
    match &expr.kind {
        ExprKind::Call { callee, args } => {
            match (&callee.kind, &args.explicit_type_args) {
                (ExprKind::Identifier(name), Some(type_args)) => {
                    if ctx.functions.contains_key(name) || ctx.classes.contains_key(name) {
                        let resolved: Vec<Type> = type_args.iter().map(|a| ctx.resolve_type(a)).collect();
                        found.insert((name.clone(), resolved));
                    }
                }
                // `obj.method<T>(...)` (spec §4.4, §2 "method calls"):
                // the method name identifies the generic declaration.
                (ExprKind::Member { property, .. }, Some(type_args)) => {
                    if ctx.functions.contains_key(property) || ctx.classes.contains_key(property) {
                        let resolved: Vec<Type> = type_args.iter().map(|a| ctx.resolve_type(a)).collect();
                        found.insert((property.clone(), resolved));
                    }
                }
                _ => {}
            }
            walk_expr_for_calls(ctx, callee, found);
            for a in &args.positional {
                walk_expr_for_calls(ctx, a, found);
            }
            for a in &args.named {
                walk_expr_for_calls(ctx, &a.value, found);
            }
        }
        ExprKind::PositionalObject { class_name, type_args, args } => {
            if let Some(type_args) = type_args {
                let resolved: Vec<Type> = type_args.iter().map(|a| ctx.resolve_type(a)).collect();
                found.insert((class_name.clone(), resolved));
            }
            for a in &args.positional {
                walk_expr_for_calls(ctx, a, found);
            }
        }
        ExprKind::Binary { left, right, .. } => {
            walk_expr_for_calls(ctx, left, found);
            walk_expr_for_calls(ctx, right, found);
        }
        ExprKind::Unary { operand, .. } => walk_expr_for_calls(ctx, operand, found),
        ExprKind::Member { object, .. } => walk_expr_for_calls(ctx, object, found),
        ExprKind::Index { object, index } => {
            walk_expr_for_calls(ctx, object, found);
            walk_expr_for_calls(ctx, index, found);
        }
        ExprKind::Array(elems) => {
            for e in elems {
                walk_expr_for_calls(ctx, e, found);
            }
        }
        ExprKind::Conditional { test, consequent, alternate } => {
            walk_expr_for_calls(ctx, test, found);
            walk_expr_for_calls(ctx, consequent, found);
            walk_expr_for_calls(ctx, alternate, found);
        }
        _ => {}
    }
}

/// Produce one specialized copy of a generic function for a concrete
/// type-argument tuple: substitute every type-parameter reference in
/// parameter/return annotations and rename the declaration (spec
/// §4.4). Call-site rewriting is a separate, smaller AST rewrite
/// ([`rewrite_call_sites`]) since it only needs to retarget
/// identifiers, not clone declarations.
pub fn specialize_function(generic: &FunctionDecl, type_args: &[Type]) -> FunctionDecl {
    let substitution: HashMap<String, Type> = generic
        .type_params
        .iter()
        .zip(type_args.iter())
        .map(|(tp, ty)| (tp.name.clone(), ty.clone()))
        .collect();

    let mut specialized = generic.clone();
    specialized.name = mangled_name(&generic.name, type_args);
    specialized.type_params = Vec::new();
    specialized.params = generic
        .params
        .iter()
        .map(|p| substitute_param(p, &substitution))
        .collect();
    specialized.return_ty = substitute_annotation(&generic.return_ty, &substitution);
    specialized
}

/// Produce one specialized copy of a generic class: every field type,
/// plus the constructor's and every method's params/return type/body
/// (spec §4.4 scopes monomorphization over "functions, classes, and
/// methods" — the type parameter doesn't just vanish from the fields,
/// it has to stop appearing anywhere in the class at all).
pub fn specialize_class(generic: &ClassDecl, type_args: &[Type]) -> ClassDecl {
    let substitution: HashMap<String, Type> = generic
        .type_params
        .iter()
        .zip(type_args.iter())
        .map(|(tp, ty)| (tp.name.clone(), ty.clone()))
        .collect();

    let mut specialized = generic.clone();
    specialized.name = mangled_name(&generic.name, type_args);
    specialized.type_params = Vec::new();
    for field in specialized.fields.iter_mut() {
        field.ty = substitute_annotation(&field.ty, &substitution);
    }
    if let Some(ctor) = specialized.constructor.as_mut() {
        for p in ctor.params.iter_mut() {
            *p = substitute_param(p, &substitution);
        }
        substitute_block(&mut ctor.body, &substitution);
    }
    for method in specialized.methods.iter_mut() {
        for p in method.params.iter_mut() {
            *p = substitute_param(p, &substitution);
        }
        method.return_ty = substitute_annotation(&method.return_ty, &substitution);
        substitute_block(&mut method.body, &substitution);
    }
    specialized
}

fn substitute_param(param: &Param, subst: &HashMap<String, Type>) -> Param {
    let mut p = param.clone();
    p.ty = substitute_annotation(&param.ty, subst);
    p
}

/// Rewrite every body-local type annotation a type-parameter
/// substitution can reach: `let` declarations, `is` guards, lambda
/// params/return, and explicit generic instantiations on calls and
/// constructors (spec §4.4).
fn substitute_block(block: &mut crate::ast::Block, subst: &HashMap<String, Type>) {
    for stmt in block.stmts.iter_mut() {
        substitute_stmt(stmt, subst);
    }
}

fn substitute_stmt(stmt: &mut crate::ast::Stmt, subst: &HashMap<String, Type>) {
    use crate::ast::Stmt;
    match stmt {
        Stmt::Var(decl) => {
            if let Some(ann) = decl.declared_ty.as_mut() {
                *ann = substitute_annotation(ann, subst);
            }
            if let Some(e) = decl.init.as_mut() {
                substitute_expr(e, subst);
            }
        }
        Stmt::Expr(e, _) => substitute_expr(e, subst),
        Stmt::Block(b) => substitute_block(b, subst),
        Stmt::If { cond, then_branch, else_branch, .. } => {
            substitute_expr(cond, subst);
            substitute_block(then_branch, subst);
            if let Some(e) = else_branch.as_mut() {
                substitute_stmt(e, subst);
            }
        }
        Stmt::While { cond, body, .. } => {
            substitute_expr(cond, subst);
            substitute_block(body, subst);
        }
        Stmt::For { head, body, .. } => {
            use crate::ast::ForHead;
            match head {
                ForHead::Classic { init, cond, update } => {
                    if let Some(s) = init.as_mut() {
                        substitute_stmt(s, subst);
                    }
                    if let Some(c) = cond.as_mut() {
                        substitute_expr(c, subst);
                    }
                    if let Some(u) = update.as_mut() {
                        substitute_expr(u, subst);
                    }
                }
                ForHead::Of { iterable, .. } => substitute_expr(iterable, subst),
            }
            substitute_block(body, subst);
        }
        Stmt::Switch { discriminant, cases, .. } => {
            substitute_expr(discriminant, subst);
            for case in cases.iter_mut() {
                if let Some(test) = case.test.as_mut() {
                    substitute_expr(test, subst);
                }
                for s in case.body.iter_mut() {
                    substitute_stmt(s, subst);
                }
            }
        }
        Stmt::Return { value, .. } => {
            if let Some(e) = value.as_mut() {
                substitute_expr(e, subst);
            }
        }
        Stmt::Break(_) | Stmt::Continue(_) => {}
    }
}

fn substitute_expr(expr: &mut Expr, subst: &HashMap<String, Type>) {
    match &mut expr.kind {
        ExprKind::Is { value, type_ann } => {
            substitute_expr(value, subst);
            *type_ann = substitute_annotation(type_ann, subst);
        }
        ExprKind::Lambda { params, return_ty, body, .. } => {
            for p in params.iter_mut() {
                if let Some(ann) = p.ty.as_mut() {
                    *ann = substitute_annotation(ann, subst);
                }
            }
            if let Some(ann) = return_ty.as_mut() {
                *ann = substitute_annotation(ann, subst);
            }
            match body {
                crate::ast::LambdaBody::Expr(e) => substitute_expr(e, subst),
                crate::ast::LambdaBody::Block(b) => substitute_block(b, subst),
            }
        }
        ExprKind::Call { callee, args } => {
            if let Some(type_args) = args.explicit_type_args.as_mut() {
                for t in type_args.iter_mut() {
                    *t = substitute_annotation(t, subst);
                }
            }
            substitute_expr(callee, subst);
            for a in args.positional.iter_mut() {
                substitute_expr(a, subst);
            }
            for a in args.named.iter_mut() {
                substitute_expr(&mut a.value, subst);
            }
        }
        ExprKind::PositionalObject { type_args, args, .. } => {
            if let Some(type_args) = type_args.as_mut() {
                for t in type_args.iter_mut() {
                    *t = substitute_annotation(t, subst);
                }
            }
            for a in args.positional.iter_mut() {
                substitute_expr(a, subst);
            }
            for a in args.named.iter_mut() {
                substitute_expr(&mut a.value, subst);
            }
        }
        ExprKind::Binary { left, right, .. } => {
            substitute_expr(left, subst);
            substitute_expr(right, subst);
        }
        ExprKind::Unary { operand, .. } => substitute_expr(operand, subst),
        ExprKind::Member { object, .. } => substitute_expr(object, subst),
        ExprKind::Index { object, index } => {
            substitute_expr(object, subst);
            substitute_expr(index, subst);
        }
        ExprKind::Array(elems) => {
            for e in elems.iter_mut() {
                substitute_expr(e, subst);
            }
        }
        ExprKind::Conditional { test, consequent, alternate } => {
            substitute_expr(test, subst);
            substitute_expr(consequent, subst);
            substitute_expr(alternate, subst);
        }
        _ => {}
    }
}

fn substitute_annotation(ann: &TypeAnnotation, subst: &HashMap<String, Type>) -> TypeAnnotation {
    match ann {
        TypeAnnotation::Name { name, type_args } => {
            if let Some(ty) = subst.get(name) {
                return type_to_annotation(ty);
            }
            TypeAnnotation::Name {
                name: name.clone(),
                type_args: type_args
                    .as_ref()
                    .map(|args| args.iter().map(|a| substitute_annotation(a, subst)).collect()),
            }
        }
        TypeAnnotation::Array { element, length } => TypeAnnotation::Array {
            element: Box::new(substitute_annotation(element, subst)),
            length: *length,
        },
        TypeAnnotation::Map { key, value } => TypeAnnotation::Map {
            key: Box::new(substitute_annotation(key, subst)),
            value: Box::new(substitute_annotation(value, subst)),
        },
        TypeAnnotation::Set(inner) => TypeAnnotation::Set(Box::new(substitute_annotation(inner, subst))),
        TypeAnnotation::Weak(name) => TypeAnnotation::Weak(name.clone()),
        TypeAnnotation::Union(members) => {
            TypeAnnotation::Union(members.iter().map(|m| substitute_annotation(m, subst)).collect())
        }
        TypeAnnotation::Nullable(inner) => {
            TypeAnnotation::Nullable(Box::new(substitute_annotation(inner, subst)))
        }
        TypeAnnotation::Function { params, ret } => TypeAnnotation::Function {
            params: params.iter().map(|p| substitute_annotation(p, subst)).collect(),
            ret: Box::new(substitute_annotation(ret, subst)),
        },
    }
}

fn type_to_annotation(ty: &Type) -> TypeAnnotation {
    match ty {
        Type::Primitive(p) => TypeAnnotation::Name { name: p.to_string(), type_args: None },
        Type::Class { name, .. } => TypeAnnotation::Name { name: name.clone(), type_args: None },
        Type::Enum(name) => TypeAnnotation::Name { name: name.clone(), type_args: None },
        other => TypeAnnotation::Name {
            name: mangle_type(other),
            type_args: None,
        },
    }
}

/// Rewrite call sites and type annotations that reference a generic
/// declaration to use its mangled specialization name instead (spec
/// §4.4 "every referring type annotation, callee identifier, or class
/// reference is rewritten").
pub fn rewrite_call_sites(program: &mut Program, generic_name: &str, mangled_by_args: &HashMap<Vec<String>, String>) {
    for decl in program.decls.iter_mut() {
        match decl {
            Decl::Function(f) => rewrite_block(&mut f.body, generic_name, mangled_by_args),
            Decl::Class(c) => {
                if let Some(ctor) = &mut c.constructor {
                    rewrite_block(&mut ctor.body, generic_name, mangled_by_args);
                }
                for m in c.methods.iter_mut() {
                    rewrite_block(&mut m.body, generic_name, mangled_by_args);
                }
            }
            _ => {}
        }
    }
}

fn rewrite_block(block: &mut crate::ast::Block, generic_name: &str, table: &HashMap<Vec<String>, String>) {
    for stmt in block.stmts.iter_mut() {
        rewrite_stmt(stmt, generic_name, table);
    }
}

fn rewrite_stmt(stmt: &mut crate::ast::Stmt, generic_name: &str, table: &HashMap<Vec<String>, String>) {
    use crate::ast::Stmt;
    match stmt {
        Stmt::Var(decl) => {
            if let Some(e) = &mut decl.init {
                rewrite_expr(e, generic_name, table);
            }
        }
        Stmt::Expr(e, _) => rewrite_expr(e, generic_name, table),
        Stmt::Block(b) => rewrite_block(b, generic_name, table),
        Stmt::If { cond, then_branch, else_branch, .. } => {
            rewrite_expr(cond, generic_name, table);
            rewrite_block(then_branch, generic_name, table);
            if let Some(e) = else_branch {
                rewrite_stmt(e, generic_name, table);
            }
        }
        Stmt::While { cond, body, .. } => {
            rewrite_expr(cond, generic_name, table);
            rewrite_block(body, generic_name, table);
        }
        Stmt::For { body, .. } => rewrite_block(body, generic_name, table),
        Stmt::Switch { discriminant, cases, .. } => {
            rewrite_expr(discriminant, generic_name, table);
            for case in cases.iter_mut() {
                for s in case.body.iter_mut() {
                    rewrite_stmt(s, generic_name, table);
                }
            }
        }
        Stmt::Return { value, .. } => {
            if let Some(e) = value {
                rewrite_expr(e, generic_name, table);
            }
        }
        Stmt::Break(_) | Stmt::Continue(_) => {}
    }
}

fn rewrite_expr(expr: &mut Expr, generic_name: &str, table: &HashMap<Vec<String>, String>) {
    match &mut expr.kind {
        ExprKind::Call { callee, args } => {
            if let (ExprKind::Identifier(name), Some(type_args)) = (&callee.kind, &args.explicit_type_args) {
                if name == generic_name {
                    let key: Vec<String> = type_args.iter().map(|a| format!("{a:?}")).collect();
                    if let Some(mangled) = table.get(&key) {
                        callee.kind = ExprKind::Identifier(mangled.clone());
                        args.explicit_type_args = None;
                    }
                }
            }
            rewrite_expr(callee, generic_name, table);
            for a in args.positional.iter_mut() {
                rewrite_expr(a, generic_name, table);
            }
            for a in args.named.iter_mut() {
                rewrite_expr(&mut a.value, generic_name, table);
            }
        }
        ExprKind::PositionalObject { class_name, type_args, args } => {
            if class_name == generic_name {
                if let Some(type_args) = type_args {
                    let key: Vec<String> = type_args.iter().map(|a| format!("{a:?}")).collect();
                    if let Some(mangled) = table.get(&key) {
                        *class_name = mangled.clone();
                        *type_args = None;
                    }
                }
            }
            for a in args.positional.iter_mut() {
                rewrite_expr(a, generic_name, table);
            }
        }
        ExprKind::Binary { left, right, .. } => {
            rewrite_expr(left, generic_name, table);
            rewrite_expr(right, generic_name, table);
        }
        ExprKind::Unary { operand, .. } => rewrite_expr(operand, generic_name, table),
        ExprKind::Member { object, .. } => rewrite_expr(object, generic_name, table),
        ExprKind::Index { object, index } => {
            rewrite_expr(object, generic_name, table);
            rewrite_expr(index, generic_name, table);
        }
        ExprKind::Array(elems) => {
            for e in elems.iter_mut() {
                rewrite_expr(e, generic_name, table);
            }
        }
        ExprKind::Conditional { test, consequent, alternate } => {
            rewrite_expr(test, generic_name, table);
            rewrite_expr(consequent, generic_name, table);
            rewrite_expr(alternate, generic_name, table);
        }
        _ => {}
    }
}

/// Run the full monomorphization pass over one file's AST in place
/// (spec §4.4, §3.4 "may be mutated in place by the monomorphizer").
/// A generic declaration with zero collected instantiations yields a
/// diagnostic and is dropped without emitting any specialization.
pub fn monomorphize_program(ctx: &mut ValidationContext, program: &mut Program) {
    let instantiations = collect_instantiations(ctx, program);

    let mut by_generic: HashMap<String, Vec<Vec<Type>>> = HashMap::new();
    for (name, args) in &instantiations {
        by_generic.entry(name.clone()).or_default().push(args.clone());
    }

    let generic_function_names: HashSet<String> = program
        .decls
        .iter()
        .filter_map(|d| match d {
            Decl::Function(f) if !f.type_params.is_empty() => Some(f.name.clone()),
            _ => None,
        })
        .collect();
    let generic_class_names: HashSet<String> = program
        .decls
        .iter()
        .filter_map(|d| match d {
            Decl::Class(c) if !c.type_params.is_empty() => Some(c.name.clone()),
            _ => None,
        })
        .collect();

    for name in generic_function_names.iter().chain(generic_class_names.iter()) {
        if !by_generic.contains_key(name) {
            ctx.error(ValidationError::new(
                ErrorKind::GenericViolation,
                format!("generic declaration `{name}` has no concrete instantiation"),
            ));
        }
    }

    let mut new_decls = Vec::new();
    for decl in program.decls.drain(..) {
        match decl {
            Decl::Function(f) if !f.type_params.is_empty() => {
                if let Some(arg_tuples) = by_generic.get(&f.name) {
                    let mut table = HashMap::new();
                    for args in arg_tuples {
                        let specialized = specialize_function(&f, args);
                        let key: Vec<String> = args.iter().map(|a| format!("{a:?}")).collect();
                        table.insert(key, specialized.name.clone());
                        ctx.functions.remove(&f.name);
                        ctx.functions.insert(
                            specialized.name.clone(),
                            crate::context::FunctionInfo {
                                param_types: specialized.params.iter().map(|p| ctx.resolve_type(&p.ty)).collect(),
                                return_type: ctx.resolve_type(&specialized.return_ty),
                                decl: specialized.clone(),
                            },
                        );
                        new_decls.push(Decl::Function(specialized));
                    }
                }
            }
            Decl::Class(c) if !c.type_params.is_empty() => {
                if let Some(arg_tuples) = by_generic.get(&c.name) {
                    for args in arg_tuples {
                        let specialized = specialize_class(&c, args);
                        ctx.classes.remove(&c.name);
                        let field_types = specialized
                            .fields
                            .iter()
                            .map(|f| (f.name.clone(), ctx.resolve_type(&f.ty)))
                            .collect();
                        ctx.classes.insert(
                            specialized.name.clone(),
                            crate::context::ClassInfo {
                                discriminant_field: specialized
                                    .fields
                                    .iter()
                                    .find(|f| f.const_init.is_some())
                                    .map(|f| f.name.clone()),
                                field_types,
                                decl: specialized.clone(),
                            },
                        );
                        new_decls.push(Decl::Class(specialized));
                    }
                }
            }
            other => new_decls.push(other),
        }
    }
    program.decls = new_decls;

    for (generic_name, arg_tuples) in &by_generic {
        let mut table = HashMap::new();
        for args in arg_tuples {
            let key: Vec<String> = args.iter().map(|a| format!("{a:?}")).collect();
            table.insert(key, mangled_name(generic_name, args));
        }
        rewrite_call_sites(program, generic_name, &table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CallArgs, NodeIdGen, TextRange};

    #[test]
    fn mangled_name_follows_spec_examples() {
        assert_eq!(mangled_name("Box", &[Type::int()]), "Box__primitive_int");
        assert_eq!(
            mangled_name(
                "identity",
                &[Type::Class { name: "Widget".into(), type_args: None, readonly: false }]
            ),
            "identity__class_Widget"
        );
    }

    #[test]
    fn specialize_function_substitutes_type_parameter() {
        let generic = FunctionDecl {
            id: NodeIdGen::new().fresh(),
            name: "identity".into(),
            type_params: vec![TypeParam { name: "T".into() }],
            params: vec![Param {
                id: NodeIdGen::new().fresh(),
                name: "v".into(),
                ty: TypeAnnotation::Name { name: "T".into(), type_args: None },
                default: None,
                range: TextRange::default(),
            }],
            return_ty: TypeAnnotation::Name { name: "T".into(), type_args: None },
            body: crate::ast::Block { stmts: vec![], range: TextRange::default() },
            modifiers: crate::ast::flags::ModifierFlags::NONE,
            range: TextRange::default(),
        };
        let specialized = specialize_function(&generic, &[Type::int()]);
        assert_eq!(specialized.name, "identity__primitive_int");
        assert!(specialized.type_params.is_empty());
        assert_eq!(specialized.params[0].ty, TypeAnnotation::Name { name: "int".into(), type_args: None });
    }

    #[test]
    fn call_args_with_no_explicit_type_args_are_ignored() {
        let args = CallArgs { positional: vec![], named: vec![], explicit_type_args: None };
        assert!(args.explicit_type_args.is_none());
    }
}
