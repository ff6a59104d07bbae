pub mod expr;
pub mod imports;
pub mod markdown_table;
pub mod stmt;
pub mod union;

use std::collections::HashMap;

use crate::ast::{ClassDecl, Decl, EnumDecl, FunctionDecl, Program, TypeAliasDecl};
use crate::context::{ClassInfo, EnumInfo, FunctionInfo, TypeAliasInfo, ValidationContext};
use crate::diagnostics::{ErrorKind, ValidationError};
use crate::types::Type;

/// Validate one file's `Program` against its own (already-populated)
/// context. Declarations are registered in a first pass so that
/// forward references between top-level declarations resolve, then
/// each declaration's body is validated in declaration order (spec §5
/// "validation visits top-level declarations in declaration order").
pub fn validate_program(ctx: &mut ValidationContext, program: &Program) {
    register_declarations(ctx, program);
    for decl in &program.decls {
        validate_decl(ctx, decl);
    }
}

fn register_declarations(ctx: &mut ValidationContext, program: &Program) {
    for decl in &program.decls {
        match decl {
            Decl::Class(class) => register_class(ctx, class),
            Decl::Enum(e) => {
                ctx.enums.insert(e.name.clone(), EnumInfo { decl: e.clone() });
            }
            Decl::TypeAlias(alias) => register_type_alias(ctx, alias),
            _ => {}
        }
    }
    // Functions are registered after classes/enums/aliases so their
    // parameter and return annotations can resolve forward references
    // to types declared later in the same file.
    for decl in &program.decls {
        if let Decl::Function(f) = decl {
            register_function(ctx, f);
        }
    }
}

fn register_class(ctx: &mut ValidationContext, class: &ClassDecl) {
    let mut field_types = HashMap::new();
    let mut discriminant_field = None;
    for field in &class.fields {
        let ty = ctx.resolve_type(&field.ty);
        if field.const_init.is_some() {
            discriminant_field = Some(field.name.clone());
        }
        field_types.insert(field.name.clone(), ty);
    }
    ctx.classes.insert(
        class.name.clone(),
        ClassInfo {
            decl: class.clone(),
            field_types,
            discriminant_field,
        },
    );
}

fn register_type_alias(ctx: &mut ValidationContext, alias: &TypeAliasDecl) {
    let resolved = ctx.resolve_type(&alias.aliased);
    ctx.type_aliases.insert(
        alias.name.clone(),
        TypeAliasInfo {
            decl: alias.clone(),
            resolved,
        },
    );
}

fn register_function(ctx: &mut ValidationContext, f: &FunctionDecl) {
    let param_types: Vec<Type> = f.params.iter().map(|p| ctx.resolve_type(&p.ty)).collect();
    let return_type = ctx.resolve_type(&f.return_ty);
    ctx.functions.insert(
        f.name.clone(),
        FunctionInfo {
            decl: f.clone(),
            param_types,
            return_type,
        },
    );
}

fn validate_decl(ctx: &mut ValidationContext, decl: &Decl) {
    match decl {
        Decl::Function(f) => validate_function_body(ctx, f),
        Decl::Class(class) => validate_class_body(ctx, class),
        Decl::Enum(e) => validate_enum(ctx, e),
        Decl::TypeAlias(_) => {}
        Decl::Import(_) | Decl::Export(_) => {
            // Resolved in the global link step (spec §4.4, §5), not
            // per-file: a single file cannot know what other files
            // export until every file has registered its exports.
        }
        Decl::ExternClass(extern_class) => validate_extern_class(ctx, extern_class),
        Decl::Statement(stmt) => {
            if !ctx.allow_top_level_statements {
                ctx.error(ValidationError::new(
                    ErrorKind::InternalError,
                    "top-level statements are not enabled for this file",
                ));
                return;
            }
            let block = crate::ast::Block { stmts: vec![stmt.clone()], range: Default::default() };
            stmt::validate_block(ctx, &block, None);
        }
    }
}

fn validate_function_body(ctx: &mut ValidationContext, f: &FunctionDecl) {
    ctx.scopes.push();
    let return_ty = ctx.resolve_type(&f.return_ty);
    for p in &f.params {
        let ty = ctx.resolve_type(&p.ty);
        ctx.scopes
            .declare_typed(&p.name, ty, crate::context::AssignState::Assigned);
    }
    stmt::validate_block(ctx, &f.body, Some(&return_ty));
    ctx.scopes.pop();
}

fn validate_class_body(ctx: &mut ValidationContext, class: &ClassDecl) {
    for field in &class.fields {
        if let Some(init) = &field.init {
            let expected = ctx.resolve_type(&field.ty);
            expr::validate_expr(ctx, init, Some(&expected));
        }
    }
    if let Some(ctor) = &class.constructor {
        ctx.scopes.push();
        ctx.scopes
            .declare_typed("this", class_self_type(class), crate::context::AssignState::Assigned);
        for p in &ctor.params {
            let ty = ctx.resolve_type(&p.ty);
            ctx.scopes
                .declare_typed(&p.name, ty, crate::context::AssignState::Assigned);
        }
        stmt::validate_block(ctx, &ctor.body, Some(&Type::void()));
        ctx.scopes.pop();
    }
    for method in &class.methods {
        ctx.scopes.push();
        ctx.scopes
            .declare_typed("this", class_self_type(class), crate::context::AssignState::Assigned);
        let return_ty = ctx.resolve_type(&method.return_ty);
        for p in &method.params {
            let ty = ctx.resolve_type(&p.ty);
            ctx.scopes
                .declare_typed(&p.name, ty, crate::context::AssignState::Assigned);
        }
        stmt::validate_block(ctx, &method.body, Some(&return_ty));
        ctx.scopes.pop();
    }
}

fn class_self_type(class: &ClassDecl) -> Type {
    Type::Class {
        name: class.name.clone(),
        type_args: None,
        readonly: false,
    }
}

fn validate_enum(ctx: &mut ValidationContext, e: &EnumDecl) {
    let mut seen = std::collections::HashSet::new();
    for member in &e.members {
        if !seen.insert(member.name.clone()) {
            ctx.error(ValidationError::new(
                ErrorKind::UnionViolation,
                format!("duplicate enum member `{}` in `{}`", member.name, e.name),
            ));
        }
    }
}

fn validate_extern_class(ctx: &mut ValidationContext, extern_class: &crate::ast::ExternClassDecl) {
    const UNSUPPORTED_GLUE_KINDS: &[&str] = &["array", "map", "set"];
    for method in &extern_class.methods {
        for param in &method.params {
            if annotation_is_container(&param.ty, UNSUPPORTED_GLUE_KINDS) {
                ctx.error(ValidationError::new(
                    ErrorKind::ExternViolation,
                    format!(
                        "extern method `{}.{}` has an unsupported container parameter at the glue boundary",
                        extern_class.name, method.name
                    ),
                ));
            }
        }
    }
}

fn annotation_is_container(ann: &crate::ast::TypeAnnotation, _unsupported: &[&str]) -> bool {
    matches!(
        ann,
        crate::ast::TypeAnnotation::Array { .. }
            | crate::ast::TypeAnnotation::Map { .. }
            | crate::ast::TypeAnnotation::Set(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Block, FieldDecl, FunctionDecl, Literal, NodeIdGen, TypeAnnotation};
    use crate::ast::flags::ModifierFlags;

    #[test]
    fn duplicate_enum_members_rejected() {
        let mut ctx = ValidationContext::new("test.doof");
        let e = EnumDecl {
            id: NodeIdGen::new().fresh(),
            name: "Color".into(),
            members: vec![
                crate::ast::EnumMember { name: "Red".into(), value: None },
                crate::ast::EnumMember { name: "Red".into(), value: None },
            ],
            modifiers: ModifierFlags::NONE,
            range: Default::default(),
        };
        validate_enum(&mut ctx, &e);
        assert_eq!(ctx.errors.len(), 1);
    }

    #[test]
    fn function_return_type_checked_against_body() {
        let mut ctx = ValidationContext::new("test.doof");
        let f = FunctionDecl {
            id: NodeIdGen::new().fresh(),
            name: "f".into(),
            type_params: vec![],
            params: vec![],
            return_ty: TypeAnnotation::Name { name: "bool".into(), type_args: None },
            body: Block {
                stmts: vec![crate::ast::Stmt::Return {
                    value: Some(crate::ast::Expr {
                        id: NodeIdGen::new().fresh(),
                        kind: crate::ast::ExprKind::Literal(Literal::Int(1)),
                        range: Default::default(),
                    }),
                    range: Default::default(),
                }],
                range: Default::default(),
            },
            modifiers: ModifierFlags::NONE,
            range: Default::default(),
        };
        register_function(&mut ctx, &f);
        validate_function_body(&mut ctx, &f);
        assert_eq!(ctx.errors.len(), 1);
        assert_eq!(ctx.errors[0].kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn extern_container_parameter_is_rejected() {
        let mut ctx = ValidationContext::new("test.doof");
        let extern_class = crate::ast::ExternClassDecl {
            id: NodeIdGen::new().fresh(),
            name: "Native".into(),
            fields: vec![],
            methods: vec![crate::ast::ExternMethodSig {
                name: "take".into(),
                params: vec![crate::ast::Param {
                    id: NodeIdGen::new().fresh(),
                    name: "items".into(),
                    ty: TypeAnnotation::Array {
                        element: Box::new(TypeAnnotation::Name { name: "int".into(), type_args: None }),
                        length: None,
                    },
                    default: None,
                    range: Default::default(),
                }],
                return_ty: TypeAnnotation::Name { name: "void".into(), type_args: None },
                is_static: true,
            }],
            range: Default::default(),
        };
        validate_extern_class(&mut ctx, &extern_class);
        assert_eq!(ctx.errors.len(), 1);
        assert_eq!(ctx.errors[0].kind, ErrorKind::ExternViolation);
    }

    #[test]
    fn unused_field_decl_type_compiles() {
        let _f = FieldDecl {
            id: NodeIdGen::new().fresh(),
            name: "x".into(),
            ty: TypeAnnotation::Name { name: "int".into(), type_args: None },
            const_init: None,
            init: None,
            modifiers: ModifierFlags::NONE,
            range: Default::default(),
        };
    }
}
