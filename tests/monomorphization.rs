//! End-to-end: a generic `identity<T>` function instantiated with a
//! single call site specializes into exactly one mangled copy and the
//! generic disappears from both the AST and the function table.

use doofc::ast::{
    Block, CallArgs, Decl, Expr, ExprKind, FunctionDecl, Literal, ModifierFlags, NodeIdGen, Param,
    Program, Stmt, TextRange, TypeAnnotation, TypeParam,
};
use doofc::context::{FunctionInfo, ValidationContext};
use doofc::monomorphize::monomorphize_program;
use doofc::types::Type;

fn identifier(gen: &NodeIdGen, name: &str) -> Expr {
    Expr { id: gen.fresh(), kind: ExprKind::Identifier(name.into()), range: TextRange::default() }
}

#[test]
fn identity_generic_specializes_to_primitive_int_and_call_site_is_rewritten() {
    let gen = NodeIdGen::new();

    let identity = FunctionDecl {
        id: gen.fresh(),
        name: "identity".into(),
        type_params: vec![TypeParam { name: "T".into() }],
        params: vec![Param {
            id: gen.fresh(),
            name: "value".into(),
            ty: TypeAnnotation::Name { name: "T".into(), type_args: None },
            default: None,
            range: TextRange::default(),
        }],
        return_ty: TypeAnnotation::Name { name: "T".into(), type_args: None },
        body: Block {
            stmts: vec![Stmt::Return { value: Some(identifier(&gen, "value")), range: TextRange::default() }],
            range: TextRange::default(),
        },
        modifiers: ModifierFlags::default(),
        range: TextRange::default(),
    };

    let call = Expr {
        id: gen.fresh(),
        kind: ExprKind::Call {
            callee: Box::new(identifier(&gen, "identity")),
            args: CallArgs {
                positional: vec![Expr { id: gen.fresh(), kind: ExprKind::Literal(Literal::Int(42)), range: TextRange::default() }],
                named: vec![],
                explicit_type_args: Some(vec![TypeAnnotation::Name { name: "int".into(), type_args: None }]),
            },
        },
        range: TextRange::default(),
    };

    let caller = FunctionDecl {
        id: gen.fresh(),
        name: "main".into(),
        type_params: vec![],
        params: vec![],
        return_ty: TypeAnnotation::Name { name: "void".into(), type_args: None },
        body: Block {
            stmts: vec![Stmt::Expr(call, TextRange::default())],
            range: TextRange::default(),
        },
        modifiers: ModifierFlags::default(),
        range: TextRange::default(),
    };

    let mut program = Program {
        decls: vec![Decl::Function(identity.clone()), Decl::Function(caller)],
    };

    let mut ctx = ValidationContext::new("generics.doof");
    ctx.functions.insert(
        "identity".into(),
        FunctionInfo {
            decl: identity,
            param_types: vec![Type::TypeParameter("T".into())],
            return_type: Type::TypeParameter("T".into()),
        },
    );

    monomorphize_program(&mut ctx, &mut program);

    assert!(ctx.functions.contains_key("identity__primitive_int"));
    assert!(!ctx.functions.contains_key("identity"));

    let specialized = program.decls.iter().find_map(|d| match d {
        Decl::Function(f) if f.name == "identity__primitive_int" => Some(f),
        _ => None,
    });
    let specialized = specialized.expect("specialized copy present in decls");
    assert!(specialized.type_params.is_empty());
    assert_eq!(specialized.params[0].ty, TypeAnnotation::Name { name: "int".into(), type_args: None });

    assert!(!program.decls.iter().any(|d| matches!(d, Decl::Function(f) if f.name == "identity")));

    let main_fn = program.decls.iter().find_map(|d| match d {
        Decl::Function(f) if f.name == "main" => Some(f),
        _ => None,
    }).expect("caller survives untouched aside from its call site");
    let Stmt::Expr(rewritten_call, _) = &main_fn.body.stmts[0] else { panic!("expected an expression statement") };
    let ExprKind::Call { callee, args } = &rewritten_call.kind else { panic!("expected a call") };
    let ExprKind::Identifier(callee_name) = &callee.kind else { panic!("expected an identifier callee") };
    assert_eq!(callee_name, "identity__primitive_int");
    assert!(args.explicit_type_args.is_none());
}

#[test]
fn generic_function_with_no_call_sites_is_a_violation() {
    let gen = NodeIdGen::new();
    let identity = FunctionDecl {
        id: gen.fresh(),
        name: "identity".into(),
        type_params: vec![TypeParam { name: "T".into() }],
        params: vec![Param {
            id: gen.fresh(),
            name: "value".into(),
            ty: TypeAnnotation::Name { name: "T".into(), type_args: None },
            default: None,
            range: TextRange::default(),
        }],
        return_ty: TypeAnnotation::Name { name: "T".into(), type_args: None },
        body: Block { stmts: vec![], range: TextRange::default() },
        modifiers: ModifierFlags::default(),
        range: TextRange::default(),
    };
    let mut program = Program { decls: vec![Decl::Function(identity.clone())] };
    let mut ctx = ValidationContext::new("generics.doof");
    ctx.functions.insert(
        "identity".into(),
        FunctionInfo {
            decl: identity,
            param_types: vec![Type::TypeParameter("T".into())],
            return_type: Type::TypeParameter("T".into()),
        },
    );

    monomorphize_program(&mut ctx, &mut program);

    assert!(!ctx.errors.is_empty(), "an uninstantiated generic should be reported");
}
