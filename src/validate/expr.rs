//! Bidirectional expression validator (spec §4.2): every expression
//! receives an optional expected type and returns an inferred type.

use crate::ast::{
    BinOp, CallArgs, Expr, ExprKind, InterpolatedPart, Literal, ObjectLiteralKind, UnOp,
};
use crate::context::{AssignState, CalleeKind, CallDispatchRecord, ValidationContext};
use crate::diagnostics::{ErrorKind, ValidationError};
use crate::types::{self, Primitive, Type};

use super::union;

/// Conservative syntactic side-effect test (spec §4.2 "call
/// dispatch"): literals and pure identifiers are side-effect-free;
/// anything else is assumed side-effecting.
pub fn is_side_effect_free(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Literal(_) | ExprKind::Identifier(_))
}

pub fn validate_expr(ctx: &mut ValidationContext, expr: &Expr, expected: Option<&Type>) -> Type {
    let ty = validate_expr_inner(ctx, expr, expected);
    ctx.hints.inferred_types.insert(expr.id, ty.clone());
    ty
}

fn validate_expr_inner(ctx: &mut ValidationContext, expr: &Expr, expected: Option<&Type>) -> Type {
    match &expr.kind {
        ExprKind::Literal(lit) => validate_literal(lit, expected),
        ExprKind::Identifier(name) => validate_identifier(ctx, name),
        ExprKind::Binary { op, left, right } => validate_binary(ctx, expr, *op, left, right),
        ExprKind::Unary { op, operand } => validate_unary(ctx, *op, operand),
        ExprKind::Call { callee, args } => validate_call(ctx, expr, callee, args),
        ExprKind::Member { object, property, computed } => {
            validate_member(ctx, expr, object, property, *computed)
        }
        ExprKind::Index { object, index } => validate_index(ctx, object, index),
        ExprKind::Array(elements) => validate_array(ctx, elements, expected),
        ExprKind::Object { kind, class_name, fields, entries } => {
            validate_object(ctx, expr, kind, class_name, fields, entries, expected)
        }
        ExprKind::PositionalObject { class_name, args, .. } => {
            validate_positional_object(ctx, expr, class_name, args)
        }
        ExprKind::Range { start, end, .. } => validate_range(ctx, start, end),
        ExprKind::Conditional { test, consequent, alternate } => {
            validate_conditional(ctx, test, consequent, alternate, expected)
        }
        ExprKind::InterpolatedString(parts) => {
            validate_interpolated_string(ctx, parts)
        }
        ExprKind::TaggedTemplate { parts, .. } => {
            validate_interpolated_string(ctx, parts)
        }
        ExprKind::Lambda { params, return_ty, body, .. } => {
            validate_lambda(ctx, params, return_ty, body, expected)
        }
        ExprKind::TrailingLambda { call, .. } => validate_expr(ctx, call, expected),
        ExprKind::EnumShorthand(member) => validate_enum_shorthand(ctx, member, expected),
        ExprKind::Is { value, type_ann } => validate_is(ctx, expr, value, type_ann),
        ExprKind::XmlCall { children, .. } => {
            for child in children {
                validate_expr(ctx, child, None);
            }
            Type::void()
        }
        ExprKind::MarkdownTable(table) => {
            crate::validate::markdown_table::validate_table(ctx, table)
        }
    }
}

fn validate_literal(lit: &Literal, expected: Option<&Type>) -> Type {
    match lit {
        Literal::Int(_) => {
            // An untyped int literal widens per the expected numeric
            // site (spec §4.1); otherwise it defaults to `int`.
            match expected {
                Some(Type::Primitive(Primitive::Float)) => Type::Primitive(Primitive::Float),
                Some(Type::Primitive(Primitive::Double)) => Type::Primitive(Primitive::Double),
                _ => Type::int(),
            }
        }
        Literal::Float(_) => Type::Primitive(Primitive::Float),
        Literal::Double(_) => Type::Primitive(Primitive::Double),
        Literal::Bool(_) => Type::bool_(),
        Literal::Str(_) => Type::string(),
        Literal::Char(_) => Type::Primitive(Primitive::Char),
        Literal::Null => Type::null(),
    }
}

fn validate_identifier(ctx: &mut ValidationContext, name: &str) -> Type {
    if let Some(ty) = ctx.scopes.lookup_type(name).cloned() {
        if matches!(ctx.scopes.lookup(name), Some(AssignState::Unassigned))
            && !matches!(ty, Type::Nullable(_))
        {
            ctx.error(ValidationError::new(
                ErrorKind::DefiniteAssignmentViolation,
                format!("`{name}` is read before being assigned"),
            ));
        }
        return ty;
    }
    if let Some(func) = ctx.functions.get(name) {
        return Type::Function {
            params: func.param_types.clone(),
            ret: Box::new(func.return_type.clone()),
            concise: false,
        };
    }
    ctx.error(ValidationError::new(
        ErrorKind::UnknownIdentifier,
        format!("unknown identifier `{name}`"),
    ));
    Type::void()
}

/// Operator overload table (spec §4.2): keyed by operand kinds.
fn arithmetic_result(op: BinOp, left: &Type, right: &Type) -> Option<Type> {
    use Primitive::*;
    let (Type::Primitive(l), Type::Primitive(r)) = (left, right) else {
        return None;
    };
    let numeric = |p: &Primitive| matches!(p, Int | Float | Double);
    if !numeric(l) || !numeric(r) {
        return None;
    }
    // Widen to the wider of the two operand kinds.
    let widened = match (l, r) {
        (Double, _) | (_, Double) => Double,
        (Float, _) | (_, Float) => Float,
        _ => Int,
    };
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
            Some(Type::Primitive(widened))
        }
        _ => None,
    }
}

fn validate_binary(ctx: &mut ValidationContext, expr: &Expr, op: BinOp, left: &Expr, right: &Expr) -> Type {
    if op.is_compound_assign() {
        return validate_compound_assign(ctx, op, left, right);
    }
    if op == BinOp::Assign {
        return validate_assign(ctx, left, right);
    }

    let lt = validate_expr(ctx, left, None);
    let rt = validate_expr(ctx, right, None);

    match op {
        BinOp::Add if lt.structurally_equal(&Type::string()) || rt.structurally_equal(&Type::string()) => {
            // String concatenation coerces non-string operands via a
            // stringify wrapper (spec §4.2).
            Type::string()
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
            arithmetic_result(op, &lt, &rt).unwrap_or_else(|| {
                ctx.error(ValidationError::new(
                    ErrorKind::TypeMismatch,
                    format!("no overload of this operator accepts ({lt:?}, {rt:?})"),
                ));
                Type::void()
            })
        }
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => Type::bool_(),
        BinOp::And | BinOp::Or => {
            require_bool(ctx, &lt);
            require_bool(ctx, &rt);
            let _ = expr;
            Type::bool_()
        }
        BinOp::Assign | BinOp::AddAssign | BinOp::SubAssign | BinOp::MulAssign
        | BinOp::DivAssign | BinOp::ModAssign => unreachable!("handled above"),
    }
}

fn require_bool(ctx: &mut ValidationContext, ty: &Type) {
    if !ty.structurally_equal(&Type::bool_()) {
        ctx.error(ValidationError::new(
            ErrorKind::TypeMismatch,
            "expected bool",
        ));
    }
}

fn validate_assign(ctx: &mut ValidationContext, left: &Expr, right: &Expr) -> Type {
    let lt = validate_expr(ctx, left, None);
    let rt = validate_expr(ctx, right, Some(&lt));
    check_readonly_and_assignability(ctx, &lt, &rt, matches!(right.kind, ExprKind::Literal(_)));
    if let ExprKind::Identifier(name) = &left.kind {
        ctx.scopes.set(name, crate::context::AssignState::Assigned);
    }
    lt
}

/// Compound assignment is checked as the underlying binary plus an
/// assignability check against the l-value type (spec §4.2); it reads
/// before writing, so the l-value goes through the same definite-
/// assignment check as any other read (`validate_identifier`, via the
/// `validate_expr` call below) before we write it back as assigned.
fn validate_compound_assign(ctx: &mut ValidationContext, op: BinOp, left: &Expr, right: &Expr) -> Type {
    let lt = validate_expr(ctx, left, None);
    let rt = validate_expr(ctx, right, None);
    let underlying = op.underlying();
    let result = if underlying == BinOp::Add && lt.structurally_equal(&Type::string()) {
        Type::string()
    } else {
        arithmetic_result(underlying, &lt, &rt).unwrap_or_else(|| {
            ctx.error(ValidationError::new(
                ErrorKind::TypeMismatch,
                "compound assignment operand type mismatch",
            ));
            Type::void()
        })
    };
    check_readonly_and_assignability(ctx, &lt, &result, false);
    if let ExprKind::Identifier(name) = &left.kind {
        ctx.scopes.set(name, AssignState::Assigned);
    }
    lt
}

fn check_readonly_and_assignability(ctx: &mut ValidationContext, target: &Type, source: &Type, source_is_literal: bool) {
    if types::violates_readonly_discipline(target, source) {
        ctx.error(ValidationError::new(
            ErrorKind::ReadonlyViolation,
            "cannot assign a readonly collection to a mutable target",
        ));
        return;
    }
    if !types::is_assignable(target, source, source_is_literal) {
        ctx.error(ValidationError::new(
            ErrorKind::TypeMismatch,
            format!("cannot assign {source:?} to {target:?}"),
        ));
    }
}

fn validate_unary(ctx: &mut ValidationContext, op: UnOp, operand: &Expr) -> Type {
    let ty = validate_expr(ctx, operand, None);
    match op {
        UnOp::Not => {
            require_bool(ctx, &ty);
            Type::bool_()
        }
        UnOp::Neg => ty,
        UnOp::PreIncr | UnOp::PreDecr | UnOp::PostIncr | UnOp::PostDecr => {
            // Postfix ++/-- produce the pre-update value (spec §4.2);
            // prefix forms produce the updated value — both are the
            // operand's own type either way.
            ty
        }
    }
}

fn validate_member(ctx: &mut ValidationContext, expr: &Expr, object: &Expr, property: &str, computed: bool) -> Type {
    let obj_ty = validate_expr(ctx, object, None);
    if computed {
        return validate_index(ctx, object, &Expr {
            id: expr.id,
            kind: ExprKind::Identifier(property.to_string()),
            range: expr.range,
        });
    }
    // A guard in scope (spec §4.3) narrows this access site to fewer
    // union members than the identifier's static type carries; record
    // it against this particular access so codegen can lower it to a
    // flat `std::get` instead of a `std::visit` (spec §4.5).
    let members = if let ExprKind::Identifier(name) = &object.kind {
        match ctx.scopes.lookup_narrowed(name).cloned() {
            Some(narrowed) => {
                union::record_narrowing(ctx, object.id, narrowed.clone());
                narrowed
            }
            None => obj_ty.union_members(),
        }
    } else {
        obj_ty.union_members()
    };
    if members.len() > 1 {
        // Visitor access across a union: every member must agree on
        // the field's type (spec §4.3 "common member").
        let lookup = |name: &str| ctx.classes.get(name).and_then(|c| c.field_types.get(property));
        match union::common_member_type(&members, lookup) {
            Some(ty) => ty.clone(),
            None => {
                ctx.error(ValidationError::new(
                    ErrorKind::UnionViolation,
                    format!("`{property}` is not a common member of this union"),
                ));
                Type::void()
            }
        }
    } else if let Some(name) = members.first().and_then(|m| m.class_name()) {
        match ctx.classes.get(name).and_then(|c| c.field_types.get(property)).cloned() {
            Some(ty) => ty,
            None => {
                ctx.error(ValidationError::new(
                    ErrorKind::UnknownMember,
                    format!("`{name}` has no member `{property}`"),
                ));
                Type::void()
            }
        }
    } else {
        ctx.error(ValidationError::new(
            ErrorKind::UnknownMember,
            format!("cannot access member `{property}` on this type"),
        ));
        Type::void()
    }
}

fn validate_index(ctx: &mut ValidationContext, object: &Expr, index: &Expr) -> Type {
    let obj_ty = validate_expr(ctx, object, None);
    let _ = validate_expr(ctx, index, None);
    match obj_ty {
        Type::Array { element, .. } => *element,
        Type::Map { value, .. } => *value,
        _ => {
            ctx.error(ValidationError::new(
                ErrorKind::TypeMismatch,
                "indexing requires an array or map",
            ));
            Type::void()
        }
    }
}

fn validate_array(ctx: &mut ValidationContext, elements: &[Expr], expected: Option<&Type>) -> Type {
    let element_expected = match expected {
        Some(Type::Array { element, .. }) => Some((**element).clone()),
        _ => None,
    };
    let mut element_ty = None;
    for e in elements {
        let t = validate_expr(ctx, e, element_expected.as_ref());
        if element_ty.is_none() {
            element_ty = Some(t);
        }
    }
    Type::Array {
        element: Box::new(element_ty.unwrap_or_else(Type::void)),
        length: Some(elements.len() as u64),
    }
}

fn validate_object(
    ctx: &mut ValidationContext,
    expr: &Expr,
    kind: &ObjectLiteralKind,
    class_name: &Option<String>,
    fields: &[crate::ast::ObjectField],
    entries: &[(Expr, Expr)],
    expected: Option<&Type>,
) -> Type {
    match kind {
        ObjectLiteralKind::Map => {
            let (key_expected, value_expected) = match expected {
                Some(Type::Map { key, value }) => (Some((**key).clone()), Some((**value).clone())),
                _ => (None, None),
            };
            let mut kt = None;
            let mut vt = None;
            for (k, v) in entries {
                let k_ty = validate_expr(ctx, k, key_expected.as_ref());
                let v_ty = validate_expr(ctx, v, value_expected.as_ref());
                kt.get_or_insert(k_ty);
                vt.get_or_insert(v_ty);
            }
            Type::Map {
                key: Box::new(kt.unwrap_or_else(Type::void)),
                value: Box::new(vt.unwrap_or_else(Type::void)),
            }
        }
        ObjectLiteralKind::Set => {
            let elem_expected = match expected {
                Some(Type::Set(inner)) => Some((**inner).clone()),
                _ => None,
            };
            let mut et = None;
            for (k, _) in entries {
                let t = validate_expr(ctx, k, elem_expected.as_ref());
                et.get_or_insert(t);
            }
            Type::Set(Box::new(et.unwrap_or_else(Type::void)))
        }
        ObjectLiteralKind::Plain => {
            if let Some(name) = class_name {
                validate_object_fields_for_class(ctx, name, fields);
                return Type::Class {
                    name: name.clone(),
                    type_args: None,
                    readonly: false,
                };
            }
            // Untagged literal against a union target: disambiguate
            // (spec §4.3 "object-literal disambiguation").
            if let Some(expected_ty) = expected {
                let members = expected_ty.union_members();
                if members.len() > 1 {
                    let literal_field_names: Vec<&str> =
                        fields.iter().map(|f| f.name.as_str()).collect();
                    let mut required_fields = std::collections::HashMap::new();
                    let mut discriminant_match = std::collections::HashMap::new();
                    for m in &members {
                        if let Some(cname) = m.class_name() {
                            if let Some(info) = ctx.classes.get(cname) {
                                let required: Vec<String> = info
                                    .decl
                                    .fields
                                    .iter()
                                    .filter(|f| f.init.is_none() && f.const_init.is_none())
                                    .map(|f| f.name.clone())
                                    .collect();
                                required_fields.insert(cname.to_string(), required);
                                discriminant_match.insert(cname.to_string(), true);
                            }
                        }
                    }
                    let selected = union::disambiguate_object_literal(
                        ctx,
                        expr.id,
                        &members,
                        &literal_field_names,
                        &required_fields,
                        &discriminant_match,
                    );
                    if let Some(name) = selected {
                        validate_object_fields_for_class(ctx, &name, fields);
                        return Type::Class {
                            name,
                            type_args: None,
                            readonly: false,
                        };
                    }
                    return Type::void();
                }
            }
            for f in fields {
                validate_expr(ctx, &f.value, None);
            }
            Type::void()
        }
    }
}

fn validate_object_fields_for_class(ctx: &mut ValidationContext, class_name: &str, fields: &[crate::ast::ObjectField]) {
    let field_types = ctx
        .classes
        .get(class_name)
        .map(|c| c.field_types.clone())
        .unwrap_or_default();
    for f in fields {
        let expected_ty = field_types.get(&f.name).cloned();
        validate_expr(ctx, &f.value, expected_ty.as_ref());
        if expected_ty.is_none() {
            ctx.error(ValidationError::new(
                ErrorKind::UnknownMember,
                format!("`{class_name}` has no field `{}`", f.name),
            ));
        }
    }
}

fn validate_positional_object(ctx: &mut ValidationContext, expr: &Expr, class_name: &str, args: &CallArgs) -> Type {
    resolve_call_dispatch(ctx, expr.id, CalleeKind::Constructor(class_name.to_string()), args, &param_types_for_constructor(ctx, class_name));
    Type::Class {
        name: class_name.to_string(),
        type_args: None,
        readonly: false,
    }
}

fn param_types_for_constructor(ctx: &ValidationContext, class_name: &str) -> Vec<(String, Type)> {
    ctx.classes
        .get(class_name)
        .map(|c| match &c.decl.constructor {
            Some(ctor) => ctor
                .params
                .iter()
                .map(|p| (p.name.clone(), c.field_types.get(&p.name).cloned().unwrap_or_else(Type::void)))
                .collect(),
            None => c
                .decl
                .fields
                .iter()
                .map(|f| (f.name.clone(), c.field_types.get(&f.name).cloned().unwrap_or_else(Type::void)))
                .collect(),
        })
        .unwrap_or_default()
}

fn validate_range(ctx: &mut ValidationContext, start: &Expr, end: &Expr) -> Type {
    let st = validate_expr(ctx, start, Some(&Type::int()));
    let et = validate_expr(ctx, end, Some(&Type::int()));
    if !st.structurally_equal(&Type::int()) || !et.structurally_equal(&Type::int()) {
        ctx.error(ValidationError::new(
            ErrorKind::TypeMismatch,
            "range bounds must be int",
        ));
    }
    Type::Array {
        element: Box::new(Type::int()),
        length: None,
    }
}

fn validate_conditional(
    ctx: &mut ValidationContext,
    test: &Expr,
    consequent: &Expr,
    alternate: &Expr,
    expected: Option<&Type>,
) -> Type {
    let test_ty = validate_expr(ctx, test, Some(&Type::bool_()));
    require_bool(ctx, &test_ty);
    let ct = validate_expr(ctx, consequent, expected);
    let at = validate_expr(ctx, alternate, expected);
    if ct.structurally_equal(&at) {
        ct
    } else {
        Type::Union(vec![ct, at]).canonicalize()
    }
}

fn validate_interpolated_string(ctx: &mut ValidationContext, parts: &[InterpolatedPart]) -> Type {
    for part in parts {
        if let InterpolatedPart::Expr(e) = part {
            validate_expr(ctx, e, None);
        }
    }
    Type::string()
}

fn validate_lambda(
    ctx: &mut ValidationContext,
    params: &[crate::ast::LambdaParam],
    return_ty: &Option<crate::ast::TypeAnnotation>,
    body: &crate::ast::LambdaBody,
    expected: Option<&Type>,
) -> Type {
    let expected_fn = match expected {
        Some(Type::Function { params, ret, .. }) => Some((params.clone(), (**ret).clone())),
        _ => None,
    };

    ctx.scopes.push();
    let mut param_types = Vec::new();
    for (i, p) in params.iter().enumerate() {
        let ty = if let Some(ann) = &p.ty {
            ctx.resolve_type(ann)
        } else if let Some((expected_params, _)) = &expected_fn {
            expected_params.get(i).cloned().unwrap_or_else(Type::void)
        } else {
            Type::void()
        };
        ctx.scopes.declare_typed(&p.name, ty.clone(), crate::context::AssignState::Assigned);
        param_types.push(ty);
    }

    let ret_expected = return_ty
        .as_ref()
        .map(|ann| ctx.resolve_type(ann))
        .or_else(|| expected_fn.as_ref().map(|(_, ret)| ret.clone()));

    let ret_ty = match body {
        crate::ast::LambdaBody::Expr(e) => validate_expr(ctx, e, ret_expected.as_ref()),
        crate::ast::LambdaBody::Block(block) => {
            super::stmt::validate_block(ctx, block, ret_expected.as_ref());
            ret_expected.unwrap_or_else(Type::void)
        }
    };
    ctx.scopes.pop();

    Type::Function {
        params: param_types,
        ret: Box::new(ret_ty),
        concise: matches!(body, crate::ast::LambdaBody::Expr(_)),
    }
}

fn validate_enum_shorthand(ctx: &mut ValidationContext, member: &str, expected: Option<&Type>) -> Type {
    match expected {
        Some(Type::Enum(name)) => {
            let exists = ctx
                .enums
                .get(name)
                .map(|e| e.decl.members.iter().any(|m| m.name == member))
                .unwrap_or(false);
            if !exists {
                ctx.error(ValidationError::new(
                    ErrorKind::UnknownMember,
                    format!("enum `{name}` has no member `{member}`"),
                ));
            }
            Type::Enum(name.clone())
        }
        _ => {
            ctx.error(ValidationError::new(
                ErrorKind::UnknownIdentifier,
                "enum shorthand requires a known enum-typed context",
            ));
            Type::void()
        }
    }
}

fn validate_is(ctx: &mut ValidationContext, expr: &Expr, value: &Expr, type_ann: &crate::ast::TypeAnnotation) -> Type {
    let value_ty = validate_expr(ctx, value, None);
    let guard_ty = ctx.resolve_type(type_ann);
    if !types::narrowing_compatible(&value_ty, &guard_ty) {
        ctx.error(ValidationError::new(
            ErrorKind::NarrowingViolation,
            "`is` guard can never be true for this static type",
        ));
    } else {
        let (then_members, _) = union::narrow_by_type_guard(&value_ty, &guard_ty);
        union::record_narrowing(ctx, expr.id, then_members);
    }
    Type::bool_()
}

/// Resolve named/positional argument reordering and record the call's
/// dispatch plan (spec §4.2 "call dispatch"). `params` is the
/// callee's declared `(name, type)` list in declaration order.
pub fn resolve_call_dispatch(
    ctx: &mut ValidationContext,
    node: crate::ast::NodeId,
    callee: CalleeKind,
    args: &CallArgs,
    params: &[(String, Type)],
) -> Vec<Type> {
    let mut order: Vec<Option<usize>> = vec![None; params.len()];
    let mut needs_temporaries = false;

    for (i, _) in args.positional.iter().enumerate() {
        if i < order.len() {
            order[i] = Some(i);
        }
    }

    let mut seen_names = std::collections::HashSet::new();
    for named in &args.named {
        if !seen_names.insert(named.name.clone()) {
            ctx.error(ValidationError::new(
                ErrorKind::ArityOrNamedArgument,
                format!("duplicate named argument `{}`", named.name),
            ));
            continue;
        }
        match params.iter().position(|(n, _)| n == &named.name) {
            Some(idx) => {
                if idx < args.positional.len() {
                    ctx.error(ValidationError::new(
                        ErrorKind::ArityOrNamedArgument,
                        format!("named argument `{}` collides with a positional argument", named.name),
                    ));
                } else {
                    order[idx] = Some(args.positional.len() + seen_names.len() - 1);
                }
            }
            None => {
                ctx.error(ValidationError::new(
                    ErrorKind::ArityOrNamedArgument,
                    format!("no parameter named `{}`", named.name),
                ));
            }
        }
    }

    for (idx, slot) in order.iter().enumerate() {
        if slot.is_none() {
            ctx.error(ValidationError::new(
                ErrorKind::ArityOrNamedArgument,
                format!("missing required argument `{}`", params[idx].0),
            ));
        }
    }

    let is_reordered = order
        .iter()
        .enumerate()
        .any(|(i, slot)| *slot != Some(i) && slot.is_some());
    if is_reordered {
        let all_args: Vec<&Expr> = args
            .positional
            .iter()
            .chain(args.named.iter().map(|n| &n.value))
            .collect();
        needs_temporaries = all_args.iter().any(|e| !is_side_effect_free(e));
    }

    let mut result_types = Vec::new();
    for (idx, (_, expected_ty)) in params.iter().enumerate() {
        let arg_expr = if idx < args.positional.len() {
            Some(&args.positional[idx])
        } else {
            args.named
                .iter()
                .find(|n| params[idx].0 == n.name)
                .map(|n| &n.value)
        };
        if let Some(e) = arg_expr {
            result_types.push(validate_expr(ctx, e, Some(expected_ty)));
        }
    }

    let argument_order: Vec<usize> = order.into_iter().flatten().collect();
    ctx.hints.call_dispatch.insert(
        node,
        CallDispatchRecord {
            callee,
            argument_order,
            needs_temporaries,
        },
    );
    result_types
}

fn validate_call(ctx: &mut ValidationContext, expr: &Expr, callee: &Expr, args: &CallArgs) -> Type {
    let ExprKind::Identifier(name) = &callee.kind else {
        // `ClassName.fromJSON(text)`: a static deserializer call, not
        // an instance method call — the callee's object is a class
        // name, never a variable, so it must not be validated as an
        // identifier expression (spec §4.5 "jsonFromTypes").
        if let ExprKind::Member { object, property, computed: false } = &callee.kind {
            if property == "fromJSON" {
                if let ExprKind::Identifier(class_name) = &object.kind {
                    if ctx.classes.contains_key(class_name) {
                        let class_name = class_name.clone();
                        for a in &args.positional {
                            validate_expr(ctx, a, None);
                        }
                        for a in &args.named {
                            validate_expr(ctx, &a.value, None);
                        }
                        mark_json_reachable(&ctx.classes, &mut ctx.hints.json_from_types, &Type::Class {
                            name: class_name.clone(),
                            type_args: None,
                            readonly: false,
                        });
                        ctx.hints.call_dispatch.insert(
                            expr.id,
                            CallDispatchRecord {
                                callee: CalleeKind::Method {
                                    class_name: class_name.clone(),
                                    method_name: "fromJSON".to_string(),
                                },
                                argument_order: (0..args.positional.len() + args.named.len()).collect(),
                                needs_temporaries: false,
                            },
                        );
                        return Type::Class { name: class_name, type_args: None, readonly: false };
                    }
                }
            }
        }
        // Method call `obj.method(...)` or a computed callee: type the
        // callee but fall back to builtin dispatch without a known
        // param list (backends still get a record; arity isn't checked
        // against a declared signature we don't have here).
        if let ExprKind::Member { object, property, computed: false } = &callee.kind {
            let obj_ty = validate_expr(ctx, object, None);
            for a in &args.positional {
                validate_expr(ctx, a, None);
            }
            for a in &args.named {
                validate_expr(ctx, &a.value, None);
            }
            let class_name = obj_ty.class_name().unwrap_or("").to_string();
            ctx.hints.call_dispatch.insert(
                expr.id,
                CallDispatchRecord {
                    callee: CalleeKind::Method {
                        class_name,
                        method_name: property.clone(),
                    },
                    argument_order: (0..args.positional.len() + args.named.len()).collect(),
                    needs_temporaries: false,
                },
            );
            return Type::void();
        }
        validate_expr(ctx, callee, None);
        for a in &args.positional {
            validate_expr(ctx, a, None);
        }
        return Type::void();
    };

    if let Some(func) = ctx.functions.get(name).cloned() {
        let params: Vec<(String, Type)> = func
            .decl
            .params
            .iter()
            .zip(func.param_types.iter())
            .map(|(p, t)| (p.name.clone(), t.clone()))
            .collect();
        resolve_call_dispatch(ctx, expr.id, CalleeKind::Function(name.clone()), args, &params);
        return func.return_type.clone();
    }

    // Unknown callee: assume a builtin (spec §4.2 "resolved callee ...
    // or builtin"); still type the arguments for follow-on errors.
    let arg_types: Vec<Type> = args
        .positional
        .iter()
        .map(|a| validate_expr(ctx, a, None))
        .collect();
    for a in &args.named {
        validate_expr(ctx, &a.value, None);
    }
    // `println(x)` marks every class reachable from `x`'s static type
    // for `_toJSON` emission (spec §4.5 "jsonPrintTypes").
    if name == "println" {
        for ty in &arg_types {
            mark_json_reachable(&ctx.classes, &mut ctx.hints.json_print_types, ty);
        }
    }
    ctx.hints.call_dispatch.insert(
        expr.id,
        CallDispatchRecord {
            callee: CalleeKind::Builtin(name.clone()),
            argument_order: (0..args.positional.len() + args.named.len()).collect(),
            needs_temporaries: false,
        },
    );
    Type::void()
}

/// Walk a type reachable through fields, array/set elements, map
/// values, and union members, inserting every class name found into
/// `target` (spec §4.5 "jsonPrintTypes"/"jsonFromTypes"). A visited
/// set keeps self-referential and cyclic class graphs terminating.
fn mark_json_reachable(
    classes: &std::collections::HashMap<String, crate::context::ClassInfo>,
    target: &mut std::collections::HashSet<String>,
    ty: &Type,
) {
    let mut visited = std::collections::HashSet::new();
    mark_json_reachable_visit(classes, target, ty, &mut visited);
}

fn mark_json_reachable_visit(
    classes: &std::collections::HashMap<String, crate::context::ClassInfo>,
    target: &mut std::collections::HashSet<String>,
    ty: &Type,
    visited: &mut std::collections::HashSet<String>,
) {
    match ty {
        Type::Class { name, .. } => {
            if !visited.insert(name.clone()) {
                return;
            }
            target.insert(name.clone());
            if let Some(info) = classes.get(name) {
                for field_ty in info.field_types.values() {
                    mark_json_reachable_visit(classes, target, field_ty, visited);
                }
            }
        }
        Type::WeakClass { name } => {
            if !visited.insert(name.clone()) {
                return;
            }
            target.insert(name.clone());
        }
        Type::Array { element, .. } | Type::Set(element) => {
            mark_json_reachable_visit(classes, target, element, visited);
        }
        Type::Map { value, .. } => mark_json_reachable_visit(classes, target, value, visited),
        Type::Union(members) => {
            for m in members {
                mark_json_reachable_visit(classes, target, m, visited);
            }
        }
        Type::Nullable(inner) => mark_json_reachable_visit(classes, target, inner, visited),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, ExprKind, TextRange};
    use rstest::rstest;

    fn lit_expr(lit: Literal) -> Expr {
        Expr {
            id: crate::ast::NodeIdGen::new().fresh(),
            kind: ExprKind::Literal(lit),
            range: TextRange::default(),
        }
    }

    #[rstest]
    #[case(Literal::Int(1), Type::int())]
    #[case(Literal::Bool(true), Type::bool_())]
    #[case(Literal::Str("x".into()), Type::string())]
    fn literal_types(#[case] lit: Literal, #[case] expected: Type) {
        let mut ctx = ValidationContext::new("test.doof");
        let e = lit_expr(lit);
        let ty = validate_expr(&mut ctx, &e, None);
        assert_eq!(ty, expected);
        assert!(ctx.errors.is_empty());
    }

    #[test]
    fn int_literal_widens_to_expected_float() {
        let mut ctx = ValidationContext::new("test.doof");
        let e = lit_expr(Literal::Int(1));
        let ty = validate_expr(&mut ctx, &e, Some(&Type::Primitive(Primitive::Float)));
        assert_eq!(ty, Type::Primitive(Primitive::Float));
    }

    #[test]
    fn unknown_identifier_errors() {
        let mut ctx = ValidationContext::new("test.doof");
        let e = Expr {
            id: crate::ast::NodeIdGen::new().fresh(),
            kind: ExprKind::Identifier("nope".into()),
            range: TextRange::default(),
        };
        validate_expr(&mut ctx, &e, None);
        assert_eq!(ctx.errors.len(), 1);
        assert_eq!(ctx.errors[0].kind, ErrorKind::UnknownIdentifier);
    }

    #[test]
    fn side_effect_predicate_trusts_only_literals_and_identifiers() {
        let lit = lit_expr(Literal::Int(1));
        assert!(is_side_effect_free(&lit));
        let ident = Expr {
            id: crate::ast::NodeIdGen::new().fresh(),
            kind: ExprKind::Identifier("x".into()),
            range: TextRange::default(),
        };
        assert!(is_side_effect_free(&ident));
        let call = Expr {
            id: crate::ast::NodeIdGen::new().fresh(),
            kind: ExprKind::Call {
                callee: Box::new(ident.clone()),
                args: CallArgs { positional: vec![], named: vec![], explicit_type_args: None },
            },
            range: TextRange::default(),
        };
        assert!(!is_side_effect_free(&call));
    }
}
