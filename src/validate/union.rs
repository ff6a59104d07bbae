//! Union resolution and narrowing (spec §4.3).

use std::collections::HashMap;

use crate::ast::{BinOp, Expr, ExprKind, Literal, NodeId, TypeAnnotation};
use crate::context::{NarrowingRecord, ObjectInstantiationRecord, ValidationContext};
use crate::diagnostics::{ErrorKind, ValidationError};
use crate::types::Type;

/// Validate union-member invariants (spec §3.1, §4.3): duplicate
/// members are an error; the caller is expected to have already run
/// `Type::canonicalize` for the *accepted* form, this function exists
/// to catch the pre-canonicalization duplicate that canonicalization
/// would otherwise silently absorb.
pub fn check_no_duplicate_members(ctx: &mut ValidationContext, members: &[Type]) {
    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            if members[i].structurally_equal(&members[j]) {
                ctx.error(ValidationError::new(
                    ErrorKind::UnionViolation,
                    format!("duplicate union member `{:?}`", members[i]),
                ));
            }
        }
    }
}

/// Boolean-lattice narrowing state threaded through `&&`/`||` chains
/// (spec §4.3: "these combine using standard boolean-lattice
/// intersection/union").
#[derive(Debug, Clone)]
pub struct NarrowingState {
    /// Per-variable-name narrowed member sets, for the then/true path.
    pub then_narrowed: HashMap<String, Vec<Type>>,
    /// Per-variable-name narrowed member sets, for the else/false path.
    pub else_narrowed: HashMap<String, Vec<Type>>,
}

impl NarrowingState {
    pub fn empty() -> Self {
        Self {
            then_narrowed: HashMap::new(),
            else_narrowed: HashMap::new(),
        }
    }

    /// `a && b`: then-branch narrowing intersects, else-branch is the
    /// union (either refutation suffices to fail the conjunction).
    pub fn intersect_then(a: &NarrowingState, b: &NarrowingState) -> NarrowingState {
        let mut then_narrowed = a.then_narrowed.clone();
        for (name, members) in &b.then_narrowed {
            then_narrowed
                .entry(name.clone())
                .and_modify(|existing| {
                    existing.retain(|m| members.iter().any(|n| n.structurally_equal(m)));
                })
                .or_insert_with(|| members.clone());
        }
        NarrowingState {
            then_narrowed,
            else_narrowed: HashMap::new(),
        }
    }

    /// `a || b`: else-branch narrowing intersects (both must fail),
    /// then-branch is left unmerged since either disjunct may hold.
    pub fn union_else(a: &NarrowingState, b: &NarrowingState) -> NarrowingState {
        let mut else_narrowed = a.else_narrowed.clone();
        for (name, members) in &b.else_narrowed {
            else_narrowed
                .entry(name.clone())
                .and_modify(|existing| {
                    existing.retain(|m| members.iter().any(|n| n.structurally_equal(m)));
                })
                .or_insert_with(|| members.clone());
        }
        NarrowingState {
            then_narrowed: HashMap::new(),
            else_narrowed,
        }
    }
}

/// Narrow a union by a discriminant equality `x.d == L` (spec §4.3).
/// Returns `(then_members, else_members)`.
pub fn narrow_by_discriminant_equality(
    union_members: &[Type],
    discriminant_field: &str,
    class_discriminants: &HashMap<String, Option<Literal>>,
    literal: &Literal,
) -> (Vec<Type>, Vec<Type>) {
    let mut then_members = Vec::new();
    let mut else_members = Vec::new();
    for member in union_members {
        let matches = member
            .class_name()
            .and_then(|name| class_discriminants.get(name))
            .and_then(|d| d.as_ref())
            .map(|lit| literal_eq(lit, literal))
            .unwrap_or(false);
        // A member lacking this discriminant_field entirely stays
        // ambiguous on both sides — conservative per spec intent.
        let has_field = discriminant_field
            .is_empty()
            .then_some(false)
            .unwrap_or(true);
        if matches {
            then_members.push(member.clone());
        } else if has_field {
            else_members.push(member.clone());
        }
    }
    (then_members, else_members)
}

fn literal_eq(a: &Literal, b: &Literal) -> bool {
    match (a, b) {
        (Literal::Int(x), Literal::Int(y)) => x == y,
        (Literal::Str(x), Literal::Str(y)) => x == y,
        (Literal::Bool(x), Literal::Bool(y)) => x == y,
        (Literal::Char(x), Literal::Char(y)) => x == y,
        _ => false,
    }
}

/// Narrow by `is T` (type identity) or `== null`/`!= null`
/// (nullability). Returns `(then_members, else_members)`.
pub fn narrow_by_type_guard(static_ty: &Type, guard_ty: &Type) -> (Vec<Type>, Vec<Type>) {
    let members = static_ty.union_members();
    let then: Vec<Type> = members
        .iter()
        .filter(|m| m.structurally_equal(guard_ty))
        .cloned()
        .collect();
    let els: Vec<Type> = members
        .iter()
        .filter(|m| !m.structurally_equal(guard_ty))
        .cloned()
        .collect();
    (then, els)
}

/// Record a narrowing outcome against an AST node (spec §4.3
/// "narrowing records are per-AST-node").
pub fn record_narrowing(ctx: &mut ValidationContext, node: NodeId, members: Vec<Type>) {
    ctx.hints
        .narrowing
        .insert(node, NarrowingRecord { narrowed_members: members });
}

/// Does `x.p` type uniformly across every member of a union (spec
/// §4.3 "visitor access")? If so, returns that common type.
pub fn common_member_type<'a>(
    union_members: &'a [Type],
    field_lookup: impl Fn(&str) -> Option<&'a Type>,
) -> Option<&'a Type> {
    let mut common: Option<&Type> = None;
    for member in union_members {
        let name = member.class_name()?;
        let ty = field_lookup(name)?;
        match common {
            None => common = Some(ty),
            Some(existing) if existing.structurally_equal(ty) => {}
            Some(_) => return None,
        }
    }
    common
}

/// Disambiguate an untagged object literal against a union of classes
/// (spec §4.3 "object-literal disambiguation").
pub fn disambiguate_object_literal(
    ctx: &mut ValidationContext,
    node: NodeId,
    union_members: &[Type],
    literal_fields: &[&str],
    class_required_fields: &HashMap<String, Vec<String>>,
    class_discriminant_match: &HashMap<String, bool>,
) -> Option<String> {
    let candidates: Vec<&str> = union_members
        .iter()
        .filter_map(|m| m.class_name())
        .filter(|name| {
            let required_ok = class_required_fields
                .get(*name)
                .map(|req| req.iter().all(|f| literal_fields.contains(&f.as_str())))
                .unwrap_or(true);
            let discriminant_ok = class_discriminant_match.get(*name).copied().unwrap_or(true);
            required_ok && discriminant_ok
        })
        .collect();

    match candidates.len() {
        0 => {
            ctx.error(ValidationError::new(
                ErrorKind::UnionViolation,
                "object literal matches no union variant",
            ));
            None
        }
        1 => {
            let selected = candidates[0].to_string();
            ctx.hints.object_instantiation.insert(
                node,
                ObjectInstantiationRecord {
                    selected_class: selected.clone(),
                },
            );
            Some(selected)
        }
        _ => {
            ctx.error(ValidationError::new(
                ErrorKind::UnionViolation,
                "object literal is ambiguous between multiple union variants",
            ));
            None
        }
    }
}

/// Derive the per-variable narrowing a boolean condition establishes
/// (spec §4.3): a bare `is` guard or discriminant-equality test
/// narrows its guarded identifier directly, `&&`/`||` compose their
/// operands' narrowing states through the boolean lattice. Anything
/// else establishes no narrowing.
pub fn narrowing_state_for_condition(ctx: &mut ValidationContext, expr: &Expr) -> NarrowingState {
    match &expr.kind {
        ExprKind::Binary { op: BinOp::And, left, right } => {
            let a = narrowing_state_for_condition(ctx, left);
            let b = narrowing_state_for_condition(ctx, right);
            NarrowingState::intersect_then(&a, &b)
        }
        ExprKind::Binary { op: BinOp::Or, left, right } => {
            let a = narrowing_state_for_condition(ctx, left);
            let b = narrowing_state_for_condition(ctx, right);
            NarrowingState::union_else(&a, &b)
        }
        ExprKind::Is { value, type_ann } => narrow_identifier_by_guard(ctx, value, type_ann),
        _ => narrow_identifier_by_discriminant(ctx, expr),
    }
}

fn narrow_identifier_by_guard(ctx: &mut ValidationContext, value: &Expr, type_ann: &TypeAnnotation) -> NarrowingState {
    let ExprKind::Identifier(name) = &value.kind else {
        return NarrowingState::empty();
    };
    let Some(static_ty) = ctx.scopes.lookup_type(name).cloned() else {
        return NarrowingState::empty();
    };
    let guard_ty = ctx.resolve_type(type_ann);
    let (then_members, else_members) = narrow_by_type_guard(&static_ty, &guard_ty);
    let mut state = NarrowingState::empty();
    state.then_narrowed.insert(name.clone(), then_members);
    state.else_narrowed.insert(name.clone(), else_members);
    state
}

fn narrow_identifier_by_discriminant(ctx: &mut ValidationContext, expr: &Expr) -> NarrowingState {
    let Some((name, field, literal)) = as_discriminant_equality(expr) else {
        return NarrowingState::empty();
    };
    let (name, field, literal) = (name.to_string(), field.to_string(), literal.clone());
    let Some(static_ty) = ctx.scopes.lookup_type(&name).cloned() else {
        return NarrowingState::empty();
    };
    let members = static_ty.union_members();
    let mut class_discriminants = HashMap::new();
    for member in &members {
        if let Some(cname) = member.class_name() {
            let literal = ctx
                .classes
                .get(cname)
                .and_then(|c| c.decl.fields.iter().find(|f| f.name == field))
                .and_then(|f| f.const_init.clone());
            class_discriminants.insert(cname.to_string(), literal);
        }
    }
    let (then_members, else_members) =
        narrow_by_discriminant_equality(&members, &field, &class_discriminants, &literal);
    let mut state = NarrowingState::empty();
    state.then_narrowed.insert(name.clone(), then_members);
    state.else_narrowed.insert(name, else_members);
    state
}

/// Is `expr` a discriminant-equality test `x.d == L`? Returns the
/// guarded variable name, discriminant field, and literal if so.
pub fn as_discriminant_equality(expr: &Expr) -> Option<(&str, &str, &Literal)> {
    if let ExprKind::Binary { op: BinOp::Eq, left, right } = &expr.kind {
        if let (
            ExprKind::Member { object, property, computed: false },
            ExprKind::Literal(lit),
        ) = (&left.kind, &right.kind)
        {
            if let ExprKind::Identifier(name) = &object.kind {
                return Some((name, property, lit));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adult() -> Type {
        Type::Class {
            name: "Adult".into(),
            type_args: None,
            readonly: false,
        }
    }
    fn child() -> Type {
        Type::Class {
            name: "Child".into(),
            type_args: None,
            readonly: false,
        }
    }

    #[test]
    fn discriminant_equality_splits_then_else() {
        let mut discs = HashMap::new();
        discs.insert("Adult".to_string(), Some(Literal::Str("Adult".into())));
        discs.insert("Child".to_string(), Some(Literal::Str("Child".into())));
        let (then, els) = narrow_by_discriminant_equality(
            &[adult(), child()],
            "kind",
            &discs,
            &Literal::Str("Adult".into()),
        );
        assert_eq!(then, vec![adult()]);
        assert_eq!(els, vec![child()]);
    }

    #[test]
    fn type_guard_narrows_to_single_member() {
        let (then, els) = narrow_by_type_guard(&Type::Union(vec![adult(), child()]), &adult());
        assert_eq!(then, vec![adult()]);
        assert_eq!(els, vec![child()]);
    }

    #[test]
    fn common_member_type_requires_identical_type_everywhere() {
        let a_fields: HashMap<&str, Type> =
            HashMap::from([("kind", Type::string())]);
        let c_fields: HashMap<&str, Type> =
            HashMap::from([("kind", Type::string())]);
        let lookup = |name: &str| -> Option<&Type> {
            match name {
                "Adult" => a_fields.get("kind"),
                "Child" => c_fields.get("kind"),
                _ => None,
            }
        };
        let result = common_member_type(&[adult(), child()], lookup);
        assert!(result.is_some());
    }
}
