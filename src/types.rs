//! The type model (spec §3.1, §4.1): a closed lattice of type variants
//! plus the three relations backends and the validator consult —
//! structural equality, assignability, and narrowing-compatibility.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int,
    Float,
    Double,
    Bool,
    String,
    Char,
    Void,
    Null,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Bool => "bool",
            Primitive::String => "string",
            Primitive::Char => "char",
            Primitive::Void => "void",
            Primitive::Null => "null",
        };
        f.write_str(s)
    }
}

/// A type. Unions are kept ordered (insertion order after dedup) so
/// that variant-index assignment in the C++/VM backends is stable.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Primitive(Primitive),
    Array {
        element: Box<Type>,
        length: Option<u64>,
    },
    Map {
        key: Box<Type>,
        value: Box<Type>,
    },
    Set(Box<Type>),
    Class {
        name: String,
        type_args: Option<Vec<Type>>,
        readonly: bool,
    },
    /// A `weak C` reference; only ever appears as a field type.
    WeakClass {
        name: String,
    },
    Enum(String),
    /// Always canonical: len >= 2, no duplicates, never itself nested.
    Union(Vec<Type>),
    Function {
        params: Vec<Type>,
        ret: Box<Type>,
        concise: bool,
    },
    /// Sugar for `Union([T, Null])`; canonicalization folds both
    /// directions so either form may appear pre-canonicalization.
    Nullable(Box<Type>),
    TypeAlias {
        name: String,
        type_args: Option<Vec<Type>>,
    },
    TypeParameter(String),
}

impl Type {
    pub fn int() -> Type {
        Type::Primitive(Primitive::Int)
    }
    pub fn bool_() -> Type {
        Type::Primitive(Primitive::Bool)
    }
    pub fn string() -> Type {
        Type::Primitive(Primitive::String)
    }
    pub fn void() -> Type {
        Type::Primitive(Primitive::Void)
    }
    pub fn null() -> Type {
        Type::Primitive(Primitive::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Type::Primitive(Primitive::Null))
    }

    pub fn is_class(&self) -> bool {
        matches!(self, Type::Class { .. })
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Class { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Reduce a type to normal form: flatten nested unions, dedup
    /// members (structural equality), collapse a single-member union
    /// to that member, and fold a two-member `{T, null}` union (in
    /// either direction) to the canonical `Nullable(T)` form.
    pub fn canonicalize(&self) -> Type {
        match self {
            Type::Nullable(inner) => {
                let inner = inner.canonicalize();
                if inner.is_null() {
                    // `null | null` degenerates to null itself.
                    return Type::null();
                }
                Type::Nullable(Box::new(inner))
            }
            Type::Union(members) => {
                let mut flat = Vec::new();
                flatten_union(members, &mut flat);
                let mut deduped: Vec<Type> = Vec::new();
                for m in flat {
                    if !deduped.iter().any(|d| d.structurally_equal(&m)) {
                        deduped.push(m);
                    }
                }
                match deduped.len() {
                    0 => Type::void(),
                    1 => deduped.into_iter().next().unwrap(),
                    2 if deduped.iter().any(|t| t.is_null()) => {
                        let non_null = deduped.into_iter().find(|t| !t.is_null()).unwrap();
                        Type::Nullable(Box::new(non_null))
                    }
                    _ => Type::Union(deduped),
                }
            }
            Type::Array { element, length } => Type::Array {
                element: Box::new(element.canonicalize()),
                length: *length,
            },
            Type::Map { key, value } => Type::Map {
                key: Box::new(key.canonicalize()),
                value: Box::new(value.canonicalize()),
            },
            Type::Set(elem) => Type::Set(Box::new(elem.canonicalize())),
            other => other.clone(),
        }
    }

    /// Structural equality per spec §4.1: classes compare by canonical
    /// name, unions compare as sets of members.
    pub fn structurally_equal(&self, other: &Type) -> bool {
        let a = self.canonicalize();
        let b = other.canonicalize();
        types_equal(&a, &b)
    }

    /// Does `target` accept a value whose readonly collection/map
    /// storage would be mutated through it? Used by the readonly
    /// propagation check, not assignability itself.
    pub fn is_readonly(&self) -> bool {
        matches!(self, Type::Class { readonly: true, .. })
    }

    /// Every union member, recursing through a canonical Nullable into
    /// `[inner, null]`. Non-union types yield a single-element slice.
    pub fn union_members(&self) -> Vec<Type> {
        match self.canonicalize() {
            Type::Union(members) => members,
            Type::Nullable(inner) => vec![*inner, Type::null()],
            other => vec![other],
        }
    }
}

fn flatten_union(members: &[Type], out: &mut Vec<Type>) {
    for m in members {
        match m.canonicalize() {
            Type::Union(inner) => flatten_union(&inner, out),
            Type::Nullable(inner) => {
                out.push(*inner);
                out.push(Type::null());
            }
            other => out.push(other),
        }
    }
}

fn types_equal(a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Primitive(x), Type::Primitive(y)) => x == y,
        (
            Type::Array {
                element: e1,
                length: l1,
            },
            Type::Array {
                element: e2,
                length: l2,
            },
        ) => l1 == l2 && types_equal(e1, e2),
        (
            Type::Map {
                key: k1,
                value: v1,
            },
            Type::Map {
                key: k2,
                value: v2,
            },
        ) => types_equal(k1, k2) && types_equal(v1, v2),
        (Type::Set(e1), Type::Set(e2)) => types_equal(e1, e2),
        (
            Type::Class {
                name: n1,
                type_args: ta1,
                ..
            },
            Type::Class {
                name: n2,
                type_args: ta2,
                ..
            },
        ) => n1 == n2 && type_args_equal(ta1, ta2),
        (Type::WeakClass { name: n1 }, Type::WeakClass { name: n2 }) => n1 == n2,
        (Type::Enum(n1), Type::Enum(n2)) => n1 == n2,
        (Type::Union(m1), Type::Union(m2)) => {
            m1.len() == m2.len()
                && m1
                    .iter()
                    .all(|x| m2.iter().any(|y| types_equal(x, y)))
        }
        (
            Type::Function {
                params: p1,
                ret: r1,
                ..
            },
            Type::Function {
                params: p2,
                ret: r2,
                ..
            },
        ) => {
            p1.len() == p2.len()
                && p1.iter().zip(p2.iter()).all(|(a, b)| types_equal(a, b))
                && types_equal(r1, r2)
        }
        (Type::Nullable(i1), Type::Nullable(i2)) => types_equal(i1, i2),
        (
            Type::TypeAlias {
                name: n1,
                type_args: ta1,
            },
            Type::TypeAlias {
                name: n2,
                type_args: ta2,
            },
        ) => n1 == n2 && type_args_equal(ta1, ta2),
        (Type::TypeParameter(n1), Type::TypeParameter(n2)) => n1 == n2,
        _ => false,
    }
}

fn type_args_equal(a: &Option<Vec<Type>>, b: &Option<Vec<Type>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| types_equal(a, b))
        }
        _ => false,
    }
}

/// Is `source` assignable to `target`? `source_is_literal` marks
/// untyped numeric/collection literal sites, which get extra widening
/// leeway per spec §4.1.
pub fn is_assignable(target: &Type, source: &Type, source_is_literal: bool) -> bool {
    let target = target.canonicalize();
    let source = source.canonicalize();

    if types_equal(&target, &source) {
        return true;
    }

    // null only flows into nullable targets.
    if source.is_null() {
        return matches!(target, Type::Nullable(_));
    }

    match &target {
        Type::Nullable(inner) => is_assignable(inner, &source, source_is_literal),
        Type::Union(members) => members
            .iter()
            .any(|m| is_assignable(m, &source, source_is_literal)),
        Type::Primitive(Primitive::Float) | Type::Primitive(Primitive::Double) => {
            source_is_literal && matches!(source, Type::Primitive(Primitive::Int))
        }
        Type::Primitive(Primitive::Int) => {
            source_is_literal && matches!(source, Type::Primitive(Primitive::Int))
        }
        Type::Class {
            readonly: target_readonly,
            name: target_name,
            ..
        } => match &source {
            Type::Class {
                readonly: source_readonly,
                name: source_name,
                ..
            } => {
                target_name == source_name && (*target_readonly || !*source_readonly)
            }
            _ => false,
        },
        Type::Array {
            element: te,
            ..
        } => match &source {
            Type::Array { element: se, .. } => {
                // A readonly array cannot receive a mutable array's storage
                // as a *target*, but literal/mutable sources may flow into
                // a readonly-typed parameter (spec §4.1).
                is_assignable(te, se, false)
            }
            _ => false,
        },
        Type::Map { key: tk, value: tv } => match &source {
            Type::Map { key: sk, value: sv } => {
                is_assignable(tk, sk, false) && is_assignable(tv, sv, false)
            }
            _ => false,
        },
        Type::Set(te) => match &source {
            Type::Set(se) => is_assignable(te, se, false),
            _ => false,
        },
        _ => false,
    }
}

/// Is a `readonly`-tainted source forbidden from flowing into a
/// mutable-collection target? Spec §4.1: "forbids assignment from
/// `readonly` collection to a mutable-collection target".
pub fn violates_readonly_discipline(target: &Type, source: &Type) -> bool {
    match (target, source) {
        (Type::Class { readonly: false, name: tn, .. }, Type::Class { readonly: true, name: sn, .. }) => {
            tn == sn
        }
        _ => false,
    }
}

/// `x is T` narrowing-compatibility (spec §4.1): only meaningful when
/// `T` is a member of `x`'s static union, or `T = null` against a
/// nullable `x`.
pub fn narrowing_compatible(x_static: &Type, guard_ty: &Type) -> bool {
    let x_static = x_static.canonicalize();
    let guard_ty = guard_ty.canonicalize();

    if guard_ty.is_null() {
        return matches!(x_static, Type::Nullable(_));
    }

    match &x_static {
        Type::Union(members) => members.iter().any(|m| m.structurally_equal(&guard_ty)),
        Type::Nullable(inner) => inner.structurally_equal(&guard_ty),
        other => other.structurally_equal(&guard_ty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_member_union_collapses() {
        let t = Type::Union(vec![Type::int()]).canonicalize();
        assert_eq!(t, Type::int());
    }

    #[test]
    fn union_with_null_and_one_class_is_nullable_pointer() {
        let t = Type::Union(vec![
            Type::Class {
                name: "Widget".into(),
                type_args: None,
                readonly: false,
            },
            Type::null(),
        ])
        .canonicalize();
        assert!(matches!(t, Type::Nullable(_)));
    }

    #[test]
    fn duplicate_union_members_dedup() {
        let t = Type::Union(vec![Type::int(), Type::int(), Type::bool_()]).canonicalize();
        match t {
            Type::Union(members) => assert_eq!(members.len(), 2),
            _ => panic!("expected union"),
        }
    }

    #[test]
    fn int_literal_assignable_to_float() {
        assert!(is_assignable(
            &Type::Primitive(Primitive::Float),
            &Type::int(),
            true
        ));
        assert!(!is_assignable(
            &Type::Primitive(Primitive::Float),
            &Type::int(),
            false
        ));
    }

    #[test]
    fn null_only_assignable_to_nullable() {
        assert!(!is_assignable(&Type::int(), &Type::null(), false));
        let nullable_int = Type::Nullable(Box::new(Type::int()));
        assert!(is_assignable(&nullable_int, &Type::null(), false));
    }

    #[test]
    fn narrowing_requires_union_membership() {
        let union = Type::Union(vec![
            Type::Class {
                name: "Adult".into(),
                type_args: None,
                readonly: false,
            },
            Type::Class {
                name: "Child".into(),
                type_args: None,
                readonly: false,
            },
        ]);
        let adult = Type::Class {
            name: "Adult".into(),
            type_args: None,
            readonly: false,
        };
        assert!(narrowing_compatible(&union, &adult));
        let other = Type::Class {
            name: "Stranger".into(),
            type_args: None,
            readonly: false,
        };
        assert!(!narrowing_compatible(&union, &other));
    }

    #[test]
    fn readonly_collection_cannot_target_mutable() {
        let ro = Type::Class {
            name: "Widget".into(),
            type_args: None,
            readonly: true,
        };
        let mutable = Type::Class {
            name: "Widget".into(),
            type_args: None,
            readonly: false,
        };
        assert!(violates_readonly_discipline(&mutable, &ro));
        assert!(!violates_readonly_discipline(&ro, &mutable));
    }
}
