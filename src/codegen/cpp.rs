//! C++ backend (spec §4.5, §6 "C++ output"): ownership lowering via
//! `shared_ptr`/`weak_ptr`, union-to-variant collapse, named-argument
//! lowering, and JSON serializer synthesis. Emits header/source text
//! directly the way the teacher's `compile.rs` assembles output
//! strings, rather than building a second backend AST.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::ast::{
    BinOp, ClassDecl, Decl, Expr, ExprKind, FieldDecl, FunctionDecl, Literal, Program, Stmt,
    TypeAnnotation,
};
use crate::context::{GlobalContext, ValidationContext};
use crate::types::{Primitive, Type};

pub struct CppOutput {
    pub header: String,
    pub source: String,
}

/// Map a resolved type to its C++ spelling (spec §4.5 type table).
pub fn cpp_type(ty: &Type) -> String {
    match ty {
        Type::Primitive(Primitive::Int) => "int".into(),
        Type::Primitive(Primitive::Float) => "float".into(),
        Type::Primitive(Primitive::Double) => "double".into(),
        Type::Primitive(Primitive::Bool) => "bool".into(),
        Type::Primitive(Primitive::String) => "std::string".into(),
        Type::Primitive(Primitive::Char) => "char".into(),
        Type::Primitive(Primitive::Void) => "void".into(),
        Type::Primitive(Primitive::Null) => "std::nullptr_t".into(),
        Type::Array { element, length: Some(n) } => {
            format!("std::array<{}, {}>", cpp_type(element), n)
        }
        Type::Array { element, length: None } => {
            format!("std::shared_ptr<std::vector<{}>>", cpp_type(element))
        }
        Type::Map { key, value } => format!("std::map<{}, {}>", cpp_type(key), cpp_type(value)),
        Type::Set(elem) => format!("std::unordered_set<{}>", cpp_type(elem)),
        Type::Class { name, .. } => format!("std::shared_ptr<{name}>"),
        Type::WeakClass { name } => format!("std::weak_ptr<{name}>"),
        Type::Enum(name) => name.clone(),
        Type::Nullable(inner) => match inner.as_ref() {
            Type::Class { name, .. } => format!("std::shared_ptr<{name}>"),
            other => format!("std::optional<{}>", cpp_type(other)),
        },
        Type::Union(members) => {
            if members.iter().any(|m| m.is_null()) {
                let rest: Vec<Type> = members.iter().filter(|m| !m.is_null()).cloned().collect();
                format!("std::optional<{}>", variant_of(&rest))
            } else {
                variant_of(members)
            }
        }
        Type::Function { params, ret, .. } => {
            let args = params.iter().map(|p| cpp_type(p)).collect::<Vec<_>>().join(", ");
            format!("std::function<{}({})>", cpp_type(ret), args)
        }
        Type::TypeAlias { name, .. } => name.clone(),
        Type::TypeParameter(name) => name.clone(),
    }
}

fn variant_of(members: &[Type]) -> String {
    format!(
        "std::variant<{}>",
        members.iter().map(|m| cpp_type(m)).collect::<Vec<_>>().join(", ")
    )
}

struct ClassEmission {
    forward_decl: String,
    header: String,
    source: String,
}

/// Emit one module (source file) to a C++ header/source pair.
pub fn emit_module(ctx: &ValidationContext, global: &GlobalContext, module_name: &str, program: &Program, namespace: &str) -> CppOutput {
    let guard = module_name.to_uppercase().replace(['.', '-'], "_") + "_H";
    let mut forward_decls = String::new();
    let mut header_body = String::new();
    let mut source_body = String::new();
    let mut uses_runtime = false;

    for decl in &program.decls {
        match decl {
            Decl::Class(class) => {
                let emission = emit_class(ctx, class);
                writeln!(forward_decls, "{}", emission.forward_decl).ok();
                header_body.push_str(&emission.header);
                source_body.push_str(&emission.source);
                if class.fields.iter().any(|f| uses_runtime_type(ctx, f)) {
                    uses_runtime = true;
                }
            }
            Decl::Function(func) => {
                header_body.push_str(&emit_function_decl(func));
                source_body.push_str(&emit_function_def(ctx, module_name, func));
            }
            Decl::Enum(en) => {
                header_body.push_str(&format!(
                    "enum class {} {{ {} }};\n",
                    en.name,
                    en.members.iter().map(|m| m.name.clone()).collect::<Vec<_>>().join(", ")
                ));
            }
            _ => {}
        }
    }

    let mut header = String::new();
    writeln!(header, "#ifndef {guard}").ok();
    writeln!(header, "#define {guard}").ok();
    writeln!(header, "#include <iostream>").ok();
    writeln!(header, "#include <string>").ok();
    writeln!(header, "#include <vector>").ok();
    writeln!(header, "#include <memory>").ok();
    writeln!(header, "#include <cmath>").ok();
    if uses_runtime {
        writeln!(header, "#include \"doof_runtime.h\"").ok();
    }
    for (module_path, _) in imports_of(program) {
        let included = global.module_names.get(&module_path).cloned().unwrap_or(module_path);
        writeln!(header, "#include \"{included}.h\"").ok();
    }
    writeln!(header, "namespace {namespace} {{").ok();
    header.push_str(&forward_decls);
    header.push_str(&header_body);
    writeln!(header, "}} // namespace {namespace}").ok();
    writeln!(header, "#endif").ok();

    let mut source = String::new();
    writeln!(source, "#include \"{module_name}.h\"").ok();
    if uses_runtime {
        writeln!(source, "#include \"doof_runtime.h\"").ok();
    }
    writeln!(source, "namespace {namespace} {{").ok();
    source.push_str(&source_body);
    writeln!(source, "}} // namespace {namespace}").ok();

    CppOutput { header, source }
}

/// Conservative check for whether a field's annotation needs the
/// union/optional runtime helpers in `doof_runtime.h`. Fields carry a
/// `TypeAnnotation`, not a resolved `Type`; callers that already have
/// the class's cached `field_types` should prefer `references_runtime`
/// on the resolved type instead.
fn uses_runtime_type(_ctx: &ValidationContext, field: &FieldDecl) -> bool {
    matches!(field.ty, TypeAnnotation::Union(_) | TypeAnnotation::Nullable(_))
}

fn imports_of(program: &Program) -> Vec<(String, ())> {
    program
        .decls
        .iter()
        .filter_map(|d| match d {
            Decl::Import(i) => Some((i.module_path.clone(), ())),
            _ => None,
        })
        .collect()
}

/// Emit a class: `enable_shared_from_this`, private constructor +
/// `_new` factory, field declarations, and method signatures (spec
/// §4.5 ownership rules 1 and 3).
fn emit_class(ctx: &ValidationContext, class: &ClassDecl) -> ClassEmission {
    let forward_decl = format!("class {};\n", class.name);

    let mut header = String::new();
    writeln!(header, "class {} : public std::enable_shared_from_this<{}> {{", class.name, class.name).ok();
    writeln!(header, "public:").ok();

    let ctor_params = class
        .constructor
        .as_ref()
        .map(|c| c.params.clone())
        .unwrap_or_default();
    let param_list = ctor_params
        .iter()
        .map(|p| format!("{} {}", cpp_type(&ctx.resolve_field_type(&p.ty)), p.name))
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(
        header,
        "    static std::shared_ptr<{}> _new({});",
        class.name, param_list
    )
    .ok();

    for field in &class.fields {
        let ty = ctx.resolve_field_type(&field.ty);
        writeln!(header, "    {} {};", cpp_type(&ty), field.name).ok();
    }
    for method in &class.methods {
        let ret = cpp_type(&ctx.resolve_field_type(&method.return_ty));
        let params = method
            .params
            .iter()
            .map(|p| format!("{} {}", cpp_type(&ctx.resolve_field_type(&p.ty)), p.name))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(header, "    {} {}({});", ret, method.name, params).ok();
    }

    writeln!(header, "private:").ok();
    writeln!(header, "    {}({});", class.name, param_list).ok();
    writeln!(header, "}};").ok();

    let mut source = String::new();
    writeln!(
        source,
        "{}::{}({}) {{}}",
        class.name, class.name, param_list
    )
    .ok();
    let ctor_args = ctor_params.iter().map(|p| p.name.clone()).collect::<Vec<_>>().join(", ");
    writeln!(
        source,
        "std::shared_ptr<{}> {}::_new({}) {{ return std::shared_ptr<{}>(new {}({})); }}",
        class.name, class.name, param_list, class.name, class.name, ctor_args
    )
    .ok();
    for method in &class.methods {
        let ret = cpp_type(&ctx.resolve_field_type(&method.return_ty));
        let params = method
            .params
            .iter()
            .map(|p| format!("{} {}", cpp_type(&ctx.resolve_field_type(&p.ty)), p.name))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(source, "{} {}::{}({}) {{", ret, class.name, method.name, params).ok();
        for stmt in &method.body.stmts {
            writeln!(source, "{}", emit_stmt_text(ctx, stmt)).ok();
        }
        writeln!(source, "}}").ok();
    }

    ClassEmission { forward_decl, header, source }
}

fn emit_function_decl(func: &FunctionDecl) -> String {
    let ret = cpp_type_from_annotation(&func.return_ty);
    let params = func
        .params
        .iter()
        .map(|p| format!("{} {}", cpp_type_from_annotation(&p.ty), p.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{ret} {}({params});\n", func.name)
}

fn emit_function_def(ctx: &ValidationContext, _module: &str, func: &FunctionDecl) -> String {
    let ret = cpp_type_from_annotation(&func.return_ty);
    let params = func
        .params
        .iter()
        .map(|p| format!("{} {}", cpp_type_from_annotation(&p.ty), p.name))
        .collect::<Vec<_>>()
        .join(", ");
    let mut out = format!("{ret} {}({params}) {{\n", func.name);
    for stmt in &func.body.stmts {
        writeln!(out, "{}", emit_stmt_text(ctx, stmt)).ok();
    }
    out.push_str("}\n");
    out
}

/// A best-effort textual annotation mapper used where no resolved
/// `Type` is cached (top-level function signatures outside a class
/// registration pass); falls back to the annotation's bare name.
fn cpp_type_from_annotation(ann: &TypeAnnotation) -> String {
    match ann {
        TypeAnnotation::Name { name, .. } => match name.as_str() {
            "int" => "int".into(),
            "float" => "float".into(),
            "double" => "double".into(),
            "bool" => "bool".into(),
            "string" => "std::string".into(),
            "char" => "char".into(),
            "void" => "void".into(),
            other => format!("std::shared_ptr<{other}>"),
        },
        TypeAnnotation::Array { element, length: Some(n) } => {
            format!("std::array<{}, {}>", cpp_type_from_annotation(element), n)
        }
        TypeAnnotation::Array { element, length: None } => {
            format!("std::shared_ptr<std::vector<{}>>", cpp_type_from_annotation(element))
        }
        TypeAnnotation::Map { key, value } => format!(
            "std::map<{}, {}>",
            cpp_type_from_annotation(key),
            cpp_type_from_annotation(value)
        ),
        TypeAnnotation::Set(elem) => format!("std::unordered_set<{}>", cpp_type_from_annotation(elem)),
        TypeAnnotation::Weak(name) => format!("std::weak_ptr<{name}>"),
        TypeAnnotation::Nullable(inner) => format!("std::optional<{}>", cpp_type_from_annotation(inner)),
        TypeAnnotation::Union(members) => {
            format!(
                "std::variant<{}>",
                members.iter().map(cpp_type_from_annotation).collect::<Vec<_>>().join(", ")
            )
        }
        TypeAnnotation::Function { params, ret } => format!(
            "std::function<{}({})>",
            cpp_type_from_annotation(ret),
            params.iter().map(cpp_type_from_annotation).collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Lower one statement to C++ text. Covers the control-flow shapes the
/// validator already accepted; expression lowering reuses
/// `emit_expr_text` for ownership/union/named-arg rules.
fn emit_stmt_text(ctx: &ValidationContext, stmt: &Stmt) -> String {
    match stmt {
        Stmt::Var(v) => {
            let init = v
                .init
                .as_ref()
                .map(|e| format!(" = {}", emit_expr_text(ctx, e)))
                .unwrap_or_default();
            let ty = v
                .declared_ty
                .as_ref()
                .map(cpp_type_from_annotation)
                .unwrap_or_else(|| "auto".into());
            format!("{ty} {}{init};", v.name)
        }
        Stmt::Expr(e, _) => format!("{};", emit_expr_text(ctx, e)),
        Stmt::Block(b) => {
            let mut out = String::from("{\n");
            for s in &b.stmts {
                out.push_str(&emit_stmt_text(ctx, s));
                out.push('\n');
            }
            out.push('}');
            out
        }
        Stmt::If { cond, then_branch, else_branch, .. } => {
            let mut out = format!("if ({}) {{\n", emit_expr_text(ctx, cond));
            for s in &then_branch.stmts {
                out.push_str(&emit_stmt_text(ctx, s));
                out.push('\n');
            }
            out.push('}');
            if let Some(else_stmt) = else_branch {
                out.push_str(" else ");
                out.push_str(&emit_stmt_text(ctx, else_stmt));
            }
            out
        }
        Stmt::While { cond, body, .. } => {
            let mut out = format!("while ({}) {{\n", emit_expr_text(ctx, cond));
            for s in &body.stmts {
                out.push_str(&emit_stmt_text(ctx, s));
                out.push('\n');
            }
            out.push('}');
            out
        }
        Stmt::For { head, body, .. } => {
            use crate::ast::ForHead;
            let mut out = match head {
                ForHead::Classic { init, cond, update } => {
                    let init_s = init.as_ref().map(|s| emit_stmt_text(ctx, s)).unwrap_or_default();
                    let cond_s = cond.as_ref().map(|e| emit_expr_text(ctx, e)).unwrap_or_default();
                    let update_s = update.as_ref().map(|e| emit_expr_text(ctx, e)).unwrap_or_default();
                    format!("for ({init_s} {cond_s}; {update_s}) {{\n")
                }
                ForHead::Of { binding, iterable } => {
                    use crate::ast::ForOfBinding;
                    let iter_s = emit_expr_text(ctx, iterable);
                    match binding {
                        ForOfBinding::Single(name) => format!("for (auto& {name} : *{iter_s}) {{\n"),
                        ForOfBinding::KeyValue(k, v) => {
                            format!("for (auto& [{k}, {v}] : *{iter_s}) {{\n")
                        }
                    }
                }
            };
            for s in &body.stmts {
                out.push_str(&emit_stmt_text(ctx, s));
                out.push('\n');
            }
            out.push('}');
            out
        }
        Stmt::Switch { discriminant, cases, .. } => {
            let mut out = format!("switch ({}) {{\n", emit_expr_text(ctx, discriminant));
            for case in cases {
                match &case.test {
                    Some(test) => writeln!(out, "case {}:", emit_expr_text(ctx, test)).ok(),
                    None => writeln!(out, "default:").ok(),
                };
                for s in &case.body {
                    out.push_str(&emit_stmt_text(ctx, s));
                    out.push('\n');
                }
                out.push_str("break;\n");
            }
            out.push('}');
            out
        }
        Stmt::Return { value, .. } => match value {
            Some(e) => format!("return {};", emit_expr_text(ctx, e)),
            None => "return;".into(),
        },
        Stmt::Break(_) => "break;".into(),
        Stmt::Continue(_) => "continue;".into(),
    }
}

/// Lower one expression to C++ text, applying ownership rule 2
/// (`this` as r-value → `shared_from_this()`), union access lowering,
/// and named-argument/call-dispatch lowering.
fn emit_expr_text(ctx: &ValidationContext, expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(lit) => emit_literal(lit),
        ExprKind::Identifier(name) if name == "this" => {
            // Bare `this` used as a value lowers to shared_from_this();
            // `this->member` is handled in the Member arm below before
            // ever reaching here.
            "shared_from_this()".into()
        }
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::Binary { op, left, right } => {
            if *op == BinOp::Assign {
                format!("{} = {}", emit_expr_text(ctx, left), emit_expr_text(ctx, right))
            } else if op.is_compound_assign() {
                format!("{} {} {}", emit_expr_text(ctx, left), compound_op_text(*op), emit_expr_text(ctx, right))
            } else {
                format!("({} {} {})", emit_expr_text(ctx, left), binop_text(*op), emit_expr_text(ctx, right))
            }
        }
        ExprKind::Unary { op, operand } => emit_unary(ctx, *op, operand),
        ExprKind::Member { object, property, computed: false } => {
            if matches!(&object.kind, ExprKind::Identifier(n) if n == "this") {
                return format!("this->{property}");
            }
            if let Some(record) = ctx.hints.narrowing.get(&object.id) {
                return emit_narrowed_member(ctx, object, record, property);
            }
            format!("{}->{}", emit_expr_text(ctx, object), property)
        }
        ExprKind::Member { object, property, computed: true } => {
            format!("(*{})[{}]", emit_expr_text(ctx, object), property)
        }
        ExprKind::Index { object, index } => {
            format!("(*{})[{}]", emit_expr_text(ctx, object), emit_expr_text(ctx, index))
        }
        ExprKind::Call { callee, args } => emit_call(ctx, expr, callee, args),
        ExprKind::PositionalObject { class_name, args, .. } => emit_constructor_call(ctx, expr, class_name, args),
        ExprKind::Array(items) => {
            let inits = items.iter().map(|e| emit_expr_text(ctx, e)).collect::<Vec<_>>().join(", ");
            format!("std::make_shared<std::vector<std::decay_t<decltype({inits})>>>(std::initializer_list{{{inits}}})")
        }
        ExprKind::Conditional { test, consequent, alternate } => format!(
            "({} ? {} : {})",
            emit_expr_text(ctx, test),
            emit_expr_text(ctx, consequent),
            emit_expr_text(ctx, alternate)
        ),
        ExprKind::InterpolatedString(parts) => emit_interpolated(ctx, parts),
        ExprKind::EnumShorthand(member) => format!("/* enum shorthand */ {member}"),
        ExprKind::Is { value, .. } => {
            if let Some(record) = ctx.hints.narrowing.get(&expr.id) {
                emit_is_guard(ctx, value, record)
            } else {
                emit_expr_text(ctx, value)
            }
        }
        _ => "/* unsupported expression form */ nullptr".into(),
    }
}

fn emit_literal(lit: &Literal) -> String {
    match lit {
        Literal::Int(v) => v.to_string(),
        Literal::Float(v) => format!("{v}f"),
        Literal::Double(v) => v.to_string(),
        Literal::Bool(v) => v.to_string(),
        Literal::Str(v) => format!("{:?}", v),
        Literal::Char(v) => format!("'{v}'"),
        Literal::Null => "nullptr".into(),
    }
}

fn binop_text(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::And => "&&",
        BinOp::Or => "||",
        _ => "?",
    }
}

fn compound_op_text(op: BinOp) -> &'static str {
    match op {
        BinOp::AddAssign => "+=",
        BinOp::SubAssign => "-=",
        BinOp::MulAssign => "*=",
        BinOp::DivAssign => "/=",
        BinOp::ModAssign => "%=",
        _ => "=",
    }
}

fn emit_unary(ctx: &ValidationContext, op: crate::ast::UnOp, operand: &Expr) -> String {
    use crate::ast::UnOp;
    let o = emit_expr_text(ctx, operand);
    match op {
        UnOp::Neg => format!("(-{o})"),
        UnOp::Not => format!("(!{o})"),
        UnOp::PreIncr => format!("(++{o})"),
        UnOp::PreDecr => format!("(--{o})"),
        UnOp::PostIncr => format!("({o}++)"),
        UnOp::PostDecr => format!("({o}--)"),
    }
}

/// Direct member access through a flat narrowing, or a `std::visit`
/// common-member access otherwise (spec §4.5 "Union access lowering").
fn emit_narrowed_member(ctx: &ValidationContext, object: &Expr, record: &crate::context::NarrowingRecord, property: &str) -> String {
    let obj_text = emit_expr_text(ctx, object);
    if record.is_flat() {
        match &record.narrowed_members[0] {
            Type::Class { name, .. } => {
                format!("std::get<std::shared_ptr<{name}>>({obj_text})->{property}")
            }
            // A narrowed primitive union member has no `.member`; this
            // shape only arises from a direct `Is` guard, not a member
            // access, so the property is unused here.
            other => format!("std::get<{}>({obj_text})", cpp_type(other)),
        }
    } else {
        format!(
            "std::visit([](auto&& v) {{ return v->{property}; }}, {obj_text})"
        )
    }
}

fn emit_is_guard(ctx: &ValidationContext, value: &Expr, record: &crate::context::NarrowingRecord) -> String {
    let v = emit_expr_text(ctx, value);
    if record.is_flat() {
        if let Type::Class { name, .. } = &record.narrowed_members[0] {
            return format!("std::holds_alternative<std::shared_ptr<{name}>>({v})");
        }
    }
    format!("/* is */ {v}")
}

fn emit_interpolated(ctx: &ValidationContext, parts: &[crate::ast::InterpolatedPart]) -> String {
    use crate::ast::InterpolatedPart;
    let mut pieces = Vec::new();
    for part in parts {
        match part {
            InterpolatedPart::Literal(s) => pieces.push(format!("{:?}", s)),
            InterpolatedPart::Expr(e) => pieces.push(format!("std::to_string({})", emit_expr_text(ctx, e))),
        }
    }
    format!("({})", pieces.join(" + "))
}

/// Call-site lowering consulting the `CallDispatchRecord` for reorder
/// and temporary-binding needs (spec §4.5 "Named-argument lowering").
fn emit_call(ctx: &ValidationContext, node: &Expr, callee: &Expr, args: &crate::ast::CallArgs) -> String {
    let callee_text = emit_expr_text(ctx, callee);
    let record = ctx.hints.call_dispatch.get(&node.id);
    let all_args: Vec<&Expr> = args.positional.iter().chain(args.named.iter().map(|n| &n.value)).collect();

    match record {
        None => {
            let rendered = all_args.iter().map(|e| emit_expr_text(ctx, e)).collect::<Vec<_>>().join(", ");
            format!("{callee_text}({rendered})")
        }
        Some(dispatch) if !dispatch.needs_temporaries => {
            let reordered: Vec<String> = dispatch
                .argument_order
                .iter()
                .filter_map(|&i| all_args.get(i))
                .map(|e| emit_expr_text(ctx, e))
                .collect();
            format!("{callee_text}({})", reordered.join(", "))
        }
        Some(dispatch) => {
            let mut out = String::from("[&]() { ");
            for (slot, &src_idx) in dispatch.argument_order.iter().enumerate() {
                if let Some(arg_expr) = all_args.get(src_idx) {
                    write!(out, "auto _arg{slot} = {}; ", emit_expr_text(ctx, arg_expr)).ok();
                }
            }
            let call_args: Vec<String> = (0..dispatch.argument_order.len()).map(|i| format!("_arg{i}")).collect();
            write!(out, "return {callee_text}({}); ", call_args.join(", ")).ok();
            out.push_str("}()");
            out
        }
    }
}

/// `C(a, b)` / `new C(a, b)` lowering (spec §4.5 ownership rule 4).
fn emit_constructor_call(ctx: &ValidationContext, node: &Expr, class_name: &str, args: &crate::ast::CallArgs) -> String {
    let has_ctor = ctx.classes.get(class_name).map(|c| c.decl.constructor.is_some()).unwrap_or(false);
    let all_args: Vec<&Expr> = args.positional.iter().chain(args.named.iter().map(|n| &n.value)).collect();
    let record = ctx.hints.call_dispatch.get(&node.id);
    let ordered: Vec<&Expr> = match record {
        Some(r) => r.argument_order.iter().filter_map(|&i| all_args.get(i).copied()).collect(),
        None => all_args,
    };
    let rendered = ordered.iter().map(|e| emit_expr_text(ctx, e)).collect::<Vec<_>>().join(", ");
    if has_ctor {
        format!("{class_name}::_new({rendered})")
    } else {
        format!("std::make_shared<{class_name}>({rendered})")
    }
}

/// JSON synthesis (spec §4.5 "JSON synthesis"): emits `_toJSON`/
/// `operator<<` for every class in `jsonPrintTypes`, and `_fromJSON`/
/// `fromJSON` for every class in `jsonFromTypes`, walking the
/// field/array/map/union dependency graph with a visited set so
/// self-referential types terminate.
pub fn emit_json_serializers(ctx: &ValidationContext) -> String {
    let mut out = String::new();
    let mut visited_print = HashSet::new();
    for class_name in &ctx.hints.json_print_types {
        emit_to_json_for(ctx, class_name, &mut visited_print, &mut out);
    }
    let mut visited_from = HashSet::new();
    for class_name in &ctx.hints.json_from_types {
        emit_from_json_for(ctx, class_name, &mut visited_from, &mut out);
    }
    out
}

fn emit_to_json_for(ctx: &ValidationContext, class_name: &str, visited: &mut HashSet<String>, out: &mut String) {
    if !visited.insert(class_name.to_string()) {
        return;
    }
    let Some(info) = ctx.classes.get(class_name) else { return };
    writeln!(out, "std::string {class_name}::_toJSON() const {{").ok();
    writeln!(out, "    std::string out = \"{{\";").ok();
    for (i, field) in info.decl.fields.iter().enumerate() {
        let sep = if i > 0 { "," } else { "" };
        writeln!(out, "    out += \"{sep}\\\"{}\\\":\" + doof_json::to_json({});", field.name, field.name).ok();
        if let Some(dep) = field_class_dependency(&info.field_types, &field.name) {
            emit_to_json_for(ctx, &dep, visited, out);
        }
    }
    writeln!(out, "    out += \"}}\";").ok();
    writeln!(out, "    return out;").ok();
    writeln!(out, "}}").ok();
    writeln!(
        out,
        "std::ostream& operator<<(std::ostream& os, const std::shared_ptr<{class_name}>& v) {{ return os << v->_toJSON(); }}"
    )
    .ok();
}

fn emit_from_json_for(ctx: &ValidationContext, class_name: &str, visited: &mut HashSet<String>, out: &mut String) {
    if !visited.insert(class_name.to_string()) {
        return;
    }
    let Some(info) = ctx.classes.get(class_name) else { return };
    writeln!(
        out,
        "std::shared_ptr<{class_name}> {class_name}::_fromJSON(const doof_json::Value& v) {{"
    )
    .ok();
    let args = info.decl.fields.iter().map(|f| format!("doof_json::field(v, \"{}\")", f.name)).collect::<Vec<_>>().join(", ");
    writeln!(out, "    return {class_name}::_new({args});").ok();
    writeln!(out, "}}").ok();
    for (_, ty) in &info.field_types {
        if let Some(name) = ty.class_name() {
            emit_from_json_for(ctx, name, visited, out);
        }
    }
}

fn field_class_dependency(field_types: &std::collections::HashMap<String, Type>, field_name: &str) -> Option<String> {
    field_types.get(field_name)?.class_name().map(|s| s.to_string())
}

impl ValidationContext {
    /// Resolve a field/param/return annotation to its `Type`, without
    /// mutating the context (read-only variant of `resolve_type` for
    /// use after registration, where unresolvable names can't occur
    /// for an already-validated program).
    pub fn resolve_field_type(&self, ann: &TypeAnnotation) -> Type {
        match ann {
            TypeAnnotation::Name { name, .. } => {
                if let Some(prim) = primitive_from_name_lookup(name) {
                    return Type::Primitive(prim);
                }
                if self.enums.contains_key(name) {
                    Type::Enum(name.clone())
                } else if self.classes.contains_key(name) {
                    Type::Class { name: name.clone(), type_args: None, readonly: false }
                } else {
                    Type::TypeParameter(name.clone())
                }
            }
            TypeAnnotation::Array { element, length } => {
                Type::Array { element: Box::new(self.resolve_field_type(element)), length: *length }
            }
            TypeAnnotation::Map { key, value } => Type::Map {
                key: Box::new(self.resolve_field_type(key)),
                value: Box::new(self.resolve_field_type(value)),
            },
            TypeAnnotation::Set(e) => Type::Set(Box::new(self.resolve_field_type(e))),
            TypeAnnotation::Weak(name) => Type::WeakClass { name: name.clone() },
            TypeAnnotation::Union(members) => {
                Type::Union(members.iter().map(|m| self.resolve_field_type(m)).collect()).canonicalize()
            }
            TypeAnnotation::Nullable(inner) => Type::Nullable(Box::new(self.resolve_field_type(inner))).canonicalize(),
            TypeAnnotation::Function { params, ret } => Type::Function {
                params: params.iter().map(|p| self.resolve_field_type(p)).collect(),
                ret: Box::new(self.resolve_field_type(ret)),
                concise: false,
            },
        }
    }
}

fn primitive_from_name_lookup(name: &str) -> Option<Primitive> {
    Some(match name {
        "int" => Primitive::Int,
        "float" => Primitive::Float,
        "double" => Primitive::Double,
        "bool" => Primitive::Bool,
        "string" => Primitive::String,
        "char" => Primitive::Char,
        "void" => Primitive::Void,
        "null" => Primitive::Null,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_type_maps_to_shared_ptr_vector() {
        assert_eq!(
            cpp_type(&Type::Array { element: Box::new(Type::int()), length: None }),
            "std::shared_ptr<std::vector<int>>"
        );
    }

    #[test]
    fn class_type_maps_to_shared_ptr() {
        assert_eq!(
            cpp_type(&Type::Class { name: "Widget".into(), type_args: None, readonly: false }),
            "std::shared_ptr<Widget>"
        );
    }

    #[test]
    fn nullable_class_stays_shared_ptr_not_optional() {
        let ty = Type::Nullable(Box::new(Type::Class { name: "Widget".into(), type_args: None, readonly: false }));
        assert_eq!(cpp_type(&ty), "std::shared_ptr<Widget>");
    }

    #[test]
    fn nullable_primitive_is_optional() {
        let ty = Type::Nullable(Box::new(Type::int()));
        assert_eq!(cpp_type(&ty), "std::optional<int>");
    }

    #[test]
    fn multi_member_union_is_variant() {
        let ty = Type::Union(vec![
            Type::Class { name: "A".into(), type_args: None, readonly: false },
            Type::Class { name: "B".into(), type_args: None, readonly: false },
        ]);
        assert_eq!(cpp_type(&ty), "std::variant<std::shared_ptr<A>, std::shared_ptr<B>>");
    }

    #[test]
    fn literal_call_without_dispatch_record_renders_positionally() {
        let ctx = ValidationContext::new("test.doof");
        let node = Expr {
            id: crate::ast::NodeIdGen::new().fresh(),
            kind: ExprKind::Call {
                callee: Box::new(Expr {
                    id: crate::ast::NodeIdGen::new().fresh(),
                    kind: ExprKind::Identifier("f".into()),
                    range: Default::default(),
                }),
                args: crate::ast::CallArgs { positional: vec![], named: vec![], explicit_type_args: None },
            },
            range: Default::default(),
        };
        if let ExprKind::Call { callee, args } = &node.kind {
            assert_eq!(emit_call(&ctx, &node, callee, args), "f()");
        }
    }
}
