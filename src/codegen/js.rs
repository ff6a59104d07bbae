//! JavaScript/TypeScript backend (spec §4.6): ES classes, no union
//! runtime representation, positional-only calls, intrinsic mapping.
//! Simpler than the C++ backend by design — grounded directly in the
//! teacher's own domain (this is the one backend whose *output*
//! language is the teacher's own TypeScript/JS).

use std::fmt::Write as _;

use crate::ast::{BinOp, ClassDecl, Decl, Expr, ExprKind, FunctionDecl, Literal, Program, Stmt};
use crate::context::ValidationContext;

pub fn emit_module(ctx: &ValidationContext, module_name: &str, program: &Program) -> String {
    let mut out = String::new();
    for decl in &program.decls {
        if let Decl::Import(import) = decl {
            let names = import.specifiers.iter().map(|s| s.local_name.clone()).collect::<Vec<_>>().join(", ");
            writeln!(out, "import {{ {names} }} from './{}.js';", import.module_path).ok();
        }
    }
    let _ = module_name;
    for decl in &program.decls {
        match decl {
            Decl::Class(class) => out.push_str(&emit_class(ctx, class)),
            Decl::Function(func) => out.push_str(&emit_function(ctx, func)),
            Decl::Enum(en) => {
                writeln!(out, "export const {} = Object.freeze({{", en.name).ok();
                for (i, member) in en.members.iter().enumerate() {
                    let value = member
                        .value
                        .as_ref()
                        .map(emit_literal)
                        .unwrap_or_else(|| i.to_string());
                    writeln!(out, "  {}: {value},", member.name).ok();
                }
                out.push_str("});\n");
            }
            Decl::Export(export) => {
                writeln!(out, "export {{ {} }};", export.name).ok();
            }
            _ => {}
        }
    }
    out
}

fn emit_class(ctx: &ValidationContext, class: &ClassDecl) -> String {
    let mut out = format!("export class {} {{\n", class.name);
    if let Some(ctor) = &class.constructor {
        let params = ctor.params.iter().map(|p| p.name.clone()).collect::<Vec<_>>().join(", ");
        writeln!(out, "  constructor({params}) {{").ok();
        for field in &class.fields {
            let assigned = ctor
                .params
                .iter()
                .any(|p| p.name == field.name)
                .then(|| field.name.clone())
                .or_else(|| field.init.as_ref().map(|e| emit_expr(ctx, e)));
            if let Some(value) = assigned {
                writeln!(out, "    this.{} = {};", field.name, value).ok();
            }
        }
        for stmt in &ctor.body.stmts {
            writeln!(out, "    {}", emit_stmt(ctx, stmt)).ok();
        }
        out.push_str("  }\n");
    } else if !class.fields.is_empty() {
        out.push_str("  constructor() {\n");
        for field in &class.fields {
            if let Some(init) = &field.init {
                writeln!(out, "    this.{} = {};", field.name, emit_expr(ctx, init)).ok();
            }
        }
        out.push_str("  }\n");
    }
    for method in &class.methods {
        let params = method.params.iter().map(|p| p.name.clone()).collect::<Vec<_>>().join(", ");
        writeln!(out, "  {}({params}) {{", method.name).ok();
        for stmt in &method.body.stmts {
            writeln!(out, "    {}", emit_stmt(ctx, stmt)).ok();
        }
        out.push_str("  }\n");
    }
    out.push_str("}\n");
    out
}

fn emit_function(ctx: &ValidationContext, func: &FunctionDecl) -> String {
    let params = func.params.iter().map(|p| p.name.clone()).collect::<Vec<_>>().join(", ");
    let mut out = format!("export function {}({params}) {{\n", func.name);
    for stmt in &func.body.stmts {
        writeln!(out, "  {}", emit_stmt(ctx, stmt)).ok();
    }
    out.push_str("}\n");
    out
}

fn emit_stmt(ctx: &ValidationContext, stmt: &Stmt) -> String {
    match stmt {
        Stmt::Var(v) => {
            let init = v.init.as_ref().map(|e| format!(" = {}", emit_expr(ctx, e))).unwrap_or_default();
            format!("let {}{init};", v.name)
        }
        Stmt::Expr(e, _) => format!("{};", emit_expr(ctx, e)),
        Stmt::Block(b) => {
            let body = b.stmts.iter().map(|s| emit_stmt(ctx, s)).collect::<Vec<_>>().join("\n  ");
            format!("{{\n  {body}\n}}")
        }
        Stmt::If { cond, then_branch, else_branch, .. } => {
            let then_body = then_branch.stmts.iter().map(|s| emit_stmt(ctx, s)).collect::<Vec<_>>().join("\n  ");
            let mut out = format!("if ({}) {{\n  {then_body}\n}}", emit_expr(ctx, cond));
            if let Some(e) = else_branch {
                write!(out, " else {}", emit_stmt(ctx, e)).ok();
            }
            out
        }
        Stmt::While { cond, body, .. } => {
            let b = body.stmts.iter().map(|s| emit_stmt(ctx, s)).collect::<Vec<_>>().join("\n  ");
            format!("while ({}) {{\n  {b}\n}}", emit_expr(ctx, cond))
        }
        Stmt::For { head, body, .. } => {
            use crate::ast::{ForHead, ForOfBinding};
            let b = body.stmts.iter().map(|s| emit_stmt(ctx, s)).collect::<Vec<_>>().join("\n  ");
            match head {
                ForHead::Classic { init, cond, update } => {
                    let init_s = init.as_ref().map(|s| emit_stmt(ctx, s)).unwrap_or_default();
                    let cond_s = cond.as_ref().map(|e| emit_expr(ctx, e)).unwrap_or_default();
                    let update_s = update.as_ref().map(|e| emit_expr(ctx, e)).unwrap_or_default();
                    format!("for ({init_s} {cond_s}; {update_s}) {{\n  {b}\n}}")
                }
                ForHead::Of { binding, iterable } => {
                    let it = emit_expr(ctx, iterable);
                    match binding {
                        ForOfBinding::Single(name) => format!("for (const {name} of {it}) {{\n  {b}\n}}"),
                        ForOfBinding::KeyValue(k, v) => format!("for (const [{k}, {v}] of {it}) {{\n  {b}\n}}"),
                    }
                }
            }
        }
        Stmt::Switch { discriminant, cases, .. } => {
            let mut out = format!("switch ({}) {{\n", emit_expr(ctx, discriminant));
            for case in cases {
                match &case.test {
                    Some(t) => writeln!(out, "case {}:", emit_expr(ctx, t)).ok(),
                    None => writeln!(out, "default:").ok(),
                };
                for s in &case.body {
                    writeln!(out, "  {}", emit_stmt(ctx, s)).ok();
                }
                out.push_str("  break;\n");
            }
            out.push('}');
            out
        }
        Stmt::Return { value, .. } => match value {
            Some(e) => format!("return {};", emit_expr(ctx, e)),
            None => "return;".into(),
        },
        Stmt::Break(_) => "break;".into(),
        Stmt::Continue(_) => "continue;".into(),
    }
}

/// Lower one expression. Named-argument reorder is positional-only per
/// spec §4.6 ("reorder is computed by the validator"); no union
/// narrowing or variant access since JS carries no union runtime
/// representation.
fn emit_expr(ctx: &ValidationContext, expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(lit) => emit_literal(lit),
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::Binary { op, left, right } => {
            if *op == BinOp::Assign {
                format!("{} = {}", emit_expr(ctx, left), emit_expr(ctx, right))
            } else if op.is_compound_assign() {
                format!("{} {} {}", emit_expr(ctx, left), compound_op(*op), emit_expr(ctx, right))
            } else {
                format!("({} {} {})", emit_expr(ctx, left), binop(*op), emit_expr(ctx, right))
            }
        }
        ExprKind::Unary { op, operand } => emit_unary(ctx, *op, operand),
        ExprKind::Member { object, property, computed: false } => {
            format!("{}.{}", emit_expr(ctx, object), property)
        }
        ExprKind::Member { object, property, computed: true } => {
            format!("{}[{}]", emit_expr(ctx, object), property)
        }
        ExprKind::Index { object, index } => format!("{}[{}]", emit_expr(ctx, object), emit_expr(ctx, index)),
        ExprKind::Call { callee, args } => emit_call(ctx, expr, callee, args),
        ExprKind::PositionalObject { class_name, args, .. } => {
            let rendered = args.positional.iter().map(|e| emit_expr(ctx, e)).collect::<Vec<_>>().join(", ");
            format!("new {class_name}({rendered})")
        }
        ExprKind::Array(items) => {
            format!("[{}]", items.iter().map(|e| emit_expr(ctx, e)).collect::<Vec<_>>().join(", "))
        }
        ExprKind::Conditional { test, consequent, alternate } => format!(
            "({} ? {} : {})",
            emit_expr(ctx, test),
            emit_expr(ctx, consequent),
            emit_expr(ctx, alternate)
        ),
        ExprKind::InterpolatedString(parts) => emit_template(ctx, parts),
        ExprKind::EnumShorthand(member) => format!("/* enum member */ {member}"),
        ExprKind::Is { .. } => "/* narrowing elided on this target */ true".into(),
        _ => "undefined".into(),
    }
}

fn emit_literal(lit: &Literal) -> String {
    match lit {
        Literal::Int(v) => v.to_string(),
        Literal::Float(v) => v.to_string(),
        Literal::Double(v) => v.to_string(),
        Literal::Bool(v) => v.to_string(),
        Literal::Str(v) => format!("{:?}", v),
        Literal::Char(v) => format!("{:?}", v.to_string()),
        Literal::Null => "null".into(),
    }
}

fn binop(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Eq => "===",
        BinOp::Ne => "!==",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::And => "&&",
        BinOp::Or => "||",
        _ => "?",
    }
}

fn compound_op(op: BinOp) -> &'static str {
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
    let o = emit_expr(ctx, operand);
    match op {
        UnOp::Neg => format!("(-{o})"),
        UnOp::Not => format!("(!{o})"),
        UnOp::PreIncr => format!("(++{o})"),
        UnOp::PreDecr => format!("(--{o})"),
        UnOp::PostIncr => format!("({o}++)"),
        UnOp::PostDecr => format!("({o}--)"),
    }
}

fn emit_template(ctx: &ValidationContext, parts: &[crate::ast::InterpolatedPart]) -> String {
    use crate::ast::InterpolatedPart;
    let mut out = String::from("`");
    for part in parts {
        match part {
            InterpolatedPart::Literal(s) => out.push_str(&s.replace('`', "\\`")),
            InterpolatedPart::Expr(e) => {
                out.push_str("${");
                out.push_str(&emit_expr(ctx, e));
                out.push('}');
            }
        }
    }
    out.push('`');
    out
}

/// Intrinsic remapping (spec §4.6): `println` → `console.log`,
/// `reduce`'s argument order swapped to JS's callback-first form.
fn emit_call(ctx: &ValidationContext, node: &Expr, callee: &Expr, args: &crate::ast::CallArgs) -> String {
    if let ExprKind::Identifier(name) = &callee.kind {
        if name == "println" {
            let rendered = args.positional.iter().map(|e| emit_expr(ctx, e)).collect::<Vec<_>>().join(", ");
            return format!("console.log({rendered})");
        }
    }
    if let ExprKind::Member { object, property, .. } = &callee.kind {
        if property == "reduce" && args.positional.len() == 2 {
            // Source order: (initialValue, callback); JS order: (callback, initialValue).
            let callback = emit_expr(ctx, &args.positional[1]);
            let initial = emit_expr(ctx, &args.positional[0]);
            return format!("{}.reduce({callback}, {initial})", emit_expr(ctx, object));
        }
    }
    let record = ctx.hints.call_dispatch.get(&node.id);
    let all_args: Vec<&Expr> = args.positional.iter().chain(args.named.iter().map(|n| &n.value)).collect();
    let ordered: Vec<&Expr> = match record {
        Some(r) => r.argument_order.iter().filter_map(|&i| all_args.get(i).copied()).collect(),
        None => all_args,
    };
    let rendered = ordered.iter().map(|e| emit_expr(ctx, e)).collect::<Vec<_>>().join(", ");
    format!("{}({rendered})", emit_expr(ctx, callee))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CallArgs, NodeIdGen, TextRange};

    #[test]
    fn println_maps_to_console_log() {
        let ctx = ValidationContext::new("test.doof");
        let node = Expr {
            id: NodeIdGen::new().fresh(),
            kind: ExprKind::Call {
                callee: Box::new(Expr { id: NodeIdGen::new().fresh(), kind: ExprKind::Identifier("println".into()), range: TextRange::default() }),
                args: CallArgs { positional: vec![Expr { id: NodeIdGen::new().fresh(), kind: ExprKind::Literal(Literal::Int(1)), range: TextRange::default() }], named: vec![], explicit_type_args: None },
            },
            range: TextRange::default(),
        };
        if let ExprKind::Call { callee, args } = &node.kind {
            assert_eq!(emit_call(&ctx, &node, callee, args), "console.log(1)");
        }
    }

    #[test]
    fn reduce_swaps_callback_and_initial_value() {
        let ctx = ValidationContext::new("test.doof");
        let arr = Expr { id: NodeIdGen::new().fresh(), kind: ExprKind::Identifier("xs".into()), range: TextRange::default() };
        let initial = Expr { id: NodeIdGen::new().fresh(), kind: ExprKind::Literal(Literal::Int(0)), range: TextRange::default() };
        let callback = Expr { id: NodeIdGen::new().fresh(), kind: ExprKind::Identifier("add".into()), range: TextRange::default() };
        let node = Expr {
            id: NodeIdGen::new().fresh(),
            kind: ExprKind::Call {
                callee: Box::new(Expr {
                    id: NodeIdGen::new().fresh(),
                    kind: ExprKind::Member { object: Box::new(arr), property: "reduce".into(), computed: false },
                    range: TextRange::default(),
                }),
                args: CallArgs { positional: vec![initial, callback], named: vec![], explicit_type_args: None },
            },
            range: TextRange::default(),
        };
        if let ExprKind::Call { callee, args } = &node.kind {
            assert_eq!(emit_call(&ctx, &node, callee, args), "xs.reduce(add, 0)");
        }
    }
}
