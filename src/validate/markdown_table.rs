//! Markdown decision-table desugaring (spec §3.2 "markdown-table").
//! A table is sugar for a chain of `if` statements: each row's
//! conditions must all hold (a row is a conjunction) for that row's
//! actions to run; rows are tried top-to-bottom, first match wins.

use crate::ast::{Block, Expr, MarkdownTable, Stmt, TextRange};
use crate::context::ValidationContext;
use crate::diagnostics::{ErrorKind, ValidationError};
use crate::types::Type;

use super::expr::validate_expr;

pub fn validate_table(ctx: &mut ValidationContext, table: &MarkdownTable) -> Type {
    for row in &table.rows {
        for cond in &row.conditions {
            let ty = validate_expr(ctx, cond, Some(&Type::bool_()));
            if !ty.structurally_equal(&Type::bool_()) {
                ctx.error(ValidationError::new(
                    ErrorKind::TypeMismatch,
                    "decision-table condition must be bool",
                ));
            }
        }
        for action in &row.actions {
            validate_expr(ctx, action, None);
        }
    }
    Type::void()
}

/// Lower a decision table to the `if`-chain it desugars to, so the
/// backends only ever need to handle ordinary statements — no
/// codegen path needs to know markdown tables exist.
pub fn desugar_to_stmt(table: &MarkdownTable, range: TextRange) -> Stmt {
    build_chain(&table.rows, range)
}

fn build_chain(rows: &[crate::ast::MarkdownTableRow], range: TextRange) -> Stmt {
    match rows.split_first() {
        None => Stmt::Block(Block { stmts: vec![], range }),
        Some((row, rest)) => {
            let cond = conjunction(&row.conditions, range);
            let then_branch = Block {
                stmts: row
                    .actions
                    .iter()
                    .cloned()
                    .map(|e| Stmt::Expr(e, range))
                    .collect(),
                range,
            };
            let else_branch = if rest.is_empty() {
                None
            } else {
                Some(Box::new(build_chain(rest, range)))
            };
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                range,
            }
        }
    }
}

fn conjunction(conditions: &[Expr], range: TextRange) -> Expr {
    let mut iter = conditions.iter().cloned();
    let Some(first) = iter.next() else {
        return Expr {
            id: crate::ast::NodeIdGen::new().fresh(),
            kind: crate::ast::ExprKind::Literal(crate::ast::Literal::Bool(true)),
            range,
        };
    };
    iter.fold(first, |acc, next| Expr {
        id: crate::ast::NodeIdGen::new().fresh(),
        kind: crate::ast::ExprKind::Binary {
            op: crate::ast::BinOp::And,
            left: Box::new(acc),
            right: Box::new(next),
        },
        range,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, Literal, MarkdownTableRow};

    fn bool_expr(b: bool) -> Expr {
        Expr {
            id: crate::ast::NodeIdGen::new().fresh(),
            kind: ExprKind::Literal(Literal::Bool(b)),
            range: TextRange::default(),
        }
    }

    #[test]
    fn single_row_desugars_to_plain_if() {
        let table = MarkdownTable {
            condition_headers: vec!["cond".into()],
            action_headers: vec!["action".into()],
            rows: vec![MarkdownTableRow {
                conditions: vec![bool_expr(true)],
                actions: vec![bool_expr(false)],
            }],
        };
        let stmt = desugar_to_stmt(&table, TextRange::default());
        match stmt {
            Stmt::If { else_branch, .. } => assert!(else_branch.is_none()),
            _ => panic!("expected if"),
        }
    }

    #[test]
    fn multiple_rows_chain_via_else() {
        let table = MarkdownTable {
            condition_headers: vec!["cond".into()],
            action_headers: vec!["action".into()],
            rows: vec![
                MarkdownTableRow { conditions: vec![bool_expr(true)], actions: vec![] },
                MarkdownTableRow { conditions: vec![bool_expr(false)], actions: vec![] },
            ],
        };
        let stmt = desugar_to_stmt(&table, TextRange::default());
        match stmt {
            Stmt::If { else_branch: Some(_), .. } => {}
            _ => panic!("expected chained if/else"),
        }
    }
}
