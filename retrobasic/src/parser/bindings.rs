//! FOR/NEXT pairing
//!
//! FOR and NEXT are separate statements of the same block. This pass pairs
//! them once after parsing so the evaluator can jump by index: a named NEXT
//! closes the innermost FOR with that variable, an unnamed one closes the
//! innermost open FOR.

use crate::ast::{LoopBinding, LoopBindings, Stmt, StmtId, StmtKind};
use crate::error::{Error, Result};
use crate::lexer::Token;
use crate::util::strip_type_suffix;

struct OpenFor<'a> {
    var: &'a str,
    index: usize,
    id: StmtId,
    token: &'a Token,
}

fn bind_error(token: &Token, message: impl Into<String>) -> Error {
    Error::parser(message, token.span, token.position())
}

/// Pair every FOR with its NEXT across the whole program, nested blocks included.
pub fn build_loop_bindings(statements: &[Stmt]) -> Result<LoopBindings> {
    let mut bindings = LoopBindings::default();
    bind_block(statements, &mut bindings)?;
    Ok(bindings)
}

fn bind_block(block: &[Stmt], bindings: &mut LoopBindings) -> Result<()> {
    let mut open: Vec<OpenFor<'_>> = Vec::new();

    for (index, stmt) in block.iter().enumerate() {
        match &stmt.kind {
            StmtKind::For { var, step, .. } => {
                if step.as_ref().and_then(|s| s.constant_number()) == Some(0.0) {
                    return Err(bind_error(&stmt.token, format!("FOR {var} has STEP 0")));
                }
                open.push(OpenFor {
                    var,
                    index,
                    id: stmt.id,
                    token: &stmt.token,
                });
            }
            StmtKind::Next { var } => {
                let Some(innermost) = open.last() else {
                    return Err(bind_error(&stmt.token, next_without_for(var.as_deref())));
                };
                if let Some(name) = var {
                    let wanted = strip_type_suffix(name);
                    if strip_type_suffix(innermost.var) != wanted {
                        return Err(if open.iter().any(|f| strip_type_suffix(f.var) == wanted) {
                            bind_error(
                                innermost.token,
                                format!("FOR {} without NEXT (found NEXT {name})", innermost.var),
                            )
                        } else {
                            bind_error(&stmt.token, next_without_for(Some(name)))
                        });
                    }
                }
                if let Some(for_stmt) = open.pop() {
                    let binding = LoopBinding {
                        for_index: for_stmt.index,
                        next_index: index,
                    };
                    bindings.bindings.insert(for_stmt.id, binding);
                    bindings.bindings.insert(stmt.id, binding);
                }
            }
            _ => {}
        }
        for child in child_blocks(stmt) {
            bind_block(child, bindings)?;
        }
    }

    match open.first() {
        Some(unclosed) => Err(bind_error(unclosed.token, format!("FOR {} without NEXT", unclosed.var))),
        None => Ok(()),
    }
}

fn next_without_for(var: Option<&str>) -> String {
    match var {
        Some(name) => format!("NEXT {name} without FOR"),
        None => "NEXT without FOR".to_string(),
    }
}

/// Nested statement blocks owned by a statement
fn child_blocks(stmt: &Stmt) -> Vec<&[Stmt]> {
    match &stmt.kind {
        StmtKind::If {
            branches,
            else_branch,
            ..
        } => branches
            .iter()
            .map(|b| b.body.as_slice())
            .chain(else_branch.as_deref())
            .collect(),
        StmtKind::While { body, .. }
        | StmtKind::DoLoop { body, .. }
        | StmtKind::Defer { body }
        | StmtKind::With { body, .. } => vec![body.as_slice()],
        StmtKind::Try { body, catch, finally } => {
            let mut blocks = vec![body.as_slice()];
            if let Some(catch) = catch {
                blocks.push(catch.body.as_slice());
            }
            blocks.extend(finally.as_deref());
            blocks
        }
        StmtKind::Function(decl) => vec![decl.body.as_slice()],
        StmtKind::Property(decl) => vec![decl.body.as_slice()],
        StmtKind::Select { cases, else_body, .. } => cases
            .iter()
            .map(|c| c.body.as_slice())
            .chain(else_body.as_deref())
            .collect(),
        _ => Vec::new(),
    }
}
