//! Expression AST nodes

use crate::lexer::Token;
use serde::{Deserialize, Serialize};

/// An expression with the token that introduced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub token: Token,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(token: Token, kind: ExprKind) -> Self {
        Expr { token, kind }
    }

    /// Whether this expression names a storage slot (`x`, `r.f`, `a[i]`, `.f`).
    pub fn is_place(&self) -> bool {
        match &self.kind {
            ExprKind::Variable(_)
            | ExprKind::Member { .. }
            | ExprKind::Index { .. }
            | ExprKind::WithField(_) => true,
            // `a(i) = v` indexes an array variable
            ExprKind::Call { callee, args } => {
                matches!(callee.kind, ExprKind::Variable(_)) && args.len() == 1
            }
            _ => false,
        }
    }

    /// Constant numeric value of a literal, looking through unary signs.
    pub fn constant_number(&self) -> Option<f64> {
        match &self.kind {
            ExprKind::Number(n) => Some(*n),
            ExprKind::Unary { op: UnaryOp::Neg, operand } => operand.constant_number().map(|n| -n),
            ExprKind::Unary { op: UnaryOp::Plus, operand } => operand.constant_number(),
            _ => None,
        }
    }
}

/// Expression kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Numeric literal (also `TRUE`/`FALSE` as -1/0)
    Number(f64),
    /// String literal
    Str(String),
    /// Variable or global name reference
    Variable(String),
    /// `[a, b, c]`
    Array(Vec<Expr>),
    /// `{key: value}` anonymous record
    Object(Vec<(String, Expr)>),
    /// `TypeName{field: value}`
    Record {
        type_name: String,
        fields: Vec<(String, Expr)>,
    },
    /// `.field` inside a WITH block
    WithField(String),

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `cond ? a : b`
    Ternary {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// `callee(args)`
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `object.name`
    Member {
        object: Box<Expr>,
        name: String,
    },
    /// `object[index]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    /// `expr...` or `...expr`; only meaningful in argument and array lists
    Spread(Box<Expr>),
    /// `AWAIT expr`
    Await(Box<Expr>),
    /// `NEW TypeName` or `NEW TypeName(args)`
    New {
        type_name: String,
        args: Option<Vec<Expr>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Pow,
    Concat,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::IntDiv => "\\",
            BinaryOp::Mod => "MOD",
            BinaryOp::Pow => "^",
            BinaryOp::Concat => "&",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        };
        write!(f, "{s}")
    }
}
