//! Abstract Syntax Tree definitions

mod expr;
mod span;
mod types;

pub use expr::*;
pub use span::*;
pub use types::*;

use crate::lexer::Token;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parsed program: the top-level statement block plus its FOR/NEXT pairing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub loop_bindings: LoopBindings,
}

/// Unique statement identity within one parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StmtId(pub u32);

/// A FOR/NEXT pair, as indices into the block that holds both statements.
///
/// NEXT continues at `for_index + 1`; a loop that runs zero times (or is
/// left with EXIT FOR) resumes at `next_index + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopBinding {
    pub for_index: usize,
    pub next_index: usize,
}

/// Loop bindings keyed by both the FOR and the NEXT statement id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopBindings {
    pub bindings: BTreeMap<StmtId, LoopBinding>,
}

impl LoopBindings {
    pub fn get(&self, id: StmtId) -> Option<LoopBinding> {
        self.bindings.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// A statement with the token that introduced it.
///
/// `line_number` and `label` are cosmetic: they record what prefixed the
/// source line the statement starts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub id: StmtId,
    pub token: Token,
    pub line_number: Option<u32>,
    pub label: Option<String>,
    pub kind: StmtKind,
}

/// Statement kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// `LET target = value` or `target = value`
    Assign {
        target: Expr,
        value: Expr,
        explicit_let: bool,
    },
    Print {
        items: Vec<PrintItem>,
        /// False when the statement ends in `;` or `,`
        newline: bool,
    },
    Input {
        prompt: Option<String>,
        targets: Vec<Expr>,
    },
    If {
        branches: Vec<IfBranch>,
        else_branch: Option<Vec<Stmt>>,
        block_form: bool,
    },
    For {
        var: String,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
    },
    Next {
        var: Option<String>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    DoLoop {
        pre: Option<LoopCondition>,
        post: Option<LoopCondition>,
        body: Vec<Stmt>,
    },
    Try {
        body: Vec<Stmt>,
        catch: Option<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },
    /// `ERROR message [, code]`
    Raise {
        message: Expr,
        code: Option<Expr>,
    },
    Defer {
        body: Vec<Stmt>,
    },
    Function(FunctionDecl),
    Property(PropertyDecl),
    With {
        target: Expr,
        body: Vec<Stmt>,
    },
    Select {
        selector: Expr,
        cases: Vec<CaseClause>,
        else_body: Option<Vec<Stmt>>,
    },
    Exit(ExitKind),
    Continue(Option<LoopKind>),
    TypeDecl(TypeDecl),
    Dim {
        name: String,
        size: Option<Expr>,
        ty: Option<TypeAnnotation>,
    },
    Spawn {
        name: String,
    },
    Return(Option<Expr>),
    /// `CALL f(args)` or a bare call statement
    Call(Expr),
    End,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintItem {
    pub expr: Expr,
    pub separator: Option<PrintSeparator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrintSeparator {
    /// `;` joins directly
    Semicolon,
    /// `,` inserts a tab
    Comma,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfBranch {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopCondition {
    pub until: bool,
    pub cond: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub var: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseClause {
    pub token: Token,
    pub tests: Vec<CaseTest>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaseTest {
    /// `CASE a`
    Value(Expr),
    /// `CASE a TO b`
    Range(Expr, Expr),
    /// `CASE IS > a`
    Is(BinaryOp, Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopKind {
    For,
    While,
    Do,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitKind {
    Loop(LoopKind),
    Sub,
    Function,
}

/// `FUNCTION` or `SUB` declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeAnnotation>,
    pub body: Vec<Stmt>,
    pub is_sub: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub by_ref: bool,
    pub ty: Option<TypeAnnotation>,
    pub default: Option<Expr>,
    /// Trailing `name...` collecting remaining arguments into an array
    pub variadic: bool,
}

impl Param {
    /// Declared type, or the naming-convention default.
    pub fn effective_type(&self) -> TypeAnnotation {
        match (&self.ty, self.variadic) {
            (Some(ty), _) => ty.clone(),
            (None, true) => TypeAnnotation::Array,
            (None, false) => TypeAnnotation::infer_from_suffix(&self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accessor {
    Get,
    Set,
}

/// `PROPERTY TypeName.Name(self AS TypeName[, value AS T]) [AS T] GET|SET`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub type_name: String,
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeAnnotation>,
    pub accessor: Accessor,
    pub body: Vec<Stmt>,
}

/// `TYPE Name [SPREAD(f, ...)] ... END TYPE`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub spread: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeAnnotation,
}
