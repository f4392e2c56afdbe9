//! Token definitions

use crate::ast::{Position, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token kinds after keyword resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals and names
    Number(f64),
    Str(String),
    Ident(String),
    Comment(String),

    // Keywords
    Let,
    Print,
    Input,
    If,
    Then,
    Else,
    ElseIf,
    End,
    For,
    To,
    Step,
    Next,
    While,
    Wend,
    Do,
    Loop,
    Until,
    Try,
    Catch,
    Finally,
    Error,
    Defer,
    Function,
    Sub,
    Return,
    Call,
    Ref,
    As,
    Property,
    With,
    Select,
    Case,
    Exit,
    Continue,
    Type,
    Dim,
    Spawn,
    Stop,
    Await,
    New,
    And,
    Or,
    Not,
    Mod,
    True,
    False,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Backslash,
    Caret,
    Amp,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Colon,
    Dot,
    Ellipsis,
    Question,

    Newline,
    Eof,
}

impl TokenKind {
    /// Resolve a reserved word. Suffixed names (`LEFT$`) are never keywords.
    pub fn keyword(text: &str) -> Option<TokenKind> {
        let kind = match text.to_ascii_uppercase().as_str() {
            "LET" => TokenKind::Let,
            "PRINT" => TokenKind::Print,
            "INPUT" => TokenKind::Input,
            "IF" => TokenKind::If,
            "THEN" => TokenKind::Then,
            "ELSE" => TokenKind::Else,
            "ELSEIF" => TokenKind::ElseIf,
            "END" => TokenKind::End,
            "FOR" => TokenKind::For,
            "TO" => TokenKind::To,
            "STEP" => TokenKind::Step,
            "NEXT" => TokenKind::Next,
            "WHILE" => TokenKind::While,
            "WEND" => TokenKind::Wend,
            "DO" => TokenKind::Do,
            "LOOP" => TokenKind::Loop,
            "UNTIL" => TokenKind::Until,
            "TRY" => TokenKind::Try,
            "CATCH" => TokenKind::Catch,
            "FINALLY" => TokenKind::Finally,
            "ERROR" => TokenKind::Error,
            "DEFER" => TokenKind::Defer,
            "FUNCTION" => TokenKind::Function,
            "SUB" => TokenKind::Sub,
            "RETURN" => TokenKind::Return,
            "CALL" => TokenKind::Call,
            "REF" => TokenKind::Ref,
            "AS" => TokenKind::As,
            "PROPERTY" => TokenKind::Property,
            "WITH" => TokenKind::With,
            "SELECT" => TokenKind::Select,
            "CASE" => TokenKind::Case,
            "EXIT" => TokenKind::Exit,
            "CONTINUE" => TokenKind::Continue,
            "TYPE" => TokenKind::Type,
            "DIM" => TokenKind::Dim,
            "SPAWN" => TokenKind::Spawn,
            "STOP" => TokenKind::Stop,
            "AWAIT" => TokenKind::Await,
            "NEW" => TokenKind::New,
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "NOT" => TokenKind::Not,
            "MOD" => TokenKind::Mod,
            "TRUE" => TokenKind::True,
            "FALSE" => TokenKind::False,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether this is a reserved word (usable as a member name after `.`)
    pub fn is_keyword(&self) -> bool {
        !matches!(
            self,
            TokenKind::Number(_)
                | TokenKind::Str(_)
                | TokenKind::Ident(_)
                | TokenKind::Comment(_)
                | TokenKind::Newline
                | TokenKind::Eof
        ) && !self.is_symbol()
    }

    fn is_symbol(&self) -> bool {
        matches!(
            self,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Backslash
                | TokenKind::Caret
                | TokenKind::Amp
                | TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::LtEq
                | TokenKind::GtEq
                | TokenKind::LParen
                | TokenKind::RParen
                | TokenKind::LBracket
                | TokenKind::RBracket
                | TokenKind::LBrace
                | TokenKind::RBrace
                | TokenKind::Comma
                | TokenKind::Semi
                | TokenKind::Colon
                | TokenKind::Dot
                | TokenKind::Ellipsis
                | TokenKind::Question
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {n}"),
            TokenKind::Str(s) => write!(f, "string \"{s}\""),
            TokenKind::Ident(name) => write!(f, "identifier '{name}'"),
            TokenKind::Comment(_) => write!(f, "comment"),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Eof => write!(f, "end of input"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A scanned token. The lexeme is kept verbatim for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span, position: Position) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            span,
            line: position.line,
            column: position.column,
        }
    }

    /// A token with no source location, for nodes synthesised by the runtime.
    pub fn synthetic(kind: TokenKind, lexeme: impl Into<String>) -> Self {
        Token::new(kind, lexeme, Span::default(), Position::default())
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// Identifier text, or the lexeme of a keyword used as a member name.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(name) => Some(name),
            kind if kind.is_keyword() => Some(&self.lexeme),
            _ => None,
        }
    }
}
