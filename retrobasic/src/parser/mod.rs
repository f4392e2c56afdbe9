//! Recursive-descent parser
//!
//! Statement parsing lives in `stmt.rs`, the precedence ladder in `expr.rs`.
//! After the tree is built, `bindings::build_loop_bindings` pairs every FOR
//! with its NEXT; pairing failures are reported as parse errors.

mod bindings;
mod expr;
mod stmt;

#[cfg(test)]
mod tests;

pub use bindings::build_loop_bindings;

use crate::ast::{Program, Stmt, StmtId, StmtKind};
use crate::error::{Error, Result};
use crate::lexer::{Token, TokenKind, tokenize};

/// Parse a token stream (as produced by [`tokenize`]) into a program
pub fn parse(tokens: Vec<Token>) -> Result<Program> {
    let mut parser = Parser::new(tokens);
    let statements = parser.parse_program()?;
    let loop_bindings = build_loop_bindings(&statements)?;
    Ok(Program {
        statements,
        loop_bindings,
    })
}

/// Tokenize and parse source text
pub fn parse_source(source: &str) -> Result<Program> {
    parse(tokenize(source)?)
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_id: u32,
    /// True when the previous significant token ended a line
    at_line_start: bool,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        // Comments kept by the scanner carry no meaning for the grammar.
        let mut tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| !matches!(t.kind, TokenKind::Comment(_)))
            .collect();
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let end = tokens.last().map(|t| t.span).unwrap_or_default();
            let mut eof = Token::synthetic(TokenKind::Eof, "");
            eof.span = crate::ast::Span::new(end.end, end.end);
            tokens.push(eof);
        }
        Parser {
            tokens,
            pos: 0,
            next_id: 0,
            at_line_start: true,
        }
    }

    fn parse_program(&mut self) -> Result<Vec<Stmt>> {
        let statements = self.parse_block(|_| false)?;
        if !self.check(&TokenKind::Eof) {
            return Err(self.error_here(format!("unexpected {}", self.describe_current())));
        }
        Ok(statements)
    }

    // ---------------------------------------------------------------
    // Token cursor
    // ---------------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_nth_kind(&self, n: usize) -> &TokenKind {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        self.at_line_start = token.kind == TokenKind::Newline;
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn match_kind(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!("expected {what}, found {}", self.describe_current())))
        }
    }

    /// Identifier (soft keywords such as GET/SET/IS arrive as identifiers)
    fn expect_ident(&mut self, what: &str) -> Result<(String, Token)> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                let token = self.advance();
                Ok((name, token))
            }
            _ => Err(self.error_here(format!("expected {what}, found {}", self.describe_current()))),
        }
    }

    /// Identifier or keyword used as a name (member names, field names)
    fn expect_name(&mut self, what: &str) -> Result<(String, Token)> {
        match self.peek().name().map(str::to_string) {
            Some(name) => {
                let token = self.advance();
                Ok((name, token))
            }
            None => Err(self.error_here(format!("expected {what}, found {}", self.describe_current()))),
        }
    }

    fn check_soft_keyword(&self, word: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Ident(name) if name.eq_ignore_ascii_case(word))
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    /// Skip statement separators: newlines and `:`
    fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Colon) {
            self.advance();
        }
    }

    fn next_stmt_id(&mut self) -> StmtId {
        let id = StmtId(self.next_id);
        self.next_id += 1;
        id
    }

    fn make_stmt(&mut self, token: Token, kind: StmtKind) -> Stmt {
        Stmt {
            id: self.next_stmt_id(),
            token,
            line_number: None,
            label: None,
            kind,
        }
    }

    // ---------------------------------------------------------------
    // Diagnostics
    // ---------------------------------------------------------------

    fn describe_current(&self) -> String {
        let token = self.peek();
        match &token.kind {
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", token.lexeme),
        }
    }

    fn error_here(&self, message: impl Into<String>) -> Error {
        let token = self.peek();
        Error::parser(message, token.span, token.position())
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> Error {
        Error::parser(message, token.span, token.position())
    }
}
