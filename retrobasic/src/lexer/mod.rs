//! Lexer implementation using logos
//!
//! Newlines are significant and come out as [`TokenKind::Newline`]; the
//! token stream always ends with [`TokenKind::Eof`].

mod raw;
mod token;

pub use token::{Token, TokenKind};

use crate::ast::{LineIndex, Span};
use crate::error::{Error, Result};
use logos::Logos;
use raw::RawToken;

/// Scanner options
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Emit `REM` and `'` comments as [`TokenKind::Comment`] tokens
    pub keep_comments: bool,
}

/// Tokenize source code, dropping comments
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    tokenize_with(source, ScanOptions::default())
}

/// Tokenize source code
pub fn tokenize_with(source: &str, options: ScanOptions) -> Result<Vec<Token>> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let mut span = Span::new(lexer.span().start, lexer.span().end);
        let position = index.position(source, span.start);
        let kind = match result {
            Ok(raw) => match raw {
                RawToken::Ident(name) if name.eq_ignore_ascii_case("REM") => {
                    let rest = lexer.remainder();
                    let len = rest.find('\n').unwrap_or(rest.len());
                    let text = rest[..len].trim().to_string();
                    lexer.bump(len);
                    span.end += len;
                    TokenKind::Comment(text)
                }
                RawToken::MalformedNumber => {
                    return Err(Error::lexer(
                        format!("invalid numeric literal: {}", lexer.slice()),
                        span,
                        position,
                    ));
                }
                RawToken::UnterminatedStr => {
                    return Err(Error::lexer("unterminated string literal", span, position));
                }
                other => convert(other),
            },
            Err(()) => {
                let message = if lexer.slice().starts_with(|c: char| c.is_ascii_digit()) {
                    format!("invalid numeric literal: {}", lexer.slice())
                } else {
                    format!("unexpected character: {:?}", lexer.slice())
                };
                return Err(Error::lexer(message, span, position));
            }
        };

        if matches!(kind, TokenKind::Comment(_)) && !options.keep_comments {
            continue;
        }
        tokens.push(Token::new(kind, &source[span.start..span.end], span, position));
    }

    let end = Span::new(source.len(), source.len());
    tokens.push(Token::new(TokenKind::Eof, "", end, index.position(source, source.len())));
    Ok(tokens)
}

fn convert(raw: RawToken) -> TokenKind {
    match raw {
        RawToken::Newline => TokenKind::Newline,
        RawToken::Comment(text) => TokenKind::Comment(text.trim().to_string()),
        RawToken::Number(n) => TokenKind::Number(n),
        RawToken::Str(s) => TokenKind::Str(s),
        RawToken::Ident(name) => TokenKind::keyword(&name).unwrap_or(TokenKind::Ident(name)),
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Backslash => TokenKind::Backslash,
        RawToken::Caret => TokenKind::Caret,
        RawToken::Amp => TokenKind::Amp,
        RawToken::Eq => TokenKind::Eq,
        RawToken::NotEq => TokenKind::NotEq,
        RawToken::Lt => TokenKind::Lt,
        RawToken::Gt => TokenKind::Gt,
        RawToken::LtEq => TokenKind::LtEq,
        RawToken::GtEq => TokenKind::GtEq,
        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Semi => TokenKind::Semi,
        RawToken::Colon => TokenKind::Colon,
        RawToken::Dot => TokenKind::Dot,
        RawToken::Ellipsis => TokenKind::Ellipsis,
        RawToken::Question => TokenKind::Question,
        // Diagnosed by the caller before conversion.
        RawToken::MalformedNumber | RawToken::UnterminatedStr => TokenKind::Eof,
    }
}
