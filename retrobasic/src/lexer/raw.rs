//! Raw token definitions produced by logos, before keyword resolution

use logos::Logos;

fn unquote(slice: &str) -> String {
    slice[1..slice.len() - 1].replace("\"\"", "\"")
}

/// Raw scanner output
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\f]+")]
pub(crate) enum RawToken {
    #[token("\n")]
    Newline,

    #[regex(r"'[^\n]*", |lex| lex.slice()[1..].to_string())]
    Comment(String),

    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok(), priority = 3)]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok(), priority = 3)]
    Number(f64),

    /// Mantissa with a dangling exponent marker such as `1e` or `2.5E+`
    #[regex(r"([0-9]+(\.[0-9]+)?|\.[0-9]+)[eE][+-]?", priority = 2)]
    MalformedNumber,

    #[regex(r#""([^"\n]|"")*""#, |lex| unquote(lex.slice()))]
    Str(String),

    /// A string cut off by end of line or end of input
    #[regex(r#""([^"\n]|"")*"#)]
    UnterminatedStr,

    #[regex(r"[A-Za-z_#][A-Za-z0-9_#]*[$%!&]?", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("\\")]
    Backslash,
    #[token("^")]
    Caret,
    #[token("&")]
    Amp,
    #[token("=")]
    Eq,
    #[token("<>")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("?")]
    Question,
}
