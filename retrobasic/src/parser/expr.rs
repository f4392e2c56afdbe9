//! Expression parsing: precedence ladder from ternary down to primaries

use super::Parser;
use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::error::Result;
use crate::lexer::TokenKind;

impl Parser {
    pub(super) fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Expr> {
        let cond = self.parse_or()?;
        if !self.check(&TokenKind::Question) {
            return Ok(cond);
        }
        let token = self.advance();
        let then_branch = self.parse_expression()?;
        self.expect(&TokenKind::Colon, "':' in conditional expression")?;
        let else_branch = self.parse_ternary()?;
        Ok(Expr::new(
            token,
            ExprKind::Ternary {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
        ))
    }

    /// One left-associative binary level
    fn parse_binary_level(
        &mut self,
        ops: fn(&TokenKind) -> Option<BinaryOp>,
        next: fn(&mut Parser) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut left = next(self)?;
        while let Some(op) = ops(self.peek_kind()) {
            let token = self.advance();
            let right = next(self)?;
            left = Expr::new(
                token,
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        self.parse_binary_level(
            |k| matches!(k, TokenKind::Or).then_some(BinaryOp::Or),
            Parser::parse_and,
        )
    }

    fn parse_and(&mut self) -> Result<Expr> {
        self.parse_binary_level(
            |k| matches!(k, TokenKind::And).then_some(BinaryOp::And),
            Parser::parse_equality,
        )
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        self.parse_binary_level(
            |k| match k {
                TokenKind::Eq => Some(BinaryOp::Eq),
                TokenKind::NotEq => Some(BinaryOp::NotEq),
                _ => None,
            },
            Parser::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        self.parse_binary_level(
            |k| match k {
                TokenKind::Lt => Some(BinaryOp::Lt),
                TokenKind::Gt => Some(BinaryOp::Gt),
                TokenKind::LtEq => Some(BinaryOp::LtEq),
                TokenKind::GtEq => Some(BinaryOp::GtEq),
                _ => None,
            },
            Parser::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        self.parse_binary_level(
            |k| match k {
                TokenKind::Plus => Some(BinaryOp::Add),
                TokenKind::Minus => Some(BinaryOp::Sub),
                TokenKind::Amp => Some(BinaryOp::Concat),
                _ => None,
            },
            Parser::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        self.parse_binary_level(
            |k| match k {
                TokenKind::Star => Some(BinaryOp::Mul),
                TokenKind::Slash => Some(BinaryOp::Div),
                TokenKind::Backslash => Some(BinaryOp::IntDiv),
                TokenKind::Mod => Some(BinaryOp::Mod),
                _ => None,
            },
            Parser::parse_power,
        )
    }

    // `^` takes unary operands on both sides, so `2^-1` parses.
    fn parse_power(&mut self) -> Result<Expr> {
        self.parse_binary_level(
            |k| matches!(k, TokenKind::Caret).then_some(BinaryOp::Pow),
            Parser::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Await => {
                let token = self.advance();
                let operand = self.parse_unary()?;
                return Ok(Expr::new(token, ExprKind::Await(Box::new(operand))));
            }
            TokenKind::Ellipsis => {
                let token = self.advance();
                let operand = self.parse_unary()?;
                return Ok(Expr::new(token, ExprKind::Spread(Box::new(operand))));
            }
            TokenKind::New => return self.parse_new(),
            _ => return self.parse_postfix(),
        };
        let token = self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::new(
            token,
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
        ))
    }

    fn parse_new(&mut self) -> Result<Expr> {
        let token = self.advance();
        let (type_name, _) = self.expect_ident("type name after NEW")?;
        let args = if self.check(&TokenKind::LParen) {
            Some(self.parse_args()?)
        } else {
            None
        };
        let expr = Expr::new(token, ExprKind::New { type_name, args });
        self.parse_postfix_tail(expr)
    }

    /// Primary followed by any call / member / index / spread chain
    pub(super) fn parse_postfix(&mut self) -> Result<Expr> {
        let expr = self.parse_primary()?;
        self.parse_postfix_tail(expr)
    }

    fn parse_postfix_tail(&mut self, mut expr: Expr) -> Result<Expr> {
        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    let token = self.peek().clone();
                    let args = self.parse_args()?;
                    expr = Expr::new(
                        token,
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    let (name, token) = self.expect_name("member name after '.'")?;
                    expr = Expr::new(
                        token,
                        ExprKind::Member {
                            object: Box::new(expr),
                            name,
                        },
                    );
                }
                TokenKind::LBracket => {
                    let token = self.advance();
                    self.skip_newlines();
                    let index = self.parse_expression()?;
                    self.skip_newlines();
                    self.expect(&TokenKind::RBracket, "']' after index")?;
                    expr = Expr::new(
                        token,
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                    );
                }
                TokenKind::Ellipsis => {
                    let token = self.advance();
                    return Ok(Expr::new(token, ExprKind::Spread(Box::new(expr))));
                }
                _ => return Ok(expr),
            }
        }
    }

    /// `( args )`, newlines allowed between arguments
    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        self.expect(&TokenKind::LParen, "'('")?;
        self.parse_list(&TokenKind::RParen, "')' after arguments", Parser::parse_expression)
    }

    /// Comma-separated items up to `close` (opening bracket already consumed)
    fn parse_list<T>(
        &mut self,
        close: &TokenKind,
        what: &str,
        mut item: impl FnMut(&mut Parser) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        self.skip_newlines();
        if self.match_kind(close) {
            return Ok(items);
        }
        loop {
            self.skip_newlines();
            items.push(item(self)?);
            self.skip_newlines();
            if self.match_kind(&TokenKind::Comma) {
                continue;
            }
            self.expect(close, what)?;
            return Ok(items);
        }
    }

    /// `name: value` inside a record or object literal
    fn parse_field_init(&mut self) -> Result<(String, Expr)> {
        let name = match self.peek_kind().clone() {
            TokenKind::Str(text) => {
                self.advance();
                text
            }
            _ => self.expect_name("field name")?.0,
        };
        self.expect(&TokenKind::Colon, "':' after field name")?;
        let value = self.parse_expression()?;
        Ok((name, value))
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.peek().clone();
        match token.kind.clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::new(token, ExprKind::Number(n)))
            }
            TokenKind::Str(text) => {
                self.advance();
                Ok(Expr::new(token, ExprKind::Str(text)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(token, ExprKind::Number(-1.0)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(token, ExprKind::Number(0.0)))
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.match_kind(&TokenKind::LBrace) {
                    let fields = self.parse_list(&TokenKind::RBrace, "'}' after record fields", Parser::parse_field_init)?;
                    return Ok(Expr::new(
                        token,
                        ExprKind::Record {
                            type_name: name,
                            fields,
                        },
                    ));
                }
                Ok(Expr::new(token, ExprKind::Variable(name)))
            }
            TokenKind::LParen => {
                self.advance();
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.advance();
                let items = self.parse_list(&TokenKind::RBracket, "']' after array elements", Parser::parse_expression)?;
                Ok(Expr::new(token, ExprKind::Array(items)))
            }
            TokenKind::LBrace => {
                self.advance();
                let fields = self.parse_list(&TokenKind::RBrace, "'}' after object fields", Parser::parse_field_init)?;
                Ok(Expr::new(token, ExprKind::Object(fields)))
            }
            TokenKind::Dot => {
                self.advance();
                let (name, _) = self.expect_name("field name after '.'")?;
                Ok(Expr::new(token, ExprKind::WithField(name)))
            }
            _ => Err(self.error_here(format!("expected expression, found {}", self.describe_current()))),
        }
    }
}
