//! Statement parsing

use super::Parser;
use crate::ast::{
    Accessor, BinaryOp, CaseClause, CaseTest, CatchClause, ExitKind, Expr, ExprKind, FieldDecl,
    FunctionDecl, IfBranch, LoopCondition, LoopKind, Param, PrintItem, PrintSeparator,
    PropertyDecl, Stmt, StmtKind, TypeAnnotation, TypeDecl,
};
use crate::error::Result;
use crate::lexer::{Token, TokenKind};

/// Keywords that may follow END to close a block
fn is_block_keyword(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::If
            | TokenKind::Try
            | TokenKind::Function
            | TokenKind::Sub
            | TokenKind::With
            | TokenKind::Select
            | TokenKind::Defer
            | TokenKind::Type
            | TokenKind::Property
            | TokenKind::While
    )
}

impl Parser {
    /// Parse statements until `is_end` holds or input runs out.
    pub(super) fn parse_block<F>(&mut self, is_end: F) -> Result<Vec<Stmt>>
    where
        F: Fn(&Parser) -> bool,
    {
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            if self.check(&TokenKind::Eof) || is_end(self) {
                break;
            }
            if self.at_block_close() {
                return Err(self.error_here(format!("unexpected {}", self.describe_block_close())));
            }
            let Some(stmt) = self.parse_line_statement()? else {
                continue;
            };
            statements.push(stmt);
            if !(self.at_statement_end() || is_end(self)) {
                return Err(self.error_here(format!(
                    "expected end of statement, found {}",
                    self.describe_current()
                )));
            }
        }
        Ok(statements)
    }

    /// Statements after a single-line `THEN`/`ELSE`: up to end of line.
    ///
    /// A NEXT also ends the block when it closes a FOR opened before the
    /// IF, as in `FOR I = 1 TO 3: IF I = 2 THEN PRINT I: NEXT I`.
    fn parse_inline_block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();
        let mut open_fors = 0usize;
        loop {
            let separator = self.pos;
            while self.match_kind(&TokenKind::Colon) {}
            if self.at_inline_end(open_fors) {
                // Leave the separator for the enclosing block's NEXT
                if self.check(&TokenKind::Next) {
                    self.pos = separator;
                }
                break;
            }
            let stmt = self.parse_statement()?;
            match stmt.kind {
                StmtKind::For { .. } => open_fors += 1,
                StmtKind::Next { .. } => open_fors = open_fors.saturating_sub(1),
                _ => {}
            }
            statements.push(stmt);
            if !(self.check(&TokenKind::Colon) || self.at_inline_end(open_fors)) {
                return Err(self.error_here(format!(
                    "expected end of statement, found {}",
                    self.describe_current()
                )));
            }
        }
        Ok(statements)
    }

    fn at_inline_end(&self, open_fors: usize) -> bool {
        match self.peek_kind() {
            TokenKind::Newline | TokenKind::Eof => true,
            TokenKind::Next => open_fors == 0,
            _ => self.at_block_close(),
        }
    }

    /// A token that closes or splits an enclosing block
    pub(super) fn at_block_close(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Catch
            | TokenKind::Finally
            | TokenKind::Wend
            | TokenKind::Loop
            | TokenKind::Case
            | TokenKind::Else
            | TokenKind::ElseIf => true,
            TokenKind::End => is_block_keyword(self.peek_nth_kind(1)),
            _ => false,
        }
    }

    fn describe_block_close(&self) -> String {
        if self.check(&TokenKind::End) {
            format!("END {}", self.tokens[self.pos + 1].lexeme.to_ascii_uppercase())
        } else {
            self.peek().lexeme.to_ascii_uppercase()
        }
    }

    pub(super) fn at_statement_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Colon | TokenKind::Eof
        ) || self.at_block_close()
    }

    fn at_end_of(&self, kind: &TokenKind) -> bool {
        self.check(&TokenKind::End) && self.peek_nth_kind(1) == kind
    }

    fn expect_end(&mut self, kind: &TokenKind, opener: &Token) -> Result<()> {
        if self.at_end_of(kind) {
            self.advance();
            self.advance();
            Ok(())
        } else {
            let name = opener.lexeme.to_ascii_uppercase();
            Err(self.error_here(format!(
                "expected END {name} to close {name} at line {}, found {}",
                opener.line,
                self.describe_current()
            )))
        }
    }

    /// A statement with its optional line number / label prefix.
    /// Returns `None` for a prefix standing alone on its line.
    fn parse_line_statement(&mut self) -> Result<Option<Stmt>> {
        let mut line_number = None;
        let mut label = None;
        if self.at_line_start {
            if let TokenKind::Number(n) = *self.peek_kind() {
                if n < 0.0 || n.fract() != 0.0 || n > f64::from(u32::MAX) {
                    return Err(self.error_here("line numbers must be non-negative integers"));
                }
                line_number = Some(n as u32);
                self.advance();
            }
            if let TokenKind::Ident(name) = self.peek_kind().clone() {
                if self.peek_nth_kind(1) == &TokenKind::Colon {
                    label = Some(name);
                    self.advance();
                    self.advance();
                }
            }
        }
        if matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Eof | TokenKind::Colon) {
            if line_number.is_some() || label.is_some() {
                return Ok(None);
            }
        }
        let mut stmt = self.parse_statement()?;
        stmt.line_number = line_number;
        stmt.label = label;
        Ok(Some(stmt))
    }

    pub(super) fn parse_statement(&mut self) -> Result<Stmt> {
        match self.peek_kind() {
            TokenKind::Let => self.parse_let(),
            TokenKind::Print | TokenKind::Question => self.parse_print(),
            TokenKind::Input => self.parse_input(),
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::Next => self.parse_next(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Error => self.parse_raise(),
            TokenKind::Defer => self.parse_defer(),
            TokenKind::Function => self.parse_function(false),
            TokenKind::Sub => self.parse_function(true),
            TokenKind::Property => self.parse_property(),
            TokenKind::With => self.parse_with(),
            TokenKind::Select => self.parse_select(),
            TokenKind::Exit => self.parse_exit(),
            TokenKind::Continue => self.parse_continue(),
            TokenKind::Type => self.parse_type_decl(),
            TokenKind::Dim => self.parse_dim(),
            TokenKind::Spawn => self.parse_spawn(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Call => self.parse_call(),
            TokenKind::End => {
                let token = self.advance();
                Ok(self.make_stmt(token, StmtKind::End))
            }
            TokenKind::Stop => {
                let token = self.advance();
                Ok(self.make_stmt(token, StmtKind::Stop))
            }
            _ => self.parse_assignment_or_call(),
        }
    }

    fn parse_let(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let target = self.parse_postfix()?;
        if !target.is_place() {
            return Err(self.error_at(&target.token, "cannot assign to this expression"));
        }
        self.expect(&TokenKind::Eq, "'=' after LET target")?;
        let value = self.parse_expression()?;
        Ok(self.make_stmt(
            token,
            StmtKind::Assign {
                target,
                value,
                explicit_let: true,
            },
        ))
    }

    fn parse_assignment_or_call(&mut self) -> Result<Stmt> {
        let token = self.peek().clone();
        let target = self.parse_postfix()?;
        if self.match_kind(&TokenKind::Eq) {
            if !target.is_place() {
                return Err(self.error_at(&target.token, "cannot assign to this expression"));
            }
            let value = self.parse_expression()?;
            return Ok(self.make_stmt(
                token,
                StmtKind::Assign {
                    target,
                    value,
                    explicit_let: false,
                },
            ));
        }
        let call = self.into_call(target)?;
        Ok(self.make_stmt(token, StmtKind::Call(call)))
    }

    /// Statement-position expressions must be calls; a bare name or member
    /// becomes a call with no arguments.
    fn into_call(&self, expr: Expr) -> Result<Expr> {
        match expr.kind {
            ExprKind::Call { .. } => Ok(expr),
            ExprKind::Variable(_) | ExprKind::Member { .. } => {
                let token = expr.token.clone();
                Ok(Expr::new(
                    token,
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args: Vec::new(),
                    },
                ))
            }
            _ => Err(self.error_at(
                &expr.token,
                format!("expected a statement, found '{}'", expr.token.lexeme),
            )),
        }
    }

    fn parse_print(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let mut items = Vec::new();
        let mut newline = true;
        while !self.at_statement_end() && !self.check(&TokenKind::Next) {
            let expr = self.parse_expression()?;
            let separator = if self.match_kind(&TokenKind::Semi) {
                Some(PrintSeparator::Semicolon)
            } else if self.match_kind(&TokenKind::Comma) {
                Some(PrintSeparator::Comma)
            } else {
                None
            };
            newline = separator.is_none();
            items.push(PrintItem { expr, separator });
            if separator.is_none() {
                break;
            }
        }
        Ok(self.make_stmt(token, StmtKind::Print { items, newline }))
    }

    fn parse_input(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let mut prompt = None;
        if let TokenKind::Str(text) = self.peek_kind().clone() {
            if matches!(self.peek_nth_kind(1), TokenKind::Semi | TokenKind::Comma) {
                self.advance();
                self.advance();
                prompt = Some(text);
            }
        }
        let mut targets = Vec::new();
        loop {
            let target = self.parse_postfix()?;
            if !target.is_place() {
                return Err(self.error_at(&target.token, "INPUT needs a variable"));
            }
            targets.push(target);
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        Ok(self.make_stmt(token, StmtKind::Input { prompt, targets }))
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let cond = self.parse_expression()?;
        self.expect(&TokenKind::Then, "THEN")?;

        if !matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Eof) {
            let body = self.parse_inline_block()?;
            let else_branch = if self.match_kind(&TokenKind::Else) {
                Some(self.parse_inline_block()?)
            } else {
                None
            };
            return Ok(self.make_stmt(
                token,
                StmtKind::If {
                    branches: vec![IfBranch { cond, body }],
                    else_branch,
                    block_form: false,
                },
            ));
        }

        let branch_end = |p: &Parser| {
            matches!(p.peek_kind(), TokenKind::ElseIf | TokenKind::Else) || p.at_end_of(&TokenKind::If)
        };
        let mut branches = vec![IfBranch {
            cond,
            body: self.parse_block(branch_end)?,
        }];
        while self.match_kind(&TokenKind::ElseIf) {
            let cond = self.parse_expression()?;
            self.expect(&TokenKind::Then, "THEN after ELSEIF")?;
            let body = self.parse_block(branch_end)?;
            branches.push(IfBranch { cond, body });
        }
        let else_branch = if self.match_kind(&TokenKind::Else) {
            Some(self.parse_block(|p| p.at_end_of(&TokenKind::If))?)
        } else {
            None
        };
        self.expect_end(&TokenKind::If, &token)?;
        Ok(self.make_stmt(
            token,
            StmtKind::If {
                branches,
                else_branch,
                block_form: true,
            },
        ))
    }

    fn parse_for(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let (var, _) = self.expect_ident("loop variable after FOR")?;
        self.expect(&TokenKind::Eq, "'=' after FOR variable")?;
        let start = self.parse_expression()?;
        self.expect(&TokenKind::To, "TO")?;
        let end = self.parse_expression()?;
        let step = if self.match_kind(&TokenKind::Step) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(self.make_stmt(token, StmtKind::For { var, start, end, step }))
    }

    fn parse_next(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let var = match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Some(name)
            }
            _ => None,
        };
        Ok(self.make_stmt(token, StmtKind::Next { var }))
    }

    fn parse_while(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let cond = self.parse_expression()?;
        let body = self.parse_block(|p| p.check(&TokenKind::Wend) || p.at_end_of(&TokenKind::While))?;
        if !self.match_kind(&TokenKind::Wend) {
            self.expect_end(&TokenKind::While, &token)?;
        }
        Ok(self.make_stmt(token, StmtKind::While { cond, body }))
    }

    fn parse_loop_condition(&mut self) -> Result<Option<LoopCondition>> {
        let until = match self.peek_kind() {
            TokenKind::While => false,
            TokenKind::Until => true,
            _ => return Ok(None),
        };
        self.advance();
        let cond = self.parse_expression()?;
        Ok(Some(LoopCondition { until, cond }))
    }

    fn parse_do(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let pre = self.parse_loop_condition()?;
        let body = self.parse_block(|p| p.check(&TokenKind::Loop))?;
        let loop_token = self.expect(&TokenKind::Loop, "LOOP to close DO")?;
        let post = self.parse_loop_condition()?;
        if pre.is_some() && post.is_some() {
            return Err(self.error_at(&loop_token, "DO loop cannot test a condition at both ends"));
        }
        Ok(self.make_stmt(token, StmtKind::DoLoop { pre, post, body }))
    }

    fn parse_try(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let body = self.parse_block(|p| {
            matches!(p.peek_kind(), TokenKind::Catch | TokenKind::Finally) || p.at_end_of(&TokenKind::Try)
        })?;
        let catch = if self.match_kind(&TokenKind::Catch) {
            let var = match self.peek_kind().clone() {
                TokenKind::Ident(name) => {
                    self.advance();
                    Some(name)
                }
                _ => None,
            };
            let body = self.parse_block(|p| p.check(&TokenKind::Finally) || p.at_end_of(&TokenKind::Try))?;
            Some(CatchClause { var, body })
        } else {
            None
        };
        let finally = if self.match_kind(&TokenKind::Finally) {
            Some(self.parse_block(|p| p.at_end_of(&TokenKind::Try))?)
        } else {
            None
        };
        self.expect_end(&TokenKind::Try, &token)?;
        Ok(self.make_stmt(token, StmtKind::Try { body, catch, finally }))
    }

    fn parse_raise(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let message = self.parse_expression()?;
        let code = if self.match_kind(&TokenKind::Comma) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(self.make_stmt(token, StmtKind::Raise { message, code }))
    }

    fn parse_defer(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let body = if matches!(self.peek_kind(), TokenKind::Newline) {
            let body = self.parse_block(|p| p.at_end_of(&TokenKind::Defer))?;
            self.expect_end(&TokenKind::Defer, &token)?;
            body
        } else {
            while self.match_kind(&TokenKind::Colon) {}
            vec![self.parse_statement()?]
        };
        Ok(self.make_stmt(token, StmtKind::Defer { body }))
    }

    fn parse_type_annotation(&mut self) -> Result<TypeAnnotation> {
        let (name, _) = self.expect_name("type name after AS")?;
        Ok(TypeAnnotation::from_name(&name))
    }

    fn parse_params(&mut self) -> Result<Vec<Param>> {
        let mut params: Vec<Param> = Vec::new();
        if !self.match_kind(&TokenKind::LParen) {
            return Ok(params);
        }
        self.skip_newlines();
        if self.match_kind(&TokenKind::RParen) {
            return Ok(params);
        }
        loop {
            self.skip_newlines();
            let by_ref = self.match_kind(&TokenKind::Ref);
            if !by_ref && self.check_soft_keyword("BYVAL") {
                self.advance();
            }
            let (name, name_token) = self.expect_ident("parameter name")?;
            if params.iter().any(|p| p.variadic) {
                return Err(self.error_at(&name_token, "a variadic parameter must be last"));
            }
            if params.iter().any(|p| p.name.eq_ignore_ascii_case(&name)) {
                return Err(self.error_at(&name_token, format!("duplicate parameter '{name}'")));
            }
            let variadic = self.match_kind(&TokenKind::Ellipsis);
            let ty = if self.match_kind(&TokenKind::As) {
                Some(self.parse_type_annotation()?)
            } else {
                None
            };
            let default = if self.match_kind(&TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            if variadic && (by_ref || default.is_some()) {
                return Err(self.error_at(&name_token, "a variadic parameter cannot be REF or have a default"));
            }
            params.push(Param {
                name,
                by_ref,
                ty,
                default,
                variadic,
            });
            self.skip_newlines();
            if self.match_kind(&TokenKind::Comma) {
                continue;
            }
            self.expect(&TokenKind::RParen, "')' after parameters")?;
            break;
        }
        Ok(params)
    }

    fn parse_function(&mut self, is_sub: bool) -> Result<Stmt> {
        let token = self.advance();
        let (name, _) = self.expect_ident(if is_sub { "SUB name" } else { "FUNCTION name" })?;
        let params = self.parse_params()?;
        let return_type = if self.match_kind(&TokenKind::As) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        let closer = if is_sub { TokenKind::Sub } else { TokenKind::Function };
        let body = self.parse_block(|p| p.at_end_of(&closer))?;
        self.expect_end(&closer, &token)?;
        Ok(self.make_stmt(
            token,
            StmtKind::Function(FunctionDecl {
                name,
                params,
                return_type,
                body,
                is_sub,
            }),
        ))
    }

    fn parse_property(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let (type_name, _) = self.expect_ident("type name after PROPERTY")?;
        self.expect(&TokenKind::Dot, "'.' between type and property name")?;
        let (name, _) = self.expect_name("property name")?;
        let params = self.parse_params()?;
        let return_type = if self.match_kind(&TokenKind::As) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        let accessor = if self.check_soft_keyword("GET") {
            self.advance();
            Accessor::Get
        } else if self.check_soft_keyword("SET") {
            self.advance();
            Accessor::Set
        } else {
            Accessor::Get
        };

        let expected_params = match accessor {
            Accessor::Get => 1,
            Accessor::Set => 2,
        };
        if params.len() != expected_params {
            return Err(self.error_at(
                &token,
                format!("property {type_name}.{name} must take {expected_params} parameter(s)"),
            ));
        }
        if let Some(ty) = &params[0].ty {
            if !matches!(ty, TypeAnnotation::Named(n) if n.eq_ignore_ascii_case(&type_name)) {
                return Err(self.error_at(
                    &token,
                    format!("first parameter of property {type_name}.{name} must be AS {type_name}"),
                ));
            }
        }

        let body = self.parse_block(|p| p.at_end_of(&TokenKind::Property))?;
        self.expect_end(&TokenKind::Property, &token)?;
        Ok(self.make_stmt(
            token,
            StmtKind::Property(PropertyDecl {
                type_name,
                name,
                params,
                return_type,
                accessor,
                body,
            }),
        ))
    }

    fn parse_with(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let target = self.parse_expression()?;
        let body = self.parse_block(|p| p.at_end_of(&TokenKind::With))?;
        self.expect_end(&TokenKind::With, &token)?;
        Ok(self.make_stmt(token, StmtKind::With { target, body }))
    }

    fn parse_select(&mut self) -> Result<Stmt> {
        let token = self.advance();
        self.expect(&TokenKind::Case, "CASE after SELECT")?;
        let selector = self.parse_expression()?;
        let case_end = |p: &Parser| p.check(&TokenKind::Case) || p.at_end_of(&TokenKind::Select);

        let mut cases = Vec::new();
        let mut else_body = None;
        loop {
            self.skip_separators();
            if self.at_end_of(&TokenKind::Select) {
                break;
            }
            let case_token = self.expect(&TokenKind::Case, "CASE")?;
            if else_body.is_some() {
                return Err(self.error_at(&case_token, "CASE after CASE ELSE"));
            }
            if self.match_kind(&TokenKind::Else) {
                else_body = Some(self.parse_block(case_end)?);
                continue;
            }
            let tests = self.parse_case_tests()?;
            let body = self.parse_block(case_end)?;
            cases.push(CaseClause {
                token: case_token,
                tests,
                body,
            });
        }
        self.expect_end(&TokenKind::Select, &token)?;
        Ok(self.make_stmt(
            token,
            StmtKind::Select {
                selector,
                cases,
                else_body,
            },
        ))
    }

    fn parse_case_tests(&mut self) -> Result<Vec<CaseTest>> {
        let mut tests = Vec::new();
        loop {
            if self.check_soft_keyword("IS") {
                self.advance();
                let op = match self.peek_kind() {
                    TokenKind::Eq => BinaryOp::Eq,
                    TokenKind::NotEq => BinaryOp::NotEq,
                    TokenKind::Lt => BinaryOp::Lt,
                    TokenKind::Gt => BinaryOp::Gt,
                    TokenKind::LtEq => BinaryOp::LtEq,
                    TokenKind::GtEq => BinaryOp::GtEq,
                    _ => return Err(self.error_here("expected comparison operator after CASE IS")),
                };
                self.advance();
                tests.push(CaseTest::Is(op, self.parse_expression()?));
            } else {
                let value = self.parse_expression()?;
                if self.match_kind(&TokenKind::To) {
                    tests.push(CaseTest::Range(value, self.parse_expression()?));
                } else {
                    tests.push(CaseTest::Value(value));
                }
            }
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        Ok(tests)
    }

    fn parse_exit(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let kind = match self.peek_kind() {
            TokenKind::For => ExitKind::Loop(LoopKind::For),
            TokenKind::While => ExitKind::Loop(LoopKind::While),
            TokenKind::Do => ExitKind::Loop(LoopKind::Do),
            TokenKind::Sub => ExitKind::Sub,
            TokenKind::Function => ExitKind::Function,
            _ => return Err(self.error_here("expected FOR, WHILE, DO, SUB or FUNCTION after EXIT")),
        };
        self.advance();
        Ok(self.make_stmt(token, StmtKind::Exit(kind)))
    }

    fn parse_continue(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let kind = match self.peek_kind() {
            TokenKind::For => Some(LoopKind::For),
            TokenKind::While => Some(LoopKind::While),
            TokenKind::Do => Some(LoopKind::Do),
            _ => None,
        };
        if kind.is_some() {
            self.advance();
        }
        Ok(self.make_stmt(token, StmtKind::Continue(kind)))
    }

    fn parse_type_decl(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let (name, _) = self.expect_ident("type name after TYPE")?;

        let mut spread: Option<Vec<(String, Token)>> = None;
        if self.check_soft_keyword("SPREAD") {
            self.advance();
            self.expect(&TokenKind::LParen, "'(' after SPREAD")?;
            let mut names = Vec::new();
            loop {
                names.push(self.expect_name("field name in SPREAD")?);
                if !self.match_kind(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RParen, "')' after SPREAD fields")?;
            spread = Some(names);
        }

        let mut fields: Vec<FieldDecl> = Vec::new();
        loop {
            self.skip_separators();
            if self.at_end_of(&TokenKind::Type) || self.check(&TokenKind::Eof) {
                break;
            }
            let (field_name, field_token) = self.expect_name("field name")?;
            if fields.iter().any(|f| f.name == field_name) {
                return Err(self.error_at(&field_token, format!("duplicate field '{field_name}' in TYPE {name}")));
            }
            let ty = if self.match_kind(&TokenKind::As) {
                self.parse_type_annotation()?
            } else {
                TypeAnnotation::infer_from_suffix(&field_name)
            };
            fields.push(FieldDecl { name: field_name, ty });
        }
        self.expect_end(&TokenKind::Type, &token)?;

        let spread = match spread {
            Some(names) => {
                for (field, field_token) in &names {
                    if !fields.iter().any(|f| &f.name == field) {
                        return Err(self.error_at(
                            field_token,
                            format!("SPREAD names unknown field '{field}' of TYPE {name}"),
                        ));
                    }
                }
                Some(names.into_iter().map(|(n, _)| n).collect())
            }
            None => None,
        };
        Ok(self.make_stmt(token, StmtKind::TypeDecl(TypeDecl { name, fields, spread })))
    }

    fn parse_dim(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let (name, _) = self.expect_ident("variable name after DIM")?;
        let size = if self.match_kind(&TokenKind::LParen) {
            let size = self.parse_expression()?;
            self.expect(&TokenKind::RParen, "')' after DIM size")?;
            Some(size)
        } else {
            None
        };
        let ty = if self.match_kind(&TokenKind::As) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        Ok(self.make_stmt(token, StmtKind::Dim { name, size, ty }))
    }

    fn parse_spawn(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let name = match self.peek_kind().clone() {
            TokenKind::Ident(name) | TokenKind::Str(name) => {
                self.advance();
                name
            }
            _ => return Err(self.error_here("expected routine name after SPAWN")),
        };
        Ok(self.make_stmt(token, StmtKind::Spawn { name }))
    }

    fn parse_return(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let value = if self.at_statement_end() || self.check(&TokenKind::Next) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        Ok(self.make_stmt(token, StmtKind::Return(value)))
    }

    fn parse_call(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let target = self.parse_postfix()?;
        let call = self.into_call(target)?;
        Ok(self.make_stmt(token, StmtKind::Call(call)))
    }
}
