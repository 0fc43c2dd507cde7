//! Expression parsing using Pratt parsing (precedence climbing).

use super::parser::Parser;
use crate::ast::expr::*;
use crate::ast::{AssignOp, BinaryOp, Ident, PostfixOp, UnaryOp};
use crate::lexer::TokenKind;
use bumpalo::collections::Vec as BVec;
use gsc_core::{ParseError, ParseErrorKind, Span};

/// Binding power of postfix forms: `++`, `.field`, `[index]`, method calls.
const POSTFIX_BP: u8 = 17;

impl<'ast> Parser<'ast> {
    /// Parse an expression with a minimum binding power.
    pub fn parse_expr(&mut self, min_bp: u8) -> Result<&'ast Expr<'ast>, ParseError> {
        self.nested(|parser| parser.parse_expr_bp(min_bp))
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<&'ast Expr<'ast>, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            if let Some(op) = PostfixOp::from_token(self.peek().kind) {
                if POSTFIX_BP < min_bp {
                    break;
                }
                let op_token = self.advance();
                let span = lhs.span().merge(op_token.span);
                lhs = self.arena.alloc(Expr::Postfix(self.arena.alloc(PostfixExpr {
                    operand: lhs,
                    op,
                    span,
                })));
                continue;
            }

            if self.check(TokenKind::Dot) {
                if POSTFIX_BP < min_bp {
                    break;
                }
                self.advance();
                let field = self.expect_ident()?;
                let span = lhs.span().merge(field.span);
                lhs = self.arena.alloc(Expr::Field(self.arena.alloc(FieldExpr {
                    object: lhs,
                    field,
                    span,
                })));
                continue;
            }

            if self.check(TokenKind::LeftBracket) {
                if POSTFIX_BP < min_bp {
                    break;
                }
                self.advance();
                let index = self.parse_expr(0)?;
                let close = self.expect(TokenKind::RightBracket)?;
                let span = lhs.span().merge(close.span);
                lhs = self.arena.alloc(Expr::Index(self.arena.alloc(IndexExpr {
                    object: lhs,
                    index,
                    span,
                })));
                continue;
            }

            if self.starts_method_call() {
                if POSTFIX_BP < min_bp {
                    break;
                }
                let threaded = self.eat(TokenKind::Thread).is_some();
                lhs = self.parse_call(Some(lhs), threaded, lhs.span())?;
                continue;
            }

            if let Some(op) = AssignOp::from_token(self.peek().kind) {
                let (l_bp, r_bp) = AssignOp::binding_power();
                if l_bp < min_bp {
                    break;
                }
                self.advance();
                let value = self.parse_expr(r_bp)?;
                let span = lhs.span().merge(value.span());
                lhs = self.arena.alloc(Expr::Assign(self.arena.alloc(AssignExpr {
                    target: lhs,
                    op,
                    value,
                    span,
                })));
                continue;
            }

            if let Some(op) = BinaryOp::from_token(self.peek().kind) {
                let (l_bp, r_bp) = op.binding_power();
                if l_bp < min_bp {
                    break;
                }
                self.advance();
                let right = self.parse_expr(r_bp)?;
                let span = lhs.span().merge(right.span());
                lhs = self.arena.alloc(Expr::Binary(self.arena.alloc(BinaryExpr {
                    left: lhs,
                    op,
                    right,
                    span,
                })));
                continue;
            }

            break;
        }

        Ok(lhs)
    }

    /// Parse the start of an expression.
    fn parse_prefix(&mut self) -> Result<&'ast Expr<'ast>, ParseError> {
        let token = *self.peek();

        match token.kind {
            TokenKind::IntLiteral => {
                self.advance();
                let value = token.lexeme.parse::<i32>().map_err(|_| {
                    ParseError::new(
                        ParseErrorKind::InvalidLiteral,
                        token.span,
                        format!("integer literal '{}' out of range", token.lexeme),
                    )
                })?;
                Ok(self.literal(LiteralKind::Int(value), token.span))
            }
            TokenKind::FloatLiteral => {
                self.advance();
                let value = token.lexeme.parse::<f32>().map_err(|_| {
                    ParseError::new(
                        ParseErrorKind::InvalidLiteral,
                        token.span,
                        format!("invalid float literal '{}'", token.lexeme),
                    )
                })?;
                Ok(self.literal(LiteralKind::Float(value), token.span))
            }
            TokenKind::StringLiteral => {
                self.advance();
                let text = self.unescape(token.lexeme, token.span)?;
                Ok(self.literal(LiteralKind::String(text), token.span))
            }
            TokenKind::IStringLiteral => {
                self.advance();
                let text = self.unescape(token.lexeme.trim_start_matches('&'), token.span)?;
                Ok(self.literal(LiteralKind::IString(text), token.span))
            }
            TokenKind::True => {
                self.advance();
                Ok(self.literal(LiteralKind::Bool(true), token.span))
            }
            TokenKind::False => {
                self.advance();
                Ok(self.literal(LiteralKind::Bool(false), token.span))
            }
            TokenKind::Undefined => {
                self.advance();
                Ok(self.literal(LiteralKind::Undefined, token.span))
            }
            TokenKind::SelfKw => {
                self.advance();
                Ok(self.arena.alloc(Expr::SelfRef(token.span)))
            }
            TokenKind::Level => {
                self.advance();
                Ok(self.arena.alloc(Expr::Level(token.span)))
            }

            TokenKind::Identifier => {
                match self.peek_nth(1).kind {
                    TokenKind::LeftParen | TokenKind::ColonColon => self.parse_call_or_ref(token.span),
                    _ => {
                        self.advance();
                        Ok(self
                            .arena
                            .alloc(Expr::Ident(Ident::new(token.lexeme, token.span))))
                    }
                }
            }
            TokenKind::Path | TokenKind::ColonColon => self.parse_call_or_ref(token.span),
            TokenKind::Thread => {
                self.advance();
                self.parse_call(None, true, token.span)
            }

            TokenKind::LeftBracket => {
                self.advance();
                let close = self.expect(TokenKind::RightBracket)?;
                Ok(self.arena.alloc(Expr::EmptyArray(token.span.merge(close.span))))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expr(0)?;
                self.expect(TokenKind::RightParen)?;
                Ok(inner)
            }

            TokenKind::Minus | TokenKind::Bang => {
                self.advance();
                let op = if token.kind == TokenKind::Bang {
                    UnaryOp::Not
                } else {
                    UnaryOp::Neg
                };
                let operand = self.parse_expr(UnaryOp::binding_power())?;
                let span = token.span.merge(operand.span());
                Ok(self.arena.alloc(Expr::Unary(self.arena.alloc(UnaryExpr {
                    op,
                    operand,
                    span,
                }))))
            }

            TokenKind::Eof => Err(ParseError::unexpected_eof(token.span)),
            _ => Err(ParseError::expected_expression(token.span, token.kind.description())),
        }
    }

    /// `name(...)`, `path::name(...)`, `::name` or `path::name`.
    fn parse_call_or_ref(&mut self, start: Span) -> Result<&'ast Expr<'ast>, ParseError> {
        let target = self.parse_call_target()?;
        if self.check(TokenKind::LeftParen) {
            return self.finish_call(None, target, false, start);
        }
        Ok(self.arena.alloc(Expr::FuncRef(FuncRefExpr {
            target,
            span: self.span_from(start),
        })))
    }

    /// A call target after an optional caller and `thread`.
    fn parse_call(
        &mut self,
        caller: Option<&'ast Expr<'ast>>,
        threaded: bool,
        start: Span,
    ) -> Result<&'ast Expr<'ast>, ParseError> {
        let target = self.parse_call_target()?;
        if !self.check(TokenKind::LeftParen) {
            let found = self.peek();
            return Err(ParseError::expected_token(found.span, "'('", found.kind.description()));
        }
        self.finish_call(caller, target, threaded, start)
    }

    /// `name`, `path::name` or `::name`.
    fn parse_call_target(&mut self) -> Result<CallTarget<'ast>, ParseError> {
        let token = *self.peek();
        let path = match token.kind {
            TokenKind::ColonColon => {
                self.advance();
                None
            }
            TokenKind::Path => {
                self.advance();
                self.expect(TokenKind::ColonColon)?;
                Some(token.lexeme)
            }
            TokenKind::Identifier if self.peek_nth(1).kind == TokenKind::ColonColon => {
                self.advance();
                self.advance();
                Some(token.lexeme)
            }
            _ => None,
        };
        let name = self.expect_ident()?;
        Ok(CallTarget { path, name })
    }

    fn finish_call(
        &mut self,
        caller: Option<&'ast Expr<'ast>>,
        target: CallTarget<'ast>,
        threaded: bool,
        start: Span,
    ) -> Result<&'ast Expr<'ast>, ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let mut args = BVec::new_in(self.arena);
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.parse_expr(0)?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RightParen)?;

        Ok(self.arena.alloc(Expr::Call(self.arena.alloc(CallExpr {
            caller,
            target,
            args: args.into_bump_slice(),
            threaded,
            span: start.merge(close.span),
        }))))
    }

    /// Whether the tokens ahead start `caller name(...)`, `caller path::name(...)`
    /// or `caller thread ...`.
    fn starts_method_call(&self) -> bool {
        match self.peek().kind {
            TokenKind::Thread => true,
            TokenKind::Identifier => matches!(
                self.peek_nth(1).kind,
                TokenKind::LeftParen | TokenKind::ColonColon
            ),
            TokenKind::Path => self.peek_nth(1).kind == TokenKind::ColonColon,
            _ => false,
        }
    }

    fn literal(&self, kind: LiteralKind<'ast>, span: Span) -> &'ast Expr<'ast> {
        self.arena.alloc(Expr::Literal(LiteralExpr { kind, span }))
    }

    /// Strip the quotes and process escapes: `\n`, `\t`, `\r`, `\\`, `\"`.
    fn unescape(&self, lexeme: &str, span: Span) -> Result<&'ast str, ParseError> {
        let content = lexeme
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(lexeme);

        if !content.contains('\\') {
            return Ok(self.arena.alloc_str(content));
        }

        let mut text = String::with_capacity(content.len());
        let mut chars = content.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                text.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => text.push('\n'),
                Some('t') => text.push('\t'),
                Some('r') => text.push('\r'),
                Some('\\') => text.push('\\'),
                Some('"') => text.push('"'),
                other => {
                    let shown = other.map(String::from).unwrap_or_default();
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidLiteral,
                        span,
                        format!("unknown escape sequence: \\{shown}"),
                    ));
                }
            }
        }
        Ok(self.arena.alloc_str(&text))
    }
}
