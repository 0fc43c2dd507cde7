//! Statement parsing.

use super::parser::Parser;
use crate::ast::expr::Expr;
use crate::ast::stmt::*;
use crate::lexer::TokenKind;
use bumpalo::collections::Vec as BVec;
use gsc_core::{ParseError, ParseErrorKind};

impl<'ast> Parser<'ast> {
    /// Parse a statement.
    pub fn parse_statement(&mut self) -> Result<Stmt<'ast>, ParseError> {
        self.nested(Self::parse_statement_kind)
    }

    fn parse_statement_kind(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let token = *self.peek();

        match token.kind {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),

            TokenKind::Return => {
                self.advance();
                let value = if self.check(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr(0)?)
                };
                let end = self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Return(ReturnStmt {
                    value,
                    span: token.span.merge(end.span),
                }))
            }
            TokenKind::Wait => {
                self.advance();
                let duration = self.parse_expr(0)?;
                let end = self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Wait(WaitStmt {
                    duration,
                    span: token.span.merge(end.span),
                }))
            }
            TokenKind::Break => {
                self.advance();
                let end = self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Break(token.span.merge(end.span)))
            }
            TokenKind::Continue => {
                self.advance();
                let end = self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Continue(token.span.merge(end.span)))
            }

            TokenKind::LeftBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::DevBlockStart => self.parse_dev_block(),
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::Empty(token.span))
            }

            _ => self.parse_expr_stmt(),
        }
    }

    /// `{ stmt* }`
    pub fn parse_block(&mut self) -> Result<Block<'ast>, ParseError> {
        let open = self.expect(TokenKind::LeftBrace)?;
        let stmts = self.parse_statements_until(TokenKind::RightBrace)?;
        let close = self.expect(TokenKind::RightBrace)?;
        Ok(Block {
            stmts,
            span: open.span.merge(close.span),
        })
    }

    /// `/# stmt* #/`
    fn parse_dev_block(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let open = self.expect(TokenKind::DevBlockStart)?;
        let stmts = self.parse_statements_until(TokenKind::DevBlockEnd)?;
        let close = self.expect(TokenKind::DevBlockEnd)?;
        Ok(Stmt::DevBlock(Block {
            stmts,
            span: open.span.merge(close.span),
        }))
    }

    fn parse_statements_until(
        &mut self,
        terminator: TokenKind,
    ) -> Result<&'ast [Stmt<'ast>], ParseError> {
        let mut stmts = BVec::new_in(self.arena);
        while !self.check(terminator) && !self.is_eof() {
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts.into_bump_slice())
    }

    /// Only calls, assignments and increments may stand alone.
    fn parse_expr_stmt(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let expr = self.parse_expr(0)?;
        if !expr.is_statement_expr() {
            return Err(ParseError::new(
                ParseErrorKind::ExpectedStatement,
                expr.span(),
                "expression statement must be a call, assignment or increment",
            ));
        }
        let end = self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::Expr(ExprStmt {
            expr,
            span: expr.span().merge(end.span),
        }))
    }

    fn parse_if(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.expect(TokenKind::If)?.span;
        let condition = self.parse_condition()?;
        let then_stmt: &'ast Stmt<'ast> = self.arena.alloc(self.parse_statement()?);

        let else_stmt = if self.eat(TokenKind::Else).is_some() {
            let stmt: &'ast Stmt<'ast> = self.arena.alloc(self.parse_statement()?);
            Some(stmt)
        } else {
            None
        };

        let end = else_stmt.map_or(then_stmt.span(), |s| s.span());
        Ok(Stmt::If(self.arena.alloc(IfStmt {
            condition,
            then_stmt,
            else_stmt,
            span: start.merge(end),
        })))
    }

    fn parse_while(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.expect(TokenKind::While)?.span;
        let condition = self.parse_condition()?;
        let body: &'ast Stmt<'ast> = self.arena.alloc(self.parse_statement()?);
        Ok(Stmt::While(self.arena.alloc(WhileStmt {
            condition,
            body,
            span: start.merge(body.span()),
        })))
    }

    /// `for (init; condition; step) body`
    fn parse_for(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.expect(TokenKind::For)?.span;
        self.expect(TokenKind::LeftParen)?;
        let init = self.parse_optional_expr(TokenKind::Semicolon)?;
        self.expect(TokenKind::Semicolon)?;
        let condition = self.parse_optional_expr(TokenKind::Semicolon)?;
        self.expect(TokenKind::Semicolon)?;
        let step = self.parse_optional_expr(TokenKind::RightParen)?;
        self.expect(TokenKind::RightParen)?;
        let body: &'ast Stmt<'ast> = self.arena.alloc(self.parse_statement()?);

        Ok(Stmt::For(self.arena.alloc(ForStmt {
            init,
            condition,
            step,
            body,
            span: start.merge(body.span()),
        })))
    }

    fn parse_condition(&mut self) -> Result<&'ast Expr<'ast>, ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let condition = self.parse_expr(0)?;
        self.expect(TokenKind::RightParen)?;
        Ok(condition)
    }

    fn parse_optional_expr(
        &mut self,
        terminator: TokenKind,
    ) -> Result<Option<&'ast Expr<'ast>>, ParseError> {
        if self.check(terminator) {
            Ok(None)
        } else {
            self.parse_expr(0).map(Some)
        }
    }
}
