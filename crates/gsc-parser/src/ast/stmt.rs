//! Statement nodes.

use super::expr::Expr;
use gsc_core::Span;

/// A statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stmt<'ast> {
    /// A call, assignment or increment followed by `;`.
    Expr(ExprStmt<'ast>),
    /// A lone `;`.
    Empty(Span),
    /// `{ ... }`
    Block(Block<'ast>),
    /// `/# ... #/`, compiled only in dev builds.
    DevBlock(Block<'ast>),
    If(&'ast IfStmt<'ast>),
    While(&'ast WhileStmt<'ast>),
    For(&'ast ForStmt<'ast>),
    Return(ReturnStmt<'ast>),
    Wait(WaitStmt<'ast>),
    Break(Span),
    Continue(Span),
}

impl<'ast> Stmt<'ast> {
    /// The source span of this statement.
    pub fn span(&self) -> Span {
        match self {
            Stmt::Expr(s) => s.span,
            Stmt::Empty(span) | Stmt::Break(span) | Stmt::Continue(span) => *span,
            Stmt::Block(b) | Stmt::DevBlock(b) => b.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Wait(s) => s.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExprStmt<'ast> {
    pub expr: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'ast> {
    pub stmts: &'ast [Stmt<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfStmt<'ast> {
    pub condition: &'ast Expr<'ast>,
    pub then_stmt: &'ast Stmt<'ast>,
    pub else_stmt: Option<&'ast Stmt<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhileStmt<'ast> {
    pub condition: &'ast Expr<'ast>,
    pub body: &'ast Stmt<'ast>,
    pub span: Span,
}

/// `for (init; condition; step) body`. Every clause may be empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForStmt<'ast> {
    pub init: Option<&'ast Expr<'ast>>,
    pub condition: Option<&'ast Expr<'ast>>,
    pub step: Option<&'ast Expr<'ast>>,
    pub body: &'ast Stmt<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnStmt<'ast> {
    pub value: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitStmt<'ast> {
    pub duration: &'ast Expr<'ast>,
    pub span: Span,
}
