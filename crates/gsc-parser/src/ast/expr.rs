//! Expression nodes.

use super::Ident;
use super::ops::{AssignOp, BinaryOp, PostfixOp, UnaryOp};
use gsc_core::Span;

/// An expression. Larger variants are arena references so the enum stays small.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'ast> {
    /// Literal value.
    Literal(LiteralExpr<'ast>),
    /// Local variable.
    Ident(Ident<'ast>),
    /// `self`
    SelfRef(Span),
    /// `level`
    Level(Span),
    /// `[]`
    EmptyArray(Span),
    /// `object.field`
    Field(&'ast FieldExpr<'ast>),
    /// `object[index]`
    Index(&'ast IndexExpr<'ast>),
    /// Any function call.
    Call(&'ast CallExpr<'ast>),
    /// `::name` or `path::name`
    FuncRef(FuncRefExpr<'ast>),
    /// `-x`, `!x`
    Unary(&'ast UnaryExpr<'ast>),
    /// `a + b`
    Binary(&'ast BinaryExpr<'ast>),
    /// `a = b`, `a += b`
    Assign(&'ast AssignExpr<'ast>),
    /// `a++`, `a--`
    Postfix(&'ast PostfixExpr<'ast>),
}

impl<'ast> Expr<'ast> {
    /// The source span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(e) => e.span,
            Expr::Ident(e) => e.span,
            Expr::SelfRef(span) | Expr::Level(span) | Expr::EmptyArray(span) => *span,
            Expr::Field(e) => e.span,
            Expr::Index(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::FuncRef(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Assign(e) => e.span,
            Expr::Postfix(e) => e.span,
        }
    }

    /// Whether this expression may stand alone as a statement.
    pub fn is_statement_expr(&self) -> bool {
        matches!(self, Expr::Call(_) | Expr::Assign(_) | Expr::Postfix(_))
    }
}

/// A literal with its span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralExpr<'ast> {
    pub kind: LiteralKind<'ast>,
    pub span: Span,
}

/// Literal values. String contents are unescaped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralKind<'ast> {
    Int(i32),
    Float(f32),
    Bool(bool),
    String(&'ast str),
    IString(&'ast str),
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldExpr<'ast> {
    pub object: &'ast Expr<'ast>,
    pub field: Ident<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexExpr<'ast> {
    pub object: &'ast Expr<'ast>,
    pub index: &'ast Expr<'ast>,
    pub span: Span,
}

/// The function a call names: `name` or `path::name`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallTarget<'ast> {
    pub path: Option<&'ast str>,
    pub name: Ident<'ast>,
}

/// A function call.
///
/// `caller` is set for method calls (`self foo()`); `threaded` for
/// `thread foo()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallExpr<'ast> {
    pub caller: Option<&'ast Expr<'ast>>,
    pub target: CallTarget<'ast>,
    pub args: &'ast [&'ast Expr<'ast>],
    pub threaded: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuncRefExpr<'ast> {
    pub target: CallTarget<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnaryExpr<'ast> {
    pub op: UnaryOp,
    pub operand: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryExpr<'ast> {
    pub left: &'ast Expr<'ast>,
    pub op: BinaryOp,
    pub right: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignExpr<'ast> {
    pub target: &'ast Expr<'ast>,
    pub op: AssignOp,
    pub value: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostfixExpr<'ast> {
    pub operand: &'ast Expr<'ast>,
    pub op: PostfixOp,
    pub span: Span,
}
