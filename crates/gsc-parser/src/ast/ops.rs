//! Operators and their binding powers.

use crate::lexer::TokenKind;
use std::fmt;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    LogicalOr,
    LogicalAnd,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// `(left, right)` binding power. Every binary operator is left-associative.
    pub fn binding_power(&self) -> (u8, u8) {
        use BinaryOp::*;
        match self {
            LogicalOr => (3, 4),
            LogicalAnd => (5, 6),
            Equal | NotEqual => (7, 8),
            Less | LessEqual | Greater | GreaterEqual => (9, 10),
            Add | Sub => (11, 12),
            Mul | Div | Mod => (13, 14),
        }
    }

    /// Try to convert a token kind to a binary operator.
    pub fn from_token(token: TokenKind) -> Option<Self> {
        use TokenKind::*;
        Some(match token {
            PipePipe => BinaryOp::LogicalOr,
            AmpAmp => BinaryOp::LogicalAnd,
            EqualEqual => BinaryOp::Equal,
            BangEqual => BinaryOp::NotEqual,
            TokenKind::Less => BinaryOp::Less,
            TokenKind::LessEqual => BinaryOp::LessEqual,
            TokenKind::Greater => BinaryOp::Greater,
            TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
            Plus => BinaryOp::Add,
            Minus => BinaryOp::Sub,
            Star => BinaryOp::Mul,
            Slash => BinaryOp::Div,
            Percent => BinaryOp::Mod,
            _ => return None,
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;
        let s = match self {
            LogicalOr => "||",
            LogicalAnd => "&&",
            Equal => "==",
            NotEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
        };
        f.write_str(s)
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `!x`
    Not,
}

impl UnaryOp {
    /// Higher than all binary operators.
    pub fn binding_power() -> u8 {
        15
    }

    /// Try to convert a token kind to a unary operator.
    pub fn from_token(token: TokenKind) -> Option<Self> {
        match token {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        }
    }
}

/// Postfix `++` / `--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostfixOp {
    Inc,
    Dec,
}

impl PostfixOp {
    /// Try to convert a token kind to a postfix operator.
    pub fn from_token(token: TokenKind) -> Option<Self> {
        match token {
            TokenKind::PlusPlus => Some(PostfixOp::Inc),
            TokenKind::MinusMinus => Some(PostfixOp::Dec),
            _ => None,
        }
    }
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl AssignOp {
    /// Lowest precedence, right-associative.
    pub fn binding_power() -> (u8, u8) {
        (2, 1)
    }

    /// Try to convert a token kind to an assignment operator.
    pub fn from_token(token: TokenKind) -> Option<Self> {
        use TokenKind::*;
        Some(match token {
            Equal => AssignOp::Assign,
            PlusEqual => AssignOp::Add,
            MinusEqual => AssignOp::Sub,
            StarEqual => AssignOp::Mul,
            SlashEqual => AssignOp::Div,
            PercentEqual => AssignOp::Mod,
            _ => return None,
        })
    }

    /// The arithmetic operator a compound assignment applies.
    pub fn binary_op(&self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Mod => Some(BinaryOp::Mod),
        }
    }
}
