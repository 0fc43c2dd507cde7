//! Token types for the GSC lexer.

use gsc_core::Span;
use std::fmt;

/// A token from the source code.
///
/// The lexeme lives in the parse arena, so the source string can be dropped
/// once lexing completes.
#[derive(Clone, Copy, PartialEq)]
pub struct Token<'ast> {
    /// The type of token.
    pub kind: TokenKind,
    /// The source text of this token. For `#include` this is the path alone.
    pub lexeme: &'ast str,
    /// Location in source.
    pub span: Span,
}

impl<'ast> Token<'ast> {
    /// Create a new token.
    #[inline]
    pub fn new(kind: TokenKind, lexeme: &'ast str, span: Span) -> Self {
        Self { kind, lexeme, span }
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {:?})", self.kind, self.lexeme, self.span)
    }
}

/// All token types in the supported GSC dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    /// `42`
    IntLiteral,
    /// `1.5`, `.25`
    FloatLiteral,
    /// `"text"`
    StringLiteral,
    /// `&"LOCALIZED_KEY"`
    IStringLiteral,

    // Names
    /// `foo`
    Identifier,
    /// `maps\mp\_utility`: an identifier with path separators
    Path,

    // Keywords
    If,
    Else,
    While,
    For,
    Return,
    Wait,
    Thread,
    Break,
    Continue,
    True,
    False,
    Undefined,
    /// `self`
    SelfKw,
    /// `level`
    Level,

    // Directives
    /// `#include path;` with the path as lexeme
    Include,
    /// `/#`
    DevBlockStart,
    /// `#/`
    DevBlockEnd,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semicolon,
    Comma,
    Dot,
    ColonColon,

    // Operators
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    AmpAmp,
    PipePipe,
    PlusPlus,
    MinusMinus,

    // Special
    /// End of input.
    Eof,
    /// Placeholder for input the lexer rejected.
    Error,
}

impl TokenKind {
    /// A short description for error messages.
    pub fn description(&self) -> &'static str {
        use TokenKind::*;
        match self {
            IntLiteral => "integer literal",
            FloatLiteral => "float literal",
            StringLiteral => "string literal",
            IStringLiteral => "localized string",
            Identifier => "identifier",
            Path => "path",
            If => "'if'",
            Else => "'else'",
            While => "'while'",
            For => "'for'",
            Return => "'return'",
            Wait => "'wait'",
            Thread => "'thread'",
            Break => "'break'",
            Continue => "'continue'",
            True => "'true'",
            False => "'false'",
            Undefined => "'undefined'",
            SelfKw => "'self'",
            Level => "'level'",
            Include => "'#include'",
            DevBlockStart => "'/#'",
            DevBlockEnd => "'#/'",
            LeftParen => "'('",
            RightParen => "')'",
            LeftBrace => "'{'",
            RightBrace => "'}'",
            LeftBracket => "'['",
            RightBracket => "']'",
            Semicolon => "';'",
            Comma => "','",
            Dot => "'.'",
            ColonColon => "'::'",
            Equal => "'='",
            PlusEqual => "'+='",
            MinusEqual => "'-='",
            StarEqual => "'*='",
            SlashEqual => "'/='",
            PercentEqual => "'%='",
            EqualEqual => "'=='",
            BangEqual => "'!='",
            Less => "'<'",
            LessEqual => "'<='",
            Greater => "'>'",
            GreaterEqual => "'>='",
            Plus => "'+'",
            Minus => "'-'",
            Star => "'*'",
            Slash => "'/'",
            Percent => "'%'",
            Bang => "'!'",
            AmpAmp => "'&&'",
            PipePipe => "'||'",
            PlusPlus => "'++'",
            MinusMinus => "'--'",
            Eof => "end of file",
            Error => "invalid token",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Look up a keyword by its spelling.
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    Some(match ident {
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "for" => TokenKind::For,
        "return" => TokenKind::Return,
        "wait" => TokenKind::Wait,
        "thread" => TokenKind::Thread,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "undefined" => TokenKind::Undefined,
        "self" => TokenKind::SelfKw,
        "level" => TokenKind::Level,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_recognized() {
        assert_eq!(lookup_keyword("thread"), Some(TokenKind::Thread));
        assert_eq!(lookup_keyword("self"), Some(TokenKind::SelfKw));
        assert_eq!(lookup_keyword("main"), None);
    }

    #[test]
    fn descriptions_quote_punctuation() {
        assert_eq!(TokenKind::ColonColon.to_string(), "'::'");
        assert_eq!(TokenKind::Eof.to_string(), "end of file");
    }
}
