//! Parser state, token helpers and top-level declarations.

use super::{FunctionDecl, Ident, Include, Script};
use crate::lexer::{Lexer, Token, TokenKind};
use bumpalo::Bump;
use bumpalo::collections::Vec as BVec;
use gsc_core::{LexError, ParseError, ParseErrorKind, ParseErrors, Span};

/// Deepest nesting of statements and expressions the parser descends into.
pub const MAX_NESTING: u32 = 64;

/// Recursive-descent parser for GSC.
///
/// Statements and declarations are parsed by descent; expressions use a
/// Pratt loop (see `expr_parser.rs`). Errors inside a function abort that
/// function and the parser resynchronizes at the next top-level
/// declaration, so one pass reports every broken function.
pub struct Parser<'ast> {
    tokens: Vec<Token<'ast>>,
    position: usize,
    /// Brace nesting at the current position, used for recovery.
    brace_depth: u32,
    /// Active statement and expression nesting.
    depth: u32,
    pub(crate) arena: &'ast Bump,
    errors: ParseErrors,
}

impl<'ast> Parser<'ast> {
    /// Lex `source` and prepare to parse it. Lex errors are recorded and the
    /// offending tokens dropped.
    pub fn new(source: &str, arena: &'ast Bump) -> Self {
        let (tokens, lex_errors) = Lexer::new(source, arena).tokenize();

        let mut errors = ParseErrors::new();
        for error in lex_errors {
            errors.push(error.into());
        }

        let tokens = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Error)
            .collect();

        Self {
            tokens,
            position: 0,
            brace_depth: 0,
            depth: 0,
            arena,
            errors,
        }
    }

    /// Parse a script from raw bytes, rejecting invalid UTF-8.
    pub fn parse_bytes(source: &[u8], arena: &'ast Bump) -> Result<Script<'ast>, ParseErrors> {
        match decode_source(source) {
            Ok(text) => Parser::parse(text, arena),
            Err(error) => {
                let mut errors = ParseErrors::new();
                errors.push(error.into());
                Err(errors)
            }
        }
    }

    /// Parse a complete script.
    pub fn parse(source: &str, arena: &'ast Bump) -> Result<Script<'ast>, ParseErrors> {
        #[cfg(feature = "profiling")]
        profiling::scope!("Parser::parse");

        let mut parser = Parser::new(source, arena);
        let script = parser.parse_script();
        if parser.errors.is_empty() {
            Ok(script)
        } else {
            Err(parser.errors)
        }
    }

    // =========================================
    // Declarations
    // =========================================

    fn parse_script(&mut self) -> Script<'ast> {
        let start = self.peek().span;
        let mut includes = BVec::new_in(self.arena);
        let mut functions = BVec::new_in(self.arena);

        while !self.is_eof() {
            match self.peek().kind {
                TokenKind::Include => {
                    let token = self.advance();
                    if functions.is_empty() {
                        includes.push(Include {
                            path: token.lexeme,
                            span: token.span,
                        });
                    } else {
                        self.errors.push(ParseError::new(
                            ParseErrorKind::MisplacedInclude,
                            token.span,
                            format!("'#include {}' must come before any function", token.lexeme),
                        ));
                    }
                }
                TokenKind::Identifier => match self.parse_function() {
                    Ok(function) => functions.push(function),
                    Err(error) => {
                        self.errors.push(error);
                        self.synchronize();
                    }
                },
                kind => {
                    let span = self.peek().span;
                    self.errors.push(ParseError::new(
                        ParseErrorKind::ExpectedDeclaration,
                        span,
                        format!("expected function definition, found {kind}"),
                    ));
                    self.synchronize();
                }
            }
        }

        let end = self.peek().span;
        Script {
            includes: includes.into_bump_slice(),
            functions: functions.into_bump_slice(),
            span: start.merge(end),
        }
    }

    /// `name(a, b) { ... }`
    fn parse_function(&mut self) -> Result<FunctionDecl<'ast>, ParseError> {
        let name = self.expect_ident()?;
        self.expect(TokenKind::LeftParen)?;

        let mut params = BVec::new_in(self.arena);
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.expect_ident()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;

        let body = self.parse_block()?;
        Ok(FunctionDecl {
            name,
            params: params.into_bump_slice(),
            span: name.span.merge(body.span),
            body,
        })
    }

    /// Skip to the next plausible top-level declaration.
    ///
    /// Always consumes at least one token.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_eof() {
            if self.brace_depth == 0 {
                let kind = self.peek().kind;
                if kind == TokenKind::Include
                    || (kind == TokenKind::Identifier
                        && self.peek_nth(1).kind == TokenKind::LeftParen)
                {
                    return;
                }
            }
            self.advance();
        }
    }

    // =========================================
    // Token helpers
    // =========================================

    /// Run `parse` one nesting level deeper, failing past [`MAX_NESTING`].
    pub(crate) fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new(
                ParseErrorKind::NestingTooDeep,
                self.peek().span,
                format!("nesting deeper than {MAX_NESTING} levels"),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// The current token. Past the end this is the trailing `Eof`.
    pub(crate) fn peek(&self) -> &Token<'ast> {
        self.peek_nth(0)
    }

    /// The token `n` positions ahead.
    pub(crate) fn peek_nth(&self, n: usize) -> &Token<'ast> {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.position + n).min(last)]
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// Consume the current token. `Eof` is never consumed.
    pub(crate) fn advance(&mut self) -> Token<'ast> {
        let token = *self.peek();
        if token.kind != TokenKind::Eof {
            match token.kind {
                TokenKind::LeftBrace => self.brace_depth += 1,
                TokenKind::RightBrace => self.brace_depth = self.brace_depth.saturating_sub(1),
                _ => {}
            }
            self.position += 1;
        }
        token
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> Option<Token<'ast>> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<Token<'ast>, ParseError> {
        if let Some(token) = self.eat(kind) {
            return Ok(token);
        }
        let found = self.peek();
        if found.kind == TokenKind::Eof {
            Err(ParseError::unexpected_eof(found.span))
        } else {
            Err(ParseError::expected_token(
                found.span,
                kind.description(),
                found.kind.description(),
            ))
        }
    }

    pub(crate) fn expect_ident(&mut self) -> Result<Ident<'ast>, ParseError> {
        let token = *self.peek();
        if token.kind == TokenKind::Identifier {
            self.advance();
            Ok(Ident::new(token.lexeme, token.span))
        } else {
            Err(ParseError::new(
                ParseErrorKind::ExpectedIdentifier,
                token.span,
                format!("expected identifier, found {}", token.kind),
            ))
        }
    }

    /// Span from `start` to the previously consumed token.
    pub(crate) fn span_from(&self, start: Span) -> Span {
        match self.position.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(previous) => start.merge(previous.span),
            None => start,
        }
    }
}

/// `source` as text, or the position of its first invalid UTF-8 sequence.
pub fn decode_source(source: &[u8]) -> Result<&str, LexError> {
    std::str::from_utf8(source).map_err(|error| {
        let valid = &source[..error.valid_up_to()];
        let line = valid.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = valid.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        let len = error.error_len().unwrap_or(source.len() - valid.len());
        LexError::InvalidUtf8 {
            span: Span::new(
                u32::try_from(line).unwrap_or(u32::MAX),
                u32::try_from(valid.len() - line_start + 1).unwrap_or(u32::MAX),
                u32::try_from(len).unwrap_or(u32::MAX),
            ),
        }
    })
}
