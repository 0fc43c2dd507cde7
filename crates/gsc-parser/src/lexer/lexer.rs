//! Lexer implementation for GSC.
//!
//! The [`Lexer`] converts source text into a stream of [`Token`]s, dispatching
//! on the first character. Lexemes are copied into the arena so the source
//! string can be dropped after lexing.

use bumpalo::Bump;
use gsc_core::{LexError, Span};

use super::cursor::{Cursor, is_ident_continue, is_ident_start};
use super::token::{Token, TokenKind, lookup_keyword};

/// Lexer for GSC source code.
///
/// The `'src` lifetime is the source string being lexed (temporary).
/// The `'ast` lifetime is the arena where token lexemes are allocated.
pub struct Lexer<'src, 'ast> {
    /// Low-level character cursor.
    cursor: Cursor<'src>,
    /// Arena for allocating token lexemes.
    arena: &'ast Bump,
    /// Accumulated errors.
    errors: Vec<LexError>,
}

impl<'src, 'ast> Lexer<'src, 'ast> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'src str, arena: &'ast Bump) -> Self {
        Self {
            cursor: Cursor::new(source),
            arena,
            errors: Vec::new(),
        }
    }

    /// Lex the whole input. The returned tokens always end with `Eof`.
    pub fn tokenize(mut self) -> (Vec<Token<'ast>>, Vec<LexError>) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        (tokens, self.errors)
    }

    /// Take accumulated errors, leaving an empty vec.
    pub fn take_errors(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.errors)
    }

    /// Check if any errors occurred.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Token<'ast> {
        self.skip_trivia();

        if self.cursor.is_eof() {
            let span = Span::point(self.cursor.line(), self.cursor.column());
            return Token::new(TokenKind::Eof, "", span);
        }

        let start = (self.cursor.line(), self.cursor.column(), self.cursor.offset());

        match self.cursor.peek() {
            Some('"') => self.scan_string(start, TokenKind::StringLiteral),
            Some('&') if self.cursor.peek_nth(1) == Some('"') => {
                self.cursor.advance();
                self.scan_string(start, TokenKind::IStringLiteral)
            }
            Some('#') => self.scan_hash(start),
            Some(c) if c.is_ascii_digit() => self.scan_number(start),
            Some('.') if self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.scan_number(start)
            }
            Some(c) if is_ident_start(c) => self.scan_identifier(start),
            _ => self.scan_operator(start),
        }
    }

    // =========================================
    // Trivia
    // =========================================

    /// Skip whitespace, BOM and comments. `/#` is a token, not a comment.
    fn skip_trivia(&mut self) {
        loop {
            if self.cursor.check_str("\u{FEFF}") {
                self.cursor.advance();
            }
            self.cursor.eat_while(|c| c.is_whitespace());

            if self.cursor.check_str("//") {
                self.cursor.eat_while(|c| c != '\n');
            } else if self.cursor.check_str("/*") {
                let start = Span::new(self.cursor.line(), self.cursor.column(), 2);
                self.cursor.advance_n(2);
                loop {
                    if self.cursor.is_eof() {
                        self.errors.push(LexError::UnterminatedComment { span: start });
                        return;
                    }
                    if self.cursor.check_str("*/") {
                        self.cursor.advance_n(2);
                        break;
                    }
                    self.cursor.advance();
                }
            } else {
                return;
            }
        }
    }

    // =========================================
    // Token construction
    // =========================================

    fn make_token(&self, kind: TokenKind, start: (u32, u32, u32)) -> Token<'ast> {
        let (line, col, offset) = start;
        let len = self.cursor.offset() - offset;
        let lexeme = self.arena.alloc_str(self.cursor.slice_from(offset));
        Token::new(kind, lexeme, Span::new(line, col, len))
    }

    fn make_error(&mut self, error: LexError) -> Token<'ast> {
        let span = error.span();
        self.errors.push(error);
        Token::new(TokenKind::Error, "", span)
    }

    fn span_from(&self, start: (u32, u32, u32)) -> Span {
        Span::new(start.0, start.1, self.cursor.offset() - start.2)
    }

    // =========================================
    // Scanning
    // =========================================

    /// Scan `"..."`. The lexeme keeps the quotes and escapes as written.
    fn scan_string(&mut self, start: (u32, u32, u32), kind: TokenKind) -> Token<'ast> {
        self.cursor.advance();
        loop {
            match self.cursor.peek() {
                None | Some('\n') => {
                    let span = self.span_from(start);
                    return self.make_error(LexError::UnterminatedString { span });
                }
                Some('\\') => {
                    self.cursor.advance();
                    if self.cursor.peek().is_some_and(|c| c != '\n') {
                        self.cursor.advance();
                    }
                }
                Some('"') => {
                    self.cursor.advance();
                    return self.make_token(kind, start);
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    /// Scan `#include path;` or `#/`.
    fn scan_hash(&mut self, start: (u32, u32, u32)) -> Token<'ast> {
        self.cursor.advance();

        if self.cursor.eat('/') {
            return self.make_token(TokenKind::DevBlockEnd, start);
        }

        let directive = self.cursor.eat_while(is_ident_continue);
        if directive != "include" {
            let span = self.span_from(start);
            return self.make_error(LexError::MalformedDirective {
                span,
                detail: format!("unsupported directive '#{directive}'"),
            });
        }

        self.cursor.eat_while(|c| c == ' ' || c == '\t');
        let path = self
            .cursor
            .eat_while(|c| is_ident_continue(c) || c == '\\' || c == '/')
            .trim();
        self.cursor.eat_while(|c| c == ' ' || c == '\t');

        if path.is_empty() {
            let span = self.span_from(start);
            return self.make_error(LexError::MalformedDirective {
                span,
                detail: "expected include path".to_string(),
            });
        }
        if !self.cursor.eat(';') {
            let span = self.span_from(start);
            return self.make_error(LexError::MalformedDirective {
                span,
                detail: format!("expected ';' after '#include {path}'"),
            });
        }

        let span = self.span_from(start);
        Token::new(TokenKind::Include, self.arena.alloc_str(path), span)
    }

    fn scan_number(&mut self, start: (u32, u32, u32)) -> Token<'ast> {
        self.cursor.eat_while(|c| c.is_ascii_digit());

        let mut kind = TokenKind::IntLiteral;
        if self.cursor.peek() == Some('.') {
            kind = TokenKind::FloatLiteral;
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_digit());
        }

        if self.cursor.check(is_ident_start) {
            let suffix = self.cursor.eat_while(is_ident_continue);
            let span = self.span_from(start);
            return self.make_error(LexError::InvalidNumber {
                span,
                detail: format!("unexpected suffix '{suffix}'"),
            });
        }

        self.make_token(kind, start)
    }

    /// Scan an identifier, keyword, or backslash-separated path.
    fn scan_identifier(&mut self, start: (u32, u32, u32)) -> Token<'ast> {
        let mut is_path = false;
        loop {
            self.cursor.eat_while(is_ident_continue);
            if self.cursor.peek() == Some('\\') && self.cursor.peek_nth(1).is_some_and(is_ident_continue) {
                self.cursor.advance();
                is_path = true;
            } else {
                break;
            }
        }

        if is_path {
            return self.make_token(TokenKind::Path, start);
        }

        let text = self.cursor.slice_from(start.2);
        let kind = lookup_keyword(text).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, start)
    }

    fn scan_operator(&mut self, start: (u32, u32, u32)) -> Token<'ast> {
        use TokenKind::*;

        let Some(c) = self.cursor.advance() else {
            return Token::new(Eof, "", self.span_from(start));
        };

        let kind = match c {
            '(' => LeftParen,
            ')' => RightParen,
            '{' => LeftBrace,
            '}' => RightBrace,
            '[' => LeftBracket,
            ']' => RightBracket,
            ';' => Semicolon,
            ',' => Comma,
            '.' => Dot,
            ':' if self.cursor.eat(':') => ColonColon,
            '=' if self.cursor.eat('=') => EqualEqual,
            '=' => Equal,
            '!' if self.cursor.eat('=') => BangEqual,
            '!' => Bang,
            '<' if self.cursor.eat('=') => LessEqual,
            '<' => Less,
            '>' if self.cursor.eat('=') => GreaterEqual,
            '>' => Greater,
            '+' if self.cursor.eat('+') => PlusPlus,
            '+' if self.cursor.eat('=') => PlusEqual,
            '+' => Plus,
            '-' if self.cursor.eat('-') => MinusMinus,
            '-' if self.cursor.eat('=') => MinusEqual,
            '-' => Minus,
            '*' if self.cursor.eat('=') => StarEqual,
            '*' => Star,
            '/' if self.cursor.eat('#') => DevBlockStart,
            '/' if self.cursor.eat('=') => SlashEqual,
            '/' => Slash,
            '%' if self.cursor.eat('=') => PercentEqual,
            '%' => Percent,
            '&' if self.cursor.eat('&') => AmpAmp,
            '|' if self.cursor.eat('|') => PipePipe,
            ch => {
                let span = self.span_from(start);
                return self.make_error(LexError::UnexpectedChar { ch, span });
            }
        };

        self.make_token(kind, start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let arena = Bump::new();
        let (tokens, errors) = Lexer::new(source, &arena).tokenize();
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_function_header() {
        use TokenKind::*;
        assert_eq!(
            kinds("main() { }"),
            vec![Identifier, LeftParen, RightParen, LeftBrace, RightBrace, Eof]
        );
    }

    #[test]
    fn lex_include_directive() {
        let arena = Bump::new();
        let (tokens, errors) = Lexer::new("#include maps\\mp\\_utility;\n", &arena).tokenize();
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::Include);
        assert_eq!(tokens[0].lexeme, "maps\\mp\\_utility");
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn lex_include_without_semicolon_is_an_error() {
        let arena = Bump::new();
        let (tokens, errors) = Lexer::new("#include common\nmain(){}", &arena).tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert!(matches!(errors[0], LexError::MalformedDirective { .. }));
    }

    #[test]
    fn lex_paths_and_far_calls() {
        use TokenKind::*;
        assert_eq!(
            kinds("maps\\mp\\_utility::foo();"),
            vec![Path, ColonColon, Identifier, LeftParen, RightParen, Semicolon, Eof]
        );
    }

    #[test]
    fn lex_dev_blocks_and_comments() {
        use TokenKind::*;
        assert_eq!(
            kinds("/# debug(); #/ // trailing\n/* block */ x"),
            vec![
                DevBlockStart,
                Identifier,
                LeftParen,
                RightParen,
                Semicolon,
                DevBlockEnd,
                Identifier,
                Eof
            ]
        );
    }

    #[test]
    fn lex_literals() {
        use TokenKind::*;
        assert_eq!(
            kinds("1 2.5 .5 \"a\\\"b\" &\"MP_KEY\""),
            vec![IntLiteral, FloatLiteral, FloatLiteral, StringLiteral, IStringLiteral, Eof]
        );
    }

    #[test]
    fn lex_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("+= ++ -- == != <= >= && || %= /"),
            vec![
                PlusEqual, PlusPlus, MinusMinus, EqualEqual, BangEqual, LessEqual,
                GreaterEqual, AmpAmp, PipePipe, PercentEqual, Slash, Eof
            ]
        );
    }

    #[test]
    fn lex_keywords() {
        use TokenKind::*;
        assert_eq!(
            kinds("self thread foo"),
            vec![SelfKw, Thread, Identifier, Eof]
        );
    }

    #[test]
    fn lex_errors_are_collected() {
        let arena = Bump::new();
        let (tokens, errors) = Lexer::new("a @ \"open", &arena).tokenize();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], LexError::UnexpectedChar { ch: '@', .. }));
        assert!(matches!(errors[1], LexError::UnterminatedString { .. }));
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn lex_unterminated_block_comment() {
        let arena = Bump::new();
        let (_, errors) = Lexer::new("/* never closed", &arena).tokenize();
        assert!(matches!(errors[0], LexError::UnterminatedComment { .. }));
    }

    #[test]
    fn lex_spans_track_lines() {
        let arena = Bump::new();
        let (tokens, _) = Lexer::new("a\n  b", &arena).tokenize();
        assert_eq!(tokens[1].span, Span::new(2, 3, 1));
    }
}
