//! Error types for every phase of GSC processing.
//!
//! ```text
//! LexError        - tokenization failures, folded into ParseError
//! ParseError      - syntax errors (with ParseErrorKind), collected in ParseErrors
//! CompileError    - syntax, semantic and include failures of one compilation
//! AssembleError   - failures turning assembly into bytecode
//! TokenTableError - attempts to break the name/token bijection
//! ```

use thiserror::Error;

use crate::Span;

// ============================================================================
// Lexer Errors
// ============================================================================

/// Errors that occur during lexical analysis (tokenization).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    /// An unexpected character was encountered.
    #[error("unexpected character '{ch}' at {span}")]
    UnexpectedChar { ch: char, span: Span },

    /// A string literal was not properly terminated.
    #[error("unterminated string at {span}")]
    UnterminatedString { span: Span },

    /// A block comment or developer block was not properly terminated.
    #[error("unterminated comment at {span}")]
    UnterminatedComment { span: Span },

    /// A numeric literal could not be parsed.
    #[error("invalid number at {span}: {detail}")]
    InvalidNumber { span: Span, detail: String },

    /// An `#include` directive without a path or terminating `;`.
    #[error("malformed directive at {span}: {detail}")]
    MalformedDirective { span: Span, detail: String },

    /// Source bytes that are not valid UTF-8.
    #[error("invalid UTF-8 at {span}")]
    InvalidUtf8 { span: Span },
}

impl LexError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { span, .. } => *span,
            LexError::UnterminatedString { span } => *span,
            LexError::UnterminatedComment { span } => *span,
            LexError::InvalidNumber { span, .. } => *span,
            LexError::MalformedDirective { span, .. } => *span,
            LexError::InvalidUtf8 { span } => *span,
        }
    }
}

// ============================================================================
// Parse Errors
// ============================================================================

/// Categories of parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// The lexer rejected part of the input.
    InvalidToken,
    /// A specific token was expected but not found.
    ExpectedToken,
    /// An unexpected token was encountered.
    UnexpectedToken,
    /// Unexpected end of file.
    UnexpectedEof,
    /// An expression was expected.
    ExpectedExpression,
    /// A statement was expected.
    ExpectedStatement,
    /// An identifier was expected.
    ExpectedIdentifier,
    /// Something other than a function definition at file scope.
    ExpectedDeclaration,
    /// An `#include` appearing after the first function definition.
    MisplacedInclude,
    /// A literal value could not be parsed.
    InvalidLiteral,
    /// Statements or expressions nested past the parser's limit.
    NestingTooDeep,
}

impl ParseErrorKind {
    /// Returns a human-readable name for this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::InvalidToken => "invalid token",
            ParseErrorKind::ExpectedToken => "expected token",
            ParseErrorKind::UnexpectedToken => "unexpected token",
            ParseErrorKind::UnexpectedEof => "unexpected end of file",
            ParseErrorKind::ExpectedExpression => "expected expression",
            ParseErrorKind::ExpectedStatement => "expected statement",
            ParseErrorKind::ExpectedIdentifier => "expected identifier",
            ParseErrorKind::ExpectedDeclaration => "expected declaration",
            ParseErrorKind::MisplacedInclude => "misplaced include",
            ParseErrorKind::InvalidLiteral => "invalid literal",
            ParseErrorKind::NestingTooDeep => "nesting too deep",
        }
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parse error with location and context.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {span}: {message}")]
pub struct ParseError {
    /// The category of this error.
    pub kind: ParseErrorKind,
    /// The source location where the error occurred.
    pub span: Span,
    /// A detailed error message.
    pub message: String,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// Create an "expected token" error.
    pub fn expected_token(span: Span, expected: &str, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedToken,
            span,
            format!("expected {expected}, found {found}"),
        )
    }

    /// Create an "unexpected token" error.
    pub fn unexpected_token(span: Span, token: &str) -> Self {
        Self::new(
            ParseErrorKind::UnexpectedToken,
            span,
            format!("unexpected token: {token}"),
        )
    }

    /// Create an "unexpected EOF" error.
    pub fn unexpected_eof(span: Span) -> Self {
        Self::new(ParseErrorKind::UnexpectedEof, span, "unexpected end of file")
    }

    /// Create an "expected expression" error.
    pub fn expected_expression(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedExpression,
            span,
            format!("expected expression, found {found}"),
        )
    }

    /// Format the error with the offending source line and a caret.
    pub fn display_with_source(&self, source: &str) -> String {
        let mut output = format!("Error at {}:{}: {}\n", self.span.line, self.span.col, self.kind);
        if !self.message.is_empty() {
            output.push_str(&format!("  {}\n", self.message));
        }

        let line_text = (self.span.line as usize)
            .checked_sub(1)
            .and_then(|index| source.lines().nth(index));
        if let Some(line_text) = line_text {
            output.push_str("  |\n");
            output.push_str(&format!("{:>3} | {}\n", self.span.line, line_text));
            let indent = " ".repeat(self.span.col.saturating_sub(1) as usize);
            let pointer = "^".to_string() + &"~".repeat(self.span.len.saturating_sub(1) as usize);
            output.push_str(&format!("  | {indent}{pointer}\n"));
        }

        output
    }
}

impl From<LexError> for ParseError {
    fn from(error: LexError) -> Self {
        ParseError::new(ParseErrorKind::InvalidToken, error.span(), error.to_string())
    }
}

/// A collection of parse errors.
///
/// The parser recovers at statement and declaration boundaries so one pass
/// can report several problems.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseErrors {
    errors: Vec<ParseError>,
}

impl ParseErrors {
    /// Create a new empty error collection.
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add an error to the collection.
    pub fn push(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    /// Check if there are any errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterate over the errors.
    pub fn iter(&self) -> impl Iterator<Item = &ParseError> {
        self.errors.iter()
    }

    /// The first recorded error, if any.
    pub fn first(&self) -> Option<&ParseError> {
        self.errors.first()
    }

    /// Convert to a Vec of errors.
    pub fn into_vec(self) -> Vec<ParseError> {
        self.errors
    }
}

impl IntoIterator for ParseErrors {
    type Item = ParseError;
    type IntoIter = std::vec::IntoIter<ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParseErrors {
    type Item = &'a ParseError;
    type IntoIter = std::slice::Iter<'a, ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl From<ParseError> for ParseErrors {
    fn from(error: ParseError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl std::fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseErrors {}

// ============================================================================
// Compile Errors
// ============================================================================

/// Errors that abort a single compilation.
///
/// A compilation either produces a complete assembly or one of these; there
/// is no partial output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The source did not parse.
    #[error("{0}")]
    Syntax(ParseErrors),

    /// An included file did not parse.
    #[error("in include '{name}': {errors}")]
    IncludeSyntax {
        /// The include as written in the directive.
        name: String,
        /// The syntax errors of the included file.
        errors: ParseErrors,
    },

    /// An included file could not be read, or was empty.
    #[error("Could not load gsc file '{path}'")]
    MissingInclude {
        /// The include as written in the directive.
        name: String,
        /// The file path that was attempted.
        path: String,
    },

    /// Two functions with the same name in one file.
    #[error("at {span}: duplicate function '{name}'")]
    DuplicateFunction { name: String, span: Span },

    /// Two parameters with the same name.
    #[error("at {span}: duplicate parameter '{name}' in '{function}'")]
    DuplicateParameter {
        name: String,
        function: String,
        span: Span,
    },

    /// A local variable read before any assignment to it.
    #[error("at {span}: uninitialized variable '{name}'")]
    UninitializedVariable { name: String, span: Span },

    /// `break` or `continue` outside of a loop.
    #[error("at {span}: '{keyword}' outside of a loop")]
    OutsideLoop { keyword: &'static str, span: Span },

    /// The left side of an assignment is not assignable.
    #[error("at {span}: invalid assignment target")]
    InvalidAssignTarget { span: Span },

    /// A function uses more local slots than the VM can address.
    #[error("at {span}: too many local variables in '{function}' (limit {limit})")]
    TooManyLocals {
        function: String,
        limit: usize,
        span: Span,
    },

    /// A function body nests deeper than the compiler descends.
    #[error("at {span}: nesting too deep in '{function}' (limit {limit})")]
    NestingTooDeep {
        function: String,
        limit: u32,
        span: Span,
    },

    /// A call passes more arguments than the VM can address.
    #[error("at {span}: too many arguments in call to '{name}' (limit {limit})")]
    TooManyArguments {
        name: String,
        limit: usize,
        span: Span,
    },
}

impl CompileError {
    /// The include name if this error is a [`CompileError::MissingInclude`].
    pub fn missing_include(&self) -> Option<&str> {
        match self {
            CompileError::MissingInclude { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl From<ParseErrors> for CompileError {
    fn from(errors: ParseErrors) -> Self {
        CompileError::Syntax(errors)
    }
}

// ============================================================================
// Assemble Errors
// ============================================================================

/// Errors that occur while turning assembly into bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    /// A jump references a label the function never defines.
    #[error("unresolved label {label} in '{function}'")]
    UnresolvedLabel { function: String, label: u32 },

    /// A jump is further than a 16-bit relative offset can encode.
    #[error("jump of {distance} bytes in '{function}' is out of range")]
    JumpOutOfRange { function: String, distance: i64 },

    /// A local call names a function the assembly does not contain.
    #[error("call to unknown function '{callee}' in '{function}'")]
    UnknownFunction { function: String, callee: String },

    /// More distinct strings than the stack's string table can index.
    #[error("too many strings ({count}, limit {limit})")]
    TooManyStrings { count: usize, limit: usize },

    /// More functions than the stack's export table can hold.
    #[error("too many functions ({count}, limit {limit})")]
    TooManyFunctions { count: usize, limit: usize },

    /// The bytecode grew beyond what 32-bit offsets can address.
    #[error("bytecode too large ({size} bytes)")]
    BytecodeTooLarge { size: usize },
}

// ============================================================================
// Token Table Errors
// ============================================================================

/// Rejected insertions into a [`TokenTable`](crate::TokenTable).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenTableError {
    /// Token zero means "no token" and cannot be assigned.
    #[error("token 0 is reserved for '{name}'")]
    ReservedToken { name: String },

    /// The token already maps to another name.
    #[error("token {id} already maps to '{existing}', cannot map it to '{name}'")]
    DuplicateToken {
        id: u16,
        existing: String,
        name: String,
    },

    /// The name already maps to another token.
    #[error("name '{name}' already has token {existing}, cannot assign {id}")]
    DuplicateName { name: String, existing: u16, id: u16 },
}
