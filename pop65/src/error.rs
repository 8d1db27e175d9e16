//! Error types for the assembler

use std::fmt;

use thiserror::Error;

/// Classification of assembly failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed token, e.g. an unterminated string.
    Lex,
    /// Malformed expression or directive arguments.
    Syntax,
    UndefinedSymbol,
    DuplicateSymbol,
    UnmatchedElse,
    UnmatchedEndif,
    /// A file ended while an `.if` it opened was still open.
    UnclosedIf,
    /// `.assert` evaluated to zero. The only non-fatal kind.
    AssertionFailed,
    /// A symbol's value differs between pass 1 and pass 2.
    Phase,
    /// Operand or branch offset does not fit its encoding.
    Range,
    DivideByZero,
    /// The program counter was needed before any `.org`.
    NoOrigin,
    FileNotFound,
    Io,
    /// Include nesting exceeded the limit or a file includes itself.
    IncludeDepth,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Lex => "lex error",
            ErrorKind::Syntax => "syntax error",
            ErrorKind::UndefinedSymbol => "undefined symbol",
            ErrorKind::DuplicateSymbol => "duplicate symbol",
            ErrorKind::UnmatchedElse => "unmatched .else",
            ErrorKind::UnmatchedEndif => "unmatched .endif",
            ErrorKind::UnclosedIf => "unclosed .if",
            ErrorKind::AssertionFailed => "assertion failed",
            ErrorKind::Phase => "phase error",
            ErrorKind::Range => "value out of range",
            ErrorKind::DivideByZero => "division by zero",
            ErrorKind::NoOrigin => "no origin",
            ErrorKind::FileNotFound => "file not found",
            ErrorKind::Io => "IO error",
            ErrorKind::IncludeDepth => "include error",
        };
        f.write_str(name)
    }
}

/// A source position: file name and 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

fn location_prefix(location: &Option<Location>) -> String {
    location
        .as_ref()
        .map(|loc| format!("{loc}: "))
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{kind}: {message}", location_prefix(.location))]
pub struct AsmError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<Location>,
}

impl AsmError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Attach a location unless one is already present. Errors raised inside
    /// an included file keep the innermost position.
    pub fn at(mut self, location: &Location) -> Self {
        if self.location.is_none() {
            self.location = Some(location.clone());
        }
        self
    }
}

impl From<std::io::Error> for AsmError {
    fn from(e: std::io::Error) -> Self {
        let kind = if e.kind() == std::io::ErrorKind::NotFound {
            ErrorKind::FileNotFound
        } else {
            ErrorKind::Io
        };
        AsmError::new(kind, e.to_string())
    }
}

pub type Result<T, E = AsmError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_location() {
        let err = AsmError::new(ErrorKind::UndefinedSymbol, "'foo'").at(&Location {
            file: "main.s".to_string(),
            line: 12,
        });
        assert_eq!(err.to_string(), "main.s:12: undefined symbol: 'foo'");
    }

    #[test]
    fn test_display_without_location() {
        let err = AsmError::syntax("missing operand");
        assert_eq!(err.to_string(), "syntax error: missing operand");
    }

    #[test]
    fn test_at_keeps_innermost_location() {
        let inner = Location { file: "inc.s".to_string(), line: 3 };
        let outer = Location { file: "main.s".to_string(), line: 9 };
        let err = AsmError::syntax("x").at(&inner).at(&outer);
        assert_eq!(err.location, Some(inner));
    }

    #[test]
    fn test_io_not_found_maps_to_file_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(AsmError::from(io).kind(), ErrorKind::FileNotFound);
    }
}
