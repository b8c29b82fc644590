use std::fmt;
use std::path::PathBuf;

use crate::lexer::Span;

//===----------------------------------------------------------------------===//
// Source
//===----------------------------------------------------------------------===//

/// Where a piece of script text came from, for error reporting.
#[derive(Debug, PartialEq, Clone)]
pub enum Source {
    File(PathBuf),
    Inline,
    Repl,
}

impl Source {
    pub fn display(&self) -> String {
        match self {
            Source::File(path) => path.display().to_string(),
            Source::Inline => "<input>".to_string(),
            Source::Repl => "REPL".to_string(),
        }
    }
}

//===----------------------------------------------------------------------===//
// Error
//===----------------------------------------------------------------------===//

/// The error taxonomy of the interpreter. Every variant is fatal to the
/// current evaluation except where noted on the API that produces it
/// (typed reads from the environment report mismatches as `None`).
#[derive(Debug, Clone)]
pub enum Error {
    /// Malformed input at the character level (unterminated string literal).
    Lexical(String),
    /// Unexpected token; carries what the parser wanted and what it found.
    Syntax { expected: String, found: String },
    /// A value does not have the type its context demands.
    Type { expected: String, found: String },
    /// Unknown concrete type, unknown or duplicated parameter name,
    /// redefinition of an existing variable, undefined variable reference.
    Name(String),
    /// A parameter declared required was not supplied in an invocation.
    MissingParam { type_name: String, param: String },
    /// Failure raised by host code (`post_init`) or while reading input.
    Runtime(String),
    /// The interpreter's own tables disagree. Always a bug.
    Internal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Lexical(msg) => write!(f, "Lexical error: {}", msg),
            Error::Syntax { expected, found } => {
                write!(f, "Syntax error: expected {}, found {}", expected, found)
            }
            Error::Type { expected, found } => {
                write!(f, "Type error: expected {}, got {}", expected, found)
            }
            Error::Name(msg) => write!(f, "Name error: {}", msg),
            Error::MissingParam { type_name, param } => {
                write!(
                    f,
                    "Missing parameter: {} requires \"{}\" but it was not supplied",
                    type_name, param
                )
            }
            Error::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

//===----------------------------------------------------------------------===//
// Diagnostic
//===----------------------------------------------------------------------===//

/// An error bundled with the span it occurred at, the full source text, and
/// the source location, so it can be rendered as a compiler-style report.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub error: Error,
    /// Byte range in `source` that the report points at.
    pub span: Span,
    /// The complete script text the error originated from.
    pub source: String,
    pub file: Source,
    /// Optional hints displayed under the report.
    pub notes: Option<Vec<String>>,
}

impl Diagnostic {
    pub fn new(error: Error, span: Span, source: String, file: Source) -> Self {
        Self { error, span, source, file, notes: None }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.get_or_insert_with(Vec::new).push(note.into());
        self
    }

    /// Line number, column, and the byte range of the line containing the
    /// start of this diagnostic's span.
    fn location_info(&self) -> (usize, usize, usize, usize) {
        let start = self.span.start.min(self.source.len());
        let line_start =
            self.source[..start].rfind('\n').map(|pos| pos + 1).unwrap_or(0);
        let line_end = self.source[start..]
            .find('\n')
            .map(|pos| start + pos)
            .unwrap_or(self.source.len());
        let line_number = self.source[..start].matches('\n').count() + 1;
        let column = start - line_start + 1;
        (line_number, column, line_start, line_end)
    }

    /// Formats a multi-line report in the style of rustc: the message, a
    /// `--> file:line:col` header, the offending source line with a caret
    /// underline, and any notes.
    pub fn format(&self) -> String {
        let (line_num, column, line_start, line_end) = self.location_info();
        let line_content = &self.source[line_start..line_end];

        let mut output = String::new();
        output.push_str(&format!("{}\n", self.error));
        output.push_str(&format!(
            "  --> {}:{}:{}\n",
            self.file.display(),
            line_num,
            column
        ));

        if !line_content.is_empty() {
            let line_len = line_end - line_start;
            let caret_len = self.span.len().max(1).min(line_len + 1 - (column - 1));
            output.push_str("   |\n");
            output.push_str(&format!("{:4} | {}\n", line_num, line_content));
            let padding = " ".repeat(column - 1);
            output.push_str(&format!("     | {}{}\n", padding, "^".repeat(caret_len)));
        }

        if let Some(notes) = &self.notes {
            output.push_str("   |\n");
            for note in notes {
                output.push_str(&format!("   = note: {}\n", note));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_points_at_span() {
        let source = "int x = true;".to_string();
        let diag = Diagnostic::new(
            Error::Type { expected: "int".to_string(), found: "bool".to_string() },
            8..12,
            source,
            Source::Inline,
        );
        let report = diag.format();
        assert!(report.contains("Type error: expected int, got bool"));
        assert!(report.contains("--> <input>:1:9"));
        assert!(report.contains("^^^^"));
    }

    #[test]
    fn format_survives_span_at_eof() {
        let source = "int x".to_string();
        let diag = Diagnostic::new(
            Error::Syntax {
                expected: "'='".to_string(),
                found: "end of input".to_string(),
            },
            5..5,
            source,
            Source::Repl,
        );
        // Must not panic on a span that sits past the last character.
        let report = diag.format();
        assert!(report.contains("--> REPL:1:6"));
    }
}
