use logos::Logos;
use std::fmt;

use crate::error::{Diagnostic, Error, Source};

pub type Span = logos::Span;

//===----------------------------------------------------------------------===//
// Utils
//===----------------------------------------------------------------------===//

/// Rewrites the two escape sequences the language recognizes inside string
/// literals: `\"` becomes `"` and `\\` becomes `\`. Any other backslash
/// sequence passes through untouched, backslash included.
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('"') => result.push('"'),
                Some('\\') => result.push('\\'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }

    result
}

//===----------------------------------------------------------------------===//
// Token
//
// Uses the logos crate for tokenization, giving us byte spans for free.
// The span bookkeeping matters: object constructions need the literal
// source substring of the whole invocation for their post-init hook.
//===----------------------------------------------------------------------===//

#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token {
    // Whitespace and line comments never reach the parser.
    #[regex(r"[ \t\r\n]+", logos::skip)]
    #[regex(r"//[^\n]*", logos::skip)]
    // --------- Punctuation ---------
    #[token("=")]
    Eq,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // --------- Reserved words ---------
    #[token("true")]
    True,
    #[token("false")]
    False,
    // The two null spellings are interchangeable in scripts.
    #[token("nullptr")]
    #[token("NULL")]
    Null,

    // --------- Literals ---------
    // Proper string: double-quoted, any escaped character accepted.
    #[regex(r#""([^"\\]|\\.)*""#,
      callback = |lex| {
        let slice = lex.slice();
        unescape_string(&slice[1..slice.len() - 1])
      })]
    Str(String),

    // A string that runs to EOF without a closing quote. Kept as a token so
    // the tokenize loop can report it with the span of the opening quote.
    #[regex(r#""([^"\\]|\\.)*"#, priority = 0)]
    UnterminatedStr,

    // Numbers keep their raw text; whether a token is an int or a double is
    // decided by the value decoder from the presence of '.', 'e' or 'E'.
    #[regex(r"-?[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?",
      callback = |lex| lex.slice().to_owned())]
    Number(String),

    // --------- Identifiers ---------
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*",
      callback = |lex| lex.slice().to_owned())]
    Ident(String),
}

/// The classification exposed to the parser for lookahead decisions and
/// error messages.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    Identifier,
    Reserved,
    Str,
    Number,
    Punct,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Reserved => "RESERVED_WORD",
            TokenKind::Str => "STRING",
            TokenKind::Number => "NUMBER",
            TokenKind::Punct => "PUNCTUATION",
            TokenKind::Eof => "EOF",
        };
        write!(f, "{}", name)
    }
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Ident(_) => TokenKind::Identifier,
            Token::True | Token::False | Token::Null => TokenKind::Reserved,
            Token::Str(_) => TokenKind::Str,
            Token::Number(_) => TokenKind::Number,
            Token::UnterminatedStr => TokenKind::Str,
            _ => TokenKind::Punct,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Eq => write!(f, "="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Semi => write!(f, ";"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "nullptr"),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::UnterminatedStr => write!(f, "\"..."),
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(name) => write!(f, "{}", name),
        }
    }
}

/// A token plus the byte range it occupies in the source.
#[derive(Debug, PartialEq, Clone)]
pub struct TokenCst {
    pub token: Token,
    pub span: Span,
}

//===----------------------------------------------------------------------===//
// TokenStream
//===----------------------------------------------------------------------===//

/// A fully lexed script with a cursor. Offsets are byte positions into the
/// original text; `tell` reports the position just past the last consumed
/// token, mirroring what a streaming tokenizer would report.
#[derive(Debug)]
pub struct TokenStream {
    tokens: Vec<TokenCst>,
    position: usize,
    source: String,
    file: Source,
}

/// A saved cursor position, restorable with [`TokenStream::rewind`].
/// Type inference peeks arbitrarily far ahead and must leave the stream
/// where it found it.
#[derive(Debug, Clone, Copy)]
pub struct Mark(usize);

impl TokenStream {
    /// Lexes the whole source up front. Unterminated strings and characters
    /// outside the language are fatal here.
    pub fn tokenize(source: &str, file: Source) -> Result<Self, Diagnostic> {
        let mut lexer = Token::lexer(source);
        let mut tokens: Vec<TokenCst> = vec![];

        while let Some(token) = lexer.next() {
            let span = lexer.span();
            match token {
                Ok(Token::UnterminatedStr) => {
                    return Err(Diagnostic::new(
                        Error::Lexical(format!(
                            "unterminated string literal starting at offset {}",
                            span.start
                        )),
                        span,
                        source.to_string(),
                        file,
                    )
                    .with_note("add a closing `\"` to terminate the string"));
                }
                Ok(token) => tokens.push(TokenCst { token, span }),
                Err(()) => {
                    return Err(Diagnostic::new(
                        Error::Lexical(format!(
                            "unrecognized character {:?}",
                            &source[span.clone()]
                        )),
                        span,
                        source.to_string(),
                        file,
                    ));
                }
            }
        }

        Ok(TokenStream { tokens, position: 0, source: source.to_string(), file })
    }

    pub fn peek(&self) -> Option<&TokenCst> {
        self.tokens.get(self.position)
    }

    /// Peeks `n` tokens past the next one; `peek_ahead(0)` is `peek`.
    pub fn peek_ahead(&self, n: usize) -> Option<&TokenCst> {
        self.tokens.get(self.position + n)
    }

    pub fn peek_kind(&self) -> TokenKind {
        self.peek().map(|t| t.token.kind()).unwrap_or(TokenKind::Eof)
    }

    /// Byte offset where the next token starts, or the end of the source at
    /// EOF.
    pub fn peek_start(&self) -> usize {
        self.peek().map(|t| t.span.start).unwrap_or(self.source.len())
    }

    /// Byte offset just past the last consumed token.
    pub fn tell(&self) -> usize {
        if self.position == 0 {
            0
        } else {
            self.tokens[self.position - 1].span.end
        }
    }

    pub fn next(&mut self) -> Result<TokenCst, Diagnostic> {
        match self.tokens.get(self.position) {
            Some(t) => {
                let t = t.clone();
                self.position += 1;
                Ok(t)
            }
            None => Err(self.error_here(Error::Syntax {
                expected: "a token".to_string(),
                found: "end of input".to_string(),
            })),
        }
    }

    /// Consumes the next token, which must equal `expected`.
    pub fn expect(&mut self, expected: Token) -> Result<TokenCst, Diagnostic> {
        match self.peek() {
            Some(t) if t.token == expected => self.next(),
            _ => Err(self.error_here(Error::Syntax {
                expected: format!("'{}'", expected),
                found: self.found_desc(),
            })),
        }
    }

    pub fn at_eof(&self) -> bool {
        self.position >= self.tokens.len()
    }

    pub fn mark(&self) -> Mark {
        Mark(self.position)
    }

    pub fn rewind(&mut self, mark: Mark) {
        self.position = mark.0;
    }

    /// The complete source text. Object construction slices invocation
    /// substrings out of this.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn file(&self) -> &Source {
        &self.file
    }

    /// A human description of the next token, for "found ..." messages.
    pub fn found_desc(&self) -> String {
        match self.peek() {
            Some(t) => format!("{} '{}'", t.token.kind(), t.token),
            None => "end of input".to_string(),
        }
    }

    /// Span of the next token, or an empty span at the end of the source.
    pub fn here(&self) -> Span {
        match self.peek() {
            Some(t) => t.span.clone(),
            None => self.source.len()..self.source.len(),
        }
    }

    pub fn error_at(&self, error: Error, span: Span) -> Diagnostic {
        Diagnostic::new(error, span, self.source.clone(), self.file.clone())
    }

    /// A diagnostic pointing at the next unconsumed token.
    pub fn error_here(&self, error: Error) -> Diagnostic {
        self.error_at(error, self.here())
    }
}
