//! The statement interpreter.
//!
//! Scripts are sequences of assignments, each binding one immutable
//! variable:
//!
//! ```text
//! // Primitives, with or without a type specifier.
//! bool b = true;
//! n = "daisy";            // inferred as string
//! double[] ds = {0.5, 1.5,};
//!
//! // Objects of registered types, nested construction included.
//! Animal a = Cow(name(n), age(4));
//! herd = {a, Cow(name("clover")), nullptr};
//! ```
//!
//! The host reads results back with [`Interpreter::get`]. Evaluation may be
//! invoked repeatedly on one interpreter; the environment persists between
//! calls and rebinding a name is an error.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use itertools::Itertools;

use crate::decode;
use crate::env::Environment;
use crate::error::{Diagnostic, Error, Source};
use crate::lexer::{Token, TokenStream};
use crate::registry;
use crate::value::{FromValue, is_primitive_tag, vector_tag};

pub struct Interpreter {
    env: Environment,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_debug(0)
    }

    /// Debug level 0 is silent; 1 or higher traces definitions and failed
    /// typed reads to stderr.
    pub fn with_debug(debug: u32) -> Self {
        Interpreter { env: Environment::with_debug(debug) }
    }

    /// Evaluates the statements in a file.
    pub fn eval_file(&mut self, path: impl AsRef<Path>) -> Result<(), Diagnostic> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| {
            Diagnostic::new(
                Error::Runtime(format!("failed to read {}: {}", path.display(), e)),
                0..0,
                String::new(),
                Source::File(path.to_path_buf()),
            )
        })?;
        self.eval_source(&source, Source::File(path.to_path_buf()))
    }

    /// Evaluates the statements in a string.
    pub fn eval_str(&mut self, source: &str) -> Result<(), Diagnostic> {
        self.eval_source(source, Source::Inline)
    }

    /// Evaluates statements drained from an arbitrary reader.
    pub fn eval_read(&mut self, input: &mut dyn Read) -> Result<(), Diagnostic> {
        let mut source = String::new();
        input.read_to_string(&mut source).map_err(|e| {
            Diagnostic::new(
                Error::Runtime(format!("failed to read input: {}", e)),
                0..0,
                String::new(),
                Source::Inline,
            )
        })?;
        self.eval_source(&source, Source::Inline)
    }

    pub fn eval_source(&mut self, source: &str, file: Source) -> Result<(), Diagnostic> {
        let mut ts = TokenStream::tokenize(source, file)?;
        while !ts.at_eof() {
            self.statement(&mut ts)?;
        }
        Ok(())
    }

    /// `[ type-tag ] name '=' value ';'`
    fn statement(&mut self, ts: &mut TokenStream) -> Result<(), Diagnostic> {
        let declared = take_type_tag(ts)?;

        let name_span = ts.here();
        let name = match ts.peek().map(|t| t.token.clone()) {
            Some(Token::Ident(name)) => {
                ts.next()?;
                name
            }
            _ => {
                return Err(ts.error_here(Error::Syntax {
                    expected: "a variable name".to_string(),
                    found: ts.found_desc(),
                }));
            }
        };
        if self.env.defined(&name) {
            return Err(ts.error_at(
                Error::Name(format!("variable \"{}\" is already defined", name)),
                name_span,
            ));
        }

        ts.expect(Token::Eq)?;

        let tag = match declared {
            Some(tag) => tag,
            None => decode::infer_tag(&self.env, ts)?,
        };
        self.env.read_and_set(&name, ts, &tag)?;

        ts.expect(Token::Semi)?;

        if self.env.debug() >= 1 {
            eprintln!("Interpreter: defined {} {}", tag, name);
        }
        Ok(())
    }

    /// Typed read of a variable. `None` when the variable does not exist or
    /// `T` does not match its type.
    pub fn get<T: FromValue>(&self, name: &str) -> Option<T> {
        self.env.get(name)
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn print_env(&self, out: &mut impl Write) -> io::Result<()> {
        self.env.print(out)
    }

    /// Lists every registered factory and the concrete types it constructs.
    pub fn print_factories(&self, out: &mut impl Write) -> io::Result<()> {
        for (base, concretes) in registry::factory_listing() {
            writeln!(
                out,
                "Factory<{}> can construct: {}",
                base,
                concretes.iter().sorted().join(", ")
            )?;
        }
        Ok(())
    }
}

/// Consumes a leading type specifier if one is present: a primitive tag or
/// registered abstract name, optionally followed by `[]`, and in either case
/// followed by the variable name. Anything else is left untouched.
fn take_type_tag(ts: &mut TokenStream) -> Result<Option<String>, Diagnostic> {
    let base = match ts.peek().map(|t| &t.token) {
        Some(Token::Ident(name))
            if is_primitive_tag(name) || registry::is_abstract(name) =>
        {
            name.clone()
        }
        _ => return Ok(None),
    };

    match ts.peek_ahead(1).map(|t| &t.token) {
        Some(Token::Ident(_)) => {
            ts.next()?;
            Ok(Some(base))
        }
        Some(Token::LBracket)
            if matches!(ts.peek_ahead(2).map(|t| &t.token), Some(Token::RBracket))
                && matches!(
                    ts.peek_ahead(3).map(|t| &t.token),
                    Some(Token::Ident(_))
                ) =>
        {
            ts.next()?;
            ts.next()?;
            ts.next()?;
            Ok(Some(vector_tag(&base)))
        }
        _ => Ok(None),
    }
}
