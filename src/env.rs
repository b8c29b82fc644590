use std::io::{self, Write};

use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::decode;
use crate::error::{Diagnostic, Error};
use crate::lexer::TokenStream;
use crate::registry;
use crate::value::{FromValue, Value};

//===----------------------------------------------------------------------===//
// VarMap
//===----------------------------------------------------------------------===//

/// The variables of a single type tag.
#[derive(Debug, Clone, Default)]
struct VarMap {
    values: FxHashMap<String, Value>,
}

//===----------------------------------------------------------------------===//
// Environment
//===----------------------------------------------------------------------===//

/// Named, typed variables: a map from name to type tag, plus one variable
/// map per tag. The two tables are kept consistent; a name present in one
/// but not the other is a bug, not a user error.
///
/// `Clone` is the deep copy used for nested object construction: all tables
/// are copied, while constructed objects themselves stay shared (they are
/// immutable once built).
#[derive(Debug, Clone)]
pub struct Environment {
    /// Variable name to type tag.
    types: FxHashMap<String, String>,
    /// Type tag to the variables of that tag.
    var_maps: FxHashMap<String, VarMap>,
    /// Snapshot of the registry's concrete-to-abstract mapping, so lookups
    /// by a concrete type name land in the abstract type's map.
    concrete_to_abstract: FxHashMap<String, String>,
    debug: u32,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self::with_debug(0)
    }

    /// An empty environment. Debug level 0 is silent; 1 or higher reports
    /// failed typed reads on stderr.
    pub fn with_debug(debug: u32) -> Self {
        Environment {
            types: FxHashMap::default(),
            var_maps: FxHashMap::default(),
            concrete_to_abstract: registry::concrete_map(),
            debug,
        }
    }

    pub fn debug(&self) -> u32 {
        self.debug
    }

    pub fn defined(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// The type tag of a defined variable.
    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.types.get(name).map(|s| s.as_str())
    }

    /// Maps a concrete type name to its abstract tag; every other tag is
    /// returned unchanged.
    pub(crate) fn resolve_tag<'a>(&'a self, tag: &'a str) -> &'a str {
        self.concrete_to_abstract.get(tag).map(|s| s.as_str()).unwrap_or(tag)
    }

    /// Parses the next value from `ts` as `tag` and defines `name` with it.
    /// Defining a name twice is an error.
    pub fn read_and_set(
        &mut self,
        name: &str,
        ts: &mut TokenStream,
        tag: &str,
    ) -> Result<(), Diagnostic> {
        if self.defined(name) {
            return Err(ts.error_here(Error::Name(format!(
                "variable \"{}\" is already defined",
                name
            ))));
        }
        self.bind(name, ts, tag)
    }

    /// Like [`read_and_set`](Environment::read_and_set), but overwrites an
    /// existing binding. The factory uses this for constructor parameters,
    /// which may shadow variables of the enclosing scope inside the child
    /// environment.
    pub(crate) fn bind(
        &mut self,
        name: &str,
        ts: &mut TokenStream,
        tag: &str,
    ) -> Result<(), Diagnostic> {
        let value = decode::read_value(self, ts, tag)?;
        let lookup = self.resolve_tag(tag).to_string();
        if let Some(old_tag) = self.types.insert(name.to_string(), lookup.clone()) {
            if old_tag != lookup {
                if let Some(map) = self.var_maps.get_mut(&old_tag) {
                    map.values.remove(name);
                }
            }
        }
        self.var_maps
            .entry(lookup)
            .or_default()
            .values
            .insert(name.to_string(), value);
        Ok(())
    }

    /// The raw stored value of a variable.
    pub(crate) fn value_of(&self, name: &str) -> Option<&Value> {
        let tag = self.types.get(name)?;
        let map = self.var_maps.get(tag).unwrap_or_else(|| {
            panic!(
                "Environment: type and value tables are out of sync for \"{}\"",
                name
            )
        });
        let value = map.values.get(name).unwrap_or_else(|| {
            panic!(
                "Environment: type and value tables are out of sync for \"{}\"",
                name
            )
        });
        Some(value)
    }

    /// Typed read. Returns `None`, never an error, when the variable is
    /// undefined or `T` does not match its stored type; at debug level 1 or
    /// higher the failure is noted on stderr.
    pub fn get<T: FromValue>(&self, name: &str) -> Option<T> {
        let Some(value) = self.value_of(name) else {
            if self.debug >= 1 {
                eprintln!("Environment::get: no value for variable \"{}\"", name);
            }
            return None;
        };
        let converted = T::from_value(value);
        if converted.is_none() && self.debug >= 1 {
            eprintln!(
                "Environment::get: variable \"{}\" has type {}; the requested type \
                 does not match",
                name,
                self.types[name]
            );
        }
        converted
    }

    /// Writes every variable, grouped by type tag, in a stable order.
    pub fn print(&self, out: &mut impl Write) -> io::Result<()> {
        for tag in self.var_maps.keys().sorted() {
            let map = &self.var_maps[tag];
            if map.values.is_empty() {
                continue;
            }
            writeln!(out, "{}:", tag)?;
            for name in map.values.keys().sorted() {
                writeln!(out, "  {} = {}", name, map.values[name])?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Source;

    fn stream(input: &str) -> TokenStream {
        TokenStream::tokenize(input, Source::Inline).unwrap()
    }

    #[test]
    fn read_and_set_defines_a_typed_variable() {
        let mut env = Environment::new();
        let mut ts = stream("42");
        env.read_and_set("x", &mut ts, "int").unwrap();

        assert!(env.defined("x"));
        assert_eq!(env.type_of("x"), Some("int"));
        assert_eq!(env.get::<i64>("x"), Some(42));
        assert_eq!(env.get::<f64>("x"), None);
        assert_eq!(env.get::<i64>("y"), None);
    }

    #[test]
    fn redefinition_is_an_error() {
        let mut env = Environment::new();
        env.read_and_set("x", &mut stream("1"), "int").unwrap();
        let err = env.read_and_set("x", &mut stream("2"), "int").unwrap_err();
        assert!(matches!(err.error, Error::Name(_)));
    }

    #[test]
    fn clone_is_a_deep_copy() {
        let mut env = Environment::new();
        env.read_and_set("x", &mut stream("1"), "int").unwrap();

        let mut copy = env.clone();
        copy.read_and_set("y", &mut stream("2"), "int").unwrap();

        assert!(copy.defined("x"));
        assert!(!env.defined("y"));
    }

    #[test]
    fn print_is_grouped_and_stable() {
        let mut env = Environment::new();
        env.read_and_set("b", &mut stream("true"), "bool").unwrap();
        env.read_and_set("n", &mut stream("3"), "int").unwrap();
        env.read_and_set("m", &mut stream("1"), "int").unwrap();

        let mut out = Vec::new();
        env.print(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "bool:\n  b = true\nint:\n  m = 1\n  n = 3\n");
    }
}
