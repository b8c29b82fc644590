//! construe - an embeddable interpreter that builds strongly typed objects
//! from a small declarative script language.
//!
//! The host registers "constructible" types (an abstract name, one or more
//! concrete implementations, and their named parameters) with the global
//! [`registry`]; scripts then assign primitives, objects, and vectors of
//! either to variables, and the host reads the results back out with typed
//! lookups:
//!
//! ```no_run
//! use construe::{demo, Interpreter};
//! use std::sync::Arc;
//!
//! demo::register_all();
//!
//! let mut interp = Interpreter::new();
//! interp.eval_str(r#"
//!     string n = "daisy";
//!     Animal a = Cow(name(n), age(4));
//! "#).unwrap();
//!
//! let cow: Arc<demo::Cow> = interp.get("a").unwrap();
//! assert_eq!(cow.name, "daisy");
//! ```

pub mod demo;
pub mod env;
pub mod error;
pub mod factory;
pub mod interpreter;
pub mod lexer;
pub mod registry;
pub mod repl;
pub mod value;

mod decode;

pub use env::Environment;
pub use error::{Diagnostic, Error, Source};
pub use factory::{Constructible, Param, ParamSet};
pub use interpreter::Interpreter;
pub use value::{FieldType, FromValue, Object, Value};
