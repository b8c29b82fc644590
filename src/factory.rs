//! The dynamic object factory.
//!
//! A constructible type describes its own named parameters on a fresh
//! instance; construction then binds arguments from the token stream in any
//! order, enforces required parameters, and runs a post-init hook with the
//! child environment and the literal invocation text.

use std::any::Any;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::env::Environment;
use crate::error::{Diagnostic, Error};
use crate::lexer::{Token, TokenStream};
use crate::registry;
use crate::value::{FieldType, FromValue, Object, Value, vector_tag};

//===----------------------------------------------------------------------===//
// Constructible
//===----------------------------------------------------------------------===//

/// Object-safe access to `Any`, blanket-implemented for every candidate
/// type so constructible types get typed downcasts without boilerplate.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A type the factory can build from script text. Implementors are
/// registered under an abstract type name via [`registry::register`]; the
/// script then selects them by their concrete name.
///
/// Instances are mutated only between construction and the end of
/// [`post_init`](Constructible::post_init); afterwards they are shared
/// immutably.
pub trait Constructible: AsAny + Any + Send + Sync {
    /// Publishes the named parameters of this type into `params`. Called on
    /// a fresh instance before any field is bound.
    fn register_params(&self, params: &mut ParamSet);

    /// Runs once after every supplied argument has been bound. `env` is the
    /// child environment of this construction (it contains the arguments,
    /// temporaries included); `init_text` is the literal source text of the
    /// whole invocation.
    fn post_init(&mut self, _env: &Environment, _init_text: &str) -> Result<(), Error> {
        Ok(())
    }
}

//===----------------------------------------------------------------------===//
// Parameter descriptors
//===----------------------------------------------------------------------===//

type Setter = Box<dyn Fn(&mut dyn Any, &Value) -> bool>;

/// One named parameter of a constructible type.
pub struct Param {
    name: String,
    tag: String,
    required: bool,
    init_count: u32,
    setter: Option<Setter>,
}

impl Param {
    /// Marks this parameter as mandatory in every invocation.
    pub fn required(&mut self) -> &mut Self {
        self.required = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_tag(&self) -> &str {
        &self.tag
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// A temporary exists only in the child environment; it has no slot in
    /// the constructed object.
    pub fn is_temporary(&self) -> bool {
        self.setter.is_none()
    }
}

/// The self-reported parameter table of one constructible type, keyed by
/// parameter name.
#[derive(Default)]
pub struct ParamSet {
    params: FxHashMap<String, Param>,
    order: Vec<String>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A typed slot for a primitive or primitive-vector field. The type tag
    /// is derived from `T`.
    pub fn field<C: Constructible, T: FieldType>(
        &mut self,
        name: &str,
        assign: fn(&mut C, T),
    ) -> &mut Param {
        self.insert_slot(name, T::type_tag(), assign)
    }

    /// A slot holding one object of the abstract type `base`.
    pub fn object_field<C: Constructible>(
        &mut self,
        name: &str,
        base: &str,
        assign: fn(&mut C, Object),
    ) -> &mut Param {
        self.insert_slot(name, base.to_string(), assign)
    }

    /// A slot holding a vector of objects of the abstract type `base`.
    pub fn object_vec_field<C: Constructible>(
        &mut self,
        name: &str,
        base: &str,
        assign: fn(&mut C, Vec<Object>),
    ) -> &mut Param {
        self.insert_slot(name, vector_tag(base), assign)
    }

    /// A slot-less parameter: parsed with the given tag and written into the
    /// child environment for `post_init`, but never into the object.
    pub fn temporary(&mut self, name: &str, tag: impl Into<String>) -> &mut Param {
        self.insert(name, tag.into(), None)
    }

    fn insert_slot<C: Constructible, T: FromValue + 'static>(
        &mut self,
        name: &str,
        tag: String,
        assign: fn(&mut C, T),
    ) -> &mut Param {
        let setter: Setter = Box::new(move |obj, value| {
            let Some(obj) = obj.downcast_mut::<C>() else { return false };
            let Some(typed) = T::from_value(value) else { return false };
            assign(obj, typed);
            true
        });
        self.insert(name, tag, Some(setter))
    }

    fn insert(&mut self, name: &str, tag: String, setter: Option<Setter>) -> &mut Param {
        // A duplicate here is a bug in the host's register_params, not in
        // any script; it cannot be reported through a Diagnostic.
        if self.params.contains_key(name) {
            panic!("ParamSet: two parameters share the name {:?}", name);
        }
        self.order.push(name.to_string());
        self.params.insert(name.to_string(), Param {
            name: name.to_string(),
            tag,
            required: false,
            init_count: 0,
            setter,
        });
        self.params.get_mut(name).unwrap()
    }

    /// The parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.order.iter().map(|name| &self.params[name])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

//===----------------------------------------------------------------------===//
// Construction
//===----------------------------------------------------------------------===//

/// The parameter descriptors an instance reports for itself.
pub fn describe(instance: &dyn Constructible) -> ParamSet {
    let mut params = ParamSet::new();
    instance.register_params(&mut params);
    params
}

/// Builds one object of the abstract type `base` from the next tokens:
/// either `Concrete(arg(value), ...)` or a null literal. `env` is the
/// caller's environment; nested values are evaluated against a deep copy of
/// it, which is also what `post_init` receives.
pub(crate) fn construct(
    env: &Environment,
    ts: &mut TokenStream,
    base: &str,
) -> Result<Object, Diagnostic> {
    let start = ts.peek_start();

    if let Some(t) = ts.peek() {
        if t.token == Token::Null {
            ts.next()?;
            return Ok(Object::null(base));
        }
    }

    let type_span = ts.here();
    let concrete = match ts.peek().map(|t| t.token.clone()) {
        Some(Token::Ident(name)) => {
            ts.next()?;
            name
        }
        _ => {
            return Err(ts.error_here(Error::Syntax {
                expected: format!("the name of a concrete {} type", base),
                found: ts.found_desc(),
            }));
        }
    };

    ts.expect(Token::LParen)?;

    let mut instance = registry::new_instance(base, &concrete).ok_or_else(|| {
        ts.error_at(
            Error::Name(format!(
                "the factory for {} knows no concrete type \"{}\"",
                base, concrete
            )),
            type_span,
        )
    })?;

    // Snapshot the caller's environment. Every argument below is evaluated
    // against (and recorded in) this copy, never the caller's own tables.
    let mut child = env.clone();

    let mut params = describe(instance.as_ref());

    while !matches!(ts.peek().map(|t| &t.token), Some(Token::RParen)) {
        let name_span = ts.here();
        let param_name = match ts.peek().map(|t| t.token.clone()) {
            Some(Token::Ident(name)) => {
                ts.next()?;
                name
            }
            _ => {
                return Err(ts.error_here(Error::Syntax {
                    expected: "a parameter name".to_string(),
                    found: ts.found_desc(),
                }));
            }
        };

        let param = params.params.get(&param_name).ok_or_else(|| {
            ts.error_at(
                Error::Name(format!(
                    "unknown parameter \"{}\" for type {}",
                    param_name, concrete
                )),
                name_span.clone(),
            )
        })?;
        if param.init_count > 0 {
            return Err(ts.error_at(
                Error::Name(format!(
                    "parameter \"{}\" supplied more than once to {}",
                    param_name, concrete
                )),
                name_span,
            ));
        }
        let tag = param.tag.clone();

        ts.expect(Token::LParen)?;
        child.bind(&param_name, ts, &tag)?;
        ts.expect(Token::RParen)?;

        let value = child.value_of(&param_name).cloned().ok_or_else(|| {
            ts.error_at(
                Error::Internal(format!(
                    "parameter \"{}\" was bound but has no value",
                    param_name
                )),
                name_span.clone(),
            )
        })?;
        let param = params.params.get_mut(&param_name).unwrap();
        if let Some(setter) = &param.setter {
            if !setter(instance.as_any_mut(), &value) {
                return Err(ts.error_at(
                    Error::Internal(format!(
                        "slot for parameter \"{}\" of {} rejected a value of type {}",
                        param_name, concrete, tag
                    )),
                    name_span,
                ));
            }
        }
        param.init_count += 1;

        match ts.peek().map(|t| &t.token) {
            Some(Token::Comma) => {
                ts.next()?;
            }
            Some(Token::RParen) => {}
            _ => {
                return Err(ts.error_here(Error::Syntax {
                    expected: "',' or ')'".to_string(),
                    found: ts.found_desc(),
                }));
            }
        }
    }

    let close = ts.expect(Token::RParen)?;

    for param in params.iter() {
        if param.required && param.init_count == 0 {
            return Err(ts.error_at(
                Error::MissingParam {
                    type_name: concrete.clone(),
                    param: param.name.clone(),
                },
                close.span.clone(),
            ));
        }
    }

    let end = ts.tell();
    let init_text = ts.source()[start..end].to_string();
    instance
        .post_init(&child, &init_text)
        .map_err(|error| ts.error_at(error, start..end))?;

    Ok(Object::new(concrete, Arc::from(instance)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        count: i64,
    }
    impl Constructible for Probe {
        fn register_params(&self, params: &mut ParamSet) {
            params.field("count", |p: &mut Probe, v: i64| p.count = v).required();
            params.temporary("hint", "string");
        }
    }

    #[test]
    fn descriptors_carry_tags_and_flags() {
        let probe = Probe::default();
        let params = describe(&probe);
        let described: Vec<_> = params
            .iter()
            .map(|p| (p.name(), p.type_tag(), p.is_required(), p.is_temporary()))
            .collect();
        assert_eq!(described, vec![
            ("count", "int", true, false),
            ("hint", "string", false, true),
        ]);
    }

    #[test]
    #[should_panic(expected = "share the name")]
    fn duplicate_descriptor_names_are_rejected() {
        let mut params = ParamSet::new();
        params.field("x", |p: &mut Probe, v: i64| p.count = v);
        params.field("x", |p: &mut Probe, v: i64| p.count = v);
    }
}
