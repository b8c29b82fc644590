//! Tests for the factory mechanics: descriptors, child environments, the
//! post-init hook, and named-argument handling.

use std::sync::Arc;

use construe::demo::{self, Cow, Sheep};
use construe::{Constructible, Environment, Error, Interpreter, ParamSet, registry};

/// Records what its post-init hook observed, so tests can assert on the
/// child environment and the captured invocation text.
#[derive(Debug, Default)]
struct Recorder {
    label: String,
    init_text: String,
    size_temporary: Option<i64>,
    child_defined: Vec<String>,
}

impl Constructible for Recorder {
    fn register_params(&self, params: &mut ParamSet) {
        params.field("label", |r: &mut Recorder, v: String| r.label = v).required();
        params.temporary("size", "int");
    }

    fn post_init(&mut self, env: &Environment, init_text: &str) -> Result<(), Error> {
        self.init_text = init_text.to_string();
        self.size_temporary = env.get::<i64>("size");
        for name in ["label", "size", "outer"] {
            if env.defined(name) {
                self.child_defined.push(name.to_string());
            }
        }
        Ok(())
    }
}

/// Rejects construction from post-init when told to.
#[derive(Debug, Default)]
struct Picky {
    limit: i64,
}

impl Constructible for Picky {
    fn register_params(&self, params: &mut ParamSet) {
        params.field("limit", |p: &mut Picky, v: i64| p.limit = v).required();
    }

    fn post_init(&mut self, _env: &Environment, _init_text: &str) -> Result<(), Error> {
        if self.limit < 0 {
            return Err(Error::Runtime("limit must not be negative".to_string()));
        }
        Ok(())
    }
}

fn register_fixtures() {
    demo::register_all();
    registry::register::<Recorder>("Recorder", "Recorder");
    registry::register::<Picky>("Picky", "Picky");
}

fn interp(source: &str) -> Interpreter {
    register_fixtures();
    let mut interp = Interpreter::new();
    interp.eval_str(source).unwrap_or_else(|err| {
        panic!("failed to eval `{}`:\n{}", source, err.format())
    });
    interp
}

fn interp_err(source: &str) -> construe::Diagnostic {
    register_fixtures();
    let mut interp = Interpreter::new();
    match interp.eval_str(source) {
        Ok(()) => panic!("expected `{}` to fail", source),
        Err(err) => err,
    }
}

//===----------------------------------------------------------------------===//
// Named arguments
//===----------------------------------------------------------------------===//

#[test]
fn argument_order_does_not_matter() {
    let a = interp(r#"Animal a = Cow(name("M"), age(7));"#);
    let b = interp(r#"Animal a = Cow(age(7), name("M"));"#);

    let cow_a: Arc<Cow> = a.get("a").unwrap();
    let cow_b: Arc<Cow> = b.get("a").unwrap();
    assert_eq!(cow_a.name, cow_b.name);
    assert_eq!(cow_a.age, cow_b.age);
}

#[test]
fn trailing_comma_in_argument_list() {
    let i = interp(r#"Animal a = Cow(name("M"), age(7),);"#);
    let cow: Arc<Cow> = i.get("a").unwrap();
    assert_eq!(cow.age, 7);
}

#[test]
fn optional_parameters_keep_their_default() {
    let i = interp(r#"Animal a = Cow(name("M"));"#);
    let cow: Arc<Cow> = i.get("a").unwrap();
    assert_eq!(cow.age, 0);
}

#[test]
fn duplicate_argument_is_fatal() {
    let err = interp_err(r#"Animal a = Cow(name("A"), name("B"));"#);
    match err.error {
        Error::Name(msg) => assert!(msg.contains("more than once")),
        other => panic!("expected a name error, got {:?}", other),
    }
}

#[test]
fn unknown_parameter_is_fatal() {
    let err = interp_err("Animal a = Cow(moo(3));");
    match err.error {
        Error::Name(msg) => {
            assert!(msg.contains("moo"));
            assert!(msg.contains("Cow"));
        }
        other => panic!("expected a name error, got {:?}", other),
    }
}

#[test]
fn unknown_concrete_type_is_fatal() {
    let err = interp_err(r#"Animal a = Horse(name("h"));"#);
    match err.error {
        Error::Name(msg) => assert!(msg.contains("Horse")),
        other => panic!("expected a name error, got {:?}", other),
    }
}

#[test]
fn argument_values_are_type_checked() {
    let err = interp_err(r#"Animal a = Cow(name("A"), age("old"));"#);
    assert!(matches!(err.error, Error::Type { .. }));
}

//===----------------------------------------------------------------------===//
// Child environment
//===----------------------------------------------------------------------===//

#[test]
fn parameters_do_not_leak_into_the_parent_environment() {
    let i = interp(r#"Animal a = Cow(name("A"), age(2));"#);
    assert!(!i.env().defined("name"));
    assert!(!i.env().defined("age"));
}

#[test]
fn post_init_sees_arguments_and_outer_variables() {
    let i = interp(r#"int outer = 1; Recorder r = Recorder(label("x"), size(5));"#);
    let r: Arc<Recorder> = i.get("r").unwrap();
    assert_eq!(r.label, "x");
    assert_eq!(r.size_temporary, Some(5));
    assert_eq!(r.child_defined, vec!["label", "size", "outer"]);

    // The temporary stayed in the child environment.
    assert!(!i.env().defined("size"));
}

#[test]
fn temporaries_are_optional_unless_required() {
    let i = interp(r#"Recorder r = Recorder(label("x"));"#);
    let r: Arc<Recorder> = i.get("r").unwrap();
    assert_eq!(r.size_temporary, None);
}

#[test]
fn sheep_age_is_a_temporary() {
    let i = interp(r#"Animal s = Sheep(name("sleepy"), age(3));"#);
    let sheep: Arc<Sheep> = i.get("s").unwrap();
    assert_eq!(sheep.name, "sleepy");
    assert_eq!(sheep.age, Some(3));
}

#[test]
fn a_parameter_may_shadow_an_outer_variable() {
    // The parameter "name" shadows the outer variable of the same name
    // inside the child environment only.
    let i = interp(r#"string name = "outer"; Animal a = Cow(name("inner"));"#);
    let cow: Arc<Cow> = i.get("a").unwrap();
    assert_eq!(cow.name, "inner");
    assert_eq!(i.get::<String>("name"), Some("outer".to_string()));
}

//===----------------------------------------------------------------------===//
// Post-init
//===----------------------------------------------------------------------===//

#[test]
fn init_text_is_the_literal_invocation() {
    let source = r#"Recorder r = Recorder( label( "x" ) , size(2) );"#;
    let i = interp(source);
    let r: Arc<Recorder> = i.get("r").unwrap();
    assert_eq!(r.init_text, r#"Recorder( label( "x" ) , size(2) )"#);
}

#[test]
fn init_text_covers_nested_invocations() {
    let i = interp(r#"Farm f = DairyFarm(animals({Cow(name("A"))}));"#);
    // The outer invocation text contains the inner one verbatim.
    let farm: Arc<construe::demo::DairyFarm> = i.get("f").unwrap();
    assert_eq!(farm.animals.len(), 1);
}

#[test]
fn post_init_failure_aborts_evaluation() {
    let err = interp_err("Picky p = Picky(limit(-1));");
    match err.error {
        Error::Runtime(msg) => assert!(msg.contains("negative")),
        other => panic!("expected a runtime error, got {:?}", other),
    }
    let ok = interp("Picky p = Picky(limit(10));");
    assert_eq!(ok.get::<Arc<Picky>>("p").unwrap().limit, 10);
}

//===----------------------------------------------------------------------===//
// Registry interplay
//===----------------------------------------------------------------------===//

#[test]
fn concrete_names_are_not_type_tags() {
    // A concrete name cannot be used as a type specifier; the statement
    // parses as an assignment to a variable called "Cow" instead and fails
    // at the `c` that follows.
    let err = interp_err(r#"Cow c = Cow(name("A"));"#);
    assert!(matches!(err.error, Error::Syntax { .. } | Error::Name(_)));
}

#[test]
fn vector_elements_must_share_the_abstract_type() {
    register_fixtures();
    let err = interp_err(r#"Animal[] v = {Cow(name("A")), Recorder(label("x"))};"#);
    match err.error {
        Error::Name(msg) => assert!(msg.contains("Recorder")),
        other => panic!("expected a name error, got {:?}", other),
    }
}
