//! Tests that diagnostics carry the right error kind, byte span, and
//! rendered report.

use construe::demo;
use construe::{Diagnostic, Error, Interpreter};

fn eval_err(source: &str) -> Diagnostic {
    demo::register_all();
    let mut interp = Interpreter::new();
    interp
        .eval_str(source)
        .expect_err("evaluation was expected to fail")
}

#[test]
fn type_mismatch_reports_the_value_span() {
    let err = eval_err("int x = true;");
    assert_eq!(err.span, 8..12);
    match err.error {
        Error::Type { expected, found } => {
            assert_eq!(expected, "int");
            assert!(found.contains("true"));
        }
        other => panic!("expected a type error, got {:?}", other),
    }
}

#[test]
fn missing_semicolon_points_past_the_end() {
    let err = eval_err("int x = 3");
    assert_eq!(err.span, 9..9);
    match err.error {
        Error::Syntax { expected, found } => {
            assert_eq!(expected, "';'");
            assert!(found.contains("end of input"));
        }
        other => panic!("expected a syntax error, got {:?}", other),
    }
}

#[test]
fn undefined_reference_reports_the_span() {
    let err = eval_err("x = missing;");
    assert_eq!(err.span, 4..11);
    assert!(matches!(err.error, Error::Name(_)));
}

#[test]
fn unknown_parameter_reports_its_offset() {
    let err = eval_err("Animal a = Cow(moo(3));");
    assert_eq!(err.span, 15..18);
    assert!(matches!(err.error, Error::Name(_)));
}

#[test]
fn missing_required_parameter_points_at_the_closing_paren() {
    let err = eval_err("Animal a = Cow(age(5));");
    assert_eq!(err.span, 21..22);
    assert!(matches!(err.error, Error::MissingParam { .. }));
}

#[test]
fn unterminated_string_is_lexical() {
    let err = eval_err("s = \"oops");
    assert_eq!(err.span.start, 4);
    assert!(matches!(err.error, Error::Lexical(_)));
}

#[test]
fn report_formatting_includes_location_and_caret() {
    let err = eval_err("int x = 3;\nint x = 4;\n");
    let report = err.format();
    assert!(report.contains("Name error"));
    assert!(report.contains("--> <input>:2:5"));
    assert!(report.contains("int x = 4;"));
    assert!(report.contains("^"));
}

#[test]
fn errors_do_not_resynchronize() {
    // Evaluation stops at the first error; later statements never run.
    demo::register_all();
    let mut interp = Interpreter::new();
    interp
        .eval_str("int a = 1; int b = true; int c = 3;")
        .expect_err("evaluation was expected to fail");
    assert_eq!(interp.get::<i64>("a"), Some(1));
    assert!(!interp.env().defined("b"));
    assert!(!interp.env().defined("c"));
}
