//! Value decoding and type inference.
//!
//! [`read_value`] consumes exactly the tokens forming one value of a given
//! type tag; [`infer_tag`] looks ahead (without consuming) to decide what
//! tag an untyped assignment should get.

use crate::env::Environment;
use crate::error::{Diagnostic, Error};
use crate::factory;
use crate::lexer::{Token, TokenStream};
use crate::registry;
use crate::value::{Value, element_tag, vector_tag};

/// Parses the next value from `ts` as `tag`: a primitive literal, a
/// reference to a defined variable, an object construction, or a braced
/// vector.
pub(crate) fn read_value(
    env: &Environment,
    ts: &mut TokenStream,
    tag: &str,
) -> Result<Value, Diagnostic> {
    // A defined variable that is not being invoked as a constructor stands
    // for its value, whatever the target type; the tags must then agree.
    let var_ref = match ts.peek() {
        Some(t) => match &t.token {
            Token::Ident(name)
                if env.defined(name)
                    && !matches!(
                        ts.peek_ahead(1).map(|t2| &t2.token),
                        Some(Token::LParen)
                    ) =>
            {
                Some((name.clone(), t.span.clone()))
            }
            _ => None,
        },
        None => None,
    };
    if let Some((name, span)) = var_ref {
        let stored = env.type_of(&name).unwrap_or_default().to_string();
        let target = env.resolve_tag(tag);
        if stored != target {
            return Err(ts.error_at(
                Error::Type {
                    expected: target.to_string(),
                    found: format!("variable \"{}\" of type {}", name, stored),
                },
                span.clone(),
            ));
        }
        let value = env.value_of(&name).cloned().ok_or_else(|| {
            ts.error_at(
                Error::Internal(format!("variable \"{}\" is defined but has no value", name)),
                span,
            )
        })?;
        ts.next()?;
        return Ok(value);
    }

    if let Some(elem) = element_tag(tag) {
        return read_vector(env, ts, tag, elem);
    }

    let token = ts.peek().map(|t| t.token.clone());
    match tag {
        "bool" => match token {
            Some(Token::True) => {
                ts.next()?;
                Ok(Value::Bool(true))
            }
            Some(Token::False) => {
                ts.next()?;
                Ok(Value::Bool(false))
            }
            _ => Err(ts.error_here(Error::Type {
                expected: "bool".to_string(),
                found: ts.found_desc(),
            })),
        },
        "int" => match token {
            Some(Token::Number(text)) => match text.parse::<i64>() {
                Ok(parsed) => {
                    ts.next()?;
                    Ok(Value::Int(parsed))
                }
                Err(_) => Err(ts.error_here(Error::Type {
                    expected: "int".to_string(),
                    found: format!("\"{}\"", text),
                })),
            },
            _ => Err(ts.error_here(Error::Type {
                expected: "int".to_string(),
                found: ts.found_desc(),
            })),
        },
        "double" => match token {
            Some(Token::Number(text)) => match text.parse::<f64>() {
                Ok(parsed) => {
                    ts.next()?;
                    Ok(Value::Double(parsed))
                }
                Err(_) => Err(ts.error_here(Error::Type {
                    expected: "double".to_string(),
                    found: format!("\"{}\"", text),
                })),
            },
            _ => Err(ts.error_here(Error::Type {
                expected: "double".to_string(),
                found: ts.found_desc(),
            })),
        },
        "string" => match token {
            Some(Token::Str(s)) => {
                ts.next()?;
                Ok(Value::Str(s))
            }
            _ => Err(ts.error_here(Error::Type {
                expected: "string".to_string(),
                found: ts.found_desc(),
            })),
        },
        _ if registry::is_abstract(tag) => {
            factory::construct(env, ts, tag).map(Value::Object)
        }
        _ => Err(ts.error_here(Error::Name(format!("unknown type tag \"{}\"", tag)))),
    }
}

/// `'{' value (',' value)* [','] '}'`; the empty vector is legal here (the
/// caller supplied the tag), and every element must decode as `elem`.
fn read_vector(
    env: &Environment,
    ts: &mut TokenStream,
    tag: &str,
    elem: &str,
) -> Result<Value, Diagnostic> {
    if !matches!(ts.peek().map(|t| &t.token), Some(Token::LBrace)) {
        return Err(ts.error_here(Error::Type {
            expected: tag.to_string(),
            found: ts.found_desc(),
        }));
    }
    ts.next()?;

    let mut items = Vec::new();
    loop {
        if matches!(ts.peek().map(|t| &t.token), Some(Token::RBrace)) {
            ts.next()?;
            break;
        }
        items.push(read_value(env, ts, elem)?);
        match ts.peek().map(|t| &t.token) {
            Some(Token::Comma) => {
                ts.next()?;
            }
            Some(Token::RBrace) => {}
            _ => {
                return Err(ts.error_here(Error::Syntax {
                    expected: "',' or '}'".to_string(),
                    found: ts.found_desc(),
                }));
            }
        }
    }

    Ok(Value::Vector(items))
}

/// Determines the type tag of the value starting at the next token, per the
/// inference rules of the language. The stream position is unchanged on
/// success; on failure evaluation aborts anyway.
pub(crate) fn infer_tag(
    env: &Environment,
    ts: &mut TokenStream,
) -> Result<String, Diagnostic> {
    let token = match ts.peek() {
        Some(t) => t.token.clone(),
        None => {
            return Err(ts.error_here(Error::Syntax {
                expected: "a value".to_string(),
                found: "end of input".to_string(),
            }));
        }
    };

    match token {
        Token::True | Token::False => Ok("bool".to_string()),
        Token::Number(text) => {
            Ok(if text.contains(['.', 'e', 'E']) { "double" } else { "int" }.to_string())
        }
        Token::Str(_) => Ok("string".to_string()),
        Token::Null => Err(ts
            .error_here(Error::Type {
                expected: "a value with an inferable type".to_string(),
                found: "a null literal".to_string(),
            })
            .with_note("null objects need an explicit type specifier")),
        Token::Ident(name) => {
            let invoked = matches!(
                ts.peek_ahead(1).map(|t| &t.token),
                Some(Token::LParen)
            );
            if invoked {
                if let Some(base) = registry::abstract_of(&name) {
                    return Ok(base);
                }
            } else if env.defined(&name) {
                return Ok(env.type_of(&name).unwrap_or_default().to_string());
            }
            Err(ts.error_here(Error::Name(format!(
                "cannot infer a type from \"{}\": it is neither a defined variable \
                 nor a registered type",
                name
            ))))
        }
        Token::LBrace => {
            let mark = ts.mark();
            ts.next()?;
            if matches!(ts.peek().map(|t| &t.token), Some(Token::RBrace)) {
                ts.rewind(mark);
                return Err(ts
                    .error_here(Error::Type {
                        expected: "a value with an inferable type".to_string(),
                        found: "an empty vector".to_string(),
                    })
                    .with_note(
                        "an empty vector needs an explicit type specifier such as int[]",
                    ));
            }
            let elem = infer_tag(env, ts)?;
            ts.rewind(mark);
            Ok(vector_tag(&elem))
        }
        _ => Err(ts.error_here(Error::Syntax {
            expected: "a value".to_string(),
            found: ts.found_desc(),
        })),
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
    fn primitive_literals() {
        let env = Environment::new();
        assert_eq!(
            read_value(&env, &mut stream("true"), "bool").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            read_value(&env, &mut stream("-7"), "int").unwrap(),
            Value::Int(-7)
        );
        assert_eq!(
            read_value(&env, &mut stream("2.5"), "double").unwrap(),
            Value::Double(2.5)
        );
        // An integer literal is a fine double.
        assert_eq!(
            read_value(&env, &mut stream("3"), "double").unwrap(),
            Value::Double(3.0)
        );
        assert_eq!(
            read_value(&env, &mut stream("\"hi\""), "string").unwrap(),
            Value::Str("hi".to_string())
        );
    }

    #[test]
    fn a_decimal_is_not_an_int() {
        let env = Environment::new();
        let err = read_value(&env, &mut stream("3.5"), "int").unwrap_err();
        assert!(matches!(err.error, Error::Type { .. }));
    }

    #[test]
    fn vectors_allow_trailing_commas() {
        let env = Environment::new();
        assert_eq!(
            read_value(&env, &mut stream("{1, 2, 3,}"), "int[]").unwrap(),
            Value::Vector(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(
            read_value(&env, &mut stream("{}"), "int[]").unwrap(),
            Value::Vector(vec![])
        );
    }

    #[test]
    fn vector_elements_must_match_the_element_tag() {
        let env = Environment::new();
        let err = read_value(&env, &mut stream("{1, true}"), "int[]").unwrap_err();
        assert!(matches!(err.error, Error::Type { .. }));
    }

    #[test]
    fn inference_table() {
        let env = Environment::new();
        assert_eq!(infer_tag(&env, &mut stream("false")).unwrap(), "bool");
        assert_eq!(infer_tag(&env, &mut stream("12")).unwrap(), "int");
        assert_eq!(infer_tag(&env, &mut stream("12.0")).unwrap(), "double");
        assert_eq!(infer_tag(&env, &mut stream("12e3")).unwrap(), "double");
        assert_eq!(infer_tag(&env, &mut stream("\"s\"")).unwrap(), "string");
        assert_eq!(infer_tag(&env, &mut stream("{1, 2}")).unwrap(), "int[]");
    }

    #[test]
    fn inference_leaves_the_stream_untouched() {
        let env = Environment::new();
        let mut ts = stream("{1, 2}");
        infer_tag(&env, &mut ts).unwrap();
        assert_eq!(ts.peek_start(), 0);
        assert_eq!(
            read_value(&env, &mut ts, "int[]").unwrap(),
            Value::Vector(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn nullptr_and_empty_vector_are_not_inferable() {
        let env = Environment::new();
        assert!(infer_tag(&env, &mut stream("nullptr")).is_err());
        assert!(infer_tag(&env, &mut stream("{}")).is_err());
    }

    #[test]
    fn variable_references_are_type_checked() {
        let mut env = Environment::new();
        env.read_and_set("x", &mut stream("3"), "int").unwrap();

        assert_eq!(
            read_value(&env, &mut stream("x"), "int").unwrap(),
            Value::Int(3)
        );
        let err = read_value(&env, &mut stream("x"), "double").unwrap_err();
        assert!(matches!(err.error, Error::Type { .. }));

        assert_eq!(infer_tag(&env, &mut stream("x")).unwrap(), "int");
        assert_eq!(infer_tag(&env, &mut stream("{x, 4}")).unwrap(), "int[]");
    }
}
