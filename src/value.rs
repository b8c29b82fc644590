use std::fmt;
use std::sync::Arc;

use crate::factory::Constructible;

//===----------------------------------------------------------------------===//
// Object
//===----------------------------------------------------------------------===//

/// A handle to a factory-constructed object, or to the script literal
/// `nullptr`. Objects are immutable once construction finishes, so handles
/// are shared freely between environments.
#[derive(Clone)]
pub struct Object {
    type_name: String,
    inner: Option<Arc<dyn Constructible>>,
}

impl Object {
    pub(crate) fn new(type_name: impl Into<String>, inner: Arc<dyn Constructible>) -> Self {
        Object { type_name: type_name.into(), inner: Some(inner) }
    }

    /// A null object. `type_name` is the abstract tag of the slot the null
    /// appeared in, since a null carries no concrete type of its own.
    pub(crate) fn null(type_name: impl Into<String>) -> Self {
        Object { type_name: type_name.into(), inner: None }
    }

    pub fn is_null(&self) -> bool {
        self.inner.is_none()
    }

    /// The concrete type name the object was constructed as, or the abstract
    /// tag for a null.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Typed access to the underlying instance. Returns `None` for nulls and
    /// for a `C` that is not the object's concrete type.
    pub fn downcast<C: Constructible>(&self) -> Option<Arc<C>> {
        let inner = self.inner.as_ref()?;
        inner.clone().into_any_arc().downcast::<C>().ok()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_null() {
            write!(f, "Object(null {})", self.type_name)
        } else {
            write!(f, "Object({})", self.type_name)
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (None, None) => self.type_name == other.type_name,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

//===----------------------------------------------------------------------===//
// Value
//===----------------------------------------------------------------------===//

/// A value bound to a variable: one of the four primitives, an object, or a
/// homogeneous vector. The element type of a vector is not stored here; the
/// environment tracks it through the variable's type tag.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    Object(Object),
    Vector(Vec<Value>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => {
                if a.is_nan() && b.is_nan() { true } else { a == b }
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Vector(a), Value::Vector(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Bool(val) => write!(f, "{}", val),
            Value::Int(val) => write!(f, "{}", val),
            Value::Double(val) => write!(f, "{}", val),
            Value::Str(s) => {
                write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
            }
            Value::Object(obj) => {
                if obj.is_null() {
                    write!(f, "#<null>")
                } else {
                    write!(f, "#<{}>", obj.type_name())
                }
            }
            Value::Vector(items) => {
                let strs: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{{{}}}", strs.join(", "))
            }
        }
    }
}

//===----------------------------------------------------------------------===//
// Type tags
//===----------------------------------------------------------------------===//

/// Textual type tags have the grammar `<base>` or `<base>[]`, where `<base>`
/// is a primitive name or a registered abstract type name.
pub(crate) const PRIMITIVE_TAGS: [&str; 4] = ["bool", "int", "double", "string"];

pub(crate) fn is_primitive_tag(tag: &str) -> bool {
    PRIMITIVE_TAGS.contains(&tag)
}

pub(crate) fn vector_tag(element: &str) -> String {
    format!("{}[]", element)
}

/// The element tag of a vector tag, or `None` for a scalar tag.
pub(crate) fn element_tag(tag: &str) -> Option<&str> {
    tag.strip_suffix("[]")
}

//===----------------------------------------------------------------------===//
// Typed conversion
//===----------------------------------------------------------------------===//

/// Conversion from a stored [`Value`] into a host-facing Rust type. The
/// conversion is strict: an `i64` never reads a variable of tag `double`,
/// mirroring the per-tag variable maps.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for Object {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(obj) => Some(obj.clone()),
            _ => None,
        }
    }
}

impl<C: Constructible> FromValue for Arc<C> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(obj) => obj.downcast(),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Vector(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

/// A [`FromValue`] type with a statically known type tag; these are the
/// types usable as typed parameter slots. Objects are excluded on purpose:
/// their tag is the abstract type name, which only the registry knows, so
/// object slots take the tag as an explicit argument instead.
pub trait FieldType: FromValue + 'static {
    fn type_tag() -> String;
}

impl FieldType for bool {
    fn type_tag() -> String {
        "bool".to_string()
    }
}

impl FieldType for i64 {
    fn type_tag() -> String {
        "int".to_string()
    }
}

impl FieldType for f64 {
    fn type_tag() -> String {
        "double".to_string()
    }
}

impl FieldType for String {
    fn type_tag() -> String {
        "string".to_string()
    }
}

impl<T: FieldType> FieldType for Vec<T> {
    fn type_tag() -> String {
        vector_tag(&T::type_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_are_strict() {
        assert_eq!(i64::from_value(&Value::Int(3)), Some(3));
        assert_eq!(f64::from_value(&Value::Int(3)), None);
        assert_eq!(bool::from_value(&Value::Int(0)), None);
        assert_eq!(
            <Vec<i64>>::from_value(&Value::Vector(vec![Value::Int(1), Value::Int(2)])),
            Some(vec![1, 2])
        );
        assert_eq!(
            <Vec<i64>>::from_value(&Value::Vector(vec![Value::Int(1), Value::Bool(true)])),
            None
        );
    }

    #[test]
    fn tags() {
        assert!(is_primitive_tag("double"));
        assert!(!is_primitive_tag("Animal"));
        assert_eq!(<Vec<String>>::type_tag(), "string[]");
        assert_eq!(element_tag("Animal[]"), Some("Animal"));
        assert_eq!(element_tag("Animal"), None);
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Str("a \"b\"".to_string()).to_string(), r#""a \"b\"""#);
        assert_eq!(
            Value::Vector(vec![Value::Int(1), Value::Int(2)]).to_string(),
            "{1, 2}"
        );
        assert_eq!(Value::Object(Object::null("Animal")).to_string(), "#<null>");
    }
}
