//! canonical string form of evaluated values
use crate::value::Value;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum CoerceError {
    #[error("only primitive types are supported - bool, number, and string (found {found})")]
    UnsupportedType { found: &'static str },
    #[error("value is not known yet")]
    NotKnown,
    #[error("no value")]
    NoValue,
}

/// Converts a primitive [Value] into its string form.
///
/// - `bool` becomes `"true"` or `"false"`
/// - numbers are rendered in full precision
/// - strings are returned as is
/// - an object with the single key `value` is unwrapped and its inner value converted
///
/// Anything else is a [CoerceError].
pub fn coerce_to_string(value: &Value) -> Result<String, CoerceError> {
    match value {
        Value::Boolean(true) => Ok("true".to_string()),
        Value::Boolean(false) => Ok("false".to_string()),
        Value::Number(number) => Ok(number.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Object(map) if map.len() == 1 => match map.get("value") {
            Some(inner) => coerce_to_string(inner),
            None => Err(CoerceError::UnsupportedType { found: "object" }),
        },
        Value::Unknown => Err(CoerceError::NotKnown),
        other => Err(CoerceError::UnsupportedType {
            found: other.type_name(),
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn primitives() {
        assert_eq!(coerce_to_string(&Value::from(true)).unwrap(), "true");
        assert_eq!(coerce_to_string(&Value::from(false)).unwrap(), "false");
        assert_eq!(coerce_to_string(&Value::from(1i64)).unwrap(), "1");
        assert_eq!(coerce_to_string(&Value::from("a")).unwrap(), "a");
    }

    #[test]
    fn numbers_keep_precision() {
        let big = Value::Number(hcl::Number::from(9007199254740993i64));
        assert_eq!(coerce_to_string(&big).unwrap(), "9007199254740993");

        let float = Value::Number(hcl::Number::from_f64(0.1).unwrap());
        assert_eq!(coerce_to_string(&float).unwrap(), "0.1");
    }

    #[test]
    fn wrapped_value() {
        let wrapped = Value::from(indexmap::indexmap! { "value" => Value::from("eu") });
        assert_eq!(coerce_to_string(&wrapped).unwrap(), "eu");

        let nested = Value::from(indexmap::indexmap! { "value" => wrapped });
        assert_eq!(coerce_to_string(&nested).unwrap(), "eu");
    }

    #[test]
    fn unsupported_shapes_error() {
        assert_eq!(
            coerce_to_string(&Value::from(vec!["a"])),
            Err(CoerceError::UnsupportedType { found: "list" })
        );
        assert_eq!(
            coerce_to_string(&Value::Null),
            Err(CoerceError::UnsupportedType { found: "null" })
        );
        assert_eq!(coerce_to_string(&Value::Unknown), Err(CoerceError::NotKnown));

        let two_keys = Value::from(indexmap::indexmap! {
            "value" => Value::from("a"),
            "other" => Value::from("b"),
        });
        assert_eq!(
            coerce_to_string(&two_keys),
            Err(CoerceError::UnsupportedType { found: "object" })
        );

        let wrong_key = Value::from(indexmap::indexmap! { "inner" => Value::from("a") });
        assert!(coerce_to_string(&wrong_key).is_err());
    }
}
