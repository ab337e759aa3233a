//! value representation
//!
//! Values produced by evaluating configuration expressions. Compared to [hcl::Value] this adds one state:
//! - `Unknown`: the value depends on data only available at a later stage (e.g. after `terraform apply`)
//!
//! `Null` is a real value (an explicit `null` in configuration) and must not be confused with an absent attribute.
//!
//! Containers may hold unknown elements. Use [Value::is_wholly_known] to check a value including its elements.
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serialize, Serializer,
};

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Unknown,
    Boolean(bool),
    Number(hcl::Number),
    String(String),
    Array(Vec<Value>),
    Object(indexmap::IndexMap<String, Value>),
}

impl Value {
    /// `true` if neither this value nor any nested element is [Value::Unknown]
    pub fn is_wholly_known(&self) -> bool {
        match self {
            Value::Unknown => false,
            Value::Array(elements) => elements.iter().all(Value::is_wholly_known),
            Value::Object(map) => map.values().all(Value::is_wholly_known),
            _ => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Unknown => "unknown",
            Value::Boolean(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "list",
            Value::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Follow a path of object keys
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(self, |value, key| match value {
            Value::Object(map) => map.get(*key),
            _ => None,
        })
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<hcl::Number> for Value {
    fn from(value: hcl::Number) -> Self {
        Value::Number(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<K: ToString, V: Into<Value>> From<indexmap::IndexMap<K, V>> for Value {
    fn from(value: indexmap::IndexMap<K, V>) -> Self {
        Value::Object(
            value
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl From<hcl::Value> for Value {
    fn from(value: hcl::Value) -> Value {
        match value {
            hcl::Value::Null => Value::Null,
            hcl::Value::Bool(b) => b.into(),
            hcl::Value::Number(n) => n.into(),
            hcl::Value::String(s) => s.into(),
            hcl::Value::Array(a) => Value::Array(a.into_iter().map(Into::into).collect()),
            hcl::Value::Object(o) => Value::Object(
                o.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Converts into an [hcl::Value] for use with [hcl::eval::Context].
///
/// Unknown values become `null`. Callers are expected to short-circuit before handing unknowns to the hcl evaluator.
impl From<&Value> for hcl::Value {
    fn from(value: &Value) -> hcl::Value {
        match value {
            Value::Null | Value::Unknown => hcl::Value::Null,
            Value::Boolean(b) => hcl::Value::Bool(*b),
            Value::Number(n) => hcl::Value::Number(n.clone()),
            Value::String(s) => hcl::Value::String(s.clone()),
            Value::Array(a) => hcl::Value::Array(a.iter().map(Into::into).collect()),
            Value::Object(o) => hcl::Value::Object(
                o.iter()
                    .map(|(k, v)| (k.clone(), hcl::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Value::Null,
            Json::Bool(b) => b.into(),
            Json::Number(n) => {
                if let Some(int) = n.as_i64() {
                    return Value::Number(int.into());
                }
                if let Some(uint) = n.as_u64() {
                    return Value::Number(uint.into());
                }
                n.as_f64()
                    .and_then(hcl::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
            Json::String(s) => s.into(),
            Json::Array(a) => Value::Array(a.into_iter().map(Into::into).collect()),
            Json::Object(o) => Value::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null | Value::Unknown => serializer.serialize_unit(),
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Number(value) => value.serialize(serializer),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wholly_known_checks_nested_elements() {
        let nested = Value::Object(indexmap::indexmap! {
            "a".to_string() => Value::from(vec![Value::from("x"), Value::Unknown]),
        });
        assert!(!nested.is_wholly_known());
        assert!(Value::Null.is_wholly_known());
        assert!(Value::from(vec!["a", "b"]).is_wholly_known());
    }

    #[test]
    fn from_json() {
        let json: serde_json::Value = serde_json::from_str(r#"["a", 1, true, null]"#).unwrap();
        assert_eq!(
            Value::from(json),
            Value::Array(vec![
                Value::from("a"),
                Value::from(1i64),
                Value::from(true),
                Value::Null
            ])
        );
    }

    #[test]
    fn get_path() {
        let value = Value::from(indexmap::indexmap! {
            "data" => Value::from(indexmap::indexmap! { "value" => Value::from("x") }),
        });
        assert_eq!(value.get_path(&["data", "value"]), Some(&Value::from("x")));
        assert_eq!(value.get_path(&["data", "missing"]), None);
    }
}
