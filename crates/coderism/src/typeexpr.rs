//! type expressions
//!
//! Decodes `type` attributes (`string`, `list(string)`, `object({ a = optional(string, "x") })`) into a [TypeSpec]
//! and converts values to it.
//!
//! `coder_parameter` blocks write the type as a string (`type = "list(string)"`), `variable` blocks as a bare
//! expression (`type = list(string)`). Both are accepted.
use crate::util::{object_key_name, parse_expression};
use crate::value::Value;
use hcl::eval::Evaluate;
use hcl::Expression;
use indexmap::IndexMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    Any,
    String,
    Number,
    Bool,
    List(Box<TypeSpec>),
    Set(Box<TypeSpec>),
    Map(Box<TypeSpec>),
    Tuple(Vec<TypeSpec>),
    Object(IndexMap<String, ObjectAttribute>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectAttribute {
    pub ty: TypeSpec,
    pub optional: bool,
    /// Value used when an optional attribute is absent or `null`
    pub default: Option<Value>,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TypeError {
    #[error("unable to parse type expression {0:?}")]
    Unparsable(String),
    #[error("{0:?} is not a valid type")]
    UnknownType(String),
    #[error("type constructor {name:?} requires {expected}")]
    InvalidArguments { name: String, expected: &'static str },
    #[error("optional() is only allowed for object attributes")]
    MisplacedOptional,
    #[error("invalid default value for optional attribute {attribute:?}: {message}")]
    InvalidDefault { attribute: String, message: String },
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConversionError {
    #[error("{expected} required, but have {found}")]
    Mismatch {
        expected: String,
        found: &'static str,
    },
    #[error("a number is required, but {0:?} is not a number")]
    InvalidNumber(String),
    #[error("a bool is required, but {0:?} is neither \"true\" nor \"false\"")]
    InvalidBool(String),
    #[error("attribute {0:?} is required")]
    MissingAttribute(String),
    #[error("tuple requires {expected} elements, but have {found}")]
    TupleLength { expected: usize, found: usize },
}

impl TypeSpec {
    /// Decode the expression of a `type` attribute
    pub fn decode(expr: &Expression) -> Result<TypeSpec, TypeError> {
        match expr {
            Expression::String(text) => {
                let parsed = parse_expression(text.trim())
                    .map_err(|_| TypeError::Unparsable(text.clone()))?;
                Self::decode_expr(&parsed)
            }
            other => Self::decode_expr(other),
        }
    }

    fn decode_expr(expr: &Expression) -> Result<TypeSpec, TypeError> {
        match expr {
            Expression::Variable(keyword) => match keyword.as_str() {
                "string" => Ok(TypeSpec::String),
                "number" => Ok(TypeSpec::Number),
                "bool" => Ok(TypeSpec::Bool),
                "any" => Ok(TypeSpec::Any),
                other => Err(TypeError::UnknownType(other.to_string())),
            },
            Expression::Parenthesis(inner) => Self::decode_expr(inner),
            Expression::FuncCall(call) => {
                let name = call.name.to_string();
                match (name.as_str(), call.args.as_slice()) {
                    ("list", [element]) => Ok(TypeSpec::List(Box::new(Self::decode_expr(element)?))),
                    ("set", [element]) => Ok(TypeSpec::Set(Box::new(Self::decode_expr(element)?))),
                    ("map", [element]) => Ok(TypeSpec::Map(Box::new(Self::decode_expr(element)?))),
                    ("tuple", [Expression::Array(elements)]) => Ok(TypeSpec::Tuple(
                        elements
                            .iter()
                            .map(Self::decode_expr)
                            .collect::<Result<_, _>>()?,
                    )),
                    ("object", [Expression::Object(attributes)]) => {
                        let mut decoded = IndexMap::new();
                        for (key, value) in attributes.iter() {
                            let name = object_key_name(key)
                                .ok_or_else(|| TypeError::Unparsable(expr.to_string()))?;
                            let attribute = Self::decode_attribute(&name, value)?;
                            decoded.insert(name, attribute);
                        }
                        Ok(TypeSpec::Object(decoded))
                    }
                    ("optional", _) => Err(TypeError::MisplacedOptional),
                    ("list" | "set" | "map", _) => Err(TypeError::InvalidArguments {
                        name,
                        expected: "exactly one element type",
                    }),
                    ("tuple", _) => Err(TypeError::InvalidArguments {
                        name,
                        expected: "a list of element types",
                    }),
                    ("object", _) => Err(TypeError::InvalidArguments {
                        name,
                        expected: "an object of attribute types",
                    }),
                    _ => Err(TypeError::UnknownType(name)),
                }
            }
            other => Err(TypeError::Unparsable(other.to_string())),
        }
    }

    fn decode_attribute(name: &str, expr: &Expression) -> Result<ObjectAttribute, TypeError> {
        let Expression::FuncCall(call) = expr else {
            return Ok(ObjectAttribute {
                ty: Self::decode_expr(expr)?,
                optional: false,
                default: None,
            });
        };

        if call.name.to_string() != "optional" {
            return Ok(ObjectAttribute {
                ty: Self::decode_expr(expr)?,
                optional: false,
                default: None,
            });
        }

        match call.args.as_slice() {
            [ty] => Ok(ObjectAttribute {
                ty: Self::decode_expr(ty)?,
                optional: true,
                default: None,
            }),
            [ty, default] => {
                let ty = Self::decode_expr(ty)?;
                let invalid = |message: String| TypeError::InvalidDefault {
                    attribute: name.to_string(),
                    message,
                };
                let default = default
                    .evaluate(&hcl::eval::Context::new())
                    .map_err(|err| invalid(err.to_string()))?;
                let default = ty
                    .convert(Value::from(default))
                    .map_err(|err| invalid(err.to_string()))?;
                Ok(ObjectAttribute {
                    ty,
                    optional: true,
                    default: Some(default),
                })
            }
            _ => Err(TypeError::InvalidArguments {
                name: "optional".to_string(),
                expected: "a type and an optional default value",
            }),
        }
    }

    /// Fill in defaults of optional object attributes that are absent or `null`
    pub fn apply_defaults(&self, value: Value) -> Value {
        match (self, value) {
            (TypeSpec::Object(attributes), Value::Object(mut map)) => {
                for (name, attribute) in attributes {
                    let current = map.get(name).filter(|v| !v.is_null()).cloned();
                    let next = match (current, &attribute.default) {
                        (Some(current), _) => attribute.ty.apply_defaults(current),
                        (None, Some(default)) => attribute.ty.apply_defaults(default.clone()),
                        (None, None) => continue,
                    };
                    map.insert(name.clone(), next);
                }
                Value::Object(map)
            }
            (TypeSpec::List(element) | TypeSpec::Set(element), Value::Array(items)) => {
                Value::Array(items.into_iter().map(|v| element.apply_defaults(v)).collect())
            }
            (TypeSpec::Map(element), Value::Object(map)) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, element.apply_defaults(v)))
                    .collect(),
            ),
            (TypeSpec::Tuple(types), Value::Array(items)) => Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, v)| match types.get(index) {
                        Some(ty) => ty.apply_defaults(v),
                        None => v,
                    })
                    .collect(),
            ),
            (_, value) => value,
        }
    }

    /// Convert a value to this type
    ///
    /// `null` and unknown values convert to any type unchanged.
    pub fn convert(&self, value: Value) -> Result<Value, ConversionError> {
        match (self, value) {
            (_, Value::Unknown) => Ok(Value::Unknown),
            (_, Value::Null) => Ok(Value::Null),
            (TypeSpec::Any, value) => Ok(value),

            (TypeSpec::String, value @ Value::String(_)) => Ok(value),
            (TypeSpec::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (TypeSpec::String, Value::Boolean(b)) => Ok(Value::String(b.to_string())),

            (TypeSpec::Number, value @ Value::Number(_)) => Ok(value),
            (TypeSpec::Number, Value::String(s)) => match parse_number(&s) {
                Some(number) => Ok(Value::Number(number)),
                None => Err(ConversionError::InvalidNumber(s)),
            },

            (TypeSpec::Bool, value @ Value::Boolean(_)) => Ok(value),
            (TypeSpec::Bool, Value::String(s)) => match s.as_str() {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(ConversionError::InvalidBool(s)),
            },

            // list parameters carry their value JSON encoded
            (TypeSpec::List(_) | TypeSpec::Set(_), Value::String(s)) => {
                match serde_json::from_str::<serde_json::Value>(&s) {
                    Ok(json @ serde_json::Value::Array(_)) => self.convert(json.into()),
                    _ => Err(ConversionError::Mismatch {
                        expected: self.to_string(),
                        found: "string",
                    }),
                }
            }
            (TypeSpec::List(element), Value::Array(items)) => items
                .into_iter()
                .map(|item| element.convert(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (TypeSpec::Set(element), Value::Array(items)) => {
                let mut unique: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    let item = element.convert(item)?;
                    if !unique.contains(&item) {
                        unique.push(item);
                    }
                }
                Ok(Value::Array(unique))
            }
            (TypeSpec::Map(element), Value::Object(map)) => map
                .into_iter()
                .map(|(k, v)| Ok((k, element.convert(v)?)))
                .collect::<Result<IndexMap<_, _>, _>>()
                .map(Value::Object),
            (TypeSpec::Tuple(types), Value::Array(items)) => {
                if types.len() != items.len() {
                    return Err(ConversionError::TupleLength {
                        expected: types.len(),
                        found: items.len(),
                    });
                }
                types
                    .iter()
                    .zip(items)
                    .map(|(ty, item)| ty.convert(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            (TypeSpec::Object(attributes), Value::Object(mut map)) => {
                let mut converted = IndexMap::new();
                for (name, attribute) in attributes {
                    let value = match map.shift_remove(name) {
                        Some(value) => attribute.ty.convert(value)?,
                        None if attribute.optional => Value::Null,
                        None => return Err(ConversionError::MissingAttribute(name.clone())),
                    };
                    converted.insert(name.clone(), value);
                }
                Ok(Value::Object(converted))
            }

            (ty, value) => Err(ConversionError::Mismatch {
                expected: ty.to_string(),
                found: value.type_name(),
            }),
        }
    }
}

fn parse_number(input: &str) -> Option<hcl::Number> {
    let input = input.trim();
    if let Ok(int) = input.parse::<i64>() {
        return Some(int.into());
    }
    input.parse::<f64>().ok().and_then(hcl::Number::from_f64)
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Any => f.write_str("any"),
            TypeSpec::String => f.write_str("string"),
            TypeSpec::Number => f.write_str("number"),
            TypeSpec::Bool => f.write_str("bool"),
            TypeSpec::List(element) => write!(f, "list({element})"),
            TypeSpec::Set(element) => write!(f, "set({element})"),
            TypeSpec::Map(element) => write!(f, "map({element})"),
            TypeSpec::Tuple(types) => {
                f.write_str("tuple([")?;
                for (index, ty) in types.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str("])")
            }
            TypeSpec::Object(attributes) => {
                f.write_str("object({")?;
                for (index, (name, attribute)) in attributes.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    if attribute.optional {
                        write!(f, "{name} = optional({})", attribute.ty)?;
                    } else {
                        write!(f, "{name} = {}", attribute.ty)?;
                    }
                }
                f.write_str("})")
            }
        }
    }
}
