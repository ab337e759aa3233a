//! restricted expressions
//!
//! Workspace tags must be statically enumerable: the `tags` attribute has to be an object literal, and its keys and
//! values may only reference variables, locals, managed resources and the `value` of a `coder_parameter`. Function
//! calls are not allowed.
//!
//! The checks look at the expression as written, before anything is evaluated.
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::parameters::PARAMETER_DATA_TYPE;
use crate::visit::References;
use hcl::expr::Object;
use hcl::{Expression, ObjectKey};

#[derive(Debug, Clone, PartialEq)]
pub enum Classification<T> {
    /// The expression may be evaluated
    Literal(T),
    Disallowed(Vec<Disallowed>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Disallowed {
    /// `tags` is not written as an object literal
    NotObjectLiteral { kind: &'static str },
    FunctionCall { name: String },
    /// Reference to a data source other than `coder_parameter`
    DataSource { reference: String },
    /// Reference to a `coder_parameter` attribute other than `value`
    ParameterAttribute { reference: String },
}

impl Disallowed {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Disallowed::NotObjectLiteral { kind } => Diagnostic::error(
                DiagnosticKind::InvalidAttributeType,
                "Invalid tags attribute",
                format!("The \"tags\" attribute must be an object literal, found {kind}."),
            ),
            Disallowed::FunctionCall { name } => Diagnostic::error(
                DiagnosticKind::UnsupportedExpressionShape,
                "Function calls not allowed",
                format!("Functions may not be called here (found {name:?})."),
            ),
            Disallowed::DataSource { reference } => Diagnostic::error(
                DiagnosticKind::UnsupportedExpressionShape,
                "Invalid data source reference",
                format!(
                    "Only the {PARAMETER_DATA_TYPE:?} data source may be referenced here (found {reference:?})."
                ),
            ),
            Disallowed::ParameterAttribute { reference } => Diagnostic::error(
                DiagnosticKind::UnsupportedExpressionShape,
                "Invalid parameter reference",
                format!(
                    "Only the \"value\" attribute of a {PARAMETER_DATA_TYPE:?} may be referenced here (found {reference:?})."
                ),
            ),
        }
    }
}

/// Checks the expression of a `tags` attribute
pub fn classify_tags(expr: &Expression) -> Classification<&Object<ObjectKey, Expression>> {
    match expr {
        Expression::Object(object) => Classification::Literal(object),
        Expression::FuncCall(call) => Classification::Disallowed(vec![Disallowed::FunctionCall {
            name: call.name.to_string(),
        }]),
        other => Classification::Disallowed(vec![Disallowed::NotObjectLiteral {
            kind: expression_kind(other),
        }]),
    }
}

/// Checks a single key or value expression of a `tags` object
pub fn classify_entry(expr: &Expression) -> Classification<&Expression> {
    let references = References::collect(expr);
    let mut disallowed: Vec<Disallowed> = references
        .functions
        .into_iter()
        .map(|name| Disallowed::FunctionCall { name })
        .collect();

    for (path, text) in references.paths.iter().zip(references.texts) {
        if path.first().map(String::as_str) != Some("data") {
            continue;
        }

        if path.get(1).map(String::as_str) != Some(PARAMETER_DATA_TYPE) {
            disallowed.push(Disallowed::DataSource { reference: text });
        } else if path.get(3).map(String::as_str) != Some("value") {
            disallowed.push(Disallowed::ParameterAttribute { reference: text });
        }
    }

    if disallowed.is_empty() {
        Classification::Literal(expr)
    } else {
        Classification::Disallowed(disallowed)
    }
}

/// Human readable kind of an expression
pub fn expression_kind(expr: &Expression) -> &'static str {
    match expr {
        Expression::Null => "null",
        Expression::Bool(_) => "bool",
        Expression::Number(_) => "number",
        Expression::String(_) => "string",
        Expression::Array(_) => "tuple constructor",
        Expression::Object(_) => "object constructor",
        Expression::TemplateExpr(_) => "template",
        Expression::Variable(_) => "variable reference",
        Expression::Traversal(_) => "reference",
        Expression::FuncCall(_) => "function call",
        Expression::Parenthesis(_) => "parenthesized expression",
        Expression::Conditional(_) => "conditional expression",
        Expression::Operation(_) => "operation",
        Expression::ForExpr(_) => "for expression",
        _ => "expression",
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::parse_expression;
    use pretty_assertions::assert_eq;

    fn entry(input: &str) -> Classification<Expression> {
        let expr = parse_expression(input).unwrap();
        match classify_entry(&expr) {
            Classification::Literal(expr) => Classification::Literal(expr.clone()),
            Classification::Disallowed(reasons) => Classification::Disallowed(reasons),
        }
    }

    #[test]
    fn tags_must_be_object_literals() {
        let object = parse_expression(r#"{ a = "b" }"#).unwrap();
        assert!(matches!(classify_tags(&object), Classification::Literal(_)));

        let reference = parse_expression("local.tags").unwrap();
        assert_eq!(
            classify_tags(&reference),
            Classification::Disallowed(vec![Disallowed::NotObjectLiteral {
                kind: "reference"
            }])
        );

        let call = parse_expression(r#"merge({ a = "b" }, local.tags)"#).unwrap();
        assert_eq!(
            classify_tags(&call),
            Classification::Disallowed(vec![Disallowed::FunctionCall {
                name: "merge".to_string()
            }])
        );
    }

    #[test]
    fn permitted_entries() {
        for input in [
            r#""literal""#,
            "var.region",
            "local.zone",
            "docker_image.ubuntu.repo_digest",
            "data.coder_parameter.region.value",
            r#""${data.coder_parameter.region.value}-${var.suffix}""#,
        ] {
            assert!(
                matches!(entry(input), Classification::Literal(_)),
                "{input} should be permitted"
            );
        }
    }

    #[test]
    fn function_calls() {
        assert_eq!(
            entry(r#"try(split(".", var.region)[1], "x")"#),
            Classification::Disallowed(vec![
                Disallowed::FunctionCall {
                    name: "try".to_string()
                },
                Disallowed::FunctionCall {
                    name: "split".to_string()
                },
            ])
        );
    }

    #[test]
    fn data_sources() {
        assert_eq!(
            entry("data.local_file.hostname.content"),
            Classification::Disallowed(vec![Disallowed::DataSource {
                reference: "data.local_file.hostname.content".to_string()
            }])
        );
        assert_eq!(
            entry("data.coder_parameter.region.name"),
            Classification::Disallowed(vec![Disallowed::ParameterAttribute {
                reference: "data.coder_parameter.region.name".to_string()
            }])
        );
    }

    #[test]
    fn for_bound_names_do_not_hide_data_sources() {
        assert_eq!(
            entry(r#""${[for data in ["x"] : data][0]}-${data.local_file.hostname.filename}""#),
            Classification::Disallowed(vec![Disallowed::DataSource {
                reference: "data.local_file.hostname.filename".to_string()
            }])
        );
        assert!(matches!(
            entry(r#"[for data in var.list : data.name][0]"#),
            Classification::Literal(_)
        ));
    }

    #[test]
    fn diagnostics() {
        let diagnostic = Disallowed::FunctionCall {
            name: "upper".to_string(),
        }
        .to_diagnostic();
        assert_eq!(diagnostic.kind, DiagnosticKind::UnsupportedExpressionShape);
        assert_eq!(
            diagnostic.detail,
            "Functions may not be called here (found \"upper\")."
        );
    }
}
