//! `coder_parameter` resolution
//!
//! Each `data "coder_parameter"` block becomes a [RichParameter]. Its value is, in order of precedence:
//! 1. an explicit `value` attribute
//! 2. a value supplied by the caller (by the block's name label)
//! 3. the `default` attribute, converted to the declared `type`
//!
//! Resolved values are written back into the module scope as `data.coder_parameter.<name>.value`, where later
//! parameters and workspace tags can reference them.
use crate::attributes::AttributeParser;
use crate::block::{ConfigBlock, Location};
use crate::coerce::{coerce_to_string, CoerceError};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::evaluator;
use crate::extract::Input;
use crate::module::ModuleGraph;
use crate::scope::Scope;
use crate::typeexpr::TypeSpec;
use crate::value::Value;

pub const PARAMETER_DATA_TYPE: &str = "coder_parameter";

/// Resolution state of a parameter value
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    /// Resolved, wholly known value (may be `null`)
    Known(Value),
    /// Depends on values not known until apply
    Unknown,
    /// The default could not be evaluated or converted
    Errored(Diagnostics),
    /// Neither a default nor a caller supplied value exists
    Missing,
}

impl ParameterValue {
    fn from_value(value: Value) -> Self {
        if value.is_wholly_known() {
            ParameterValue::Known(value)
        } else {
            ParameterValue::Unknown
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            ParameterValue::Known(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RichParameterOption {
    pub name: String,
    pub description: String,
    pub value: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ParameterValidation {
    pub regex: String,
    pub error: String,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub monotonic: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RichParameter {
    pub name: String,
    pub display_name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub parameter_type: String,
    pub mutable: bool,
    pub ephemeral: bool,
    pub required: bool,
    pub icon: String,
    pub order: i64,
    pub default_value: String,
    pub options: Vec<RichParameterOption>,
    pub validation: Option<ParameterValidation>,
    pub value: ParameterValue,
    /// Address of the declaring block, e.g. `data.coder_parameter.region`
    pub address: String,
    pub location: Option<Location>,
    /// Everything reported while resolving this parameter
    pub diagnostics: Diagnostics,
}

impl RichParameter {
    pub fn value_as_string(&self) -> Result<String, CoerceError> {
        match &self.value {
            ParameterValue::Known(value) => coerce_to_string(value),
            ParameterValue::Unknown => Err(CoerceError::NotKnown),
            ParameterValue::Errored(_) | ParameterValue::Missing => Err(CoerceError::NoValue),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// Resolves all parameters of all modules in declaration order
///
/// Parameters with error diagnostics are included; the caller decides whether to keep them.
#[tracing::instrument(level = "debug", skip_all)]
pub fn resolve_parameters(graph: &mut ModuleGraph, input: &Input) -> Vec<RichParameter> {
    let mut parameters = vec![];
    for module in graph.modules_mut() {
        let (blocks, scope) = module.parts_mut();
        for block in blocks
            .iter()
            .filter(|block| block.kind == "data" && block.type_label() == PARAMETER_DATA_TYPE)
        {
            parameters.push(resolve_parameter(block, scope, input));
        }
    }
    parameters
}

#[tracing::instrument(level = "debug", skip_all, fields(address = %declared.address()))]
fn resolve_parameter(declared: &ConfigBlock, scope: &mut Scope, input: &Input) -> RichParameter {
    let mut diagnostics = Diagnostics::new();

    // attributes and dynamic blocks may depend on parameters resolved earlier
    let mut block = declared.clone();
    evaluator::materialize(&mut block, scope);
    let block = &block;

    let value = match block.attribute("value") {
        Some(attribute) => {
            tracing::debug!("value already set");
            ParameterValue::from_value(attribute.value.clone())
        }
        None => {
            let value = resolve_value(block, scope, input, &mut diagnostics);
            write_back(block, scope, &value);
            value
        }
    };

    let mut parser = AttributeParser::new(block);

    let mut options = vec![];
    for option_block in block.blocks("option") {
        match parse_option(option_block) {
            Ok(option) => options.push(option),
            Err(option_diagnostics) => parser.extend(option_diagnostics),
        }
    }

    let validation = block
        .blocks("validation")
        .next()
        .map(|validation_block| {
            let mut validation_parser = AttributeParser::new(validation_block);
            let validation = ParameterValidation {
                regex: validation_parser.attr("regex").as_string(),
                error: validation_parser.attr("error").as_string(),
                min: validation_parser.attr("min").as_i64(),
                max: validation_parser.attr("max").as_i64(),
                monotonic: validation_parser.attr("monotonic").as_string(),
            };
            (validation, validation_parser.into_diagnostics())
        })
        .map(|(validation, validation_diagnostics)| {
            parser.extend(validation_diagnostics);
            validation
        });

    let name = parser.attr("name").required().as_string();
    let display_name = parser.attr("display_name").as_string();
    let description = parser.attr("description").as_string();
    let mutable = parser.attr("mutable").as_bool();
    let ephemeral = parser.attr("ephemeral").as_bool();
    let icon = parser.attr("icon").as_string();
    let order = parser.attr("order").as_i64().unwrap_or_default();
    diagnostics.extend(parser.into_diagnostics());

    let default_value = block
        .non_null_attribute("default")
        .and_then(|default| coerce_to_string(&default.value).ok())
        .unwrap_or_default();

    RichParameter {
        name,
        display_name,
        description,
        parameter_type: parameter_type(block),
        mutable,
        ephemeral,
        required: block.attribute("default").is_none(),
        icon,
        order,
        default_value,
        options,
        validation,
        value,
        address: block.address(),
        location: block.location.clone(),
        diagnostics,
    }
}

fn resolve_value(
    block: &ConfigBlock,
    scope: &Scope,
    input: &Input,
    diagnostics: &mut Diagnostics,
) -> ParameterValue {
    // caller supplied values are taken as strings, whatever the declared type
    if let Some(supplied) = input.parameter_value(block.name_label()) {
        tracing::debug!(value = supplied, "using supplied value");
        return ParameterValue::Known(Value::from(supplied));
    }

    let Some(default) = block.attribute("default") else {
        tracing::debug!("no default and no supplied value");
        return ParameterValue::Missing;
    };

    let mut errored = |diagnostic: Diagnostic| {
        let diagnostic = diagnostic
            .as_warning()
            .at(default.location.as_ref().or(block.location.as_ref()))
            .in_context(block.address());
        diagnostics.push(diagnostic.clone());
        ParameterValue::Errored(diagnostic.into())
    };

    // evaluated again: defaults may depend on parameters resolved earlier
    let raw = match block.context(scope).evaluate(&default.expression) {
        Ok(raw) => raw,
        Err(err) => return errored(err.to_diagnostic(&default.expression)),
    };

    let Some(type_attribute) = block.non_null_attribute("type") else {
        return ParameterValue::from_value(raw);
    };

    let spec = match TypeSpec::decode(&type_attribute.expression) {
        Ok(spec) => spec,
        Err(err) => {
            return errored(
                Diagnostic::error(
                    DiagnosticKind::InvalidAttributeType,
                    "Invalid type",
                    err.to_string(),
                )
                .with_expression(&type_attribute.expression),
            )
        }
    };

    match spec.convert(spec.apply_defaults(raw)) {
        Ok(value) => ParameterValue::from_value(value),
        Err(err) => errored(
            Diagnostic::error(
                DiagnosticKind::TypeConversionFailure,
                "Invalid default value",
                format!("The default value is not compatible with type {spec}: {err}"),
            )
            .with_expression(&default.expression),
        ),
    }
}

/// Makes the value visible as `data.coder_parameter.<name>.value`
fn write_back(block: &ConfigBlock, scope: &mut Scope, value: &ParameterValue) {
    let value = match value {
        ParameterValue::Known(value) => value.clone(),
        ParameterValue::Unknown => Value::Unknown,
        ParameterValue::Errored(_) | ParameterValue::Missing => return,
    };

    let mut path: Vec<&str> = vec![block.kind.as_str()];
    path.extend(block.labels.iter().map(String::as_str));
    path.push("value");
    scope.set(&path, value);
}

fn parse_option(block: &ConfigBlock) -> Result<RichParameterOption, Diagnostics> {
    let mut parser = AttributeParser::new(block);
    let option = RichParameterOption {
        name: parser.attr("name").required().as_string(),
        description: parser.attr("description").as_string(),
        value: parser.attr("value").required().as_string(),
        icon: parser.attr("icon").as_string(),
    };

    if parser.has_errors() {
        return Err(parser.into_diagnostics());
    }
    Ok(option)
}

/// Declared type as written, `string` if absent
fn parameter_type(block: &ConfigBlock) -> String {
    let Some(attribute) = block.non_null_attribute("type") else {
        return "string".to_string();
    };

    match &attribute.value {
        Value::String(ty) => ty.clone(),
        // bare type expressions (`type = list(string)`) do not evaluate
        _ => TypeSpec::decode(&attribute.expression)
            .map(|spec| spec.to_string())
            .unwrap_or_else(|_| attribute.expression.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::module_graph;
    use pretty_assertions::assert_eq;

    fn resolve(graph: &mut ModuleGraph, input: &Input) -> Vec<RichParameter> {
        resolve_parameters(graph, input)
    }

    #[test]
    fn default_value() {
        let mut graph = module_graph!(
            r#"
            data "coder_parameter" "region" {
              name         = "region"
              display_name = "Region"
              default      = "us"
              order        = 2
              option {
                name  = "Europe"
                value = "eu"
              }
              option {
                name  = "United States"
                value = "us"
                icon  = "/emojis/1f1fa-1f1f8.png"
              }
            }
            "#
        );

        let parameters = resolve(&mut graph, &Input::default());
        assert_eq!(parameters.len(), 1);

        let region = &parameters[0];
        assert_eq!(region.name, "region");
        assert_eq!(region.display_name, "Region");
        assert_eq!(region.parameter_type, "string");
        assert_eq!(region.order, 2);
        assert!(!region.required);
        assert_eq!(region.default_value, "us");
        assert_eq!(region.value_as_string().unwrap(), "us");
        assert_eq!(region.options.len(), 2);
        assert_eq!(region.options[1].icon, "/emojis/1f1fa-1f1f8.png");
        assert!(region.diagnostics.is_empty());

        assert_eq!(
            graph.modules()[0]
                .scope()
                .get_path(&["data", "coder_parameter", "region", "value"]),
            Some(&Value::from("us"))
        );
    }

    #[test]
    fn supplied_value_wins() {
        let mut graph = module_graph!(
            r#"
            data "coder_parameter" "region" {
              name    = "region"
              default = "us"
            }
            "#
        );

        let input = Input::default().with_parameter("region", "eu");
        let parameters = resolve(&mut graph, &input);
        assert_eq!(parameters[0].value, ParameterValue::Known(Value::from("eu")));
    }

    #[test]
    fn supplied_values_stay_strings() {
        let mut graph = module_graph!(
            r#"
            data "coder_parameter" "cpu" {
              name    = "cpu"
              type    = "number"
              default = 2
            }
            "#
        );

        let input = Input::default().with_parameter("cpu", "4");
        let parameters = resolve(&mut graph, &input);
        assert_eq!(parameters[0].value, ParameterValue::Known(Value::from("4")));
    }

    #[test]
    fn missing_value() {
        let mut graph = module_graph!(
            r#"
            data "coder_parameter" "region" {
              name = "region"
            }
            "#
        );

        let parameters = resolve(&mut graph, &Input::default());
        assert_eq!(parameters[0].value, ParameterValue::Missing);
        assert!(parameters[0].required);
        assert_eq!(
            parameters[0].value_as_string(),
            Err(CoerceError::NoValue)
        );
        assert_eq!(
            graph.modules()[0]
                .scope()
                .get_path(&["data", "coder_parameter", "region", "value"]),
            None
        );
    }

    #[test]
    fn explicit_null_default_is_known() {
        let mut graph = module_graph!(
            r#"
            data "coder_parameter" "region" {
              name    = "region"
              default = null
            }
            "#
        );

        let parameters = resolve(&mut graph, &Input::default());
        assert_eq!(parameters[0].value, ParameterValue::Known(Value::Null));
        assert!(!parameters[0].required);
    }

    #[test]
    fn typed_defaults() {
        let mut graph = module_graph!(
            r#"
            data "coder_parameter" "cpu" {
              name    = "cpu"
              type    = "number"
              default = "4"
            }
            data "coder_parameter" "regions" {
              name    = "regions"
              type    = "list(string)"
              default = jsonencode(["eu", "us"])
            }
            data "coder_parameter" "zones" {
              name    = "zones"
              type    = "list(string)"
              default = "[\"a\", \"b\"]"
            }
            "#
        );

        let parameters = resolve(&mut graph, &Input::default());
        assert_eq!(parameters[0].value, ParameterValue::Known(Value::from(4i64)));
        assert_eq!(parameters[0].parameter_type, "number");

        // functions are not available
        assert!(matches!(parameters[1].value, ParameterValue::Errored(_)));
        assert!(!parameters[1].has_errors());

        assert_eq!(
            parameters[2].value,
            ParameterValue::Known(Value::from(vec!["a", "b"]))
        );
        assert_eq!(parameters[2].parameter_type, "list(string)");
    }

    #[test]
    fn conversion_failure_is_a_warning() {
        let mut graph = module_graph!(
            r#"
            data "coder_parameter" "cpu" {
              name    = "cpu"
              type    = "number"
              default = "many"
            }
            "#
        );

        let parameters = resolve(&mut graph, &Input::default());
        let cpu = &parameters[0];
        assert!(matches!(cpu.value, ParameterValue::Errored(_)));
        assert!(!cpu.has_errors());

        let warning = cpu.diagnostics.warnings().next().unwrap();
        assert_eq!(warning.kind, DiagnosticKind::TypeConversionFailure);
        assert_eq!(warning.context.as_deref(), Some("data.coder_parameter.cpu"));
    }

    #[test]
    fn defaults_see_earlier_parameters() {
        let mut graph = module_graph!(
            r#"
            data "coder_parameter" "region" {
              name    = "region"
              default = "us"
            }
            data "coder_parameter" "zone" {
              name    = "zone"
              default = "${data.coder_parameter.region.value}-a"
            }
            "#
        );

        let input = Input::default().with_parameter("region", "eu");
        let parameters = resolve(&mut graph, &input);
        assert_eq!(
            parameters[1].value,
            ParameterValue::Known(Value::from("eu-a"))
        );
    }

    #[test]
    fn attributes_see_earlier_parameters() {
        let mut graph = module_graph!(
            r#"
            data "coder_parameter" "region" {
              name    = "region"
              default = "us"
            }
            data "coder_parameter" "zone" {
              name        = "zone"
              description = "Zone in ${data.coder_parameter.region.value}"
              default     = "a"
            }
            "#
        );

        let parameters = resolve(&mut graph, &Input::default());
        let zone = &parameters[1];
        assert!(zone.diagnostics.is_empty());
        assert_eq!(zone.description, "Zone in us");
    }

    #[test]
    fn dynamic_options_follow_earlier_parameters() {
        let mut graph = module_graph!(
            r#"
            locals {
              zones = {
                eu = ["eu-a"]
                us = ["us-a", "us-b"]
              }
            }
            data "coder_parameter" "region" {
              name    = "region"
              default = "us"
            }
            data "coder_parameter" "zone" {
              name = "zone"
              dynamic "option" {
                for_each = local.zones[data.coder_parameter.region.value]
                content {
                  name  = option.value
                  value = option.value
                }
              }
            }
            "#
        );

        let input = Input::default().with_parameter("region", "eu");
        let parameters = resolve(&mut graph, &input);
        let zone = &parameters[1];
        assert!(zone.diagnostics.is_empty());
        let options: Vec<_> = zone.options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(options, vec!["eu-a"]);
    }

    #[test]
    fn explicit_value_is_kept() {
        let mut graph = module_graph!(
            r#"
            data "coder_parameter" "region" {
              name    = "region"
              default = "us"
              value   = "ap"
            }
            "#
        );

        let input = Input::default().with_parameter("region", "eu");
        let parameters = resolve(&mut graph, &input);
        assert_eq!(parameters[0].value, ParameterValue::Known(Value::from("ap")));
    }

    #[test]
    fn invalid_blocks_are_errored() {
        let mut graph = module_graph!(
            r#"
            data "coder_parameter" "region" {
              default = "us"
              option {
                name = "Europe"
              }
              option {
                name  = "United States"
                value = "us"
              }
            }
            "#
        );

        let parameters = resolve(&mut graph, &Input::default());
        let region = &parameters[0];
        assert!(region.has_errors());
        assert_eq!(region.options.len(), 1);
        assert_eq!(
            region
                .diagnostics
                .of_kind(DiagnosticKind::MissingRequiredArgument)
                .count(),
            2
        );
    }

    #[test]
    fn validation_block() {
        let mut graph = module_graph!(
            r#"
            data "coder_parameter" "cpu" {
              name    = "cpu"
              type    = "number"
              default = 2
              validation {
                min       = 1
                max       = 8
                monotonic = "increasing"
              }
            }
            "#
        );

        let parameters = resolve(&mut graph, &Input::default());
        assert_eq!(
            parameters[0].validation,
            Some(ParameterValidation {
                min: Some(1),
                max: Some(8),
                monotonic: "increasing".to_string(),
                ..Default::default()
            })
        );
    }

    #[test]
    fn bare_type_expression() {
        let mut graph = module_graph!(
            r#"
            data "coder_parameter" "region" {
              name    = "region"
              type    = string
              default = "eu"
            }
            "#
        );

        let parameters = resolve(&mut graph, &Input::default());
        assert_eq!(parameters[0].parameter_type, "string");
        assert!(parameters[0].diagnostics.is_empty());
    }
}
