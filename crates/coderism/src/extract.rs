//! extraction of parameters and workspace tags
//!
//! Parameters are resolved first. Their values are written back into the module scopes, which is what allows
//! workspace tags to reference `data.coder_parameter.<name>.value`.
use crate::diagnostics::Diagnostics;
use crate::module::ModuleGraph;
use crate::parameters::{self, RichParameter};
use crate::workspace_tags::{self, TagBlocks};
use indexmap::IndexMap;
use std::str::FromStr;

/// Values supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct Input {
    pub parameter_values: Vec<ParameterValueInput>,
}

impl Input {
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameter_values
            .push(ParameterValueInput::new(name.into(), value.into()));
        self
    }

    /// Value supplied for the parameter, the last one if supplied more than once
    pub fn parameter_value(&self, name: &str) -> Option<&str> {
        self.parameter_values
            .iter()
            .rev()
            .find(|input| input.name == name)
            .map(|input| input.value.as_str())
    }
}

#[derive(derive_new::new, Debug, Clone, PartialEq)]
pub struct ParameterValueInput {
    pub name: String,
    pub value: String,
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("invalid parameter value {0:?}, expected name=value")]
pub struct InvalidParameterValue(String);

impl FromStr for ParameterValueInput {
    type Err = InvalidParameterValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok(ParameterValueInput::new(name.trim().to_string(), value.to_string()))
            }
            _ => Err(InvalidParameterValue(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Output {
    /// Parameters in declaration order, without those carrying error diagnostics
    pub parameters: Vec<RichParameter>,
    /// Usable workspace tag blocks in declaration order
    pub workspace_tags: TagBlocks,
    /// Diagnostics of all parameters and tag blocks, including the dropped ones
    pub diagnostics: Diagnostics,
}

impl Output {
    /// Known workspace tags, the later block wins on key collisions
    pub fn tags(&self) -> IndexMap<String, String> {
        self.workspace_tags.valid_tags()
    }

    /// Workspace tag keys whose key or value is not known yet
    pub fn unknown_tags(&self) -> Vec<String> {
        self.workspace_tags.unknowns()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn parameter(&self, name: &str) -> Option<&RichParameter> {
        self.parameters.iter().find(|parameter| parameter.name == name)
    }
}

/// Resolves all parameters and workspace tags of a module graph
///
/// Never fails: problems are reported as diagnostics and whatever could be resolved is returned.
#[tracing::instrument(level = "debug", skip_all, fields(modules = graph.modules().len()))]
pub fn extract(graph: &mut ModuleGraph, input: &Input) -> Output {
    let mut output = Output::default();

    for parameter in parameters::resolve_parameters(graph, input) {
        output.diagnostics.extend(parameter.diagnostics.clone());
        if parameter.has_errors() {
            tracing::debug!(address = %parameter.address, "dropping parameter with errors");
            continue;
        }
        output.parameters.push(parameter);
    }

    for block in workspace_tags::resolve_workspace_tags(graph) {
        output.diagnostics.extend(block.diagnostics.clone());
        if block.errored {
            tracing::debug!(address = %block.address, "dropping unusable workspace tags");
            continue;
        }
        output.workspace_tags.push(block);
    }

    tracing::debug!(
        parameters = output.parameters.len(),
        tag_blocks = output.workspace_tags.len(),
        diagnostics = output.diagnostics.len(),
        "extraction finished"
    );
    output
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::module_graph;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_parameter_value() {
        assert_eq!(
            "region=eu".parse::<ParameterValueInput>().unwrap(),
            ParameterValueInput::new("region".to_string(), "eu".to_string())
        );
        assert_eq!(
            "query=a=b".parse::<ParameterValueInput>().unwrap().value,
            "a=b"
        );
        assert!("region".parse::<ParameterValueInput>().is_err());
        assert!("=eu".parse::<ParameterValueInput>().is_err());
    }

    #[test]
    fn last_supplied_value_wins() {
        let input = Input::default()
            .with_parameter("region", "us")
            .with_parameter("region", "eu");
        assert_eq!(input.parameter_value("region"), Some("eu"));
        assert_eq!(input.parameter_value("zone"), None);
    }

    #[test]
    fn tags_see_parameter_values() {
        let mut graph = module_graph!(
            r#"
            data "coder_parameter" "region" {
              name    = "region"
              default = "us"
            }
            data "coder_workspace_tags" "custom" {
              tags = {
                "zone" = data.coder_parameter.region.value
              }
            }
            "#
        );

        let output = extract(&mut graph, &Input::default().with_parameter("region", "eu"));
        assert_eq!(output.parameter("region").unwrap().value_as_string().unwrap(), "eu");
        assert_eq!(output.tags()["zone"], "eu");
        assert!(output.unknown_tags().is_empty());
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn errored_results_are_dropped_but_reported() {
        let mut graph = module_graph!(
            r#"
            data "coder_parameter" "region" {
              default = "us"
            }
            data "coder_workspace_tags" "custom" {
              tags = merge({}, {})
            }
            data "coder_workspace_tags" "other" {
              tags = { "cluster" = "dev" }
            }
            "#
        );

        let output = extract(&mut graph, &Input::default());
        assert!(output.parameters.is_empty());
        assert_eq!(output.workspace_tags.len(), 1);
        assert_eq!(output.tags()["cluster"], "dev");
        assert!(output.has_errors());

        let kinds: Vec<_> = output.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::MissingRequiredArgument,
                DiagnosticKind::UnsupportedExpressionShape,
            ]
        );
    }
}
