//! module evaluation
//!
//! Blocks of a module may reference each other in any order. Values are computed in repeated passes over all blocks
//! until the scope stops changing. Anything that cannot be evaluated (yet) is [Value::Unknown].
//!
//! Once the scope is settled every block is materialized: its attributes are evaluated and `dynamic` blocks are
//! expanded into concrete nested blocks.
use crate::block::ConfigBlock;
use crate::scope::{EvalContext, Scope};
use crate::typeexpr::TypeSpec;
use crate::value::Value;
use hcl::Expression;
use indexmap::IndexMap;

const MAX_PASSES: usize = 16;

#[tracing::instrument(level = "debug", skip_all, fields(blocks = blocks.len()))]
pub(crate) fn evaluate_module(
    mut blocks: Vec<ConfigBlock>,
    tfvars: &IndexMap<String, Value>,
) -> (Vec<ConfigBlock>, Scope) {
    let mut scope = Scope::new();
    scope.declare("var", declare_variables(&blocks, tfvars));
    scope.declare("local", Value::Object(IndexMap::new()));

    for block in &blocks {
        match (block.kind.as_str(), block.labels.as_slice()) {
            ("resource", [type_label, _]) => scope.mark_computed(vec![type_label.clone()]),
            ("data", [type_label, _]) if type_label != crate::parameters::PARAMETER_DATA_TYPE => {
                scope.mark_computed(vec!["data".to_string(), type_label.clone()])
            }
            _ => {}
        }
    }

    for pass in 1..=MAX_PASSES {
        let previous = scope.clone();
        evaluate_pass(&blocks, &mut scope);
        if scope == previous {
            tracing::debug!(pass, "scope settled");
            break;
        }
        if pass == MAX_PASSES {
            tracing::warn!("scope did not settle, remaining values stay as evaluated");
        }
    }

    for block in &mut blocks {
        materialize(block, &scope);
    }

    (blocks, scope)
}

fn declare_variables(blocks: &[ConfigBlock], tfvars: &IndexMap<String, Value>) -> Value {
    let empty = Scope::new();
    let mut variables = IndexMap::new();

    for block in blocks.iter().filter(|block| block.kind == "variable") {
        let name = block.name_label();
        let value = match (tfvars.get(name), block.attribute("default")) {
            (Some(assigned), _) => assigned.clone(),
            (None, Some(default)) => evaluate_or_unknown(block.context(&empty), &default.expression),
            (None, None) => Value::Unknown,
        };

        let value = match block.attribute("type") {
            Some(ty) => typed(name, &ty.expression, value),
            None => value,
        };

        variables.insert(name.to_string(), value);
    }

    Value::Object(variables)
}

fn typed(variable: &str, type_expression: &Expression, value: Value) -> Value {
    let spec = match TypeSpec::decode(type_expression) {
        Ok(spec) => spec,
        Err(err) => {
            tracing::warn!(variable, %err, "invalid variable type");
            return value;
        }
    };

    match spec.convert(spec.apply_defaults(value.clone())) {
        Ok(converted) => converted,
        Err(err) => {
            tracing::warn!(variable, %err, "variable value does not match its type");
            value
        }
    }
}

fn evaluate_pass(blocks: &[ConfigBlock], scope: &mut Scope) {
    for block in blocks {
        match (block.kind.as_str(), block.labels.as_slice()) {
            ("locals", _) => {
                for (name, attribute) in &block.attributes {
                    let value = evaluate_or_unknown(block.context(scope), &attribute.expression);
                    scope.set(&["local", name.as_str()], value);
                }
            }
            ("data", [type_label, name]) => {
                let value = block_value(block, scope);
                scope.set(&["data", type_label.as_str(), name.as_str()], value);
            }
            ("resource", [type_label, name]) => {
                let value = block_value(block, scope);
                scope.set(&[type_label.as_str(), name.as_str()], value);
            }
            _ => {}
        }
    }
}

/// Object of a block's attribute values as seen by references to the block
fn block_value(block: &ConfigBlock, scope: &Scope) -> Value {
    if block.has_meta_argument() {
        return Value::Unknown;
    }

    Value::Object(
        block
            .attributes
            .iter()
            .map(|(name, attribute)| {
                let value = evaluate_or_unknown(block.context(scope), &attribute.expression);
                (name.clone(), value)
            })
            .collect(),
    )
}

fn evaluate_or_unknown(context: EvalContext, expr: &Expression) -> Value {
    context.evaluate(expr).unwrap_or_else(|err| {
        tracing::debug!(%expr, %err, "evaluation failed, value is unknown");
        Value::Unknown
    })
}

/// Evaluates the attributes of a block and its nested blocks against `scope`
///
/// Nested blocks are expanded from their declaration again, so a block can be materialized more than once.
pub(crate) fn materialize(block: &mut ConfigBlock, scope: &Scope) {
    let locals = block.locals.clone();
    let context = EvalContext::new(scope, &locals);
    for attribute in block.attributes.values_mut() {
        attribute.value = evaluate_or_unknown(context, &attribute.expression);
    }

    block.blocks = expand_nested(block.declared.clone(), scope, &locals);
}

fn expand_nested(
    nested: Vec<ConfigBlock>,
    scope: &Scope,
    locals: &IndexMap<String, Value>,
) -> Vec<ConfigBlock> {
    let mut expanded = Vec::with_capacity(nested.len());
    for mut block in nested {
        if block.kind == "dynamic" {
            expanded.extend(expand_dynamic(&block, scope, locals));
            continue;
        }

        for (name, value) in locals {
            block
                .locals
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        materialize(&mut block, scope);
        expanded.push(block);
    }
    expanded
}

/// Expands `dynamic "option" { for_each = ..., content { ... } }` into one `option` block per element
fn expand_dynamic(
    template: &ConfigBlock,
    scope: &Scope,
    locals: &IndexMap<String, Value>,
) -> Vec<ConfigBlock> {
    let Some(kind) = template.labels.first() else {
        tracing::warn!(location = ?template.location, "dynamic block without label");
        return vec![];
    };
    let Some(for_each) = template.attribute("for_each") else {
        tracing::warn!(kind, "dynamic block without for_each");
        return vec![];
    };
    let Some(content) = template.declared.iter().find(|block| block.kind == "content") else {
        tracing::warn!(kind, "dynamic block without content");
        return vec![];
    };

    let iterator = template
        .attribute("iterator")
        .and_then(|attribute| match &attribute.expression {
            Expression::Variable(name) => Some(name.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| kind.clone());

    let elements: Vec<(Value, Value)> =
        match evaluate_or_unknown(EvalContext::new(scope, locals), &for_each.expression) {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| (Value::from(index as i64), item))
                .collect(),
            Value::Object(map) => map
                .into_iter()
                .map(|(key, item)| (Value::from(key), item))
                .collect(),
            Value::Unknown => {
                tracing::debug!(kind, "for_each is not known, no blocks generated");
                return vec![];
            }
            other => {
                tracing::warn!(kind, found = other.type_name(), "for_each must be a collection");
                return vec![];
            }
        };

    elements
        .into_iter()
        .map(|(key, item)| {
            let mut block_locals = locals.clone();
            block_locals.insert(
                iterator.clone(),
                Value::from(indexmap::indexmap! { "key" => key, "value" => item }),
            );

            let labels = template
                .attribute("labels")
                .map(|attribute| {
                    match evaluate_or_unknown(
                        EvalContext::new(scope, &block_locals),
                        &attribute.expression,
                    ) {
                        Value::Array(labels) => labels
                            .iter()
                            .filter_map(|label| label.as_str().map(str::to_string))
                            .collect(),
                        _ => vec![],
                    }
                })
                .unwrap_or_default();

            let mut block = ConfigBlock::new(kind.clone(), labels);
            block.attributes = content.attributes.clone();
            block.declared = content.declared.clone();
            block.location = template.location.clone();
            block.locals = block_locals;
            materialize(&mut block, scope);
            block
        })
        .collect()
}

#[cfg(test)]
mod test {
    use crate::module_graph;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn locals_in_any_order() {
        let graph = module_graph!(
            r#"
            locals {
              greeting = "hello ${local.name}"
            }
            locals {
              name = var.name
            }
            variable "name" {
              default = "world"
            }
            "#
        );

        let scope = graph.modules()[0].scope();
        assert_eq!(
            scope.get_path(&["local", "greeting"]),
            Some(&Value::from("hello world"))
        );
    }

    #[test]
    fn variables_without_default_are_unknown() {
        let graph = module_graph!(
            r#"
            variable "region" {}
            locals {
              zone = "${var.region}-a"
            }
            "#
        );

        let scope = graph.modules()[0].scope();
        assert_eq!(scope.get_path(&["var", "region"]), Some(&Value::Unknown));
        assert_eq!(scope.get_path(&["local", "zone"]), Some(&Value::Unknown));
    }

    #[test]
    fn variable_defaults_follow_their_type() {
        let graph = module_graph!(
            r#"
            variable "size" {
              type    = number
              default = "10"
            }
            "#
        );

        let scope = graph.modules()[0].scope();
        assert_eq!(scope.get_path(&["var", "size"]), Some(&Value::from(10i64)));
    }

    #[test]
    fn resources_and_data_sources() {
        let graph = module_graph!(
            r#"
            resource "docker_image" "ubuntu" {
              name = "ubuntu:${var.tag}"
            }
            variable "tag" {
              default = "22.04"
            }
            data "local_file" "hostname" {
              filename = "/etc/hostname"
            }
            resource "docker_container" "workspace" {
              count = 1
              image = docker_image.ubuntu.name
            }
            "#
        );

        let scope = graph.modules()[0].scope();
        assert_eq!(
            scope.get_path(&["docker_image", "ubuntu", "name"]),
            Some(&Value::from("ubuntu:22.04"))
        );
        assert_eq!(
            scope.get_path(&["data", "local_file", "hostname", "filename"]),
            Some(&Value::from("/etc/hostname"))
        );
        assert_eq!(
            scope.get_path(&["docker_container", "workspace"]),
            Some(&Value::Unknown)
        );
    }

    #[test]
    fn dynamic_blocks_expand() {
        let graph = module_graph!(
            r#"
            locals {
              regions = { eu = "Europe", us = "United States" }
            }
            data "coder_parameter" "region" {
              name = "region"
              dynamic "option" {
                for_each = local.regions
                content {
                  name  = option.value
                  value = option.key
                }
              }
            }
            "#
        );

        let block = graph.modules()[0]
            .blocks_of("data", "coder_parameter")
            .next()
            .unwrap();
        let options: Vec<_> = block
            .blocks("option")
            .map(|option| {
                (
                    option.attribute("name").unwrap().value.clone(),
                    option.attribute("value").unwrap().value.clone(),
                )
            })
            .collect();
        assert_eq!(
            options,
            vec![
                (Value::from("Europe"), Value::from("eu")),
                (Value::from("United States"), Value::from("us")),
            ]
        );
    }

    #[test]
    fn dynamic_block_with_unknown_collection() {
        let graph = module_graph!(
            r#"
            variable "regions" {}
            data "coder_parameter" "region" {
              name = "region"
              dynamic "option" {
                for_each = var.regions
                iterator = region
                content {
                  name  = region.value
                  value = region.value
                }
              }
            }
            "#
        );

        let block = graph.modules()[0]
            .blocks_of("data", "coder_parameter")
            .next()
            .unwrap();
        assert_eq!(block.blocks("option").count(), 0);
    }
}
