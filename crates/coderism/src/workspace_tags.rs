//! `coder_workspace_tags` resolution
//!
//! ```hcl
//! data "coder_workspace_tags" "custom" {
//!   tags = {
//!     "cluster" = "dev"
//!     "region"  = data.coder_parameter.region.value
//!     "image"   = docker_image.ubuntu.repo_digest
//!   }
//! }
//! ```
//!
//! Every key and value is evaluated on its own. A pair is
//! - known: both sides are wholly known and render as strings
//! - unknown: evaluation succeeded, but a side depends on values only known after apply
//! - errored: a side is not permitted (see [crate::policy]) or failed to evaluate
//!
//! Failing pairs never affect their siblings. A block without a usable `tags` object is skipped entirely.
use crate::attributes::AttributeParser;
use crate::block::{ConfigBlock, Location};
use crate::coerce::coerce_to_string;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::module::ModuleGraph;
use crate::policy::{self, Classification};
use crate::scope::{EvalContext, Scope};
use crate::visit::References;
use hcl::{Expression, ObjectKey};
use indexmap::IndexMap;

pub const WORKSPACE_TAGS_DATA_TYPE: &str = "coder_workspace_tags";

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum TagValue {
    Known(String),
    Unknown,
    Errored,
}

/// Key or value of a tag
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TagExpr {
    /// Source text
    pub expression: String,
    /// References this side depends on, e.g. `data.coder_parameter.region.value`
    pub references: Vec<String>,
    pub value: TagValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagState {
    Known,
    Unknown,
    Errored,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Tag {
    pub key: TagExpr,
    pub value: TagExpr,
}

impl Tag {
    pub fn state(&self) -> TagState {
        match (&self.key.value, &self.value.value) {
            (TagValue::Errored, _) | (_, TagValue::Errored) => TagState::Errored,
            (TagValue::Known(_), TagValue::Known(_)) => TagState::Known,
            _ => TagState::Unknown,
        }
    }

    /// Key and value, if both are known
    pub fn known(&self) -> Option<(&str, &str)> {
        match (&self.key.value, &self.value.value) {
            (TagValue::Known(key), TagValue::Known(value)) => Some((key.as_str(), value.as_str())),
            _ => None,
        }
    }

    /// Known key, or the key's source text if the key itself is not known
    pub fn key_or_placeholder(&self) -> String {
        match &self.key.value {
            TagValue::Known(key) => key.clone(),
            _ => self.key.expression.clone(),
        }
    }

    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.key
            .references
            .iter()
            .chain(&self.value.references)
            .map(String::as_str)
    }
}

/// Tags of one `coder_workspace_tags` block
#[derive(Debug, Clone, serde::Serialize)]
pub struct TagBlock {
    pub address: String,
    pub location: Option<Location>,
    pub tags: Vec<Tag>,
    /// The block as a whole could not be used
    pub errored: bool,
    pub diagnostics: Diagnostics,
}

impl TagBlock {
    /// Known tags, a later pair wins over an earlier one with the same key
    pub fn valid_tags(&self) -> IndexMap<String, String> {
        self.tags
            .iter()
            .filter_map(Tag::known)
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    /// Keys (or placeholders) of tags not known yet
    pub fn unknowns(&self) -> Vec<String> {
        self.tags
            .iter()
            .filter(|tag| tag.state() == TagState::Unknown)
            .map(Tag::key_or_placeholder)
            .collect()
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(transparent)]
pub struct TagBlocks(Vec<TagBlock>);

impl TagBlocks {
    pub fn push(&mut self, block: TagBlock) {
        self.0.push(block);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TagBlock> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Union of all blocks' known tags, the later block wins on key collisions
    pub fn valid_tags(&self) -> IndexMap<String, String> {
        let mut tags = IndexMap::new();
        for block in &self.0 {
            tags.extend(block.valid_tags());
        }
        tags
    }

    /// Unknown keys of all blocks, duplicates included
    pub fn unknowns(&self) -> Vec<String> {
        self.0.iter().flat_map(TagBlock::unknowns).collect()
    }
}

impl FromIterator<TagBlock> for TagBlocks {
    fn from_iter<T: IntoIterator<Item = TagBlock>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a TagBlocks {
    type Item = &'a TagBlock;
    type IntoIter = std::slice::Iter<'a, TagBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Resolves all workspace tag blocks of all modules in declaration order
///
/// Blocks that could not be used are included with `errored` set.
#[tracing::instrument(level = "debug", skip_all)]
pub fn resolve_workspace_tags(graph: &ModuleGraph) -> Vec<TagBlock> {
    graph
        .modules()
        .iter()
        .flat_map(|module| {
            module
                .blocks_of("data", WORKSPACE_TAGS_DATA_TYPE)
                .map(move |block| resolve_block(block, module.scope()))
        })
        .collect()
}

#[tracing::instrument(level = "debug", skip_all, fields(address = %block.address()))]
fn resolve_block(block: &ConfigBlock, scope: &Scope) -> TagBlock {
    let mut tag_block = TagBlock {
        address: block.address(),
        location: block.location.clone(),
        tags: vec![],
        errored: false,
        diagnostics: Diagnostics::new(),
    };

    let mut parser = AttributeParser::new(block);
    let attribute = parser.attr("tags").required().attribute();
    tag_block.diagnostics.extend(parser.into_diagnostics());

    let Some(attribute) = attribute else {
        tag_block.errored = true;
        return tag_block;
    };

    let object = match policy::classify_tags(&attribute.expression) {
        Classification::Literal(object) => object,
        Classification::Disallowed(reasons) => {
            for reason in reasons {
                tag_block.diagnostics.push(
                    reason
                        .to_diagnostic()
                        .at(attribute.location.as_ref())
                        .in_context(block.address())
                        .with_expression(&attribute.expression),
                );
            }
            tag_block.errored = true;
            return tag_block;
        }
    };

    let mut side = Side {
        context: block.context(scope),
        location: attribute.location.as_ref(),
        address: block.address(),
        diagnostics: &mut tag_block.diagnostics,
    };

    let mut tags = Vec::with_capacity(object.len());
    for (key, value) in object.iter() {
        let tag = Tag {
            key: side.key(key),
            value: side.resolve(value),
        };
        tracing::debug!(key = %tag.key.expression, state = ?tag.state(), "tag resolved");
        tags.push(tag);
    }
    tag_block.tags = tags;

    tag_block
}

/// Evaluates tag keys and values of one block
struct Side<'a> {
    context: EvalContext<'a>,
    location: Option<&'a Location>,
    address: String,
    diagnostics: &'a mut Diagnostics,
}

impl Side<'_> {
    fn key(&mut self, key: &ObjectKey) -> TagExpr {
        match key {
            ObjectKey::Identifier(ident) => TagExpr {
                expression: ident.to_string(),
                references: vec![],
                value: TagValue::Known(ident.to_string()),
            },
            ObjectKey::Expression(expr) => self.resolve(expr),
            #[allow(unreachable_patterns)]
            _ => TagExpr {
                expression: String::new(),
                references: vec![],
                value: TagValue::Errored,
            },
        }
    }

    fn resolve(&mut self, expr: &Expression) -> TagExpr {
        TagExpr {
            expression: expr.to_string(),
            references: References::collect(expr).texts,
            value: self.value(expr),
        }
    }

    fn value(&mut self, expr: &Expression) -> TagValue {
        let expr = match policy::classify_entry(expr) {
            Classification::Literal(expr) => expr,
            Classification::Disallowed(reasons) => {
                for reason in reasons {
                    self.report(reason.to_diagnostic(), expr);
                }
                return TagValue::Errored;
            }
        };

        let value = match self.context.evaluate(expr) {
            Ok(value) => value,
            Err(err) => {
                self.report(err.to_diagnostic(expr), expr);
                return TagValue::Errored;
            }
        };

        if !value.is_wholly_known() {
            return TagValue::Unknown;
        }

        match coerce_to_string(&value) {
            Ok(rendered) => TagValue::Known(rendered),
            Err(err) => {
                self.report(
                    Diagnostic::error(
                        DiagnosticKind::UnsupportedValueShape,
                        "Invalid workspace tag",
                        err.to_string(),
                    ),
                    expr,
                );
                TagValue::Errored
            }
        }
    }

    fn report(&mut self, diagnostic: Diagnostic, expr: &Expression) {
        self.diagnostics.push(
            diagnostic
                .at(self.location)
                .in_context(self.address.clone())
                .with_expression(expr),
        );
    }
}
