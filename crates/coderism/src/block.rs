//! configuration blocks
//!
//! A [ConfigBlock] is one HCL block (`data "coder_parameter" "region" { ... }`) with its attributes and nested blocks.
//! Attributes keep both the expression as written and the value the module builder evaluated it to. Until the
//! builder ran, every value is [Value::Unknown].
use crate::scope::{EvalContext, Scope};
use crate::value::Value;
use std::fmt;
use std::path::PathBuf;

/// Where a block or attribute was declared
#[derive(derive_new::new, Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Location {
    pub file: Option<PathBuf>,
    pub line: Option<usize>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}", file.display())?,
            None => f.write_str("<input>")?,
        }
        if let Some(line) = self.line {
            write!(f, " line {line}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub expression: hcl::Expression,
    pub value: Value,
    pub location: Option<Location>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, expression: hcl::Expression) -> Self {
        Self {
            name: name.into(),
            expression,
            value: Value::Unknown,
            location: None,
        }
    }

    /// `true` when the attribute is absent for all practical purposes (`attr = null`)
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
}

#[derive(Debug, Clone)]
pub struct ConfigBlock {
    /// Block identifier, e.g. `data`, `resource`, `variable`, `option`
    pub kind: String,
    pub labels: Vec<String>,
    pub attributes: indexmap::IndexMap<String, Attribute>,
    /// Nested blocks with `dynamic` blocks expanded, empty until the module builder ran
    pub blocks: Vec<ConfigBlock>,
    /// Nested blocks as written
    pub declared: Vec<ConfigBlock>,
    /// Variables only visible to this block (dynamic block iterators, `count`, `each`)
    pub locals: indexmap::IndexMap<String, Value>,
    pub location: Option<Location>,
}

impl ConfigBlock {
    pub fn new(kind: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            kind: kind.into(),
            labels,
            attributes: Default::default(),
            blocks: Default::default(),
            declared: Default::default(),
            locals: Default::default(),
            location: None,
        }
    }

    /// First label, e.g. `coder_parameter` for `data "coder_parameter" "region"`
    pub fn type_label(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or_default()
    }

    /// Last label, e.g. `region` for `data "coder_parameter" "region"`
    pub fn name_label(&self) -> &str {
        self.labels.last().map(String::as_str).unwrap_or_default()
    }

    /// Labels joined by `.`, e.g. `coder_parameter.region`
    pub fn label(&self) -> String {
        self.labels.join(".")
    }

    /// Address used to reference this block, e.g. `data.coder_parameter.region`
    pub fn address(&self) -> String {
        match self.kind.as_str() {
            "resource" => self.label(),
            "variable" => format!("var.{}", self.label()),
            _ if self.labels.is_empty() => self.kind.clone(),
            _ => format!("{}.{}", self.kind, self.label()),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Like [ConfigBlock::attribute] but treats `null` as absent
    pub fn non_null_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attribute(name).filter(|attr| !attr.is_null())
    }

    pub fn blocks<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a ConfigBlock> + 'a {
        self.blocks.iter().filter(move |block| block.kind == kind)
    }

    pub fn has_meta_argument(&self) -> bool {
        self.attributes.contains_key("count") || self.attributes.contains_key("for_each")
    }

    /// Evaluation context of this block: its own locals layered over the module scope
    pub fn context<'s>(&'s self, scope: &'s Scope) -> EvalContext<'s> {
        EvalContext::new(scope, &self.locals)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn naming() {
        let block = ConfigBlock::new("data", vec!["coder_parameter".into(), "region".into()]);
        assert_eq!(block.type_label(), "coder_parameter");
        assert_eq!(block.name_label(), "region");
        assert_eq!(block.label(), "coder_parameter.region");
        assert_eq!(block.address(), "data.coder_parameter.region");

        let resource = ConfigBlock::new("resource", vec!["docker_image".into(), "ubuntu".into()]);
        assert_eq!(resource.address(), "docker_image.ubuntu");

        let locals = ConfigBlock::new("locals", vec![]);
        assert_eq!(locals.address(), "locals");
        assert_eq!(locals.name_label(), "");
    }

    #[test]
    fn location_display() {
        assert_eq!(
            Location::new(Some("main.tf".into()), Some(4)).to_string(),
            "main.tf line 4"
        );
        assert_eq!(Location::new(None, None).to_string(), "<input>");
    }
}
