//! typed access to block attributes
//!
//! ```ignore
//! let mut parser = AttributeParser::new(block);
//! let name = parser.attr("name").required().as_string();
//! let mutable = parser.attr("mutable").as_bool();
//! let diagnostics = parser.into_diagnostics();
//! ```
//!
//! Accessors never fail. A missing or mistyped attribute records a diagnostic and yields the zero value of the
//! requested type. Only the first failure of each attribute is recorded.
use crate::block::{Attribute, ConfigBlock};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::value::Value;

pub struct AttributeParser<'b> {
    block: &'b ConfigBlock,
    diagnostics: Diagnostics,
}

impl<'b> AttributeParser<'b> {
    pub fn new(block: &'b ConfigBlock) -> Self {
        Self {
            block,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn attr<'p>(&'p mut self, key: &'p str) -> ExpectedAttribute<'p, 'b> {
        ExpectedAttribute {
            parser: self,
            key,
            failed: false,
        }
    }

    /// Records a diagnostic found outside of this parser (e.g. in a nested block)
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: Diagnostics) {
        self.diagnostics.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }
}

pub struct ExpectedAttribute<'p, 'b> {
    parser: &'p mut AttributeParser<'b>,
    key: &'p str,
    failed: bool,
}

impl<'b> ExpectedAttribute<'_, 'b> {
    /// Records a [DiagnosticKind::MissingRequiredArgument] if the attribute is absent or `null`
    pub fn required(mut self) -> Self {
        if self.present().is_none() {
            let block = self.parser.block;
            let diagnostic = Diagnostic::error(
                DiagnosticKind::MissingRequiredArgument,
                "Missing required argument",
                format!(
                    "The argument {:?} is required, but no definition was found.",
                    self.key
                ),
            )
            .at(block.location.as_ref());
            self.fail(diagnostic);
        }
        self
    }

    pub fn as_string(mut self) -> String {
        let Some(attribute) = self.present() else {
            return String::new();
        };
        match &attribute.value {
            Value::String(s) => s.clone(),
            _ => {
                self.type_mismatch(attribute, "string");
                String::new()
            }
        }
    }

    pub fn as_bool(mut self) -> bool {
        let Some(attribute) = self.present() else {
            return false;
        };
        match attribute.value {
            Value::Boolean(b) => b,
            _ => {
                self.type_mismatch(attribute, "bool");
                false
            }
        }
    }

    /// Whole number, `None` if absent or not a whole number
    pub fn as_i64(mut self) -> Option<i64> {
        let attribute = self.present()?;
        match &attribute.value {
            Value::Number(n) if n.as_i64().is_some() => n.as_i64(),
            _ => {
                self.type_mismatch(attribute, "whole number");
                None
            }
        }
    }

    /// The attribute itself, `None` if absent or `null`
    pub fn attribute(self) -> Option<&'b Attribute> {
        self.present()
    }

    fn present(&self) -> Option<&'b Attribute> {
        let block: &'b ConfigBlock = self.parser.block;
        block.non_null_attribute(self.key)
    }

    fn type_mismatch(&mut self, attribute: &Attribute, expected: &str) {
        let block = self.parser.block;
        let detail = if attribute.value.is_wholly_known() {
            format!(
                "{:?} attribute must be of type {expected} for {}, found {}",
                self.key,
                block.address(),
                attribute.value.type_name()
            )
        } else {
            format!(
                "{:?} attribute of {} must be a known {expected}, but its value depends on values not known yet",
                self.key,
                block.address()
            )
        };

        let diagnostic = Diagnostic::error(
            DiagnosticKind::InvalidAttributeType,
            "Invalid attribute type",
            detail,
        )
        .at(attribute.location.as_ref().or(block.location.as_ref()))
        .with_expression(&attribute.expression);
        self.fail(diagnostic);
    }

    fn fail(&mut self, diagnostic: Diagnostic) {
        if self.failed {
            return;
        }
        self.failed = true;
        let context = self.parser.block.address();
        self.parser.push(diagnostic.in_context(context));
    }
}
