//! structured, non-fatal failure reports
//!
//! Every failure the engine detects while resolving parameters and tags becomes a [Diagnostic]. Diagnostics are
//! accumulated in [Diagnostics] instead of being returned as errors, so one failing attribute, tag or block never
//! hides the results of its siblings. Callers decide whether error-severity diagnostics fail the overall run.
use crate::block::Location;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Category of a [Diagnostic]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum DiagnosticKind {
    /// A required attribute (or block) is absent
    MissingRequiredArgument,
    /// An attribute is present but has the wrong type or shape
    InvalidAttributeType,
    /// An expression uses a construct that is not permitted where it appears
    UnsupportedExpressionShape,
    /// A value could not be converted to its declared type
    TypeConversionFailure,
    /// A value could not be rendered as a string
    UnsupportedValueShape,
    /// An expression failed to evaluate
    EvaluationFailure,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::MissingRequiredArgument => f.write_str("missing required argument"),
            DiagnosticKind::InvalidAttributeType => f.write_str("invalid attribute type"),
            DiagnosticKind::UnsupportedExpressionShape => {
                f.write_str("unsupported expression shape")
            }
            DiagnosticKind::TypeConversionFailure => f.write_str("type conversion failure"),
            DiagnosticKind::UnsupportedValueShape => f.write_str("unsupported value shape"),
            DiagnosticKind::EvaluationFailure => f.write_str("evaluation failure"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub summary: String,
    pub detail: String,
    pub location: Option<Location>,
    /// Source text of the offending expression
    pub expression: Option<String>,
    /// Address of the block whose context the failure happened in, e.g. `data.coder_workspace_tags.tags`
    pub context: Option<String>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, kind, summary.into(), detail.into())
    }

    pub fn warning(
        kind: DiagnosticKind,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::with_severity(Severity::Warning, kind, summary.into(), detail.into())
    }

    fn with_severity(
        severity: Severity,
        kind: DiagnosticKind,
        summary: String,
        detail: String,
    ) -> Self {
        Self {
            severity,
            kind,
            summary,
            detail,
            location: None,
            expression: None,
            context: None,
        }
    }

    pub fn at(mut self, location: Option<&Location>) -> Self {
        self.location = location.cloned();
        self
    }

    pub fn in_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_expression(mut self, expression: &hcl::Expression) -> Self {
        self.expression = Some(expression.to_string());
        self
    }

    /// Downgrades to [Severity::Warning]
    pub fn as_warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        };
        write!(f, "{severity}: {}", self.summary)?;
        if !self.detail.is_empty() {
            write!(f, "; {}", self.detail)?;
        }
        if let Some(location) = &self.location {
            write!(f, "\n  on {location}")?;
            if let Some(context) = &self.context {
                write!(f, ", in {context}")?;
            }
        }
        Ok(())
    }
}

/// Accumulator for [Diagnostic]s
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::trace!(?diagnostic, "diagnostic recorded");
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        for diagnostic in other {
            self.push(diagnostic);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(move |d| d.kind == kind)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(value: Diagnostic) -> Self {
        Self(vec![value])
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, diagnostic) in self.0.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}
