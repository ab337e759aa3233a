//! evaluation scopes
//!
//! A [Scope] holds the root variables of one module (`var`, `local`, `data`, one root per resource type). Each block
//! evaluates expressions through an [EvalContext]: the block's own locals layered over its module scope.
//!
//! [hcl::eval] has no notion of values that are not known yet. Before an expression is handed to it, every reference
//! in the expression is resolved against the scope:
//! - a reference to an undeclared root variable is an [EvalError::UndefinedVariable]
//! - a reference that reaches [Value::Unknown], or an undeclared attribute of a computed object (resources, most data
//!   sources), makes the whole expression [Value::Unknown]
//!
//! Only if all references are known the expression is evaluated by [hcl::eval].
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::value::Value;
use crate::visit::References;
use hcl::eval::Evaluate;
use indexmap::IndexMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    roots: IndexMap<String, Value>,
    /// Path prefixes whose undeclared attributes are computed later (e.g. `["docker_image"]`)
    computed: Vec<Vec<String>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, value: Value) {
        self.roots.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.roots.get(name)
    }

    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (root, rest) = path.split_first()?;
        self.roots.get(*root)?.get_path(rest)
    }

    pub fn roots(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.roots.iter()
    }

    /// Sets a value at a path, creating intermediate objects as needed
    ///
    /// Later evaluations in this scope, and every block context layered over it, observe the new value.
    pub fn set(&mut self, path: &[&str], value: Value) {
        let Some((root, rest)) = path.split_first() else {
            return;
        };

        tracing::trace!(?path, ?value, "set scope value");
        let target = self.roots.entry(root.to_string()).or_insert(Value::Null);
        set_in(target, rest, value);
    }

    /// Marks all undeclared attributes below `prefix` as computed
    pub fn mark_computed(&mut self, prefix: Vec<String>) {
        if !self.computed.contains(&prefix) {
            self.computed.push(prefix);
        }
    }

    /// `true` if an undeclared attribute of the object at `container` is computed
    fn is_computed(&self, container: &[String]) -> bool {
        self.computed
            .iter()
            .any(|prefix| prefix.len() < container.len() && container.starts_with(prefix))
    }
}

fn set_in(target: &mut Value, path: &[&str], value: Value) {
    let Some((key, rest)) = path.split_first() else {
        *target = value;
        return;
    };

    if !matches!(target, Value::Object(_)) {
        *target = Value::Object(IndexMap::new());
    }

    if let Value::Object(map) = target {
        let child = map.entry(key.to_string()).or_insert(Value::Null);
        set_in(child, rest, value);
    }
}

#[derive(thiserror::Error, Debug)]
pub enum EvalError {
    #[error("There is no variable named {0:?}.")]
    UndefinedVariable(String),
    #[error(transparent)]
    Expression(#[from] hcl::eval::Errors),
}

impl EvalError {
    pub fn summary(&self) -> &'static str {
        match self {
            EvalError::UndefinedVariable(_) => "Unknown variable",
            EvalError::Expression(_) => "Invalid expression",
        }
    }

    /// Error-severity diagnostic describing this failure
    pub fn to_diagnostic(&self, expression: &hcl::Expression) -> Diagnostic {
        Diagnostic::error(
            DiagnosticKind::EvaluationFailure,
            self.summary(),
            self.to_string(),
        )
        .with_expression(expression)
    }
}

enum Lookup<'v> {
    Undeclared,
    Unknown,
    Found(&'v Value),
    /// The path leaves the declared values; the hcl evaluator reports the precise error
    Incomplete,
}

/// Scope used to evaluate expressions of one block
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'s> {
    scope: &'s Scope,
    locals: &'s IndexMap<String, Value>,
}

impl<'s> EvalContext<'s> {
    pub fn new(scope: &'s Scope, locals: &'s IndexMap<String, Value>) -> Self {
        Self { scope, locals }
    }

    fn root(&self, name: &str) -> Option<&'s Value> {
        self.locals.get(name).or_else(|| self.scope.get(name))
    }

    fn lookup(&self, path: &[String]) -> Lookup<'s> {
        let Some((root, rest)) = path.split_first() else {
            return Lookup::Incomplete;
        };
        let Some(mut current) = self.root(root) else {
            return Lookup::Undeclared;
        };

        for (depth, key) in rest.iter().enumerate() {
            match current {
                Value::Unknown => return Lookup::Unknown,
                Value::Object(map) => match map.get(key) {
                    Some(next) => current = next,
                    None if self.scope.is_computed(&path[..=depth]) => return Lookup::Unknown,
                    None => return Lookup::Incomplete,
                },
                _ => return Lookup::Incomplete,
            }
        }

        Lookup::Found(current)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(%expr))]
    pub fn evaluate(&self, expr: &hcl::Expression) -> Result<Value, EvalError> {
        let references = References::collect(expr);

        let mut unknown = false;
        for path in &references.paths {
            match self.lookup(path) {
                Lookup::Undeclared => return Err(EvalError::UndefinedVariable(path[0].clone())),
                Lookup::Unknown => unknown = true,
                Lookup::Found(value) if !value.is_wholly_known() => unknown = true,
                Lookup::Found(_) | Lookup::Incomplete => {}
            }
        }

        if unknown {
            tracing::trace!("expression depends on unknown values");
            return Ok(Value::Unknown);
        }

        let value = expr.evaluate(&self.hcl_context()).map_err(hcl::eval::Errors::from)?;
        Ok(value.into())
    }

    fn hcl_context(&self) -> hcl::eval::Context<'static> {
        let mut context = hcl::eval::Context::new();
        for (name, value) in self.scope.roots().chain(self.locals.iter()) {
            context.declare_var(
                hcl::Identifier::unchecked(name.as_str()),
                hcl::Value::from(value),
            );
        }
        context
    }
}
