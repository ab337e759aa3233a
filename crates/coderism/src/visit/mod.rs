//! visitor pattern helpers
mod references;
mod visit_expressions;
pub use references::References;
pub use visit_expressions::VisitExpressions;

/// Visitor over the parts of an expression tree the engine cares about
///
/// All methods default to doing nothing.
pub trait ExpressionVisitor {
    /// A reference such as `var.region`, `data.coder_parameter.az.value` or a plain `each`
    fn visit_traversal(&mut self, _traversal: &hcl::Traversal) {}

    fn visit_func_call(&mut self, _func_call: &hcl::expr::FuncCall) {}

    /// Names bound by a `for` expression or template directive, in scope until the matching
    /// [ExpressionVisitor::leave_for]
    ///
    /// The collection expression is visited before the names are bound.
    fn enter_for(&mut self, _names: &[&hcl::Identifier]) {}

    fn leave_for(&mut self) {}
}
