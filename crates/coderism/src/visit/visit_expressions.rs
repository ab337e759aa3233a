use super::ExpressionVisitor;
use hcl::{
    template::{Directive, Element},
    Expression, Identifier, ObjectKey, Operation, Template, Traversal, TraversalOperator,
};

/// Recursively visit an expression tree without modifying it
pub trait VisitExpressions {
    fn visit_expressions(&self, visitor: &mut dyn ExpressionVisitor);
}

impl VisitExpressions for Expression {
    fn visit_expressions(&self, visitor: &mut dyn ExpressionVisitor) {
        match self {
            Expression::Variable(variable) => {
                // a standalone variable is a traversal with no operators...kind of
                let traversal = Traversal::new(
                    Expression::Variable(variable.clone()),
                    Vec::<TraversalOperator>::new(),
                );
                visitor.visit_traversal(&traversal);
            }
            Expression::Traversal(traversal) => traversal.visit_expressions(visitor),
            Expression::Array(array) => {
                for expr in array {
                    expr.visit_expressions(visitor);
                }
            }
            Expression::Object(object) => {
                for (key, value) in object.iter() {
                    if let ObjectKey::Expression(key) = key {
                        key.visit_expressions(visitor);
                    }
                    value.visit_expressions(visitor);
                }
            }
            Expression::TemplateExpr(template_expr) => {
                match Template::from_expr(template_expr) {
                    Ok(template) => template.visit_expressions(visitor),
                    Err(err) => tracing::debug!(%err, "unable to parse template"),
                }
            }
            Expression::FuncCall(func_call) => {
                visitor.visit_func_call(func_call);
                for arg in &func_call.args {
                    arg.visit_expressions(visitor);
                }
            }
            Expression::Parenthesis(expr) => expr.visit_expressions(visitor),
            Expression::Conditional(cond) => {
                cond.cond_expr.visit_expressions(visitor);
                cond.true_expr.visit_expressions(visitor);
                cond.false_expr.visit_expressions(visitor);
            }
            Expression::Operation(operation) => match operation.as_ref() {
                Operation::Binary(binop) => {
                    binop.lhs_expr.visit_expressions(visitor);
                    binop.rhs_expr.visit_expressions(visitor);
                }
                Operation::Unary(unop) => unop.expr.visit_expressions(visitor),
            },
            Expression::ForExpr(forexpr) => {
                forexpr.collection_expr.visit_expressions(visitor);
                visitor.enter_for(&bound_names(&forexpr.key_var, &forexpr.value_var));
                forexpr
                    .key_expr
                    .iter()
                    .for_each(|e| e.visit_expressions(visitor));
                forexpr.value_expr.visit_expressions(visitor);
                forexpr
                    .cond_expr
                    .iter()
                    .for_each(|e| e.visit_expressions(visitor));
                visitor.leave_for();
            }
            _ => {}
        }
    }
}

fn bound_names<'a>(key_var: &'a Option<Identifier>, value_var: &'a Identifier) -> Vec<&'a Identifier> {
    key_var.iter().chain([value_var]).collect()
}

impl VisitExpressions for Traversal {
    fn visit_expressions(&self, visitor: &mut dyn ExpressionVisitor) {
        visitor.visit_traversal(self);

        // `var.a.b` is reported once as a whole; anything else is the root of a computed value (`f()[0]`)
        if !matches!(self.expr, Expression::Variable(_)) {
            self.expr.visit_expressions(visitor);
        }

        for operator in &self.operators {
            if let TraversalOperator::Index(index) = operator {
                index.visit_expressions(visitor);
            }
        }
    }
}

impl VisitExpressions for Template {
    fn visit_expressions(&self, visitor: &mut dyn ExpressionVisitor) {
        for element in self.elements() {
            match element {
                Element::Interpolation(interpolation) => {
                    interpolation.expr.visit_expressions(visitor);
                }
                Element::Directive(directive) => match directive {
                    Directive::If(ifdir) => {
                        ifdir.cond_expr.visit_expressions(visitor);
                        ifdir.true_template.visit_expressions(visitor);
                        ifdir
                            .false_template
                            .iter()
                            .for_each(|t| t.visit_expressions(visitor));
                    }
                    Directive::For(fordir) => {
                        fordir.collection_expr.visit_expressions(visitor);
                        visitor.enter_for(&bound_names(&fordir.key_var, &fordir.value_var));
                        fordir.template.visit_expressions(visitor);
                        visitor.leave_for();
                    }
                },
                Element::Literal(_) => {}
            }
        }
    }
}
