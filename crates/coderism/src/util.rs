use hcl::{Expression, ObjectKey, Traversal, TraversalOperator};

/// Longest static attribute path of a traversal
///
/// `data.coder_parameter.az.value` yields `["data", "coder_parameter", "az", "value"]`, `local.list[0].a` stops at the
/// index and yields `["local", "list"]`. Traversals not rooted in a variable yield an empty path.
pub(crate) fn traversal_path(traversal: &Traversal) -> Vec<String> {
    let Expression::Variable(var) = &traversal.expr else {
        return vec![];
    };

    let mut path = vec![var.to_string()];
    for operator in &traversal.operators {
        let TraversalOperator::GetAttr(ident) = operator else {
            break;
        };

        path.push(ident.to_string());
    }

    path
}

/// Source text of a traversal, including index and splat operators
pub(crate) fn traversal_text(traversal: &Traversal) -> String {
    Expression::Traversal(Box::new(traversal.clone())).to_string()
}

/// Parses a standalone expression, e.g. a type expression that was written as a string
pub(crate) fn parse_expression(input: &str) -> Result<Expression, hcl_edit::parser::Error> {
    let expr: hcl_edit::expr::Expression = input.parse()?;
    Ok(expr.into())
}

/// Static name of an object key: `a = ...` and `"a" = ...` both yield `a`
pub(crate) fn object_key_name(key: &ObjectKey) -> Option<String> {
    match key {
        ObjectKey::Identifier(ident) => Some(ident.to_string()),
        ObjectKey::Expression(Expression::String(s)) => Some(s.clone()),
        ObjectKey::Expression(Expression::Variable(var)) => Some(var.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn longest_path() {
        let Expression::Traversal(traversal) = parse_expression("local.list[0].a").unwrap() else {
            panic!("expected a traversal");
        };

        assert_eq!(traversal_path(&traversal), vec!["local", "list"]);
    }

    #[test]
    fn path_of_parsed_expression() {
        let Expression::Traversal(traversal) =
            parse_expression("data.coder_parameter.az.value").unwrap()
        else {
            panic!("expected a traversal");
        };

        assert_eq!(
            traversal_path(&traversal),
            vec!["data", "coder_parameter", "az", "value"]
        );
        assert_eq!(traversal_text(&traversal), "data.coder_parameter.az.value");
    }
}
