use super::{ExpressionVisitor, VisitExpressions};
use crate::util::{traversal_path, traversal_text};
use hcl::{Expression, Identifier, Traversal};

/// Everything an expression refers to
#[derive(Debug, Default)]
pub struct References {
    /// Static attribute paths of all references, excluding names bound by an enclosing `for`
    pub paths: Vec<Vec<String>>,
    /// Source text of each entry in `paths`
    pub texts: Vec<String>,
    /// Names of all called functions
    pub functions: Vec<String>,
}

impl References {
    pub fn collect(expr: &Expression) -> Self {
        let mut collector = Collector::default();
        expr.visit_expressions(&mut collector);
        collector.references
    }
}

#[derive(Default)]
struct Collector {
    references: References,
    /// Names bound by the enclosing `for` expressions, innermost last
    bound: Vec<Vec<String>>,
}

impl Collector {
    fn is_bound(&self, name: &str) -> bool {
        self.bound.iter().flatten().any(|bound| bound == name)
    }
}

impl ExpressionVisitor for Collector {
    fn visit_traversal(&mut self, traversal: &Traversal) {
        let path = traversal_path(traversal);
        match path.first() {
            None => return,
            Some(root) if self.is_bound(root) => return,
            Some(_) => {}
        }
        self.references.paths.push(path);
        self.references.texts.push(traversal_text(traversal));
    }

    fn visit_func_call(&mut self, func_call: &hcl::expr::FuncCall) {
        self.references.functions.push(func_call.name.to_string());
    }

    fn enter_for(&mut self, names: &[&Identifier]) {
        self.bound
            .push(names.iter().map(|name| name.to_string()).collect());
    }

    fn leave_for(&mut self) {
        self.bound.pop();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::parse_expression;
    use pretty_assertions::assert_eq;

    #[test]
    fn skips_bound_names() {
        let expr = parse_expression(r#"[for s in var.list : upper(s)]"#).unwrap();
        let references = References::collect(&expr);

        assert_eq!(references.paths, vec![vec!["var", "list"]]);
        assert_eq!(references.texts, vec!["var.list"]);
        assert_eq!(references.functions, vec!["upper"]);
    }

    #[test]
    fn bound_names_only_hide_references_inside_the_for_body() {
        let expr = parse_expression(
            r#"concat([for data in var.list : data.name], [data.local_file.hostname.content])"#,
        )
        .unwrap();
        let references = References::collect(&expr);

        assert_eq!(
            references.texts,
            vec!["var.list", "data.local_file.hostname.content"]
        );
    }

    #[test]
    fn keeps_index_text() {
        let expr = parse_expression("docker_image.ubuntu.repo_digest[0]").unwrap();
        let references = References::collect(&expr);

        assert_eq!(
            references.paths,
            vec![vec!["docker_image", "ubuntu", "repo_digest"]]
        );
        assert_eq!(references.texts, vec!["docker_image.ubuntu.repo_digest[0]"]);
    }
}
