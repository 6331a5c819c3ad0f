//! Small tree-sitter navigation helpers shared by the builder and grammars.

use tree_sitter::Node;

/// All children, named and anonymous, in order.
pub fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
    children
}

/// Named children in order.
pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    children
}

/// The child stored under `name`, if any.
pub fn field<'t>(node: Node<'t>, name: &str) -> Option<Node<'t>> {
    node.child_by_field_name(name)
}

/// Every child stored under `name` (fields may repeat).
pub fn fields<'t>(node: Node<'t>, name: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let nodes: Vec<Node<'t>> = node.children_by_field_name(name, &mut cursor).collect();
    nodes
}

/// Like [`fields`] but tries several field names, first hit wins.
pub fn first_fields<'t>(node: Node<'t>, names: &[&str]) -> Vec<Node<'t>> {
    names
        .iter()
        .map(|name| fields(node, name))
        .find(|found| !found.is_empty())
        .unwrap_or_default()
}

/// Split a comma-separated list node into its items; any other node is a
/// single item.
pub fn list_items<'t>(node: Node<'t>, list_kinds: &[&str]) -> Vec<Node<'t>> {
    if list_kinds.contains(&node.kind()) {
        let items = named_children(node);
        if !items.is_empty() {
            return items;
        }
    }
    vec![node]
}

/// First named child with one of the given kinds.
pub fn child_of_kind<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    named_children(node)
        .into_iter()
        .find(|child| kinds.contains(&child.kind()))
}

/// Whether any direct child (usually an anonymous token) has this kind.
pub fn has_child_kind(node: Node, kind: &str) -> bool {
    children(node).iter().any(|child| child.kind() == kind)
}

/// The assignment operator of a binary binding node, e.g. `=` or `+=`.
pub fn operator<'t>(node: Node<'t>) -> Option<&'t str> {
    if let Some(op) = field(node, "operator") {
        return Some(operator_kind(op));
    }
    children(node)
        .into_iter()
        .find(|child| child.kind() == "assignment_operator" || child.kind().ends_with('='))
        .map(operator_kind)
}

fn operator_kind<'t>(op: Node<'t>) -> &'t str {
    // some grammars wrap the token in an `assignment_operator` node
    if op.named_child_count() == 0 && op.child_count() == 1 {
        if let Some(inner) = op.child(0) {
            return inner.kind();
        }
    }
    op.kind()
}

/// Whether `op` combines the target with the value (`+=`, `<<=`, `??=`, ...).
pub fn is_compound_operator(op: &str) -> bool {
    op.ends_with('=') && !matches!(op, "=" | ":=" | "==" | "===" | "!=" | "<=" | ">=")
}

/// Named children with `excluded` nodes removed, in order.
pub fn named_children_except<'t>(node: Node<'t>, excluded: &[Node<'t>]) -> Vec<Node<'t>> {
    named_children(node)
        .into_iter()
        .filter(|child| !excluded.contains(child))
        .collect()
}

/// Named children appearing after the first anonymous child of `kind`.
pub fn named_after<'t>(node: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    let mut seen = false;
    let mut out = Vec::new();
    for child in children(node) {
        if seen && child.is_named() {
            out.push(child);
        } else if !child.is_named() && child.kind() == kind {
            seen = true;
        }
    }
    out
}

/// Named children appearing before the first anonymous child of `kind`.
pub fn named_before<'t>(node: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    for child in children(node) {
        if !child.is_named() && child.kind() == kind {
            break;
        }
        if child.is_named() {
            out.push(child);
        }
    }
    out
}

/// The clauses of a C-style `for (init; cond; update) body`.
#[derive(Debug, Default)]
pub struct ForClauses<'t> {
    pub init: Vec<Node<'t>>,
    pub condition: Vec<Node<'t>>,
    pub update: Vec<Node<'t>>,
    pub body: Option<Node<'t>>,
}

impl<'t> ForClauses<'t> {
    /// Locate clauses by field name, falling back to counting `;` inside
    /// the parentheses for grammars without field names.
    pub fn locate(node: Node<'t>) -> Self {
        let init = first_fields(node, &["init", "initializer", "initialize"]);
        let condition = fields(node, "condition");
        let update = first_fields(node, &["update", "increment"]);
        let body = field(node, "body");

        if !init.is_empty() || !condition.is_empty() || !update.is_empty() {
            return Self {
                init,
                condition,
                update,
                body,
            };
        }

        let mut clauses = Self {
            body,
            ..Default::default()
        };
        let mut segment = 0;
        let mut inside = false;
        for child in children(node) {
            match child.kind() {
                "(" if !inside => inside = true,
                ")" if inside => inside = false,
                ";" if inside => segment += 1,
                _ if inside && child.is_named() => match segment {
                    0 => clauses.init.push(child),
                    1 => clauses.condition.push(child),
                    _ => clauses.update.push(child),
                },
                _ if !inside && child.is_named() && clauses.body.is_none() => {
                    clauses.body = Some(child)
                }
                _ => {}
            }
        }
        clauses
    }

    /// Condition, body, update: the part of the loop that repeats.
    pub fn repeated(&self) -> Vec<Node<'t>> {
        let mut nodes = self.condition.clone();
        nodes.extend(self.body);
        nodes.extend(self.update.iter().copied());
        nodes
    }
}
