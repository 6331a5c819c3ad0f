//! PHP grammar table.
//!
//! `variable_name` (`$x`) is indexed as one token so variables keep their
//! sigil and never collide with function or class names.

use tree_sitter::{Language, Node};

use crate::dataflow::syntax::{field, fields, named_children, ForClauses};
use crate::dataflow::{
    Binding, BindingKind, Branch, Construct, ForEach, Function, Grammar, Loop, Parameter,
};

pub struct PhpGrammar {
    language: Language,
}

impl PhpGrammar {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_php::LANGUAGE_PHP.into(),
        }
    }

    fn parameters<'t>(&self, params: Option<Node<'t>>) -> Vec<Parameter<'t>> {
        params
            .map(named_children)
            .unwrap_or_default()
            .into_iter()
            .filter(|param| {
                matches!(
                    param.kind(),
                    "simple_parameter" | "variadic_parameter" | "property_promotion_parameter"
                )
            })
            .filter_map(|param| {
                field(param, "name").map(|name| Parameter {
                    name,
                    default: field(param, "default_value"),
                })
            })
            .collect()
    }

    fn if_statement<'t>(&self, node: Node<'t>) -> Construct<'t> {
        let mut arms = vec![field(node, "body").into_iter().collect::<Vec<_>>()];
        let mut exhaustive = false;

        for alternative in fields(node, "alternative") {
            match alternative.kind() {
                "else_if_clause" => arms.push(
                    field(alternative, "condition")
                        .into_iter()
                        .chain(field(alternative, "body"))
                        .collect(),
                ),
                _ => {
                    exhaustive = true;
                    arms.push(field(alternative, "body").into_iter().collect());
                }
            }
        }

        Construct::Branch(Branch {
            condition: field(node, "condition").into_iter().collect(),
            arms,
            exhaustive,
        })
    }

    /// `foreach ($xs as $x)` / `foreach ($xs as $k => $v)`.
    fn foreach_statement<'t>(&self, node: Node<'t>) -> Construct<'t> {
        let named = named_children(node);
        let body = field(node, "body").or_else(|| named.last().copied());
        let mut operands = named.into_iter().filter(|child| Some(*child) != body);

        let iterable = operands.next();
        Construct::ForEach(ForEach {
            targets: operands.next().into_iter().collect(),
            iterable,
            body: body.into_iter().collect(),
            tail: Vec::new(),
            scoped: false,
        })
    }

    fn switch<'t>(&self, node: Node<'t>) -> Construct<'t> {
        let cases = field(node, "body").map(named_children).unwrap_or_default();
        let exhaustive = cases.iter().any(|case| case.kind() == "default_statement");
        Construct::Branch(Branch {
            condition: field(node, "condition").into_iter().collect(),
            arms: cases
                .into_iter()
                .filter(|case| matches!(case.kind(), "case_statement" | "default_statement"))
                .map(named_children)
                .collect(),
            exhaustive,
        })
    }
}

impl Default for PhpGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar for PhpGrammar {
    fn language_id(&self) -> &'static str {
        "php"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["php"]
    }

    fn language(&self) -> &Language {
        &self.language
    }

    fn is_identifier(&self, kind: &str) -> bool {
        matches!(kind, "variable_name" | "name")
    }

    fn is_atomic(&self, kind: &str) -> bool {
        matches!(kind, "variable_name" | "string")
    }

    fn is_comment(&self, kind: &str) -> bool {
        kind == "comment"
    }

    fn member_access_kinds(&self) -> &'static [&'static str] {
        &["member_access_expression"]
    }

    fn classify<'t>(&self, node: Node<'t>) -> Construct<'t> {
        match node.kind() {
            "assignment_expression" | "reference_assignment_expression" => {
                Construct::Bind(Binding {
                    kind: BindingKind::Assignment,
                    targets: field(node, "left").into_iter().collect(),
                    values: field(node, "right").into_iter().collect(),
                })
            }
            "augmented_assignment_expression" => Construct::Bind(Binding {
                kind: BindingKind::Compound,
                targets: field(node, "left").into_iter().collect(),
                values: field(node, "right").into_iter().collect(),
            }),
            "update_expression" => {
                match field(node, "argument").or_else(|| named_children(node).into_iter().next()) {
                    Some(operand) => Construct::Update(operand),
                    None => Construct::Other,
                }
            }
            "if_statement" => self.if_statement(node),
            "switch_statement" => self.switch(node),
            "for_statement" => {
                let clauses = ForClauses::locate(node);
                Construct::Loop(Loop {
                    repeated: clauses.repeated(),
                    setup: clauses.init,
                    tail: Vec::new(),
                })
            }
            "foreach_statement" => self.foreach_statement(node),
            "while_statement" => Construct::Loop(Loop {
                setup: Vec::new(),
                repeated: field(node, "condition")
                    .into_iter()
                    .chain(field(node, "body"))
                    .collect(),
                tail: Vec::new(),
            }),
            "do_statement" => Construct::Loop(Loop {
                setup: Vec::new(),
                repeated: field(node, "body")
                    .into_iter()
                    .chain(field(node, "condition"))
                    .collect(),
                tail: Vec::new(),
            }),
            "function_definition" | "method_declaration" => Construct::Function(Function {
                name: field(node, "name"),
                params: self.parameters(field(node, "parameters")),
                body: field(node, "body").into_iter().collect(),
            }),
            "anonymous_function" | "anonymous_function_creation_expression" | "arrow_function" => {
                Construct::Function(Function {
                    name: None,
                    params: self.parameters(field(node, "parameters")),
                    body: field(node, "body").into_iter().collect(),
                })
            }
            _ => Construct::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::{DfgBuilder, DfgResult, Relation, TokenIndex};

    fn analyze(source: &str) -> (TokenIndex, DfgResult) {
        let grammar = PhpGrammar::new();
        let parsed = grammar.parse_source("test.php", source.as_bytes()).unwrap();
        let root = parsed.tree.root_node();
        let tokens = TokenIndex::from_tree(root, &parsed.source, &grammar);
        let result = DfgBuilder::new(&grammar, &tokens).build(root);
        (tokens, result)
    }

    fn indices_of(tokens: &TokenIndex, text: &str) -> Vec<usize> {
        tokens.iter().filter(|t| t.text == text).map(|t| t.index).collect()
    }

    const SAMPLE: &str = r#"<?php
$total = 0;
foreach ($items as $item) {
    $total += $item;
}
$avg = $total / 2;
"#;

    #[test]
    fn test_variables_keep_sigil() {
        let (tokens, _) = analyze(SAMPLE);
        assert_eq!(indices_of(&tokens, "$total").len(), 3);
    }

    #[test]
    fn test_foreach_target_from_collection() {
        let (_, result) = analyze(SAMPLE);
        let item = result.edges_for("$item").next().unwrap();
        assert_eq!(item.relation, Relation::ComputedFrom);
        assert_eq!(item.source_names, vec!["$items"]);
    }

    #[test]
    fn test_accumulator_self_loop() {
        let (tokens, result) = analyze(SAMPLE);
        let totals = indices_of(&tokens, "$total");
        let inner = result.edges_for("$total").find(|e| e.index == totals[1]).unwrap();
        assert!(inner.source_indices.contains(&totals[0]));
        assert!(inner.source_indices.contains(&totals[1]));

        let avg = result.edges_for("$avg").next().unwrap();
        assert_eq!(avg.relation, Relation::ComputedFrom);
        assert_eq!(avg.source_names, vec!["$total", "2"]);
    }

    #[test]
    fn test_function_parameters_are_scoped() {
        let (_, result) = analyze("<?php\nfunction f($a, $b = 1) { return $a + $b; }\n");
        assert!(result.state.contains_key("f"));
        assert!(!result.state.contains_key("$a"));
        assert!(!result.state.contains_key("$b"));
    }
}
