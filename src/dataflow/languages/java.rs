//! Java grammar table.

use tree_sitter::{Language, Node};

use crate::dataflow::syntax::{
    child_of_kind, field, fields, has_child_kind, is_compound_operator, named_children, operator,
    ForClauses,
};
use crate::dataflow::{
    Binding, BindingKind, Branch, Construct, ForEach, Function, Grammar, Loop, Parameter,
};

pub struct JavaGrammar {
    language: Language,
}

impl JavaGrammar {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_java::LANGUAGE.into(),
        }
    }

    fn parameters<'t>(&self, params: Option<Node<'t>>) -> Vec<Parameter<'t>> {
        let Some(params) = params else {
            return Vec::new();
        };
        // `x -> x + 1`
        if params.kind() == "identifier" {
            return vec![Parameter {
                name: params,
                default: None,
            }];
        }

        named_children(params)
            .into_iter()
            .filter_map(|param| match param.kind() {
                "formal_parameter" => field(param, "name"),
                "spread_parameter" => child_of_kind(param, &["variable_declarator"])
                    .and_then(|declarator| field(declarator, "name")),
                // `(a, b) -> ...`
                "identifier" => Some(param),
                _ => None,
            })
            .map(|name| Parameter {
                name,
                default: None,
            })
            .collect()
    }

    fn switch<'t>(&self, node: Node<'t>) -> Construct<'t> {
        let groups = field(node, "body").map(named_children).unwrap_or_default();
        let mut exhaustive = false;
        let mut arms = Vec::with_capacity(groups.len());

        for group in groups {
            let labels: Vec<Node<'t>> = named_children(group)
                .into_iter()
                .filter(|child| child.kind() == "switch_label")
                .collect();
            if labels.iter().any(|label| has_child_kind(*label, "default")) {
                exhaustive = true;
            }
            arms.push(named_children(group));
        }

        Construct::Branch(Branch {
            condition: field(node, "condition").into_iter().collect(),
            arms,
            exhaustive,
        })
    }
}

impl Default for JavaGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar for JavaGrammar {
    fn language_id(&self) -> &'static str {
        "java"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn language(&self) -> &Language {
        &self.language
    }

    fn is_identifier(&self, kind: &str) -> bool {
        kind == "identifier"
    }

    fn is_atomic(&self, kind: &str) -> bool {
        matches!(kind, "string_literal" | "character_literal")
    }

    fn is_comment(&self, kind: &str) -> bool {
        matches!(kind, "line_comment" | "block_comment")
    }

    fn member_access_kinds(&self) -> &'static [&'static str] {
        &["field_access"]
    }

    fn classify<'t>(&self, node: Node<'t>) -> Construct<'t> {
        match node.kind() {
            "variable_declarator" | "resource" => Construct::Bind(Binding {
                kind: BindingKind::Declaration,
                targets: field(node, "name").into_iter().collect(),
                values: field(node, "value").into_iter().collect(),
            }),
            "catch_formal_parameter" => Construct::Bind(Binding {
                kind: BindingKind::Declaration,
                targets: field(node, "name").into_iter().collect(),
                values: Vec::new(),
            }),
            "assignment_expression" => Construct::Bind(Binding {
                kind: match operator(node) {
                    Some(op) if is_compound_operator(op) => BindingKind::Compound,
                    _ => BindingKind::Assignment,
                },
                targets: field(node, "left").into_iter().collect(),
                values: field(node, "right").into_iter().collect(),
            }),
            "update_expression" => match named_children(node).into_iter().next() {
                Some(operand) => Construct::Update(operand),
                None => Construct::Other,
            },
            "if_statement" => {
                let alternative = field(node, "alternative");
                Construct::Branch(Branch {
                    condition: field(node, "condition").into_iter().collect(),
                    arms: vec![
                        field(node, "consequence").into_iter().collect(),
                        alternative.into_iter().collect(),
                    ],
                    exhaustive: alternative.is_some(),
                })
            }
            "switch_expression" => self.switch(node),
            "for_statement" => {
                let clauses = ForClauses::locate(node);
                Construct::Loop(Loop {
                    repeated: clauses.repeated(),
                    setup: clauses.init,
                    tail: Vec::new(),
                })
            }
            "enhanced_for_statement" => Construct::ForEach(ForEach {
                targets: field(node, "name").into_iter().collect(),
                iterable: field(node, "value"),
                body: field(node, "body").into_iter().collect(),
                tail: Vec::new(),
                scoped: false,
            }),
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
            "method_declaration" | "constructor_declaration" => Construct::Function(Function {
                name: field(node, "name"),
                params: self.parameters(field(node, "parameters")),
                body: fields(node, "body"),
            }),
            "lambda_expression" => Construct::Function(Function {
                name: None,
                params: self.parameters(field(node, "parameters")),
                body: field(node, "body").into_iter().collect(),
            }),
            _ => Construct::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::{DfgBuilder, DfgResult, Relation, TokenIndex};

    fn analyze(source: &str) -> (TokenIndex, DfgResult) {
        let grammar = JavaGrammar::new();
        let parsed = grammar.parse_source("Test.java", source.as_bytes()).unwrap();
        let root = parsed.tree.root_node();
        let tokens = TokenIndex::from_tree(root, &parsed.source, &grammar);
        let result = DfgBuilder::new(&grammar, &tokens).build(root);
        (tokens, result)
    }

    fn indices_of(tokens: &TokenIndex, text: &str) -> Vec<usize> {
        tokens.iter().filter(|t| t.text == text).map(|t| t.index).collect()
    }

    const SUM: &str = r#"
class A {
    int sum(int n) {
        int total = 0;
        for (int i = 0; i < n; i++) {
            total = total + i;
        }
        return total;
    }
}
"#;

    #[test]
    fn test_for_loop_self_dependency() {
        let (tokens, result) = analyze(SUM);
        let totals = indices_of(&tokens, "total");
        // declaration, loop target, loop read, return
        let inner = totals[1];
        let edge = result.edges_for("total").find(|e| e.index == inner).unwrap();
        assert_eq!(edge.relation, Relation::ComputedFrom);
        assert!(edge.source_indices.contains(&totals[0]));
        assert!(edge.source_indices.contains(&inner));
        assert!(edge.has_source_named("i"));
    }

    #[test]
    fn test_increment_reads_previous_iteration() {
        let (tokens, result) = analyze(SUM);
        let is = indices_of(&tokens, "i");
        let (init, update) = (is[0], is[2]);
        let edge = result.edges_for("i").find(|e| e.index == update).unwrap();
        assert_eq!(edge.relation, Relation::ComputedFrom);
        assert_eq!(edge.source_indices, vec![init, update]);
    }

    #[test]
    fn test_parameters_stay_in_method_scope() {
        let (_, result) = analyze(SUM);
        assert!(!result.state.contains_key("n"));
        assert!(!result.state.contains_key("total"));
        assert!(result.state.contains_key("sum"));
    }

    #[test]
    fn test_if_else_unions_definitions() {
        let src = "class B { void f(boolean c) { int x; if (c) { x = 1; } else { x = 2; } int y = x; } }";
        let (tokens, result) = analyze(src);
        let xs = indices_of(&tokens, "x");
        let y = result.edges_for("y").next().unwrap();
        assert_eq!(y.relation, Relation::ComesFrom);
        assert_eq!(y.source_indices, vec![xs[1], xs[2]]);
    }

    #[test]
    fn test_compound_assignment() {
        let src = "class C { void f() { int s = 1; s += 4; } }";
        let (tokens, result) = analyze(src);
        let ss = indices_of(&tokens, "s");
        let edge = result.edges_for("s").find(|e| e.index == ss[1]).unwrap();
        assert_eq!(edge.relation, Relation::ComputedFrom);
        assert_eq!(edge.source_names, vec!["s", "4"]);
        assert_eq!(edge.source_indices[0], ss[0]);
    }

    #[test]
    fn test_enhanced_for_target_computed_from_iterable() {
        let src = "class D { void f(int[] xs) { for (int x : xs) { g(x); } } }";
        let (tokens, result) = analyze(src);
        let x = indices_of(&tokens, "x")[0];
        let edge = result.edges_for("x").find(|e| e.index == x).unwrap();
        assert_eq!(edge.relation, Relation::ComputedFrom);
        assert_eq!(edge.source_names, vec!["xs"]);
    }
}
