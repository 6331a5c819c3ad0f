//! Go grammar table.

use tree_sitter::{Language, Node};

use crate::dataflow::syntax::{
    child_of_kind, field, fields, is_compound_operator, list_items, named_children, operator,
};
use crate::dataflow::{
    Binding, BindingKind, Branch, Construct, ForEach, Function, Grammar, Loop, Parameter,
};

const LIST_KINDS: &[&str] = &["expression_list"];

pub struct GoGrammar {
    language: Language,
}

impl GoGrammar {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_go::LANGUAGE.into(),
        }
    }

    fn values<'t>(&self, node: Node<'t>, name: &str) -> Vec<Node<'t>> {
        field(node, name)
            .map(|value| list_items(value, LIST_KINDS))
            .unwrap_or_default()
    }

    fn parameters<'t>(&self, lists: &[Option<Node<'t>>]) -> Vec<Parameter<'t>> {
        lists
            .iter()
            .flatten()
            .flat_map(|list| named_children(*list))
            .filter(|param| {
                matches!(
                    param.kind(),
                    "parameter_declaration" | "variadic_parameter_declaration"
                )
            })
            // `a, b int` declares two names
            .flat_map(|param| fields(param, "name"))
            .map(|name| Parameter {
                name,
                default: None,
            })
            .collect()
    }

    fn for_statement<'t>(&self, node: Node<'t>) -> Construct<'t> {
        let body = field(node, "body");

        if let Some(clause) = child_of_kind(node, &["range_clause"]) {
            return Construct::ForEach(ForEach {
                targets: self.values(clause, "left"),
                iterable: field(clause, "right"),
                body: body.into_iter().collect(),
                tail: Vec::new(),
                scoped: false,
            });
        }

        if let Some(clause) = child_of_kind(node, &["for_clause"]) {
            let mut repeated = fields(clause, "condition");
            repeated.extend(body);
            repeated.extend(fields(clause, "update"));
            return Construct::Loop(Loop {
                setup: fields(clause, "initializer"),
                repeated,
                tail: Vec::new(),
            });
        }

        // `for cond { }` and `for { }`
        let mut repeated: Vec<Node<'t>> = named_children(node)
            .into_iter()
            .filter(|child| Some(*child) != body)
            .collect();
        repeated.extend(body);
        Construct::Loop(Loop {
            setup: Vec::new(),
            repeated,
            tail: Vec::new(),
        })
    }

    fn switch<'t>(&self, node: Node<'t>) -> Construct<'t> {
        let mut condition = fields(node, "initializer");
        condition.extend(fields(node, "alias"));
        condition.extend(fields(node, "value"));

        let mut exhaustive = false;
        let mut arms = Vec::new();
        for case in named_children(node) {
            match case.kind() {
                "expression_case" | "type_case" => arms.push(named_children(case)),
                "default_case" => {
                    exhaustive = true;
                    arms.push(named_children(case));
                }
                _ => {}
            }
        }

        Construct::Branch(Branch {
            condition,
            arms,
            exhaustive,
        })
    }
}

impl Default for GoGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar for GoGrammar {
    fn language_id(&self) -> &'static str {
        "go"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn language(&self) -> &Language {
        &self.language
    }

    fn is_identifier(&self, kind: &str) -> bool {
        matches!(kind, "identifier" | "field_identifier")
    }

    fn is_atomic(&self, kind: &str) -> bool {
        matches!(
            kind,
            "interpreted_string_literal" | "raw_string_literal" | "rune_literal"
        )
    }

    fn is_comment(&self, kind: &str) -> bool {
        kind == "comment"
    }

    fn member_access_kinds(&self) -> &'static [&'static str] {
        &["selector_expression"]
    }

    fn classify<'t>(&self, node: Node<'t>) -> Construct<'t> {
        match node.kind() {
            "var_spec" | "const_spec" => Construct::Bind(Binding {
                kind: BindingKind::Declaration,
                targets: fields(node, "name"),
                values: self.values(node, "value"),
            }),
            "short_var_declaration" => Construct::Bind(Binding {
                kind: BindingKind::Declaration,
                targets: self.values(node, "left"),
                values: self.values(node, "right"),
            }),
            "assignment_statement" => Construct::Bind(Binding {
                kind: match operator(node) {
                    Some(op) if is_compound_operator(op) => BindingKind::Compound,
                    _ => BindingKind::Assignment,
                },
                targets: self.values(node, "left"),
                values: self.values(node, "right"),
            }),
            "inc_statement" | "dec_statement" => match named_children(node).into_iter().next() {
                Some(operand) => Construct::Update(operand),
                None => Construct::Other,
            },
            "if_statement" => {
                let alternative = field(node, "alternative");
                Construct::Branch(Branch {
                    condition: field(node, "initializer")
                        .into_iter()
                        .chain(field(node, "condition"))
                        .collect(),
                    arms: vec![
                        field(node, "consequence").into_iter().collect(),
                        alternative.into_iter().collect(),
                    ],
                    exhaustive: alternative.is_some(),
                })
            }
            "expression_switch_statement" | "type_switch_statement" => self.switch(node),
            "for_statement" => self.for_statement(node),
            "function_declaration" | "method_declaration" => Construct::Function(Function {
                name: field(node, "name"),
                params: self.parameters(&[field(node, "receiver"), field(node, "parameters")]),
                body: field(node, "body").into_iter().collect(),
            }),
            "func_literal" => Construct::Function(Function {
                name: None,
                params: self.parameters(&[field(node, "parameters")]),
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
        let grammar = GoGrammar::new();
        let parsed = grammar.parse_source("test.go", source.as_bytes()).unwrap();
        let root = parsed.tree.root_node();
        let tokens = TokenIndex::from_tree(root, &parsed.source, &grammar);
        let result = DfgBuilder::new(&grammar, &tokens).build(root);
        (tokens, result)
    }

    fn indices_of(tokens: &TokenIndex, text: &str) -> Vec<usize> {
        tokens.iter().filter(|t| t.text == text).map(|t| t.index).collect()
    }

    const SUM: &str = r#"package main

func sum(n int) int {
	total := 0
	for i := 0; i < n; i++ {
		total += i
	}
	return total
}
"#;

    #[test]
    fn test_compound_assignment_in_loop() {
        let (tokens, result) = analyze(SUM);
        let totals = indices_of(&tokens, "total");
        let inner = result.edges_for("total").find(|e| e.index == totals[1]).unwrap();
        assert_eq!(inner.relation, Relation::ComputedFrom);
        assert!(inner.source_indices.contains(&totals[0]));
        assert!(inner.source_indices.contains(&totals[1]));
        assert!(inner.has_source_named("i"));
    }

    #[test]
    fn test_function_scope() {
        let (_, result) = analyze(SUM);
        assert!(result.state.contains_key("sum"));
        for local in ["n", "total", "i"] {
            assert!(!result.state.contains_key(local), "{local} leaked");
        }
    }

    #[test]
    fn test_range_targets() {
        let src = "package main\n\nfunc f(xs []int) {\n\tfor _, v := range xs {\n\t\tuse(v)\n\t}\n}\n";
        let (_, result) = analyze(src);
        let v = result.edges_for("v").next().unwrap();
        assert_eq!(v.relation, Relation::ComputedFrom);
        assert_eq!(v.source_names, vec!["xs"]);
    }

    #[test]
    fn test_switch_with_default_replaces_definition() {
        let src = r#"package main

func g(k int) int {
	var r int
	switch k {
	case 1:
		r = 10
	default:
		r = 20
	}
	return r
}
"#;
        let (tokens, result) = analyze(src);
        let rs = indices_of(&tokens, "r");
        let read = result.edges_for("r").find(|e| e.index == rs[3]).unwrap();
        assert_eq!(read.relation, Relation::ComesFrom);
        assert_eq!(read.source_indices, vec![rs[1], rs[2]]);
    }
}
