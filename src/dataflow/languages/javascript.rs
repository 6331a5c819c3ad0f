//! JavaScript grammar table.

use tree_sitter::{Language, Node};

use crate::dataflow::syntax::{field, first_fields, named_children, ForClauses};
use crate::dataflow::{
    Binding, BindingKind, Branch, Construct, ForEach, Function, Grammar, Loop, Parameter,
};

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "generator_function_declaration",
    "method_definition",
];

pub struct JavaScriptGrammar {
    language: Language,
}

impl JavaScriptGrammar {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_javascript::LANGUAGE.into(),
        }
    }

    fn parameters<'t>(&self, params: Vec<Node<'t>>) -> Vec<Parameter<'t>> {
        params
            .into_iter()
            .flat_map(|params| {
                // `x => x + 1` has a bare identifier
                if params.kind() == "formal_parameters" {
                    named_children(params)
                } else {
                    vec![params]
                }
            })
            .filter(|param| param.kind() != "comment")
            .map(|param| match param.kind() {
                "assignment_pattern" => Parameter {
                    name: field(param, "left").unwrap_or(param),
                    default: field(param, "right"),
                },
                _ => Parameter {
                    name: param,
                    default: None,
                },
            })
            .collect()
    }

    fn switch<'t>(&self, node: Node<'t>) -> Construct<'t> {
        let cases = field(node, "body").map(named_children).unwrap_or_default();
        let exhaustive = cases.iter().any(|case| case.kind() == "switch_default");
        Construct::Branch(Branch {
            condition: field(node, "value").into_iter().collect(),
            arms: cases
                .into_iter()
                .filter(|case| matches!(case.kind(), "switch_case" | "switch_default"))
                .map(named_children)
                .collect(),
            exhaustive,
        })
    }
}

impl Default for JavaScriptGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar for JavaScriptGrammar {
    fn language_id(&self) -> &'static str {
        "javascript"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn language(&self) -> &Language {
        &self.language
    }

    fn is_identifier(&self, kind: &str) -> bool {
        matches!(
            kind,
            "identifier"
                | "property_identifier"
                | "shorthand_property_identifier"
                | "shorthand_property_identifier_pattern"
        )
    }

    fn is_atomic(&self, kind: &str) -> bool {
        matches!(kind, "string" | "regex")
    }

    fn is_comment(&self, kind: &str) -> bool {
        kind == "comment"
    }

    fn member_access_kinds(&self) -> &'static [&'static str] {
        &["member_expression"]
    }

    /// Object literal keys: `{ key: value }`.
    fn is_label(&self, node: Node) -> bool {
        node.parent()
            .filter(|parent| parent.kind() == "pair")
            .and_then(|parent| field(parent, "key"))
            == Some(node)
    }

    fn classify<'t>(&self, node: Node<'t>) -> Construct<'t> {
        match node.kind() {
            "variable_declarator" => Construct::Bind(Binding {
                kind: BindingKind::Declaration,
                targets: field(node, "name").into_iter().collect(),
                values: field(node, "value").into_iter().collect(),
            }),
            "assignment_expression" => Construct::Bind(Binding {
                kind: BindingKind::Assignment,
                targets: field(node, "left").into_iter().collect(),
                values: field(node, "right").into_iter().collect(),
            }),
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
            "if_statement" => {
                let alternative = field(node, "alternative");
                Construct::Branch(Branch {
                    condition: field(node, "condition").into_iter().collect(),
                    arms: vec![
                        field(node, "consequence").into_iter().collect(),
                        alternative.map(named_children).unwrap_or_default(),
                    ],
                    exhaustive: alternative.is_some(),
                })
            }
            "switch_statement" => self.switch(node),
            "for_statement" => {
                let clauses = ForClauses::locate(node);
                Construct::Loop(Loop {
                    repeated: clauses.repeated(),
                    setup: clauses.init,
                    tail: Vec::new(),
                })
            }
            // `for (const k in o)` and `for (const v of xs)`
            "for_in_statement" => Construct::ForEach(ForEach {
                targets: field(node, "left").into_iter().collect(),
                iterable: field(node, "right"),
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
            "arrow_function" => Construct::Function(Function {
                name: None,
                params: self.parameters(first_fields(node, &["parameters", "parameter"])),
                body: field(node, "body").into_iter().collect(),
            }),
            kind if FUNCTION_KINDS.contains(&kind) => Construct::Function(Function {
                name: field(node, "name"),
                params: self.parameters(field(node, "parameters").into_iter().collect()),
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
        let grammar = JavaScriptGrammar::new();
        let parsed = grammar.parse_source("test.js", source.as_bytes()).unwrap();
        let root = parsed.tree.root_node();
        let tokens = TokenIndex::from_tree(root, &parsed.source, &grammar);
        let result = DfgBuilder::new(&grammar, &tokens).build(root);
        (tokens, result)
    }

    fn indices_of(tokens: &TokenIndex, text: &str) -> Vec<usize> {
        tokens.iter().filter(|t| t.text == text).map(|t| t.index).collect()
    }

    #[test]
    fn test_loop_accumulator() {
        let src = "let total = 0;\nfor (let i = 0; i < 3; i++) { total += i; }\nconst r = total;\n";
        let (tokens, result) = analyze(src);
        let totals = indices_of(&tokens, "total");

        let inner = result.edges_for("total").find(|e| e.index == totals[1]).unwrap();
        assert_eq!(inner.relation, Relation::ComputedFrom);
        assert!(inner.source_indices.contains(&totals[0]));
        assert!(inner.source_indices.contains(&totals[1]));

        let r = result.edges_for("r").next().unwrap();
        assert_eq!(r.relation, Relation::ComesFrom);
        assert_eq!(r.source_indices, vec![totals[1]]);
    }

    #[test]
    fn test_arrow_function_parameters_are_scoped() {
        let (_, result) = analyze("const f = (a, b = c) => a + b;\n");
        assert!(result.state.contains_key("f"));
        for name in ["a", "b", "c"] {
            assert!(!result.state.contains_key(name), "{name} leaked");
        }
    }

    #[test]
    fn test_object_keys_are_labels() {
        let (tokens, result) = analyze("const o = { k: v };\n");
        let o = result.edges_for("o").next().unwrap();
        assert_eq!(o.relation, Relation::ComputedFrom);
        assert_eq!(o.source_names, vec!["v"]);
        assert!(!result.state.contains_key("k"));
        assert_eq!(indices_of(&tokens, "k").len(), 1);
    }

    #[test]
    fn test_for_of_target() {
        let (_, result) = analyze("for (const v of items) { use(v); }\n");
        let v = result.edges_for("v").next().unwrap();
        assert_eq!(v.relation, Relation::ComputedFrom);
        assert_eq!(v.source_names, vec!["items"]);
    }
}
