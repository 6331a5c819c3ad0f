//! Python grammar table.

use tree_sitter::{Language, Node};

use crate::dataflow::syntax::{field, fields, list_items, named_children, named_children_except};
use crate::dataflow::{
    Binding, BindingKind, Branch, Construct, ForEach, Function, Grammar, Loop, Parameter,
};

/// Nodes holding several targets or values separated by commas.
const LIST_KINDS: &[&str] = &[
    "pattern_list",
    "expression_list",
    "tuple_pattern",
    "list_pattern",
    "tuple",
];

const COMPREHENSIONS: &[&str] = &[
    "list_comprehension",
    "set_comprehension",
    "dictionary_comprehension",
    "generator_expression",
];

pub struct PythonGrammar {
    language: Language,
}

impl PythonGrammar {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }

    fn assignment<'t>(&self, node: Node<'t>) -> Construct<'t> {
        let targets = field(node, "left")
            .map(|left| list_items(left, LIST_KINDS))
            .unwrap_or_default();
        match field(node, "right") {
            Some(right) => Construct::Bind(Binding {
                kind: BindingKind::Assignment,
                targets,
                values: list_items(right, LIST_KINDS),
            }),
            // `x: int` declares without a value
            None => Construct::Bind(Binding {
                kind: BindingKind::Declaration,
                targets,
                values: Vec::new(),
            }),
        }
    }

    fn if_statement<'t>(&self, node: Node<'t>) -> Construct<'t> {
        let mut arms = vec![field(node, "consequence").into_iter().collect::<Vec<_>>()];
        let mut exhaustive = false;

        for alternative in fields(node, "alternative") {
            match alternative.kind() {
                "elif_clause" => arms.push(
                    field(alternative, "condition")
                        .into_iter()
                        .chain(field(alternative, "consequence"))
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

    fn match_statement<'t>(&self, node: Node<'t>) -> Construct<'t> {
        let clauses = field(node, "body").map(named_children).unwrap_or_default();
        Construct::Branch(Branch {
            condition: fields(node, "subject"),
            arms: clauses
                .into_iter()
                .filter(|clause| clause.kind() == "case_clause")
                .map(named_children)
                .collect(),
            // a wildcard case is not detected
            exhaustive: false,
        })
    }

    fn parameters<'t>(&self, params: Option<Node<'t>>) -> Vec<Parameter<'t>> {
        let Some(params) = params else {
            return Vec::new();
        };

        named_children(params)
            .into_iter()
            .filter_map(|param| match param.kind() {
                "default_parameter" | "typed_default_parameter" => {
                    field(param, "name").map(|name| Parameter {
                        name,
                        default: field(param, "value"),
                    })
                }
                // `x: int`, `*args: str`
                "typed_parameter" => named_children(param)
                    .into_iter()
                    .next()
                    .map(|name| Parameter {
                        name,
                        default: None,
                    }),
                "identifier" | "list_splat_pattern" | "dictionary_splat_pattern"
                | "tuple_pattern" => Some(Parameter {
                    name: param,
                    default: None,
                }),
                _ => None,
            })
            .collect()
    }

    fn else_body<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        field(node, "alternative")
            .and_then(|clause| field(clause, "body"))
            .into_iter()
            .collect()
    }
}

impl Default for PythonGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar for PythonGrammar {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn language(&self) -> &Language {
        &self.language
    }

    fn is_identifier(&self, kind: &str) -> bool {
        kind == "identifier"
    }

    fn is_atomic(&self, kind: &str) -> bool {
        kind == "string"
    }

    fn is_comment(&self, kind: &str) -> bool {
        kind == "comment"
    }

    fn member_access_kinds(&self) -> &'static [&'static str] {
        &["attribute"]
    }

    fn is_label(&self, node: Node) -> bool {
        node.parent()
            .filter(|parent| parent.kind() == "keyword_argument")
            .and_then(|parent| field(parent, "name"))
            == Some(node)
    }

    fn classify<'t>(&self, node: Node<'t>) -> Construct<'t> {
        match node.kind() {
            "assignment" => self.assignment(node),
            "augmented_assignment" => Construct::Bind(Binding {
                kind: BindingKind::Compound,
                targets: field(node, "left").into_iter().collect(),
                values: field(node, "right").into_iter().collect(),
            }),
            "named_expression" => Construct::Bind(Binding {
                kind: BindingKind::Assignment,
                targets: field(node, "name").into_iter().collect(),
                values: field(node, "value").into_iter().collect(),
            }),
            // `with open(p) as fh`, `except E as e`
            "as_pattern" => {
                let alias = field(node, "alias");
                Construct::Bind(Binding {
                    kind: BindingKind::Assignment,
                    targets: alias.into_iter().collect(),
                    values: named_children_except(node, &alias.into_iter().collect::<Vec<_>>())
                        .into_iter()
                        .take(1)
                        .collect(),
                })
            }
            "if_statement" => self.if_statement(node),
            "match_statement" => self.match_statement(node),
            "for_statement" => Construct::ForEach(ForEach {
                targets: field(node, "left")
                    .map(|left| list_items(left, LIST_KINDS))
                    .unwrap_or_default(),
                iterable: field(node, "right"),
                body: field(node, "body").into_iter().collect(),
                tail: self.else_body(node),
                scoped: false,
            }),
            "for_in_clause" => Construct::ForEach(ForEach {
                targets: field(node, "left")
                    .map(|left| list_items(left, LIST_KINDS))
                    .unwrap_or_default(),
                iterable: field(node, "right"),
                body: Vec::new(),
                tail: Vec::new(),
                scoped: false,
            }),
            "while_statement" => Construct::Loop(Loop {
                setup: Vec::new(),
                repeated: field(node, "condition")
                    .into_iter()
                    .chain(field(node, "body"))
                    .collect(),
                tail: self.else_body(node),
            }),
            "function_definition" => Construct::Function(Function {
                name: field(node, "name"),
                params: self.parameters(field(node, "parameters")),
                body: field(node, "body").into_iter().collect(),
            }),
            "lambda" => Construct::Function(Function {
                name: None,
                params: self.parameters(field(node, "parameters")),
                body: field(node, "body").into_iter().collect(),
            }),
            kind if COMPREHENSIONS.contains(&kind) => {
                let body: Vec<Node<'t>> = field(node, "body").into_iter().collect();
                Construct::Ordered {
                    first: named_children_except(node, &body),
                    rest: body,
                }
            }
            _ => Construct::Other,
        }
    }
}
