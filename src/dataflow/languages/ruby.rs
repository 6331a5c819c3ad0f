//! Ruby grammar table.

use tree_sitter::{Language, Node};

use crate::dataflow::syntax::{field, list_items, named_children, named_children_except};
use crate::dataflow::{
    Binding, BindingKind, Branch, Construct, ForEach, Function, Grammar, Loop, Parameter,
};

const LIST_KINDS: &[&str] = &["left_assignment_list", "right_assignment_list"];

pub struct RubyGrammar {
    language: Language,
}

impl RubyGrammar {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_ruby::LANGUAGE.into(),
        }
    }

    fn parameters<'t>(&self, params: Option<Node<'t>>) -> Vec<Parameter<'t>> {
        params
            .map(named_children)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|param| match param.kind() {
                "identifier" | "destructured_parameter" => Some(Parameter {
                    name: param,
                    default: None,
                }),
                "optional_parameter" | "keyword_parameter" => {
                    field(param, "name").map(|name| Parameter {
                        name,
                        default: field(param, "value"),
                    })
                }
                "splat_parameter" | "hash_splat_parameter" | "block_parameter" => {
                    field(param, "name").map(|name| Parameter {
                        name,
                        default: None,
                    })
                }
                _ => None,
            })
            .collect()
    }

    /// `def name(params) ... end`; older grammars put statements directly
    /// under the method node.
    fn method<'t>(&self, node: Node<'t>) -> Construct<'t> {
        let name = field(node, "name");
        let params = field(node, "parameters");
        let body = match field(node, "body") {
            Some(body) => vec![body],
            None => {
                let skip: Vec<Node<'t>> = name
                    .into_iter()
                    .chain(params)
                    .chain(field(node, "object"))
                    .collect();
                named_children_except(node, &skip)
            }
        };

        Construct::Function(Function {
            name,
            params: self.parameters(params),
            body,
        })
    }

    /// Statements of a `{ }` or `do ... end` block.
    fn block_body<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        match field(node, "body") {
            Some(body) => vec![body],
            None => {
                let params: Vec<Node<'t>> = field(node, "parameters").into_iter().collect();
                named_children_except(node, &params)
            }
        }
    }

    fn case<'t>(&self, node: Node<'t>) -> Construct<'t> {
        let mut exhaustive = false;
        let mut arms = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "when" => arms.push(named_children(child)),
                "else" => {
                    exhaustive = true;
                    arms.push(named_children(child));
                }
                _ => {}
            }
        }
        Construct::Branch(Branch {
            condition: field(node, "value").into_iter().collect(),
            arms,
            exhaustive,
        })
    }
}

impl Default for RubyGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar for RubyGrammar {
    fn language_id(&self) -> &'static str {
        "ruby"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["rb"]
    }

    fn language(&self) -> &Language {
        &self.language
    }

    fn is_identifier(&self, kind: &str) -> bool {
        matches!(
            kind,
            "identifier" | "instance_variable" | "class_variable" | "global_variable" | "constant"
        )
    }

    fn is_atomic(&self, kind: &str) -> bool {
        matches!(kind, "string" | "character")
    }

    fn is_comment(&self, kind: &str) -> bool {
        kind == "comment"
    }

    /// `obj.attr` without arguments reads like a field.
    fn member_access_kinds(&self) -> &'static [&'static str] {
        &["call"]
    }

    fn classify<'t>(&self, node: Node<'t>) -> Construct<'t> {
        match node.kind() {
            "assignment" => Construct::Bind(Binding {
                kind: BindingKind::Assignment,
                targets: field(node, "left")
                    .map(|left| list_items(left, LIST_KINDS))
                    .unwrap_or_default(),
                values: field(node, "right")
                    .map(|right| list_items(right, LIST_KINDS))
                    .unwrap_or_default(),
            }),
            "operator_assignment" => Construct::Bind(Binding {
                kind: BindingKind::Compound,
                targets: field(node, "left").into_iter().collect(),
                values: field(node, "right").into_iter().collect(),
            }),
            // `elsif` chains nest, so an `elsif` without `else` stays
            // non-exhaustive at its own level
            "if" | "unless" | "elsif" => {
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
            "if_modifier" | "unless_modifier" => Construct::Branch(Branch {
                condition: field(node, "condition").into_iter().collect(),
                arms: vec![field(node, "body").into_iter().collect()],
                exhaustive: false,
            }),
            "while" | "until" => Construct::Loop(Loop {
                setup: Vec::new(),
                repeated: field(node, "condition")
                    .into_iter()
                    .chain(field(node, "body"))
                    .collect(),
                tail: Vec::new(),
            }),
            "while_modifier" | "until_modifier" => Construct::Loop(Loop {
                setup: Vec::new(),
                repeated: field(node, "condition")
                    .into_iter()
                    .chain(field(node, "body"))
                    .collect(),
                tail: Vec::new(),
            }),
            "for" => Construct::ForEach(ForEach {
                targets: field(node, "pattern").into_iter().collect(),
                iterable: field(node, "value"),
                body: field(node, "body").into_iter().collect(),
                tail: Vec::new(),
                scoped: false,
            }),
            "case" => self.case(node),
            "method" | "singleton_method" => self.method(node),
            // a block runs any number of times against the enclosing
            // variables; only its parameters are local
            "block" | "do_block" => Construct::ForEach(ForEach {
                targets: self
                    .parameters(field(node, "parameters"))
                    .into_iter()
                    .map(|param| param.name)
                    .collect(),
                iterable: None,
                body: self.block_body(node),
                tail: Vec::new(),
                scoped: true,
            }),
            "lambda" => Construct::Function(Function {
                name: None,
                params: self.parameters(field(node, "parameters")),
                body: match field(node, "body") {
                    Some(body) if matches!(body.kind(), "block" | "do_block") => {
                        self.block_body(body)
                    }
                    body => body.into_iter().collect(),
                },
            }),
            _ => Construct::Other,
        }
    }
}
