//! C# grammar table.

use tree_sitter::{Language, Node};

use crate::dataflow::syntax::{
    child_of_kind, children, field, first_fields, has_child_kind, is_compound_operator,
    named_after, named_before, named_children, operator, ForClauses,
};
use crate::dataflow::{
    Binding, BindingKind, Branch, Construct, ForEach, Function, Grammar, Loop, Parameter,
};

pub struct CSharpGrammar {
    language: Language,
}

impl CSharpGrammar {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_c_sharp::LANGUAGE.into(),
        }
    }

    /// Name of a declarator or parameter: the `name` field, else the first
    /// identifier.
    fn declared_name<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        field(node, "name").or_else(|| child_of_kind(node, &["identifier", "tuple_pattern"]))
    }

    /// Initializer after `=`, inline or wrapped in an `equals_value_clause`.
    fn initializer<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        if let Some(clause) = child_of_kind(node, &["equals_value_clause"]) {
            return named_children(clause);
        }
        named_after(node, "=")
    }

    fn parameters<'t>(&self, params: Option<Node<'t>>) -> Vec<Parameter<'t>> {
        let Some(params) = params else {
            return Vec::new();
        };
        // `x => x * 2`
        if params.kind() == "identifier" {
            return vec![Parameter {
                name: params,
                default: None,
            }];
        }

        named_children(params)
            .into_iter()
            .filter(|param| param.kind() == "parameter")
            .filter_map(|param| {
                self.declared_name(param).map(|name| Parameter {
                    name,
                    default: self.initializer(param).into_iter().next(),
                })
            })
            .collect()
    }

    fn switch<'t>(&self, node: Node<'t>) -> Construct<'t> {
        let body = field(node, "body").or_else(|| child_of_kind(node, &["switch_body"]));
        let mut condition = first_fields(node, &["value", "expression"]);
        if condition.is_empty() {
            condition = named_children(node)
                .into_iter()
                .filter(|child| Some(*child) != body)
                .collect();
        }

        let mut exhaustive = false;
        let mut arms = Vec::new();
        for section in body.map(named_children).unwrap_or_default() {
            if section.kind() != "switch_section" {
                continue;
            }
            if has_child_kind(section, "default")
                || child_of_kind(section, &["default_switch_label"]).is_some()
            {
                exhaustive = true;
            }
            arms.push(named_children(section));
        }

        Construct::Branch(Branch {
            condition,
            arms,
            exhaustive,
        })
    }

    fn update<'t>(&self, node: Node<'t>) -> Construct<'t> {
        let increments = children(node)
            .iter()
            .any(|child| matches!(child.kind(), "++" | "--"));
        match named_children(node).into_iter().next() {
            Some(operand) if increments => Construct::Update(operand),
            _ => Construct::Other,
        }
    }

    fn for_each<'t>(&self, node: Node<'t>) -> Construct<'t> {
        let (targets, iterable) = match (field(node, "left"), field(node, "right")) {
            (Some(left), right) => (vec![left], right),
            // no fields: `foreach (T x in xs)`, target is the last name before `in`
            (None, _) => {
                let before = named_before(node, "in");
                let target = before
                    .iter()
                    .rev()
                    .find(|n| matches!(n.kind(), "identifier" | "tuple_pattern"))
                    .copied();
                let after = named_after(node, "in");
                (target.into_iter().collect(), after.first().copied())
            }
        };

        Construct::ForEach(ForEach {
            targets,
            iterable,
            body: field(node, "body").into_iter().collect(),
            tail: Vec::new(),
            scoped: false,
        })
    }
}

impl Default for CSharpGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar for CSharpGrammar {
    fn language_id(&self) -> &'static str {
        "c_sharp"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["cs"]
    }

    fn language(&self) -> &Language {
        &self.language
    }

    fn is_identifier(&self, kind: &str) -> bool {
        kind == "identifier"
    }

    fn is_atomic(&self, kind: &str) -> bool {
        matches!(
            kind,
            "string_literal" | "verbatim_string_literal" | "raw_string_literal" | "character_literal"
        )
    }

    fn is_comment(&self, kind: &str) -> bool {
        kind == "comment"
    }

    fn member_access_kinds(&self) -> &'static [&'static str] {
        &["member_access_expression"]
    }

    fn classify<'t>(&self, node: Node<'t>) -> Construct<'t> {
        match node.kind() {
            "variable_declarator" => Construct::Bind(Binding {
                kind: BindingKind::Declaration,
                targets: self.declared_name(node).into_iter().collect(),
                values: self.initializer(node),
            }),
            "catch_declaration" => Construct::Bind(Binding {
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
            "postfix_unary_expression" | "prefix_unary_expression" => self.update(node),
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
            "switch_statement" => self.switch(node),
            "for_statement" => {
                let clauses = ForClauses::locate(node);
                Construct::Loop(Loop {
                    repeated: clauses.repeated(),
                    setup: clauses.init,
                    tail: Vec::new(),
                })
            }
            "foreach_statement" | "for_each_statement" => self.for_each(node),
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
            "method_declaration" | "constructor_declaration" | "local_function_statement" => {
                Construct::Function(Function {
                    name: field(node, "name"),
                    params: self.parameters(field(node, "parameters")),
                    body: field(node, "body").into_iter().collect(),
                })
            }
            "lambda_expression" => Construct::Function(Function {
                name: None,
                params: self.parameters(field(node, "parameters")),
                body: field(node, "body").into_iter().collect(),
            }),
            "anonymous_method_expression" => Construct::Function(Function {
                name: None,
                params: self.parameters(
                    field(node, "parameters").or_else(|| child_of_kind(node, &["parameter_list"])),
                ),
                body: child_of_kind(node, &["block"]).into_iter().collect(),
            }),
            _ => Construct::Other,
        }
    }
}
