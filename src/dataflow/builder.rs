//! Recursive data-flow builder.
//!
//! Walks a syntax tree node by node, threading a [`VariableState`] through
//! the traversal and emitting [`DfgEdge`]s. Grammars decide which
//! [`Construct`] a node is; everything here is language-agnostic.
//!
//! Two traversal modes:
//! - `visit` handles statements. A bare identifier read in this mode
//!   (a condition, a call statement, a `return`) emits a `comesFrom` edge to
//!   its live definitions.
//! - `resolve` handles the value side of a binding. Reads only contribute
//!   (name, index) sources; the enclosing binding emits the edge.

use std::collections::{HashMap, HashSet};

use tracing::debug;
use tree_sitter::Node;

use super::syntax::children;
use super::{
    Binding, BindingKind, Branch, Construct, DfgEdge, DfgError, DfgResult, ForEach, Function,
    Grammar, Loop, Relation, Source, Span, Token, TokenIndex, VariableState,
};

/// Default cap on syntax nesting before a subtree is truncated.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Loop bodies are analyzed this many times so reads before a same-iteration
/// write see the previous iteration's definition.
pub const LOOP_PASSES: usize = 2;

/// How a leaf participates in data flow.
enum Leaf<'a> {
    Name(&'a Token),
    Literal(&'a Token),
    Ignored,
}

/// Builds the data-flow graph of one tree.
pub struct DfgBuilder<'a> {
    grammar: &'a dyn Grammar,
    tokens: &'a TokenIndex,
    max_depth: usize,
    edges: Vec<DfgEdge>,
    degradations: Vec<DfgError>,
}

impl<'a> DfgBuilder<'a> {
    pub fn new(grammar: &'a dyn Grammar, tokens: &'a TokenIndex) -> Self {
        Self {
            grammar,
            tokens,
            max_depth: DEFAULT_MAX_DEPTH,
            edges: Vec::new(),
            degradations: Vec::new(),
        }
    }

    /// Set the nesting depth past which subtrees are skipped.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Analyze `root` starting from an empty state.
    pub fn build(self, root: Node) -> DfgResult {
        self.build_with_state(root, VariableState::new())
    }

    /// Analyze `root` starting from `state`, e.g. the final state of the
    /// previous statement sequence.
    pub fn build_with_state(mut self, root: Node, state: VariableState) -> DfgResult {
        let state = self.visit(root, state, 0);

        // loop passes revisit the same subtrees
        let mut seen = HashSet::new();
        self.degradations.retain(|d| seen.insert(d.clone()));

        if !self.degradations.is_empty() {
            debug!(
                language = self.grammar.language_id(),
                count = self.degradations.len(),
                "data-flow analysis degraded"
            );
        }

        DfgResult {
            edges: self.edges,
            state: state.into_map(),
            degradations: self.degradations,
        }
    }

    fn visit<'t>(&mut self, node: Node<'t>, state: VariableState, depth: usize) -> VariableState {
        if !self.within_depth(node, depth) || self.grammar.is_comment(node.kind()) {
            return state;
        }
        if self.is_token(node) {
            return self.read(node, state);
        }

        match self.grammar.classify(node) {
            Construct::Bind(binding) => self.bind(binding, state, depth).0,
            Construct::Update(operand) => self.update(operand, state, depth).0,
            Construct::Branch(branch) => self.branch(branch, state, depth),
            Construct::ForEach(each) => self.for_each(each, state, depth),
            Construct::Loop(repeat) => self.repeat(repeat, state, depth),
            Construct::Function(function) => self.function(function, state, depth),
            Construct::Ordered { first, rest } => {
                self.visit_all(first.into_iter().chain(rest), state, depth)
            }
            Construct::Other => self.visit_all(children(node), state, depth),
        }
    }

    fn visit_all<'t, I>(&mut self, nodes: I, mut state: VariableState, depth: usize) -> VariableState
    where
        I: IntoIterator<Item = Node<'t>>,
    {
        for node in nodes {
            state = self.visit(node, state, depth + 1);
        }
        state
    }

    /// A read outside any binding: link it to its live definitions.
    fn read(&mut self, node: Node, mut state: VariableState) -> VariableState {
        let Leaf::Name(token) = self.leaf(node) else {
            return state;
        };

        match state.get(&token.text).map(|defs| defs.to_vec()) {
            Some(defs) if defs != [token.index] => {
                let sources = sources_of(&token.text, &defs);
                self.edges.push(DfgEdge::new(
                    &token.text,
                    token.index,
                    Relation::ComesFrom,
                    &sources,
                ));
            }
            Some(_) => {}
            // first sighting of a free name acts as its definition
            None => state.bind(&token.text, token.index),
        }
        state
    }

    /// Collect the (name, index) sources a value expression reads.
    fn resolve<'t>(
        &mut self,
        node: Node<'t>,
        state: &mut VariableState,
        depth: usize,
        out: &mut Vec<Source>,
    ) {
        if !self.within_depth(node, depth) || self.grammar.is_comment(node.kind()) {
            return;
        }

        if self.is_token(node) {
            match self.leaf(node) {
                Leaf::Name(token) => {
                    if let Some(defs) = state.get(&token.text) {
                        out.extend(sources_of(&token.text, defs));
                    } else {
                        state.bind(&token.text, token.index);
                        out.push(source(token));
                    }
                }
                Leaf::Literal(token) => out.push(source(token)),
                Leaf::Ignored => {}
            }
            return;
        }

        match self.grammar.classify(node) {
            // nested bindings (`a = b = c`, walrus) define first, then
            // contribute the freshly defined names
            Construct::Bind(binding) => {
                let (next, defined) = self.bind(binding, std::mem::take(state), depth);
                *state = next;
                out.extend(defined);
            }
            Construct::Update(operand) => {
                let (next, defined) = self.update(operand, std::mem::take(state), depth);
                *state = next;
                out.extend(defined);
            }
            Construct::Function(function) => {
                *state = self.function(function, std::mem::take(state), depth);
            }
            // comprehension clauses define their targets for the element
            Construct::ForEach(each) => {
                *state = self.for_each(each, std::mem::take(state), depth);
            }
            Construct::Ordered { first, rest } => {
                for child in first.into_iter().chain(rest) {
                    self.resolve(child, state, depth + 1, out);
                }
            }
            // operators, calls, and branches or loops used as a value
            _ => {
                for child in children(node) {
                    self.resolve(child, state, depth + 1, out);
                }
            }
        }
    }

    fn bind<'t>(
        &mut self,
        binding: Binding<'t>,
        mut state: VariableState,
        depth: usize,
    ) -> (VariableState, Vec<Source>) {
        // every value is resolved before any target is rebound, so
        // `a, b = b, a` swaps
        let mut resolved = Vec::with_capacity(binding.values.len());
        for value in &binding.values {
            let mut sources = Vec::new();
            self.resolve(*value, &mut state, depth + 1, &mut sources);
            resolved.push((sources, self.is_reference(*value, depth + 1)));
        }

        let paired = binding.targets.len() > 1 && binding.targets.len() == resolved.len();
        let merged: Vec<Source> = resolved.iter().flat_map(|(s, _)| s.clone()).collect();
        let single_reference = resolved.len() == 1 && resolved[0].1;

        let mut defined: Vec<&'a Token> = Vec::new();
        for (i, target) in binding.targets.iter().enumerate() {
            let (sources, reference) = if paired {
                (resolved[i].0.clone(), resolved[i].1)
            } else {
                (merged.clone(), single_reference)
            };
            let relation = if reference && binding.kind != BindingKind::Compound {
                Relation::ComesFrom
            } else {
                Relation::ComputedFrom
            };

            let mut tokens = Vec::new();
            self.target_tokens(*target, depth + 1, &mut tokens);
            for token in tokens {
                let mut sources = sources.clone();
                if binding.kind == BindingKind::Compound {
                    if let Some(defs) = state.get(&token.text) {
                        sources.extend(sources_of(&token.text, defs));
                    }
                }
                self.edges
                    .push(DfgEdge::new(&token.text, token.index, relation, &sources));
                defined.push(token);
            }
        }

        for token in &defined {
            state.bind(&token.text, token.index);
        }
        (state, defined.into_iter().map(source).collect())
    }

    fn update<'t>(
        &mut self,
        operand: Node<'t>,
        mut state: VariableState,
        depth: usize,
    ) -> (VariableState, Vec<Source>) {
        let mut tokens = Vec::new();
        self.target_tokens(operand, depth + 1, &mut tokens);

        let mut defined = Vec::with_capacity(tokens.len());
        for token in tokens {
            let sources = match state.get(&token.text) {
                Some(defs) => sources_of(&token.text, defs),
                None => vec![source(token)],
            };
            self.edges.push(DfgEdge::new(
                &token.text,
                token.index,
                Relation::ComputedFrom,
                &sources,
            ));
            state.bind(&token.text, token.index);
            defined.push(source(token));
        }
        (state, defined)
    }

    fn branch<'t>(&mut self, branch: Branch<'t>, state: VariableState, depth: usize) -> VariableState {
        let state = self.visit_all(branch.condition, state, depth);

        let mut outcomes = Vec::with_capacity(branch.arms.len() + 1);
        for arm in branch.arms {
            outcomes.push(self.visit_all(arm, state.clone(), depth));
        }
        // without an else/default the incoming definitions may survive
        if !branch.exhaustive || outcomes.is_empty() {
            outcomes.push(state);
        }
        VariableState::merge(outcomes)
    }

    fn for_each<'t>(&mut self, each: ForEach<'t>, mut state: VariableState, depth: usize) -> VariableState {
        let start = self.edges.len();

        let mut outer = Vec::new();
        if each.scoped {
            let mut tokens = Vec::new();
            for target in &each.targets {
                self.target_tokens(*target, depth + 1, &mut tokens);
            }
            for token in tokens {
                let defs = state.get(&token.text).map(|defs| defs.to_vec());
                outer.push((token.text.as_str(), defs));
            }
        }

        for _ in 0..LOOP_PASSES {
            let mut sources = Vec::new();
            if let Some(iterable) = each.iterable {
                self.resolve(iterable, &mut state, depth + 1, &mut sources);
            }

            let mut tokens = Vec::new();
            for target in &each.targets {
                self.target_tokens(*target, depth + 1, &mut tokens);
            }
            for token in &tokens {
                self.edges.push(DfgEdge::new(
                    &token.text,
                    token.index,
                    Relation::ComputedFrom,
                    &sources,
                ));
            }
            for token in tokens {
                state.bind(&token.text, token.index);
            }

            state = self.visit_all(each.body.iter().copied(), state, depth);
        }

        self.fold_loop_edges(start);
        let mut state = self.visit_all(each.tail, state, depth);

        for (name, defs) in outer {
            state.restore(name, defs);
        }
        state
    }

    fn repeat<'t>(&mut self, repeat: Loop<'t>, state: VariableState, depth: usize) -> VariableState {
        let mut state = self.visit_all(repeat.setup, state, depth);

        let start = self.edges.len();
        for _ in 0..LOOP_PASSES {
            state = self.visit_all(repeat.repeated.iter().copied(), state, depth);
        }
        self.fold_loop_edges(start);

        self.visit_all(repeat.tail, state, depth)
    }

    fn function<'t>(
        &mut self,
        function: Function<'t>,
        mut state: VariableState,
        depth: usize,
    ) -> VariableState {
        if let Some(name) = function.name {
            let mut tokens = Vec::new();
            self.target_tokens(name, depth + 1, &mut tokens);
            for token in tokens {
                state.bind(&token.text, token.index);
            }
        }

        // parameters and locals never escape into `state`
        let mut scope = VariableState::new();
        for param in function.params {
            let binding = Binding {
                kind: BindingKind::Declaration,
                targets: vec![param.name],
                values: param.default.into_iter().collect(),
            };
            scope = self.bind(binding, scope, depth).0;
        }
        self.visit_all(function.body, scope, depth);

        state
    }

    /// Merge the edges emitted by the repeated passes of a loop: one edge per
    /// (variable, index, relation), sources unioned, first position kept.
    fn fold_loop_edges(&mut self, start: usize) {
        let raw = self.edges.split_off(start);
        let mut folded: Vec<DfgEdge> = Vec::with_capacity(raw.len());
        let mut slots: HashMap<(String, usize, Relation), usize> = HashMap::new();

        for edge in raw {
            let key = (edge.variable.clone(), edge.index, edge.relation);
            match slots.get(&key) {
                Some(&slot) => {
                    let mut sources = folded[slot].sources();
                    sources.extend(edge.sources());
                    folded[slot] = DfgEdge::new(&edge.variable, edge.index, edge.relation, &sources);
                }
                None => {
                    slots.insert(key, folded.len());
                    folded.push(edge);
                }
            }
        }

        self.edges.extend(folded);
    }

    /// Identifier tokens inside a binding target.
    fn target_tokens<'t>(&mut self, node: Node<'t>, depth: usize, out: &mut Vec<&'a Token>) {
        if !self.within_depth(node, depth) || self.grammar.is_comment(node.kind()) {
            return;
        }
        if self.is_token(node) {
            if let Leaf::Name(token) = self.leaf(node) {
                out.push(token);
            }
            return;
        }
        for child in children(node) {
            self.target_tokens(child, depth + 1, out);
        }
    }

    /// Whether a value is a plain identifier or member-access chain.
    fn is_reference(&self, node: Node, depth: usize) -> bool {
        if self.is_token(node) {
            return self.grammar.is_identifier(node.kind());
        }
        self.is_chain(node, depth)
    }

    /// Chains nested past the depth cap are not references; their resolve
    /// was truncated too.
    fn is_chain(&self, node: Node, depth: usize) -> bool {
        if depth > self.max_depth {
            return false;
        }
        if self.is_token(node) {
            return self.grammar.is_identifier(node.kind())
                || !node.is_named()
                || matches!(node.kind(), "this" | "self" | "super" | "base");
        }
        self.grammar.member_access_kinds().contains(&node.kind())
            && children(node)
                .into_iter()
                .all(|child| self.is_chain(child, depth + 1))
    }

    fn is_token(&self, node: Node) -> bool {
        node.child_count() == 0 || self.grammar.is_atomic(node.kind())
    }

    fn leaf(&mut self, node: Node) -> Leaf<'a> {
        let tokens = self.tokens;
        let span = Span::from_node(node);

        let Some(token) = tokens.get(&span) else {
            if !span.is_empty() {
                self.degrade(DfgError::MalformedSpan(span));
            }
            return Leaf::Ignored;
        };

        // keywords and punctuation have their own text as kind
        if token.text.is_empty() || token.text == node.kind() {
            return Leaf::Ignored;
        }
        if self.grammar.is_identifier(node.kind()) {
            if self.grammar.is_label(node) {
                Leaf::Ignored
            } else {
                Leaf::Name(token)
            }
        } else {
            Leaf::Literal(token)
        }
    }

    fn within_depth(&mut self, node: Node, depth: usize) -> bool {
        if depth <= self.max_depth {
            return true;
        }
        let span = Span::from_node(node);
        debug!(kind = node.kind(), %span, limit = self.max_depth, "subtree truncated");
        self.degrade(DfgError::RecursionLimitExceeded {
            limit: self.max_depth,
            kind: node.kind().to_string(),
            span,
        });
        false
    }

    fn degrade(&mut self, error: DfgError) {
        self.degradations.push(error);
    }
}

fn source(token: &Token) -> Source {
    Source {
        name: token.text.clone(),
        index: token.index,
    }
}

fn sources_of(name: &str, defs: &[usize]) -> Vec<Source> {
    defs.iter()
        .map(|&index| Source {
            name: name.to_string(),
            index,
        })
        .collect()
}
