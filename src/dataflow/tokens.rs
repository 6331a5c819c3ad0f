//! Token index: leaf span -> (sequential index, literal text).

use std::collections::HashMap;

use tree_sitter::Node;

use super::{Grammar, Span};

/// One indexed leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub index: usize,
    pub text: String,
    pub span: Span,
}

/// Mapping from leaf spans to their position in the token sequence.
///
/// Built once per tree and read-only while the builder runs.
#[derive(Debug, Clone, Default)]
pub struct TokenIndex {
    tokens: Vec<Token>,
    by_span: HashMap<Span, usize>,
}

impl TokenIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every leaf of `root` in pre-order, left to right.
    ///
    /// Comments are dropped, grammar-declared atomic nodes (string literals)
    /// become a single token, and zero-width leaves are skipped.
    pub fn from_tree(root: Node, source: &[u8], grammar: &dyn Grammar) -> Self {
        let mut index = Self::new();
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            if grammar.is_comment(node.kind()) {
                continue;
            }

            if node.child_count() == 0 || grammar.is_atomic(node.kind()) {
                let span = Span::from_node(node);
                if span.is_empty() {
                    continue;
                }
                let text = String::from_utf8_lossy(source.get(node.byte_range()).unwrap_or(&[]))
                    .into_owned();
                index.push(span, text);
                continue;
            }

            // reversed so the leftmost child is popped first
            let mut cursor = node.walk();
            let children: Vec<Node> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }

        index
    }

    /// Append a leaf. Returns its index, or `None` if the span is already indexed.
    pub fn push(&mut self, span: Span, text: String) -> Option<usize> {
        if self.by_span.contains_key(&span) {
            return None;
        }
        let index = self.tokens.len();
        self.by_span.insert(span, index);
        self.tokens.push(Token { index, text, span });
        Some(index)
    }

    pub fn get(&self, span: &Span) -> Option<&Token> {
        self.by_span.get(span).map(|&i| &self.tokens[i])
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn contains_index(&self, index: usize) -> bool {
        index < self.tokens.len()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    /// Token texts in index order.
    pub fn code_tokens(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.text.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::languages::get_grammar;

    fn index_of(source: &str, language: &str) -> TokenIndex {
        let grammar = get_grammar(language).unwrap();
        let parsed = grammar.parse_source("test", source.as_bytes()).unwrap();
        TokenIndex::from_tree(parsed.tree.root_node(), &parsed.source, grammar)
    }

    #[test]
    fn test_python_tokens_in_order() {
        let index = index_of("x = a + 1\n", "python");
        assert_eq!(index.code_tokens(), vec!["x", "=", "a", "+", "1"]);
        assert_eq!(index.token(2).unwrap().text, "a");
    }

    #[test]
    fn test_strings_are_single_tokens_and_comments_dropped() {
        let index = index_of("s = \"hello world\"  # greeting\n", "python");
        assert_eq!(index.code_tokens(), vec!["s", "=", "\"hello world\""]);
    }

    #[test]
    fn test_lookup_by_span() {
        let index = index_of("int y = 2;", "java");
        for token in index.iter() {
            assert_eq!(index.get(&token.span).map(|t| t.index), Some(token.index));
        }
    }

    #[test]
    fn test_push_rejects_duplicate_span() {
        let mut index = TokenIndex::new();
        let span = Span {
            start: crate::dataflow::Position { row: 0, column: 0 },
            end: crate::dataflow::Position { row: 0, column: 1 },
        };
        assert_eq!(index.push(span, "a".to_string()), Some(0));
        assert_eq!(index.push(span, "b".to_string()), None);
        assert_eq!(index.len(), 1);
    }
}
