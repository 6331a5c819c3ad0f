//! Edge and result structures produced by the data-flow builder.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::DfgError;

/// A row/column position inside a source file (both 0-indexed, as tree-sitter reports them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl From<tree_sitter::Point> for Position {
    fn from(point: tree_sitter::Point) -> Self {
        Self {
            row: point.row,
            column: point.column,
        }
    }
}

/// Start/end positions of a syntax node. This is the key of the token index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        Self {
            start: node.start_position().into(),
            end: node.end_position().into(),
        }
    }

    /// Whether the span covers no text (tree-sitter MISSING nodes).
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 1-indexed for humans
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.row + 1,
            self.start.column + 1,
            self.end.row + 1,
            self.end.column + 1
        )
    }
}

/// How a defined token relates to its sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// Direct copy of an existing value.
    #[serde(rename = "comesFrom")]
    ComesFrom,
    /// Value derived from an expression over the sources.
    #[serde(rename = "computedFrom")]
    ComputedFrom,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::ComesFrom => "comesFrom",
            Relation::ComputedFrom => "computedFrom",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One (name, token index) pair feeding a definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Source {
    pub name: String,
    pub index: usize,
}

/// A data-flow edge: `sources -> variable@index`.
///
/// `source_names` and `source_indices` are parallel lists, ordered by token index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DfgEdge {
    pub variable: String,
    pub index: usize,
    pub relation: Relation,
    pub source_names: Vec<String>,
    pub source_indices: Vec<usize>,
}

impl DfgEdge {
    /// Build an edge from a set of sources, normalizing their order.
    pub fn new(variable: &str, index: usize, relation: Relation, sources: &[Source]) -> Self {
        let mut sources = sources.to_vec();
        sources.sort_by(|a, b| (a.index, &a.name).cmp(&(b.index, &b.name)));
        sources.dedup();

        Self {
            variable: variable.to_string(),
            index,
            relation,
            source_names: sources.iter().map(|s| s.name.clone()).collect(),
            source_indices: sources.iter().map(|s| s.index).collect(),
        }
    }

    /// Whether this edge carries no information.
    pub fn has_sources(&self) -> bool {
        !self.source_indices.is_empty()
    }

    /// The sources as (name, index) pairs.
    pub fn sources(&self) -> Vec<Source> {
        self.source_names
            .iter()
            .zip(&self.source_indices)
            .map(|(name, &index)| Source {
                name: name.clone(),
                index,
            })
            .collect()
    }

    /// Whether `name` is among the source variables.
    pub fn has_source_named(&self, name: &str) -> bool {
        self.source_names.iter().any(|n| n == name)
    }
}

impl fmt::Display for DfgEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<String> = self
            .source_names
            .iter()
            .zip(&self.source_indices)
            .map(|(name, index)| format!("{}@{}", name, index))
            .collect();
        write!(
            f,
            "{}@{} {} [{}]",
            self.variable,
            self.index,
            self.relation,
            sources.join(", ")
        )
    }
}

/// Output of one builder run.
#[derive(Debug, Clone, Default)]
pub struct DfgResult {
    /// Raw edges in traversal order (not yet assembled).
    pub edges: Vec<DfgEdge>,
    /// Live definitions at the end of the traversal.
    pub state: BTreeMap<String, Vec<usize>>,
    /// Local recoveries (missing spans, truncated subtrees).
    pub degradations: Vec<DfgError>,
}

impl DfgResult {
    /// Edges defining the given variable name, in traversal order.
    pub fn edges_for<'a>(&'a self, variable: &'a str) -> impl Iterator<Item = &'a DfgEdge> + 'a {
        self.edges.iter().filter(move |e| e.variable == variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(name: &str, index: usize) -> Source {
        Source {
            name: name.to_string(),
            index,
        }
    }

    #[test]
    fn test_edge_sources_sorted_and_deduped() {
        let edge = DfgEdge::new(
            "x",
            9,
            Relation::ComputedFrom,
            &[src("b", 7), src("a", 3), src("b", 7)],
        );
        assert_eq!(edge.source_names, vec!["a", "b"]);
        assert_eq!(edge.source_indices, vec![3, 7]);
        assert!(edge.has_source_named("b"));
        assert!(!edge.has_source_named("x"));
    }

    #[test]
    fn test_relation_serializes_camel_case() {
        let json = serde_json::to_string(&Relation::ComesFrom).unwrap();
        assert_eq!(json, "\"comesFrom\"");
        let json = serde_json::to_string(&Relation::ComputedFrom).unwrap();
        assert_eq!(json, "\"computedFrom\"");
    }

    #[test]
    fn test_edge_display() {
        let edge = DfgEdge::new("y", 4, Relation::ComesFrom, &[src("x", 1)]);
        assert_eq!(edge.to_string(), "y@4 comesFrom [x@1]");
    }
}
