//! Graph assembly: turns raw builder edges into the final edge list.

use std::collections::HashSet;

use super::DfgEdge;

/// Normalizes raw edges.
///
/// Edges without sources are dropped. With `dedupe` on, an edge repeating
/// the (variable, index, sources) of an earlier one is dropped too, so the
/// first occurrence keeps its traversal position.
#[derive(Debug, Clone, Copy)]
pub struct Assembler {
    pub dedupe: bool,
}

impl Default for Assembler {
    fn default() -> Self {
        Self { dedupe: true }
    }
}

impl Assembler {
    pub fn new(dedupe: bool) -> Self {
        Self { dedupe }
    }

    pub fn assemble(&self, raw: &[DfgEdge]) -> Vec<DfgEdge> {
        let mut seen: HashSet<(&str, usize, &[usize], &[String])> = HashSet::new();
        raw.iter()
            .filter(|edge| edge.has_sources())
            .filter(|edge| {
                !self.dedupe
                    || seen.insert((
                        edge.variable.as_str(),
                        edge.index,
                        edge.source_indices.as_slice(),
                        edge.source_names.as_slice(),
                    ))
            })
            .cloned()
            .collect()
    }
}

/// Assemble with the default settings.
pub fn assemble(raw: &[DfgEdge]) -> Vec<DfgEdge> {
    Assembler::default().assemble(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::{Relation, Source};

    fn edge(variable: &str, index: usize, sources: &[(&str, usize)]) -> DfgEdge {
        let sources: Vec<Source> = sources
            .iter()
            .map(|(name, index)| Source {
                name: name.to_string(),
                index: *index,
            })
            .collect();
        DfgEdge::new(variable, index, Relation::ComputedFrom, &sources)
    }

    #[test]
    fn test_drops_empty_sources() {
        let raw = vec![edge("x", 0, &[]), edge("y", 4, &[("x", 0)])];
        let out = assemble(&raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].variable, "y");
    }

    #[test]
    fn test_dedupes_keeping_first_position() {
        let raw = vec![
            edge("a", 2, &[("b", 0)]),
            edge("c", 5, &[("a", 2)]),
            edge("a", 2, &[("b", 0)]),
        ];
        let out = assemble(&raw);
        assert_eq!(out, vec![raw[0].clone(), raw[1].clone()]);
    }

    #[test]
    fn test_idempotent() {
        let raw = vec![
            edge("a", 2, &[("b", 0)]),
            edge("a", 2, &[("b", 0)]),
            edge("z", 9, &[]),
            edge("a", 7, &[("a", 2)]),
        ];
        let once = assemble(&raw);
        assert_eq!(assemble(&once), once);
    }

    #[test]
    fn test_dedupe_disabled_keeps_repeats() {
        let raw = vec![edge("a", 2, &[("b", 0)]), edge("a", 2, &[("b", 0)])];
        assert_eq!(Assembler::new(false).assemble(&raw).len(), 2);
    }
}
