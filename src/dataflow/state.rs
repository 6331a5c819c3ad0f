//! The builder's working memory of live definitions.

use std::collections::BTreeMap;

/// Maps a variable name to every token index currently considered a live
/// definition of it.
///
/// Entries are never removed. A new binding shadows the old indices for the
/// rest of the sequential code; control-flow merges union them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableState {
    defs: BTreeMap<String, Vec<usize>>,
}

impl VariableState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live definitions of `name`, sorted ascending.
    pub fn get(&self, name: &str) -> Option<&[usize]> {
        self.defs.get(name).map(|v| v.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Make `index` the only live definition of `name`.
    pub fn bind(&mut self, name: &str, index: usize) {
        self.defs.insert(name.to_string(), vec![index]);
    }

    /// Put `name` back to `defs`, or drop it when it had none. Used when a
    /// block-local name goes out of scope.
    pub fn restore(&mut self, name: &str, defs: Option<Vec<usize>>) {
        match defs {
            Some(defs) => {
                self.defs.insert(name.to_string(), defs);
            }
            None => {
                self.defs.remove(name);
            }
        }
    }

    /// Union several outgoing states into one, per name.
    pub fn merge<I>(states: I) -> Self
    where
        I: IntoIterator<Item = VariableState>,
    {
        let mut defs: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for state in states {
            for (name, indices) in state.defs {
                defs.entry(name).or_default().extend(indices);
            }
        }
        for indices in defs.values_mut() {
            indices.sort_unstable();
            indices.dedup();
        }
        Self { defs }
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(|k| k.as_str())
    }

    /// Copy of the table, for callers that chain analyses.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<usize>> {
        self.defs.clone()
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<usize>> {
        self.defs
    }
}

impl From<BTreeMap<String, Vec<usize>>> for VariableState {
    fn from(mut defs: BTreeMap<String, Vec<usize>>) -> Self {
        for indices in defs.values_mut() {
            indices.sort_unstable();
            indices.dedup();
        }
        Self { defs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_shadows_previous() {
        let mut state = VariableState::new();
        state.bind("x", 1);
        state.bind("x", 5);
        assert_eq!(state.get("x"), Some(&[5][..]));
    }

    #[test]
    fn test_merge_unions_per_name() {
        let mut a = VariableState::new();
        a.bind("x", 3);
        a.bind("only_a", 1);
        let mut b = VariableState::new();
        b.bind("x", 8);
        let mut c = VariableState::new();
        c.bind("x", 3);

        let merged = VariableState::merge(vec![a, b, c]);
        assert_eq!(merged.get("x"), Some(&[3, 8][..]));
        // defined on one branch only is still carried forward
        assert_eq!(merged.get("only_a"), Some(&[1][..]));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_from_map_normalizes() {
        let mut map = BTreeMap::new();
        map.insert("y".to_string(), vec![9, 2, 9]);
        let state = VariableState::from(map);
        assert_eq!(state.get("y"), Some(&[2, 9][..]));
    }
}
