use std::collections::HashMap;
use std::hash::Hash;

/// Occurrence counts for every distinct symbol of an input.
///
/// Entries are kept in order of first appearance. The tree builder breaks
/// weight ties by that order, so the same input always yields the same tree.
#[derive(Debug, Clone)]
pub struct FrequencyTable<Symbol> {
    entries: Vec<(Symbol, usize)>,
    index: HashMap<Symbol, usize>,
}

impl<Symbol> Default for FrequencyTable<Symbol> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<Symbol> FrequencyTable<Symbol>
where
    Symbol: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts every symbol of `symbols`. An empty input gives an empty table.
    pub fn count(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let mut table = Self::new();
        for s in symbols {
            table.add(s, 1);
        }

        log::trace!(
            "counted {} symbols, {} distinct",
            table.total(),
            table.len()
        );
        table
    }

    fn add(&mut self, symbol: Symbol, count: usize) {
        if count == 0 {
            return;
        }

        match self.index.get(&symbol) {
            Some(&i) => self.entries[i].1 += count,
            None => {
                self.index.insert(symbol.clone(), self.entries.len());
                self.entries.push((symbol, count));
            }
        }
    }

    /// Adds the counts of `other` into `self`.
    ///
    /// Counting shards separately and merging gives the same counts as
    /// counting the concatenated input, in any merge order.
    pub fn merge(&mut self, other: &FrequencyTable<Symbol>) {
        for (s, count) in &other.entries {
            self.add(s.clone(), *count);
        }
    }

    pub fn get(&self, symbol: &Symbol) -> Option<usize> {
        self.index.get(symbol).map(|&i| self.entries[i].1)
    }

    /// Sum of all counts, i.e. the length of the counted input.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, usize)> + '_ {
        self.entries.iter().map(|(s, c)| (s, *c))
    }
}
