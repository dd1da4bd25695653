use crate::bits::{self, Bits};
use crate::error::{Error, Result};
use crate::frequency::FrequencyTable;
use crate::tree::{HuffmanTree, Node, NodeId};
use bitvec::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::hash::Hash;

/// Maps every symbol to its code word, the root-to-leaf path of its leaf
/// (`0` for left, `1` for right).
///
/// A single-symbol alphabet gets the one-bit code `0`, so that every encoded
/// symbol still occupies a bit.
#[derive(Debug, Clone)]
pub struct CodeTable<Symbol> {
    entries: Vec<(Symbol, BitBox<u8, Msb0>)>,
    index: HashMap<Symbol, usize>,
}

impl<Symbol> CodeTable<Symbol> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in depth-first order of the tree they came from.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &BitSlice<u8, Msb0>)> + '_ {
        self.entries.iter().map(|(s, code)| (s, code.as_bitslice()))
    }
}

impl<Symbol> CodeTable<Symbol>
where
    Symbol: Eq + Hash + Clone,
{
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn from_tree(tree: &HuffmanTree<Symbol>) -> Self {
        let mut path = Bits::new();
        if tree.is_leaf_root() {
            // one symbol: fixed code `0`
            path.push(false);
        }

        // (node, path length above it, branch bit taken to reach it)
        let mut stack: Vec<(NodeId, usize, Option<bool>)> = vec![(tree.root(), path.len(), None)];
        let mut entries = Vec::with_capacity(tree.leaf_count());
        while let Some((id, depth, bit)) = stack.pop() {
            path.truncate(depth);
            if let Some(bit) = bit {
                path.push(bit);
            }

            match tree.node(id) {
                Node::Leaf { symbol, .. } => {
                    entries.push((symbol.clone(), path.clone().into_boxed_bitslice()));
                }
                Node::Internal { left, right, .. } => {
                    // right first so the left subtree is emitted first
                    stack.push((*right, path.len(), Some(true)));
                    stack.push((*left, path.len(), Some(false)));
                }
            }
        }

        let table = Self::from_entries(entries);
        log::trace!("generated {} codes", table.len());
        table
    }

    /// Builds a table from code words supplied by the caller. Nothing is
    /// checked here; [`HuffmanTree::from_code_table`] rejects tables that are
    /// not usable for decoding.
    pub fn from_codes(codes: impl IntoIterator<Item = (Symbol, Bits)>) -> Self {
        Self::from_entries(
            codes
                .into_iter()
                .map(|(s, code)| (s, code.into_boxed_bitslice()))
                .collect(),
        )
    }

    fn from_entries(entries: Vec<(Symbol, BitBox<u8, Msb0>)>) -> Self {
        let mut table = Self::empty();
        for (s, code) in entries {
            // a repeated symbol keeps its last code
            match table.index.get(&s) {
                Some(&i) => table.entries[i].1 = code,
                None => {
                    table.index.insert(s.clone(), table.entries.len());
                    table.entries.push((s, code));
                }
            }
        }

        table
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&BitSlice<u8, Msb0>> {
        self.index
            .get(symbol)
            .map(|&i| self.entries[i].1.as_bitslice())
    }

    /// Concatenates the code of every symbol, in input order.
    pub fn encode(&self, stream: impl IntoIterator<Item = Symbol>) -> Result<Bits> {
        let mut out = Bits::new();
        for (position, s) in stream.into_iter().enumerate() {
            let code = self.get(&s).ok_or(Error::UnknownSymbol { position })?;
            out.extend_from_bitslice(code);
        }

        Ok(out)
    }

    /// Total encoded length in bits of an input with these frequencies.
    /// Symbols without a code contribute nothing.
    pub fn encoded_len(&self, freq: &FrequencyTable<Symbol>) -> usize {
        freq.iter()
            .filter_map(|(s, count)| self.get(s).map(|code| count * code.len()))
            .sum()
    }
}

impl<Symbol> PartialEq for CodeTable<Symbol>
where
    Symbol: Eq + Hash + Clone,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(s, code)| other.get(s) == Some(code))
    }
}

impl<Symbol> Eq for CodeTable<Symbol> where Symbol: Eq + Hash + Clone {}

/// Wire form of a [`CodeTable`]: each code word is stored as its bit length and
/// its packed bytes.
#[derive(Serialize, Deserialize)]
struct SerializableCodeTable<Symbol> {
    codes: Vec<(Symbol, usize, Vec<u8>)>,
}

impl<'a, Symbol> From<&'a CodeTable<Symbol>> for SerializableCodeTable<Symbol>
where
    Symbol: Clone,
{
    fn from(other: &'a CodeTable<Symbol>) -> Self {
        Self {
            codes: other
                .iter()
                .map(|(s, code)| (s.clone(), code.len(), bits::pack(code)))
                .collect(),
        }
    }
}

impl<Symbol> TryFrom<SerializableCodeTable<Symbol>> for CodeTable<Symbol>
where
    Symbol: Eq + Hash + Clone,
{
    type Error = Error;

    fn try_from(other: SerializableCodeTable<Symbol>) -> Result<Self> {
        let mut codes = Vec::with_capacity(other.codes.len());
        for (s, len, bytes) in other.codes {
            if bytes.len() != len.div_ceil(8) {
                return Err(Error::malformed(format!(
                    "code of {len} bits stored in {} bytes",
                    bytes.len()
                )));
            }

            let mut code = bits::unpack(&bytes);
            code.truncate(len);
            codes.push((s, code));
        }

        Ok(Self::from_codes(codes))
    }
}

impl<Symbol> Serialize for CodeTable<Symbol>
where
    Symbol: Serialize + Clone,
{
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        SerializableCodeTable::from(self).serialize(serializer)
    }
}

impl<'de, Symbol> Deserialize<'de> for CodeTable<Symbol>
where
    Symbol: Deserialize<'de> + Eq + Hash + Clone,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: SerializableCodeTable<Symbol> = SerializableCodeTable::deserialize(deserializer)?;
        CodeTable::try_from(raw).map_err(serde::de::Error::custom)
    }
}
