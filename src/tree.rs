use crate::code::CodeTable;
use crate::error::{Error, Result};
use crate::frequency::FrequencyTable;
use bitvec::prelude::*;
use derivative::Derivative;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Index of a node inside a [`HuffmanTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node<Symbol> {
    Leaf {
        symbol: Symbol,
        weight: usize,
    },
    Internal {
        weight: usize,
        left: NodeId,
        right: NodeId,
    },
}

impl<Symbol> Node<Symbol> {
    pub fn weight(&self) -> usize {
        match self {
            Node::Leaf { weight, .. } | Node::Internal { weight, .. } => *weight,
        }
    }

    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            Node::Leaf { symbol, .. } => Some(symbol),
            Node::Internal { .. } => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

/// Queue entry for the greedy merge. Ordered by weight, then by insertion
/// sequence, so equal weights leave the queue in the order they entered it.
#[derive(Debug, Derivative)]
#[derivative(PartialEq, Eq, PartialOrd, Ord)]
struct Pending {
    weight: usize,
    seq: usize,

    #[derivative(PartialEq = "ignore")]
    #[derivative(PartialOrd = "ignore")]
    #[derivative(Ord = "ignore")]
    id: NodeId,
}

/// A Huffman prefix tree stored as an arena.
///
/// Children always sit at lower indices than their parent and the root is the
/// last node, so the structure is acyclic by construction. Trees coming from
/// outside (deserialized or rebuilt from a code table) are checked against the
/// same rules before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HuffmanTree<Symbol> {
    nodes: Vec<Node<Symbol>>,
}

impl<Symbol> HuffmanTree<Symbol>
where
    Symbol: Clone,
{
    /// Builds the tree by repeatedly merging the two lightest nodes.
    ///
    /// The first node taken off the queue becomes the left child. A table with
    /// a single symbol gives a tree that is one bare leaf.
    pub fn build(freq: &FrequencyTable<Symbol>) -> Result<Self>
    where
        Symbol: Eq + std::hash::Hash,
    {
        if freq.is_empty() {
            return Err(Error::InvalidInput);
        }

        let mut nodes = Vec::with_capacity(2 * freq.len() - 1);
        let mut pq = BinaryHeap::with_capacity(freq.len());
        let mut seq = 0;

        for (s, count) in freq.iter() {
            let id = NodeId(nodes.len());
            nodes.push(Node::Leaf {
                symbol: s.clone(),
                weight: count,
            });
            pq.push(Reverse(Pending {
                weight: count,
                seq,
                id,
            }));
            seq += 1;
        }

        while let Some(Reverse(left)) = pq.pop() {
            let Some(Reverse(right)) = pq.pop() else {
                // last one standing is the root, which is also the last node pushed
                debug_assert_eq!(left.id.0, nodes.len() - 1);
                break;
            };

            let id = NodeId(nodes.len());
            let weight = left.weight + right.weight;
            nodes.push(Node::Internal {
                weight,
                left: left.id,
                right: right.id,
            });
            pq.push(Reverse(Pending { weight, seq, id }));
            seq += 1;
        }

        let tree = Self { nodes };
        log::debug!(
            "built tree: {} leaves, {} nodes, weight {}",
            tree.leaf_count(),
            tree.nodes.len(),
            tree.weight()
        );
        Ok(tree)
    }

    /// Rebuilds a decoding tree from a code table.
    ///
    /// The table must be complete and prefix-free with non-empty codes. A table
    /// holding one symbol with the code `0` maps back to a bare leaf. Leaves get
    /// weight zero since a code table does not record frequencies.
    pub fn from_code_table(table: &CodeTable<Symbol>) -> Result<Self> {
        let entries: Vec<(&Symbol, &BitSlice<u8, Msb0>)> = table.iter().collect();

        if entries.is_empty() {
            return Err(Error::InvalidInput);
        }
        if entries.iter().any(|(_, code)| code.is_empty()) {
            return Err(Error::malformed("code table holds an empty code"));
        }

        let mut nodes = Vec::with_capacity(2 * entries.len() - 1);
        if let [(symbol, code)] = entries.as_slice() {
            if code.len() != 1 || code[0] {
                return Err(Error::malformed(
                    "a single-symbol table must use the one-bit code 0",
                ));
            }
            nodes.push(Node::Leaf {
                symbol: (*symbol).clone(),
                weight: 0,
            });
            return Ok(Self { nodes });
        }

        // a complete prefix code over k symbols is at most k - 1 bits deep
        let max_len = entries.len() - 1;
        if let Some((_, code)) = entries.iter().find(|(_, code)| code.len() > max_len) {
            return Err(Error::malformed(format!(
                "code of {} bits is too long for a table of {} symbols",
                code.len(),
                entries.len()
            )));
        }

        let trie = Self::trie_of(&entries)?;

        // post-order walk puts children before parents; the trie root lands last
        let mut ids = vec![NodeId(0); trie.len()];
        let mut stack = vec![(0, false)];
        while let Some((t, expanded)) = stack.pop() {
            match trie[t] {
                Slot::Leaf(i) => {
                    ids[t] = NodeId(nodes.len());
                    nodes.push(Node::Leaf {
                        symbol: entries[i].0.clone(),
                        weight: 0,
                    });
                }
                Slot::Branch([Some(left), Some(right)]) => {
                    if expanded {
                        ids[t] = NodeId(nodes.len());
                        nodes.push(Node::Internal {
                            weight: 0,
                            left: ids[left],
                            right: ids[right],
                        });
                    } else {
                        stack.push((t, true));
                        stack.push((right, false));
                        stack.push((left, false));
                    }
                }
                Slot::Branch(_) => {
                    return Err(Error::malformed("code table leaves a dangling branch"));
                }
            }
        }

        Ok(Self { nodes })
    }

    // Inserts every code bit by bit. Slot 0 is the root.
    fn trie_of(entries: &[(&Symbol, &BitSlice<u8, Msb0>)]) -> Result<Vec<Slot>> {
        let mut trie = vec![Slot::Branch([None, None])];

        for (i, (_, code)) in entries.iter().enumerate() {
            let mut at = 0;
            for b in code.iter().by_vals() {
                let Slot::Branch(children) = trie[at] else {
                    return Err(Error::malformed(format!(
                        "code table is not prefix-free: entry {i} extends another code"
                    )));
                };

                at = match children[usize::from(b)] {
                    Some(next) => next,
                    None => {
                        let next = trie.len();
                        trie.push(Slot::Branch([None, None]));
                        if let Slot::Branch(children) = &mut trie[at] {
                            children[usize::from(b)] = Some(next);
                        }
                        next
                    }
                };
            }

            if trie[at] != Slot::Branch([None, None]) {
                return Err(Error::malformed(format!(
                    "code table is not prefix-free: entry {i} is a prefix of another code"
                )));
            }
            trie[at] = Slot::Leaf(i);
        }

        Ok(trie)
    }
}

/// Trie slot used while rebuilding a tree from a code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Leaf(usize),
    Branch([Option<usize>; 2]),
}

impl<Symbol> HuffmanTree<Symbol> {
    pub fn root(&self) -> NodeId {
        NodeId(self.nodes.len() - 1)
    }

    // Ids come from this tree's own links; callers outside the crate use `get`.
    pub(crate) fn node(&self, id: NodeId) -> &Node<Symbol> {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<Symbol>> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[Node<Symbol>] {
        &self.nodes
    }

    /// Total weight, equal to the input length for a tree built from counts.
    pub fn weight(&self) -> usize {
        self.node(self.root()).weight()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// True when the whole tree is one leaf (single-symbol alphabet).
    pub fn is_leaf_root(&self) -> bool {
        self.node(self.root()).is_leaf()
    }

    /// Checks the arena rules: non-empty, children before parents, every
    /// non-root node owned by exactly one parent, the root by none, and each
    /// internal weight equal to the sum of its children.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::malformed("tree has no nodes"));
        }

        let mut parents = vec![0usize; self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            let Node::Internal {
                weight,
                left,
                right,
            } = node
            else {
                continue;
            };

            for child in [left, right] {
                if child.0 >= i {
                    return Err(Error::malformed(format!(
                        "node {i} points forward to child {}",
                        child.0
                    )));
                }
                parents[child.0] += 1;
            }

            let sum = self.nodes[left.0]
                .weight()
                .checked_add(self.nodes[right.0].weight());
            if sum != Some(*weight) {
                return Err(Error::malformed(format!(
                    "node {i} weight {weight} is not the sum of its children"
                )));
            }
        }

        let root = self.nodes.len() - 1;
        for (i, &count) in parents.iter().enumerate() {
            let expected = usize::from(i != root);
            if count != expected {
                return Err(Error::malformed(format!(
                    "node {i} has {count} parents, expected {expected}"
                )));
            }
        }

        Ok(())
    }
}

#[derive(Deserialize)]
struct RawTree<Symbol> {
    nodes: Vec<Node<Symbol>>,
}

impl<'de, Symbol> Deserialize<'de> for HuffmanTree<Symbol>
where
    Symbol: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: RawTree<Symbol> = RawTree::deserialize(deserializer)?;
        let tree = HuffmanTree { nodes: raw.nodes };
        tree.validate().map_err(serde::de::Error::custom)?;
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::Bits;

    fn tree_of(s: &str) -> HuffmanTree<char> {
        HuffmanTree::build(&FrequencyTable::count(s.chars())).unwrap()
    }

    fn depth_of(tree: &HuffmanTree<char>, target: char) -> Option<usize> {
        fn walk(tree: &HuffmanTree<char>, id: NodeId, target: char, depth: usize) -> Option<usize> {
            match tree.node(id) {
                Node::Leaf { symbol, .. } => (*symbol == target).then_some(depth),
                Node::Internal { left, right, .. } => walk(tree, *left, target, depth + 1)
                    .or_else(|| walk(tree, *right, target, depth + 1)),
            }
        }
        walk(tree, tree.root(), target, 0)
    }

    #[test]
    fn build_empty_is_invalid() {
        let freq: FrequencyTable<char> = FrequencyTable::new();

        assert!(matches!(HuffmanTree::build(&freq), Err(Error::InvalidInput)));
    }

    #[test]
    fn build_single_symbol() {
        let tree = tree_of("zzzz");

        assert!(tree.is_leaf_root());
        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.weight(), 4);
        assert_eq!(tree.node(tree.root()).symbol(), Some(&'z'));
    }

    #[test]
    fn build_textbook_example() {
        let tree = tree_of("aaaabbbcc");

        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(tree.nodes().len(), 5);
        assert_eq!(tree.weight(), 9);
        assert_eq!(depth_of(&tree, 'a'), Some(1));
        assert_eq!(depth_of(&tree, 'b'), Some(2));
        assert_eq!(depth_of(&tree, 'c'), Some(2));

        // c (2) and b (3) merge first, c on the left
        assert_eq!(
            tree.nodes()[3],
            Node::Internal {
                weight: 5,
                left: NodeId(2),
                right: NodeId(1),
            }
        );
    }

    #[test]
    fn weights_are_conserved() {
        let text = "it was the best of times, it was the worst of times";
        let tree = tree_of(text);

        assert_eq!(tree.weight(), text.chars().count());
        for node in tree.nodes() {
            if let Node::Internal { weight, left, right } = node {
                assert_eq!(*weight, tree.node(*left).weight() + tree.node(*right).weight());
            }
        }
        tree.validate().unwrap();
    }

    #[test]
    fn ties_are_deterministic() {
        let a = tree_of("abcdefgh");
        let b = tree_of("abcdefgh");

        assert_eq!(a, b);
        // equal weights merge in first-appearance order
        assert_eq!(
            a.nodes()[8],
            Node::Internal {
                weight: 2,
                left: NodeId(0),
                right: NodeId(1),
            }
        );
    }

    #[test]
    fn validate_rejects_forward_child() {
        let tree = HuffmanTree {
            nodes: vec![
                Node::Internal {
                    weight: 2,
                    left: NodeId(1),
                    right: NodeId(2),
                },
                Node::Leaf { symbol: 'a', weight: 1 },
                Node::Leaf { symbol: 'b', weight: 1 },
            ],
        };

        assert!(matches!(tree.validate(), Err(Error::MalformedStream { .. })));
    }

    #[test]
    fn validate_rejects_shared_child() {
        let tree = HuffmanTree {
            nodes: vec![
                Node::Leaf { symbol: 'a', weight: 1 },
                Node::Leaf { symbol: 'b', weight: 1 },
                Node::Internal {
                    weight: 2,
                    left: NodeId(0),
                    right: NodeId(0),
                },
            ],
        };

        assert!(matches!(tree.validate(), Err(Error::MalformedStream { .. })));
    }

    #[test]
    fn validate_rejects_bad_weight() {
        let tree = HuffmanTree {
            nodes: vec![
                Node::Leaf { symbol: 'a', weight: 1 },
                Node::Leaf { symbol: 'b', weight: 1 },
                Node::Internal {
                    weight: 3,
                    left: NodeId(0),
                    right: NodeId(1),
                },
            ],
        };

        assert!(matches!(tree.validate(), Err(Error::MalformedStream { .. })));
    }

    #[test]
    fn serde_round_trip_validates() {
        let tree = tree_of("mississippi");
        let data = rmp_serde::to_vec(&tree).unwrap();
        let back: HuffmanTree<char> = rmp_serde::from_slice(&data).unwrap();
        assert_eq!(back, tree);

        let orphan = HuffmanTree {
            nodes: vec![
                Node::Leaf { symbol: 'a', weight: 1 },
                Node::Leaf { symbol: 'b', weight: 1 },
            ],
        };
        let data = rmp_serde::to_vec(&orphan).unwrap();
        assert!(rmp_serde::from_slice::<HuffmanTree<char>>(&data).is_err());
    }

    #[test]
    fn from_code_table_matches_depths() {
        let tree = tree_of("abracadabra");
        let table = CodeTable::from_tree(&tree);
        let rebuilt = HuffmanTree::from_code_table(&table).unwrap();

        rebuilt.validate().unwrap();
        assert_eq!(rebuilt.leaf_count(), tree.leaf_count());
        for c in "abrcd".chars() {
            assert_eq!(depth_of(&rebuilt, c), depth_of(&tree, c));
        }
        assert_eq!(CodeTable::from_tree(&rebuilt), table);
    }

    #[test]
    fn from_code_table_single_symbol() {
        let table = CodeTable::from_tree(&tree_of("zzzz"));
        let rebuilt = HuffmanTree::from_code_table(&table).unwrap();

        assert!(rebuilt.is_leaf_root());
    }

    #[test]
    fn from_code_table_rejects_prefix() {
        let table = CodeTable::from_codes(vec![
            ('a', bitvec![u8, Msb0; 0]),
            ('b', bitvec![u8, Msb0; 0, 1]),
            ('c', bitvec![u8, Msb0; 1]),
        ]);

        assert!(matches!(
            HuffmanTree::from_code_table(&table),
            Err(Error::MalformedStream { .. })
        ));
    }

    #[test]
    fn from_code_table_rejects_incomplete() {
        let table = CodeTable::from_codes(vec![
            ('a', bitvec![u8, Msb0; 0]),
            ('b', bitvec![u8, Msb0; 1, 0]),
        ]);

        assert!(matches!(
            HuffmanTree::from_code_table(&table),
            Err(Error::MalformedStream { .. })
        ));

        // lengths within bounds, but `11` is never reached
        let table = CodeTable::from_codes(vec![
            ('a', bitvec![u8, Msb0; 0, 0]),
            ('b', bitvec![u8, Msb0; 0, 1]),
            ('c', bitvec![u8, Msb0; 1, 0]),
        ]);
        assert!(matches!(
            HuffmanTree::from_code_table(&table),
            Err(Error::MalformedStream { .. })
        ));
    }

    #[test]
    fn from_code_table_rejects_duplicate_code() {
        let table = CodeTable::from_codes(vec![
            ('a', bitvec![u8, Msb0; 0]),
            ('b', bitvec![u8, Msb0; 1]),
            ('c', bitvec![u8, Msb0; 1]),
        ]);

        assert!(matches!(
            HuffmanTree::from_code_table(&table),
            Err(Error::MalformedStream { .. })
        ));
    }

    #[test]
    fn from_code_table_rejects_overlong_code() {
        // three symbols never need more than two bits
        let table = CodeTable::from_codes(vec![
            ('a', bitvec![u8, Msb0; 1]),
            ('b', bitvec![u8, Msb0; 0, 1]),
            ('c', bitvec![u8, Msb0; 0, 0, 0]),
        ]);

        assert!(matches!(
            HuffmanTree::from_code_table(&table),
            Err(Error::MalformedStream { .. })
        ));
    }

    // `1`, `01`, `001`, ..., `0..01`, `0..00`: complete, and k - 1 levels deep
    fn chain_table(k: usize) -> CodeTable<u32> {
        CodeTable::from_codes((0..k).map(|i| {
            let mut code = Bits::repeat(false, i.min(k - 1));
            if i < k - 1 {
                code.push(true);
            }
            (i as u32, code)
        }))
    }

    #[test]
    fn from_code_table_deep_chain_on_small_stack() {
        const K: usize = 5000;

        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let table = chain_table(K);
                let rebuilt = HuffmanTree::from_code_table(&table).unwrap();

                rebuilt.validate().unwrap();
                assert_eq!(rebuilt.leaf_count(), K);
                assert_eq!(rebuilt.nodes().len(), 2 * K - 1);
                assert_eq!(CodeTable::from_tree(&rebuilt), table);

                let symbols = vec![0, K as u32 - 1, 1, K as u32 - 2, 0];
                let bits = table.encode(symbols.iter().cloned()).unwrap();
                let (_, d) = rebuilt.into_encoder_decoder_pair();
                assert_eq!(d.decode(&bits, symbols.len()).unwrap(), symbols);
            })
            .unwrap();

        handle.join().unwrap();
    }

    #[test]
    fn foreign_node_id_is_not_found() {
        let tree = tree_of("abc");
        let id: NodeId = rmp_serde::from_slice(&rmp_serde::to_vec(&999usize).unwrap()).unwrap();

        assert_eq!(id.index(), 999);
        assert!(tree.get(id).is_none());
        assert!(tree.get(tree.root()).is_some());
    }
}
