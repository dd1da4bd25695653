//! Huffman coding for text and other symbol sequences.
//!
//! ```
//! let text: Vec<char> = "aaaabbbcc".chars().collect();
//!
//! let artifact = huffman::compress(&text)?;
//! assert_eq!(artifact.bit_len(), 14);
//!
//! let back = huffman::decompress(&artifact)?;
//! assert_eq!(back, text);
//! # Ok::<(), huffman::Error>(())
//! ```

pub mod artifact;
pub mod bits;
pub mod code;
pub mod codec;
pub mod driver;
pub mod error;
pub mod frequency;
pub mod tree;

pub use artifact::{ArtifactStore, FileStore, MemoryStore, PackedArtifact};
pub use code::CodeTable;
pub use codec::{compress, decompress, Decoder, Encoder};
pub use error::{Error, Result};
pub use frequency::FrequencyTable;
pub use tree::{HuffmanTree, Node, NodeId};

use std::hash::Hash;

/// Counts `symbols` and builds their Huffman tree.
///
/// Fails with [`Error::InvalidInput`] when there are no symbols.
pub fn huffman<Symbol: Eq + Clone + Hash>(
    symbols: impl IntoIterator<Item = Symbol>,
) -> Result<HuffmanTree<Symbol>> {
    HuffmanTree::build(&FrequencyTable::count(symbols))
}
