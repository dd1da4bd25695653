use crate::artifact::PackedArtifact;
use crate::bits::{self, Bits};
use crate::code::CodeTable;
use crate::error::{Error, Result};
use crate::frequency::FrequencyTable;
use crate::tree::{HuffmanTree, Node};
use bitvec::prelude::*;
use std::hash::Hash;

impl<Symbol> HuffmanTree<Symbol>
where
    Symbol: Eq + Hash + Clone,
{
    pub fn into_encoder_decoder_pair(self) -> (Encoder<Symbol>, Decoder<Symbol>) {
        let table = CodeTable::from_tree(&self);
        (Encoder { table }, Decoder { tree: self })
    }
}

#[derive(Debug, Clone)]
pub struct Encoder<Symbol> {
    table: CodeTable<Symbol>,
}

impl<Symbol> Encoder<Symbol>
where
    Symbol: Eq + Hash + Clone,
{
    pub fn new(table: CodeTable<Symbol>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CodeTable<Symbol> {
        &self.table
    }

    pub fn into_table(self) -> CodeTable<Symbol> {
        self.table
    }

    /// Fails with [`Error::UnknownSymbol`] on the first symbol that has no code.
    pub fn encode(&self, stream: impl IntoIterator<Item = Symbol>) -> Result<Bits> {
        self.table.encode(stream)
    }
}

/// Walks the tree one bit at a time, emitting a symbol at every leaf and
/// starting over from the root.
#[derive(Debug, Clone)]
pub struct Decoder<Symbol> {
    tree: HuffmanTree<Symbol>,
}

impl<Symbol> Decoder<Symbol>
where
    Symbol: Clone,
{
    pub fn new(tree: HuffmanTree<Symbol>) -> Self {
        Self { tree }
    }

    /// Builds the decoding tree from a code table, e.g. one loaded from disk.
    pub fn from_code_table(table: &CodeTable<Symbol>) -> Result<Self> {
        HuffmanTree::from_code_table(table).map(Self::new)
    }

    pub fn tree(&self) -> &HuffmanTree<Symbol> {
        &self.tree
    }

    /// Decodes exactly `symbol_count` symbols from the front of `input`.
    ///
    /// Bits left over after the last symbol (packing padding) are ignored.
    pub fn decode(
        &self,
        input: &BitSlice<u8, Msb0>,
        symbol_count: usize,
    ) -> Result<Vec<Symbol>> {
        self.walk(input, symbol_count).map(|(out, _)| out)
    }

    // Returns the decoded symbols and the number of bits consumed.
    fn walk(
        &self,
        input: &BitSlice<u8, Msb0>,
        symbol_count: usize,
    ) -> Result<(Vec<Symbol>, usize)> {
        let root = self.tree.root();
        // every symbol takes at least one bit
        let mut out = Vec::with_capacity(symbol_count.min(input.len()));
        let mut current = root;
        let mut consumed = 0;

        for (pos, b) in input.iter().by_vals().enumerate() {
            if out.len() == symbol_count {
                break;
            }
            consumed = pos + 1;

            let next = match self.tree.node(current) {
                Node::Internal { left, right, .. } => {
                    if b {
                        *right
                    } else {
                        *left
                    }
                }
                // only reachable when the root itself is a leaf: its code is `0`
                Node::Leaf { symbol, .. } => {
                    if b {
                        return Err(Error::malformed(format!(
                            "bit {pos}: single-symbol tree has no right branch"
                        )));
                    }
                    out.push(symbol.clone());
                    continue;
                }
            };

            if let Node::Leaf { symbol, .. } = self.tree.node(next) {
                out.push(symbol.clone());
                current = root;
            } else {
                current = next;
            }
        }

        if out.len() < symbol_count {
            return Err(Error::malformed(format!(
                "stream ended after {} of {symbol_count} symbols",
                out.len()
            )));
        }

        Ok((out, consumed))
    }
}

/// Compresses `symbols` into an artifact that carries everything needed to
/// decode it again.
pub fn compress<Symbol>(symbols: &[Symbol]) -> Result<PackedArtifact<Symbol>>
where
    Symbol: Eq + Hash + Clone,
{
    let freq = FrequencyTable::count(symbols.iter().cloned());
    if freq.is_empty() {
        log::debug!("empty input, nothing to encode");
        return Ok(PackedArtifact::empty());
    }

    let tree = HuffmanTree::build(&freq)?;
    let (encoder, _) = tree.into_encoder_decoder_pair();
    let encoded = encoder.encode(symbols.iter().cloned())?;

    let artifact = PackedArtifact::new(
        bits::pack(&encoded),
        encoded.len(),
        symbols.len(),
        encoder.into_table(),
    );
    log::debug!(
        "compressed {} symbols ({} distinct) into {} bits, {} bytes",
        symbols.len(),
        freq.len(),
        artifact.bit_len(),
        artifact.data().len()
    );
    Ok(artifact)
}

/// Restores the symbols of an artifact produced by [`compress`].
///
/// An artifact with no symbols decodes to nothing without looking at its table,
/// provided it also carries no bits.
pub fn decompress<Symbol>(artifact: &PackedArtifact<Symbol>) -> Result<Vec<Symbol>>
where
    Symbol: Eq + Hash + Clone,
{
    if artifact.symbol_count() == 0 {
        if !artifact.data().is_empty() || artifact.bit_len() != 0 {
            return Err(Error::malformed(format!(
                "no symbols recorded but {} bits in {} bytes stored",
                artifact.bit_len(),
                artifact.data().len()
            )));
        }
        return Ok(Vec::new());
    }

    if artifact.data().len() != artifact.bit_len().div_ceil(8) {
        return Err(Error::malformed(format!(
            "{} bits recorded but {} bytes stored",
            artifact.bit_len(),
            artifact.data().len()
        )));
    }
    if artifact.symbol_count() > artifact.bit_len() {
        return Err(Error::malformed(format!(
            "{} symbols cannot fit in {} bits",
            artifact.symbol_count(),
            artifact.bit_len()
        )));
    }

    let mut input = bits::unpack(artifact.data());
    input.truncate(artifact.bit_len());

    let decoder = Decoder::from_code_table(artifact.table())?;
    let (out, consumed) = decoder.walk(&input, artifact.symbol_count())?;
    if consumed != input.len() {
        return Err(Error::malformed(format!(
            "{} trailing bits after the last symbol",
            input.len() - consumed
        )));
    }

    log::debug!("decompressed {} symbols from {} bits", out.len(), consumed);
    Ok(out)
}
