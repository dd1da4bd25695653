//! Packing of bit strings into bytes and back.
//!
//! Bits are grouped eight at a time, most significant bit first. A short final
//! group is padded with zero bits. Unpacking always yields eight bits per byte,
//! so the caller must keep the unpadded bit length to drop the padding.

use bitvec::prelude::*;

/// The bit-string type used throughout the codec.
pub type Bits = BitVec<u8, Msb0>;

/// Packs `bits` into `ceil(bits.len() / 8)` bytes.
pub fn pack(bits: &BitSlice<u8, Msb0>) -> Vec<u8> {
    let mut bv = Bits::with_capacity(bits.len());
    bv.extend_from_bitslice(bits);

    // zero the tail of the last byte
    bv.set_uninitialized(false);
    bv.into_vec()
}

/// Expands every byte into eight bits.
pub fn unpack(bytes: &[u8]) -> Bits {
    Bits::from_slice(bytes)
}

/// Number of padding bits a bit string of length `bit_len` gets when packed.
pub fn padding(bit_len: usize) -> usize {
    (8 - bit_len % 8) % 8
}
