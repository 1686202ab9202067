//! A 128-bit [`Block`] type, the unit of padded circuit inputs.
use std::fmt;

use serde::{Deserialize, Serialize};

/// A 128-bit block of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Block([u8; 16]);

impl Block {
    /// All bits set to 0.
    pub const ZERO: Self = Self([0; 16]);

    /// 16 bytes in a Block.
    pub const BYTES: usize = 16;
    /// 128 bits in a block.
    pub const BITS: usize = 128;

    /// Create a new block from bytes.
    #[inline]
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Bytes of the block.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Splits `bytes` into exactly `blocks` blocks, filling the remainder with zeros.
    ///
    /// Returns `None` if `bytes` does not fit.
    pub fn padded(bytes: &[u8], blocks: usize) -> Option<Vec<Block>> {
        if bytes.len() > blocks.checked_mul(Self::BYTES)? {
            return None;
        }
        let mut padded = vec![Block::ZERO; blocks];
        for (block, chunk) in padded.iter_mut().zip(bytes.chunks(Self::BYTES)) {
            block.0[..chunk.len()].copy_from_slice(chunk);
        }
        Some(padded)
    }
}

impl AsRef<[u8]> for Block {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 16]> for Block {
    #[inline]
    fn from(value: [u8; 16]) -> Self {
        Self(value)
    }
}

impl From<Block> for [u8; 16] {
    fn from(value: Block) -> Self {
        value.0
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
