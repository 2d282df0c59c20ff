use std::{
    fmt::{Debug, Display, Formatter},
    str::{self, FromStr},
};
use thiserror::Error;

pub const HASH_SIZE: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashParseError {
    #[error("expected {expected} hex characters, got {0}", expected = HASH_SIZE * 2)]
    InvalidLength(usize),

    #[error("invalid hex character in {0}")]
    InvalidChar(String),
}

/// Identifier of a block in the tangle (the hash of its serialized form)
#[derive(PartialEq, Eq, Clone, Copy, Hash, Default, PartialOrd, Ord)]
pub struct BlockId([u8; HASH_SIZE]);

/// The all-zero id, referenced by the first blocks of a tangle
pub const EMPTY_BLOCK_ID: BlockId = BlockId::from_bytes([0u8; HASH_SIZE]);

impl BlockId {
    #[inline(always)]
    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        BlockId(bytes)
    }

    #[inline(always)]
    pub const fn as_bytes(&self) -> [u8; HASH_SIZE] {
        self.0
    }

    /// Builds an id whose first eight bytes hold `word` in little endian.
    /// Handy for tests and simulations where ids only need to be unique.
    #[inline(always)]
    pub const fn from_u64_word(word: u64) -> Self {
        let le = word.to_le_bytes();
        let mut bytes = [0u8; HASH_SIZE];
        let mut i = 0;
        while i < le.len() {
            bytes[i] = le[i];
            i += 1;
        }
        BlockId(bytes)
    }

    pub fn is_empty(&self) -> bool {
        *self == EMPTY_BLOCK_ID
    }
}

impl AsRef<[u8]> for BlockId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut hex = [0u8; HASH_SIZE * 2];
        let hex = faster_hex::hex_encode(&self.0, &mut hex).map_err(|_| std::fmt::Error)?;
        f.write_str(hex)
    }
}

impl Debug for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for BlockId {
    type Err = HashParseError;

    fn from_str(hash_str: &str) -> Result<Self, Self::Err> {
        if hash_str.len() != HASH_SIZE * 2 {
            return Err(HashParseError::InvalidLength(hash_str.len()));
        }
        let mut bytes = [0u8; HASH_SIZE];
        faster_hex::hex_decode(hash_str.as_bytes(), &mut bytes).map_err(|_| HashParseError::InvalidChar(hash_str.to_string()))?;
        Ok(BlockId(bytes))
    }
}

impl From<u64> for BlockId {
    fn from(word: u64) -> Self {
        Self::from_u64_word(word)
    }
}
