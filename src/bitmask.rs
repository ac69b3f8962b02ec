//! Fixed-width component bitmask backed by a single u64.
//! Bit `i` set means the entity carries a live component whose ID is `i`.

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, Result};

/// Number of distinct component kinds a mask can address.
pub const MAX_COMPONENTS: usize = u64::BITS as usize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bitmask {
    bits: u64,
}

impl Bitmask {
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self { bits }
    }

    /// Raw bitset, usable as the `relevant` argument of [`Bitmask::matches`].
    pub const fn bits(&self) -> u64 {
        self.bits
    }

    #[inline]
    fn check(pos: usize) -> Result<u64> {
        if pos >= MAX_COMPONENTS {
            return Err(EcsError::IndexOutOfRange {
                index: pos,
                width: MAX_COMPONENTS,
            });
        }
        Ok(1u64 << pos)
    }

    /// Check if the bit at `pos` is set.
    pub fn get_bit(&self, pos: usize) -> Result<bool> {
        Ok(self.bits & Self::check(pos)? != 0)
    }

    pub fn turn_on_bit(&mut self, pos: usize) -> Result<()> {
        self.bits |= Self::check(pos)?;
        Ok(())
    }

    /// Bulk OR of another mask into this one.
    pub fn turn_on_bits(&mut self, other: &Bitmask) {
        self.bits |= other.bits;
    }

    pub fn toggle_bit(&mut self, pos: usize) -> Result<()> {
        self.bits ^= Self::check(pos)?;
        Ok(())
    }

    /// Clear a single bit.
    pub fn clear_bit(&mut self, pos: usize) -> Result<()> {
        self.bits &= !Self::check(pos)?;
        Ok(())
    }

    /// Zero every bit.
    pub fn clear(&mut self) {
        self.bits = 0;
    }

    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub const fn count(&self) -> u32 {
        self.bits.count_ones()
    }

    /// AND both masks against `relevant`, then compare bit-for-bit.
    ///
    /// This is not an intersection test: `0b101.matches(0b100, 0b101)` is false.
    pub const fn matches(&self, other: &Bitmask, relevant: u64) -> bool {
        (self.bits & relevant) == (other.bits & relevant)
    }

    /// Iterate over the positions of set bits, lowest first.
    pub fn ones(&self) -> Ones {
        Ones { word: self.bits }
    }
}

pub struct Ones {
    word: u64,
}

impl Iterator for Ones {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.word == 0 {
            return None;
        }
        let trailing = self.word.trailing_zeros();
        self.word &= self.word - 1;
        Some(trailing as usize)
    }
}
