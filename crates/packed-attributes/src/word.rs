#![forbid(unsafe_code)]

use crate::dataset::{Block, WordBlock};
use std::fmt;
use std::ops::{BitAnd, BitOrAssign};

/// Element type of a packed dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WordDtype {
    U8,
    U16,
    U32,
    U64,
    U128,
}

impl WordDtype {
    pub fn bits(self) -> u32 {
        match self {
            WordDtype::U8 => 8,
            WordDtype::U16 => 16,
            WordDtype::U32 => 32,
            WordDtype::U64 => 64,
            WordDtype::U128 => 128,
        }
    }
}

impl fmt::Display for WordDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uint{}", self.bits())
    }
}

/// An unsigned word holding one column's values for `BITS` consecutive rows.
///
/// Row `r` of a packed column lives in word `r / BITS` at bit `BITS - 1 - r % BITS`, i.e. the
/// first row of a word is its most significant bit.
pub trait PackedWord:
    Copy + Default + Eq + fmt::Debug + Send + Sync + BitAnd<Output = Self> + BitOrAssign + 'static
{
    const BITS: u32;
    const ZERO: Self;
    const DTYPE: WordDtype;

    fn count_ones(self) -> u32;

    /// Word with only the bit for in-word row `offset` set.
    fn row_bit(offset: u32) -> Self;

    fn has_row(self, offset: u32) -> bool {
        self & Self::row_bit(offset) != Self::ZERO
    }

    /// Stores a popcount result (always `<= BITS`) in the word itself.
    fn from_count(count: u32) -> Self;

    /// Reads back a value written by [`PackedWord::from_count`].
    fn count_value(self) -> u64;
}

macro_rules! impl_packed_word {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl PackedWord for $ty {
                const BITS: u32 = <$ty>::BITS;
                const ZERO: Self = 0;
                const DTYPE: WordDtype = WordDtype::$dtype;

                #[inline]
                fn count_ones(self) -> u32 {
                    <$ty>::count_ones(self)
                }

                #[inline]
                fn row_bit(offset: u32) -> Self {
                    debug_assert!(offset < Self::BITS);
                    1 << (Self::BITS - 1 - offset)
                }

                #[inline]
                fn from_count(count: u32) -> Self {
                    debug_assert!(count <= Self::BITS);
                    count as $ty
                }

                #[inline]
                fn count_value(self) -> u64 {
                    self as u64
                }
            }
        )*
    };
}

impl_packed_word!(u8 => U8, u16 => U16, u32 => U32, u64 => U64, u128 => U128);

/// Word widths a backing dataset may be stored in.
pub trait StorageWord: PackedWord {
    fn wrap_block(block: Block<Self>) -> WordBlock;

    /// Returns the block back unchanged when it holds a different word type.
    fn unwrap_block(block: WordBlock) -> Result<Block<Self>, WordBlock>;
}

impl StorageWord for u32 {
    fn wrap_block(block: Block<Self>) -> WordBlock {
        WordBlock::U32(block)
    }

    fn unwrap_block(block: WordBlock) -> Result<Block<Self>, WordBlock> {
        match block {
            WordBlock::U32(block) => Ok(block),
            other => Err(other),
        }
    }
}

impl StorageWord for u64 {
    fn wrap_block(block: Block<Self>) -> WordBlock {
        WordBlock::U64(block)
    }

    fn unwrap_block(block: WordBlock) -> Result<Block<Self>, WordBlock> {
        match block {
            WordBlock::U64(block) => Ok(block),
            other => Err(other),
        }
    }
}

/// Appends the `BITS` row values of `word` to `out`, first row first.
pub fn unpack_word_into<W: PackedWord>(word: W, out: &mut Vec<bool>) {
    out.extend((0..W::BITS).map(|offset| word.has_row(offset)));
}

/// Unpacks a run of packed words (one column, consecutive packed rows) into row values.
pub fn unpack_words<W: PackedWord>(words: &[W]) -> Vec<bool> {
    let mut out = Vec::with_capacity(words.len() * W::BITS as usize);
    for &word in words {
        unpack_word_into(word, &mut out);
    }
    out
}

/// Packs row values into `ceil(values.len() / BITS)` words. Trailing bits of the last word are
/// zero padding.
pub fn pack_bools<W: PackedWord>(values: &[bool]) -> Vec<W> {
    let bits = W::BITS as usize;
    let mut words = vec![W::ZERO; values.len().div_ceil(bits)];
    for (row, &value) in values.iter().enumerate() {
        if value {
            words[row / bits] |= W::row_bit((row % bits) as u32);
        }
    }
    words
}

/// Masked popcount over a block of packed words.
///
/// `row_mask[r]` selects the logical rows of packed row `r` that take part in the count. Every
/// word of the block is replaced by the number of selected rows whose bit is set, so summing the
/// block column-wise afterwards yields the masked population count per column.
pub fn popcount_in_place<W: PackedWord>(block: &mut Block<W>, row_mask: &[W]) {
    assert_eq!(
        row_mask.len(),
        block.n_rows(),
        "row mask must hold one word per block row"
    );
    for (row, &mask) in row_mask.iter().enumerate() {
        for word in block.row_mut(row) {
            *word = W::from_count((*word & mask).count_ones());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_bits_are_most_significant_first() {
        assert_eq!(u8::row_bit(0), 0b1000_0000);
        assert_eq!(u8::row_bit(7), 0b0000_0001);
        assert_eq!(u32::row_bit(0), 1 << 31);
        assert_eq!(u128::row_bit(127), 1);
    }

    #[test]
    fn unpack_reads_high_bit_first() {
        let values = unpack_words(&[0b1010_0000u8, 0b0000_0001u8]);
        assert_eq!(values.len(), 16);
        assert_eq!(
            values,
            vec![
                true, false, true, false, false, false, false, false, false, false, false,
                false, false, false, false, true
            ]
        );
    }

    #[test]
    fn pack_pads_the_last_word_with_zeros() {
        let mut values = vec![false; 40];
        values[0] = true;
        values[33] = true;
        values[39] = true;
        let words: Vec<u32> = pack_bools(&values);
        assert_eq!(words, vec![1 << 31, (1 << 30) | (1 << 24)]);

        let unpacked = unpack_words(&words);
        assert_eq!(&unpacked[..40], values.as_slice());
        assert!(unpacked[40..].iter().all(|v| !v));
    }

    #[test]
    fn popcount_masks_each_row_independently() {
        let mut block = Block::from_row_major(
            2,
            3,
            vec![u64::MAX, 0b1011, 0, 0b1111, u64::MAX, 0b0110],
        );
        popcount_in_place(&mut block, &[0b0011, 0b0110]);

        assert_eq!(block.row(0), &[2, 2, 0]);
        assert_eq!(block.row(1), &[2, 2, 2]);
        assert_eq!(block.column_totals(), vec![4, 4, 2]);
    }

    #[test]
    fn zero_mask_clears_the_row() {
        let mut block = Block::from_row_major(1, 2, vec![u32::MAX, 7]);
        popcount_in_place(&mut block, &[0]);
        assert_eq!(block.column_totals(), vec![0, 0]);
    }

    #[test]
    fn dtype_display_matches_bits() {
        assert_eq!(WordDtype::U32.to_string(), "uint32");
        assert_eq!(WordDtype::U128.bits(), 128);
        assert_eq!(<u64 as PackedWord>::DTYPE, WordDtype::U64);
    }
}
