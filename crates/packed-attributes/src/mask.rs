#![forbid(unsafe_code)]

use crate::error::ConfigError;
use crate::word::PackedWord;

pub const SUPPORTED_MASK_WIDTHS: [u32; 5] = [8, 16, 32, 64, 128];

/// Row selection mask, one bit per physical row, in the word width it was built for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowMask {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    U128(Vec<u128>),
}

impl RowMask {
    /// Number of mask words.
    pub fn len(&self) -> usize {
        match self {
            RowMask::U8(words) => words.len(),
            RowMask::U16(words) => words.len(),
            RowMask::U32(words) => words.len(),
            RowMask::U64(words) => words.len(),
            RowMask::U128(words) => words.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn word_width(&self) -> u32 {
        match self {
            RowMask::U8(_) => 8,
            RowMask::U16(_) => 16,
            RowMask::U32(_) => 32,
            RowMask::U64(_) => 64,
            RowMask::U128(_) => 128,
        }
    }

    /// Total number of selected rows.
    pub fn count_selected(&self) -> usize {
        fn ones<W: PackedWord>(words: &[W]) -> usize {
            words.iter().map(|w| w.count_ones() as usize).sum()
        }
        match self {
            RowMask::U8(words) => ones(words),
            RowMask::U16(words) => ones(words),
            RowMask::U32(words) => ones(words),
            RowMask::U64(words) => ones(words),
            RowMask::U128(words) => ones(words),
        }
    }
}

/// Builds the mask selecting `rows` out of `row_count` rows packed `word_width` rows per word.
///
/// The result always has `ceil(row_count / word_width)` words, even when `rows` is empty.
pub fn build_row_mask(
    rows: &[usize],
    row_count: usize,
    word_width: u32,
) -> Result<RowMask, ConfigError> {
    Ok(match word_width {
        8 => RowMask::U8(build_mask_words(rows, row_count)),
        16 => RowMask::U16(build_mask_words(rows, row_count)),
        32 => RowMask::U32(build_mask_words(rows, row_count)),
        64 => RowMask::U64(build_mask_words(rows, row_count)),
        128 => RowMask::U128(build_mask_words(rows, row_count)),
        other => return Err(ConfigError::UnsupportedMaskWidth(other)),
    })
}

/// Typed form of [`build_row_mask`] for callers that already know the word type.
///
/// Rows at or beyond `row_count` are a caller bug; they trip a debug assertion and are
/// otherwise ignored.
pub fn build_mask_words<W: PackedWord>(rows: &[usize], row_count: usize) -> Vec<W> {
    let bits = W::BITS as usize;
    let mut masks = vec![W::ZERO; row_count.div_ceil(bits)];
    for &row in rows {
        debug_assert!(row < row_count, "mask row {row} >= row count {row_count}");
        if let Some(word) = masks.get_mut(row / bits) {
            *word |= W::row_bit((row % bits) as u32);
        }
    }
    masks
}
