//! Bit-packed boolean attribute matrices backed by externally chunked datasets.
//!
//! This crate focuses on:
//! - Column extraction and masked per-column popcounts over packed words.
//! - Virtualizing several backing datasets into one logical row space.
//! - Logical row removal (tombstones) without rewriting the backing storage.
//! - Streaming every read through fixed-size blocks so memory stays bounded by the block shape.

#![forbid(unsafe_code)]

mod bitmap;
mod dataset;
mod error;
mod index;
mod mask;
mod matrix;
mod sums;
mod word;

pub use crate::bitmap::BitVec;
pub use crate::dataset::{Block, BlockShape, InMemoryDataset, PackedDataset, WordBlock};
pub use crate::error::{ConfigError, MatrixError, Result};
pub use crate::index::{DatasetRows, RowIndex};
pub use crate::mask::{build_mask_words, build_row_mask, RowMask, SUPPORTED_MASK_WIDTHS};
pub use crate::matrix::{MatrixOptions, PackedAttributeMatrix, DEFAULT_ROW_BLOCK_SIZE};
pub use crate::sums::ColumnSums;
pub use crate::word::{
    pack_bools, popcount_in_place, unpack_word_into, unpack_words, PackedWord, StorageWord,
    WordDtype,
};
