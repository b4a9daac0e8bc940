#![forbid(unsafe_code)]

use crate::error::ConfigError;
use crate::word::{pack_bools, PackedWord, StorageWord, WordDtype};
use std::fmt;
use std::io;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Rows × columns of packed words read per I/O request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockShape {
    pub rows: usize,
    pub cols: usize,
}

impl BlockShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }
}

/// A dense row-major block of packed words.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block<W> {
    n_rows: usize,
    n_cols: usize,
    words: Vec<W>,
}

impl<W: PackedWord> Block<W> {
    pub fn from_row_major(n_rows: usize, n_cols: usize, words: Vec<W>) -> Self {
        assert_eq!(
            words.len(),
            n_rows * n_cols,
            "block buffer does not match its shape"
        );
        Self {
            n_rows,
            n_cols,
            words,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn words(&self) -> &[W] {
        &self.words
    }

    pub fn row(&self, row: usize) -> &[W] {
        &self.words[row * self.n_cols..(row + 1) * self.n_cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [W] {
        &mut self.words[row * self.n_cols..(row + 1) * self.n_cols]
    }

    /// Column-wise sum of the block, interpreting every word as a popcount result.
    pub fn column_totals(&self) -> Vec<u64> {
        let mut totals = vec![0u64; self.n_cols];
        for row in self.words.chunks_exact(self.n_cols.max(1)) {
            for (total, word) in totals.iter_mut().zip(row) {
                *total += word.count_value();
            }
        }
        totals
    }
}

/// A block as returned by a backing dataset, tagged with its storage width.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WordBlock {
    U32(Block<u32>),
    U64(Block<u64>),
}

impl WordBlock {
    pub fn dtype(&self) -> WordDtype {
        match self {
            WordBlock::U32(_) => WordDtype::U32,
            WordBlock::U64(_) => WordDtype::U64,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        match self {
            WordBlock::U32(block) => (block.n_rows(), block.n_cols()),
            WordBlock::U64(block) => (block.n_rows(), block.n_cols()),
        }
    }
}

/// Storage abstraction for one chunked 2-D array of packed words.
///
/// The matrix relies on this trait to:
/// - validate that a collection of datasets is compatible (dtype, column count)
/// - pick a default I/O block shape
/// - read rectangular slices, one packed row subset and column range at a time
///
/// Implementations own their handles; the matrix never opens or closes anything.
pub trait PackedDataset: fmt::Debug {
    fn dtype(&self) -> WordDtype;

    /// Physical row count in packed words. Each packed row holds `dtype().bits()` logical rows.
    fn n_packed_rows(&self) -> usize;

    fn n_cols(&self) -> usize;

    /// Native chunk granularity, if the backend is chunked.
    fn chunk_shape(&self) -> Option<BlockShape> {
        None
    }

    /// Reads the packed rows `rows` (ascending, unique) restricted to the column range `cols`.
    ///
    /// The returned block must be `rows.len() × cols.len()` words of type `dtype()`.
    fn read_block(&self, rows: &[usize], cols: Range<usize>) -> io::Result<WordBlock>;
}

impl<D: PackedDataset + ?Sized> PackedDataset for &D {
    fn dtype(&self) -> WordDtype {
        (**self).dtype()
    }

    fn n_packed_rows(&self) -> usize {
        (**self).n_packed_rows()
    }

    fn n_cols(&self) -> usize {
        (**self).n_cols()
    }

    fn chunk_shape(&self) -> Option<BlockShape> {
        (**self).chunk_shape()
    }

    fn read_block(&self, rows: &[usize], cols: Range<usize>) -> io::Result<WordBlock> {
        (**self).read_block(rows, cols)
    }
}

impl<D: PackedDataset + ?Sized> PackedDataset for Arc<D> {
    fn dtype(&self) -> WordDtype {
        (**self).dtype()
    }

    fn n_packed_rows(&self) -> usize {
        (**self).n_packed_rows()
    }

    fn n_cols(&self) -> usize {
        (**self).n_cols()
    }

    fn chunk_shape(&self) -> Option<BlockShape> {
        (**self).chunk_shape()
    }

    fn read_block(&self, rows: &[usize], cols: Range<usize>) -> io::Result<WordBlock> {
        (**self).read_block(rows, cols)
    }
}

impl<D: PackedDataset + ?Sized> PackedDataset for Box<D> {
    fn dtype(&self) -> WordDtype {
        (**self).dtype()
    }

    fn n_packed_rows(&self) -> usize {
        (**self).n_packed_rows()
    }

    fn n_cols(&self) -> usize {
        (**self).n_cols()
    }

    fn chunk_shape(&self) -> Option<BlockShape> {
        (**self).chunk_shape()
    }

    fn read_block(&self, rows: &[usize], cols: Range<usize>) -> io::Result<WordBlock> {
        (**self).read_block(rows, cols)
    }
}

/// A [`PackedDataset`] over an in-memory row-major word buffer.
///
/// Mostly useful for tests and for small collections that were already loaded; it counts
/// `read_block` calls so callers can check how much I/O a query issued.
#[derive(Debug)]
pub struct InMemoryDataset<W> {
    n_packed_rows: usize,
    n_cols: usize,
    words: Vec<W>,
    chunks: Option<BlockShape>,
    reads: AtomicUsize,
}

impl<W: StorageWord> InMemoryDataset<W> {
    pub fn new(n_packed_rows: usize, n_cols: usize, words: Vec<W>) -> Result<Self, ConfigError> {
        if words.len() != n_packed_rows * n_cols {
            return Err(ConfigError::BufferLength {
                expected: n_packed_rows * n_cols,
                found: words.len(),
            });
        }
        Ok(Self {
            n_packed_rows,
            n_cols,
            words,
            chunks: None,
            reads: AtomicUsize::new(0),
        })
    }

    /// Packs a logical boolean matrix (`rows[r][c]`) column by column.
    pub fn from_bool_rows(n_cols: usize, rows: &[Vec<bool>]) -> Result<Self, ConfigError> {
        if let Some((row, values)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
            return Err(ConfigError::RaggedRow {
                row,
                expected: n_cols,
                found: values.len(),
            });
        }

        let n_packed_rows = rows.len().div_ceil(W::BITS as usize);
        let mut words = vec![W::ZERO; n_packed_rows * n_cols];
        let mut column = Vec::with_capacity(rows.len());
        for col in 0..n_cols {
            column.clear();
            column.extend(rows.iter().map(|r| r[col]));
            for (packed_row, word) in pack_bools::<W>(&column).into_iter().enumerate() {
                words[packed_row * n_cols + col] = word;
            }
        }

        Self::new(n_packed_rows, n_cols, words)
    }

    pub fn with_chunk_shape(mut self, chunks: BlockShape) -> Self {
        self.chunks = Some(chunks);
        self
    }

    /// Grows the physical allocation to `n_packed_rows` with zero rows. Never shrinks.
    pub fn padded_to(mut self, n_packed_rows: usize) -> Self {
        if n_packed_rows > self.n_packed_rows {
            self.words.resize(n_packed_rows * self.n_cols, W::ZERO);
            self.n_packed_rows = n_packed_rows;
        }
        self
    }

    /// Number of `read_block` calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl<W: StorageWord> PackedDataset for InMemoryDataset<W> {
    fn dtype(&self) -> WordDtype {
        W::DTYPE
    }

    fn n_packed_rows(&self) -> usize {
        self.n_packed_rows
    }

    fn n_cols(&self) -> usize {
        self.n_cols
    }

    fn chunk_shape(&self) -> Option<BlockShape> {
        self.chunks
    }

    fn read_block(&self, rows: &[usize], cols: Range<usize>) -> io::Result<WordBlock> {
        if cols.start > cols.end || cols.end > self.n_cols {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "column range {cols:?} is out of bounds for {} columns",
                    self.n_cols
                ),
            ));
        }
        if let Some(&row) = rows.iter().find(|&&row| row >= self.n_packed_rows) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "packed row {row} is out of bounds for {} packed rows",
                    self.n_packed_rows
                ),
            ));
        }

        self.reads.fetch_add(1, Ordering::Relaxed);
        let mut words = Vec::with_capacity(rows.len() * cols.len());
        for &row in rows {
            let offset = row * self.n_cols;
            words.extend_from_slice(&self.words[offset + cols.start..offset + cols.end]);
        }
        Ok(W::wrap_block(Block::from_row_major(
            rows.len(),
            cols.len(),
            words,
        )))
    }
}
