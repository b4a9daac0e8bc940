#![forbid(unsafe_code)]

use crate::dataset::{Block, BlockShape, PackedDataset};
use crate::error::{ConfigError, MatrixError, Result};
use crate::index::{DatasetRows, RowIndex};
use crate::mask::build_mask_words;
use crate::sums::ColumnSums;
use crate::word::{popcount_in_place, unpack_words, StorageWord, WordDtype};
use std::collections::BTreeMap;
use std::io;
use std::ops::Range;

/// Packed rows per block when neither the options nor the first dataset specify a chunk shape.
pub const DEFAULT_ROW_BLOCK_SIZE: usize = 4_096;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatrixOptions {
    /// Packed rows per I/O block. Defaults to the first dataset's chunk rows.
    pub row_block_size: Option<usize>,
    /// Columns per I/O block. Defaults to the first dataset's chunk columns.
    pub col_block_size: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageWidth {
    U32,
    U64,
}

/// A logical boolean matrix over an ordered collection of bit-packed datasets.
///
/// Rows are the concatenation, in dataset order, of each dataset's surviving rows. Removing rows
/// only updates the row index; the datasets are never written to.
///
/// All reads go through blocks of at most `block_shape()` packed words.
#[derive(Debug)]
pub struct PackedAttributeMatrix<D> {
    datasets: Vec<D>,
    index: RowIndex,
    n_cols: usize,
    width: StorageWidth,
    block: BlockShape,
}

impl<D: PackedDataset> PackedAttributeMatrix<D> {
    /// `n_rows[i]` is the logical row count of `datasets[i]`; any physical rows past it are
    /// padding.
    pub fn new(datasets: Vec<D>, n_rows: &[usize], options: MatrixOptions) -> Result<Self> {
        let first = datasets.first().ok_or(ConfigError::NoDatasets)?;
        if n_rows.len() != datasets.len() {
            return Err(ConfigError::RowCountLength {
                datasets: datasets.len(),
                row_counts: n_rows.len(),
            }
            .into());
        }

        let dtype = first.dtype();
        let n_cols = first.n_cols();
        let width = match dtype {
            WordDtype::U32 => StorageWidth::U32,
            WordDtype::U64 => StorageWidth::U64,
            other => return Err(ConfigError::UnsupportedDtype(other).into()),
        };

        for (i, (dataset, &rows)) in datasets.iter().zip(n_rows).enumerate() {
            if dataset.n_cols() != n_cols {
                return Err(ConfigError::ColumnCountMismatch {
                    dataset: i,
                    expected: n_cols,
                    found: dataset.n_cols(),
                }
                .into());
            }
            if dataset.dtype() != dtype {
                return Err(ConfigError::DtypeMismatch {
                    dataset: i,
                    expected: dtype,
                    found: dataset.dtype(),
                }
                .into());
            }
            let capacity = dataset.n_packed_rows() * dtype.bits() as usize;
            if rows > capacity {
                return Err(ConfigError::RowCountExceedsCapacity {
                    dataset: i,
                    rows,
                    capacity,
                }
                .into());
            }
        }

        let chunks = first.chunk_shape();
        let block = BlockShape::new(
            options
                .row_block_size
                .or(chunks.map(|c| c.rows))
                .unwrap_or(DEFAULT_ROW_BLOCK_SIZE),
            options
                .col_block_size
                .or(chunks.map(|c| c.cols))
                .unwrap_or(n_cols.max(1)),
        );
        if block.rows == 0 || block.cols == 0 {
            return Err(ConfigError::ZeroBlockSize.into());
        }

        let index = RowIndex::new(n_rows);
        log::debug!(
            "packed attribute matrix: {} datasets, shape ({}, {}), {} words, {}x{} blocks",
            datasets.len(),
            index.total_rows(),
            n_cols,
            dtype,
            block.rows,
            block.cols
        );

        Ok(Self {
            datasets,
            index,
            n_cols,
            width,
            block,
        })
    }

    /// `(rows, columns)` of the logical matrix.
    pub fn shape(&self) -> (usize, usize) {
        (self.index.total_rows(), self.n_cols)
    }

    pub fn dtype(&self) -> WordDtype {
        match self.width {
            StorageWidth::U32 => WordDtype::U32,
            StorageWidth::U64 => WordDtype::U64,
        }
    }

    pub fn block_shape(&self) -> BlockShape {
        self.block
    }

    pub fn datasets(&self) -> &[D] {
        &self.datasets
    }

    pub fn n_datasets(&self) -> usize {
        self.datasets.len()
    }

    /// Per-dataset row bookkeeping, in dataset order.
    pub fn dataset_rows(&self) -> &[DatasetRows] {
        self.index.datasets()
    }

    /// `(dataset, relative_row)` holding a global row.
    pub fn locate(&self, row: usize) -> Result<(usize, usize)> {
        self.index.locate(row).ok_or(MatrixError::RowOutOfBounds {
            row,
            rows: self.index.total_rows(),
        })
    }

    pub fn to_global(&self, dataset: usize, relative_row: usize) -> Result<usize> {
        self.index.to_global(dataset, relative_row)
    }

    /// Logically removes global rows. Either every row is removed or, on an out-of-bounds row,
    /// nothing is.
    pub fn remove_rows(&mut self, rows: &[usize]) -> Result<()> {
        self.index.remove(rows)?;
        log::debug!(
            "removed {} rows; shape is now ({}, {})",
            rows.len(),
            self.index.total_rows(),
            self.n_cols
        );
        Ok(())
    }

    /// One column of the logical matrix, in global row order.
    pub fn get_column(&self, col: usize) -> Result<Vec<bool>> {
        if col >= self.n_cols {
            return Err(MatrixError::ColumnOutOfBounds {
                col,
                cols: self.n_cols,
            });
        }
        match self.width {
            StorageWidth::U32 => self.extract_column::<u32>(col),
            StorageWidth::U64 => self.extract_column::<u64>(col),
        }
    }

    /// Number of set bits per column over `rows`.
    ///
    /// Rows are counted with multiplicity: a row listed twice contributes twice. The result
    /// width is the narrowest one that can hold `rows.len()`.
    pub fn sum_rows(&self, rows: &[usize]) -> Result<ColumnSums> {
        let mut sums = ColumnSums::zeros(self.n_cols, rows.len());
        if rows.is_empty() {
            return Ok(sums);
        }

        let mut sorted = rows.to_vec();
        sorted.sort_unstable();

        let mut relative: Vec<Vec<usize>> = vec![Vec::new(); self.datasets.len()];
        for &row in &sorted {
            let (dataset, relative_row) = self.locate(row)?;
            relative[dataset].push(relative_row);
        }

        for (i, ((dataset, state), relative_rows)) in self
            .datasets
            .iter()
            .zip(self.index.datasets())
            .zip(relative)
            .enumerate()
        {
            if relative_rows.is_empty() {
                continue;
            }
            let physical = state.physical_rows(&relative_rows);
            let groups = multiplicity_groups(&physical);
            log::trace!(
                "dataset {i}: {} selected rows in {} multiplicity groups, {} tombstones",
                physical.len(),
                groups.len(),
                state.removed().len()
            );

            match self.width {
                StorageWidth::U32 => {
                    self.accumulate_masked::<u32>(dataset, state, &groups, &mut sums)?
                }
                StorageWidth::U64 => {
                    self.accumulate_masked::<u64>(dataset, state, &groups, &mut sums)?
                }
            }
        }

        Ok(sums)
    }

    fn extract_column<W: StorageWord>(&self, col: usize) -> Result<Vec<bool>> {
        let bits = W::BITS as usize;
        let mut column = Vec::with_capacity(self.index.total_rows());

        for (i, (dataset, rows)) in self.datasets.iter().zip(self.index.datasets()).enumerate() {
            if rows.current_rows() == 0 {
                continue;
            }

            let keep = rows.keep_mask();
            let mut kept = keep.iter_ones().peekable();
            let n_packed = rows.initial_rows().div_ceil(bits);
            let mut packed_rows = Vec::with_capacity(self.block.rows);
            let mut reads = 0usize;

            for block_start in (0..n_packed).step_by(self.block.rows) {
                let block_end = (block_start + self.block.rows).min(n_packed);
                packed_rows.clear();
                packed_rows.extend(block_start..block_end);

                let block = read_words::<D, W>(dataset, &packed_rows, col..col + 1)?;
                reads += 1;
                let values = unpack_words(block.words());
                let first_row = block_start * bits;
                let end_row = block_end * bits;
                while let Some(physical) = kept.next_if(|&p| p < end_row) {
                    column.push(values[physical - first_row]);
                }
            }
            log::trace!("dataset {i}: column {col} read in {reads} blocks");
        }

        debug_assert_eq!(column.len(), self.index.total_rows());
        Ok(column)
    }

    /// Adds the masked popcounts of one dataset to `sums`, each group scaled by its
    /// multiplicity. Every packed row is read at most once per column block.
    fn accumulate_masked<W: StorageWord>(
        &self,
        dataset: &D,
        rows: &DatasetRows,
        groups: &[(u64, Vec<usize>)],
        sums: &mut ColumnSums,
    ) -> Result<()> {
        let masks: Vec<(u64, Vec<W>)> = groups
            .iter()
            .map(|(multiplicity, physical_rows)| {
                (*multiplicity, build_mask_words(physical_rows, rows.initial_rows()))
            })
            .collect();
        let n_words = rows.initial_rows().div_ceil(W::BITS as usize);
        let rows_to_load: Vec<usize> = (0..n_words)
            .filter(|&p| masks.iter().any(|(_, mask)| mask[p] != W::ZERO))
            .collect();

        for row_block in rows_to_load.chunks(self.block.rows) {
            let block_masks: Vec<(u64, Vec<W>)> = masks
                .iter()
                .map(|(multiplicity, mask)| {
                    (*multiplicity, row_block.iter().map(|&p| mask[p]).collect())
                })
                .collect();
            for col_start in (0..self.n_cols).step_by(self.block.cols) {
                let cols = col_start..(col_start + self.block.cols).min(self.n_cols);
                let block = read_words::<D, W>(dataset, row_block, cols)?;
                for (multiplicity, block_mask) in &block_masks {
                    let mut counted = block.clone();
                    popcount_in_place(&mut counted, block_mask);
                    sums.add_scaled_at(col_start, &counted.column_totals(), *multiplicity);
                }
            }
        }
        Ok(())
    }
}

/// Groups an ascending row list by how often each row occurs: `(m, rows)` holds, in
/// ascending order, every distinct row listed exactly `m` times.
fn multiplicity_groups(sorted_rows: &[usize]) -> Vec<(u64, Vec<usize>)> {
    let mut groups: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    let mut run_start = 0;
    for i in 1..=sorted_rows.len() {
        if i == sorted_rows.len() || sorted_rows[i] != sorted_rows[run_start] {
            let multiplicity = (i - run_start) as u64;
            groups.entry(multiplicity).or_default().push(sorted_rows[run_start]);
            run_start = i;
        }
    }
    groups.into_iter().collect()
}

fn read_words<D: PackedDataset, W: StorageWord>(
    dataset: &D,
    rows: &[usize],
    cols: Range<usize>,
) -> Result<Block<W>> {
    let expected = (rows.len(), cols.len());
    let block = W::unwrap_block(dataset.read_block(rows, cols)?).map_err(|other| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("dataset returned {} words, expected {}", other.dtype(), W::DTYPE),
        )
    })?;
    if (block.n_rows(), block.n_cols()) != expected {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "dataset returned a {}x{} block, expected {}x{}",
                block.n_rows(),
                block.n_cols(),
                expected.0,
                expected.1
            ),
        )
        .into());
    }
    Ok(block)
}
