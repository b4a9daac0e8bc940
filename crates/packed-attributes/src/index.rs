#![forbid(unsafe_code)]

use crate::bitmap::BitVec;
use crate::error::{MatrixError, Result};
use std::ops::Range;

/// Row bookkeeping for one backing dataset.
///
/// `removed` holds physical row slots (relative to the dataset) that are tombstoned. The
/// dataset's surviving rows occupy the half-open global range `start..stop`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetRows {
    initial_rows: usize,
    current_rows: usize,
    removed: Vec<usize>,
    start: usize,
    stop: usize,
}

impl DatasetRows {
    fn new(initial_rows: usize) -> Self {
        Self {
            initial_rows,
            current_rows: initial_rows,
            removed: Vec::new(),
            start: 0,
            stop: 0,
        }
    }

    /// Row count declared at construction, excluding physical padding.
    pub fn initial_rows(&self) -> usize {
        self.initial_rows
    }

    pub fn current_rows(&self) -> usize {
        self.current_rows
    }

    /// Sorted tombstoned physical rows.
    pub fn removed(&self) -> &[usize] {
        &self.removed
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn stop(&self) -> usize {
        self.stop
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.stop
    }

    /// Physical slots of an ascending run of relative rows, walking the tombstones once.
    ///
    /// Relative row `r` maps to the smallest `p` with `p == r + |{t in removed : t <= p}|`.
    pub fn physical_rows(&self, sorted_relative_rows: &[usize]) -> Vec<usize> {
        debug_assert!(sorted_relative_rows.windows(2).all(|w| w[0] <= w[1]));
        let mut skipped = 0;
        sorted_relative_rows
            .iter()
            .map(|&relative| {
                while skipped < self.removed.len() && self.removed[skipped] <= relative + skipped {
                    skipped += 1;
                }
                relative + skipped
            })
            .collect()
    }

    /// Physical rows that are still part of the logical matrix: below the declared row count
    /// and not tombstoned.
    pub fn keep_mask(&self) -> BitVec {
        let mut keep = BitVec::with_len_all_true(self.initial_rows);
        keep.clear_all(&self.removed);
        keep
    }

    fn merge_removed(&mut self, mut rows: Vec<usize>) {
        rows.extend_from_slice(&self.removed);
        rows.sort_unstable();
        rows.dedup();
        self.removed = rows;
        self.current_rows = self.initial_rows - self.removed.len();
    }
}

/// Maps the logical row space onto an ordered collection of datasets.
///
/// Ranges are kept contiguous: `start[0] == 0`, `stop[i] == start[i] + current_rows[i]` and
/// `start[i + 1] == stop[i]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowIndex {
    datasets: Vec<DatasetRows>,
    total_rows: usize,
}

impl RowIndex {
    pub fn new(initial_rows: &[usize]) -> Self {
        let mut index = Self {
            datasets: initial_rows.iter().copied().map(DatasetRows::new).collect(),
            total_rows: 0,
        };
        index.recompute_offsets();
        index
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn datasets(&self) -> &[DatasetRows] {
        &self.datasets
    }

    /// `(dataset, relative_row)` for a global row, or `None` past the end.
    pub fn locate(&self, global_row: usize) -> Option<(usize, usize)> {
        if global_row >= self.total_rows {
            return None;
        }
        // Empty datasets have `start == stop` and are never selected here.
        let dataset = self.datasets.partition_point(|d| d.stop <= global_row);
        let rows = self.datasets.get(dataset)?;
        Some((dataset, global_row - rows.start))
    }

    pub fn to_global(&self, dataset: usize, relative_row: usize) -> Result<usize> {
        let rows = self
            .datasets
            .get(dataset)
            .ok_or(MatrixError::DatasetOutOfBounds {
                dataset,
                datasets: self.datasets.len(),
            })?;
        if relative_row >= rows.current_rows {
            return Err(MatrixError::RelativeRowOutOfBounds {
                dataset,
                row: relative_row,
                rows: rows.current_rows,
            });
        }
        Ok(rows.start + relative_row)
    }

    /// Tombstones a batch of global rows.
    ///
    /// Every row is located against the current offsets before anything changes, so an
    /// out-of-bounds row leaves the index untouched. A row at relative position `r` of its
    /// dataset tombstones physical slot `r`; slots that are already tombstoned are ignored.
    ///
    /// Repeating a batch is a no-op only while each of its rows still locates to the slot it
    /// tombstoned the first time: no earlier dataset lost rows in the batch and the relative
    /// position is still below the dataset's new row count. Otherwise the repeat tombstones
    /// other slots or fails with [`MatrixError::RowOutOfBounds`].
    pub fn remove(&mut self, global_rows: &[usize]) -> Result<()> {
        let mut pending = vec![Vec::new(); self.datasets.len()];
        for &row in global_rows {
            let (dataset, relative) = self.locate(row).ok_or(MatrixError::RowOutOfBounds {
                row,
                rows: self.total_rows,
            })?;
            pending[dataset].push(relative);
        }

        for (rows, new) in self.datasets.iter_mut().zip(pending) {
            if !new.is_empty() {
                rows.merge_removed(new);
            }
        }
        self.recompute_offsets();
        Ok(())
    }

    fn recompute_offsets(&mut self) {
        let mut stop = 0;
        for rows in &mut self.datasets {
            rows.start = stop;
            stop += rows.current_rows;
            rows.stop = stop;
        }
        self.total_rows = stop;
    }
}
