#![forbid(unsafe_code)]

use crate::word::WordDtype;
use std::io;
use thiserror::Error;

/// Invalid dataset collections or options, reported at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("at least one dataset is required")]
    NoDatasets,
    #[error("got {row_counts} row counts for {datasets} datasets")]
    RowCountLength { datasets: usize, row_counts: usize },
    #[error("all datasets must have the same number of columns: dataset {dataset} has {found}, expected {expected}")]
    ColumnCountMismatch {
        dataset: usize,
        expected: usize,
        found: usize,
    },
    #[error("all datasets must have the same data type: dataset {dataset} is {found}, expected {expected}")]
    DtypeMismatch {
        dataset: usize,
        expected: WordDtype,
        found: WordDtype,
    },
    #[error("unsupported data type {0} for a packed attribute matrix; use uint32 or uint64")]
    UnsupportedDtype(WordDtype),
    #[error("unsupported mask width {0}; use 8, 16, 32, 64 or 128 bits")]
    UnsupportedMaskWidth(u32),
    #[error("dataset {dataset} declares {rows} rows but can hold at most {capacity}")]
    RowCountExceedsCapacity {
        dataset: usize,
        rows: usize,
        capacity: usize,
    },
    #[error("block sizes must be non-zero")]
    ZeroBlockSize,
    #[error("word buffer holds {found} words, expected {expected}")]
    BufferLength { expected: usize, found: usize },
    #[error("row {row} has {found} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("row index {row} is out of bounds for {rows} rows")]
    RowOutOfBounds { row: usize, rows: usize },
    #[error("column index {col} is out of bounds for {cols} columns")]
    ColumnOutOfBounds { col: usize, cols: usize },
    #[error("dataset index {dataset} is out of bounds for {datasets} datasets")]
    DatasetOutOfBounds { dataset: usize, datasets: usize },
    #[error("relative row {row} is out of bounds for dataset {dataset} with {rows} rows")]
    RelativeRowOutOfBounds {
        dataset: usize,
        row: usize,
        rows: usize,
    },
    #[error("dataset read failed: {0}")]
    Io(#[from] io::Error),
}

impl MatrixError {
    /// Whether the error is an out-of-bounds index rather than a configuration or I/O failure.
    pub fn is_index_error(&self) -> bool {
        matches!(
            self,
            MatrixError::RowOutOfBounds { .. }
                | MatrixError::ColumnOutOfBounds { .. }
                | MatrixError::DatasetOutOfBounds { .. }
                | MatrixError::RelativeRowOutOfBounds { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MatrixError>;
