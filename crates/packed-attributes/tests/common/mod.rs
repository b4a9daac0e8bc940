#![allow(dead_code)]

use packed_attributes::{BlockShape, InMemoryDataset, MatrixOptions, PackedAttributeMatrix, StorageWord};

/// Deterministic pseudo-random boolean matrix.
pub fn pattern_matrix(n_rows: usize, n_cols: usize, seed: u64) -> Vec<Vec<bool>> {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    (0..n_rows)
        .map(|_| {
            (0..n_cols)
                .map(|_| {
                    state = state
                        .wrapping_mul(6_364_136_223_846_793_005)
                        .wrapping_add(1_442_695_040_888_963_407);
                    (state >> 33) & 1 == 1
                })
                .collect()
        })
        .collect()
}

/// Splits `rows` into consecutive datasets of the given sizes.
pub fn split_datasets<W: StorageWord>(
    rows: &[Vec<bool>],
    n_cols: usize,
    sizes: &[usize],
    chunks: BlockShape,
) -> Vec<InMemoryDataset<W>> {
    let mut start = 0;
    sizes
        .iter()
        .map(|&size| {
            let part = &rows[start..start + size];
            start += size;
            InMemoryDataset::from_bool_rows(n_cols, part)
                .unwrap()
                .with_chunk_shape(chunks)
        })
        .collect()
}

pub fn build_matrix<W: StorageWord>(
    rows: &[Vec<bool>],
    n_cols: usize,
    sizes: &[usize],
    chunks: BlockShape,
) -> PackedAttributeMatrix<InMemoryDataset<W>> {
    let datasets = split_datasets::<W>(rows, n_cols, sizes, chunks);
    PackedAttributeMatrix::new(datasets, sizes, MatrixOptions::default()).unwrap()
}

pub fn column_of(rows: &[Vec<bool>], col: usize) -> Vec<bool> {
    rows.iter().map(|row| row[col]).collect()
}

/// Reference per-column counts over `selected` (with multiplicity).
pub fn reference_sums(rows: &[Vec<bool>], n_cols: usize, selected: &[usize]) -> Vec<u64> {
    (0..n_cols)
        .map(|col| selected.iter().filter(|&&r| rows[r][col]).count() as u64)
        .collect()
}
