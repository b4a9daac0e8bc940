#![no_main]

use libfuzzer_sys::fuzz_target;
use packed_attributes::{BlockShape, InMemoryDataset, MatrixOptions, PackedAttributeMatrix};

/// Keep the harness itself bounded.
const MAX_INPUT_BYTES: usize = 4_096;
const N_COLS: usize = 3;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let data = &data[..data.len().min(MAX_INPUT_BYTES)];

    // Header: dataset count, block rows, block cols; then words, then row operations.
    let n_datasets = usize::from(data[0] % 4) + 1;
    let chunks = BlockShape::new(usize::from(data[1] % 4) + 1, usize::from(data[2] % 3) + 1);
    let mut rest = &data[3..];

    let mut datasets = Vec::with_capacity(n_datasets);
    let mut n_rows = Vec::with_capacity(n_datasets);
    for _ in 0..n_datasets {
        let Some((&len, tail)) = rest.split_first() else {
            return;
        };
        let n_packed = usize::from(len % 3);
        let needed = n_packed * N_COLS;
        if tail.len() < needed {
            return;
        }
        let words: Vec<u32> = tail[..needed]
            .iter()
            .map(|&b| u32::from(b).rotate_left(u32::from(b)))
            .collect();
        rest = &tail[needed..];

        let declared = (usize::from(len) * 7) % (n_packed * 32 + 1);
        datasets.push(
            InMemoryDataset::new(n_packed, N_COLS, words)
                .expect("buffer sized from shape")
                .with_chunk_shape(chunks),
        );
        n_rows.push(declared);
    }

    let mut matrix = PackedAttributeMatrix::new(datasets, &n_rows, MatrixOptions::default())
        .expect("collection is consistent");

    for op in rest.chunks(2) {
        let (total, _) = matrix.shape();
        let row = usize::from(op[0]) + usize::from(*op.get(1).unwrap_or(&0)) * 256;
        if op[0] % 2 == 0 {
            let result = matrix.remove_rows(&[row]);
            assert_eq!(result.is_ok(), row < total);
        } else {
            let rows: Vec<usize> = (0..total).filter(|r| r % (row % 7 + 1) == 0).collect();
            let sums = matrix.sum_rows(&rows).expect("rows are in bounds");
            for col in 0..N_COLS {
                let column = matrix.get_column(col).expect("column in bounds");
                assert_eq!(column.len(), total);
                let expected = rows.iter().filter(|&&r| column[r]).count() as u64;
                assert_eq!(sums.get(col), Some(expected));
            }
        }
    }
});
