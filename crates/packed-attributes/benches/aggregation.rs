use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use packed_attributes::{BlockShape, InMemoryDataset, MatrixOptions, PackedAttributeMatrix};

fn bench_rows() -> usize {
    std::env::var("PACKED_ATTRIBUTES_BENCH_ROWS")
        .ok()
        .and_then(|v| v.replace('_', "").parse::<usize>().ok())
        .filter(|&v| v >= 10_000 && v <= 10_000_000)
        .unwrap_or(1_000_000)
}

const N_COLS: usize = 256;
const N_DATASETS: usize = 4;

fn build_matrix(rows: usize) -> PackedAttributeMatrix<InMemoryDataset<u64>> {
    let per_dataset = rows / N_DATASETS;
    let n_packed = per_dataset.div_ceil(64);
    let mut state = 0x9e37_79b9_7f4a_7c15u64;
    let datasets = (0..N_DATASETS)
        .map(|_| {
            let words = (0..n_packed * N_COLS)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    state
                })
                .collect();
            InMemoryDataset::new(n_packed, N_COLS, words)
                .unwrap()
                .with_chunk_shape(BlockShape::new(1_024, 64))
        })
        .collect();
    PackedAttributeMatrix::new(datasets, &[per_dataset; N_DATASETS], MatrixOptions::default())
        .unwrap()
}

fn bench_sum_rows(c: &mut Criterion) {
    let rows = bench_rows();
    let mut matrix = build_matrix(rows);
    // Tombstone every 10th row so the physical-row translation is exercised.
    let removed: Vec<usize> = (0..rows / 2).step_by(10).collect();
    matrix.remove_rows(&removed).unwrap();
    let (total, _) = matrix.shape();

    let mut group = c.benchmark_group("sum_rows");
    for fraction in [1000usize, 100, 10] {
        let selected: Vec<usize> = (0..total).step_by(fraction).collect();
        group.throughput(Throughput::Elements(selected.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("every_{fraction}th")),
            &selected,
            |b, selected| b.iter(|| black_box(matrix.sum_rows(black_box(selected)).unwrap())),
        );
    }
    group.finish();
}

fn bench_get_column(c: &mut Criterion) {
    let matrix = build_matrix(bench_rows());
    let (total, _) = matrix.shape();

    let mut group = c.benchmark_group("get_column");
    group.throughput(Throughput::Elements(total as u64));
    group.bench_function("column_0", |b| {
        b.iter(|| black_box(matrix.get_column(black_box(0)).unwrap()))
    });
    group.finish();
}

criterion_group!(benches, bench_sum_rows, bench_get_column);
criterion_main!(benches);
