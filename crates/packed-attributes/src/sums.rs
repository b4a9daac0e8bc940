#![forbid(unsafe_code)]

/// Per-column set-bit counts, stored in the narrowest unsigned width that cannot overflow for
/// the number of rows that were summed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnSums {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
}

impl ColumnSums {
    /// All-zero sums for `n_cols` columns, wide enough to count up to `max_count` rows.
    pub fn zeros(n_cols: usize, max_count: usize) -> Self {
        let max_count = max_count as u64;
        if max_count <= u64::from(u8::MAX) {
            ColumnSums::U8(vec![0; n_cols])
        } else if max_count <= u64::from(u16::MAX) {
            ColumnSums::U16(vec![0; n_cols])
        } else if max_count <= u64::from(u32::MAX) {
            ColumnSums::U32(vec![0; n_cols])
        } else {
            ColumnSums::U64(vec![0; n_cols])
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnSums::U8(v) => v.len(),
            ColumnSums::U16(v) => v.len(),
            ColumnSums::U32(v) => v.len(),
            ColumnSums::U64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn width_bits(&self) -> u32 {
        match self {
            ColumnSums::U8(_) => 8,
            ColumnSums::U16(_) => 16,
            ColumnSums::U32(_) => 32,
            ColumnSums::U64(_) => 64,
        }
    }

    pub fn get(&self, col: usize) -> Option<u64> {
        match self {
            ColumnSums::U8(v) => v.get(col).map(|&c| u64::from(c)),
            ColumnSums::U16(v) => v.get(col).map(|&c| u64::from(c)),
            ColumnSums::U32(v) => v.get(col).map(|&c| u64::from(c)),
            ColumnSums::U64(v) => v.get(col).copied(),
        }
    }

    pub fn to_u64_vec(&self) -> Vec<u64> {
        (0..self.len()).filter_map(|col| self.get(col)).collect()
    }

    /// Adds `scale * counts` to the columns starting at `offset`.
    ///
    /// Callers size the sums with the total number of counted rows, so every addition fits.
    pub(crate) fn add_scaled_at(&mut self, offset: usize, counts: &[u64], scale: u64) {
        macro_rules! add {
            ($sums:expr, $ty:ty) => {
                for (sum, &count) in $sums[offset..offset + counts.len()].iter_mut().zip(counts) {
                    *sum += (count * scale) as $ty;
                }
            };
        }
        match self {
            ColumnSums::U8(v) => add!(v, u8),
            ColumnSums::U16(v) => add!(v, u16),
            ColumnSums::U32(v) => add!(v, u32),
            ColumnSums::U64(v) => add!(v, u64),
        }
    }
}
