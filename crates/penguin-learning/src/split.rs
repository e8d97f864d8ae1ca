//! Seeded, label-stratified train/validation split.

use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

/// Row indices of the two partitions, each in original table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StratifiedSplit {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

impl StratifiedSplit {
    /// Split row indices so every label keeps roughly its share in both partitions.
    ///
    /// Per label, `round(n * test_size)` rows go to validation, at least one when
    /// the label has two or more rows, and never all of them. A label with a single
    /// row stays in training. The result depends only on `labels`, `test_size`
    /// and `seed`.
    pub fn new(labels: &[String], test_size: f64, seed: u64) -> Self {
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (row, label) in labels.iter().enumerate() {
            groups.entry(label.as_str()).or_default().push(row);
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut train = Vec::with_capacity(labels.len());
        let mut validation = Vec::new();

        for rows in groups.values_mut() {
            let n = rows.len();
            let n_test = if n < 2 {
                0
            } else {
                ((n as f64 * test_size).round() as usize).clamp(1, n - 1)
            };

            rows.shuffle(&mut rng);
            validation.extend_from_slice(&rows[..n_test]);
            train.extend_from_slice(&rows[n_test..]);
        }

        train.sort_unstable();
        validation.sort_unstable();
        Self { train, validation }
    }
}

/// Gather `rows` of `df` in the given order.
pub fn take_rows(df: &DataFrame, rows: &[usize]) -> PolarsResult<DataFrame> {
    let idx: Vec<IdxSize> = rows.iter().map(|&r| r as IdxSize).collect();
    df.take(&IdxCa::from_vec("idx".into(), idx))
}
