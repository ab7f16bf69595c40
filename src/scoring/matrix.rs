//! Signal-minus-background scoring matrices

use rustc_hash::FxHashMap;

/// Word (or journal) → signal frequency − background frequency
pub type ScoreMatrix = FxHashMap<String, f64>;

/// Subtract background frequencies from signal frequencies.
///
/// Only keys present in both maps survive. With `min_difference` set, keys
/// whose difference falls below it are dropped.
pub fn build_matrix(
    signal: &FxHashMap<String, f64>,
    background: &FxHashMap<String, f64>,
    min_difference: Option<f64>,
) -> ScoreMatrix {
    signal
        .iter()
        .filter_map(|(key, &s)| {
            let b = background.get(key)?;
            let diff = s - b;
            match min_difference {
                Some(min) if diff < min => None,
                _ => Some((key.clone(), diff)),
            }
        })
        .collect()
}
