/// Default cap on rendered x positions.
pub const DEFAULT_MAX_POINTS: usize = 30;

/// Indices to keep when thinning `n` points down to roughly `cap`.
///
/// The first and last index are always kept and order is preserved. Below
/// the cap every index is kept.
pub fn smart_sample(n: usize, cap: usize) -> Vec<usize> {
    let cap = cap.max(1);
    if n <= cap {
        return (0..n).collect();
    }

    let step = (n / cap).max(1);
    let mut indices: Vec<usize> = (0..n - 1).step_by(step).collect();
    indices.push(n - 1);
    indices
}

/// Apply `smart_sample` to index-aligned labels and values.
pub fn sample_series(labels: &[String], values: &[f64], cap: usize) -> (Vec<String>, Vec<f64>) {
    let n = labels.len().min(values.len());
    smart_sample(n, cap)
        .into_iter()
        .map(|i| (labels[i].clone(), values[i]))
        .unzip()
}
