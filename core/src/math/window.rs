use ndarray::{Array2, Axis};
use std::f64::consts::PI;

/// Symmetric Hamming window of `taps` points, `0.54 - 0.46 cos(2 pi k / (taps - 1))`.
pub fn hamming(taps: usize) -> Vec<f64> {
    match taps {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let denominator = (taps - 1) as f64;
            (0..taps)
                .map(|k| 0.54 - 0.46 * (2.0 * PI * k as f64 / denominator).cos())
                .collect()
        }
    }
}

/// Source index for every output position of a centring shift of length `len`.
///
/// Output `k` takes input `(k - len / 2) mod len`, so index 0 moves to the
/// middle of the sequence.
pub fn fftshift_indices(len: usize) -> Vec<usize> {
    let half = len / 2;
    (0..len).map(|k| (k + len - half) % len).collect()
}

pub fn fftshift<T: Clone>(values: &[T]) -> Vec<T> {
    fftshift_indices(values.len())
        .into_iter()
        .map(|idx| values[idx].clone())
        .collect()
}

/// Centring shift of every lane of `data` along `axis`.
pub fn fftshift_axis<T: Clone>(data: &Array2<T>, axis: Axis) -> Array2<T> {
    data.select(axis, &fftshift_indices(data.len_of(axis)))
}
