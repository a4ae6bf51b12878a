use ndarray::{Array2, Axis};
use num_complex::Complex64;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

/// Helper that wraps a forward/inverse `rustfft` plan pair for reuse.
///
/// The forward transform is unscaled and the inverse is scaled by `1/N`, so
/// `inverse(forward(x)) == x`. Plans are shared and scratch space is taken
/// per call, so one helper can serve concurrent callers.
#[derive(Clone)]
pub struct FftHelper {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    scratch_len: usize,
    scale: f64,
}

impl FftHelper {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        let scale = if size > 0 { 1.0 / size as f64 } else { 1.0 };
        Self {
            forward,
            inverse,
            scratch_len,
            scale,
        }
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// In-place forward transform. `buffer.len()` must equal `self.len()`.
    pub fn forward(&self, buffer: &mut [Complex64]) {
        debug_assert_eq!(buffer.len(), self.len());
        let mut scratch = self.scratch();
        self.forward.process_with_scratch(buffer, &mut scratch);
    }

    /// In-place inverse transform including the `1/N` scaling.
    pub fn inverse(&self, buffer: &mut [Complex64]) {
        debug_assert_eq!(buffer.len(), self.len());
        let mut scratch = self.scratch();
        self.inverse.process_with_scratch(buffer, &mut scratch);
        for value in buffer.iter_mut() {
            *value *= self.scale;
        }
    }

    /// Forward transform of every lane of `data` along `axis`.
    pub fn forward_axis(&self, data: &mut Array2<Complex64>, axis: Axis) {
        self.transform_axis(data, axis, false);
    }

    /// Inverse transform of every lane of `data` along `axis`.
    pub fn inverse_axis(&self, data: &mut Array2<Complex64>, axis: Axis) {
        self.transform_axis(data, axis, true);
    }

    fn scratch(&self) -> Vec<Complex64> {
        vec![Complex64::zero(); self.scratch_len]
    }

    fn transform_axis(&self, data: &mut Array2<Complex64>, axis: Axis, inverse: bool) {
        let mut lane_buffer = vec![Complex64::zero(); self.len()];
        let mut scratch = self.scratch();
        for mut lane in data.lanes_mut(axis) {
            for (slot, value) in lane_buffer.iter_mut().zip(lane.iter()) {
                *slot = *value;
            }
            if inverse {
                self.inverse
                    .process_with_scratch(&mut lane_buffer, &mut scratch);
                for value in lane_buffer.iter_mut() {
                    *value *= self.scale;
                }
            } else {
                self.forward
                    .process_with_scratch(&mut lane_buffer, &mut scratch);
            }
            for (value, slot) in lane.iter_mut().zip(lane_buffer.iter()) {
                *value = *slot;
            }
        }
    }
}
