// utils.rs

use bytemuck::{Pod, Zeroable};
use rand::Rng;

use crate::config::RunConfig;

/// Four packed floats, laid out like WGSL `vec4<f32>`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Float4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Float4 {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v, v)
    }
}

/// Host side inputs and the device results of one run.
pub struct Data {
    pub source_a: Vec<Float4>,
    pub source_b: Vec<Float4>,
    pub results: Vec<f32>,
}

impl Data {
    /// Zeroed storage for `size` elements. `size` is normally the global work size.
    pub fn new(size: usize) -> Self {
        Self {
            source_a: vec![Float4::default(); size],
            source_b: vec![Float4::default(); size],
            results: vec![0.0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Fills `values` with uniform samples from `[0, 1)`.
pub fn fill_random<R: Rng + ?Sized>(values: &mut [f32], rng: &mut R) {
    for v in values.iter_mut() {
        *v = rng.gen::<f32>();
    }
}

/// Randomises the first `num_elements` groups of both inputs, leaving the padding zeroed.
pub fn populate_inputs<R: Rng + ?Sized>(data: &mut Data, num_elements: usize, rng: &mut R) {
    log::info!("Allocate and Init Host Mem...");
    let n = num_elements.min(data.len());
    fill_random(bytemuck::cast_slice_mut(&mut data.source_a[..n]), rng);
    fill_random(bytemuck::cast_slice_mut(&mut data.source_b[..n]), rng);
    log::info!("Allocation done and Init Host Mem...");
}

/// Random inputs for `cfg`, padded to its global work size.
pub fn random_data<R: Rng + ?Sized>(cfg: &RunConfig, rng: &mut R) -> Data {
    let mut data = Data::new(cfg.global_work_size());
    populate_inputs(&mut data, cfg.num_elements, rng);
    data
}

/// Validates that the input vectors have the same length.
/// Returns an error if lengths differ.
pub fn validate_vectors<T>(a: &[T], b: &[T]) -> Result<(), String> {
    if a.len() != b.len() {
        Err(format!(
            "Vectors must have the same length ({} != {})",
            a.len(),
            b.len()
        ))
    } else {
        Ok(())
    }
}

/// Compares the host reference with the device results within `epsilon`.
/// Returns an error naming the first element that differs by more than `epsilon`.
pub fn compare_results(reference: &[f32], device: &[f32], epsilon: f32) -> Result<(), String> {
    validate_vectors(reference, device)?;
    for (i, (host_val, device_val)) in reference.iter().zip(device.iter()).enumerate() {
        // NaN never compares within tolerance
        if !((host_val - device_val).abs() <= epsilon) {
            return Err(format!(
                "Difference found at index {}: host = {}, device = {}",
                i, host_val, device_val
            ));
        }
    }
    Ok(())
}

/// Pass/fail flag over the first `count` values of each slice.
pub fn compare_prefix(reference: &[f32], device: &[f32], count: usize, epsilon: f32) -> bool {
    if reference.len() < count || device.len() < count {
        log::warn!(
            "Cannot compare {} elements: host has {}, device has {}",
            count,
            reference.len(),
            device.len()
        );
        return false;
    }
    match compare_results(&reference[..count], &device[..count], epsilon) {
        Ok(()) => true,
        Err(msg) => {
            log::warn!("{msg}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn compare_reports_first_mismatch() {
        let err = compare_results(&[1.0, 2.0, 3.0], &[1.0, 2.5, 4.0], 0.1).unwrap_err();
        assert!(err.contains("index 1"), "{err}");
    }

    #[test]
    fn compare_exact_and_tolerant() {
        assert!(compare_results(&[1.0, 2.0], &[1.0, 2.0], 0.0).is_ok());
        assert!(compare_results(&[1.0, 2.0], &[1.0, 2.001], 0.0).is_err());
        assert!(compare_results(&[1.0, 2.0], &[1.0, 2.001], 0.01).is_ok());
        assert!(compare_results(&[1.0], &[1.0, 2.0], 1.0).is_err());
        assert!(compare_results(&[f32::NAN], &[f32::NAN], 1.0).is_err());
    }

    #[test]
    fn compare_prefix_ignores_padding() {
        let host = [1.0, 2.0];
        let device = [1.0, 2.0, 99.0, 99.0];
        assert!(compare_prefix(&host, &device, 2, 0.0));
        assert!(!compare_prefix(&host, &device, 3, 0.0));
    }

    #[test]
    fn populate_leaves_padding_zeroed() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut data = Data::new(8);
        populate_inputs(&mut data, 5, &mut rng);

        for v in &data.source_a[..5] {
            for c in [v.x, v.y, v.z, v.w] {
                assert!((0.0..1.0).contains(&c));
            }
        }
        assert!(data.source_a[5..].iter().all(|v| *v == Float4::default()));
        assert!(data.source_b[5..].iter().all(|v| *v == Float4::default()));
        assert_eq!(data.len(), 8);
    }
}
