// cpu.rs

use crate::utils::Float4;

/// Host dot product of each `Float4` pair, summed x, y, z, w in order.
pub fn dot_product_cpu(a: &[Float4], b: &[Float4]) -> Vec<f32> {
    assert_eq!(a.len(), b.len(), "Input vectors must have the same length");
    a.iter()
        .zip(b.iter())
        .map(|(a, b)| {
            let mut sum = 0.0f32;
            sum += a.x * b.x;
            sum += a.y * b.y;
            sum += a.z * b.z;
            sum += a.w * b.w;
            sum
        })
        .collect()
}

/// Computes output elements `start..start + out.len()` of the heavy calculation.
///
/// `a` and `b` are the flattened float views of the inputs and must hold at
/// least `num_elements` values.
pub fn heavy_calculation_range(
    a: &[f32],
    b: &[f32],
    out: &mut [f32],
    start: usize,
    iterations: u32,
    num_elements: usize,
) {
    for (offset, c) in out.iter_mut().enumerate() {
        let i = start + offset;
        *c = 0.0;
        for ind in 0..iterations as usize {
            let k = (4 * i + ind) % num_elements;
            let kf = k as f32;
            *c += (kf * a[k]).sin() * (kf * b[k]).cos();
        }
    }
}

/// Boundaries splitting `n` items into `threads` contiguous ranges.
///
/// The result has `threads + 1` entries, starts at 0 and ends at `n`;
/// range `i` is `levels[i]..levels[i + 1]`.
pub fn split_levels(n: usize, threads: usize) -> Vec<usize> {
    let mut levels = Vec::with_capacity(threads + 1);
    levels.push(0);
    for i in 0..threads {
        let coeff = (i + 1) as f64 / threads as f64;
        levels.push((coeff * n as f64).round() as usize);
    }
    levels
}

/// Heavy calculation reference for the first `num_elements` outputs, one scoped thread per range.
pub fn heavy_calculation_cpu(
    a: &[Float4],
    b: &[Float4],
    num_elements: usize,
    iterations: u32,
    threads: usize,
) -> Vec<f32> {
    let a: &[f32] = bytemuck::cast_slice(a);
    let b: &[f32] = bytemuck::cast_slice(b);
    let mut result = vec![0.0f32; num_elements];
    if num_elements == 0 {
        return result;
    }
    let levels = split_levels(num_elements, threads.max(1));

    std::thread::scope(|scope| {
        let mut rest: &mut [f32] = &mut result;
        for bounds in levels.windows(2) {
            let (start, end) = (bounds[0], bounds[1]);
            let (chunk, tail) = std::mem::take(&mut rest).split_at_mut(end - start);
            rest = tail;
            if chunk.is_empty() {
                continue;
            }
            scope.spawn(move || {
                heavy_calculation_range(a, b, chunk, start, iterations, num_elements);
            });
        }
    });

    result
}
