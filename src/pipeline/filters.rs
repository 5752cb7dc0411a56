/// Per-frame Gaussian filters.
///
/// The blur is separable: a sampled, unit-sum 1D kernel of radius
/// `floor(4σ + 0.5)` is run along rows and then along columns. Borders are
/// mirror-reflected about the edge (`d c b a | a b c d | d c b a`).
use crate::data::volume::Frame;

/// Sigma of the denoise filter.
pub const DENOISE_SIGMA: f64 = 1.0;
/// Sigma of the smooth filter.
pub const SMOOTH_SIGMA: f64 = 2.0;
/// Kernel half-width in standard deviations.
pub const TRUNCATE: f64 = 4.0;

/// Light Gaussian blur (sigma 1).
pub fn denoise(frame: &Frame) -> Frame {
    gaussian_blur(frame, DENOISE_SIGMA)
}

/// Stronger Gaussian blur (sigma 2).
pub fn smooth(frame: &Frame) -> Frame {
    gaussian_blur(frame, SMOOTH_SIGMA)
}

/// Sampled 1D Gaussian normalized to unit sum, length `2·radius + 1`.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as isize;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x * x) as f64 / (sigma * sigma)).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel
}

/// Fold an out-of-range index back into `0..n` by mirror reflection.
fn reflect(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = i.rem_euclid(period);
    if m < n as isize {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

/// Convolve `src` (a strided 1D line) with `kernel` into `dst`.
fn convolve_line(src: &[f32], stride: usize, len: usize, kernel: &[f64], dst: &mut [f32]) {
    let radius = (kernel.len() / 2) as isize;
    for i in 0..len {
        let mut acc = 0.0f64;
        for (k, w) in kernel.iter().enumerate() {
            let j = reflect(i as isize + k as isize - radius, len);
            acc += w * src[j * stride] as f64;
        }
        dst[i] = acc as f32;
    }
}

/// Gaussian blur with standard deviation `sigma` pixels.
///
/// Output has the input's shape. A non-positive sigma returns a copy.
/// NaN and infinity propagate to every pixel whose kernel covers them.
pub fn gaussian_blur(frame: &Frame, sigma: f64) -> Frame {
    let (w, h) = frame.dimensions();
    if sigma <= 0.0 || w == 0 || h == 0 {
        return frame.clone();
    }
    let kernel = gaussian_kernel(sigma);

    // Along x
    let mut rows = vec![0.0f32; w * h];
    for y in 0..h {
        convolve_line(frame.row(y), 1, w, &kernel, &mut rows[y * w..(y + 1) * w]);
    }

    // Along y
    let mut out = vec![0.0f32; w * h];
    let mut column = vec![0.0f32; h];
    for x in 0..w {
        convolve_line(&rows[x..], w, h, &kernel, &mut column);
        for (y, v) in column.iter().enumerate() {
            out[y * w + x] = *v;
        }
    }

    Frame::from_fn(w, h, |x, y| out[y * w + x])
}
