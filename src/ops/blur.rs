// ============================================================================
// GAUSSIAN BLUR — separable two-pass, parallel by row
// ============================================================================

use image::{GrayImage, RgbaImage};
use rayon::prelude::*;

/// Blur an RGBA image with a kernel of exactly `kernel_size` taps.
/// `kernel_size` must already be odd and >= 3 (the engine validates).
pub fn gaussian_blur_rgba(src: &RgbaImage, kernel_size: u32) -> RgbaImage {
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return src.clone();
    }
    let kernel = build_kernel(kernel_size);
    let out = blur_channels(src.as_raw(), w as usize, h as usize, 4, &kernel);
    RgbaImage::from_raw(w, h, out).unwrap()
}

/// Feather a selection mask: blur the mask itself so the blend alpha ramps
/// smoothly across the selection boundary instead of cutting hard.
/// The feather width scales with the transform kernel (`kernel_size / 3`,
/// raised to the nearest odd value >= 3). Edge taps clamp to the border, so
/// an all-zero or all-255 mask passes through bit-exact.
pub fn feather_mask(mask: &GrayImage, kernel_size: u32) -> GrayImage {
    let (w, h) = mask.dimensions();
    if w == 0 || h == 0 {
        return mask.clone();
    }
    let feather = (kernel_size / 3).max(3) | 1;
    let kernel = build_kernel(feather);
    let out = blur_channels(mask.as_raw(), w as usize, h as usize, 1, &kernel);
    GrayImage::from_raw(w, h, out).unwrap()
}

/// Sigma for a given odd kernel size, following the OpenCV convention for
/// an unspecified sigma: `0.3 * ((k - 1) * 0.5 - 1) + 0.8`.
fn sigma_for_kernel(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian kernel of `kernel_size` taps.
fn build_kernel(kernel_size: u32) -> Vec<f32> {
    let radius = (kernel_size / 2) as usize;
    let len = radius * 2 + 1;
    let sigma = sigma_for_kernel(kernel_size);
    let s2 = 2.0 * sigma * sigma;
    let mut kernel = vec![0.0f32; len];
    let mut sum = 0.0f32;
    for (i, v) in kernel.iter_mut().enumerate() {
        let x = i as f32 - radius as f32;
        *v = (-x * x / s2).exp();
        sum += *v;
    }
    let inv = 1.0 / sum;
    for v in &mut kernel {
        *v *= inv;
    }
    kernel
}

/// Two-pass separable convolution over an interleaved `channels`-per-pixel
/// buffer. The intermediate stays in f32 so no precision is lost between
/// passes; edge taps clamp to the image border.
fn blur_channels(src: &[u8], w: usize, h: usize, channels: usize, kernel: &[f32]) -> Vec<u8> {
    let radius = kernel.len() / 2;
    let stride = w * channels;
    let buf_in: Vec<f32> = src.iter().map(|&b| b as f32).collect();

    // Horizontal pass.
    let mut buf_h = vec![0.0f32; buf_in.len()];
    buf_h
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row_out)| {
            let row_in = &buf_in[y * stride..(y + 1) * stride];
            for x in 0..w {
                let mut acc = [0.0f32; 4];
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sx = (x as isize + ki as isize - radius as isize)
                        .clamp(0, w as isize - 1) as usize;
                    let off = sx * channels;
                    for c in 0..channels {
                        acc[c] += row_in[off + c] * kv;
                    }
                }
                let out = x * channels;
                row_out[out..out + channels].copy_from_slice(&acc[..channels]);
            }
        });

    // Vertical pass.
    let mut buf_v = vec![0.0f32; buf_in.len()];
    buf_v
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row_out)| {
            for x in 0..w {
                let mut acc = [0.0f32; 4];
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sy = (y as isize + ki as isize - radius as isize)
                        .clamp(0, h as isize - 1) as usize;
                    let off = sy * stride + x * channels;
                    for c in 0..channels {
                        acc[c] += buf_h[off + c] * kv;
                    }
                }
                let out = x * channels;
                for c in 0..channels {
                    row_out[out + c] = acc[c];
                }
            }
        });

    buf_v
        .iter()
        .map(|&v| v.round().clamp(0.0, 255.0) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba};

    #[test]
    fn kernel_is_normalized() {
        for k in [3u32, 9, 35, 255] {
            let kernel = build_kernel(k);
            assert_eq!(kernel.len() as u32, k);
            let sum: f32 = kernel.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "kernel {} sums to {}", k, sum);
        }
    }

    #[test]
    fn constant_image_is_a_fixed_point() {
        let img = RgbaImage::from_pixel(40, 25, Rgba([73, 190, 12, 255]));
        let blurred = gaussian_blur_rgba(&img, 35);
        assert_eq!(blurred, img);
    }

    #[test]
    fn constant_masks_survive_feathering_exactly() {
        let full = GrayImage::from_pixel(32, 32, Luma([255]));
        assert_eq!(feather_mask(&full, 35), full);

        let empty = GrayImage::new(32, 32);
        assert_eq!(feather_mask(&empty, 35), empty);
    }

    #[test]
    fn feathered_step_edge_ramps_monotonically_over_several_pixels() {
        // Hard vertical edge: left half selected, right half not.
        let mask = GrayImage::from_fn(64, 64, |x, _| {
            if x < 32 { Luma([255]) } else { Luma([0]) }
        });
        let feathered = feather_mask(&mask, 35);

        let row: Vec<u8> = (0..64).map(|x| feathered.get_pixel(x, 32).0[0]).collect();
        for pair in row.windows(2) {
            assert!(pair[0] >= pair[1], "ramp not monotonic: {:?}", row);
        }
        let intermediates = row.iter().filter(|&&v| v > 0 && v < 255).count();
        assert!(
            intermediates >= 2,
            "hard edge survived feathering: {:?}",
            row
        );
    }

    #[test]
    fn feathered_disc_ramps_outward_from_the_centre() {
        let mask = GrayImage::from_fn(64, 64, |x, y| {
            let dx = x as i64 - 32;
            let dy = y as i64 - 32;
            if dx * dx + dy * dy <= 15 * 15 { Luma([255]) } else { Luma([0]) }
        });
        let feathered = feather_mask(&mask, 35);

        let radial: Vec<u8> = (32..64).map(|x| feathered.get_pixel(x, 32).0[0]).collect();
        for pair in radial.windows(2) {
            assert!(pair[0] >= pair[1], "radial ramp not monotonic: {:?}", radial);
        }
        assert_eq!(radial[0], 255);
        assert_eq!(*radial.last().unwrap(), 0);
    }

    #[test]
    fn blur_is_deterministic() {
        let img = RgbaImage::from_fn(50, 50, |x, y| {
            Rgba([(x * 5) as u8, (y * 5) as u8, ((x + y) * 2) as u8, 255])
        });
        assert_eq!(gaussian_blur_rgba(&img, 11), gaussian_blur_rgba(&img, 11));
    }
}
