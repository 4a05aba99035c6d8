// ============================================================================
// REGION TRANSFORM ENGINE — validation, dispatch, feathered compositing
// ============================================================================
//
// The engine is a pure function: it never mutates its inputs, holds no state
// between calls, and identical inputs always produce identical output. The
// composite is `lerp(original, replacement, alpha)` per pixel, where alpha
// comes from the feathered mask — a hard-edged selection must never produce
// a hard seam.

use image::{GrayImage, RgbaImage};
use rayon::prelude::*;

use crate::error::EditError;
use crate::ops::{blur, inpaint};
use crate::protocol::TransformMode;

pub const MIN_KERNEL_SIZE: u32 = 3;
pub const MAX_KERNEL_SIZE: u32 = 255;

/// Apply `mode` inside the masked region of `image` and blend the result
/// against the untouched surroundings.
pub fn transform(
    image: &RgbaImage,
    mask: &GrayImage,
    mode: TransformMode,
    kernel_size: u32,
) -> Result<RgbaImage, EditError> {
    if image.dimensions() != mask.dimensions() {
        return Err(EditError::DimensionMismatch {
            image_w: image.width(),
            image_h: image.height(),
            mask_w: mask.width(),
            mask_h: mask.height(),
        });
    }
    let kernel = effective_kernel_size(kernel_size)?;

    let replacement = match mode {
        TransformMode::Blur => blur::gaussian_blur_rgba(image, kernel),
        TransformMode::Inpaint => inpaint::diffuse_fill(image, mask)?,
    };

    let alpha = blur::feather_mask(mask, kernel);
    Ok(blend(image, &replacement, &alpha))
}

/// Validate the requested kernel size. Even values are coerced up by one —
/// the convention blur kernels inherit from OpenCV — rather than rejected;
/// anything outside [3, 255] is an error.
pub fn effective_kernel_size(kernel_size: u32) -> Result<u32, EditError> {
    if !(MIN_KERNEL_SIZE..=MAX_KERNEL_SIZE).contains(&kernel_size) {
        return Err(EditError::InvalidParameter(format!(
            "kernel size {} outside [{}, {}]",
            kernel_size, MIN_KERNEL_SIZE, MAX_KERNEL_SIZE
        )));
    }
    Ok(kernel_size | 1)
}

/// Per-pixel `lerp(original, replacement, alpha / 255)` as one row-parallel
/// pass. Alpha 0 copies the original byte-exact; alpha 255 copies the
/// replacement byte-exact.
fn blend(original: &RgbaImage, replacement: &RgbaImage, alpha: &GrayImage) -> RgbaImage {
    let (w, h) = original.dimensions();
    let orig = original.as_raw();
    if orig.is_empty() {
        return original.clone();
    }
    let repl = replacement.as_raw();
    let mask = alpha.as_raw();
    let stride = w as usize * 4;

    let mut out = vec![0u8; orig.len()];
    out.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
        let o = &orig[y * stride..(y + 1) * stride];
        let r = &repl[y * stride..(y + 1) * stride];
        let m = &mask[y * w as usize..(y + 1) * w as usize];
        for x in 0..w as usize {
            let i = x * 4;
            let cov = m[x];
            if cov == 0 {
                row[i..i + 4].copy_from_slice(&o[i..i + 4]);
                continue;
            }
            if cov == 255 {
                row[i..i + 4].copy_from_slice(&r[i..i + 4]);
                continue;
            }
            let t = cov as f32 / 255.0;
            for c in 0..4 {
                let a = o[i + c] as f32;
                let b = r[i + c] as f32;
                row[i + c] = (a + (b - a) * t).round().clamp(0.0, 255.0) as u8;
            }
        }
    });

    RgbaImage::from_raw(w, h, out).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba};

    fn checkerboard(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            if ((x / 8) + (y / 8)) % 2 == 0 {
                Rgba([230, 230, 230, 255])
            } else {
                Rgba([30, 30, 30, 255])
            }
        })
    }

    fn disc_mask(w: u32, h: u32, cx: i64, cy: i64, r: i64) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let dx = x as i64 - cx;
            let dy = y as i64 - cy;
            if dx * dx + dy * dy <= r * r {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn zero_mask_returns_the_input_unchanged() {
        let img = checkerboard(60, 40);
        let mask = GrayImage::new(60, 40);
        let out = transform(&img, &mask, TransformMode::Blur, 35).expect("transform failed");
        assert_eq!(out, img);
    }

    #[test]
    fn saturated_mask_equals_the_global_blur() {
        let img = checkerboard(60, 40);
        let mask = GrayImage::from_pixel(60, 40, Luma([255]));
        let out = transform(&img, &mask, TransformMode::Blur, 35).expect("transform failed");
        assert_eq!(out, blur::gaussian_blur_rgba(&img, 35));
    }

    #[test]
    fn blur_is_idempotent_over_identical_inputs() {
        let img = checkerboard(50, 50);
        let mask = disc_mask(50, 50, 25, 25, 12);
        let a = transform(&img, &mask, TransformMode::Blur, 15).expect("transform failed");
        let b = transform(&img, &mask, TransformMode::Blur, 15).expect("transform failed");
        assert_eq!(a, b);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let img = checkerboard(60, 40);
        let mask = GrayImage::new(40, 60);
        let err = transform(&img, &mask, TransformMode::Blur, 9).unwrap_err();
        assert!(matches!(err, EditError::DimensionMismatch { .. }));
    }

    #[test]
    fn kernel_bounds_are_enforced() {
        assert!(matches!(
            effective_kernel_size(0),
            Err(EditError::InvalidParameter(_))
        ));
        assert!(matches!(
            effective_kernel_size(2),
            Err(EditError::InvalidParameter(_))
        ));
        assert!(matches!(
            effective_kernel_size(256),
            Err(EditError::InvalidParameter(_))
        ));
        assert_eq!(effective_kernel_size(35).unwrap(), 35);
    }

    #[test]
    fn even_kernel_coerces_up_to_the_next_odd_size() {
        assert_eq!(effective_kernel_size(34).unwrap(), 35);

        let img = checkerboard(48, 48);
        let mask = disc_mask(48, 48, 24, 24, 10);
        let even = transform(&img, &mask, TransformMode::Blur, 34).expect("transform failed");
        let odd = transform(&img, &mask, TransformMode::Blur, 35).expect("transform failed");
        assert_eq!(even, odd);
    }

    #[test]
    fn blur_stays_inside_the_feathered_neighbourhood() {
        let img = checkerboard(100, 100);
        let mask = disc_mask(100, 100, 50, 50, 20);
        let out = transform(&img, &mask, TransformMode::Blur, 35).expect("transform failed");

        let mut changed_inside = false;
        for y in 0..100u32 {
            for x in 0..100u32 {
                let dx = x as f64 - 50.0;
                let dy = y as f64 - 50.0;
                let dist = (dx * dx + dy * dy).sqrt();
                let same = out.get_pixel(x, y) == img.get_pixel(x, y);
                if dist > 31.0 {
                    assert!(same, "pixel ({}, {}) outside the region changed", x, y);
                } else if dist < 10.0 && !same {
                    changed_inside = true;
                }
            }
        }
        assert!(changed_inside, "nothing inside the masked region was blurred");
    }

    #[test]
    fn solid_colour_blur_is_an_exact_identity() {
        let img = RgbaImage::from_pixel(100, 100, Rgba([120, 80, 160, 255]));
        let mask = disc_mask(100, 100, 50, 50, 20);
        let out = transform(&img, &mask, TransformMode::Blur, 35).expect("transform failed");
        assert_eq!(out, img);
    }

    #[test]
    fn seam_transition_is_gradual_not_hard() {
        // Solid background, bright disc content, blur confined to the disc:
        // walking out of the disc must cross intermediate values, not jump.
        let mut img = RgbaImage::from_pixel(80, 80, Rgba([0, 0, 0, 255]));
        for y in 0..80 {
            for x in 0..80 {
                let dx = x as i64 - 40;
                let dy = y as i64 - 40;
                if dx * dx + dy * dy <= 15 * 15 {
                    img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
                }
            }
        }
        let mask = disc_mask(80, 80, 40, 40, 15);
        let out = transform(&img, &mask, TransformMode::Inpaint, 35).expect("transform failed");

        // Radial scan from centre to border of the red channel.
        let scan: Vec<u8> = (40..70).map(|x| out.get_pixel(x, 40).0[0]).collect();
        let intermediates = scan.iter().filter(|&&v| v > 10 && v < 245).count();
        assert!(
            intermediates >= 2,
            "transition is a hard seam: {:?}",
            scan
        );
    }

    #[test]
    fn inpaint_fills_a_hole_from_a_uniform_surround() {
        let colour = Rgba([52, 101, 164, 255]);
        let mut img = RgbaImage::from_pixel(64, 64, colour);
        for y in 28..36 {
            for x in 28..36 {
                img.put_pixel(x, y, Rgba([250, 40, 40, 255]));
            }
        }
        let mask = GrayImage::from_fn(64, 64, |x, y| {
            if (26..38).contains(&x) && (26..38).contains(&y) {
                Luma([255])
            } else {
                Luma([0])
            }
        });

        let out = transform(&img, &mask, TransformMode::Inpaint, 9).expect("transform failed");
        for y in 0..64u32 {
            for x in 0..64u32 {
                let p = out.get_pixel(x, y);
                for c in 0..3 {
                    assert!(
                        (p.0[c] as i32 - colour.0[c] as i32).abs() <= 2,
                        "pixel ({}, {}) = {:?} strays from the surround",
                        x,
                        y,
                        p
                    );
                }
            }
        }
    }

    #[test]
    fn inpaint_with_no_context_reports_transform_failure() {
        let img = checkerboard(32, 32);
        let mask = GrayImage::from_pixel(32, 32, Luma([255]));
        let err = transform(&img, &mask, TransformMode::Inpaint, 9).unwrap_err();
        assert!(matches!(err, EditError::TransformFailure(_)));
    }
}
