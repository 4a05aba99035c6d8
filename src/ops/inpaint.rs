// ============================================================================
// INPAINTING — onion-peel diffusion fill
// ============================================================================
//
// The hole is filled from its boundary inward. Each pass takes every hole
// pixel with at least one known 4-connected neighbour, fills it with the
// inverse-distance-weighted average of its known 8-neighbours, then marks it
// known so the next pass can build on it. Structure diffuses from the
// surrounding context toward the hole centre; a uniform surround reproduces
// itself exactly (up to rounding).

use image::{GrayImage, Luma, Rgba, RgbaImage};

use crate::error::EditError;

/// Fill every pixel where `hole` is > 0 from the surrounding non-hole
/// content. `src` and `hole` must have equal dimensions (the engine
/// validates). The inputs are never modified.
pub fn diffuse_fill(src: &RgbaImage, hole: &GrayImage) -> Result<RgbaImage, EditError> {
    let (w, h) = src.dimensions();
    let mut out = src.clone();
    let mut live = hole.clone();

    if !live.pixels().any(|p| p.0[0] == 0) {
        return Err(EditError::TransformFailure(
            "mask covers the entire image; no surrounding pixels to fill from".to_string(),
        ));
    }

    // Each pass fills one boundary ring, so w + h passes bound the peel
    // depth for any hole shape.
    let max_passes = (w + h) as usize + 2;
    for _ in 0..max_passes {
        let boundary: Vec<(u32, u32)> = (0..h)
            .flat_map(|y| (0..w).map(move |x| (x, y)))
            .filter(|&(x, y)| is_boundary_hole(&live, x, y))
            .collect();
        if boundary.is_empty() {
            break;
        }

        // Collect fills first — `out` is both source and destination.
        let fills: Vec<(u32, u32, Rgba<u8>)> = boundary
            .iter()
            .map(|&(x, y)| (x, y, fill_value(&out, &live, x, y)))
            .collect();

        for &(x, y, px) in &fills {
            out.put_pixel(x, y, px);
            live.put_pixel(x, y, Luma([0]));
        }
    }

    Ok(out)
}

/// True when (x, y) is a hole pixel with at least one known 4-connected
/// neighbour.
fn is_boundary_hole(mask: &GrayImage, x: u32, y: u32) -> bool {
    if mask.get_pixel(x, y).0[0] == 0 {
        return false;
    }
    let (w, h) = mask.dimensions();
    for (dx, dy) in [(-1i32, 0), (1, 0), (0, -1i32), (0, 1)] {
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        if nx >= 0
            && ny >= 0
            && nx < w as i32
            && ny < h as i32
            && mask.get_pixel(nx as u32, ny as u32).0[0] == 0
        {
            return true;
        }
    }
    false
}

/// Inverse-distance-weighted average of the known 8-neighbours of (x, y).
/// `is_boundary_hole` guarantees at least one contributes.
fn fill_value(out: &RgbaImage, live: &GrayImage, x: u32, y: u32) -> Rgba<u8> {
    let (w, h) = out.dimensions();
    let mut acc = [0.0f32; 4];
    let mut weight = 0.0f32;

    for dy in -1i32..=1 {
        for dx in -1i32..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                continue;
            }
            let (ux, uy) = (nx as u32, ny as u32);
            if live.get_pixel(ux, uy).0[0] > 0 {
                continue;
            }
            // Diagonal neighbours sit sqrt(2) away.
            let wgt = if dx != 0 && dy != 0 {
                std::f32::consts::FRAC_1_SQRT_2
            } else {
                1.0
            };
            let p = out.get_pixel(ux, uy);
            for c in 0..4 {
                acc[c] += p.0[c] as f32 * wgt;
            }
            weight += wgt;
        }
    }

    let mut px = [0u8; 4];
    for c in 0..4 {
        px[c] = (acc[c] / weight).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(px)
}
