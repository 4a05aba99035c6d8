// ============================================================================
// EDITOR SESSION — working image, selection mask, live preview
// ============================================================================
//
// The session is the sole owner and mutator of the image and mask between
// transform calls. The mask always matches the working image's dimensions
// and accumulates brush discs with max-combine, so repeated strokes over the
// same pixels are idempotent. The preview is re-blended from the unmodified
// working image on every change — overlapping strokes never darken.

use image::{GrayImage, Luma, RgbaImage};
use rayon::prelude::*;

use crate::error::EditError;
use crate::io;
use crate::protocol::{EditRequest, EditResult, TransformMode};

/// Brush radius bounds, in pixels.
pub const MIN_BRUSH_RADIUS: f32 = 5.0;
pub const MAX_BRUSH_RADIUS: f32 = 100.0;

/// Highlight tint painted over selected pixels in the live preview.
const HIGHLIGHT_RGB: [f32; 3] = [235.0, 64.0, 52.0];
/// Highlight opacity at full mask coverage.
const HIGHLIGHT_OPACITY: f32 = 0.45;

pub struct EditorSession {
    /// First successfully loaded image; `reset_to_original` returns here.
    original: RgbaImage,
    /// Current edit target. Replaced by each successful transform result.
    working: RgbaImage,
    /// Selection coverage, congruent with `working`. 0 = unselected.
    mask: GrayImage,
    /// Working image with the translucent selection highlight composited in.
    preview: RgbaImage,
}

impl EditorSession {
    /// Decode `bytes` and start a session on the result.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EditError> {
        let working = io::decode_rgba(bytes)?;
        let (w, h) = working.dimensions();
        Ok(Self {
            original: working.clone(),
            preview: working.clone(),
            mask: GrayImage::new(w, h),
            working,
        })
    }

    /// Replace the session's image with a fresh upload. On success the mask
    /// is reset and both working and original point at the new image; on
    /// failure the session is untouched.
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<(), EditError> {
        *self = Self::from_bytes(bytes)?;
        Ok(())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.working.dimensions()
    }

    pub fn working_image(&self) -> &RgbaImage {
        &self.working
    }

    pub fn mask(&self) -> &GrayImage {
        &self.mask
    }

    pub fn preview(&self) -> &RgbaImage {
        &self.preview
    }

    pub fn has_selection(&self) -> bool {
        self.mask.as_raw().iter().any(|&v| v > 0)
    }

    /// Stamp one brush disc into the mask at (`cx`, `cy`). The radius is
    /// clamped to [5, 100]; parts of the disc outside the image are clipped,
    /// not wrapped. The disc has a ~1 px anti-aliased rim so overlapping
    /// stroke edges carry intermediate coverage.
    pub fn paint(&mut self, cx: f32, cy: f32, radius: f32) {
        let r = radius.clamp(MIN_BRUSH_RADIUS, MAX_BRUSH_RADIUS);
        let (w, h) = self.mask.dimensions();

        let min_x = ((cx - r).floor() as i64).max(0);
        let max_x = ((cx + r).ceil() as i64).min(w as i64 - 1);
        let min_y = ((cy - r).floor() as i64).max(0);
        let max_y = ((cy + r).ceil() as i64).min(h as i64 - 1);
        if min_x > max_x || min_y > max_y {
            return; // disc entirely off-canvas
        }

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let dist = (dx * dx + dy * dy).sqrt();
                let coverage = (r + 0.5 - dist).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let v = (coverage * 255.0).round() as u8;
                let px = self.mask.get_pixel_mut(x as u32, y as u32);
                // Max-combine, never additive.
                px.0[0] = px.0[0].max(v);
            }
        }
        self.rebuild_preview();
    }

    /// Drop the selection and restore the plain working-image preview.
    pub fn clear_mask(&mut self) {
        for p in self.mask.pixels_mut() {
            *p = Luma([0]);
        }
        self.preview = self.working.clone();
    }

    /// Discard all edits: back to the first successfully loaded image.
    pub fn reset_to_original(&mut self) {
        self.working = self.original.clone();
        let (w, h) = self.working.dimensions();
        self.mask = GrayImage::new(w, h);
        self.preview = self.working.clone();
    }

    /// Package the current state for one transform call. Rejecting an empty
    /// selection here keeps a guaranteed no-op off the wire.
    pub fn build_request(
        &self,
        mode: TransformMode,
        kernel_size: u32,
    ) -> Result<EditRequest, EditError> {
        if !self.has_selection() {
            return Err(EditError::EmptySelection);
        }
        Ok(EditRequest {
            image: self.working.clone(),
            mask: self.mask.clone(),
            mode,
            kernel_size,
        })
    }

    /// Adopt a transform outcome. Success replaces the working image and
    /// clears the mask, so the next stroke starts fresh on the edited image;
    /// failure leaves every part of the session untouched and returns the
    /// error for display.
    pub fn apply_result(&mut self, result: EditResult) -> Result<(), EditError> {
        let image = result.into_image()?;
        let (w, h) = image.dimensions();
        self.working = image;
        self.mask = GrayImage::new(w, h);
        self.preview = self.working.clone();
        Ok(())
    }

    /// Re-blend the translucent highlight over the unmodified working image,
    /// one row-parallel pass over the whole buffer.
    fn rebuild_preview(&mut self) {
        let (w, h) = self.working.dimensions();
        let stride = w as usize * 4;
        let src = self.working.as_raw();
        let mask = self.mask.as_raw();

        let mut out = vec![0u8; src.len()];
        out.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
            let s = &src[y * stride..(y + 1) * stride];
            let m = &mask[y * w as usize..(y + 1) * w as usize];
            for x in 0..w as usize {
                let i = x * 4;
                let cov = m[x];
                if cov == 0 {
                    row[i..i + 4].copy_from_slice(&s[i..i + 4]);
                    continue;
                }
                let t = HIGHLIGHT_OPACITY * cov as f32 / 255.0;
                for c in 0..3 {
                    let a = s[i + c] as f32;
                    row[i + c] = (a + (HIGHLIGHT_RGB[c] - a) * t).round().clamp(0.0, 255.0) as u8;
                }
                row[i + 3] = s[i + 3];
            }
        });

        self.preview = RgbaImage::from_raw(w, h, out).unwrap();
    }
}
