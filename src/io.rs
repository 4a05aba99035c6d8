// ============================================================================
// IMAGE I/O — decode, validate, and encode raster payloads
// ============================================================================

use std::io::Cursor;

use image::{DynamicImage, GrayImage, RgbaImage};

use crate::error::EditError;

/// Hard cap on an encoded payload accepted for decoding.
pub const MAX_IMAGE_BYTES: usize = 24 * 1024 * 1024;

/// Hard cap on either decoded dimension.
pub const MAX_IMAGE_DIM: u32 = 8_192;

/// Decode arbitrary raster bytes (PNG, JPEG, WEBP, BMP, …) to 8-bit RGBA.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, EditError> {
    let img = decode(bytes)?.to_rgba8();
    check_dims(img.width(), img.height())?;
    Ok(img)
}

/// Decode mask bytes to a single channel. A mask uploaded as a colour image
/// collapses to luma, the same reduction the original grayscale conversion
/// applied to painted canvases.
pub fn decode_mask(bytes: &[u8]) -> Result<GrayImage, EditError> {
    let img = decode(bytes)?.to_luma8();
    check_dims(img.width(), img.height())?;
    Ok(img)
}

/// Encode RGBA to PNG bytes for transport (lossless).
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, EditError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
        .map_err(|e| EditError::TransformFailure(format!("PNG encode failed: {}", e)))?;
    Ok(buf)
}

/// Encode a single-channel mask to PNG bytes.
pub fn encode_png_mask(mask: &GrayImage) -> Result<Vec<u8>, EditError> {
    let mut buf = Vec::new();
    mask.write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
        .map_err(|e| EditError::TransformFailure(format!("PNG encode failed: {}", e)))?;
    Ok(buf)
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, EditError> {
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(EditError::InvalidImage(format!(
            "payload is {:.1} MB (limit {} MB)",
            bytes.len() as f64 / (1024.0 * 1024.0),
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    validate_signature(bytes)?;
    image::load_from_memory(bytes).map_err(|e| EditError::InvalidImage(e.to_string()))
}

/// Reject payloads whose magic bytes are not a known raster format before
/// handing them to a decoder.
fn validate_signature(bytes: &[u8]) -> Result<(), EditError> {
    if bytes.is_empty() {
        return Err(EditError::InvalidImage("empty payload".to_string()));
    }
    let kind = infer::get(bytes)
        .ok_or_else(|| EditError::InvalidImage("unrecognized file signature".to_string()))?;
    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(EditError::InvalidImage(format!(
            "not an image: {}",
            kind.mime_type()
        )));
    }
    Ok(())
}

fn check_dims(w: u32, h: u32) -> Result<(), EditError> {
    if w == 0 || h == 0 {
        return Err(EditError::InvalidImage("image has a zero dimension".to_string()));
    }
    if w > MAX_IMAGE_DIM || h > MAX_IMAGE_DIM {
        return Err(EditError::InvalidImage(format!(
            "{}x{} exceeds the {}x{} limit",
            w, h, MAX_IMAGE_DIM, MAX_IMAGE_DIM
        )));
    }
    Ok(())
}
