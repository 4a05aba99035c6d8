// ============================================================================
// ERROR TAXONOMY — every failure the edit pipeline can surface
// ============================================================================

/// Failures are structured so callers can react per condition; the `Display`
/// strings double as the user-facing messages and the wire `error` field.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EditError {
    /// Input bytes are not a decodable raster, or exceed the configured limits.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The selection mask has no painted pixel; nothing to transform.
    #[error("empty selection: paint a region before applying a transform")]
    EmptySelection,

    /// Image and mask dimensions disagree.
    #[error("dimension mismatch: image is {image_w}x{image_h}, mask is {mask_w}x{mask_h}")]
    DimensionMismatch {
        image_w: u32,
        image_h: u32,
        mask_w: u32,
        mask_h: u32,
    },

    /// Unknown transform mode or out-of-range kernel size.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The transform itself failed, or a reachable service reported failure.
    #[error("transform failed: {0}")]
    TransformFailure(String),

    /// The service could not be reached at all (refused, timed out).
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}
