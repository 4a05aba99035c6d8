// ============================================================================
// WIRE PROTOCOL — JSON bodies with base64 PNG payloads
// ============================================================================

use base64::{Engine as _, engine::general_purpose};
use image::{GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::EditError;
use crate::io;

/// Which transform the engine runs inside the masked region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMode {
    Blur,
    Inpaint,
}

impl TransformMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformMode::Blur => "blur",
            TransformMode::Inpaint => "inpaint",
        }
    }

    pub fn parse(s: &str) -> Result<Self, EditError> {
        match s {
            "blur" => Ok(TransformMode::Blur),
            "inpaint" => Ok(TransformMode::Inpaint),
            other => Err(EditError::InvalidParameter(format!(
                "unknown mode '{}'",
                other
            ))),
        }
    }
}

/// One transform call's payload, in memory. Built by value: an in-flight
/// request can never observe mask edits made after it was packaged.
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub image: RgbaImage,
    pub mask: GrayImage,
    pub mode: TransformMode,
    pub kernel_size: u32,
}

/// Outcome of one transform exchange, as adopted by the session: the full
/// output image on success, the failure otherwise.
#[derive(Debug, Clone)]
pub struct EditResult {
    image: Option<RgbaImage>,
    error: Option<EditError>,
}

impl EditResult {
    pub fn completed(image: RgbaImage) -> Self {
        Self {
            image: Some(image),
            error: None,
        }
    }

    pub fn failed(error: EditError) -> Self {
        Self {
            image: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.image.is_some()
    }

    pub fn error(&self) -> Option<&EditError> {
        self.error.as_ref()
    }

    pub fn into_image(self) -> Result<RgbaImage, EditError> {
        match (self.image, self.error) {
            (Some(image), _) => Ok(image),
            (None, Some(error)) => Err(error),
            (None, None) => Err(EditError::TransformFailure(
                "exchange produced neither an image nor an error".to_string(),
            )),
        }
    }
}

/// JSON request body. `image` and `mask` carry base64 PNG, with or without a
/// `data:image/...;base64,` prefix (the prefix is what browser canvases
/// export).
#[derive(Debug, Serialize, Deserialize)]
pub struct WireRequest {
    pub image: String,
    pub mask: String,
    pub mode: String,
    pub kernel_size: u32,
}

impl WireRequest {
    /// Serialize an in-memory request for transport.
    pub fn from_request(req: &EditRequest) -> Result<Self, EditError> {
        Ok(Self {
            image: encode_payload(&io::encode_png(&req.image)?),
            mask: encode_payload(&io::encode_png_mask(&req.mask)?),
            mode: req.mode.as_str().to_string(),
            kernel_size: req.kernel_size,
        })
    }

    /// Decode a received body back into engine inputs.
    pub fn to_request(&self) -> Result<EditRequest, EditError> {
        let mode = TransformMode::parse(&self.mode)?;
        let image = io::decode_rgba(&decode_payload(&self.image)?)?;
        let mask = io::decode_mask(&decode_payload(&self.mask)?)?;
        Ok(EditRequest {
            image,
            mask,
            mode,
            kernel_size: self.kernel_size,
        })
    }
}

/// JSON response body: `result` present iff `success`, `error` otherwise.
#[derive(Debug, Serialize, Deserialize)]
pub struct WireResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WireResponse {
    pub fn ok(result: String) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(message.into()),
        }
    }
}

/// Strip an optional data-URI prefix and decode the base64 payload.
pub fn decode_payload(data: &str) -> Result<Vec<u8>, EditError> {
    let trimmed = data.trim();
    let b64 = if trimmed.starts_with("data:") {
        let marker = trimmed.find(";base64,").ok_or_else(|| {
            EditError::InvalidImage("data URI without a base64 marker".to_string())
        })?;
        &trimmed[marker + 8..]
    } else {
        trimmed
    };
    general_purpose::STANDARD
        .decode(b64)
        .map_err(|e| EditError::InvalidImage(format!("base64 decode failed: {}", e)))
}

/// Encode PNG bytes as the data URI form the original web client consumed.
pub fn encode_payload(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(png)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba};

    #[test]
    fn mode_strings_round_trip() {
        assert_eq!(TransformMode::parse("blur").unwrap(), TransformMode::Blur);
        assert_eq!(
            TransformMode::parse("inpaint").unwrap(),
            TransformMode::Inpaint
        );
        assert!(matches!(
            TransformMode::parse("sharpen"),
            Err(EditError::InvalidParameter(_))
        ));
    }

    #[test]
    fn payload_decoding_accepts_bare_and_data_uri_base64() {
        let bytes = b"\x89PNG\r\n\x1a\nxyz";
        let bare = general_purpose::STANDARD.encode(bytes);
        assert_eq!(decode_payload(&bare).unwrap(), bytes);

        let uri = format!("data:image/png;base64,{}", bare);
        assert_eq!(decode_payload(&uri).unwrap(), bytes);
    }

    #[test]
    fn malformed_base64_is_an_invalid_image() {
        assert!(matches!(
            decode_payload("!!not base64!!"),
            Err(EditError::InvalidImage(_))
        ));
        assert!(matches!(
            decode_payload("data:image/png;plain,abc"),
            Err(EditError::InvalidImage(_))
        ));
    }

    #[test]
    fn wire_round_trip_preserves_the_request() {
        let request = EditRequest {
            image: RgbaImage::from_fn(13, 7, |x, y| {
                Rgba([(x * 19) as u8, (y * 31) as u8, 5, 255])
            }),
            mask: GrayImage::from_fn(13, 7, |x, _| if x > 6 { Luma([255]) } else { Luma([0]) }),
            mode: TransformMode::Inpaint,
            kernel_size: 21,
        };

        let wire = WireRequest::from_request(&request).expect("encode failed");
        let json = serde_json::to_string(&wire).expect("serialize failed");
        let parsed: WireRequest = serde_json::from_str(&json).expect("parse failed");
        let back = parsed.to_request().expect("decode failed");

        assert_eq!(back.image, request.image);
        assert_eq!(back.mask, request.mask);
        assert_eq!(back.mode, request.mode);
        assert_eq!(back.kernel_size, request.kernel_size);
    }

    #[test]
    fn failed_result_surfaces_its_error() {
        let result = EditResult::failed(EditError::EmptySelection);
        assert!(!result.is_success());
        assert!(matches!(
            result.into_image(),
            Err(EditError::EmptySelection)
        ));
    }
}
