// ============================================================================
// blurbrush — brush-masked region blur & object removal
// ============================================================================
//
// Architecture:
//   session.rs  — Mask Builder: working image, selection mask, live preview
//   engine.rs   — Region Transform Engine: validate, transform, feather-blend
//   ops/        — pixel algorithms (separable Gaussian blur, diffusion inpaint)
//   protocol.rs — JSON wire format with base64 PNG payloads
//   service.rs  — threaded HTTP endpoint (POST /api/transform, GET /api/health)
//   client.rs   — blocking client with bounded timeouts + pollable submit
//   io.rs       — decode/validate/encode raster payloads
//   cli.rs      — serve mode and one-shot headless edits
// ============================================================================

pub mod cli;
pub mod client;
pub mod engine;
pub mod error;
pub mod io;
pub mod ops;
pub mod protocol;
pub mod service;
pub mod session;

pub use client::{ClientConfig, PendingTransform, TransformClient};
pub use engine::transform;
pub use error::EditError;
pub use protocol::{EditRequest, EditResult, TransformMode};
pub use service::TransformServer;
pub use session::EditorSession;
