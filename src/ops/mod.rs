// ============================================================================
// OPS MODULE — pixel algorithms behind the Region Transform Engine
// ============================================================================
//
//   blur.rs    — separable Gaussian blur (RGBA + single-channel) and mask
//                feathering
//   inpaint.rs — onion-peel diffusion fill for object removal
// ============================================================================

pub mod blur;
pub mod inpaint;
