//! Scalerim - edge-safe sprite upscaling
//!
//! Pixel-art scalers such as scalerx treat the image boundary as an edge of
//! the sprite. This library works around that:
//! - Pad the sprite onto a transparent canvas twice its size
//! - Run the external scaler on the padded image
//! - Crop the scaled result back to the sprite (plus an optional margin)

pub mod args;
pub mod cli;
pub mod config;
pub mod geometry;
pub mod output;
pub mod pipeline;
pub mod scaler;
pub mod workspace;
