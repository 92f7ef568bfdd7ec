//! Conversion between box lists and the S x S x (5 + C) grid label.
//!
//! Channel 0 of a cell is the confidence, channels 1 to 4 are the box
//! `(cx, cy, w, h)` normalized by the image size, and the remaining C
//! channels are the one-hot class vector.

pub use decoder::*;
mod decoder;

pub use encoder::*;
mod encoder;

/// Index of the confidence channel.
pub const CONFIDENCE: usize = 0;
/// Index of the first class channel.
pub const CLASS_OFFSET: usize = 5;
