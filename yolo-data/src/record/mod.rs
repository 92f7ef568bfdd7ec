//! The persisted record stream.
//!
//! A record file starts with [MAGIC], followed by records. Each record is a
//! little-endian `u64` payload length and the payload:
//!
//! ```text
//! filename_len: u32, filename: [u8; filename_len],
//! image_len:    u64, image:    [u8; image_len],
//! label_len:    u32, label:    [f32; label_len]
//! ```
//!
//! The label holds `(x1, y1, x2, y2, class)` rows in pixel units of the
//! original image, before any augmentation or resizing.

mod reader;
mod serialized;
mod writer;

pub use reader::*;
pub use serialized::*;
pub use writer::*;

/// The leading bytes of a record file.
pub const MAGIC: [u8; 8] = *b"yolorec1";
