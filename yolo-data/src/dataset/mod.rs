//! Dataset types and Pascal VOC ingestion.

mod record;
mod voc;

pub use record::*;
pub use voc::*;
