use crate::common::*;

/// An encoded image with its raw box annotations, as produced by ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedImage {
    /// Opaque identifier, usually the image path.
    pub filename: String,
    /// The encoded image file, e.g. JPEG.
    pub image: Vec<u8>,
    /// Boxes in pixel units of the original image, in annotation order.
    pub boxes: Vec<RawBoxLabel>,
}

/// The record with decoded image pixels and raw boxes.
#[derive(Debug, Clone)]
pub struct DataRecord {
    pub filename: String,
    pub image: RgbImage,
    pub boxes: Vec<RawBoxLabel>,
}
