//! Dataset toolkit that turns VOC-style detection annotations into YOLO grid labels.

mod common;
pub mod config;
pub mod dataset;
pub mod error;
pub mod grid;
pub mod processor;
pub mod ratio;
pub mod record;
pub mod stream;

pub use error::DataError;
