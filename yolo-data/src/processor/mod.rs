//! Image and box processors.

pub use augment::*;
pub mod augment;

pub use pipeline::*;
pub mod pipeline;
