//! The endless, shuffled stream of training samples.

pub use sample::*;
mod sample;

pub use shuffle::*;
mod shuffle;

pub use training_stream::*;
mod training_stream;
