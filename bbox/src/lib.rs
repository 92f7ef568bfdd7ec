//! Axis-aligned bounding box types and the transforms that move them.

mod common;

pub use into_tlbr::*;
pub mod into_tlbr;

pub use transform::*;
mod transform;

pub use rect::*;
pub mod rect;

pub use tlbr::*;
pub mod tlbr;

pub use hw::*;
pub mod hw;

pub mod prelude {
    pub use crate::rect::{Rect, RectNum};
}
