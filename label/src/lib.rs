//! Class-labelled bounding boxes.

use bbox::{Transform, HW, TLBR, TLBR_};
use num_traits::Num;
use std::ops::Mul;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label<R, C> {
    pub rect: R,
    pub class: C,
}

/// A checked box in pixel units with its class index.
pub type BoxLabel = Label<TLBR<f32>, usize>;

/// A box as it was annotated, before any ordering or finiteness check.
pub type RawBoxLabel = Label<TLBR_<f32>, usize>;

impl<T, C> Label<TLBR<T>, C>
where
    T: Copy + Num + PartialOrd,
    C: Copy,
{
    /// Clip the box into the image, or `None` if it falls fully outside.
    pub fn clip(&self, size: &HW<T>) -> Option<Self> {
        Some(Label {
            rect: self.rect.clip(size)?,
            class: self.class,
        })
    }
}

impl<'a, T, C> Mul<&'a Label<TLBR<T>, C>> for &'a Transform<T>
where
    T: Copy + Num + PartialOrd,
    C: Copy,
{
    type Output = Label<TLBR<T>, C>;

    fn mul(self, rhs: &'a Label<TLBR<T>, C>) -> Self::Output {
        Label {
            rect: self * &rhs.rect,
            class: rhs.class,
        }
    }
}
