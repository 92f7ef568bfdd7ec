use crate::common::*;

/// Checked height and width pair, typically an image size.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HW<T> {
    h: T,
    w: T,
}

impl<T> HW<T>
where
    T: Num + PartialOrd + Copy,
{
    pub fn try_from_hw(hw: [T; 2]) -> Result<Self> {
        let [h, w] = hw;
        let zero = T::zero();
        ensure!(
            h > zero && w > zero,
            "height and width parameters must be positive"
        );
        Ok(Self { h, w })
    }

    pub fn area(&self) -> T {
        self.w * self.h
    }

    pub fn h(&self) -> T {
        self.h
    }

    pub fn w(&self) -> T {
        self.w
    }
}
