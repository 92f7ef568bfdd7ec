use super::Rect;
use crate::{common::*, Transform, HW};

/// Bounding box in TLBR format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TLBR<T> {
    pub(crate) t: T,
    pub(crate) l: T,
    pub(crate) b: T,
    pub(crate) r: T,
}

impl<T> TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    /// Map the box through an axis-aligned transform.
    ///
    /// Negative scaling factors mirror the box, so the mapped corners are
    /// re-ordered to keep `t <= b` and `l <= r`.
    pub fn transform(&self, transform: &Transform<T>) -> Self {
        let y1 = self.t * transform.sy + transform.ty;
        let y2 = self.b * transform.sy + transform.ty;
        let x1 = self.l * transform.sx + transform.tx;
        let x2 = self.r * transform.sx + transform.tx;
        let (t, b) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };
        let (l, r) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        TLBR { t, l, b, r }
    }

    /// Returns true if the box shares no interior with an image of `size`.
    ///
    /// A box touching the border from outside counts as outside.
    pub fn is_outside(&self, size: &HW<T>) -> bool {
        let zero = T::zero();
        self.l >= size.w() || self.r <= zero || self.t >= size.h() || self.b <= zero
    }

    /// Clamp the box into an image of `size`, or `None` if it lies fully
    /// outside the image.
    pub fn clip(&self, size: &HW<T>) -> Option<Self> {
        if self.is_outside(size) {
            return None;
        }

        let zero = T::zero();
        Some(TLBR {
            t: clamp(self.t, zero, size.h()),
            l: clamp(self.l, zero, size.w()),
            b: clamp(self.b, zero, size.h()),
            r: clamp(self.r, zero, size.w()),
        })
    }
}

impl<T> Rect for TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        self.t
    }

    fn l(&self) -> Self::Type {
        self.l
    }

    fn b(&self) -> Self::Type {
        self.b
    }

    fn r(&self) -> Self::Type {
        self.r
    }

    fn cy(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.t + self.h() / two
    }

    fn cx(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.l + self.w() / two
    }

    fn h(&self) -> Self::Type {
        self.b - self.t
    }

    fn w(&self) -> Self::Type {
        self.r - self.l
    }

    fn try_from_cycxhw(cycxhw: [Self::Type; 4]) -> Result<Self> {
        let [cy, cx, h, w] = cycxhw;
        let zero = T::zero();
        ensure!(h >= zero && w >= zero, "h and w must be non-negative");

        let two = T::one() + T::one();
        let t = cy - h / two;
        let b = cy + h / two;
        let l = cx - w / two;
        let r = cx + w / two;

        Ok(Self { t, l, b, r })
    }

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        ensure!(b >= t && r >= l, "b >= t and r >= l must hold");

        Ok(Self { t, l, b, r })
    }
}

fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: PartialOrd,
{
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}
