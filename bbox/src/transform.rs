use super::{Rect, TLBR};
use crate::{common::*, HW};
use std::ops::Mul;

/// Axis-aligned affine transform, `y' = y * sy + ty` and `x' = x * sx + tx`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transform<T> {
    pub sy: T,
    pub sx: T,
    pub ty: T,
    pub tx: T,
}

impl<T> Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    pub fn from_rects<R>(src: &R, tgt: &R) -> Self
    where
        R: Rect<Type = T>,
    {
        let sy = tgt.h() / src.h();
        let sx = tgt.w() / src.w();
        let ty = tgt.t() - src.t() * sy;
        let tx = tgt.l() - src.l() * sx;

        Self { sy, sx, ty, tx }
    }

    /// The transform that stretches an image of `src_size` onto `tgt_size`.
    pub fn from_sizes_exact(src_size: &HW<T>, tgt_size: &HW<T>) -> Self {
        let src = TLBR {
            t: T::zero(),
            l: T::zero(),
            b: src_size.h(),
            r: src_size.w(),
        };
        let tgt = TLBR {
            t: T::zero(),
            l: T::zero(),
            b: tgt_size.h(),
            r: tgt_size.w(),
        };
        Self::from_rects(&src, &tgt)
    }

    /// Mirror along the vertical axis of an image `width` wide.
    pub fn horizontal_flip(width: T) -> Self {
        Self {
            sy: T::one(),
            sx: T::zero() - T::one(),
            ty: T::zero(),
            tx: width,
        }
    }

    /// Mirror along the horizontal axis of an image `height` tall.
    pub fn vertical_flip(height: T) -> Self {
        Self {
            sy: T::zero() - T::one(),
            sx: T::one(),
            ty: height,
            tx: T::zero(),
        }
    }

    pub fn translation(ty: T, tx: T) -> Self {
        Self {
            sy: T::one(),
            sx: T::one(),
            ty,
            tx,
        }
    }
}

impl<T> Mul<&TLBR<T>> for &Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    type Output = TLBR<T>;

    fn mul(self, rhs: &TLBR<T>) -> Self::Output {
        rhs.transform(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RectNum;

    #[test]
    fn rect_resize_exact() {
        let src = HW::try_from_hw([80.0, 80.0]).unwrap();
        let tgt = HW::try_from_hw([20.0, 40.0]).unwrap();
        let transform = Transform::from_sizes_exact(&src, &tgt);
        let expect = Transform {
            sx: 0.5,
            sy: 0.25,
            tx: 0.0,
            ty: 0.0,
        };
        assert_eq!(transform, expect);
    }

    #[test]
    fn vertical_flip_box() {
        let rect = TLBR::try_from_tlbr([0.0, 10.0, 50.0, 20.0]).unwrap();
        let flipped = &Transform::vertical_flip(200.0) * &rect;
        assert_eq!(flipped.tlbr(), [150.0, 10.0, 200.0, 20.0]);
    }

    #[test]
    fn translate_box() {
        let rect = TLBR::try_from_tlbr([10.0, 10.0, 50.0, 20.0]).unwrap();
        let moved = &Transform::translation(-5.0, -10.0) * &rect;
        assert_eq!(moved.tlbr(), [5.0, 0.0, 45.0, 10.0]);
    }
}
