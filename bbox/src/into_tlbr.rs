use crate::{common::*, rect::Rect, TLBR};

/// Unchecked bounding box in TLBR format.
///
/// Raw annotations are carried in this form until a caller decides what to
/// do with inverted or non-finite coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TLBR_<T> {
    pub t: T,
    pub l: T,
    pub b: T,
    pub r: T,
}

impl<T> TLBR_<T>
where
    T: Float,
{
    /// Returns true if every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.t.is_finite() && self.l.is_finite() && self.b.is_finite() && self.r.is_finite()
    }
}

impl<T> TryFrom<TLBR_<T>> for TLBR<T>
where
    T: Float,
{
    type Error = anyhow::Error;

    fn try_from(from: TLBR_<T>) -> Result<Self, Self::Error> {
        Self::try_from(&from)
    }
}

impl<T> TryFrom<&TLBR_<T>> for TLBR<T>
where
    T: Float,
{
    type Error = anyhow::Error;

    fn try_from(from: &TLBR_<T>) -> Result<Self, Self::Error> {
        anyhow::ensure!(from.is_finite(), "box coordinates must be finite");
        let TLBR_ { t, l, b, r } = *from;
        Self::try_from_tlbr([t, l, b, r])
    }
}

impl<T> From<&TLBR<T>> for TLBR_<T>
where
    T: Copy + Num + PartialOrd,
{
    fn from(from: &TLBR<T>) -> Self {
        let [t, l, b, r] = [from.t(), from.l(), from.b(), from.r()];
        Self { t, l, b, r }
    }
}

impl<T> From<TLBR<T>> for TLBR_<T>
where
    T: Copy + Num + PartialOrd,
{
    fn from(from: TLBR<T>) -> Self {
        Self::from(&from)
    }
}
