//! Raster element traits for generic cell values and labels

use num_traits::{NumCast, Zero};
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait for types that can be stored in a raster cell.
///
/// This trait bounds the types that can be used as raster values,
/// ensuring they support necessary numeric operations.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

/// Integral cell values usable as object labels in a `LabelMap`.
///
/// Labels are totally ordered: the ordering defines the iteration order of
/// a label map and the tie-break of every ranking filter.
pub trait Label: RasterElement + Ord + Eq + Hash + Display {
    /// Smallest value of the label type
    fn first() -> Self;

    /// The label immediately after `self`, or `None` at the end of the range
    fn successor(self) -> Option<Self>;

    /// Convert from a zero-based ordinal, if it fits the type
    fn from_ordinal(ordinal: usize) -> Option<Self> {
        NumCast::from(ordinal)
    }
}

macro_rules! impl_label {
    ($($t:ty),*) => {
        $(
            impl RasterElement for $t {
                fn is_nodata(&self, nodata: Option<Self>) -> bool {
                    nodata.is_some_and(|nd| *self == nd)
                }
            }

            impl Label for $t {
                fn first() -> Self {
                    <$t>::MIN
                }

                fn successor(self) -> Option<Self> {
                    self.checked_add(1)
                }
            }
        )*
    };
}

macro_rules! impl_raster_element_float {
    ($($t:ty),*) => {
        $(
            impl RasterElement for $t {
                fn is_nodata(&self, nodata: Option<Self>) -> bool {
                    if self.is_nan() {
                        return true;
                    }
                    match nodata {
                        Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                        None => false,
                    }
                }
            }
        )*
    };
}

impl_label!(i8, i16, i32, i64, u8, u16, u32, u64);
impl_raster_element_float!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_successor() {
        assert_eq!(3u8.successor(), Some(4));
        assert_eq!(u8::MAX.successor(), None);
        assert_eq!(i16::first(), i16::MIN);
    }

    #[test]
    fn test_float_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!((-9999.0f64).is_nodata(Some(-9999.0)));
        assert!(!1.0f32.is_nodata(Some(0.0)));
    }
}
