//! Sample types that can live in a band plane

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Band planes are `f64` regardless of source precision; categorical
/// outputs (cloud masks) use `u8`. Other integer widths are accepted so the
/// I/O collaborator can hand over decoded data before promotion.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Sentinel used when a raster carries no explicit nodata value
    fn default_nodata() -> Self;

    /// Whether this value equals the nodata sentinel (NaN is always nodata for floats)
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Promote to the engine's working precision (NaN if unrepresentable)
    fn as_f64(self) -> f64 {
        <f64 as NumCast>::from(self).unwrap_or(f64::NAN)
    }

    /// Demote from working precision, saturating out-of-range values
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_element_int {
    ($($t:ty => $nd:expr),*) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                $nd
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata.map_or(false, |nd| *self == nd)
            }

            fn from_f64(value: f64) -> Self {
                if value.is_nan() {
                    return $nd;
                }
                let clamped = value.round().clamp(<$t>::MIN as f64, <$t>::MAX as f64);
                <$t as NumCast>::from(clamped).unwrap_or($nd)
            }
        }
    )*};
}

macro_rules! impl_element_float {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) if nd.is_nan() => false,
                    Some(nd) => (self - nd).abs() <= <$t>::EPSILON * nd.abs().max(1.0),
                    None => false,
                }
            }

            fn from_f64(value: f64) -> Self {
                value as $t
            }
        }
    )*};
}

impl_element_int!(u8 => u8::MAX, u16 => 0, i16 => i16::MIN, i32 => i32::MIN);
impl_element_float!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!((-9999.0f64).is_nodata(Some(-9999.0)));
        assert!(!0.5f64.is_nodata(Some(-9999.0)));
        assert!(!0.5f64.is_nodata(Some(f64::NAN)));
    }

    #[test]
    fn test_int_conversion_saturates() {
        assert_eq!(u8::from_f64(300.0), 255);
        assert_eq!(u8::from_f64(-4.0), 0);
        assert_eq!(i16::from_f64(f64::NAN), i16::MIN);
        assert_eq!(u16::from_f64(12.4), 12);
    }
}
