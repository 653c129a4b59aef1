//! Cloud masking
//!
//! Two decision-tree classifiers built on the kernel. Each runs a per-pixel
//! classification pass followed by scene-wide cleanup on the class grid.

pub mod acca;
pub mod cleanup;
pub mod fmask;

pub use acca::{acca, acca_mask, Acca, AccaClass, AccaConfig, AccaMask, AccaParams};
pub use fmask::{fmask, fmask_mask, Fmask, FmaskClass, FmaskConfig, FmaskMask, FmaskParams};

use bandwise_core::{Dictionary, Image, Raster, Result};

use crate::kernel::MASK_NODATA;

/// Share of valid (non-nodata) pixels labelled `class`, 0 when nothing is valid
pub(crate) fn class_fraction(mask: &Raster<u8>, class: u8) -> f64 {
    let (valid, hits) = mask
        .data()
        .iter()
        .filter(|&&v| v != MASK_NODATA)
        .fold((0usize, 0usize), |(n, h), &v| (n + 1, h + usize::from(v == class)));
    if valid == 0 {
        0.0
    } else {
        hits as f64 / valid as f64
    }
}

/// Wrap a class grid as a one-band image carrying the mask statistics
/// and the caller's metadata
pub(crate) fn mask_image(
    output: &str,
    band: &str,
    mask: &Raster<u8>,
    stats: &Dictionary,
    extra: &Dictionary,
) -> Result<Image> {
    let plane = mask.convert::<f64>(Some(f64::from(MASK_NODATA)));
    Ok(Image::from_planes(output, vec![(band, plane)])?
        .with_metadata(stats)
        .with_metadata(extra))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_fraction_ignores_nodata() {
        let mask = Raster::from_vec(vec![1, 0, MASK_NODATA, 1], 2, 2).unwrap();
        assert!((class_fraction(&mask, 1) - 2.0 / 3.0).abs() < 1e-12);
        let empty = Raster::filled(2, 2, MASK_NODATA);
        assert_eq!(class_fraction(&empty, 1), 0.0);
    }
}
