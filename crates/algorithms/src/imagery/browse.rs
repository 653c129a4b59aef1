//! Browse images
//!
//! Small encoded previews: the truecolor bands (RED, GREEN, BLUE) are
//! linearly stretched between their 2nd and 98th percentiles to bytes and
//! encoded as JPEG or PNG. Images without those bands render their first
//! band as grayscale. Nodata pixels are black.

use std::str::FromStr;

use bandwise_core::{Error, Image, Raster, RasterElement, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use tracing::{debug, warn};

use crate::masking::cleanup::percentile;
use crate::registry;

/// Default JPEG quality
pub const DEFAULT_QUALITY: u8 = 75;

const LOW_PERCENTILE: f64 = 2.0;
const HIGH_PERCENTILE: f64 = 98.0;

/// Encoded output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowseFormat {
    #[default]
    Jpeg,
    Png,
}

impl FromStr for BrowseFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(BrowseFormat::Jpeg),
            "png" => Ok(BrowseFormat::Png),
            other => Err(Error::InvalidParameter {
                name: "format".to_string(),
                value: other.to_string(),
                reason: "expected jpg, jpeg or png".to_string(),
            }),
        }
    }
}

/// Linear byte stretch of one plane; 0 is reserved for nodata
fn stretch(plane: &Raster<f64>) -> Vec<u8> {
    let nodata = plane.nodata();
    let mut values: Vec<f64> = plane
        .data()
        .iter()
        .copied()
        .filter(|v| !v.is_nodata(nodata))
        .collect();

    let lo = percentile(&mut values, LOW_PERCENTILE);
    let hi = percentile(&mut values, HIGH_PERCENTILE);
    let (lo, hi) = match (lo, hi) {
        (Some(lo), Some(hi)) => (lo, hi),
        _ => return vec![0; plane.len()],
    };
    let span = hi - lo;
    if span <= 0.0 {
        warn!(value = lo, "constant band, browse stretch is flat");
    }

    plane
        .data()
        .iter()
        .map(|&v| {
            if v.is_nodata(nodata) {
                0
            } else if span <= 0.0 {
                128
            } else {
                (1.0 + 254.0 * ((v - lo) / span).clamp(0.0, 1.0)).round() as u8
            }
        })
        .collect()
}

/// Encode a browse image of `image` in `format`.
///
/// `quality` (1-100) applies to JPEG only.
pub fn browse_image(image: &Image, format: BrowseFormat, quality: u8) -> Result<Vec<u8>> {
    if !(1..=100).contains(&quality) {
        return Err(Error::InvalidParameter {
            name: "quality".to_string(),
            value: quality.to_string(),
            reason: "must be within 1..=100".to_string(),
        });
    }
    let (rows, cols) = image.shape();
    let width = u32::try_from(cols).map_err(|e| Error::Encode(e.to_string()))?;
    let height = u32::try_from(rows).map_err(|e| Error::Encode(e.to_string()))?;

    let (pixels, color) = match registry::validate_for(image, "truecolor") {
        Ok(mapping) => {
            let channels: Vec<Vec<u8>> = mapping.planes(image).into_iter().map(stretch).collect();
            let mut rgb = Vec::with_capacity(rows * cols * 3);
            for i in 0..rows * cols {
                rgb.extend(channels.iter().map(|c| c[i]));
            }
            (rgb, ColorType::Rgb8)
        }
        Err(Error::MissingBand { band, .. }) => {
            debug!(missing = %band, "no truecolor bands, rendering grayscale");
            (stretch(image.grid()), ColorType::L8)
        }
        Err(e) => return Err(e),
    };

    let mut out = Vec::new();
    match format {
        BrowseFormat::Jpeg => JpegEncoder::new_with_quality(&mut out, quality)
            .write_image(&pixels, width, height, color),
        BrowseFormat::Png => PngEncoder::new(&mut out).write_image(&pixels, width, height, color),
    }
    .map_err(|e| Error::Encode(e.to_string()))?;

    debug!(bytes = out.len(), ?format, "browse image encoded");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(offset: f64) -> Raster<f64> {
        Raster::from_vec((0..64).map(|i| offset + i as f64 / 64.0).collect(), 8, 8).unwrap()
    }

    fn rgb() -> Image {
        Image::from_planes(
            "scene",
            vec![
                ("blue", gradient(0.0)),
                ("green", gradient(0.1)),
                ("red", gradient(0.2)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("JPG".parse::<BrowseFormat>().unwrap(), BrowseFormat::Jpeg);
        assert_eq!("png".parse::<BrowseFormat>().unwrap(), BrowseFormat::Png);
        assert!("gif".parse::<BrowseFormat>().is_err());
    }

    #[test]
    fn test_jpeg_signature() {
        let bytes = browse_image(&rgb(), BrowseFormat::Jpeg, DEFAULT_QUALITY).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_png_signature_and_grayscale_fallback() {
        let gray = Image::from_planes("nir_only", vec![("nir", gradient(0.0))]).unwrap();
        let bytes = browse_image(&gray, BrowseFormat::Png, DEFAULT_QUALITY).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_stretch_reserves_zero_for_nodata() {
        let mut r = gradient(0.0);
        r.set_nodata(Some(0.0));
        let bytes = stretch(&r);
        assert_eq!(bytes[0], 0);
        assert!(bytes[1..].iter().all(|&b| b >= 1));
        assert_eq!(bytes[63], 255);
    }

    #[test]
    fn test_quality_range() {
        assert!(browse_image(&rgb(), BrowseFormat::Jpeg, 0).is_err());
    }
}
