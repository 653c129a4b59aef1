//! Cookie-cutter mosaic
//!
//! Merges several source images onto one north-up output grid restricted
//! to a footprint polygon. Where sources overlap, the last-listed source
//! that holds data at the pixel wins. Values are resampled from each
//! source at the output pixel center.

use bandwise_core::crs::same_frame;
use bandwise_core::{Dictionary, Error, Extent, Feature, GeoTransform, Image, Raster, RasterElement, Result};
use bandwise_parallel::{ParallelStrategy, RowBlocks};
use tracing::{debug, info};

use crate::kernel::{KernelOptions, CONTINUOUS_NODATA};
use crate::mosaic::resample::Interpolation;

/// Parameters for [`cookie_cutter`]
#[derive(Debug, Clone)]
pub struct CookieCutterParams {
    pub output: String,
    /// Output pixel width in CRS units
    pub xres: f64,
    /// Output pixel height in CRS units
    pub yres: f64,
    /// Shrink the output extent to the footprint's bounding box
    pub crop: bool,
    pub interpolation: Interpolation,
    /// Without cropping, fail on footprint pixels no source covers
    pub require_coverage: bool,
    /// Merged into the output metadata
    pub metadata: Dictionary,
    pub options: KernelOptions,
}

impl Default for CookieCutterParams {
    fn default() -> Self {
        Self {
            output: "mosaic".to_string(),
            xres: 1.0,
            yres: 1.0,
            crop: false,
            interpolation: Interpolation::Nearest,
            require_coverage: false,
            metadata: Dictionary::new(),
            options: KernelOptions::default(),
        }
    }
}

impl CookieCutterParams {
    pub fn new(output: impl Into<String>, xres: f64, yres: f64) -> Self {
        Self {
            output: output.into(),
            xres,
            yres,
            ..Self::default()
        }
    }
}

/// Check band layout and registration of every source against the first
fn check_sources(sources: &[Image], footprint: &Feature) -> Result<()> {
    let first = sources.first().ok_or_else(|| Error::InvalidParameter {
        name: "images".to_string(),
        value: "0".to_string(),
        reason: "at least one source image is required".to_string(),
    })?;
    let names = first.band_names();

    for (index, image) in sources.iter().enumerate() {
        if image.band_count() != first.band_count() {
            return Err(Error::BandCountMismatch {
                index,
                expected: first.band_count(),
                actual: image.band_count(),
                detail: image.band_names().join(","),
            });
        }
        let same_names = image
            .band_names()
            .iter()
            .zip(&names)
            .all(|(a, b)| a.eq_ignore_ascii_case(b));
        if !same_names {
            return Err(Error::BandCountMismatch {
                index,
                expected: first.band_count(),
                actual: image.band_count(),
                detail: format!(
                    "bands [{}] do not match [{}]",
                    image.band_names().join(","),
                    names.join(",")
                ),
            });
        }
        if !same_frame(footprint.crs(), image.crs()) {
            return Err(Error::UnregisteredGeometry {
                index,
                image: crs_label(image.crs()),
                footprint: crs_label(footprint.crs()),
            });
        }
    }
    Ok(())
}

fn crs_label(crs: Option<&bandwise_core::CRS>) -> String {
    crs.map_or_else(|| "Unknown".to_string(), |c| c.identifier())
}

/// Composite `sources` into one image clipped to `footprint`.
///
/// Every structural check (band layout, CRS, resolution) runs before any
/// output pixel is computed. Output pixels outside the footprint polygon
/// are nodata in both modes; `crop` only shrinks the extent from the union
/// of the sources to the footprint's bounding box.
pub fn cookie_cutter(sources: &[Image], footprint: &Feature, params: &CookieCutterParams) -> Result<Image> {
    check_sources(sources, footprint)?;
    for (name, res) in [("xres", params.xres), ("yres", params.yres)] {
        if !(res.is_finite() && res > 0.0) {
            return Err(Error::InvalidParameter {
                name: name.to_string(),
                value: res.to_string(),
                reason: "resolution must be positive".to_string(),
            });
        }
    }

    let footprint_extent = footprint.extent().ok_or_else(|| Error::InvalidParameter {
        name: "footprint".to_string(),
        value: "empty".to_string(),
        reason: "footprint has no area".to_string(),
    })?;
    let extent = if params.crop {
        footprint_extent
    } else {
        sources
            .iter()
            .skip(1)
            .fold(sources[0].extent(), |acc, img| acc.union(&img.extent()))
    };
    if extent.is_empty() {
        return Err(Error::InvalidParameter {
            name: "extent".to_string(),
            value: format!("{:?}", extent),
            reason: "output extent is empty".to_string(),
        });
    }

    let (transform, rows, cols) = GeoTransform::covering(&extent, params.xres, params.yres);
    let first = &sources[0];
    let n_bands = first.band_count();
    let nodata: Vec<f64> = first
        .bands()
        .iter()
        .map(|b| b.nodata().unwrap_or(CONTINUOUS_NODATA))
        .collect();
    let extents: Vec<Extent> = sources.iter().map(Image::extent).collect();

    info!(
        output = %params.output,
        sources = sources.len(),
        rows,
        cols,
        crop = params.crop,
        interpolation = ?params.interpolation,
        "cookie cutter"
    );

    let plan = RowBlocks::new(rows, params.options.block_rows);
    let fail_uncovered = params.require_coverage && !params.crop;
    let blocks = params.options.mode.try_par_map(0..plan.count(), |i| -> Result<Vec<Vec<f64>>> {
        params.options.check_cancelled()?;
        let Some(block) = plan.get(i) else {
            return Ok(vec![Vec::new(); n_bands]);
        };
        let mut out: Vec<Vec<f64>> = nodata.iter().map(|&nd| vec![nd; block.len(cols)]).collect();

        for row in block.row_offset..block.row_end() {
            let base = (row - block.row_offset) * cols;
            for col in 0..cols {
                let (x, y) = transform.pixel_to_geo(col, row);
                if !footprint.covers(x, y) {
                    continue;
                }

                let mut covered = false;
                for (src, ext) in sources.iter().zip(&extents).rev() {
                    if !ext.contains(x, y) {
                        continue;
                    }
                    let (px, py) = src.transform().geo_to_pixel(x, y);
                    let Some(lead) = params.interpolation.sample(src.grid(), px, py) else {
                        continue;
                    };
                    out[0][base + col] = lead;
                    for (b, band) in src.bands().iter().enumerate().skip(1) {
                        if let Some(v) = params.interpolation.sample(band.raster(), px, py) {
                            out[b][base + col] = v;
                        }
                    }
                    covered = true;
                    break;
                }

                if !covered && fail_uncovered {
                    return Err(Error::NoCoveringSource { row, col });
                }
            }
        }
        Ok(out)
    })?;

    let mut data: Vec<Vec<f64>> = (0..n_bands).map(|_| Vec::with_capacity(rows * cols)).collect();
    for block in blocks {
        for (plane, part) in data.iter_mut().zip(block) {
            plane.extend(part);
        }
    }

    let crs = footprint.crs().or(first.crs()).cloned();
    let mut planes = Vec::with_capacity(n_bands);
    for ((band, values), nd) in first.bands().iter().zip(data).zip(&nodata) {
        let mut raster = Raster::from_vec(values, rows, cols)?;
        raster.set_transform(transform);
        raster.set_crs(crs.clone());
        raster.set_nodata(Some(*nd));
        planes.push((band.name().to_string(), raster));
    }

    let filled = planes
        .first()
        .map(|(_, r)| r.data().iter().filter(|v| !v.is_nodata(r.nodata())).count())
        .unwrap_or(0);
    debug!(filled, total = rows * cols, "cookie cutter finished");

    Ok(Image::from_planes(&params.output, planes)?.with_metadata(&params.metadata))
}
