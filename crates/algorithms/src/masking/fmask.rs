//! Fmask cloud, cloud-shadow, snow and water mask
//!
//! Pass one tags every pixel with spectral tests: potential cloud, water,
//! snow, and a variability probability. Pass two derives scene-wide
//! temperature and probability thresholds from the clear-land pixels,
//! decides cloud, then finds shadow as NIR depressions next to nothing
//! brighter (priority-flood fill of the NIR plane).
//!
//! Reference:
//! Zhu, Z. & Woodcock, C.E. (2012). Object-based cloud and cloud shadow
//! detection in Landsat imagery. *Remote Sensing of Environment*, 118, 83–94.

use bandwise_core::{Algorithm, Dictionary, Error, Image, Raster, Result};
use ndarray::Array2;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{check_range, from_dictionary};
use crate::kernel::{evaluate, KernelOptions, PixelKernel, CONTINUOUS_NODATA, MASK_NODATA};
use crate::masking::cleanup::{dilate_class, fill_depressions, percentile, remove_small_regions};
use crate::masking::{class_fraction, mask_image};
use crate::registry;

/// Fmask output classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FmaskClass {
    Clear = 0,
    Water = 1,
    Shadow = 2,
    Snow = 3,
    Cloud = 4,
}

impl FmaskClass {
    pub const ALL: [FmaskClass; 5] = [
        FmaskClass::Clear,
        FmaskClass::Water,
        FmaskClass::Shadow,
        FmaskClass::Snow,
        FmaskClass::Cloud,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            FmaskClass::Clear => "CLEAR",
            FmaskClass::Water => "WATER",
            FmaskClass::Shadow => "SHADOW",
            FmaskClass::Snow => "SNOW",
            FmaskClass::Cloud => "CLOUD",
        }
    }
}

const POTENTIAL_CLOUD: u8 = 1;
const WATER: u8 = 2;
const SNOW: u8 = 4;

/// Threshold overrides accepted through the auxiliary configuration map
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FmaskConfig {
    /// SWIR2 above this may be cloud
    pub swir2_min: f64,
    /// Brightness temperature (K) below this may be cloud
    pub bt_max: f64,
    pub ndsi_max: f64,
    pub ndvi_max: f64,
    /// Visible-band flatness below this may be cloud
    pub whiteness_max: f64,
    /// Offset of the haze-optimized transform `BLUE - 0.5 RED - offset`
    pub hot_offset: f64,
    /// NIR/SWIR1 above this may be cloud
    pub nir_swir1_min: f64,
    /// Snow needs NDSI above this
    pub snow_ndsi_min: f64,
    /// Snow needs BT (K) below this
    pub snow_bt_max: f64,
    /// Scene fraction of clear land below which every potential cloud is cloud
    pub clear_land_min_fraction: f64,
    /// Percentile of clear-land cloud probability the threshold starts from
    pub land_percentile: f64,
    /// Lower percentile of clear-land temperature
    pub temp_low_percentile: f64,
    /// Upper percentile of clear-land temperature
    pub temp_high_percentile: f64,
    /// Potential cloud over water is cloud when SWIR1 exceeds this
    pub water_cloud_swir1: f64,
    /// NIR fill depth that marks potential shadow
    pub shadow_depth: f64,
    /// Cloud regions smaller than this are dropped
    pub min_cloud_pixels: usize,
}

impl Default for FmaskConfig {
    fn default() -> Self {
        Self {
            swir2_min: 0.03,
            bt_max: 300.15,
            ndsi_max: 0.8,
            ndvi_max: 0.8,
            whiteness_max: 0.7,
            hot_offset: 0.08,
            nir_swir1_min: 0.75,
            snow_ndsi_min: 0.15,
            snow_bt_max: 276.95,
            clear_land_min_fraction: 0.001,
            land_percentile: 82.5,
            temp_low_percentile: 17.5,
            temp_high_percentile: 82.5,
            water_cloud_swir1: 0.11,
            shadow_depth: 0.02,
            min_cloud_pixels: 3,
        }
    }
}

impl FmaskConfig {
    pub fn from_dictionary(dict: &Dictionary) -> Result<Self> {
        let cfg: Self = from_dictionary(dict)?;
        check_range("clear_land_min_fraction", cfg.clear_land_min_fraction, 0.0, 1.0)?;
        check_range("land_percentile", cfg.land_percentile, 0.0, 100.0)?;
        check_range("temp_low_percentile", cfg.temp_low_percentile, 0.0, 100.0)?;
        check_range("temp_high_percentile", cfg.temp_high_percentile, 0.0, 100.0)?;
        Ok(cfg)
    }
}

/// Parameters for Fmask
#[derive(Debug, Clone)]
pub struct FmaskParams {
    pub output: String,
    /// Cloud tolerance 1-5; adds `0.075 * p1` to the cloud probability threshold
    pub p1: u8,
    /// Dilation radius in pixels for cloud and shadow
    pub p2: usize,
    /// Auxiliary threshold overrides, see [`FmaskConfig`]
    pub extra: Dictionary,
    /// Merged into the output metadata
    pub metadata: Dictionary,
    pub options: KernelOptions,
}

impl Default for FmaskParams {
    fn default() -> Self {
        Self {
            output: "fmask".to_string(),
            p1: 3,
            p2: 5,
            extra: Dictionary::new(),
            metadata: Dictionary::new(),
            options: KernelOptions::default(),
        }
    }
}

impl FmaskParams {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Pass one
// ---------------------------------------------------------------------------

struct FmaskKernel<'a> {
    cfg: &'a FmaskConfig,
}

impl PixelKernel for FmaskKernel<'_> {
    type Output = f64;

    /// Flags and variability probability
    fn outputs(&self) -> usize {
        2
    }

    fn apply(&self, s: &[f64], out: &mut [f64]) {
        let (blue, red, green, nir, swir1, swir2, bt) = (s[0], s[1], s[2], s[3], s[4], s[5], s[6]);
        let c = self.cfg;

        let ndvi = safe_nd(nir, red);
        let ndsi = safe_nd(green, swir1);
        let visible = (blue + green + red) / 3.0;
        let whiteness = if visible.abs() < 1e-10 {
            f64::INFINITY
        } else {
            ((blue - visible).abs() + (green - visible).abs() + (red - visible).abs()) / visible
        };
        let hot = blue - 0.5 * red - c.hot_offset;

        let basic = swir2 > c.swir2_min && bt < c.bt_max && ndsi < c.ndsi_max && ndvi < c.ndvi_max;
        let potential =
            basic && whiteness < c.whiteness_max && hot > 0.0 && nir / swir1 > c.nir_swir1_min;
        let water = (ndvi < 0.01 && nir < 0.11) || (ndvi < 0.1 && ndvi > 0.0 && nir < 0.05);
        let snow = ndsi > c.snow_ndsi_min && bt < c.snow_bt_max && nir > 0.11 && green > 0.1;

        let mut flags = 0u8;
        if potential {
            flags |= POTENTIAL_CLOUD;
        }
        if water {
            flags |= WATER;
        }
        if snow {
            flags |= SNOW;
        }
        out[0] = f64::from(flags);
        out[1] = 1.0 - ndvi.abs().max(ndsi.abs()).max(whiteness.min(1.0));
    }
}

/// Normalized difference with zero sums mapped to 0
fn safe_nd(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if sum.abs() < 1e-10 {
        0.0
    } else {
        (a - b) / sum
    }
}

// ---------------------------------------------------------------------------
// Pass two
// ---------------------------------------------------------------------------

/// Fmask class grid with per-class percentages in `metadata`
#[derive(Debug, Clone)]
pub struct FmaskMask {
    pub mask: Raster<u8>,
    pub metadata: Dictionary,
}

/// Run both passes and return the class grid
pub fn fmask_mask(image: &Image, params: &FmaskParams) -> Result<FmaskMask> {
    let cfg = FmaskConfig::from_dictionary(&params.extra)?;
    if !(1..=5).contains(&params.p1) {
        return Err(Error::InvalidParameter {
            name: "p1".to_string(),
            value: params.p1.to_string(),
            reason: "cloud tolerance must be within 1..=5".to_string(),
        });
    }

    let mapping = registry::validate_for(image, "fmask")?;
    let planes = mapping.planes(image);
    let (rows, cols) = image.shape();
    info!(image = image.name(), rows, cols, p1 = params.p1, p2 = params.p2, "Fmask");

    let mut pass_one = evaluate(&planes, &FmaskKernel { cfg: &cfg }, CONTINUOUS_NODATA, &params.options)?;
    let variability = pass_one
        .pop()
        .ok_or_else(|| Error::Algorithm("Fmask pass produced no plane".to_string()))?;
    let flag_plane = pass_one
        .pop()
        .ok_or_else(|| Error::Algorithm("Fmask pass produced no plane".to_string()))?;
    params.options.check_cancelled()?;

    let valid = flag_plane.data().mapv(|v| v != CONTINUOUS_NODATA);
    let flags = flag_plane.data().mapv(|v| if v == CONTINUOUS_NODATA { 0 } else { v as u8 });
    let bt = planes[6].data();
    let nir = planes[3].data();
    let swir1 = planes[4].data();
    let var_prob = variability.data();

    let n_valid = valid.iter().filter(|&&v| v).count();
    let is_clear_land = |r: usize, c: usize| valid[(r, c)] && flags[(r, c)] & (POTENTIAL_CLOUD | WATER) == 0;
    let mut clear_temps = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            if is_clear_land(r, c) {
                clear_temps.push(bt[(r, c)]);
            }
        }
    }

    let mut labels = Array2::from_elem((rows, cols), MASK_NODATA);
    let cloud = FmaskClass::Cloud.code();
    let enough_land = n_valid > 0
        && clear_temps.len() as f64 / n_valid as f64 >= cfg.clear_land_min_fraction;

    if enough_land {
        let t_low = percentile(&mut clear_temps, cfg.temp_low_percentile).unwrap_or(0.0);
        let t_high = percentile(&mut clear_temps, cfg.temp_high_percentile).unwrap_or(0.0);
        let span = (t_high + 4.0) - (t_low - 4.0);
        let land_prob = |r: usize, c: usize| {
            let temp_prob = ((t_high + 4.0 - bt[(r, c)]) / span).max(0.0);
            temp_prob * var_prob[(r, c)]
        };

        let mut clear_probs = Vec::with_capacity(clear_temps.len());
        for r in 0..rows {
            for c in 0..cols {
                if is_clear_land(r, c) {
                    clear_probs.push(land_prob(r, c));
                }
            }
        }
        let threshold = percentile(&mut clear_probs, cfg.land_percentile).unwrap_or(0.0)
            + 0.075 * f64::from(params.p1);
        debug!(t_low, t_high, threshold, "Fmask clear-land statistics");

        for r in 0..rows {
            for c in 0..cols {
                if !valid[(r, c)] {
                    continue;
                }
                let f = flags[(r, c)];
                let potential = f & POTENTIAL_CLOUD != 0;
                let water = f & WATER != 0;
                let prob = land_prob(r, c);
                let is_cloud = (potential && !water && prob > threshold)
                    || (potential && water && swir1[(r, c)] > cfg.water_cloud_swir1)
                    || (!water && prob > 0.99)
                    || bt[(r, c)] < t_low - 35.0;
                labels[(r, c)] = if is_cloud { cloud } else { FmaskClass::Clear.code() };
            }
        }
    } else {
        warn!(
            clear_land = clear_temps.len(),
            valid = n_valid,
            "too little clear land, every potential cloud pixel is cloud"
        );
        for r in 0..rows {
            for c in 0..cols {
                if valid[(r, c)] {
                    labels[(r, c)] = if flags[(r, c)] & POTENTIAL_CLOUD != 0 {
                        cloud
                    } else {
                        FmaskClass::Clear.code()
                    };
                }
            }
        }
    }

    let removed = remove_small_regions(&mut labels, cloud, cfg.min_cloud_pixels, FmaskClass::Clear.code());
    let has_cloud = labels.iter().any(|&v| v == cloud);

    // Shadow, snow and water on the remaining pixels
    let filled = if has_cloud {
        Some(fill_depressions(nir, &valid))
    } else {
        None
    };
    for r in 0..rows {
        for c in 0..cols {
            if labels[(r, c)] != FmaskClass::Clear.code() {
                continue;
            }
            let f = flags[(r, c)];
            let water = f & WATER != 0;
            let shadow = !water
                && filled
                    .as_ref()
                    .is_some_and(|fill| fill[(r, c)] - nir[(r, c)] > cfg.shadow_depth);
            labels[(r, c)] = if shadow {
                FmaskClass::Shadow.code()
            } else if f & SNOW != 0 {
                FmaskClass::Snow.code()
            } else if water {
                FmaskClass::Water.code()
            } else {
                FmaskClass::Clear.code()
            };
        }
    }

    let shadow_grown = dilate_class(
        &mut labels,
        FmaskClass::Shadow.code(),
        params.p2,
        &[MASK_NODATA, cloud],
    );
    let cloud_grown = dilate_class(&mut labels, cloud, params.p2, &[MASK_NODATA]);
    debug!(removed, shadow_grown, cloud_grown, "Fmask cleanup");

    let mask = Raster::on_grid_of(planes[0], labels.iter().copied().collect(), Some(MASK_NODATA))?;
    let mut metadata = Dictionary::new();
    for class in FmaskClass::ALL {
        let pct = 100.0 * class_fraction(&mask, class.code());
        metadata.insert(format!("FMASK_{}", class.name()), format!("{:.2}", pct));
    }
    let cloud_cover = 100.0 * class_fraction(&mask, cloud);
    metadata.insert("CLOUDCOVER".to_string(), format!("{:.2}", cloud_cover));
    info!(cloud_cover, "Fmask finished");

    Ok(FmaskMask { mask, metadata })
}

/// Fmask class mask as a one-band image named `params.output`
pub fn fmask(image: &Image, params: &FmaskParams) -> Result<Image> {
    let result = fmask_mask(image, params)?;
    mask_image(&params.output, "fmask", &result.mask, &result.metadata, &params.metadata)
}

/// Fmask as an [`Algorithm`]
#[derive(Debug, Clone, Default)]
pub struct Fmask;

impl Algorithm for Fmask {
    type Input = Image;
    type Output = Image;
    type Params = FmaskParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "fmask"
    }

    fn description(&self) -> &'static str {
        "Cloud, cloud shadow, snow and water mask"
    }

    fn execute(&self, input: Image, params: FmaskParams) -> Result<Image> {
        fmask(&input, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags_of(s: [f64; 7]) -> u8 {
        let cfg = FmaskConfig::default();
        let mut out = [0.0; 2];
        FmaskKernel { cfg: &cfg }.apply(&s, &mut out);
        out[0] as u8
    }

    #[test]
    fn test_bright_cold_pixel_is_potential_cloud() {
        // blue, red, green, nir, swir1, swir2, bt
        let f = flags_of([0.45, 0.42, 0.44, 0.46, 0.4, 0.3, 270.0]);
        assert_ne!(f & POTENTIAL_CLOUD, 0);
        assert_eq!(f & WATER, 0);
    }

    #[test]
    fn test_dark_low_nir_is_water() {
        let f = flags_of([0.06, 0.04, 0.05, 0.03, 0.01, 0.005, 290.0]);
        assert_ne!(f & WATER, 0);
        assert_eq!(f & POTENTIAL_CLOUD, 0);
    }

    #[test]
    fn test_snow_flag() {
        let f = flags_of([0.8, 0.75, 0.8, 0.7, 0.1, 0.05, 265.0]);
        assert_ne!(f & SNOW, 0);
    }

    #[test]
    fn test_p1_range() {
        let img = Image::from_planes("s", vec![("blue", Raster::filled(2, 2, 0.1))]).unwrap();
        let params = FmaskParams {
            p1: 9,
            ..FmaskParams::default()
        };
        assert!(matches!(fmask(&img, &params), Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_missing_band_named() {
        let img = Image::from_planes("s", vec![("blue", Raster::filled(2, 2, 0.1))]).unwrap();
        match fmask(&img, &FmaskParams::default()) {
            Err(Error::MissingBand { algorithm, band }) => {
                assert_eq!(algorithm, "fmask");
                assert_eq!(band, "RED");
            }
            other => panic!("expected MissingBand, got {:?}", other),
        }
    }
}
