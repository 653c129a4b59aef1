//! Automated Cloud Cover Assessment (ACCA)
//!
//! Pass one walks every pixel through an ordered table of threshold rules
//! on RED, GREEN, NIR, SWIR1 reflectance and LWIR brightness temperature
//! (Kelvin). The first rule that fires decides the class; a pixel that
//! survives every rule is cloud.
//!
//! Pass two uses the temperature distribution of the pass-one clouds to
//! promote cold ambiguous pixels to cloud, then drops cloud regions smaller
//! than `min_pixels` and grows the rest by `erosion_size`.
//!
//! Reference:
//! Irish, R.R. et al. (2006). Characterization of the Landsat-7 ETM+
//! Automated Cloud-Cover Assessment (ACCA) algorithm. *PE&RS*, 72(10).

use bandwise_core::{Algorithm, Dictionary, Error, Image, Raster, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{check_range, from_dictionary};
use crate::kernel::{evaluate, KernelOptions, PixelKernel, MASK_NODATA};
use crate::masking::cleanup::{dilate_class, percentile, remove_small_regions};
use crate::masking::{class_fraction, mask_image};
use crate::registry;

/// ACCA output classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AccaClass {
    Clear = 0,
    Cloud = 1,
    Ambiguous = 2,
    Snow = 3,
}

impl AccaClass {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Threshold overrides accepted through the auxiliary configuration map
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccaConfig {
    /// NDSI below this is clear (vegetation, water)
    pub ndsi_min: f64,
    /// NDSI at or above this is snow
    pub ndsi_snow: f64,
    /// `(1 - SWIR1) * BT` at or above this is ambiguous
    pub composite_max: f64,
    /// NIR/RED at or above this is ambiguous (vegetation)
    pub nir_red_max: f64,
    /// NIR/GREEN at or above this is ambiguous (senescent vegetation)
    pub nir_green_max: f64,
    /// NIR/SWIR1 at or below this is ambiguous (rocks, sand)
    pub nir_swir1_min: f64,
    /// Minimum pass-one cloud fraction (0-1) for the thermal pass to run
    pub pass2_min_fraction: f64,
    /// Percentile of cloud temperatures used as the warm ceiling
    pub upper_percentile: f64,
}

impl Default for AccaConfig {
    fn default() -> Self {
        Self {
            ndsi_min: -0.25,
            ndsi_snow: 0.7,
            composite_max: 225.0,
            nir_red_max: 2.0,
            nir_green_max: 2.16248,
            nir_swir1_min: 1.0,
            pass2_min_fraction: 0.004,
            upper_percentile: 97.5,
        }
    }
}

impl AccaConfig {
    pub fn from_dictionary(dict: &Dictionary) -> Result<Self> {
        let cfg: Self = from_dictionary(dict)?;
        check_range("pass2_min_fraction", cfg.pass2_min_fraction, 0.0, 1.0)?;
        check_range("upper_percentile", cfg.upper_percentile, 0.0, 100.0)?;
        Ok(cfg)
    }
}

/// Parameters for ACCA
#[derive(Debug, Clone)]
pub struct AccaParams {
    /// Output target
    pub output: String,
    /// RED brightness threshold (reflectance)
    pub threshold1: f64,
    /// Cold-cloud brightness temperature threshold (Kelvin)
    pub threshold2: f64,
    /// Minimum 8-connected cloud region size in pixels
    pub min_pixels: usize,
    /// Radius in pixels of the square window surviving clouds are grown by
    pub erosion_size: usize,
    /// Cap on the warm-cloud ceiling above the mean cloud temperature, hundredths of Kelvin
    pub temp_offset: i32,
    /// Auxiliary threshold overrides, see [`AccaConfig`]
    pub extra: Dictionary,
    /// Merged into the output metadata
    pub metadata: Dictionary,
    pub options: KernelOptions,
}

impl Default for AccaParams {
    fn default() -> Self {
        Self {
            output: "acca".to_string(),
            threshold1: 0.08,
            threshold2: 300.0,
            min_pixels: 5,
            erosion_size: 10,
            temp_offset: 4000,
            extra: Dictionary::new(),
            metadata: Dictionary::new(),
            options: KernelOptions::default(),
        }
    }
}

impl AccaParams {
    pub fn new(output: impl Into<String>, threshold1: f64, threshold2: f64) -> Self {
        Self {
            output: output.into(),
            threshold1,
            threshold2,
            ..Self::default()
        }
    }
}

/// Mask plus the scene statistics ACCA derived on the way
#[derive(Debug, Clone)]
pub struct AccaMask {
    pub mask: Raster<u8>,
    /// Percent of valid pixels labelled cloud
    pub cloud_cover: f64,
    /// Entries for the output metadata
    pub metadata: Dictionary,
}

// ---------------------------------------------------------------------------
// Pass one: rule table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Pixel {
    red: f64,
    green: f64,
    nir: f64,
    swir1: f64,
    bt: f64,
}

#[derive(Debug, Clone)]
struct Rules {
    red_min: f64,
    bt_max: f64,
    cfg: AccaConfig,
}

type Rule = fn(&Pixel, &Rules) -> Option<AccaClass>;

/// Applied in order; the first `Some` decides the class
const PASS_ONE: [(&str, Rule); 7] = [
    ("brightness", brightness),
    ("ndsi", snow_index),
    ("temperature", temperature),
    ("composite", composite),
    ("nir_red", nir_red),
    ("nir_green", nir_green),
    ("nir_swir1", nir_swir1),
];

fn brightness(p: &Pixel, r: &Rules) -> Option<AccaClass> {
    (p.red <= r.red_min).then_some(AccaClass::Clear)
}

fn snow_index(p: &Pixel, r: &Rules) -> Option<AccaClass> {
    let ndsi = (p.green - p.swir1) / (p.green + p.swir1);
    if ndsi >= r.cfg.ndsi_snow {
        Some(AccaClass::Snow)
    } else if ndsi < r.cfg.ndsi_min {
        Some(AccaClass::Clear)
    } else {
        None
    }
}

fn temperature(p: &Pixel, r: &Rules) -> Option<AccaClass> {
    (p.bt >= r.bt_max).then_some(AccaClass::Clear)
}

fn composite(p: &Pixel, r: &Rules) -> Option<AccaClass> {
    ((1.0 - p.swir1) * p.bt >= r.cfg.composite_max).then_some(AccaClass::Ambiguous)
}

fn nir_red(p: &Pixel, r: &Rules) -> Option<AccaClass> {
    (p.nir / p.red >= r.cfg.nir_red_max).then_some(AccaClass::Ambiguous)
}

fn nir_green(p: &Pixel, r: &Rules) -> Option<AccaClass> {
    (p.nir / p.green >= r.cfg.nir_green_max).then_some(AccaClass::Ambiguous)
}

fn nir_swir1(p: &Pixel, r: &Rules) -> Option<AccaClass> {
    (p.nir / p.swir1 <= r.cfg.nir_swir1_min).then_some(AccaClass::Ambiguous)
}

fn classify(p: &Pixel, rules: &Rules) -> AccaClass {
    PASS_ONE
        .iter()
        .find_map(|(_, rule)| rule(p, rules))
        .unwrap_or(AccaClass::Cloud)
}

struct AccaKernel {
    rules: Rules,
}

impl PixelKernel for AccaKernel {
    type Output = u8;

    fn outputs(&self) -> usize {
        1
    }

    fn apply(&self, s: &[f64], out: &mut [u8]) {
        let p = Pixel {
            red: s[0],
            green: s[1],
            nir: s[2],
            swir1: s[3],
            bt: s[4],
        };
        out[0] = classify(&p, &self.rules).code();
    }
}

// ---------------------------------------------------------------------------
// Pass two
// ---------------------------------------------------------------------------

/// Run both passes and return the mask with its statistics
pub fn acca_mask(image: &Image, params: &AccaParams) -> Result<AccaMask> {
    let cfg = AccaConfig::from_dictionary(&params.extra)?;
    check_range("threshold1", params.threshold1, f64::MIN, f64::MAX)?;
    check_range("threshold2", params.threshold2, f64::MIN, f64::MAX)?;

    let mapping = registry::validate_for(image, "acca")?;
    let planes = mapping.planes(image);
    let (rows, cols) = image.shape();
    info!(image = image.name(), rows, cols, "ACCA");

    let kernel = AccaKernel {
        rules: Rules {
            red_min: params.threshold1,
            bt_max: params.threshold2,
            cfg: cfg.clone(),
        },
    };
    let mut mask = evaluate(&planes, &kernel, MASK_NODATA, &params.options)?
        .pop()
        .ok_or_else(|| Error::Algorithm("ACCA pass produced no plane".to_string()))?;
    params.options.check_cancelled()?;

    let cloud = AccaClass::Cloud.code();
    let ambiguous = AccaClass::Ambiguous.code();
    let pass_one_fraction = class_fraction(&mask, cloud);
    debug!(cloud_fraction = pass_one_fraction, "ACCA pass one");

    let mut metadata = Dictionary::new();
    let lwir = planes[4];
    let mut cloud_temps: Vec<f64> = mask
        .data()
        .iter()
        .zip(lwir.data().iter())
        .filter(|(m, _)| **m == cloud)
        .map(|(_, &t)| t)
        .collect();

    if !cloud_temps.is_empty() && pass_one_fraction >= cfg.pass2_min_fraction {
        let mean = cloud_temps.iter().sum::<f64>() / cloud_temps.len() as f64;
        let upper = percentile(&mut cloud_temps, cfg.upper_percentile).unwrap_or(mean);
        let ceiling = upper.min(mean + f64::from(params.temp_offset) / 100.0);

        let mut promoted = 0usize;
        for (m, &t) in mask.data_mut().iter_mut().zip(lwir.data().iter()) {
            if *m == ambiguous && t < ceiling {
                *m = cloud;
                promoted += 1;
            }
        }
        debug!(mean, upper, ceiling, promoted, "ACCA thermal pass");
        metadata.insert("ACCA_MEAN_CLOUD_TEMP".to_string(), format!("{:.2}", mean));
        metadata.insert("ACCA_THERMAL_CEILING".to_string(), format!("{:.2}", ceiling));
        metadata.insert("ACCA_PASS2".to_string(), "applied".to_string());
    } else {
        warn!(
            cloud_fraction = pass_one_fraction,
            "too few pass-one clouds, skipping ACCA thermal pass"
        );
        metadata.insert("ACCA_PASS2".to_string(), "skipped".to_string());
    }

    let removed = remove_small_regions(
        mask.data_mut(),
        cloud,
        params.min_pixels,
        AccaClass::Clear.code(),
    );
    let grown = dilate_class(mask.data_mut(), cloud, params.erosion_size, &[MASK_NODATA]);
    debug!(removed, grown, "ACCA cleanup");

    let cloud_cover = 100.0 * class_fraction(&mask, cloud);
    metadata.insert("CLOUDCOVER".to_string(), format!("{:.2}", cloud_cover));
    info!(cloud_cover, "ACCA finished");

    Ok(AccaMask {
        mask,
        cloud_cover,
        metadata,
    })
}

/// ACCA cloud mask as a one-band image named `params.output`
pub fn acca(image: &Image, params: &AccaParams) -> Result<Image> {
    let result = acca_mask(image, params)?;
    mask_image(&params.output, "acca", &result.mask, &result.metadata, &params.metadata)
}

/// ACCA as an [`Algorithm`]
#[derive(Debug, Clone, Default)]
pub struct Acca;

impl Algorithm for Acca {
    type Input = Image;
    type Output = Image;
    type Params = AccaParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "acca"
    }

    fn description(&self) -> &'static str {
        "Automated cloud cover assessment"
    }

    fn execute(&self, input: Image, params: AccaParams) -> Result<Image> {
        acca(&input, &params)
    }
}
