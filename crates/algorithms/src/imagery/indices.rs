//! Spectral indices
//!
//! Each index reads its bands by symbolic name through the registry and is
//! evaluated per pixel by the kernel. The batch entry point [`indices`]
//! computes any number of indices in a single pass over the union of their
//! bands, so each input plane is read once.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bandwise_core::{Algorithm, BandId, Dictionary, Error, Image, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{from_dictionary, lenient_f64};
use crate::kernel::{evaluate, KernelOptions, PixelKernel, CONTINUOUS_NODATA};
use crate::registry::{self, union_of};

/// Enumeration of supported spectral indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Enhanced Vegetation Index
    Evi,
    /// Land Surface Water Index
    Lswi,
    /// Normalized Difference Snow Index
    Ndsi,
    /// Normalized Difference Water Index (McFeeters)
    Ndwi,
    /// Brightness Index
    Bi,
    /// Soil-Adjusted Total Vegetation Index
    Satvi,
    /// Modified Soil-Adjusted Vegetation Index
    Msavi2,
    /// Visible Atmospherically Resistant Index
    Vari,
    /// Weighted brightness
    Brgt,
}

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 10] = [
        SpectralIndex::Ndvi,
        SpectralIndex::Evi,
        SpectralIndex::Lswi,
        SpectralIndex::Ndsi,
        SpectralIndex::Ndwi,
        SpectralIndex::Bi,
        SpectralIndex::Satvi,
        SpectralIndex::Msavi2,
        SpectralIndex::Vari,
        SpectralIndex::Brgt,
    ];

    /// Registry name
    pub fn name(&self) -> &'static str {
        match self {
            SpectralIndex::Ndvi => "ndvi",
            SpectralIndex::Evi => "evi",
            SpectralIndex::Lswi => "lswi",
            SpectralIndex::Ndsi => "ndsi",
            SpectralIndex::Ndwi => "ndwi",
            SpectralIndex::Bi => "bi",
            SpectralIndex::Satvi => "satvi",
            SpectralIndex::Msavi2 => "msavi2",
            SpectralIndex::Vari => "vari",
            SpectralIndex::Brgt => "brgt",
        }
    }

    /// Bands read by this index, in the order [`SpectralIndex::compute`] expects them
    pub fn required_bands(&self) -> &'static [BandId] {
        // Every index has a registry entry.
        registry::lookup(self.name()).unwrap_or(&[])
    }

    /// Evaluate the index on one pixel.
    ///
    /// `s` holds the required bands in registry order. A zero denominator
    /// gives NaN, which the kernel stores as nodata.
    pub fn compute(&self, s: &[f64], cfg: &IndexConfig) -> f64 {
        match self {
            SpectralIndex::Ndvi => normalized_difference(s[0], s[1]),
            SpectralIndex::Evi => {
                let (nir, red, blue) = (s[0], s[1], s[2]);
                ratio(
                    cfg.evi_gain * (nir - red),
                    nir + cfg.evi_c1 * red - cfg.evi_c2 * blue + cfg.evi_l,
                )
            }
            SpectralIndex::Lswi => normalized_difference(s[0], s[1]),
            SpectralIndex::Ndsi => {
                let (swir1, green) = (s[0], s[1]);
                normalized_difference(green, swir1)
            }
            SpectralIndex::Ndwi => normalized_difference(s[0], s[1]),
            SpectralIndex::Bi => 0.5 * (s[0] + s[1]),
            SpectralIndex::Satvi => {
                let (swir1, red, swir2) = (s[0], s[1], s[2]);
                let l = cfg.satvi_l;
                ratio(swir1 - red, swir1 + red + l) * (1.0 + l) - swir2 / 2.0
            }
            SpectralIndex::Msavi2 => {
                let (nir, red) = (s[0], s[1]);
                let a = 2.0 * nir + 1.0;
                // Negative discriminant yields NaN
                (a - (a * a - 8.0 * (nir - red)).sqrt()) / 2.0
            }
            SpectralIndex::Vari => {
                let (red, green, blue) = (s[0], s[1], s[2]);
                ratio(green - red, green + red - blue)
            }
            SpectralIndex::Brgt => {
                let (red, green, blue, nir) = (s[0], s[1], s[2], s[3]);
                0.3 * blue + 0.3 * red + 0.1 * nir + 0.3 * green
            }
        }
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpectralIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim();
        SpectralIndex::ALL
            .iter()
            .copied()
            .find(|i| i.name().eq_ignore_ascii_case(key))
            .ok_or_else(|| Error::UnknownAlgorithm(s.to_string()))
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den.abs() < 1e-10 {
        f64::NAN
    } else {
        num / den
    }
}

/// `(a - b) / (a + b)`
pub fn normalized_difference(a: f64, b: f64) -> f64 {
    ratio(a - b, a + b)
}

/// Coefficients and output nodata for the index family
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// EVI gain factor G
    pub evi_gain: f64,
    /// EVI red aerosol coefficient C1
    pub evi_c1: f64,
    /// EVI blue aerosol coefficient C2
    pub evi_c2: f64,
    /// EVI canopy background L
    pub evi_l: f64,
    /// SATVI soil adjustment L
    pub satvi_l: f64,
    /// Nodata written to every index plane; may be NaN
    #[serde(deserialize_with = "lenient_f64")]
    pub nodata: f64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            evi_gain: 2.5,
            evi_c1: 6.0,
            evi_c2: 7.5,
            evi_l: 1.0,
            satvi_l: 0.5,
            nodata: CONTINUOUS_NODATA,
        }
    }
}

impl IndexConfig {
    pub fn from_dictionary(dict: &Dictionary) -> Result<Self> {
        from_dictionary(dict)
    }
}

/// Several indices evaluated over the union of their bands
struct IndexSetKernel<'a> {
    indices: Vec<(SpectralIndex, Vec<usize>)>,
    config: &'a IndexConfig,
}

impl PixelKernel for IndexSetKernel<'_> {
    type Output = f64;

    fn outputs(&self) -> usize {
        self.indices.len()
    }

    fn apply(&self, samples: &[f64], out: &mut [f64]) {
        let mut local = [0.0f64; 4];
        for (o, (index, positions)) in self.indices.iter().enumerate() {
            for (k, &p) in positions.iter().enumerate() {
                local[k] = samples[p];
            }
            out[o] = index.compute(&local[..positions.len()], self.config);
        }
    }
}

/// Compute every requested index in one pass.
///
/// `requests` maps index names to output targets; each target becomes one
/// band of the returned image, named after the target. All requested
/// names and bands are validated before any pixel is evaluated.
/// `metadata` is merged into the output after the `PRODUCTS` entry.
pub fn indices(
    image: &Image,
    requests: &BTreeMap<String, String>,
    config: &IndexConfig,
    metadata: &Dictionary,
    options: &KernelOptions,
) -> Result<Image> {
    if requests.is_empty() {
        return Err(Error::InvalidParameter {
            name: "products".to_string(),
            value: "{}".to_string(),
            reason: "no index requested".to_string(),
        });
    }

    let mut wanted: Vec<(SpectralIndex, &str)> = Vec::with_capacity(requests.len());
    for (name, target) in requests {
        let index: SpectralIndex = name.parse()?;
        if wanted.iter().any(|(_, t)| t.eq_ignore_ascii_case(target)) {
            return Err(Error::InvalidParameter {
                name: name.clone(),
                value: target.clone(),
                reason: "output target used by more than one index".to_string(),
            });
        }
        // Fail with the index's own name in the error
        registry::validate_for(image, index.name())?;
        wanted.push((index, target.as_str()));
    }

    let bands = union_of(wanted.iter().map(|(i, _)| i.required_bands()));
    let mapping = registry::validate(image, &bands)?;
    let planes = mapping.planes(image);

    let kernel = IndexSetKernel {
        indices: wanted
            .iter()
            .map(|(index, _)| {
                let positions = index
                    .required_bands()
                    .iter()
                    .filter_map(|b| bands.iter().position(|u| u == b))
                    .collect();
                (*index, positions)
            })
            .collect(),
        config,
    };

    info!(
        image = image.name(),
        indices = wanted.len(),
        bands = bands.len(),
        "computing spectral indices"
    );
    let outputs = evaluate(&planes, &kernel, config.nodata, options)?;

    let products: Vec<String> = wanted
        .iter()
        .map(|(index, target)| format!("{}={}", index, target))
        .collect();
    debug!(products = ?products, "index pass finished");

    let planes = wanted
        .iter()
        .map(|(_, target)| target.to_string())
        .zip(outputs)
        .collect();
    let mut out = Image::from_planes(image.name(), planes)?;
    out.metadata_mut()
        .insert("PRODUCTS".to_string(), products.join(","));
    Ok(out.with_metadata(metadata))
}

/// Compute one index into a single-band image named `output`
pub fn index(
    image: &Image,
    which: SpectralIndex,
    output: &str,
    config: &IndexConfig,
    options: &KernelOptions,
) -> Result<Image> {
    let mut requests = BTreeMap::new();
    requests.insert(which.name().to_string(), output.to_string());
    indices(image, &requests, config, &Dictionary::new(), options)
}

/// NDVI with default coefficients
pub fn ndvi(image: &Image, output: &str) -> Result<Image> {
    index(
        image,
        SpectralIndex::Ndvi,
        output,
        &IndexConfig::default(),
        &KernelOptions::default(),
    )
}

/// EVI with default coefficients
pub fn evi(image: &Image, output: &str) -> Result<Image> {
    index(
        image,
        SpectralIndex::Evi,
        output,
        &IndexConfig::default(),
        &KernelOptions::default(),
    )
}

// ---------------------------------------------------------------------------
// Algorithm trait
// ---------------------------------------------------------------------------

/// Parameters for the batch index algorithm
#[derive(Debug, Clone, Default)]
pub struct SpectralIndicesParams {
    /// Index name to output target
    pub products: BTreeMap<String, String>,
    /// Overrides for [`IndexConfig`]
    pub overrides: Dictionary,
    /// Merged into the output metadata
    pub metadata: Dictionary,
    pub options: KernelOptions,
}

/// Batch spectral index algorithm
#[derive(Debug, Clone, Default)]
pub struct SpectralIndices;

impl Algorithm for SpectralIndices {
    type Input = Image;
    type Output = Image;
    type Params = SpectralIndicesParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "indices"
    }

    fn description(&self) -> &'static str {
        "Compute several spectral indices in one pass"
    }

    fn execute(&self, input: Image, params: SpectralIndicesParams) -> Result<Image> {
        let config = IndexConfig::from_dictionary(&params.overrides)?;
        indices(
            &input,
            &params.products,
            &config,
            &params.metadata,
            &params.options,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bandwise_core::Raster;

    fn scene(bands: &[(&str, f64)]) -> Image {
        let planes = bands
            .iter()
            .map(|(n, v)| (*n, Raster::filled(4, 4, *v)))
            .collect();
        Image::from_planes("scene", planes).unwrap()
    }

    fn cfg() -> IndexConfig {
        IndexConfig::default()
    }

    #[test]
    fn test_ndvi_value() {
        let img = scene(&[("red", 0.1), ("nir", 0.25)]);
        let out = ndvi(&img, "ndvi.tif").unwrap();
        assert_eq!(out.band_names(), vec!["ndvi.tif"]);
        let v = out.band(0).unwrap().raster().get(1, 1).unwrap();
        assert_relative_eq!(v, 0.15 / 0.35, epsilon = 1e-12);
    }

    #[test]
    fn test_formulas() {
        let c = cfg();
        assert_relative_eq!(SpectralIndex::Evi.compute(&[0.4, 0.1, 0.05], &c), 2.5 * 0.3 / (0.4 + 0.6 - 0.375 + 1.0), epsilon = 1e-12);
        assert_relative_eq!(SpectralIndex::Ndsi.compute(&[0.1, 0.5], &c), 0.4 / 0.6, epsilon = 1e-12);
        assert_relative_eq!(SpectralIndex::Ndwi.compute(&[0.3, 0.1], &c), 0.5, epsilon = 1e-12);
        assert_relative_eq!(SpectralIndex::Bi.compute(&[0.2, 0.4], &c), 0.3, epsilon = 1e-12);
        assert_relative_eq!(
            SpectralIndex::Satvi.compute(&[0.3, 0.1, 0.2], &c),
            (0.2 / 0.9) * 1.5 - 0.1,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            SpectralIndex::Brgt.compute(&[0.1, 0.2, 0.3, 0.4], &c),
            0.03 + 0.06 + 0.09 + 0.04,
            epsilon = 1e-12
        );
        assert_relative_eq!(SpectralIndex::Vari.compute(&[0.1, 0.3, 0.2], &c), 0.2 / 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_msavi2_matches_closed_form() {
        // For red == 0 the square root collapses to 2*nir - 1 when nir > 0.5
        let v = SpectralIndex::Msavi2.compute(&[0.6, 0.0], &cfg());
        assert_relative_eq!(v, (2.2 - (2.2f64 * 2.2 - 4.8).sqrt()) / 2.0, epsilon = 1e-12);
        assert!(v > 0.0);
    }

    #[test]
    fn test_zero_denominator_is_nodata() {
        let img = scene(&[("red", 0.0), ("nir", 0.0)]);
        let out = ndvi(&img, "ndvi").unwrap();
        let band = out.band(0).unwrap();
        assert_eq!(band.raster().get(0, 0).unwrap(), CONTINUOUS_NODATA);
        assert_eq!(band.nodata(), Some(CONTINUOUS_NODATA));
    }

    #[test]
    fn test_unknown_index_and_missing_band() {
        let img = scene(&[("red", 0.1), ("nir", 0.3)]);
        let mut req = BTreeMap::new();
        req.insert("ndbi".to_string(), "x".to_string());
        let r = indices(&img, &req, &cfg(), &Dictionary::new(), &KernelOptions::default());
        assert!(matches!(r, Err(Error::UnknownAlgorithm(_))));

        let r = evi(&img, "evi");
        assert!(matches!(r, Err(Error::MissingBand { ref band, .. }) if band == "BLUE"));
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let img = scene(&[("red", 0.1), ("nir", 0.3), ("green", 0.2)]);
        let mut req = BTreeMap::new();
        req.insert("ndvi".to_string(), "out".to_string());
        req.insert("ndwi".to_string(), "OUT".to_string());
        assert!(indices(&img, &req, &cfg(), &Dictionary::new(), &KernelOptions::default()).is_err());
    }

    #[test]
    fn test_caller_metadata_merged() {
        let img = scene(&[("red", 0.1), ("nir", 0.3)]);
        let mut params = SpectralIndicesParams::default();
        params.products.insert("ndvi".to_string(), "veg".to_string());
        params.metadata.insert("SCENE_ID".to_string(), "LT05_001".to_string());
        params.metadata.insert("PRODUCTS".to_string(), "custom".to_string());

        let out = SpectralIndices.execute(img, params).unwrap();
        assert_eq!(out.metadata().get("SCENE_ID").map(String::as_str), Some("LT05_001"));
        // Caller entries win over computed ones
        assert_eq!(out.metadata().get("PRODUCTS").map(String::as_str), Some("custom"));
    }

    #[test]
    fn test_config_override() {
        let mut d = Dictionary::new();
        d.insert("satvi_l".into(), "0.0".into());
        let c = IndexConfig::from_dictionary(&d).unwrap();
        assert_eq!(c.satvi_l, 0.0);
        assert_eq!(c.evi_gain, 2.5);
    }

    #[test]
    fn test_nan_nodata_override() {
        let mut d = Dictionary::new();
        d.insert("nodata".into(), "nan".into());
        let c = IndexConfig::from_dictionary(&d).unwrap();
        assert!(c.nodata.is_nan());

        let img = scene(&[("red", 0.0), ("nir", 0.0)]);
        let out = index(&img, SpectralIndex::Ndvi, "n", &c, &KernelOptions::default()).unwrap();
        assert!(out.band(0).unwrap().raster().get(0, 0).unwrap().is_nan());
    }
}
