//! Multi-band images: named, co-registered band planes plus metadata

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{Extent, GeoTransform, Raster};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Free-form string map used for image metadata and per-call overrides
pub type Dictionary = BTreeMap<String, String>;

/// Symbolic spectral band identifier, independent of storage order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BandId {
    Blue,
    Green,
    Red,
    Nir,
    Swir1,
    Swir2,
    Lwir,
}

impl BandId {
    pub const ALL: [BandId; 7] = [
        BandId::Blue,
        BandId::Green,
        BandId::Red,
        BandId::Nir,
        BandId::Swir1,
        BandId::Swir2,
        BandId::Lwir,
    ];

    /// Canonical upper-case name (`"NIR"`, `"SWIR1"`, ...)
    pub fn name(&self) -> &'static str {
        match self {
            BandId::Blue => "BLUE",
            BandId::Green => "GREEN",
            BandId::Red => "RED",
            BandId::Nir => "NIR",
            BandId::Swir1 => "SWIR1",
            BandId::Swir2 => "SWIR2",
            BandId::Lwir => "LWIR",
        }
    }
}

impl fmt::Display for BandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BandId {
    type Err = Error;

    /// Case-insensitive parse of the canonical name
    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        BandId::ALL
            .iter()
            .copied()
            .find(|id| id.name() == upper)
            .ok_or_else(|| Error::InvalidParameter {
                name: "band".to_string(),
                value: s.to_string(),
                reason: "not a known band identifier".to_string(),
            })
    }
}

/// One spectral plane of an image
#[derive(Debug, Clone)]
pub struct Band {
    name: String,
    raster: Raster<f64>,
}

impl Band {
    pub fn new(name: impl Into<String>, raster: Raster<f64>) -> Self {
        Self { name: name.into(), raster }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The identifier this band's name resolves to, if any
    pub fn id(&self) -> Option<BandId> {
        self.name.parse().ok()
    }

    pub fn raster(&self) -> &Raster<f64> {
        &self.raster
    }

    pub fn nodata(&self) -> Option<f64> {
        self.raster.nodata()
    }
}

/// An ordered set of co-registered band planes.
///
/// Every band shares the first band's shape, transform and CRS; this is
/// checked once at construction so algorithms can assume it.
#[derive(Debug, Clone)]
pub struct Image {
    name: String,
    bands: Vec<Band>,
    metadata: Dictionary,
}

impl Image {
    /// Build an image, failing if bands are absent, duplicated or not co-registered
    pub fn new(name: impl Into<String>, bands: Vec<Band>) -> Result<Self> {
        let first = bands.first().ok_or_else(|| Error::InvalidParameter {
            name: "bands".to_string(),
            value: "0".to_string(),
            reason: "an image needs at least one band".to_string(),
        })?;

        for (i, band) in bands.iter().enumerate().skip(1) {
            first.raster.ensure_co_registered(&band.raster, &band.name)?;
            if bands[..i].iter().any(|b| b.name.eq_ignore_ascii_case(&band.name)) {
                return Err(Error::InvalidParameter {
                    name: "bands".to_string(),
                    value: band.name.clone(),
                    reason: "duplicate band name".to_string(),
                });
            }
        }

        Ok(Self {
            name: name.into(),
            bands,
            metadata: Dictionary::new(),
        })
    }

    /// Convenience constructor from `(name, plane)` pairs
    pub fn from_planes<S: Into<String>>(
        name: impl Into<String>,
        planes: Vec<(S, Raster<f64>)>,
    ) -> Result<Self> {
        let bands = planes
            .into_iter()
            .map(|(n, r)| Band::new(n, r))
            .collect();
        Self::new(name, bands)
    }

    /// Output target the image is persisted under
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band(&self, index: usize) -> Option<&Band> {
        self.bands.get(index)
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(Band::name).collect()
    }

    /// Plane index of the band whose name resolves to `id`
    pub fn position(&self, id: BandId) -> Option<usize> {
        self.bands.iter().position(|b| b.id() == Some(id))
    }

    /// The first band, which defines the image grid
    pub fn grid(&self) -> &Raster<f64> {
        &self.bands[0].raster
    }

    pub fn shape(&self) -> (usize, usize) {
        self.grid().shape()
    }

    pub fn transform(&self) -> &GeoTransform {
        self.grid().transform()
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.grid().crs()
    }

    pub fn extent(&self) -> Extent {
        self.grid().extent()
    }

    pub fn metadata(&self) -> &Dictionary {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Dictionary {
        &mut self.metadata
    }

    /// Merge `extra` into the metadata; existing keys are overwritten
    pub fn with_metadata(mut self, extra: &Dictionary) -> Self {
        self.metadata
            .extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn into_bands(self) -> Vec<Band> {
        self.bands
    }
}
