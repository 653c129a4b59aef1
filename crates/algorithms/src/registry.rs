//! Band registry
//!
//! Static table mapping each algorithm name to the symbolic bands it reads,
//! in the order the algorithm consumes them. Validation resolves those
//! symbols against an image's band names before any pixel is touched.

use bandwise_core::{BandId, Error, Image, Raster, Result};

use BandId::*;

/// What kind of values an algorithm writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Real-valued planes (indices, scores, transformed bands)
    Continuous,
    /// Class codes (cloud masks)
    Categorical,
}

/// Registry entry for one algorithm
#[derive(Debug)]
pub struct AlgorithmDescriptor {
    pub name: &'static str,
    /// Required bands in consumption order
    pub required: &'static [BandId],
    pub output: OutputKind,
    pub description: &'static str,
}

static REGISTRY: &[AlgorithmDescriptor] = &[
    AlgorithmDescriptor {
        name: "acca",
        required: &[Red, Green, Nir, Swir1, Lwir],
        output: OutputKind::Categorical,
        description: "Automated cloud cover assessment",
    },
    AlgorithmDescriptor {
        name: "fmask",
        required: &[Blue, Red, Green, Nir, Swir1, Swir2, Lwir],
        output: OutputKind::Categorical,
        description: "Cloud, shadow, snow and water mask",
    },
    AlgorithmDescriptor {
        name: "ndvi",
        required: &[Nir, Red],
        output: OutputKind::Continuous,
        description: "Normalized difference vegetation index",
    },
    AlgorithmDescriptor {
        name: "evi",
        required: &[Nir, Red, Blue],
        output: OutputKind::Continuous,
        description: "Enhanced vegetation index",
    },
    AlgorithmDescriptor {
        name: "lswi",
        required: &[Nir, Swir1],
        output: OutputKind::Continuous,
        description: "Land surface water index",
    },
    AlgorithmDescriptor {
        name: "ndsi",
        required: &[Swir1, Green],
        output: OutputKind::Continuous,
        description: "Normalized difference snow index",
    },
    AlgorithmDescriptor {
        name: "ndwi",
        required: &[Green, Nir],
        output: OutputKind::Continuous,
        description: "Normalized difference water index",
    },
    AlgorithmDescriptor {
        name: "bi",
        required: &[Blue, Nir],
        output: OutputKind::Continuous,
        description: "Brightness index",
    },
    AlgorithmDescriptor {
        name: "satvi",
        required: &[Swir1, Red, Swir2],
        output: OutputKind::Continuous,
        description: "Soil-adjusted total vegetation index",
    },
    AlgorithmDescriptor {
        name: "msavi2",
        required: &[Nir, Red],
        output: OutputKind::Continuous,
        description: "Modified soil-adjusted vegetation index",
    },
    AlgorithmDescriptor {
        name: "vari",
        required: &[Red, Green, Blue],
        output: OutputKind::Continuous,
        description: "Visible atmospherically resistant index",
    },
    AlgorithmDescriptor {
        name: "brgt",
        required: &[Red, Green, Blue, Nir],
        output: OutputKind::Continuous,
        description: "Weighted brightness",
    },
    AlgorithmDescriptor {
        name: "truecolor",
        required: &[Red, Green, Blue],
        output: OutputKind::Continuous,
        description: "Natural-color composite for browse images",
    },
];

/// Every registered algorithm
pub fn descriptors() -> &'static [AlgorithmDescriptor] {
    REGISTRY
}

/// Registry entry for `name` (case-insensitive)
pub fn descriptor(name: &str) -> Result<&'static AlgorithmDescriptor> {
    let key = name.trim();
    REGISTRY
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(key))
        .ok_or_else(|| Error::UnknownAlgorithm(name.to_string()))
}

/// Required bands of `name`, in consumption order
pub fn lookup(name: &str) -> Result<&'static [BandId]> {
    descriptor(name).map(|d| d.required)
}

/// Resolved positions of required bands inside one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandMapping {
    entries: Vec<(BandId, usize)>,
}

impl BandMapping {
    /// Plane index of `id`, if it was part of the request
    pub fn index(&self, id: BandId) -> Option<usize> {
        self.entries
            .iter()
            .find(|(b, _)| *b == id)
            .map(|(_, i)| *i)
    }

    /// `(band, plane index)` pairs in request order
    pub fn iter(&self) -> impl Iterator<Item = (BandId, usize)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The mapped planes of `image`, in request order
    pub fn planes<'a>(&self, image: &'a Image) -> Vec<&'a Raster<f64>> {
        self.entries
            .iter()
            .filter_map(|(_, i)| image.band(*i))
            .map(|b| b.raster())
            .collect()
    }
}

/// Resolve `required` against `image`.
///
/// Fails with `MissingBand` naming the first required band (in request
/// order) that the image does not provide.
pub fn validate(image: &Image, required: &[BandId]) -> Result<BandMapping> {
    resolve(image, required, "custom")
}

/// Look up `algorithm` and resolve its bands against `image`
pub fn validate_for(image: &Image, algorithm: &str) -> Result<BandMapping> {
    let desc = descriptor(algorithm)?;
    resolve(image, desc.required, desc.name)
}

fn resolve(image: &Image, required: &[BandId], algorithm: &str) -> Result<BandMapping> {
    let mut entries: Vec<(BandId, usize)> = Vec::with_capacity(required.len());
    for &id in required {
        if entries.iter().any(|(b, _)| *b == id) {
            continue;
        }
        let index = image.position(id).ok_or_else(|| Error::MissingBand {
            algorithm: algorithm.to_string(),
            band: id.name().to_string(),
        })?;
        entries.push((id, index));
    }
    Ok(BandMapping { entries })
}

/// Union of several band lists, first occurrence wins the position
pub fn union_of<'a, I>(lists: I) -> Vec<BandId>
where
    I: IntoIterator<Item = &'a [BandId]>,
{
    let mut out: Vec<BandId> = Vec::new();
    for list in lists {
        for &id in list {
            if !out.contains(&id) {
                out.push(id);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(names: &[&str]) -> Image {
        let planes = names
            .iter()
            .map(|n| (*n, Raster::filled(2, 2, 0.1)))
            .collect();
        Image::from_planes("scene", planes).unwrap()
    }

    #[test]
    fn test_lookup_known_and_unknown() {
        assert_eq!(lookup("NDVI").unwrap(), &[Nir, Red]);
        assert_eq!(lookup("fmask").unwrap().len(), 7);
        assert!(matches!(lookup("ndbi"), Err(Error::UnknownAlgorithm(_))));
    }

    #[test]
    fn test_every_entry_has_bands() {
        for d in descriptors() {
            assert!(!d.required.is_empty(), "{} has no bands", d.name);
        }
    }

    #[test]
    fn test_validate_reports_first_missing_band() {
        let img = image(&["red", "green"]);
        match validate_for(&img, "brgt") {
            Err(Error::MissingBand { algorithm, band }) => {
                assert_eq!(algorithm, "brgt");
                assert_eq!(band, "BLUE");
            }
            other => panic!("expected MissingBand, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_maps_by_name_not_position() {
        let img = image(&["swir1", "red", "nir"]);
        let mapping = validate_for(&img, "ndvi").unwrap();
        assert_eq!(mapping.index(Nir), Some(2));
        assert_eq!(mapping.index(Red), Some(1));
        assert_eq!(mapping.iter().map(|(b, _)| b).collect::<Vec<_>>(), vec![Nir, Red]);
    }

    #[test]
    fn test_union_keeps_first_position() {
        let u = union_of([lookup("ndvi").unwrap(), lookup("evi").unwrap()]);
        assert_eq!(u, vec![Nir, Red, Blue]);
    }
}
