//! Imagery algorithms
//!
//! - Spectral indices: NDVI, EVI, LSWI, NDSI, NDWI, BI, SATVI, MSAVI2, VARI, BRGT
//! - Linear band transforms
//! - Browse image rendering

pub mod browse;
pub mod indices;
pub mod linear_transform;

pub use browse::{browse_image, BrowseFormat, DEFAULT_QUALITY};
pub use indices::{
    evi, index, indices, ndvi, normalized_difference, IndexConfig, SpectralIndex,
    SpectralIndices, SpectralIndicesParams,
};
pub use linear_transform::{
    linear_transform, linear_transform_named, LinearTransform, LinearTransformParams,
};
