//! # Bandwise Core
//!
//! Core types and traits for the bandwise multi-band raster engine.
//!
//! This crate provides:
//! - `Raster<T>`: generic georeferenced grid (one band plane)
//! - `Image`: named, co-registered band planes with metadata
//! - `BandId`: symbolic spectral band identifiers
//! - `Feature`: polygon footprint used by the mosaic compositor
//! - `GeoTransform`, `Extent`, `CRS`: georeferencing
//! - `ImageSink`: hand-off point to the persistence collaborator

pub mod crs;
pub mod error;
pub mod image;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use image::{Band, BandId, Dictionary, Image};
pub use raster::{Extent, GeoTransform, Raster, RasterElement};
pub use vector::Feature;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::image::{Band, BandId, Dictionary, Image};
    pub use crate::io::ImageSink;
    pub use crate::raster::{Extent, GeoTransform, Raster, RasterElement};
    pub use crate::vector::Feature;
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in bandwise.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    type Input;
    type Output;
    type Params: Default;
    type Error: std::error::Error;

    /// Registry name of the algorithm (`"ndvi"`, `"acca"`, ...)
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
