//! # Bandwise Algorithms
//!
//! Whole-image algorithms over multi-band rasters.
//!
//! ## Available Algorithm Categories
//!
//! - **registry**: required bands per algorithm and their validation
//! - **kernel**: block-parallel per-pixel evaluation shared by every algorithm
//! - **masking**: ACCA and Fmask cloud masks
//! - **imagery**: spectral indices, linear transforms, browse images
//! - **statistics**: spectral covariance, RX anomaly detector
//! - **mosaic**: cookie-cutter compositing with resampling

pub mod config;
pub mod imagery;
pub mod kernel;
pub mod masking;
pub mod mosaic;
pub mod registry;
pub mod statistics;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        browse_image, evi, index, indices, linear_transform, ndvi, BrowseFormat, IndexConfig,
        LinearTransform, LinearTransformParams, SpectralIndex, SpectralIndices,
        SpectralIndicesParams,
    };
    pub use crate::kernel::{
        evaluate, pixel_fn, KernelOptions, PixelKernel, CONTINUOUS_NODATA, MASK_NODATA,
    };
    pub use crate::masking::{
        acca, fmask, Acca, AccaClass, AccaConfig, AccaParams, Fmask, FmaskClass, FmaskConfig,
        FmaskParams,
    };
    pub use crate::mosaic::{cookie_cutter, CookieCutterParams, Interpolation};
    pub use crate::registry::{lookup, validate, validate_for, AlgorithmDescriptor, OutputKind};
    pub use crate::statistics::{rxd, spectral_covariance, Rxd, RxdParams, SpectralStatistics};
    pub use bandwise_core::prelude::*;
    pub use bandwise_parallel::{CancelToken, ProcessingMode};
}
