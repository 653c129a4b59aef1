//! Reed-Xiaoli anomaly detector
//!
//! Scores every pixel by its squared Mahalanobis distance from the scene
//! mean, `(x - μ)ᵀ Σ⁻¹ (x - μ)`, using the covariance of all valid pixels.

use bandwise_core::{Algorithm, Dictionary, Error, Image, Raster, Result};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use tracing::{info, warn};

use crate::kernel::{evaluate, pixel_fn, KernelOptions, CONTINUOUS_NODATA};
use crate::statistics::covariance::{statistics_of, SpectralStatistics};

/// Eigenvalues below `largest * RANK_TOLERANCE` count as zero
pub const RANK_TOLERANCE: f64 = 1e-12;

/// Inverse of a symmetric positive-definite covariance.
///
/// Fails with `SingularCovariance` when the matrix is rank-deficient.
pub fn inverse_covariance(covariance: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = covariance.nrows();
    let eigen = SymmetricEigen::new(covariance.clone());
    let largest = eigen
        .eigenvalues
        .iter()
        .fold(0.0f64, |m, v| m.max(v.abs()));
    let cutoff = largest * RANK_TOLERANCE;
    let rank = eigen.eigenvalues.iter().filter(|&&v| v > cutoff).count();
    if largest == 0.0 || rank < n {
        return Err(Error::SingularCovariance { rank, bands: n });
    }

    let inv_diag = DMatrix::from_diagonal(&eigen.eigenvalues.map(|v| 1.0 / v));
    Ok(&eigen.eigenvectors * inv_diag * eigen.eigenvectors.transpose())
}

/// RX scores from precomputed statistics
pub fn rx_scores(
    image: &Image,
    stats: &SpectralStatistics,
    options: &KernelOptions,
) -> Result<Raster<f64>> {
    if stats.bands() != image.band_count() {
        return Err(Error::DimensionMismatch {
            expected: image.band_count(),
            actual: stats.bands(),
        });
    }
    let inverse = inverse_covariance(&stats.covariance)?;
    let mean = &stats.mean;
    let n = mean.len();

    let planes: Vec<&Raster<f64>> = image.bands().iter().map(|b| b.raster()).collect();
    let kernel = pixel_fn(1, |s, out| {
        let d = DVector::from_iterator(n, s.iter().zip(mean.iter()).map(|(x, m)| x - m));
        out[0] = d.dot(&(&inverse * &d));
    });
    let mut outputs = evaluate(&planes, &kernel, CONTINUOUS_NODATA, options)?;
    outputs
        .pop()
        .ok_or_else(|| Error::Algorithm("RX pass produced no plane".to_string()))
}

/// Anomaly score image with one band named `rxd`, carrying `metadata`
pub fn rxd(
    image: &Image,
    output: &str,
    metadata: &Dictionary,
    options: &KernelOptions,
) -> Result<Image> {
    let planes: Vec<&Raster<f64>> = image.bands().iter().map(|b| b.raster()).collect();
    let stats = statistics_of(&planes, options)?;
    info!(
        image = image.name(),
        bands = stats.bands(),
        pixels = stats.count,
        "RX detector"
    );
    if stats.bands() == 1 {
        warn!("RX on a single band reduces to a squared z-score");
    }
    let scores = rx_scores(image, &stats, options)?;
    Ok(Image::from_planes(output, vec![("rxd", scores)])?.with_metadata(metadata))
}

/// Parameters for [`Rxd`]
#[derive(Debug, Clone)]
pub struct RxdParams {
    pub output: String,
    /// Merged into the output metadata
    pub metadata: Dictionary,
    pub options: KernelOptions,
}

impl Default for RxdParams {
    fn default() -> Self {
        Self {
            output: "rxd".to_string(),
            metadata: Dictionary::new(),
            options: KernelOptions::default(),
        }
    }
}

/// RX detector as an [`Algorithm`]
#[derive(Debug, Clone, Default)]
pub struct Rxd;

impl Algorithm for Rxd {
    type Input = Image;
    type Output = Image;
    type Params = RxdParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "rxd"
    }

    fn description(&self) -> &'static str {
        "Reed-Xiaoli anomaly detector"
    }

    fn execute(&self, input: Image, params: RxdParams) -> Result<Image> {
        rxd(&input, &params.output, &params.metadata, &params.options)
    }
}
