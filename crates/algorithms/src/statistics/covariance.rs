//! Spectral covariance
//!
//! Two passes over the image: per-band means, then centered co-moments.
//! Each pass folds valid pixels row by row and merges the row partials
//! sequentially in row order, so the result depends on neither the
//! processing mode nor the block height. A pixel is valid only when every
//! band holds data.

use bandwise_core::{Error, Image, Raster, Result};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::kernel::{reduce, KernelOptions};

/// Per-band means and covariance of the valid pixels of an image
#[derive(Debug, Clone)]
pub struct SpectralStatistics {
    pub mean: DVector<f64>,
    /// Sample covariance (divided by `count - 1`)
    pub covariance: DMatrix<f64>,
    /// Number of valid pixels
    pub count: usize,
}

impl SpectralStatistics {
    pub fn bands(&self) -> usize {
        self.mean.len()
    }
}

/// Covariance matrix of all bands of `image`
pub fn spectral_covariance(image: &Image, options: &KernelOptions) -> Result<DMatrix<f64>> {
    spectral_statistics(image, options).map(|s| s.covariance)
}

/// Means and covariance of all bands of `image`
pub fn spectral_statistics(image: &Image, options: &KernelOptions) -> Result<SpectralStatistics> {
    let planes: Vec<&Raster<f64>> = image.bands().iter().map(|b| b.raster()).collect();
    statistics_of(&planes, options)
}

pub(crate) fn statistics_of(
    planes: &[&Raster<f64>],
    options: &KernelOptions,
) -> Result<SpectralStatistics> {
    let n = planes.len();

    // Pass 1: means
    let sums = reduce(
        planes,
        options,
        || (0usize, vec![0.0f64; n]),
        |acc, s| {
            acc.0 += 1;
            for (t, v) in acc.1.iter_mut().zip(s) {
                *t += v;
            }
        },
    )?;
    let mut count = 0usize;
    let mut total = vec![0.0f64; n];
    for (c, part) in sums {
        count += c;
        for (t, v) in total.iter_mut().zip(part) {
            *t += v;
        }
    }
    if count < 2 {
        return Err(Error::Algorithm(format!(
            "covariance needs at least 2 valid pixels, found {}",
            count
        )));
    }
    let mean: Vec<f64> = total.iter().map(|t| t / count as f64).collect();

    // Pass 2: centered co-moments, upper triangle only
    let moments = reduce(
        planes,
        options,
        || vec![0.0f64; n * n],
        |acc, s| {
            for i in 0..n {
                let di = s[i] - mean[i];
                for j in i..n {
                    acc[i * n + j] += di * (s[j] - mean[j]);
                }
            }
        },
    )?;
    let mut comoment = vec![0.0f64; n * n];
    for part in moments {
        for (t, v) in comoment.iter_mut().zip(part) {
            *t += v;
        }
    }

    let denom = (count - 1) as f64;
    let covariance = DMatrix::from_fn(n, n, |i, j| {
        let (a, b) = if i <= j { (i, j) } else { (j, i) };
        comoment[a * n + b] / denom
    });
    debug!(bands = n, pixels = count, "spectral covariance");

    Ok(SpectralStatistics {
        mean: DVector::from_vec(mean),
        covariance,
        count,
    })
}
