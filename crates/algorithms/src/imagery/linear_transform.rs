//! Linear band transform
//!
//! Each output band is a weighted sum of all input bands:
//! `out[o] = Σ_i weights[(o, i)] * band[i]`. Tasseled-cap and
//! principal-component projections are both instances.

use bandwise_core::{Algorithm, Dictionary, Error, Image, Result};
use nalgebra::DMatrix;
use tracing::info;

use crate::kernel::{evaluate, pixel_fn, KernelOptions, CONTINUOUS_NODATA};

/// Parameters for [`LinearTransform`]
#[derive(Debug, Clone)]
pub struct LinearTransformParams {
    /// One row per output band, one column per input band
    pub weights: DMatrix<f64>,
    /// Output band names; `None` names them `component_1`, `component_2`, ...
    pub band_names: Option<Vec<String>>,
    pub output: String,
    /// Merged into the output metadata
    pub metadata: Dictionary,
    pub options: KernelOptions,
}

impl Default for LinearTransformParams {
    fn default() -> Self {
        Self {
            weights: DMatrix::identity(1, 1),
            band_names: None,
            output: "transform".to_string(),
            metadata: Dictionary::new(),
            options: KernelOptions::default(),
        }
    }
}

/// Apply `weights` to every pixel of `image`.
///
/// Fails with `DimensionMismatch` when the matrix has a column count other
/// than the image's band count. `metadata` is merged into the output.
pub fn linear_transform(
    image: &Image,
    weights: &DMatrix<f64>,
    output: &str,
    metadata: &Dictionary,
    options: &KernelOptions,
) -> Result<Image> {
    let names = (1..=weights.nrows())
        .map(|i| format!("component_{}", i))
        .collect();
    linear_transform_named(image, weights, names, output, metadata, options)
}

/// [`linear_transform`] with caller-chosen output band names
pub fn linear_transform_named(
    image: &Image,
    weights: &DMatrix<f64>,
    band_names: Vec<String>,
    output: &str,
    metadata: &Dictionary,
    options: &KernelOptions,
) -> Result<Image> {
    let n_in = image.band_count();
    if weights.ncols() != n_in {
        return Err(Error::DimensionMismatch {
            expected: n_in,
            actual: weights.ncols(),
        });
    }
    if weights.nrows() == 0 || band_names.len() != weights.nrows() {
        return Err(Error::DimensionMismatch {
            expected: weights.nrows(),
            actual: band_names.len(),
        });
    }

    let planes: Vec<_> = image.bands().iter().map(|b| b.raster()).collect();
    let kernel = pixel_fn(weights.nrows(), |s, out| {
        for (o, value) in out.iter_mut().enumerate() {
            *value = weights
                .row(o)
                .iter()
                .zip(s)
                .map(|(w, x)| w * x)
                .sum();
        }
    });

    info!(
        image = image.name(),
        inputs = n_in,
        outputs = weights.nrows(),
        "linear transform"
    );
    let outputs = evaluate(&planes, &kernel, CONTINUOUS_NODATA, options)?;
    Ok(
        Image::from_planes(output, band_names.into_iter().zip(outputs).collect())?
            .with_metadata(metadata),
    )
}

/// Linear transform as an [`Algorithm`]
#[derive(Debug, Clone, Default)]
pub struct LinearTransform;

impl Algorithm for LinearTransform {
    type Input = Image;
    type Output = Image;
    type Params = LinearTransformParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "linear_transform"
    }

    fn description(&self) -> &'static str {
        "Weighted sums of input bands"
    }

    fn execute(&self, input: Image, params: LinearTransformParams) -> Result<Image> {
        match params.band_names {
            Some(names) => linear_transform_named(
                &input,
                &params.weights,
                names,
                &params.output,
                &params.metadata,
                &params.options,
            ),
            None => linear_transform(
                &input,
                &params.weights,
                &params.output,
                &params.metadata,
                &params.options,
            ),
        }
    }
}
