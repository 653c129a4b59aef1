//! Raster algebra kernel
//!
//! Every per-pixel algorithm runs through [`evaluate`]: input planes are
//! read block by block, a pixel function is applied to each pixel whose
//! inputs are all valid, and one or more output planes are assembled on the
//! input grid. Scene-wide statistics use [`reduce`], which folds valid
//! pixels per row and hands the partials back in row order for a single
//! sequential merge.

use bandwise_core::{Error, Raster, RasterElement, Result};
use bandwise_parallel::{
    CancelToken, ParallelStrategy, ProcessingMode, RowBlock, RowBlocks, DEFAULT_BLOCK_ROWS,
};
use tracing::debug;

/// Nodata written to continuous outputs
pub const CONTINUOUS_NODATA: f64 = -32768.0;

/// Nodata written to categorical (mask) outputs
pub const MASK_NODATA: u8 = 255;

/// A pixel function over one sample per input plane
pub trait PixelKernel: Sync {
    type Output: RasterElement;

    /// Number of output planes written per pixel
    fn outputs(&self) -> usize;

    /// Compute the outputs of one pixel.
    ///
    /// `samples` holds one valid value per input plane, in plane order.
    /// Non-finite results are stored as the output nodata.
    fn apply(&self, samples: &[f64], out: &mut [Self::Output]);
}

/// Closure-backed kernel with real-valued outputs
pub struct FnKernel<F> {
    outputs: usize,
    f: F,
}

impl<F> PixelKernel for FnKernel<F>
where
    F: Fn(&[f64], &mut [f64]) + Sync,
{
    type Output = f64;

    fn outputs(&self) -> usize {
        self.outputs
    }

    fn apply(&self, samples: &[f64], out: &mut [f64]) {
        (self.f)(samples, out)
    }
}

/// Wrap a closure writing `outputs` values per pixel
pub fn pixel_fn<F>(outputs: usize, f: F) -> FnKernel<F>
where
    F: Fn(&[f64], &mut [f64]) + Sync,
{
    FnKernel { outputs, f }
}

/// Execution options shared by every pass
#[derive(Debug, Clone)]
pub struct KernelOptions {
    /// Rows per block
    pub block_rows: usize,
    pub mode: ProcessingMode,
    /// Checked between blocks
    pub cancel: Option<CancelToken>,
}

impl Default for KernelOptions {
    fn default() -> Self {
        Self {
            block_rows: DEFAULT_BLOCK_ROWS,
            mode: ProcessingMode::default(),
            cancel: None,
        }
    }
}

impl KernelOptions {
    pub fn sequential() -> Self {
        Self {
            mode: ProcessingMode::Sequential,
            ..Self::default()
        }
    }

    pub fn with_block_rows(mut self, block_rows: usize) -> Self {
        self.block_rows = block_rows;
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// `Err(Cancelled)` once the token has been tripped
    pub fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Fail unless every plane sits on the grid of the first one
pub fn ensure_planes(planes: &[&Raster<f64>]) -> Result<()> {
    let first = planes.first().ok_or_else(|| Error::InvalidParameter {
        name: "planes".to_string(),
        value: "0".to_string(),
        reason: "at least one input plane is required".to_string(),
    })?;
    for (i, plane) in planes.iter().enumerate().skip(1) {
        first.ensure_co_registered(plane, &format!("plane {}", i))?;
    }
    Ok(())
}

/// Apply `kernel` to every pixel of `planes`.
///
/// A pixel where any input is nodata gets `nodata` in every output plane.
/// Outputs share the grid of the first input plane.
pub fn evaluate<K: PixelKernel>(
    planes: &[&Raster<f64>],
    kernel: &K,
    nodata: K::Output,
    options: &KernelOptions,
) -> Result<Vec<Raster<K::Output>>> {
    ensure_planes(planes)?;
    let n_out = kernel.outputs();
    if n_out == 0 {
        return Err(Error::InvalidParameter {
            name: "outputs".to_string(),
            value: "0".to_string(),
            reason: "a kernel must write at least one plane".to_string(),
        });
    }

    let (rows, cols) = planes[0].shape();
    let plan = RowBlocks::new(rows, options.block_rows);
    debug!(
        planes = planes.len(),
        outputs = n_out,
        blocks = plan.count(),
        "kernel pass"
    );

    let blocks = options.mode.try_par_map(0..plan.count(), |i| -> Result<Vec<Vec<K::Output>>> {
        options.check_cancelled()?;
        let block = plan.get(i).ok_or(Error::IndexOutOfBounds {
            row: i * plan.block_rows(),
            col: 0,
            rows,
            cols,
        })?;
        Ok(eval_block(planes, kernel, nodata, block, cols))
    })?;

    let mut outputs: Vec<Vec<K::Output>> = (0..n_out)
        .map(|_| Vec::with_capacity(rows * cols))
        .collect();
    for block in blocks {
        for (out, part) in outputs.iter_mut().zip(block) {
            out.extend(part);
        }
    }

    outputs
        .into_iter()
        .map(|data| Raster::on_grid_of(planes[0], data, Some(nodata)))
        .collect()
}

fn eval_block<K: PixelKernel>(
    planes: &[&Raster<f64>],
    kernel: &K,
    nodata: K::Output,
    block: RowBlock,
    cols: usize,
) -> Vec<Vec<K::Output>> {
    let n_out = kernel.outputs();
    let mut out: Vec<Vec<K::Output>> = (0..n_out).map(|_| vec![nodata; block.len(cols)]).collect();
    let nodatas: Vec<Option<f64>> = planes.iter().map(|p| p.nodata()).collect();
    let mut samples = vec![0.0; planes.len()];
    let mut pixel = vec![nodata; n_out];

    for row in block.row_offset..block.row_end() {
        let base = (row - block.row_offset) * cols;
        'pixel: for col in 0..cols {
            for (p, plane) in planes.iter().enumerate() {
                let v = unsafe { plane.get_unchecked(row, col) };
                if v.is_nodata(nodatas[p]) {
                    continue 'pixel;
                }
                samples[p] = v;
            }

            pixel.fill(nodata);
            kernel.apply(&samples, &mut pixel);
            for (o, &v) in pixel.iter().enumerate() {
                if v.as_f64().is_finite() {
                    out[o][base + col] = v;
                }
            }
        }
    }
    out
}

/// Fold every valid pixel of `planes` into one accumulator per row.
///
/// A pixel is valid when no plane holds nodata there. Partials come back in
/// row order whatever the block height; the caller merges them.
pub fn reduce<A, I, F>(
    planes: &[&Raster<f64>],
    options: &KernelOptions,
    init: I,
    fold: F,
) -> Result<Vec<A>>
where
    A: Send,
    I: Fn() -> A + Sync + Send,
    F: Fn(&mut A, &[f64]) + Sync + Send,
{
    ensure_planes(planes)?;
    let (rows, cols) = planes[0].shape();
    let plan = RowBlocks::new(rows, options.block_rows);
    let nodatas: Vec<Option<f64>> = planes.iter().map(|p| p.nodata()).collect();

    let blocks = options.mode.try_par_map(0..plan.count(), |i| -> Result<Vec<A>> {
        options.check_cancelled()?;
        let Some(block) = plan.get(i) else {
            return Ok(Vec::new());
        };
        let mut partials = Vec::with_capacity(block.row_end() - block.row_offset);
        let mut samples = vec![0.0; planes.len()];
        for row in block.row_offset..block.row_end() {
            let mut acc = init();
            'pixel: for col in 0..cols {
                for (p, plane) in planes.iter().enumerate() {
                    let v = unsafe { plane.get_unchecked(row, col) };
                    if v.is_nodata(nodatas[p]) {
                        continue 'pixel;
                    }
                    samples[p] = v;
                }
                fold(&mut acc, &samples);
            }
            partials.push(acc);
        }
        Ok(partials)
    })?;
    Ok(blocks.into_iter().flatten().collect())
}
