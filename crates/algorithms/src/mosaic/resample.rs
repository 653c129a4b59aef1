//! Point sampling of a source plane at fractional pixel positions.
//!
//! Positions are in pixel units with the corner convention of
//! `GeoTransform::geo_to_pixel`: the center of pixel `(r, c)` sits at
//! `(c + 0.5, r + 0.5)`. Nodata neighbors are left out of the weighted
//! kernels and the remaining weights renormalized.

use bandwise_core::{Error, Raster, RasterElement, Result};

/// Resampling method for the compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Nearest,
    Bilinear,
    /// Catmull-Rom cubic convolution over 4x4 neighbors
    Cubic,
}

impl Interpolation {
    /// Decode the numeric interpolation code (0 nearest, 1 bilinear, 2 cubic)
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Interpolation::Nearest),
            1 => Ok(Interpolation::Bilinear),
            2 => Ok(Interpolation::Cubic),
            other => Err(Error::InvalidParameter {
                name: "interpolation".to_string(),
                value: other.to_string(),
                reason: "expected 0 (nearest), 1 (bilinear) or 2 (cubic)".to_string(),
            }),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Interpolation::Nearest => 0,
            Interpolation::Bilinear => 1,
            Interpolation::Cubic => 2,
        }
    }

    /// Value of `plane` at fractional pixel position `(x, y)`, `None` if
    /// outside the plane or no usable neighbor holds data
    pub fn sample(self, plane: &Raster<f64>, x: f64, y: f64) -> Option<f64> {
        let (rows, cols) = plane.shape();
        if !(x >= 0.0 && y >= 0.0 && x < cols as f64 && y < rows as f64) {
            return None;
        }
        match self {
            Interpolation::Nearest => valid_at(plane, y.floor() as isize, x.floor() as isize),
            Interpolation::Bilinear => bilinear(plane, x - 0.5, y - 0.5),
            Interpolation::Cubic => cubic(plane, x - 0.5, y - 0.5),
        }
    }
}

/// Sample at `(row, col)` clamped to the grid, `None` if nodata
fn valid_at(plane: &Raster<f64>, row: isize, col: isize) -> Option<f64> {
    let (rows, cols) = plane.shape();
    let r = row.clamp(0, rows as isize - 1) as usize;
    let c = col.clamp(0, cols as isize - 1) as usize;
    let v = unsafe { plane.get_unchecked(r, c) };
    if v.is_nodata(plane.nodata()) {
        None
    } else {
        Some(v)
    }
}

fn weighted<const N: usize>(
    plane: &Raster<f64>,
    row0: isize,
    col0: isize,
    wy: [f64; N],
    wx: [f64; N],
) -> Option<f64> {
    let mut sum = 0.0;
    let mut weight = 0.0;
    for (j, &wj) in wy.iter().enumerate() {
        for (i, &wi) in wx.iter().enumerate() {
            let w = wj * wi;
            if w == 0.0 {
                continue;
            }
            if let Some(v) = valid_at(plane, row0 + j as isize, col0 + i as isize) {
                sum += w * v;
                weight += w;
            }
        }
    }
    if weight.abs() < 1e-12 {
        None
    } else {
        Some(sum / weight)
    }
}

fn bilinear(plane: &Raster<f64>, x: f64, y: f64) -> Option<f64> {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    weighted(
        plane,
        y0 as isize,
        x0 as isize,
        [1.0 - fy, fy],
        [1.0 - fx, fx],
    )
}

/// Catmull-Rom weights for the four taps around `t` in `[0, 1)`
fn catmull_rom(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        -0.5 * t3 + t2 - 0.5 * t,
        1.5 * t3 - 2.5 * t2 + 1.0,
        -1.5 * t3 + 2.0 * t2 + 0.5 * t,
        0.5 * t3 - 0.5 * t2,
    ]
}

fn cubic(plane: &Raster<f64>, x: f64, y: f64) -> Option<f64> {
    let x0 = x.floor();
    let y0 = y.floor();
    weighted(
        plane,
        y0 as isize - 1,
        x0 as isize - 1,
        catmull_rom(y - y0),
        catmull_rom(x - x0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp() -> Raster<f64> {
        // value = col
        Raster::from_vec((0..16).map(|i| (i % 4) as f64).collect(), 4, 4).unwrap()
    }

    #[test]
    fn test_codes() {
        assert_eq!(Interpolation::from_code(2).unwrap(), Interpolation::Cubic);
        assert!(Interpolation::from_code(7).is_err());
        assert_eq!(Interpolation::Bilinear.code(), 1);
    }

    #[test]
    fn test_nearest_picks_containing_pixel() {
        let r = ramp();
        assert_eq!(Interpolation::Nearest.sample(&r, 2.9, 0.1), Some(2.0));
        assert_eq!(Interpolation::Nearest.sample(&r, 4.0, 0.1), None);
        assert_eq!(Interpolation::Nearest.sample(&r, -0.1, 0.1), None);
    }

    #[test]
    fn test_pixel_centers_are_exact() {
        let r = ramp();
        for method in [Interpolation::Bilinear, Interpolation::Cubic] {
            let v = method.sample(&r, 2.5, 1.5).unwrap();
            assert_relative_eq!(v, 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_linear_ramp_reproduced() {
        let r = ramp();
        assert_relative_eq!(Interpolation::Bilinear.sample(&r, 2.0, 2.0).unwrap(), 1.5, epsilon = 1e-12);
        assert_relative_eq!(Interpolation::Cubic.sample(&r, 2.0, 2.0).unwrap(), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_nodata_neighbors_skipped() {
        let mut r = ramp();
        r.set_nodata(Some(-1.0));
        r.set(1, 1, -1.0).unwrap();
        let v = Interpolation::Bilinear.sample(&r, 1.5, 1.0).unwrap();
        assert!(v.is_finite());
        assert_eq!(Interpolation::Nearest.sample(&r, 1.5, 1.5), None);
    }
}
