//! Georeferenced 2-D sample grid

use crate::crs::{same_frame, CRS};
use crate::error::{Error, Result};
use crate::raster::{Extent, GeoTransform, RasterElement};
use ndarray::Array2;

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in row-major order together with
/// the affine transform, CRS and nodata sentinel of the plane.
///
/// # Example
///
/// ```ignore
/// use bandwise_core::Raster;
///
/// let mut red: Raster<f64> = Raster::new(100, 100);
/// red.set_nodata(Some(-9999.0));
/// red.set(10, 20, 0.12)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major samples
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Build a raster on the same grid (transform + CRS) from row-major samples
    pub fn on_grid_of<U: RasterElement>(
        template: &Raster<U>,
        data: Vec<T>,
        nodata: Option<T>,
    ) -> Result<Self> {
        let (rows, cols) = template.shape();
        let mut raster = Self::from_vec(data, rows, cols)?;
        raster.transform = template.transform;
        raster.crs = template.crs.clone();
        raster.nodata = nodata;
        Ok(raster)
    }

    /// Convert every sample to another element type, keeping the grid.
    ///
    /// Nodata samples map to `nodata` (or the target type's default sentinel).
    pub fn convert<U: RasterElement>(&self, nodata: Option<U>) -> Raster<U> {
        let fill = nodata.unwrap_or_else(U::default_nodata);
        let src_nodata = self.nodata;
        let data = self.data.mapv(|v| {
            if v.is_nodata(src_nodata) {
                fill
            } else {
                U::from_f64(v.as_f64())
            }
        });
        Raster {
            data,
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: Some(fill),
        }
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Geographic extent of the grid
    pub fn extent(&self) -> Extent {
        self.transform.extent(self.cols(), self.rows())
    }

    /// Geographic coordinates of a pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Fractional pixel coordinates of a geographic point
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Fail unless `other` sits on exactly the same grid: shape, transform and CRS.
    ///
    /// `label` names `other` in the error.
    pub fn ensure_co_registered<U: RasterElement>(&self, other: &Raster<U>, label: &str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::NotCoRegistered {
                band: label.to_string(),
                reason: format!(
                    "shape {:?} differs from {:?}",
                    other.shape(),
                    self.shape()
                ),
            });
        }
        if !self.transform.approx_eq(other.transform()) {
            return Err(Error::NotCoRegistered {
                band: label.to_string(),
                reason: "geotransform differs".to_string(),
            });
        }
        if !same_frame(self.crs(), other.crs()) {
            return Err(Error::NotCoRegistered {
                band: label.to_string(),
                reason: format!(
                    "CRS {} differs from {}",
                    crs_label(other.crs()),
                    crs_label(self.crs())
                ),
            });
        }
        Ok(())
    }
}

fn crs_label(crs: Option<&CRS>) -> String {
    crs.map_or_else(|| "Unknown".to_string(), CRS::identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f64> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<f64> = Raster::new(10, 10);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.get(10, 0).is_err());
    }

    #[test]
    fn test_convert_maps_nodata() {
        let mut raster: Raster<f64> = Raster::filled(2, 2, 3.6);
        raster.set_nodata(Some(-1.0));
        raster.set(0, 0, -1.0).unwrap();

        let bytes = raster.convert::<u8>(Some(255));
        assert_eq!(bytes.get(0, 0).unwrap(), 255);
        assert_eq!(bytes.get(1, 1).unwrap(), 4);
        assert_eq!(bytes.nodata(), Some(255));
    }

    #[test]
    fn test_co_registration() {
        let a: Raster<f64> = Raster::new(4, 4);
        let mut b: Raster<f64> = Raster::new(4, 4);
        assert!(a.ensure_co_registered(&b, "b").is_ok());

        b.set_transform(GeoTransform::new(10.0, 0.0, 1.0, -1.0));
        assert!(matches!(
            a.ensure_co_registered(&b, "b"),
            Err(Error::NotCoRegistered { .. })
        ));

        let c: Raster<f64> = Raster::new(4, 5);
        assert!(a.ensure_co_registered(&c, "c").is_err());

        let mut d: Raster<f64> = Raster::new(4, 4);
        d.set_crs(Some(CRS::from_epsg(32633)));
        assert!(a.ensure_co_registered(&d, "d").is_err());
    }
}
