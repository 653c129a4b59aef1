//! Footprint features used to clip mosaics

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::Extent;
use geo::{BoundingRect, Intersects};
use geo_types::{Geometry, MultiPolygon, Point};

/// A polygonal footprint with its coordinate reference.
///
/// Only polygon and multipolygon geometries are accepted; anything else
/// has no area to clip against.
#[derive(Debug, Clone)]
pub struct Feature {
    geometry: MultiPolygon<f64>,
    crs: Option<CRS>,
}

impl Feature {
    pub fn new(geometry: impl Into<Geometry<f64>>, crs: Option<CRS>) -> Result<Self> {
        let geometry = match geometry.into() {
            Geometry::Polygon(p) => MultiPolygon(vec![p]),
            Geometry::MultiPolygon(mp) => mp,
            other => {
                return Err(Error::InvalidParameter {
                    name: "footprint".to_string(),
                    value: geometry_kind(&other).to_string(),
                    reason: "footprint must be a polygon or multipolygon".to_string(),
                })
            }
        };

        Ok(Self {
            geometry,
            crs,
        })
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Bounding box of the footprint, `None` for an empty geometry
    pub fn extent(&self) -> Option<Extent> {
        self.geometry
            .bounding_rect()
            .map(|r| Extent::new(r.min().x, r.min().y, r.max().x, r.max().y))
    }

    /// Point-in-polygon test; points on the boundary count as inside
    pub fn covers(&self, x: f64, y: f64) -> bool {
        self.geometry.intersects(&Point::new(x, y))
    }
}

fn geometry_kind(geom: &Geometry<f64>) -> &'static str {
    match geom {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => "Polygon",
    }
}
