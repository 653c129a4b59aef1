//! Coordinate reference system identity
//!
//! The engine never reprojects: a CRS is only compared, to decide whether two
//! grids (or a grid and a footprint) are registered to the same frame.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    wkt: Option<String>,
    epsg: Option<u32>,
}

impl CRS {
    pub fn from_epsg(code: u32) -> Self {
        Self { wkt: None, epsg: Some(code) }
    }

    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self { wkt: Some(wkt.into()), epsg: None }
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether both describe the same frame.
    ///
    /// EPSG codes win when both sides have one; otherwise WKT text is compared
    /// after whitespace normalisation.
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return normalize_wkt(a) == normalize_wkt(b);
        }
        false
    }

    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            let head: String = wkt.chars().take(50).collect();
            return format!("WKT:{}", head);
        }
        "Unknown".to_string()
    }
}

fn normalize_wkt(wkt: &str) -> String {
    wkt.split_whitespace().collect::<Vec<_>>().join("")
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Whether two optional CRS values describe the same frame.
///
/// Two unknown CRS are treated as registered (synthetic or local grids);
/// a known CRS never matches an unknown one.
pub fn same_frame(a: Option<&CRS>, b: Option<&CRS>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.is_equivalent(b),
        _ => false,
    }
}
