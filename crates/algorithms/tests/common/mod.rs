//! Synthetic scenes shared by the integration tests

#![allow(dead_code)]

use bandwise_core::{GeoTransform, Image, Raster};

pub const SIZE: usize = 40;

/// Route `tracing` output to the test harness; `RUST_LOG` picks the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Reflectance of BLUE, GREEN, RED, NIR, SWIR1, SWIR2 and brightness temperature (K)
#[derive(Debug, Clone, Copy)]
pub struct Surface {
    pub blue: f64,
    pub green: f64,
    pub red: f64,
    pub nir: f64,
    pub swir1: f64,
    pub swir2: f64,
    pub bt: f64,
}

pub const VEGETATION: Surface = Surface { blue: 0.04, green: 0.07, red: 0.05, nir: 0.35, swir1: 0.18, swir2: 0.09, bt: 295.0 };
pub const CLOUD: Surface = Surface { blue: 0.45, green: 0.44, red: 0.42, nir: 0.46, swir1: 0.40, swir2: 0.30, bt: 265.0 };
pub const WATER: Surface = Surface { blue: 0.06, green: 0.05, red: 0.04, nir: 0.03, swir1: 0.01, swir2: 0.005, bt: 290.0 };
pub const SHADOW: Surface = Surface { blue: 0.03, green: 0.04, red: 0.03, nir: 0.12, swir1: 0.08, swir2: 0.04, bt: 293.0 };
pub const SNOW: Surface = Surface { blue: 0.8, green: 0.8, red: 0.75, nir: 0.7, swir1: 0.05, swir2: 0.05, bt: 265.0 };

/// Which surface covers `(row, col)` in the reference scene
pub fn surface_at(row: usize, col: usize) -> Surface {
    match (row, col) {
        (10..=19, 10..=19) => CLOUD,
        (35, 30..=31) => CLOUD,
        (21..=24, 12..=17) => SHADOW,
        (30..=37, 2..=9) => WATER,
        (2..=5, 30..=35) => SNOW,
        _ => VEGETATION,
    }
}

pub fn grid() -> GeoTransform {
    GeoTransform::new(500_000.0, 4_200_000.0, 30.0, -30.0)
}

fn plane(f: impl Fn(Surface) -> f64) -> Raster<f64> {
    let mut data = Vec::with_capacity(SIZE * SIZE);
    for row in 0..SIZE {
        for col in 0..SIZE {
            data.push(f(surface_at(row, col)));
        }
    }
    let mut r = Raster::from_vec(data, SIZE, SIZE).unwrap();
    r.set_transform(grid());
    r.set_nodata(Some(-9999.0));
    r
}

/// Seven-band scene with bands stored in a deliberately scrambled order
pub fn landsat_scene() -> Image {
    Image::from_planes(
        "LC08_test",
        vec![
            ("lwir", plane(|s| s.bt)),
            ("nir", plane(|s| s.nir)),
            ("blue", plane(|s| s.blue)),
            ("swir2", plane(|s| s.swir2)),
            ("red", plane(|s| s.red)),
            ("swir1", plane(|s| s.swir1)),
            ("green", plane(|s| s.green)),
        ],
    )
    .unwrap()
}

/// Two-band image from row-major values
pub fn red_nir(red: Vec<f64>, nir: Vec<f64>, rows: usize, cols: usize) -> Image {
    let mut r = Raster::from_vec(red, rows, cols).unwrap();
    let mut n = Raster::from_vec(nir, rows, cols).unwrap();
    r.set_nodata(Some(-9999.0));
    n.set_nodata(Some(-9999.0));
    Image::from_planes("pair", vec![("red", r), ("nir", n)]).unwrap()
}
