//! Mosaic compositing

pub mod cookie_cutter;
pub mod resample;

pub use cookie_cutter::{cookie_cutter, CookieCutterParams};
pub use resample::Interpolation;
