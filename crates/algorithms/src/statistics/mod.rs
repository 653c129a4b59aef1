//! Scene statistics and the detectors built on them

pub mod covariance;
pub mod rxd;

pub use covariance::{spectral_covariance, spectral_statistics, SpectralStatistics};
pub use rxd::{inverse_covariance, rx_scores, rxd, Rxd, RxdParams};
