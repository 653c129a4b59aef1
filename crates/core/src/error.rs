//! Error types for bandwise

use thiserror::Error;

/// Main error type for bandwise operations
#[derive(Error, Debug)]
pub enum Error {
    /// Failure reported by the I/O collaborator, passed through unmodified
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Algorithm '{algorithm}' requires band {band}, which the image does not provide")]
    MissingBand { algorithm: String, band: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Source image {index} has {actual} bands ({detail}), expected {expected}")]
    BandCountMismatch {
        index: usize,
        expected: usize,
        actual: usize,
        detail: String,
    },

    #[error("Singular covariance matrix: rank {rank} of {bands} bands")]
    SingularCovariance { rank: usize, bands: usize },

    #[error("No source image covers output pixel ({row}, {col})")]
    NoCoveringSource { row: usize, col: usize },

    #[error("Footprint CRS {footprint} does not match source image {index} CRS {image}")]
    UnregisteredGeometry {
        index: usize,
        image: String,
        footprint: String,
    },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Band '{band}' is not co-registered with the image grid: {reason}")]
    NotCoRegistered { band: String, reason: String },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Encoding error: {0}")]
    Encode(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for bandwise operations
pub type Result<T> = std::result::Result<T, Error>;
