//! # Bandwise Parallel
//!
//! Execution plumbing shared by every whole-image pass:
//! - Row-block planning so passes touch a bounded slice of the image at a time
//! - Sequential / rayon / dedicated-pool strategies behind one interface
//! - Cooperative cancellation checked between blocks

pub mod blocks;
pub mod cancel;
pub mod strategy;

pub use blocks::{RowBlock, RowBlocks, DEFAULT_BLOCK_ROWS};
pub use cancel::CancelToken;
pub use strategy::{ParallelStrategy, ProcessingMode, WorkerPool};
