//! Concurrency primitives shared across the pipeline.

mod shutdown;

pub use shutdown::*;
