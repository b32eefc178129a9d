//! Configuration loading for the hoarchive ingestion pipeline.
//!
//! Configuration is layered: a base file, an environment-specific file, and
//! `APP_`-prefixed environment variable overrides, merged in that order.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config};
