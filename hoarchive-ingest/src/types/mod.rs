//! Common value types used throughout the ingestion pipeline.
//!
//! Re-exports the typed cell representation of staged values, row and business-key
//! containers, and the string-to-cell parsing routines used by the staging loader.

mod cell;
mod parse;
mod row;

pub use cell::*;
pub use parse::*;
pub use row::*;
