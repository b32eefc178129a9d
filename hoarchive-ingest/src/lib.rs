//! Ingestion and promotion of historical basketball statistics.
//!
//! Raw CSV sources are staged into typed relations, deduplicated by business key,
//! validated for cross-source integrity, and promoted into curated tables behind a
//! store abstraction. Promotion is deterministic: the same source bytes always yield
//! byte-identical curated tables.

pub mod aliases;
pub mod concurrency;
pub mod error;
pub mod ledger;
pub mod macros;
pub mod pipeline;
pub mod promote;
pub mod reports;
pub mod schema;
pub mod staging;
pub mod store;
pub mod types;
pub mod validate;
