use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Maximum parallel file loads cannot be zero.
    #[error("`max_load_workers` cannot be zero")]
    MaxLoadWorkersZero,
    /// The null-token vocabulary cannot be empty.
    #[error("`null_tokens` must contain at least one token")]
    EmptyNullTokens,
    /// The schema version cannot be zero.
    #[error("`schema_version` cannot be zero")]
    SchemaVersionZero,
}
