//! Error types and result definitions for ingestion operations.
//!
//! Provides a kind-classified error type for the pipeline. [`IngestError`] carries the
//! failure category, a static description, optional dynamic detail, and the callsite that
//! produced it. Recoverable data-quality conditions (conversion failures, referential
//! violations, rate warnings, collisions) are deliberately *not* errors: they are collected
//! into run reports so a caller can inspect them and decide how to proceed.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::types::ParseCellError;

/// Convenient result type for ingestion operations using [`IngestError`] as the error type.
pub type IngestResult<T> = Result<T, IngestError>;

/// Main error type for ingestion operations.
#[derive(Debug, Clone)]
pub struct IngestError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
}

/// Specific categories of errors that can occur during ingestion.
///
/// The categories mirror the pipeline's failure taxonomy: per-file schema problems,
/// resolver construction problems, and promotion-time constraint problems each get their
/// own kind so callers can tell dirty input apart from broken pipeline invariants.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A required column is absent from a source file, or the file is unreadable.
    /// Fatal for that file only.
    SchemaError,

    /// A value failed its declared type conversion in a context where it cannot be
    /// recovered by nulling the field.
    ConversionError,

    /// Two alias rows claim the same (season, abbreviation) with different target teams.
    /// Fatal for the whole run; the source data must be corrected.
    AliasAmbiguity,

    /// A curated table's business key was violated at promotion time. This signals a bug
    /// in deduplication or validation, not dirty input.
    UniquenessViolation,

    /// The pipeline was used in a way that breaks its own sequencing assumptions.
    InvalidState,

    /// A parallel staging load task panicked.
    LoadWorkerPanic,

    // Ambient failures.
    ConfigError,
    IoError,
    SerializationError,
    DeserializationError,

    /// Fallback for errors converted from foreign types without a clear category.
    Unknown,
}

impl IngestError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified
    /// instance. The stored source is preserved across clones and exposed via
    /// [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Creates an [`IngestError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        IngestError {
            kind,
            description,
            detail,
            source,
            location: Location::caller(),
        }
    }
}

impl PartialEq for IngestError {
    fn eq(&self, other: &IngestError) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.description,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )?;

        if let Some(detail) = self.detail.as_deref() {
            write!(f, "\n  Detail: {detail}")?;
        }

        Ok(())
    }
}

impl error::Error for IngestError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Creates an [`IngestError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for IngestError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> IngestError {
        IngestError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates an [`IngestError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for IngestError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> IngestError {
        IngestError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`std::io::Error`] to [`IngestError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for IngestError {
    #[track_caller]
    fn from(err: std::io::Error) -> IngestError {
        let detail = err.to_string();
        IngestError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`csv::Error`] to [`IngestError`] with [`ErrorKind::SchemaError`].
///
/// A reader-level CSV error means the file as a whole cannot be trusted, which the
/// pipeline treats the same way as a missing required column.
impl From<csv::Error> for IngestError {
    #[track_caller]
    fn from(err: csv::Error) -> IngestError {
        let detail = err.to_string();
        IngestError::from_components(
            ErrorKind::SchemaError,
            Cow::Borrowed("CSV source could not be read"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`serde_json::Error`] to [`IngestError`] with the appropriate error kind.
impl From<serde_json::Error> for IngestError {
    #[track_caller]
    fn from(err: serde_json::Error) -> IngestError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            _ => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        IngestError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`ParseCellError`] to [`IngestError`] with [`ErrorKind::ConversionError`].
///
/// Used only where a conversion failure is not recoverable by nulling the field, for
/// example when re-reading persisted curated rows.
impl From<ParseCellError> for IngestError {
    #[track_caller]
    fn from(err: ParseCellError) -> IngestError {
        let detail = err.to_string();
        IngestError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("value failed declared type conversion"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`tokio::task::JoinError`] to [`IngestError`] with [`ErrorKind::LoadWorkerPanic`].
impl From<tokio::task::JoinError> for IngestError {
    #[track_caller]
    fn from(err: tokio::task::JoinError) -> IngestError {
        let detail = err.to_string();
        IngestError::from_components(
            ErrorKind::LoadWorkerPanic,
            Cow::Borrowed("staging load task failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bail;

    fn fails() -> IngestResult<()> {
        bail!(
            ErrorKind::SchemaError,
            "Missing required column",
            format!("column `{}` not found", "player_id")
        );
    }

    #[test]
    fn bail_captures_kind_and_detail() {
        let err = fails().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaError);
        assert_eq!(err.detail(), Some("column `player_id` not found"));
    }

    #[test]
    fn errors_compare_by_kind() {
        let a = IngestError::from((ErrorKind::IoError, "one"));
        let b = IngestError::from((ErrorKind::IoError, "two"));
        assert_eq!(a, b);
    }
}
