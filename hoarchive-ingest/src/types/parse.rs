use std::str::FromStr;

use bigdecimal::BigDecimal;
use bigdecimal::rounding::RoundingMode;
use chrono::NaiveDate;
use thiserror::Error;

use crate::schema::ColumnType;
use crate::types::Cell;

/// Scale applied to every decimal rate/measure column, regardless of source precision.
pub const NUMERIC_SCALE: i64 = 3;

/// Errors produced when a raw CSV value fails its declared type conversion.
///
/// These are per-field, recoverable conditions: the staging loader records them in the
/// load report and nulls the field rather than dropping the row.
#[derive(Debug, Clone, Error)]
pub enum ParseCellError {
    #[error("invalid integer `{0}`")]
    Int(String),
    /// Spreadsheet exports render integer ids as floats. A trailing `.0` is accepted;
    /// any nonzero fractional part is a real conversion failure.
    #[error("integer with nonzero fractional part `{0}`")]
    FractionalInt(String),
    #[error("invalid decimal `{0}`")]
    Numeric(String),
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    Date(String),
    #[error("invalid boolean `{0}`")]
    Bool(String),
}

/// Parses a trimmed, non-null raw value into a typed [`Cell`].
pub fn parse_cell(raw: &str, typ: ColumnType) -> Result<Cell, ParseCellError> {
    match typ {
        ColumnType::Int => parse_int(raw).map(Cell::Int),
        ColumnType::Numeric | ColumnType::Rate => parse_numeric(raw).map(Cell::Numeric),
        ColumnType::Date => parse_date(raw).map(Cell::Date),
        ColumnType::Bool => parse_bool(raw).map(Cell::Bool),
        // Identifier columns are never coerced to numeric, so jersey "007" keeps its zeros.
        ColumnType::Text | ColumnType::Identifier => Ok(Cell::Text(raw.to_string())),
    }
}

/// Parses an integer, tolerating the `"201.0"` float artifacts of spreadsheet export.
pub fn parse_int(raw: &str) -> Result<i64, ParseCellError> {
    let (integral, fractional) = match raw.split_once('.') {
        Some((integral, fractional)) => (integral, Some(fractional)),
        None => (raw, None),
    };

    if let Some(fractional) = fractional {
        if fractional.is_empty() || !fractional.bytes().all(|b| b == b'0') {
            return Err(ParseCellError::FractionalInt(raw.to_string()));
        }
    }

    integral
        .parse::<i64>()
        .map_err(|_| ParseCellError::Int(raw.to_string()))
}

/// Parses a decimal and rescales it to [`NUMERIC_SCALE`] digits, rounding half-up.
pub fn parse_numeric(raw: &str) -> Result<BigDecimal, ParseCellError> {
    let value =
        BigDecimal::from_str(raw).map_err(|_| ParseCellError::Numeric(raw.to_string()))?;
    Ok(value.with_scale_round(NUMERIC_SCALE, RoundingMode::HalfUp))
}

/// Parses an ISO-8601 date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ParseCellError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ParseCellError::Date(raw.to_string()))
}

/// Parses a boolean flag as rendered by the source exports.
pub fn parse_bool(raw: &str) -> Result<bool, ParseCellError> {
    match raw {
        "1" | "t" | "true" | "TRUE" => Ok(true),
        "0" | "f" | "false" | "FALSE" => Ok(false),
        other => Err(ParseCellError::Bool(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_artifact_ids_parse_as_integers() {
        assert_eq!(parse_int("201.0").unwrap(), 201);
        assert_eq!(parse_int("201.000").unwrap(), 201);
        assert_eq!(parse_int("-13.0").unwrap(), -13);
        assert_eq!(parse_int("42").unwrap(), 42);
    }

    #[test]
    fn nonzero_fraction_is_a_conversion_error() {
        assert!(matches!(
            parse_int("201.5"),
            Err(ParseCellError::FractionalInt(_))
        ));
        assert!(matches!(parse_int("201."), Err(ParseCellError::FractionalInt(_))));
        assert!(matches!(parse_int("abc"), Err(ParseCellError::Int(_))));
    }

    #[test]
    fn decimals_are_rescaled_to_three_digits() {
        assert_eq!(parse_numeric("0.51234").unwrap().to_string(), "0.512");
        assert_eq!(parse_numeric("0.5").unwrap().to_string(), "0.500");
        assert_eq!(parse_numeric("1").unwrap().to_string(), "1.000");
    }

    #[test]
    fn identifier_text_keeps_leading_zeros() {
        let cell = parse_cell("007", ColumnType::Identifier).unwrap();
        assert_eq!(cell, Cell::Text("007".to_string()));
    }

    #[test]
    fn dates_parse_iso_only() {
        assert!(parse_date("1999-03-21").is_ok());
        assert!(parse_date("03/21/1999").is_err());
    }
}
