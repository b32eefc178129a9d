use std::fmt;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single typed value in a staging or curated row.
///
/// The variant order defines the total order used for deterministic tie-breaks, so it
/// must never be reordered: doing so silently changes historical survivor selection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Cell {
    /// Absent value, either a configured null token or a nulled conversion failure.
    Null,
    Bool(bool),
    Int(i64),
    /// Fixed-precision decimal, always carried at scale 3.
    Numeric(BigDecimal),
    Date(NaiveDate),
    /// Free text, including identifier-like columns where leading zeros matter.
    Text(String),
}

impl Cell {
    /// Returns whether this cell holds no value.
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Returns the integer payload, if this cell holds one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Cell::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the text payload, if this cell holds one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this cell holds one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Cell::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("NULL"),
            Cell::Bool(value) => write!(f, "{value}"),
            Cell::Int(value) => write!(f, "{value}"),
            Cell::Numeric(value) => write!(f, "{value}"),
            Cell::Date(value) => write!(f, "{value}"),
            Cell::Text(value) => f.write_str(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn cells_order_deterministically() {
        let mut cells = vec![
            Cell::Text("TOT".into()),
            Cell::Int(7),
            Cell::Null,
            Cell::Numeric(BigDecimal::from_str("0.500").unwrap()),
        ];
        cells.sort();
        assert_eq!(cells[0], Cell::Null);
        assert_eq!(cells[1], Cell::Int(7));
        assert_eq!(cells[3], Cell::Text("TOT".into()));
    }
}
