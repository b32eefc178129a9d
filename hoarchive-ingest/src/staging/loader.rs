use std::fs::File;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ErrorKind, IngestResult};
use crate::ingest_error;
use crate::schema::SourceSchema;
use crate::staging::StagingRelation;
use crate::types::{Cell, StagingRow, parse_cell};

/// One value that failed its declared type conversion during staging.
///
/// The field was set to null and the row kept; a single malformed field should not
/// destroy the rest of the record.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionFailure {
    pub line: u64,
    pub column: String,
    pub value: String,
    pub reason: String,
}

/// Per-file staging report.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub source: String,
    pub rows_read: u64,
    pub null_coercions: u64,
    pub conversion_errors: Vec<ConversionFailure>,
}

/// Loads one raw CSV source into a typed staging relation.
///
/// Values are trimmed, compared case-sensitively against the configured null tokens,
/// and coerced to the schema's target types. A missing required column (or an unreadable
/// file) is a fatal schema error for this file; an unparseable individual value, or a
/// field a ragged row ends before, is a per-field conversion error that nulls the field
/// and is counted in the report.
///
/// Loading the same file content twice yields identical output.
pub fn load_source(
    path: &Path,
    schema: &SourceSchema,
    null_tokens: &[String],
) -> IngestResult<(StagingRelation, LoadReport)> {
    let file = File::open(path).map_err(|err| {
        ingest_error!(
            ErrorKind::SchemaError,
            "Source file could not be opened",
            format!("{}: {err}", path.display()),
            source: err
        )
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    // Map each declared column to its position in the file, failing fast on absences.
    let headers = reader.headers()?.clone();
    let mut positions = Vec::with_capacity(schema.columns.len());
    for column in &schema.columns {
        let Some(position) = headers.iter().position(|h| h == column.name) else {
            return Err(ingest_error!(
                ErrorKind::SchemaError,
                "Required column absent from source file",
                format!("column `{}` not found in {}", column.name, path.display())
            ));
        };
        positions.push(position);
    }

    let mut rows = Vec::new();
    let mut null_coercions = 0u64;
    let mut conversion_errors = Vec::new();

    for (index, record) in reader.records().enumerate() {
        // Header occupies line 1.
        let line = index as u64 + 2;
        let record = record?;

        let mut cells = Vec::with_capacity(schema.columns.len());
        for (column, &position) in schema.columns.iter().zip(&positions) {
            // A ragged row ending before this column is a conversion failure for the
            // absent field, not a null coercion.
            let Some(raw) = record.get(position) else {
                debug!(
                    source = %schema.source,
                    line,
                    column = column.name,
                    "field absent from short record, nulled"
                );
                conversion_errors.push(ConversionFailure {
                    line,
                    column: column.name.to_string(),
                    value: String::new(),
                    reason: "record has fewer fields than the header".to_string(),
                });
                cells.push(Cell::Null);
                continue;
            };

            if null_tokens.iter().any(|token| token == raw) {
                null_coercions += 1;
                cells.push(Cell::Null);
                continue;
            }

            match parse_cell(raw, column.typ) {
                Ok(cell) => cells.push(cell),
                Err(err) => {
                    debug!(
                        source = %schema.source,
                        line,
                        column = column.name,
                        "conversion failure, field nulled: {err}"
                    );
                    conversion_errors.push(ConversionFailure {
                        line,
                        column: column.name.to_string(),
                        value: raw.to_string(),
                        reason: err.to_string(),
                    });
                    cells.push(Cell::Null);
                }
            }
        }

        rows.push(StagingRow::new(line, cells));
    }

    let report = LoadReport {
        source: schema.source.logical_name().to_string(),
        rows_read: rows.len() as u64,
        null_coercions,
        conversion_errors,
    };

    info!(
        source = %schema.source,
        rows = report.rows_read,
        null_coercions = report.null_coercions,
        conversion_errors = report.conversion_errors.len(),
        "staged source file"
    );

    Ok((
        StagingRelation {
            source: schema.source,
            rows,
        },
        report,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SourceId, schema_for};
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn default_tokens() -> Vec<String> {
        vec!["".into(), "NA".into(), "null".into()]
    }

    #[test]
    fn float_artifact_id_jersey_zeros_and_null_tokens() {
        let csv = "\
player_id,season,tm,lg,jersey,g,gs,mp,pts,ast,trb,fg_pct,fg3_pct,ft_pct
201.0,1999,LAL,NBA,007,82,NA,2000.5,1000,300,400,0.512,null,0.800
";
        let file = write_csv(csv);
        let schema = schema_for(SourceId::PlayerSeasons);
        let (relation, report) = load_source(file.path(), schema, &default_tokens()).unwrap();

        assert_eq!(report.rows_read, 1);
        assert_eq!(report.null_coercions, 2);
        assert!(report.conversion_errors.is_empty());

        let row = &relation.rows[0];
        assert_eq!(row.cells[0], Cell::Int(201));
        assert_eq!(row.cells[4], Cell::Text("007".into()));
        assert_eq!(row.cells[6], Cell::Null); // gs was NA
    }

    #[test]
    fn unparseable_value_nulls_field_and_keeps_row() {
        let csv = "\
player_id,season,tm,lg,jersey,g,gs,mp,pts,ast,trb,fg_pct,fg3_pct,ft_pct
7,1999,LAL,NBA,8,82,80,2000,not_a_number,300,400,0.5,0.4,0.8
";
        let file = write_csv(csv);
        let schema = schema_for(SourceId::PlayerSeasons);
        let (relation, report) = load_source(file.path(), schema, &default_tokens()).unwrap();

        assert_eq!(report.rows_read, 1);
        assert_eq!(report.conversion_errors.len(), 1);
        assert_eq!(report.conversion_errors[0].column, "pts");
        assert_eq!(report.conversion_errors[0].line, 2);
        assert_eq!(relation.rows[0].cells[8], Cell::Null);
        // The rest of the record survives.
        assert_eq!(relation.rows[0].cells[0], Cell::Int(7));
    }

    #[test]
    fn short_record_is_a_conversion_error_not_a_null_coercion() {
        let csv = "\
player_id,full_name
1,Someone
2
";
        let file = write_csv(csv);
        let schema = schema_for(SourceId::Players);
        let (relation, report) = load_source(file.path(), schema, &default_tokens()).unwrap();

        assert_eq!(report.rows_read, 2);
        assert_eq!(report.null_coercions, 0);
        assert_eq!(report.conversion_errors.len(), 1);
        assert_eq!(report.conversion_errors[0].column, "full_name");
        assert_eq!(report.conversion_errors[0].line, 3);
        assert_eq!(relation.rows[1].cells[1], Cell::Null);
    }

    #[test]
    fn missing_required_column_is_fatal_for_the_file() {
        let csv = "\
player_id,full_name_misnamed
1,Someone
";
        let file = write_csv(csv);
        let schema = schema_for(SourceId::Players);
        let err = load_source(file.path(), schema, &default_tokens()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaError);
    }

    #[test]
    fn loading_twice_is_idempotent() {
        let csv = "\
player_id,full_name
1,Kareem Abdul-Jabbar
2,  Magic Johnson
";
        let file = write_csv(csv);
        let schema = schema_for(SourceId::Players);
        let (first, _) = load_source(file.path(), schema, &default_tokens()).unwrap();
        let (second, _) = load_source(file.path(), schema, &default_tokens()).unwrap();
        assert_eq!(first, second);
        // Whitespace is trimmed before any other handling.
        assert_eq!(first.rows[1].cells[1], Cell::Text("Magic Johnson".into()));
    }
}
