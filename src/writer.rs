//! Result serialisation.
//!
//! The batch is written exactly once, after every document has a result.
//! Output goes to a temporary file in the destination directory that is then
//! persisted over the final name, so a crash never leaves a half-written
//! file behind.
//!
//! * **tabular** (CSV): leading accounting columns, one column per schema
//!   field in schema order, and an `error_message` column only when at least
//!   one document failed. Null renders as an empty cell.
//! * **structured** (JSON): the results array, values keeping their native
//!   JSON types.

use crate::error::TrawlerError;
use crate::output::ExtractionResult;
use crate::schema::{OutputMode, Schema};
use chrono::NaiveDateTime;
use csv::WriterBuilder;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Fixed leading columns of the tabular output.
pub const LEADING_COLUMNS: [&str; 6] = [
    "document_id",
    "outcome",
    "pages_processed",
    "input_tokens",
    "output_tokens",
    "cost",
];

/// `resume_trawl_<N>_resumes_<YYYYMMDD_HHMMSS>.<ext>`
pub fn output_file_name(documents: usize, mode: OutputMode, timestamp: &NaiveDateTime) -> String {
    format!(
        "resume_trawl_{}_resumes_{}.{}",
        documents,
        timestamp.format("%Y%m%d_%H%M%S"),
        mode.extension()
    )
}

/// Write results as CSV.
pub fn write_tabular<W: Write>(
    writer: W,
    results: &[ExtractionResult],
    schema: &Schema,
) -> Result<(), csv::Error> {
    let with_errors = results.iter().any(|r| !r.is_success());
    let mut wtr = WriterBuilder::new().from_writer(writer);

    let mut header: Vec<&str> = LEADING_COLUMNS.to_vec();
    header.extend(schema.field_names());
    if with_errors {
        header.push("error_message");
    }
    wtr.write_record(&header)?;

    for r in results {
        let mut row = vec![
            r.document_id().to_string(),
            r.outcome().as_str().to_string(),
            r.pages_processed().to_string(),
            r.input_tokens().to_string(),
            r.output_tokens().to_string(),
            format!("{:.6}", r.cost()),
        ];
        for field in schema.field_names() {
            row.push(
                r.values()
                    .get(field)
                    .map(|v| v.render_cell())
                    .unwrap_or_default(),
            );
        }
        if with_errors {
            row.push(r.error_message().unwrap_or_default().to_string());
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write results as a pretty-printed JSON array.
pub fn write_structured<W: Write>(
    writer: W,
    results: &[ExtractionResult],
) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(writer, results)
}

/// Write `results` into `dir` in the schema's output mode. Returns the path.
pub fn write_report(
    dir: &Path,
    results: &[ExtractionResult],
    schema: &Schema,
    timestamp: &NaiveDateTime,
) -> Result<PathBuf, TrawlerError> {
    let mode = schema.output_mode();
    let path = dir.join(output_file_name(results.len(), mode, timestamp));
    let write_failed = |source: std::io::Error| TrawlerError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_failed)?;
    match mode {
        OutputMode::Tabular => write_tabular(&mut tmp, results, schema)
            .map_err(|e| TrawlerError::Serialization(e.to_string()))?,
        OutputMode::Structured => {
            write_structured(&mut tmp, results)
                .map_err(|e| TrawlerError::Serialization(e.to_string()))?;
            writeln!(tmp).map_err(write_failed)?;
        }
    }
    tmp.persist(&path).map_err(|e| write_failed(e.error))?;

    info!("Results saved to: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::coerce_response;
    use crate::error::DocumentError;
    use crate::output::Usage;
    use crate::schema::{FieldSpec, FieldType};
    use chrono::NaiveDate;

    fn schema(mode: OutputMode) -> Schema {
        Schema::new(
            "Backend Engineer",
            mode,
            vec![
                FieldSpec::new("name", "Name?", FieldType::String),
                FieldSpec::new("years", "Years?", FieldType::Int),
                FieldSpec::new("remote", "Remote?", FieldType::Bool),
            ],
        )
        .unwrap()
    }

    fn usage() -> Usage {
        Usage {
            pages_processed: 2,
            input_tokens: 1200,
            output_tokens: 80,
            cost: 0.0048,
        }
    }

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 26, 53)
            .unwrap()
    }

    fn render_csv(results: &[ExtractionResult], schema: &Schema) -> String {
        let mut buf = Vec::new();
        write_tabular(&mut buf, results, schema).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn file_name_format() {
        assert_eq!(
            output_file_name(12, OutputMode::Tabular, &stamp()),
            "resume_trawl_12_resumes_20250314_092653.csv"
        );
        assert_eq!(
            output_file_name(1, OutputMode::Structured, &stamp()),
            "resume_trawl_1_resumes_20250314_092653.json"
        );
    }

    #[test]
    fn tabular_without_failures_has_no_error_column() {
        let s = schema(OutputMode::Tabular);
        let values =
            coerce_response(r#"{"name": "Ann, PhD", "years": 4, "remote": null}"#, &s).values;
        let csv = render_csv(&[ExtractionResult::success("ann", values, usage())], &s);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "document_id,outcome,pages_processed,input_tokens,output_tokens,cost,name,years,remote"
        );
        assert_eq!(
            lines.next().unwrap(),
            "ann,success,2,1200,80,0.004800,\"Ann, PhD\",4,"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn tabular_with_failure_adds_error_column() {
        let s = schema(OutputMode::Tabular);
        let ok = coerce_response(r#"{"name": "Ben", "years": 9, "remote": true}"#, &s).values;
        let results = vec![
            ExtractionResult::success("ben", ok, usage()),
            ExtractionResult::failure("cal", &s, &DocumentError::NoPages, Usage::default()),
        ];
        let csv = render_csv(&results, &s);
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[0].ends_with(",remote,error_message"));
        assert_eq!(lines[1], "ben,success,2,1200,80,0.004800,Ben,9,true,");
        assert_eq!(
            lines[2],
            "cal,failure,0,0,0,0.000000,,,,PDF conversion produced no pages"
        );
    }

    #[test]
    fn structured_keeps_native_types() {
        let s = schema(OutputMode::Structured);
        let values =
            coerce_response(r#"{"name": "Dee", "years": "3", "remote": "yes"}"#, &s).values;
        let mut buf = Vec::new();
        write_structured(&mut buf, &[ExtractionResult::success("dee", values, usage())]).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(v[0]["document_id"], "dee");
        assert_eq!(v[0]["values"]["years"], 3);
        assert_eq!(v[0]["values"]["remote"], true);
    }

    #[test]
    fn write_report_persists_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let s = schema(OutputMode::Tabular);
        let results = vec![ExtractionResult::failure(
            "eve",
            &s,
            &DocumentError::Cancelled,
            Usage::default(),
        )];

        let path = write_report(dir.path(), &results, &s, &stamp()).unwrap();
        assert_eq!(
            path.file_name().unwrap(),
            "resume_trawl_1_resumes_20250314_092653.csv"
        );
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("Processing cancelled"));
    }

    #[test]
    fn write_report_to_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let s = schema(OutputMode::Structured);
        let err = write_report(&dir.path().join("missing"), &[], &s, &stamp()).unwrap_err();
        assert!(matches!(err, TrawlerError::OutputWriteFailed { .. }));
    }
}
