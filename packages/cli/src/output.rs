//! Serializing extraction results.

use std::io::{self, Write};

use clap::ValueEnum;
use loan_docs_document_models::{FieldSchema, StructuredRecord};
use loan_docs_extract::ExtractedDocument;

/// Columns that precede the schema fields in tabular output.
const KEY_COLUMNS: [&str; 3] = ["filename", "document_type", "page_number"];

/// Record serialization formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON array, nulls included
    #[default]
    Json,
    /// One row per record, the full schema as header
    Csv,
}

/// Errors while writing records.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Writes `records` to `out` in the requested format.
///
/// # Errors
///
/// Returns an error if serialization or the underlying writer fails.
pub fn write_records<W: Write>(
    out: &mut W,
    format: OutputFormat,
    records: &[&StructuredRecord],
    schema: &FieldSchema,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, records)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => write_csv(out, records, schema)?,
    }
    out.flush()?;
    Ok(())
}

fn write_csv<W: Write>(
    out: &mut W,
    records: &[&StructuredRecord],
    schema: &FieldSchema,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);

    let header: Vec<String> = KEY_COLUMNS
        .iter()
        .map(|&column| column.to_owned())
        .chain(schema.ids().map(|id| id.to_string()))
        .collect();
    writer.write_record(&header)?;

    for record in records {
        let page = record.page_number.to_string();
        let row = [
            record.filename.as_str(),
            record.document_type.label(),
            page.as_str(),
        ]
        .into_iter()
        .chain(schema.ids().map(|id| record.get(id).unwrap_or_default()));
        writer.write_record(row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Prints each document's extracted values as `Field: value` lines.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_summary<W: Write>(out: &mut W, documents: &[&ExtractedDocument]) -> io::Result<()> {
    for doc in documents {
        writeln!(
            out,
            "{} ({}, {} pages)",
            doc.filename, doc.document_type, doc.page_count
        )?;
        if doc.fields.is_empty() {
            writeln!(out, "  no fields extracted")?;
        }
        for field in &doc.fields {
            writeln!(out, "  {}: {}", field.field, field.value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use loan_docs_document_models::{DocumentType, FieldId, RawField};

    use super::*;

    fn record() -> StructuredRecord {
        let schema = FieldSchema::canonical();
        let mut fields = schema.empty_fields();
        fields.insert(FieldId::LoanAmount, Some("$350,000".to_owned()));
        StructuredRecord {
            filename: "le.pdf".to_owned(),
            document_type: DocumentType::LoanEstimate,
            page_number: 2,
            fields,
        }
    }

    #[test]
    fn json_keeps_nulls() {
        let record = record();
        let mut out = Vec::new();
        write_records(
            &mut out,
            OutputFormat::Json,
            &[&record],
            FieldSchema::canonical(),
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let first = &value[0];
        assert_eq!(first["filename"], "le.pdf");
        assert_eq!(first["document_type"], "Loan Estimate");
        assert_eq!(first["page_number"], 2);
        assert_eq!(first["loan_amount"], "$350,000");
        assert!(first["interest_rate"].is_null());
        assert_eq!(
            first.as_object().unwrap().len(),
            KEY_COLUMNS.len() + FieldSchema::canonical().len()
        );
    }

    #[test]
    fn csv_header_is_the_full_schema() {
        let record = record();
        let schema = FieldSchema::canonical();
        let mut out = Vec::new();
        write_records(&mut out, OutputFormat::Csv, &[&record], schema).unwrap();

        let mut reader = csv::Reader::from_reader(out.as_slice());
        let header = reader.headers().unwrap().clone();
        assert_eq!(header.len(), KEY_COLUMNS.len() + schema.len());
        assert_eq!(&header[0], "filename");
        let loan_amount = header.iter().position(|h| h == "loan_amount").unwrap();
        let interest_rate = header.iter().position(|h| h == "interest_rate").unwrap();

        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[1], "Loan Estimate");
        assert_eq!(&row[loan_amount], "$350,000");
        assert_eq!(&row[interest_rate], "");
    }

    #[test]
    fn csv_without_records_still_has_a_header() {
        let mut out = Vec::new();
        write_records(&mut out, OutputFormat::Csv, &[], FieldSchema::canonical()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn summary_lists_field_values() {
        let doc = ExtractedDocument {
            filename: "fw.pdf".to_owned(),
            document_type: DocumentType::FeeWorksheet,
            page_count: 1,
            fields: vec![RawField {
                field: "Loan Amount".to_owned(),
                value: "$200,000".to_owned(),
                filename: "fw.pdf".to_owned(),
                page_number: 1,
            }],
            records: Vec::new(),
        };

        let mut out = Vec::new();
        write_summary(&mut out, &[&doc]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("fw.pdf (Fee Worksheet, 1 pages)\n"));
        assert!(text.contains("  Loan Amount: $200,000\n"));
    }
}
