//! Record assembly.
//!
//! Folds raw `(field, value, filename, page)` tuples into one
//! [`StructuredRecord`] per `(filename, page)`, with every schema field
//! present and `None` where nothing was extracted.

use std::collections::{BTreeMap, HashMap};

use loan_docs_document_models::{DocumentType, FieldSchema, RawField, StructuredRecord};

/// Builds structured records against an injected schema.
#[derive(Debug, Clone, Copy)]
pub struct Assembler<'a> {
    schema: &'a FieldSchema,
}

impl Default for Assembler<'static> {
    fn default() -> Self {
        Self::new(FieldSchema::canonical())
    }
}

impl<'a> Assembler<'a> {
    /// Creates an assembler over `schema`.
    #[must_use]
    pub const fn new(schema: &'a FieldSchema) -> Self {
        Self { schema }
    }

    /// The schema every record is filled against.
    #[must_use]
    pub const fn schema(&self) -> &'a FieldSchema {
        self.schema
    }

    /// Groups `fields` by `(filename, page_number)`.
    ///
    /// Records come out in the order their key was first seen. Within a
    /// record the last value for a field wins. Fields whose name is not in
    /// the schema are dropped. Files missing from `document_types` are
    /// labelled [`DocumentType::Miscellaneous`].
    #[must_use]
    pub fn assemble(
        &self,
        fields: &[RawField],
        document_types: &BTreeMap<String, DocumentType>,
    ) -> Vec<StructuredRecord> {
        let mut records: Vec<StructuredRecord> = Vec::new();
        let mut index: HashMap<(&str, u32), usize> = HashMap::new();

        for raw in fields {
            let key = (raw.filename.as_str(), raw.page_number);
            let slot = *index.entry(key).or_insert_with(|| {
                records.push(StructuredRecord {
                    filename: raw.filename.clone(),
                    document_type: document_types
                        .get(&raw.filename)
                        .copied()
                        .unwrap_or(DocumentType::Miscellaneous),
                    page_number: raw.page_number,
                    fields: self.schema.empty_fields(),
                });
                records.len() - 1
            });

            let Some(id) = self.schema.lookup(&raw.field) else {
                log::debug!(
                    "{} page {}: dropping non-schema field {:?}",
                    raw.filename,
                    raw.page_number,
                    raw.field
                );
                continue;
            };

            records[slot].fields.insert(id, Some(raw.value.clone()));
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use loan_docs_document_models::FieldId;

    use super::*;

    fn raw(field: &str, value: &str, filename: &str, page_number: u32) -> RawField {
        RawField {
            field: field.to_owned(),
            value: value.to_owned(),
            filename: filename.to_owned(),
            page_number,
        }
    }

    fn types() -> BTreeMap<String, DocumentType> {
        BTreeMap::from([
            ("le.pdf".to_owned(), DocumentType::LoanEstimate),
            ("fw.pdf".to_owned(), DocumentType::FeeWorksheet),
        ])
    }

    #[test]
    fn groups_by_file_and_page_in_first_seen_order() {
        let fields = [
            raw("Loan Amount", "$200,000", "fw.pdf", 1),
            raw("Loan Amount", "$350,000", "le.pdf", 2),
            raw("Interest Rate", "6.5%", "fw.pdf", 1),
            raw("Lender Name", "Acme Bank", "le.pdf", 4),
        ];
        let records = Assembler::default().assemble(&fields, &types());

        let keys: Vec<(&str, u32)> = records
            .iter()
            .map(|r| (r.filename.as_str(), r.page_number))
            .collect();
        assert_eq!(keys, [("fw.pdf", 1), ("le.pdf", 2), ("le.pdf", 4)]);
        assert_eq!(records[0].document_type, DocumentType::FeeWorksheet);
        assert_eq!(records[0].get(FieldId::InterestRate), Some("6.5%"));
        assert_eq!(records[1].document_type, DocumentType::LoanEstimate);
    }

    #[test]
    fn every_record_covers_the_schema() {
        let schema = FieldSchema::canonical();
        let records = Assembler::new(schema).assemble(
            &[raw("Loan Amount", "$1", "le.pdf", 2)],
            &types(),
        );
        assert!(records.iter().all(|r| r.covers(schema)));
        assert_eq!(records[0].fields.len(), schema.len());
        assert_eq!(records[0].get(FieldId::InterestRate), None);
    }

    #[test]
    fn last_write_wins() {
        let records = Assembler::default().assemble(
            &[
                raw("Estimated Cash to Close", "$19,500", "le.pdf", 3),
                raw("Estimated Cash to Close", "$20,000", "le.pdf", 3),
            ],
            &types(),
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get(FieldId::EstimatedCashToClose), Some("$20,000"));
    }

    #[test]
    fn unknown_fields_are_dropped_but_still_open_a_record() {
        let records =
            Assembler::default().assemble(&[raw("Shoe Size", "11", "le.pdf", 2)], &types());
        assert_eq!(records.len(), 1);
        assert!(records[0].fields.values().all(Option::is_none));
    }

    #[test]
    fn missing_document_type_defaults_to_miscellaneous() {
        let records =
            Assembler::default().assemble(&[raw("Loan Amount", "$5", "other.pdf", 1)], &types());
        assert_eq!(records[0].document_type, DocumentType::Miscellaneous);
    }

    #[test]
    fn injected_schema_limits_fields() {
        let schema = FieldSchema::new([FieldId::LoanAmount]);
        let records = Assembler::new(&schema).assemble(
            &[
                raw("Loan Amount", "$5", "le.pdf", 2),
                raw("Interest Rate", "7%", "le.pdf", 2),
            ],
            &types(),
        );
        assert_eq!(records[0].fields.len(), 1);
        assert_eq!(records[0].get(FieldId::LoanAmount), Some("$5"));
    }

    #[test]
    fn no_tuples_no_records() {
        assert!(Assembler::default().assemble(&[], &types()).is_empty());
    }
}
