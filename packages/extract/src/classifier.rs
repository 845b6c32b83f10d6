//! Document type classification.
//!
//! Maps footer text to a [`DocumentType`]. Every supported form prints a
//! recognizable title or vendor imprint in its footer, so an ordered list
//! of substring checks is enough. Earlier checks win: a footer mentioning
//! both "closing disclosure" and "loan estimate" is a Loan Estimate.

use loan_docs_document_models::DocumentType;

/// Ordered classification table. The first entry with a matching needle
/// wins.
const RULES: &[(DocumentType, &[&str])] = &[
    (DocumentType::LoanEstimate, &["loan estimate"]),
    (DocumentType::ClosingDisclosure, &["closing disclosure"]),
    (
        DocumentType::Form1003,
        &[
            "uniform residential loan application",
            "fannie mae form 1003",
        ],
    ),
    (
        DocumentType::Final1009,
        &["fannie mae form 1009", "form 1009"],
    ),
    (
        DocumentType::AppraisalReport,
        &["clickforms appraisal software"],
    ),
    (DocumentType::FeeWorksheet, &["calyx form"]),
    (
        DocumentType::TicorTitle,
        &[
            "ticor title company of california",
            "clta preliminary report form",
        ],
    ),
];

/// Classifies a document from its footer text.
///
/// Matching is case-insensitive. Returns [`DocumentType::Miscellaneous`]
/// when nothing matches, including for an empty footer.
#[must_use]
pub fn classify(footer: &str) -> DocumentType {
    let lower = footer.to_lowercase();

    RULES
        .iter()
        .find(|(_, needles)| contains_any(&lower, needles))
        .map_or(DocumentType::Miscellaneous, |(ty, _)| *ty)
}

/// Returns `true` if `haystack` contains any of the given needles.
fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loan_estimate_in_any_case() {
        assert_eq!(classify("LOAN ESTIMATE  PAGE 1 OF 3"), DocumentType::LoanEstimate);
        assert_eq!(classify("Loan Estimate"), DocumentType::LoanEstimate);
    }

    #[test]
    fn empty_footer_is_miscellaneous() {
        assert_eq!(classify(""), DocumentType::Miscellaneous);
        assert_eq!(classify("   "), DocumentType::Miscellaneous);
    }

    #[test]
    fn unknown_footer_is_miscellaneous() {
        assert_eq!(
            classify("Bank statement, page 4"),
            DocumentType::Miscellaneous
        );
    }

    #[test]
    fn each_type_is_detected() {
        let cases = [
            ("CLOSING DISCLOSURE PAGE 1 OF 5", DocumentType::ClosingDisclosure),
            (
                "Uniform Residential Loan Application Freddie Mac Form 65",
                DocumentType::Form1003,
            ),
            ("Fannie Mae Form 1003 07/2021", DocumentType::Form1003),
            ("Fannie Mae Form 1009 Page 1", DocumentType::Final1009),
            ("Form 1009 (rev.)", DocumentType::Final1009),
            (
                "Form UAD - \"ClickFORMS Appraisal Software\"",
                DocumentType::AppraisalReport,
            ),
            ("Calyx Form feeworksheet.frm", DocumentType::FeeWorksheet),
            (
                "Ticor Title Company of California",
                DocumentType::TicorTitle,
            ),
            (
                "CLTA Preliminary Report Form - Modified (11/17/06)",
                DocumentType::TicorTitle,
            ),
        ];

        for (footer, expected) in cases {
            assert_eq!(classify(footer), expected, "footer: {footer}");
        }
    }

    #[test]
    fn earlier_rules_win() {
        assert_eq!(
            classify("Closing Disclosure (compare with your Loan Estimate)"),
            DocumentType::LoanEstimate
        );
        assert_eq!(
            classify("Fannie Mae Form 1003 and Form 1009"),
            DocumentType::Form1003
        );
    }
}
