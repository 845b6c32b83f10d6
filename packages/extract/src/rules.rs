//! Compiled rule sets and the generic rule interpreter.
//!
//! Every document type's extraction runs through [`RuleSet::extract`]: pages
//! are visited in index order, and on each page the rules that select it
//! run in table order against the OCR text or the text layer. A rule that
//! does not match emits nothing. A flag rule also emits its `absent` value
//! when only its anchor matches.

use loan_docs_document_models::{DocumentType, RawField};
use regex::{Captures, Regex, RegexBuilder};

use crate::rule_def::{PageSelector, RuleDef, RuleError, RuleSetDef, TextSource, ValueTransform};

/// Text available for one page.
///
/// Either text may be absent when the page was not rendered for that
/// source; rules reading an absent source are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageText {
    /// 0-based page index.
    pub index: usize,
    /// OCR output for the rasterized page.
    pub ocr: Option<String>,
    /// Embedded text layer.
    pub text_layer: Option<String>,
}

impl PageText {
    fn source(&self, source: TextSource) -> Option<&str> {
        match source {
            TextSource::Ocr => self.ocr.as_deref(),
            TextSource::TextLayer => self.text_layer.as_deref(),
        }
    }
}

/// Which texts a rule set reads from a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageNeeds {
    /// Some rule reads OCR text.
    pub ocr: bool,
    /// Some rule reads the text layer.
    pub text_layer: bool,
}

impl PageNeeds {
    /// Whether the page is read at all.
    #[must_use]
    pub const fn any(self) -> bool {
        self.ocr || self.text_layer
    }
}

#[derive(Debug, Clone)]
enum Transform {
    Trim,
    JoinLines,
    Currency,
    Checkbox(Regex),
    Template(String),
    Flag {
        present: String,
        absent: String,
        anchor: Regex,
    },
}

/// One compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    def: RuleDef,
    regex: Regex,
    transform: Transform,
}

impl Rule {
    fn compile(document_type: DocumentType, def: RuleDef) -> Result<Self, RuleError> {
        let regex_error = |source| RuleError::Regex {
            document_type,
            field: def.field.clone(),
            source,
        };

        let build = |pattern: &str| {
            RegexBuilder::new(pattern)
                .case_insensitive(def.case_insensitive)
                .dot_matches_new_line(def.dot_matches_newline)
                .build()
                .map_err(regex_error)
        };

        let regex = build(def.pattern.as_str())?;

        let transform = match &def.value {
            ValueTransform::Trim => Transform::Trim,
            ValueTransform::JoinLines => Transform::JoinLines,
            ValueTransform::Currency => Transform::Currency,
            ValueTransform::Checkbox { marker } => {
                Transform::Checkbox(Regex::new(marker).map_err(regex_error)?)
            }
            ValueTransform::Template { template } => Transform::Template(template.clone()),
            ValueTransform::Flag {
                present,
                absent,
                anchor,
            } => Transform::Flag {
                present: present.clone(),
                absent: absent.clone(),
                anchor: build(anchor.as_str())?,
            },
        };

        Ok(Self {
            def,
            regex,
            transform,
        })
    }

    /// Canonical field label written by this rule.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.def.field
    }

    /// Pages the rule applies to.
    #[must_use]
    pub const fn pages(&self) -> &PageSelector {
        &self.def.pages
    }

    /// Text the rule reads.
    #[must_use]
    pub const fn source(&self) -> TextSource {
        self.def.source
    }

    /// Source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.def.pattern
    }

    /// Value transform.
    #[must_use]
    pub const fn value(&self) -> &ValueTransform {
        &self.def.value
    }

    /// Applies the rule to `text`, returning the value to emit, if any.
    #[must_use]
    pub fn evaluate(&self, text: &str) -> Option<String> {
        let Some(captures) = self.regex.captures(text) else {
            return match &self.transform {
                Transform::Flag { absent, anchor, .. } if anchor.is_match(text) => {
                    Some(absent.clone())
                }
                _ => None,
            };
        };
        let primary = group(&captures, 1);

        Some(match &self.transform {
            Transform::Trim => primary.trim().to_owned(),
            Transform::JoinLines => join_lines(primary),
            Transform::Currency => {
                let digits: String = primary.chars().filter(|c| !c.is_whitespace()).collect();
                format!("${digits}")
            }
            Transform::Checkbox(marker) => {
                let line = join_lines(primary);
                marker
                    .captures(&line)
                    .map_or_else(|| line.clone(), |m| group(&m, 1).trim().to_owned())
            }
            Transform::Template(template) => fill_template(template, &captures),
            Transform::Flag { present, .. } => present.clone(),
        })
    }
}

/// Capture group `n`, falling back to the whole match for group 1 when the
/// pattern has no groups.
fn group<'t>(captures: &Captures<'t>, n: usize) -> &'t str {
    captures
        .get(n)
        .or_else(|| if n == 1 { captures.get(0) } else { None })
        .map_or("", |m| m.as_str())
}

fn join_lines(value: &str) -> String {
    value.trim().replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Replaces each `{n}` in `template` with trimmed capture group `n`.
/// Braces not enclosing a group number are copied through.
fn fill_template(template: &str, captures: &Captures<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let group_ref = after
            .find('}')
            .and_then(|close| after[..close].parse::<usize>().ok().map(|n| (n, close)));

        if let Some((n, close)) = group_ref {
            out.push_str(captures.get(n).map_or("", |m| m.as_str().trim()));
            rest = &after[close + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }

    out.push_str(rest);
    out
}

/// Collapses every whitespace run to one space and trims.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The compiled rules for one document type.
#[derive(Debug, Clone)]
pub struct RuleSet {
    document_type: DocumentType,
    normalize_whitespace: bool,
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Compiles a rule table.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Regex`] if any pattern fails to compile.
    pub fn compile(def: RuleSetDef) -> Result<Self, RuleError> {
        let document_type = def.document_type;
        let rules = def
            .rules
            .into_iter()
            .map(|rule| Rule::compile(document_type, rule))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            document_type,
            normalize_whitespace: def.normalize_whitespace,
            rules,
        })
    }

    /// Document type this set extracts.
    #[must_use]
    pub const fn document_type(&self) -> DocumentType {
        self.document_type
    }

    /// Rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Which texts the rules read from page `index`.
    #[must_use]
    pub fn needs(&self, index: usize) -> PageNeeds {
        self.rules
            .iter()
            .filter(|r| r.pages().contains(index))
            .fold(PageNeeds::default(), |needs, r| match r.source() {
                TextSource::Ocr => PageNeeds { ocr: true, ..needs },
                TextSource::TextLayer => PageNeeds {
                    text_layer: true,
                    ..needs
                },
            })
    }

    /// Runs every rule against `pages` and returns the emitted fields.
    ///
    /// Pages are processed in index order regardless of slice order. Page
    /// numbers in the output are 1-based.
    #[must_use]
    pub fn extract(&self, pages: &[PageText], filename: &str) -> Vec<RawField> {
        let mut ordered: Vec<&PageText> = pages.iter().collect();
        ordered.sort_by_key(|p| p.index);

        let mut fields = Vec::new();

        for page in ordered {
            let page_number = u32::try_from(page.index + 1).unwrap_or(u32::MAX);
            let normalized_ocr = self.normalize(page.ocr.as_deref());
            let normalized_layer = self.normalize(page.text_layer.as_deref());

            for rule in self.rules.iter().filter(|r| r.pages().contains(page.index)) {
                let text = match rule.source() {
                    TextSource::Ocr => normalized_ocr.as_deref(),
                    TextSource::TextLayer => normalized_layer.as_deref(),
                };
                let Some(text) = text.or_else(|| page.source(rule.source())) else {
                    log::debug!(
                        "{filename} page {page_number}: no {} text for {}",
                        rule.source(),
                        rule.field()
                    );
                    continue;
                };

                match rule.evaluate(text) {
                    Some(value) => fields.push(RawField {
                        field: rule.field().to_owned(),
                        value,
                        filename: filename.to_owned(),
                        page_number,
                    }),
                    None => {
                        log::debug!("{filename} page {page_number}: no match for {}", rule.field());
                    }
                }
            }
        }

        fields
    }

    fn normalize(&self, text: Option<&str>) -> Option<String> {
        if self.normalize_whitespace {
            text.map(normalize_whitespace)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule_def::parse_rule_toml;

    fn compile(toml: &str) -> RuleSet {
        RuleSet::compile(parse_rule_toml("test", toml).unwrap()).unwrap()
    }

    fn ocr_page(index: usize, text: &str) -> PageText {
        PageText {
            index,
            ocr: Some(text.to_owned()),
            text_layer: None,
        }
    }

    fn values(fields: &[RawField]) -> Vec<(&str, &str)> {
        fields
            .iter()
            .map(|f| (f.field.as_str(), f.value.as_str()))
            .collect()
    }

    #[test]
    fn currency_reprefixes_dollar_sign() {
        let set = compile(
            r#"
            document_type = "Loan Estimate"
            [[rule]]
            field = "Loan Amount"
            pages = 1
            pattern = 'Loan Amount\s+\$?([\d,]+)'
            value = { type = "currency" }
            "#,
        );
        let fields = set.extract(&[ocr_page(1, "Loan Amount $350,000")], "le.pdf");
        assert_eq!(values(&fields), [("Loan Amount", "$350,000")]);
        assert_eq!(fields[0].page_number, 2);
        assert_eq!(fields[0].filename, "le.pdf");
    }

    #[test]
    fn rules_only_fire_on_selected_pages() {
        let set = compile(
            r#"
            document_type = "Fee Worksheet"
            [[rule]]
            field = "Interest Rate"
            pages = 0
            pattern = 'Interest Rate[:\s]*([\d\.%]+)'
            "#,
        );
        let fields = set.extract(
            &[ocr_page(0, "no rate here"), ocr_page(1, "Interest Rate: 6.5%")],
            "fw.pdf",
        );
        assert!(fields.is_empty());
    }

    #[test]
    fn checkbox_takes_marked_option_or_whole_line() {
        let set = compile(
            r#"
            document_type = "Loan Estimate"
            [[rule]]
            field = "Loan Type"
            pages = 1
            source = "text_layer"
            pattern = 'LOAN TYPE\s+([^\n]+)'
            value = { type = "checkbox", marker = 'x\s*([A-Za-z]+)' }
            "#,
        );

        let marked = PageText {
            index: 1,
            ocr: Some("LOAN TYPE garbled".to_owned()),
            text_layer: Some("LOAN TYPE\nx Conventional".to_owned()),
        };
        assert_eq!(
            values(&set.extract(&[marked], "le.pdf")),
            [("Loan Type", "Conventional")]
        );

        let unmarked = PageText {
            index: 1,
            ocr: None,
            text_layer: Some("LOAN TYPE Conventional FHA VA".to_owned()),
        };
        assert_eq!(
            values(&set.extract(&[unmarked], "le.pdf")),
            [("Loan Type", "Conventional FHA VA")]
        );
    }

    #[test]
    fn missing_source_text_is_skipped() {
        let set = compile(
            r#"
            document_type = "Loan Estimate"
            [[rule]]
            field = "Rate Lock"
            pages = 1
            source = "text_layer"
            pattern = 'RATE LOCK\s+([^\n]+)'
            "#,
        );
        assert!(set.extract(&[ocr_page(1, "RATE LOCK x YES")], "le.pdf").is_empty());
    }

    #[test]
    fn flags_need_their_question_on_the_page() {
        let set = compile(
            r#"
            document_type = "Appraisal Report"
            [[rule]]
            field = "Financial Assistance"
            pages = 0
            pattern = 'financial assistance.*?\[\s*X\s*\]\s*No'
            dot_matches_newline = true
            value = { type = "flag", present = "No", absent = "Yes", anchor = 'financial assistance' }
            "#,
        );
        let marked = set.extract(&[ocr_page(0, "Financial assistance?\n[X] No [ ] Yes")], "a.pdf");
        let unmarked =
            set.extract(&[ocr_page(0, "Financial assistance?\n[ ] No [X] Yes")], "a.pdf");
        let unrelated = set.extract(&[ocr_page(0, "Bank statement. Balance $1,234.56")], "a.pdf");

        assert_eq!(values(&marked), [("Financial Assistance", "No")]);
        assert_eq!(values(&unmarked), [("Financial Assistance", "Yes")]);
        assert!(unrelated.is_empty());
    }

    #[test]
    fn flag_without_anchor_is_rejected() {
        let def = parse_rule_toml(
            "flag",
            r#"
            document_type = "Appraisal Report"
            [[rule]]
            field = "Financial Assistance"
            pages = 0
            pattern = 'x'
            value = { type = "flag", present = "No", absent = "Yes" }
            "#,
        );
        assert!(matches!(def, Err(RuleError::Toml { .. })));
    }

    #[test]
    fn templates_compose_groups() {
        let set = compile(
            r#"
            document_type = "Appraisal Report"
            [[rule]]
            field = "Property Address"
            pages = 0
            pattern = 'Property\s*Address\s*City\s+([A-Za-z\s]+?)\s+State\s+([A-Z]{2})'
            value = { type = "template", template = "City: {1}, State: {2}" }
            "#,
        );
        let fields = set.extract(
            &[ocr_page(0, "Property Address City  San Jose State CA Zip 95112")],
            "a.pdf",
        );
        assert_eq!(values(&fields), [("Property Address", "City: San Jose, State: CA")]);
    }

    #[test]
    fn template_copies_unmatched_braces() {
        let caps = Regex::new(r"(\d+)").unwrap().captures("360").unwrap();
        assert_eq!(fill_template("{1} months {x} {", &caps), "360 months {x} {");
        assert_eq!(fill_template("{9}", &caps), "");
    }

    #[test]
    fn join_lines_flattens_multiline_capture() {
        let set = compile(
            r#"
            document_type = "Loan Estimate"
            [[rule]]
            field = "Property"
            pages = 1
            pattern = 'PROPERTY\s+([\s\S]*?)SALE PRICE'
            value = { type = "join_lines" }
            "#,
        );
        let fields = set.extract(
            &[ocr_page(1, "PROPERTY 12 Elm St\nSpringfield, IL 62701\nSALE PRICE $400,000")],
            "le.pdf",
        );
        assert_eq!(values(&fields), [("Property", "12 Elm St Springfield, IL 62701")]);
    }

    #[test]
    fn whitespace_normalization_applies_before_matching() {
        let set = compile(
            r#"
            document_type = "Final 1009"
            normalize_whitespace = true
            [[rule]]
            field = "Borrower Name"
            pages = 0
            pattern = '''Borrower\s+([A-Za-z\s\.\-']+)'''
            "#,
        );
        let fields = set.extract(&[ocr_page(0, "Borrower\n\n  Jane   Q.\tDoe\n")], "f.pdf");
        assert_eq!(values(&fields), [("Borrower Name", "Jane Q. Doe")]);
    }

    #[test]
    fn pages_run_in_index_order_and_later_matches_follow() {
        let set = compile(
            r#"
            document_type = "Loan Estimate"
            [[rule]]
            field = "Estimated Cash to Close"
            pages = [1, 2]
            pattern = 'Estimated Cash to Close\s+\$?([\d,]+)'
            value = { type = "currency" }
            "#,
        );
        let fields = set.extract(
            &[
                ocr_page(2, "Estimated Cash to Close $20,000"),
                ocr_page(1, "Estimated Cash to Close $19,500"),
            ],
            "le.pdf",
        );
        let pages: Vec<u32> = fields.iter().map(|f| f.page_number).collect();
        assert_eq!(pages, [2, 3]);
    }

    #[test]
    fn needs_reports_sources_per_page() {
        let set = compile(
            r#"
            document_type = "Loan Estimate"
            [[rule]]
            field = "Loan Amount"
            pages = 1
            pattern = 'a'
            [[rule]]
            field = "Loan Type"
            pages = 1
            source = "text_layer"
            pattern = 'b'
            [[rule]]
            field = "Lender Name"
            pages = 3
            pattern = 'c'
            "#,
        );
        assert_eq!(
            set.needs(1),
            PageNeeds {
                ocr: true,
                text_layer: true
            }
        );
        assert_eq!(
            set.needs(3),
            PageNeeds {
                ocr: true,
                text_layer: false
            }
        );
        assert!(!set.needs(0).any());
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let def = parse_rule_toml(
            "bad",
            r#"
            document_type = "Fee Worksheet"
            [[rule]]
            field = "Total Fees"
            pages = 0
            pattern = '(unclosed'
            "#,
        )
        .unwrap();
        let err = RuleSet::compile(def).unwrap_err();
        assert!(matches!(err, RuleError::Regex { ref field, .. } if field == "Total Fees"));
    }
}
