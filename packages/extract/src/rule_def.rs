//! Serializable field-extraction rule tables.
//!
//! A [`RuleSetDef`] is the TOML form of one document type's extraction
//! rules. Each `[[rule]]` names a canonical field label, the pages it
//! applies to, which text it reads (OCR or the embedded text layer), a
//! regular expression, and how the captures become the emitted value.
//!
//! ```toml
//! document_type = "Fee Worksheet"
//!
//! [[rule]]
//! field = "Loan Term"
//! pages = 0
//! pattern = 'Term/Due In[:\s]*(\d+)'
//! value = { type = "template", template = "{1} months" }
//! ```

use std::fmt;

use loan_docs_document_models::DocumentType;
use serde::Deserialize;
use strum_macros::{AsRefStr, Display};

/// Errors raised while loading or compiling rule tables.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// A rule table is not valid TOML or does not match the schema.
    #[error("Invalid rule table {name}: {source}")]
    Toml {
        /// Name of the table (file stem).
        name: String,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// A rule pattern failed to compile.
    #[error("Invalid pattern for {document_type} field {field:?}: {source}")]
    Regex {
        /// Document type owning the rule.
        document_type: DocumentType,
        /// Field label of the rule.
        field: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// Reading a rule table from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Two tables in the same directory target one document type.
    #[error("Duplicate rule table for {0}")]
    Duplicate(DocumentType),
}

/// One document type's rule table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSetDef {
    /// Document type label, e.g. `"Loan Estimate"`.
    pub document_type: DocumentType,
    /// Collapse every whitespace run in the page text to a single space
    /// (and trim) before matching.
    #[serde(default)]
    pub normalize_whitespace: bool,
    /// Rules in evaluation order.
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleDef>,
}

/// A single extraction rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDef {
    /// Human-readable canonical field label, e.g. `"Loan Amount"`.
    pub field: String,
    /// 0-based page indices the rule applies to.
    pub pages: PageSelector,
    /// Which page text the pattern runs against.
    #[serde(default)]
    pub source: TextSource,
    /// Regular expression. Capture group 1 is the value unless the
    /// transform says otherwise.
    pub pattern: String,
    /// Match ignoring case. On unless a rule turns it off.
    #[serde(default = "default_true")]
    pub case_insensitive: bool,
    /// Let `.` match line breaks.
    #[serde(default)]
    pub dot_matches_newline: bool,
    /// How the match becomes the emitted value.
    #[serde(default)]
    pub value: ValueTransform,
}

const fn default_true() -> bool {
    true
}

/// Page indices a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PageSelector {
    /// A single page.
    Index(usize),
    /// Several pages.
    Indices(Vec<usize>),
    /// Every page of the document.
    Every(AllPages),
}

/// The `"all"` page keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllPages {
    All,
}

impl PageSelector {
    /// Whether the page at `index` is selected.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        match self {
            Self::Index(i) => *i == index,
            Self::Indices(indices) => indices.contains(&index),
            Self::Every(AllPages::All) => true,
        }
    }
}

impl fmt::Display for PageSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Indices(indices) => {
                let list: Vec<String> = indices.iter().map(ToString::to_string).collect();
                f.write_str(&list.join(", "))
            }
            Self::Every(AllPages::All) => f.write_str("all"),
        }
    }
}

/// Source text for a rule.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TextSource {
    /// Text recognized from the rasterized page.
    #[default]
    Ocr,
    /// Text embedded in the PDF.
    TextLayer,
}

/// How a match becomes the emitted value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueTransform {
    /// Capture group 1, trimmed.
    #[default]
    Trim,
    /// Capture group 1, trimmed, with line breaks replaced by spaces.
    JoinLines,
    /// `"$"` followed by capture group 1 with whitespace removed.
    Currency,
    /// Capture group 1 as a line; the first group of `marker` within it
    /// when the marker is present, otherwise the whole line. `marker` is
    /// matched case-sensitively.
    Checkbox {
        /// Pattern locating the chosen option.
        marker: String,
    },
    /// `template` with `{n}` replaced by trimmed capture group `n`.
    Template {
        /// Output text with `{n}` placeholders.
        template: String,
    },
    /// `present` when the pattern matches. When it does not, `absent` if
    /// `anchor` matches and nothing otherwise. `anchor` uses the rule's
    /// matching options.
    Flag {
        /// Value for a marked answer.
        present: String,
        /// Value for an unmarked answer on a page that asks the question.
        absent: String,
        /// Label that shows the question is on the page.
        anchor: String,
    },
}

impl ValueTransform {
    /// Short name for listings.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Trim => "trim",
            Self::JoinLines => "join_lines",
            Self::Currency => "currency",
            Self::Checkbox { .. } => "checkbox",
            Self::Template { .. } => "template",
            Self::Flag { .. } => "flag",
        }
    }
}

/// Parses a rule table from a TOML string.
///
/// # Errors
///
/// Returns [`RuleError::Toml`] if the table is malformed.
pub fn parse_rule_toml(name: &str, toml_str: &str) -> Result<RuleSetDef, RuleError> {
    toml::de::from_str(toml_str).map_err(|source| RuleError::Toml {
        name: name.to_owned(),
        source,
    })
}
