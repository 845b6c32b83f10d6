//! Rule registry: loads every rule table from embedded TOML.
//!
//! Each `.toml` file in `packages/extract/rules/` is baked into the binary
//! at compile time via [`include_str!`]. Supporting a new layout means
//! writing a new table and adding it to the list below. Tables can also be
//! overridden at runtime from a directory (see
//! [`RuleRegistry::with_overrides_from_dir`]).

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use loan_docs_document_models::{DocumentType, FieldSchema};

use crate::{
    config::MiscellaneousPolicy,
    rule_def::{RuleError, RuleSetDef, parse_rule_toml},
    rules::RuleSet,
};

/// Rule tables embedded at compile time.
const RULE_TOMLS: &[(&str, &str)] = &[
    ("loan_estimate", include_str!("../rules/loan_estimate.toml")),
    (
        "closing_disclosure",
        include_str!("../rules/closing_disclosure.toml"),
    ),
    (
        "appraisal_report",
        include_str!("../rules/appraisal_report.toml"),
    ),
    ("fee_worksheet", include_str!("../rules/fee_worksheet.toml")),
    ("final_1009", include_str!("../rules/final_1009.toml")),
    ("miscellaneous", include_str!("../rules/miscellaneous.toml")),
];

/// Parses every embedded rule table.
///
/// # Errors
///
/// Returns [`RuleError::Toml`] if an embedded table is malformed.
pub fn builtin_definitions() -> Result<Vec<RuleSetDef>, RuleError> {
    RULE_TOMLS
        .iter()
        .map(|(name, toml)| parse_rule_toml(name, toml))
        .collect()
}

/// Compiled rule sets keyed by document type.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    sets: BTreeMap<DocumentType, RuleSet>,
}

impl RuleRegistry {
    /// Compiles the embedded rule tables.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if an embedded table is malformed.
    pub fn builtin() -> Result<Self, RuleError> {
        Self::from_definitions(builtin_definitions()?)
    }

    /// Compiles `defs`, rejecting two tables for the same document type.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Duplicate`] or a compile error.
    pub fn from_definitions(defs: Vec<RuleSetDef>) -> Result<Self, RuleError> {
        let mut sets = BTreeMap::new();

        for def in defs {
            let document_type = def.document_type;
            warn_unknown_fields(&def);
            if sets.insert(document_type, RuleSet::compile(def)?).is_some() {
                return Err(RuleError::Duplicate(document_type));
            }
        }

        Ok(Self { sets })
    }

    /// Replaces rule sets with the `*.toml` tables found in `dir`.
    ///
    /// Each table replaces the built-in set for its document type. Files
    /// are read in name order.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if the directory cannot be read, a table is
    /// malformed, or two tables target the same document type.
    pub fn with_overrides_from_dir(mut self, dir: &Path) -> Result<Self, RuleError> {
        let mut paths = std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        paths.retain(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("toml")));
        paths.sort();

        let mut seen = BTreeSet::new();

        for path in paths {
            let name = path
                .file_stem()
                .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());
            let def = parse_rule_toml(&name, &std::fs::read_to_string(&path)?)?;
            let document_type = def.document_type;

            if !seen.insert(document_type) {
                return Err(RuleError::Duplicate(document_type));
            }

            warn_unknown_fields(&def);
            log::info!(
                "Overriding {document_type} rules from {} ({} rules)",
                path.display(),
                def.rules.len()
            );
            self.sets.insert(document_type, RuleSet::compile(def)?);
        }

        Ok(self)
    }

    /// The rule set to run for `document_type`, if any.
    ///
    /// Miscellaneous documents only get a rule set under
    /// [`MiscellaneousPolicy::Generic`].
    #[must_use]
    pub fn rule_set(
        &self,
        document_type: DocumentType,
        miscellaneous: MiscellaneousPolicy,
    ) -> Option<&RuleSet> {
        if document_type == DocumentType::Miscellaneous
            && miscellaneous == MiscellaneousPolicy::Skip
        {
            return None;
        }
        self.sets.get(&document_type)
    }

    /// All rule sets, ordered by document type.
    pub fn iter(&self) -> impl Iterator<Item = &RuleSet> {
        self.sets.values()
    }

    /// Number of rule sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether no rule sets are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

fn warn_unknown_fields(def: &RuleSetDef) {
    let schema = FieldSchema::canonical();
    for rule in &def.rules {
        if schema.lookup(&rule.field).is_none() {
            log::warn!(
                "{} rule writes {:?}, which is not a canonical field; its values will be dropped",
                def.document_type,
                rule.field
            );
        }
    }
}
