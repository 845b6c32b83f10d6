#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Document types, the canonical field schema, and the structured record
//! format shared by every stage of the extraction pipeline.
//!
//! Every document type produces [`StructuredRecord`]s that carry the full
//! [`FieldSchema`], so downstream consumers can rely on the presence of
//! every key regardless of which layout a page came from.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// The closed set of document layouts the classifier can detect.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
    EnumIter,
)]
pub enum DocumentType {
    /// TRID Loan Estimate (H-24 form family)
    #[serde(rename = "Loan Estimate")]
    #[strum(serialize = "Loan Estimate")]
    LoanEstimate,
    /// TRID Closing Disclosure (H-25 form family)
    #[serde(rename = "Closing Disclosure")]
    #[strum(serialize = "Closing Disclosure")]
    ClosingDisclosure,
    /// Uniform Residential Loan Application (Fannie Mae Form 1003)
    #[serde(rename = "1003 Application")]
    #[strum(serialize = "1003 Application")]
    Form1003,
    /// Final Fannie Mae Form 1009
    #[serde(rename = "Final 1009")]
    #[strum(serialize = "Final 1009")]
    Final1009,
    /// Residential appraisal report produced by `ClickFORMS`
    #[serde(rename = "Appraisal Report")]
    #[strum(serialize = "Appraisal Report")]
    AppraisalReport,
    /// Calyx fee worksheet
    #[serde(rename = "Fee Worksheet")]
    #[strum(serialize = "Fee Worksheet")]
    FeeWorksheet,
    /// Ticor Title preliminary report
    #[serde(rename = "Ticor Title")]
    #[strum(serialize = "Ticor Title")]
    TicorTitle,
    /// Anything the classifier could not place
    #[serde(rename = "Miscellaneous")]
    #[strum(serialize = "Miscellaneous")]
    Miscellaneous,
}

impl DocumentType {
    /// Returns the human-readable label used in serialized output.
    #[must_use]
    pub fn label(self) -> &'static str {
        self.into()
    }
}

/// Stable identifiers of the canonical output schema.
///
/// The serialized (`snake_case`) form of each variant is a versioned
/// contract: variants may be added, never renamed or removed. Declaration
/// order is the column order of serialized records.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldId {
    // ── Appraisal report ────────────────────────────────────────────
    PropertyAddress,
    TaxYear,
    CensusTract,
    PropertyRightsAppraised,
    NeighborhoodName,
    AssignmentType,
    CurrentlyOfferedForSale,
    DataSource,
    ListDate,
    SellerIsOwnerOfRecord,
    FinancialAssistance,
    Location,
    PropertyValues,
    BuiltUp,
    DemandSupply,
    Growth,
    MarketingTime,
    PriceRangeOneUnit,
    Dimensions,
    Area,
    Shape,
    View,
    ZoningCompliance,
    Utilities,
    // ── Loan terms and costs ────────────────────────────────────────
    LoanAmount,
    InterestRate,
    Product,
    Purpose,
    LoanTerm,
    Borrower,
    OriginationCharges,
    ServicesBorrowerDidShopFor,
    InitialEscrowPaymentAtClosing,
    TotalOtherCosts,
    TotalPayoffsAndPayments,
    InitialEscrowPayment,
    OriginationFee,
    TitleFee,
    RecordingFee,
    TotalFees,
    BorrowerName,
    PropertyField,
    SalePrice,
    LoanType,
    RateLock,
    EstimatedClosingCosts,
    ServicesYouCannotShopFor,
    ServicesYouCanShopFor,
    TotalClosingCosts,
    EstimatedCashToClose,
    LenderName,
    LoanOfficerName,
    LoanOfficerEmail,
    LoanOfficerPhone,
    DateIssued,
    TotalLoanCosts,
}

impl FieldId {
    /// Returns the human-readable field name that extraction rules emit.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PropertyAddress => "Property Address",
            Self::TaxYear => "Tax Year",
            Self::CensusTract => "Census Tract",
            Self::PropertyRightsAppraised => "Property Rights Appraised",
            Self::NeighborhoodName => "Neighborhood Name",
            Self::AssignmentType => "Assignment Type",
            Self::CurrentlyOfferedForSale => "Currently Offered for Sale",
            Self::DataSource => "Data Source",
            Self::ListDate => "List Date",
            Self::SellerIsOwnerOfRecord => "Seller is Owner of Record",
            Self::FinancialAssistance => "Financial Assistance",
            Self::Location => "Location",
            Self::PropertyValues => "Property Values",
            Self::BuiltUp => "Built-Up",
            Self::DemandSupply => "Demand/Supply",
            Self::Growth => "Growth",
            Self::MarketingTime => "Marketing Time",
            Self::PriceRangeOneUnit => "Price Range (One-Unit)",
            Self::Dimensions => "Dimensions",
            Self::Area => "Area",
            Self::Shape => "Shape",
            Self::View => "View",
            Self::ZoningCompliance => "Zoning Compliance",
            Self::Utilities => "Utilities",
            Self::LoanAmount => "Loan Amount",
            Self::InterestRate => "Interest Rate",
            Self::Product => "Product",
            Self::Purpose => "Purpose",
            Self::LoanTerm => "Loan Term",
            Self::Borrower => "Borrower",
            Self::OriginationCharges => "Origination Charges",
            Self::ServicesBorrowerDidShopFor => "Services Borrower Did Shop For",
            Self::InitialEscrowPaymentAtClosing => "Initial Escrow Payment at Closing",
            Self::TotalOtherCosts => "Total Other Costs",
            Self::TotalPayoffsAndPayments => "Total Payoffs and Payments",
            Self::InitialEscrowPayment => "Initial Escrow Payment",
            Self::OriginationFee => "Origination Fee",
            Self::TitleFee => "Title Fee",
            Self::RecordingFee => "Recording Fee",
            Self::TotalFees => "Total Fees",
            Self::BorrowerName => "Borrower Name",
            Self::PropertyField => "Property",
            Self::SalePrice => "Sale Price",
            Self::LoanType => "Loan Type",
            Self::RateLock => "Rate Lock",
            Self::EstimatedClosingCosts => "Estimated Closing Costs",
            Self::ServicesYouCannotShopFor => "Services You Cannot Shop For",
            Self::ServicesYouCanShopFor => "Services You Can Shop For",
            Self::TotalClosingCosts => "Total Closing Costs",
            Self::EstimatedCashToClose => "Estimated Cash to Close",
            Self::LenderName => "Lender Name",
            Self::LoanOfficerName => "Loan Officer Name",
            Self::LoanOfficerEmail => "Loan Officer Email",
            Self::LoanOfficerPhone => "Loan Officer Phone",
            Self::DateIssued => "Date Issued",
            Self::TotalLoanCosts => "Total Loan Costs",
        }
    }
}

static CANONICAL_SCHEMA: LazyLock<FieldSchema> =
    LazyLock::new(|| FieldSchema::new(FieldId::iter()));

/// Lookup table from human-readable field names to [`FieldId`]s.
///
/// The assembler receives a schema rather than consulting [`FieldId`]
/// directly, so a narrower schema can be substituted where needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    by_label: BTreeMap<&'static str, FieldId>,
}

impl FieldSchema {
    /// Builds a schema containing exactly the given fields.
    #[must_use]
    pub fn new(fields: impl IntoIterator<Item = FieldId>) -> Self {
        Self {
            by_label: fields.into_iter().map(|id| (id.label(), id)).collect(),
        }
    }

    /// Returns the shared schema containing every [`FieldId`].
    #[must_use]
    pub fn canonical() -> &'static Self {
        &CANONICAL_SCHEMA
    }

    /// Resolves a human-readable field name.
    #[must_use]
    pub fn lookup(&self, label: &str) -> Option<FieldId> {
        self.by_label.get(label).copied()
    }

    /// Iterates over the schema's identifiers in column order.
    pub fn ids(&self) -> impl Iterator<Item = FieldId> + '_ {
        let mut ids: Vec<FieldId> = self.by_label.values().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
    }

    /// Number of fields in the schema.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    /// Whether the schema has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }

    /// Returns a field map with every identifier set to `None`.
    #[must_use]
    pub fn empty_fields(&self) -> BTreeMap<FieldId, Option<String>> {
        self.by_label.values().map(|&id| (id, None)).collect()
    }
}

/// One value pulled out of a page by an extraction rule.
///
/// `field` is the human-readable name the rule declared; it is resolved
/// against the schema only at assembly time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawField {
    /// Human-readable field name (e.g. `"Loan Amount"`).
    pub field: String,
    /// Extracted value, always an opaque string.
    pub value: String,
    /// Name of the file the value came from.
    pub filename: String,
    /// 1-based page number.
    pub page_number: u32,
}

/// A flat per-page record carrying every canonical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredRecord {
    /// Source filename.
    pub filename: String,
    /// Type the whole document was classified as.
    pub document_type: DocumentType,
    /// 1-based page number.
    pub page_number: u32,
    /// Every schema field, `None` when nothing matched on this page.
    #[serde(flatten)]
    pub fields: BTreeMap<FieldId, Option<String>>,
}

impl StructuredRecord {
    /// Returns the value of `field`, if one was extracted.
    #[must_use]
    pub fn get(&self, field: FieldId) -> Option<&str> {
        self.fields.get(&field).and_then(Option::as_deref)
    }

    /// Whether every field of `schema` is present as a key.
    #[must_use]
    pub fn covers(&self, schema: &FieldSchema) -> bool {
        schema.ids().all(|id| self.fields.contains_key(&id))
    }
}

/// A rectangular run of text on a page, in PDF points with the origin at
/// the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Left edge.
    pub x0: f64,
    /// Top edge.
    pub y0: f64,
    /// Right edge.
    pub x1: f64,
    /// Bottom edge.
    pub y1: f64,
    /// Text content of the block.
    pub text: String,
}

/// All text blocks of one page plus the page dimensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageBlocks {
    /// Page width in points.
    pub width: f64,
    /// Page height in points.
    pub height: f64,
    /// Blocks in reading order.
    pub blocks: Vec<TextBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_type_labels_round_trip_through_strum() {
        for doc_type in DocumentType::iter() {
            let parsed: DocumentType = doc_type.label().parse().unwrap();
            assert_eq!(parsed, doc_type);
            assert_eq!(doc_type.to_string(), doc_type.label());
        }
    }

    #[test]
    fn canonical_schema_resolves_every_label() {
        let schema = FieldSchema::canonical();
        assert_eq!(schema.len(), FieldId::iter().count());
        for id in FieldId::iter() {
            assert_eq!(schema.lookup(id.label()), Some(id));
        }
        assert_eq!(schema.lookup("Not A Field"), None);
    }

    #[test]
    fn field_ids_use_stable_snake_case_names() {
        assert_eq!(FieldId::PropertyField.as_ref(), "property_field");
        assert_eq!(FieldId::PriceRangeOneUnit.as_ref(), "price_range_one_unit");
        assert_eq!(FieldId::DemandSupply.as_ref(), "demand_supply");
        assert_eq!(
            FieldId::InitialEscrowPaymentAtClosing.as_ref(),
            "initial_escrow_payment_at_closing"
        );
    }

    #[test]
    fn record_serializes_flat_with_nulls() {
        let schema = FieldSchema::canonical();
        let mut fields = schema.empty_fields();
        fields.insert(FieldId::LoanAmount, Some("$350,000".to_string()));
        let record = StructuredRecord {
            filename: "le.pdf".to_string(),
            document_type: DocumentType::LoanEstimate,
            page_number: 2,
            fields,
        };

        let json = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), schema.len() + 3);
        assert_eq!(obj["document_type"], "Loan Estimate");
        assert_eq!(obj["loan_amount"], "$350,000");
        assert!(obj["interest_rate"].is_null());

        let back: StructuredRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
        assert!(back.covers(schema));
    }
}
