#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Classification and field extraction for mortgage documents.
//!
//! A document's type is read from its page footers ([`classifier`]). Each
//! type has a data-driven rule table ([`rule_def`], [`registry`]) that one
//! generic interpreter ([`rules`]) runs against OCR text and the PDF text
//! layer. The resulting raw tuples are folded into flat records over the
//! canonical field schema ([`assembler`]). [`pipeline`] wires these
//! together over injected PDF and OCR backends.

pub mod assembler;
pub mod classifier;
pub mod config;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod rule_def;
pub mod rules;

pub use assembler::Assembler;
pub use classifier::classify;
pub use config::{ConfigError, MiscellaneousPolicy, PipelineConfig};
pub use pipeline::{
    BatchReport, Classification, DocumentInput, DocumentResult, ExtractedDocument, Pipeline,
    PipelineError,
};
pub use registry::RuleRegistry;
pub use rule_def::RuleError;
pub use rules::{PageText, RuleSet};
