//! Pipeline configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `LOAN_DOCS_*` environment variables. Command-line flags are applied on
//! top by the binary.

use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    str::FromStr,
};

use loan_docs_ocr::tesseract::{DEFAULT_BINARY, DEFAULT_LANGUAGE};
use loan_docs_pdf::{DEFAULT_DPI, footer::DEFAULT_FOOTER_THRESHOLD};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Rasterization resolution (dots per inch).
pub const ENV_DPI: &str = "LOAN_DOCS_DPI";
/// Maximum concurrent OCR calls.
pub const ENV_OCR_CONCURRENCY: &str = "LOAN_DOCS_OCR_CONCURRENCY";
/// Maximum documents processed at once.
pub const ENV_DOCUMENT_CONCURRENCY: &str = "LOAN_DOCS_DOCUMENT_CONCURRENCY";
/// `skip` or `generic`.
pub const ENV_MISCELLANEOUS: &str = "LOAN_DOCS_MISCELLANEOUS";
/// Directory of rule table overrides.
pub const ENV_RULES_DIR: &str = "LOAN_DOCS_RULES_DIR";
/// Tesseract binary.
pub const ENV_TESSERACT: &str = "LOAN_DOCS_TESSERACT";

const DEFAULT_DOCUMENT_CONCURRENCY: usize = 4;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has unknown keys.
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// An environment variable has an unparseable value.
    #[error("Invalid value {value:?} for {var}: {message}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        message: String,
    },

    /// A value is out of range.
    #[error("Invalid config value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// What to do with documents classified as Miscellaneous.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MiscellaneousPolicy {
    /// Classify only; emit no records.
    #[default]
    Skip,
    /// Run the generic rule set on every page.
    Generic,
}

/// Settings for a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Rasterization resolution for OCR.
    pub dpi: u32,
    /// Maximum OCR calls in flight across all documents.
    pub ocr_concurrency: usize,
    /// Maximum documents processed at once.
    pub document_concurrency: usize,
    /// Fraction of page height below which text is footer.
    pub footer_threshold: f64,
    /// Handling of unclassified documents.
    pub miscellaneous: MiscellaneousPolicy,
    /// Directory of rule tables replacing the built-in ones.
    pub rules_dir: Option<PathBuf>,
    /// Tesseract binary name or path.
    pub tesseract: String,
    /// Tesseract language.
    pub language: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            ocr_concurrency: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            document_concurrency: DEFAULT_DOCUMENT_CONCURRENCY,
            footer_threshold: DEFAULT_FOOTER_THRESHOLD,
            miscellaneous: MiscellaneousPolicy::default(),
            rules_dir: None,
            tesseract: DEFAULT_BINARY.to_owned(),
            language: DEFAULT_LANGUAGE.to_owned(),
        }
    }
}

impl PipelineConfig {
    /// Loads defaults, then `path` (if given), then the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// environment variable or resulting value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML config file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Toml`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses a TOML config. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] on malformed input or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(text)?)
    }

    /// Overrides values from `LOAN_DOCS_*` variables looked up via `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if a variable does not parse.
    pub fn apply_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(dpi) = parse_env(&lookup, ENV_DPI)? {
            self.dpi = dpi;
        }
        if let Some(n) = parse_env(&lookup, ENV_OCR_CONCURRENCY)? {
            self.ocr_concurrency = n;
        }
        if let Some(n) = parse_env(&lookup, ENV_DOCUMENT_CONCURRENCY)? {
            self.document_concurrency = n;
        }
        if let Some(policy) = parse_env(&lookup, ENV_MISCELLANEOUS)? {
            self.miscellaneous = policy;
        }
        if let Some(dir) = lookup(ENV_RULES_DIR).filter(|v| !v.is_empty()) {
            self.rules_dir = Some(PathBuf::from(dir));
        }
        if let Some(binary) = lookup(ENV_TESSERACT).filter(|v| !v.is_empty()) {
            self.tesseract = binary;
        }
        Ok(self)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero DPI, zero concurrency,
    /// or a footer threshold outside `(0, 1)`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, message: &str| {
            Err(ConfigError::Invalid {
                field,
                message: message.to_owned(),
            })
        };

        if self.dpi == 0 {
            return invalid("dpi", "must be positive");
        }
        if self.ocr_concurrency == 0 {
            return invalid("ocr_concurrency", "must be positive");
        }
        if self.document_concurrency == 0 {
            return invalid("document_concurrency", "must be positive");
        }
        if !(self.footer_threshold > 0.0 && self.footer_threshold < 1.0) {
            return invalid("footer_threshold", "must be between 0 and 1");
        }
        Ok(())
    }
}

fn parse_env<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };

    match value.trim().parse::<T>() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => Err(ConfigError::InvalidEnv {
            var,
            message: e.to_string(),
            value,
        }),
    }
}
