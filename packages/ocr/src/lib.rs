#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Optical character recognition for rasterized pages.
//!
//! [`OcrEngine`] turns page images into text. [`tesseract::TesseractOcr`]
//! drives the Tesseract CLI; [`PassthroughOcr`] treats the image bytes as
//! already-recognized UTF-8 text, which is what test fixtures and
//! pre-OCR'd inputs provide. [`pool::OcrPool`] caps how many recognitions
//! run at once across every document in a batch.

pub mod pool;
pub mod tesseract;

use async_trait::async_trait;

pub use pool::OcrPool;
pub use tesseract::TesseractOcr;

/// Errors specific to OCR.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    /// The OCR tool could not be launched or exited unsuccessfully.
    #[error("{tool} failed: {message}")]
    Tool {
        /// Name of the tool binary.
        tool: String,
        /// Captured stderr or launch error.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The recognized text is not valid UTF-8.
    #[error("OCR output is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Recognizes text in a page image.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Returns the text found in `image` (PNG bytes).
    ///
    /// # Errors
    ///
    /// Returns [`OcrError`] if recognition fails.
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;

    /// Short engine name for log messages.
    fn name(&self) -> &'static str;
}

/// An engine whose "images" are already UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughOcr;

#[async_trait]
impl OcrEngine for PassthroughOcr {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        Ok(String::from_utf8(image.to_vec())?)
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passthrough_returns_bytes_as_text() {
        let text = PassthroughOcr.recognize(b"Loan Amount $350,000").await.unwrap();
        assert_eq!(text, "Loan Amount $350,000");
    }

    #[tokio::test]
    async fn passthrough_rejects_binary() {
        let err = PassthroughOcr.recognize(&[0xff, 0xfe, 0x00]).await.unwrap_err();
        assert!(matches!(err, OcrError::InvalidUtf8(_)));
    }
}
