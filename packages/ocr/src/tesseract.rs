//! Tesseract CLI engine.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt as _, process::Command};

use crate::{OcrEngine, OcrError};

/// Default Tesseract binary name.
pub const DEFAULT_BINARY: &str = "tesseract";

/// Default recognition language.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Runs `tesseract stdin stdout -l <language>` per image.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
    language: String,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY, DEFAULT_LANGUAGE)
    }
}

impl TesseractOcr {
    /// Creates an engine using `binary` and `language`.
    #[must_use]
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    /// The language passed to `-l`.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    fn tool_error(&self, message: String) -> OcrError {
        OcrError::Tool {
            tool: self.binary.clone(),
            message,
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.tool_error(format!("failed to launch: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(image).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(self.tool_error(format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8(output.stdout)?;
        log::trace!(
            "{} recognized {} chars from {}-byte image",
            self.binary,
            text.len(),
            image.len()
        );
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "tesseract"
    }
}
