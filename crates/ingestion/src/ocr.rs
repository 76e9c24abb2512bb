//! OCR fallback for scanned pages

use crate::errors::IngestionError;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;
use uuid::Uuid;

/// Turns an image into text
pub trait OcrEngine: Send + Sync {
    /// Recognize the text in an encoded image. `extension` is the image file type (`jpg`, `png`).
    fn recognize(&self, image: &[u8], extension: &str) -> Result<String, IngestionError>;

    /// Whether the engine can currently be invoked
    fn is_available(&self) -> bool;
}

/// Runs the `tesseract` command line tool
#[derive(Debug, Clone)]
pub struct TesseractCli {
    command: String,
    language: String,
}

impl TesseractCli {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }

    fn scratch_path(extension: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fuelforge-ocr-{}.{}", Uuid::new_v4(), extension))
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &[u8], extension: &str) -> Result<String, IngestionError> {
        let path = Self::scratch_path(extension);
        std::fs::write(&path, image)?;

        let output = Command::new(&self.command)
            .arg(&path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output();

        // The scratch image is removed whatever tesseract did
        let _ = std::fs::remove_file(&path);

        let output = output.map_err(|e| {
            IngestionError::Ocr(format!("failed to run '{}': {}", self.command, e))
        })?;

        if !output.status.success() {
            return Err(IngestionError::Ocr(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(chars = text.len(), "Tesseract recognized text");
        Ok(text)
    }

    fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}
