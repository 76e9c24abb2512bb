//! Ingestion error types

use fuelforge_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("PDF parse error for {path}: {message}")]
    PdfParseError { path: String, message: String },

    #[error("No text content extracted from {path}")]
    NoText { path: String },

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Knowledge base error for {path}: {message}")]
    KnowledgeBase { path: String, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<IngestionError> for AppError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::KnowledgeBase { path, message } => AppError::KnowledgeBase { path, message },
            other => AppError::Ingestion {
                message: other.to_string(),
            },
        }
    }
}
