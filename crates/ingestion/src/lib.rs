//! FuelForge Ingestion
//!
//! Turns fuel invoices and shunt delivery dockets into accounting sheets:
//! 1. Extracts PDF text (Tesseract OCR for scanned pages)
//! 2. Parses shunt dockets into a docket → litres map
//! 3. Parses invoices and splits litres between trailer and shunt stores
//! 4. Renders the data, checklist and fuel tracking sheets

pub mod docket;
pub mod errors;
pub mod invoice;
pub mod knowledge;
pub mod ocr;
pub mod pdf;
pub mod processor;
pub mod sheets;

#[cfg(test)]
pub(crate) mod testutil;

pub use errors::IngestionError;
pub use knowledge::KnowledgeBase;
pub use ocr::{OcrEngine, TesseractCli};
pub use processor::BatchProcessor;
pub use sheets::Report;
