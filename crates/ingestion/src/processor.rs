//! Batch processor
//!
//! Core logic for one processing run: docket parsing, invoice extraction,
//! and report assembly. Blocking; callers on an async runtime should run it
//! on a blocking thread.

use crate::docket::{build_shunt_map, parse_shunt_docket, ShuntMap};
use crate::errors::IngestionError;
use crate::invoice::{build_invoice_report, parse_invoice};
use crate::knowledge::KnowledgeBase;
use crate::ocr::OcrEngine;
use crate::pdf::extract_text_from_pdf;
use crate::sheets::Report;
use fuelforge_common::config::InvoiceConfig;
use fuelforge_common::metrics;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Turns uploaded invoice and docket PDFs into a [`Report`]
#[derive(Clone)]
pub struct BatchProcessor {
    codes: InvoiceConfig,
    ocr: Option<Arc<dyn OcrEngine>>,
}

impl BatchProcessor {
    pub fn new(codes: InvoiceConfig, ocr: Option<Arc<dyn OcrEngine>>) -> Self {
        Self { codes, ocr }
    }

    /// Extract a document's text, logging and swallowing failures
    fn extract(&self, path: &Path) -> Option<String> {
        match extract_text_from_pdf(path, self.ocr.as_deref()) {
            Ok(text) => Some(text),
            Err(IngestionError::NoText { .. }) => {
                warn!(path = %path.display(), "No text extracted");
                None
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Text extraction failed");
                None
            }
        }
    }

    /// Parse every recognizable shunt docket
    #[instrument(skip(self, paths), fields(dockets = paths.len()))]
    pub fn parse_dockets(&self, paths: &[PathBuf]) -> ShuntMap {
        let dockets = paths.iter().filter_map(|path| {
            let docket = self.extract(path).and_then(|text| parse_shunt_docket(&text));
            metrics::record_docket(docket.is_some());
            match &docket {
                Some(d) => info!(
                    path = %path.display(),
                    docket = %d.docket_number,
                    shunt_qty = d.shunt_qty,
                    "Parsed shunt docket"
                ),
                None => warn!(path = %path.display(), "Docket not recognized"),
            }
            docket
        });
        build_shunt_map(dockets)
    }

    /// Build the sheets for one invoice, `None` when its text cannot be read
    #[instrument(skip(self, path, knowledge, shunts), fields(path = %path.display()))]
    pub fn process_invoice(
        &self,
        path: &Path,
        knowledge: &KnowledgeBase,
        shunts: &ShuntMap,
    ) -> Option<Report> {
        let Some(text) = self.extract(path) else {
            metrics::record_invoice(false);
            return None;
        };

        let parsed = parse_invoice(&text);
        let report = build_invoice_report(&parsed, knowledge, shunts, &self.codes);
        metrics::record_invoice(true);

        info!(
            invoice_no = parsed.invoice_no.as_deref().unwrap_or("Not Found"),
            deliveries = parsed.deliveries.len(),
            tracking_rows = report.fuel_tracking.len(),
            "Invoice processed"
        );
        Some(report)
    }

    /// Process a whole upload batch. Dockets are parsed first so invoices can see the shunt quantities.
    pub fn process(
        &self,
        invoices: &[PathBuf],
        dockets: &[PathBuf],
        knowledge: &KnowledgeBase,
    ) -> Report {
        let timer = metrics::ProcessingTimer::start();
        let shunts = self.parse_dockets(dockets);

        let mut report = Report::default();
        let mut processed = 0usize;
        for path in invoices {
            if let Some(invoice_report) = self.process_invoice(path, knowledge, &shunts) {
                report.extend(invoice_report);
                processed += 1;
            }
        }

        let duration_secs = timer.finish();
        info!(
            invoices = invoices.len(),
            processed,
            dockets = shunts.len(),
            duration_secs,
            "Batch processed"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::FinancialCalendar;
    use crate::testutil::{scratch_dir, write_pdf};

    fn knowledge() -> KnowledgeBase {
        KnowledgeBase {
            calendar: FinancialCalendar::from_reader("Date,Week\n05/01/2024,FY24 WK27\n".as_bytes()).unwrap(),
            ..KnowledgeBase::default()
        }
    }

    #[test]
    fn test_process_batch_with_shunt_docket() {
        let dir = scratch_dir("processor");
        let invoice = write_pdf(
            &dir,
            "invoice.pdf",
            &[&[
                "Invoice Number 555",
                "Invoice Date 06 Jan 2024",
                "Delivery Docket Number / Date: 3001 / 05 Jan 2024",
                "ULSD 10PPM 2,000 L 2.00000 4,000.00",
            ]],
        );
        let docket = write_pdf(
            &dir,
            "docket.pdf",
            &[&["Delivery Docket No.: 3001", "ATTSHUNT 500"]],
        );
        let unreadable = dir.join("missing.pdf");

        let processor = BatchProcessor::new(InvoiceConfig::default(), None);
        let report = processor.process(&[invoice, unreadable], &[docket], &knowledge());

        assert_eq!(report.checklist.len(), 1);
        assert_eq!(report.checklist[0].invoice_no, "555");
        assert_eq!(report.data_sheet.len(), 2);
        assert_eq!(report.data_sheet[0].amount_less_gst, "3000.00");
        assert_eq!(report.data_sheet[1].amount_less_gst, "1000.00");
        assert_eq!(report.fuel_tracking[0].shunt_qty, 500);
        assert_eq!(report.fuel_tracking[0].fy_wk, "FY24 WK27");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_batch_keeps_totals_per_invoice() {
        let dir = scratch_dir("batch-totals");
        let first = write_pdf(
            &dir,
            "first.pdf",
            &[&[
                "Invoice Number 555",
                "Invoice Date 06 Jan 2024",
                "Delivery Docket Number / Date: 3001 / 05 Jan 2024",
                "ULSD 10PPM 2,000 L 2.00000 4,000.00",
                "Delivery Docket Number / Date: 3002 / 05 Jan 2024",
                "ULSD 10PPM 1,000 L 2.00000 2,000.00",
            ]],
        );
        let second = write_pdf(
            &dir,
            "second.pdf",
            &[&[
                "Invoice Number 777",
                "Invoice Date 06 Jan 2024",
                "Delivery Docket Number / Date: 3003 / 05 Jan 2024",
                "ULSD 10PPM 3,000 L 1.50000 4,500.00",
            ]],
        );
        let docket = write_pdf(
            &dir,
            "docket.pdf",
            &[&["Delivery Docket No.: 3001", "ATTSHUNT 500"]],
        );

        let processor = BatchProcessor::new(InvoiceConfig::default(), None);
        let report = processor.process(&[first, second], &[docket], &knowledge());

        let checklist: Vec<&str> = report.checklist.iter().map(|r| r.invoice_no.as_str()).collect();
        assert_eq!(checklist, vec!["555", "777"]);
        assert_eq!(report.checklist[0].excl_gst, "6000.00");
        assert_eq!(report.checklist[1].excl_gst, "4500.00");

        let data_sheet: Vec<(&str, &str)> = report
            .data_sheet
            .iter()
            .map(|r| (r.invoice_no.as_str(), r.amount_less_gst.as_str()))
            .collect();
        assert_eq!(
            data_sheet,
            vec![("555", "5000.00"), ("555", "1000.00"), ("777", "4500.00")]
        );

        let tracking = &report.fuel_tracking;
        assert_eq!(tracking.len(), 3);
        assert_eq!(tracking[0].invoice, "555");
        assert_eq!(tracking[0].invoice_diff, "");
        assert_eq!(tracking[0].trailer_total, "3000.00");

        assert_eq!(tracking[1].invoice, "555");
        assert_eq!(tracking[1].invoice_diff, "$6000.00");
        assert_eq!(tracking[1].trailer_total, "$5000.00");
        assert_eq!(tracking[1].shunt_total, "500");

        assert_eq!(tracking[2].invoice, "777");
        assert_eq!(tracking[2].invoice_diff, "$4500.00");
        assert_eq!(tracking[2].trailer_total, "$4500.00");
        assert_eq!(tracking[2].shunt_total, "0");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_unreadable_invoices_give_empty_report() {
        let processor = BatchProcessor::new(InvoiceConfig::default(), None);
        let report = processor.process(&[PathBuf::from("/nonexistent/a.pdf")], &[], &knowledge());
        assert!(report.is_empty());
    }

    #[test]
    fn test_unrecognized_docket_is_ignored() {
        let dir = scratch_dir("dockets");
        let docket = write_pdf(&dir, "docket.pdf", &[&["Just a letter"]]);

        let processor = BatchProcessor::new(InvoiceConfig::default(), None);
        assert!(processor.parse_dockets(&[docket]).is_empty());

        let _ = std::fs::remove_dir_all(dir);
    }
}
