//! Output sheets and their CSV / HTML renderings

use crate::errors::IngestionError;
use serde::{Deserialize, Serialize};
use std::io;

/// A row of one of the output sheets
pub trait SheetRow {
    /// Column headers, in output order
    const HEADERS: &'static [&'static str];

    /// Cell values, one per header
    fn cells(&self) -> Vec<String>;
}

/// Accounts payable upload row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSheetRow {
    pub vendor_name: String,
    pub vendor_no: String,
    pub invoice_no: String,
    pub invoice_date: String,
    pub gl_no: u32,
    pub trade_dept: String,
    pub merch_dept: String,
    pub store: u32,
    pub amount_less_gst: String,
    pub gst_amount: String,
    pub invoice_total: String,
    pub vendor_line_text: String,
    pub store_line_text: String,
    pub comments: String,
    pub week_ending: String,
    pub week_count_line_text: String,
}

impl SheetRow for DataSheetRow {
    const HEADERS: &'static [&'static str] = &[
        "Vendor Name (Check)",
        "Vendor No.",
        "Invoice No.",
        "Invoice Date",
        "GL No.",
        "Trade Dept",
        "Merch Dept",
        "Store",
        "Amount (Less GST)",
        "GST Amount",
        "Invoice Total (Incl of GST)",
        "Vendor Line Text (Optional) Not required for Zone Office Uploads",
        "Store Line Text (Optional)",
        "Comments",
        "Week Ending",
        "WeekCount Line Text",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.vendor_name.clone(),
            self.vendor_no.clone(),
            self.invoice_no.clone(),
            self.invoice_date.clone(),
            self.gl_no.to_string(),
            self.trade_dept.clone(),
            self.merch_dept.clone(),
            self.store.to_string(),
            self.amount_less_gst.clone(),
            self.gst_amount.clone(),
            self.invoice_total.clone(),
            self.vendor_line_text.clone(),
            self.store_line_text.clone(),
            self.comments.clone(),
            self.week_ending.clone(),
            self.week_count_line_text.clone(),
        ]
    }
}

/// Per-invoice summary row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistRow {
    pub vendor: String,
    pub vendor_no: String,
    pub invoice_no: String,
    pub excl_gst: String,
    pub gst_amount: String,
    pub invoice_total: String,
}

impl SheetRow for ChecklistRow {
    const HEADERS: &'static [&'static str] = &[
        "Vendor",
        "Vendor #",
        "Invoice No.",
        "Exc GST",
        "GST Amount",
        "Invoice Total (Incl of GST)",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.vendor.clone(),
            self.vendor_no.clone(),
            self.invoice_no.clone(),
            self.excl_gst.clone(),
            self.gst_amount.clone(),
            self.invoice_total.clone(),
        ]
    }
}

/// Per-delivery fuel tracking row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelTrackingRow {
    pub invoice: String,
    pub invoice_date: String,
    pub excl_gst: String,
    pub gst: String,
    pub incl_gst: String,
    pub delivery_date: String,
    pub fy_wk: String,
    pub docket: String,
    pub total_litres: i64,
    pub shunt_qty: i64,
    pub trailer_litres: i64,
    pub unit_price: String,
    pub shunt_cost: String,
    pub invoice_diff: String,
    pub trailer_total: String,
    pub shunt_total: String,
    pub uploading_wk: String,
}

impl SheetRow for FuelTrackingRow {
    const HEADERS: &'static [&'static str] = &[
        "Invoice",
        "Invoice Date",
        "excl GST",
        "GST",
        "incl GST",
        "Delivery Date",
        "FY WK",
        "Docket",
        "Total Litres QTY",
        "SHUNT QTY",
        "Trailer litres",
        "UNIT PRICE",
        "SHUNT COST",
        "INVOICE DIFF",
        "Trailer total",
        "SHUNT Total",
        "Uploading WK",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.invoice.clone(),
            self.invoice_date.clone(),
            self.excl_gst.clone(),
            self.gst.clone(),
            self.incl_gst.clone(),
            self.delivery_date.clone(),
            self.fy_wk.clone(),
            self.docket.clone(),
            self.total_litres.to_string(),
            self.shunt_qty.to_string(),
            self.trailer_litres.to_string(),
            self.unit_price.clone(),
            self.shunt_cost.clone(),
            self.invoice_diff.clone(),
            self.trailer_total.clone(),
            self.shunt_total.clone(),
            self.uploading_wk.clone(),
        ]
    }
}

/// The three output sheets, for one invoice or a whole batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub data_sheet: Vec<DataSheetRow>,
    pub checklist: Vec<ChecklistRow>,
    pub fuel_tracking: Vec<FuelTrackingRow>,
}

impl Report {
    /// Append another report's rows after this one's
    pub fn extend(&mut self, other: Report) {
        self.data_sheet.extend(other.data_sheet);
        self.checklist.extend(other.checklist);
        self.fuel_tracking.extend(other.fuel_tracking);
    }

    /// True when no invoice contributed to the report
    pub fn is_empty(&self) -> bool {
        self.data_sheet.is_empty() && self.checklist.is_empty()
    }

    /// Checklist, data sheet and fuel tracking sheet as one CSV document
    pub fn to_combined_csv(&self) -> Result<String, IngestionError> {
        let mut output = write_csv(&self.checklist)?;
        output.push_str("\n\n--- Data Sheet ---\n");
        output.push_str(&write_csv(&self.data_sheet)?);
        output.push_str("\n\n--- Fuel Tracking Sheet ---\n");
        output.push_str(&write_csv(&self.fuel_tracking)?);
        Ok(output)
    }
}

/// Write rows as CSV with a header line and `\n` terminators
pub fn write_csv<R: SheetRow>(rows: &[R]) -> Result<String, IngestionError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(R::HEADERS)?;
    for row in rows {
        writer.write_record(row.cells())?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

/// Render rows as an HTML table
pub fn render_table<R: SheetRow>(rows: &[R]) -> String {
    let mut html = String::from("<table class=\"table table-striped\">\n  <thead>\n    <tr>");
    for header in R::HEADERS {
        html.push_str("<th>");
        html.push_str(&escape_html(header));
        html.push_str("</th>");
    }
    html.push_str("</tr>\n  </thead>\n  <tbody>\n");

    for row in rows {
        html.push_str("    <tr>");
        for cell in row.cells() {
            html.push_str("<td>");
            html.push_str(&escape_html(&cell));
            html.push_str("</td>");
        }
        html.push_str("</tr>\n");
    }

    html.push_str("  </tbody>\n</table>");
    html
}

/// Escape text for HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
