//! Fuel invoice parsing and sheet assembly

use crate::docket::ShuntMap;
use crate::knowledge::KnowledgeBase;
use crate::sheets::{ChecklistRow, DataSheetRow, FuelTrackingRow, Report};
use chrono::NaiveDate;
use fuelforge_common::config::InvoiceConfig;
use regex_lite::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Marks the start of each delivery section on an invoice
pub const DELIVERY_SECTION_MARKER: &str = "Delivery Docket Number / Date:";

const GST_RATE: f64 = 0.1;
const NOT_FOUND: &str = "Not Found";
const INVOICE_DATE_FORMAT: &str = "%d %b %Y";

fn invoice_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Invoice Number\s*(\d+)").expect("valid invoice number regex"))
}

fn invoice_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Invoice Date\s*(\d{2} \w{3} \d{4})").expect("valid invoice date regex"))
}

fn section_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*(\d+)\s*/\s*(\d{2} \w{3} \d{4})").expect("valid section regex"))
}

fn data_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(ULSD 10PPM|Diesel)\s+([\d,]+)\s+L\s+([\d.]+)\s+([\d,]+\.\d{2})")
            .expect("valid data line regex")
    })
}

/// Litres and pricing on one delivery
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryLine {
    pub total_litres: i64,
    pub unit_price: f64,
    pub excl_gst: f64,
}

/// One delivery docket section of an invoice
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub docket_no: String,
    pub date: NaiveDate,
    pub line: Option<DeliveryLine>,
}

/// Fields read from an invoice's text
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInvoice {
    pub invoice_no: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub deliveries: Vec<Delivery>,
}

impl ParsedInvoice {
    /// Date of the last delivery section, used as the week ending date
    pub fn last_delivery_date(&self) -> Option<NaiveDate> {
        self.deliveries.last().map(|d| d.date)
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, INVOICE_DATE_FORMAT).ok()
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse().ok()
}

/// Read the header and delivery sections from invoice text
pub fn parse_invoice(text: &str) -> ParsedInvoice {
    let invoice_no = invoice_number_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    let invoice_date = invoice_date_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| {
            let date = parse_date(m.as_str());
            if date.is_none() {
                warn!(raw = m.as_str(), "Unparsable invoice date");
            }
            date
        });

    let mut deliveries = Vec::new();
    for section in text.split(DELIVERY_SECTION_MARKER).skip(1) {
        let Some(header) = section_header_re().captures(section) else {
            debug!("Delivery section without docket header, skipping");
            continue;
        };

        let docket_no = header[1].to_string();
        let Some(date) = parse_date(&header[2]) else {
            warn!(docket = %docket_no, raw = &header[2], "Unparsable delivery date, skipping section");
            continue;
        };

        let line = data_line_re().captures(section).and_then(|c| {
            let line = DeliveryLine {
                total_litres: c[2].replace(',', "").parse().ok()?,
                unit_price: c[3].parse().ok()?,
                excl_gst: parse_amount(&c[4])?,
            };
            Some(line)
        });

        if line.is_none() {
            debug!(docket = %docket_no, "Delivery section without a fuel line");
        }

        deliveries.push(Delivery {
            docket_no,
            date,
            line,
        });
    }

    ParsedInvoice {
        invoice_no,
        invoice_date,
        deliveries,
    }
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

/// Build the three sheets for one parsed invoice
pub fn build_invoice_report(
    invoice: &ParsedInvoice,
    knowledge: &KnowledgeBase,
    shunts: &ShuntMap,
    codes: &InvoiceConfig,
) -> Report {
    let vendor_name = codes.vendor_name.clone();
    let vendor_no = knowledge
        .vendors
        .vendor_number(&vendor_name)
        .unwrap_or(codes.vendor_no.as_str())
        .to_string();
    let invoice_no = invoice.invoice_no.clone().unwrap_or_else(|| NOT_FOUND.to_string());
    let invoice_date = invoice
        .invoice_date
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| NOT_FOUND.to_string());

    let mut fuel_tracking = Vec::new();
    let mut total_trailer_cost = 0.0;
    let mut total_shunt_cost = 0.0;
    let mut total_shunt_qty: i64 = 0;
    let mut total_excl_gst_lines = 0.0;

    for delivery in &invoice.deliveries {
        let Some(line) = &delivery.line else {
            continue;
        };

        let shunt_qty = shunts.get(&delivery.docket_no).map_or(0, |s| s.shunt_qty);
        let trailer_litres = line.total_litres - shunt_qty;
        let shunt_cost = shunt_qty as f64 * line.unit_price;
        let trailer_cost = trailer_litres as f64 * line.unit_price;

        total_trailer_cost += trailer_cost;
        total_shunt_cost += shunt_cost;
        total_shunt_qty += shunt_qty;
        total_excl_gst_lines += line.excl_gst;

        let fy_wk = knowledge.calendar.week_for(delivery.date).unwrap_or_default();

        fuel_tracking.push(FuelTrackingRow {
            invoice: invoice_no.clone(),
            invoice_date: invoice_date.clone(),
            excl_gst: money(line.excl_gst),
            gst: money(line.excl_gst * GST_RATE),
            incl_gst: money(line.excl_gst * (1.0 + GST_RATE)),
            delivery_date: delivery.date.format("%d-%b").to_string(),
            fy_wk: fy_wk.to_string(),
            docket: delivery.docket_no.clone(),
            total_litres: line.total_litres,
            shunt_qty,
            trailer_litres,
            unit_price: format!("{:.5}", line.unit_price),
            shunt_cost: money(shunt_cost),
            invoice_diff: String::new(),
            trailer_total: money(trailer_cost),
            shunt_total: money(shunt_cost),
            uploading_wk: codes.uploading_week.clone(),
        });
    }

    // Invoice totals ride on the last tracking row
    if let Some(last) = fuel_tracking.last_mut() {
        last.invoice_diff = format!("${:.2}", total_excl_gst_lines);
        last.trailer_total = format!("${:.2}", total_trailer_cost);
        last.shunt_total = total_shunt_qty.to_string();
    }

    let last_delivery_date = invoice.last_delivery_date();
    let week_ending = last_delivery_date
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_default();
    let fy_wk = last_delivery_date
        .and_then(|d| knowledge.calendar.week_for(d))
        .unwrap_or_default()
        .to_string();

    let data_row = |gl_no: u32, store: u32, amount: f64, comment: &str| DataSheetRow {
        vendor_name: vendor_name.clone(),
        vendor_no: vendor_no.clone(),
        invoice_no: invoice_no.clone(),
        invoice_date: invoice_date.clone(),
        gl_no,
        trade_dept: String::new(),
        merch_dept: String::new(),
        store,
        amount_less_gst: money(amount),
        gst_amount: money(amount * GST_RATE),
        invoice_total: money(amount * (1.0 + GST_RATE)),
        vendor_line_text: String::new(),
        store_line_text: format!("{} {} {} {}", vendor_name, store, fy_wk, comment),
        comments: comment.to_string(),
        week_ending: week_ending.clone(),
        week_count_line_text: fy_wk.clone(),
    };

    let mut data_sheet = vec![data_row(
        codes.trailer_gl,
        codes.trailer_store,
        total_trailer_cost,
        "BRDC Fuel",
    )];
    if total_shunt_cost > 0.0 {
        data_sheet.push(data_row(
            codes.shunt_gl,
            codes.shunt_store,
            total_shunt_cost,
            "BRDC Shunt Fuel",
        ));
    }

    let total_excl_gst = total_trailer_cost + total_shunt_cost;
    let checklist = vec![ChecklistRow {
        vendor: vendor_name.clone(),
        vendor_no: vendor_no.clone(),
        invoice_no: invoice_no.clone(),
        excl_gst: money(total_excl_gst),
        gst_amount: money(total_excl_gst * GST_RATE),
        invoice_total: money(total_excl_gst * (1.0 + GST_RATE)),
    }];

    Report {
        data_sheet,
        checklist,
        fuel_tracking,
    }
}
