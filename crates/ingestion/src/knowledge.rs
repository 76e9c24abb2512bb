//! Knowledge base CSV files
//!
//! - `FinancialCalendar.csv`: `Date` (dd/mm/YYYY) → `Week` code
//! - `VendorLookup.csv`: `Vendor Name` → `Vendor No.`

use crate::errors::IngestionError;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::io;
use std::path::Path;
use tracing::{info, warn};

const CALENDAR_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Deserialize)]
struct CalendarRecord {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Week")]
    week: String,
}

#[derive(Debug, Deserialize)]
struct VendorRecord {
    #[serde(rename = "Vendor Name")]
    name: String,
    #[serde(rename = "Vendor No.")]
    number: String,
}

/// Financial calendar mapping each day to its financial week code
#[derive(Debug, Clone, Default)]
pub struct FinancialCalendar {
    weeks: HashMap<NaiveDate, String>,
}

impl FinancialCalendar {
    /// Load the calendar; a missing or unreadable file is an error
    pub fn from_path(path: &Path) -> Result<Self, IngestionError> {
        let file = std::fs::File::open(path).map_err(|e| knowledge_error(path, e))?;
        let calendar = Self::from_reader(file).map_err(|e| knowledge_error(path, e))?;
        info!(path = %path.display(), days = calendar.len(), "Loaded financial calendar");
        Ok(calendar)
    }

    /// Parse calendar CSV. Rows with unparsable dates are skipped.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, IngestionError> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut weeks = HashMap::new();
        for record in csv.deserialize::<CalendarRecord>() {
            let record = record?;
            match NaiveDate::parse_from_str(&record.date, CALENDAR_DATE_FORMAT) {
                Ok(date) => {
                    weeks.insert(date, record.week);
                }
                Err(e) => warn!(date = %record.date, error = %e, "Skipping calendar row with invalid date"),
            }
        }

        Ok(Self { weeks })
    }

    /// Week code for a day
    pub fn week_for(&self, date: NaiveDate) -> Option<&str> {
        self.weeks.get(&date).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }
}

/// Vendor name to vendor number lookup (case-insensitive on the name)
#[derive(Debug, Clone, Default)]
pub struct VendorLookup {
    vendors: HashMap<String, String>,
}

impl VendorLookup {
    /// Load the lookup. A missing file yields an empty lookup.
    pub fn from_path(path: &Path) -> Result<Self, IngestionError> {
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Vendor lookup not found, using configured vendor defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(knowledge_error(path, e)),
        };
        let lookup = Self::from_reader(file).map_err(|e| knowledge_error(path, e))?;
        info!(path = %path.display(), vendors = lookup.vendors.len(), "Loaded vendor lookup");
        Ok(lookup)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, IngestionError> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut vendors = HashMap::new();
        for record in csv.deserialize::<VendorRecord>() {
            let record = record?;
            vendors.insert(record.name.to_uppercase(), record.number);
        }
        Ok(Self { vendors })
    }

    pub fn vendor_number(&self, name: &str) -> Option<&str> {
        self.vendors.get(&name.to_uppercase()).map(String::as_str)
    }
}

/// Everything loaded from the knowledge directory for one processing run
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    pub calendar: FinancialCalendar,
    pub vendors: VendorLookup,
}

impl KnowledgeBase {
    pub fn load(calendar_path: &Path, vendor_path: &Path) -> Result<Self, IngestionError> {
        Ok(Self {
            calendar: FinancialCalendar::from_path(calendar_path)?,
            vendors: VendorLookup::from_path(vendor_path)?,
        })
    }
}

fn knowledge_error(path: &Path, e: impl std::fmt::Display) -> IngestionError {
    IngestionError::KnowledgeBase {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}
