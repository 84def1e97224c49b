//! Spreadsheet export of analysed listings.
//!
//! One listing becomes one flat row. Column names follow the ledger the
//! browser extension used to append to, extended with the expense and
//! tax-track columns.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::info;
use serde::{Deserialize, Serialize};

use crate::core::CashflowReport;
use crate::error::{CashflowError, CashflowResult};

pub const HEADERS: [&str; 24] = [
    "Date",
    "Address",
    "Price",
    "Beds",
    "Baths",
    "Sqft",
    "Monthly Rent",
    "Monthly Mortgage",
    "Monthly Tax",
    "Monthly Insurance",
    "Monthly HOA",
    "Monthly Maintenance",
    "Monthly Management",
    "Monthly PMI",
    "Monthly Cashflow (Low Tax)",
    "Monthly Cashflow (High Tax)",
    "Annual Cashflow (Low Tax)",
    "Annual Cashflow (High Tax)",
    "Cashflow APY (Low Tax)",
    "Cashflow APY (High Tax)",
    "5yr APY (Low Tax)",
    "5yr APY (High Tax)",
    "Cap Rate",
    "URL",
];

/// Field order must match [`HEADERS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub date: String,
    pub address: String,
    pub price: i64,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub sqft: Option<f64>,
    pub monthly_rent: i64,
    pub monthly_mortgage: i64,
    pub monthly_tax: i64,
    pub monthly_insurance: i64,
    pub monthly_hoa: i64,
    pub monthly_maintenance: i64,
    pub monthly_management: i64,
    pub monthly_pmi: i64,
    pub monthly_cashflow_low: i64,
    pub monthly_cashflow_high: i64,
    pub annual_cashflow_low: i64,
    pub annual_cashflow_high: i64,
    pub cashflow_apy_low: f64,
    pub cashflow_apy_high: f64,
    pub five_year_apy_low: f64,
    pub five_year_apy_high: f64,
    pub cap_rate: f64,
    pub url: String,
}

impl ExportRecord {
    pub fn from_report(report: &CashflowReport) -> Self {
        Self {
            date: report.generated_at.format("%Y-%m-%d").to_string(),
            address: report.address.clone().unwrap_or_default(),
            price: report.price,
            bedrooms: report.bedrooms,
            bathrooms: report.bathrooms,
            sqft: report.sqft,
            monthly_rent: report.monthly_rent,
            monthly_mortgage: report.monthly_mortgage,
            monthly_tax: report.monthly_tax,
            monthly_insurance: report.monthly_insurance,
            monthly_hoa: report.monthly_hoa,
            monthly_maintenance: report.monthly_maintenance,
            monthly_management: report.monthly_management,
            monthly_pmi: report.monthly_pmi,
            monthly_cashflow_low: report.monthly_cashflow_low,
            monthly_cashflow_high: report.monthly_cashflow_high,
            annual_cashflow_low: report.annual_cashflow_low,
            annual_cashflow_high: report.annual_cashflow_high,
            cashflow_apy_low: round_percent(report.cashflow_apy_low),
            cashflow_apy_high: round_percent(report.cashflow_apy_high),
            five_year_apy_low: round_percent(report.five_year_apy_low),
            five_year_apy_high: round_percent(report.five_year_apy_high),
            cap_rate: round_percent(report.cap_rate),
            url: report.url.clone().unwrap_or_default(),
        }
    }
}

fn round_percent(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub trait ExportSink {
    fn append(&mut self, record: &ExportRecord) -> CashflowResult<()>;
}

/// In-process sink. Clones share one buffer, so a handle kept outside a
/// boxed sink still sees the appended rows.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<ExportRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> CashflowResult<Vec<ExportRecord>> {
        let guard = self
            .records
            .lock()
            .map_err(|_| CashflowError::Config("export buffer lock poisoned".to_string()))?;
        Ok(guard.clone())
    }
}

impl ExportSink for MemorySink {
    fn append(&mut self, record: &ExportRecord) -> CashflowResult<()> {
        self.records
            .lock()
            .map_err(|_| CashflowError::Config("export buffer lock poisoned".to_string()))?
            .push(record.clone());
        Ok(())
    }
}

/// Appends rows to a CSV file, writing the header only into a new or empty
/// file.
#[derive(Debug, Clone)]
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExportSink for CsvFileSink {
    fn append(&mut self, record: &ExportRecord) -> CashflowResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(HEADERS)?;
        }
        writer.serialize(record)?;
        writer.flush()?;

        info!(
            "exported {} to {}",
            if record.address.is_empty() {
                "listing"
            } else {
                record.address.as_str()
            },
            self.path.display()
        );
        Ok(())
    }
}

/// Writes a header row followed by every record.
pub fn write_csv<W: Write>(writer: W, records: &[ExportRecord]) -> CashflowResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(HEADERS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
