//! Local CSV price file loader.
//!
//! Reads `date,close[,open,high,low,volume]` files (header required, columns
//! matched by name) into a [`PriceSeries`] or into raw bars for the
//! presentation layer.

use crate::domain::error::StockStudyError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::domain::quote::RawDailyBar;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: String,
    close: Option<f64>,
    #[serde(default)]
    open: Option<f64>,
    #[serde(default)]
    high: Option<f64>,
    #[serde(default)]
    low: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
}

pub struct CsvPriceLoader {
    path: PathBuf,
}

impl CsvPriceLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn invalid(&self, reason: String) -> StockStudyError {
        StockStudyError::InvalidInput {
            source_name: self.path.display().to_string(),
            reason,
        }
    }

    fn read_rows(&self) -> Result<Vec<PriceRow>, StockStudyError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| self.invalid(format!("failed to open: {}", e)))?;

        let mut rows = Vec::new();
        for (line, result) in rdr.deserialize::<PriceRow>().enumerate() {
            let row = result.map_err(|e| self.invalid(format!("row {}: {}", line + 1, e)))?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Load as a strict series: every row needs a close and dates must be
    /// strictly increasing.
    pub fn load_series(&self) -> Result<PriceSeries, StockStudyError> {
        let mut points = Vec::new();
        for (i, row) in self.read_rows()?.into_iter().enumerate() {
            let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
                .map_err(|e| self.invalid(format!("row {}: invalid date '{}': {}", i + 1, row.date, e)))?;
            let close = row
                .close
                .ok_or_else(|| self.invalid(format!("row {}: missing close", i + 1)))?;
            points.push(PricePoint { date, close });
        }
        Ok(PriceSeries::new(points)?)
    }

    /// Load as raw bars, treating the file's columns as adjusted values.
    pub fn load_bars(&self, code: &str) -> Result<Vec<RawDailyBar>, StockStudyError> {
        Ok(self
            .read_rows()?
            .into_iter()
            .map(|row| RawDailyBar {
                date: row.date,
                code: code.to_string(),
                close: row.close,
                open: row.open,
                high: row.high,
                low: row.low,
                volume: row.volume,
                adjustment_close: row.close,
                adjustment_open: row.open,
                adjustment_high: row.high,
                adjustment_low: row.low,
                adjustment_volume: row.volume,
                ..RawDailyBar::default()
            })
            .collect())
    }
}
