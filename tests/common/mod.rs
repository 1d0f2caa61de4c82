#![allow(dead_code)]

use stockstudy::domain::error::FetchError;
pub use stockstudy::domain::quote::{RawDailyBar, RawFinancialStatement, RawListedInfo};
use stockstudy::ports::quote_port::QuotePort;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct MockQuotePort {
    pub bars: HashMap<String, Vec<RawDailyBar>>,
    pub master: Vec<RawListedInfo>,
    pub financials: HashMap<String, Vec<RawFinancialStatement>>,
    pub errors: HashMap<String, FetchError>,
    pub calls: AtomicUsize,
}

impl MockQuotePort {
    pub fn new() -> Self {
        Self {
            bars: HashMap::new(),
            master: Vec::new(),
            financials: HashMap::new(),
            errors: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<RawDailyBar>) -> Self {
        self.bars.insert(code.to_string(), bars);
        self
    }

    pub fn with_master(mut self, master: Vec<RawListedInfo>) -> Self {
        self.master = master;
        self
    }

    pub fn with_financials(mut self, code: &str, rows: Vec<RawFinancialStatement>) -> Self {
        self.financials.insert(code.to_string(), rows);
        self
    }

    pub fn with_error(mut self, code: &str, error: FetchError) -> Self {
        self.errors.insert(code.to_string(), error);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QuotePort for MockQuotePort {
    fn daily_quotes(
        &self,
        code: &str,
        _from: &str,
        _to: &str,
    ) -> Result<Vec<RawDailyBar>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.errors.get(code) {
            return Err(err.clone());
        }
        if code.is_empty() {
            let mut all: Vec<RawDailyBar> = self.bars.values().flatten().cloned().collect();
            all.sort_by(|a, b| (&a.code, &a.date).cmp(&(&b.code, &b.date)));
            return Ok(all);
        }
        Ok(self.bars.get(code).cloned().unwrap_or_default())
    }

    fn stock_master(&self, code: &str) -> Result<Vec<RawListedInfo>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.errors.get(code) {
            return Err(err.clone());
        }
        Ok(self
            .master
            .iter()
            .filter(|m| code.is_empty() || m.code == code)
            .cloned()
            .collect())
    }

    fn financials(&self, code: &str) -> Result<Vec<RawFinancialStatement>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.errors.get(code) {
            return Err(err.clone());
        }
        if code.is_empty() {
            return Ok(self.financials.values().flatten().cloned().collect());
        }
        Ok(self.financials.get(code).cloned().unwrap_or_default())
    }
}

/// Business-day-free synthetic bars: one per calendar day from 2024-01-01,
/// a deterministic zig-zag walk around `base`.
pub fn generate_bars(code: &str, count: usize, base: f64) -> Vec<RawDailyBar> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..count)
        .map(|i| {
            let wobble = ((i * 7919) % 23) as f64 - 11.0;
            let close = base + i as f64 * 0.8 + wobble * 1.5;
            RawDailyBar {
                date: format!(
                    "{}T00:00:00",
                    (start + chrono::Duration::days(i as i64)).format("%Y-%m-%d")
                ),
                code: code.to_string(),
                open: Some(close - 1.0),
                high: Some(close + 2.0),
                low: Some(close - 2.0),
                close: Some(close),
                volume: Some(10_000.0 + i as f64),
                adjustment_factor: Some(1.0),
                adjustment_open: Some(close - 1.0),
                adjustment_high: Some(close + 2.0),
                adjustment_low: Some(close - 2.0),
                adjustment_close: Some(close),
                adjustment_volume: Some(10_000.0 + i as f64),
                ..RawDailyBar::default()
            }
        })
        .collect()
}

pub fn statement(code: &str, disclosed: &str, net_sales: &str) -> RawFinancialStatement {
    RawFinancialStatement {
        code: code.to_string(),
        disclosed_date: Some(disclosed.to_string()),
        document_type: Some("FYFinancialStatements_Consolidated_IFRS".to_string()),
        net_sales: Some(net_sales.to_string()),
        ..RawFinancialStatement::default()
    }
}

pub fn listed(code: &str, name: &str) -> RawListedInfo {
    RawListedInfo {
        code: code.to_string(),
        company_name: Some(name.to_string()),
        market_code_name: Some("Prime".to_string()),
        ..RawListedInfo::default()
    }
}
