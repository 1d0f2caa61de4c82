//! Market-data retrieval port.

use crate::domain::error::FetchError;
use crate::domain::quote::{RawDailyBar, RawFinancialStatement, RawListedInfo};

/// Source of daily bars, the listed-issue master and financial summaries.
///
/// An empty `code` means every instrument; empty `from`/`to` leave the range
/// open on that side.
pub trait QuotePort: Send + Sync {
    fn daily_quotes(&self, code: &str, from: &str, to: &str)
        -> Result<Vec<RawDailyBar>, FetchError>;

    fn stock_master(&self, code: &str) -> Result<Vec<RawListedInfo>, FetchError>;

    fn financials(&self, code: &str) -> Result<Vec<RawFinancialStatement>, FetchError>;
}
