//! Shapes upstream rows into the records returned by the API and written by
//! the batch pipeline.

use crate::domain::indicator::{IndicatorRow, compute_from_closes};
use crate::domain::quote::{CloseColumn, DailyQuote, RawDailyBar, RawListedInfo, StockInfo};
use serde::{Deserialize, Serialize};

/// Reduce ISO timestamps such as `2024-01-04T00:00:00` to `2024-01-04`.
pub fn normalize_date(value: &str) -> String {
    match value.split_once('T') {
        Some((date, _)) => date.to_string(),
        None => value.to_string(),
    }
}

/// Price row merged with its indicator values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalRecord {
    pub date: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub sma_5: Option<f64>,
    pub sma_25: Option<f64>,
    pub sma_75: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
}

impl TechnicalRecord {
    fn new(bar: &RawDailyBar, close: Option<f64>, row: IndicatorRow) -> Self {
        TechnicalRecord {
            date: normalize_date(&bar.date),
            open: finite(bar.adjustment_open),
            high: finite(bar.adjustment_high),
            low: finite(bar.adjustment_low),
            close: finite(close),
            volume: finite(bar.adjustment_volume),
            sma_5: finite(row.sma_5),
            sma_25: finite(row.sma_25),
            sma_75: finite(row.sma_75),
            rsi_14: finite(row.rsi_14),
            macd: finite(row.macd),
            macd_signal: finite(row.macd_signal),
            macd_histogram: finite(row.macd_histogram),
            bb_upper: finite(row.bb_upper),
            bb_middle: finite(row.bb_middle),
            bb_lower: finite(row.bb_lower),
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Order bars by normalized date, keeping the last bar of a repeated date.
pub fn order_by_date(bars: &[RawDailyBar]) -> Vec<&RawDailyBar> {
    let mut ordered: Vec<(String, &RawDailyBar)> =
        bars.iter().map(|b| (normalize_date(&b.date), b)).collect();
    ordered.sort_by(|a, b| a.0.cmp(&b.0));

    let mut deduped: Vec<(String, &RawDailyBar)> = Vec::with_capacity(ordered.len());
    for entry in ordered {
        match deduped.last_mut() {
            Some(last) if last.0 == entry.0 => *last = entry,
            _ => deduped.push(entry),
        }
    }
    deduped.into_iter().map(|(_, bar)| bar).collect()
}

/// Whether any bar has a close in the column the series is priced in.
pub fn has_close(bars: &[RawDailyBar]) -> bool {
    let column = CloseColumn::for_bars(bars);
    bars.iter().any(|b| column.close(b).is_some())
}

/// Compute indicator records for one instrument's bars.
///
/// The series is priced in `AdjC` when any bar has it, else in `C`; the two
/// are never mixed. Indicators run over the bars that carry a close in that
/// column; bars without one stay in the output with every indicator unset.
pub fn technical_records(bars: &[RawDailyBar]) -> Vec<TechnicalRecord> {
    technical_records_in(bars, CloseColumn::for_bars(bars))
}

/// [`technical_records`] priced in a fixed close column.
pub fn technical_records_in(bars: &[RawDailyBar], column: CloseColumn) -> Vec<TechnicalRecord> {
    let ordered = order_by_date(bars);
    let closes: Vec<Option<f64>> = ordered
        .iter()
        .map(|b| finite(column.close(b)))
        .collect();

    let present: Vec<f64> = closes.iter().flatten().copied().collect();
    let mut rows = compute_from_closes(&present).into_iter();

    ordered
        .iter()
        .zip(&closes)
        .map(|(bar, close)| {
            let row = match close {
                Some(_) => rows.next().unwrap_or_default(),
                None => IndicatorRow::default(),
            };
            TechnicalRecord::new(bar, *close, row)
        })
        .collect()
}

pub fn daily_quotes_view(bars: &[RawDailyBar]) -> Vec<DailyQuote> {
    bars.iter()
        .map(|b| DailyQuote {
            date: normalize_date(&b.date),
            code: b.code.clone(),
            open: finite(b.open),
            high: finite(b.high),
            low: finite(b.low),
            close: finite(b.close),
            volume: finite(b.volume),
            turnover_value: finite(b.turnover_value),
            adjustment_factor: finite(b.adjustment_factor),
            adjustment_open: finite(b.adjustment_open),
            adjustment_high: finite(b.adjustment_high),
            adjustment_low: finite(b.adjustment_low),
            adjustment_close: finite(b.adjustment_close),
            adjustment_volume: finite(b.adjustment_volume),
        })
        .collect()
}

/// Case-insensitive substring match on code or company name.
pub fn search_stocks(master: &[RawListedInfo], query: &str) -> Vec<StockInfo> {
    let needle = query.to_lowercase();
    master
        .iter()
        .filter(|info| {
            needle.is_empty()
                || info.code.to_lowercase().contains(&needle)
                || info
                    .company_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
        })
        .map(StockInfo::from)
        .collect()
}
