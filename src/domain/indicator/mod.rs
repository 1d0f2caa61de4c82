//! Technical indicator engine.
//!
//! Every indicator consumes the ordered close prices of one series and yields
//! one value per input index, `None` while the trailing history is too short.
//! Values at index `i` depend only on closes `0..=i`.
//!
//! [`compute_indicators`] bundles the fixed set served by the API and written
//! by the batch pipeline into one [`IndicatorRow`] per date.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stddev;

use crate::domain::price::PriceSeries;
use serde::{Deserialize, Serialize};

pub const SMA_SHORT: usize = 5;
pub const SMA_MEDIUM: usize = 25;
pub const SMA_LONG: usize = 75;
pub const RSI_PERIOD: usize = 14;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
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

pub fn compute_indicators(series: &PriceSeries) -> Vec<IndicatorRow> {
    compute_from_closes(&series.closes())
}

pub fn compute_from_closes(closes: &[f64]) -> Vec<IndicatorRow> {
    let sma_5 = sma::calculate_sma(closes, SMA_SHORT);
    let sma_25 = sma::calculate_sma(closes, SMA_MEDIUM);
    let sma_75 = sma::calculate_sma(closes, SMA_LONG);
    let rsi_14 = rsi::calculate_rsi(closes, RSI_PERIOD);
    let macd = macd::calculate_macd_default(closes);
    let bands = bollinger::calculate_bollinger_default(closes);

    (0..closes.len())
        .map(|i| IndicatorRow {
            sma_5: sma_5[i],
            sma_25: sma_25[i],
            sma_75: sma_75[i],
            rsi_14: rsi_14[i],
            macd: macd.line[i],
            macd_signal: macd.signal[i],
            macd_histogram: macd.histogram[i],
            bb_upper: bands.upper[i],
            bb_middle: bands.middle[i],
            bb_lower: bands.lower[i],
        })
        .collect()
}
