//! Property tests for the indicator engine.

use approx::assert_relative_eq;
use proptest::prelude::*;
use stockstudy::domain::indicator::bollinger::calculate_bollinger_default;
use stockstudy::domain::indicator::sma::calculate_sma;
use stockstudy::domain::indicator::{IndicatorRow, compute_from_closes};

fn closes_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..10_000.0, 0..120)
}

fn defined(row: &IndicatorRow) -> [(&'static str, Option<f64>); 10] {
    [
        ("sma_5", row.sma_5),
        ("sma_25", row.sma_25),
        ("sma_75", row.sma_75),
        ("rsi_14", row.rsi_14),
        ("macd", row.macd),
        ("macd_signal", row.macd_signal),
        ("macd_histogram", row.macd_histogram),
        ("bb_upper", row.bb_upper),
        ("bb_middle", row.bb_middle),
        ("bb_lower", row.bb_lower),
    ]
}

proptest! {
    #[test]
    fn output_length_matches_input(closes in closes_strategy()) {
        prop_assert_eq!(compute_from_closes(&closes).len(), closes.len());
    }

    #[test]
    fn warmup_boundaries(closes in closes_strategy()) {
        for (i, row) in compute_from_closes(&closes).iter().enumerate() {
            prop_assert_eq!(row.sma_5.is_some(), i >= 4);
            prop_assert_eq!(row.sma_25.is_some(), i >= 24);
            prop_assert_eq!(row.sma_75.is_some(), i >= 74);
            prop_assert_eq!(row.rsi_14.is_some(), i >= 13);
            prop_assert_eq!(row.macd.is_some(), i >= 25);
            prop_assert_eq!(row.macd_signal.is_some(), i >= 33);
            prop_assert_eq!(row.macd_histogram.is_some(), i >= 33);
            prop_assert_eq!(row.bb_middle.is_some(), i >= 19);
        }
    }

    #[test]
    fn histogram_is_line_minus_signal(closes in closes_strategy()) {
        for row in compute_from_closes(&closes) {
            if let (Some(line), Some(signal), Some(hist)) = (row.macd, row.macd_signal, row.macd_histogram) {
                assert_relative_eq!(hist, line - signal, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn bands_are_ordered(closes in closes_strategy()) {
        for row in compute_from_closes(&closes) {
            if let (Some(upper), Some(middle), Some(lower)) = (row.bb_upper, row.bb_middle, row.bb_lower) {
                prop_assert!(upper >= middle);
                prop_assert!(middle >= lower);
            }
        }
    }

    #[test]
    fn middle_band_is_twenty_day_sma(closes in closes_strategy()) {
        prop_assert_eq!(calculate_bollinger_default(&closes).middle, calculate_sma(&closes, 20));
    }

    #[test]
    fn rsi_stays_in_range(closes in closes_strategy()) {
        for row in compute_from_closes(&closes) {
            if let Some(rsi) = row.rsi_14 {
                prop_assert!((0.0..=100.0).contains(&rsi), "rsi {} out of range", rsi);
            }
        }
    }

    #[test]
    fn values_depend_only_on_history(closes in closes_strategy(), cut in 0usize..120) {
        let cut = cut.min(closes.len());
        let full = compute_from_closes(&closes);
        let prefix = compute_from_closes(&closes[..cut]);
        prop_assert_eq!(&full[..cut], &prefix[..]);
    }

    #[test]
    fn defined_values_are_finite(closes in closes_strategy()) {
        for row in compute_from_closes(&closes) {
            for (name, value) in defined(&row) {
                if let Some(v) = value {
                    prop_assert!(v.is_finite(), "{} is {}", name, v);
                }
            }
        }
    }

    #[test]
    fn constant_series_collapses(price in 1.0f64..10_000.0, len in 0usize..100) {
        let closes = vec![price; len];
        for row in compute_from_closes(&closes) {
            for sma in [row.sma_5, row.sma_25, row.sma_75, row.bb_middle].into_iter().flatten() {
                assert_relative_eq!(sma, price, max_relative = 1e-12);
            }
            if let (Some(upper), Some(lower)) = (row.bb_upper, row.bb_lower) {
                assert_relative_eq!(upper, price, max_relative = 1e-9);
                assert_relative_eq!(lower, price, max_relative = 1e-9);
            }
            for macd in [row.macd, row.macd_signal, row.macd_histogram].into_iter().flatten() {
                prop_assert!(macd.abs() < 1e-9 * price.max(1.0));
            }
        }
    }
}

#[test]
fn rising_series_has_full_strength_rsi() {
    let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
    let rows = compute_from_closes(&closes);
    assert_relative_eq!(rows[39].rsi_14.unwrap(), 100.0);
    assert!(rows[39].macd.unwrap() > 0.0);
}

#[test]
fn falling_series_has_zero_rsi() {
    let closes: Vec<f64> = (0..40).map(|i| 200.0 - i as f64).collect();
    let rows = compute_from_closes(&closes);
    assert_relative_eq!(rows[39].rsi_14.unwrap(), 0.0);
    assert!(rows[39].macd.unwrap() < 0.0);
}
