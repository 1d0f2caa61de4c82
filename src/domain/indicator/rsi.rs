//! RSI (Relative Strength Index) indicator.
//!
//! Wilder smoothing with alpha = 1/n, applied recursively to gains and losses:
//! - The change at the first bar is zero (no prior close) and seeds both averages
//! - avg[i] = avg[i-1] + (x[i] - avg[i-1]) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100 (covers a flat series)
//!
//! Warmup: first (n-1) bars are undefined; the value at index n-1 is the first
//! one reported.

pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; closes.len()];
    }

    let alpha = 1.0 / period as f64;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    let mut values = Vec::with_capacity(closes.len());

    for (i, &close) in closes.iter().enumerate() {
        let change = if i == 0 { 0.0 } else { close - closes[i - 1] };
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };

        if i == 0 {
            avg_gain = gain;
            avg_loss = loss;
        } else {
            avg_gain += alpha * (gain - avg_gain);
            avg_loss += alpha * (loss - avg_loss);
        }

        if i + 1 < period {
            values.push(None);
        } else {
            values.push(Some(rsi_from_averages(avg_gain, avg_loss)));
        }
    }

    values
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty() {
        assert!(calculate_rsi(&[], 14).is_empty());
    }

    #[test]
    fn rsi_single_bar() {
        assert_eq!(calculate_rsi(&[100.0], 14), vec![None]);
    }

    #[test]
    fn rsi_warmup_period() {
        let closes: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let series = calculate_rsi(&closes, 14);

        assert_eq!(series.len(), 15);
        for (i, value) in series.iter().enumerate().take(13) {
            assert!(value.is_none(), "bar {} should be undefined", i);
        }
        assert!(series[13].is_some(), "bar 13 should be defined");
        assert!(series[14].is_some());
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&closes, 14);
        assert!((series[14].unwrap() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&closes, 14);
        assert!(series[14].unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_flat_series_is_degenerate_not_error() {
        let series = calculate_rsi(&[1500.0; 40], 14);
        for value in series.iter().flatten() {
            assert!((value - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn rsi_in_range() {
        let closes: Vec<f64> = (1..=60)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        for value in calculate_rsi(&closes, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value), "RSI {} out of range", value);
        }
    }

    #[test]
    fn rsi_zero_period() {
        assert_eq!(calculate_rsi(&[100.0, 101.0], 0), vec![None, None]);
    }

    #[test]
    fn rsi_known_calculation() {
        // one gain of 2 then one loss of 1, period 2
        let series = calculate_rsi(&[10.0, 12.0, 11.0], 2);
        let alpha = 0.5;
        let gain = 0.0 + alpha * (2.0 - 0.0);
        let loss = 0.0;
        assert!((series[1].unwrap() - 100.0).abs() < f64::EPSILON);

        let gain = gain + alpha * (0.0 - gain);
        let loss = loss + alpha * (1.0 - loss);
        let expected = 100.0 - 100.0 / (1.0 + gain / loss);
        assert!((series[2].unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn rsi_bullish_sequence() {
        let closes = [
            44.0, 44.25, 44.50, 43.75, 44.50, 44.25, 44.75, 45.25, 45.50, 45.25, 45.50, 46.0,
            46.25, 46.0, 46.50,
        ];
        let rsi = calculate_rsi(&closes, 14)[14].unwrap();
        assert!(rsi > 50.0 && rsi < 100.0, "RSI should be in bullish territory");
    }
}
