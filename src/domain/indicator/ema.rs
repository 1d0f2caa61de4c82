//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the first observation, then
//! EMA[i] = x[i]*k + EMA[i-1]*(1-k).
//! Warmup: a value is reported once n observations have been seen,
//! so the first (n-1) observations are undefined.

pub fn calculate_ema(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let values: Vec<Option<f64>> = closes.iter().copied().map(Some).collect();
    ema_of_defined(&values, period)
}

/// EMA over the defined entries of `values`.
///
/// Undefined entries stay undefined and neither update the average nor count
/// towards the warmup. Used for the MACD signal line, whose input starts with
/// the MACD warmup.
pub fn ema_of_defined(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema: Option<f64> = None;
    let mut seen = 0usize;

    values
        .iter()
        .map(|value| {
            let x = (*value)?;
            let next = match ema {
                None => x,
                Some(prev) => x * k + prev * (1.0 - k),
            };
            ema = Some(next);
            seen += 1;
            if seen >= period { Some(next) } else { None }
        })
        .collect()
}
