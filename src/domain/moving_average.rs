//! Simple moving average over a price slice.
//!
//! SMA(n)[i] = sum(P[i-j] for j in 0..n) / n
//! A point is undefined while fewer than n prices exist ending at i, or when
//! any price inside the window is missing (NaN).

/// Mean of the `window` prices ending at `end` (inclusive).
///
/// Never reads past `end`.
pub fn trailing_mean(prices: &[f64], end: usize, window: usize) -> Option<f64> {
    if window == 0 || end >= prices.len() || end + 1 < window {
        return None;
    }

    let slice = &prices[end + 1 - window..=end];
    if slice.iter().any(|p| p.is_nan()) {
        return None;
    }

    Some(slice.iter().sum::<f64>() / window as f64)
}

/// SMA aligned index-for-index with `prices`.
pub fn calculate_sma(prices: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..prices.len())
        .map(|i| trailing_mean(prices, i, window))
        .collect()
}
