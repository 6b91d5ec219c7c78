use crate::models::CandleSeries;

/// Indices of strict swing highs: `candle[i].high` exceeds every other high in
/// the symmetric window `[i-w, i+w]`. Ties are rejected, not counted as pivots.
pub fn pivot_highs(candles: &CandleSeries, window: usize) -> Vec<usize> {
    let len = candles.len();
    if len <= window * 2 {
        return Vec::new();
    }

    let mut out = Vec::new();
    for i in window..(len - window) {
        let current = candles[i].high;
        let is_pivot = (i - window..=i + window)
            .all(|j| j == i || candles[j].high < current);
        if is_pivot {
            out.push(i);
        }
    }
    out
}

/// Indices of strict swing lows, symmetric to [`pivot_highs`].
pub fn pivot_lows(candles: &CandleSeries, window: usize) -> Vec<usize> {
    let len = candles.len();
    if len <= window * 2 {
        return Vec::new();
    }

    let mut out = Vec::new();
    for i in window..(len - window) {
        let current = candles[i].low;
        let is_pivot = (i - window..=i + window)
            .all(|j| j == i || candles[j].low > current);
        if is_pivot {
            out.push(i);
        }
    }
    out
}

/// The last `k` pivot-high indices, most recent last.
pub fn recent_pivot_highs(candles: &CandleSeries, window: usize, k: usize) -> Vec<usize> {
    let all = pivot_highs(candles, window);
    let start = all.len().saturating_sub(k);
    all[start..].to_vec()
}

/// The last `k` pivot-low indices, most recent last.
pub fn recent_pivot_lows(candles: &CandleSeries, window: usize, k: usize) -> Vec<usize> {
    let all = pivot_lows(candles, window);
    let start = all.len().saturating_sub(k);
    all[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_candles;

    #[test]
    fn detects_peak_as_pivot_high() {
        let mut data = Vec::new();
        for i in 0..10 {
            let v = 100.0 + i as f64 * 5.0;
            data.push((v, v + 2.0, v - 1.0, v + 1.0));
        }
        for i in 0..10 {
            let v = 145.0 - i as f64 * 5.0;
            data.push((v, v + 2.0, v - 1.0, v - 1.0));
        }
        let candles = make_candles(&data);
        let highs = pivot_highs(&candles, 5);
        assert_eq!(highs.len(), 1);
        assert_eq!(highs[0], 9);
    }

    #[test]
    fn ties_are_rejected() {
        let data: Vec<(f64, f64, f64, f64)> = (0..20).map(|_| (100.0, 110.0, 90.0, 100.0)).collect();
        let candles = make_candles(&data);
        assert!(pivot_highs(&candles, 5).is_empty());
        assert!(pivot_lows(&candles, 5).is_empty());
    }

    #[test]
    fn recent_pivot_lows_returns_last_k() {
        let mut data = Vec::new();
        for wave in 0..3 {
            let base = 200.0 - wave as f64 * 30.0;
            for i in 0..6 {
                data.push((base - i as f64 * 3.0, base - i as f64 * 3.0 + 2.0, base - i as f64 * 3.0 - 1.0, base - i as f64 * 3.0));
            }
            for i in 0..6 {
                let v = base - 15.0 + i as f64 * 3.0;
                data.push((v, v + 2.0, v - 1.0, v));
            }
        }
        let candles = make_candles(&data);
        let lows = recent_pivot_lows(&candles, 5, 2);
        assert!(lows.len() <= 2);
    }
}
