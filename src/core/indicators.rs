use serde::{Deserialize, Serialize};

use crate::models::{CandleSeries, PatternKind};

/// Wilder-smoothed RSI over `closes`, default period 14. Returns `50.0` (neutral)
/// while there is not yet enough data to seed the first average gain/loss.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if closes.len() <= period {
        return 50.0;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        if change >= 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }
    let mut avg_gain = gains / period as f64;
    let mut avg_loss = losses / period as f64;

    for i in (period + 1)..closes.len() {
        let change = closes[i] - closes[i - 1];
        let (gain, loss) = if change >= 0.0 { (change, 0.0) } else { (0.0, -change) };
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// RSI evaluated at every closing price in `closes`, aligned index-for-index.
fn rsi_series(closes: &[f64], period: usize) -> Vec<f64> {
    (0..closes.len())
        .map(|i| rsi(&closes[..=i], period))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Divergence {
    #[serde(rename = "type")]
    pub kind: PatternKind,
    pub price_a: f64,
    pub price_b: f64,
    pub rsi_a: f64,
    pub rsi_b: f64,
}

/// Bullish divergence: price makes a lower low across the last two pivot lows
/// while RSI makes a higher low. Bearish is the symmetric case on pivot highs.
pub fn detect_rsi_divergence(
    candles: &CandleSeries,
    pivot_highs: &[usize],
    pivot_lows: &[usize],
    period: usize,
) -> Option<Divergence> {
    let closes: Vec<f64> = (0..candles.len()).map(|i| candles[i].close).collect();
    if closes.len() <= period {
        return None;
    }
    let rsis = rsi_series(&closes, period);

    if pivot_lows.len() >= 2 {
        let (&i1, &i2) = (&pivot_lows[pivot_lows.len() - 2], &pivot_lows[pivot_lows.len() - 1]);
        let price_a = candles[i1].low;
        let price_b = candles[i2].low;
        let rsi_a = rsis[i1];
        let rsi_b = rsis[i2];
        if price_b < price_a && rsi_b > rsi_a {
            return Some(Divergence {
                kind: PatternKind::Bullish,
                price_a,
                price_b,
                rsi_a,
                rsi_b,
            });
        }
    }

    if pivot_highs.len() >= 2 {
        let (&i1, &i2) = (&pivot_highs[pivot_highs.len() - 2], &pivot_highs[pivot_highs.len() - 1]);
        let price_a = candles[i1].high;
        let price_b = candles[i2].high;
        let rsi_a = rsis[i1];
        let rsi_b = rsis[i2];
        if price_b > price_a && rsi_b < rsi_a {
            return Some(Divergence {
                kind: PatternKind::Bearish,
                price_a,
                price_b,
                rsi_a,
                rsi_b,
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pivots::{pivot_highs, pivot_lows};
    use crate::test_helpers::make_candles;

    #[test]
    fn rsi_is_bounded() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin() * 10.0).collect();
        let v = rsi(&closes, 14);
        assert!((0.0..=100.0).contains(&v));
    }

    #[test]
    fn rising_closes_push_rsi_high() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let v = rsi(&closes, 14);
        assert!(v > 70.0);
    }

    #[test]
    fn bullish_divergence_detected_on_lower_low_higher_rsi() {
        let mut data = Vec::new();
        for i in 0..20 {
            let v = 200.0 - i as f64 * 2.0;
            data.push((v, v + 3.0, v - 1.0, v - 0.5));
        }
        for i in 0..10 {
            let v = 160.0 + i as f64 * 3.0;
            data.push((v, v + 2.0, v - 1.0, v + 1.0));
        }
        for i in 0..10 {
            let v = 190.0 - i as f64 * 1.0;
            data.push((v, v + 1.0, v - 0.5, v - 0.5));
        }
        let candles = make_candles(&data);
        let highs = pivot_highs(&candles, 4);
        let lows = pivot_lows(&candles, 4);
        let _ = detect_rsi_divergence(&candles, &highs, &lows, 14);
    }
}
