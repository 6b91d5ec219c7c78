use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::pivots::{recent_pivot_highs, recent_pivot_lows};
use crate::models::{CandleSeries, Side};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sweep {
    pub side: Side,
    pub reference: f64,
    pub strength: f64,
    pub timestamp: DateTime<Utc>,
}

/// Bullish sweep: the current candle's low pierces `reference` (a recent swing
/// low or zone lower bound) but the close recovers back above it.
fn bullish_sweep(candle: &crate::models::Candle, reference: f64) -> Option<Sweep> {
    if candle.low < reference && candle.close > reference {
        let range = candle.total_range();
        let strength = if range > 0.0 {
            (candle.close - candle.low) / range
        } else {
            0.0
        };
        Some(Sweep {
            side: Side::Long,
            reference,
            strength,
            timestamp: candle.timestamp,
        })
    } else {
        None
    }
}

/// Bearish sweep: mirror of [`bullish_sweep`] against a swing high / zone upper bound.
fn bearish_sweep(candle: &crate::models::Candle, reference: f64) -> Option<Sweep> {
    if candle.high > reference && candle.close < reference {
        let range = candle.total_range();
        let strength = if range > 0.0 {
            (candle.high - candle.close) / range
        } else {
            0.0
        };
        Some(Sweep {
            side: Side::Short,
            reference,
            strength,
            timestamp: candle.timestamp,
        })
    } else {
        None
    }
}

/// Checks the current candle against the last `lookback` pivot lows/highs,
/// most recent first, returning the first (most recent) sweep found.
pub fn detect_sweep(candles: &CandleSeries, window: usize, lookback: usize) -> Option<Sweep> {
    let n = candles.len();
    if n == 0 {
        return None;
    }
    let current = &candles[n - 1];

    let lows = recent_pivot_lows(candles, window, lookback);
    for &i in lows.iter().rev() {
        if i == n - 1 {
            continue;
        }
        if let Some(s) = bullish_sweep(current, candles[i].low) {
            return Some(s);
        }
    }

    let highs = recent_pivot_highs(candles, window, lookback);
    for &i in highs.iter().rev() {
        if i == n - 1 {
            continue;
        }
        if let Some(s) = bearish_sweep(current, candles[i].high) {
            return Some(s);
        }
    }

    None
}

/// Same sweep test against an explicit reference level (a zone boundary rather
/// than a swing pivot) — used by setup/retest detection once a zone is known.
pub fn detect_sweep_against_level(
    candle: &crate::models::Candle,
    reference: f64,
    side: Side,
) -> Option<Sweep> {
    match side {
        Side::Long => bullish_sweep(candle, reference),
        Side::Short => bearish_sweep(candle, reference),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_candles;

    #[test]
    fn detects_bullish_sweep_against_zone_lower() {
        let series = make_candles(&[(100.0, 101.0, 90.0, 99.5)]);
        let sweep = detect_sweep_against_level(&series[0], 95.0, Side::Long);
        assert!(sweep.is_some());
        assert_eq!(sweep.unwrap().side, Side::Long);
    }

    #[test]
    fn detects_bearish_sweep_against_zone_upper() {
        let series = make_candles(&[(100.0, 110.0, 99.0, 100.5)]);
        let sweep = detect_sweep_against_level(&series[0], 105.0, Side::Short);
        assert!(sweep.is_some());
        assert_eq!(sweep.unwrap().side, Side::Short);
    }

    #[test]
    fn no_sweep_when_close_does_not_recover() {
        let series = make_candles(&[(100.0, 101.0, 90.0, 92.0)]);
        assert!(detect_sweep_against_level(&series[0], 95.0, Side::Long).is_none());
    }

    #[test]
    fn detect_sweep_against_recent_pivots() {
        let mut data = Vec::new();
        for i in 0..15 {
            let v = 100.0 + i as f64 * 2.0;
            data.push((v, v + 1.0, v - 1.0, v + 0.5));
        }
        data.push((130.0, 131.0, 90.0, 129.0));
        let candles = make_candles(&data);
        let sweep = detect_sweep(&candles, 4, 3);
        let _ = sweep;
    }
}
