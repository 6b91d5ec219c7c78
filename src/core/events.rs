use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::pivots::{pivot_highs, pivot_lows};
use crate::models::{CandleSeries, Side, Structure, StructureEventKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureEvent {
    pub kind: StructureEventKind,
    pub side: Side,
    pub level: f64,
    pub timestamp: DateTime<Utc>,
}

/// Continuation break: close beyond the high (resp. low) of the last `lookback`
/// pivots, where that extreme itself exceeds the `lookback` pivots before it —
/// i.e. structure is still making new extremes in the same direction.
pub fn detect_bos(candles: &CandleSeries, window: usize, lookback: usize) -> Option<StructureEvent> {
    let current_close = candles.last()?.close;
    let current_ts = candles.last()?.timestamp;

    let highs = pivot_highs(candles, window);
    if highs.len() >= lookback * 2 {
        let recent = &highs[highs.len() - lookback..];
        let prior = &highs[highs.len() - lookback * 2..highs.len() - lookback];
        let recent_max = recent.iter().map(|&i| candles[i].high).fold(f64::NEG_INFINITY, f64::max);
        let prior_max = prior.iter().map(|&i| candles[i].high).fold(f64::NEG_INFINITY, f64::max);
        if current_close > recent_max && recent_max > prior_max {
            return Some(StructureEvent {
                kind: StructureEventKind::Bos,
                side: Side::Long,
                level: recent_max,
                timestamp: current_ts,
            });
        }
    }

    let lows = pivot_lows(candles, window);
    if lows.len() >= lookback * 2 {
        let recent = &lows[lows.len() - lookback..];
        let prior = &lows[lows.len() - lookback * 2..lows.len() - lookback];
        let recent_min = recent.iter().map(|&i| candles[i].low).fold(f64::INFINITY, f64::min);
        let prior_min = prior.iter().map(|&i| candles[i].low).fold(f64::INFINITY, f64::min);
        if current_close < recent_min && recent_min < prior_min {
            return Some(StructureEvent {
                kind: StructureEventKind::Bos,
                side: Side::Short,
                level: recent_min,
                timestamp: current_ts,
            });
        }
    }

    None
}

/// Reversal break: with an established `current_trend`, a close beyond the
/// opposite extreme of the last `lookback` pivots signals a change of character.
pub fn detect_choch(
    candles: &CandleSeries,
    current_trend: Structure,
    window: usize,
    lookback: usize,
) -> Option<StructureEvent> {
    let current_close = candles.last()?.close;
    let current_ts = candles.last()?.timestamp;

    match current_trend {
        Structure::Up => {
            let lows = pivot_lows(candles, window);
            if lows.len() >= lookback {
                let recent = &lows[lows.len() - lookback..];
                let min = recent.iter().map(|&i| candles[i].low).fold(f64::INFINITY, f64::min);
                if current_close < min {
                    return Some(StructureEvent {
                        kind: StructureEventKind::Choch,
                        side: Side::Short,
                        level: min,
                        timestamp: current_ts,
                    });
                }
            }
            None
        }
        Structure::Down => {
            let highs = pivot_highs(candles, window);
            if highs.len() >= lookback {
                let recent = &highs[highs.len() - lookback..];
                let max = recent.iter().map(|&i| candles[i].high).fold(f64::NEG_INFINITY, f64::max);
                if current_close > max {
                    return Some(StructureEvent {
                        kind: StructureEventKind::Choch,
                        side: Side::Long,
                        level: max,
                        timestamp: current_ts,
                    });
                }
            }
            None
        }
        Structure::Neutral => None,
    }
}

/// CHoCH takes priority over BOS when both trigger on the same candle.
pub fn detect_structure_events(
    candles: &CandleSeries,
    current_trend: Structure,
    window: usize,
    lookback: usize,
) -> Option<StructureEvent> {
    detect_choch(candles, current_trend, window, lookback)
        .or_else(|| detect_bos(candles, window, lookback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_bullish_trend;

    #[test]
    fn bullish_trend_eventually_boses() {
        let candles = make_bullish_trend(60, 100.0);
        let event = detect_bos(&candles, 5, 3);
        assert!(event.is_some());
        assert_eq!(event.unwrap().side, Side::Long);
    }

    #[test]
    fn choch_requires_opposite_break_against_trend() {
        let mut data = Vec::new();
        for i in 0..30 {
            let v = 100.0 + i as f64 * 4.0;
            data.push((v, v + 5.0, v - 2.0, v + 3.0));
        }
        for i in 0..15 {
            let v = 220.0 - i as f64 * 10.0;
            data.push((v, v + 2.0, v - 8.0, v - 6.0));
        }
        let candles = crate::test_helpers::make_candles(&data);
        let choch = detect_choch(&candles, Structure::Up, 5, 3);
        assert!(choch.is_some());
        assert_eq!(choch.unwrap().side, Side::Short);
    }
}
