use serde::{Deserialize, Serialize};

use crate::models::{Candle, CandleSeries, PatternKind, RejectionKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternMatch {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PatternKind,
    pub strength: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rejection {
    #[serde(rename = "type")]
    pub kind: RejectionKind,
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleStrength {
    pub body_percent: f64,
    pub close_location: f64,
    pub upper_wick_percent: f64,
    pub lower_wick_percent: f64,
    pub rejection: Option<Rejection>,
    pub direction: PatternKind,
}

/// Body/wick ratios and rejection read-out for a single candle. Degenerate
/// zero-range candles map to `direction=neutral, strength=0, rejection=None`.
pub fn get_candle_strength(candle: &Candle) -> CandleStrength {
    let range = candle.total_range();
    if range <= 0.0 {
        return CandleStrength {
            body_percent: 0.0,
            close_location: 0.5,
            upper_wick_percent: 0.0,
            lower_wick_percent: 0.0,
            rejection: None,
            direction: PatternKind::Neutral,
        };
    }

    let body_percent = candle.body() / range;
    let close_location = (candle.close - candle.low) / range;
    let upper_wick_percent = candle.upper_wick() / range;
    let lower_wick_percent = candle.lower_wick() / range;

    let rejection = if lower_wick_percent > 0.6 && upper_wick_percent < 0.2 {
        Some(Rejection {
            kind: RejectionKind::Downside,
            strength: lower_wick_percent,
        })
    } else if upper_wick_percent > 0.6 && lower_wick_percent < 0.2 {
        Some(Rejection {
            kind: RejectionKind::Upside,
            strength: upper_wick_percent,
        })
    } else {
        None
    };

    let direction = if candle.is_bullish() {
        PatternKind::Bullish
    } else if candle.is_bearish() {
        PatternKind::Bearish
    } else {
        PatternKind::Neutral
    };

    CandleStrength {
        body_percent,
        close_location,
        upper_wick_percent,
        lower_wick_percent,
        rejection,
        direction,
    }
}

fn hammer(candle: &Candle) -> Option<PatternMatch> {
    let range = candle.total_range();
    if range <= 0.0 {
        return None;
    }
    let body_pct = candle.body() / range;
    let lower_pct = candle.lower_wick() / range;
    let upper_pct = candle.upper_wick() / range;
    if body_pct < 0.3 && lower_pct > 0.6 && upper_pct < 0.2 {
        Some(PatternMatch {
            name: "hammer".to_string(),
            kind: PatternKind::Bullish,
            strength: lower_pct,
        })
    } else {
        None
    }
}

fn shooting_star(candle: &Candle) -> Option<PatternMatch> {
    let range = candle.total_range();
    if range <= 0.0 {
        return None;
    }
    let body_pct = candle.body() / range;
    let upper_pct = candle.upper_wick() / range;
    let lower_pct = candle.lower_wick() / range;
    if body_pct < 0.3 && upper_pct > 0.6 && lower_pct < 0.2 {
        Some(PatternMatch {
            name: "shooting_star".to_string(),
            kind: PatternKind::Bearish,
            strength: upper_pct,
        })
    } else {
        None
    }
}

fn doji(candle: &Candle) -> Option<PatternMatch> {
    let range = candle.total_range();
    if range <= 0.0 {
        return None;
    }
    let body_pct = candle.body() / range;
    if body_pct < 0.05 {
        Some(PatternMatch {
            name: "doji".to_string(),
            kind: PatternKind::Neutral,
            strength: 1.0 - body_pct / 0.05,
        })
    } else {
        None
    }
}

fn engulfing(prev: &Candle, curr: &Candle) -> Option<PatternMatch> {
    if prev.body() <= 0.0 || curr.body() <= prev.body() {
        return None;
    }
    if curr.is_bullish() && prev.is_bearish() && curr.open <= prev.close && curr.close >= prev.open
    {
        return Some(PatternMatch {
            name: "bullish_engulfing".to_string(),
            kind: PatternKind::Bullish,
            strength: (curr.body() / prev.body()).min(3.0) / 3.0,
        });
    }
    if curr.is_bearish() && prev.is_bullish() && curr.open >= prev.close && curr.close <= prev.open
    {
        return Some(PatternMatch {
            name: "bearish_engulfing".to_string(),
            kind: PatternKind::Bearish,
            strength: (curr.body() / prev.body()).min(3.0) / 3.0,
        });
    }
    None
}

fn tweezer(prev: &Candle, curr: &Candle) -> Option<PatternMatch> {
    let tol = 0.002;
    let low_equal = (prev.low - curr.low).abs() / prev.low.max(1e-9) < tol;
    let high_equal = (prev.high - curr.high).abs() / prev.high.max(1e-9) < tol;

    if low_equal && prev.is_bearish() && curr.is_bullish() {
        return Some(PatternMatch {
            name: "tweezer_bottom".to_string(),
            kind: PatternKind::Bullish,
            strength: 0.6,
        });
    }
    if high_equal && prev.is_bullish() && curr.is_bearish() {
        return Some(PatternMatch {
            name: "tweezer_top".to_string(),
            kind: PatternKind::Bearish,
            strength: 0.6,
        });
    }
    None
}

fn inside_bar(prev: &Candle, curr: &Candle) -> Option<PatternMatch> {
    if curr.high < prev.high && curr.low > prev.low {
        Some(PatternMatch {
            name: "inside_bar".to_string(),
            kind: PatternKind::Neutral,
            strength: 0.4,
        })
    } else {
        None
    }
}

fn two_bar_reversal(prev: &Candle, curr: &Candle) -> Option<PatternMatch> {
    if curr.low < prev.low && curr.close > prev.high && curr.is_bullish() {
        return Some(PatternMatch {
            name: "two_bar_reversal".to_string(),
            kind: PatternKind::Bullish,
            strength: 0.7,
        });
    }
    if curr.high > prev.high && curr.close < prev.low && curr.is_bearish() {
        return Some(PatternMatch {
            name: "two_bar_reversal".to_string(),
            kind: PatternKind::Bearish,
            strength: 0.7,
        });
    }
    None
}

fn morning_star(a: &Candle, b: &Candle, c: &Candle) -> Option<PatternMatch> {
    let a_range = a.total_range();
    if a_range <= 0.0 {
        return None;
    }
    let a_is_large_down = a.is_bearish() && a.body() / a_range > 0.5;
    let b_is_small = b.total_range() > 0.0 && b.body() / b.total_range() < 0.3;
    let c_confirms = c.is_bullish() && c.close > a.body_bottom() + a.body() / 2.0;
    if a_is_large_down && b_is_small && c_confirms {
        Some(PatternMatch {
            name: "morning_star".to_string(),
            kind: PatternKind::Bullish,
            strength: 0.8,
        })
    } else {
        None
    }
}

fn evening_star(a: &Candle, b: &Candle, c: &Candle) -> Option<PatternMatch> {
    let a_range = a.total_range();
    if a_range <= 0.0 {
        return None;
    }
    let a_is_large_up = a.is_bullish() && a.body() / a_range > 0.5;
    let b_is_small = b.total_range() > 0.0 && b.body() / b.total_range() < 0.3;
    let c_confirms = c.is_bearish() && c.close < a.body_top() - a.body() / 2.0;
    if a_is_large_up && b_is_small && c_confirms {
        Some(PatternMatch {
            name: "evening_star".to_string(),
            kind: PatternKind::Bearish,
            strength: 0.8,
        })
    } else {
        None
    }
}

/// First match in priority order: 3-bar -> 2-bar reversal -> tweezers ->
/// engulfing -> inside-bar -> pin-bar (hammer/shooting star) -> doji.
pub fn detect_reversal_pattern(candles: &CandleSeries) -> Option<PatternMatch> {
    let n = candles.len();
    if n < 1 {
        return None;
    }
    let curr = &candles[n - 1];

    if n >= 3 {
        let a = &candles[n - 3];
        let b = &candles[n - 2];
        if let Some(m) = morning_star(a, b, curr) {
            return Some(m);
        }
        if let Some(m) = evening_star(a, b, curr) {
            return Some(m);
        }
    }

    if n >= 2 {
        let prev = &candles[n - 2];
        if let Some(m) = two_bar_reversal(prev, curr) {
            return Some(m);
        }
        if let Some(m) = tweezer(prev, curr) {
            return Some(m);
        }
        if let Some(m) = engulfing(prev, curr) {
            return Some(m);
        }
        if let Some(m) = inside_bar(prev, curr) {
            return Some(m);
        }
    }

    if let Some(m) = hammer(curr) {
        return Some(m);
    }
    if let Some(m) = shooting_star(curr) {
        return Some(m);
    }
    doji(curr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_candles;

    #[test]
    fn hammer_detected_on_long_lower_wick() {
        let candles = make_candles(&[(100.0, 101.0, 90.0, 100.5)]);
        let m = detect_reversal_pattern(&candles).unwrap();
        assert_eq!(m.name, "hammer");
        assert_eq!(m.kind, PatternKind::Bullish);
    }

    #[test]
    fn bullish_engulfing_detected() {
        let candles = make_candles(&[(100.0, 101.0, 98.0, 98.5), (98.0, 103.0, 97.5, 102.5)]);
        let m = detect_reversal_pattern(&candles).unwrap();
        assert_eq!(m.name, "bullish_engulfing");
    }

    #[test]
    fn doji_detected_on_near_zero_body() {
        let candles = make_candles(&[(100.0, 110.0, 90.0, 100.2)]);
        let m = detect_reversal_pattern(&candles).unwrap();
        assert_eq!(m.name, "doji");
    }

    #[test]
    fn candle_strength_zero_range_is_neutral() {
        let candles = make_candles(&[(100.0, 100.0, 100.0, 100.0)]);
        let strength = get_candle_strength(&candles[0]);
        assert_eq!(strength.direction, PatternKind::Neutral);
        assert_eq!(strength.body_percent, 0.0);
        assert!(strength.rejection.is_none());
    }

    #[test]
    fn inside_bar_detected() {
        let candles = make_candles(&[(100.0, 110.0, 90.0, 105.0), (102.0, 107.0, 95.0, 103.0)]);
        let m = detect_reversal_pattern(&candles).unwrap();
        assert_eq!(m.name, "inside_bar");
    }
}
