use crate::core::atr::atr;
use crate::models::{CandleSeries, MarketRegime, Structure};

/// OLS slope of `close` over the trailing `period` candles, normalised to a
/// percent-of-average-close so it is comparable across symbols/price scales.
pub fn slope(candles: &CandleSeries, period: usize) -> f64 {
    let n = candles.len();
    if n < 2 {
        return 0.0;
    }
    let period = period.min(n);
    let start = n - period;
    let closes: Vec<f64> = (start..n).map(|i| candles[i].close).collect();

    let len = closes.len() as f64;
    let xs: Vec<f64> = (0..closes.len()).map(|i| i as f64).collect();
    let x_mean = xs.iter().sum::<f64>() / len;
    let y_mean = closes.iter().sum::<f64>() / len;

    let mut num = 0.0;
    let mut den = 0.0;
    for i in 0..closes.len() {
        num += (xs[i] - x_mean) * (closes[i] - y_mean);
        den += (xs[i] - x_mean).powi(2);
    }
    if den == 0.0 {
        return 0.0;
    }
    let raw_slope = num / den;
    if y_mean == 0.0 {
        0.0
    } else {
        raw_slope / y_mean * 100.0
    }
}

/// ATR-ratio / slope priority ladder, falling back to `structure` with lower
/// confidence when neither ATR nor slope are decisive.
pub fn detect_market_regime(
    candles: &CandleSeries,
    structure: Structure,
    atr_period: usize,
    slope_period: usize,
) -> (MarketRegime, f64) {
    let n = candles.len();
    let current_atr = atr(candles, atr_period);

    let historical_atr = if n > 25 + atr_period {
        let historical_slice = candles.slice(0, n - 25);
        atr(&historical_slice, atr_period)
    } else {
        current_atr
    };

    let atr_ratio = if historical_atr > 0.0 {
        current_atr / historical_atr
    } else {
        1.0
    };
    let slope_pct = slope(candles, slope_period);

    if atr_ratio > 1.5 {
        return (MarketRegime::Expansion, 0.7);
    }

    if slope_pct.abs() > 0.3 && structure != Structure::Neutral {
        let regime = if structure == Structure::Up {
            MarketRegime::TrendUp
        } else {
            MarketRegime::TrendDown
        };
        return (regime, 0.8);
    }

    if atr_ratio < 0.8 && slope_pct.abs() < 0.2 {
        return (MarketRegime::Range, 0.7);
    }

    let fallback = match structure {
        Structure::Up => MarketRegime::TrendUp,
        Structure::Down => MarketRegime::TrendDown,
        Structure::Neutral => MarketRegime::Range,
    };
    (fallback, 0.3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_bearish_trend, make_bullish_trend, make_candles};

    #[test]
    fn trending_market_yields_trend_regime() {
        let candles = make_bullish_trend(60, 100.0);
        let (regime, confidence) = detect_market_regime(&candles, Structure::Up, 14, 20);
        assert!(matches!(regime, MarketRegime::TrendUp | MarketRegime::Expansion));
        assert!(confidence >= 0.3);
    }

    #[test]
    fn flat_market_yields_range() {
        let data: Vec<(f64, f64, f64, f64)> =
            (0..80).map(|_| (100.0, 100.3, 99.7, 100.0)).collect();
        let candles = make_candles(&data);
        let (regime, _) = detect_market_regime(&candles, Structure::Neutral, 14, 20);
        assert_eq!(regime, MarketRegime::Range);
    }

    #[test]
    fn downtrend_yields_trend_down() {
        let candles = make_bearish_trend(60, 500.0);
        let (regime, _) = detect_market_regime(&candles, Structure::Down, 14, 20);
        assert!(matches!(regime, MarketRegime::TrendDown | MarketRegime::Expansion));
    }

    #[test]
    fn slope_is_positive_for_rising_closes() {
        let candles = make_bullish_trend(40, 100.0);
        assert!(slope(&candles, 20) > 0.0);
    }
}
