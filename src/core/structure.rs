use std::collections::HashMap;

use crate::core::pivots::{recent_pivot_highs, recent_pivot_lows};
use crate::models::{Bias, CandleSeries, Side, Structure, Timeframe};

/// Classify trend from the last 3 pivot highs and 3 pivot lows: both legs
/// strictly ascending is `up`, both descending is `down`, anything else (not
/// enough pivots, or the legs disagree) is `neutral`.
pub fn analyze_market_structure(candles: &CandleSeries, window: usize) -> Structure {
    let highs = recent_pivot_highs(candles, window, 3);
    let lows = recent_pivot_lows(candles, window, 3);

    if highs.len() < 3 || lows.len() < 3 {
        return Structure::Neutral;
    }

    let high_prices: Vec<f64> = highs.iter().map(|&i| candles[i].high).collect();
    let low_prices: Vec<f64> = lows.iter().map(|&i| candles[i].low).collect();

    let ascending = |v: &[f64]| v.windows(2).all(|w| w[0] < w[1]);
    let descending = |v: &[f64]| v.windows(2).all(|w| w[0] > w[1]);

    if ascending(&high_prices) && ascending(&low_prices) {
        Structure::Up
    } else if descending(&high_prices) && descending(&low_prices) {
        Structure::Down
    } else {
        Structure::Neutral
    }
}

/// Weighted aggregate of per-timeframe structure into a single bias.
pub fn determine_htf_bias(
    structures: &HashMap<Timeframe, Structure>,
    weights: &HashMap<Timeframe, f64>,
) -> Bias {
    let score: f64 = structures
        .iter()
        .map(|(tf, s)| weights.get(tf).copied().unwrap_or(0.0) * s.sign())
        .sum();

    if score >= 0.5 {
        Bias::Bullish
    } else if score <= -0.5 {
        Bias::Bearish
    } else {
        Bias::Neutral
    }
}

/// Whether every present timeframe's structure agrees with the aggregate bias.
pub fn htf_alignment(structures: &HashMap<Timeframe, Structure>, bias: Bias) -> bool {
    if structures.is_empty() {
        return false;
    }
    structures.values().all(|s| match bias {
        Bias::Bullish => *s == Structure::Up,
        Bias::Bearish => *s == Structure::Down,
        Bias::Neutral => *s == Structure::Neutral,
    })
}

/// Side-vs-bias agreement, and a confidence score derived from the same
/// per-timeframe weight sum `determine_htf_bias` computed — re-expressed as
/// a fraction of total configured weight for the caller's convenience.
pub fn check_htf_alignment(
    side: Side,
    bias: Bias,
    structures: &HashMap<Timeframe, Structure>,
    weights: &HashMap<Timeframe, f64>,
) -> (bool, f64) {
    let aligned = bias.matches(side);

    let total_weight: f64 = structures.keys().filter_map(|tf| weights.get(tf)).sum();
    if total_weight <= 0.0 {
        return (aligned, 0.0);
    }
    let agreeing_weight: f64 = structures
        .iter()
        .filter(|(_, s)| match side {
            Side::Long => **s == Structure::Up,
            Side::Short => **s == Structure::Down,
        })
        .filter_map(|(tf, _)| weights.get(tf))
        .sum();

    (aligned, (agreeing_weight / total_weight).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_candles;

    fn rising_waves(waves: usize) -> CandleSeries {
        let mut data = Vec::new();
        for wave in 0..waves {
            let trough = 100.0 + wave as f64 * 40.0;
            let peak = trough + 30.0;
            for i in 0..6 {
                let v = trough + i as f64 * 5.0;
                data.push((v, v + 1.0, v - 1.0, v + 0.5));
            }
            for _ in 0..2 {
                data.push((peak, peak + 1.0, peak - 2.0, peak - 1.0));
            }
            for i in 0..6 {
                let v = peak - i as f64 * 3.0;
                data.push((v, v + 0.5, v - 1.0, v - 0.5));
            }
        }
        make_candles(&data)
    }

    fn falling_waves(waves: usize) -> CandleSeries {
        let mut data = Vec::new();
        for wave in 0..waves {
            let peak = 500.0 - wave as f64 * 40.0;
            let trough = peak - 30.0;
            for i in 0..6 {
                let v = peak - i as f64 * 5.0;
                data.push((v, v + 1.0, v - 1.0, v - 0.5));
            }
            for _ in 0..2 {
                data.push((trough, trough + 2.0, trough - 1.0, trough + 1.0));
            }
            for i in 0..6 {
                let v = trough + i as f64 * 3.0;
                data.push((v, v + 1.0, v - 0.5, v + 0.5));
            }
        }
        make_candles(&data)
    }

    #[test]
    fn ascending_pivots_classify_up() {
        let candles = rising_waves(4);
        assert_eq!(analyze_market_structure(&candles, 5), Structure::Up);
    }

    #[test]
    fn descending_pivots_classify_down() {
        let candles = falling_waves(4);
        assert_eq!(analyze_market_structure(&candles, 5), Structure::Down);
    }

    #[test]
    fn flat_series_is_neutral() {
        let data: Vec<(f64, f64, f64, f64)> = (0..20).map(|_| (100.0, 100.5, 99.5, 100.0)).collect();
        let candles = make_candles(&data);
        assert_eq!(analyze_market_structure(&candles, 5), Structure::Neutral);
    }

    #[test]
    fn htf_bias_weights_daily_over_4h() {
        let mut weights = HashMap::new();
        weights.insert(Timeframe::D1, 0.6);
        weights.insert(Timeframe::H4, 0.4);

        let mut structures = HashMap::new();
        structures.insert(Timeframe::D1, Structure::Up);
        structures.insert(Timeframe::H4, Structure::Down);

        // 0.6 - 0.4 = 0.2, below the +-0.5 threshold => neutral despite daily up.
        assert_eq!(determine_htf_bias(&structures, &weights), Bias::Neutral);

        structures.insert(Timeframe::H4, Structure::Up);
        assert_eq!(determine_htf_bias(&structures, &weights), Bias::Bullish);
        assert!(htf_alignment(&structures, Bias::Bullish));
    }

    #[test]
    fn check_alignment_matches_side() {
        let mut weights = HashMap::new();
        weights.insert(Timeframe::D1, 0.6);
        weights.insert(Timeframe::H4, 0.4);
        let mut structures = HashMap::new();
        structures.insert(Timeframe::D1, Structure::Up);
        structures.insert(Timeframe::H4, Structure::Up);

        let (aligned, score) = check_htf_alignment(Side::Long, Bias::Bullish, &structures, &weights);
        assert!(aligned);
        assert!((score - 1.0).abs() < 1e-9);

        let (aligned_short, _) = check_htf_alignment(Side::Short, Bias::Bullish, &structures, &weights);
        assert!(!aligned_short);
    }
}
