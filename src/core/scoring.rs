use crate::config::Config;
use crate::core::indicators::Divergence;
use crate::core::patterns::get_candle_strength;
use crate::models::{Candle, PatternKind, Setup, Side};

/// Weighted breakdown summing to a 0-100 base score, plus an optional RSI
/// divergence bonus layered on top. Returns `(total, breakdown)` where
/// `breakdown` names each named contribution for logging/telemetry.
pub fn calculate_score(
    current: &Candle,
    setup: &Setup,
    htf_aligned: bool,
    htf_confidence: f64,
    divergence: Option<&Divergence>,
    volume_ratio: f64,
    config: &Config,
) -> (f64, Vec<(String, f64)>) {
    let side = setup.side();
    let mut breakdown = Vec::new();

    let htf_component = if htf_aligned {
        25.0 + 5.0 * htf_confidence
    } else {
        5.0 + 15.0 * htf_confidence
    }
    .clamp(0.0, 30.0);
    breakdown.push(("htf_alignment".to_string(), htf_component));

    let setup_component = setup_quality(setup).clamp(0.0, 30.0);
    breakdown.push(("setup_quality".to_string(), setup_component));

    let candle_component = candle_strength_component(current, side).clamp(0.0, 25.0);
    breakdown.push(("candle_strength".to_string(), candle_component));

    let volume_component = volume_component(volume_ratio, setup.volume_spike(), config).clamp(0.0, 15.0);
    breakdown.push(("volume".to_string(), volume_component));

    let mut total = htf_component + setup_component + candle_component + volume_component;

    let divergence_aligned = divergence.map_or(false, |d| {
        matches!(
            (d.kind, side),
            (PatternKind::Bullish, Side::Long) | (PatternKind::Bearish, Side::Short)
        )
    });
    if divergence_aligned {
        breakdown.push(("rsi_divergence".to_string(), config.rsi_divergence_bonus));
        total += config.rsi_divergence_bonus;
    }

    (total, breakdown)
}

fn setup_quality(setup: &Setup) -> f64 {
    match setup {
        Setup::Reversal { meta, .. } => {
            let pattern_strength = meta.pattern.as_ref().map_or(0.0, |p| p.strength);
            10.0 + 12.0 + pattern_strength * 8.0
        }
        Setup::Breakout { .. } | Setup::Breakdown { .. } => 10.0 + 15.0,
        Setup::Retest { meta, .. } => {
            10.0 + 12.0 + if meta.pattern.is_some() { 5.0 } else { 0.0 }
        }
        Setup::FalseBreakout { .. } => 10.0 + 10.0,
    }
}

fn candle_strength_component(candle: &Candle, side: Side) -> f64 {
    let strength = get_candle_strength(candle);
    let mut score = 12.0;

    let aligned_direction = match side {
        Side::Long => strength.direction == PatternKind::Bullish,
        Side::Short => strength.direction == PatternKind::Bearish,
    };

    if aligned_direction {
        score += 10.0 * strength.body_percent;

        let in_aligned_half = match side {
            Side::Long => strength.close_location > 0.5,
            Side::Short => strength.close_location < 0.5,
        };
        if in_aligned_half {
            score += 3.0;
        }
    } else {
        score -= 6.0;
    }

    if let Some(rejection) = strength.rejection {
        let rejection_supports_side = match side {
            Side::Long => rejection.kind == crate::models::RejectionKind::Downside,
            Side::Short => rejection.kind == crate::models::RejectionKind::Upside,
        };
        if rejection_supports_side {
            score += 4.0 * rejection.strength;
        }
    }

    score
}

fn volume_component(volume_ratio: f64, setup_flagged_spike: bool, config: &Config) -> f64 {
    let mut score = 5.0;

    if volume_ratio >= config.volume_spike_threshold {
        score += 10.0;
    } else if volume_ratio >= 1.3 {
        score += 7.0;
    } else if volume_ratio >= 1.0 {
        score += 5.0;
    } else if volume_ratio < 0.8 {
        score -= 3.0;
    }

    if setup_flagged_spike {
        score += 3.0;
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SetupMeta, Zone, ZoneKind};
    use crate::test_helpers::{default_test_config, make_candles};
    use chrono::Utc;

    fn reversal_setup() -> Setup {
        Setup::Reversal {
            meta: SetupMeta {
                side: Side::Long,
                price: 100.0,
                zones: vec![],
                pattern: None,
            },
            zone: Zone::new(ZoneKind::Support, 100.0, 0.01, Utc::now()),
        }
    }

    #[test]
    fn aligned_strong_candle_scores_higher_than_misaligned() {
        let config = default_test_config();
        let bullish = &make_candles(&[(100.0, 110.0, 99.0, 109.0)])[0].clone();
        let bearish = &make_candles(&[(100.0, 101.0, 90.0, 91.0)])[0].clone();
        let setup = reversal_setup();

        let (score_aligned, _) = calculate_score(bullish, &setup, true, 1.0, None, 1.0, &config);
        let (score_misaligned, _) = calculate_score(bearish, &setup, true, 1.0, None, 1.0, &config);
        assert!(score_aligned > score_misaligned);
    }

    #[test]
    fn htf_alignment_raises_score() {
        let config = default_test_config();
        let candle = &make_candles(&[(100.0, 105.0, 99.0, 104.0)])[0].clone();
        let setup = reversal_setup();

        let (aligned, _) = calculate_score(candle, &setup, true, 1.0, None, 1.0, &config);
        let (not_aligned, _) = calculate_score(candle, &setup, false, 0.0, None, 1.0, &config);
        assert!(aligned > not_aligned);
    }
}
