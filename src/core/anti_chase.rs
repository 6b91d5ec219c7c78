use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::atr::atr;
use crate::core::events::StructureEvent;
use crate::models::{CandleSeries, ChaseDecision, Setup, Side, StructureEventKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaseMetrics {
    pub atr_move: f64,
    pub pct_move: f64,
    pub body_to_range: f64,
    pub volume_ratio: f64,
    pub volume_climax: bool,
    pub consecutive_trend_candles: usize,
    pub momentum_slowdown: bool,
    pub momentum_acceleration: bool,
    pub aligned_choch: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaseEvaluation {
    pub decision: ChaseDecision,
    pub reason: String,
    pub score: f64,
    pub metrics: ChaseMetrics,
}

fn consecutive_same_colour(candles: &CandleSeries) -> usize {
    let n = candles.len();
    if n == 0 {
        return 0;
    }
    let last_bullish = candles[n - 1].is_bullish();
    let last_bearish = candles[n - 1].is_bearish();
    if !last_bullish && !last_bearish {
        return 0;
    }
    let mut count = 0;
    for i in (0..n).rev() {
        let c = &candles[i];
        if c.is_bullish() == last_bullish && c.is_bearish() == last_bearish {
            count += 1;
        } else {
            break;
        }
    }
    count
}

fn volume_ratio_and_climax(candles: &CandleSeries, lookback: usize) -> (f64, bool) {
    let n = candles.len();
    if n == 0 {
        return (1.0, false);
    }
    let start = n.saturating_sub(lookback);
    let window = candles.slice(start, n);
    let avg: f64 = window.iter().map(|c| c.volume).sum::<f64>() / window.len().max(1) as f64;
    let current = candles[n - 1].volume;
    let ratio = if avg > 0.0 { current / avg } else { 1.0 };
    let is_max = window.iter().all(|c| c.volume <= current);
    (ratio, ratio >= 2.5 && is_max)
}

fn momentum_shift(candles: &CandleSeries) -> (bool, bool) {
    let n = candles.len();
    if n < 3 {
        return (false, false);
    }
    let b1 = candles[n - 3].body();
    let b2 = candles[n - 2].body();
    let b3 = candles[n - 1].body();
    let slowdown = b3 < b2 && b2 < b1 * 1.5 && b3 < b1 * 0.6;
    let acceleration = b3 > b2 && b2 >= b1;
    (slowdown, acceleration)
}

/// Additive risk ladder: higher score = riskier to chase. Entry gate is the
/// caller's responsibility (`decision == CHASE_NO` should veto the signal).
pub fn evaluate_chase_risk(
    candles: &CandleSeries,
    setup: &Setup,
    structure_event: Option<&StructureEvent>,
    config: &Config,
) -> ChaseEvaluation {
    let side = setup.side();
    let entry = setup.meta().price;
    let current_atr = atr(candles, config.atr_period);
    let current = candles.last();

    let atr_move = current
        .map(|c| if current_atr > 0.0 { (c.close - entry).abs() / current_atr } else { 0.0 })
        .unwrap_or(0.0);
    let pct_move = current
        .map(|c| if entry != 0.0 { (c.close - entry).abs() / entry * 100.0 } else { 0.0 })
        .unwrap_or(0.0);
    let body_to_range = current
        .map(|c| if c.total_range() > 0.0 { c.body() / c.total_range() } else { 0.0 })
        .unwrap_or(0.0);

    let (volume_ratio, volume_climax) = volume_ratio_and_climax(candles, 20);
    let consecutive = consecutive_same_colour(candles);
    let (slowdown, acceleration) = momentum_shift(candles);

    let aligned_choch = structure_event.map_or(false, |e| {
        e.kind == StructureEventKind::Choch
            && match side {
                Side::Long => e.side == Side::Long,
                Side::Short => e.side == Side::Short,
            }
    });
    let counter_choch = structure_event.map_or(false, |e| {
        e.kind == StructureEventKind::Choch && e.side == side.opposite()
    });

    let mut score = 0.0;
    let mut reasons = Vec::new();

    if atr_move > config.anti_chase_max_atr || pct_move > config.anti_chase_max_pct {
        score += 40.0;
        reasons.push("extension beyond max move".to_string());
    } else {
        let atr_frac = (atr_move / config.anti_chase_max_atr).clamp(0.0, 1.0);
        let pct_frac = (pct_move / config.anti_chase_max_pct).clamp(0.0, 1.0);
        score += 40.0 * atr_frac.max(pct_frac);
    }

    if consecutive >= 5 {
        score += 20.0;
        reasons.push("5+ consecutive trend candles".to_string());
    } else if consecutive >= 3 {
        score += 15.0;
        reasons.push("3+ consecutive trend candles".to_string());
    } else if consecutive >= 2 {
        score += 10.0;
        reasons.push("2+ consecutive trend candles".to_string());
    }

    if body_to_range > 0.7 {
        score += 15.0;
        reasons.push("large dominant body".to_string());
    } else if body_to_range > 0.5 {
        score += 8.0;
    }

    if volume_climax {
        score -= 15.0;
        reasons.push("volume climax".to_string());
    } else if volume_ratio >= config.volume_spike_threshold {
        score += 10.0;
        reasons.push("volume spike".to_string());
    }

    if slowdown {
        score -= 20.0;
        reasons.push("momentum slowdown".to_string());
    } else if acceleration {
        score += 10.0;
        reasons.push("momentum acceleration".to_string());
    }

    if aligned_choch {
        score -= 25.0;
        reasons.push("aligned CHoCH supports continuation".to_string());
    }

    let decision = if score >= 50.0 {
        ChaseDecision::ChaseNo
    } else if score >= 25.0 {
        ChaseDecision::ChaseOk
    } else if volume_climax || (consecutive >= 5 && slowdown) || counter_choch {
        ChaseDecision::ReversalWatch
    } else {
        ChaseDecision::ChaseOk
    };

    let reason = if reasons.is_empty() {
        "no elevated chase risk factors".to_string()
    } else {
        reasons.join("; ")
    };

    ChaseEvaluation {
        decision,
        reason,
        score,
        metrics: ChaseMetrics {
            atr_move,
            pct_move,
            body_to_range,
            volume_ratio,
            volume_climax,
            consecutive_trend_candles: consecutive,
            momentum_slowdown: slowdown,
            momentum_acceleration: acceleration,
            aligned_choch,
        },
    }
}
