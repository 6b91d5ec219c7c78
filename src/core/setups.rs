use crate::config::Config;
use crate::core::liquidity::detect_sweep_against_level;
use crate::core::patterns::detect_reversal_pattern;
use crate::core::zones::{find_next_opposing_zones, is_touching};
use crate::models::{CandleSeries, PatternKind, Setup, SetupMeta, Side, Zone, ZoneKind};

const RETEST_WINDOW: usize = 20;

/// Current candle's volume over the trailing `lookback`-candle average.
pub fn volume_ratio(candles: &CandleSeries, lookback: usize) -> f64 {
    let n = candles.len();
    if n == 0 {
        return 1.0;
    }
    let start = n.saturating_sub(lookback + 1);
    let history = candles.slice(start, n.saturating_sub(1));
    if history.is_empty() {
        return 1.0;
    }
    let avg: f64 = history.iter().map(|c| c.volume).sum::<f64>() / history.len() as f64;
    if avg <= 0.0 {
        return 1.0;
    }
    candles[n - 1].volume / avg
}

fn pattern_matches_side(pattern_kind: PatternKind, side: Side) -> bool {
    match side {
        Side::Long => pattern_kind == PatternKind::Bullish,
        Side::Short => pattern_kind == PatternKind::Bearish,
    }
}

/// Current close near a support/resistance zone with a confirming reversal
/// pattern in the last candles.
fn detect_reversal(candles: &CandleSeries, zones: &[Zone]) -> Option<Setup> {
    let current = candles.last()?;
    let pattern = detect_reversal_pattern(candles)?;

    for zone in zones {
        if !is_touching(current.close, zone) {
            continue;
        }
        let side = match zone.kind {
            ZoneKind::Support => Side::Long,
            ZoneKind::Resistance => Side::Short,
        };
        if pattern_matches_side(pattern.kind, side) {
            return Some(Setup::Reversal {
                meta: SetupMeta {
                    side,
                    price: current.close,
                    zones: zones.to_vec(),
                    pattern: Some(pattern),
                },
                zone: zone.clone(),
            });
        }
    }
    None
}

/// Previous close on the origin side of a zone, current close strictly beyond
/// the far edge. Volume spike confirms a true breakout/breakdown; otherwise
/// the move is faded as a false breakout in the opposite direction.
fn detect_breakout(
    candles: &CandleSeries,
    zones: &[Zone],
    config: &Config,
) -> Option<Setup> {
    let n = candles.len();
    if n < 2 {
        return None;
    }
    let prev = &candles[n - 2];
    let curr = &candles[n - 1];
    let vol_ratio = volume_ratio(candles, 20);
    let spike = vol_ratio >= config.volume_spike_threshold;

    for zone in zones {
        match zone.kind {
            ZoneKind::Resistance if prev.close <= zone.upper && curr.close > zone.upper => {
                if spike {
                    return Some(Setup::Breakout {
                        meta: SetupMeta {
                            side: Side::Long,
                            price: curr.close,
                            zones: zones.to_vec(),
                            pattern: None,
                        },
                        zone: zone.clone(),
                        volume_spike: true,
                        volume_ratio: vol_ratio,
                    });
                } else {
                    return Some(Setup::FalseBreakout {
                        meta: SetupMeta {
                            side: Side::Short,
                            price: curr.close,
                            zones: zones.to_vec(),
                            pattern: None,
                        },
                        zone: zone.clone(),
                    });
                }
            }
            ZoneKind::Support if prev.close >= zone.lower && curr.close < zone.lower => {
                if spike {
                    return Some(Setup::Breakdown {
                        meta: SetupMeta {
                            side: Side::Short,
                            price: curr.close,
                            zones: zones.to_vec(),
                            pattern: None,
                        },
                        zone: zone.clone(),
                        volume_spike: true,
                        volume_ratio: vol_ratio,
                    });
                } else {
                    return Some(Setup::FalseBreakout {
                        meta: SetupMeta {
                            side: Side::Long,
                            price: curr.close,
                            zones: zones.to_vec(),
                            pattern: None,
                        },
                        zone: zone.clone(),
                    });
                }
            }
            _ => {}
        }
    }
    None
}

/// Wick pierces a zone boundary but the close returns inside with no volume
/// spike confirming a continuation — fade the pierce direction.
fn detect_rejection(candles: &CandleSeries, zones: &[Zone], config: &Config) -> Option<Setup> {
    let curr = candles.last()?;
    let vol_ratio = volume_ratio(candles, 20);
    if vol_ratio >= config.volume_spike_threshold {
        return None;
    }

    for zone in zones {
        let side = match zone.kind {
            ZoneKind::Resistance => Side::Short,
            ZoneKind::Support => Side::Long,
        };
        let reference = match zone.kind {
            ZoneKind::Resistance => zone.upper,
            ZoneKind::Support => zone.lower,
        };
        if detect_sweep_against_level(curr, reference, side).is_some() {
            return Some(Setup::FalseBreakout {
                meta: SetupMeta {
                    side,
                    price: curr.close,
                    zones: zones.to_vec(),
                    pattern: None,
                },
                zone: zone.clone(),
            });
        }
    }
    None
}

/// A breakout through a zone within the last `RETEST_WINDOW` candles, followed
/// by price re-touching the zone from the breakout side with a confirming
/// pattern in the breakout direction.
fn detect_retest(candles: &CandleSeries, zones: &[Zone]) -> Option<Setup> {
    let n = candles.len();
    if n < RETEST_WINDOW + 2 {
        return None;
    }
    let window_start = n - RETEST_WINDOW - 1;
    let curr = &candles[n - 1];
    let pattern = detect_reversal_pattern(candles);

    for zone in zones {
        let (side, broke) = match zone.kind {
            ZoneKind::Resistance => (
                Side::Long,
                (window_start..n - 1).any(|i| {
                    candles[i].close <= zone.upper && candles[i + 1].close > zone.upper
                }),
            ),
            ZoneKind::Support => (
                Side::Short,
                (window_start..n - 1).any(|i| {
                    candles[i].close >= zone.lower && candles[i + 1].close < zone.lower
                }),
            ),
        };

        if !broke || !is_touching(curr.close, zone) {
            continue;
        }

        let pattern_confirms = pattern
            .as_ref()
            .map_or(false, |p| pattern_matches_side(p.kind, side));
        if pattern_confirms {
            return Some(Setup::Retest {
                meta: SetupMeta {
                    side,
                    price: curr.close,
                    zones: zones.to_vec(),
                    pattern: pattern.clone(),
                },
                zone: zone.clone(),
            });
        }
    }
    None
}

/// Priority-ordered setup detection: reversal, breakout/breakdown (or its false
/// variant), rejection-fade, retest. Returns `None` if the zone inventory does
/// not meet `minZonesRequired` when that gate is enabled.
pub fn detect_setup(candles: &CandleSeries, zones: &[Zone], config: &Config) -> Option<Setup> {
    if config.min_zones_required > 0 && zones.len() < config.min_zones_required {
        return None;
    }

    detect_reversal(candles, zones)
        .or_else(|| detect_breakout(candles, zones, config))
        .or_else(|| detect_rejection(candles, zones, config))
        .or_else(|| detect_retest(candles, zones))
}

pub fn opposing_targets_for(entry: f64, zones: &[Zone], side: Side, k: usize) -> Vec<Zone> {
    find_next_opposing_zones(entry, zones, side, k)
}
