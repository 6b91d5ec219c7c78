use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::config::{Config, SignalMode};
use crate::models::{Candle, CandleSeries, Timeframe};

/// Create candles from (open, high, low, close) tuples with auto-incrementing 1m timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let base = DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc);

    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            timestamp: base + Duration::minutes(i as i64),
            close_time: None,
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
            is_closed: true,
        })
        .collect();

    CandleSeries::new(candles)
}

/// Create n rising (bullish) candles starting from `start` price.
pub fn make_bullish_trend(n: usize, start: f64) -> CandleSeries {
    let base = DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc);

    let candles: Vec<Candle> = (0..n)
        .map(|i| {
            let open = start + i as f64 * 10.0;
            let close = open + 8.0;
            Candle {
                timestamp: base + Duration::minutes(i as i64),
                close_time: None,
                open,
                high: close + 2.0,
                low: open - 1.0,
                close,
                volume: 100.0,
                is_closed: true,
            }
        })
        .collect();

    CandleSeries::new(candles)
}

/// Create n falling (bearish) candles starting from `start` price.
pub fn make_bearish_trend(n: usize, start: f64) -> CandleSeries {
    let base = DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc);

    let candles: Vec<Candle> = (0..n)
        .map(|i| {
            let open = start - i as f64 * 10.0;
            let close = open - 8.0;
            Candle {
                timestamp: base + Duration::minutes(i as i64),
                close_time: None,
                open,
                high: open + 1.0,
                low: close - 2.0,
                close,
                volume: 100.0,
                is_closed: true,
            }
        })
        .collect();

    CandleSeries::new(candles)
}

/// A Config suitable for testing — no API keys needed, permissive gates.
pub fn default_test_config() -> Config {
    let mut htf_weights = HashMap::new();
    htf_weights.insert(Timeframe::D1, 0.6);
    htf_weights.insert(Timeframe::H4, 0.4);

    Config {
        exchange: "generic".to_string(),
        symbols: vec!["BTC-PERP".to_string()],
        timeframes: vec![Timeframe::D1, Timeframe::H4, Timeframe::H1],
        entry_timeframes: vec![Timeframe::H1],
        htf_timeframes: vec![Timeframe::D1, Timeframe::H4],
        api_key: String::new(),
        api_secret: String::new(),

        mode: SignalMode::Pro,
        setup_stage_enabled: true,
        entry_stage_enabled: true,

        setup_score_threshold: 60.0,
        entry_score_threshold: 75.0,
        min_zones_required: 2,
        min_rr: 1.5,
        signal_cooldown_minutes: 60,

        pivot_window: 5,
        zone_lookback: 200,
        zone_tolerance_pct: 0.005,
        zone_sl_buffer_pct: 0.002,

        htf_weights,

        require_volume_confirmation: true,
        volume_spike_threshold: 1.5,

        atr_period: 14,
        sweep_lookback: 20,
        structure_lookback: 3,

        anti_chase_max_atr: 2.5,
        anti_chase_max_pct: 3.0,

        rsi_divergence_bonus: 10.0,

        dry_run: true,
        cooldown_store_path: std::env::temp_dir()
            .join("pa_signal_engine_test_cooldowns.ndjson")
            .to_string_lossy()
            .to_string(),

        log_level: "error".to_string(),
    }
}
