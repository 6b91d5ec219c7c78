use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use pa_signal_engine::config::{Config, SignalMode};
use pa_signal_engine::models::{Candle, Timeframe};

/// Candles from (open, high, low, close) tuples, auto-incrementing timestamps
/// spaced one `tf` bar apart starting from a fixed base time.
pub fn make_candles(tf: Timeframe, data: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    let base = DateTime::parse_from_rfc3339("2024-01-15T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    let step = Duration::from_std(tf.as_duration()).unwrap();

    data.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            timestamp: base + step * i as i32,
            close_time: None,
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
            is_closed: true,
        })
        .collect()
}

/// A zigzag series that nets upward over `n` bars, enough to carve pivots,
/// zones and market structure without relying on randomness.
pub fn wavy_uptrend(tf: Timeframe, n: usize, base_price: f64) -> Vec<Candle> {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let trend = i as f64 * 0.15;
            let wave = ((i as f64) * 0.9).sin() * 5.0;
            let v = base_price + trend + wave;
            (v, v + 4.0, v - 4.0, v + wave.signum() * 1.5)
        })
        .collect();
    make_candles(tf, &data)
}

/// A permissive config for integration tests — no API keys needed, every
/// gate left at the library default so tests only loosen what they assert on.
pub fn test_config() -> Config {
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
            .join(format!("pa_signal_engine_integ_{}.ndjson", std::process::id()))
            .to_string_lossy()
            .to_string(),

        log_level: "error".to_string(),
    }
}
