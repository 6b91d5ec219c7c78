use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::Timeframe;

pub type SharedConfig = Arc<RwLock<Config>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalMode {
    Pro,
    Aggressive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Ingestion
    pub exchange: String,
    pub symbols: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    pub entry_timeframes: Vec<Timeframe>,
    pub htf_timeframes: Vec<Timeframe>,
    pub api_key: String,
    pub api_secret: String,

    // Stage gating
    pub mode: SignalMode,
    pub setup_stage_enabled: bool,
    pub entry_stage_enabled: bool,

    // Score / risk gates
    pub setup_score_threshold: f64,
    pub entry_score_threshold: f64,
    pub min_zones_required: usize,
    pub min_rr: f64,
    pub signal_cooldown_minutes: i64,

    // C2/C3 tuning
    pub pivot_window: usize,
    pub zone_lookback: usize,
    pub zone_tolerance_pct: f64,
    pub zone_sl_buffer_pct: f64,

    // C4 HTF bias weights, keyed by timeframe
    pub htf_weights: HashMap<Timeframe, f64>,

    // Volume gate
    pub require_volume_confirmation: bool,
    pub volume_spike_threshold: f64,

    // C7/C8/C9 tuning
    pub atr_period: usize,
    pub sweep_lookback: usize,
    pub structure_lookback: usize,

    // C11 anti-chase thresholds
    pub anti_chase_max_atr: f64,
    pub anti_chase_max_pct: f64,

    // C12 scoring
    pub rsi_divergence_bonus: f64,

    // Notification / persistence
    pub dry_run: bool,
    pub cooldown_store_path: String,

    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };
        let env_parse = |key: &str, default: f64| -> f64 {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };
        let env_bool = |key: &str, default: bool| -> bool {
            std::env::var(key)
                .ok()
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(default)
        };
        let env_list = |key: &str, default: &[&str]| -> Vec<String> {
            std::env::var(key)
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|| default.iter().map(|s| s.to_string()).collect())
        };
        let env_tf_list = |key: &str, default: &[Timeframe]| -> Vec<Timeframe> {
            std::env::var(key)
                .ok()
                .map(|v| {
                    v.split(',')
                        .filter_map(|s| Timeframe::from_str_loose(s.trim()))
                        .collect::<Vec<_>>()
                })
                .filter(|v: &Vec<Timeframe>| !v.is_empty())
                .unwrap_or_else(|| default.to_vec())
        };

        let mode = match env("SIGNAL_MODE", "pro").to_lowercase().as_str() {
            "aggressive" => SignalMode::Aggressive,
            _ => SignalMode::Pro,
        };

        // Mode presets, overridden below by any explicit env value.
        let (preset_setup_score, preset_entry_score, preset_zones, preset_cooldown) = match mode {
            SignalMode::Pro => (60.0, 75.0, 2, 60),
            SignalMode::Aggressive => (50.0, 65.0, 1, 20),
        };

        let mut htf_weights = HashMap::new();
        htf_weights.insert(Timeframe::D1, 0.6);
        htf_weights.insert(Timeframe::H4, 0.4);

        let stages = env("SIGNAL_STAGE_ENABLED", "setup,entry");
        let setup_stage_enabled = stages.contains("setup");
        let entry_stage_enabled = stages.contains("entry");

        // Legacy single-threshold override: if set, it becomes the default for
        // both staged thresholds unless the staged key is itself set.
        let legacy_min_score = std::env::var("MIN_SIGNAL_SCORE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok());
        let default_setup_score = legacy_min_score.unwrap_or(preset_setup_score);
        let default_entry_score = legacy_min_score.unwrap_or(preset_entry_score);

        Config {
            exchange: env("EXCHANGE", "generic"),
            symbols: env_list("SYMBOLS", &["BTC-PERP"]),
            timeframes: env_tf_list(
                "TIMEFRAMES",
                &[Timeframe::D1, Timeframe::H4, Timeframe::H1],
            ),
            entry_timeframes: env_tf_list("ENTRY_TIMEFRAMES", &[Timeframe::H1]),
            htf_timeframes: env_tf_list("HTF_TIMEFRAMES", &[Timeframe::D1, Timeframe::H4]),
            api_key: env("API_KEY", ""),
            api_secret: env("API_SECRET", ""),

            mode,
            setup_stage_enabled,
            entry_stage_enabled,

            setup_score_threshold: env_parse("SETUP_SCORE_THRESHOLD", default_setup_score),
            entry_score_threshold: env_parse("ENTRY_SCORE_THRESHOLD", default_entry_score),
            min_zones_required: env_parse("MIN_ZONES_REQUIRED", preset_zones as f64) as usize,
            min_rr: env_parse("MIN_RR", 1.5),
            signal_cooldown_minutes: env_parse("SIGNAL_COOLDOWN_MINUTES", preset_cooldown as f64)
                as i64,

            pivot_window: env_parse("PIVOT_WINDOW", 5.0) as usize,
            zone_lookback: env_parse("ZONE_LOOKBACK", 200.0) as usize,
            zone_tolerance_pct: env_parse("ZONE_TOLERANCE_PCT", 0.005),
            zone_sl_buffer_pct: env_parse("ZONE_SL_BUFFER_PCT", 0.002),

            htf_weights,

            require_volume_confirmation: env_bool("REQUIRE_VOLUME_CONFIRMATION", true),
            volume_spike_threshold: env_parse("VOLUME_SPIKE_THRESHOLD", 1.5),

            atr_period: env_parse("ATR_PERIOD", 14.0) as usize,
            sweep_lookback: env_parse("SWEEP_LOOKBACK", 20.0) as usize,
            structure_lookback: env_parse("STRUCTURE_LOOKBACK", 3.0) as usize,

            anti_chase_max_atr: env_parse("ANTI_CHASE_MAX_ATR", 2.5),
            anti_chase_max_pct: env_parse("ANTI_CHASE_MAX_PCT", 3.0),

            rsi_divergence_bonus: env_parse("RSI_DIVERGENCE_BONUS", 10.0),

            dry_run: env_bool("DRY_RUN", false),
            cooldown_store_path: env("COOLDOWN_STORE_PATH", "data/cooldowns.ndjson"),

            log_level: env("LOG_LEVEL", "info"),
        }
    }

    pub fn shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }
}
