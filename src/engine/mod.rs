use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::config::{Config, SharedConfig};
use crate::core::anti_chase::evaluate_chase_risk;
use crate::core::events::detect_structure_events;
use crate::core::indicators::detect_rsi_divergence;
use crate::core::levels::calculate_levels;
use crate::core::liquidity::detect_sweep;
use crate::core::pivots::{pivot_highs, pivot_lows};
use crate::core::regime::detect_market_regime;
use crate::core::scoring::calculate_score;
use crate::core::setups::{detect_setup, volume_ratio};
use crate::core::structure::{analyze_market_structure, check_htf_alignment, determine_htf_bias};
use crate::core::zones::build_zones;
use crate::models::{
    CandleSeries, ChaseDecision, CooldownKey, Signal, SignalStage, SkipReason, Structure,
    Timeframe,
};
use crate::notify::NotificationSink;
use crate::store::{CandleStore, CooldownStore};

/// RSI lookback used for divergence detection — not independently
/// configurable, matching the 14-period default used throughout C6.
const RSI_PERIOD: usize = 14;
/// Slope window for regime classification; C7 has no dedicated config key,
/// so this mirrors the period `detect_market_regime`'s own tests exercise.
const REGIME_SLOPE_PERIOD: usize = 20;
/// Minimum seconds between forming-candle evaluations for a given `(symbol, tf)`.
const INTRABAR_THROTTLE_SECS: i64 = 10;
/// Trailing window used to measure the current candle's volume against.
const VOLUME_LOOKBACK: usize = 20;

/// Orchestrates C2-C12 into the two evaluation entry points C13 describes,
/// holding the candle store, the SETUP dedup map and per-`(symbol, tf)`
/// intrabar throttling state that would otherwise have to live on the caller.
pub struct SignalEngine {
    config: SharedConfig,
    candles: CandleStore,
    cooldowns: Arc<dyn CooldownStore>,
    sink: Arc<dyn NotificationSink>,
    htf_structures: HashMap<String, HashMap<Timeframe, Structure>>,
    setup_dedup: HashMap<String, DateTime<Utc>>,
    last_intrabar_eval: HashMap<(String, Timeframe), DateTime<Utc>>,
}

impl SignalEngine {
    pub fn new(
        config: SharedConfig,
        cooldowns: Arc<dyn CooldownStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            candles: CandleStore::new(),
            cooldowns,
            sink,
            htf_structures: HashMap::new(),
            setup_dedup: HashMap::new(),
            last_intrabar_eval: HashMap::new(),
        }
    }

    /// Loads backfilled history for a `(symbol, tf)` pair before streaming begins.
    pub fn seed(&mut self, symbol: &str, tf: Timeframe, candles: Vec<crate::models::Candle>) {
        self.candles.init(symbol, tf, candles);
    }

    /// Entry point for `IngestionAdapter::stream`'s `on_closed` callback.
    pub async fn on_closed_candle(&mut self, symbol: &str, tf: Timeframe, candle: crate::models::Candle) {
        self.candles.upsert_closed(symbol, tf, candle);

        let config = self.config.read().await.clone();
        self.refresh_htf_structure(symbol, &config);

        if !config.entry_stage_enabled || !config.entry_timeframes.contains(&tf) {
            return;
        }

        let candles = self.candles.closed(symbol, tf);
        match self.evaluate(symbol, tf, &candles, SignalStage::Entry, &config).await {
            Ok(signal) => self.finalize_entry(symbol, tf, signal, &config).await,
            Err(reason) => log_skip(symbol, tf, SignalStage::Entry, reason),
        }
    }

    /// Entry point for `IngestionAdapter::stream`'s optional `on_forming` callback.
    /// The caller is expected to invoke this on every forming-candle update; the
    /// throttle below absorbs any finer-grained delivery.
    pub async fn on_forming_candle(&mut self, symbol: &str, tf: Timeframe, candle: crate::models::Candle) {
        let now = Utc::now();
        let throttle_key = (symbol.to_string(), tf);
        if let Some(last) = self.last_intrabar_eval.get(&throttle_key) {
            if now - *last < Duration::seconds(INTRABAR_THROTTLE_SECS) {
                return;
            }
        }
        self.last_intrabar_eval.insert(throttle_key, now);

        self.candles.set_forming(symbol, tf, candle);
        let config = self.config.read().await.clone();
        if !config.setup_stage_enabled {
            return;
        }

        let candles = self.candles.closed_with_forming(symbol, tf);
        match self.evaluate(symbol, tf, &candles, SignalStage::Setup, &config).await {
            Ok(signal) => self.finalize_setup(symbol, tf, signal, now).await,
            Err(reason) => log_skip(symbol, tf, SignalStage::Setup, reason),
        }
    }

    /// Periodic (recommended hourly) sweep of persisted and in-memory cooldown state.
    pub async fn cleanup_cooldowns(&mut self) -> usize {
        let now = Utc::now();
        self.setup_dedup.retain(|_, expiry| *expiry > now);
        self.cooldowns.cleanup_expired().await
    }

    fn refresh_htf_structure(&mut self, symbol: &str, config: &Config) {
        let mut structures = HashMap::new();
        for &tf in &config.htf_timeframes {
            let candles = self.candles.closed(symbol, tf);
            if candles.len() >= config.pivot_window * 2 + 1 {
                structures.insert(tf, analyze_market_structure(&candles, config.pivot_window));
            }
        }
        self.htf_structures.insert(symbol.to_string(), structures);
    }

    /// C2-C12 pipeline shared by both entry points, parameterised on `stage`:
    /// ENTRY applies the HTF/volume/cooldown gates SETUP skips, per §4.13.
    async fn evaluate(
        &self,
        symbol: &str,
        tf: Timeframe,
        candles: &CandleSeries,
        stage: SignalStage,
        config: &Config,
    ) -> Result<Signal, SkipReason> {
        if candles.len() < 100 {
            return Err(SkipReason::InsufficientData);
        }

        let zones = build_zones(
            candles,
            config.zone_lookback,
            config.pivot_window,
            config.zone_tolerance_pct,
        );
        if config.min_zones_required > 0 && zones.len() < config.min_zones_required {
            return Err(SkipReason::NoZones);
        }

        let setup = detect_setup(candles, &zones, config).ok_or(SkipReason::NoSetup)?;

        let structure = analyze_market_structure(candles, config.pivot_window);
        let (regime, _regime_confidence) =
            detect_market_regime(candles, structure, config.atr_period, REGIME_SLOPE_PERIOD);

        let empty_structures = HashMap::new();
        let htf_structures = self.htf_structures.get(symbol).unwrap_or(&empty_structures);
        let htf_bias = determine_htf_bias(htf_structures, &config.htf_weights);
        let (htf_aligned, htf_confidence) =
            check_htf_alignment(setup.side(), htf_bias, htf_structures, &config.htf_weights);

        if stage == SignalStage::Entry && !htf_aligned {
            return Err(SkipReason::HtfNotAligned);
        }

        let highs = pivot_highs(candles, config.pivot_window);
        let lows = pivot_lows(candles, config.pivot_window);
        let structure_event =
            detect_structure_events(candles, structure, config.pivot_window, config.structure_lookback);
        let sweep = detect_sweep(candles, config.pivot_window, config.sweep_lookback);
        let divergence = detect_rsi_divergence(candles, &highs, &lows, RSI_PERIOD);
        let vol_ratio = volume_ratio(candles, VOLUME_LOOKBACK);

        if stage == SignalStage::Entry
            && config.require_volume_confirmation
            && vol_ratio < config.volume_spike_threshold
        {
            return Err(SkipReason::LowVolume);
        }

        let current = candles.last().ok_or(SkipReason::InsufficientData)?;
        let (score, breakdown) = calculate_score(
            current,
            &setup,
            htf_aligned,
            htf_confidence,
            divergence.as_ref(),
            vol_ratio,
            config,
        );

        let threshold = match stage {
            SignalStage::Setup => config.setup_score_threshold,
            SignalStage::Entry => config.entry_score_threshold,
        };
        if threshold > 0.0 && score < threshold {
            return Err(SkipReason::ScoreTooLow);
        }

        let levels = calculate_levels(setup.meta().price, &setup, &zones, config);
        if !levels.is_valid(setup.side()) {
            return Err(SkipReason::InvalidLevels);
        }
        if config.min_rr > 0.0 && levels.risk_reward_1 < config.min_rr {
            return Err(SkipReason::RrTooLow);
        }

        let chase_eval = evaluate_chase_risk(candles, &setup, structure_event.as_ref(), config);
        if stage == SignalStage::Entry && chase_eval.decision == ChaseDecision::ChaseNo {
            return Err(SkipReason::ChaseNo);
        }

        if stage == SignalStage::Entry {
            let key = cooldown_key(symbol, tf, setup.side(), &setup);
            if self.cooldowns.is_on_cooldown(&key).await {
                return Err(SkipReason::CooldownActive);
            }
        }

        Ok(Signal {
            stage,
            symbol: symbol.to_string(),
            timeframe: tf,
            side: setup.side(),
            score,
            breakdown,
            setup,
            htf_bias,
            regime: Some(regime),
            structure_event,
            sweep,
            divergence,
            volume_ratio: vol_ratio,
            levels,
            chase_eval: Some(chase_eval),
            timestamp: current.timestamp,
        })
    }

    /// ENTRY emission: a sink failure must prevent both persistence and cooldown
    /// arming, per §7, so a future retry for the same key remains possible.
    async fn finalize_entry(&self, symbol: &str, tf: Timeframe, signal: Signal, config: &Config) {
        let key = cooldown_key(symbol, tf, signal.side, &signal.setup);
        if !self.sink.send_signal(&signal).await {
            debug!(symbol, %tf, "signal sink rejected delivery, cooldown not armed");
            return;
        }
        info!(
            symbol,
            %tf,
            side = %signal.side,
            score = signal.score,
            setup = signal.setup.name(),
            "entry signal emitted"
        );
        if let Err(e) = self.cooldowns.add_cooldown(key, config.signal_cooldown_minutes).await {
            debug!(symbol, %tf, error = %e, "failed to arm cooldown after emitted signal");
        }
    }

    /// SETUP emission: fires at most once per forming-setup instance via the
    /// dedup map, never touches the durable cooldown store.
    async fn finalize_setup(&mut self, symbol: &str, tf: Timeframe, signal: Signal, now: DateTime<Utc>) {
        let config = self.config.read().await.clone();
        let dedup_key = format!(
            "{}|{}|{}|{}",
            symbol,
            tf,
            signal.side,
            signal.setup.zone().key
        );
        let already_fired = self
            .setup_dedup
            .get(&dedup_key)
            .map_or(false, |expiry| *expiry > now);
        if already_fired {
            return;
        }

        let cooldown_minutes = config.signal_cooldown_minutes.max(1);
        self.setup_dedup
            .insert(dedup_key, now + Duration::minutes(cooldown_minutes));

        if self.sink.send_signal(&signal).await {
            info!(
                symbol,
                %tf,
                side = %signal.side,
                score = signal.score,
                setup = signal.setup.name(),
                "setup signal emitted"
            );
        }
    }
}

fn cooldown_key(symbol: &str, tf: Timeframe, side: crate::models::Side, setup: &crate::models::Setup) -> CooldownKey {
    CooldownKey {
        symbol: symbol.to_string(),
        timeframe: tf,
        side,
        zone_key: setup.zone().key.clone(),
    }
}

fn log_skip(symbol: &str, tf: Timeframe, stage: SignalStage, reason: SkipReason) {
    debug!(symbol, %tf, stage = ?stage, reason = %reason, "signal evaluation skipped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryCooldownStore;
    use crate::test_helpers::default_test_config;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::Mutex as StdMutex;

    struct CapturingSink {
        received: StdMutex<Vec<Signal>>,
    }

    impl CapturingSink {
        fn new() -> Self {
            Self {
                received: StdMutex::new(Vec::new()),
            }
        }

        fn count(&self) -> usize {
            self.received.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NotificationSink for CapturingSink {
        async fn send_signal(&self, signal: &Signal) -> bool {
            self.received.lock().unwrap().push(signal.clone());
            true
        }
    }

    fn wavy_trend_candles(n: usize, base: f64) -> Vec<crate::models::Candle> {
        let series = crate::test_helpers::make_candles(
            &(0..n)
                .map(|i| {
                    let wobble = ((i as f64) * 0.8).sin() * 6.0;
                    let v = base + wobble;
                    (v, v + 3.0, v - 3.0, v + wobble.signum())
                })
                .collect::<Vec<_>>(),
        );
        (0..series.len()).map(|i| series[i].clone()).collect()
    }

    fn make_engine(config: Config) -> (SignalEngine, Arc<CapturingSink>) {
        let sink = Arc::new(CapturingSink::new());
        let cooldowns = Arc::new(InMemoryCooldownStore::new());
        let engine = SignalEngine::new(config.shared(), cooldowns, sink.clone());
        (engine, sink)
    }

    #[tokio::test]
    async fn insufficient_data_is_skipped_without_emitting() {
        let config = default_test_config();
        let (mut engine, sink) = make_engine(config.clone());
        let candles = wavy_trend_candles(10, 100.0);
        engine.seed("BTC-PERP", Timeframe::H1, candles.clone());

        let last = candles.last().unwrap().clone();
        engine.on_closed_candle("BTC-PERP", Timeframe::H1, last).await;
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn cooldown_gate_is_consulted_before_entry_emission() {
        let config = default_test_config();
        let (engine, _sink) = make_engine(config);
        let key = CooldownKey {
            symbol: "BTC-PERP".to_string(),
            timeframe: Timeframe::H1,
            side: crate::models::Side::Long,
            zone_key: "support_100.00".to_string(),
        };
        assert!(!engine.cooldowns.is_on_cooldown(&key).await);
        engine.cooldowns.add_cooldown(key.clone(), 60).await.unwrap();
        assert!(engine.cooldowns.is_on_cooldown(&key).await);
    }

    #[tokio::test]
    async fn setup_dedup_suppresses_repeat_emission_for_same_key() {
        let config = default_test_config();
        let (mut engine, sink) = make_engine(config);
        let signal = Signal {
            stage: SignalStage::Setup,
            symbol: "BTC-PERP".to_string(),
            timeframe: Timeframe::H1,
            side: crate::models::Side::Long,
            score: 80.0,
            breakdown: vec![],
            setup: crate::models::Setup::Reversal {
                meta: crate::models::SetupMeta {
                    side: crate::models::Side::Long,
                    price: 100.0,
                    zones: vec![],
                    pattern: None,
                },
                zone: crate::models::Zone::new(
                    crate::models::ZoneKind::Support,
                    100.0,
                    0.01,
                    Utc::now(),
                ),
            },
            htf_bias: crate::models::Bias::Bullish,
            regime: None,
            structure_event: None,
            sweep: None,
            divergence: None,
            volume_ratio: 1.2,
            levels: crate::models::Levels {
                entry: 100.0,
                stop_loss: 98.0,
                take_profit_1: 104.0,
                take_profit_2: None,
                risk_reward_1: 2.0,
                risk_reward_2: None,
                sl_zone: None,
                tp_zones: vec![],
            },
            chase_eval: None,
            timestamp: Utc::now(),
        };

        let now = Utc::now();
        engine
            .finalize_setup("BTC-PERP", Timeframe::H1, signal.clone(), now)
            .await;
        engine.finalize_setup("BTC-PERP", Timeframe::H1, signal, now).await;

        assert_eq!(sink.count(), 1);
    }

    #[tokio::test]
    async fn cleanup_cooldowns_prunes_expired_setup_dedup_entries() {
        let config = default_test_config();
        let (mut engine, _sink) = make_engine(config);
        engine
            .setup_dedup
            .insert("BTC-PERP|1h|long|x".to_string(), Utc::now() - ChronoDuration::minutes(1));
        let removed = engine.cleanup_cooldowns().await;
        assert!(engine.setup_dedup.is_empty());
        let _ = removed;
    }
}
