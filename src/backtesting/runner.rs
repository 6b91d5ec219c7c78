use std::sync::{Arc, Mutex as StdMutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::info;

use crate::config::{Config, SharedConfig};
use crate::engine::SignalEngine;
use crate::ingestion::{IngestionAdapter, ReplayFeed};
use crate::models::{Candle, Signal, Timeframe};
use crate::notify::NotificationSink;
use crate::store::{CooldownStore, InMemoryCooldownStore};

use super::report::BacktestReport;

/// Sink that records every emitted signal instead of delivering it anywhere,
/// so a backtest can report what the engine would have sent.
struct CapturingSink {
    received: StdMutex<Vec<Signal>>,
}

impl CapturingSink {
    fn new() -> Self {
        Self {
            received: StdMutex::new(Vec::new()),
        }
    }

    fn drain(&self) -> Vec<Signal> {
        std::mem::take(&mut self.received.lock().unwrap())
    }
}

#[async_trait]
impl NotificationSink for CapturingSink {
    async fn send_signal(&self, signal: &Signal) -> bool {
        self.received.lock().unwrap().push(signal.clone());
        true
    }
}

/// Steps a `ReplayFeed` candle-by-candle through the signal engine, using a
/// fresh in-memory cooldown store and a capturing sink so a run is fully
/// self-contained and produces no side effects outside its own report.
pub struct BacktestRunner {
    feed: ReplayFeed,
    engine: SignalEngine,
    sink: Arc<CapturingSink>,
}

impl BacktestRunner {
    pub fn new(feed: ReplayFeed, config: Config) -> Self {
        let shared: SharedConfig = config.shared();
        let cooldowns: Arc<dyn CooldownStore> = Arc::new(InMemoryCooldownStore::new());
        let sink = Arc::new(CapturingSink::new());
        let engine = SignalEngine::new(shared, cooldowns, sink.clone());
        Self { feed, engine, sink }
    }

    /// Seeds the engine with the lookback history already loaded into `feed`
    /// that is visible at the feed's current cursor time.
    pub async fn seed(&mut self, symbol: &str, tf: Timeframe, lookback: usize) -> Result<()> {
        let candles: Vec<Candle> = self.feed.backfill(symbol, tf, lookback, None, None).await?;
        self.engine.seed(symbol, tf, candles);
        Ok(())
    }

    /// Advances the replay from its current cursor to `end` in `step`-sized
    /// strides, feeding every newly-visible closed candle into the engine.
    pub async fn run(&mut self, end: DateTime<Utc>, step: ChronoDuration) -> Result<BacktestReport> {
        let start = self.feed.current_time();
        let mut candles_processed = 0usize;
        let mut cursor = start;

        info!(from = %start, to = %end, "backtest run starting");

        while cursor < end {
            let next = (cursor + step).min(end);
            let events = StdMutex::new(Vec::new());
            self.feed.run_to(next, &|symbol, tf, candle| {
                events.lock().unwrap().push((symbol.to_string(), tf, candle));
            });

            let events = events.into_inner().unwrap();
            for (symbol, tf, candle) in events {
                candles_processed += 1;
                self.engine.on_closed_candle(&symbol, tf, candle).await;
            }

            cursor = next;
        }

        info!(candles_processed, "backtest run complete");

        let signals = self.sink.drain();
        Ok(BacktestReport::from_signals(start, end, candles_processed, signals))
    }
}
