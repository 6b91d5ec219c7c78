use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::ingestion::{IngestionAdapter, OnClosed, OnForming};
use crate::models::{Candle, Timeframe};

/// Replays pre-loaded historical candles for backtesting. A cursor controls
/// which candles are visible — only candles with `timestamp <= now` are
/// returned by `backfill`, simulating a forward walk; `run_to` drives the
/// cursor forward and invokes `on_closed` for every newly-visible candle.
pub struct ReplayFeed {
    data: HashMap<(String, Timeframe), Vec<Candle>>,
    now: Mutex<DateTime<Utc>>,
}

impl ReplayFeed {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            data: HashMap::new(),
            now: Mutex::new(start),
        }
    }

    /// Candles must be sorted oldest-first.
    pub fn load(&mut self, symbol: &str, tf: Timeframe, candles: Vec<Candle>) {
        self.data.insert((symbol.to_string(), tf), candles);
    }

    pub fn set_time(&self, t: DateTime<Utc>) {
        *self.now.lock().unwrap() = t;
    }

    pub fn current_time(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    pub fn earliest_time(&self) -> Option<DateTime<Utc>> {
        self.data
            .values()
            .filter_map(|v| v.first().map(|c| c.timestamp))
            .min()
    }

    pub fn latest_time(&self) -> Option<DateTime<Utc>> {
        self.data
            .values()
            .filter_map(|v| v.last().map(|c| c.timestamp))
            .max()
    }

    fn visible_candles(&self, symbol: &str, tf: Timeframe, limit: usize) -> Vec<Candle> {
        let empty = Vec::new();
        let all = self
            .data
            .get(&(symbol.to_string(), tf))
            .unwrap_or(&empty);
        let now = self.current_time();

        let end = match all.partition_point(|c| c.timestamp <= now) {
            0 => return Vec::new(),
            n => n,
        };
        let start = end.saturating_sub(limit);
        all[start..end].to_vec()
    }

    /// Advances the cursor candle-by-candle across every loaded timeframe and
    /// invokes `on_closed` for each newly-visible candle in chronological order.
    pub fn run_to(&self, end: DateTime<Utc>, on_closed: &dyn Fn(&str, Timeframe, Candle)) {
        let mut all_points: Vec<(String, Timeframe, Candle)> = Vec::new();
        for ((symbol, tf), candles) in &self.data {
            let start = self.current_time();
            for c in candles {
                if c.timestamp > start && c.timestamp <= end {
                    all_points.push((symbol.clone(), *tf, c.clone()));
                }
            }
        }
        all_points.sort_by_key(|(_, _, c)| c.timestamp);

        for (symbol, tf, candle) in all_points {
            self.set_time(candle.timestamp);
            on_closed(&symbol, tf, candle);
        }
        self.set_time(end);
    }
}

#[async_trait]
impl IngestionAdapter for ReplayFeed {
    async fn backfill(
        &self,
        symbol: &str,
        tf: Timeframe,
        limit: usize,
        _start_time: Option<DateTime<Utc>>,
        _end_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>> {
        Ok(self.visible_candles(symbol, tf, limit))
    }

    async fn stream(
        &self,
        symbols: Vec<String>,
        timeframes: Vec<Timeframe>,
        on_closed: OnClosed,
        _on_forming: Option<OnForming>,
    ) -> Result<()> {
        let end = self.latest_time().unwrap_or_else(Utc::now);
        for symbol in &symbols {
            for &tf in &timeframes {
                let candles = self.visible_candles(symbol, tf, usize::MAX);
                for candle in candles {
                    on_closed(symbol, tf, candle);
                }
            }
        }
        self.set_time(end);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_candles;

    #[test]
    fn visible_candles_respect_cursor() {
        let candles = make_candles(&[
            (1.0, 2.0, 0.5, 1.5),
            (2.0, 3.0, 1.5, 2.5),
            (3.0, 4.0, 2.5, 3.5),
        ]);
        let earliest = candles[0].timestamp;
        let mut feed = ReplayFeed::new(earliest);
        feed.load("BTC-PERP", Timeframe::H1, candles.as_slice().to_vec());
        feed.set_time(candles[1].timestamp);

        let visible = feed.visible_candles("BTC-PERP", Timeframe::H1, 10);
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn run_to_invokes_callback_in_order() {
        let candles = make_candles(&[
            (1.0, 2.0, 0.5, 1.5),
            (2.0, 3.0, 1.5, 2.5),
            (3.0, 4.0, 2.5, 3.5),
        ]);
        let start = candles[0].timestamp - chrono::Duration::minutes(1);
        let mut feed = ReplayFeed::new(start);
        feed.load("BTC-PERP", Timeframe::H1, candles.as_slice().to_vec());

        let seen = std::sync::Mutex::new(Vec::new());
        let end = candles.last().unwrap().timestamp;
        feed.run_to(end, &|_, _, c| seen.lock().unwrap().push(c.close));

        assert_eq!(seen.lock().unwrap().len(), 3);
    }
}
