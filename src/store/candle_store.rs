use std::collections::{HashMap, VecDeque};

use tracing::warn;

use crate::models::{Candle, CandleSeries, Timeframe};

const DEFAULT_RETENTION: usize = 1000;

#[derive(Debug, Default)]
pub struct SeriesSlot {
    pub closed: VecDeque<Candle>,
    pub forming: Option<Candle>,
}

/// Rolling in-memory candle store, one closed-candle deque plus one forming
/// slot per `(symbol, timeframe)`. All reads return cloned snapshots so
/// callers can never mutate engine-owned state.
#[derive(Debug)]
pub struct CandleStore {
    series: HashMap<(String, Timeframe), SeriesSlot>,
    retention: usize,
}

impl CandleStore {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            series: HashMap::new(),
            retention,
        }
    }

    pub fn init(&mut self, symbol: &str, tf: Timeframe, initial: Vec<Candle>) {
        let mut closed: VecDeque<Candle> = initial
            .into_iter()
            .filter(|c| Self::check_valid(symbol, tf, c))
            .collect();
        Self::truncate(&mut closed, self.retention);
        self.series.insert(
            (symbol.to_string(), tf),
            SeriesSlot {
                closed,
                forming: None,
            },
        );
    }

    /// Replaces the tail candle if its open time matches, else appends. A
    /// closed incoming candle clears any forming slot. A candle failing the
    /// OHLCV invariants (§3) is rejected here rather than entering the store.
    pub fn upsert_closed(&mut self, symbol: &str, tf: Timeframe, candle: Candle) {
        if !Self::check_valid(symbol, tf, &candle) {
            return;
        }
        let retention = self.retention;
        let slot = self
            .series
            .entry((symbol.to_string(), tf))
            .or_insert_with(SeriesSlot::default);

        let replace = slot
            .closed
            .back()
            .map_or(false, |tail| tail.timestamp == candle.timestamp);

        if replace {
            slot.closed.pop_back();
        }
        let is_closed = candle.is_closed;
        slot.closed.push_back(candle);
        if is_closed {
            slot.forming = None;
        }
        Self::truncate(&mut slot.closed, retention);
    }

    pub fn set_forming(&mut self, symbol: &str, tf: Timeframe, candle: Candle) {
        if !Self::check_valid(symbol, tf, &candle) {
            return;
        }
        let slot = self
            .series
            .entry((symbol.to_string(), tf))
            .or_insert_with(SeriesSlot::default);
        slot.forming = Some(candle);
    }

    pub fn closed(&self, symbol: &str, tf: Timeframe) -> CandleSeries {
        match self.series.get(&(symbol.to_string(), tf)) {
            Some(slot) => CandleSeries::new(slot.closed.iter().cloned().collect()),
            None => CandleSeries::default(),
        }
    }

    pub fn closed_with_forming(&self, symbol: &str, tf: Timeframe) -> CandleSeries {
        match self.series.get(&(symbol.to_string(), tf)) {
            Some(slot) => {
                let mut candles: Vec<Candle> = slot.closed.iter().cloned().collect();
                if let Some(forming) = &slot.forming {
                    candles.push(forming.clone());
                }
                CandleSeries::new(candles)
            }
            None => CandleSeries::default(),
        }
    }

    pub fn last_n(&self, symbol: &str, tf: Timeframe, n: usize) -> CandleSeries {
        self.closed(symbol, tf).tail(n)
    }

    fn truncate(closed: &mut VecDeque<Candle>, retention: usize) {
        while closed.len() > retention {
            closed.pop_front();
        }
    }

    fn check_valid(symbol: &str, tf: Timeframe, candle: &Candle) -> bool {
        match candle.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!(symbol, %tf, error = %e, "rejected invalid candle at store boundary");
                false
            }
        }
    }
}

impl Default for CandleStore {
    fn default() -> Self {
        Self::new()
    }
}
