pub mod replay;
pub mod rest;

pub use replay::ReplayFeed;
pub use rest::RestIngestionAdapter;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Candle, Timeframe};

/// Invoked once per closed candle for `(symbol, timeframe)`, at most once per close.
pub type OnClosed = Box<dyn Fn(&str, Timeframe, Candle) + Send + Sync>;
/// Invoked on forming-candle updates, throttled by the caller.
pub type OnForming = Box<dyn Fn(&str, Timeframe, Candle) + Send + Sync>;

#[async_trait]
pub trait IngestionAdapter: Send + Sync {
    /// Ascending-`openTime` candle history for `symbol`/`tf`, optionally bounded.
    async fn backfill(
        &self,
        symbol: &str,
        tf: Timeframe,
        limit: usize,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>>;

    /// Drives `on_closed`/`on_forming` for every symbol/timeframe pair until
    /// cancelled. Implementations own reconnection/backoff and must backfill
    /// any gap before resuming delivery.
    async fn stream(
        &self,
        symbols: Vec<String>,
        timeframes: Vec<Timeframe>,
        on_closed: OnClosed,
        on_forming: Option<OnForming>,
    ) -> Result<()>;
}
