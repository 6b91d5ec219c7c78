use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::ingestion::IngestionAdapter;
use crate::models::{Candle, Timeframe};

const CHUNK_CANDLES: usize = 300;
const RATE_LIMIT_SLEEP_MS: u64 = 250;

/// Fetches `[start, end)` history for `symbol`/`tf` through an adapter's
/// `backfill`, paginating in `CHUNK_CANDLES`-sized windows, and caches the
/// result as JSON under `data_dir` so repeat backtest runs skip the network.
pub async fn fetch_and_cache(
    adapter: &dyn IngestionAdapter,
    symbol: &str,
    tf: Timeframe,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    data_dir: &str,
) -> Result<Vec<Candle>> {
    std::fs::create_dir_all(data_dir)?;

    let cache_file = format!(
        "{}/{}_{}_{}_to_{}.json",
        data_dir,
        symbol,
        tf,
        start.format("%Y%m%d"),
        end.format("%Y%m%d"),
    );

    if Path::new(&cache_file).exists() {
        info!(symbol, %tf, path = %cache_file, "loading cached candles");
        let content = std::fs::read_to_string(&cache_file)?;
        let candles: Vec<Candle> = serde_json::from_str(&content)?;
        info!(symbol, %tf, count = candles.len(), "loaded cached candles");
        return Ok(candles);
    }

    info!(symbol, %tf, from = %start, to = %end, "fetching candle history");
    let candles = fetch_range(adapter, symbol, tf, start, end).await?;
    info!(symbol, %tf, count = candles.len(), "fetched candle history");

    let json = serde_json::to_string(&candles)?;
    std::fs::write(&cache_file, json)?;
    info!(path = %cache_file, "cached candle history");

    Ok(candles)
}

async fn fetch_range(
    adapter: &dyn IngestionAdapter,
    symbol: &str,
    tf: Timeframe,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Candle>> {
    let chunk_span = tf.as_seconds() as i64 * CHUNK_CANDLES as i64;
    let mut all_candles: Vec<Candle> = Vec::new();
    let mut chunk_start = start;

    while chunk_start < end {
        let chunk_end = (chunk_start + chrono::Duration::seconds(chunk_span)).min(end);
        let candles = adapter
            .backfill(symbol, tf, CHUNK_CANDLES, Some(chunk_start), Some(chunk_end))
            .await?;
        all_candles.extend(candles);
        chunk_start = chunk_end;
        tokio::time::sleep(std::time::Duration::from_millis(RATE_LIMIT_SLEEP_MS)).await;
    }

    all_candles.sort_by_key(|c| c.timestamp);
    all_candles.dedup_by_key(|c| c.timestamp);
    Ok(all_candles)
}
