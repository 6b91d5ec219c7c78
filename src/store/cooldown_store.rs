use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::EngineError;
use crate::models::CooldownKey;

#[async_trait]
pub trait CooldownStore: Send + Sync {
    async fn is_on_cooldown(&self, key: &CooldownKey) -> bool;
    async fn add_cooldown(&self, key: CooldownKey, minutes: i64) -> Result<(), EngineError>;
    async fn cleanup_expired(&self) -> usize;
}

/// In-process, non-persistent store. At most one live entry per key.
#[derive(Default)]
pub struct InMemoryCooldownStore {
    entries: RwLock<HashMap<CooldownKey, DateTime<Utc>>>,
}

impl InMemoryCooldownStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CooldownStore for InMemoryCooldownStore {
    async fn is_on_cooldown(&self, key: &CooldownKey) -> bool {
        let entries = self.entries.read().await;
        entries.get(key).map_or(false, |expiry| *expiry > Utc::now())
    }

    async fn add_cooldown(&self, key: CooldownKey, minutes: i64) -> Result<(), EngineError> {
        let mut entries = self.entries.write().await;
        entries.insert(key, Utc::now() + Duration::minutes(minutes));
        Ok(())
    }

    async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let now = Utc::now();
        entries.retain(|_, expiry| *expiry > now);
        before - entries.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CooldownRecord {
    symbol: String,
    timeframe: String,
    side: String,
    zone_key: String,
    expires_at: DateTime<Utc>,
}

/// NDJSON-file-backed store: every `add_cooldown` appends a record, and the
/// in-memory map is rebuilt from the file's last record per key on load.
/// Durable across restarts; the append-only log is compacted opportunistically
/// by `cleanup_expired`.
pub struct FileCooldownStore {
    path: PathBuf,
    entries: RwLock<HashMap<CooldownKey, DateTime<Utc>>>,
}

impl FileCooldownStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        let mut entries = HashMap::new();

        if let Ok(contents) = std::fs::read_to_string(&path) {
            for line in contents.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<CooldownRecord>(line) {
                    Ok(record) => {
                        let key = CooldownKey {
                            symbol: record.symbol,
                            timeframe: parse_timeframe(&record.timeframe)?,
                            side: parse_side(&record.side)?,
                            zone_key: record.zone_key,
                        };
                        entries.insert(key, record.expires_at);
                    }
                    Err(e) => warn!("skipping malformed cooldown record: {e}"),
                }
            }
        }

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn append(&self, key: &CooldownKey, expires_at: DateTime<Utc>) -> Result<(), EngineError> {
        let record = CooldownRecord {
            symbol: key.symbol.clone(),
            timeframe: key.timeframe.as_str().to_string(),
            side: key.side.as_str().to_string(),
            zone_key: key.zone_key.clone(),
            expires_at,
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| EngineError::InvalidConfig(format!("cooldown record serialize failed: {e}")))?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| EngineError::InvalidConfig(format!("cooldown store open failed: {e}")))?;
        writeln!(file, "{line}")
            .map_err(|e| EngineError::InvalidConfig(format!("cooldown store write failed: {e}")))?;
        Ok(())
    }
}

fn parse_timeframe(s: &str) -> Result<crate::models::Timeframe, EngineError> {
    use crate::models::Timeframe::*;
    Ok(match s {
        "1m" => M1,
        "5m" => M5,
        "15m" => M15,
        "1h" => H1,
        "4h" => H4,
        "1d" => D1,
        other => return Err(EngineError::InvalidConfig(format!("unknown timeframe in cooldown log: {other}"))),
    })
}

fn parse_side(s: &str) -> Result<crate::models::Side, EngineError> {
    use crate::models::Side::*;
    Ok(match s {
        "long" => Long,
        "short" => Short,
        other => return Err(EngineError::InvalidConfig(format!("unknown side in cooldown log: {other}"))),
    })
}

#[async_trait]
impl CooldownStore for FileCooldownStore {
    async fn is_on_cooldown(&self, key: &CooldownKey) -> bool {
        let entries = self.entries.read().await;
        entries.get(key).map_or(false, |expiry| *expiry > Utc::now())
    }

    async fn add_cooldown(&self, key: CooldownKey, minutes: i64) -> Result<(), EngineError> {
        let expires_at = Utc::now() + Duration::minutes(minutes);
        self.append(&key, expires_at)?;
        let mut entries = self.entries.write().await;
        entries.insert(key, expires_at);
        Ok(())
    }

    async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let now = Utc::now();
        entries.retain(|_, expiry| *expiry > now);
        before - entries.len()
    }
}
