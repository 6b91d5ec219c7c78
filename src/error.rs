use thiserror::Error;

/// Errors the analysis core can raise itself. Gate misses (no setup, score too
/// low, cooldown active, ...) are not errors — see `models::SkipReason` — only
/// malformed input and configuration failures propagate as `EngineError`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid candle: {0}")]
    InvalidCandle(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
