use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Timeframe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Structure {
    Up,
    Down,
    Neutral,
}

impl Structure {
    pub fn sign(self) -> f64 {
        match self {
            Structure::Up => 1.0,
            Structure::Down => -1.0,
            Structure::Neutral => 0.0,
        }
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Structure::Up => write!(f, "up"),
            Structure::Down => write!(f, "down"),
            Structure::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

impl Bias {
    pub fn matches(self, side: Side) -> bool {
        matches!(
            (self, side),
            (Bias::Bullish, Side::Long) | (Bias::Bearish, Side::Short)
        )
    }
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bias::Bullish => write!(f, "bullish"),
            Bias::Bearish => write!(f, "bearish"),
            Bias::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    Upside,
    Downside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    TrendUp,
    TrendDown,
    Range,
    Expansion,
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketRegime::TrendUp => write!(f, "trend_up"),
            MarketRegime::TrendDown => write!(f, "trend_down"),
            MarketRegime::Range => write!(f, "range"),
            MarketRegime::Expansion => write!(f, "expansion"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureEventKind {
    Bos,
    Choch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaseDecision {
    ChaseNo,
    ChaseOk,
    ReversalWatch,
}

impl fmt::Display for ChaseDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChaseDecision::ChaseNo => write!(f, "CHASE_NO"),
            ChaseDecision::ChaseOk => write!(f, "CHASE_OK"),
            ChaseDecision::ReversalWatch => write!(f, "REVERSAL_WATCH"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStage {
    Setup,
    Entry,
}

/// Structured reason a candidate evaluation was skipped, for engine logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientData,
    NoSetup,
    NoZones,
    HtfNotAligned,
    LowVolume,
    ScoreTooLow,
    InvalidLevels,
    RrTooLow,
    ChaseNo,
    CooldownActive,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::InsufficientData => "insufficient_data",
            SkipReason::NoSetup => "no_setup",
            SkipReason::NoZones => "no_zones",
            SkipReason::HtfNotAligned => "htf_not_aligned",
            SkipReason::LowVolume => "low_volume",
            SkipReason::ScoreTooLow => "score_too_low",
            SkipReason::InvalidLevels => "invalid_levels",
            SkipReason::RrTooLow => "rr_too_low",
            SkipReason::ChaseNo => "chase_no",
            SkipReason::CooldownActive => "cooldown_active",
        };
        write!(f, "{}", s)
    }
}

/// (symbol, timeframe, side, zone key) — the identity a setup instance is deduped on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CooldownKey {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub side: Side,
    pub zone_key: String,
}

impl fmt::Display for CooldownKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.symbol, self.timeframe, self.side, self.zone_key
        )
    }
}
