use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::anti_chase::ChaseEvaluation;
use crate::core::events::StructureEvent;
use crate::core::indicators::Divergence;
use crate::core::liquidity::Sweep;
use crate::models::{Bias, Levels, MarketRegime, Setup, Side, SignalStage, Timeframe};

/// A fully-resolved, ready-to-notify trading signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub stage: SignalStage,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub side: Side,
    pub score: f64,
    pub breakdown: Vec<(String, f64)>,
    pub setup: Setup,
    pub htf_bias: Bias,
    pub regime: Option<MarketRegime>,
    pub structure_event: Option<StructureEvent>,
    pub sweep: Option<Sweep>,
    pub divergence: Option<Divergence>,
    pub volume_ratio: f64,
    pub levels: Levels,
    pub chase_eval: Option<ChaseEvaluation>,
    pub timestamp: DateTime<Utc>,
}
