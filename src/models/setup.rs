use serde::{Deserialize, Serialize};

use crate::core::patterns::PatternMatch;
use crate::models::{Side, Zone};

/// Shared fields carried by every setup variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupMeta {
    pub side: Side,
    pub price: f64,
    pub zones: Vec<Zone>,
    pub pattern: Option<PatternMatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Setup {
    Reversal {
        meta: SetupMeta,
        zone: Zone,
    },
    Breakout {
        meta: SetupMeta,
        zone: Zone,
        volume_spike: bool,
        volume_ratio: f64,
    },
    Breakdown {
        meta: SetupMeta,
        zone: Zone,
        volume_spike: bool,
        volume_ratio: f64,
    },
    Retest {
        meta: SetupMeta,
        zone: Zone,
    },
    FalseBreakout {
        meta: SetupMeta,
        zone: Zone,
    },
}

impl Setup {
    pub fn meta(&self) -> &SetupMeta {
        match self {
            Setup::Reversal { meta, .. }
            | Setup::Breakout { meta, .. }
            | Setup::Breakdown { meta, .. }
            | Setup::Retest { meta, .. }
            | Setup::FalseBreakout { meta, .. } => meta,
        }
    }

    pub fn zone(&self) -> &Zone {
        match self {
            Setup::Reversal { zone, .. }
            | Setup::Breakout { zone, .. }
            | Setup::Breakdown { zone, .. }
            | Setup::Retest { zone, .. }
            | Setup::FalseBreakout { zone, .. } => zone,
        }
    }

    pub fn side(&self) -> Side {
        self.meta().side
    }

    /// `false_breakout` names a faded resistance pierce, `false_breakdown` a
    /// faded support pierce — both represented by the same `FalseBreakout`
    /// variant, disambiguated by the zone kind that was pierced.
    pub fn name(&self) -> &'static str {
        match self {
            Setup::Reversal { .. } => "reversal",
            Setup::Breakout { .. } => "breakout",
            Setup::Breakdown { .. } => "breakdown",
            Setup::Retest { .. } => "retest",
            Setup::FalseBreakout { zone, .. } => match zone.kind {
                crate::models::ZoneKind::Resistance => "false_breakout",
                crate::models::ZoneKind::Support => "false_breakdown",
            },
        }
    }

    pub fn volume_spike(&self) -> bool {
        match self {
            Setup::Breakout { volume_spike, .. } | Setup::Breakdown { volume_spike, .. } => {
                *volume_spike
            }
            _ => false,
        }
    }

    pub fn volume_ratio(&self) -> Option<f64> {
        match self {
            Setup::Breakout { volume_ratio, .. } | Setup::Breakdown { volume_ratio, .. } => {
                Some(*volume_ratio)
            }
            _ => None,
        }
    }
}
