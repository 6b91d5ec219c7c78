use serde::{Deserialize, Serialize};

use crate::models::Zone;

/// Zone-anchored stop/target levels and the resulting risk:reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Levels {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit_1: f64,
    pub take_profit_2: Option<f64>,
    pub risk_reward_1: f64,
    pub risk_reward_2: Option<f64>,
    pub sl_zone: Option<Zone>,
    pub tp_zones: Vec<Zone>,
}

impl Levels {
    pub fn risk(&self) -> f64 {
        (self.entry - self.stop_loss).abs()
    }

    /// All numeric fields are finite and the stop/target ordering matches `side`.
    pub fn is_valid(&self, side: crate::models::Side) -> bool {
        let values_finite = self.entry.is_finite()
            && self.stop_loss.is_finite()
            && self.take_profit_1.is_finite()
            && self.take_profit_2.map_or(true, f64::is_finite)
            && self.risk_reward_1.is_finite();

        if !values_finite || self.risk() <= 0.0 {
            return false;
        }

        match side {
            crate::models::Side::Long => {
                let ordered = self.stop_loss < self.entry && self.entry <= self.take_profit_1;
                let tp_ordered = self
                    .take_profit_2
                    .map_or(true, |tp2| tp2 >= self.take_profit_1);
                ordered && tp_ordered
            }
            crate::models::Side::Short => {
                let ordered = self.stop_loss > self.entry && self.entry >= self.take_profit_1;
                let tp_ordered = self
                    .take_profit_2
                    .map_or(true, |tp2| tp2 <= self.take_profit_1);
                ordered && tp_ordered
            }
        }
    }
}
