use async_trait::async_trait;
use tracing::info;

use crate::models::Signal;

/// The core passes a fully-resolved signal payload and treats a failed send
/// as "do not persist, do not arm cooldown" — formatting and delivery belong
/// entirely to the sink.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_signal(&self, signal: &Signal) -> bool;
}

/// Default/dry-run sink: logs a structured signal banner via `tracing`
/// instead of delivering anywhere external.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send_signal(&self, signal: &Signal) -> bool {
        info!(
            symbol = %signal.symbol,
            timeframe = %signal.timeframe,
            stage = ?signal.stage,
            side = %signal.side,
            score = signal.score,
            setup = signal.setup.name(),
            entry = signal.levels.entry,
            stop_loss = signal.levels.stop_loss,
            take_profit_1 = signal.levels.take_profit_1,
            risk_reward_1 = signal.levels.risk_reward_1,
            "SIGNAL — {} {} {} score={:.1} entry={:.2} sl={:.2} tp1={:.2} rr={:.2}",
            signal.symbol,
            signal.timeframe,
            signal.side,
            signal.score,
            signal.levels.entry,
            signal.levels.stop_loss,
            signal.levels.take_profit_1,
            signal.levels.risk_reward_1,
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Setup, SetupMeta, SignalStage, Side, Zone, ZoneKind};
    use chrono::Utc;

    #[tokio::test]
    async fn log_sink_always_reports_success() {
        let sink = LogSink;
        let zone = Zone::new(ZoneKind::Support, 100.0, 0.01, Utc::now());
        let setup = Setup::Reversal {
            meta: SetupMeta {
                side: Side::Long,
                price: 100.0,
                zones: vec![],
                pattern: None,
            },
            zone: zone.clone(),
        };
        let levels = crate::models::Levels {
            entry: 100.0,
            stop_loss: 98.0,
            take_profit_1: 104.0,
            take_profit_2: None,
            risk_reward_1: 2.0,
            risk_reward_2: None,
            sl_zone: None,
            tp_zones: vec![],
        };
        let signal = Signal {
            stage: SignalStage::Entry,
            symbol: "BTC-PERP".to_string(),
            timeframe: crate::models::Timeframe::H1,
            side: Side::Long,
            score: 80.0,
            breakdown: vec![],
            setup,
            htf_bias: crate::models::Bias::Bullish,
            regime: None,
            structure_event: None,
            sweep: None,
            divergence: None,
            volume_ratio: 1.2,
            levels,
            chase_eval: None,
            timestamp: Utc::now(),
        };
        assert!(sink.send_signal(&signal).await);
    }
}
