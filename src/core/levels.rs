use crate::config::Config;
use crate::core::zones::{find_next_opposing_zones, find_stop_loss_zone};
use crate::models::{Levels, Setup, Side, Zone};

fn stop_loss_for(entry: f64, side: Side, zones: &[Zone], setup_zone: &Zone, buffer_pct: f64) -> (f64, Option<Zone>) {
    if let Some(zone) = find_stop_loss_zone(entry, zones, side) {
        let sl = match side {
            Side::Long => zone.lower * (1.0 - buffer_pct),
            Side::Short => zone.upper * (1.0 + buffer_pct),
        };
        return (sl, Some(zone));
    }

    match side {
        Side::Long => (setup_zone.lower * (1.0 - buffer_pct), None),
        Side::Short => (setup_zone.upper * (1.0 + buffer_pct), None),
    }
}

/// Zone-anchored stop-loss with a setup-zone fallback and a last-resort
/// percentage stop, and up to three zone-anchored take-profits extended by
/// R-multiples when fewer than two opposing zones exist.
pub fn calculate_levels(entry: f64, setup: &Setup, zones: &[Zone], config: &Config) -> Levels {
    let side = setup.side();

    let (mut stop_loss, sl_zone) = stop_loss_for(entry, side, zones, setup.zone(), config.zone_sl_buffer_pct);
    if !stop_loss.is_finite() || (side == Side::Long && stop_loss >= entry) || (side == Side::Short && stop_loss <= entry) {
        stop_loss = match side {
            Side::Long => entry * 0.99,
            Side::Short => entry * 1.01,
        };
    }

    let tp_zones = find_next_opposing_zones(entry, zones, side, 3);
    let risk = (entry - stop_loss).abs().max(f64::EPSILON);

    let tp1 = tp_zones
        .get(0)
        .map(|z| z.center)
        .unwrap_or_else(|| match side {
            Side::Long => entry + risk * 1.5,
            Side::Short => entry - risk * 1.5,
        });
    let take_profit_2 = tp_zones.get(1).map(|z| z.center).or_else(|| {
        Some(match side {
            Side::Long => entry + risk * 3.0,
            Side::Short => entry - risk * 3.0,
        })
    });

    let risk_reward_1 = (tp1 - entry).abs() / risk;
    let risk_reward_2 = take_profit_2.map(|tp2| (tp2 - entry).abs() / risk);

    Levels {
        entry,
        stop_loss,
        take_profit_1: tp1,
        take_profit_2,
        risk_reward_1,
        risk_reward_2,
        sl_zone,
        tp_zones,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SetupMeta, ZoneKind};
    use chrono::Utc;

    fn long_setup(price: f64) -> Setup {
        Setup::Reversal {
            meta: SetupMeta {
                side: Side::Long,
                price,
                zones: vec![],
                pattern: None,
            },
            zone: Zone::new(ZoneKind::Support, price, 0.01, Utc::now()),
        }
    }

    #[test]
    fn long_levels_respect_ordering() {
        let config = crate::test_helpers::default_test_config();
        let zones = vec![
            Zone::new(ZoneKind::Support, 95.0, 0.01, Utc::now()),
            Zone::new(ZoneKind::Resistance, 110.0, 0.01, Utc::now()),
            Zone::new(ZoneKind::Resistance, 120.0, 0.01, Utc::now()),
        ];
        let setup = long_setup(100.0);
        let levels = calculate_levels(100.0, &setup, &zones, &config);
        assert!(levels.is_valid(Side::Long));
        assert!(levels.stop_loss < 100.0);
        assert!(levels.take_profit_1 > 100.0);
    }

    #[test]
    fn falls_back_to_r_multiples_without_opposing_zones() {
        let config = crate::test_helpers::default_test_config();
        let zones = vec![Zone::new(ZoneKind::Support, 95.0, 0.01, Utc::now())];
        let setup = long_setup(100.0);
        let levels = calculate_levels(100.0, &setup, &zones, &config);
        assert!(levels.take_profit_2.is_some());
        assert!(levels.risk_reward_1 > 0.0);
    }
}
