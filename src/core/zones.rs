use crate::core::pivots::{recent_pivot_highs, recent_pivot_lows};
use crate::models::{CandleSeries, Side, Zone, ZoneKind};

const MAX_SEED_PIVOTS: usize = 20;

/// Build support/resistance zones from pivots over the trailing `lookback`
/// candles, then merge zones whose centers sit within `2 * tol_pct` of each
/// other. Mirrors the cluster-then-average shape used for liquidity pools.
pub fn build_zones(
    candles: &CandleSeries,
    lookback: usize,
    window: usize,
    tol_pct: f64,
) -> Vec<Zone> {
    let start = candles.len().saturating_sub(lookback);
    let recent = candles.slice(start, candles.len());

    let mut zones = Vec::new();

    for &i in &recent_pivot_highs(&recent, window, MAX_SEED_PIVOTS) {
        zones.push(Zone::new(
            ZoneKind::Resistance,
            recent[i].high,
            tol_pct,
            recent[i].timestamp,
        ));
    }
    for &i in &recent_pivot_lows(&recent, window, MAX_SEED_PIVOTS) {
        zones.push(Zone::new(
            ZoneKind::Support,
            recent[i].low,
            tol_pct,
            recent[i].timestamp,
        ));
    }

    zones.sort_by(|a, b| a.center.partial_cmp(&b.center).unwrap());
    merge_zones(zones, tol_pct)
}

/// Merge adjacent zones of the same kind whose centers differ by less than
/// `2 * tol_pct`: average the centers, union the bounds, sum the touches.
fn merge_zones(zones: Vec<Zone>, tol_pct: f64) -> Vec<Zone> {
    let mut merged: Vec<Zone> = Vec::new();

    for zone in zones {
        let candidate = merged
            .iter_mut()
            .rev()
            .find(|m| m.kind == zone.kind && close_enough(m.center, zone.center, tol_pct));

        match candidate {
            Some(m) => {
                let total_touches = (m.touches + zone.touches) as f64;
                let new_center =
                    (m.center * m.touches as f64 + zone.center * zone.touches as f64)
                        / total_touches;
                m.lower = m.lower.min(zone.lower);
                m.upper = m.upper.max(zone.upper);
                m.center = new_center;
                m.touches += zone.touches;
                m.key = format!("{}_{:.2}", m.kind.as_str(), m.center);
                if zone.timestamp > m.timestamp {
                    m.timestamp = zone.timestamp;
                }
            }
            None => merged.push(zone),
        }
    }

    merged
}

fn close_enough(a: f64, b: f64, tol_pct: f64) -> bool {
    (a - b).abs() / a < 2.0 * tol_pct
}

pub fn is_touching(price: f64, zone: &Zone) -> bool {
    zone.is_touching(price)
}

/// The zone with the smallest center-distance to `price`, regardless of kind.
pub fn nearest_zone<'a>(price: f64, zones: &'a [Zone], max_pct: Option<f64>) -> Option<&'a Zone> {
    zones
        .iter()
        .filter(|z| max_pct.map_or(true, |m| z.distance_pct(price) <= m))
        .min_by(|a, b| {
            a.distance_pct(price)
                .partial_cmp(&b.distance_pct(price))
                .unwrap()
        })
}

/// Up to `k` zones strictly on the profit side of `entry` for `side`, nearest first.
pub fn find_next_opposing_zones(entry: f64, zones: &[Zone], side: Side, k: usize) -> Vec<Zone> {
    let mut candidates: Vec<&Zone> = zones
        .iter()
        .filter(|z| match side {
            Side::Long => z.kind == ZoneKind::Resistance && z.center > entry,
            Side::Short => z.kind == ZoneKind::Support && z.center < entry,
        })
        .collect();

    candidates.sort_by(|a, b| {
        (a.center - entry)
            .abs()
            .partial_cmp(&(b.center - entry).abs())
            .unwrap()
    });
    candidates.into_iter().take(k).cloned().collect()
}

/// The nearest zone strictly on the loss side of `entry` for `side`.
pub fn find_stop_loss_zone(entry: f64, zones: &[Zone], side: Side) -> Option<Zone> {
    zones
        .iter()
        .filter(|z| match side {
            Side::Long => z.kind == ZoneKind::Support && z.center < entry,
            Side::Short => z.kind == ZoneKind::Resistance && z.center > entry,
        })
        .min_by(|a, b| {
            (a.center - entry)
                .abs()
                .partial_cmp(&(b.center - entry).abs())
                .unwrap()
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_candles;

    fn wavy_candles() -> CandleSeries {
        let mut data = Vec::new();
        for wave in 0..4 {
            let trough = 100.0 + wave as f64 * 40.0;
            let peak = trough + 30.0;
            for i in 0..6 {
                let v = trough + i as f64 * 5.0;
                data.push((v, v + 1.0, v - 1.0, v + 0.5));
            }
            for _ in 0..2 {
                data.push((peak, peak + 1.0, peak - 2.0, peak - 1.0));
            }
            for i in 0..6 {
                let v = peak - i as f64 * 3.0;
                data.push((v, v + 0.5, v - 1.0, v - 0.5));
            }
        }
        make_candles(&data)
    }

    #[test]
    fn build_zones_produces_both_kinds() {
        let candles = wavy_candles();
        let zones = build_zones(&candles, 200, 5, 0.005);
        assert!(zones.iter().any(|z| z.kind == ZoneKind::Resistance));
        assert!(zones.iter().any(|z| z.kind == ZoneKind::Support));
    }

    #[test]
    fn merge_is_idempotent() {
        let candles = wavy_candles();
        let once = build_zones(&candles, 200, 5, 0.005);
        let twice = merge_zones(once.clone(), 0.005);
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn nearest_zone_picks_closest() {
        let zones = vec![
            Zone::new(ZoneKind::Resistance, 110.0, 0.005, chrono::Utc::now()),
            Zone::new(ZoneKind::Resistance, 130.0, 0.005, chrono::Utc::now()),
        ];
        let nearest = nearest_zone(112.0, &zones, None).unwrap();
        assert!((nearest.center - 110.0).abs() < 1e-9);
    }

    #[test]
    fn find_next_opposing_zones_filters_by_side() {
        let zones = vec![
            Zone::new(ZoneKind::Resistance, 110.0, 0.005, chrono::Utc::now()),
            Zone::new(ZoneKind::Support, 90.0, 0.005, chrono::Utc::now()),
        ];
        let longs = find_next_opposing_zones(100.0, &zones, Side::Long, 3);
        assert_eq!(longs.len(), 1);
        assert_eq!(longs[0].kind, ZoneKind::Resistance);
    }
}
