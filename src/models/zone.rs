use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Support,
    Resistance,
}

impl ZoneKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneKind::Support => "support",
            ZoneKind::Resistance => "resistance",
        }
    }
}

/// A price band anchored on a pivot and expanded by the configured tolerance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub kind: ZoneKind,
    pub center: f64,
    pub lower: f64,
    pub upper: f64,
    pub timestamp: DateTime<Utc>,
    pub touches: usize,
    pub key: String,
}

impl Zone {
    pub fn new(kind: ZoneKind, center: f64, tol_pct: f64, timestamp: DateTime<Utc>) -> Self {
        let lower = center * (1.0 - tol_pct);
        let upper = center * (1.0 + tol_pct);
        Zone {
            kind,
            center,
            lower,
            upper,
            timestamp,
            touches: 1,
            key: format!("{}_{:.2}", kind.as_str(), center),
        }
    }

    pub fn is_touching(&self, price: f64) -> bool {
        price >= self.lower && price <= self.upper
    }

    pub fn distance_pct(&self, price: f64) -> f64 {
        ((price - self.center).abs() / self.center) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_bounds_bracket_center() {
        let z = Zone::new(ZoneKind::Support, 100.0, 0.005, Utc::now());
        assert!(z.lower < z.center);
        assert!(z.center < z.upper);
        assert!(z.is_touching(100.4));
        assert!(!z.is_touching(102.0));
    }

    #[test]
    fn zone_key_stable_for_equal_center() {
        let a = Zone::new(ZoneKind::Resistance, 43200.0, 0.005, Utc::now());
        let b = Zone::new(ZoneKind::Resistance, 43200.0, 0.005, Utc::now());
        assert_eq!(a.key, b.key);
    }
}
