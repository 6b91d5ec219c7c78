use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    /// Open time of the bar. Retained as `timestamp` for parity with the rest
    /// of the analytics stack, which indexes and compares candles by this field.
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub close_time: Option<DateTime<Utc>>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default = "default_closed")]
    pub is_closed: bool,
}

fn default_closed() -> bool {
    true
}

impl Candle {
    /// `low <= min(open,close) <= max(open,close) <= high`, non-negative volume,
    /// and (when known) `open_time < close_time`.
    pub fn validate(&self) -> Result<(), crate::error::EngineError> {
        let body_lo = self.open.min(self.close);
        let body_hi = self.open.max(self.close);
        let ok = self.low <= body_lo
            && body_hi <= self.high
            && self.volume >= 0.0
            && [self.open, self.high, self.low, self.close, self.volume]
                .iter()
                .all(|v| v.is_finite());
        let ok = ok
            && self
                .close_time
                .map_or(true, |ct| self.timestamp < ct);
        if ok {
            Ok(())
        } else {
            Err(crate::error::EngineError::InvalidCandle(format!(
                "candle at {} fails OHLCV invariants (o={} h={} l={} c={} v={})",
                self.timestamp, self.open, self.high, self.low, self.close, self.volume
            )))
        }
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn total_range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.close.max(self.open)
    }

    pub fn lower_wick(&self) -> f64 {
        self.close.min(self.open) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    pub fn body_top(&self) -> f64 {
        self.close.max(self.open)
    }

    pub fn body_bottom(&self) -> f64 {
        self.close.min(self.open)
    }
}

/// Wraps Vec<Candle> with helper methods replacing DataFrame operations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn tail(&self, n: usize) -> CandleSeries {
        let start = self.candles.len().saturating_sub(n);
        CandleSeries::new(self.candles[start..].to_vec())
    }

    pub fn slice(&self, start: usize, end: usize) -> CandleSeries {
        let s = start.min(self.candles.len());
        let e = end.min(self.candles.len());
        CandleSeries::new(self.candles[s..e].to_vec())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }
}

impl std::ops::Index<usize> for CandleSeries {
    type Output = Candle;
    fn index(&self, index: usize) -> &Self::Output {
        &self.candles[index]
    }
}

impl IntoIterator for CandleSeries {
    type Item = Candle;
    type IntoIter = std::vec::IntoIter<Candle>;
    fn into_iter(self) -> Self::IntoIter {
        self.candles.into_iter()
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;
    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_candles;

    fn bullish_candle() -> Candle {
        Candle {
            timestamp: Utc::now(),
            close_time: None,
            open: 100.0,
            high: 115.0,
            low: 95.0,
            close: 110.0,
            volume: 50.0,
            is_closed: true,
        }
    }

    fn bearish_candle() -> Candle {
        Candle {
            timestamp: Utc::now(),
            close_time: None,
            open: 110.0,
            high: 115.0,
            low: 95.0,
            close: 100.0,
            volume: 50.0,
            is_closed: true,
        }
    }

    #[test]
    fn candle_body_and_range() {
        let c = bullish_candle();
        assert!((c.body() - 10.0).abs() < 1e-9);
        assert!((c.total_range() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn candle_wicks() {
        let c = bullish_candle(); // O=100, H=115, L=95, C=110
        assert!((c.upper_wick() - 5.0).abs() < 1e-9);  // 115 - 110
        assert!((c.lower_wick() - 5.0).abs() < 1e-9);  // 100 - 95
    }

    #[test]
    fn candle_bullish_bearish() {
        assert!(bullish_candle().is_bullish());
        assert!(!bullish_candle().is_bearish());
        assert!(bearish_candle().is_bearish());
        assert!(!bearish_candle().is_bullish());
    }

    #[test]
    fn candle_body_top_bottom() {
        let b = bullish_candle();
        assert!((b.body_top() - 110.0).abs() < 1e-9);
        assert!((b.body_bottom() - 100.0).abs() < 1e-9);
        let br = bearish_candle();
        assert!((br.body_top() - 110.0).abs() < 1e-9);
        assert!((br.body_bottom() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn series_len_empty_tail_head_slice() {
        let s = make_candles(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 112.0, 104.0, 110.0),
        ]);
        assert_eq!(s.len(), 3);
        assert!(!s.is_empty());

        let tail = s.tail(2);
        assert_eq!(tail.len(), 2);
        assert!((tail[0].open - 102.0).abs() < 1e-9);

        let slice = s.slice(1, 3);
        assert_eq!(slice.len(), 2);
    }
}
