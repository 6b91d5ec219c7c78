use crate::models::CandleSeries;

/// Simple (non-Wilder) average true range over the trailing `period` candles.
pub fn atr(candles: &CandleSeries, period: usize) -> f64 {
    if candles.len() < 2 {
        return candles.last().map_or(0.0, |c| c.high - c.low);
    }

    let mut trs: Vec<f64> = Vec::with_capacity(candles.len());
    trs.push(candles[0].high - candles[0].low);
    for i in 1..candles.len() {
        let hl = candles[i].high - candles[i].low;
        let hc = (candles[i].high - candles[i - 1].close).abs();
        let lc = (candles[i].low - candles[i - 1].close).abs();
        trs.push(hl.max(hc).max(lc));
    }

    let start = trs.len().saturating_sub(period);
    let slice = &trs[start..];
    slice.iter().sum::<f64>() / slice.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_candles;

    #[test]
    fn atr_is_positive_for_moving_market() {
        let candles = make_candles(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 112.0, 104.0, 110.0),
        ]);
        assert!(atr(&candles, 14) > 0.0);
    }
}
