use serde::{Deserialize, Serialize};

use common::{Bar, Error, IndicatedBar, Result};

use crate::indicators::{ema::ema_of_closes, MacdIndicator, RsiIndicator};

/// Periods for the configurable indicators. MACD always runs at 12/26/9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ema_fast: 5,
            ema_slow: 20,
            rsi_period: 14,
        }
    }
}

/// Turns a bar series into indicated bars.
#[derive(Debug, Clone)]
pub struct IndicatorCalculator {
    params: IndicatorParams,
    rsi: RsiIndicator,
    macd: MacdIndicator,
}

impl IndicatorCalculator {
    pub fn new(params: IndicatorParams) -> Self {
        assert!(
            params.ema_fast >= 1 && params.ema_fast < params.ema_slow,
            "EMA fast period must be at least 1 and less than the slow period"
        );
        Self {
            params,
            rsi: RsiIndicator::new(params.rsi_period),
            macd: MacdIndicator::standard(),
        }
    }

    pub fn params(&self) -> IndicatorParams {
        self.params
    }

    /// Shortest input for which every indicator is defined on the last two bars.
    pub fn min_bars(&self) -> usize {
        self.params
            .ema_slow
            .max(self.params.rsi_period + 1)
            .max(self.macd.min_len())
    }

    /// Indicated bars for `bars`, same length as the input.
    ///
    /// Inputs shorter than [`min_bars`](Self::min_bars) yield bars whose
    /// indicator fields are all `None`.
    pub fn indicate(&self, bars: &[Bar]) -> Vec<IndicatedBar> {
        if bars.len() < self.min_bars() {
            return bars.iter().copied().map(IndicatedBar::undefined).collect();
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let ema_fast = ema_of_closes(&closes, self.params.ema_fast);
        let ema_slow = ema_of_closes(&closes, self.params.ema_slow);
        let rsi = self.rsi.series(&closes);
        let macd = self.macd.series(&closes);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| IndicatedBar {
                bar: *bar,
                ema_fast: ema_fast[i],
                ema_slow: ema_slow[i],
                rsi: rsi[i],
                macd: macd.macd[i],
                macd_signal: macd.signal[i],
            })
            .collect()
    }

    /// Like [`indicate`](Self::indicate), but reports short input as
    /// [`Error::InsufficientData`] instead of returning undefined bars.
    pub fn compute(&self, bars: &[Bar]) -> Result<Vec<IndicatedBar>> {
        let needed = self.min_bars();
        if bars.len() < needed {
            return Err(Error::InsufficientData {
                needed,
                got: bars.len(),
            });
        }
        Ok(self.indicate(bars))
    }
}

impl Default for IndicatorCalculator {
    fn default() -> Self {
        Self::new(IndicatorParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: start + Duration::minutes(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 0.0,
            })
            .collect()
    }

    #[test]
    fn default_warm_up_is_macd_bound() {
        assert_eq!(IndicatorCalculator::default().min_bars(), 35);
    }

    #[test]
    fn warm_up_follows_slow_ema_when_larger() {
        let calc = IndicatorCalculator::new(IndicatorParams {
            ema_fast: 10,
            ema_slow: 50,
            rsi_period: 14,
        });
        assert_eq!(calc.min_bars(), 50);
    }

    #[test]
    fn compute_rejects_short_input() {
        let calc = IndicatorCalculator::default();
        let err = calc.compute(&bars(&[1.0; 34])).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { needed: 35, got: 34 }));
    }

    #[test]
    fn indicate_short_input_is_uniformly_undefined() {
        let calc = IndicatorCalculator::default();
        let out = calc.indicate(&bars(&[1.0; 30]));
        assert_eq!(out.len(), 30);
        assert!(out.iter().all(IndicatedBar::is_fully_undefined));
    }

    #[test]
    fn compute_preserves_length_and_defines_last_two_bars() {
        let calc = IndicatorCalculator::default();
        let closes: Vec<f64> = (0..35).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();
        let out = calc.compute(&bars(&closes)).unwrap();
        assert_eq!(out.len(), 35);
        assert!(out[33].is_fully_defined());
        assert!(out[34].is_fully_defined());
        assert!(out[0].is_fully_undefined());
        assert_eq!(out[34].bar.close, closes[34]);
    }
}
