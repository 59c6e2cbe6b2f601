use super::ema::{ema_of_closes, ema_series};

/// MACD (Moving Average Convergence/Divergence) indicator.
///
/// Computes: MACD line = EMA(fast) − EMA(slow), Signal = EMA(macd_line, signal_period).
#[derive(Debug, Clone)]
pub struct MacdIndicator {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

/// MACD and signal line values for every input close.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
}

impl MacdIndicator {
    pub const STANDARD_FAST: usize = 12;
    pub const STANDARD_SLOW: usize = 26;
    pub const STANDARD_SIGNAL: usize = 9;

    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast < slow, "MACD fast period must be less than slow period");
        assert!(signal >= 1, "MACD signal period must be >= 1");
        Self { fast, slow, signal }
    }

    /// The conventional 12/26/9 configuration.
    pub fn standard() -> Self {
        Self::new(Self::STANDARD_FAST, Self::STANDARD_SLOW, Self::STANDARD_SIGNAL)
    }

    /// Closes needed before two consecutive signal-line values exist.
    pub fn min_len(&self) -> usize {
        self.slow + self.signal
    }

    /// Compute both lines from close prices (oldest first).
    /// The MACD line starts at index `slow - 1`, the signal line at
    /// `slow + signal - 2`.
    pub fn series(&self, closes: &[f64]) -> MacdSeries {
        let fast = ema_of_closes(closes, self.fast);
        let slow = ema_of_closes(closes, self.slow);

        let macd: Vec<Option<f64>> = fast
            .iter()
            .zip(&slow)
            .map(|(f, s)| match (f, s) {
                (Some(f), Some(s)) => Some(f - s),
                _ => None,
            })
            .collect();
        let signal = ema_series(&macd, self.signal);

        MacdSeries { macd, signal }
    }
}
