use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{Decision, EvaluationMode, IndicatedBar, Instrument, SignalEvent};

/// RSI levels gating full-confirmation signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// BUY requires RSI strictly below this level.
    pub buy_rsi: f64,
    /// SELL requires RSI strictly above this level.
    pub sell_rsi: f64,
}

impl Thresholds {
    pub fn new(buy_rsi: f64, sell_rsi: f64) -> Self {
        Self { buy_rsi, sell_rsi }
    }

    /// The wider 35/65 band.
    pub fn loose() -> Self {
        Self::new(35.0, 65.0)
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::new(30.0, 70.0)
    }
}

/// Decides BUY / SELL / nothing from two consecutive indicated bars.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalEvaluator {
    mode: EvaluationMode,
    thresholds: Thresholds,
}

impl SignalEvaluator {
    pub fn new(mode: EvaluationMode, thresholds: Thresholds) -> Self {
        Self { mode, thresholds }
    }

    pub fn mode(&self) -> EvaluationMode {
        self.mode
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Evaluate `curr` against the bar immediately before it.
    /// Any undefined indicator on a bar the rule reads yields `Neutral`.
    pub fn evaluate(&self, curr: &IndicatedBar, prev: &IndicatedBar) -> Decision {
        match self.mode {
            EvaluationMode::FullConfirmation => self.full_confirmation(curr, prev),
            EvaluationMode::TrendOnly => trend_only(curr),
        }
    }

    /// Evaluate the last bar of a computed series against the one before it.
    pub fn evaluate_latest(&self, series: &[IndicatedBar]) -> Decision {
        match series {
            [.., prev, curr] => self.evaluate(curr, prev),
            _ => Decision::Neutral,
        }
    }

    /// Build the event for a non-neutral decision on `curr`.
    pub fn signal_event(
        &self,
        instrument: &Instrument,
        curr: &IndicatedBar,
        decision: Decision,
        generated_at: DateTime<Utc>,
    ) -> Option<SignalEvent> {
        let direction = decision.direction()?;
        Some(SignalEvent {
            instrument: instrument.clone(),
            direction,
            generated_at,
            rsi: curr.rsi?,
            macd: curr.macd?,
            macd_signal: curr.macd_signal?,
        })
    }

    fn full_confirmation(&self, curr: &IndicatedBar, prev: &IndicatedBar) -> Decision {
        if !prev.is_fully_defined() {
            return Decision::Neutral;
        }
        let (Some(rsi), Some(fast), Some(slow), Some(macd), Some(signal)) = (
            curr.rsi,
            curr.ema_fast,
            curr.ema_slow,
            curr.macd,
            curr.macd_signal,
        ) else {
            return Decision::Neutral;
        };
        let (Some(prev_fast), Some(prev_slow)) = (prev.ema_fast, prev.ema_slow) else {
            return Decision::Neutral;
        };

        let crossed_up = prev_fast <= prev_slow && fast > slow;
        let crossed_down = prev_fast >= prev_slow && fast < slow;

        if rsi < self.thresholds.buy_rsi && crossed_up && macd > signal {
            Decision::Buy
        } else if rsi > self.thresholds.sell_rsi && crossed_down && macd < signal {
            Decision::Sell
        } else {
            Decision::Neutral
        }
    }
}

/// The notification for a trend-only signal still carries RSI and MACD, so
/// those must be defined as well.
fn trend_only(curr: &IndicatedBar) -> Decision {
    if !curr.is_fully_defined() {
        return Decision::Neutral;
    }
    match (curr.ema_fast, curr.ema_slow) {
        (Some(fast), Some(slow)) if fast > slow => Decision::Buy,
        (Some(_), Some(_)) => Decision::Sell,
        _ => Decision::Neutral,
    }
}
