use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLC observation returned by the Quote Source.
/// Sequences of bars are ordered oldest first with strictly increasing timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A bar extended with the indicator values computed over the series it belongs to.
/// `None` means the warm-up history for that indicator was not yet available.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatedBar {
    pub bar: Bar,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
}

impl IndicatedBar {
    pub fn undefined(bar: Bar) -> Self {
        Self {
            bar,
            ema_fast: None,
            ema_slow: None,
            rsi: None,
            macd: None,
            macd_signal: None,
        }
    }

    pub fn is_fully_defined(&self) -> bool {
        self.ema_fast.is_some()
            && self.ema_slow.is_some()
            && self.rsi.is_some()
            && self.macd.is_some()
            && self.macd_signal.is_some()
    }

    pub fn is_fully_undefined(&self) -> bool {
        self.ema_fast.is_none()
            && self.ema_slow.is_none()
            && self.rsi.is_none()
            && self.macd.is_none()
            && self.macd_signal.is_none()
    }
}

/// An instrument the bot is able to watch.
///
/// `name` is what operators type and see ("EUR/USD"); `code` is the symbol the
/// Quote Source understands ("EURUSD=X"). Ordering is by name so that member
/// snapshots iterate in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    pub code: String,
}

impl Instrument {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Direction of a fired signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

/// Outcome of evaluating one pair of consecutive indicated bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    #[default]
    Neutral,
    Buy,
    Sell,
}

impl Decision {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Decision::Neutral => None,
            Decision::Buy => Some(Direction::Buy),
            Decision::Sell => Some(Direction::Sell),
        }
    }
}

impl From<Direction> for Decision {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Buy => Decision::Buy,
            Direction::Sell => Decision::Sell,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Neutral => write!(f, "NONE"),
            Decision::Buy => write!(f, "BUY"),
            Decision::Sell => write!(f, "SELL"),
        }
    }
}

/// A fired signal, built by the evaluator and handed straight to the Notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub instrument: Instrument,
    pub direction: Direction,
    pub generated_at: DateTime<Utc>,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
}

/// Which rule set the Signal Evaluator applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// RSI threshold, EMA crossover and MACD confirmation must all agree.
    #[default]
    FullConfirmation,
    /// Direction follows the fast/slow EMA ordering alone.
    TrendOnly,
}

impl std::fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationMode::FullConfirmation => write!(f, "full_confirmation"),
            EvaluationMode::TrendOnly => write!(f, "trend_only"),
        }
    }
}

/// Run state of the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    #[default]
    Stopped,
    Running,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerState::Stopped => write!(f, "stopped"),
            SchedulerState::Running => write!(f, "running"),
        }
    }
}

/// Snapshot returned by the Control Surface `status` action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchStatus {
    pub state: SchedulerState,
    pub members: Vec<Instrument>,
}

impl WatchStatus {
    pub fn running(&self) -> bool {
        self.state == SchedulerState::Running
    }
}

/// Whether an idempotent control action changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Changed,
    Unchanged,
}

impl Transition {
    pub fn changed(self) -> bool {
        self == Transition::Changed
    }
}
