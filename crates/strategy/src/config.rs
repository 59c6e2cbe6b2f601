use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use common::{Error, EvaluationMode, Instrument, InstrumentCatalog, Result};

use crate::calculator::{IndicatorCalculator, IndicatorParams};
use crate::evaluator::{SignalEvaluator, Thresholds};

/// Top-level strategy config file (TOML). Every table is optional.
///
/// Example `config/strategy.toml`:
/// ```toml
/// [indicators]
/// ema_fast = 5
/// ema_slow = 20
/// rsi_period = 14
///
/// [signal]
/// mode = "full_confirmation"   # or "trend_only"
/// buy_rsi = 30.0
/// sell_rsi = 70.0
///
/// [schedule]
/// min_delay_secs = 120
/// max_delay_secs = 180
/// interval = "1m"
/// range = "1d"
/// lookback = 50
///
/// [watch]
/// instruments = ["EUR/USD"]
/// autostart = true
///
/// [[instrument]]
/// name = "EUR/USD"
/// code = "EURUSD=X"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StrategyFileConfig {
    pub indicators: IndicatorParams,
    pub signal: SignalConfig,
    pub schedule: ScheduleConfig,
    pub watch: WatchConfig,
    #[serde(rename = "instrument")]
    pub instruments: Vec<Instrument>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalConfig {
    pub mode: EvaluationMode,
    pub buy_rsi: f64,
    pub sell_rsi: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
    /// Bar interval requested from the Quote Source.
    pub interval: String,
    /// History window requested from the Quote Source.
    pub range: String,
    /// Number of most recent bars fed to the calculator.
    pub lookback: usize,
    pub fetch_timeout_secs: u64,
}

/// Members to watch at boot, and whether to start cycling immediately.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
    pub instruments: Vec<String>,
    pub autostart: bool,
}

impl Default for StrategyFileConfig {
    fn default() -> Self {
        Self {
            indicators: IndicatorParams::default(),
            signal: SignalConfig::default(),
            schedule: ScheduleConfig::default(),
            watch: WatchConfig::default(),
            instruments: InstrumentCatalog::default().instruments().to_vec(),
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            mode: EvaluationMode::default(),
            buy_rsi: thresholds.buy_rsi,
            sell_rsi: thresholds.sell_rsi,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: 120,
            max_delay_secs: 180,
            interval: "1m".to_string(),
            range: "1d".to_string(),
            lookback: 50,
            fetch_timeout_secs: 20,
        }
    }
}

impl ScheduleConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl StrategyFileConfig {
    /// Load and validate a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read strategy config at '{path}': {e}")))?;
        let cfg = Self::parse(&content)
            .map_err(|e| Error::Config(format!("invalid strategy config at '{path}': {e}")))?;
        info!(
            path,
            mode = %cfg.signal.mode,
            pairs = cfg.instruments.len(),
            watch = cfg.watch.instruments.len(),
            "Strategy config loaded"
        );
        Ok(cfg)
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let ind = &self.indicators;
        if ind.ema_fast == 0 || ind.ema_fast >= ind.ema_slow {
            return Err(Error::Config(format!(
                "ema_fast ({}) must be at least 1 and less than ema_slow ({})",
                ind.ema_fast, ind.ema_slow
            )));
        }
        if ind.rsi_period < 2 {
            return Err(Error::Config(format!(
                "rsi_period must be >= 2, got {}",
                ind.rsi_period
            )));
        }

        let sig = &self.signal;
        if !(0.0..=100.0).contains(&sig.buy_rsi)
            || !(0.0..=100.0).contains(&sig.sell_rsi)
            || sig.buy_rsi >= sig.sell_rsi
        {
            return Err(Error::Config(format!(
                "RSI thresholds must satisfy 0 <= buy_rsi < sell_rsi <= 100, got {} / {}",
                sig.buy_rsi, sig.sell_rsi
            )));
        }

        let sched = &self.schedule;
        if sched.min_delay_secs > sched.max_delay_secs {
            return Err(Error::Config(format!(
                "min_delay_secs ({}) exceeds max_delay_secs ({})",
                sched.min_delay_secs, sched.max_delay_secs
            )));
        }
        if sched.max_delay_secs == 0 {
            return Err(Error::Config("max_delay_secs must be at least 1".to_string()));
        }
        if sched.fetch_timeout_secs == 0 {
            return Err(Error::Config("fetch_timeout_secs must be positive".to_string()));
        }
        let min_bars = IndicatorCalculator::new(*ind).min_bars();
        if sched.lookback < min_bars {
            return Err(Error::Config(format!(
                "lookback ({}) is below the indicator warm-up of {min_bars} bars",
                sched.lookback
            )));
        }

        if self.instruments.is_empty() {
            return Err(Error::Config("instrument catalog is empty".to_string()));
        }
        let catalog = self.catalog();
        for id in &self.watch.instruments {
            catalog.lookup(id)?;
        }
        Ok(())
    }

    pub fn catalog(&self) -> InstrumentCatalog {
        InstrumentCatalog::new(self.instruments.clone())
    }

    pub fn calculator(&self) -> IndicatorCalculator {
        IndicatorCalculator::new(self.indicators)
    }

    pub fn evaluator(&self) -> SignalEvaluator {
        SignalEvaluator::new(
            self.signal.mode,
            Thresholds::new(self.signal.buy_rsi, self.signal.sell_rsi),
        )
    }
}
