pub mod calculator;
pub mod config;
pub mod evaluator;
pub mod indicators;
pub mod message;

pub use calculator::{IndicatorCalculator, IndicatorParams};
pub use config::{ScheduleConfig, SignalConfig, StrategyFileConfig, WatchConfig};
pub use evaluator::{SignalEvaluator, Thresholds};
