pub mod ema;
pub mod macd;
pub mod rsi;

pub use ema::ema_series;
pub use macd::MacdIndicator;
pub use rsi::RsiIndicator;
