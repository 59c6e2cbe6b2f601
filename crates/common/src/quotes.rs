use async_trait::async_trait;

use crate::{Bar, Result};

/// Abstraction over the market data provider.
///
/// `YahooClient` in `crates/engine` implements this against the public chart
/// API. Tests substitute in-memory sources.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch bars for `code` sampled at `interval` (e.g. "1m") covering
    /// `range` (e.g. "1d"). Bars are returned oldest first.
    async fn fetch(&self, code: &str, interval: &str, range: &str) -> Result<Vec<Bar>>;
}
