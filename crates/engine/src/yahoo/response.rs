use chrono::{TimeZone, Utc};
use serde::Deserialize;

use common::{Bar, Error, Result};

// ─── Chart API response types ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl ChartEnvelope {
    /// Convert the columnar payload into bars, oldest first.
    ///
    /// Rows with a missing OHLC value are dropped, as are rows whose timestamp
    /// does not advance past the previous kept row. Missing volume reads as 0.
    pub(crate) fn into_bars(self, code: &str) -> Result<Vec<Bar>> {
        if let Some(err) = self.chart.error {
            return Err(Error::QuoteSource(format!(
                "{code}: {} ({})",
                err.code, err.description
            )));
        }
        let Some(result) = self.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(Vec::new());
        };
        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

        let mut bars: Vec<Bar> = Vec::with_capacity(result.timestamp.len());
        for (i, &ts) in result.timestamp.iter().enumerate() {
            let column = |values: &[Option<f64>]| values.get(i).copied().flatten();
            let (Some(open), Some(high), Some(low), Some(close)) = (
                column(&quote.open),
                column(&quote.high),
                column(&quote.low),
                column(&quote.close),
            ) else {
                continue;
            };
            let Some(timestamp) = Utc.timestamp_opt(ts, 0).single() else {
                continue;
            };
            if bars.last().is_some_and(|last| last.timestamp >= timestamp) {
                continue;
            }
            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume: column(&quote.volume).unwrap_or(0.0),
            });
        }
        Ok(bars)
    }
}
