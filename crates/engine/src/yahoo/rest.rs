use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use common::{Bar, Error, QuoteSource, Result};

use super::response::ChartEnvelope;

const BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; signalbot/0.1)";

/// Yahoo Finance chart API client. Used as the bot's Quote Source.
pub struct YahooClient {
    base_url: String,
    http: Client,
}

impl YahooClient {
    /// Client with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(BASE_URL, timeout)
    }

    /// Client against another host serving the same API (used by tests).
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl QuoteSource for YahooClient {
    async fn fetch(&self, code: &str, interval: &str, range: &str) -> Result<Vec<Bar>> {
        let url = format!("{}/v8/finance/chart/{code}", self.base_url);
        debug!(code, interval, range, "Fetching chart");

        let resp = self
            .http
            .get(&url)
            .query(&[("interval", interval), ("range", range)])
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        // The chart API reports unknown symbols as 404 with an error object
        if !status.is_success() {
            let detail = serde_json::from_str::<ChartEnvelope>(&body)
                .ok()
                .and_then(|env| env.into_bars(code).err());
            return Err(detail.unwrap_or_else(|| {
                Error::QuoteSource(format!("{code}: HTTP {status}: {body}"))
            }));
        }

        let envelope: ChartEnvelope = serde_json::from_str(&body)
            .map_err(|e| Error::QuoteSource(format!("{code}: malformed chart response: {e}")))?;
        let bars = envelope.into_bars(code)?;
        debug!(code, bars = bars.len(), "Chart fetched");
        Ok(bars)
    }
}
