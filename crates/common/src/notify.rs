use async_trait::async_trait;

use crate::Result;

/// Delivers a rendered text message to a destination channel.
///
/// Delivery failures are reported to the caller, which logs them; nothing is
/// retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, destination: &str, text: &str) -> Result<()>;
}
