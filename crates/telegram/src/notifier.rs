use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::Recipient;

use common::{Error, Notifier, Result};

/// Posts signal messages through the Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, destination: &str, text: &str) -> Result<()> {
        self.bot
            .send_message(parse_recipient(destination), text)
            .await
            .map_err(|e| Error::Notify(format!("{destination}: {e}")))?;
        Ok(())
    }
}

/// A numeric chat id, or a public channel username such as `@signals`.
pub fn parse_recipient(destination: &str) -> Recipient {
    let destination = destination.trim();
    match destination.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(destination.to_string()),
    }
}
