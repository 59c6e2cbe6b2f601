use std::sync::Arc;

use teloxide::{
    dispatching::UpdateHandler,
    prelude::*,
    utils::command::BotCommands,
};
use tracing::{debug, info, warn};

use engine::WatchList;

use crate::replies::{self, CallbackAction};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Dependencies injected into every handler via `dptree`.
#[derive(Clone)]
pub struct BotDeps {
    pub watchlist: WatchList,
    /// Operators allowed to issue commands. Empty admits nobody.
    pub allowed_user_ids: Arc<Vec<i64>>,
}

/// Telegram bot commands exposed to the operator.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Signal bot commands:")]
pub enum Command {
    #[command(description = "Show this help")]
    Help,
    #[command(description = "Show available pairs with add/remove buttons")]
    Pairs,
    #[command(description = "Add a pair to the watch list, e.g. /add EUR/USD")]
    Add(String),
    #[command(description = "Remove a pair from the watch list")]
    Remove(String),
    #[command(description = "List watched pairs")]
    List,
    #[command(description = "Show scheduler state and watched pairs")]
    Status,
    #[command(description = "Start signal cycles")]
    Start,
    #[command(description = "Stop signal cycles")]
    Stop,
}

/// Start the Telegram bot in long-polling mode.
pub async fn start_bot(bot: Bot, deps: BotDeps) {
    let deps = Arc::new(deps);

    info!("Telegram bot starting (long-polling)");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![deps])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(handle_help))
        .branch(case![Command::Pairs].endpoint(handle_pairs))
        .branch(case![Command::Add(id)].endpoint(handle_add))
        .branch(case![Command::Remove(id)].endpoint(handle_remove))
        .branch(case![Command::List].endpoint(handle_list))
        .branch(case![Command::Status].endpoint(handle_status))
        .branch(case![Command::Start].endpoint(handle_start))
        .branch(case![Command::Stop].endpoint(handle_stop));

    let message_handler = Update::filter_message()
        .filter_map(|msg: Message| msg.from().map(|u| u.id))
        .filter_async(auth_filter)
        .branch(command_handler);

    let callback_handler = Update::filter_callback_query()
        .map(|q: CallbackQuery| q.from.id)
        .filter_async(auth_filter)
        .endpoint(handle_callback);

    dptree::entry()
        .branch(message_handler)
        .branch(callback_handler)
}

/// Silently drop updates from users not in the allowed list.
async fn auth_filter(user_id: UserId, deps: Arc<BotDeps>) -> bool {
    let uid = user_id.0 as i64;
    let allowed = is_allowed(&deps.allowed_user_ids, uid);
    if !allowed {
        warn!(user_id = uid, "Unauthorized Telegram access attempt");
    }
    allowed
}

fn is_allowed(allowed_user_ids: &[i64], uid: i64) -> bool {
    allowed_user_ids.contains(&uid)
}

async fn handle_help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

async fn handle_pairs(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let catalog = deps.watchlist.catalog().instruments();
    let members = deps.watchlist.members().await;
    bot.send_message(msg.chat.id, replies::reply_for_pairs(catalog, &members))
        .reply_markup(replies::pairs_keyboard(catalog, &members))
        .await?;
    Ok(())
}

async fn handle_add(bot: Bot, msg: Message, id: String, deps: Arc<BotDeps>) -> HandlerResult {
    let text = if id.trim().is_empty() {
        replies::reply_for_missing_argument("add")
    } else {
        replies::reply_for_add(&id, &deps.watchlist.add(&id).await)
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_remove(bot: Bot, msg: Message, id: String, deps: Arc<BotDeps>) -> HandlerResult {
    let text = if id.trim().is_empty() {
        replies::reply_for_missing_argument("remove")
    } else {
        replies::reply_for_remove(&id, &deps.watchlist.remove(&id).await)
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_list(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let members = deps.watchlist.members().await;
    bot.send_message(msg.chat.id, replies::reply_for_list(&members))
        .await?;
    Ok(())
}

async fn handle_status(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let status = deps.watchlist.status().await;
    bot.send_message(msg.chat.id, replies::reply_for_status(&status))
        .await?;
    Ok(())
}

async fn handle_start(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let outcome = deps.watchlist.start().await;
    bot.send_message(msg.chat.id, replies::reply_for_start(&outcome))
        .await?;
    Ok(())
}

async fn handle_stop(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let outcome = deps.watchlist.stop().await;
    bot.send_message(msg.chat.id, replies::reply_for_stop(outcome))
        .await?;
    Ok(())
}

/// Inline `add:<name>` / `remove:<name>` buttons from `/pairs`.
async fn handle_callback(bot: Bot, q: CallbackQuery, deps: Arc<BotDeps>) -> HandlerResult {
    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        debug!(data = ?q.data, "Ignoring unrecognised callback data");
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    let text = match &action {
        CallbackAction::Add(name) => replies::reply_for_add(name, &deps.watchlist.add(name).await),
        CallbackAction::Remove(name) => {
            replies::reply_for_remove(name, &deps.watchlist.remove(name).await)
        }
    };
    bot.answer_callback_query(q.id).text(text).await?;

    if let Some(msg) = q.message {
        let catalog = deps.watchlist.catalog().instruments();
        let members = deps.watchlist.members().await;
        // Telegram rejects edits that leave the markup unchanged
        if let Err(e) = bot
            .edit_message_reply_markup(msg.chat.id, msg.id)
            .reply_markup(replies::pairs_keyboard(catalog, &members))
            .await
        {
            debug!(error = %e, "Keyboard not refreshed");
        }
    }
    Ok(())
}
