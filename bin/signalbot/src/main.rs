use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, Notifier};
use engine::{ScheduleSettings, Scheduler, WatchList, YahooClient};
use strategy::{message, StrategyFileConfig};
use telegram_ctrl::{start_bot, BotDeps, TelegramNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("loading environment configuration")?;
    let strategy_file = match &cfg.strategy_config_path {
        Some(path) => StrategyFileConfig::load(path)?,
        None => StrategyFileConfig::default(),
    };
    info!(
        timezone = %cfg.timezone,
        mode = %strategy_file.signal.mode,
        pairs = strategy_file.instruments.len(),
        "Signal bot starting"
    );

    // ── Watch list ────────────────────────────────────────────────────────────
    let watchlist = WatchList::new(strategy_file.catalog());
    for id in &strategy_file.watch.instruments {
        watchlist.add(id).await?;
    }
    if strategy_file.watch.autostart {
        match watchlist.start().await {
            Ok(_) => info!("Autostart enabled, cycling immediately"),
            Err(e) => warn!(error = %e, "Autostart skipped"),
        }
    }

    // ── Collaborators ─────────────────────────────────────────────────────────
    let bot = teloxide::Bot::new(cfg.telegram_token.clone());
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(bot.clone()));
    let quotes = Arc::new(YahooClient::new(strategy_file.schedule.fetch_timeout())?);

    let settings = ScheduleSettings::from_config(
        &strategy_file.schedule,
        strategy_file.calculator(),
        strategy_file.evaluator(),
        cfg.telegram_chat_id.clone(),
        cfg.timezone,
    )?;
    let scheduler = Scheduler::new(watchlist.clone(), quotes, notifier.clone(), settings);

    // ── Startup announcement ──────────────────────────────────────────────────
    if cfg.announce_startup {
        let text = message::startup(
            watchlist.catalog().instruments(),
            strategy_file.schedule.min_delay_secs,
            strategy_file.schedule.max_delay_secs,
        );
        if let Err(e) = notifier.send(&cfg.telegram_chat_id, &text).await {
            warn!(error = %e, "Startup announcement failed");
        }
    }

    if cfg.telegram_allowed_user_ids.is_empty() {
        warn!("TELEGRAM_ALLOWED_USER_IDS is empty; every control command will be ignored");
    }

    // ── Spawn all tasks ───────────────────────────────────────────────────────
    let bot_deps = BotDeps {
        watchlist: watchlist.clone(),
        allowed_user_ids: Arc::new(cfg.telegram_allowed_user_ids.clone()),
    };
    let api_state = api::AppState {
        watchlist: watchlist.clone(),
    };
    let port = cfg.health_port;

    tokio::spawn(scheduler.run());
    tokio::spawn(start_bot(bot, bot_deps));
    tokio::spawn(async move {
        if let Err(e) = api::serve(api_state, port).await {
            error!(error = %e, port, "Liveness endpoint failed");
        }
    });

    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("Shutdown signal received. Exiting.");
    Ok(())
}
