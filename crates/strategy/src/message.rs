use chrono_tz::Tz;

use common::{Direction, Instrument, SignalEvent};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render the channel message for a fired signal.
pub fn render(event: &SignalEvent, tz: Tz) -> String {
    let local = event.generated_at.with_timezone(&tz);
    let trend = match event.direction {
        Direction::Buy => "Bullish",
        Direction::Sell => "Bearish",
    };
    format!(
        "✨ {direction} SIGNAL - {instrument}\n\
         Time: {time} ({tz})\n\
         RSI: {rsi:.2}\n\
         EMA: {trend}\n\
         MACD: {macd:.4} vs {signal:.4}",
        direction = event.direction,
        instrument = event.instrument.name,
        time = local.format(TIME_FORMAT),
        tz = tz.name(),
        rsi = event.rsi,
        macd = event.macd,
        signal = event.macd_signal,
    )
}

/// Announcement sent to the channel when the bot boots.
pub fn startup(catalog: &[Instrument], min_delay_secs: u64, max_delay_secs: u64) -> String {
    let names: Vec<&str> = catalog.iter().map(|i| i.name.as_str()).collect();
    format!(
        "🚀 Signal bot started! Pairs available: {}. Cycles every {}–{} seconds once started.",
        names.join(", "),
        min_delay_secs,
        max_delay_secs
    )
}
