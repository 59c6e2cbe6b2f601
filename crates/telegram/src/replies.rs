//! Reply texts and keyboards for the control commands.
//!
//! Everything here is pure so the wording can be tested without a bot.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use common::{Error, Instrument, Result, Transition, WatchStatus};

const ADD_PREFIX: &str = "add:";
const REMOVE_PREFIX: &str = "remove:";

/// Action encoded in an inline button's callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Add(String),
    Remove(String),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(name) = data.strip_prefix(ADD_PREFIX) {
            Some(Self::Add(name.to_string()))
        } else {
            data.strip_prefix(REMOVE_PREFIX)
                .map(|name| Self::Remove(name.to_string()))
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Self::Add(name) => format!("{ADD_PREFIX}{name}"),
            Self::Remove(name) => format!("{REMOVE_PREFIX}{name}"),
        }
    }
}

/// One row per catalog entry: an add button for non-members, a remove button
/// for members.
pub fn pairs_keyboard(catalog: &[Instrument], members: &[Instrument]) -> InlineKeyboardMarkup {
    let rows = catalog.iter().map(|instrument| {
        let name = instrument.name.clone();
        let (label, action) = if members.contains(instrument) {
            (format!("➖ {name}"), CallbackAction::Remove(name))
        } else {
            (format!("➕ {name}"), CallbackAction::Add(name))
        };
        vec![InlineKeyboardButton::callback(label, action.encode())]
    });
    InlineKeyboardMarkup::new(rows)
}

pub fn reply_for_pairs(catalog: &[Instrument], members: &[Instrument]) -> String {
    if catalog.is_empty() {
        return "No pairs are configured.".to_string();
    }
    let mut text = String::from("Available pairs (tap to add or remove):");
    for instrument in catalog {
        let mark = if members.contains(instrument) { "✅" } else { "▫️" };
        text.push_str(&format!("\n{mark} {} ({})", instrument.name, instrument.code));
    }
    text
}

pub fn reply_for_add(id: &str, outcome: &Result<Transition>) -> String {
    match outcome {
        Ok(Transition::Changed) => format!("➕ {} added to the watch list.", id.trim()),
        Ok(Transition::Unchanged) => format!("{} is already being watched.", id.trim()),
        Err(e) => reply_for_error(e),
    }
}

pub fn reply_for_remove(id: &str, outcome: &Result<Transition>) -> String {
    match outcome {
        Ok(Transition::Changed) => format!("➖ {} removed from the watch list.", id.trim()),
        Ok(Transition::Unchanged) => format!("{} is not on the watch list.", id.trim()),
        Err(e) => reply_for_error(e),
    }
}

pub fn reply_for_start(outcome: &Result<Transition>) -> String {
    match outcome {
        Ok(Transition::Changed) => "▶️ Signal cycles started.".to_string(),
        Ok(Transition::Unchanged) => "Signal cycles are already running.".to_string(),
        Err(Error::InvalidState(_)) => {
            "Cannot start: the watch list is empty. Add a pair with /add or /pairs first."
                .to_string()
        }
        Err(e) => reply_for_error(e),
    }
}

pub fn reply_for_stop(outcome: Transition) -> String {
    match outcome {
        Transition::Changed => "⏹ Signal cycles stopped.".to_string(),
        Transition::Unchanged => "Signal cycles are already stopped.".to_string(),
    }
}

pub fn reply_for_list(members: &[Instrument]) -> String {
    if members.is_empty() {
        return "The watch list is empty.".to_string();
    }
    let names: Vec<&str> = members.iter().map(|i| i.name.as_str()).collect();
    format!("Watching: {}", names.join(", "))
}

pub fn reply_for_status(status: &WatchStatus) -> String {
    format!(
        "Signal Bot Status\n\
         Scheduler: {}\n\
         {}",
        status.state,
        reply_for_list(&status.members)
    )
}

/// Usage hint for `/add` and `/remove` without an argument.
pub fn reply_for_missing_argument(command: &str) -> String {
    format!("Usage: /{command} <pair>, e.g. /{command} EUR/USD")
}

fn reply_for_error(e: &Error) -> String {
    match e {
        Error::UnknownInstrument(id) => {
            format!("Unknown pair '{id}'. Use /pairs to see what is available.")
        }
        other => format!("⚠️ {other}"),
    }
}
