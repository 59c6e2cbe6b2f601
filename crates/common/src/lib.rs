pub mod catalog;
pub mod config;
pub mod error;
pub mod notify;
pub mod quotes;
pub mod types;

pub use catalog::InstrumentCatalog;
pub use config::Config;
pub use error::{Error, Result};
pub use notify::Notifier;
pub use quotes::QuoteSource;
pub use types::*;
