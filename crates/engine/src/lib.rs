pub mod scheduler;
pub mod watchlist;
pub mod yahoo;

pub use scheduler::{CycleReport, DelayRange, ScheduleSettings, Scheduler};
pub use watchlist::WatchList;
pub use yahoo::YahooClient;
