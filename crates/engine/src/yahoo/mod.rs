mod response;
mod rest;

pub use rest::YahooClient;
