//! External service clients

pub mod tcmb;

pub use tcmb::{CachedRates, RateProvider, RateQuote, TcmbRateClient};
