//! Core business logic: rates, caching, pricing

pub mod cache;
pub mod config;
pub mod log;
pub mod manager;
pub mod pricing;
pub mod rate;

// Re-export main types for cleaner imports
pub use cache::RateCache;
pub use manager::{RateManager, RatePolicy};
pub use pricing::{PricingError, Quote};
pub use rate::{FetchError, Rate, RateError, RateSnapshot, RateSource};
