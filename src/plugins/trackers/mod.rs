// Tracker implementations
pub mod price;

pub use price::PriceTracker;
