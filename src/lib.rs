pub mod checker;
pub mod config;
pub mod element_finder;
pub mod plugins;
pub mod scraper;
pub mod utils;

// Re-export commonly used types
pub use checker::{CheckOutcome, PriceChecker};
pub use config::Settings;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
