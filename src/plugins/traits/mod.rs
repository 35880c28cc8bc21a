pub mod notifier;

pub use notifier::{CheckFailure, NotificationEvent, Notifier, PriceDropAlert};
