use async_trait::async_trait;
use chrono::{DateTime, Local};
use rust_decimal::Decimal;

use crate::utils::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    PriceDrop(PriceDropAlert),
    CheckFailed(CheckFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceDropAlert {
    pub product_name: String,
    pub product_url: String,
    pub current_price: Decimal,
    pub target_price: Decimal,
    pub currency: String,
    pub checked_at: DateTime<Local>,
}

impl PriceDropAlert {
    pub fn savings(&self) -> Decimal {
        self.target_price - self.current_price
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckFailure {
    pub product_name: String,
    pub product_url: String,
    pub error: String,
    pub checked_at: DateTime<Local>,
}

impl NotificationEvent {
    pub fn product_name(&self) -> &str {
        match self {
            NotificationEvent::PriceDrop(alert) => &alert.product_name,
            NotificationEvent::CheckFailed(failure) => &failure.product_name,
        }
    }
}

/// Delivery channel for price alerts and failure reports.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &NotificationEvent) -> Result<()>;
}
