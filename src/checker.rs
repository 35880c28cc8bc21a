use chrono::Local;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::config::{ProductSettings, Settings};
use crate::element_finder::{PriceExtractor, PriceReading};
use crate::plugins::trackers::price::{PriceTracker, format_price};
use crate::plugins::traits::{CheckFailure, NotificationEvent, Notifier, PriceDropAlert};
use crate::scraper::WebScraper;
use crate::utils::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub reading: PriceReading,
    pub target_price: Decimal,
    pub at_or_below_target: bool,
    pub notification_sent: bool,
}

/// Runs one fetch, extract, compare, notify pass for a single product.
pub struct PriceChecker {
    product: ProductSettings,
    notify_on_error: bool,
    scraper: WebScraper,
    extractor: PriceExtractor,
    tracker: PriceTracker,
    notifier: Box<dyn Notifier>,
}

impl PriceChecker {
    pub fn new(settings: &Settings, notifier: Box<dyn Notifier>) -> Result<Self> {
        let scraper = WebScraper::new(settings.scraper.clone())?;

        Ok(Self::from_parts(
            settings.product.clone(),
            settings.notify_on_error,
            scraper,
            PriceExtractor::new(),
            notifier,
        ))
    }

    pub fn from_parts(
        product: ProductSettings,
        notify_on_error: bool,
        scraper: WebScraper,
        extractor: PriceExtractor,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            product,
            notify_on_error,
            scraper,
            extractor,
            tracker: PriceTracker::new(),
            notifier,
        }
    }

    pub async fn run(&self) -> Result<CheckOutcome> {
        info!("{}", "=".repeat(60));
        info!("Checking price for: {}", self.product.name);
        info!("Time: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        info!("{}", "=".repeat(60));

        let result = match self.read_price().await {
            Ok(reading) => self.evaluate(reading).await,
            Err(e) => {
                error!("Failed to retrieve price: {}. Will try again next run.", e);
                if self.notify_on_error {
                    self.report_failure(&e.to_string()).await;
                }
                Err(e)
            }
        };

        info!("{}", "=".repeat(60));
        result
    }

    async fn read_price(&self) -> Result<PriceReading> {
        let body = self.scraper.fetch(self.product.url.as_str()).await.into_body()?;
        self.extractor.extract(&body)
    }

    async fn evaluate(&self, reading: PriceReading) -> Result<CheckOutcome> {
        let currency = reading.currency_symbol().to_string();
        let target = self.product.target_price;
        let comparison = self.tracker.compare(reading.price, target);

        info!("Current Price: {}", format_price(&currency, reading.price));
        info!("Target Price: {}", format_price(&currency, target));

        if !comparison.at_or_below_target {
            info!(
                "Price is still above target. Difference: {}",
                format_price(&currency, comparison.difference)
            );
            return Ok(CheckOutcome {
                reading,
                target_price: target,
                at_or_below_target: false,
                notification_sent: false,
            });
        }

        info!(
            "PRICE DROP ALERT! Current price ({}) is at or below target ({})",
            format_price(&currency, reading.price),
            format_price(&currency, target)
        );

        let event = NotificationEvent::PriceDrop(PriceDropAlert {
            product_name: self.product.name.clone(),
            product_url: self.product.url.to_string(),
            current_price: reading.price,
            target_price: target,
            currency,
            checked_at: Local::now(),
        });

        if let Err(e) = self.notifier.notify(&event).await {
            error!("Error sending email: {}", e);
            return Err(e);
        }

        Ok(CheckOutcome {
            reading,
            target_price: target,
            at_or_below_target: true,
            notification_sent: true,
        })
    }

    async fn report_failure(&self, error: &str) {
        let event = NotificationEvent::CheckFailed(CheckFailure {
            product_name: self.product.name.clone(),
            product_url: self.product.url.to_string(),
            error: error.to_string(),
            checked_at: Local::now(),
        });

        if let Err(e) = self.notifier.notify(&event).await {
            warn!("Error notification could not be sent: {}", e);
        }
    }
}
