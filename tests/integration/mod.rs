// Integration tests for Price Sentinel
// These tests verify that all components work together correctly

pub mod pipeline_tests;

use async_trait::async_trait;
use price_sentinel::config::{ScraperSettings, Settings};
use price_sentinel::plugins::traits::{NotificationEvent, Notifier};
use price_sentinel::Result;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PRODUCT_PATH: &str = "/dp/B000TEST";

/// Scraper settings with no politeness delay so tests stay fast
pub fn test_scraper_settings(debug_dir: Option<&Path>) -> ScraperSettings {
    ScraperSettings {
        user_agent: "PriceSentinel-Test/1.0".to_string(),
        request_delay: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
        debug_mode: debug_dir.is_some(),
        debug_dir: debug_dir.map(Path::to_path_buf).unwrap_or_else(|| ".".into()),
    }
}

/// Environment for `Settings::from_sources` pointing at a mock server
pub fn test_env(server: &MockServer, target_price: &str) -> HashMap<String, String> {
    [
        ("PRODUCT_NAME", "Integration Product".to_string()),
        ("PRODUCT_URL", format!("{}{}", server.uri(), PRODUCT_PATH)),
        ("TARGET_PRICE", target_price.to_string()),
        ("FROM_EMAIL", "sender@example.com".to_string()),
        ("TO_EMAIL", "recipient@example.com".to_string()),
        ("EMAIL_PASSWORD", "app-password".to_string()),
        ("REQUEST_DELAY_SECS", "0".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

pub fn test_settings(server: &MockServer, target_price: &str) -> Settings {
    Settings::from_sources(None, &test_env(server, target_price)).expect("test settings are valid")
}

/// Amazon-style product page with the price in the primary price block
pub fn product_page(price: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Amazon.com: Integration Product</title></head>
<body>
  <div id="corePrice_feature_div">
    <span class="a-price aok-align-center">
      <span class="a-offscreen">{}</span>
      <span aria-hidden="true"><span class="a-price-whole">0.</span></span>
    </span>
  </div>
</body>
</html>"#,
        price
    )
}

/// Start a mock server answering the product path with the given response
pub async fn serve_page(status: u16, body: impl Into<String>) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCT_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_string(body.into()))
        .mount(&server)
        .await;
    server
}

/// Notifier that records every event instead of sending mail
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(price_sentinel::AppError::EmailSendFailure(
                "SMTP unavailable in tests".to_string(),
            ));
        }
        Ok(())
    }
}
