// Full check runs: settings -> fetch -> extract -> compare -> notify

use super::*;
use price_sentinel::AppError;
use price_sentinel::PriceChecker;
use price_sentinel::plugins::traits::PriceDropAlert;
use rust_decimal::Decimal;
use serde_json::json;
use std::io::Write;

fn checker(settings: &Settings, notifier: &RecordingNotifier) -> PriceChecker {
    PriceChecker::new(settings, Box::new(notifier.clone())).expect("checker builds")
}

fn only_price_drop(events: &[NotificationEvent]) -> &PriceDropAlert {
    assert_eq!(events.len(), 1, "expected exactly one notification");
    match &events[0] {
        NotificationEvent::PriceDrop(alert) => alert,
        other => panic!("expected a price drop, got {:?}", other),
    }
}

#[tokio::test]
async fn test_price_drop_notifies_recipient() -> anyhow::Result<()> {
    let server = serve_page(200, product_page("$45.99")).await;
    let settings = test_settings(&server, "50.00");
    let notifier = RecordingNotifier::new();

    let outcome = checker(&settings, &notifier).run().await?;

    assert!(outcome.notification_sent);
    assert_eq!(outcome.reading.price, Decimal::new(4599, 2));

    let events = notifier.events();
    let alert = only_price_drop(&events);
    assert_eq!(alert.product_name, "Integration Product");
    assert_eq!(alert.current_price, Decimal::new(4599, 2));
    assert_eq!(alert.target_price, Decimal::new(5000, 2));
    assert_eq!(alert.savings(), Decimal::new(401, 2));
    assert_eq!(settings.email.to_email, "recipient@example.com");
    Ok(())
}

#[tokio::test]
async fn test_exact_target_is_inclusive() -> anyhow::Result<()> {
    let server = serve_page(200, product_page("$1,234.56")).await;
    let settings = test_settings(&server, "1234.56");
    let notifier = RecordingNotifier::new();

    let outcome = checker(&settings, &notifier).run().await?;

    assert!(outcome.at_or_below_target);
    only_price_drop(&notifier.events());
    Ok(())
}

#[tokio::test]
async fn test_above_target_is_quiet() -> anyhow::Result<()> {
    let server = serve_page(200, product_page("$45.99")).await;
    let settings = test_settings(&server, "40");
    let notifier = RecordingNotifier::new();

    let outcome = checker(&settings, &notifier).run().await?;

    assert!(!outcome.at_or_below_target);
    assert!(!outcome.notification_sent);
    assert!(notifier.events().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_blocked_run_sends_error_notification_when_enabled() -> anyhow::Result<()> {
    let server = serve_page(503, "<html>Service Unavailable</html>").await;
    let mut env = test_env(&server, "50.00");
    env.insert("NOTIFY_ON_ERROR".into(), "true".into());
    let settings = Settings::from_sources(None, &env)?;
    let notifier = RecordingNotifier::new();

    let result = checker(&settings, &notifier).run().await;

    assert!(matches!(result, Err(AppError::BlockedByRemote { .. })));
    let events = notifier.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        NotificationEvent::CheckFailed(failure) => {
            assert_eq!(failure.product_name, "Integration Product");
            assert!(failure.product_url.ends_with(PRODUCT_PATH));
        }
        other => panic!("expected a failure report, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_price_is_reported_without_email_by_default() -> anyhow::Result<()> {
    let server = serve_page(200, "<html><head><title>Robot Check</title></head></html>").await;
    let settings = test_settings(&server, "50.00");
    let notifier = RecordingNotifier::new();

    let result = checker(&settings, &notifier).run().await;

    assert!(matches!(result, Err(AppError::PriceNotFound { .. })));
    assert!(notifier.events().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_email_failure_surfaces_as_send_failure() -> anyhow::Result<()> {
    let server = serve_page(200, product_page("$45.99")).await;
    let settings = test_settings(&server, "50.00");
    let notifier = RecordingNotifier::failing();

    let result = checker(&settings, &notifier).run().await;

    assert!(matches!(result, Err(AppError::EmailSendFailure(_))));
    assert_eq!(notifier.events().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_file_settings_overridden_by_env() -> anyhow::Result<()> {
    let server = serve_page(200, product_page("$45.99")).await;

    // The file points at a dead URL with a target that would never alert.
    let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
    write!(
        file,
        "{}",
        json!({
            "product": {
                "name": "From File",
                "url": "http://127.0.0.1:1/dp/never",
                "target_price": 1.00
            },
            "email": {
                "from_email": "file@example.com",
                "to_email": "file-recipient@example.com",
                "password": "file-password"
            },
            "scraper": { "request_delay_secs": 30 }
        })
    )?;

    let settings = Settings::from_sources(Some(file.path()), &test_env(&server, "50.00"))?;
    let notifier = RecordingNotifier::new();

    let outcome = checker(&settings, &notifier).run().await?;

    assert!(outcome.notification_sent);
    assert_eq!(settings.email.to_email, "recipient@example.com");
    assert_eq!(only_price_drop(&notifier.events()).product_name, "Integration Product");
    Ok(())
}
