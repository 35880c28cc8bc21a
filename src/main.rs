use anyhow::Result;
use price_sentinel::config::Settings;
use price_sentinel::plugins::notifiers::EmailNotifier;
use price_sentinel::PriceChecker;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    let _guard = init_tracing()?;

    info!("Starting Price Sentinel...");

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Error: {}", e);
            return Ok(());
        }
    };

    let notifier = EmailNotifier::new(settings.email.clone());
    let checker = match PriceChecker::new(&settings, Box::new(notifier)) {
        Ok(checker) => checker,
        Err(e) => {
            error!("Error: {}", e);
            return Ok(());
        }
    };

    // Failures are already logged by the checker; cron runs us again later.
    if let Ok(outcome) = checker.run().await {
        info!(
            "Check complete (selector: {}, notification sent: {})",
            outcome.reading.selector, outcome.notification_sent
        );
    }

    Ok(())
}

/// Logs to stdout, plus a daily-rolling file when `LOG_DIR` is set.
fn init_tracing() -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("price_sentinel=info"))?;

    let (file_layer, guard) = match std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "price-sentinel.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
