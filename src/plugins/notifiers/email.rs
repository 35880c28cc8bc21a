use crate::config::EmailSettings;
use crate::plugins::trackers::price::format_price;
use crate::plugins::traits::{CheckFailure, NotificationEvent, Notifier, PriceDropAlert};
use crate::utils::error::Result;
use async_trait::async_trait;
use lettre::message::{header, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, info};

pub const FROM_NAME: &str = "Price Sentinel";

/// Port that speaks TLS from the first byte; every other port upgrades with STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    ImplicitTls,
    StartTls,
}

impl SmtpSecurity {
    pub fn for_port(port: u16) -> Self {
        if port == IMPLICIT_TLS_PORT {
            SmtpSecurity::ImplicitTls
        } else {
            SmtpSecurity::StartTls
        }
    }
}
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct EmailNotifier {
    config: EmailSettings,
}

impl EmailNotifier {
    pub fn new(config: EmailSettings) -> Self {
        EmailNotifier { config }
    }

    pub fn format_subject(&self, event: &NotificationEvent) -> String {
        match event {
            NotificationEvent::PriceDrop(alert) => format!(
                "Price Alert: {} - Now {}!",
                alert.product_name,
                format_price(&alert.currency, alert.current_price)
            ),
            NotificationEvent::CheckFailed(failure) => {
                format!("Price Check Failed - {}", failure.product_name)
            }
        }
    }

    pub fn format_html_body(&self, event: &NotificationEvent) -> String {
        match event {
            NotificationEvent::PriceDrop(alert) => price_drop_html(alert),
            NotificationEvent::CheckFailed(failure) => check_failed_html(failure),
        }
    }

    pub fn format_text_body(&self, event: &NotificationEvent) -> String {
        let mut text = String::new();

        match event {
            NotificationEvent::PriceDrop(alert) => {
                text.push_str("PRICE DROP ALERT\n\n");
                text.push_str(&format!("{} is now available at your target price!\n\n", alert.product_name));
                text.push_str(&format!("Current Price: {}\n", format_price(&alert.currency, alert.current_price)));
                text.push_str(&format!("Target Price: {}\n", format_price(&alert.currency, alert.target_price)));
                text.push_str(&format!("Savings: {}\n\n", format_price(&alert.currency, alert.savings())));
                text.push_str(&format!("View product: {}\n", alert.product_url));
                text.push_str(&format!("Checked at: {}\n", alert.checked_at.format(TIME_FORMAT)));
            }
            NotificationEvent::CheckFailed(failure) => {
                text.push_str("PRICE CHECK FAILED\n\n");
                text.push_str(&format!("Product: {}\n", failure.product_name));
                text.push_str(&format!("URL: {}\n", failure.product_url));
                text.push_str(&format!("Error: {}\n", failure.error));
                text.push_str(&format!("Time: {}\n", failure.checked_at.format(TIME_FORMAT)));
            }
        }

        text
    }

    /// Builds the alert from the configured sender to the configured recipient.
    pub fn build_message(&self, event: &NotificationEvent) -> Result<Message> {
        let from = Mailbox::new(Some(FROM_NAME.to_string()), self.config.from_email.parse::<Address>()?);
        let to = Mailbox::new(None, self.config.to_email.parse::<Address>()?);

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(self.format_subject(event))
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(self.format_text_body(event)),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(self.format_html_body(event)),
                    ),
            )?;

        Ok(message)
    }

    pub fn security(&self) -> SmtpSecurity {
        SmtpSecurity::for_port(self.config.smtp_port)
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = match self.security() {
            SmtpSecurity::ImplicitTls => AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_server)?,
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_server)?
            }
        };

        // The sender address doubles as the SMTP login.
        let credentials = Credentials::new(
            self.config.from_email.clone(),
            self.config.password.expose_secret().to_string(),
        );

        Ok(builder
            .port(self.config.smtp_port)
            .credentials(credentials)
            .timeout(Some(SMTP_TIMEOUT))
            .build())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<()> {
        let message = self.build_message(event)?;
        let mailer = self.transport()?;

        debug!(
            "Connecting to {}:{} for '{}'",
            self.config.smtp_server,
            self.config.smtp_port,
            event.product_name()
        );
        mailer.send(message).await?;

        info!("Email sent successfully to {}", self.config.to_email);
        Ok(())
    }
}

fn price_drop_html(alert: &PriceDropAlert) -> String {
    let name = escape_html(&alert.product_name);
    let url = escape_html(&alert.product_url);

    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif;">
    <h2 style="color: #28a745;">Price Drop Alert!</h2>
    <p><strong>{name}</strong> is now available at your target price!</p>
    <table style="border-collapse: collapse; margin: 20px 0;">
        <tr>
            <td style="padding: 8px; border: 1px solid #ddd;"><strong>Current Price:</strong></td>
            <td style="padding: 8px; border: 1px solid #ddd; color: #28a745; font-size: 18px;"><strong>{current}</strong></td>
        </tr>
        <tr>
            <td style="padding: 8px; border: 1px solid #ddd;"><strong>Target Price:</strong></td>
            <td style="padding: 8px; border: 1px solid #ddd;">{target}</td>
        </tr>
        <tr>
            <td style="padding: 8px; border: 1px solid #ddd;"><strong>Savings:</strong></td>
            <td style="padding: 8px; border: 1px solid #ddd;">{savings}</td>
        </tr>
    </table>
    <p><a href="{url}" style="background-color: #ff9900; color: white; padding: 10px 20px; text-decoration: none; border-radius: 3px; display: inline-block;">View Product</a></p>
    <p style="color: #666; font-size: 12px;">Checked at: {checked_at}</p>
</body>
</html>
"#,
        current = format_price(&alert.currency, alert.current_price),
        target = format_price(&alert.currency, alert.target_price),
        savings = format_price(&alert.currency, alert.savings()),
        checked_at = alert.checked_at.format(TIME_FORMAT),
    )
}

fn check_failed_html(failure: &CheckFailure) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif;">
    <p>Failed to check price for <strong>{name}</strong></p>
    <p>URL: {url}</p>
    <p>Error: {error}</p>
    <p>Time: {time}</p>
</body>
</html>
"#,
        name = escape_html(&failure.product_name),
        url = escape_html(&failure.product_url),
        error = escape_html(&failure.error),
        time = failure.checked_at.format(TIME_FORMAT),
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
