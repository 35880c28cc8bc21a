use config::{Config, File, FileFormat};
use lettre::Address;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::utils::error::{AppError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_PRODUCT_NAME: &str = "Amazon Product";
pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
pub const DEFAULT_REQUEST_DELAY_SECS: u64 = 2;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Maps each config-file key to the environment variable that overrides it.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("product.name", "PRODUCT_NAME"),
    ("product.url", "PRODUCT_URL"),
    ("product.target_price", "TARGET_PRICE"),
    ("email.smtp_server", "SMTP_SERVER"),
    ("email.smtp_port", "SMTP_PORT"),
    ("email.from_email", "FROM_EMAIL"),
    ("email.to_email", "TO_EMAIL"),
    ("email.password", "EMAIL_PASSWORD"),
    ("notify_on_error", "NOTIFY_ON_ERROR"),
    ("scraper.user_agent", "USER_AGENT"),
    ("scraper.request_delay_secs", "REQUEST_DELAY_SECS"),
    ("scraper.request_timeout_secs", "REQUEST_TIMEOUT_SECS"),
    ("scraper.debug_mode", "DEBUG_MODE"),
    ("scraper.debug_dir", "DEBUG_DIR"),
];

/// Values passed through exactly as given; whitespace may be part of a credential.
const VERBATIM_KEYS: &[&str] = &["email.password"];

#[derive(Debug, Clone)]
pub struct Settings {
    pub product: ProductSettings,
    pub email: EmailSettings,
    pub scraper: ScraperSettings,
    pub notify_on_error: bool,
}

#[derive(Debug, Clone)]
pub struct ProductSettings {
    pub name: String,
    pub url: Url,
    pub target_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub from_email: String,
    pub to_email: String,
    pub password: SecretString,
}

#[derive(Debug, Clone)]
pub struct ScraperSettings {
    pub user_agent: String,
    pub request_delay: Duration,
    pub request_timeout: Duration,
    pub debug_mode: bool,
    pub debug_dir: PathBuf,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_delay: Duration::from_secs(DEFAULT_REQUEST_DELAY_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            debug_mode: false,
            debug_dir: PathBuf::from("."),
        }
    }
}

// Everything is optional here; required keys are enforced in `Settings::validate_raw`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    product: RawProduct,
    email: RawEmail,
    scraper: RawScraper,
    notify_on_error: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProduct {
    name: Option<String>,
    url: Option<String>,
    target_price: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEmail {
    smtp_server: Option<String>,
    smtp_port: Option<u16>,
    from_email: Option<String>,
    to_email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawScraper {
    user_agent: Option<String>,
    request_delay_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    debug_mode: Option<bool>,
    debug_dir: Option<String>,
}

impl Settings {
    /// Loads settings from the process environment and the JSON file named by
    /// `CONFIG_FILE` (default `config.json`). The file is optional.
    pub fn load() -> Result<Self> {
        let env: HashMap<String, String> = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        let path = non_empty(&env, "CONFIG_FILE")
            .map(|v| PathBuf::from(v.trim()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        Self::from_sources(Some(&path), &env)
    }

    /// Merges an optional JSON file with the given environment. For every
    /// recognised key a non-empty environment value wins over the file.
    pub fn from_sources(config_file: Option<&Path>, env: &HashMap<String, String>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).format(FileFormat::Json).required(false));
        }

        for (key, var) in ENV_OVERRIDES {
            let value = non_empty(env, var).map(|v| {
                if VERBATIM_KEYS.contains(key) {
                    v.to_string()
                } else {
                    v.trim().to_string()
                }
            });
            builder = builder.set_override_option(*key, value)?;
        }

        let raw: RawSettings = builder.build()?.try_deserialize()?;
        Self::validate_raw(raw)
    }

    fn validate_raw(raw: RawSettings) -> Result<Self> {
        let url = require(raw.product.url, "product.url", "PRODUCT_URL")?;
        let url = Url::parse(&url)
            .map_err(|e| AppError::InvalidConfiguration(format!("product URL '{}': {}", url, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(AppError::InvalidConfiguration(format!(
                "product URL must be http or https, got '{}'",
                url.scheme()
            )));
        }

        let target_price = require(raw.product.target_price, "product.target_price", "TARGET_PRICE")?;
        let target_price = Decimal::from_str(target_price.trim()).map_err(|_| {
            AppError::InvalidConfiguration(format!("target price '{}' is not a number", target_price))
        })?;
        if target_price.is_sign_negative() {
            return Err(AppError::InvalidConfiguration(
                "target price must not be negative".into(),
            ));
        }

        let smtp_port = raw.email.smtp_port.unwrap_or(DEFAULT_SMTP_PORT);
        if smtp_port == 0 {
            return Err(AppError::InvalidConfiguration(
                "SMTP port must be greater than 0".into(),
            ));
        }

        let from_email = require(raw.email.from_email, "email.from_email", "FROM_EMAIL")?;
        let to_email = require(raw.email.to_email, "email.to_email", "TO_EMAIL")?;
        let password = require(raw.email.password, "email.password", "EMAIL_PASSWORD")?;
        validate_address("sender", &from_email)?;
        validate_address("recipient", &to_email)?;

        let request_timeout_secs = raw
            .scraper
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if request_timeout_secs == 0 {
            return Err(AppError::InvalidConfiguration(
                "request timeout must be greater than 0".into(),
            ));
        }

        let scraper = ScraperSettings {
            user_agent: filled(raw.scraper.user_agent).unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            request_delay: Duration::from_secs(
                raw.scraper.request_delay_secs.unwrap_or(DEFAULT_REQUEST_DELAY_SECS),
            ),
            request_timeout: Duration::from_secs(request_timeout_secs),
            debug_mode: raw.scraper.debug_mode.unwrap_or(false),
            debug_dir: filled(raw.scraper.debug_dir)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        Ok(Settings {
            product: ProductSettings {
                name: filled(raw.product.name).unwrap_or_else(|| DEFAULT_PRODUCT_NAME.to_string()),
                url,
                target_price,
            },
            email: EmailSettings {
                smtp_server: filled(raw.email.smtp_server)
                    .unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string()),
                smtp_port,
                from_email,
                to_email,
                password: SecretString::new(password),
            },
            scraper,
            notify_on_error: raw.notify_on_error.unwrap_or(false),
        })
    }
}

fn non_empty<'a>(env: &'a HashMap<String, String>, var: &str) -> Option<&'a str> {
    env.get(var)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}

fn filled(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn require(value: Option<String>, key: &'static str, env_var: &'static str) -> Result<String> {
    filled(value).ok_or(AppError::MissingConfiguration { key, env_var })
}

fn validate_address(role: &str, address: &str) -> Result<()> {
    Address::from_str(address)
        .map(|_| ())
        .map_err(|e| AppError::InvalidConfiguration(format!("{} address '{}': {}", role, address, e)))
}
