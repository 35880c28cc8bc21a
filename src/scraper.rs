use chrono::Local;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::ScraperSettings;
use crate::utils::error::{AppError, Result};

/// Body fragments that only appear on bot-detection pages.
pub const CAPTCHA_MARKERS: &[&str] = &[
    "api-services-support@amazon.com",
    "Enter the characters you see below",
    "/errors/validateCaptcha",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Ok,
    Blocked { indicator: String },
    HttpError,
    NetworkError { message: String },
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: FetchStatus,
    pub body: Option<String>,
    pub status_code: Option<u16>,
    pub debug_artifact: Option<PathBuf>,
}

impl FetchResult {
    pub fn is_ok(&self) -> bool {
        self.status == FetchStatus::Ok
    }

    /// Returns the page body, or the error matching the classification.
    pub fn into_body(self) -> Result<String> {
        let status = self.status_code.unwrap_or_default();
        match self.status {
            FetchStatus::Ok => Ok(self.body.unwrap_or_default()),
            FetchStatus::Blocked { indicator } => Err(AppError::BlockedByRemote { status, indicator }),
            FetchStatus::HttpError => Err(AppError::HttpStatus { status }),
            FetchStatus::NetworkError { message } => Err(AppError::Network(message)),
        }
    }
}

/// Classifies a response. Blocking indicators take precedence over the status code.
pub fn classify(status: StatusCode, body: &str) -> FetchStatus {
    if let Some(marker) = CAPTCHA_MARKERS.iter().find(|m| body.contains(**m)) {
        return FetchStatus::Blocked {
            indicator: format!("CAPTCHA marker '{}' in response body", marker),
        };
    }

    if status == StatusCode::SERVICE_UNAVAILABLE {
        return FetchStatus::Blocked {
            indicator: "HTTP 503 Service Unavailable".to_string(),
        };
    }

    if status.is_success() {
        FetchStatus::Ok
    } else {
        FetchStatus::HttpError
    }
}

/// Browser-like request headers with the configured User-Agent.
pub fn browser_headers(user_agent: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let user_agent = HeaderValue::from_str(user_agent)
        .map_err(|e| AppError::InvalidConfiguration(format!("user agent: {}", e)))?;

    headers.insert(header::USER_AGENT, user_agent);
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
        ),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));

    Ok(headers)
}

pub struct WebScraper {
    client: Client,
    config: ScraperSettings,
}

impl WebScraper {
    pub fn new(config: ScraperSettings) -> Result<Self> {
        // Accept-Encoding is negotiated by reqwest from the enabled decoders.
        let client = Client::builder()
            .default_headers(browser_headers(&config.user_agent)?)
            .timeout(config.request_timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        Ok(Self { client, config })
    }

    /// Waits the politeness delay, then performs a single GET. Never retries.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }

        info!("Fetching URL: {}", url);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return network_error(None, &e),
        };

        let status = response.status();
        info!("Response status code: {}", status.as_u16());

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return network_error(Some(status.as_u16()), &e),
        };

        let debug_artifact = if self.config.debug_mode {
            self.save_debug_artifact(&body)
        } else {
            None
        };

        let status_class = classify(status, &body);
        if let FetchStatus::Blocked { indicator } = &status_class {
            warn!("Remote is blocking this request: {}", indicator);
            warn!("Try the following:");
            warn!("  1. Wait a few hours before trying again");
            warn!("  2. Use a VPN to change your IP address");
            warn!("  3. Try accessing the URL manually in a browser first");
        }

        FetchResult {
            status: status_class,
            body: Some(body),
            status_code: Some(status.as_u16()),
            debug_artifact,
        }
    }

    fn save_debug_artifact(&self, body: &str) -> Option<PathBuf> {
        match write_debug_artifact(&self.config.debug_dir, body) {
            Ok(path) => {
                info!("Debug: saved HTML response to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Debug: failed to save HTML response: {}", e);
                None
            }
        }
    }
}

fn network_error(status_code: Option<u16>, err: &reqwest::Error) -> FetchResult {
    warn!("Error fetching URL: {}", err);
    FetchResult {
        status: FetchStatus::NetworkError {
            message: err.to_string(),
        },
        body: None,
        status_code,
        debug_artifact: None,
    }
}

/// Writes the raw body to `debug_response_YYYYmmdd_HHMMSS.html` under `dir`.
pub fn write_debug_artifact(dir: &Path, body: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let file_name = format!("debug_response_{}.html", Local::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(file_name);
    std::fs::write(&path, body)?;
    Ok(path)
}
