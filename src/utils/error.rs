use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {key} (set {env_var} or add it to the config file)")]
    MissingConfiguration {
        key: &'static str,
        env_var: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Blocked by remote (HTTP {status}): {indicator}")]
    BlockedByRemote { status: u16, indicator: String },

    #[error("HTTP error: status {status}")]
    HttpStatus { status: u16 },

    #[error("Price not found: {reason}")]
    PriceNotFound { reason: String },

    #[error("Email send failure: {0}")]
    EmailSendFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub(crate) fn price_not_found(reason: impl Into<String>) -> Self {
        AppError::PriceNotFound {
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<lettre::error::Error> for AppError {
    fn from(err: lettre::error::Error) -> Self {
        AppError::EmailSendFailure(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for AppError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        AppError::EmailSendFailure(err.to_string())
    }
}

impl From<lettre::address::AddressError> for AppError {
    fn from(err: lettre::address::AddressError) -> Self {
        AppError::EmailSendFailure(format!("invalid address: {}", err))
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
