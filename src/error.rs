//! Error types and handling for the AQI dashboard

use thiserror::Error;

/// Why a call to the air quality provider failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    /// Connection refused, DNS failure, reset, ...
    Network,
    /// No response within the configured timeout
    Timeout,
    /// No API key has been entered yet
    MissingCredential,
    /// Expired or rejected API key
    Unauthorized,
    /// Provider throttled the request (HTTP 429)
    RateLimited,
    /// Body could not be decoded
    InvalidResponse,
    /// Any other non-success HTTP status
    Status(u16),
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderFailure::Network => write!(f, "network"),
            ProviderFailure::MissingCredential => write!(f, "missing credential"),
            ProviderFailure::Timeout => write!(f, "timeout"),
            ProviderFailure::Unauthorized => write!(f, "unauthorized"),
            ProviderFailure::RateLimited => write!(f, "rate limited"),
            ProviderFailure::InvalidResponse => write!(f, "invalid response"),
            ProviderFailure::Status(code) => write!(f, "HTTP {code}"),
        }
    }
}

/// Main error type for the dashboard
#[derive(Error, Debug)]
pub enum AqiError {
    /// The bundled city dataset is missing or malformed
    #[error("Data load error: {message}")]
    DataLoad { message: String },

    /// A ZIP code, coordinate pair or credential was malformed
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// The provider has no monitoring station near the location
    #[error("No data available for {location}")]
    NotFound { location: String },

    /// Transport, authentication or rate-limit failure talking to the provider
    #[error("Provider error ({kind}): {message}")]
    Provider {
        kind: ProviderFailure,
        message: String,
    },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Coarse classification used by the presenter and the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DataLoad,
    InvalidInput,
    NotFound,
    Provider,
    Config,
    Io,
}

impl AqiError {
    /// Create a new data load error
    pub fn data_load<S: Into<String>>(message: S) -> Self {
        Self::DataLoad {
            message: message.into(),
        }
    }

    /// Create a new invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new not found error
    pub fn not_found<S: Into<String>>(location: S) -> Self {
        Self::NotFound {
            location: location.into(),
        }
    }

    /// Create a new provider error
    pub fn provider<S: Into<String>>(kind: ProviderFailure, message: S) -> Self {
        Self::Provider {
            kind,
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            AqiError::DataLoad { .. } => ErrorKind::DataLoad,
            AqiError::InvalidInput { .. } => ErrorKind::InvalidInput,
            AqiError::NotFound { .. } => ErrorKind::NotFound,
            AqiError::Provider { .. } => ErrorKind::Provider,
            AqiError::Config { .. } => ErrorKind::Config,
            AqiError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Whether retrying the same request later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            AqiError::Provider { kind, .. } => !matches!(
                kind,
                ProviderFailure::Unauthorized | ProviderFailure::InvalidResponse
            ),
            _ => false,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            AqiError::DataLoad { .. } => {
                "The city dataset could not be loaded. Please check the catalog file.".to_string()
            }
            AqiError::InvalidInput { message } => format!("Invalid input: {message}"),
            AqiError::NotFound { location } => {
                format!("No data available for {location}.")
            }
            AqiError::Provider { kind, .. } => match kind {
                ProviderFailure::MissingCredential => {
                    "An AirNow API key is required. Enter one above, then retry.".to_string()
                }
                ProviderFailure::Unauthorized => {
                    "The AirNow API key was rejected. Please check your API key.".to_string()
                }
                ProviderFailure::RateLimited => {
                    "The AirNow API rate limit was reached. Please retry in a minute.".to_string()
                }
                ProviderFailure::Timeout => {
                    "The AirNow API did not respond in time. Please retry.".to_string()
                }
                _ => "Unable to reach the AirNow API. Please retry.".to_string(),
            },
            AqiError::Config { .. } => {
                "Configuration error. Please check your config file and API key.".to_string()
            }
            AqiError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
