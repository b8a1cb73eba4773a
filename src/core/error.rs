use std::io;
use thiserror::Error;

/// Unified error type for the vtai application
#[derive(Error, Debug)]
pub enum VtaiError {
    /// Provider API errors (non-success status, malformed payloads)
    #[error("API error: {0}")]
    Api(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// User input errors
    #[error("Input error: {0}")]
    Input(String),

    /// Rejected settings update
    #[error("Invalid setting: {0}")]
    Settings(String),

    /// Route classification errors
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(String),
}

impl VtaiError {
    /// Short name of the error variant, shown to the user when a turn fails.
    pub fn kind(&self) -> &'static str {
        match self {
            VtaiError::Api(_) => "ApiError",
            VtaiError::Config(_) => "ConfigError",
            VtaiError::Input(_) => "InputError",
            VtaiError::Settings(_) => "SettingsError",
            VtaiError::Classifier(_) => "ClassifierError",
            VtaiError::Io { .. } => "IoError",
            VtaiError::Serialization(_) => "SerializationError",
            VtaiError::Network(_) => "NetworkError",
        }
    }

    /// Whether a provider client may retry the request that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VtaiError::Network(_))
    }
}

impl From<reqwest::Error> for VtaiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            VtaiError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            VtaiError::Network(format!("Connection failed: {}", err))
        } else if err.is_status() {
            VtaiError::Api(format!("API returned error status: {}", err))
        } else {
            VtaiError::Network(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for VtaiError {
    fn from(err: serde_json::Error) -> Self {
        VtaiError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yml::Error> for VtaiError {
    fn from(err: serde_yml::Error) -> Self {
        VtaiError::Serialization(format!("YAML error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_variant() {
        assert_eq!(VtaiError::Api("x".into()).kind(), "ApiError");
        let io_err: VtaiError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert_eq!(io_err.kind(), "IoError");
    }

    #[test]
    fn test_only_network_errors_retry() {
        assert!(VtaiError::Network("reset".into()).is_retryable());
        assert!(!VtaiError::Api("400".into()).is_retryable());
    }
}
