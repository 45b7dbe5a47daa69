//! Error types and result aliases for the Lantern library.
//!
//! This module defines the core error type [`LanternError`] and the [`Result`] type alias
//! used throughout the library. All public APIs that can fail return `Result<T>` for
//! consistent error handling. Flush failures have their own type, see
//! [`FlushError`](crate::tracer::FlushError).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LanternError {
    #[error("LLM gateway error: {0}")]
    GatewayError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Ingestion rejected with status {status}: {body}")]
    IngestionError { status: u16, body: String },

    #[error("Template error: {0}")]
    TemplateError(String),
}

pub type Result<T> = std::result::Result<T, LanternError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_display() {
        let err = LanternError::GatewayError("connection failed".to_string());
        assert_eq!(err.to_string(), "LLM gateway error: connection failed");
    }

    #[test]
    fn test_api_error_display() {
        let err = LanternError::ApiError("rate limit exceeded".to_string());
        assert_eq!(err.to_string(), "API error: rate limit exceeded");
    }

    #[test]
    fn test_config_error_display() {
        let err = LanternError::ConfigError("missing LANGFUSE_SECRET_KEY".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: missing LANGFUSE_SECRET_KEY");
    }

    #[test]
    fn test_ingestion_error_display() {
        let err = LanternError::IngestionError {
            status: 401,
            body: "invalid credentials".to_string(),
        };
        assert_eq!(err.to_string(), "Ingestion rejected with status 401: invalid credentials");
    }

    #[test]
    fn test_template_error_display() {
        let err = LanternError::TemplateError("missing variable: text".to_string());
        assert_eq!(err.to_string(), "Template error: missing variable: text");
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: LanternError = json_err.into();

        match err {
            LanternError::SerializationError(_) => {}
            _ => panic!("Expected SerializationError"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LanternError = io_err.into();

        match err {
            LanternError::IoError(_) => {}
            _ => panic!("Expected IoError"),
        }
    }

    #[test]
    fn test_error_debug() {
        let err = LanternError::TemplateError("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("TemplateError"));
    }
}
