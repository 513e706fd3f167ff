//! Renderer error types
//!
//! Nothing inside a frame returns an error; degraded lights and passes fall
//! back to sentinels. Errors only surface when loading or checking settings.

use thiserror::Error;

/// Errors produced while loading or checking pipeline settings
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for renderer configuration operations
pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = RenderError::Config("max_distance is NaN".into());
        assert_eq!(err.to_string(), "Configuration error: max_distance is NaN");
    }

    #[test]
    fn test_parse_error_conversion() {
        let parse = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: RenderError = parse.into();
        assert!(matches!(err, RenderError::Parse(_)));
    }
}
