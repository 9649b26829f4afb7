//! Error taxonomy for the translation pipeline.
//!
//! Every failure that can reach a caller is one of these variants. The type is
//! `Clone` because a single settled engine load is handed to every caller that
//! was waiting on it.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// Malformed caller input (empty text, unusable language code, ...).
    #[error("Invalid request: {0}")]
    Validation(String),

    /// No registry entry, or the artifacts for a registered pair are unreadable.
    #[error("Model '{key}' is not available: {reason}")]
    ModelNotAvailable { key: String, reason: String },

    /// Neither a direct pair nor a pivot through the hub language exists.
    #[error("No translation route from '{from}' to '{to}'")]
    RouteNotFound { from: String, to: String },

    #[error("Failed to initialize engine for '{key}': {reason}")]
    EngineInit { key: String, reason: String },

    #[error("Engine initialization for '{key}' timed out after {timeout:?}")]
    EngineInitTimeout { key: String, timeout: Duration },

    /// A translate call failed on an engine that is already resident.
    #[error("Engine '{key}' failed to translate: {reason}")]
    EngineRuntime { key: String, reason: String },
}

impl TranslateError {
    pub fn model_not_available(key: impl Into<String>, reason: impl Into<String>) -> Self {
        TranslateError::ModelNotAvailable {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = TranslateError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = TranslateError::RouteNotFound {
            from: "zh".to_string(),
            to: "ja".to_string(),
        };
        assert_eq!(err.to_string(), "No translation route from 'zh' to 'ja'");

        let err = TranslateError::model_not_available("en-de", "missing lexicon");
        assert!(err.to_string().contains("en-de"));
        assert!(err.to_string().contains("missing lexicon"));

        let err = TranslateError::EngineInitTimeout {
            key: "en-de".to_string(),
            timeout: Duration::from_secs(45),
        };
        assert!(err.to_string().contains("45s"));
    }

    #[test]
    fn test_clone_preserves_equality() {
        let err = TranslateError::EngineRuntime {
            key: "en-de".to_string(),
            reason: "bad input".to_string(),
        };
        assert_eq!(err.clone(), err);
    }
}
