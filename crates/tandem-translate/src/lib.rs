//! # tandem-translate
//!
//! Translation gateway for the lesson relay.
//!
//! The relay never blocks chat delivery on a broken translation service:
//! [`translate_or_fallback`] always yields a string, degrading to a
//! deterministically tagged copy of the original text on any failure.

#![deny(unsafe_code)]

pub mod libre;

use async_trait::async_trait;
use tracing::warn;

pub use libre::LibreTranslate;

/// Prefix attached to the original text when translation fails.
pub const FALLBACK_TAG: &str = "[translation failed]";

/// Error from the translation service.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// Network failure or request timeout.
    #[error("translation request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from the service.
    #[error("translation service returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Response body did not contain a `translatedText` string.
    #[error("translation response was malformed")]
    MalformedResponse,
}

/// A service that translates text between two languages.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source` to `target` (ISO language codes).
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError>;
}

/// Translate, degrading to a tagged copy of the original on failure.
///
/// This is the only entry point the relay uses: chat delivery proceeds
/// whether or not the external service is reachable.
pub async fn translate_or_fallback(
    translator: &dyn Translator,
    text: &str,
    source: &str,
    target: &str,
) -> String {
    match translator.translate(text, source, target).await {
        Ok(translated) => translated,
        Err(e) => {
            warn!(source, target, error = %e, "translation failed, using fallback");
            format!("{FALLBACK_TAG} {text}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTranslator;

    #[async_trait]
    impl Translator for EchoTranslator {
        async fn translate(
            &self,
            text: &str,
            _source: &str,
            target: &str,
        ) -> Result<String, TranslateError> {
            Ok(format!("{text} ({target})"))
        }
    }

    struct FailingTranslator;

    #[async_trait]
    impl Translator for FailingTranslator {
        async fn translate(
            &self,
            _text: &str,
            _source: &str,
            _target: &str,
        ) -> Result<String, TranslateError> {
            Err(TranslateError::Status { status: 503 })
        }
    }

    #[tokio::test]
    async fn fallback_passes_through_success() {
        let out = translate_or_fallback(&EchoTranslator, "привет", "ru", "en").await;
        assert_eq!(out, "привет (en)");
    }

    #[tokio::test]
    async fn fallback_tags_original_on_failure() {
        let out = translate_or_fallback(&FailingTranslator, "привет", "ru", "en").await;
        assert_eq!(out, "[translation failed] привет");
    }

    #[tokio::test]
    async fn fallback_is_deterministic() {
        let a = translate_or_fallback(&FailingTranslator, "x", "ru", "en").await;
        let b = translate_or_fallback(&FailingTranslator, "x", "ru", "en").await;
        assert_eq!(a, b);
    }

    #[test]
    fn error_display_includes_status() {
        let err = TranslateError::Status { status: 429 };
        assert!(err.to_string().contains("429"));
    }
}
