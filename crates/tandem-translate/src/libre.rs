//! LibreTranslate-compatible HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{TranslateError, Translator};

/// Default request timeout; translation is interactive so anything slower
/// degrades to the fallback rather than stalling chat.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a `LibreTranslate`-compatible `/translate` endpoint.
pub struct LibreTranslate {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

impl LibreTranslate {
    /// Create a client for the given base URL (no trailing slash needed).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        // Building with only a timeout set cannot fail.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("default client with timeout");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl Translator for LibreTranslate {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError> {
        let body = serde_json::json!({
            "q": text,
            "source": source,
            "target": target,
            "format": "text",
        });

        let response = self
            .client
            .post(format!("{}/translate", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Status {
                status: status.as_u16(),
            });
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|_| TranslateError::MalformedResponse)?;

        // The public instance occasionally returns an empty translation;
        // treat that the same as "nothing to do" and echo the original.
        match parsed.translated_text {
            Some(t) if !t.is_empty() => {
                debug!(source, target, "translated {} chars", text.chars().count());
                Ok(t)
            }
            _ => Ok(text.to_owned()),
        }
    }
}
