//! Relay server configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the relay server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on. Zero asks the OS for a free port.
    pub port: u16,
    /// Base URL of the LibreTranslate-compatible service.
    pub translate_url: String,
    /// Language the teacher writes in.
    pub source_lang: String,
    /// Student language used until a teacher join declares one.
    pub default_student_lang: String,
    /// Translation request timeout in seconds.
    pub translate_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 0,
            translate_url: "https://libretranslate.com".to_owned(),
            source_lang: "ru".to_owned(),
            default_student_lang: "en".to_owned(),
            translate_timeout_secs: 5,
        }
    }
}

impl RelayConfig {
    /// The address string to bind the listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
