//! Relay server entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tandem_relay::config::RelayConfig;
use tandem_relay::server::RelayServer;
use tandem_translate::libre::LibreTranslate;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tandem", about = "Real-time lesson relay server", version)]
struct Cli {
    /// Address to bind to.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Base URL of the LibreTranslate-compatible service.
    #[arg(long, env = "TRANSLATE_URL", default_value = "https://libretranslate.com")]
    translate_url: String,

    /// Language the teacher writes in.
    #[arg(long, default_value = "ru")]
    source_lang: String,

    /// Student language used until a teacher join declares one.
    #[arg(long, default_value = "en")]
    default_student_lang: String,

    /// Translation request timeout in seconds.
    #[arg(long, default_value_t = 5)]
    translate_timeout: u64,
}

impl Cli {
    fn into_config(self) -> RelayConfig {
        RelayConfig {
            host: self.host,
            port: self.port,
            translate_url: self.translate_url,
            source_lang: self.source_lang,
            default_student_lang: self.default_student_lang,
            translate_timeout_secs: self.translate_timeout,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config();
    let translator = Arc::new(LibreTranslate::with_timeout(
        config.translate_url.clone(),
        Duration::from_secs(config.translate_timeout_secs),
    ));

    let server = RelayServer::new(config, translator);
    let (addr, handle) = server
        .listen()
        .await
        .context("failed to bind listen address")?;
    info!(%addr, "tandem relay started");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("ctrl-c received, shutting down");
    server.shutdown();

    handle
        .await
        .context("server task panicked")?
        .context("server error")?;
    Ok(())
}
