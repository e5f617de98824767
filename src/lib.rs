pub mod advisory;
pub mod catalogue;
pub mod commands;
pub mod config;
pub mod errors;
pub mod guidance;
pub mod llm;
pub mod session;

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::advisory::service::LlmAdvisory;
use crate::config::AppConfig;
use crate::errors::{GuideError, GuideResult};
use crate::guidance::engine::GuideEngine;
use crate::llm::registry::ProviderRegistry;
use crate::session::store::InMemorySessionStore;

/// Serve JSON-lines requests from stdin until EOF. Logs go to stderr so stdout
/// carries responses only.
pub async fn run() -> GuideResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let config = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config; using built-in defaults");
            AppConfig::default()
        }
    };

    let registry = Arc::new(ProviderRegistry::from_config(&config));
    let engine = GuideEngine::from_config(
        &config,
        Arc::new(LlmAdvisory::new(registry)),
        Arc::new(InMemorySessionStore::new()),
    )?;

    serve(&engine, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    tracing::info!("stdin closed, shutting down");
    Ok(())
}

/// Answer one envelope per request line until EOF.
///
/// A line that is not UTF-8 is answered with a validation error; only a
/// failing reader or writer ends the loop early.
pub async fn serve<R, W>(engine: &GuideEngine, mut reader: R, mut writer: W) -> GuideResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let reply = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => commands::handle_line(engine, line).await,
            Err(e) => commands::error_reply(&GuideError::Validation(format!(
                "request is not valid UTF-8: {e}"
            ))),
        };
        let mut out = serde_json::to_vec(&reply)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
    }
}
