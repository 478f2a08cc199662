pub mod abilities;
pub mod config;
pub mod engine;
pub mod haste;
pub mod identity;
pub mod links;
pub mod opportunity;
pub mod parser;
pub mod procs;
pub mod replay;
pub mod report;
pub mod rules;
pub mod specs;
pub mod state;

use anyhow::Result;
use std::path::Path;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Install the tracing subscriber and panic hook.
///
/// With a log directory, output goes to a daily rolling `window-review.log`
/// (no ANSI colour codes); otherwise to stderr. `RUST_LOG` is honoured on top
/// of the crate's default debug directive. The returned guard flushes the
/// file writer on drop, so keep it alive for the life of the process.
pub fn init_logging(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("combat_ledger_window_review=debug".parse()?);

    let guard = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, "window-review.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Logging init error: {}", e))?;
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Logging init error: {}", e))?;
            None
        }
    };

    // Route panics through tracing so they land in the log file too.
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());
        let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        tracing::error!("PANIC at {}: {}", location, message);
    }));

    Ok(guard)
}

// ---------------------------------------------------------------------------
// Replay pipeline
// ---------------------------------------------------------------------------

/// Replay one combat log through reader → parser → engine and return the report.
pub async fn review(cfg: &config::AppConfig) -> Result<report::AnalysisReport> {
    let log_file = config::resolve_log_file(&cfg.log_path)?;
    let profile = specs::resolve(&cfg.profile, cfg.profile_path.as_deref())?;
    let identity = identity::PlayerIdentity::new(cfg.player_guid.clone(), cfg.player_name.clone());

    tracing::info!(
        "Reviewing {} ({:?} build, haste {:.1}%) from {}",
        profile.key(),
        cfg.activation,
        cfg.haste * 100.0,
        log_file.display()
    );

    let (raw_tx, raw_rx)     = mpsc::channel::<String>(2048);
    let (event_tx, event_rx) = mpsc::channel::<parser::LogEvent>(1024);

    let line_parser = parser::LineParser::new(profile.off_gcd.clone());
    let analyzer = engine::Analyzer::new(profile, cfg.activation, identity);

    let reader = tokio::spawn(replay::read_lines(log_file, raw_tx));
    let parsing = tokio::spawn(parser::run(raw_rx, event_tx, line_parser));
    let report = engine::run(event_rx, analyzer, cfg.haste).await?;

    reader
        .await
        .map_err(|e| anyhow::anyhow!("Reader task error: {}", e))??;
    parsing
        .await
        .map_err(|e| anyhow::anyhow!("Parser task error: {}", e))??;

    Ok(report)
}
