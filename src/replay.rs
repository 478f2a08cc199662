/// Streams a finished WoWCombatLog.txt into the pipeline, line by line.
///
/// File reading is blocking, so it runs on tokio's blocking pool and hands
/// lines over with `blocking_send`. The channel closing is the end-of-stream
/// signal for the parser and engine downstream.
use anyhow::Result;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::Sender;

/// Send every non-empty line of `path`. Returns the number of lines sent.
fn send_lines(path: &Path, tx: &Sender<String>) -> Result<u64> {
    let file = File::open(path)
        .map_err(|e| anyhow::anyhow!("Cannot open combat log {}: {}", path.display(), e))?;

    let mut sent = 0u64;
    for line in BufReader::new(file).lines() {
        match line {
            Ok(l) if !l.trim().is_empty() => {
                if tx.blocking_send(l).is_err() {
                    break; // receiver gone, pipeline shutting down
                }
                sent += 1;
            }
            Ok(_) => {}
            Err(e) => {
                // Non-UTF-8 or truncated tail; keep what we have.
                tracing::warn!("Replay read error after {} lines: {}", sent, e);
                break;
            }
        }
    }
    Ok(sent)
}

pub async fn read_lines(path: PathBuf, tx: Sender<String>) -> Result<u64> {
    tracing::info!("Replay starting: {:?}", path);
    let sent = tokio::task::spawn_blocking(move || send_lines(&path, &tx))
        .await
        .map_err(|e| anyhow::anyhow!("Replay task error: {}", e))??;
    tracing::info!("Replay finished: {} lines", sent);
    Ok(sent)
}
