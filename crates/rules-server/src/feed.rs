//! Signal values from stdin
//!
//! Each line is `entity_id=value`, e.g. `sensor.pillanatnyi_aramerosseg_l1=17.4`.
//! Blank lines and lines starting with `#` are ignored.

use rules_core::{SignalId, SignalIdError, SignalValue};
use rules_host::SignalStore;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

#[derive(Debug, PartialEq)]
pub enum FeedLine {
    Skip,
    Set(SignalId, SignalValue),
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum FeedError {
    #[error("expected entity_id=value")]
    MissingSeparator,

    #[error(transparent)]
    InvalidSignal(#[from] SignalIdError),
}

pub fn parse_line(line: &str) -> Result<FeedLine, FeedError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(FeedLine::Skip);
    }
    let (signal, value) = line.split_once('=').ok_or(FeedError::MissingSeparator)?;
    let signal: SignalId = signal.trim().parse()?;
    Ok(FeedLine::Set(signal, SignalValue::parse(value.trim())))
}

/// Write every parsed line into the store until the reader is exhausted
pub async fn feed<R>(reader: R, store: Arc<SignalStore>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_line(&line) {
                Ok(FeedLine::Set(signal, value)) => {
                    store.set(signal, value);
                }
                Ok(FeedLine::Skip) => {}
                Err(error) => warn!(line = %line, %error, "Ignoring input line"),
            },
            Ok(None) => break,
            Err(error) => {
                warn!(%error, "Failed to read input");
                break;
            }
        }
    }
    info!("Input closed");
}
