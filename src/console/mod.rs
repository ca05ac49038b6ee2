//! Operator console: line-oriented commands that mutate the zone store.
//!
//! Commands are matched exactly against the trimmed line:
//! - `flushstale` / `flush`: drop all stale records
//! - `flushrecord`: prompt, then read `<domain> <TYPE>` from the next line and
//!   move matching live records to stale
//! - `reload`: fetch zone data again and replace the live table
//!
//! Anything else is ignored.

use crate::dns::wire::RecordType;
use crate::zone::{ingest, FlushOutcome, ZoneKey, ZoneSource, ZoneStore};
use std::io::{self, BufRead};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const CMD_FLUSH: &str = "flush";
const CMD_FLUSH_STALE: &str = "flushstale";
const CMD_FLUSH_RECORD: &str = "flushrecord";
const CMD_RELOAD: &str = "reload";

/// A fully parsed operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    FlushAllStale,
    /// `domain` is the name as typed; `key` is the zone the flush applies to
    FlushRecord {
        domain: String,
        key: ZoneKey,
        rtype: RecordType,
    },
    Reload,
}

/// What one input line produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Command(Command),
    /// `flushrecord` seen; the next line is its argument
    Prompt,
    /// The `flushrecord` argument line was unusable
    Rejected(String),
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ParserState {
    #[default]
    Idle,
    AwaitingRecord,
}

/// Line-at-a-time command parser
#[derive(Debug, Default)]
pub struct CommandParser {
    state: ParserState,
}

impl CommandParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_awaiting_record(&self) -> bool {
        self.state == ParserState::AwaitingRecord
    }

    pub fn feed(&mut self, line: &str) -> ParseOutcome {
        let line = line.trim();

        match self.state {
            ParserState::AwaitingRecord => {
                self.state = ParserState::Idle;
                match parse_record_argument(line) {
                    Ok(command) => ParseOutcome::Command(command),
                    Err(reason) => ParseOutcome::Rejected(reason),
                }
            }
            ParserState::Idle => match line {
                CMD_FLUSH | CMD_FLUSH_STALE => ParseOutcome::Command(Command::FlushAllStale),
                CMD_FLUSH_RECORD => {
                    self.state = ParserState::AwaitingRecord;
                    ParseOutcome::Prompt
                }
                CMD_RELOAD => ParseOutcome::Command(Command::Reload),
                _ => ParseOutcome::Ignored,
            },
        }
    }
}

/// Parse `<domain> <TYPE>`; extra tokens are ignored
fn parse_record_argument(line: &str) -> Result<Command, String> {
    let mut tokens = line.split_whitespace();
    let (Some(domain), Some(rtype)) = (tokens.next(), tokens.next()) else {
        return Err("expected '<domain> <TYPE>' (e.g. example.com A)".to_string());
    };

    let key = ZoneKey::from_name(domain)
        .ok_or_else(|| format!("domain {:?} needs at least two labels", domain))?;

    let rtype = rtype
        .parse::<RecordType>()
        .map_err(|_| format!("unknown record type {:?}", rtype))?;

    Ok(Command::FlushRecord {
        domain: domain.to_string(),
        key,
        rtype,
    })
}

/// Apply one command to the store
pub async fn execute<S: ZoneSource>(command: Command, store: &ZoneStore, source: &S) {
    match command {
        Command::FlushAllStale => {
            let removed = store.flush_all_stale();
            info!(removed, "Stale data flushed");
        }
        Command::FlushRecord { domain, key, rtype } => match store.flush_record_type(&key, rtype) {
            FlushOutcome::NoRecords => {
                warn!(domain = %domain, zone = %key, "No records found for domain");
            }
            FlushOutcome::Moved { moved, remaining } => {
                info!(
                    domain = %domain,
                    zone = %key,
                    rtype = %rtype,
                    moved,
                    remaining,
                    "Records moved to stale data"
                );
            }
        },
        Command::Reload => match ingest(source, store).await {
            Ok(summary) => {
                info!(
                    records = summary.accepted,
                    zones = summary.zones,
                    "Zone data reloaded"
                );
            }
            Err(e) => {
                warn!(error = %e, "Zone reload failed; keeping current data");
            }
        },
    }
}

/// Forward stdin lines over a channel from a dedicated thread.
///
/// A blocking read on a plain thread never holds up runtime shutdown; the
/// channel closes at EOF or on a read error.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);

    let spawned = std::thread::Builder::new()
        .name("console-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "Console read failed");
                        break;
                    }
                };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });

    if let Err(e) = spawned {
        warn!(error = %e, "Failed to start console reader");
    }

    rx
}

/// Apply commands from `lines` until the channel closes.
pub async fn run_console<S: ZoneSource>(
    mut lines: mpsc::Receiver<String>,
    store: Arc<ZoneStore>,
    source: Arc<S>,
) {
    let mut parser = CommandParser::new();

    while let Some(line) = lines.recv().await {
        match parser.feed(&line) {
            ParseOutcome::Command(command) => {
                debug!(command = ?command, "Console command");
                execute(command, &store, &*source).await;
            }
            ParseOutcome::Prompt => {
                info!("Flush record command received. Enter '<domain> <TYPE>' (e.g. example.com A)");
            }
            ParseOutcome::Rejected(reason) => {
                warn!(input = %line.trim(), reason = %reason, "Invalid flushrecord input");
            }
            ParseOutcome::Ignored => {}
        }
    }

    debug!("Console input closed");
}
