// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Optional TCP RPC listener for the admin control channel (§6.3), gated
//! behind the `admin` Cargo feature since it pulls in `tokio`. A line-based
//! text protocol keeps the wire format trivial to drive from a shell for
//! manual testing, matching the teacher's admin listener being reachable
//! with a bare `nc`.
//!
//! Commands: `GETVER`, `STATS <line>`, `STATUS <line>`, `CLRSTATS <line>`,
//! `STOP <line>`. Unknown lines and unknown line names get an `ERR` reply;
//! nothing here ever panics on attacker-controlled input.

use super::{ActionRequest, LineStatus};
use crate::feed_group::FeedGroupStatsSnapshot;
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, ToSocketAddrs};

#[derive(Debug)]
pub enum AdminServerError {
    Io(std::io::Error),
}

impl fmt::Display for AdminServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "admin server I/O error: {e}"),
        }
    }
}

impl std::error::Error for AdminServerError {}

impl From<std::io::Error> for AdminServerError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Everything the admin server needs to answer a request, implemented by
/// whatever owns the set of running [`crate::feed_group::FeedGroup`]s (the
/// receive thread, behind a mutex, since the admin thread runs independently
/// per the three-thread scheduling model).
#[async_trait::async_trait]
pub trait AdminRegistry: Send + Sync {
    async fn stats(&self, line: &str) -> Option<FeedGroupStatsSnapshot>;
    async fn status(&self, line: &str) -> Option<LineStatus>;
    async fn apply(&self, line: &str, action: ActionRequest) -> bool;
}

/// Accept connections on `addr` until the process exits, dispatching each
/// line of each connection to `registry`. Intended to run on its own task
/// (the "management thread" of the three-thread model), independent of the
/// receive loop.
pub async fn serve<A: ToSocketAddrs>(
    addr: A,
    registry: Arc<dyn AdminRegistry>,
) -> Result<(), AdminServerError> {
    let listener = TcpListener::bind(addr).await?;
    loop {
        let (socket, _) = listener.accept().await?;
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, registry).await {
                log::warn!("[admin] connection error: {e}");
            }
        });
    }
}

async fn handle_connection(
    socket: tokio::net::TcpStream,
    registry: Arc<dyn AdminRegistry>,
) -> Result<(), AdminServerError> {
    let (read_half, mut write_half) = socket.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        let reply = dispatch(line.trim(), registry.as_ref()).await;
        write_half.write_all(reply.as_bytes()).await?;
        write_half.write_all(b"\n").await?;
    }
    Ok(())
}

async fn dispatch(line: &str, registry: &dyn AdminRegistry) -> String {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("GETVER") => format!("OK {}", crate::VERSION),
        Some("STATS") => match parts.next() {
            Some(name) => match registry.stats(name).await {
                Some(s) => format!(
                    "OK pckt_primary={} bytes_primary={} msgs_primary={} fmt_err_primary={} dup_primary={} \
                     pckt_secondary={} bytes_secondary={} msgs_secondary={} fmt_err_secondary={} dup_secondary={}",
                    s.pckt_rcvd_primary,
                    s.bytes_rcvd_primary,
                    s.msgs_rcvd_primary,
                    s.pkt_format_errors_primary,
                    s.pkt_duplicate_primary,
                    s.pckt_rcvd_secondary,
                    s.bytes_rcvd_secondary,
                    s.msgs_rcvd_secondary,
                    s.pkt_format_errors_secondary,
                    s.pkt_duplicate_secondary,
                ),
                None => format!("ERR unknown line {name:?}"),
            },
            None => "ERR STATS requires a line name".to_string(),
        },
        Some("STATUS") => match parts.next() {
            Some(name) => match registry.status(name).await {
                Some(s) => format!("OK halted={} in_sequence={}", s.halted, s.in_sequence),
                None => format!("ERR unknown line {name:?}"),
            },
            None => "ERR STATUS requires a line name".to_string(),
        },
        Some("CLRSTATS") => match parts.next() {
            Some(name) if registry.apply(name, ActionRequest::ClearStats).await => "OK".to_string(),
            Some(name) => format!("ERR unknown line {name:?}"),
            None => "ERR CLRSTATS requires a line name".to_string(),
        },
        Some("STOP") => match parts.next() {
            Some(name) if registry.apply(name, ActionRequest::Stop).await => "OK".to_string(),
            Some(name) => format!("ERR unknown line {name:?}"),
            None => "ERR STOP requires a line name".to_string(),
        },
        Some(other) => format!("ERR unknown command {other:?}"),
        None => "ERR empty command".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed_group::FeedGroupStatsSnapshot;
    use std::sync::Mutex as StdMutex;

    struct FakeRegistry {
        known: StdMutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl AdminRegistry for FakeRegistry {
        async fn stats(&self, line: &str) -> Option<FeedGroupStatsSnapshot> {
            self.known
                .lock()
                .unwrap()
                .contains(&line.to_string())
                .then(FeedGroupStatsSnapshot::default)
        }
        async fn status(&self, line: &str) -> Option<LineStatus> {
            self.known.lock().unwrap().contains(&line.to_string()).then(|| LineStatus {
                halted: false,
                in_sequence: true,
            })
        }
        async fn apply(&self, line: &str, _action: ActionRequest) -> bool {
            self.known.lock().unwrap().contains(&line.to_string())
        }
    }

    #[tokio::test]
    async fn getver_replies_with_crate_version() {
        let registry = FakeRegistry { known: StdMutex::new(vec![]) };
        let reply = dispatch("GETVER", &registry).await;
        assert_eq!(reply, format!("OK {}", crate::VERSION));
    }

    #[tokio::test]
    async fn stats_for_unknown_line_is_an_error() {
        let registry = FakeRegistry { known: StdMutex::new(vec![]) };
        let reply = dispatch("STATS NOPE", &registry).await;
        assert!(reply.starts_with("ERR"));
    }

    #[tokio::test]
    async fn stop_for_known_line_succeeds() {
        let registry = FakeRegistry {
            known: StdMutex::new(vec!["ARCA_LISTED_AC".to_string()]),
        };
        let reply = dispatch("STOP ARCA_LISTED_AC", &registry).await;
        assert_eq!(reply, "OK");
    }

    #[tokio::test]
    async fn unknown_command_is_an_error() {
        let registry = FakeRegistry { known: StdMutex::new(vec![]) };
        let reply = dispatch("BOGUS", &registry).await;
        assert!(reply.starts_with("ERR unknown command"));
    }
}
