// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Multi-socket round-robin receive loop (§4.F).
//!
//! A single cooperative loop per process, or one per thread when lines are
//! pinned to separate cores (§5): block in a timed readiness wait across all
//! joined sockets, drain the first ready one, then round-robin poll every
//! socket's queued-bytes counter until a full cycle finds nothing, honoring
//! a shared `stopped` flag at every boundary.

use crate::arbiter::Side;
use crate::config::PACKET_MAX;
use crate::feed_group::FeedGroup;
use crate::processor;
use crate::publish::{FeedCapabilities, PublicationFacade};
use crate::transport::FeedSocket;
use log::{debug, warn};
#[cfg(unix)]
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use std::io;
use std::time::Duration;

/// Readiness wait timeout, matching §4.F point 1.
const POLL_TIMEOUT: Duration = Duration::from_secs(2);

/// Primary and secondary sockets for one line, as handed to the loop by the
/// transport collaborator (§4.F: "joining... is part of the collaborator
/// interface, not of this loop").
pub struct LineSockets {
    pub primary: FeedSocket,
    pub secondary: Option<FeedSocket>,
}

impl LineSockets {
    pub fn new(primary: FeedSocket, secondary: Option<FeedSocket>) -> Self {
        Self { primary, secondary }
    }

    fn socket(&self, side: Side) -> Option<&FeedSocket> {
        match side {
            Side::Primary => Some(&self.primary),
            Side::Secondary => self.secondary.as_ref(),
        }
    }
}

/// One registered line: its group state, its sockets, and the mio tokens
/// identifying each socket within the shared `Poll` instance.
struct Line {
    group: FeedGroup,
    sockets: LineSockets,
    primary_token: Token,
    secondary_token: Option<Token>,
}

/// Owns every line's sockets and state for one receive thread, and runs the
/// round-robin drain loop described in §4.F.
pub struct ReceiveLoop<C: FeedCapabilities + ?Sized> {
    poll: Poll,
    lines: Vec<Line>,
    facade: std::sync::Arc<C>,
    next_token: usize,
}

impl<C: FeedCapabilities + 'static> ReceiveLoop<C> {
    pub fn new(facade: std::sync::Arc<C>) -> io::Result<Self> {
        Ok(Self {
            poll: Poll::new()?,
            lines: Vec::new(),
            facade,
            next_token: 0,
        })
    }

    /// Register one line's sockets for readiness polling.
    pub fn add_line(&mut self, group: FeedGroup, sockets: LineSockets) -> io::Result<()> {
        let primary_token = Token(self.next_token);
        self.next_token += 1;
        #[cfg(unix)]
        {
            let fd = sockets.primary.as_raw_fd();
            self.poll
                .registry()
                .register(&mut SourceFd(&fd), primary_token, Interest::READABLE)?;
        }

        let secondary_token = if sockets.secondary.is_some() {
            let token = Token(self.next_token);
            self.next_token += 1;
            #[cfg(unix)]
            {
                let fd = sockets.secondary.as_ref().unwrap().as_raw_fd();
                self.poll
                    .registry()
                    .register(&mut SourceFd(&fd), token, Interest::READABLE)?;
            }
            Some(token)
        } else {
            None
        };

        self.lines.push(Line {
            group,
            sockets,
            primary_token,
            secondary_token,
        });
        Ok(())
    }

    /// Run until every line's `process_halt` flag is set. Returns control to
    /// the caller on each readiness-wait timeout so callers that want to poll
    /// an external stop condition can wrap this in their own loop; as
    /// written, `run` itself keeps going until `all_halted()`.
    pub fn run(&mut self) -> io::Result<()> {
        let mut scratch = vec![0u8; PACKET_MAX];
        let mut events = Events::with_capacity(self.lines.len().max(1) * 2);

        while !self.all_halted() {
            match self.poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }

            if events.iter().next().is_none() {
                // Timed out with no ready socket; loop back to the wait.
                continue;
            }

            // Drain whichever socket(s) the OS reported ready, then enter
            // the round-robin fair-drain phase across every line so no
            // socket is starved by a persistently noisy neighbor.
            for event in events.iter() {
                self.drain_token(event.token(), &mut scratch)?;
            }
            self.round_robin_drain(&mut scratch)?;
        }
        Ok(())
    }

    fn all_halted(&self) -> bool {
        !self.lines.is_empty() && self.lines.iter().all(|l| l.group.is_halted())
    }

    fn drain_token(&mut self, token: Token, scratch: &mut [u8]) -> io::Result<()> {
        for line in &mut self.lines {
            if line.primary_token == token {
                drain_one(&mut line.group, self.facade.as_ref(), &line.sockets, Side::Primary, scratch);
                return Ok(());
            }
            if line.secondary_token == Some(token) {
                drain_one(&mut line.group, self.facade.as_ref(), &line.sockets, Side::Secondary, scratch);
                return Ok(());
            }
        }
        Ok(())
    }

    /// §4.F point 3: starting after the last-serviced socket, poll every
    /// socket's queued-bytes counter and drain one packet per nonzero hit,
    /// cycling until a full pass finds nothing.
    fn round_robin_drain(&mut self, scratch: &mut [u8]) -> io::Result<()> {
        loop {
            let mut drained_any = false;
            for line in &mut self.lines {
                if line.group.is_halted() {
                    continue;
                }
                for side in [Side::Primary, Side::Secondary] {
                    let Some(socket) = line.sockets.socket(side) else {
                        continue;
                    };
                    match socket.queued_bytes() {
                        Ok(n) if n > 0 => {
                            drain_one(&mut line.group, self.facade.as_ref(), &line.sockets, side, scratch);
                            drained_any = true;
                        }
                        Ok(_) => {}
                        Err(e) => warn!("[recv] queued_bytes probe failed: {e}"),
                    }
                }
            }
            if !drained_any {
                return Ok(());
            }
        }
    }
}

fn drain_one<C: FeedCapabilities + ?Sized>(
    group: &mut FeedGroup,
    caps: &C,
    sockets: &LineSockets,
    side: Side,
    scratch: &mut [u8],
) {
    let Some(socket) = sockets.socket(side) else {
        return;
    };
    match socket.recv(scratch) {
        Ok(n) => {
            let facade = PublicationFacade::new(caps);
            // process_packet already advances the format-error counter on
            // RuntHeader; this is purely for logging, not a second count.
            let outcome = processor::process_packet(group, &facade, side, &scratch[..n]);
            debug!("[recv] {:?} side={:?} outcome={:?}", group.config.feed_name, side, outcome);
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
        Err(e) => warn!("[recv] socket read failed on {:?}: {e}", side),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedGroupConfig;
    use crate::publish::NullCapabilities;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    #[test]
    fn new_loop_starts_with_no_lines_and_is_considered_not_halted() {
        let rloop = ReceiveLoop::new(Arc::new(NullCapabilities)).unwrap();
        assert!(rloop.lines.is_empty());
        // An empty loop reports "not all halted" to avoid a trivially-true
        // shutdown before any line is registered.
        assert!(!rloop.all_halted());
    }

    #[test]
    fn add_line_registers_distinct_tokens() {
        let mut rloop = ReceiveLoop::new(Arc::new(NullCapabilities)).unwrap();
        let group = FeedGroup::new(FeedGroupConfig::new("LINE"));
        let primary = crate::transport::FeedSocket::join(
            crate::transport::parse_multicast_addr("239.255.0.9", 0).unwrap(),
            Some(Ipv4Addr::LOCALHOST),
        );
        if let Ok(primary) = primary {
            let sockets = LineSockets::new(primary, None);
            assert!(rloop.add_line(group, sockets).is_ok());
            assert_eq!(rloop.lines.len(), 1);
            assert!(rloop.lines[0].secondary_token.is_none());
        }
    }

    #[test]
    fn all_halted_is_true_once_every_line_requests_halt() {
        let mut rloop = ReceiveLoop::new(Arc::new(NullCapabilities)).unwrap();
        let group = FeedGroup::new(FeedGroupConfig::new("LINE"));
        group.request_halt();
        let primary = crate::transport::FeedSocket::join(
            crate::transport::parse_multicast_addr("239.255.0.10", 0).unwrap(),
            Some(Ipv4Addr::LOCALHOST),
        );
        if let Ok(primary) = primary {
            rloop.add_line(group, LineSockets::new(primary, None)).unwrap();
            assert!(rloop.all_halted());
        }
    }
}
