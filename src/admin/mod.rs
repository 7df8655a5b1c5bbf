// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Admin control channel command handlers (§4.K, §6.3).
//!
//! This crate owns the *handlers* for `STATS_REQ`, `STATUS_REQ`,
//! `GETVER_REQ`, and `ACTION_REQ` (`CLRSTATS`/`STOP`) — plain functions
//! operating on a [`FeedGroup`]'s lock-free stats snapshot and halt flag. The
//! TCP RPC transport that carries these requests to/from a central manager
//! is a genuine external collaborator (§6): this module exposes it only
//! behind the optional `admin` feature as a minimal `tokio` listener, never
//! as a requirement to run a manager process.

use crate::feed_group::{FeedGroup, FeedGroupStatsSnapshot};

#[cfg(feature = "admin")]
mod server;
#[cfg(feature = "admin")]
pub use server::{serve, AdminRegistry, AdminServerError};

/// One line's stats, paired as primary/secondary the way the admin
/// channel's `STATS_RESP` payload reports them (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStats {
    pub feed_name_hash: u64,
    pub snapshot: FeedGroupStatsSnapshot,
}

/// `STATUS_RESP` payload: whether the line is halted and its last-known
/// in-sequence state, mirroring the status word's low-order semantics
/// without requiring the caller to decode the packed bit layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStatus {
    pub halted: bool,
    pub in_sequence: bool,
}

/// `ACTION_REQ` sub-commands (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRequest {
    /// Zero every counter on the targeted line.
    ClearStats,
    /// Set the targeted line's cooperative stop flag.
    Stop,
}

/// `GETVER_REQ` handler: the running crate version.
pub fn get_version() -> &'static str {
    crate::VERSION
}

/// `STATS_REQ` handler: a read-only snapshot, taken without disturbing the
/// receive thread (the underlying counters are relaxed atomics).
pub fn get_stats(group: &FeedGroup) -> FeedGroupStatsSnapshot {
    group.stats.snapshot()
}

/// `STATUS_REQ` handler.
pub fn get_status(group: &FeedGroup) -> LineStatus {
    LineStatus {
        halted: group.is_halted(),
        in_sequence: group.arbiter.in_sequence(),
    }
}

/// `ACTION_REQ` handler.
pub fn apply_action(group: &mut FeedGroup, action: ActionRequest) {
    match action {
        ActionRequest::ClearStats => group.clear_stats(),
        ActionRequest::Stop => group.request_halt(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::Side;
    use crate::config::FeedGroupConfig;

    #[test]
    fn get_version_matches_crate_version() {
        assert_eq!(get_version(), crate::VERSION);
    }

    #[test]
    fn stats_req_reflects_recorded_traffic() {
        let group = FeedGroup::new(FeedGroupConfig::new("LINE"));
        group.stats.record_packet(Side::Primary, 64);
        let snap = get_stats(&group);
        assert_eq!(snap.pckt_rcvd_primary, 1);
        assert_eq!(snap.bytes_rcvd_primary, 64);
    }

    #[test]
    fn status_req_reports_halted_flag() {
        let mut group = FeedGroup::new(FeedGroupConfig::new("LINE"));
        assert!(!get_status(&group).halted);
        apply_action(&mut group, ActionRequest::Stop);
        assert!(get_status(&group).halted);
    }

    #[test]
    fn clrstats_action_zeroes_counters() {
        let mut group = FeedGroup::new(FeedGroupConfig::new("LINE"));
        group.stats.record_packet(Side::Primary, 10);
        apply_action(&mut group, ActionRequest::ClearStats);
        assert_eq!(get_stats(&group).pckt_rcvd_primary, 0);
    }
}
