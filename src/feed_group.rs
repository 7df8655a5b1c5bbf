// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-line state: sockets, cursors, missing window, counters (§3 `FeedGroup`).
//!
//! A `FeedGroup` is confined to a single receive thread (§5): the arbiter's
//! fast path and the FAST field-state table need no synchronization at all,
//! while the stats counters use relaxed atomics so the management thread can
//! read a consistent-enough snapshot without taking a lock (§4.K).

use crate::arbiter::Arbiter;
use crate::config::FeedGroupConfig;
use crate::fast::FastFieldState;
use crate::publish::{FeedCapabilities, NullCapabilities};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Lock-free per-side/per-line counters, read by the admin stats path
/// without disturbing the receive thread (§3 supplemental, §4.K).
#[derive(Debug, Default)]
pub struct FeedGroupStats {
    pub pckt_rcvd_primary: AtomicU64,
    pub bytes_rcvd_primary: AtomicU64,
    pub msgs_rcvd_primary: AtomicU64,
    pub pkt_format_errors_primary: AtomicU64,
    pub pkt_duplicate_primary: AtomicU64,

    pub pckt_rcvd_secondary: AtomicU64,
    pub bytes_rcvd_secondary: AtomicU64,
    pub msgs_rcvd_secondary: AtomicU64,
    pub pkt_format_errors_secondary: AtomicU64,
    pub pkt_duplicate_secondary: AtomicU64,
}

impl FeedGroupStats {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub fn record_packet(&self, side: crate::arbiter::Side, bytes: u64) {
        match side {
            crate::arbiter::Side::Primary => {
                Self::bump(&self.pckt_rcvd_primary, 1);
                Self::bump(&self.bytes_rcvd_primary, bytes);
            }
            crate::arbiter::Side::Secondary => {
                Self::bump(&self.pckt_rcvd_secondary, 1);
                Self::bump(&self.bytes_rcvd_secondary, bytes);
            }
        }
    }

    pub fn record_messages(&self, side: crate::arbiter::Side, count: u64) {
        match side {
            crate::arbiter::Side::Primary => Self::bump(&self.msgs_rcvd_primary, count),
            crate::arbiter::Side::Secondary => Self::bump(&self.msgs_rcvd_secondary, count),
        }
    }

    pub fn record_format_error(&self, side: crate::arbiter::Side) {
        match side {
            crate::arbiter::Side::Primary => Self::bump(&self.pkt_format_errors_primary, 1),
            crate::arbiter::Side::Secondary => Self::bump(&self.pkt_format_errors_secondary, 1),
        }
    }

    pub fn record_duplicate(&self, side: crate::arbiter::Side) {
        match side {
            crate::arbiter::Side::Primary => Self::bump(&self.pkt_duplicate_primary, 1),
            crate::arbiter::Side::Secondary => Self::bump(&self.pkt_duplicate_secondary, 1),
        }
    }

    /// A read-only copy suitable for serializing into an admin stats response.
    pub fn snapshot(&self) -> FeedGroupStatsSnapshot {
        FeedGroupStatsSnapshot {
            pckt_rcvd_primary: self.pckt_rcvd_primary.load(Ordering::Relaxed),
            bytes_rcvd_primary: self.bytes_rcvd_primary.load(Ordering::Relaxed),
            msgs_rcvd_primary: self.msgs_rcvd_primary.load(Ordering::Relaxed),
            pkt_format_errors_primary: self.pkt_format_errors_primary.load(Ordering::Relaxed),
            pkt_duplicate_primary: self.pkt_duplicate_primary.load(Ordering::Relaxed),
            pckt_rcvd_secondary: self.pckt_rcvd_secondary.load(Ordering::Relaxed),
            bytes_rcvd_secondary: self.bytes_rcvd_secondary.load(Ordering::Relaxed),
            msgs_rcvd_secondary: self.msgs_rcvd_secondary.load(Ordering::Relaxed),
            pkt_format_errors_secondary: self.pkt_format_errors_secondary.load(Ordering::Relaxed),
            pkt_duplicate_secondary: self.pkt_duplicate_secondary.load(Ordering::Relaxed),
        }
    }
}

/// Plain-value twin of [`FeedGroupStats`] for transport over the admin channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedGroupStatsSnapshot {
    pub pckt_rcvd_primary: u64,
    pub bytes_rcvd_primary: u64,
    pub msgs_rcvd_primary: u64,
    pub pkt_format_errors_primary: u64,
    pub pkt_duplicate_primary: u64,
    pub pckt_rcvd_secondary: u64,
    pub bytes_rcvd_secondary: u64,
    pub msgs_rcvd_secondary: u64,
    pub pkt_format_errors_secondary: u64,
    pub pkt_duplicate_secondary: u64,
}

/// One logical ArcaBook/Arca-Trade line: arbiter, FAST field state, the
/// capability set it publishes to, and the counters backing admin stats.
pub struct FeedGroup {
    pub config: FeedGroupConfig,
    pub arbiter: Arbiter,
    pub fast_state: FastFieldState,
    pub stats: FeedGroupStats,
    pub caps: Arc<dyn FeedCapabilities>,

    /// Cooperative stop flag, set by a signal handler or the admin `STOP`
    /// action (§5 "Cancellation"); polled at every receive-loop boundary.
    pub process_halt: AtomicBool,

    // §3 supplemental lookup/publication-failure counters.
    pub symbol_table_error: u64,
    pub firm_table_error: u64,
    pub publication_failed: u64,
    pub publication_succeeded: u64,
}

impl FeedGroup {
    pub fn new(config: FeedGroupConfig) -> Self {
        Self::with_capabilities(config, Arc::new(NullCapabilities))
    }

    pub fn with_capabilities(config: FeedGroupConfig, caps: Arc<dyn FeedCapabilities>) -> Self {
        Self {
            config,
            arbiter: Arbiter::new(),
            fast_state: FastFieldState::new(),
            stats: FeedGroupStats::default(),
            caps,
            process_halt: AtomicBool::new(false),
            symbol_table_error: 0,
            firm_table_error: 0,
            publication_failed: 0,
            publication_succeeded: 0,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.process_halt.load(Ordering::Relaxed)
    }

    pub fn request_halt(&self) {
        self.process_halt.store(true, Ordering::Relaxed);
    }

    /// Clear the admin-visible counters in place (`ACTION_REQ::CLRSTATS`, §6).
    pub fn clear_stats(&mut self) {
        self.stats = FeedGroupStats::default();
        self.symbol_table_error = 0;
        self.firm_table_error = 0;
        self.publication_failed = 0;
        self.publication_succeeded = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::Side;

    #[test]
    fn new_group_starts_with_zeroed_stats_and_no_halt() {
        let group = FeedGroup::new(FeedGroupConfig::new("ARCA_LISTED_AC"));
        assert!(!group.is_halted());
        let snap = group.stats.snapshot();
        assert_eq!(snap.pckt_rcvd_primary, 0);
    }

    #[test]
    fn stats_record_and_snapshot_round_trip() {
        let group = FeedGroup::new(FeedGroupConfig::new("LINE"));
        group.stats.record_packet(Side::Primary, 128);
        group.stats.record_messages(Side::Primary, 3);
        group.stats.record_duplicate(Side::Secondary);
        let snap = group.stats.snapshot();
        assert_eq!(snap.pckt_rcvd_primary, 1);
        assert_eq!(snap.bytes_rcvd_primary, 128);
        assert_eq!(snap.msgs_rcvd_primary, 3);
        assert_eq!(snap.pkt_duplicate_secondary, 1);
    }

    #[test]
    fn clear_stats_zeroes_everything() {
        let mut group = FeedGroup::new(FeedGroupConfig::new("LINE"));
        group.stats.record_packet(Side::Primary, 10);
        group.symbol_table_error = 4;
        group.clear_stats();
        assert_eq!(group.stats.snapshot().pckt_rcvd_primary, 0);
        assert_eq!(group.symbol_table_error, 0);
    }

    #[test]
    fn request_halt_is_observed() {
        let group = FeedGroup::new(FeedGroupConfig::new("LINE"));
        assert!(!group.is_halted());
        group.request_halt();
        assert!(group.is_halted());
    }
}
