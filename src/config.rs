// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Static wire constants and dynamic per-line configuration.
//!
//! # Architecture
//!
//! Two layers, matching the wider crate lineage's config split:
//!
//! - **Level 1 (static)**: compile-time constants for packet sizes, header
//!   offsets, and the missing-window sizing — these come straight from the
//!   exchange wire spec and never change at runtime.
//! - **Level 2 (dynamic)**: per-process-line configuration loaded from a
//!   config file / environment, hot-swappable via [`ArcSwap`] so the admin
//!   channel can push a reload without stopping the receive loop.
//!
//! # Example
//!
//! ```rust
//! use arcafeed::config::FeedGroupConfig;
//!
//! let cfg = FeedGroupConfig::new("ARCA_LISTED_AC");
//! assert_eq!(cfg.feed_name, "ARCA_LISTED_AC");
//! assert!(!cfg.fast_mode);
//! ```

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::Arc;

/// Maximum UDP datagram size this feed handler expects to receive.
pub const PACKET_MAX: usize = 1500;
/// Short packet header size (all message types except book refresh).
pub const ARCAM_MSG_HDR_SIZE: usize = 16;
/// Long packet header size (book-refresh messages only).
pub const ARCAM_REFRESH_MSG_HDR_SIZE: usize = 48;

// Header field byte offsets, network order, matching the exchange spec.
pub const MSG_SIZE_OFFSET: usize = 0;
pub const MSG_TYPE_OFFSET: usize = 2;
pub const MSG_NUM_OFFSET: usize = 4;
pub const SEND_TIME_OFFSET: usize = 8;
pub const PRODUCT_ID_OFFSET: usize = 12;
pub const RETRANS_FLAG_OFFSET: usize = 13;
pub const NUM_BODIES_OFFSET: usize = 14;
pub const SESSION_ID_OFFSET: usize = 17;
pub const SYMBOL_INDEX_OFFSET: usize = 18;
pub const CURRENT_REFRESH_SEQ_OFFSET: usize = 20;
pub const TOTAL_REFRESH_SEQ_OFFSET: usize = 22;
pub const LAST_SOURCE_SEQ_OFFSET: usize = 24;
pub const LAST_MSG_SEQ_OFFSET: usize = 28;
pub const SYMBOL_OFFSET: usize = 32;

/// Max symbol length in the ArcaBook spec (not including null terminator).
pub const ARCABOOK_SYMBOL_LENGTH: usize = 16;
/// Max firm attribution length in the ArcaBook spec.
pub const ARCABOOK_ATTRIBUTION_LENGTH: usize = 5;

/// Missing-window bitmap size in 64-bit words: `256 * 128` double words.
pub const MISSING_SIZE_WORDS: usize = 256 * 128;
/// Number of sequence numbers a single missing-window can track:
/// `MISSING_SIZE_WORDS * 64` ≈ 2,097,152.
pub const MISSING_RANGE: u64 = (MISSING_SIZE_WORDS as u64) * 64;

/// Gap size (in sequence numbers) that would trigger an auto refresh-request
/// switch under the (stubbed) retransmission policy. Inert in this crate;
/// see [`RetransPolicy`].
pub const GAP_SIZE_TOO_BIG: u32 = 20;

/// Lost-packet recovery strategy. Only [`RetransPolicy::MirroredFeed`] is
/// actually implemented end-to-end by this crate (the dual-feed arbiter);
/// the other variants are preserved as configuration surface for a future
/// retransmission-request implementation and are otherwise inert, per the
/// design note on stubbed retransmission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetransPolicy {
    /// Recover only via the mirrored secondary multicast feed.
    #[default]
    MirroredFeed,
    /// Periodic book-refresh requests (unimplemented).
    Interval,
    /// On-demand retransmission requests (unimplemented).
    Request,
    /// Request refresh for small gaps, fall back to interval once the
    /// session's request budget is exhausted (unimplemented).
    Mixed,
}

/// Dynamic per-line configuration, one entry per logical feed group.
#[derive(Debug, Clone)]
pub struct FeedGroupConfig {
    pub feed_name: String,
    pub process_name: String,
    pub session_id: u8,
    pub primary_mcast_addr: Option<String>,
    pub primary_mcast_port: u16,
    pub primary_iface: Option<String>,
    pub secondary_mcast_addr: Option<String>,
    pub secondary_mcast_port: u16,
    pub secondary_iface: Option<String>,
    /// Whether this line runs FAST-compacted (true) or uncompacted (false).
    pub fast_mode: bool,
    pub retrans_policy: RetransPolicy,
    /// CPU core to pin the receive/processing thread to, if any.
    pub cpu_affinity: Option<usize>,
}

impl FeedGroupConfig {
    pub fn new(feed_name: impl Into<String>) -> Self {
        Self {
            feed_name: feed_name.into(),
            process_name: String::new(),
            session_id: 0,
            primary_mcast_addr: None,
            primary_mcast_port: 0,
            primary_iface: None,
            secondary_mcast_addr: None,
            secondary_mcast_port: 0,
            secondary_iface: None,
            fast_mode: false,
            retrans_policy: RetransPolicy::default(),
            cpu_affinity: None,
        }
    }
}

/// Returns the config-root prefix, honoring the `ARCAFEED_HOME` environment
/// override (defaults to `/opt/arcafeed`, the rewrite's analogue of the
/// original `/opt/csi/fh` install prefix).
pub fn home_prefix() -> String {
    std::env::var("ARCAFEED_HOME").unwrap_or_else(|_| "/opt/arcafeed".to_string())
}

/// Process-wide table of line configurations, hot-swappable for reload
/// without disturbing any already-running receive thread.
#[derive(Default)]
pub struct ConfigStore {
    lines: DashMap<String, Arc<ArcSwap<FeedGroupConfig>>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self {
            lines: DashMap::new(),
        }
    }

    pub fn insert(&self, cfg: FeedGroupConfig) {
        self.lines
            .insert(cfg.feed_name.clone(), Arc::new(ArcSwap::from_pointee(cfg)));
    }

    pub fn get(&self, feed_name: &str) -> Option<Arc<FeedGroupConfig>> {
        self.lines.get(feed_name).map(|entry| entry.load_full())
    }

    /// Atomically swap in a replacement configuration for an existing line.
    pub fn reload(&self, cfg: FeedGroupConfig) -> bool {
        match self.lines.get(&cfg.feed_name) {
            Some(entry) => {
                entry.store(Arc::new(cfg));
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_range_matches_spec_target() {
        assert_eq!(MISSING_RANGE, 2_097_152);
    }

    #[test]
    fn config_store_insert_and_get() {
        let store = ConfigStore::new();
        store.insert(FeedGroupConfig::new("ARCA_LISTED_AC"));
        let cfg = store.get("ARCA_LISTED_AC").expect("inserted line");
        assert_eq!(cfg.feed_name, "ARCA_LISTED_AC");
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn config_store_reload_swaps_in_place() {
        let store = ConfigStore::new();
        store.insert(FeedGroupConfig::new("LINE"));
        let mut updated = FeedGroupConfig::new("LINE");
        updated.fast_mode = true;
        assert!(store.reload(updated));
        assert!(store.get("LINE").unwrap().fast_mode);
        assert!(!store.reload(FeedGroupConfig::new("NOT_PRESENT")));
    }

    #[test]
    fn home_prefix_defaults_when_unset() {
        std::env::remove_var("ARCAFEED_HOME");
        assert_eq!(home_prefix(), "/opt/arcafeed");
    }
}
