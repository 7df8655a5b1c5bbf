// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # ArcaFeed - NYSE Arca multicast feed handler
//!
//! A pure Rust line handler for the NYSE Arca equities order-book
//! ("ArcaBook") and Arca Trade multicast feeds: FAST field-level
//! decompression, a binary message parser, and a dual-feed sequence
//! arbiter that makes publish/duplicate/loss decisions under packet
//! reordering and loss.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arcafeed::{FeedGroup, FeedGroupConfig};
//!
//! let cfg = FeedGroupConfig::new("ARCA_LISTED_AC");
//! let mut group = FeedGroup::new(cfg);
//! # let _ = &mut group;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                         Receive loop (F)                           |
//! |   round-robin drain across primary+secondary multicast sockets     |
//! +---------------------------------------------------------------------+
//! |                        Packet processor (E)                        |
//! |   header parse -> arbiter decision -> FAST decode -> body parse    |
//! +---------------------------------------------------------------------+
//! |  Endian codec (A) | FAST decoder (B) | Binary parser (C)           |
//! +---------------------------------------------------------------------+
//! |                      Sequence arbiter (D)                          |
//! |   primary/secondary cursors + bounded missing-sequence window      |
//! +---------------------------------------------------------------------+
//! |                    Publication facade (G)                          |
//! |   capability-set dispatch, status word, symbol/firm lookups        |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`FeedGroup`] | Per-line state: sockets, cursors, missing window, counters |
//! | [`arbiter::Arbiter`] | Dual-feed duplicate/gap decision engine |
//! | [`fast::FastFieldState`] | FAST presence-map + field-state decompressor |
//! | [`parser::MessageBody`] | Parsed wire record, superset of all message kinds |
//! | [`publish::FeedCapabilities`] | Capability-set hook trait (replaces plug-in table) |
//!
//! ## Modules Overview
//!
//! - [`codec`] - big-endian primitive read/write cursor
//! - [`fast`] - FAST decoder (pmap, field-state table, operators)
//! - [`parser`] - binary message-body parser, dispatched by type
//! - [`arbiter`] - sequence arbiter and missing-sequence window
//! - [`processor`] - per-packet orchestration
//! - [`receive_loop`] - multi-socket round-robin receive loop
//! - [`publish`] - publication facade and capability-set trait
//! - [`transport`] - UDP multicast socket setup
//! - [`config`] - static wire constants + dynamic per-line configuration
//! - [`admin`] - lock-free stats snapshot and admin command handlers

/// Lock-free stats snapshot and admin command handlers (STATS/STATUS/ACTION).
pub mod admin;
/// Sequence arbiter: duplicate/gap detection with a bounded missing-sequence window.
pub mod arbiter;
/// Big-endian primitive read/write cursor over byte buffers.
pub mod codec;
/// Static wire constants and dynamic per-line configuration.
pub mod config;
/// FAST (FIX Adapted for STreaming) field-level decompressor.
pub mod fast;
/// Per-line state: sockets, cursors, missing window, counters.
pub mod feed_group;
/// Binary message-body parser, dispatched by message type.
pub mod parser;
/// Per-packet orchestration: header parse, arbiter consult, decode, publish.
pub mod processor;
/// Publication facade and capability-set hook trait.
pub mod publish;
/// Multi-socket round-robin UDP multicast receive loop.
pub mod receive_loop;
/// UDP multicast socket setup, interface discovery, TTL configuration.
pub mod transport;

pub use arbiter::{Arbiter, Decision, Side};
pub use config::FeedGroupConfig;
pub use feed_group::FeedGroup;
pub use parser::{MessageBody, PacketHeader};
pub use publish::FeedCapabilities;

/// ArcaFeed crate version.
pub const VERSION: &str = "0.1.0";
