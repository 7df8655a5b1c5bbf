// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publication facade: dispatches decoded records to a capability-set
//! trait object and packs the 32-bit status word carried on every message.
//!
//! Replaces the teacher lineage's C plug-in function table (§9/§11 of the
//! design spec): a host supplies only the hooks it needs by overriding
//! default-no-op methods on its own [`FeedCapabilities`] implementation,
//! rather than registering function pointers at load time.

use crate::parser::MessageBody;
use std::fmt;

/// Result alias for publication-hook failures.
pub type PublishResult<T> = Result<T, PublishError>;

/// Structured publication-hook failure. Never fatal: counted by the caller,
/// never propagated past the packet boundary (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// `init_message` declined to provide a send buffer.
    InitFailed,
    /// `send_message` reported failure.
    SendFailed,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::InitFailed => write!(f, "publish: init_message declined a buffer"),
            PublishError::SendFailed => write!(f, "publish: send_message reported failure"),
        }
    }
}

impl std::error::Error for PublishError {}

/// Default send-buffer size when no `init_message` hook is registered.
const DEFAULT_SEND_BUFFER: usize = 512;

/// Capability-set hook trait (§11). Object-safe: a single process can hold
/// a `Box<dyn FeedCapabilities>` (or an `Arc`) per line without any
/// dynamic-loading machinery. Every method defaults to the no-op the
/// original's null function-pointer check produced.
pub trait FeedCapabilities: Send + Sync {
    fn lookup_symbol(&self, _index: u16, _session: u8) -> Option<String> {
        None
    }
    fn lookup_firm(&self, _index: u16) -> Option<String> {
        None
    }
    fn on_add_order(&self, _body: &MessageBody, _status: u32) {}
    fn on_modify_order(&self, _body: &MessageBody, _status: u32) {}
    fn on_delete_order(&self, _body: &MessageBody, _status: u32) {}
    fn on_imbalance(&self, _body: &MessageBody, _status: u32) {}
    fn on_trade(&self, _body: &MessageBody, _status: u32) {}
    fn on_trade_cancel(&self, _body: &MessageBody, _status: u32) {}
    fn on_trade_correction(&self, _body: &MessageBody, _status: u32) {}
    fn on_symbol_mapping(&self, _body: &MessageBody, _status: u32) {}
    fn on_symbol_clear(&self, _body: &MessageBody, _status: u32) {}
    fn on_firm_mapping(&self, _body: &MessageBody, _status: u32) {}
    fn on_book_refresh(&self, _body: &MessageBody, _status: u32) {}
    fn on_sequence_reset(&self, _next_seq: u32, _status: u32) {}
    fn on_feed_alert(&self, _alert_type: u8, _status: u32) {}
    fn on_packet_loss(&self, _begin_seq: u32, _end_seq: u32, _status: u32) {}
    fn request_retransmission(&self, _begin_seq: u32, _end_seq: u32) {}
    fn init_message(&self) -> Option<Vec<u8>> {
        None
    }
    fn send_message(&self, _buf: &[u8]) -> bool {
        true
    }
    fn msg_flush(&self) {}
}

/// A capability set that implements every hook as the default no-op; used
/// as the line's capability object when nothing downstream is registered,
/// and as a test double elsewhere in this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCapabilities;

impl FeedCapabilities for NullCapabilities {}

/// Inputs to the 32-bit status word packed onto every published message and
/// alert (§4.G point 2).
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusWordInput {
    /// Cumulative unrecoverable-message count, saturated into 24 bits.
    pub unrecoverable_messages: u32,
    pub re_request_feed_up: bool,
    pub secondary_feed_up: bool,
    pub primary_feed_up: bool,
    pub in_sequence: bool,
    /// Two-bit line-id quadrant occupying the top of the word.
    pub line_id: u8,
}

const UNRECOVERABLE_MASK: u32 = 0x00FF_FFFF;

/// Pack a [`StatusWordInput`] into the 32-bit status word (§4.G point 2):
/// low 24 bits cumulative unrecoverable count (saturating), bit 24 extreme
/// packet loss, bit 25 re-request feed up, bit 26 secondary feed up, bit 27
/// primary feed up, bit 28 no packet loss, bit 29 in sequence, top 2 bits
/// line-id quadrant.
pub fn build_status_word(input: &StatusWordInput) -> u32 {
    let unrecoverable = input.unrecoverable_messages.min(UNRECOVERABLE_MASK);
    let mut word = unrecoverable;
    if unrecoverable >= UNRECOVERABLE_MASK {
        word |= 1 << 24;
    }
    if input.re_request_feed_up {
        word |= 1 << 25;
    }
    if input.secondary_feed_up {
        word |= 1 << 26;
    }
    if input.primary_feed_up {
        word |= 1 << 27;
    }
    if unrecoverable == 0 {
        word |= 1 << 28;
    }
    if input.in_sequence {
        word |= 1 << 29;
    }
    word |= u32::from(input.line_id & 0b11) << 30;
    word
}

/// Counters the facade advances while dispatching one record (§3's
/// supplemental `symbol_table_error`/`firm_table_error`/
/// `publication_failed`/`publication_succeeded` fields). Borrowed from
/// [`crate::feed_group::FeedGroup`] rather than owned here, so the facade
/// stays decoupled from the per-line state it is handed.
pub struct PublishCounters<'a> {
    pub symbol_table_error: &'a mut u64,
    pub firm_table_error: &'a mut u64,
    pub publication_failed: &'a mut u64,
    pub publication_succeeded: &'a mut u64,
}

/// Thin dispatcher handing one decoded record to the capability set,
/// resolving optional symbol/firm strings first (§4.G points 1, 3-5).
pub struct PublicationFacade<'a, C: FeedCapabilities + ?Sized> {
    caps: &'a C,
}

impl<'a, C: FeedCapabilities + ?Sized> PublicationFacade<'a, C> {
    pub fn new(caps: &'a C) -> Self {
        Self { caps }
    }

    /// Resolve a symbol string for `(index, session)`, counting a lookup
    /// miss but never failing the publication itself (§4.G point 1).
    pub fn resolve_symbol(&self, index: u16, session: u8, counters: &mut PublishCounters) -> String {
        match self.caps.lookup_symbol(index, session) {
            Some(s) => s,
            None => {
                *counters.symbol_table_error += 1;
                String::new()
            }
        }
    }

    /// Resolve a firm string for `index`, counting a lookup miss (§4.G point 1).
    pub fn resolve_firm(&self, index: u16, counters: &mut PublishCounters) -> String {
        match self.caps.lookup_firm(index) {
            Some(s) => s,
            None => {
                *counters.firm_table_error += 1;
                String::new()
            }
        }
    }

    /// Run the `init_message` / type-specific hook / `send_message`
    /// sequence (§4.G points 3-5) for one already-resolved record, where
    /// `pack` is the type-specific hook that consumes the record and the
    /// status word.
    fn dispatch(
        &self,
        counters: &mut PublishCounters,
        pack: impl FnOnce(),
    ) -> PublishResult<()> {
        let buf = self.caps.init_message().unwrap_or_else(|| vec![0u8; DEFAULT_SEND_BUFFER]);
        pack();
        if self.caps.send_message(&buf) {
            *counters.publication_succeeded += 1;
            Ok(())
        } else {
            *counters.publication_failed += 1;
            Err(PublishError::SendFailed)
        }
    }

    pub fn publish_add_order(&self, body: &MessageBody, status: u32, counters: &mut PublishCounters) -> PublishResult<()> {
        self.dispatch(counters, || self.caps.on_add_order(body, status))
    }

    pub fn publish_modify_order(&self, body: &MessageBody, status: u32, counters: &mut PublishCounters) -> PublishResult<()> {
        self.dispatch(counters, || self.caps.on_modify_order(body, status))
    }

    pub fn publish_delete_order(&self, body: &MessageBody, status: u32, counters: &mut PublishCounters) -> PublishResult<()> {
        self.dispatch(counters, || self.caps.on_delete_order(body, status))
    }

    pub fn publish_imbalance(&self, body: &MessageBody, status: u32, counters: &mut PublishCounters) -> PublishResult<()> {
        self.dispatch(counters, || self.caps.on_imbalance(body, status))
    }

    pub fn publish_trade(&self, body: &MessageBody, status: u32, counters: &mut PublishCounters) -> PublishResult<()> {
        self.dispatch(counters, || self.caps.on_trade(body, status))
    }

    pub fn publish_trade_cancel(&self, body: &MessageBody, status: u32, counters: &mut PublishCounters) -> PublishResult<()> {
        self.dispatch(counters, || self.caps.on_trade_cancel(body, status))
    }

    pub fn publish_trade_correction(&self, body: &MessageBody, status: u32, counters: &mut PublishCounters) -> PublishResult<()> {
        self.dispatch(counters, || self.caps.on_trade_correction(body, status))
    }

    pub fn publish_symbol_mapping(&self, body: &MessageBody, status: u32, counters: &mut PublishCounters) -> PublishResult<()> {
        self.dispatch(counters, || self.caps.on_symbol_mapping(body, status))
    }

    pub fn publish_symbol_clear(&self, body: &MessageBody, status: u32, counters: &mut PublishCounters) -> PublishResult<()> {
        self.dispatch(counters, || self.caps.on_symbol_clear(body, status))
    }

    pub fn publish_firm_mapping(&self, body: &MessageBody, status: u32, counters: &mut PublishCounters) -> PublishResult<()> {
        self.dispatch(counters, || self.caps.on_firm_mapping(body, status))
    }

    pub fn publish_book_refresh(&self, body: &MessageBody, status: u32, counters: &mut PublishCounters) -> PublishResult<()> {
        self.dispatch(counters, || self.caps.on_book_refresh(body, status))
    }

    pub fn publish_sequence_reset(&self, next_seq: u32, status: u32, counters: &mut PublishCounters) -> PublishResult<()> {
        self.dispatch(counters, || self.caps.on_sequence_reset(next_seq, status))
    }

    /// Alerts bypass the send-buffer sequence entirely (§4.G is silent on
    /// init/send for alerts; only the notification hook fires).
    pub fn alert_feed(&self, alert_type: u8, status: u32) {
        self.caps.on_feed_alert(alert_type, status);
    }

    pub fn alert_packet_loss(&self, begin_seq: u32, end_seq: u32, status: u32) {
        self.caps.on_packet_loss(begin_seq, end_seq, status);
    }

    pub fn flush(&self) {
        self.caps.msg_flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn status_word_packs_in_sequence_and_line_id() {
        let input = StatusWordInput {
            unrecoverable_messages: 0,
            re_request_feed_up: false,
            secondary_feed_up: true,
            primary_feed_up: true,
            in_sequence: true,
            line_id: 0b10,
        };
        let word = build_status_word(&input);
        assert_eq!(word & 0xFF, 0);
        assert_eq!(word & (1 << 28), 1 << 28);
        assert_eq!(word & (1 << 29), 1 << 29);
        assert_eq!(word & (1 << 26), 1 << 26);
        assert_eq!(word & (1 << 27), 1 << 27);
        assert_eq!(word >> 30, 0b10);
    }

    #[test]
    fn status_word_sets_extreme_loss_bit_at_saturation() {
        let input = StatusWordInput {
            unrecoverable_messages: UNRECOVERABLE_MASK,
            ..Default::default()
        };
        let word = build_status_word(&input);
        assert_eq!(word & UNRECOVERABLE_MASK, UNRECOVERABLE_MASK);
        assert_eq!(word & (1 << 24), 1 << 24);
        assert_eq!(word & (1 << 28), 0);
    }

    #[derive(Default)]
    struct RecordingCapabilities {
        add_orders: Cell<u32>,
        sent: Cell<bool>,
    }

    impl FeedCapabilities for RecordingCapabilities {
        fn on_add_order(&self, _body: &MessageBody, _status: u32) {
            self.add_orders.set(self.add_orders.get() + 1);
        }
        fn send_message(&self, _buf: &[u8]) -> bool {
            self.sent.set(true);
            true
        }
    }

    #[test]
    fn null_capabilities_every_hook_is_a_no_op() {
        let caps = NullCapabilities;
        assert!(caps.lookup_symbol(1, 0).is_none());
        assert!(caps.init_message().is_none());
        assert!(caps.send_message(&[]));
        caps.msg_flush();
    }

    #[test]
    fn dispatch_calls_pack_hook_then_send_and_counts_success() {
        let caps = RecordingCapabilities::default();
        let facade = PublicationFacade::new(&caps);
        let mut symbol_table_error = 0u64;
        let mut firm_table_error = 0u64;
        let mut publication_failed = 0u64;
        let mut publication_succeeded = 0u64;
        let mut counters = PublishCounters {
            symbol_table_error: &mut symbol_table_error,
            firm_table_error: &mut firm_table_error,
            publication_failed: &mut publication_failed,
            publication_succeeded: &mut publication_succeeded,
        };
        let body = MessageBody::default();
        facade.publish_add_order(&body, 0, &mut counters).unwrap();
        assert_eq!(caps.add_orders.get(), 1);
        assert!(caps.sent.get());
        assert_eq!(publication_succeeded, 1);
        assert_eq!(publication_failed, 0);
    }

    #[test]
    fn lookup_miss_increments_table_error_and_returns_empty_string() {
        let caps = NullCapabilities;
        let facade = PublicationFacade::new(&caps);
        let mut symbol_table_error = 0u64;
        let mut firm_table_error = 0u64;
        let mut publication_failed = 0u64;
        let mut publication_succeeded = 0u64;
        let mut counters = PublishCounters {
            symbol_table_error: &mut symbol_table_error,
            firm_table_error: &mut firm_table_error,
            publication_failed: &mut publication_failed,
            publication_succeeded: &mut publication_succeeded,
        };
        let s = facade.resolve_symbol(7, 0, &mut counters);
        assert_eq!(s, "");
        assert_eq!(symbol_table_error, 1);
    }
}
