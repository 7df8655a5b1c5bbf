// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-packet orchestration (§4.E): header parse, heartbeat short-circuit,
//! arbiter consult, optional FAST decode, per-body parse loop, publish.

use crate::arbiter::{ArbiterEvent, Decision, Side};
use crate::codec::read_u16_be;
use crate::config;
use crate::fast;
use crate::feed_group::FeedGroup;
use crate::parser::{self, msg_type, MessageBody, PacketHeader};
use crate::publish::{build_status_word, PublicationFacade, PublishCounters, StatusWordInput};

/// Outcome of processing one packet, for tests and caller-side logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Header too short to parse; format-error counter advanced.
    RuntHeader,
    /// Type-2 heartbeat: dropped silently, no counters touched (§4.E point 2).
    Heartbeat,
    /// The arbiter judged this packet a duplicate of already-published data.
    Duplicate,
    /// Zero or more bodies were published; carries the count.
    Published(usize),
}

/// Working capacity of the uncompacted (FAST-expanded) buffer: four times
/// the max datagram size, per the `FeedGroup` data model's buffer sizing.
const UNCOMPACTED_CAPACITY: usize = config::PACKET_MAX * 4;

/// Multiplexed "orders" inner types (100-103): their layout constants
/// include the 2-byte type tag, unlike packet-scope types.
fn is_multiplexed(msg_type_value: u16) -> bool {
    matches!(
        msg_type_value,
        msg_type::ADD_ORDER | msg_type::MODIFY_ORDER | msg_type::DELETE_ORDER | msg_type::IMBALANCE
    )
}

fn header_size_for(msg_type_value: u16) -> usize {
    if msg_type_value == msg_type::BOOK_REFRESH {
        config::ARCAM_REFRESH_MSG_HDR_SIZE
    } else {
        config::ARCAM_MSG_HDR_SIZE
    }
}

/// Process one received datagram for `side`, consulting the arbiter,
/// optionally FAST-decoding, and publishing every well-formed body through
/// `facade`. Returns the outcome for the caller's own counters/logging.
pub fn process_packet<C: crate::publish::FeedCapabilities + ?Sized>(
    group: &mut FeedGroup,
    facade: &PublicationFacade<C>,
    side: Side,
    raw: &[u8],
) -> ProcessOutcome {
    let header = match PacketHeader::parse(raw) {
        Ok(h) => h,
        Err(_) => {
            group.stats.record_format_error(side);
            facade.alert_feed(0, status_word(group));
            return ProcessOutcome::RuntHeader;
        }
    };

    if header.msg_type == msg_type::HEARTBEAT {
        return ProcessOutcome::Heartbeat;
    }

    group.stats.record_packet(side, raw.len() as u64);

    let decision = if header.msg_type == msg_type::SEQUENCE_RESET {
        Decision::ResetAndPublish
    } else {
        let (decision, events) = group.arbiter.need_to_publish(side, u64::from(header.sequence));
        for event in events {
            emit_arbiter_event(group, facade, event);
        }
        decision
    };

    if decision == Decision::Duplicate {
        group.stats.record_duplicate(side);
        return ProcessOutcome::Duplicate;
    }

    let hdr_size = header_size_for(header.msg_type);
    if raw.len() < hdr_size {
        group.stats.record_format_error(side);
        return ProcessOutcome::RuntHeader;
    }
    let body_region = &raw[hdr_size..];

    let mut published = 0usize;
    if group.config.fast_mode {
        let mut scratch = [0u8; UNCOMPACTED_CAPACITY];
        published += decode_and_publish_fast(group, facade, side, header.num_bodies, body_region, &mut scratch);
    } else {
        published += publish_raw(group, facade, side, &header, body_region);
    }

    facade.flush();
    ProcessOutcome::Published(published)
}

fn emit_arbiter_event<C: crate::publish::FeedCapabilities + ?Sized>(
    group: &FeedGroup,
    facade: &PublicationFacade<C>,
    event: ArbiterEvent,
) {
    let status = status_word(group);
    match event {
        ArbiterEvent::PacketLoss { begin, end } => {
            facade.alert_packet_loss(begin as u32, end as u32, status);
        }
        ArbiterEvent::StateChange { in_sequence: _ } => {
            facade.alert_feed(1, status);
        }
    }
}

fn status_word(group: &FeedGroup) -> u32 {
    build_status_word(&StatusWordInput {
        unrecoverable_messages: group.arbiter.unrecoverable_messages.min(u32::MAX as u64) as u32,
        re_request_feed_up: false,
        secondary_feed_up: true,
        primary_feed_up: true,
        in_sequence: group.arbiter.in_sequence(),
        line_id: group.config.session_id & 0b11,
    })
}

fn counters(group: &mut FeedGroup) -> PublishCounters<'_> {
    PublishCounters {
        symbol_table_error: &mut group.symbol_table_error,
        firm_table_error: &mut group.firm_table_error,
        publication_failed: &mut group.publication_failed,
        publication_succeeded: &mut group.publication_succeeded,
    }
}

/// Dispatch one parsed [`MessageBody`] to its type-specific publication hook.
fn publish_body<C: crate::publish::FeedCapabilities + ?Sized>(
    group: &mut FeedGroup,
    facade: &PublicationFacade<C>,
    body: &MessageBody,
) -> bool {
    let status = status_word(group);
    let mut counters = counters(group);
    let result = match body.msg_type {
        msg_type::ADD_ORDER => facade.publish_add_order(body, status, &mut counters),
        msg_type::MODIFY_ORDER => facade.publish_modify_order(body, status, &mut counters),
        msg_type::DELETE_ORDER => facade.publish_delete_order(body, status, &mut counters),
        msg_type::IMBALANCE => facade.publish_imbalance(body, status, &mut counters),
        msg_type::TRADE => facade.publish_trade(body, status, &mut counters),
        msg_type::TRADE_CANCEL => facade.publish_trade_cancel(body, status, &mut counters),
        msg_type::TRADE_CORRECTION => facade.publish_trade_correction(body, status, &mut counters),
        msg_type::SYMBOL_MAPPING => facade.publish_symbol_mapping(body, status, &mut counters),
        msg_type::SYMBOL_CLEAR => facade.publish_symbol_clear(body, status, &mut counters),
        msg_type::FIRM_MAPPING => facade.publish_firm_mapping(body, status, &mut counters),
        msg_type::BOOK_REFRESH => facade.publish_book_refresh(body, status, &mut counters),
        msg_type::SEQUENCE_RESET => facade.publish_sequence_reset(body.next_seq_number, status, &mut counters),
        _ => return false,
    };
    result.is_ok()
}

/// Raw (non-FAST) body walk: a single packet-scope body dispatched by the
/// header's own type, or a multiplexed "orders" packet (type 99) whose
/// bodies each carry their own leading 2-byte type tag.
fn publish_raw<C: crate::publish::FeedCapabilities + ?Sized>(
    group: &mut FeedGroup,
    facade: &PublicationFacade<C>,
    side: Side,
    header: &PacketHeader,
    body_region: &[u8],
) -> usize {
    if header.msg_type != msg_type::ORDERS_MULTIPLEX {
        return match parser::parse_body(header.msg_type, body_region) {
            parser::ParseOutcome::Consumed(_, body) => {
                group.stats.record_messages(side, 1);
                usize::from(publish_body(group, facade, &body))
            }
            _ => {
                group.stats.record_format_error(side);
                0
            }
        };
    }

    let mut offset = 0usize;
    let mut published = 0usize;
    let mut remaining_bodies = header.num_bodies;
    while remaining_bodies > 0 && offset + 2 <= body_region.len() {
        let Ok(inner_type) = read_u16_be(body_region, offset) else {
            break;
        };
        match parser::parse_body(inner_type, &body_region[offset..]) {
            parser::ParseOutcome::Consumed(n, body) => {
                group.stats.record_messages(side, 1);
                if publish_body(group, facade, &body) {
                    published += 1;
                }
                offset += n;
            }
            _ => {
                group.stats.record_format_error(side);
                break;
            }
        }
        remaining_bodies -= 1;
    }
    published
}

/// FAST-mode body walk: reset the field-state table once per packet, then
/// iteratively decode each body into `scratch`, stopping at `num_bodies` or
/// the first decode error.
fn decode_and_publish_fast<C: crate::publish::FeedCapabilities + ?Sized>(
    group: &mut FeedGroup,
    facade: &PublicationFacade<C>,
    side: Side,
    num_bodies: u16,
    src: &[u8],
    scratch: &mut [u8],
) -> usize {
    group.fast_state.reset();
    let mut src_offset = 0usize;
    let mut published = 0usize;

    for _ in 0..num_bodies {
        if src_offset >= src.len() {
            break;
        }
        let decoded = match fast::decode_message(&mut group.fast_state, &src[src_offset..], scratch) {
            Ok(d) => d,
            Err(_) => {
                group.stats.record_format_error(side);
                break;
            }
        };
        src_offset += decoded.bytes_consumed;
        group.stats.record_messages(side, 1);

        // `bytes_written` is the high-water mark of what the FAST writer
        // actually touched; some layouts declare a minimum length past the
        // last field it ever sets (e.g. `FIRM_MAP_LEN`'s trailing padding),
        // so pad the slice out to the parser's declared minimum before
        // handing it off — the padding bytes are never read by `parse_body`.
        let min_len = if is_multiplexed(decoded.msg_type) {
            parser::min_body_len(decoded.msg_type)
        } else {
            2 + parser::min_body_len(decoded.msg_type)
        };
        let msg_buf = &scratch[..decoded.bytes_written.max(min_len).min(scratch.len())];
        let body_buf = if is_multiplexed(decoded.msg_type) {
            msg_buf
        } else if msg_buf.len() >= 2 {
            &msg_buf[2..]
        } else {
            group.stats.record_format_error(side);
            continue;
        };

        match parser::parse_body(decoded.msg_type, body_buf) {
            parser::ParseOutcome::Consumed(_, body) => {
                if publish_body(group, facade, &body) {
                    published += 1;
                }
            }
            _ => group.stats.record_format_error(side),
        }
    }
    published
}
