// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binary message-body parser, dispatched by message type.
//!
//! Given a message type and a byte slice, extracts fields at fixed offsets
//! in network order into a [`MessageBody`] — the discriminated record that
//! is the superset of fields across all ArcaBook/Arca-Trade message kinds.
//! Every parser enforces a declared minimum length (runt check) before
//! touching the buffer.

pub mod layout;
pub mod msg_type;

use crate::codec::{read_u16_be, read_u32_be, read_u8, CodecError};
use std::fmt;

/// Result alias for binary parser operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Structured binary-parser error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Buffer shorter than the declared minimum for this message type.
    Runt {
        msg_type: u16,
        declared_min: usize,
        available: usize,
    },
    /// No parser is registered for this message type.
    UnknownType { msg_type: u16 },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Runt {
                msg_type,
                declared_min,
                available,
            } => write!(
                f,
                "runt message type {msg_type}: needed {declared_min} bytes, {available} available"
            ),
            ParseError::UnknownType { msg_type } => {
                write!(f, "unknown message type {msg_type}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl From<CodecError> for ParseError {
    /// A codec truncation inside a parser that already passed its own runt
    /// check indicates a logic error in the layout table, not bad wire data;
    /// surfaced as a generic runt against the accessed offset regardless.
    fn from(_: CodecError) -> Self {
        ParseError::Runt {
            msg_type: 0,
            declared_min: 0,
            available: 0,
        }
    }
}

/// Discriminated record carrying the superset of fields across all message
/// kinds (§3 `MessageBody`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBody {
    pub msg_type: u16,
    pub msg_seq_num: u32,
    pub source_seq_num: u32,
    pub source_time: u32,
    pub order_id: u32,
    pub volume: u32,
    pub price: u32,
    pub price_numerator: u32,
    pub price_scale_code: u8,
    pub side: u8,
    pub exchange_id: u8,
    pub security_type: u8,
    pub firm_index: u16,
    pub session_id: u8,
    pub symbol_index: u16,
    pub symbol: [u8; 17],
    pub firm: [u8; 6],
    pub total_imbalance: u32,
    pub market_imbalance: u32,
    pub next_seq_number: u32,
    pub begin_seq_number: u32,
    pub end_seq_number: u32,
    pub auction_type: u8,
    pub auction_time: u32,
    pub buy_side_link_id: u32,
    pub sell_side_link_id: u32,
    pub quote_link_id: u32,
    pub original_src_seq_num: u32,
    pub trade_condition: [u8; 4],
    pub primary_or_secondary: u8,
    pub alert_type: u8,
    pub status: u32,
}

/// Convert a FAST/wire `(scale, value)` pair to a fixed-point integer:
/// `value * 10^(6-scale)` for `scale < 6`, identity at `scale == 6` (§4.C).
pub fn make_price(scale: u8, value: u32) -> u64 {
    if scale >= 6 {
        return value as u64;
    }
    let exp = 6 - scale as u32;
    (value as u64) * 10u64.pow(exp)
}

/// Outcome of dispatching one body: number of bytes consumed, or the two
/// sentinels defined by §4.C (`0` = runt, `1` = unknown body type inside an
/// otherwise-valid orders packet).
pub enum ParseOutcome {
    Consumed(usize, MessageBody),
    Runt,
    UnknownBodyType,
}

/// Parse one message body given its type and the byte slice starting at the
/// body (for multiplexed orders types 100-103, `buf` includes the type's own
/// leading 2 bytes; for packet-scope types it does not — see
/// [`layout`]).
pub fn parse_body(msg_type: u16, buf: &[u8]) -> ParseOutcome {
    match msg_type {
        msg_type::SEQUENCE_RESET => parse_sequence_reset(buf),
        msg_type::MESSAGE_UNAVAILABLE => parse_message_unavailable(buf),
        msg_type::SYMBOL_CLEAR => parse_symbol_clear(buf),
        msg_type::SYMBOL_MAPPING => parse_symbol_mapping(buf),
        msg_type::FIRM_MAPPING => parse_firm_mapping(buf),
        msg_type::IMBALANCE_REFRESH => parse_imbalance_refresh(buf),
        msg_type::BOOK_REFRESH => parse_book_refresh(buf),
        msg_type::ADD_ORDER | msg_type::MODIFY_ORDER => parse_order(msg_type, buf),
        msg_type::DELETE_ORDER => parse_delete_order(buf),
        msg_type::IMBALANCE => parse_imbalance(buf),
        msg_type::TRADE => parse_trade(buf),
        msg_type::TRADE_CANCEL => parse_trade_cancel(buf),
        msg_type::TRADE_CORRECTION => parse_trade_correction(buf),
        _ => ParseOutcome::UnknownBodyType,
    }
}

/// The same declared-minimum length each `parse_*` function's `runt_check!`
/// enforces, looked up without attempting a parse. Lets a caller that
/// assembles a body buffer itself (the FAST decoder's reconstruction path)
/// size it correctly, since some layouts reserve trailing bytes past the
/// last field `parse_body` ever reads (e.g. `FIRM_MAP_LEN`'s padding after
/// the 6-byte firm symbol). Returns 0 for message types `parse_body` doesn't
/// recognize.
pub(crate) fn min_body_len(msg_type: u16) -> usize {
    match msg_type {
        msg_type::SEQUENCE_RESET => layout::SEQ_RESET_LEN,
        msg_type::MESSAGE_UNAVAILABLE => layout::MSG_UNAVAIL_LEN,
        msg_type::SYMBOL_CLEAR => layout::SYMBOL_CLEAR_LEN,
        msg_type::SYMBOL_MAPPING => layout::SYMBOL_MAP_LEN,
        msg_type::FIRM_MAPPING => layout::FIRM_MAP_LEN,
        msg_type::IMBALANCE_REFRESH => layout::IMBALANCE_REFRESH_LEN,
        msg_type::BOOK_REFRESH => layout::BOOK_REFRESH_LEN,
        msg_type::ADD_ORDER | msg_type::MODIFY_ORDER => layout::ORDER_LEN,
        msg_type::DELETE_ORDER => layout::DELETE_LEN,
        msg_type::IMBALANCE => layout::IMBALANCE_LEN,
        msg_type::TRADE => layout::TRADE_LEN,
        msg_type::TRADE_CANCEL => layout::TRADE_CANCEL_LEN,
        msg_type::TRADE_CORRECTION => layout::TRADE_CORRECTION_LEN,
        _ => 0,
    }
}

macro_rules! runt_check {
    ($buf:expr, $min:expr) => {
        if $buf.len() < $min {
            return ParseOutcome::Runt;
        }
    };
}

fn parse_sequence_reset(buf: &[u8]) -> ParseOutcome {
    runt_check!(buf, layout::SEQ_RESET_LEN);
    let mut body = MessageBody {
        msg_type: msg_type::SEQUENCE_RESET,
        ..Default::default()
    };
    body.next_seq_number = read_u32_be(buf, layout::SEQ_RESET_NEXT_SEQ).unwrap();
    ParseOutcome::Consumed(layout::SEQ_RESET_LEN, body)
}

fn parse_message_unavailable(buf: &[u8]) -> ParseOutcome {
    runt_check!(buf, layout::MSG_UNAVAIL_LEN);
    let mut body = MessageBody {
        msg_type: msg_type::MESSAGE_UNAVAILABLE,
        ..Default::default()
    };
    body.begin_seq_number = read_u32_be(buf, layout::MSG_UNAVAIL_BEGIN_SEQ).unwrap();
    body.end_seq_number = read_u32_be(buf, layout::MSG_UNAVAIL_END_SEQ).unwrap();
    ParseOutcome::Consumed(layout::MSG_UNAVAIL_LEN, body)
}

fn parse_symbol_clear(buf: &[u8]) -> ParseOutcome {
    runt_check!(buf, layout::SYMBOL_CLEAR_LEN);
    let mut body = MessageBody {
        msg_type: msg_type::SYMBOL_CLEAR,
        ..Default::default()
    };
    body.msg_seq_num = read_u32_be(buf, layout::SYMBOL_CLEAR_SEQUENCE).unwrap();
    body.symbol_index = read_u16_be(buf, layout::SYMBOL_CLEAR_SYMBOL_INDEX).unwrap();
    body.session_id = read_u8(buf, layout::SYMBOL_CLEAR_SESSION_ID).unwrap();
    ParseOutcome::Consumed(layout::SYMBOL_CLEAR_LEN, body)
}

fn parse_symbol_mapping(buf: &[u8]) -> ParseOutcome {
    runt_check!(buf, layout::SYMBOL_MAP_LEN);
    let mut body = MessageBody {
        msg_type: msg_type::SYMBOL_MAPPING,
        ..Default::default()
    };
    body.symbol_index = read_u16_be(buf, layout::SYMBOL_MAP_SYMBOL_INDEX).unwrap();
    body.session_id = read_u8(buf, layout::SYMBOL_MAP_SESSION_ID).unwrap();
    body.symbol[..16].copy_from_slice(&buf[layout::SYMBOL_MAP_SYMBOL..layout::SYMBOL_MAP_SYMBOL + 16]);
    ParseOutcome::Consumed(layout::SYMBOL_MAP_LEN, body)
}

fn parse_firm_mapping(buf: &[u8]) -> ParseOutcome {
    runt_check!(buf, layout::FIRM_MAP_LEN);
    let mut body = MessageBody {
        msg_type: msg_type::FIRM_MAPPING,
        ..Default::default()
    };
    body.firm_index = read_u16_be(buf, layout::FIRM_MAP_FIRM_INDEX).unwrap();
    body.firm.copy_from_slice(&buf[layout::FIRM_MAP_FIRM..layout::FIRM_MAP_FIRM + 6]);
    ParseOutcome::Consumed(layout::FIRM_MAP_LEN, body)
}

fn parse_imbalance_refresh(buf: &[u8]) -> ParseOutcome {
    runt_check!(buf, layout::IMBALANCE_REFRESH_LEN);
    let mut body = MessageBody {
        msg_type: msg_type::IMBALANCE_REFRESH,
        ..Default::default()
    };
    body.msg_seq_num = read_u32_be(buf, layout::IMBALANCE_REFRESH_SEQUENCE).unwrap();
    body.source_time = read_u32_be(buf, layout::IMBALANCE_REFRESH_TIME).unwrap();
    body.symbol_index = read_u16_be(buf, layout::IMBALANCE_REFRESH_SYMBOL_INDEX).unwrap();
    body.session_id = read_u8(buf, layout::IMBALANCE_REFRESH_SESSION_ID).unwrap();
    body.exchange_id = read_u8(buf, layout::IMBALANCE_REFRESH_EXCH_ID).unwrap();
    body.total_imbalance = read_u32_be(buf, layout::IMBALANCE_REFRESH_TOTAL_IMBALANCE).unwrap();
    body.market_imbalance = read_u32_be(buf, layout::IMBALANCE_REFRESH_MARKET_IMBALANCE).unwrap();
    body.price_numerator = read_u32_be(buf, layout::IMBALANCE_REFRESH_PRICE).unwrap();
    body.price_scale_code = read_u8(buf, layout::IMBALANCE_REFRESH_PRICE_SCALE).unwrap();
    body.auction_type = read_u8(buf, layout::IMBALANCE_REFRESH_AUCTION_TYPE).unwrap();
    body.security_type = read_u8(buf, layout::IMBALANCE_REFRESH_SECURITY_TYPE).unwrap();
    body.auction_time = read_u32_be(buf, layout::IMBALANCE_REFRESH_AUCTION_TIME).unwrap();
    body.price = make_price(body.price_scale_code, body.price_numerator) as u32;
    ParseOutcome::Consumed(layout::IMBALANCE_REFRESH_LEN, body)
}

fn parse_book_refresh(buf: &[u8]) -> ParseOutcome {
    runt_check!(buf, layout::BOOK_REFRESH_LEN);
    let mut body = MessageBody {
        msg_type: msg_type::BOOK_REFRESH,
        ..Default::default()
    };
    body.order_id = read_u32_be(buf, layout::BOOK_REFRESH_ORDER_ID).unwrap();
    body.volume = read_u32_be(buf, layout::BOOK_REFRESH_VOLUME).unwrap();
    body.price_numerator = read_u32_be(buf, layout::BOOK_REFRESH_PRICE).unwrap();
    body.price_scale_code = read_u8(buf, layout::BOOK_REFRESH_PRICE_SCALE).unwrap();
    body.side = read_u8(buf, layout::BOOK_REFRESH_BUY_SELL).unwrap();
    body.exchange_id = read_u8(buf, layout::BOOK_REFRESH_EXCH_ID).unwrap();
    body.security_type = read_u8(buf, layout::BOOK_REFRESH_SECURITY_TYPE).unwrap();
    body.firm_index = read_u16_be(buf, layout::BOOK_REFRESH_FIRM_INDEX).unwrap();
    body.session_id = read_u8(buf, layout::BOOK_REFRESH_SESSION_ID).unwrap();
    body.source_time = read_u32_be(buf, layout::BOOK_REFRESH_TIME).unwrap();
    body.msg_seq_num = read_u32_be(buf, layout::BOOK_REFRESH_SEQUENCE).unwrap();
    body.price = make_price(body.price_scale_code, body.price_numerator) as u32;
    ParseOutcome::Consumed(layout::BOOK_REFRESH_LEN, body)
}

fn parse_order(msg_type_value: u16, buf: &[u8]) -> ParseOutcome {
    runt_check!(buf, layout::ORDER_LEN);
    let mut body = MessageBody {
        msg_type: msg_type_value,
        ..Default::default()
    };
    body.symbol_index = read_u16_be(buf, layout::ORDER_STOCK_IDX).unwrap();
    body.msg_seq_num = read_u32_be(buf, layout::ORDER_SEQUENCE).unwrap();
    body.source_time = read_u32_be(buf, layout::ORDER_TIME).unwrap();
    body.order_id = read_u32_be(buf, layout::ORDER_ORDER_ID).unwrap();
    body.volume = read_u32_be(buf, layout::ORDER_VOLUME).unwrap();
    body.price_numerator = read_u32_be(buf, layout::ORDER_PRICE).unwrap();
    body.price_scale_code = read_u8(buf, layout::ORDER_PRICE_SCALE).unwrap();
    body.side = read_u8(buf, layout::ORDER_BUY_SELL).unwrap();
    body.exchange_id = read_u8(buf, layout::ORDER_EXCH_ID).unwrap();
    body.security_type = read_u8(buf, layout::ORDER_SECURITY_TYPE).unwrap();
    body.firm_index = read_u16_be(buf, layout::ORDER_FIRM_ID).unwrap();
    body.session_id = read_u8(buf, layout::ORDER_SESSION_ID).unwrap();
    body.price = make_price(body.price_scale_code, body.price_numerator) as u32;
    ParseOutcome::Consumed(layout::ORDER_LEN, body)
}

fn parse_delete_order(buf: &[u8]) -> ParseOutcome {
    runt_check!(buf, layout::DELETE_LEN);
    let mut body = MessageBody {
        msg_type: msg_type::DELETE_ORDER,
        ..Default::default()
    };
    body.symbol_index = read_u16_be(buf, layout::DELETE_STOCK_IDX).unwrap();
    body.msg_seq_num = read_u32_be(buf, layout::DELETE_SEQUENCE).unwrap();
    body.source_time = read_u32_be(buf, layout::DELETE_TIME).unwrap();
    body.order_id = read_u32_be(buf, layout::DELETE_ORDER_ID).unwrap();
    body.side = read_u8(buf, layout::DELETE_BUY_SELL).unwrap();
    body.exchange_id = read_u8(buf, layout::DELETE_EXCH_ID).unwrap();
    body.security_type = read_u8(buf, layout::DELETE_SECURITY_TYPE).unwrap();
    body.session_id = read_u8(buf, layout::DELETE_SESSION_ID).unwrap();
    body.firm_index = read_u16_be(buf, layout::DELETE_FIRM_ID).unwrap();
    ParseOutcome::Consumed(layout::DELETE_LEN, body)
}

fn parse_imbalance(buf: &[u8]) -> ParseOutcome {
    runt_check!(buf, layout::IMBALANCE_LEN);
    let mut body = MessageBody {
        msg_type: msg_type::IMBALANCE,
        ..Default::default()
    };
    body.symbol_index = read_u16_be(buf, layout::IMBALANCE_STOCK_IDX).unwrap();
    body.msg_seq_num = read_u32_be(buf, layout::IMBALANCE_SEQUENCE).unwrap();
    body.source_time = read_u32_be(buf, layout::IMBALANCE_TIME).unwrap();
    body.volume = read_u32_be(buf, layout::IMBALANCE_VOLUME).unwrap();
    body.total_imbalance = read_u32_be(buf, layout::IMBALANCE_TOTAL_IMBALANCE).unwrap();
    body.market_imbalance = read_u32_be(buf, layout::IMBALANCE_MARKET_IMBALANCE).unwrap();
    body.price_numerator = read_u32_be(buf, layout::IMBALANCE_PRICE).unwrap();
    body.price_scale_code = read_u8(buf, layout::IMBALANCE_PRICE_SCALE).unwrap();
    body.auction_type = read_u8(buf, layout::IMBALANCE_AUCTION_TYPE).unwrap();
    body.exchange_id = read_u8(buf, layout::IMBALANCE_EXCH_ID).unwrap();
    body.security_type = read_u8(buf, layout::IMBALANCE_SECURITY_TYPE).unwrap();
    body.session_id = read_u8(buf, layout::IMBALANCE_SESSION_ID).unwrap();
    body.auction_time = u32::from(read_u16_be(buf, layout::IMBALANCE_AUCTION_TIME).unwrap());
    body.price = make_price(body.price_scale_code, body.price_numerator) as u32;
    ParseOutcome::Consumed(layout::IMBALANCE_LEN, body)
}

fn parse_trade(buf: &[u8]) -> ParseOutcome {
    runt_check!(buf, layout::TRADE_LEN);
    let mut body = MessageBody {
        msg_type: msg_type::TRADE,
        ..Default::default()
    };
    body.source_seq_num = read_u32_be(buf, layout::TRADE_SEQUENCE).unwrap();
    body.source_time = read_u32_be(buf, layout::TRADE_TIME).unwrap();
    body.symbol_index = read_u16_be(buf, layout::TRADE_SYMBOL_INDEX).unwrap();
    body.session_id = read_u8(buf, layout::TRADE_SESSION_ID).unwrap();
    body.exchange_id = read_u8(buf, layout::TRADE_EXCH_ID).unwrap();
    body.order_id = read_u32_be(buf, layout::TRADE_ORDER_ID).unwrap();
    body.volume = read_u32_be(buf, layout::TRADE_VOLUME).unwrap();
    body.price_numerator = read_u32_be(buf, layout::TRADE_PRICE).unwrap();
    body.price_scale_code = read_u8(buf, layout::TRADE_PRICE_SCALE).unwrap();
    body.security_type = read_u8(buf, layout::TRADE_SECURITY_TYPE).unwrap();
    body.trade_condition = [
        read_u8(buf, layout::TRADE_COND1).unwrap(),
        read_u8(buf, layout::TRADE_COND2).unwrap(),
        read_u8(buf, layout::TRADE_COND3).unwrap(),
        read_u8(buf, layout::TRADE_COND4).unwrap(),
    ];
    body.primary_or_secondary = read_u8(buf, layout::TRADE_PRIMARY_OR_SECONDARY).unwrap();
    body.buy_side_link_id = read_u32_be(buf, layout::TRADE_BUY_LINK).unwrap();
    body.sell_side_link_id = read_u32_be(buf, layout::TRADE_SELL_LINK).unwrap();
    body.quote_link_id = read_u32_be(buf, layout::TRADE_QUOTE_LINK).unwrap();
    body.original_src_seq_num = read_u32_be(buf, layout::TRADE_ORIG_SRC_SEQ).unwrap();
    body.price = make_price(body.price_scale_code, body.price_numerator) as u32;
    ParseOutcome::Consumed(layout::TRADE_LEN, body)
}

fn parse_trade_cancel(buf: &[u8]) -> ParseOutcome {
    runt_check!(buf, layout::TRADE_CANCEL_LEN);
    let mut body = MessageBody {
        msg_type: msg_type::TRADE_CANCEL,
        ..Default::default()
    };
    body.source_seq_num = read_u32_be(buf, layout::TRADE_CANCEL_SEQUENCE).unwrap();
    body.source_time = read_u32_be(buf, layout::TRADE_CANCEL_TIME).unwrap();
    body.symbol_index = read_u16_be(buf, layout::TRADE_CANCEL_SYMBOL_INDEX).unwrap();
    body.session_id = read_u8(buf, layout::TRADE_CANCEL_SESSION_ID).unwrap();
    body.exchange_id = read_u8(buf, layout::TRADE_CANCEL_EXCH_ID).unwrap();
    body.order_id = read_u32_be(buf, layout::TRADE_CANCEL_ORDER_ID).unwrap();
    body.volume = read_u32_be(buf, layout::TRADE_CANCEL_VOLUME).unwrap();
    body.price_numerator = read_u32_be(buf, layout::TRADE_CANCEL_PRICE).unwrap();
    body.price_scale_code = read_u8(buf, layout::TRADE_CANCEL_PRICE_SCALE).unwrap();
    body.security_type = read_u8(buf, layout::TRADE_CANCEL_SECURITY_TYPE).unwrap();
    body.original_src_seq_num = read_u32_be(buf, layout::TRADE_CANCEL_ORIG_SRC_SEQ).unwrap();
    body.price = make_price(body.price_scale_code, body.price_numerator) as u32;
    ParseOutcome::Consumed(layout::TRADE_CANCEL_LEN, body)
}

fn parse_trade_correction(buf: &[u8]) -> ParseOutcome {
    runt_check!(buf, layout::TRADE_CORRECTION_LEN);
    let mut body = MessageBody {
        msg_type: msg_type::TRADE_CORRECTION,
        ..Default::default()
    };
    body.source_seq_num = read_u32_be(buf, layout::TRADE_CORRECTION_SEQUENCE).unwrap();
    body.source_time = read_u32_be(buf, layout::TRADE_CORRECTION_TIME).unwrap();
    body.symbol_index = read_u16_be(buf, layout::TRADE_CORRECTION_SYMBOL_INDEX).unwrap();
    body.session_id = read_u8(buf, layout::TRADE_CORRECTION_SESSION_ID).unwrap();
    body.exchange_id = read_u8(buf, layout::TRADE_CORRECTION_EXCH_ID).unwrap();
    body.order_id = read_u32_be(buf, layout::TRADE_CORRECTION_ORDER_ID).unwrap();
    body.volume = read_u32_be(buf, layout::TRADE_CORRECTION_VOLUME).unwrap();
    body.price_numerator = read_u32_be(buf, layout::TRADE_CORRECTION_PRICE).unwrap();
    body.price_scale_code = read_u8(buf, layout::TRADE_CORRECTION_PRICE_SCALE).unwrap();
    body.security_type = read_u8(buf, layout::TRADE_CORRECTION_SECURITY_TYPE).unwrap();
    body.trade_condition = [
        read_u8(buf, layout::TRADE_CORRECTION_COND1).unwrap(),
        read_u8(buf, layout::TRADE_CORRECTION_COND2).unwrap(),
        read_u8(buf, layout::TRADE_CORRECTION_COND3).unwrap(),
        read_u8(buf, layout::TRADE_CORRECTION_COND4).unwrap(),
    ];
    body.primary_or_secondary = read_u8(buf, layout::TRADE_CORRECTION_PRIMARY_OR_SECONDARY).unwrap();
    body.buy_side_link_id = read_u32_be(buf, layout::TRADE_CORRECTION_BUY_LINK).unwrap();
    body.sell_side_link_id = read_u32_be(buf, layout::TRADE_CORRECTION_SELL_LINK).unwrap();
    body.quote_link_id = read_u32_be(buf, layout::TRADE_CORRECTION_QUOTE_LINK).unwrap();
    body.original_src_seq_num = read_u32_be(buf, layout::TRADE_CORRECTION_ORIG_SRC_SEQ).unwrap();
    body.price = make_price(body.price_scale_code, body.price_numerator) as u32;
    ParseOutcome::Consumed(layout::TRADE_CORRECTION_LEN, body)
}

/// Packet header (§3 `PacketHeader`): fixed 16-byte short form, big-endian.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketHeader {
    pub size: u16,
    pub msg_type: u16,
    pub sequence: u32,
    pub send_time: u32,
    pub product_id: u8,
    pub retrans_flag: u8,
    pub num_bodies: u16,
}

impl PacketHeader {
    pub fn parse(buf: &[u8]) -> ParseResult<Self> {
        if buf.len() < crate::config::ARCAM_MSG_HDR_SIZE {
            return Err(ParseError::Runt {
                msg_type: 0,
                declared_min: crate::config::ARCAM_MSG_HDR_SIZE,
                available: buf.len(),
            });
        }
        Ok(Self {
            size: read_u16_be(buf, crate::config::MSG_SIZE_OFFSET).unwrap(),
            msg_type: read_u16_be(buf, crate::config::MSG_TYPE_OFFSET).unwrap(),
            sequence: read_u32_be(buf, crate::config::MSG_NUM_OFFSET).unwrap(),
            send_time: read_u32_be(buf, crate::config::SEND_TIME_OFFSET).unwrap(),
            product_id: read_u8(buf, crate::config::PRODUCT_ID_OFFSET).unwrap(),
            retrans_flag: read_u8(buf, crate::config::RETRANS_FLAG_OFFSET).unwrap(),
            num_bodies: read_u16_be(buf, crate::config::NUM_BODIES_OFFSET).unwrap(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_price_matches_scale_formula() {
        assert_eq!(make_price(0, 5), 5_000_000);
        assert_eq!(make_price(2, 500), 5_000_000);
        assert_eq!(make_price(6, 42), 42);
    }

    #[test]
    fn sequence_reset_runt_boundary() {
        let short = [0u8; 3];
        assert!(matches!(parse_body(msg_type::SEQUENCE_RESET, &short), ParseOutcome::Runt));
        let exact = [0u8, 0, 0, 7];
        match parse_body(msg_type::SEQUENCE_RESET, &exact) {
            ParseOutcome::Consumed(n, body) => {
                assert_eq!(n, 4);
                assert_eq!(body.next_seq_number, 7);
            }
            _ => panic!("expected Consumed"),
        }
    }

    #[test]
    fn add_order_roundtrip_fields() {
        let mut buf = [0u8; layout::ORDER_LEN];
        buf[0..2].copy_from_slice(&100u16.to_be_bytes());
        buf[layout::ORDER_STOCK_IDX..layout::ORDER_STOCK_IDX + 2].copy_from_slice(&7u16.to_be_bytes());
        buf[layout::ORDER_SEQUENCE..layout::ORDER_SEQUENCE + 4].copy_from_slice(&42u32.to_be_bytes());
        buf[layout::ORDER_ORDER_ID..layout::ORDER_ORDER_ID + 4].copy_from_slice(&999u32.to_be_bytes());
        buf[layout::ORDER_VOLUME..layout::ORDER_VOLUME + 4].copy_from_slice(&100u32.to_be_bytes());
        buf[layout::ORDER_PRICE..layout::ORDER_PRICE + 4].copy_from_slice(&12345u32.to_be_bytes());
        buf[layout::ORDER_PRICE_SCALE] = 2;
        buf[layout::ORDER_BUY_SELL] = b'B';

        match parse_body(msg_type::ADD_ORDER, &buf) {
            ParseOutcome::Consumed(n, body) => {
                assert_eq!(n, layout::ORDER_LEN);
                assert_eq!(body.symbol_index, 7);
                assert_eq!(body.msg_seq_num, 42);
                assert_eq!(body.order_id, 999);
                assert_eq!(body.volume, 100);
                assert_eq!(body.side, b'B');
                assert_eq!(body.price, make_price(2, 12345) as u32);
            }
            _ => panic!("expected Consumed"),
        }
    }

    #[test]
    fn add_order_one_byte_short_is_runt() {
        let buf = [0u8; layout::ORDER_LEN - 1];
        assert!(matches!(parse_body(msg_type::ADD_ORDER, &buf), ParseOutcome::Runt));
    }

    #[test]
    fn delete_order_boundary() {
        let short = [0u8; layout::DELETE_LEN - 1];
        assert!(matches!(parse_body(msg_type::DELETE_ORDER, &short), ParseOutcome::Runt));
        let exact = [0u8; layout::DELETE_LEN];
        assert!(matches!(parse_body(msg_type::DELETE_ORDER, &exact), ParseOutcome::Consumed(n, _) if n == layout::DELETE_LEN));
    }

    #[test]
    fn trade_correction_boundary() {
        let short = [0u8; layout::TRADE_CORRECTION_LEN - 1];
        assert!(matches!(parse_body(msg_type::TRADE_CORRECTION, &short), ParseOutcome::Runt));
        let exact = [0u8; layout::TRADE_CORRECTION_LEN];
        assert!(matches!(
            parse_body(msg_type::TRADE_CORRECTION, &exact),
            ParseOutcome::Consumed(n, _) if n == layout::TRADE_CORRECTION_LEN
        ));
    }

    #[test]
    fn unknown_type_reports_unknown_body_type() {
        let buf = [0u8; 64];
        assert!(matches!(parse_body(9999, &buf), ParseOutcome::UnknownBodyType));
    }

    #[test]
    fn book_refresh_exact_minimum() {
        let buf = [0u8; layout::BOOK_REFRESH_LEN];
        assert!(matches!(
            parse_body(msg_type::BOOK_REFRESH, &buf),
            ParseOutcome::Consumed(n, _) if n == layout::BOOK_REFRESH_LEN
        ));
    }

    #[test]
    fn packet_header_parses_16_bytes() {
        let mut buf = [0u8; 16];
        buf[0..2].copy_from_slice(&100u16.to_be_bytes());
        buf[2..4].copy_from_slice(&32u16.to_be_bytes());
        buf[4..8].copy_from_slice(&55u32.to_be_bytes());
        let header = PacketHeader::parse(&buf).unwrap();
        assert_eq!(header.size, 100);
        assert_eq!(header.msg_type, 32);
        assert_eq!(header.sequence, 55);
    }

    #[test]
    fn packet_header_runt() {
        let buf = [0u8; 15];
        assert!(PacketHeader::parse(&buf).is_err());
    }
}
