// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! FAST (FIX Adapted for STreaming) field-level decompressor.
//!
//! Expands a FAST-compacted message into the uncompacted byte layout the
//! binary parser ([`crate::parser`]) expects, using a 14-slot field-state
//! table and a presence map (pmap) of copy/increment operators.
//!
//! Implements the behavior of the newer of the two decoders found in the
//! teacher lineage (`newFastDecode.c`, not the older `AB_FastDecode.c`):
//! each field decodes into a local accumulator and the live state table is
//! only written back on success, so a mid-message error never leaves a
//! partially-updated state behind (§4.B/§9 of the design spec).

mod field;
mod pmap;

pub use field::{FastFieldState, FieldId, FieldOp, FieldValue};

use crate::codec::Cursor;
use std::fmt;

/// Result alias for FAST decode operations.
pub type FastResult<T> = Result<T, FastError>;

/// Structured FAST decode error. Variants carry enough context (offset,
/// field id) to log usefully without a panic on attacker-controlled input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FastError {
    /// Stream ended before a stop byte (pmap or field value) was seen.
    Incomplete { field: FieldId },
    /// A decoded field's value failed a local sanity check.
    InvalidField { field: FieldId },
    /// A COPY/INCR field's pmap bit was clear but its state slot is not valid.
    InvalidState { field: FieldId },
    /// The pmap itself was malformed (no stop byte, or MSG_TYPE bit unset).
    InvalidHeader,
    /// A decoded length disagreed with the bytes actually available.
    InvalidLength,
    /// The destination (uncompacted) buffer was too small for this message.
    BufferTooSmall,
    /// Unknown/unsupported message type for FAST decode.
    InvalidType { msg_type: u16 },
    /// Catch-all for conditions not covered by a more specific variant.
    General(&'static str),
}

impl fmt::Display for FastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FastError::Incomplete { field } => write!(f, "fast: incomplete stream at {field:?}"),
            FastError::InvalidField { field } => write!(f, "fast: invalid field {field:?}"),
            FastError::InvalidState { field } => {
                write!(f, "fast: invalid copy/incr state for {field:?}")
            }
            FastError::InvalidHeader => write!(f, "fast: malformed presence map"),
            FastError::InvalidLength => write!(f, "fast: length mismatch"),
            FastError::BufferTooSmall => write!(f, "fast: destination buffer too small"),
            FastError::InvalidType { msg_type } => write!(f, "fast: unknown message type {msg_type}"),
            FastError::General(msg) => write!(f, "fast: {msg}"),
        }
    }
}

impl std::error::Error for FastError {}

/// Maximum field count used to size the presence map (§4.B: `ceil((MAX_FIELD-1)/7)+1`).
const MAX_FIELD: usize = 14;
/// Maximum pmap length in bytes for this field count.
const PMAP_MAX_BYTES: usize = (MAX_FIELD.saturating_sub(1)).div_ceil(7) + 1;

/// A decoded presence map: which logical field positions were transmitted.
struct PresenceMap {
    bits: [bool; MAX_FIELD],
    bytes_consumed: usize,
}

/// Outcome of decoding one FAST message: the message type and the number of
/// source bytes consumed. The uncompacted bytes are written directly into
/// the caller-supplied destination buffer (matching the newer decoder's
/// behavior of expanding straight into the packet's replay buffer).
pub struct DecodedMessage {
    pub msg_type: u16,
    pub bytes_consumed: usize,
    pub bytes_written: usize,
}

/// Decode one FAST-compacted message from `src` into `dst`, using and
/// updating `state`. On any error, `state` is left exactly as it was before
/// the call (local-copy-then-commit-on-success, per §4.B).
pub fn decode_message(
    state: &mut FastFieldState,
    src: &[u8],
    dst: &mut [u8],
) -> FastResult<DecodedMessage> {
    let mut cursor = Cursor::new(src);
    let pmap = pmap::decode_pmap(&mut cursor)?;

    // Operate on a scratch copy; only the original is ever mutated, and only
    // once every field for this message has decoded successfully.
    let mut scratch = state.clone();
    let mut writer = field::MessageWriter::new(dst);

    let msg_type = field::decode_msg_type(&mut cursor, &pmap, &mut scratch, &mut writer)?;

    let order: &[FieldId] = field_order(msg_type);
    if order.is_empty() {
        // Unknown type: decode a single trailing bitmap into a raw tail.
        field::decode_bitmap_tail(&mut cursor, &pmap, &mut writer)?;
    } else {
        for (i, field_id) in order.iter().enumerate() {
            // Field position in the pmap is offset by 1 (slot 0 is MSG_TYPE).
            field::decode_field(*field_id, i + 1, &mut cursor, &pmap, &mut scratch, &mut writer, msg_type)?;
        }
    }

    *state = scratch;
    Ok(DecodedMessage {
        msg_type,
        bytes_consumed: cursor.offset(),
        bytes_written: writer.len(),
    })
}

/// Type-specific field order per §4.B. Field 0 (MSG_TYPE) is implicit and
/// not included here.
fn field_order(msg_type: u16) -> &'static [FieldId] {
    use FieldId::*;
    match msg_type {
        100 | 101 => &[
            StockIdx, Sequence, Time, OrderId, Volume, Price, PriceScale, BuySell, ExchId,
            SecurityType, FirmId, SessionId,
        ],
        102 => &[
            StockIdx, Sequence, Time, OrderId, BuySell, ExchId, SecurityType, SessionId, FirmId,
        ],
        103 => &[
            StockIdx, Sequence, Time, Volume, OrderId, Bitmap, Price, PriceScale, BuySell,
            ExchId, SecurityType, SessionId, FirmId,
        ],
        35 => &[StockIdx, SessionId, Bitmap],
        36 => &[Sequence, StockIdx, SessionId],
        37 => &[FirmId, Bitmap],
        32 => &[
            Sequence, Time, OrderId, Volume, Price, PriceScale, BuySell, ExchId, SecurityType,
            FirmId,
        ],
        1 => &[Sequence],
        _ => &[],
    }
}
