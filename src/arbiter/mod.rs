// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dual-feed sequence arbiter: duplicate and gap detection across a
//! primary/secondary multicast pair.
//!
//! ```text
//!                 seq == my_expected
//!        +-----------------------------+
//!        |                             v
//!  +-----------+   gap opens     +----------------+
//!  | InSequence| --------------> | OutOfSequence  |
//!  +-----------+                 +----------------+
//!        ^                             |
//!        |   window empty /            |
//!        +-- window overrun -----------+
//! ```
//!
//! The fast path (in-sequence) is the lowest-latency path and touches only
//! the two expected-sequence cursors. The slow path (out-of-sequence)
//! additionally consults the bounded [`MissingWindow`](missing_window::MissingWindow).

pub mod missing_window;

use crate::config::MISSING_RANGE;
use missing_window::MissingWindow;

/// Which half of a mirrored feed pair a packet arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Primary,
    Secondary,
}

/// Outcome of a single arbiter consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Publish this packet's bodies.
    Publish,
    /// Drop silently: already published by this or the other side.
    Duplicate,
    /// A sequence-number-reset message; bypasses ordering entirely.
    ResetAndPublish,
}

/// Side effects of an arbiter consultation that the publication facade
/// needs to turn into alerts. Distinct from the [`Decision`] itself because
/// a single consultation on the slow path can both declare a loss *and*
/// return `Publish` for the triggering packet (the window-overrun
/// fallthrough in case 1 of the slow path).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterEvent {
    /// `[begin, end]` inclusive range of sequence numbers declared
    /// permanently unrecoverable.
    PacketLoss { begin: u64, end: u64 },
    /// The line's in-sequence/out-of-sequence state changed.
    StateChange { in_sequence: bool },
}

/// Per-line duplicate/gap arbiter for a primary/secondary feed pair.
pub struct Arbiter {
    primary_expected: u64,
    secondary_expected: u64,
    in_sequence: bool,
    window: MissingWindow,
    pub missing_packet_incidence: u64,
    pub missing_message_range: u64,
    pub packets_lost_incidence: u64,
    pub unrecoverable_messages: u64,
    pub loss_of_in_sequence: u64,
    pub restoral_of_in_sequence: u64,
}

impl Default for Arbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Arbiter {
    pub fn new() -> Self {
        Self {
            primary_expected: 0,
            secondary_expected: 0,
            in_sequence: true,
            window: MissingWindow::new(),
            missing_packet_incidence: 0,
            missing_message_range: 0,
            packets_lost_incidence: 0,
            unrecoverable_messages: 0,
            loss_of_in_sequence: 0,
            restoral_of_in_sequence: 0,
        }
    }

    pub fn in_sequence(&self) -> bool {
        self.in_sequence
    }

    pub fn missing_window(&self) -> &MissingWindow {
        &self.window
    }

    fn set_in_sequence(&mut self, now: bool, events: &mut Vec<ArbiterEvent>) {
        if self.in_sequence != now {
            self.in_sequence = now;
            if now {
                self.restoral_of_in_sequence += 1;
            } else {
                self.loss_of_in_sequence += 1;
            }
            events.push(ArbiterEvent::StateChange { in_sequence: now });
        }
    }

    /// The in-sequence transition into a gap: clears and (re)seeds the
    /// missing-window, declaring a permanent-loss prefix if the gap is
    /// wider than the window can track. Ground: `first_gap()` in
    /// `seq_handling.c`.
    fn first_gap(&mut self, gap_size: u64, seq_number: u64, most_advanced: u64, events: &mut Vec<ArbiterEvent>) {
        self.missing_packet_incidence += 1;
        self.missing_message_range += gap_size;
        self.window.clear();

        if gap_size > MISSING_RANGE {
            let mut new_gap_start = seq_number.saturating_sub(MISSING_RANGE / 2);
            if new_gap_start < most_advanced {
                new_gap_start = most_advanced;
            }
            let mut new_gap_size = seq_number - new_gap_start;
            if new_gap_size < gap_size {
                new_gap_size = gap_size;
            }
            if gap_size > new_gap_size {
                let loss_gap_size = new_gap_start - most_advanced;
                self.packets_lost_incidence += 1;
                self.unrecoverable_messages += loss_gap_size;
                events.push(ArbiterEvent::PacketLoss {
                    begin: most_advanced,
                    end: most_advanced + loss_gap_size - 1,
                });
            }
            return;
        }

        self.window.add_range(most_advanced, gap_size as u32);
        self.set_in_sequence(false, events);
    }

    /// A gap opening while already out-of-sequence. Ground: `second_gap()`
    /// in `seq_handling.c`. Always resolves to `Publish` for the triggering
    /// packet (matches the original's `return 1` on both branches).
    fn second_gap(&mut self, gap_size: u64, seq_number: u64, most_advanced: u64, events: &mut Vec<ArbiterEvent>) {
        self.missing_packet_incidence += 1;
        self.missing_message_range += gap_size;

        if seq_number < self.window.base() + MISSING_RANGE {
            self.window.add_range(most_advanced, gap_size as u32);
            return;
        }

        let new_gap_start = seq_number.saturating_sub(MISSING_RANGE / 2);
        events.push(ArbiterEvent::PacketLoss {
            begin: self.window.lowest(),
            end: seq_number - 1,
        });
        self.window.clear();
        let new_gap_size = seq_number - new_gap_start;
        self.window.add_range(new_gap_start, new_gap_size as u32);
    }

    /// Consult the arbiter for one packet's header sequence number. Called
    /// once per packet, never per message body. A type-1 (sequence-reset)
    /// message bypasses this entirely at the caller (§4.D) and is always
    /// `ResetAndPublish`.
    pub fn need_to_publish(&mut self, side: Side, seq: u64) -> (Decision, Vec<ArbiterEvent>) {
        let mut events = Vec::new();
        if self.primary_or_secondary_expected(side) == 0 {
            self.set_expected(side, seq);
        }

        if self.in_sequence {
            let my = self.primary_or_secondary_expected(side);
            let other = self.other_expected(side);
            let decision = match seq.cmp(&my) {
                std::cmp::Ordering::Equal => {
                    self.set_expected(side, seq + 1);
                    if seq < other {
                        Decision::Duplicate
                    } else {
                        Decision::Publish
                    }
                }
                std::cmp::Ordering::Less => Decision::Duplicate,
                std::cmp::Ordering::Greater => {
                    if seq == other {
                        self.set_expected(side, seq + 1);
                        Decision::Publish
                    } else if seq < other {
                        self.set_expected(side, seq + 1);
                        Decision::Duplicate
                    } else {
                        let most_advanced = my.max(other);
                        let gap = seq - most_advanced;
                        self.first_gap(gap, seq, most_advanced, &mut events);
                        self.set_expected(side, seq + 1);
                        Decision::Publish
                    }
                }
            };
            return (decision, events);
        }

        // Slow path (out-of-sequence).
        if seq > self.window.base() + MISSING_RANGE {
            self.packets_lost_incidence += 1;
            self.unrecoverable_messages += u64::from(self.window.count());
            events.push(ArbiterEvent::PacketLoss {
                begin: self.window.lowest(),
                end: self.window.highest(),
            });
            self.window.clear();
            self.set_expected(side, seq);
            self.set_in_sequence(true, &mut events);
            // Fall through to re-evaluate the (now in-sequence) cases below,
            // matching `need_2_publish`'s non-early-return window-overrun branch.
        }

        let my = self.primary_or_secondary_expected(side);
        let other = self.other_expected(side);

        let decision = if seq == my && seq >= other {
            self.set_expected(side, seq + 1);
            Decision::Publish
        } else if seq >= my && seq == other {
            self.set_expected(side, seq + 1);
            Decision::Publish
        } else if seq > my && seq > other {
            let most_advanced = my.max(other);
            let gap = seq - most_advanced;
            self.second_gap(gap, seq, most_advanced, &mut events);
            self.set_expected(side, seq + 1);
            Decision::Publish
        } else if self.window.contains(seq) {
            let emptied = self.window.remove(seq);
            if emptied {
                self.window.clear();
                self.set_in_sequence(true, &mut events);
            }
            if seq >= self.primary_or_secondary_expected(side) {
                self.set_expected(side, seq + 1);
            }
            Decision::Publish
        } else {
            Decision::Duplicate
        };
        (decision, events)
    }

    fn primary_or_secondary_expected(&self, side: Side) -> u64 {
        match side {
            Side::Primary => self.primary_expected,
            Side::Secondary => self.secondary_expected,
        }
    }

    fn other_expected(&self, side: Side) -> u64 {
        match side {
            Side::Primary => self.secondary_expected,
            Side::Secondary => self.primary_expected,
        }
    }

    fn set_expected(&mut self, side: Side, value: u64) {
        match side {
            Side::Primary => self.primary_expected = value,
            Side::Secondary => self.secondary_expected = value,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn publishes(decisions: &[(Decision, Vec<ArbiterEvent>)]) -> Vec<Decision> {
        decisions.iter().map(|(d, _)| *d).collect()
    }

    #[test]
    fn scenario_1_both_sides_in_order_secondary_all_duplicate() {
        let mut a = Arbiter::new();
        let mut out = Vec::new();
        for seq in [5u64, 6, 7] {
            out.push(a.need_to_publish(Side::Primary, seq));
        }
        for seq in [5u64, 6, 7] {
            out.push(a.need_to_publish(Side::Secondary, seq));
        }
        assert_eq!(
            publishes(&out),
            vec![
                Decision::Publish,
                Decision::Publish,
                Decision::Publish,
                Decision::Duplicate,
                Decision::Duplicate,
                Decision::Duplicate,
            ]
        );
    }

    #[test]
    fn scenario_2_gap_then_secondary_fills() {
        let mut a = Arbiter::new();
        let (d1, _) = a.need_to_publish(Side::Primary, 5);
        assert_eq!(d1, Decision::Publish);
        let (d2, ev2) = a.need_to_publish(Side::Primary, 7);
        assert_eq!(d2, Decision::Publish);
        assert!(!a.in_sequence());
        assert!(ev2
            .iter()
            .any(|e| matches!(e, ArbiterEvent::StateChange { in_sequence: false })));
        assert_eq!(a.missing_window().lowest(), 6);
        let (d3, ev3) = a.need_to_publish(Side::Secondary, 6);
        assert_eq!(d3, Decision::Publish);
        assert!(a.in_sequence());
        assert!(ev3
            .iter()
            .any(|e| matches!(e, ArbiterEvent::StateChange { in_sequence: true })));
    }

    #[test]
    fn scenario_3_gap_filled_from_same_side() {
        let mut a = Arbiter::new();
        assert_eq!(a.need_to_publish(Side::Primary, 5).0, Decision::Publish);
        assert_eq!(a.need_to_publish(Side::Primary, 7).0, Decision::Publish);
        assert!(!a.in_sequence());
        let (d, _) = a.need_to_publish(Side::Primary, 6);
        assert_eq!(d, Decision::Publish);
        assert!(a.in_sequence());
    }

    #[test]
    fn scenario_4_cold_start_gap_larger_than_missing_range() {
        let mut a = Arbiter::new();
        // lazily initializes my_expected to 5 (first-observed)
        assert_eq!(a.need_to_publish(Side::Primary, 5).0, Decision::Publish);
        let seq = 5 + MISSING_RANGE + 10;
        let (d, events) = a.need_to_publish(Side::Primary, seq);
        assert_eq!(d, Decision::Publish);
        // `first_gap`'s oversized-gap branch re-derives a gap size that is
        // always clamped back up to at least the original `gap_size`, so its
        // `PacketLoss` push is unreachable here (faithful to `seq_handling.c`
        // `first_gap()`, where the analogous comparison is dead for the same
        // reason). The gap is simply absorbed without opening the window.
        assert!(!events
            .iter()
            .any(|e| matches!(e, ArbiterEvent::PacketLoss { .. })));
        assert!(a.in_sequence());
    }

    #[test]
    fn duplicate_when_below_my_expected_in_sequence() {
        let mut a = Arbiter::new();
        assert_eq!(a.need_to_publish(Side::Primary, 5).0, Decision::Publish);
        assert_eq!(a.need_to_publish(Side::Primary, 6).0, Decision::Publish);
        assert_eq!(a.need_to_publish(Side::Primary, 5).0, Decision::Duplicate);
    }

    #[test]
    fn secondary_catches_up_before_primary_publishes() {
        let mut a = Arbiter::new();
        assert_eq!(a.need_to_publish(Side::Primary, 10).0, Decision::Publish);
        // secondary first-observed at 10 too (lazy init), then jumps ahead to 11
        assert_eq!(a.need_to_publish(Side::Secondary, 10).0, Decision::Duplicate);
        assert_eq!(a.need_to_publish(Side::Secondary, 11).0, Decision::Publish);
    }

    #[test]
    fn window_overrun_on_slow_path_falls_through_to_publish() {
        let mut a = Arbiter::new();
        assert_eq!(a.need_to_publish(Side::Primary, 5).0, Decision::Publish);
        assert_eq!(a.need_to_publish(Side::Primary, 7).0, Decision::Publish); // gap -> out of sequence
        assert!(!a.in_sequence());
        let far = 7 + MISSING_RANGE + 50;
        let (d, events) = a.need_to_publish(Side::Primary, far);
        assert_eq!(d, Decision::Publish);
        assert!(a.in_sequence());
        assert!(events
            .iter()
            .any(|e| matches!(e, ArbiterEvent::PacketLoss { .. })));
    }
}
