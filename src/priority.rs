/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The order in which deferred messages are taken out of a sender's backlog.
//!
//! ## Key layout
//!
//! A [`Priority`] is compared lexicographically on `(sequence, round, rank)`. Lower keys are drained
//! first. Because the key is a tuple of full-width integers, no field can overflow into the next one,
//! and `round` has no ceiling.
//!
//! - `RoundChange` messages are keyed only by their sequence: their key is `(sequence, 0, 0)`. A round
//!   change for sequence `s` therefore sorts before every other message of sequence `s` (whatever its
//!   round), and after every message of sequence `s - 1`.
//! - All other kinds are keyed by `(sequence, round, drain_rank(kind))`.
//!
//! ## Drain ranks
//!
//! Within a round, pre-prepares are drained before commits, and commits before prepares. This is *not*
//! the protocol order of [`MessageKind`]. A commit queued at the same view as a prepare is therefore
//! inspected first, and stops the drain of that sender while it is still in the future. See
//! [`drain_rank`].

use crate::{messages::MessageKind, types::view::View};

/// Ordering key of an entry in a sender's backlog. Lower is drained first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority {
    sequence: u64,
    round: u64,
    rank: u8,
}

/// Compute the backlog key of a message of `kind` for `view`.
pub fn priority(kind: MessageKind, view: &View) -> Priority {
    match kind {
        MessageKind::RoundChange => Priority {
            sequence: view.sequence,
            round: 0,
            rank: drain_rank(kind),
        },
        _ => Priority {
            sequence: view.sequence,
            round: view.round,
            rank: drain_rank(kind),
        },
    }
}

/// Intra-round rank of `kind`: `RoundChange < Preprepare < Commit < Prepare`.
pub const fn drain_rank(kind: MessageKind) -> u8 {
    match kind {
        MessageKind::RoundChange => 0,
        MessageKind::Preprepare => 1,
        MessageKind::Commit => 2,
        MessageKind::Prepare => 3,
    }
}
