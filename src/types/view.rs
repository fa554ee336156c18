/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that describe where a replica is in the consensus protocol.
//!
//! Progress in Istanbul-style consensus is measured along two axes:
//! 1. The [`View`], a `(sequence, round)` pair. `sequence` increases by 1 for every finalized unit of
//!    work, while `round` increases within a sequence every time a round fails to finalize.
//! 2. The [`ConsensusState`], the position of the replica in the state machine for the current view.

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};

/// A `(sequence, round)` pair.
///
/// ## Ordering
///
/// Views are totally ordered: `sequence` is compared first, and `round` is only compared if the
/// sequences are equal. The derived `Ord` relies on the declaration order of the fields.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
)]
pub struct View {
    pub sequence: u64,
    pub round: u64,
}

impl View {
    /// Create a new `View`.
    pub const fn new(sequence: u64, round: u64) -> Self {
        Self { sequence, round }
    }

    /// Get the view that follows this one when the current round fails. Saturates at `u64::MAX`.
    pub const fn next_round(&self) -> Self {
        Self {
            sequence: self.sequence,
            round: self.round.saturating_add(1),
        }
    }

    /// Get the first view of the next sequence. Saturates at `u64::MAX`.
    pub const fn next_sequence(&self) -> Self {
        Self {
            sequence: self.sequence.saturating_add(1),
            round: 0,
        }
    }
}

impl Display for View {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.sequence, self.round)
    }
}

/// A view exactly as it was decoded from a message.
///
/// Peers are not trusted to fill in both fields, so either may be missing. Use [`view`](Self::view)
/// to get a usable [`View`] out of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct ReceivedView {
    pub sequence: Option<u64>,
    pub round: Option<u64>,
}

impl ReceivedView {
    /// Get the [`View`] described by this `ReceivedView`, or `None` if either field is missing.
    pub fn view(&self) -> Option<View> {
        match (self.sequence, self.round) {
            (Some(sequence), Some(round)) => Some(View::new(sequence, round)),
            _ => None,
        }
    }

    /// Check whether both fields are present.
    pub fn is_well_formed(&self) -> bool {
        self.view().is_some()
    }
}

impl From<View> for ReceivedView {
    fn from(view: View) -> Self {
        Self {
            sequence: Some(view.sequence),
            round: Some(view.round),
        }
    }
}

impl Display for ReceivedView {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.view() {
            Some(view) => Display::fmt(&view, f),
            None => write!(f, "({:?}, {:?})", self.sequence, self.round),
        }
    }
}

/// Position of the replica in the state machine of the current view.
///
/// The state machine walks `AcceptRequest → Preprepared → Prepared → Committed`, and goes back to
/// `AcceptRequest` whenever a new sequence (or round) starts. Round changes are not a position on this
/// axis; they are handled by [`classify`](crate::admission::classify) independently of the state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum ConsensusState {
    #[default]
    AcceptRequest,
    Preprepared,
    Prepared,
    Committed,
}

impl ConsensusState {
    /// Name of the state in PascalCase, used in log messages.
    pub const fn name(&self) -> &'static str {
        match self {
            ConsensusState::AcceptRequest => "AcceptRequest",
            ConsensusState::Preprepared => "Preprepared",
            ConsensusState::Prepared => "Prepared",
            ConsensusState::Committed => "Committed",
        }
    }
}

impl Display for ConsensusState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
