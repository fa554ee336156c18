/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the consensus messages that pass through the backlog.
//!
//! Every message that reaches the backlog has already been normalized by the
//! [decoding boundary](crate::codec) into a [`ConsensusMessage`], regardless of whether it arrived in
//! the legacy coded envelope or in the current typed form. The backlog therefore only ever needs the
//! uniform accessors [`kind`](ConsensusMessage::kind) and [`view`](ConsensusMessage::view).

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

use crate::types::view::{ReceivedView, View};

/// The four kinds of consensus messages.
///
/// The declaration order is the protocol order of the messages within a view, and is what
/// [`classify`](crate::admission::classify) means when it says one kind is "ranked above" another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageKind {
    Preprepare,
    Prepare,
    Commit,
    RoundChange,
}

impl MessageKind {
    /// Get the numeric code of this kind, as used by the legacy wire envelope.
    pub const fn code(&self) -> u64 {
        match self {
            MessageKind::Preprepare => 0,
            MessageKind::Prepare => 1,
            MessageKind::Commit => 2,
            MessageKind::RoundChange => 3,
        }
    }

    /// Get the kind identified by a legacy wire `code`, if there is one.
    pub const fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(MessageKind::Preprepare),
            1 => Some(MessageKind::Prepare),
            2 => Some(MessageKind::Commit),
            3 => Some(MessageKind::RoundChange),
            _ => None,
        }
    }

    /// Name of the kind in PascalCase, used in log messages.
    pub const fn name(&self) -> &'static str {
        match self {
            MessageKind::Preprepare => "Preprepare",
            MessageKind::Prepare => "Prepare",
            MessageKind::Commit => "Commit",
            MessageKind::RoundChange => "RoundChange",
        }
    }
}

impl Display for MessageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A leader's proposal for a view.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Preprepare {
    pub view: ReceivedView,
    pub proposal: Vec<u8>,
}

/// The view and proposal digest that a prepare or commit vote refers to.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Subject {
    pub view: ReceivedView,
    pub digest: [u8; 32],
}

/// A request to move to `view`, optionally carrying the round and digest the sender prepared in.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RoundChange {
    pub view: ReceivedView,
    pub prepared_round: Option<u64>,
    pub prepared_digest: Option<[u8; 32]>,
}

/// A decoded consensus message, tagged by its [`MessageKind`].
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum ConsensusMessage {
    Preprepare(Preprepare),
    Prepare(Subject),
    Commit(Subject),
    RoundChange(RoundChange),
}

impl ConsensusMessage {
    pub fn preprepare(view: View, proposal: Vec<u8>) -> ConsensusMessage {
        ConsensusMessage::Preprepare(Preprepare {
            view: view.into(),
            proposal,
        })
    }

    pub fn prepare(view: View, digest: [u8; 32]) -> ConsensusMessage {
        ConsensusMessage::Prepare(Subject {
            view: view.into(),
            digest,
        })
    }

    pub fn commit(view: View, digest: [u8; 32]) -> ConsensusMessage {
        ConsensusMessage::Commit(Subject {
            view: view.into(),
            digest,
        })
    }

    pub fn round_change(view: View) -> ConsensusMessage {
        ConsensusMessage::RoundChange(RoundChange {
            view: view.into(),
            prepared_round: None,
            prepared_digest: None,
        })
    }

    /// Returns the [`MessageKind`] of a given [`ConsensusMessage`].
    pub fn kind(&self) -> MessageKind {
        match self {
            ConsensusMessage::Preprepare(_) => MessageKind::Preprepare,
            ConsensusMessage::Prepare(_) => MessageKind::Prepare,
            ConsensusMessage::Commit(_) => MessageKind::Commit,
            ConsensusMessage::RoundChange(_) => MessageKind::RoundChange,
        }
    }

    /// Returns the view of a given [`ConsensusMessage`] exactly as it was received.
    pub fn received_view(&self) -> ReceivedView {
        match self {
            ConsensusMessage::Preprepare(Preprepare { view, .. }) => *view,
            ConsensusMessage::Prepare(Subject { view, .. }) => *view,
            ConsensusMessage::Commit(Subject { view, .. }) => *view,
            ConsensusMessage::RoundChange(RoundChange { view, .. }) => *view,
        }
    }

    /// Returns the view of a given [`ConsensusMessage`], or `None` if the view is malformed.
    pub fn view(&self) -> Option<View> {
        self.received_view().view()
    }

    /// SHA256 hash of the Borsh serialization of the message. Identifies the message in events and logs.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        // Writing into a hasher cannot fail.
        let _ = self.serialize(&mut hasher);
        hasher.finalize().into()
    }
}
