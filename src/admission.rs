/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Decides whether a message can be processed in the replica's current view and state.
//!
//! [`classify`] is a pure function of its inputs. The [backlog](crate::backlog) relies on this to
//! re-run it on deferred messages every time it drains, against whatever the view and state are by
//! then.
//!
//! ## Round changes
//!
//! Round changes drive view advancement, so they are accepted for every round of the current sequence
//! that is not behind the current view. Only a round change for a later sequence is deferred.
//!
//! ## Other messages
//!
//! Pre-prepares, prepares and commits are only processed in exactly the current view, and only if the
//! current [`ConsensusState`] expects them:
//!
//! | State           | Preprepare | Prepare | Commit  |
//! |-----------------|------------|---------|---------|
//! | `AcceptRequest` | Admit      | Future  | Future  |
//! | `Preprepared`   | Invalid    | Admit   | Future  |
//! | `Prepared`      | Invalid    | Invalid | Admit   |
//! | `Committed`     | Invalid    | Invalid | Invalid |

use crate::{
    messages::MessageKind,
    types::view::{ConsensusState, View},
};

/// Outcome of [`classify`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Classification {
    /// The message can be processed now.
    Admit,

    /// The message is ahead of the replica and should be deferred until it catches up.
    Future,

    /// The message is behind the replica. It will never be processed.
    Stale,

    /// The message's view is malformed, or the current state has already moved past its kind.
    Invalid,
}

impl Classification {
    /// Name of the classification in PascalCase, used in log messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Classification::Admit => "Admit",
            Classification::Future => "Future",
            Classification::Stale => "Stale",
            Classification::Invalid => "Invalid",
        }
    }
}

/// Classify a message of `kind` for `message_view` against the replica's `current_view` and
/// `current_state`. `message_view` is `None` if the view of the message is malformed.
pub fn classify(
    current_view: &View,
    current_state: ConsensusState,
    kind: MessageKind,
    message_view: Option<&View>,
) -> Classification {
    let Some(message_view) = message_view else {
        return Classification::Invalid;
    };

    if kind == MessageKind::RoundChange {
        if message_view.sequence > current_view.sequence {
            return Classification::Future;
        } else if message_view < current_view {
            return Classification::Stale;
        }
        return Classification::Admit;
    }

    if message_view > current_view {
        return Classification::Future;
    }

    if message_view < current_view {
        return Classification::Stale;
    }

    match current_state {
        ConsensusState::AcceptRequest => {
            if kind > MessageKind::Preprepare {
                Classification::Future
            } else {
                Classification::Admit
            }
        }
        ConsensusState::Preprepared => {
            if kind < MessageKind::Prepare {
                Classification::Invalid
            } else if kind > MessageKind::Prepare {
                Classification::Future
            } else {
                Classification::Admit
            }
        }
        ConsensusState::Prepared => {
            if kind < MessageKind::Commit {
                Classification::Invalid
            } else {
                Classification::Admit
            }
        }
        ConsensusState::Committed => Classification::Invalid,
    }
}
