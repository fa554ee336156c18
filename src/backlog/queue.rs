/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The priority queue that holds one sender's deferred messages.

use std::collections::BTreeMap;

use crate::{
    messages::ConsensusMessage,
    priority::{priority, Priority},
    types::view::View,
};

/// A message in a sender's backlog, stored along with the well-formed view it was deferred for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct DeferredMessage {
    pub(crate) view: View,
    pub(crate) message: ConsensusMessage,
}

/// Result of [`SenderQueue::push`].
pub(crate) enum PushOutcome {
    Inserted,

    /// The queue was full, and the contained message, which would have been drained last, was evicted
    /// to make space.
    InsertedEvicting(DeferredMessage),

    /// The queue was full, and the new message would have been drained last.
    Refused(DeferredMessage),
}

/// Deferred messages from a single sender, ordered by [`Priority`].
///
/// Entries with equal priority are ordered by arrival, so that draining is deterministic. The arrival
/// counter is per queue, and is never reset for the lifetime of the queue.
pub(crate) struct SenderQueue {
    entries: BTreeMap<(Priority, u64), DeferredMessage>,
    next_arrival: u64,
}

impl SenderQueue {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_arrival: 0,
        }
    }

    /// Insert `message`, deferred for `view`, keeping at most `capacity` entries (if any).
    pub(crate) fn push(
        &mut self,
        message: ConsensusMessage,
        view: View,
        capacity: Option<usize>,
    ) -> PushOutcome {
        let key = (priority(message.kind(), &view), self.next_arrival);
        let deferred = DeferredMessage { view, message };

        let mut evicted = None;
        if let Some(capacity) = capacity {
            if self.entries.len() >= capacity {
                match self.entries.last_key_value() {
                    Some((last_key, _)) if key < *last_key => {
                        evicted = self.entries.pop_last().map(|(_, evicted)| evicted)
                    }
                    _ => return PushOutcome::Refused(deferred),
                }
            }
        }

        self.next_arrival += 1;
        self.entries.insert(key, deferred);

        match evicted {
            Some(evicted) => PushOutcome::InsertedEvicting(evicted),
            None => PushOutcome::Inserted,
        }
    }

    /// Get the message that would be drained next.
    pub(crate) fn peek(&self) -> Option<&DeferredMessage> {
        self.entries.first_key_value().map(|(_, deferred)| deferred)
    }

    /// Remove and return the message that would be drained next.
    pub(crate) fn pop(&mut self) -> Option<DeferredMessage> {
        self.entries.pop_first().map(|(_, deferred)| deferred)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
