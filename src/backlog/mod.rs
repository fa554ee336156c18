/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Admission of inbound consensus messages, and deferral of messages that arrive too early.
//!
//! Messages from peers arrive in arbitrary order, while the consensus engine may only process them in
//! protocol order. [`Backlog`] sits between the two:
//! 1. [`receive`](Backlog::receive) [classifies](crate::admission::classify) every inbound message
//!    against the engine's current view and state. Admitted messages are dispatched to the engine's
//!    [`EventPipeline`] right away, stale and invalid ones are dropped, and future ones are
//!    [deferred](Backlog::defer).
//! 2. Deferred messages are kept in one priority queue per sender, ordered by
//!    [`priority`](crate::priority).
//! 3. Every time the engine's view or state changes, it calls [`process`](Backlog::process), which
//!    replays deferred messages that have become admissible.
//!
//! ## Invariants
//!
//! - Messages from the local replica ([`Configuration::me`]) are never deferred.
//! - Every deferred message has a well-formed view, and was classified as
//!   [`Future`](Classification::Future) when it was deferred.
//! - A sender that is no longer in the validator set has its whole backlog discarded on the next
//!   drain, without any of it being dispatched.
//! - Absence of a sender's queue means that there are no deferred messages from that sender. Queues
//!   are created on the first deferral and removed once emptied.
//!
//! ## Locking
//!
//! The sender-to-queue map is protected by a single mutex, which is only held for one insertion,
//! one peek-and-pop, or one removal at a time. Dispatching to the event pipeline and firing event
//! handlers always happen after the mutex has been released.

mod drain;
mod queue;

pub use drain::DrainReport;

use std::{
    collections::HashMap,
    sync::{atomic::AtomicBool, Mutex, MutexGuard, PoisonError},
    time::SystemTime,
};

use ed25519_dalek::VerifyingKey;

use crate::{
    admission::{classify, Classification},
    codec::{self, WireMessage},
    config::Configuration,
    events::*,
    logging::first_seven_base64_chars,
    messages::ConsensusMessage,
    pluggables::{Delivery, EventPipeline, InboundMessage, RoundState, ValidatorLookup},
};

use queue::{PushOutcome, SenderQueue};

/// Per-sender backlog of deferred consensus messages. See the [module-level docs](self).
pub struct Backlog<S: RoundState, V: ValidatorLookup, P: EventPipeline> {
    config: Configuration,
    round_state: S,
    validators: V,
    pipeline: P,
    event_handlers: EventHandlers,
    queues: Mutex<HashMap<VerifyingKey, SenderQueue>>,
    drain_lock: Mutex<()>,
    drain_requested: AtomicBool,
}

impl<S: RoundState, V: ValidatorLookup, P: EventPipeline> Backlog<S, V, P> {
    /// Create an empty backlog with no user-defined event handlers.
    pub fn new(config: Configuration, round_state: S, validators: V, pipeline: P) -> Self {
        Self::with_event_handlers(
            config,
            round_state,
            validators,
            pipeline,
            EventHandlers::new(),
        )
    }

    /// Create an empty backlog that fires `event_handlers` (in addition to the default loggers, if
    /// enabled) on every event.
    pub fn with_event_handlers(
        config: Configuration,
        round_state: S,
        validators: V,
        pipeline: P,
        event_handlers: EventHandlers,
    ) -> Self {
        let event_handlers = if config.log_events {
            event_handlers.with_loggers()
        } else {
            event_handlers
        };

        Self {
            config,
            round_state,
            validators,
            pipeline,
            event_handlers,
            queues: Mutex::new(HashMap::new()),
            drain_lock: Mutex::new(()),
            drain_requested: AtomicBool::new(false),
        }
    }

    /// Admit, defer, or drop an inbound `message` from `sender`.
    pub fn receive(&self, sender: &VerifyingKey, message: ConsensusMessage) -> Disposition {
        let Some(origin) = self.validators.lookup(sender) else {
            log::debug!(
                "Dropping {} from {}, which is not a validator",
                message.kind(),
                first_seven_base64_chars(&sender.to_bytes())
            );
            return self.drop_message(sender, &message, DropReason::UnknownSender);
        };

        let (current_view, current_state) = self.round_state.current();
        let classification = classify(
            &current_view,
            current_state,
            message.kind(),
            message.view().as_ref(),
        );

        self.event_handlers.fire_handlers(Event::Receive(ReceiveEvent {
            timestamp: SystemTime::now(),
            origin: *sender,
            kind: message.kind(),
            view: message.received_view(),
            classification,
        }));

        match classification {
            Classification::Admit => {
                self.pipeline.dispatch(InboundMessage {
                    origin,
                    message,
                    delivery: Delivery::Direct,
                });
                Disposition::Dispatched
            }
            Classification::Future => self.defer(sender, message),
            Classification::Stale => self.drop_message(sender, &message, DropReason::Stale),
            Classification::Invalid => self.drop_message(sender, &message, DropReason::Invalid),
        }
    }

    /// Decode `wire` and [`receive`](Self::receive) the result. Messages that cannot be decoded are
    /// dropped.
    pub fn receive_wire(&self, sender: &VerifyingKey, wire: WireMessage) -> Disposition {
        match codec::decode(wire) {
            Ok(message) => self.receive(sender, message),
            Err(err) => self.drop_undecodable(sender, err),
        }
    }

    /// Store `message` from `sender` in `sender`'s backlog.
    ///
    /// The caller is responsible for having classified `message` as
    /// [`Future`](Classification::Future). The message is not stored if `sender` is the local replica,
    /// if its view is malformed, or if `sender`'s backlog is full and the message would be drained
    /// after everything already in it.
    pub fn defer(&self, sender: &VerifyingKey, message: ConsensusMessage) -> Disposition {
        if *sender == self.config.me {
            log::warn!(
                "Backlog from self, dropping {} for view {}",
                message.kind(),
                message.received_view()
            );
            return self.drop_message(sender, &message, DropReason::SelfOrigin);
        }

        let Some(view) = message.view() else {
            log::debug!(
                "Not deferring {} from {} with malformed view {}",
                message.kind(),
                first_seven_base64_chars(&sender.to_bytes()),
                message.received_view()
            );
            return self.drop_message(sender, &message, DropReason::MalformedView);
        };
        let kind = message.kind();
        let digest = message.digest();

        let (outcome, backlog_len) = {
            let mut queues = self.lock_queues();
            let queue = queues.entry(*sender).or_insert_with(SenderQueue::new);
            let outcome = queue.push(message, view, self.config.max_entries_per_sender);
            let backlog_len = queue.len();
            if queue.is_empty() {
                queues.remove(sender);
            }
            (outcome, backlog_len)
        };

        match outcome {
            PushOutcome::Inserted => (),
            PushOutcome::InsertedEvicting(evicted) => {
                let _ = self.drop_message(sender, &evicted.message, DropReason::Evicted);
            }
            PushOutcome::Refused(refused) => {
                return self.drop_message(sender, &refused.message, DropReason::BacklogFull);
            }
        }

        self.event_handlers.fire_handlers(Event::Defer(DeferEvent {
            timestamp: SystemTime::now(),
            origin: *sender,
            kind,
            view,
            digest,
            backlog_len,
        }));

        Disposition::Deferred
    }

    /// Decode `wire` and [`defer`](Self::defer) the result. Messages that cannot be decoded are
    /// dropped.
    pub fn defer_wire(&self, sender: &VerifyingKey, wire: WireMessage) -> Disposition {
        match codec::decode(wire) {
            Ok(message) => self.defer(sender, message),
            Err(err) => self.drop_undecodable(sender, err),
        }
    }

    /// Discard every deferred message from `sender`. Returns how many messages were discarded.
    pub fn discard_sender(&self, sender: &VerifyingKey) -> usize {
        let discarded = self
            .lock_queues()
            .remove(sender)
            .map_or(0, |queue| queue.len());

        if discarded > 0 {
            self.event_handlers
                .fire_handlers(Event::PurgeSender(PurgeSenderEvent {
                    timestamp: SystemTime::now(),
                    origin: *sender,
                    discarded,
                }));
        }

        discarded
    }

    /// Get the number of deferred messages from `sender`.
    pub fn len_of(&self, sender: &VerifyingKey) -> usize {
        self.lock_queues().get(sender).map_or(0, |queue| queue.len())
    }

    /// Get the number of deferred messages from all senders.
    pub fn total_len(&self) -> usize {
        self.lock_queues().values().map(|queue| queue.len()).sum()
    }

    /// Get the senders that currently have at least one deferred message.
    pub fn senders(&self) -> Vec<VerifyingKey> {
        self.lock_queues().keys().copied().collect()
    }

    fn lock_queues(&self) -> MutexGuard<'_, HashMap<VerifyingKey, SenderQueue>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn drop_message(
        &self,
        sender: &VerifyingKey,
        message: &ConsensusMessage,
        reason: DropReason,
    ) -> Disposition {
        self.event_handlers.fire_handlers(Event::Discard(DiscardEvent {
            timestamp: SystemTime::now(),
            origin: *sender,
            kind: Some(message.kind()),
            view: Some(message.received_view()),
            digest: Some(message.digest()),
            reason,
        }));
        Disposition::Dropped(reason)
    }

    fn drop_undecodable(&self, sender: &VerifyingKey, err: codec::DecodeError) -> Disposition {
        log::debug!(
            "Failed to decode message from {}: {:?}",
            first_seven_base64_chars(&sender.to_bytes()),
            err
        );
        self.event_handlers.fire_handlers(Event::Discard(DiscardEvent {
            timestamp: SystemTime::now(),
            origin: *sender,
            kind: None,
            view: None,
            digest: None,
            reason: DropReason::DecodeFailure,
        }));
        Disposition::Dropped(DropReason::DecodeFailure)
    }
}

/// What happened to a message handed to [`Backlog::receive`] or [`Backlog::defer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Dispatched to the event pipeline.
    Dispatched,

    /// Stored in the sender's backlog.
    Deferred,

    /// Dropped, never to be processed.
    Dropped(DropReason),
}

/// Why a message was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// The message's view is behind the current view.
    Stale,

    /// The message's view is malformed, or the current state does not accept its kind anymore.
    Invalid,

    /// The message could not be decoded.
    DecodeFailure,

    /// The message was sent by the local replica, and so cannot be deferred.
    SelfOrigin,

    /// The sender is not in the validator set.
    UnknownSender,

    /// The message's view is malformed, and so it could not be deferred.
    MalformedView,

    /// The sender's backlog is full, and the message would have been drained last.
    BacklogFull,

    /// The message was deferred, but was evicted to make space for a message that would be drained
    /// earlier.
    Evicted,
}
