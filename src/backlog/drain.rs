/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Replaying deferred messages once they become admissible.
//!
//! ## A drain pass
//!
//! A pass takes one snapshot of the engine's view and state, then visits every sender with a
//! non-empty backlog:
//! 1. If the sender is no longer a validator, its whole backlog is discarded.
//! 2. Otherwise, the pass repeatedly looks at the sender's highest-priority message and classifies it
//!    against the snapshot:
//!     - `Admit`: the message is popped and dispatched to the engine, tagged with its sender.
//!     - `Stale` or `Invalid`: the message is popped and dropped.
//!     - `Future`: the message stays where it is, and the pass moves on to the next sender.
//!
//! Stopping at the first future message is what preserves per-sender view order: everything behind it
//! in the queue has an equal or higher priority key, and so is at least as far in the future.
//!
//! ## Serialized passes
//!
//! Passes never overlap. If [`process`](Backlog::process) is called while another thread is draining,
//! the call records that another pass is needed and returns immediately, and the draining thread runs
//! one more pass before it releases the drain. No drain request is lost, and calling `process` from
//! inside an [`EventPipeline`] or event handler does not deadlock.

use std::{
    sync::{atomic::Ordering, TryLockError},
    time::SystemTime,
};

use ed25519_dalek::VerifyingKey;

use crate::{
    admission::{classify, Classification},
    events::*,
    pluggables::{Delivery, EventPipeline, InboundMessage, RoundState, ValidatorLookup},
    types::view::{ConsensusState, View},
};

use super::{
    queue::{DeferredMessage, SenderQueue},
    Backlog, DropReason,
};

/// Summary of the drain passes run by one call to [`Backlog::process`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Number of passes run. 0 if another thread was already draining.
    pub passes: usize,

    /// Number of messages dispatched to the event pipeline.
    pub replayed: usize,

    /// Number of messages dropped because they became stale or invalid.
    pub discarded: usize,

    /// Number of senders whose backlog was discarded because they are not validators anymore.
    pub senders_purged: usize,

    /// Number of messages discarded along with the backlogs of purged senders.
    pub purged_messages: usize,
}

impl DrainReport {
    fn merge(&mut self, other: DrainReport) {
        self.passes += other.passes;
        self.replayed += other.replayed;
        self.discarded += other.discarded;
        self.senders_purged += other.senders_purged;
        self.purged_messages += other.purged_messages;
    }
}

enum DrainStep {
    Replay(DeferredMessage),
    Discard(DeferredMessage, Classification),
    Stop,
}

impl<S: RoundState, V: ValidatorLookup, P: EventPipeline> Backlog<S, V, P> {
    /// Replay every deferred message that has become admissible. Should be called every time the
    /// engine's view or state changes. See the [module-level docs](self).
    pub fn process(&self) -> DrainReport {
        self.drain_requested.store(true, Ordering::SeqCst);

        let mut report = DrainReport::default();
        loop {
            let drain_guard = match self.drain_lock.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return report,
            };

            while self.drain_requested.swap(false, Ordering::SeqCst) {
                report.merge(self.drain_pass());
            }

            drop(drain_guard);

            // A request made between the last swap and the release would otherwise be lost.
            if !self.drain_requested.load(Ordering::SeqCst) {
                return report;
            }
        }
    }

    fn drain_pass(&self) -> DrainReport {
        let (current_view, current_state) = self.round_state.current();
        let senders = self.senders();

        let mut report = DrainReport {
            passes: 1,
            ..Default::default()
        };

        for sender in senders {
            let Some(origin) = self.validators.lookup(&sender) else {
                let discarded = self
                    .lock_queues()
                    .remove(&sender)
                    .map_or(0, |queue| queue.len());
                log::debug!(
                    "Discarding the backlog of a removed validator, {} messages",
                    discarded
                );
                report.senders_purged += 1;
                report.purged_messages += discarded;
                self.event_handlers
                    .fire_handlers(Event::PurgeSender(PurgeSenderEvent {
                        timestamp: SystemTime::now(),
                        origin: sender,
                        discarded,
                    }));
                continue;
            };

            loop {
                match self.next_step(&sender, &current_view, current_state) {
                    DrainStep::Replay(deferred) => {
                        report.replayed += 1;
                        let kind = deferred.message.kind();
                        let digest = deferred.message.digest();
                        self.pipeline.dispatch(InboundMessage {
                            origin,
                            message: deferred.message,
                            delivery: Delivery::Backlog,
                        });
                        self.event_handlers.fire_handlers(Event::Replay(ReplayEvent {
                            timestamp: SystemTime::now(),
                            origin: sender,
                            kind,
                            view: deferred.view,
                            digest,
                        }));
                    }
                    DrainStep::Discard(deferred, classification) => {
                        report.discarded += 1;
                        let reason = match classification {
                            Classification::Stale => DropReason::Stale,
                            _ => DropReason::Invalid,
                        };
                        log::trace!(
                            "Skip the backlog message, {} for view {}: {}",
                            deferred.message.kind(),
                            deferred.view,
                            classification.name()
                        );
                        let _ = self.drop_message(&sender, &deferred.message, reason);
                    }
                    DrainStep::Stop => break,
                }
            }
        }

        report
    }

    /// Pop `sender`'s highest-priority message unless it is still in the future. Removes the sender's
    /// queue once it is empty.
    fn next_step(
        &self,
        sender: &VerifyingKey,
        current_view: &View,
        current_state: ConsensusState,
    ) -> DrainStep {
        let mut queues = self.lock_queues();
        let Some(queue) = queues.get_mut(sender) else {
            return DrainStep::Stop;
        };

        let step = take_admissible(queue, current_view, current_state);
        if queue.is_empty() {
            queues.remove(sender);
        }
        step
    }
}

fn take_admissible(
    queue: &mut SenderQueue,
    current_view: &View,
    current_state: ConsensusState,
) -> DrainStep {
    let classification = match queue.peek() {
        Some(next) => classify(
            current_view,
            current_state,
            next.message.kind(),
            Some(&next.view),
        ),
        None => return DrainStep::Stop,
    };

    if classification == Classification::Future {
        return DrainStep::Stop;
    }

    match queue.pop() {
        Some(deferred) if classification == Classification::Admit => DrainStep::Replay(deferred),
        Some(deferred) => DrainStep::Discard(deferred, classification),
        None => DrainStep::Stop,
    }
}
