/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits for the collaborators that the backlog reads from and dispatches into.
//!
//! The backlog does not own the consensus engine. It needs three things from it:
//! 1. [`RoundState`]: the engine's current view and state, read as one consistent snapshot.
//! 2. [`ValidatorLookup`]: the validator set, to resolve senders and to find removed validators.
//! 3. [`EventPipeline`]: the engine's event queue, into which admitted messages are handed off.

use std::{
    sync::{
        mpsc::{Sender, SyncSender, TrySendError},
        Arc, PoisonError, RwLock,
    },
    thread,
};

use ed25519_dalek::VerifyingKey;

use crate::{
    messages::ConsensusMessage,
    types::{
        validator_set::{Validator, ValidatorSet},
        view::{ConsensusState, View},
    },
};

pub trait RoundState: Send + Sync {
    /// Get the current view and state of the consensus engine.
    ///
    /// Implementations must return both from the same instant, i.e., never a view from before a
    /// transition paired with a state from after it.
    fn current(&self) -> (View, ConsensusState);
}

pub trait ValidatorLookup: Send + Sync {
    /// Get the validator identified by `address`, or `None` if it is not in the validator set.
    fn lookup(&self, address: &VerifyingKey) -> Option<Validator>;
}

pub trait EventPipeline: Send + Sync {
    /// Hand `event` off to the consensus engine without blocking.
    ///
    /// The message has already been taken out of the backlog, so implementations must not drop it
    /// while the engine is still listening.
    fn dispatch(&self, event: InboundMessage);
}

/// How an [`InboundMessage`] got to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Delivery {
    /// Admitted on arrival.
    Direct,

    /// Deferred on arrival, and replayed by a later drain of the backlog.
    Backlog,
}

/// A message that has been admitted, tagged with the validator that sent it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub origin: Validator,
    pub message: ConsensusMessage,
    pub delivery: Delivery,
}

impl ValidatorLookup for ValidatorSet {
    fn lookup(&self, address: &VerifyingKey) -> Option<Validator> {
        self.get(address)
    }
}

impl ValidatorLookup for RwLock<ValidatorSet> {
    fn lookup(&self, address: &VerifyingKey) -> Option<Validator> {
        self.read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
    }
}

impl<L: ValidatorLookup + ?Sized> ValidatorLookup for Arc<L> {
    fn lookup(&self, address: &VerifyingKey) -> Option<Validator> {
        self.as_ref().lookup(address)
    }
}

impl<S: RoundState + ?Sized> RoundState for Arc<S> {
    fn current(&self) -> (View, ConsensusState) {
        self.as_ref().current()
    }
}

impl EventPipeline for Sender<InboundMessage> {
    fn dispatch(&self, event: InboundMessage) {
        if self.send(event).is_err() {
            log::warn!("Event pipeline disconnected, dropping admitted message");
        }
    }
}

impl EventPipeline for SyncSender<InboundMessage> {
    fn dispatch(&self, event: InboundMessage) {
        match self.try_send(event) {
            Ok(()) => (),
            Err(TrySendError::Full(event)) => {
                log::debug!(
                    "Event pipeline full, sending {} for view {} in the background",
                    event.message.kind(),
                    event.message.received_view()
                );
                let sender = self.clone();
                thread::spawn(move || {
                    if sender.send(event).is_err() {
                        log::warn!("Event pipeline disconnected, dropping admitted message");
                    }
                });
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("Event pipeline disconnected, dropping admitted message")
            }
        }
    }
}

/// A [`RoundState`] that the consensus engine updates on every transition and the backlog reads from.
///
/// Clones share the same underlying view and state.
#[derive(Clone, Default)]
pub struct SharedRoundState(Arc<RwLock<(View, ConsensusState)>>);

impl SharedRoundState {
    /// Create a new `SharedRoundState` starting at `view` in `state`.
    pub fn new(view: View, state: ConsensusState) -> Self {
        Self(Arc::new(RwLock::new((view, state))))
    }

    /// Move to `view` in `state` atomically.
    pub fn set(&self, view: View, state: ConsensusState) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = (view, state);
    }

    /// Move to `state` without changing the view.
    pub fn set_state(&self, state: ConsensusState) {
        self.0.write().unwrap_or_else(PoisonError::into_inner).1 = state;
    }
}

impl RoundState for SharedRoundState {
    fn current(&self) -> (View, ConsensusState) {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }
}
