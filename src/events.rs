/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events that the backlog emits, and of the handlers that consume them.
//!
//! Every event is emitted after the action it describes has completed, and after the backlog's lock
//! has been released, so handlers are free to call back into the [`Backlog`](crate::backlog::Backlog).
//!
//! If [`Configuration::log_events`](crate::config::Configuration::log_events) is set, the default
//! handlers defined in [`logging`](crate::logging) are registered before any user-defined handler.

use std::time::SystemTime;

use ed25519_dalek::VerifyingKey;

use crate::{
    admission::Classification,
    backlog::DropReason,
    logging::Logger,
    messages::MessageKind,
    types::view::{ReceivedView, View},
};

pub enum Event {
    Receive(ReceiveEvent),
    Defer(DeferEvent),
    Replay(ReplayEvent),
    Discard(DiscardEvent),
    PurgeSender(PurgeSenderEvent),
}

/// A message was received and classified against the current view and state.
pub struct ReceiveEvent {
    pub timestamp: SystemTime,
    pub origin: VerifyingKey,
    pub kind: MessageKind,
    pub view: ReceivedView,
    pub classification: Classification,
}

/// A message was stored in `origin`'s backlog. `digest` is the message's
/// [digest](crate::messages::ConsensusMessage::digest), and `backlog_len` is the length of that backlog
/// after the insertion.
pub struct DeferEvent {
    pub timestamp: SystemTime,
    pub origin: VerifyingKey,
    pub kind: MessageKind,
    pub view: View,
    pub digest: [u8; 32],
    pub backlog_len: usize,
}

/// A deferred message was taken out of `origin`'s backlog and dispatched to the engine.
pub struct ReplayEvent {
    pub timestamp: SystemTime,
    pub origin: VerifyingKey,
    pub kind: MessageKind,
    pub view: View,
    pub digest: [u8; 32],
}

/// A message was dropped, either on arrival or while draining.
///
/// `kind`, `view` and `digest` are `None` if the message could not be decoded.
pub struct DiscardEvent {
    pub timestamp: SystemTime,
    pub origin: VerifyingKey,
    pub kind: Option<MessageKind>,
    pub view: Option<ReceivedView>,
    pub digest: Option<[u8; 32]>,
    pub reason: DropReason,
}

/// `origin`'s entire backlog was discarded because it is no longer a validator.
pub struct PurgeSenderEvent {
    pub timestamp: SystemTime,
    pub origin: VerifyingKey,
    pub discarded: usize,
}

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send + Sync>;

/// User-defined and default handlers for each [`Event`] variant.
#[derive(Default)]
pub struct EventHandlers {
    pub(crate) receive_handlers: Vec<HandlerPtr<ReceiveEvent>>,
    pub(crate) defer_handlers: Vec<HandlerPtr<DeferEvent>>,
    pub(crate) replay_handlers: Vec<HandlerPtr<ReplayEvent>>,
    pub(crate) discard_handlers: Vec<HandlerPtr<DiscardEvent>>,
    pub(crate) purge_sender_handlers: Vec<HandlerPtr<PurgeSenderEvent>>,
}

impl EventHandlers {
    /// Create a set of handlers with no handlers registered.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_receive(mut self, handler: impl Fn(&ReceiveEvent) + Send + Sync + 'static) -> Self {
        self.receive_handlers.push(Box::new(handler));
        self
    }

    pub fn on_defer(mut self, handler: impl Fn(&DeferEvent) + Send + Sync + 'static) -> Self {
        self.defer_handlers.push(Box::new(handler));
        self
    }

    pub fn on_replay(mut self, handler: impl Fn(&ReplayEvent) + Send + Sync + 'static) -> Self {
        self.replay_handlers.push(Box::new(handler));
        self
    }

    pub fn on_discard(mut self, handler: impl Fn(&DiscardEvent) + Send + Sync + 'static) -> Self {
        self.discard_handlers.push(Box::new(handler));
        self
    }

    pub fn on_purge_sender(
        mut self,
        handler: impl Fn(&PurgeSenderEvent) + Send + Sync + 'static,
    ) -> Self {
        self.purge_sender_handlers.push(Box::new(handler));
        self
    }

    /// Put the default logging handler of every event type in front of the registered handlers.
    pub(crate) fn with_loggers(mut self) -> Self {
        self.receive_handlers.insert(0, ReceiveEvent::get_logger());
        self.defer_handlers.insert(0, DeferEvent::get_logger());
        self.replay_handlers.insert(0, ReplayEvent::get_logger());
        self.discard_handlers.insert(0, DiscardEvent::get_logger());
        self.purge_sender_handlers
            .insert(0, PurgeSenderEvent::get_logger());
        self
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::Receive(receive_event) => self
                .receive_handlers
                .iter()
                .for_each(|handler| handler(&receive_event)),

            Event::Defer(defer_event) => self
                .defer_handlers
                .iter()
                .for_each(|handler| handler(&defer_event)),

            Event::Replay(replay_event) => self
                .replay_handlers
                .iter()
                .for_each(|handler| handler(&replay_event)),

            Event::Discard(discard_event) => self
                .discard_handlers
                .iter()
                .for_each(|handler| handler(&discard_event)),

            Event::PurgeSender(purge_sender_event) => self
                .purge_sender_handlers
                .iter()
                .for_each(|handler| handler(&purge_sender_event)),
        }
    }
}
