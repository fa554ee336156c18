use std::sync::{
    mpsc::{self, Receiver, Sender},
    Arc, Mutex, RwLock,
};

use ed25519_dalek::{SigningKey, VerifyingKey};
use log::LevelFilter;
use qbft_backlog::{
    backlog::{Backlog, DrainReport},
    config::Configuration,
    events::EventHandlers,
    pluggables::{InboundMessage, SharedRoundState},
    types::{ConsensusState, Power, ValidatorSet, View},
};
use rand_core::OsRng;

use super::logging::setup_logger;

pub(crate) type TestBacklog =
    Backlog<SharedRoundState, Arc<RwLock<ValidatorSet>>, Sender<InboundMessage>>;

/// A backlog wired to an in-memory validator set, a shared round state, and a channel standing in for
/// the consensus engine's event queue.
///
/// The local replica and every peer start out as validators with power 1.
pub(crate) struct Fixture {
    pub(crate) me: VerifyingKey,
    pub(crate) peers: Vec<VerifyingKey>,
    pub(crate) validators: Arc<RwLock<ValidatorSet>>,
    pub(crate) round_state: SharedRoundState,
    pub(crate) inbox: Mutex<Receiver<InboundMessage>>,
    pub(crate) backlog: TestBacklog,
}

impl Fixture {
    pub(crate) fn new(num_peers: usize, view: View, state: ConsensusState) -> Fixture {
        Self::build(num_peers, view, state, None, EventHandlers::new())
    }

    pub(crate) fn with_capacity(
        num_peers: usize,
        view: View,
        state: ConsensusState,
        max_entries_per_sender: usize,
    ) -> Fixture {
        Self::build(
            num_peers,
            view,
            state,
            Some(max_entries_per_sender),
            EventHandlers::new(),
        )
    }

    pub(crate) fn with_event_handlers(
        num_peers: usize,
        view: View,
        state: ConsensusState,
        event_handlers: EventHandlers,
    ) -> Fixture {
        Self::build(num_peers, view, state, None, event_handlers)
    }

    fn build(
        num_peers: usize,
        view: View,
        state: ConsensusState,
        max_entries_per_sender: Option<usize>,
        event_handlers: EventHandlers,
    ) -> Fixture {
        setup_logger(LevelFilter::Trace);

        let mut csprg = OsRng {};
        let me = SigningKey::generate(&mut csprg).verifying_key();
        let peers: Vec<VerifyingKey> = (0..num_peers)
            .map(|_| SigningKey::generate(&mut csprg).verifying_key())
            .collect();

        let validators = Arc::new(RwLock::new(
            std::iter::once(me)
                .chain(peers.iter().copied())
                .map(|validator| (validator, Power::new(1)))
                .collect::<ValidatorSet>(),
        ));
        let round_state = SharedRoundState::new(view, state);
        let (to_engine, inbox) = mpsc::channel();

        let configuration = Configuration::builder()
            .me(me)
            .max_entries_per_sender(max_entries_per_sender)
            .log_events(true)
            .build();

        let backlog = Backlog::with_event_handlers(
            configuration,
            round_state.clone(),
            validators.clone(),
            to_engine,
            event_handlers,
        );

        Fixture {
            me,
            peers,
            validators,
            round_state,
            inbox: Mutex::new(inbox),
            backlog,
        }
    }

    pub(crate) fn peer(&self, index: usize) -> VerifyingKey {
        self.peers[index]
    }

    /// Move the engine to `view` in `state`, then drain the backlog.
    pub(crate) fn advance(&self, view: View, state: ConsensusState) -> DrainReport {
        self.round_state.set(view, state);
        self.backlog.process()
    }

    /// Move the engine to `state` in the current view, then drain the backlog.
    pub(crate) fn advance_state(&self, state: ConsensusState) -> DrainReport {
        self.round_state.set_state(state);
        self.backlog.process()
    }

    pub(crate) fn remove_validator(&self, validator: &VerifyingKey) {
        self.validators.write().unwrap().remove(validator);
    }

    /// Take every message dispatched to the engine so far.
    pub(crate) fn dispatched(&self) -> Vec<InboundMessage> {
        self.inbox.lock().unwrap().try_iter().collect()
    }
}
