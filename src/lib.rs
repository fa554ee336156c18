/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Message admission and future-message backlog for Istanbul/QBFT-style BFT consensus engines.
//!
//! A validator receives pre-prepares, prepares, commits and round changes from its peers in whatever
//! order the network delivers them, but its consensus engine may only process them in the order that
//! the protocol's current view and state allow. This crate decides, for every inbound message, whether
//! it can be processed now, must wait, or will never be processed, and replays waiting messages as soon
//! as the engine catches up to them.
//!
//! ## Components
//!
//! - [`types`]: [`View`](types::View), [`ConsensusState`](types::ConsensusState), and the
//!   [`ValidatorSet`](types::ValidatorSet).
//! - [`messages`] and [`codec`]: the consensus messages, and the boundary that decodes them from their
//!   legacy and current wire representations.
//! - [`admission`]: the pure classification of a message against the current view and state.
//! - [`priority`]: the order in which deferred messages are drained.
//! - [`backlog`]: the per-sender store of deferred messages, and the drain that replays them.
//! - [`pluggables`]: the traits through which the backlog reads from and dispatches into the engine.
//! - [`config`], [`events`] and [`logging`]: configuration and observability.
//!
//! ## Using the backlog
//!
//! ```ignore
//! let round_state = SharedRoundState::new(View::new(0, 0), ConsensusState::AcceptRequest);
//! let (to_engine, engine_inbox) = mpsc::channel();
//! let backlog = Backlog::new(
//!     Configuration::builder().me(my_key).build(),
//!     round_state.clone(),
//!     validators,
//!     to_engine,
//! );
//!
//! // For every message from the network:
//! backlog.receive(&sender, message);
//!
//! // Every time the engine moves to a new view or state:
//! round_state.set(new_view, new_state);
//! backlog.process();
//! ```

pub mod admission;

pub mod backlog;

pub mod codec;

pub mod config;

pub mod events;

pub mod logging;

pub mod messages;

pub mod pluggables;

pub mod priority;

pub mod types;
