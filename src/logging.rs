/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the backlog's
//! [configuration](crate::config::Configuration).
//!
//! The backlog logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least three values. The first three values
//! are always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//! 3. The first seven characters of the Base64 encoding of the sender's verifying key.
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [Defer](crate::events::DeferEvent) is printed:
//!
//! ```text
//! Defer, 1701329264, Id5u7f6, Prepare, (5, 0), kX2pQv9, 3
//! ```
//!
//! In the snippet, the fourth, fifth and sixth values are the kind, view and digest of the deferred
//! message, and the seventh is the length of the sender's backlog after the insertion.

use std::time::SystemTime;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use log;

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const RECEIVE: &str = "Receive";
pub const DEFER: &str = "Defer";
pub const REPLAY: &str = "Replay";
pub const DISCARD: &str = "Discard";
pub const PURGE_SENDER: &str = "PurgeSender";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync>;
}

impl Logger for ReceiveEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |receive_event: &ReceiveEvent| {
            log::debug!(
                "{}, {}, {}, {}, {}, {}",
                RECEIVE,
                secs_since_unix_epoch(receive_event.timestamp),
                first_seven_base64_chars(&receive_event.origin.to_bytes()),
                receive_event.kind,
                receive_event.view,
                receive_event.classification.name()
            )
        };
        Box::new(logger)
    }
}

impl Logger for DeferEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |defer_event: &DeferEvent| {
            log::debug!(
                "{}, {}, {}, {}, {}, {}, {}",
                DEFER,
                secs_since_unix_epoch(defer_event.timestamp),
                first_seven_base64_chars(&defer_event.origin.to_bytes()),
                defer_event.kind,
                defer_event.view,
                first_seven_base64_chars(&defer_event.digest),
                defer_event.backlog_len
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReplayEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |replay_event: &ReplayEvent| {
            log::trace!(
                "{}, {}, {}, {}, {}, {}",
                REPLAY,
                secs_since_unix_epoch(replay_event.timestamp),
                first_seven_base64_chars(&replay_event.origin.to_bytes()),
                replay_event.kind,
                replay_event.view,
                first_seven_base64_chars(&replay_event.digest)
            )
        };
        Box::new(logger)
    }
}

impl Logger for DiscardEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |discard_event: &DiscardEvent| {
            log::trace!(
                "{}, {}, {}, {}, {}, {}, {:?}",
                DISCARD,
                secs_since_unix_epoch(discard_event.timestamp),
                first_seven_base64_chars(&discard_event.origin.to_bytes()),
                discard_event
                    .kind
                    .map_or("Unknown", |kind| kind.name()),
                discard_event
                    .view
                    .map_or(String::from("-"), |view| view.to_string()),
                discard_event
                    .digest
                    .map_or(String::from("-"), |digest| first_seven_base64_chars(&digest)),
                discard_event.reason
            )
        };
        Box::new(logger)
    }
}

impl Logger for PurgeSenderEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |purge_sender_event: &PurgeSenderEvent| {
            log::info!(
                "{}, {}, {}, {}",
                PURGE_SENDER,
                secs_since_unix_epoch(purge_sender_event.timestamp),
                first_seven_base64_chars(&purge_sender_event.origin.to_bytes()),
                purge_sender_event.discarded
            )
        };
        Box::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
pub(crate) fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
