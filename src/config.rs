/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! User-defined parameters of a [`Backlog`](crate::backlog::Backlog).
//!
//! The configuration is defined using the builder pattern, for example:
//!
//! ```ignore
//! let configuration =
//!     Configuration::builder()
//!     .me(signing_key.verifying_key())
//!     .max_entries_per_sender(Some(1024))
//!     .log_events(true)
//!     .build()
//! ```

use ed25519_dalek::VerifyingKey;
use typed_builder::TypedBuilder;

/// Stores the user-defined parameters of a backlog, that is:
/// 1. The verifying key of the local replica. Messages from this key are never deferred.
/// 2. The maximum number of deferred messages kept for a single sender, if any.
/// 3. The "Log Events" flag. If set to "true", the default [loggers](crate::logging) are registered.
///
/// ## Maximum entries per sender
///
/// By default a sender's backlog is unbounded. When a bounded backlog is full and receives a new
/// message:
/// - If the new message would be drained after every message already in the backlog, it is refused.
/// - Otherwise, the message that would be drained last is evicted to make space for it.
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.me(...)`

    Optional:
    - `.max_entries_per_sender(...)`
    - `.log_events(...)`
"))]
pub struct Configuration {
    #[builder(setter(doc = "Set the local replica's verifying key. Required."))]
    pub me: VerifyingKey,
    #[builder(
        default,
        setter(doc = "Set the maximum number of deferred messages per sender. Defaults to unbounded.")
    )]
    pub max_entries_per_sender: Option<usize>,
    #[builder(
        default = true,
        setter(doc = "Enable logging? Defaults to true.")
    )]
    pub log_events: bool,
}
