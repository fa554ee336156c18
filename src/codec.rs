/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The decoding boundary between the wire and the backlog.
//!
//! Peers may send consensus messages in one of two representations:
//! 1. [`LegacyMessage`]: a coded envelope, `{ code, payload }`, whose payload has to be decoded
//!    according to its code (a [`Preprepare`] for pre-prepares, a [`RoundChange`] for round changes,
//!    and a [`Subject`] for prepares and commits).
//! 2. The current form: a [`ConsensusMessage`] serialized as is.
//!
//! [`decode`] normalizes both into a [`ConsensusMessage`], so nothing past this module branches on
//! how a message was represented on the wire. Both representations are serialized with Borsh.

use std::io;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::messages::{ConsensusMessage, MessageKind, Preprepare, RoundChange, Subject};

/// A consensus message as it travels on the wire.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum WireMessage {
    Legacy(LegacyMessage),
    Current(ConsensusMessage),
}

/// The legacy coded envelope. `payload` is the Borsh serialization of the kind-specific payload
/// identified by `code` (see [`MessageKind::code`]).
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct LegacyMessage {
    pub code: u64,
    pub payload: Vec<u8>,
}

impl LegacyMessage {
    /// Wrap `message` in a legacy envelope.
    pub fn encode(message: &ConsensusMessage) -> io::Result<LegacyMessage> {
        let payload = match message {
            ConsensusMessage::Preprepare(preprepare) => preprepare.try_to_vec()?,
            ConsensusMessage::Prepare(subject) | ConsensusMessage::Commit(subject) => {
                subject.try_to_vec()?
            }
            ConsensusMessage::RoundChange(round_change) => round_change.try_to_vec()?,
        };

        Ok(LegacyMessage {
            code: message.kind().code(),
            payload,
        })
    }
}

impl From<ConsensusMessage> for WireMessage {
    fn from(value: ConsensusMessage) -> Self {
        WireMessage::Current(value)
    }
}

impl From<LegacyMessage> for WireMessage {
    fn from(value: LegacyMessage) -> Self {
        WireMessage::Legacy(value)
    }
}

/// Normalize a [`WireMessage`] into a [`ConsensusMessage`].
pub fn decode(wire: WireMessage) -> Result<ConsensusMessage, DecodeError> {
    match wire {
        WireMessage::Current(message) => Ok(message),
        WireMessage::Legacy(legacy) => decode_legacy(&legacy),
    }
}

/// Deserialize a [`WireMessage`] from `bytes` and normalize it into a [`ConsensusMessage`].
pub fn decode_bytes(bytes: &[u8]) -> Result<ConsensusMessage, DecodeError> {
    let wire = WireMessage::try_from_slice(bytes).map_err(DecodeError::MalformedEnvelope)?;
    decode(wire)
}

fn decode_legacy(legacy: &LegacyMessage) -> Result<ConsensusMessage, DecodeError> {
    let kind =
        MessageKind::from_code(legacy.code).ok_or(DecodeError::UnknownCode { code: legacy.code })?;
    let malformed_payload = |source| DecodeError::MalformedPayload { kind, source };

    Ok(match kind {
        MessageKind::Preprepare => ConsensusMessage::Preprepare(
            Preprepare::try_from_slice(&legacy.payload).map_err(malformed_payload)?,
        ),
        MessageKind::Prepare => ConsensusMessage::Prepare(
            Subject::try_from_slice(&legacy.payload).map_err(malformed_payload)?,
        ),
        MessageKind::Commit => ConsensusMessage::Commit(
            Subject::try_from_slice(&legacy.payload).map_err(malformed_payload)?,
        ),
        MessageKind::RoundChange => ConsensusMessage::RoundChange(
            RoundChange::try_from_slice(&legacy.payload).map_err(malformed_payload)?,
        ),
    })
}

/// The different ways decoding a [`WireMessage`] can fail.
#[derive(Debug)]
pub enum DecodeError {
    /// The bytes are not the Borsh serialization of a [`WireMessage`].
    MalformedEnvelope(io::Error),

    /// A legacy envelope carries a code that does not correspond to any [`MessageKind`].
    UnknownCode { code: u64 },

    /// A legacy envelope's payload is not the Borsh serialization of the payload for its `kind`.
    MalformedPayload { kind: MessageKind, source: io::Error },
}
