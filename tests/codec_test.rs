//! Tests of the decoding boundary.

use borsh::BorshSerialize;
use qbft_backlog::{
    codec::{decode, decode_bytes, DecodeError, LegacyMessage, WireMessage},
    messages::{ConsensusMessage, MessageKind, RoundChange, Subject},
    types::{ReceivedView, View},
};

fn sample_messages() -> Vec<ConsensusMessage> {
    let view = View::new(12, 3);
    vec![
        ConsensusMessage::preprepare(view, vec![1, 2, 3]),
        ConsensusMessage::prepare(view, [4; 32]),
        ConsensusMessage::commit(view, [5; 32]),
        ConsensusMessage::RoundChange(RoundChange {
            view: view.into(),
            prepared_round: Some(2),
            prepared_digest: Some([6; 32]),
        }),
    ]
}

#[test]
fn legacy_and_current_forms_decode_to_the_same_message() {
    for message in sample_messages() {
        let legacy = LegacyMessage::encode(&message).unwrap();
        assert_eq!(legacy.code, message.kind().code());

        assert_eq!(decode(WireMessage::Legacy(legacy)).unwrap(), message);
        assert_eq!(decode(WireMessage::Current(message.clone())).unwrap(), message);
    }
}

#[test]
fn decode_bytes_reads_the_wire_envelope() {
    let message = ConsensusMessage::commit(View::new(3, 0), [9; 32]);

    let current = WireMessage::from(message.clone()).try_to_vec().unwrap();
    assert_eq!(decode_bytes(&current).unwrap(), message);

    let legacy = WireMessage::from(LegacyMessage::encode(&message).unwrap())
        .try_to_vec()
        .unwrap();
    assert_eq!(decode_bytes(&legacy).unwrap(), message);
}

#[test]
fn unknown_legacy_code_is_rejected() {
    let wire = WireMessage::Legacy(LegacyMessage {
        code: 42,
        payload: Vec::new(),
    });

    assert!(matches!(
        decode(wire),
        Err(DecodeError::UnknownCode { code: 42 })
    ));
}

#[test]
fn legacy_payload_must_match_its_code() {
    // Truncated in the middle of the round.
    let mut payload = Subject {
        view: View::new(1, 0).into(),
        digest: [0xff; 32],
    }
    .try_to_vec()
    .unwrap();
    payload.truncate(10);

    let wire = WireMessage::Legacy(LegacyMessage {
        code: MessageKind::Prepare.code(),
        payload,
    });

    assert!(matches!(
        decode(wire),
        Err(DecodeError::MalformedPayload {
            kind: MessageKind::Prepare,
            ..
        })
    ));
}

#[test]
fn garbage_bytes_are_a_malformed_envelope() {
    assert!(matches!(
        decode_bytes(&[7, 7, 7]),
        Err(DecodeError::MalformedEnvelope(_))
    ));
}

#[test]
fn missing_view_fields_survive_decoding() {
    let message = ConsensusMessage::Prepare(Subject {
        view: ReceivedView {
            sequence: Some(4),
            round: None,
        },
        digest: [1; 32],
    });
    let legacy = LegacyMessage::encode(&message).unwrap();

    let decoded = decode(WireMessage::Legacy(legacy)).unwrap();
    assert_eq!(decoded.view(), None);
    assert!(!decoded.received_view().is_well_formed());
}
