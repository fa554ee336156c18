//! Tests of the order in which deferred messages are drained.

use qbft_backlog::{
    messages::MessageKind,
    priority::{drain_rank, priority},
    types::View,
};

#[test]
fn within_a_round_preprepare_then_commit_then_prepare() {
    let view = View::new(7, 2);

    assert!(priority(MessageKind::Preprepare, &view) < priority(MessageKind::Commit, &view));
    assert!(priority(MessageKind::Commit, &view) < priority(MessageKind::Prepare, &view));
    assert!(drain_rank(MessageKind::RoundChange) < drain_rank(MessageKind::Preprepare));
}

#[test]
fn sequence_dominates_round_dominates_kind() {
    // The last message of a round is drained before the first message of the next round.
    assert!(
        priority(MessageKind::Prepare, &View::new(7, 2))
            < priority(MessageKind::Preprepare, &View::new(7, 3))
    );

    // The last message of a sequence is drained before the first message of the next sequence.
    assert!(
        priority(MessageKind::Prepare, &View::new(7, 40))
            < priority(MessageKind::Preprepare, &View::new(8, 0))
    );
}

#[test]
fn large_rounds_never_overtake_the_next_sequence() {
    for round in [99, 100, 1_000, u64::MAX] {
        assert!(
            priority(MessageKind::Prepare, &View::new(1, round))
                < priority(MessageKind::Preprepare, &View::new(2, 0)),
            "round {} overflowed into the sequence",
            round
        );
    }
}

#[test]
fn round_change_is_keyed_by_sequence_only() {
    assert_eq!(
        priority(MessageKind::RoundChange, &View::new(5, 0)),
        priority(MessageKind::RoundChange, &View::new(5, 9))
    );

    // Before every other message of its sequence, whatever their round.
    assert!(
        priority(MessageKind::RoundChange, &View::new(5, 9))
            < priority(MessageKind::Preprepare, &View::new(5, 0))
    );

    // After every message of the previous sequence.
    assert!(
        priority(MessageKind::RoundChange, &View::new(5, 0))
            > priority(MessageKind::Prepare, &View::new(4, 1_000))
    );
}

#[test]
fn priority_is_monotonic_in_view() {
    let views = [
        View::new(0, 0),
        View::new(0, 1),
        View::new(1, 0),
        View::new(1, 5),
        View::new(2, 0),
    ];

    for kind in [
        MessageKind::Preprepare,
        MessageKind::Prepare,
        MessageKind::Commit,
        MessageKind::RoundChange,
    ] {
        for window in views.windows(2) {
            assert!(priority(kind, &window[0]) <= priority(kind, &window[1]));
        }
    }
}
