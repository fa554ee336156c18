//! Tests of [`classify`] against every row of the admission table, and of the properties the backlog
//! relies on when it re-classifies deferred messages.

use qbft_backlog::{
    admission::{classify, Classification},
    messages::MessageKind,
    types::{ConsensusState, View},
};

const KINDS: [MessageKind; 4] = [
    MessageKind::Preprepare,
    MessageKind::Prepare,
    MessageKind::Commit,
    MessageKind::RoundChange,
];

const STATES: [ConsensusState; 4] = [
    ConsensusState::AcceptRequest,
    ConsensusState::Preprepared,
    ConsensusState::Prepared,
    ConsensusState::Committed,
];

const CURRENT_VIEW: View = View::new(5, 1);

fn classify_at(state: ConsensusState, kind: MessageKind, message_view: View) -> Classification {
    classify(&CURRENT_VIEW, state, kind, Some(&message_view))
}

#[test]
fn malformed_view_is_invalid() {
    for state in STATES {
        for kind in KINDS {
            assert_eq!(
                classify(&CURRENT_VIEW, state, kind, None),
                Classification::Invalid
            );
        }
    }
}

#[test]
fn same_view_follows_state_table() {
    use Classification::*;
    use ConsensusState::*;

    // (state, [Preprepare, Prepare, Commit])
    let table = [
        (AcceptRequest, [Admit, Future, Future]),
        (Preprepared, [Invalid, Admit, Future]),
        (Prepared, [Invalid, Invalid, Admit]),
        (Committed, [Invalid, Invalid, Invalid]),
    ];

    for (state, expected) in table {
        let kinds = [
            MessageKind::Preprepare,
            MessageKind::Prepare,
            MessageKind::Commit,
        ];
        for (kind, expected) in kinds.into_iter().zip(expected) {
            assert_eq!(
                classify_at(state, kind, CURRENT_VIEW),
                expected,
                "{} in state {}",
                kind,
                state
            );
        }
    }
}

#[test]
fn later_view_is_future_and_earlier_view_is_stale() {
    for state in STATES {
        for kind in [
            MessageKind::Preprepare,
            MessageKind::Prepare,
            MessageKind::Commit,
        ] {
            assert_eq!(
                classify_at(state, kind, CURRENT_VIEW.next_round()),
                Classification::Future
            );
            assert_eq!(
                classify_at(state, kind, CURRENT_VIEW.next_sequence()),
                Classification::Future
            );
            assert_eq!(
                classify_at(state, kind, View::new(5, 0)),
                Classification::Stale
            );
            assert_eq!(
                classify_at(state, kind, View::new(4, 9)),
                Classification::Stale
            );
        }
    }
}

#[test]
fn round_change_window() {
    for state in STATES {
        // A later sequence is deferred.
        assert_eq!(
            classify_at(state, MessageKind::RoundChange, View::new(6, 0)),
            Classification::Future
        );

        // Any round of the current sequence that is not behind the current view is admitted,
        // whatever the state.
        assert_eq!(
            classify_at(state, MessageKind::RoundChange, CURRENT_VIEW),
            Classification::Admit
        );
        assert_eq!(
            classify_at(state, MessageKind::RoundChange, View::new(5, 7)),
            Classification::Admit
        );

        // Lower round in the same sequence, or an earlier sequence.
        assert_eq!(
            classify_at(state, MessageKind::RoundChange, View::new(5, 0)),
            Classification::Stale
        );
        assert_eq!(
            classify_at(state, MessageKind::RoundChange, View::new(4, 3)),
            Classification::Stale
        );
    }
}

#[test]
fn classification_is_idempotent() {
    let views = [
        View::new(4, 0),
        View::new(5, 0),
        CURRENT_VIEW,
        View::new(5, 2),
        View::new(6, 0),
    ];

    for state in STATES {
        for kind in KINDS {
            for view in views {
                let first = classify_at(state, kind, view);
                let second = classify_at(state, kind, view);
                assert_eq!(first, second);
            }
        }
    }
}

#[test]
fn views_behind_an_advanced_view_are_never_future() {
    // Once the replica is past `passed`, nothing at or below `passed` can be deferred.
    let passed = View::new(3, 2);
    let advanced_views = [View::new(3, 3), View::new(4, 0), View::new(9, 9)];
    let old_views = [passed, View::new(3, 0), View::new(2, 7), View::new(0, 0)];

    for current in advanced_views {
        for state in STATES {
            for kind in KINDS {
                for old in old_views {
                    let classification = classify(&current, state, kind, Some(&old));
                    assert!(
                        matches!(classification, Classification::Stale | Classification::Invalid),
                        "{} for {} at {} in {} was {:?}",
                        kind,
                        old,
                        current,
                        state,
                        classification
                    );
                }
            }
        }
    }
}

#[test]
fn next_views_saturate_at_the_last_view() {
    let last = View::new(u64::MAX, u64::MAX);

    assert_eq!(last.next_round(), last);
    assert_eq!(last.next_sequence(), View::new(u64::MAX, 0));
    assert_eq!(View::new(3, 7).next_round(), View::new(3, 8));
    assert_eq!(View::new(3, 7).next_sequence(), View::new(4, 0));
}

#[test]
fn replicas_start_accepting_requests() {
    assert_eq!(ConsensusState::default(), ConsensusState::AcceptRequest);
}
