mod common;

use common::*;
use containers::*;
use pretty_assertions::assert_eq;
use root_chain::*;

#[test]
fn test_user_activated_fork_replays_pending_parent_work() {
    let mut store = store_after_first_requests();
    enter(&mut store, ALICE, 7);
    exit(&mut store, BOB, 3);
    fill_current_epoch(&mut store);
    fill_current_epoch(&mut store);
    assert_eq!(last_epoch(&store, 0), Some(6));

    for requestor in [ALICE, BOB, ALICE, BOB] {
        make_eru(&mut store, requestor, 50);
    }
    assert_eq!(num_urbs(&store), 2);

    assert!(matches!(
        prepare_urb(&mut store, CAROL),
        Err(RootChainError::OperatorStillActive { .. })
    ));
    advance(&mut store, 30);
    prepare_urb(&mut store, CAROL).unwrap();

    assert_eq!(submit_urb(&mut store, CAROL).unwrap(), 6);
    assert_eq!(store.current_fork, 1);
    assert_eq!(store.num_forks(), 2);
    assert_eq!(store.urb_preparation, None);
    assert_eq!(store.forks[0].forked_block, Some(6));

    let fork = get_fork(&store, 1).unwrap();
    assert_eq!((fork.first_block, fork.first_epoch), (6, 5));
    assert_eq!(fork.last_finalized_block, 5);
    assert_eq!(
        fork.rebase,
        Some(RebasePlan {
            requests: Some(RebasedRequests {
                request_start: 2,
                request_end: 3,
                first_request_block_id: 1,
            }),
            orb_references: vec![Some(8)],
            nrb_references: vec![6, 7],
        })
    );

    let ure = get_epoch(&store, 1, 5).unwrap();
    assert_eq!(ure.kind, EpochKind::UserActivated);
    assert_eq!((ure.start_block_number, ure.end_block_number), (6, 7));
    assert_eq!((ure.request_start, ure.request_end), (0, 3));

    let urb = get_block(&store, 1, 6).unwrap();
    assert!(urb.is_request && urb.user_activated);
    assert_eq!(urb.request_block_id, Some(0));
    assert_eq!(get_block(&store, 1, 5), get_block(&store, 0, 5));

    // The parent fork is frozen.
    let fee = store.config.cost_nrb;
    assert!(matches!(
        on_submit_nrb(&mut store, OPERATOR, 0, header(99), fee),
        Err(RootChainError::ForkMismatch { given: 0, current: 1 })
    ));

    assert_eq!(submit_urb(&mut store, ALICE).unwrap(), 7);
    assert_eq!(last_epoch(&store, 1), Some(5));
    let ore_rebased = get_epoch(&store, 1, 6).unwrap();
    assert_eq!(ore_rebased.kind, EpochKind::RebasedRequest { empty: false });
    assert_eq!(
        (ore_rebased.start_block_number, ore_rebased.end_block_number),
        (8, 8)
    );
    assert_eq!((ore_rebased.request_start, ore_rebased.request_end), (2, 3));
    assert!(matches!(
        store.events.last(),
        Some(RootChainEvent::EpochRebased { epoch_number: 6, .. })
    ));

    submit_orb(&mut store).unwrap();
    let replayed = get_block(&store, 1, 8).unwrap();
    assert_eq!(replayed.reference_block, Some(8));
    assert_eq!(replayed.request_block_id, Some(1));

    let nre_rebased = current_epoch(&store);
    assert_eq!(nre_rebased.kind, EpochKind::RebasedNonRequest { empty: false });
    assert_eq!(
        (nre_rebased.start_block_number, nre_rebased.end_block_number),
        (9, 10)
    );
    submit_nrb(&mut store).unwrap();
    submit_nrb(&mut store).unwrap();
    assert_eq!(get_block(&store, 1, 9).unwrap().reference_block, Some(6));
    assert_eq!(get_block(&store, 1, 10).unwrap().reference_block, Some(7));
    assert_eq!(last_epoch(&store, 1), Some(7));
    assert_eq!(current_epoch(&store).kind, EpochKind::NonRequest);

    exit(&mut store, ALICE, 1);
    assert_eq!(fill_current_epoch(&mut store), 9);
    let ore = current_epoch(&store);
    assert_eq!(ore.kind, EpochKind::Request { empty: false });
    assert_eq!((ore.request_start, ore.request_end), (4, 4));
    assert_eq!(ore.first_request_block_id, 2);
    assert_eq!(first_filled_ore_number(&store, 1), Some(9));
    assert_epochs_contiguous(&store, 1);

    assert_eq!(finalize_all(&mut store), 7);
    assert!(!get_block(&store, 0, 8).unwrap().finalized);
    assert_eq!(
        apply_all(&mut store),
        vec![
            (RequestCategory::Eru, 0),
            (RequestCategory::Eru, 1),
            (RequestCategory::Eru, 2),
            (RequestCategory::Eru, 3),
            (RequestCategory::Ero, 2),
            (RequestCategory::Ero, 3),
        ]
    );
    assert_eq!(token_balance(&store, &ALICE), INITIAL_BALANCE - 10 - 7 + 100);
    assert_eq!(token_balance(&store, &BOB), INITIAL_BALANCE + 5 + 3 + 100);
}

#[test]
fn test_fork_without_pending_requests_gets_empty_rebase_epochs() {
    let mut store = store_after_first_requests();
    make_eru(&mut store, ALICE, 1);
    prepare_urb(&mut store, CAROL).unwrap();
    submit_urb(&mut store, CAROL).unwrap();

    let fork = get_fork(&store, 1).unwrap();
    assert_eq!((fork.first_block, fork.first_epoch), (6, 5));
    assert_eq!(
        fork.rebase,
        Some(RebasePlan {
            requests: None,
            orb_references: vec![],
            nrb_references: vec![],
        })
    );

    let ore_rebased = get_epoch(&store, 1, 6).unwrap();
    assert_eq!(ore_rebased.kind, EpochKind::RebasedRequest { empty: true });
    assert_eq!(
        (ore_rebased.start_block_number, ore_rebased.end_block_number),
        (6, 6)
    );
    assert_eq!((ore_rebased.request_end, ore_rebased.first_request_block_id), (1, 0));

    let nre_rebased = get_epoch(&store, 1, 7).unwrap();
    assert_eq!(nre_rebased.kind, EpochKind::RebasedNonRequest { empty: true });

    assert_eq!(last_epoch(&store, 1), Some(7));
    let nre = current_epoch(&store);
    assert_eq!(nre.kind, EpochKind::NonRequest);
    assert_eq!((nre.start_block_number, nre.end_block_number), (7, 8));
}

#[test]
fn test_next_fork_waits_for_user_activated_epoch_finalization() {
    let mut store = store_after_first_requests();
    make_eru(&mut store, ALICE, 1);
    prepare_urb(&mut store, CAROL).unwrap();
    submit_urb(&mut store, CAROL).unwrap();

    make_eru(&mut store, BOB, 1);
    advance(&mut store, 30);
    assert!(matches!(
        prepare_urb(&mut store, CAROL),
        Err(RootChainError::UserActivatedEpochPending { epoch_number: 5 })
    ));

    assert_eq!(finalize_all(&mut store), 1);
    prepare_urb(&mut store, CAROL).unwrap();
    assert_eq!(submit_urb(&mut store, CAROL).unwrap(), 7);

    assert_eq!(store.current_fork, 2);
    assert_eq!(store.forks[1].forked_block, Some(7));
    let fork = get_fork(&store, 2).unwrap();
    assert_eq!((fork.first_block, fork.first_epoch), (7, 8));

    let ure = get_epoch(&store, 2, 8).unwrap();
    assert_eq!(ure.kind, EpochKind::UserActivated);
    assert_eq!((ure.request_start, ure.request_end), (1, 1));
    assert_eq!(ure.first_request_block_id, 1);
    assert_epochs_contiguous(&store, 2);
}

#[test]
fn test_rebase_keeps_unsubmitted_request_blocks() {
    let mut store = store_after_first_requests();
    enter(&mut store, ALICE, 1);
    fill_current_epoch(&mut store);
    make_eru(&mut store, BOB, 1);
    advance(&mut store, 30);
    prepare_urb(&mut store, CAROL).unwrap();
    submit_urb(&mut store, CAROL).unwrap();

    let plan = get_fork(&store, 1).unwrap().rebase.clone().unwrap();
    assert_eq!(
        plan.requests,
        Some(RebasedRequests {
            request_start: 2,
            request_end: 2,
            first_request_block_id: 1,
        })
    );
    assert_eq!(plan.orb_references, vec![None]);
    assert_eq!(plan.nrb_references, vec![6, 7]);

    let ore_rebased = current_epoch(&store);
    assert_eq!(ore_rebased.kind, EpochKind::RebasedRequest { empty: false });
    assert_eq!(
        (ore_rebased.start_block_number, ore_rebased.end_block_number),
        (7, 7)
    );

    submit_orb(&mut store).unwrap();
    let replayed = get_block(&store, 1, 7).unwrap();
    assert_eq!(replayed.reference_block, None);
    assert_eq!(replayed.request_block_id, Some(1));
}

#[test]
fn test_preparation_requires_pending_user_requests() {
    let mut store = store_after_first_requests();
    assert!(matches!(
        prepare_urb(&mut store, CAROL),
        Err(RootChainError::NoPendingUserRequests)
    ));
}

#[test]
fn test_preparation_requires_operator_timeout() {
    let mut store = new_store();
    make_eru(&mut store, ALICE, 1);
    assert!(matches!(
        prepare_urb(&mut store, CAROL),
        Err(RootChainError::OperatorStillActive {
            last_submission: GENESIS_TIME,
            not_before: 1_030,
        })
    ));
}

#[test]
fn test_preparation_fee_and_uniqueness() {
    let mut store = store_after_first_requests();
    make_eru(&mut store, ALICE, 1);
    let fee = store.config.cost_urb_prepare;

    assert!(matches!(
        on_prepare_to_submit_urb(&mut store, CAROL, fee - 1),
        Err(RootChainError::InvalidCost { .. })
    ));
    prepare_urb(&mut store, CAROL).unwrap();
    assert!(matches!(
        prepare_urb(&mut store, BOB),
        Err(RootChainError::UrbAlreadyPrepared)
    ));
}

#[test]
fn test_expired_preparation_can_be_renewed() {
    let mut store = store_after_first_requests();
    make_eru(&mut store, ALICE, 1);
    prepare_urb(&mut store, CAROL).unwrap();
    advance(&mut store, 61);

    assert!(matches!(
        submit_urb(&mut store, CAROL),
        Err(RootChainError::UrbPreparationExpired { deadline: 1_095 })
    ));
    assert_eq!(store.current_fork, 0);

    prepare_urb(&mut store, CAROL).unwrap();
    assert_eq!(submit_urb(&mut store, CAROL).unwrap(), 6);
    assert_eq!(store.current_fork, 1);
}

#[test]
fn test_urb_without_preparation_is_rejected() {
    let mut store = store_after_first_requests();
    make_eru(&mut store, ALICE, 1);
    assert!(matches!(
        submit_urb(&mut store, CAROL),
        Err(RootChainError::UrbNotPrepared)
    ));
}

#[test]
fn test_rebase_merges_pending_request_epochs() {
    let mut store = store_after_first_requests();
    enter(&mut store, ALICE, 1);
    fill_current_epoch(&mut store);
    fill_current_epoch(&mut store);
    enter(&mut store, BOB, 1);
    fill_current_epoch(&mut store);
    assert_eq!(fill_current_epoch(&mut store), 9);

    make_eru(&mut store, ALICE, 1);
    advance(&mut store, 30);
    prepare_urb(&mut store, CAROL).unwrap();
    assert_eq!(submit_urb(&mut store, CAROL).unwrap(), 6);

    assert_eq!(
        get_fork(&store, 1).unwrap().rebase,
        Some(RebasePlan {
            requests: Some(RebasedRequests {
                request_start: 2,
                request_end: 3,
                first_request_block_id: 1,
            }),
            orb_references: vec![Some(8), Some(11)],
            nrb_references: vec![6, 7, 9, 10],
        })
    );

    let ore_rebased = current_epoch(&store);
    assert_eq!(ore_rebased.kind, EpochKind::RebasedRequest { empty: false });
    assert_eq!(
        (ore_rebased.start_block_number, ore_rebased.end_block_number),
        (7, 8)
    );
    assert_eq!((ore_rebased.request_start, ore_rebased.request_end), (2, 3));

    submit_orb(&mut store).unwrap();
    submit_orb(&mut store).unwrap();
    for (block_number, reference, request_block_id) in [(7, 8, 1), (8, 11, 2)] {
        let block = get_block(&store, 1, block_number).unwrap();
        assert_eq!(block.reference_block, Some(reference));
        assert_eq!(block.request_block_id, Some(request_block_id));
    }

    assert_eq!(fill_current_epoch(&mut store), 8);
    let references: Vec<_> = (9..=12)
        .map(|block_number| get_block(&store, 1, block_number).unwrap().reference_block)
        .collect();
    assert_eq!(references, vec![Some(6), Some(7), Some(9), Some(10)]);
    assert_epochs_contiguous(&store, 1);

    assert_eq!(finalize_all(&mut store), 7);
    assert!(!get_block(&store, 0, 11).unwrap().finalized);
    assert_eq!(
        apply_all(&mut store),
        vec![
            (RequestCategory::Eru, 0),
            (RequestCategory::Ero, 2),
            (RequestCategory::Ero, 3),
        ]
    );
    assert_eq!(token_balance(&store, &ALICE), INITIAL_BALANCE - 10 - 1 + 1);
    assert_eq!(token_balance(&store, &BOB), INITIAL_BALANCE + 5 - 1);
}

#[test]
fn test_second_fork_replays_pending_rebased_epoch() {
    let mut store = store_after_first_requests();
    enter(&mut store, ALICE, 1);
    fill_current_epoch(&mut store);
    fill_current_epoch(&mut store);
    make_eru(&mut store, ALICE, 1);
    advance(&mut store, 30);
    prepare_urb(&mut store, CAROL).unwrap();
    assert_eq!(submit_urb(&mut store, CAROL).unwrap(), 6);
    assert_eq!(current_epoch(&store).kind, EpochKind::RebasedRequest { empty: false });

    // Only the URE finalizes; the ORE' is still waiting for its block.
    assert_eq!(finalize_all(&mut store), 1);
    make_eru(&mut store, BOB, 1);
    prepare_urb(&mut store, CAROL).unwrap();
    assert_eq!(submit_urb(&mut store, CAROL).unwrap(), 7);

    assert_eq!(store.current_fork, 2);
    assert_eq!(store.forks[1].forked_block, Some(7));
    let fork = get_fork(&store, 2).unwrap();
    assert_eq!((fork.first_block, fork.first_epoch), (7, 6));
    assert_eq!(
        fork.rebase,
        Some(RebasePlan {
            requests: Some(RebasedRequests {
                request_start: 2,
                request_end: 2,
                first_request_block_id: 1,
            }),
            orb_references: vec![None],
            nrb_references: vec![],
        })
    );

    let ore_rebased = current_epoch(&store);
    assert_eq!(ore_rebased.kind, EpochKind::RebasedRequest { empty: false });
    assert_eq!(
        (ore_rebased.start_block_number, ore_rebased.end_block_number),
        (8, 8)
    );
    submit_orb(&mut store).unwrap();
    let replayed = get_block(&store, 2, 8).unwrap();
    assert_eq!(replayed.reference_block, None);
    assert_eq!(replayed.request_block_id, Some(1));

    let nre = current_epoch(&store);
    assert_eq!(nre.kind, EpochKind::NonRequest);
    assert_eq!((nre.start_block_number, nre.end_block_number), (9, 10));
    assert_epochs_contiguous(&store, 2);

    assert_eq!(finalize_all(&mut store), 2);
    assert_eq!(
        apply_all(&mut store),
        vec![
            (RequestCategory::Eru, 0),
            (RequestCategory::Eru, 1),
            (RequestCategory::Ero, 2),
        ]
    );
    assert!((0..=2).all(|request_id| ero(&store, request_id).unwrap().finalized));
    assert!((0..=1).all(|request_id| eru(&store, request_id).unwrap().finalized));
    assert_eq!(token_balance(&store, &ALICE), INITIAL_BALANCE - 10 - 1 + 1);
    assert_eq!(token_balance(&store, &BOB), INITIAL_BALANCE + 5 + 1);
}

#[test]
fn test_rejected_first_urb_leaves_no_fork_behind() {
    let mut store = store_after_first_requests();
    make_eru(&mut store, ALICE, 1);
    prepare_urb(&mut store, CAROL).unwrap();

    // ERO sealing counter ahead of the epoch history: planning the empty
    // ORE' after the single-block URE fails.
    store.eros.num_sealed_blocks += 1;
    let events = store.events.len();
    let pending_erus = store.erus.unsealed();

    assert!(matches!(
        submit_urb(&mut store, CAROL),
        Err(RootChainError::InvariantViolation(_))
    ));
    assert_eq!(store.current_fork, 0);
    assert_eq!(store.num_forks(), 1);
    assert_eq!(store.forks[0].forked_block, None);
    assert!(store.urb_preparation.is_some());
    assert_eq!(store.erus.unsealed(), pending_erus);
    assert_eq!(store.events.len(), events);
    assert_eq!(last_block(&store, 0), Some(5));
}
