use crate::errors::{Result, RootChainError};
use crate::helpers::{epoch_event, next_request_slot};
use crate::requests::UnsealedRange;
use crate::store::{require_block, require_epoch, Store};
use containers::{
    BlockNumber, Epoch, EpochKind, Fork, ForkNumber, RebasePlan, RebasedRequests,
    RequestCategory, RootChainEvent,
};
use tracing::info;

/// A child fork ready to be committed, with its user-activated epoch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForkPlan {
    pub parent: ForkNumber,
    pub fork: Fork,
    pub epoch: Epoch,
    pub sealed_erus: UnsealedRange,
}

/// Plans a child of the active fork rooted right after its last finalized
/// block.
///
/// Unfinalized request epochs of the parent at or after the fork point are
/// replayed by the child's ORE', its unfinalized NRBs by the NRE'.
pub fn plan_fork(store: &Store) -> Result<ForkPlan> {
    let parent_number = store.current_fork;
    let parent = store.active_fork();
    let first_block = parent.last_finalized_block + 1;
    let first_epoch = if first_block <= parent.last_block {
        require_block(store, parent_number, first_block)?.epoch_number
    } else {
        parent.current_epoch()
    };

    let mut requests: Option<RebasedRequests> = None;
    let mut orb_references: Vec<Option<BlockNumber>> = Vec::new();
    for epoch_number in first_epoch..=parent.current_epoch() {
        let epoch = require_epoch(store, parent_number, epoch_number)?;
        if !epoch.kind.carries_eros() || epoch.kind.is_empty() {
            continue;
        }

        match requests.as_mut() {
            None => {
                requests = Some(RebasedRequests {
                    request_start: epoch.request_start,
                    request_end: epoch.request_end,
                    first_request_block_id: epoch.first_request_block_id,
                })
            }
            Some(range) => {
                let contiguous = epoch.request_start == range.request_end + 1
                    && epoch.first_request_block_id
                        == range.first_request_block_id + orb_references.len() as u64;
                if !contiguous {
                    return Err(RootChainError::InvariantViolation(format!(
                        "pending request epoch {epoch_number} is not contiguous with its predecessors"
                    )));
                }
                range.request_end = epoch.request_end;
            }
        }

        orb_references.extend(
            (epoch.start_block_number..=epoch.end_block_number)
                .map(|block_number| (block_number <= parent.last_block).then_some(block_number)),
        );
    }

    let mut nrb_references = Vec::new();
    for block_number in first_block..=parent.last_block {
        if !require_block(store, parent_number, block_number)?.is_request {
            nrb_references.push(block_number);
        }
    }

    let slot = next_request_slot(store, parent_number, &[], first_epoch, RequestCategory::Eru)?;
    let range = slot.pending.ok_or(RootChainError::NoPendingUserRequests)?;

    let epoch = Epoch {
        kind: EpochKind::UserActivated,
        start_block_number: first_block,
        end_block_number: first_block + range.num_blocks - 1,
        request_start: range.request_start,
        request_end: range.request_end,
        first_request_block_id: range.first_request_block_id,
        timestamp: store.time,
        finalized: false,
    };

    let fork = Fork {
        first_block,
        last_block: first_block - 1,
        first_epoch,
        last_epoch: first_epoch - 1,
        last_finalized_block: parent.last_finalized_block,
        forked_block: None,
        timestamp: store.time,
        rebase: Some(RebasePlan {
            requests,
            orb_references,
            nrb_references,
        }),
    };

    Ok(ForkPlan {
        parent: parent_number,
        fork,
        epoch,
        sealed_erus: range,
    })
}

/// Freezes the parent and makes the planned child the active fork.
pub fn commit_fork(store: &mut Store, plan: ForkPlan) -> Result<ForkNumber> {
    store.erus.seal(&plan.sealed_erus)?;

    let ForkPlan {
        parent, fork, epoch, ..
    } = plan;
    let new_fork = store.forks.len() as ForkNumber;
    let first_block = fork.first_block;
    let first_epoch = fork.first_epoch;

    store.forks[parent as usize].forked_block = Some(first_block);
    store.forks.push(fork);
    store.current_fork = new_fork;

    let prepared = epoch_event(new_fork, first_epoch, &epoch);
    store.epochs.insert((new_fork, first_epoch), epoch);
    store.events.push(RootChainEvent::Forked {
        new_fork,
        forked_block: first_block,
        first_epoch,
    });
    store.events.push(prepared);

    info!(
        parent,
        fork = new_fork,
        forked_block = first_block,
        first_epoch,
        "fork created"
    );
    Ok(new_fork)
}
