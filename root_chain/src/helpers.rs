use crate::errors::{Result, RootChainError};
use crate::requests::UnsealedRange;
use crate::store::{get_epoch, get_fork, require_epoch, Store};
use containers::{
    Epoch, EpochKind, EpochNumber, ForkNumber, RebasePlan, RequestBlockId, RequestCategory,
    RequestId, RootChainEvent,
};
use tracing::info;

/// Block class a submission claims to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockClass {
    Nrb,
    Orb,
    Urb,
}

impl BlockClass {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Nrb => "NRB",
            Self::Orb => "ORB",
            Self::Urb => "URB",
        }
    }

    pub fn fits(&self, kind: &EpochKind) -> bool {
        match self {
            Self::Nrb => matches!(
                kind,
                EpochKind::NonRequest | EpochKind::RebasedNonRequest { empty: false }
            ),
            Self::Orb => matches!(
                kind,
                EpochKind::Request { empty: false } | EpochKind::RebasedRequest { empty: false }
            ),
            Self::Urb => matches!(kind, EpochKind::UserActivated),
        }
    }
}

/// Epochs to add to a fork once its current epoch completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EpochPlan {
    pub fork_number: ForkNumber,
    /// Empty epochs first, ending with the epoch that will be filled next.
    pub epochs: Vec<(EpochNumber, Epoch)>,
    pub sealed_eros: Option<UnsealedRange>,
}

/// Epoch lookups on one fork that also see epochs planned but not committed.
struct EpochView<'a> {
    store: &'a Store,
    fork_number: ForkNumber,
    planned: &'a [(EpochNumber, Epoch)],
}

impl EpochView<'_> {
    fn get(&self, epoch_number: EpochNumber) -> Option<&Epoch> {
        self.planned
            .iter()
            .find(|(number, _)| *number == epoch_number)
            .map(|(_, epoch)| epoch)
            .or_else(|| get_epoch(self.store, self.fork_number, epoch_number))
    }

    /// Closest filled epoch before `before` that took requests from `category`.
    fn previous_filled(&self, before: EpochNumber, category: RequestCategory) -> Option<&Epoch> {
        (1..before)
            .rev()
            .filter_map(|epoch_number| self.get(epoch_number))
            .find(|epoch| !epoch.kind.is_empty() && takes_from(&epoch.kind, category))
    }
}

fn takes_from(kind: &EpochKind, category: RequestCategory) -> bool {
    match category {
        RequestCategory::Ero => kind.carries_eros(),
        RequestCategory::Eru => kind.user_activated(),
    }
}

/// Where an empty request epoch leaves the request counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Carry {
    pub request_end: RequestId,
    pub first_request_block_id: RequestBlockId,
}

/// Request range the next filled epoch of `category` must take.
///
/// The position derived from epoch history must agree with the queue's own
/// sealing counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestSlot {
    pub carry: Carry,
    pub pending: Option<UnsealedRange>,
}

pub fn next_request_slot(
    store: &Store,
    fork_number: ForkNumber,
    planned: &[(EpochNumber, Epoch)],
    before: EpochNumber,
    category: RequestCategory,
) -> Result<RequestSlot> {
    let view = EpochView {
        store,
        fork_number,
        planned,
    };
    let previous = view.previous_filled(before, category);
    let expected_start = previous.map_or(0, |epoch| epoch.request_end + 1);
    let expected_block = previous.map_or(0, Epoch::next_request_block_id);
    let carry = Carry {
        request_end: previous.map_or(0, |epoch| epoch.request_end),
        first_request_block_id: previous.map_or(0, |epoch| epoch.first_request_block_id),
    };

    let queue = store.queue(category);
    if queue.num_sealed_blocks != expected_block {
        return Err(RootChainError::InvariantViolation(format!(
            "{category} history ends at request block {expected_block} but {} are sealed",
            queue.num_sealed_blocks
        )));
    }

    let Some(range) = queue.unsealed() else {
        return Ok(RequestSlot {
            carry,
            pending: None,
        });
    };

    if range.request_start != expected_start {
        return Err(RootChainError::InvariantViolation(format!(
            "{category} range starts at {} instead of {expected_start}",
            range.request_start
        )));
    }
    let num_requests = range.request_end - range.request_start + 1;
    if range.num_blocks != store.config.request_blocks_for(num_requests) {
        return Err(RootChainError::InvariantViolation(format!(
            "{num_requests} {category}s spread over {} request blocks",
            range.num_blocks
        )));
    }

    Ok(RequestSlot {
        carry,
        pending: Some(range),
    })
}

fn filled(kind: EpochKind, after: &Epoch, num_blocks: u64, timestamp: u64) -> Epoch {
    Epoch {
        kind,
        start_block_number: after.end_block_number + 1,
        end_block_number: after.end_block_number + num_blocks,
        request_start: 0,
        request_end: 0,
        first_request_block_id: 0,
        timestamp,
        finalized: false,
    }
}

/// Plans the successors of `completed` on `fork_number`.
///
/// Empty successors complete on the spot, so the plan keeps going until it
/// reaches an epoch that holds blocks.
pub fn plan_epochs_after(
    store: &Store,
    fork_number: ForkNumber,
    completed: EpochNumber,
) -> Result<EpochPlan> {
    let fork = get_fork(store, fork_number).ok_or(RootChainError::MissingEpoch {
        fork_number,
        epoch_number: completed,
    })?;
    let previous = require_epoch(store, fork_number, completed)?.clone();
    let rebase = fork.rebase.clone().unwrap_or_default();

    plan_successors(store, fork_number, fork_number, &rebase, &[], completed, previous)
}

/// Plans the successors of `completed` for `fork_number`, reading earlier
/// epochs through `lookup_fork` plus `staged`.
///
/// A fork that is not committed yet is planned with its parent as
/// `lookup_fork` and its own epochs in `staged`. Only epochs below the one
/// being planned are ever read, so the parent's epochs from the fork point
/// on stay hidden behind `staged`.
pub fn plan_successors(
    store: &Store,
    fork_number: ForkNumber,
    lookup_fork: ForkNumber,
    rebase: &RebasePlan,
    staged: &[(EpochNumber, Epoch)],
    completed: EpochNumber,
    mut previous: Epoch,
) -> Result<EpochPlan> {
    let time = store.time;
    let mut epoch_number = completed + 1;
    let mut epochs = staged.to_vec();
    let mut sealed_eros = None;

    loop {
        let anchor = previous.end_block_number;
        let epoch = match previous.kind {
            EpochKind::NonRequest => {
                let slot =
                    next_request_slot(store, lookup_fork, &epochs, epoch_number, RequestCategory::Ero)?;
                match slot.pending {
                    Some(range) => {
                        sealed_eros = Some(range);
                        Epoch {
                            request_start: range.request_start,
                            request_end: range.request_end,
                            first_request_block_id: range.first_request_block_id,
                            ..filled(
                                EpochKind::Request { empty: false },
                                &previous,
                                range.num_blocks,
                                time,
                            )
                        }
                    }
                    None => Epoch::empty(
                        EpochKind::Request { empty: true },
                        anchor,
                        slot.carry.request_end,
                        slot.carry.first_request_block_id,
                        time,
                    ),
                }
            }
            EpochKind::UserActivated => match rebase.requests {
                Some(requests) => Epoch {
                    request_start: requests.request_start,
                    request_end: requests.request_end,
                    first_request_block_id: requests.first_request_block_id,
                    ..filled(
                        EpochKind::RebasedRequest { empty: false },
                        &previous,
                        rebase.orb_references.len() as u64,
                        time,
                    )
                },
                None => {
                    let carry =
                        next_request_slot(store, lookup_fork, &epochs, epoch_number, RequestCategory::Ero)?
                            .carry;
                    Epoch::empty(
                        EpochKind::RebasedRequest { empty: true },
                        anchor,
                        carry.request_end,
                        carry.first_request_block_id,
                        time,
                    )
                }
            },
            EpochKind::RebasedRequest { .. } if !rebase.nrb_references.is_empty() => filled(
                EpochKind::RebasedNonRequest { empty: false },
                &previous,
                rebase.nrb_references.len() as u64,
                time,
            ),
            EpochKind::RebasedRequest { .. } => {
                Epoch::empty(EpochKind::RebasedNonRequest { empty: true }, anchor, 0, 0, time)
            }
            EpochKind::Request { .. } | EpochKind::RebasedNonRequest { .. } => {
                filled(EpochKind::NonRequest, &previous, store.config.nre_length, time)
            }
        };

        let is_empty = epoch.kind.is_empty();
        epochs.push((epoch_number, epoch.clone()));
        if !is_empty {
            break;
        }
        previous = epoch;
        epoch_number += 1;
    }

    Ok(EpochPlan {
        fork_number,
        epochs: epochs.split_off(staged.len()),
        sealed_eros,
    })
}

/// Applies a plan: the last planned epoch becomes current, the rest are
/// completed.
pub fn commit_epoch_plan(store: &mut Store, plan: EpochPlan) -> Result<()> {
    if let Some(range) = &plan.sealed_eros {
        store.eros.seal(range)?;
    }

    let fork_number = plan.fork_number;
    let mut last_planned = None;
    for (epoch_number, epoch) in plan.epochs {
        let event = epoch_event(fork_number, epoch_number, &epoch);
        info!(
            fork = fork_number,
            epoch = epoch_number,
            kind = %epoch.kind,
            start = epoch.start_block_number,
            end = epoch.end_block_number,
            "epoch prepared"
        );
        store.epochs.insert((fork_number, epoch_number), epoch);
        store.events.push(event);
        last_planned = Some(epoch_number);
    }

    if let Some(current) = last_planned {
        store.forks[fork_number as usize].last_epoch = current - 1;
    }
    Ok(())
}

pub fn epoch_event(fork_number: ForkNumber, epoch_number: EpochNumber, epoch: &Epoch) -> RootChainEvent {
    if epoch.kind.rebase() {
        RootChainEvent::EpochRebased {
            fork_number,
            epoch_number,
            start_block_number: epoch.start_block_number,
            end_block_number: epoch.end_block_number,
            request_start: epoch.request_start,
            request_end: epoch.request_end,
            kind: epoch.kind,
        }
    } else {
        RootChainEvent::EpochPrepared {
            fork_number,
            epoch_number,
            start_block_number: epoch.start_block_number,
            end_block_number: epoch.end_block_number,
            request_start: epoch.request_start,
            request_end: epoch.request_end,
            kind: epoch.kind,
        }
    }
}
