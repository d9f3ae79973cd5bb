use crate::assets::AssetContract;
use crate::challenge::{challenge_exit, ExitChallenge, FraudProofVerifier};
use crate::errors::{Result, RootChainError};
use crate::finalization::finalize_blocks;
use crate::fork::{commit_fork, plan_fork};
use crate::helpers::{
    commit_epoch_plan, plan_epochs_after, plan_successors, BlockClass, EpochPlan,
};
use crate::requests::apply_next_request;
use crate::store::{ensure_active_fork, require_block, require_epoch, Store, UrbPreparation};
use containers::{
    Address, BlockHeader, BlockNumber, Bytes32, Epoch, EpochKind, EpochNumber, Fork, ForkNumber,
    PlasmaBlock, Request, RequestCategory, RequestId, RootChainEvent, Timestamp, Wei,
};
use tracing::{info, warn};

/// Enter request: moves value from the root chain into the child chain.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct EnterRequest {
    pub requestor: Address,
    /// Native-value transfer to `to` instead of a requestable contract call.
    pub is_transfer: bool,
    pub to: Address,
    pub value: Wei,
    pub trie_key: Bytes32,
    pub trie_value: Bytes32,
}

/// Exit request against requestable contract `to`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ExitRequest {
    pub requestor: Address,
    pub to: Address,
    pub trie_key: Bytes32,
    pub trie_value: Bytes32,
}

#[inline]
pub fn on_tick(store: &mut Store, time: Timestamp) {
    // Time never goes backwards.
    if time > store.time {
        store.time = time;
    }
}

fn ensure_cost(attached: Wei, required: Wei) -> Result<()> {
    if attached != required {
        return Err(RootChainError::InvalidCost { attached, required });
    }
    Ok(())
}

fn ensure_operator(store: &Store, sender: &Address) -> Result<()> {
    if *sender != store.operator {
        return Err(RootChainError::NotOperator);
    }
    Ok(())
}

pub fn on_submit_nrb(
    store: &mut Store,
    sender: Address,
    fork_number: ForkNumber,
    header: BlockHeader,
    fee: Wei,
) -> Result<BlockNumber> {
    ensure_operator(store, &sender)?;
    let plan = plan_block(store, fork_number, header, BlockClass::Nrb, fee)?;
    commit_block(store, plan)
}

pub fn on_submit_orb(
    store: &mut Store,
    sender: Address,
    fork_number: ForkNumber,
    header: BlockHeader,
    fee: Wei,
) -> Result<BlockNumber> {
    ensure_operator(store, &sender)?;
    let plan = plan_block(store, fork_number, header, BlockClass::Orb, fee)?;
    commit_block(store, plan)
}

/// Submits a user-activated block.
///
/// The first one after a preparation opens a new fork; the rest fill that
/// fork's user-activated epoch.
pub fn on_submit_urb(
    store: &mut Store,
    sender: Address,
    fork_number: ForkNumber,
    header: BlockHeader,
    fee: Wei,
) -> Result<BlockNumber> {
    ensure_active_fork(store, fork_number)?;

    let Some(preparation) = store.urb_preparation else {
        let epoch = require_epoch(store, fork_number, store.active_fork().current_epoch())?;
        if epoch.kind != EpochKind::UserActivated {
            return Err(RootChainError::UrbNotPrepared);
        }
        let plan = plan_block(store, fork_number, header, BlockClass::Urb, fee)?;
        return commit_block(store, plan);
    };

    ensure_cost(fee, store.config.cost_urb)?;
    let deadline = preparation.prepared_at + store.config.prepare_timeout;
    if store.time > deadline {
        return Err(RootChainError::UrbPreparationExpired { deadline });
    }

    // The fork and its first block are both planned before either is written.
    let fork_plan = plan_fork(store)?;
    let new_fork = store.num_forks();
    let first_epoch = fork_plan.fork.first_epoch;
    let (block_number, block) = build_block(
        store,
        &fork_plan.fork,
        first_epoch,
        &fork_plan.epoch,
        header,
        BlockClass::Urb,
    )?;
    let epochs = if block_number == fork_plan.epoch.end_block_number {
        let rebase = fork_plan.fork.rebase.clone().unwrap_or_default();
        Some(plan_successors(
            store,
            new_fork,
            fork_plan.parent,
            &rebase,
            &[(first_epoch, fork_plan.epoch.clone())],
            first_epoch,
            fork_plan.epoch.clone(),
        )?)
    } else {
        None
    };
    let plan = BlockPlan {
        fork_number: new_fork,
        block_number,
        block,
        class: BlockClass::Urb,
        fee,
        epochs,
    };

    let committed = commit_fork(store, fork_plan)?;
    store.urb_preparation = None;
    info!(submitter = %sender, prepared_by = %preparation.prepared_by, fork = committed, "user-activated fork opened");

    commit_block(store, plan)
}

/// A checked block submission and the epochs it completes.
struct BlockPlan {
    fork_number: ForkNumber,
    block_number: BlockNumber,
    block: PlasmaBlock,
    class: BlockClass,
    fee: Wei,
    epochs: Option<EpochPlan>,
}

/// Places a block of `class` as the next block of `epoch`.
fn build_block(
    store: &Store,
    fork: &Fork,
    epoch_number: EpochNumber,
    epoch: &Epoch,
    header: BlockHeader,
    class: BlockClass,
) -> Result<(BlockNumber, PlasmaBlock)> {
    if !class.fits(&epoch.kind) {
        return Err(RootChainError::UnexpectedBlockClass {
            epoch_number,
            expected: epoch.kind.label(),
            submitted: class.label(),
        });
    }

    let block_number = fork.last_block + 1;
    if !epoch.contains_block(block_number) {
        return Err(RootChainError::InvariantViolation(format!(
            "block {block_number} falls outside epoch {epoch_number}"
        )));
    }

    let index = (block_number - epoch.start_block_number) as usize;
    let reference_block = match (&epoch.kind, &fork.rebase) {
        (EpochKind::RebasedRequest { .. }, Some(plan)) => {
            plan.orb_references.get(index).copied().flatten()
        }
        (EpochKind::RebasedNonRequest { .. }, Some(plan)) => {
            plan.nrb_references.get(index).copied()
        }
        _ => None,
    };

    let block = PlasmaBlock {
        epoch_number,
        header,
        request_block_id: epoch.request_block_id_of(block_number),
        reference_block,
        timestamp: store.time,
        finalized: false,
        is_request: epoch.kind.is_request(),
        user_activated: epoch.kind.user_activated(),
    };
    Ok((block_number, block))
}

fn plan_block(
    store: &Store,
    fork_number: ForkNumber,
    header: BlockHeader,
    class: BlockClass,
    fee: Wei,
) -> Result<BlockPlan> {
    ensure_active_fork(store, fork_number)?;
    let required = match class {
        BlockClass::Nrb => store.config.cost_nrb,
        BlockClass::Orb => store.config.cost_orb,
        BlockClass::Urb => store.config.cost_urb,
    };
    ensure_cost(fee, required)?;

    let fork = &store.forks[fork_number as usize];
    let epoch_number = fork.current_epoch();
    let epoch = require_epoch(store, fork_number, epoch_number)?;
    let (block_number, block) = build_block(store, fork, epoch_number, epoch, header, class)?;

    let epochs = if block_number == epoch.end_block_number {
        Some(plan_epochs_after(store, fork_number, epoch_number)?)
    } else {
        None
    };

    Ok(BlockPlan {
        fork_number,
        block_number,
        block,
        class,
        fee,
        epochs,
    })
}

fn commit_block(store: &mut Store, plan: BlockPlan) -> Result<BlockNumber> {
    let BlockPlan {
        fork_number,
        block_number,
        block,
        class,
        fee,
        epochs,
    } = plan;

    let event = RootChainEvent::BlockSubmitted {
        fork_number,
        block_number,
        epoch_number: block.epoch_number,
        block_hash: block.hash(),
        is_request: block.is_request,
        user_activated: block.user_activated,
    };
    info!(
        fork = fork_number,
        block = block_number,
        epoch = block.epoch_number,
        class = class.label(),
        "block submitted"
    );

    store.blocks.insert((fork_number, block_number), block);
    store.forks[fork_number as usize].last_block = block_number;
    store.collected_fees += fee;
    store.events.push(event);

    if let Some(epochs) = epochs {
        commit_epoch_plan(store, epochs)?;
    }
    Ok(block_number)
}

/// Announces a user-activated block submission, starting the window in
/// which the first URB may open a fork.
pub fn on_prepare_to_submit_urb(store: &mut Store, sender: Address, fee: Wei) -> Result<()> {
    ensure_cost(fee, store.config.cost_urb_prepare)?;

    if let Some(preparation) = store.urb_preparation {
        if store.time <= preparation.prepared_at + store.config.prepare_timeout {
            return Err(RootChainError::UrbAlreadyPrepared);
        }
    }
    if store.erus.unsealed().is_none() {
        return Err(RootChainError::NoPendingUserRequests);
    }

    let fork_number = store.current_fork;
    let fork = store.active_fork();
    let last_submission = require_block(store, fork_number, fork.last_block)?.timestamp;
    let not_before = last_submission + store.config.operator_timeout;
    if store.time < not_before {
        return Err(RootChainError::OperatorStillActive {
            last_submission,
            not_before,
        });
    }

    if fork_number > 0 {
        let epoch_number = fork.first_epoch;
        if !require_epoch(store, fork_number, epoch_number)?.finalized {
            return Err(RootChainError::UserActivatedEpochPending { epoch_number });
        }
    }

    store.urb_preparation = Some(UrbPreparation {
        fork_number,
        prepared_by: sender,
        prepared_at: store.time,
    });
    store.collected_fees += fee;
    info!(fork = fork_number, prepared_by = %sender, "user-activated submission prepared");
    Ok(())
}

fn create_request(
    store: &mut Store,
    category: RequestCategory,
    request: Request,
    fee: Wei,
) -> RequestId {
    let request_hash = request.hash();
    let (requestor, to, is_exit) = (request.requestor, request.to, request.is_exit);
    let max_requests = store.config.max_requests;
    let (request_id, request_block_id) = store.queue_mut(category).push(request, max_requests);

    store.collected_fees += fee;
    store.events.push(RootChainEvent::RequestCreated {
        category,
        request_id,
        request_block_id,
        requestor,
        to,
        is_exit,
        request_hash,
    });
    info!(%category, request_id, request_block_id, exit = is_exit, "request created");
    request_id
}

/// Creates an enter request, escrowing the value it moves.
pub fn on_start_enter(store: &mut Store, enter: EnterRequest, fee: Wei) -> Result<RequestId> {
    ensure_cost(fee, store.config.cost_ero)?;

    if enter.is_transfer {
        store.native.debit(&enter.requestor, enter.value)?;
    } else {
        let amount = enter
            .trie_value
            .to_amount()
            .ok_or(RootChainError::AmountOverflow)?;
        store
            .assets
            .get_mut(&enter.to)
            .ok_or(RootChainError::UnknownRequestableContract(enter.to))?
            .debit(&enter.requestor, amount)?;
    }

    let request = Request {
        timestamp: store.time,
        requestor: enter.requestor,
        to: enter.to,
        is_exit: false,
        is_transfer: enter.is_transfer,
        value: enter.value,
        trie_key: enter.trie_key,
        trie_value: enter.trie_value,
        finalized: false,
        challenged: false,
    };
    Ok(create_request(store, RequestCategory::Ero, request, fee))
}

fn exit_request(store: &Store, exit: ExitRequest) -> Result<Request> {
    if !store.assets.is_mapped(&exit.to) {
        return Err(RootChainError::UnknownRequestableContract(exit.to));
    }
    exit.trie_value
        .to_amount()
        .ok_or(RootChainError::AmountOverflow)?;

    Ok(Request {
        timestamp: store.time,
        requestor: exit.requestor,
        to: exit.to,
        is_exit: true,
        is_transfer: false,
        value: 0,
        trie_key: exit.trie_key,
        trie_value: exit.trie_value,
        finalized: false,
        challenged: false,
    })
}

/// Creates an exit request included by the operator.
pub fn on_start_exit(store: &mut Store, exit: ExitRequest, fee: Wei) -> Result<RequestId> {
    ensure_cost(fee, store.config.cost_eru)?;
    let request = exit_request(store, exit)?;
    Ok(create_request(store, RequestCategory::Ero, request, fee))
}

/// Creates an exit request that only user-activated blocks include.
pub fn on_make_eru(store: &mut Store, exit: ExitRequest, fee: Wei) -> Result<RequestId> {
    ensure_cost(fee, store.config.cost_eru)?;
    let request = exit_request(store, exit)?;
    Ok(create_request(store, RequestCategory::Eru, request, fee))
}

pub fn on_map_requestable_contract(
    store: &mut Store,
    sender: Address,
    root: Address,
    child: Address,
    contract: Box<dyn AssetContract>,
) -> Result<()> {
    ensure_operator(store, &sender)?;
    if store.assets.is_mapped(&root) {
        warn!(root = %root, "requestable contract remapped");
    }
    store.assets.map(root, child, contract);
    info!(root = %root, child = %child, "requestable contract mapped");
    Ok(())
}

/// Finalizes what the elapsed challenge periods allow; zero means no-op.
pub fn on_finalize_block(store: &mut Store) -> Result<u64> {
    finalize_blocks(store)
}

pub fn on_apply_request(store: &mut Store) -> Result<(RequestCategory, RequestId)> {
    apply_next_request(store)
}

pub fn on_challenge_exit(
    store: &mut Store,
    challenge: &ExitChallenge,
    verifier: &impl FraudProofVerifier,
) -> Result<(RequestCategory, RequestId)> {
    challenge_exit(store, challenge, verifier)
}
