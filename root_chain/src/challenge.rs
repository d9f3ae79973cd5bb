use crate::errors::{Result, RootChainError};
use crate::store::{ensure_active_fork, require_block, Store};
use containers::{
    Address, BlockNumber, ForkNumber, PlasmaBlock, Request, RequestCategory, RequestId,
    RootChainEvent,
};
use tracing::{info, warn};

/// Decides whether an exit was invalid on the child chain.
///
/// `receipt` is the failed transaction receipt claimed for the request and
/// `proof` its inclusion proof against the block's receipts root.
pub trait FraudProofVerifier {
    fn verify(&self, request: &Request, block: &PlasmaBlock, receipt: &[u8], proof: &[u8]) -> bool;
}

impl<F> FraudProofVerifier for F
where
    F: Fn(&Request, &PlasmaBlock, &[u8], &[u8]) -> bool,
{
    fn verify(&self, request: &Request, block: &PlasmaBlock, receipt: &[u8], proof: &[u8]) -> bool {
        self(request, block, receipt, proof)
    }
}

/// Exit challenge against a request executed by `block_number`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExitChallenge {
    pub challenger: Address,
    pub fork_number: ForkNumber,
    pub block_number: BlockNumber,
    /// Position of the request inside the block's request block.
    pub index: u64,
    pub receipt: Vec<u8>,
    pub proof: Vec<u8>,
}

/// Marks an exit as challenged so its resolution credits nothing.
pub fn challenge_exit(
    store: &mut Store,
    challenge: &ExitChallenge,
    verifier: &impl FraudProofVerifier,
) -> Result<(RequestCategory, RequestId)> {
    ensure_active_fork(store, challenge.fork_number)?;

    let block_number = challenge.block_number;
    let block = require_block(store, challenge.fork_number, block_number)?;
    if !block.is_request {
        return Err(RootChainError::RequestIndexOutOfRange {
            block_number,
            index: challenge.index,
        });
    }
    if block.finalized {
        return Err(RootChainError::BlockAlreadyFinalized { block_number });
    }
    if store.time >= block.timestamp + store.config.challenge_period(true) {
        return Err(RootChainError::ChallengePeriodOver { block_number });
    }

    let category = if block.user_activated {
        RequestCategory::Eru
    } else {
        RequestCategory::Ero
    };
    let queue = store.queue(category);
    let request_block = block
        .request_block_id
        .and_then(|id| queue.request_block(id))
        .ok_or_else(|| {
            RootChainError::InvariantViolation(format!(
                "request block {block_number} has no {category} request block"
            ))
        })?;
    let request_id = request_block
        .request_at(challenge.index)
        .ok_or(RootChainError::RequestIndexOutOfRange {
            block_number,
            index: challenge.index,
        })?;
    let request = queue.get(request_id).ok_or_else(|| {
        RootChainError::InvariantViolation(format!("{category} {request_id} is missing"))
    })?;

    if !request.is_exit {
        return Err(RootChainError::NotAnExit { request_id });
    }
    if request.finalized {
        return Err(RootChainError::RequestAlreadyFinalized {
            category,
            request_id,
        });
    }
    if request.challenged {
        return Err(RootChainError::RequestAlreadyChallenged {
            category,
            request_id,
        });
    }
    if !verifier.verify(request, block, &challenge.receipt, &challenge.proof) {
        warn!(%category, request_id, challenger = %challenge.challenger, "fraud proof rejected");
        return Err(RootChainError::InvalidFraudProof);
    }

    if let Some(request) = store.queue_mut(category).get_mut(request_id) {
        request.challenged = true;
    }
    store.events.push(RootChainEvent::RequestChallenged {
        category,
        request_id,
        challenger: challenge.challenger,
    });
    info!(%category, request_id, block = block_number, "exit challenged");

    Ok((category, request_id))
}
