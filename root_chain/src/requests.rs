use crate::errors::{Result, RootChainError};
use crate::store::{require_block, Store};
use containers::{Request, RequestBlock, RequestBlockId, RequestCategory, RequestId, RootChainEvent};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Requests of one category and the request blocks grouping them.
///
/// Request blocks below `num_sealed_blocks` were claimed by a prepared
/// request epoch and never grow again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestQueue {
    pub category: RequestCategory,
    pub requests: Vec<Request>,
    pub request_blocks: Vec<RequestBlock>,
    pub num_sealed_blocks: u64,
}

/// Requests waiting for the next request epoch of their category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnsealedRange {
    pub request_start: RequestId,
    pub request_end: RequestId,
    pub first_request_block_id: RequestBlockId,
    pub num_blocks: u64,
}

impl RequestQueue {
    pub fn new(category: RequestCategory) -> Self {
        Self {
            category,
            requests: Vec::new(),
            request_blocks: Vec::new(),
            num_sealed_blocks: 0,
        }
    }

    pub fn len(&self) -> u64 {
        self.requests.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn num_request_blocks(&self) -> u64 {
        self.request_blocks.len() as u64
    }

    pub fn get(&self, request_id: RequestId) -> Option<&Request> {
        self.requests.get(usize::try_from(request_id).ok()?)
    }

    pub fn get_mut(&mut self, request_id: RequestId) -> Option<&mut Request> {
        self.requests.get_mut(usize::try_from(request_id).ok()?)
    }

    pub fn request_block(&self, request_block_id: RequestBlockId) -> Option<&RequestBlock> {
        self.request_blocks
            .get(usize::try_from(request_block_id).ok()?)
    }

    /// Appends `request`, opening a new request block when the last one is
    /// full or already sealed.
    pub fn push(&mut self, request: Request, max_requests: u64) -> (RequestId, RequestBlockId) {
        let request_id = self.len();
        self.requests.push(request);

        let reusable = self
            .request_blocks
            .last()
            .filter(|block| !block.is_full(max_requests))
            .is_some()
            && self.num_request_blocks() > self.num_sealed_blocks;

        if reusable {
            if let Some(block) = self.request_blocks.last_mut() {
                block.request_end = request_id;
            }
        } else {
            self.request_blocks.push(RequestBlock::single(request_id));
        }

        (request_id, self.num_request_blocks() - 1)
    }

    pub fn unsealed(&self) -> Option<UnsealedRange> {
        let first = self.request_block(self.num_sealed_blocks)?;
        Some(UnsealedRange {
            request_start: first.request_start,
            request_end: self.len() - 1,
            first_request_block_id: self.num_sealed_blocks,
            num_blocks: self.num_request_blocks() - self.num_sealed_blocks,
        })
    }

    pub fn seal(&mut self, range: &UnsealedRange) -> Result<()> {
        if range.first_request_block_id != self.num_sealed_blocks {
            return Err(RootChainError::InvariantViolation(format!(
                "{} sealing starts at request block {} but {} are sealed",
                self.category, range.first_request_block_id, self.num_sealed_blocks
            )));
        }
        self.num_sealed_blocks += range.num_blocks;
        Ok(())
    }
}

/// Position of the next request to resolve on the canonical chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyCursor {
    pub block_number: u64,
    pub offset: u64,
}

impl Default for ApplyCursor {
    fn default() -> Self {
        Self {
            block_number: 1,
            offset: 0,
        }
    }
}

/// Resolves the next request executed by a finalized block of the active
/// fork's canonical chain.
///
/// Unchallenged exits credit the requestor on the mapped contract. Enters
/// were escrowed when created; their amount is credited on the child chain
/// and reported through the emitted event.
pub fn apply_next_request(store: &mut Store) -> Result<(RequestCategory, RequestId)> {
    let fork_number = store.current_fork;
    let last_finalized = store.active_fork().last_finalized_block;
    let mut cursor = store.apply_cursor;

    let (category, request_id) = loop {
        if cursor.block_number > last_finalized {
            return Err(RootChainError::NoRequestToApply);
        }

        let block = require_block(store, fork_number, cursor.block_number)?;
        if block.is_request {
            let category = if block.user_activated {
                RequestCategory::Eru
            } else {
                RequestCategory::Ero
            };
            let request_block = block
                .request_block_id
                .and_then(|id| store.queue(category).request_block(id))
                .ok_or_else(|| {
                    RootChainError::InvariantViolation(format!(
                        "block {} executes no {category} request block",
                        cursor.block_number
                    ))
                })?;
            if let Some(request_id) = request_block.request_at(cursor.offset) {
                break (category, request_id);
            }
        }

        cursor = ApplyCursor {
            block_number: cursor.block_number + 1,
            offset: 0,
        };
    };

    let request = store.queue(category).get(request_id).cloned().ok_or_else(|| {
        RootChainError::InvariantViolation(format!("{category} {request_id} is missing"))
    })?;
    if request.finalized {
        return Err(RootChainError::InvariantViolation(format!(
            "{category} {request_id} would be resolved twice"
        )));
    }

    let amount = if request.challenged {
        0
    } else {
        request.amount().ok_or(RootChainError::AmountOverflow)?
    };
    if request.is_exit && !request.challenged {
        store
            .assets
            .get_mut(&request.to)
            .ok_or(RootChainError::UnknownRequestableContract(request.to))?
            .credit(&request.requestor, amount)?;
    }

    if let Some(resolved) = store.queue_mut(category).get_mut(request_id) {
        resolved.finalized = true;
    }
    store.apply_cursor = ApplyCursor {
        block_number: cursor.block_number,
        offset: cursor.offset + 1,
    };
    store.events.push(RootChainEvent::RequestFinalized {
        category,
        request_id,
        requestor: request.requestor,
        is_exit: request.is_exit,
        challenged: request.challenged,
        amount,
    });
    info!(
        %category,
        request_id,
        exit = request.is_exit,
        challenged = request.challenged,
        amount,
        "request applied"
    );

    Ok((category, request_id))
}
