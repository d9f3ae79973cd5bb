use crate::errors::{Result, RootChainError};
use crate::store::{require_block, require_epoch, Store};
use containers::{BlockNumber, ForkNumber, RootChainEvent};
use tracing::{debug, info};

/// What the next finalization step would do on a fork.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Block(BlockNumber),
    Epoch {
        epoch_number: u64,
        start: BlockNumber,
        end: BlockNumber,
    },
}

fn next_step(store: &Store, fork_number: ForkNumber) -> Result<Option<Step>> {
    let fork = &store.forks[fork_number as usize];
    let next = fork.last_finalized_block + 1;
    if next > fork.last_block {
        return Ok(None);
    }

    let block = require_block(store, fork_number, next)?;
    let epoch = require_epoch(store, fork_number, block.epoch_number)?;

    if !epoch.kind.is_request() {
        let deadline = block.timestamp + store.config.challenge_period(false);
        return Ok((store.time >= deadline).then_some(Step::Block(next)));
    }

    if next != epoch.start_block_number {
        return Err(RootChainError::InvariantViolation(format!(
            "request epoch {} partially finalized up to block {}",
            block.epoch_number, fork.last_finalized_block
        )));
    }
    if fork.last_block < epoch.end_block_number {
        return Ok(None);
    }

    let last = require_block(store, fork_number, epoch.end_block_number)?;
    let deadline = last.timestamp + store.config.challenge_period(true);
    Ok((store.time >= deadline).then_some(Step::Epoch {
        epoch_number: block.epoch_number,
        start: epoch.start_block_number,
        end: epoch.end_block_number,
    }))
}

/// Finalizes the active fork's blocks whose challenge periods elapsed.
///
/// Request epochs finalize as a whole once their last block's period is
/// over. Returns the number of blocks finalized.
pub fn finalize_blocks(store: &mut Store) -> Result<u64> {
    let fork_number = store.current_fork;
    let mut finalized = 0;

    for _ in 0..store.config.max_finalization_steps {
        let Some(step) = next_step(store, fork_number)? else {
            break;
        };

        match step {
            Step::Block(block_number) => {
                let epoch_number = mark_finalized(store, fork_number, block_number)?;
                store.forks[fork_number as usize].last_finalized_block = block_number;
                store.events.push(RootChainEvent::BlockFinalized {
                    fork_number,
                    block_number,
                });
                debug!(fork = fork_number, block = block_number, "block finalized");

                let epoch = store
                    .epochs
                    .get_mut(&(fork_number, epoch_number))
                    .ok_or(RootChainError::MissingEpoch {
                        fork_number,
                        epoch_number,
                    })?;
                if epoch.end_block_number == block_number {
                    epoch.finalized = true;
                    let (start, end) = (epoch.start_block_number, epoch.end_block_number);
                    store.events.push(RootChainEvent::EpochFinalized {
                        fork_number,
                        epoch_number,
                        start_block_number: start,
                        end_block_number: end,
                    });
                    info!(fork = fork_number, epoch = epoch_number, "epoch finalized");
                }
                finalized += 1;
            }
            Step::Epoch {
                epoch_number,
                start,
                end,
            } => {
                for block_number in start..=end {
                    mark_finalized(store, fork_number, block_number)?;
                }
                if let Some(epoch) = store.epochs.get_mut(&(fork_number, epoch_number)) {
                    epoch.finalized = true;
                }
                store.forks[fork_number as usize].last_finalized_block = end;
                store.events.push(RootChainEvent::EpochFinalized {
                    fork_number,
                    epoch_number,
                    start_block_number: start,
                    end_block_number: end,
                });
                info!(
                    fork = fork_number,
                    epoch = epoch_number,
                    start,
                    end,
                    "request epoch finalized"
                );
                finalized += end - start + 1;
            }
        }
    }

    Ok(finalized)
}

fn mark_finalized(store: &mut Store, fork_number: ForkNumber, block_number: BlockNumber) -> Result<u64> {
    let block = store
        .blocks
        .get_mut(&(fork_number, block_number))
        .ok_or(RootChainError::MissingBlock {
            fork_number,
            block_number,
        })?;
    block.finalized = true;
    Ok(block.epoch_number)
}
