use crate::assets::{AssetContract, AssetRegistry, InMemoryLedger};
use crate::errors::{Result, RootChainError};
use crate::events::EventLog;
use crate::requests::{ApplyCursor, RequestQueue};
use containers::{
    Address, BlockHeader, BlockNumber, Epoch, EpochKind, EpochNumber, Fork, ForkNumber,
    PlasmaBlock, Request, RequestBlock, RequestBlockId, RequestCategory, RequestId,
    RootChainConfig, RootChainEvent, Timestamp, Wei,
};
use std::collections::BTreeMap;
use tracing::info;

/// Pending first user-activated block submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UrbPreparation {
    pub fork_number: ForkNumber,
    pub prepared_by: Address,
    pub prepared_at: Timestamp,
}

/// Root-chain state: forks, their epochs and blocks, request queues.
#[derive(Debug)]
pub struct Store {
    pub time: Timestamp,

    pub config: RootChainConfig,

    pub operator: Address,

    pub current_fork: ForkNumber,

    pub forks: Vec<Fork>,

    pub epochs: BTreeMap<(ForkNumber, EpochNumber), Epoch>,

    pub blocks: BTreeMap<(ForkNumber, BlockNumber), PlasmaBlock>,

    pub eros: RequestQueue,

    pub erus: RequestQueue,

    pub urb_preparation: Option<UrbPreparation>,

    pub apply_cursor: ApplyCursor,

    pub assets: AssetRegistry,

    /// Escrow for native-value transfers.
    pub native: Box<dyn AssetContract>,

    pub collected_fees: Wei,

    pub events: EventLog,
}

/// Initialize the store with the genesis block and the first epoch.
pub fn get_root_chain_store(
    config: RootChainConfig,
    operator: Address,
    genesis_header: BlockHeader,
    genesis_time: Timestamp,
) -> Result<Store> {
    config.validate()?;

    let first_epoch = Epoch {
        kind: EpochKind::NonRequest,
        start_block_number: 1,
        end_block_number: config.nre_length,
        request_start: 0,
        request_end: 0,
        first_request_block_id: 0,
        timestamp: genesis_time,
        finalized: false,
    };

    let mut store = Store {
        time: genesis_time,
        config,
        operator,
        current_fork: 0,
        forks: vec![Fork::genesis(genesis_time)],
        epochs: [((0, 1), first_epoch.clone())].into(),
        blocks: [((0, 0), PlasmaBlock::genesis(genesis_header, genesis_time))].into(),
        eros: RequestQueue::new(RequestCategory::Ero),
        erus: RequestQueue::new(RequestCategory::Eru),
        urb_preparation: None,
        apply_cursor: ApplyCursor::default(),
        assets: AssetRegistry::default(),
        native: Box::new(InMemoryLedger::default()),
        collected_fees: 0,
        events: EventLog::default(),
    };

    store.events.push(RootChainEvent::EpochPrepared {
        fork_number: 0,
        epoch_number: 1,
        start_block_number: first_epoch.start_block_number,
        end_block_number: first_epoch.end_block_number,
        request_start: 0,
        request_end: 0,
        kind: first_epoch.kind,
    });
    info!(operator = %operator, nre_length = store.config.nre_length, "root chain initialized");

    Ok(store)
}

impl Store {
    pub fn with_native_ledger(mut self, ledger: impl AssetContract + 'static) -> Self {
        self.native = Box::new(ledger);
        self
    }

    pub fn queue(&self, category: RequestCategory) -> &RequestQueue {
        match category {
            RequestCategory::Ero => &self.eros,
            RequestCategory::Eru => &self.erus,
        }
    }

    pub fn queue_mut(&mut self, category: RequestCategory) -> &mut RequestQueue {
        match category {
            RequestCategory::Ero => &mut self.eros,
            RequestCategory::Eru => &mut self.erus,
        }
    }

    pub fn active_fork(&self) -> &Fork {
        &self.forks[self.current_fork as usize]
    }

    pub fn num_forks(&self) -> u64 {
        self.forks.len() as u64
    }
}

pub fn ensure_active_fork(store: &Store, fork_number: ForkNumber) -> Result<()> {
    if fork_number != store.current_fork {
        return Err(RootChainError::ForkMismatch {
            given: fork_number,
            current: store.current_fork,
        });
    }
    Ok(())
}

pub fn get_fork(store: &Store, fork_number: ForkNumber) -> Option<&Fork> {
    store.forks.get(usize::try_from(fork_number).ok()?)
}

/// Fork whose own storage holds epoch `epoch_number` as seen from
/// `fork_number`.
pub fn epoch_owner(store: &Store, fork_number: ForkNumber, epoch_number: EpochNumber) -> ForkNumber {
    let mut owner = fork_number;
    while owner > 0 && epoch_number < store.forks[owner as usize].first_epoch {
        owner -= 1;
    }
    owner
}

/// Fork whose own storage holds block `block_number` as seen from
/// `fork_number`.
pub fn block_owner(store: &Store, fork_number: ForkNumber, block_number: BlockNumber) -> ForkNumber {
    let mut owner = fork_number;
    while owner > 0 && block_number < store.forks[owner as usize].first_block {
        owner -= 1;
    }
    owner
}

/// Epoch `epoch_number` on `fork_number`, resolved through its ancestry.
pub fn get_epoch(store: &Store, fork_number: ForkNumber, epoch_number: EpochNumber) -> Option<&Epoch> {
    get_fork(store, fork_number)?;
    let owner = epoch_owner(store, fork_number, epoch_number);
    store.epochs.get(&(owner, epoch_number))
}

/// Block `block_number` on `fork_number`, resolved through its ancestry.
pub fn get_block(store: &Store, fork_number: ForkNumber, block_number: BlockNumber) -> Option<&PlasmaBlock> {
    get_fork(store, fork_number)?;
    let owner = block_owner(store, fork_number, block_number);
    store.blocks.get(&(owner, block_number))
}

pub fn require_epoch(store: &Store, fork_number: ForkNumber, epoch_number: EpochNumber) -> Result<&Epoch> {
    get_epoch(store, fork_number, epoch_number).ok_or(RootChainError::MissingEpoch {
        fork_number,
        epoch_number,
    })
}

pub fn require_block(store: &Store, fork_number: ForkNumber, block_number: BlockNumber) -> Result<&PlasmaBlock> {
    get_block(store, fork_number, block_number).ok_or(RootChainError::MissingBlock {
        fork_number,
        block_number,
    })
}

/// The last completed epoch of the active fork.
pub fn get_last_epoch(store: &Store) -> Option<&Epoch> {
    let fork = store.active_fork();
    get_epoch(store, store.current_fork, fork.last_epoch)
}

pub fn last_block(store: &Store, fork_number: ForkNumber) -> Option<BlockNumber> {
    get_fork(store, fork_number).map(|fork| fork.last_block)
}

pub fn last_epoch(store: &Store, fork_number: ForkNumber) -> Option<EpochNumber> {
    get_fork(store, fork_number).map(|fork| fork.last_epoch)
}

pub fn get_last_finalized_block(store: &Store, fork_number: ForkNumber) -> Option<BlockNumber> {
    get_fork(store, fork_number).map(|fork| fork.last_finalized_block)
}

/// Number of the first non-empty operator request epoch a fork created.
pub fn first_filled_ore_number(store: &Store, fork_number: ForkNumber) -> Option<EpochNumber> {
    store
        .epochs
        .range((fork_number, 0)..=(fork_number, EpochNumber::MAX))
        .find(|(_, epoch)| matches!(epoch.kind, EpochKind::Request { empty: false }))
        .map(|((_, epoch_number), _)| *epoch_number)
}

pub fn num_eros(store: &Store) -> u64 {
    store.eros.len()
}

pub fn num_erus(store: &Store) -> u64 {
    store.erus.len()
}

pub fn num_orbs(store: &Store) -> u64 {
    store.eros.num_request_blocks()
}

pub fn num_urbs(store: &Store) -> u64 {
    store.erus.num_request_blocks()
}

pub fn ero(store: &Store, request_id: RequestId) -> Option<&Request> {
    store.eros.get(request_id)
}

pub fn eru(store: &Store, request_id: RequestId) -> Option<&Request> {
    store.erus.get(request_id)
}

pub fn orb(store: &Store, request_block_id: RequestBlockId) -> Option<&RequestBlock> {
    store.eros.request_block(request_block_id)
}

pub fn urb(store: &Store, request_block_id: RequestBlockId) -> Option<&RequestBlock> {
    store.erus.request_block(request_block_id)
}
