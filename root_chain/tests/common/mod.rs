//! Shared fixtures and drivers for root-chain tests

#![allow(dead_code)]

use containers::*;
use root_chain::*;

pub const GENESIS_TIME: Timestamp = 1_000;
pub const OPERATOR: Address = Address::repeat_byte(0xaa);
pub const ALICE: Address = Address::repeat_byte(0x01);
pub const BOB: Address = Address::repeat_byte(0x02);
pub const CAROL: Address = Address::repeat_byte(0x03);
pub const TOKEN: Address = Address::repeat_byte(0x70);
pub const CHILD_TOKEN: Address = Address::repeat_byte(0x71);
pub const INITIAL_BALANCE: Wei = 1_000;

/// Devnet parameters with two requests per request block.
pub fn test_config() -> RootChainConfig {
    RootChainConfig {
        max_requests: 2,
        nre_length: 2,
        cp_computation: 15,
        cp_withholding: 20,
        prepare_timeout: 60,
        operator_timeout: 30,
        ..RootChainConfig::default()
    }
}

pub fn store_with(config: RootChainConfig) -> Store {
    let mut store = get_root_chain_store(config, OPERATOR, BlockHeader::default(), GENESIS_TIME)
        .unwrap()
        .with_native_ledger(InMemoryLedger::with_balances([
            (ALICE, INITIAL_BALANCE),
            (BOB, INITIAL_BALANCE),
        ]));
    on_map_requestable_contract(
        &mut store,
        OPERATOR,
        TOKEN,
        CHILD_TOKEN,
        Box::new(InMemoryLedger::with_balances([
            (ALICE, INITIAL_BALANCE),
            (BOB, INITIAL_BALANCE),
            (CAROL, INITIAL_BALANCE),
        ])),
    )
    .unwrap();
    store
}

pub fn new_store() -> Store {
    store_with(test_config())
}

pub fn header(tag: u64) -> BlockHeader {
    BlockHeader {
        states_root: Bytes32::from_amount(u128::from(tag)),
        transactions_root: Bytes32::zero(),
        receipts_root: Bytes32::zero(),
    }
}

pub fn advance(store: &mut Store, seconds: u64) {
    let time = store.time + seconds;
    on_tick(store, time);
}

pub fn token_balance(store: &Store, account: &Address) -> Wei {
    store.assets.balance_of(&TOKEN, account)
}

pub fn current_epoch(store: &Store) -> Epoch {
    let number = store.active_fork().current_epoch();
    get_epoch(store, store.current_fork, number).unwrap().clone()
}

pub fn submit_nrb(store: &mut Store) -> Result<BlockNumber, RootChainError> {
    let (fork, fee) = (store.current_fork, store.config.cost_nrb);
    let tag = store.active_fork().last_block + 1;
    on_submit_nrb(store, OPERATOR, fork, header(tag), fee)
}

pub fn submit_orb(store: &mut Store) -> Result<BlockNumber, RootChainError> {
    let (fork, fee) = (store.current_fork, store.config.cost_orb);
    let tag = store.active_fork().last_block + 1;
    on_submit_orb(store, OPERATOR, fork, header(tag), fee)
}

pub fn submit_urb(store: &mut Store, sender: Address) -> Result<BlockNumber, RootChainError> {
    let (fork, fee) = (store.current_fork, store.config.cost_urb);
    let tag = 1_000 + store.active_fork().last_block;
    on_submit_urb(store, sender, fork, header(tag), fee)
}

pub fn prepare_urb(store: &mut Store, sender: Address) -> Result<(), RootChainError> {
    let fee = store.config.cost_urb_prepare;
    on_prepare_to_submit_urb(store, sender, fee)
}

/// Submits blocks of the right class until the current epoch completes.
pub fn fill_current_epoch(store: &mut Store) -> EpochNumber {
    let fork = store.current_fork;
    let epoch_number = store.active_fork().current_epoch();

    while store.current_fork == fork && store.active_fork().current_epoch() == epoch_number {
        match current_epoch(store).kind {
            EpochKind::NonRequest | EpochKind::RebasedNonRequest { .. } => submit_nrb(store),
            EpochKind::Request { .. } | EpochKind::RebasedRequest { .. } => submit_orb(store),
            EpochKind::UserActivated => submit_urb(store, CAROL),
        }
        .unwrap();
    }
    store.active_fork().current_epoch()
}

pub fn enter(store: &mut Store, requestor: Address, amount: Wei) -> RequestId {
    let request = EnterRequest {
        requestor,
        is_transfer: false,
        to: TOKEN,
        value: 0,
        trie_key: balance_trie_key(&requestor),
        trie_value: Bytes32::from_amount(amount),
    };
    let fee = store.config.cost_ero;
    on_start_enter(store, request, fee).unwrap()
}

pub fn exit_request(requestor: Address, amount: Wei) -> ExitRequest {
    ExitRequest {
        requestor,
        to: TOKEN,
        trie_key: balance_trie_key(&requestor),
        trie_value: Bytes32::from_amount(amount),
    }
}

pub fn exit(store: &mut Store, requestor: Address, amount: Wei) -> RequestId {
    let fee = store.config.cost_eru;
    on_start_exit(store, exit_request(requestor, amount), fee).unwrap()
}

pub fn make_eru(store: &mut Store, requestor: Address, amount: Wei) -> RequestId {
    let fee = store.config.cost_eru;
    on_make_eru(store, exit_request(requestor, amount), fee).unwrap()
}

/// Waits out every challenge period and finalizes the active fork.
pub fn finalize_all(store: &mut Store) -> u64 {
    let period = store.config.challenge_period(true);
    advance(store, period);
    let mut total = 0;
    loop {
        match on_finalize_block(store).unwrap() {
            0 => return total,
            finalized => total += finalized,
        }
    }
}

pub fn apply_all(store: &mut Store) -> Vec<(RequestCategory, RequestId)> {
    let mut applied = Vec::new();
    loop {
        match on_apply_request(store) {
            Ok(request) => applied.push(request),
            Err(RootChainError::NoRequestToApply) => return applied,
            Err(error) => panic!("unexpected error: {error}"),
        }
    }
}

pub fn accept_all(_: &Request, _: &PlasmaBlock, _: &[u8], _: &[u8]) -> bool {
    true
}

pub fn reject_all(_: &Request, _: &PlasmaBlock, _: &[u8], _: &[u8]) -> bool {
    false
}

/// One enter and one exit finalized and applied through a first ORE.
///
/// Leaves epoch 5 (NRE, blocks 6..=7) current and nothing pending.
pub fn store_after_first_requests() -> Store {
    let mut store = new_store();
    fill_current_epoch(&mut store);
    enter(&mut store, ALICE, 10);
    exit(&mut store, BOB, 5);
    fill_current_epoch(&mut store);
    fill_current_epoch(&mut store);
    finalize_all(&mut store);
    apply_all(&mut store);
    store
}

/// Checks block and request continuity of every epoch visible from `fork`.
pub fn assert_epochs_contiguous(store: &Store, fork_number: ForkNumber) {
    let fork = get_fork(store, fork_number).unwrap();
    let mut previous_end = 0;
    let mut previous_ero: Option<Epoch> = None;

    for epoch_number in 1..=fork.current_epoch() {
        let epoch = get_epoch(store, fork_number, epoch_number).unwrap();
        if epoch.kind.is_empty() {
            assert_eq!(epoch.start_block_number, previous_end, "epoch {epoch_number}");
            assert_eq!(epoch.end_block_number, previous_end, "epoch {epoch_number}");
        } else {
            assert_eq!(epoch.start_block_number, previous_end + 1, "epoch {epoch_number}");
            previous_end = epoch.end_block_number;
        }

        if epoch.kind.carries_eros() && !epoch.kind.is_empty() {
            if let Some(previous) = &previous_ero {
                assert_eq!(epoch.request_start, previous.request_end + 1, "epoch {epoch_number}");
                assert_eq!(
                    epoch.first_request_block_id,
                    previous.next_request_block_id(),
                    "epoch {epoch_number}"
                );
            } else {
                assert_eq!(epoch.request_start, 0);
                assert_eq!(epoch.first_request_block_id, 0);
            }
            // Rebased epochs mirror the parent's blocks instead.
            if !epoch.kind.rebase() {
                assert_eq!(
                    epoch.num_blocks(),
                    store.config.request_blocks_for(epoch.num_requests()),
                    "epoch {epoch_number}"
                );
            }
            previous_ero = Some(epoch.clone());
        }
    }
}
