use anyhow::{Context, Result};
use containers::{
    balance_trie_key, Address, BlockHeader, Bytes32, PlasmaBlock, Request, Timestamp, Wei,
};
use metrics::SharedMetrics;
use root_chain::{
    on_apply_request, on_challenge_exit, on_finalize_block, on_make_eru,
    on_map_requestable_contract, on_prepare_to_submit_urb, on_start_enter, on_start_exit,
    on_submit_nrb, on_submit_orb, on_submit_urb, on_tick, EnterRequest, ExitChallenge,
    ExitRequest, InMemoryLedger, RootChainError, Store,
};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use tracing::{info, warn};

fn one() -> u64 {
    1
}

/// A scripted sequence of root-chain transactions.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    #[serde(default)]
    pub genesis_time: Timestamp,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing {}", path.display()))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
    Tick {
        time: Timestamp,
    },
    Advance {
        seconds: u64,
    },
    /// Credits `account` on `contract`, or on the native ledger.
    Mint {
        account: Address,
        amount: Wei,
        #[serde(default)]
        contract: Option<Address>,
    },
    MapContract {
        root: Address,
        child: Address,
    },
    SubmitNrb {
        #[serde(default = "one")]
        count: u64,
    },
    SubmitOrb {
        #[serde(default = "one")]
        count: u64,
    },
    PrepareUrb {
        sender: Address,
    },
    SubmitUrb {
        sender: Address,
        #[serde(default = "one")]
        count: u64,
    },
    StartEnter {
        requestor: Address,
        to: Address,
        #[serde(default)]
        is_transfer: bool,
        #[serde(default)]
        value: Wei,
        #[serde(default)]
        amount: Wei,
    },
    StartExit {
        requestor: Address,
        to: Address,
        amount: Wei,
    },
    MakeEru {
        requestor: Address,
        to: Address,
        amount: Wei,
    },
    FinalizeBlock,
    ApplyRequest {
        #[serde(default = "one")]
        count: u64,
    },
    /// Challenges an exit; `accept` stands in for the fraud-proof verdict.
    ChallengeExit {
        challenger: Address,
        block_number: u64,
        index: u64,
        accept: bool,
        #[serde(default, with = "containers::serde_helpers::hex_bytes")]
        receipt: Vec<u8>,
        #[serde(default, with = "containers::serde_helpers::hex_bytes")]
        proof: Vec<u8>,
    },
}

/// Drives a store through a script, streaming emitted events as JSON lines.
pub struct ScriptRunner<W> {
    pub store: Store,
    metrics: Option<SharedMetrics>,
    out: W,
    cursor: usize,
    blocks_built: u64,
    pub rejected: u64,
}

impl<W: Write> ScriptRunner<W> {
    pub fn new(store: Store, metrics: Option<SharedMetrics>, out: W) -> Self {
        Self {
            store,
            metrics,
            out,
            cursor: 0,
            blocks_built: 0,
            rejected: 0,
        }
    }

    pub fn run(&mut self, script: &Script) -> Result<()> {
        self.flush_events()?;
        for (index, step) in script.steps.iter().enumerate() {
            if let Err(error) = self.apply(step) {
                self.rejected += 1;
                warn!(step = index, ?step, %error, "step rejected");
            }
            self.flush_events()?;
        }
        info!(
            steps = script.steps.len(),
            rejected = self.rejected,
            fork = self.store.current_fork,
            "script finished"
        );
        Ok(())
    }

    fn next_header(&mut self) -> BlockHeader {
        self.blocks_built += 1;
        BlockHeader {
            states_root: Bytes32::from_amount(u128::from(self.blocks_built)),
            ..BlockHeader::default()
        }
    }

    fn apply(&mut self, step: &Step) -> Result<(), RootChainError> {
        let operator = self.store.operator;
        let config = self.store.config.clone();

        match step {
            Step::Tick { time } => on_tick(&mut self.store, *time),
            Step::Advance { seconds } => {
                let time = self.store.time + seconds;
                on_tick(&mut self.store, time);
            }
            Step::Mint {
                account,
                amount,
                contract,
            } => match contract {
                Some(root) => self
                    .store
                    .assets
                    .get_mut(root)
                    .ok_or(RootChainError::UnknownRequestableContract(*root))?
                    .credit(account, *amount)?,
                None => self.store.native.credit(account, *amount)?,
            },
            Step::MapContract { root, child } => on_map_requestable_contract(
                &mut self.store,
                operator,
                *root,
                *child,
                Box::new(InMemoryLedger::default()),
            )?,
            Step::SubmitNrb { count } => {
                for _ in 0..*count {
                    let header = self.next_header();
                    let fork = self.store.current_fork;
                    on_submit_nrb(&mut self.store, operator, fork, header, config.cost_nrb)?;
                }
            }
            Step::SubmitOrb { count } => {
                for _ in 0..*count {
                    let header = self.next_header();
                    let fork = self.store.current_fork;
                    on_submit_orb(&mut self.store, operator, fork, header, config.cost_orb)?;
                }
            }
            Step::PrepareUrb { sender } => {
                on_prepare_to_submit_urb(&mut self.store, *sender, config.cost_urb_prepare)?
            }
            Step::SubmitUrb { sender, count } => {
                for _ in 0..*count {
                    let header = self.next_header();
                    let fork = self.store.current_fork;
                    on_submit_urb(&mut self.store, *sender, fork, header, config.cost_urb)?;
                }
            }
            Step::StartEnter {
                requestor,
                to,
                is_transfer,
                value,
                amount,
            } => {
                let enter = EnterRequest {
                    requestor: *requestor,
                    is_transfer: *is_transfer,
                    to: *to,
                    value: *value,
                    trie_key: balance_trie_key(requestor),
                    trie_value: Bytes32::from_amount(*amount),
                };
                on_start_enter(&mut self.store, enter, config.cost_ero)?;
            }
            Step::StartExit {
                requestor,
                to,
                amount,
            } => {
                on_start_exit(&mut self.store, exit(requestor, to, *amount), config.cost_eru)?;
            }
            Step::MakeEru {
                requestor,
                to,
                amount,
            } => {
                on_make_eru(&mut self.store, exit(requestor, to, *amount), config.cost_eru)?;
            }
            Step::FinalizeBlock => {
                let finalized = on_finalize_block(&mut self.store)?;
                if let Some(metrics) = &self.metrics {
                    metrics.observe_finalization_batch(finalized);
                }
            }
            Step::ApplyRequest { count } => {
                for _ in 0..*count {
                    on_apply_request(&mut self.store)?;
                }
            }
            Step::ChallengeExit {
                challenger,
                block_number,
                index,
                accept,
                receipt,
                proof,
            } => {
                let challenge = ExitChallenge {
                    challenger: *challenger,
                    fork_number: self.store.current_fork,
                    block_number: *block_number,
                    index: *index,
                    receipt: receipt.clone(),
                    proof: proof.clone(),
                };
                let verdict = *accept;
                let verifier = move |_: &Request, _: &PlasmaBlock, _: &[u8], _: &[u8]| verdict;
                on_challenge_exit(&mut self.store, &challenge, &verifier)?;
            }
        }
        Ok(())
    }

    fn flush_events(&mut self) -> Result<()> {
        for event in self.store.events.events_since(self.cursor) {
            writeln!(self.out, "{}", event.to_json_line()?)?;
            if let Some(metrics) = &self.metrics {
                metrics.observe_event(event);
            }
        }
        self.cursor = self.store.events.len();
        Ok(())
    }
}

fn exit(requestor: &Address, to: &Address, amount: Wei) -> ExitRequest {
    ExitRequest {
        requestor: *requestor,
        to: *to,
        trie_key: balance_trie_key(requestor),
        trie_value: Bytes32::from_amount(amount),
    }
}
