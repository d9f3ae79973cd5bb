pub mod types;
pub mod config;
pub mod serde_helpers;
pub mod block;
pub mod epoch;
pub mod fork;
pub mod request;
pub mod event;

pub use block::{hash_tree_root, BlockHeader, PlasmaBlock};
pub use config::{ConfigError, RootChainConfig};
pub use epoch::{Epoch, EpochKind};
pub use event::RootChainEvent;
pub use fork::{Fork, RebasePlan, RebasedRequests};
pub use request::{balance_trie_key, Request, RequestBlock, RequestCategory};
pub use types::{
    Address, BlockNumber, Bytes32, EpochNumber, ForkNumber, RequestBlockId, RequestId, Timestamp,
    Wei,
};
pub use ssz;
