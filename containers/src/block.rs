use crate::{BlockNumber, Bytes32, EpochNumber, RequestBlockId, Timestamp};
use serde::{Deserialize, Serialize};
use ssz::SszHash;
use ssz_derive::Ssz;

/// Merkle roots committed by a block producer.
#[derive(Clone, Debug, PartialEq, Eq, Ssz, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub states_root: Bytes32,
    pub transactions_root: Bytes32,
    pub receipts_root: Bytes32,
}

/// A block as recorded on the root chain.
///
/// Request blocks carry the id of the request block whose requests they
/// execute; blocks replayed on a child fork point at the parent-fork block
/// they supersede through `reference_block`.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlasmaBlock {
    pub epoch_number: EpochNumber,
    pub header: BlockHeader,
    pub request_block_id: Option<RequestBlockId>,
    pub reference_block: Option<BlockNumber>,
    pub timestamp: Timestamp,
    pub finalized: bool,
    pub is_request: bool,
    pub user_activated: bool,
}

impl PlasmaBlock {
    pub fn genesis(header: BlockHeader, timestamp: Timestamp) -> Self {
        Self {
            epoch_number: 0,
            header,
            request_block_id: None,
            reference_block: None,
            timestamp,
            finalized: true,
            is_request: false,
            user_activated: false,
        }
    }

    pub fn hash(&self) -> Bytes32 {
        hash_tree_root(&self.header)
    }
}

/// Compute the SSZ hash tree root for any type implementing `SszHash`.
pub fn hash_tree_root<T: SszHash>(value: &T) -> Bytes32 {
    Bytes32(value.hash_tree_root())
}
