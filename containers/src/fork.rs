use crate::{BlockNumber, EpochNumber, RequestBlockId, RequestId, Timestamp};
use serde::{Deserialize, Serialize};

/// A branch of block history.
///
/// Fork `n + 1` descends from fork `n` at block `forked_block`. Blocks and
/// epochs numbered below `first_block` / `first_epoch` are read through the
/// parent.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fork {
    pub first_block: BlockNumber,
    pub last_block: BlockNumber,
    pub first_epoch: EpochNumber,
    /// Last completed epoch; `last_epoch + 1` is the epoch being filled.
    pub last_epoch: EpochNumber,
    pub last_finalized_block: BlockNumber,
    pub forked_block: Option<BlockNumber>,
    pub timestamp: Timestamp,
    /// Replay schedule recorded when the fork was opened.
    pub rebase: Option<RebasePlan>,
}

impl Fork {
    pub fn genesis(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    pub fn current_epoch(&self) -> EpochNumber {
        self.last_epoch + 1
    }

    pub fn is_forked(&self) -> bool {
        self.forked_block.is_some()
    }
}

/// Request range replayed by the ORE' of a child fork.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebasedRequests {
    pub request_start: RequestId,
    pub request_end: RequestId,
    pub first_request_block_id: RequestBlockId,
}

/// Pending parent-fork work a child fork replays after its URE.
///
/// `orb_references[i]` is the parent block that carried the i-th replayed
/// request block (`None` if the parent never submitted it);
/// `nrb_references[i]` is the i-th unfinalized parent NRB.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebasePlan {
    pub requests: Option<RebasedRequests>,
    pub orb_references: Vec<Option<BlockNumber>>,
    pub nrb_references: Vec<BlockNumber>,
}

impl RebasePlan {
    pub fn is_empty(&self) -> bool {
        self.orb_references.is_empty() && self.nrb_references.is_empty()
    }
}
