use crate::{
    Address, BlockNumber, Bytes32, EpochKind, EpochNumber, ForkNumber, RequestBlockId, RequestCategory,
    RequestId, Wei,
};
use serde::{Deserialize, Serialize};

/// Audit log entry emitted by every committed state transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum RootChainEvent {
    BlockSubmitted {
        fork_number: ForkNumber,
        block_number: BlockNumber,
        epoch_number: EpochNumber,
        block_hash: Bytes32,
        is_request: bool,
        user_activated: bool,
    },
    EpochPrepared {
        fork_number: ForkNumber,
        epoch_number: EpochNumber,
        start_block_number: BlockNumber,
        end_block_number: BlockNumber,
        request_start: RequestId,
        request_end: RequestId,
        kind: EpochKind,
    },
    BlockFinalized {
        fork_number: ForkNumber,
        block_number: BlockNumber,
    },
    EpochFinalized {
        fork_number: ForkNumber,
        epoch_number: EpochNumber,
        start_block_number: BlockNumber,
        end_block_number: BlockNumber,
    },
    EpochRebased {
        fork_number: ForkNumber,
        epoch_number: EpochNumber,
        start_block_number: BlockNumber,
        end_block_number: BlockNumber,
        request_start: RequestId,
        request_end: RequestId,
        kind: EpochKind,
    },
    RequestCreated {
        category: RequestCategory,
        request_id: RequestId,
        request_block_id: RequestBlockId,
        requestor: Address,
        to: Address,
        is_exit: bool,
        request_hash: Bytes32,
    },
    /// `amount` is what the resolution credited: on the root chain for
    /// exits, on the child chain for enters, zero for challenged exits.
    RequestFinalized {
        category: RequestCategory,
        request_id: RequestId,
        requestor: Address,
        is_exit: bool,
        challenged: bool,
        amount: Wei,
    },
    RequestChallenged {
        category: RequestCategory,
        request_id: RequestId,
        challenger: Address,
    },
    Forked {
        new_fork: ForkNumber,
        forked_block: BlockNumber,
        first_epoch: EpochNumber,
    },
}

impl RootChainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BlockSubmitted { .. } => "BlockSubmitted",
            Self::EpochPrepared { .. } => "EpochPrepared",
            Self::BlockFinalized { .. } => "BlockFinalized",
            Self::EpochFinalized { .. } => "EpochFinalized",
            Self::EpochRebased { .. } => "EpochRebased",
            Self::RequestCreated { .. } => "RequestCreated",
            Self::RequestFinalized { .. } => "RequestFinalized",
            Self::RequestChallenged { .. } => "RequestChallenged",
            Self::Forked { .. } => "Forked",
        }
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
