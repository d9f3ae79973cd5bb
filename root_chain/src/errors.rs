use crate::assets::AssetError;
use containers::{BlockNumber, ConfigError, EpochNumber, ForkNumber, RequestCategory, RequestId, Wei};
use thiserror::Error;

/// Rejection reasons for a root-chain transaction.
///
/// Every handler validates before mutating, so an error always leaves the
/// store unchanged.
#[derive(Debug, Error)]
pub enum RootChainError {
    #[error("fork {given} is not the active fork {current}")]
    ForkMismatch { given: ForkNumber, current: ForkNumber },

    #[error("sender is not the operator")]
    NotOperator,

    #[error("epoch {epoch_number} is {expected}, cannot accept a {submitted}")]
    UnexpectedBlockClass {
        epoch_number: EpochNumber,
        expected: &'static str,
        submitted: &'static str,
    },

    #[error("no pending user-activated requests")]
    NoPendingUserRequests,

    #[error("no user-activated block submission has been prepared")]
    UrbNotPrepared,

    #[error("a user-activated block submission is already prepared")]
    UrbAlreadyPrepared,

    #[error("user-activated epoch {epoch_number} is not finalized yet")]
    UserActivatedEpochPending { epoch_number: EpochNumber },

    #[error("user-activated block preparation expired at {deadline}")]
    UrbPreparationExpired { deadline: u64 },

    #[error("operator was active at {last_submission}, users may act from {not_before}")]
    OperatorStillActive { last_submission: u64, not_before: u64 },

    #[error("no finalized request left to apply")]
    NoRequestToApply,

    #[error("no requestable contract is mapped at {0}")]
    UnknownRequestableContract(containers::Address),

    #[error("attached fee {attached} does not match cost {required}")]
    InvalidCost { attached: Wei, required: Wei },

    #[error("request amount does not fit in a native amount")]
    AmountOverflow,

    #[error("epoch {epoch_number} on fork {fork_number} does not exist")]
    MissingEpoch {
        fork_number: ForkNumber,
        epoch_number: EpochNumber,
    },

    #[error("block {block_number} on fork {fork_number} does not exist")]
    MissingBlock {
        fork_number: ForkNumber,
        block_number: BlockNumber,
    },

    #[error("block {block_number} is not a submitted request block within its challenge period")]
    ChallengePeriodOver { block_number: BlockNumber },

    #[error("block {block_number} is already finalized")]
    BlockAlreadyFinalized { block_number: BlockNumber },

    #[error("request {request_id} is not an exit")]
    NotAnExit { request_id: RequestId },

    #[error("{category} {request_id} is already finalized")]
    RequestAlreadyFinalized {
        category: RequestCategory,
        request_id: RequestId,
    },

    #[error("{category} {request_id} is already challenged")]
    RequestAlreadyChallenged {
        category: RequestCategory,
        request_id: RequestId,
    },

    #[error("request index {index} is out of range for block {block_number}")]
    RequestIndexOutOfRange {
        block_number: BlockNumber,
        index: u64,
    },

    #[error("fraud proof was rejected")]
    InvalidFraudProof,

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Result<T, E = RootChainError> = std::result::Result<T, E>;
