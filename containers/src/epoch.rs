use crate::{BlockNumber, RequestBlockId, RequestId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Class of an epoch.
///
/// `Request` epochs are filled by operator request blocks (ORBs) and carry
/// enter/exit requests, `UserActivated` epochs by user-activated blocks
/// (URBs). The `Rebased*` variants replay the unfinalized tail of the parent
/// fork right after a fork was opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EpochKind {
    NonRequest,
    Request { empty: bool },
    UserActivated,
    RebasedRequest { empty: bool },
    RebasedNonRequest { empty: bool },
}

impl EpochKind {
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Self::Request { .. } | Self::UserActivated | Self::RebasedRequest { .. }
        )
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Request { empty }
            | Self::RebasedRequest { empty }
            | Self::RebasedNonRequest { empty } => *empty,
            Self::NonRequest | Self::UserActivated => false,
        }
    }

    pub fn user_activated(&self) -> bool {
        matches!(self, Self::UserActivated)
    }

    pub fn rebase(&self) -> bool {
        matches!(self, Self::RebasedRequest { .. } | Self::RebasedNonRequest { .. })
    }

    /// Whether the epoch's requests come from the operator-included queue.
    pub fn carries_eros(&self) -> bool {
        matches!(self, Self::Request { .. } | Self::RebasedRequest { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NonRequest => "NRE",
            Self::Request { .. } => "ORE",
            Self::UserActivated => "URE",
            Self::RebasedRequest { .. } => "ORE'",
            Self::RebasedNonRequest { .. } => "NRE'",
        }
    }
}

impl fmt::Display for EpochKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "{} (empty)", self.label())
        } else {
            f.write_str(self.label())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epoch {
    #[serde(flatten)]
    pub kind: EpochKind,
    pub start_block_number: BlockNumber,
    pub end_block_number: BlockNumber,
    pub request_start: RequestId,
    pub request_end: RequestId,
    pub first_request_block_id: RequestBlockId,
    /// Time the epoch was prepared.
    pub timestamp: Timestamp,
    pub finalized: bool,
}

impl Epoch {
    /// An epoch holding no blocks, anchored at the end of its predecessor.
    pub fn empty(
        kind: EpochKind,
        anchor_block: BlockNumber,
        request_end: RequestId,
        first_request_block_id: RequestBlockId,
        timestamp: Timestamp,
    ) -> Self {
        debug_assert!(kind.is_empty());
        Self {
            kind,
            start_block_number: anchor_block,
            end_block_number: anchor_block,
            request_start: request_end,
            request_end,
            first_request_block_id,
            timestamp,
            finalized: false,
        }
    }

    pub fn num_blocks(&self) -> u64 {
        if self.kind.is_empty() {
            0
        } else {
            self.end_block_number - self.start_block_number + 1
        }
    }

    pub fn num_requests(&self) -> u64 {
        if self.kind.is_request() && !self.kind.is_empty() {
            self.request_end - self.request_start + 1
        } else {
            0
        }
    }

    pub fn contains_block(&self, block_number: BlockNumber) -> bool {
        !self.kind.is_empty()
            && self.start_block_number <= block_number
            && block_number <= self.end_block_number
    }

    /// Request block executed by `block_number`, for request epochs.
    pub fn request_block_id_of(&self, block_number: BlockNumber) -> Option<RequestBlockId> {
        (self.kind.is_request() && self.contains_block(block_number))
            .then(|| self.first_request_block_id + (block_number - self.start_block_number))
    }

    /// Request block id the next filled epoch of the same category starts at.
    pub fn next_request_block_id(&self) -> RequestBlockId {
        self.first_request_block_id + self.num_blocks()
    }
}
