use crate::{Address, Bytes32, RequestId, Timestamp, Wei};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Queue a request lives in.
///
/// EROs are included by operator request blocks, ERUs by user-activated
/// blocks. Ids are assigned independently per category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestCategory {
    Ero,
    Eru,
}

impl fmt::Display for RequestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ero => "ERO",
            Self::Eru => "ERU",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub timestamp: Timestamp,
    pub requestor: Address,
    /// Recipient for transfers, requestable contract otherwise.
    pub to: Address,
    pub is_exit: bool,
    pub is_transfer: bool,
    pub value: Wei,
    pub trie_key: Bytes32,
    pub trie_value: Bytes32,
    pub finalized: bool,
    pub challenged: bool,
}

impl Request {
    /// Amount moved by the request: the native value for transfers, the
    /// trie value otherwise.
    pub fn amount(&self) -> Option<Wei> {
        if self.is_transfer {
            Some(self.value)
        } else {
            self.trie_value.to_amount()
        }
    }

    /// Commitment to the immutable part of the request.
    pub fn hash(&self) -> Bytes32 {
        let mut hasher = Sha256::new();
        hasher.update(self.requestor.as_bytes());
        hasher.update(self.to.as_bytes());
        hasher.update([u8::from(self.is_exit), u8::from(self.is_transfer)]);
        hasher.update(self.value.to_be_bytes());
        hasher.update(self.trie_key.0.as_bytes());
        hasher.update(self.trie_value.0.as_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        Bytes32(ssz::H256::from(digest))
    }
}

/// Contiguous range of request ids carried by one request block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBlock {
    pub request_start: RequestId,
    pub request_end: RequestId,
}

impl RequestBlock {
    pub fn single(request_id: RequestId) -> Self {
        Self {
            request_start: request_id,
            request_end: request_id,
        }
    }

    pub fn len(&self) -> u64 {
        self.request_end - self.request_start + 1
    }

    pub fn is_full(&self, max_requests: u64) -> bool {
        self.len() >= max_requests
    }

    pub fn request_at(&self, index: u64) -> Option<RequestId> {
        (index < self.len()).then(|| self.request_start + index)
    }
}

/// Storage key of `account`'s balance in a requestable token's state trie.
pub fn balance_trie_key(account: &Address) -> Bytes32 {
    let mut preimage = [0u8; 64];
    preimage[12..32].copy_from_slice(account.as_bytes());
    preimage[63] = 2;
    let digest: [u8; 32] = Sha256::digest(preimage).into();
    Bytes32(ssz::H256::from(digest))
}
