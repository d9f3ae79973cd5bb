use hex::FromHex;
use serde::{Deserialize, Serialize};
use ssz::H256;
use ssz_derive::Ssz;
use std::fmt;
use std::str::FromStr;

pub use chain::Wei;

pub type ForkNumber = u64;
pub type BlockNumber = u64;
pub type EpochNumber = u64;
pub type RequestId = u64;
pub type RequestBlockId = u64;
/// Seconds on the base ledger clock.
pub type Timestamp = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Ssz, Default, Serialize, Deserialize)]
#[ssz(transparent)]
pub struct Bytes32(pub H256);

impl Bytes32 {
    pub fn zero() -> Self {
        Bytes32(H256::zero())
    }

    /// Big-endian word holding `amount` in its low 16 bytes.
    pub fn from_amount(amount: Wei) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&amount.to_be_bytes());
        Bytes32(H256::from(bytes))
    }

    /// Reads the word as a big-endian amount. `None` if it does not fit in `Wei`.
    pub fn to_amount(&self) -> Option<Wei> {
        let bytes = self.0.as_bytes();
        if bytes[..16].iter().any(|byte| *byte != 0) {
            return None;
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&bytes[16..]);
        Some(Wei::from_be_bytes(low))
    }
}

impl FromStr for Bytes32 {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 32] = <[u8; 32]>::from_hex(s.trim_start_matches("0x"))?;
        Ok(Bytes32(H256::from(bytes)))
    }
}

impl fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

/// Account or contract identifier on the base ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(#[serde(with = "crate::serde_helpers::hex_array")] pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn repeat_byte(byte: u8) -> Self {
        Address([byte; 20])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 20] = <[u8; 20]>::from_hex(s.trim_start_matches("0x"))?;
        Ok(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}
