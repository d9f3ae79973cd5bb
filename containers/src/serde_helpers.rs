// Serde helpers for the text forms used in config files and the event stream.

/// Fixed-size byte arrays as `0x`-prefixed hex strings.
pub mod hex_array {
    use hex::FromHex;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S, const N: usize>(value: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
        [u8; N]: FromHex<Error = hex::FromHexError>,
    {
        let text = String::deserialize(deserializer)?;
        <[u8; N]>::from_hex(text.trim_start_matches("0x"))
            .map_err(|e| D::Error::custom(format!("Invalid hex string: {}", e)))
    }
}

/// Variable-length byte strings (receipts, proofs) as `0x`-prefixed hex.
pub mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        hex::decode(text.trim_start_matches("0x"))
            .map_err(|e| D::Error::custom(format!("Invalid hex string: {}", e)))
    }
}
