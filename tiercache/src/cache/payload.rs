//! Serialized payload shared by both tiers and the promotion path
//!
//! A payload carries the Rust type name of the encoded value alongside the
//! bincode bytes, so a value written by one type is never decoded as another.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TierCacheError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub type_tag: String,
    pub bytes: Vec<u8>,
}

impl Payload {
    /// Encode a value together with its type tag
    pub fn encode<V: Serialize>(value: &V) -> Result<Self> {
        let bytes = bincode::serialize(value)
            .map_err(|e| TierCacheError::Serialization(e.to_string()))?;
        Ok(Self {
            type_tag: std::any::type_name::<V>().to_string(),
            bytes,
        })
    }

    /// Decode the value, rejecting payloads written for a different type
    pub fn decode<V: DeserializeOwned>(&self) -> Result<V> {
        let expected = std::any::type_name::<V>();
        if self.type_tag != expected {
            return Err(TierCacheError::Deserialization(format!(
                "type tag mismatch: stored {}, requested {}",
                self.type_tag, expected
            )));
        }
        Ok(bincode::deserialize(&self.bytes)?)
    }

    /// Wire form stored in the second tier
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| TierCacheError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Encode a value straight to second-tier bytes
pub fn encode_value<V: Serialize>(value: &V) -> Result<Vec<u8>> {
    Payload::encode(value)?.to_bytes()
}

/// Decode second-tier bytes back into a value
pub fn decode_value<V: DeserializeOwned>(bytes: &[u8]) -> Result<V> {
    Payload::from_bytes(bytes)?.decode()
}
