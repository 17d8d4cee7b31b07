//! Tunnel secret generation

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Length of a tunnel secret in bytes
pub const SECRET_LEN: usize = 32;

/// Secret errors
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Entropy unavailable: cannot generate tunnel secret")]
    EntropyUnavailable(#[source] rand::Error),

    #[error("Invalid tunnel secret length: expected {SECRET_LEN} bytes, got {0}")]
    InvalidLength(usize),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),
}

/// 32 bytes of secret material proving ownership of a tunnel.
///
/// Serialized as standard base64. `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct TunnelSecret([u8; SECRET_LEN]);

impl TunnelSecret {
    /// Generate a secret from the operating system's CSPRNG
    pub fn generate() -> Result<Self, SecretError> {
        Self::generate_from(&mut OsRng)
    }

    /// Generate a secret from the given random source.
    ///
    /// A source that cannot supply bytes is an error; there is no fallback.
    pub fn generate_from<R: RngCore>(rng: &mut R) -> Result<Self, SecretError> {
        let mut bytes = [0u8; SECRET_LEN];
        rng.try_fill_bytes(&mut bytes)
            .map_err(SecretError::EntropyUnavailable)?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SecretError> {
        let bytes: [u8; SECRET_LEN] = bytes
            .try_into()
            .map_err(|_| SecretError::InvalidLength(bytes.len()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, SecretError> {
        let bytes = STANDARD.decode(encoded)?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for TunnelSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TunnelSecret(<redacted>)")
    }
}

impl Serialize for TunnelSecret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for TunnelSecret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).map_err(de::Error::custom)
    }
}
