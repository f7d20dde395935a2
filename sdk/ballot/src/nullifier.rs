//! Nullifiers
//!
//! Implements the one-vote-per-identity tag checked by the verifier contract.
//!
//! ```text
//! Nullifier = Keccak256(address_bytes[20])
//! ```
//!
//! The address is hashed as its 20 raw bytes with no padding, which is what
//! the circuit's nullifier input was generated from. Once a nullifier is
//! recorded on-chain, every later vote carrying it is rejected.

use std::fmt;

use alloy_primitives::{B256, U256, keccak256};

use crate::field::{FieldElement, reduce_to_scalar};
use crate::identity::VoterIdentity;

/// A nullifier (32 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nullifier(pub [u8; 32]);

impl Nullifier {
    /// Derive the nullifier for a voter identity
    pub fn derive(identity: &VoterIdentity) -> Self {
        let digest: B256 = keccak256(identity.as_bytes());
        Self(digest.0)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full 256-bit integer view, as fed to the witness
    pub fn to_word(&self) -> U256 {
        U256::from_be_bytes(self.0)
    }

    /// Value the circuit discloses for this nullifier (reduced mod r)
    pub fn to_field_element(&self) -> FieldElement {
        reduce_to_scalar(&self.0)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Short prefix safe for logs
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl AsRef<[u8]> for Nullifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nullifier({})", self.to_hex())
    }
}
