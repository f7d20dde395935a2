//! Voter identity and option index

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, U256};

use crate::error::{BallotError, Result};
use crate::field::FieldElement;

/// The account identifier handed out by the wallet for this session.
///
/// Only ever used to derive the nullifier and as the circuit's private
/// `address` input.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoterIdentity(Address);

impl VoterIdentity {
    pub fn new(address: Address) -> Self {
        Self(address)
    }

    /// Canonical byte encoding fed to the nullifier hash (20 raw bytes).
    pub fn as_bytes(&self) -> &[u8; 20] {
        self.0.as_ref()
    }

    pub fn address(&self) -> Address {
        self.0
    }

    /// Big-endian integer view, matching `BigInt("0x" + address)`.
    pub fn to_field_element(&self) -> FieldElement {
        U256::from_be_slice(self.0.as_slice())
    }
}

impl From<Address> for VoterIdentity {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl FromStr for VoterIdentity {
    type Err = BallotError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<Address>()
            .map(Self)
            .map_err(|e| BallotError::InvalidIdentity(format!("{s:?}: {e}")))
    }
}

impl fmt::Display for VoterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for VoterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VoterIdentity({})", self.0)
    }
}

/// Position of a candidate option on the ballot.
///
/// Range is only known relative to a ballot; see [`crate::WitnessBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OptionIndex(pub usize);

impl OptionIndex {
    pub fn value(&self) -> usize {
        self.0
    }

    pub fn to_field_element(&self) -> FieldElement {
        U256::from(self.0)
    }
}

impl From<usize> for OptionIndex {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for OptionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
