//! Witness builder for the ballot circuit
//!
//! Builds the circuit input from a voter identity and a chosen option.
//!
//! ```text
//! address   = BigInt(identity)            (private)
//! option    = BigInt(option_index)        (private)
//! nullifier = BigInt(keccak256(identity)) (checked by the circuit)
//! ```

use std::fmt;

use serde::Serialize;

use crate::error::{BallotError, Result};
use crate::identity::{OptionIndex, VoterIdentity};
use crate::nullifier::Nullifier;

/// Private input bundle for one vote attempt.
///
/// Built fresh for every attempt. `Debug` is redacted so the bundle never
/// ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Witness {
    identity: VoterIdentity,
    option: OptionIndex,
    nullifier: Nullifier,
}

/// Circuit input file, field names as declared in the circuit
#[derive(Serialize)]
struct CircuitInput {
    address: String,
    option: String,
    nullifier: String,
}

impl Witness {
    pub fn option(&self) -> OptionIndex {
        self.option
    }

    pub fn nullifier(&self) -> &Nullifier {
        &self.nullifier
    }

    pub fn identity(&self) -> &VoterIdentity {
        &self.identity
    }

    /// Render the snarkjs `input.json` document (decimal strings)
    pub fn to_circuit_input(&self) -> Result<String> {
        let input = CircuitInput {
            address: self.identity.to_field_element().to_string(),
            option: self.option.to_field_element().to_string(),
            nullifier: self.nullifier.to_word().to_string(),
        };
        serde_json::to_string(&input)
            .map_err(|e| BallotError::InvalidFieldElement {
                value: "witness".to_string(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness").finish_non_exhaustive()
    }
}

/// Validates the option range and derives the witness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WitnessBuilder {
    option_count: usize,
}

impl WitnessBuilder {
    /// Builder for a ballot with `option_count` options
    pub fn new(option_count: usize) -> Result<Self> {
        if option_count == 0 {
            return Err(BallotError::EmptyBallot);
        }
        Ok(Self { option_count })
    }

    pub fn option_count(&self) -> usize {
        self.option_count
    }

    /// Fail fast on an out-of-range option
    pub fn check_option(&self, option: OptionIndex) -> Result<()> {
        if option.value() >= self.option_count {
            return Err(BallotError::InvalidOption {
                index: option.value(),
                count: self.option_count,
            });
        }
        Ok(())
    }

    /// Build the witness for one vote attempt
    pub fn build(&self, identity: &VoterIdentity, option: OptionIndex) -> Result<Witness> {
        self.check_option(option)?;
        Ok(Witness {
            identity: *identity,
            option,
            nullifier: Nullifier::derive(identity),
        })
    }
}
