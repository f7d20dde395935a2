//! BN254 field helpers
//!
//! Proof coordinates live in the base field `Fq`, public signals in the
//! scalar field `Fr`. Both are carried as 256-bit big-endian words so they
//! can be handed to the ledger ABI unchanged.

use std::sync::LazyLock;

use alloy_primitives::U256;
use ark_ff::{BigInteger, PrimeField};

use crate::error::{BallotError, Result};

/// A BN254 field element in canonical (reduced) form.
pub type FieldElement = U256;

static BASE_MODULUS: LazyLock<U256> = LazyLock::new(modulus_of::<ark_bn254::Fq>);
static SCALAR_MODULUS: LazyLock<U256> = LazyLock::new(modulus_of::<ark_bn254::Fr>);

fn modulus_of<F: PrimeField>() -> U256 {
    U256::from_be_slice(&F::MODULUS.to_bytes_be())
}

/// Modulus of the BN254 base field (proof coordinates).
pub fn base_field_modulus() -> U256 {
    *BASE_MODULUS
}

/// Modulus of the BN254 scalar field (circuit signals).
pub fn scalar_field_modulus() -> U256 {
    *SCALAR_MODULUS
}

/// Reduce a 32-byte big-endian value into the scalar field.
///
/// The circuit receives witness values modulo `r`, so this is the value the
/// prover discloses for any 256-bit input.
pub fn reduce_to_scalar(bytes: &[u8; 32]) -> FieldElement {
    let f = ark_bn254::Fr::from_be_bytes_mod_order(bytes);
    U256::from_be_slice(&f.into_bigint().to_bytes_be())
}

/// Parse a decimal (or `0x`-prefixed hex) string into a 256-bit word.
pub fn parse_element(value: &str) -> Result<FieldElement> {
    let trimmed = value.trim();
    let parsed = match trimmed.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(trimmed, 10),
    };
    parsed.map_err(|e| BallotError::InvalidFieldElement {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Reject coordinates that are not canonical base-field elements.
pub fn check_base(name: &str, value: &FieldElement) -> Result<()> {
    if *value >= *BASE_MODULUS {
        return Err(BallotError::FieldOutOfRange {
            name: name.to_string(),
            field: "BN254 base field",
        });
    }
    Ok(())
}

/// Reject signals that are not canonical scalar-field elements.
pub fn check_scalar(name: &str, value: &FieldElement) -> Result<()> {
    if *value >= *SCALAR_MODULUS {
        return Err(BallotError::FieldOutOfRange {
            name: name.to_string(),
            field: "BN254 scalar field",
        });
    }
    Ok(())
}
