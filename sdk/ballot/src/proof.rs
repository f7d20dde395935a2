//! Groth16 proof shapes
//!
//! The proving backend (snarkjs) and the on-chain verifier disagree on how a
//! G2 point's `Fq2` coordinates are ordered:
//!
//! ```text
//! backend  : pi_b = [[x.c0, x.c1], [y.c0, y.c1]]
//! verifier :    b = [[x.c1, x.c0], [y.c1, y.c0]]
//! ```
//!
//! `A` and `C` are G1 points and pass through untouched. The two orderings
//! are kept as distinct types so a backend-ordered proof cannot reach the
//! ledger by accident.

use serde::Deserialize;

use crate::error::{BallotError, Result};
use crate::field::{FieldElement, check_base, check_scalar, parse_element};
use crate::nullifier::Nullifier;

/// G1 point (x, y)
pub type G1 = [FieldElement; 2];

/// G2 point, one row per coordinate, two `Fq2` limbs per row
pub type G2 = [[FieldElement; 2]; 2];

/// Swap the two limbs inside each row of a G2 point.
///
/// Applying it twice returns the input.
pub fn swap_g2_rows(b: G2) -> G2 {
    [[b[0][1], b[0][0]], [b[1][1], b[1][0]]]
}

/// Proof as emitted by the proving backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendProof {
    pub a: G1,
    pub b: G2,
    pub c: G1,
}

/// Proof in the verifier contract's calling convention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierProof {
    pub a: G1,
    pub b: G2,
    pub c: G1,
}

/// snarkjs `proof.json` layout (projective, third coordinate ignored)
#[derive(Debug, Deserialize)]
struct SnarkjsProofJson {
    pi_a: Vec<String>,
    pi_b: Vec<Vec<String>>,
    pi_c: Vec<String>,
    #[serde(default)]
    protocol: Option<String>,
}

impl BackendProof {
    /// Parse a snarkjs `proof.json` document
    pub fn from_snarkjs_json(json: &str) -> Result<Self> {
        let raw: SnarkjsProofJson = serde_json::from_str(json)
            .map_err(|e| BallotError::MalformedProof(format!("proof.json: {e}")))?;

        if let Some(protocol) = raw.protocol.as_deref() {
            if protocol != "groth16" {
                return Err(BallotError::MalformedProof(format!(
                    "unsupported protocol {protocol:?}"
                )));
            }
        }

        let a = parse_g1("pi_a", &raw.pi_a)?;
        let c = parse_g1("pi_c", &raw.pi_c)?;

        if raw.pi_b.len() < 2 {
            return Err(BallotError::MalformedProof(format!(
                "pi_b has {} rows, expected at least 2",
                raw.pi_b.len()
            )));
        }
        let b = [
            parse_pair("pi_b[0]", &raw.pi_b[0])?,
            parse_pair("pi_b[1]", &raw.pi_b[1])?,
        ];

        Ok(Self { a, b, c })
    }

    /// Reorder into the verifier's convention
    pub fn into_verifier_order(self) -> VerifierProof {
        VerifierProof {
            a: self.a,
            b: swap_g2_rows(self.b),
            c: self.c,
        }
    }

    /// Every coordinate must be a canonical base-field element
    pub fn check_ranges(&self) -> Result<()> {
        check_base("a.x", &self.a[0])?;
        check_base("a.y", &self.a[1])?;
        for (row, pair) in self.b.iter().enumerate() {
            for (limb, value) in pair.iter().enumerate() {
                check_base(&format!("b[{row}][{limb}]"), value)?;
            }
        }
        check_base("c.x", &self.c[0])?;
        check_base("c.y", &self.c[1])?;
        Ok(())
    }
}

impl VerifierProof {
    /// Undo the verifier reordering
    pub fn into_backend_order(self) -> BackendProof {
        BackendProof {
            a: self.a,
            b: swap_g2_rows(self.b),
            c: self.c,
        }
    }
}

fn parse_pair(name: &str, values: &[String]) -> Result<[FieldElement; 2]> {
    if values.len() < 2 {
        return Err(BallotError::MalformedProof(format!(
            "{name} has {} elements, expected 2",
            values.len()
        )));
    }
    Ok([parse_element(&values[0])?, parse_element(&values[1])?])
}

fn parse_g1(name: &str, values: &[String]) -> Result<G1> {
    parse_pair(name, values)
}

/// Ordered public signals disclosed alongside the proof
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublicSignals(Vec<FieldElement>);

impl PublicSignals {
    pub fn new(values: Vec<FieldElement>) -> Self {
        Self(values)
    }

    /// Parse a snarkjs `public.json` document (array of decimal strings)
    pub fn from_snarkjs_json(json: &str) -> Result<Self> {
        let raw: Vec<String> = serde_json::from_str(json)
            .map_err(|e| BallotError::MalformedProof(format!("public.json: {e}")))?;
        raw.iter()
            .map(|s| parse_element(s))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn as_slice(&self) -> &[FieldElement] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<FieldElement> {
        self.0.get(index).copied()
    }

    pub fn check_ranges(&self) -> Result<()> {
        for (i, value) in self.0.iter().enumerate() {
            check_scalar(&format!("public_signals[{i}]"), value)?;
        }
        Ok(())
    }
}

/// Where the circuit places its disclosed values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalLayout {
    /// Exact number of public signals the circuit emits
    pub count: usize,
    /// Index of the nullifier, if disclosed
    pub nullifier: Option<usize>,
    /// Index of the chosen option, if disclosed
    pub option: Option<usize>,
}

impl Default for SignalLayout {
    fn default() -> Self {
        Self {
            count: 2,
            nullifier: Some(0),
            option: Some(1),
        }
    }
}

impl SignalLayout {
    /// Indices must point inside `count`
    pub fn validate(&self) -> Result<()> {
        for index in [self.nullifier, self.option].into_iter().flatten() {
            if index >= self.count {
                return Err(BallotError::LayoutOutOfBounds {
                    index,
                    len: self.count,
                });
            }
        }
        Ok(())
    }

    pub fn nullifier_of(&self, signals: &PublicSignals) -> Option<FieldElement> {
        self.nullifier.and_then(|i| signals.get(i))
    }

    pub fn option_of(&self, signals: &PublicSignals) -> Option<FieldElement> {
        self.option.and_then(|i| signals.get(i))
    }

    /// Check the signal count and, if placed, the disclosed nullifier
    pub fn check(&self, signals: &PublicSignals, nullifier: &Nullifier) -> Result<()> {
        if signals.len() != self.count {
            return Err(BallotError::SignalCountMismatch {
                expected: self.count,
                got: signals.len(),
            });
        }
        if let Some(disclosed) = self.nullifier_of(signals) {
            let derived = nullifier.to_field_element();
            if disclosed != derived {
                return Err(BallotError::NullifierMismatch {
                    disclosed: disclosed.to_string(),
                    derived: derived.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    // Shape of a real snarkjs 0.7 proof.json (values shortened)
    const PROOF_JSON: &str = r#"{
        "pi_a": ["11", "12", "1"],
        "pi_b": [["21", "22"], ["23", "24"], ["1", "0"]],
        "pi_c": ["31", "32", "1"],
        "protocol": "groth16",
        "curve": "bn128"
    }"#;

    #[test]
    fn test_coordinate_at_base_modulus_is_rejected() {
        let mut proof = BackendProof::from_snarkjs_json(PROOF_JSON).unwrap();
        assert!(proof.check_ranges().is_ok());

        proof.b[1][0] = crate::base_field_modulus();
        assert_eq!(
            proof.check_ranges(),
            Err(BallotError::FieldOutOfRange {
                name: "b[1][0]".to_string(),
                field: "BN254 base field",
            })
        );
    }

    #[test]
    fn test_parse_snarkjs_proof() {
        let proof = BackendProof::from_snarkjs_json(PROOF_JSON).unwrap();
        assert_eq!(proof.a, [u(11), u(12)]);
        assert_eq!(proof.b, [[u(21), u(22)], [u(23), u(24)]]);
        assert_eq!(proof.c, [u(31), u(32)]);
    }

    #[test]
    fn test_verifier_order_fixture() {
        let proof = BackendProof::from_snarkjs_json(PROOF_JSON).unwrap();
        let verifier = proof.into_verifier_order();

        // A and C untouched, both B rows swapped
        assert_eq!(verifier.a, [u(11), u(12)]);
        assert_eq!(verifier.b, [[u(22), u(21)], [u(24), u(23)]]);
        assert_eq!(verifier.c, [u(31), u(32)]);
    }

    #[test]
    fn test_swap_is_involution() {
        let b = [[u(1), u(2)], [u(3), u(4)]];
        assert_eq!(swap_g2_rows(swap_g2_rows(b)), b);
        assert_ne!(swap_g2_rows(b), b);

        let proof = BackendProof::from_snarkjs_json(PROOF_JSON).unwrap();
        assert_eq!(proof.clone().into_verifier_order().into_backend_order(), proof);
    }

    #[test]
    fn test_symmetric_rows_are_fixed_points() {
        let b = [[u(5), u(5)], [u(6), u(6)]];
        assert_eq!(swap_g2_rows(b), b);
    }

    #[test]
    fn test_rejects_wrong_protocol() {
        let json = PROOF_JSON.replace("groth16", "plonk");
        assert!(matches!(
            BackendProof::from_snarkjs_json(&json),
            Err(BallotError::MalformedProof(_))
        ));
    }

    #[test]
    fn test_rejects_short_pi_b() {
        let json = r#"{"pi_a": ["1","2"], "pi_b": [["1","2"]], "pi_c": ["1","2"]}"#;
        assert!(BackendProof::from_snarkjs_json(json).is_err());
    }

    #[test]
    fn test_parse_public_signals() {
        let signals = PublicSignals::from_snarkjs_json(r#"["7", "1"]"#).unwrap();
        assert_eq!(signals.as_slice(), &[u(7), u(1)]);
    }

    #[test]
    fn test_layout_rejects_wrong_count() {
        let layout = SignalLayout {
            count: 2,
            nullifier: None,
            option: None,
        };
        let nullifier = Nullifier([0u8; 32]);
        let err = layout
            .check(&PublicSignals::new(vec![u(1)]), &nullifier)
            .unwrap_err();
        assert_eq!(
            err,
            BallotError::SignalCountMismatch {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn test_layout_checks_disclosed_nullifier() {
        let layout = SignalLayout::default();
        // above r, so the disclosed value is the reduced one
        let nullifier = Nullifier([0xffu8; 32]);
        let good = PublicSignals::new(vec![nullifier.to_field_element(), u(1)]);
        assert!(layout.check(&good, &nullifier).is_ok());

        let bad = PublicSignals::new(vec![nullifier.to_word(), u(1)]);
        assert!(matches!(
            layout.check(&bad, &nullifier),
            Err(BallotError::NullifierMismatch { .. })
        ));
    }

    #[test]
    fn test_layout_validate() {
        let layout = SignalLayout {
            count: 1,
            nullifier: Some(0),
            option: Some(1),
        };
        assert!(layout.validate().is_err());
        assert!(SignalLayout::default().validate().is_ok());
    }
}
