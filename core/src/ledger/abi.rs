//! Contract interface
//!
//! The verifier contract is described by its JSON ABI. Only two functions are
//! used:
//!
//! ```text
//! getAllOptions() -> uint256[]
//! vote(uint256[2] a, uint256[2][2] b, uint256[2] c, uint256[N] publicSignals)
//! ```
//!
//! Calldata is encoded from the ABI rather than from a hardcoded signature so
//! a redeployed verifier with a different signal count is picked up from its
//! ABI file.

use alloy_dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy_json_abi::{Function, JsonAbi};
use shadowvote_ballot::{FieldElement, VerifierProof};
use thiserror::Error;

use super::VoteCall;

const TALLY_FUNCTION: &str = "getAllOptions";
const VOTE_FUNCTION: &str = "vote";

/// Selector of the standard `Error(string)` revert payload
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("invalid ABI document: {0}")]
    Parse(String),

    #[error("ABI has no `{0}` function")]
    MissingFunction(&'static str),

    #[error("`{function}` has an unexpected signature: {reason}")]
    Signature {
        function: &'static str,
        reason: String,
    },

    #[error("failed to encode `{function}` call: {reason}")]
    Encode {
        function: &'static str,
        reason: String,
    },

    #[error("failed to decode `{function}` output: {reason}")]
    Decode {
        function: &'static str,
        reason: String,
    },
}

/// Encoder/decoder for the two contract functions the client calls
#[derive(Debug, Clone)]
pub struct ContractInterface {
    tally: Function,
    vote: Function,
    signals: DynSolType,
}

impl ContractInterface {
    /// Parse an ABI file, either a bare array or a build artifact with an
    /// `abi` field
    pub fn from_json(json: &str) -> Result<Self, AbiError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| AbiError::Parse(e.to_string()))?;
        let items = match value {
            serde_json::Value::Object(mut artifact) => artifact
                .remove("abi")
                .ok_or_else(|| AbiError::Parse("object has no `abi` field".to_string()))?,
            other => other,
        };
        let abi: JsonAbi =
            serde_json::from_value(items).map_err(|e| AbiError::Parse(e.to_string()))?;
        Self::from_abi(&abi)
    }

    pub fn from_abi(abi: &JsonAbi) -> Result<Self, AbiError> {
        let tally = first_function(abi, TALLY_FUNCTION)?;
        let vote = first_function(abi, VOTE_FUNCTION)?;

        if vote.inputs.len() != 4 {
            return Err(AbiError::Signature {
                function: VOTE_FUNCTION,
                reason: format!("expected 4 inputs, found {}", vote.inputs.len()),
            });
        }

        let signals = vote.inputs[3].resolve().map_err(|e| AbiError::Signature {
            function: VOTE_FUNCTION,
            reason: e.to_string(),
        })?;
        match &signals {
            DynSolType::FixedArray(inner, _) | DynSolType::Array(inner)
                if matches!(**inner, DynSolType::Uint(256)) => {}
            other => {
                return Err(AbiError::Signature {
                    function: VOTE_FUNCTION,
                    reason: format!("public signals must be uint256[], found {other}"),
                });
            }
        }

        Ok(Self {
            tally,
            vote,
            signals,
        })
    }

    /// Signal count fixed by the ABI, `None` for a dynamic array
    pub fn expected_signal_count(&self) -> Option<usize> {
        match self.signals {
            DynSolType::FixedArray(_, len) => Some(len),
            _ => None,
        }
    }

    /// Calldata for `getAllOptions()`
    pub fn encode_tally_query(&self) -> Result<Vec<u8>, AbiError> {
        self.tally
            .abi_encode_input(&[])
            .map_err(|e| AbiError::Encode {
                function: TALLY_FUNCTION,
                reason: e.to_string(),
            })
    }

    /// Decode the `getAllOptions()` return data
    pub fn decode_tallies(&self, data: &[u8]) -> Result<Vec<u64>, AbiError> {
        let decode_err = |reason: String| AbiError::Decode {
            function: TALLY_FUNCTION,
            reason,
        };

        let outputs = self
            .tally
            .abi_decode_output(data, true)
            .map_err(|e| decode_err(e.to_string()))?;
        let counts = match outputs.first() {
            Some(DynSolValue::Array(values)) | Some(DynSolValue::FixedArray(values)) => values,
            Some(other) => return Err(decode_err(format!("unexpected output {other:?}"))),
            None => return Err(decode_err("empty output".to_string())),
        };

        counts
            .iter()
            .map(|value| match value {
                DynSolValue::Uint(count, _) => u64::try_from(*count)
                    .map_err(|_| decode_err(format!("tally {count} does not fit in u64"))),
                other => Err(decode_err(format!("unexpected tally value {other:?}"))),
            })
            .collect()
    }

    /// Calldata for `vote(a, b, c, publicSignals)`
    pub fn encode_vote(&self, call: &VoteCall) -> Result<Vec<u8>, AbiError> {
        let VerifierProof { a, b, c } = &call.proof;
        let signals = call.public_signals.as_slice();

        let signal_value = match self.signals {
            DynSolType::FixedArray(_, len) => {
                if signals.len() != len {
                    return Err(AbiError::Encode {
                        function: VOTE_FUNCTION,
                        reason: format!(
                            "verifier takes {len} public signals, got {}",
                            signals.len()
                        ),
                    });
                }
                DynSolValue::FixedArray(words(signals))
            }
            _ => DynSolValue::Array(words(signals)),
        };

        let args = [
            DynSolValue::FixedArray(words(a)),
            DynSolValue::FixedArray(
                b.iter()
                    .map(|row| DynSolValue::FixedArray(words(row)))
                    .collect(),
            ),
            DynSolValue::FixedArray(words(c)),
            signal_value,
        ];

        self.vote
            .abi_encode_input(&args)
            .map_err(|e| AbiError::Encode {
                function: VOTE_FUNCTION,
                reason: e.to_string(),
            })
    }
}

fn first_function(abi: &JsonAbi, name: &'static str) -> Result<Function, AbiError> {
    abi.function(name)
        .and_then(|overloads| overloads.first())
        .cloned()
        .ok_or(AbiError::MissingFunction(name))
}

fn words(values: &[FieldElement]) -> Vec<DynSolValue> {
    values.iter().map(|v| DynSolValue::Uint(*v, 256)).collect()
}

/// Extract the reason string from `Error(string)` revert data
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let payload = data.strip_prefix(&ERROR_STRING_SELECTOR[..])?;
    let decoded = DynSolType::Tuple(vec![DynSolType::String])
        .abi_decode_params(payload)
        .ok()?;
    match decoded {
        DynSolValue::Tuple(mut fields) => match fields.pop() {
            Some(DynSolValue::String(reason)) => Some(reason),
            _ => None,
        },
        _ => None,
    }
}
