//! Error taxonomy for the ballot client.
//!
//! Collaborator failures (`ConnectionError`, `LedgerError`, `BackendError`)
//! are folded into [`VoteError`] at the submission pipeline boundary; the
//! presentation layer only ever sees a `VoteError` plus a status message.

use std::fmt;
use std::path::PathBuf;

use shadowvote_ballot::BallotError;
use thiserror::Error;

pub use crate::ledger::abi::AbiError;
pub use crate::prover::BackendError;

/// Wallet could not provide an identity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("No wallet detected: {0}")]
    NoWalletDetected(String),

    #[error("Wallet connection rejected: {0}")]
    ConnectionRejected(String),
}

/// Errors reported by the ledger or wallet transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("malformed ledger response: {0}")]
    Decode(String),

    #[error("failed to encode call: {0}")]
    Encode(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),
}

/// Tally query failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadFailure {
    #[error("ledger query failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("ledger returned {got} tallies, ballot has {expected} options")]
    Shape { expected: usize, got: usize },
}

/// Why the ledger refused a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// The voter's nullifier is already recorded (double vote)
    NullifierReused,
    /// The verifier rejected the proof
    InvalidProof,
    /// The submitting account cannot pay for the transaction
    InsufficientFunds,
    /// Reverted for another (or unknown) reason
    Reverted,
    /// The transaction never reached the ledger
    Transport,
    /// No receipt within the confirmation window
    Timeout,
}

/// A ledger rejection with its human-readable reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
}

impl Rejection {
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a revert reason reported by the verifier contract
    pub fn classify(reason: &str) -> RejectionKind {
        let lower = reason.to_ascii_lowercase();
        if lower.contains("nullifier") || lower.contains("already voted") {
            RejectionKind::NullifierReused
        } else if lower.contains("insufficient funds") {
            RejectionKind::InsufficientFunds
        } else if lower.contains("proof") {
            RejectionKind::InvalidProof
        } else {
            RejectionKind::Reverted
        }
    }

    /// User-facing text for the status line
    pub fn user_message(&self) -> String {
        match self.kind {
            RejectionKind::NullifierReused => {
                format!("This identity has already voted ({})", self.message)
            }
            RejectionKind::InvalidProof => format!("The ballot proof was rejected ({})", self.message),
            RejectionKind::InsufficientFunds => {
                format!("Insufficient funds to submit the vote ({})", self.message)
            }
            RejectionKind::Reverted => format!("The vote was rejected: {}", self.message),
            RejectionKind::Transport => format!("Could not reach the ledger: {}", self.message),
            RejectionKind::Timeout => format!("Vote not confirmed in time: {}", self.message),
        }
    }
}

impl From<LedgerError> for Rejection {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Reverted(reason) => Rejection::new(Rejection::classify(&reason), reason),
            LedgerError::Rpc { message, .. } => {
                Rejection::new(Rejection::classify(&message), message)
            }
            LedgerError::Transport(message) => Rejection::new(RejectionKind::Transport, message),
            LedgerError::Timeout(message) => Rejection::new(RejectionKind::Timeout, message),
            LedgerError::Decode(message) | LedgerError::Encode(message) => {
                Rejection::new(RejectionKind::Reverted, message)
            }
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

/// Everything a vote attempt can end with, short of a confirmation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoteError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Read(#[from] ReadFailure),

    #[error("Invalid option {index}: the ballot has {count} options")]
    InvalidOption { index: usize, count: usize },

    #[error("Proof generation failed: {0}")]
    ProvingFailure(String),

    #[error("{0}")]
    SubmissionRejected(Rejection),

    #[error("A vote is already in progress")]
    AlreadyInProgress,

    #[error("This session has already cast its vote")]
    AlreadyConfirmed,
}

impl VoteError {
    /// Map a ballot-building error; only option range errors are expected here
    pub fn from_ballot(err: BallotError) -> Self {
        match err {
            BallotError::InvalidOption { index, count } => VoteError::InvalidOption { index, count },
            other => VoteError::ProvingFailure(other.to_string()),
        }
    }
}

/// Fatal configuration problems detected at startup
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("missing configuration entry `{0}`")]
    Missing(&'static str),

    #[error("invalid configuration entry `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("circuit artifact not found: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("contract interface: {0}")]
    Abi(#[from] AbiError),

    #[error(transparent)]
    Ballot(#[from] BallotError),

    #[error("http client: {0}")]
    Http(String),
}
