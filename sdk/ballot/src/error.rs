use thiserror::Error;

/// Errors raised while building or validating ballot data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BallotError {
    /// Option index outside `[0, count)`
    #[error("Invalid option: index {index} is outside 0..{count}")]
    InvalidOption { index: usize, count: usize },

    /// The ballot was configured without any options
    #[error("Ballot must have at least one option")]
    EmptyBallot,

    /// Identity string could not be parsed as a 20-byte address
    #[error("Invalid voter identity: {0}")]
    InvalidIdentity(String),

    /// Proof JSON did not have the expected A/B/C shape
    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    /// A value could not be parsed as a field element
    #[error("Invalid field element {value:?}: {reason}")]
    InvalidFieldElement { value: String, reason: String },

    /// A field element is not a canonical member of its field
    #[error("Field element {name} is not below the {field} modulus")]
    FieldOutOfRange { name: String, field: &'static str },

    /// Wrong number of public signals
    #[error("Expected {expected} public signals, got {got}")]
    SignalCountMismatch { expected: usize, got: usize },

    /// The signal layout points outside the signal vector
    #[error("Signal layout index {index} is outside {len} public signals")]
    LayoutOutOfBounds { index: usize, len: usize },

    /// The disclosed nullifier differs from the one derived for the voter
    #[error("Public nullifier {disclosed} does not match derived nullifier {derived}")]
    NullifierMismatch { disclosed: String, derived: String },
}

pub type Result<T> = std::result::Result<T, BallotError>;
