//! ShadowVote Ballot SDK
//!
//! Pure, deterministic primitives shared by every part of the ballot client.
//!
//! ```text
//! ┌──────────────┐   keccak256   ┌─────────────┐
//! │ VoterIdentity│──────────────▶│  Nullifier  │
//! └──────────────┘               └─────────────┘
//!         │                             │
//!         ▼                             ▼
//! ┌─────────────────────────────────────────────┐
//! │  Witness { address, option, nullifier }     │──▶ proving backend
//! └─────────────────────────────────────────────┘
//!                                       │
//!            BackendProof ◀─────────────┘
//!                 │  swap B rows ([x, y] -> [y, x])
//!                 ▼
//!            VerifierProof + PublicSignals ──▶ vote(a, b, c, signals)
//! ```
//!
//! Nothing in this crate performs I/O. Network collaborators, the proving
//! backend and the submission state machine live in `shadowvote-core`.

pub mod error;
pub mod field;
pub mod identity;
pub mod nullifier;
pub mod proof;
pub mod witness;

pub use error::{BallotError, Result};
pub use field::{FieldElement, base_field_modulus, scalar_field_modulus};
pub use identity::{OptionIndex, VoterIdentity};
pub use nullifier::Nullifier;
pub use proof::{BackendProof, PublicSignals, SignalLayout, VerifierProof, swap_g2_rows};
pub use witness::{Witness, WitnessBuilder};
