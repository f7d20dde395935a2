//! ShadowVote Core
//!
//! Turns a selected option index into a confirmed, nullifier-protected vote.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            VotingClient                                 │
//! │                                                                         │
//! │  SessionBinder ──(identity)──┐                                          │
//! │                              ▼                                          │
//! │  OptionCatalog     WitnessBuilder ─▶ ProofOrchestrator ─▶ Submission    │
//! │  (read path)            │                 │               Pipeline      │
//! │       │                 │                 │                  │          │
//! │       ▼                 ▼                 ▼                  ▼          │
//! │  LedgerReader      shadowvote-ballot  ProvingBackend    WalletProvider  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The wallet, the ledger and the proving backend are traits so the whole
//! flow runs in-process against the `mock` implementations.

pub mod catalog;
pub mod client;
pub mod error;
pub mod ledger;
pub mod pipeline;
pub mod prover;
pub mod session;
pub mod startup;

pub use catalog::{OptionCatalog, Tally};
pub use client::VotingClient;
pub use error::{
    ConnectionError, LedgerError, ReadFailure, Rejection, RejectionKind, StartupError, VoteError,
};
pub use ledger::{Confirmation, LedgerReader, Receipt, TxHash, VoteCall, WalletProvider};
pub use pipeline::{PipelineStatus, SubmissionPipeline, SubmissionState};
pub use prover::{GeneratedProof, ProofOrchestrator, ProverOutput, ProvingBackend};
pub use session::SessionBinder;
pub use startup::{Deployment, RpcVotingClient};

pub use shadowvote_ballot as ballot;
