//! Proof orchestration
//!
//! ```text
//! Witness ──▶ ProvingBackend::prove()  (blocking thread)
//!                   │
//!                   ▼
//!        BackendProof + PublicSignals
//!                   │  signal count, nullifier/option cross-check,
//!                   │  field ranges
//!                   ▼
//!        GeneratedProof (verifier order: B rows swapped)
//! ```
//!
//! The backend is a blocking call; it runs under `spawn_blocking` so a long
//! proof never stalls the runtime that keeps the status channel live.

pub mod mock;
pub mod snarkjs;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use shadowvote_ballot::{
    BackendProof, BallotError, Nullifier, OptionIndex, PublicSignals, SignalLayout, VerifierProof,
    Witness,
};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::error::VoteError;

pub use mock::MockProver;
pub use snarkjs::SnarkjsBackend;

// ============================================================================
// Backend
// ============================================================================

/// Failures of the proving backend itself
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("circuit artifact not found: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("prover exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("prover output: {0}")]
    Malformed(#[from] BallotError),

    #[error("prover workspace: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw backend output, B rows still in backend order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProverOutput {
    pub proof: BackendProof,
    pub public_signals: PublicSignals,
}

/// A Groth16 prover for the ballot circuit
pub trait ProvingBackend: Send + Sync + 'static {
    /// Prove one witness. Blocking; may take seconds.
    fn prove(&self, witness: &Witness) -> Result<ProverOutput, BackendError>;
}

// ============================================================================
// Orchestrator
// ============================================================================

/// A checked proof ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProof {
    pub proof: VerifierProof,
    pub public_signals: PublicSignals,
    pub nullifier: Nullifier,
    pub option: OptionIndex,
    pub proving_time_ms: u64,
}

/// Runs the backend and validates what comes back
pub struct ProofOrchestrator<P> {
    backend: Arc<P>,
    layout: SignalLayout,
}

impl<P: ProvingBackend> ProofOrchestrator<P> {
    pub fn new(backend: P, layout: SignalLayout) -> Result<Self, BallotError> {
        Self::with_shared(Arc::new(backend), layout)
    }

    pub fn with_shared(backend: Arc<P>, layout: SignalLayout) -> Result<Self, BallotError> {
        layout.validate()?;
        Ok(Self { backend, layout })
    }

    pub fn layout(&self) -> &SignalLayout {
        &self.layout
    }

    pub fn backend(&self) -> &Arc<P> {
        &self.backend
    }

    /// Generate and validate a proof for `witness`
    pub async fn generate(&self, witness: &Witness) -> Result<GeneratedProof, VoteError> {
        let backend = Arc::clone(&self.backend);
        let input = witness.clone();
        let started = Instant::now();

        debug!(nullifier = %witness.nullifier().short(), "Starting proof generation");
        let output = tokio::task::spawn_blocking(move || backend.prove(&input))
            .await
            .map_err(|e| VoteError::ProvingFailure(format!("prover task panicked: {e}")))?
            .map_err(|e| {
                error!(error = %e, "Proof generation failed");
                VoteError::ProvingFailure(e.to_string())
            })?;

        self.validate(&output, witness)
            .map_err(|e| VoteError::ProvingFailure(e.to_string()))?;

        let proving_time_ms = started.elapsed().as_millis() as u64;
        info!(proving_time_ms, "Proof generated successfully");

        Ok(GeneratedProof {
            proof: output.proof.into_verifier_order(),
            public_signals: output.public_signals,
            nullifier: *witness.nullifier(),
            option: witness.option(),
            proving_time_ms,
        })
    }

    fn validate(&self, output: &ProverOutput, witness: &Witness) -> Result<(), BallotError> {
        self.layout.check(&output.public_signals, witness.nullifier())?;

        if let Some(disclosed) = self.layout.option_of(&output.public_signals) {
            let chosen = witness.option().to_field_element();
            if disclosed != chosen {
                return Err(BallotError::MalformedProof(format!(
                    "public option {disclosed} does not match chosen option {chosen}"
                )));
            }
        }

        output.proof.check_ranges()?;
        output.public_signals.check_ranges()
    }
}
