//! Submission pipeline
//!
//! Drives one vote attempt through the session state machine:
//!
//! ```text
//!            submit()            proof ok              receipt ok
//!   Idle ─────────────▶ Proving ──────────▶ Submitting ──────────▶ Confirmed
//!    ▲                    │  │                  │
//!    │       abandoned    │  │ proving error    │ rejected / timeout
//!    ├────────────────────┘  ▼                  ▼
//!    └─────────────────── Failed ◀──────────────┘
//! ```
//!
//! At most one attempt is in flight per pipeline. The state lives in a
//! `watch` channel so a presentation layer can follow it without polling;
//! the last failure reason stays in [`PipelineStatus::message`] after the
//! state has returned to `Idle`.

use std::fmt;
use std::sync::Arc;

use shadowvote_ballot::{OptionIndex, VoterIdentity, WitnessBuilder};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{Rejection, RejectionKind, VoteError};
use crate::ledger::{Confirmation, Receipt, TxHash, VoteCall, WalletProvider};
use crate::prover::{ProofOrchestrator, ProvingBackend};

/// Status line shown after a confirmed vote
pub const SUCCESS_MESSAGE: &str = "Vote cast successfully";

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Proving,
    Submitting,
    Confirmed { tx_hash: TxHash },
    Failed { reason: String },
}

impl SubmissionState {
    /// An attempt is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Proving | Self::Submitting)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    pub fn can_transition_to(&self, next: &SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Idle, Proving)
                | (Proving, Submitting)
                | (Proving, Failed { .. })
                | (Proving, Idle)
                | (Submitting, Confirmed { .. })
                | (Submitting, Failed { .. })
                | (Failed { .. }, Idle)
        )
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Proving => write!(f, "proving"),
            Self::Submitting => write!(f, "submitting"),
            Self::Confirmed { tx_hash } => write!(f, "confirmed ({tx_hash})"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// State plus the user-facing status message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStatus {
    pub state: SubmissionState,
    pub message: Option<String>,
}

impl Default for PipelineStatus {
    fn default() -> Self {
        Self {
            state: SubmissionState::Idle,
            message: None,
        }
    }
}

type StatusSender = watch::Sender<PipelineStatus>;

/// Apply `next` if the state machine allows it
fn advance(status: &StatusSender, next: SubmissionState, message: Option<String>) -> bool {
    status.send_if_modified(|current| {
        if !current.state.can_transition_to(&next) {
            warn!(from = %current.state, to = %next, "rejected state transition");
            return false;
        }
        debug!(from = %current.state, to = %next, "state transition");
        current.state = next;
        if message.is_some() {
            current.message = message;
        }
        true
    })
}

/// Record a failure and return to `Idle`, keeping the reason as the message
fn fail(status: &StatusSender, err: &VoteError) {
    let reason = err.to_string();
    advance(
        status,
        SubmissionState::Failed {
            reason: reason.clone(),
        },
        Some(reason),
    );
    advance(status, SubmissionState::Idle, None);
}

/// Resets `Proving` to `Idle` if the attempt is dropped before submission
struct AttemptGuard<'a> {
    status: &'a StatusSender,
    armed: bool,
}

impl AttemptGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.armed && self.status.borrow().state == SubmissionState::Proving {
            info!("vote attempt abandoned during proving");
            advance(
                self.status,
                SubmissionState::Idle,
                Some("Vote attempt abandoned".to_string()),
            );
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct SubmissionPipeline<P, W> {
    builder: WitnessBuilder,
    orchestrator: ProofOrchestrator<P>,
    wallet: Arc<W>,
    status: Arc<StatusSender>,
}

impl<P, W> SubmissionPipeline<P, W>
where
    P: ProvingBackend,
    W: WalletProvider,
{
    pub fn new(builder: WitnessBuilder, orchestrator: ProofOrchestrator<P>, wallet: Arc<W>) -> Self {
        Self {
            builder,
            orchestrator,
            wallet,
            status: Arc::new(watch::Sender::new(PipelineStatus::default())),
        }
    }

    pub fn option_count(&self) -> usize {
        self.builder.option_count()
    }

    pub fn orchestrator(&self) -> &ProofOrchestrator<P> {
        &self.orchestrator
    }

    /// Follow state changes
    pub fn subscribe(&self) -> watch::Receiver<PipelineStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> PipelineStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> SubmissionState {
        self.status.borrow().state.clone()
    }

    /// Fail fast on an out-of-range option.
    ///
    /// Only the status message changes; no wallet, prover or ledger work
    /// is started.
    pub fn check_option(&self, option: OptionIndex) -> Result<(), VoteError> {
        self.builder
            .check_option(option)
            .map_err(VoteError::from_ballot)
            .inspect_err(|err| self.report(err))
    }

    /// Surface an error that never started an attempt.
    ///
    /// The state is left alone; the message is only replaced while idle so
    /// an in-flight or confirmed status is not overwritten.
    pub fn report(&self, err: &VoteError) {
        let message = err.to_string();
        self.status.send_if_modified(|current| {
            if current.state != SubmissionState::Idle {
                return false;
            }
            debug!(%message, "status message");
            current.message = Some(message);
            true
        });
    }

    /// Cast a vote for `option` as `identity`.
    ///
    /// Returns once the ledger has confirmed or rejected the transaction.
    /// Dropping the returned future while proving abandons the attempt;
    /// once submission has started the transaction is followed to its
    /// receipt regardless.
    pub async fn submit(
        &self,
        identity: &VoterIdentity,
        option: OptionIndex,
    ) -> Result<Confirmation, VoteError> {
        let witness = self
            .builder
            .build(identity, option)
            .map_err(VoteError::from_ballot)
            .inspect_err(|err| self.report(err))?;

        self.begin()?;
        let mut guard = AttemptGuard {
            status: &self.status,
            armed: true,
        };
        info!(option = %option, nullifier = %witness.nullifier().short(), "vote attempt started");

        let generated = match self.orchestrator.generate(&witness).await {
            Ok(generated) => generated,
            Err(err) => {
                guard.disarm();
                fail(&self.status, &err);
                return Err(err);
            }
        };
        drop(witness);

        advance(&self.status, SubmissionState::Submitting, None);
        guard.disarm();

        let wallet = Arc::clone(&self.wallet);
        let status = Arc::clone(&self.status);
        let from = identity.address();
        let nullifier = generated.nullifier;
        let call = VoteCall {
            proof: generated.proof,
            public_signals: generated.public_signals,
        };

        let task = tokio::spawn(async move {
            match send_and_confirm(wallet.as_ref(), from, &call).await {
                Ok(receipt) => {
                    info!(tx_hash = %receipt.tx_hash, block = ?receipt.block_number, "vote confirmed");
                    advance(
                        &status,
                        SubmissionState::Confirmed {
                            tx_hash: receipt.tx_hash,
                        },
                        Some(SUCCESS_MESSAGE.to_string()),
                    );
                    Ok(Confirmation {
                        tx_hash: receipt.tx_hash,
                        block_number: receipt.block_number,
                        nullifier,
                        option,
                    })
                }
                Err(rejection) => {
                    warn!(kind = ?rejection.kind, reason = %rejection.message, "vote rejected");
                    let err = VoteError::SubmissionRejected(rejection);
                    fail(&status, &err);
                    Err(err)
                }
            }
        });

        task.await.map_err(|e| {
            let err = VoteError::SubmissionRejected(Rejection::new(
                RejectionKind::Transport,
                format!("submission task failed: {e}"),
            ));
            fail(&self.status, &err);
            err
        })?
    }

    /// Atomically claim the pipeline: `Idle -> Proving`
    fn begin(&self) -> Result<(), VoteError> {
        let mut outcome = Ok(());
        self.status.send_if_modified(|current| match current.state {
            SubmissionState::Idle => {
                debug!(from = %current.state, to = %SubmissionState::Proving, "state transition");
                current.state = SubmissionState::Proving;
                current.message = None;
                true
            }
            SubmissionState::Confirmed { .. } => {
                outcome = Err(VoteError::AlreadyConfirmed);
                false
            }
            _ => {
                outcome = Err(VoteError::AlreadyInProgress);
                false
            }
        });
        outcome
    }
}

/// Send the vote and follow it to a successful receipt
pub(crate) async fn send_and_confirm<W: WalletProvider>(
    wallet: &W,
    from: alloy_primitives::Address,
    call: &VoteCall,
) -> Result<Receipt, Rejection> {
    let tx_hash = wallet.send_vote(from, call).await?;
    let receipt = wallet.wait_for_receipt(tx_hash).await?;
    if !receipt.success {
        let block = receipt
            .block_number
            .map_or_else(|| "unknown block".to_string(), |n| format!("block {n}"));
        return Err(Rejection::new(
            RejectionKind::Reverted,
            format!("transaction {tx_hash} reverted in {block}"),
        ));
    }
    Ok(receipt)
}
