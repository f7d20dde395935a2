//! Mock prover for tests and local runs
//!
//! Produces deterministic, well-formed proofs. The coordinates are a keyed
//! hash of the public signals, so `MockLedger` can "verify" a proof by
//! recomputing it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy_primitives::U256;
use shadowvote_ballot::{
    BackendProof, FieldElement, PublicSignals, SignalLayout, Witness, base_field_modulus,
};

use super::{BackendError, ProverOutput, ProvingBackend};

const DOMAIN: &[u8] = b"shadowvote-mock-proof-v1";

pub struct MockProver {
    layout: SignalLayout,
    /// Simulated proving time
    delay: Duration,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockProver {
    pub fn new(layout: SignalLayout) -> Self {
        Self {
            layout,
            delay: Duration::ZERO,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create with a simulated proving time (for testing)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every `prove` call fails with `reason`
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Number of `prove` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The proof this prover emits for `signals`, in backend order
    pub fn proof_for(signals: &PublicSignals) -> BackendProof {
        let coordinate = |index: u8| -> FieldElement {
            let mut hasher = blake3::Hasher::new();
            hasher.update(DOMAIN);
            hasher.update(&[index]);
            for signal in signals.as_slice() {
                hasher.update(&signal.to_be_bytes::<32>());
            }
            U256::from_be_bytes(*hasher.finalize().as_bytes()) % base_field_modulus()
        };

        BackendProof {
            a: [coordinate(0), coordinate(1)],
            b: [
                [coordinate(2), coordinate(3)],
                [coordinate(4), coordinate(5)],
            ],
            c: [coordinate(6), coordinate(7)],
        }
    }

    fn signals_for(&self, witness: &Witness) -> PublicSignals {
        let mut values = vec![FieldElement::ZERO; self.layout.count];
        if let Some(slot) = self.layout.nullifier.and_then(|i| values.get_mut(i)) {
            *slot = witness.nullifier().to_field_element();
        }
        if let Some(slot) = self.layout.option.and_then(|i| values.get_mut(i)) {
            *slot = witness.option().to_field_element();
        }
        PublicSignals::new(values)
    }
}

impl ProvingBackend for MockProver {
    fn prove(&self, witness: &Witness) -> Result<ProverOutput, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        if let Some(reason) = &self.failure {
            return Err(BackendError::Failed {
                status: "mock failure".to_string(),
                stderr: reason.clone(),
            });
        }

        let public_signals = self.signals_for(witness);
        Ok(ProverOutput {
            proof: Self::proof_for(&public_signals),
            public_signals,
        })
    }
}
