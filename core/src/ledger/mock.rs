//! In-memory ledger and wallet
//!
//! `MockLedger` plays the verifier contract: it accepts a vote only if the
//! proof matches what [`MockProver`] would have produced for the public
//! signals, and it records every nullifier it has seen. `MockWallet` submits
//! straight into a shared ledger, so several sessions can vote against the
//! same contract state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, keccak256};
use shadowvote_ballot::{FieldElement, Nullifier, SignalLayout};
use tokio::sync::Mutex;

use super::{LedgerReader, Receipt, TxHash, VoteCall, WalletProvider};
use crate::error::{ConnectionError, LedgerError};
use crate::prover::MockProver;

#[derive(Debug, Default)]
struct LedgerState {
    tallies: Vec<u64>,
    nullifiers: HashSet<FieldElement>,
    receipts: HashMap<TxHash, Receipt>,
    block: u64,
    read_failure: Option<LedgerError>,
}

pub struct MockLedger {
    state: Mutex<LedgerState>,
    layout: SignalLayout,
    confirmation_delay: Duration,
    submissions: AtomicUsize,
}

impl MockLedger {
    /// Contract with the given starting tallies
    pub fn new(tallies: Vec<u64>) -> Self {
        Self::with_layout(tallies, SignalLayout::default())
    }

    pub fn with_layout(tallies: Vec<u64>, layout: SignalLayout) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                tallies,
                ..Default::default()
            }),
            layout,
            confirmation_delay: Duration::ZERO,
            submissions: AtomicUsize::new(0),
        }
    }

    /// Delay between submission and receipt
    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    /// Make subsequent tally reads fail with `error`
    pub async fn fail_reads(&self, error: Option<LedgerError>) {
        self.state.lock().await.read_failure = error;
    }

    pub async fn snapshot(&self) -> Vec<u64> {
        self.state.lock().await.tallies.clone()
    }

    pub async fn has_nullifier(&self, nullifier: &Nullifier) -> bool {
        self.state
            .lock()
            .await
            .nullifiers
            .contains(&nullifier.to_field_element())
    }

    /// Number of vote transactions received, accepted or not
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Verify and apply a vote, as the contract's `vote` function would
    pub async fn submit(&self, from: Address, call: &VoteCall) -> Result<TxHash, LedgerError> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst);

        let expected = MockProver::proof_for(&call.public_signals).into_verifier_order();
        if call.proof != expected {
            return Err(LedgerError::Reverted("Invalid proof".to_string()));
        }

        let signals = &call.public_signals;
        if signals.len() != self.layout.count {
            return Err(LedgerError::Reverted("Invalid public signals".to_string()));
        }
        let nullifier = self
            .layout
            .nullifier_of(signals)
            .ok_or_else(|| LedgerError::Reverted("Missing nullifier".to_string()))?;
        let option = self
            .layout
            .option_of(signals)
            .and_then(|value| usize::try_from(value).ok())
            .ok_or_else(|| LedgerError::Reverted("Missing option".to_string()))?;

        let mut state = self.state.lock().await;
        if state.nullifiers.contains(&nullifier) {
            return Err(LedgerError::Reverted("Nullifier already used".to_string()));
        }
        let Some(count) = state.tallies.get_mut(option) else {
            return Err(LedgerError::Reverted("Invalid option".to_string()));
        };
        *count += 1;
        state.nullifiers.insert(nullifier);
        state.block += 1;

        let mut preimage = from.to_vec();
        preimage.extend_from_slice(&(n as u64).to_be_bytes());
        let tx_hash = keccak256(&preimage);
        let receipt = Receipt {
            tx_hash,
            block_number: Some(state.block),
            success: true,
        };
        state.receipts.insert(tx_hash, receipt);

        Ok(tx_hash)
    }

    pub async fn receipt(&self, tx_hash: TxHash) -> Result<Receipt, LedgerError> {
        if !self.confirmation_delay.is_zero() {
            tokio::time::sleep(self.confirmation_delay).await;
        }
        self.state
            .lock()
            .await
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| LedgerError::Decode(format!("unknown transaction {tx_hash}")))
    }
}

impl LedgerReader for MockLedger {
    async fn tallies(&self) -> Result<Vec<u64>, LedgerError> {
        let state = self.state.lock().await;
        if let Some(err) = &state.read_failure {
            return Err(err.clone());
        }
        Ok(state.tallies.clone())
    }
}

/// How the mock wallet answers an account request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletBehavior {
    Connected(Vec<Address>),
    Declined,
    Missing,
}

pub struct MockWallet {
    behavior: WalletBehavior,
    ledger: Arc<MockLedger>,
    account_requests: AtomicUsize,
}

impl MockWallet {
    pub fn new(behavior: WalletBehavior, ledger: Arc<MockLedger>) -> Self {
        Self {
            behavior,
            ledger,
            account_requests: AtomicUsize::new(0),
        }
    }

    /// Wallet exposing a single account
    pub fn connected(account: Address, ledger: Arc<MockLedger>) -> Self {
        Self::new(WalletBehavior::Connected(vec![account]), ledger)
    }

    pub fn account_requests(&self) -> usize {
        self.account_requests.load(Ordering::SeqCst)
    }

    pub fn ledger(&self) -> &Arc<MockLedger> {
        &self.ledger
    }
}

impl WalletProvider for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, ConnectionError> {
        self.account_requests.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            WalletBehavior::Connected(accounts) if accounts.is_empty() => Err(
                ConnectionError::ConnectionRejected("wallet exposed no accounts".to_string()),
            ),
            WalletBehavior::Connected(accounts) => Ok(accounts.clone()),
            WalletBehavior::Declined => Err(ConnectionError::ConnectionRejected(
                "User rejected the request".to_string(),
            )),
            WalletBehavior::Missing => Err(ConnectionError::NoWalletDetected(
                "no provider injected".to_string(),
            )),
        }
    }

    async fn send_vote(&self, from: Address, call: &VoteCall) -> Result<TxHash, LedgerError> {
        self.ledger.submit(from, call).await
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt, LedgerError> {
        self.ledger.receipt(tx_hash).await
    }
}
