//! Ledger and wallet seams
//!
//! ```text
//! OptionCatalog ──▶ LedgerReader::tallies()      (eth_call getAllOptions)
//! SessionBinder ──▶ WalletProvider::request_accounts()
//! Pipeline      ──▶ WalletProvider::send_vote() ──▶ wait_for_receipt()
//! ```
//!
//! `rpc` talks JSON-RPC to a node; `mock` keeps everything in memory.

pub mod abi;
pub mod mock;
pub mod rpc;

use std::future::Future;

use alloy_primitives::{Address, B256};
use shadowvote_ballot::{Nullifier, OptionIndex, PublicSignals, VerifierProof};

use crate::error::{ConnectionError, LedgerError};

pub use abi::ContractInterface;
pub use rpc::EthRpcClient;

/// Transaction hash returned by the wallet
pub type TxHash = B256;

/// Arguments of the verifier contract's `vote` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteCall {
    pub proof: VerifierProof,
    pub public_signals: PublicSignals,
}

/// Mined transaction outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub success: bool,
}

/// A vote the ledger accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub nullifier: Nullifier,
    pub option: OptionIndex,
}

/// Signs and submits transactions on behalf of the voter
pub trait WalletProvider: Send + Sync + 'static {
    /// Ask the wallet for its accounts; may prompt the user
    fn request_accounts(
        &self,
    ) -> impl Future<Output = Result<Vec<Address>, ConnectionError>> + Send;

    /// Submit the vote transaction from `from`
    fn send_vote(
        &self,
        from: Address,
        call: &VoteCall,
    ) -> impl Future<Output = Result<TxHash, LedgerError>> + Send;

    /// Wait until the transaction is mined
    fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<Receipt, LedgerError>> + Send;
}

/// Read-only view of the tally contract
pub trait LedgerReader: Send + Sync + 'static {
    /// Current per-option counts in option order
    fn tallies(&self) -> impl Future<Output = Result<Vec<u64>, LedgerError>> + Send;
}
