//! Startup wiring
//!
//! Turns a loaded [`ShadowVoteConfig`] into live components. Configuration
//! problems are reported here, once:
//!
//! - the read path (tallies) needs the RPC URL, the contract address and the
//!   ABI; without them nothing works and `from_config` fails
//! - the voting path additionally needs the circuit artifacts and a signal
//!   layout consistent with the ABI; if those are wrong only voting is
//!   disabled and the tallies stay available

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use shadowvote_ballot::{SignalLayout, WitnessBuilder};
use shadowvote_config::ShadowVoteConfig;
use tracing::{error, info};

use crate::catalog::OptionCatalog;
use crate::client::VotingClient;
use crate::error::StartupError;
use crate::ledger::abi::ContractInterface;
use crate::ledger::rpc::{EthRpcClient, EthRpcConfig};
use crate::pipeline::SubmissionPipeline;
use crate::prover::{BackendError, ProofOrchestrator, SnarkjsBackend};
use crate::session::SessionBinder;

/// Voting client backed by snarkjs and a JSON-RPC endpoint
pub type RpcVotingClient = VotingClient<SnarkjsBackend, EthRpcClient, EthRpcClient>;

pub struct Deployment {
    pub catalog: Arc<OptionCatalog<EthRpcClient>>,
    /// `Err` holds the reason voting is disabled
    pub voting: Result<RpcVotingClient, StartupError>,
}

impl Deployment {
    pub fn from_config(config: &ShadowVoteConfig) -> Result<Self, StartupError> {
        let contract = parse_contract(config)?;
        let interface = Arc::new(load_interface(config)?);
        WitnessBuilder::new(config.ballot.options.len())?;

        let reader = Arc::new(EthRpcClient::new(
            rpc_config(config, &config.ledger.rpc_url, contract),
            Arc::clone(&interface),
        )?);
        let catalog = Arc::new(OptionCatalog::new(reader, config.ballot.options.clone()));
        info!(%contract, options = catalog.option_count(), "read path ready");

        let voting = voting_client(config, contract, &interface, &catalog);
        match &voting {
            Ok(_) => info!("voting path ready"),
            Err(e) => error!(error = %e, "voting disabled"),
        }

        Ok(Self { catalog, voting })
    }

    pub fn voting(&self) -> Result<&RpcVotingClient, &StartupError> {
        self.voting.as_ref()
    }
}

fn voting_client(
    config: &ShadowVoteConfig,
    contract: Address,
    interface: &Arc<ContractInterface>,
    catalog: &Arc<OptionCatalog<EthRpcClient>>,
) -> Result<RpcVotingClient, StartupError> {
    let circuit = &config.circuit;
    let layout = SignalLayout {
        count: circuit.public_signals,
        nullifier: circuit.nullifier_signal,
        option: circuit.option_signal,
    };
    layout.validate()?;

    if let Some(expected) = interface.expected_signal_count() {
        if expected != layout.count {
            return Err(StartupError::Invalid {
                key: "circuit.public_signals",
                reason: format!(
                    "verifier ABI takes {expected} public signals, configured {}",
                    layout.count
                ),
            });
        }
    }

    let backend = SnarkjsBackend::new(
        circuit.snarkjs_bin.clone(),
        &circuit.wasm_path,
        &circuit.zkey_path,
    )
    .map_err(|e| match e {
        BackendError::MissingArtifact(path) => StartupError::MissingArtifact(path),
        other => StartupError::Invalid {
            key: "circuit",
            reason: other.to_string(),
        },
    })?;

    let wallet = Arc::new(EthRpcClient::new(
        rpc_config(config, config.wallet_url(), contract),
        Arc::clone(interface),
    )?);

    let builder = WitnessBuilder::new(catalog.option_count())?;
    let orchestrator = ProofOrchestrator::new(backend, layout)?;
    let pipeline = SubmissionPipeline::new(builder, orchestrator, Arc::clone(&wallet));

    Ok(VotingClient::new(
        SessionBinder::new(wallet),
        Arc::clone(catalog),
        pipeline,
    ))
}

fn parse_contract(config: &ShadowVoteConfig) -> Result<Address, StartupError> {
    let raw = config
        .ledger
        .contract_address
        .as_deref()
        .ok_or(StartupError::Missing("ledger.contract_address"))?;
    raw.trim().parse::<Address>().map_err(|e| StartupError::Invalid {
        key: "ledger.contract_address",
        reason: format!("{raw:?}: {e}"),
    })
}

fn load_interface(config: &ShadowVoteConfig) -> Result<ContractInterface, StartupError> {
    let path = config
        .ledger
        .abi_path
        .as_deref()
        .map(PathBuf::from)
        .ok_or(StartupError::Missing("ledger.abi_path"))?;
    let json = read(&path)?;
    Ok(ContractInterface::from_json(&json)?)
}

fn read(path: &Path) -> Result<String, StartupError> {
    std::fs::read_to_string(path).map_err(|source| StartupError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn rpc_config(config: &ShadowVoteConfig, url: &str, contract: Address) -> EthRpcConfig {
    EthRpcConfig {
        confirmation_timeout: Duration::from_secs(config.pipeline.confirmation_timeout_secs),
        poll_interval: Duration::from_millis(config.pipeline.poll_interval_ms),
        ..EthRpcConfig::new(url, contract)
    }
}
